use crate::consts::SCORE_SCALE;
use crate::core_types::{CostPoints, GroupId, ParticipantId, Roster, ScaledScore};
use crate::error::{GfResult, GroupForgeError};
use itertools::{Itertools, MinMaxResult};
use serde::Serialize;

/// Cached aggregates of one group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GroupStats {
    pub size: u32,
    pub total_score: ScaledScore,
    pub advantaged: u32,
}

/// Precomputed quantities that turn group aggregates into an exact
/// integer cost.
///
/// With `n` participants and sizes confined to {m, m+1}, every group
/// deviation `|T/s - G/n|` shares the denominator `n * m * (m+1)`, so
/// each group contributes `|T*n - G*s| * m*(m+1)/s` points with the
/// division exact. Points only become floats at the reporting boundary.
#[derive(Debug, Clone, Copy)]
pub struct CostModel {
    participants: i128,
    grand_total: i128,
    base_num: i128,
}

impl CostModel {
    pub fn new(roster: &Roster, group_count: usize) -> Self {
        let n = roster.len() as i128;
        let m = n / group_count as i128;
        Self {
            participants: n,
            grand_total: roster.grand_total() as i128,
            base_num: m * (m + 1),
        }
    }

    /// Deviation contribution of one group, in cost points. Exact for
    /// legal sizes; tolerant of illegal ones so the arbiter can score a
    /// candidate before rejecting it.
    #[inline]
    pub fn group_deviation(&self, stats: &GroupStats) -> CostPoints {
        if stats.size == 0 {
            return 0;
        }
        let size = stats.size as i128;
        let num = (stats.total_score as i128 * self.participants - self.grand_total * size).abs();
        num * self.base_num / size
    }

    pub fn total_cost(&self, groups: &[GroupStats]) -> CostPoints {
        groups.iter().map(|g| self.group_deviation(g)).sum()
    }

    /// Converts cost points to the sum of absolute average deviations in
    /// raw score units.
    pub fn points_to_display(&self, points: CostPoints) -> f64 {
        points as f64 / (self.participants as f64 * self.base_num as f64 * SCORE_SCALE as f64)
    }

    pub fn group_average(&self, stats: &GroupStats) -> f64 {
        if stats.size == 0 {
            return 0.0;
        }
        stats.total_score as f64 / (stats.size as f64 * SCORE_SCALE as f64)
    }

    pub fn grand_average(&self) -> f64 {
        self.grand_total as f64 / (self.participants as f64 * SCORE_SCALE as f64)
    }
}

/// A candidate perturbation of a Solution. Swaps preserve group sizes;
/// transfers shift one participant from a larger group into a smaller
/// one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Swap {
        a: ParticipantId,
        b: ParticipantId,
    },
    Transfer {
        participant: ParticipantId,
        from: GroupId,
        to: GroupId,
    },
}

/// A full partition of the roster plus cached per-group aggregates and
/// the derived integer cost.
///
/// The assignment vector maps every participant to exactly one group,
/// so exactly-once coverage is structural. `members`/`slot` mirror the
/// assignment for O(1) member lookup and replacement in the hot loop.
#[derive(Debug, Clone)]
pub struct Solution {
    assignment: Vec<GroupId>,
    slot: Vec<u32>,
    members: Vec<Vec<ParticipantId>>,
    groups: Vec<GroupStats>,
    cost: CostPoints,
}

impl Solution {
    /// Builds a Solution from an explicit assignment, validating
    /// coverage. Structural defects are `ResultInvalid`: an assignment
    /// reaching this point with the wrong shape is an internal bug, not
    /// a user input problem.
    pub fn from_assignment(
        roster: &Roster,
        assignment: Vec<GroupId>,
        group_count: usize,
        model: &CostModel,
    ) -> GfResult<Self> {
        if assignment.len() != roster.len() {
            return Err(GroupForgeError::ResultInvalid(format!(
                "assignment covers {} of {} participants",
                assignment.len(),
                roster.len()
            )));
        }
        if let Some(&g) = assignment.iter().find(|&&g| g as usize >= group_count) {
            return Err(GroupForgeError::ResultInvalid(format!(
                "group index {g} out of range for {group_count} groups"
            )));
        }
        Ok(Self::rebuild(roster, assignment, group_count, model))
    }

    /// Full O(n) construction from participant data. This is the only
    /// path that computes aggregates; incremental updates are checked
    /// against it by the reconciliation pass.
    pub(crate) fn rebuild(
        roster: &Roster,
        assignment: Vec<GroupId>,
        group_count: usize,
        model: &CostModel,
    ) -> Self {
        let mut slot = vec![0u32; assignment.len()];
        let mut members = vec![Vec::new(); group_count];
        let mut groups = vec![GroupStats::default(); group_count];

        for (pid, &g) in assignment.iter().enumerate() {
            let g = g as usize;
            let p = roster.get(pid as ParticipantId);
            slot[pid] = members[g].len() as u32;
            members[g].push(pid as ParticipantId);
            groups[g].size += 1;
            groups[g].total_score += p.score;
            if p.advantaged {
                groups[g].advantaged += 1;
            }
        }

        let cost = model.total_cost(&groups);
        Self {
            assignment,
            slot,
            members,
            groups,
            cost,
        }
    }

    /// Rebuilds this Solution's aggregates from scratch.
    pub fn recompute(&self, roster: &Roster, model: &CostModel) -> Self {
        Self::rebuild(roster, self.assignment.clone(), self.groups.len(), model)
    }

    #[inline]
    pub fn cost(&self) -> CostPoints {
        self.cost
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn stats(&self) -> &[GroupStats] {
        &self.groups
    }

    pub fn assignment(&self) -> &[GroupId] {
        &self.assignment
    }

    #[inline]
    pub fn group_of(&self, participant: ParticipantId) -> GroupId {
        self.assignment[participant as usize]
    }

    pub fn members(&self, group: usize) -> &[ParticipantId] {
        &self.members[group]
    }

    pub fn size_spread(&self) -> u32 {
        spread(self.groups.iter().map(|g| g.size))
    }

    pub fn advantage_spread(&self) -> u32 {
        spread(self.groups.iter().map(|g| g.advantaged))
    }

    /// Cost change the move would cause, without applying it.
    #[inline]
    pub fn delta_cost(&self, mv: &Move, roster: &Roster, model: &CostModel) -> CostPoints {
        match *mv {
            Move::Swap { a, b } => {
                let ga = self.assignment[a as usize] as usize;
                let gb = self.assignment[b as usize] as usize;
                if ga == gb {
                    return 0;
                }
                let diff = roster.get(b).score - roster.get(a).score;
                let old =
                    model.group_deviation(&self.groups[ga]) + model.group_deviation(&self.groups[gb]);
                let mut na = self.groups[ga];
                na.total_score += diff;
                let mut nb = self.groups[gb];
                nb.total_score -= diff;
                model.group_deviation(&na) + model.group_deviation(&nb) - old
            }
            Move::Transfer {
                participant,
                from,
                to,
            } => {
                let from = from as usize;
                let to = to as usize;
                let score = roster.get(participant).score;
                let old = model.group_deviation(&self.groups[from])
                    + model.group_deviation(&self.groups[to]);
                let mut nf = self.groups[from];
                nf.size -= 1;
                nf.total_score -= score;
                let mut nt = self.groups[to];
                nt.size += 1;
                nt.total_score += score;
                model.group_deviation(&nf) + model.group_deviation(&nt) - old
            }
        }
    }

    /// Returns a new Solution with the move applied; the receiver stays
    /// valid for comparison and backtracking.
    pub fn apply(&self, mv: &Move, roster: &Roster, model: &CostModel) -> Self {
        let mut next = self.clone();
        next.apply_in_place(mv, roster, model);
        next
    }

    /// Hot-loop fast path: patches aggregates and the cached cost in
    /// place. The move generator guarantees legality.
    pub(crate) fn apply_in_place(&mut self, mv: &Move, roster: &Roster, model: &CostModel) {
        let delta = self.delta_cost(mv, roster, model);
        match *mv {
            Move::Swap { a, b } => {
                let ga = self.assignment[a as usize] as usize;
                let gb = self.assignment[b as usize] as usize;
                debug_assert_ne!(ga, gb);
                let pa = roster.get(a);
                let pb = roster.get(b);

                let diff = pb.score - pa.score;
                self.groups[ga].total_score += diff;
                self.groups[gb].total_score -= diff;
                if pa.advantaged != pb.advantaged {
                    if pa.advantaged {
                        self.groups[ga].advantaged -= 1;
                        self.groups[gb].advantaged += 1;
                    } else {
                        self.groups[ga].advantaged += 1;
                        self.groups[gb].advantaged -= 1;
                    }
                }

                self.members[ga][self.slot[a as usize] as usize] = b;
                self.members[gb][self.slot[b as usize] as usize] = a;
                self.slot.swap(a as usize, b as usize);
                self.assignment.swap(a as usize, b as usize);
            }
            Move::Transfer {
                participant,
                from,
                to,
            } => {
                let from = from as usize;
                let to = to as usize;
                debug_assert!(self.groups[from].size > self.groups[to].size);
                let p = roster.get(participant);

                let idx = self.slot[participant as usize] as usize;
                self.members[from].swap_remove(idx);
                if let Some(&moved) = self.members[from].get(idx) {
                    self.slot[moved as usize] = idx as u32;
                }
                self.slot[participant as usize] = self.members[to].len() as u32;
                self.members[to].push(participant);
                self.assignment[participant as usize] = to as GroupId;

                self.groups[from].size -= 1;
                self.groups[from].total_score -= p.score;
                self.groups[to].size += 1;
                self.groups[to].total_score += p.score;
                if p.advantaged {
                    self.groups[from].advantaged -= 1;
                    self.groups[to].advantaged += 1;
                }
            }
        }
        self.cost += delta;
    }

    pub fn report(&self, model: &CostModel) -> SolutionReport {
        let groups: Vec<GroupReport> = self
            .groups
            .iter()
            .enumerate()
            .map(|(i, st)| {
                let mut ids = self.members[i].clone();
                ids.sort_unstable();
                GroupReport {
                    group: i,
                    size: st.size,
                    advantaged: st.advantaged,
                    members: ids,
                    total: st.total_score as f64 / SCORE_SCALE as f64,
                    average: model.group_average(st),
                }
            })
            .collect();

        let average_spread = groups
            .iter()
            .map(|g| g.average)
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), a| {
                (lo.min(a), hi.max(a))
            });

        SolutionReport {
            cost: model.points_to_display(self.cost),
            overall_average: model.grand_average(),
            average_spread: (average_spread.1 - average_spread.0).max(0.0),
            groups,
        }
    }
}

fn spread<I: Iterator<Item = u32>>(values: I) -> u32 {
    match values.minmax() {
        MinMaxResult::MinMax(lo, hi) => hi - lo,
        _ => 0,
    }
}

/// Reporting view of one group. Member ids map back to names and scores
/// in the ingestion layer.
#[derive(Debug, Clone, Serialize)]
pub struct GroupReport {
    pub group: usize,
    pub size: u32,
    pub advantaged: u32,
    pub members: Vec<ParticipantId>,
    pub total: f64,
    pub average: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SolutionReport {
    pub cost: f64,
    pub overall_average: f64,
    pub average_spread: f64,
    pub groups: Vec<GroupReport>,
}
