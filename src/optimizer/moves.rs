use crate::config::SearchParams;
use crate::core_types::{GroupId, Roster};
use crate::solution::{Move, Solution};
use fastrand::Rng;

/// Draws candidate moves for the annealing loop.
///
/// Group pairs are not sampled uniformly: a ranking of groups by average
/// score is kept (refreshed periodically by the worker) and most draws
/// pair a top-ranked group with a bottom-ranked one, so evaluations
/// concentrate on the worst imbalances.
pub struct MovePicker {
    swap_probability: f64,
    focus_window: usize,
    explore_ratio: f64,
    constraint_retries: usize,
    ranked: Vec<usize>,
}

impl MovePicker {
    pub fn new(params: &SearchParams, group_count: usize) -> Self {
        Self {
            swap_probability: params.swap_probability,
            focus_window: params.focus_window,
            explore_ratio: params.explore_ratio,
            constraint_retries: params.constraint_retries,
            ranked: (0..group_count).collect(),
        }
    }

    /// Re-sorts the group ranking by average score, highest first.
    /// Averages are compared as exact rationals (T_a * s_b vs T_b * s_a).
    pub fn refresh(&mut self, solution: &Solution) {
        let stats = solution.stats();
        self.ranked.sort_by(|&a, &b| {
            let lhs = stats[a].total_score as i128 * stats[b].size as i128;
            let rhs = stats[b].total_score as i128 * stats[a].size as i128;
            rhs.cmp(&lhs)
        });
    }

    /// Draws one legal move. In constrained mode, draws that would push
    /// the advantaged spread above 1 are redrawn up to
    /// `constraint_retries` times; the final attempt relaxes the
    /// predicate, since perfect balance is not always reachable from the
    /// current state.
    pub fn pick(
        &self,
        rng: &mut Rng,
        solution: &Solution,
        roster: &Roster,
        constrained: bool,
    ) -> Option<Move> {
        if solution.group_count() < 2 {
            return None;
        }
        for attempt in 0..=self.constraint_retries {
            let enforce = constrained && attempt < self.constraint_retries;
            if let Some(mv) = self.draw(rng, solution, roster, enforce) {
                return Some(mv);
            }
        }
        None
    }

    fn draw(
        &self,
        rng: &mut Rng,
        solution: &Solution,
        roster: &Roster,
        enforce: bool,
    ) -> Option<Move> {
        let (ga, gb) = self.pick_pair(rng, solution);
        let stats = solution.stats();

        // A transfer is only legal from a strictly larger group into a
        // strictly smaller one; with level sizes the draw degrades to a
        // swap.
        if rng.f64() >= self.swap_probability && stats[ga].size != stats[gb].size {
            let (src, dst) = if stats[ga].size > stats[gb].size {
                (ga, gb)
            } else {
                (gb, ga)
            };
            let pool = solution.members(src);
            let p = pool[rng.usize(0..pool.len())];
            if enforce && roster.get(p).advantaged && !balance_after(solution, src, dst, -1, 1) {
                return None;
            }
            return Some(Move::Transfer {
                participant: p,
                from: src as GroupId,
                to: dst as GroupId,
            });
        }

        let pool_a = solution.members(ga);
        let pool_b = solution.members(gb);
        let a = pool_a[rng.usize(0..pool_a.len())];
        let b = pool_b[rng.usize(0..pool_b.len())];
        let flag_a = roster.get(a).advantaged;
        let flag_b = roster.get(b).advantaged;
        // Same-flag swaps never shift advantaged counts.
        if enforce && flag_a != flag_b {
            let (da, db) = if flag_a { (-1, 1) } else { (1, -1) };
            if !balance_after(solution, ga, gb, da, db) {
                return None;
            }
        }
        Some(Move::Swap { a, b })
    }

    fn pick_pair(&self, rng: &mut Rng, solution: &Solution) -> (usize, usize) {
        let g = solution.group_count();
        if g == 2 {
            return (0, 1);
        }
        let k = self.focus_window.clamp(1, g / 2);
        if rng.f64() >= self.explore_ratio {
            let hi = self.ranked[rng.usize(0..k)];
            let lo = self.ranked[g - 1 - rng.usize(0..k)];
            if hi != lo {
                return (hi, lo);
            }
        }
        let a = rng.usize(0..g);
        let mut b = rng.usize(0..g - 1);
        if b >= a {
            b += 1;
        }
        (a, b)
    }
}

/// Whether the advantaged spread stays within 1 after shifting the two
/// groups' counts by the given deltas.
fn balance_after(solution: &Solution, ga: usize, gb: usize, da: i64, db: i64) -> bool {
    let mut lo = i64::MAX;
    let mut hi = i64::MIN;
    for (i, st) in solution.stats().iter().enumerate() {
        let mut c = st.advantaged as i64;
        if i == ga {
            c += da;
        }
        if i == gb {
            c += db;
        }
        lo = lo.min(c);
        hi = hi.max(c);
    }
    hi - lo <= 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::Participant;
    use crate::solution::CostModel;

    fn fixture(scores: &[f64], advantaged: &[bool], group_count: usize) -> (Roster, Solution) {
        let ps = scores
            .iter()
            .zip(advantaged)
            .enumerate()
            .map(|(i, (&s, &adv))| Participant::from_raw(i as u32, s, adv).unwrap())
            .collect();
        let roster = Roster::new(ps).unwrap();
        let model = CostModel::new(&roster, group_count);
        let assignment = (0..roster.len())
            .map(|i| (i % group_count) as GroupId)
            .collect();
        let solution = Solution::from_assignment(&roster, assignment, group_count, &model).unwrap();
        (roster, solution)
    }

    #[test]
    fn picked_moves_are_size_legal() {
        let (roster, solution) = fixture(
            &[9.0, 7.0, 5.0, 3.0, 1.0, 8.0, 6.0],
            &[false; 7],
            3,
        );
        let params = SearchParams::default();
        let mut picker = MovePicker::new(&params, 3);
        picker.refresh(&solution);
        let mut rng = Rng::with_seed(11);

        for _ in 0..500 {
            let mv = picker.pick(&mut rng, &solution, &roster, false).unwrap();
            if let Move::Transfer { from, to, .. } = mv {
                let stats = solution.stats();
                assert!(stats[from as usize].size > stats[to as usize].size);
            }
        }
    }

    #[test]
    fn constrained_draws_keep_advantage_spread() {
        let (roster, solution) = fixture(
            &[9.0, 7.0, 5.0, 3.0, 1.0, 8.0],
            &[true, false, false, true, false, false],
            2,
        );
        // Generous retry budget so the relaxed fallback never triggers
        // in this deterministic sweep.
        let params = SearchParams {
            constraint_retries: 64,
            ..Default::default()
        };
        let mut picker = MovePicker::new(&params, 2);
        picker.refresh(&solution);
        let mut rng = Rng::with_seed(5);
        let model = CostModel::new(&roster, 2);

        assert_eq!(solution.advantage_spread(), 0);
        for _ in 0..500 {
            let mv = picker.pick(&mut rng, &solution, &roster, true).unwrap();
            let next = solution.apply(&mv, &roster, &model);
            assert!(next.advantage_spread() <= 1, "move {mv:?} broke balance");
        }
    }

    #[test]
    fn single_group_yields_no_moves() {
        let (roster, solution) = fixture(&[1.0, 2.0], &[false, false], 1);
        let picker = MovePicker::new(&SearchParams::default(), 1);
        let mut rng = Rng::with_seed(1);
        assert!(picker.pick(&mut rng, &solution, &roster, false).is_none());
    }
}
