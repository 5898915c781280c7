use crate::core_types::{GroupId, Roster};
use crate::error::{GfResult, GroupForgeError};
use crate::solution::{CostModel, Solution};
use std::sync::Arc;
use tracing::debug;

/// Final gatekeeper between the search and external reporting.
///
/// Every candidate is rebuilt from participant data (never from the
/// search's incremental aggregates) and checked against the structural
/// invariants. A violation here is an internal defect in move
/// generation or recomputation and fails the run loudly; it is never
/// silently repaired.
pub struct Arbiter {
    roster: Arc<Roster>,
    model: CostModel,
    group_count: usize,
}

impl Arbiter {
    pub fn new(roster: Arc<Roster>, model: CostModel, group_count: usize) -> Self {
        Self {
            roster,
            model,
            group_count,
        }
    }

    pub fn finalize(
        &self,
        assignment: &[GroupId],
        constrain_advantaged: bool,
    ) -> GfResult<Solution> {
        let solution = Solution::from_assignment(
            &self.roster,
            assignment.to_vec(),
            self.group_count,
            &self.model,
        )?;

        let size_spread = solution.size_spread();
        if size_spread > 1 {
            return Err(GroupForgeError::ResultInvalid(format!(
                "group sizes diverge by {size_spread}"
            )));
        }
        if constrain_advantaged {
            let spread = solution.advantage_spread();
            if spread > 1 {
                return Err(GroupForgeError::ResultInvalid(format!(
                    "advantaged counts diverge by {spread}"
                )));
            }
        }

        debug!(
            cost = self.model.points_to_display(solution.cost()),
            constrained = constrain_advantaged,
            "arbitration passed"
        );
        Ok(solution)
    }
}
