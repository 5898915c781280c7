use crate::config::{default_scenarios, ScenarioConfig, SearchParams};
use crate::core_types::{Participant, Roster};
use crate::error::GfResult;
use crate::optimizer::runner::{ProgressCallback, Race, RaceOptions, RaceResult, SilentProgress};
use crate::optimizer::CancelToken;

/// Library entry point: validates the inputs, then races one annealing
/// scenario per configuration and returns the arbitrated results.
pub fn balance<CB: ProgressCallback>(
    participants: Vec<Participant>,
    group_count: usize,
    scenarios: Vec<ScenarioConfig>,
    options: RaceOptions,
    cancel: &CancelToken,
    callback: &CB,
) -> GfResult<RaceResult> {
    let roster = Roster::new(participants)?;
    let race = Race::new(roster, group_count, scenarios, options)?;
    race.run(cancel, callback)
}

/// Convenience wrapper running the canonical constrained + unconstrained
/// pair with no progress consumer and no external cancellation.
pub fn balance_default(
    participants: Vec<Participant>,
    group_count: usize,
    params: SearchParams,
) -> GfResult<RaceResult> {
    balance(
        participants,
        group_count,
        default_scenarios(&params),
        RaceOptions::default(),
        &CancelToken::new(),
        &SilentProgress,
    )
}
