use groupforge::api;
use groupforge::config::{ScenarioConfig, SearchParams};
use groupforge::core_types::{Participant, Roster};
use groupforge::optimizer::{CancelToken, RaceOptions, SilentProgress};
use groupforge::optimizer::seed;
use groupforge::solution::CostModel;
use rstest::rstest;

fn quick_params(max_iterations: u64) -> SearchParams {
    SearchParams {
        max_iterations,
        progress_iterations: 10_000,
        ..Default::default()
    }
}

fn options(seed: u64) -> RaceOptions {
    RaceOptions {
        replicas_per_scenario: 1,
        seed: Some(seed),
    }
}

/// 26 linearly spaced scores into 6 groups: sizes must split 5/5/4/4/4/4
/// and the search must beat naive sequential dealing.
#[test]
fn linear_field_into_six_groups() {
    let scores: Vec<f64> = (0..26).map(|i| 100.0 - i as f64 * (99.0 / 25.0)).collect();
    let participants: Vec<Participant> = scores
        .iter()
        .enumerate()
        .map(|(i, &s)| Participant::from_raw(i as u32, s, false).unwrap())
        .collect();

    let scenarios = vec![ScenarioConfig::unconstrained(quick_params(60_000))];
    let result = api::balance(
        participants.clone(),
        6,
        scenarios,
        options(7),
        &CancelToken::new(),
        &SilentProgress,
    )
    .unwrap();

    let outcome = &result.scenarios[0];
    let mut sizes: Vec<u32> = outcome.solution.stats().iter().map(|g| g.size).collect();
    sizes.sort_unstable();
    assert_eq!(sizes, vec![4, 4, 4, 4, 5, 5]);

    // Baseline: deal the roster in input order.
    let roster = Roster::new(participants).unwrap();
    let model = CostModel::new(&roster, 6);
    let naive = seed::round_robin_seed(&roster, 6, &model);
    assert!(
        outcome.solution.cost() < naive.cost(),
        "annealed {} should beat round-robin {}",
        outcome.cost,
        model.points_to_display(naive.cost())
    );
}

/// Four advantaged participants into four groups: exactly one each.
#[test]
fn advantaged_participants_land_one_per_group() {
    let participants: Vec<Participant> = (0..12)
        .map(|i| Participant::from_raw(i as u32, (i as f64) * 7.0 + 20.0, i < 4).unwrap())
        .collect();

    let scenarios = vec![ScenarioConfig::constrained(quick_params(30_000))];
    let result = api::balance(
        participants,
        4,
        scenarios,
        options(13),
        &CancelToken::new(),
        &SilentProgress,
    )
    .unwrap();

    let outcome = &result.scenarios[0];
    for stats in outcome.solution.stats() {
        assert_eq!(stats.size, 3);
        assert_eq!(stats.advantaged, 1);
    }
}

#[rstest]
#[case(7, 3)]
#[case(10, 5)]
#[case(9, 2)]
#[case(5, 5)]
#[case(6, 1)]
fn invariants_hold_across_shapes(#[case] n: usize, #[case] group_count: usize) {
    let participants: Vec<Participant> = (0..n)
        .map(|i| Participant::from_raw(i as u32, ((i * 31) % 53) as f64, i % 3 == 0).unwrap())
        .collect();

    let params = quick_params(5_000);
    let result = api::balance(
        participants,
        group_count,
        vec![
            ScenarioConfig::constrained(params.clone()),
            ScenarioConfig::unconstrained(params),
        ],
        options(n as u64),
        &CancelToken::new(),
        &SilentProgress,
    )
    .unwrap();

    for outcome in &result.scenarios {
        let total: u32 = outcome.solution.stats().iter().map(|g| g.size).sum();
        assert_eq!(total as usize, n);
        assert!(outcome.solution.size_spread() <= 1);
        if outcome.scenario.constrain_advantaged {
            assert!(outcome.solution.advantage_spread() <= 1);
        }
    }
}

/// Recomputing a finalized solution changes nothing: no hidden state.
#[test]
fn finalization_is_idempotent() {
    let participants: Vec<Participant> = (0..15)
        .map(|i| Participant::from_raw(i as u32, ((i * 11) % 40) as f64 + 1.0, false).unwrap())
        .collect();

    let scenarios = vec![ScenarioConfig::unconstrained(quick_params(10_000))];
    let result = api::balance(
        participants.clone(),
        3,
        scenarios,
        options(29),
        &CancelToken::new(),
        &SilentProgress,
    )
    .unwrap();

    let solution = &result.scenarios[0].solution;
    let roster = Roster::new(participants).unwrap();
    let model = CostModel::new(&roster, 3);
    let once = solution.recompute(&roster, &model);
    let twice = once.recompute(&roster, &model);
    assert_eq!(solution.cost(), once.cost());
    assert_eq!(once.cost(), twice.cost());
    assert_eq!(once.assignment(), twice.assignment());
}
