use crate::config::{ScenarioConfig, SearchParams};
use crate::core_types::{CostPoints, Roster};
use crate::optimizer::moves::MovePicker;
use crate::optimizer::seed;
use crate::optimizer::{CancelToken, WorkerEvent};
use crate::solution::{CostModel, Solution};
use fastrand::Rng;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::{Duration, Instant};
use strum_macros::Display;
use tracing::{debug, warn};

/// Why a worker left its hot loop. Cancellation is an expected terminal
/// state, not an error; the finalization path is identical for all
/// three.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum StopReason {
    Converged,
    Cancelled,
    BudgetExhausted,
}

/// Best-cost snapshot pushed to the orchestrator at a bounded cadence.
#[derive(Debug, Clone)]
pub struct ProgressSnapshot {
    pub scenario_index: usize,
    pub replica: usize,
    pub best_cost: f64,
    pub iterations: u64,
}

#[derive(Debug, Clone)]
pub struct WorkerReport {
    pub scenario_index: usize,
    pub replica: usize,
    pub best: Solution,
    pub iterations: u64,
    pub elapsed: Duration,
    pub stop_reason: StopReason,
    pub drift_repairs: u32,
}

/// One independent annealing trajectory. Owns its search state
/// exclusively; the only outbound traffic is progress snapshots and the
/// final report.
pub struct AnnealWorker {
    scenario_index: usize,
    replica: usize,
    scenario: ScenarioConfig,
    roster: Arc<Roster>,
    model: CostModel,
    picker: MovePicker,
    rng: Rng,
    current: Solution,
    best: Solution,
    temperature: f64,
    iterations: u64,
    since_improvement: u64,
    stale_reheats: u32,
    drift_repairs: u32,
}

impl AnnealWorker {
    pub fn new(
        scenario_index: usize,
        replica: usize,
        scenario: ScenarioConfig,
        roster: Arc<Roster>,
        group_count: usize,
        rng_seed: Option<u64>,
    ) -> Self {
        let mut rng = match rng_seed {
            Some(s) => Rng::with_seed(s),
            None => Rng::new(),
        };
        let model = CostModel::new(&roster, group_count);
        let current = seed::greedy_seed(
            &roster,
            group_count,
            &model,
            scenario.constrain_advantaged,
            &mut rng,
        );
        let mut picker = MovePicker::new(&scenario.params, group_count);
        picker.refresh(&current);
        let temperature = scenario.params.temp_initial;
        let best = current.clone();

        Self {
            scenario_index,
            replica,
            scenario,
            roster,
            model,
            picker,
            rng,
            current,
            best,
            temperature,
            iterations: 0,
            since_improvement: 0,
            stale_reheats: 0,
            drift_repairs: 0,
        }
    }

    /// Runs to the time/iteration budget or until the token trips, then
    /// finalizes. The cancellation flag is checked every iteration.
    pub fn run(mut self, cancel: &CancelToken, events: &Sender<WorkerEvent>) -> WorkerReport {
        let params = self.scenario.params.clone();
        let constrained = self.scenario.constrain_advantaged;
        let started = Instant::now();
        let budget = Duration::from_secs(params.time_budget_secs);
        let focus_refresh = params.focus_refresh.max(1);
        let progress_iterations = params.progress_iterations.max(1);
        let mut last_emit = started;

        let stop = if self.current.group_count() < 2 {
            // Nothing to move; the seed is already the answer.
            StopReason::Converged
        } else {
            loop {
                if cancel.is_cancelled() {
                    break StopReason::Cancelled;
                }
                if (self.iterations & 0x3F) == 0 && started.elapsed() >= budget {
                    break StopReason::BudgetExhausted;
                }
                if params.max_iterations > 0 && self.iterations >= params.max_iterations {
                    break StopReason::BudgetExhausted;
                }
                self.iterations += 1;

                if self.iterations % focus_refresh == 0 {
                    self.picker.refresh(&self.current);
                }

                if let Some(mv) =
                    self.picker
                        .pick(&mut self.rng, &self.current, &self.roster, constrained)
                {
                    let delta = self.current.delta_cost(&mv, &self.roster, &self.model);
                    if delta <= 0 || self.accepts(delta) {
                        self.current.apply_in_place(&mv, &self.roster, &self.model);
                        self.track_best();
                    }
                }

                self.temperature *= params.cooling_factor;
                self.since_improvement += 1;
                if self.temperature < params.temp_floor {
                    if self.since_improvement >= params.reheat_after {
                        self.reheat(&params, constrained);
                        if self.stale_reheats > params.max_stale_reheats {
                            break StopReason::Converged;
                        }
                    } else {
                        self.temperature = params.temp_floor;
                    }
                }

                if params.paranoid_interval > 0 && self.iterations % params.paranoid_interval == 0
                {
                    self.reconcile();
                }

                if self.iterations % progress_iterations == 0 {
                    let now = Instant::now();
                    if now.duration_since(last_emit) >= Duration::from_millis(params.progress_min_ms)
                    {
                        let _ = events.send(WorkerEvent::Progress(self.snapshot()));
                        last_emit = now;
                    }
                }
            }
        };

        debug!(
            scenario = %self.scenario.label,
            replica = self.replica,
            %stop,
            iterations = self.iterations,
            "worker stopped"
        );
        self.finalize(stop, started.elapsed(), constrained, &params)
    }

    fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            scenario_index: self.scenario_index,
            replica: self.replica,
            best_cost: self.model.points_to_display(self.best.cost()),
            iterations: self.iterations,
        }
    }

    /// Metropolis criterion for an uphill move.
    fn accepts(&mut self, delta: CostPoints) -> bool {
        if self.temperature <= 0.0 {
            return false;
        }
        let d = self.model.points_to_display(delta);
        self.rng.f64() < (-d / self.temperature).exp()
    }

    /// The best-seen slot only ever adopts a state that satisfies the
    /// scenario's mandated invariants, so relaxed exploration (the
    /// constraint-retry fallback) can never leak into a report.
    fn track_best(&mut self) {
        if self.current.cost() < self.best.cost() && self.feasible(&self.current) {
            self.best = self.current.clone();
            self.since_improvement = 0;
            self.stale_reheats = 0;
        }
    }

    fn feasible(&self, solution: &Solution) -> bool {
        !self.scenario.constrain_advantaged || solution.advantage_spread() <= 1
    }

    /// Stagnation escape: raise the temperature back to a fraction of
    /// the initial value and kick the current state (never the best one)
    /// with a burst of unconditional legal moves.
    fn reheat(&mut self, params: &SearchParams, constrained: bool) {
        self.stale_reheats += 1;
        self.temperature = params.temp_initial * params.reheat_fraction;
        for _ in 0..params.reheat_burst {
            if let Some(mv) =
                self.picker
                    .pick(&mut self.rng, &self.current, &self.roster, constrained)
            {
                self.current.apply_in_place(&mv, &self.roster, &self.model);
            }
        }
        self.picker.refresh(&self.current);
        self.since_improvement = 0;
    }

    /// Rebuilds the tracked aggregates from participant data and
    /// replaces them on any disagreement. Integer tracking is exact, so
    /// a mismatch can only mean an incremental bookkeeping defect; it is
    /// repaired here rather than surfaced.
    fn reconcile(&mut self) {
        let rebuilt = self.current.recompute(&self.roster, &self.model);
        if rebuilt.cost() != self.current.cost() {
            warn!(
                scenario = %self.scenario.label,
                replica = self.replica,
                tracked = %self.current.cost(),
                recomputed = %rebuilt.cost(),
                "tracked cost diverged from recomputation; state replaced"
            );
            self.drift_repairs += 1;
            self.current = rebuilt;
        }
    }

    /// Identical for budget exhaustion, convergence, and cancellation:
    /// polish the best state with a bounded improving-only descent, then
    /// hand back a fully recomputed copy.
    fn finalize(
        mut self,
        stop: StopReason,
        elapsed: Duration,
        constrained: bool,
        params: &SearchParams,
    ) -> WorkerReport {
        self.polish(params, constrained);
        let best = self.best.recompute(&self.roster, &self.model);
        WorkerReport {
            scenario_index: self.scenario_index,
            replica: self.replica,
            best,
            iterations: self.iterations,
            elapsed,
            stop_reason: stop,
            drift_repairs: self.drift_repairs,
        }
    }

    fn polish(&mut self, params: &SearchParams, constrained: bool) {
        if params.polish_iterations == 0 {
            return;
        }
        self.picker.refresh(&self.best);
        for _ in 0..params.polish_iterations {
            let Some(mv) =
                self.picker
                    .pick(&mut self.rng, &self.best, &self.roster, constrained)
            else {
                break;
            };
            if self.best.delta_cost(&mv, &self.roster, &self.model) >= 0 {
                continue;
            }
            let candidate = self.best.apply(&mv, &self.roster, &self.model);
            if !constrained || candidate.advantage_spread() <= 1 {
                self.best = candidate;
                self.picker.refresh(&self.best);
            }
        }
    }
}
