use crate::arbiter::Arbiter;
use crate::config::ScenarioConfig;
use crate::consts::CALLBACK_CADENCE_MS;
use crate::core_types::Roster;
use crate::error::{GfResult, GroupForgeError};
use crate::optimizer::worker::{AnnealWorker, StopReason, WorkerReport};
use crate::optimizer::{CancelToken, WorkerEvent};
use crate::solution::{CostModel, Solution, SolutionReport};
use serde::Serialize;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

#[derive(Debug, Clone)]
pub struct RaceOptions {
    /// Worker replicas per scenario. 0 splits the available execution
    /// units evenly across scenarios.
    pub replicas_per_scenario: usize,
    /// Base RNG seed; each replica derives its own from it. None draws
    /// from the OS.
    pub seed: Option<u64>,
}

impl Default for RaceOptions {
    fn default() -> Self {
        Self {
            replicas_per_scenario: 0,
            seed: None,
        }
    }
}

impl RaceOptions {
    fn resolve_replicas(&self, scenario_count: usize) -> usize {
        if self.replicas_per_scenario > 0 {
            return self.replicas_per_scenario;
        }
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        (cores / scenario_count).max(1)
    }
}

/// Periodic race-level view handed to the progress callback. Returning
/// false from the callback cancels the race; every worker still yields
/// its best-known solution.
pub trait ProgressCallback: Send + Sync {
    fn on_progress(&self, progress: &RaceProgress) -> bool;
}

/// No-op consumer for embeddings that do not display progress.
pub struct SilentProgress;

impl ProgressCallback for SilentProgress {
    fn on_progress(&self, _progress: &RaceProgress) -> bool {
        true
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScenarioProgress {
    pub label: String,
    pub best_cost: Option<f64>,
    pub iterations: u64,
    pub workers_done: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RaceProgress {
    pub elapsed_secs: f64,
    pub scenarios: Vec<ScenarioProgress>,
}

#[derive(Debug, Clone)]
pub struct ScenarioOutcome {
    pub scenario: ScenarioConfig,
    pub solution: Solution,
    /// Serializable reporting view (group members, averages, cost) for
    /// the external presentation layer.
    pub report: SolutionReport,
    /// Final cost in raw score units (sum of absolute average
    /// deviations).
    pub cost: f64,
    /// Total iterations across the scenario's replicas.
    pub iterations: u64,
    /// Wall time of the slowest replica.
    pub elapsed: Duration,
    pub cancelled: bool,
    /// True when this slot was overwritten by a better constrained
    /// result.
    pub promoted: bool,
    pub drift_repairs: u32,
}

#[derive(Debug, Clone)]
pub struct RaceResult {
    pub scenarios: Vec<ScenarioOutcome>,
}

impl RaceResult {
    pub fn outcome(&self, label: &str) -> Option<&ScenarioOutcome> {
        self.scenarios.iter().find(|o| o.scenario.label == label)
    }

    pub fn best(&self) -> Option<&ScenarioOutcome> {
        self.scenarios
            .iter()
            .min_by_key(|o| o.solution.cost())
    }
}

/// Runs one annealing worker per scenario x replica concurrently,
/// aggregates their best solutions, and arbitrates the final results.
pub struct Race {
    roster: Arc<Roster>,
    group_count: usize,
    model: CostModel,
    scenarios: Vec<ScenarioConfig>,
    options: RaceOptions,
}

impl Race {
    pub fn new(
        roster: Roster,
        group_count: usize,
        scenarios: Vec<ScenarioConfig>,
        options: RaceOptions,
    ) -> GfResult<Self> {
        if group_count == 0 {
            return Err(GroupForgeError::Input(
                "group count must be positive".to_string(),
            ));
        }
        if group_count > roster.len() {
            return Err(GroupForgeError::Input(format!(
                "cannot form {group_count} groups from {} participants",
                roster.len()
            )));
        }
        if scenarios.is_empty() {
            return Err(GroupForgeError::Input(
                "at least one scenario is required".to_string(),
            ));
        }
        for scenario in &scenarios {
            scenario.params.validate()?;
        }
        let model = CostModel::new(&roster, group_count);
        Ok(Self {
            roster: Arc::new(roster),
            group_count,
            model,
            scenarios,
            options,
        })
    }

    pub fn model(&self) -> &CostModel {
        &self.model
    }

    pub fn run<CB: ProgressCallback>(
        &self,
        cancel: &CancelToken,
        callback: &CB,
    ) -> GfResult<RaceResult> {
        let replicas = self.options.resolve_replicas(self.scenarios.len());
        let total_workers = replicas * self.scenarios.len();
        info!(
            participants = self.roster.len(),
            groups = self.group_count,
            scenarios = self.scenarios.len(),
            replicas,
            "race started"
        );

        let (tx, rx) = mpsc::channel::<WorkerEvent>();
        let mut reports: Vec<WorkerReport> = Vec::with_capacity(total_workers);
        let mut board: Vec<ScenarioProgress> = self
            .scenarios
            .iter()
            .map(|s| ScenarioProgress {
                label: s.label.clone(),
                best_cost: None,
                iterations: 0,
                workers_done: 0,
            })
            .collect();
        let mut worker_iters = vec![vec![0u64; replicas]; self.scenarios.len()];
        let started = Instant::now();

        rayon::scope(|scope| {
            // The receiver is owned by the scope body; only Sender
            // clones cross into the workers.
            let rx = rx;
            for (si, scenario) in self.scenarios.iter().enumerate() {
                for replica in 0..replicas {
                    let worker = AnnealWorker::new(
                        si,
                        replica,
                        scenario.clone(),
                        self.roster.clone(),
                        self.group_count,
                        self.options
                            .seed
                            .map(|base| base + (si * replicas + replica) as u64),
                    );
                    let events = tx.clone();
                    let token = cancel.clone();
                    scope.spawn(move |_| {
                        let report = worker.run(&token, &events);
                        let _ = events.send(WorkerEvent::Finished(Box::new(report)));
                    });
                }
            }
            drop(tx);

            let mut finished = 0usize;
            let mut last_callback = Instant::now();
            while finished < total_workers {
                match rx.recv_timeout(Duration::from_millis(100)) {
                    Ok(WorkerEvent::Progress(snap)) => {
                        worker_iters[snap.scenario_index][snap.replica] = snap.iterations;
                        let entry = &mut board[snap.scenario_index];
                        entry.best_cost =
                            Some(entry.best_cost.map_or(snap.best_cost, |c| c.min(snap.best_cost)));
                        entry.iterations = worker_iters[snap.scenario_index].iter().sum();
                    }
                    Ok(WorkerEvent::Finished(report)) => {
                        finished += 1;
                        worker_iters[report.scenario_index][report.replica] = report.iterations;
                        let cost = self.model.points_to_display(report.best.cost());
                        let entry = &mut board[report.scenario_index];
                        entry.best_cost = Some(entry.best_cost.map_or(cost, |c| c.min(cost)));
                        entry.iterations = worker_iters[report.scenario_index].iter().sum();
                        entry.workers_done += 1;
                        reports.push(*report);
                    }
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => break,
                }

                let flush = finished == total_workers
                    || last_callback.elapsed() >= Duration::from_millis(CALLBACK_CADENCE_MS);
                if flush {
                    let progress = RaceProgress {
                        elapsed_secs: started.elapsed().as_secs_f64(),
                        scenarios: board.clone(),
                    };
                    if !callback.on_progress(&progress) {
                        cancel.cancel();
                    }
                    last_callback = Instant::now();
                }
            }
        });

        self.conclude(reports)
    }

    /// Per-scenario best selection, arbitration, and champion promotion.
    fn conclude(&self, reports: Vec<WorkerReport>) -> GfResult<RaceResult> {
        let arbiter = Arbiter::new(self.roster.clone(), self.model, self.group_count);
        let mut outcomes = Vec::with_capacity(self.scenarios.len());

        for (si, scenario) in self.scenarios.iter().enumerate() {
            let mine: Vec<&WorkerReport> =
                reports.iter().filter(|r| r.scenario_index == si).collect();
            let best = mine
                .iter()
                .min_by_key(|r| r.best.cost())
                .ok_or_else(|| {
                    GroupForgeError::ResultInvalid(format!(
                        "scenario '{}' produced no worker reports",
                        scenario.label
                    ))
                })?;

            let solution = arbiter.finalize(best.best.assignment(), scenario.constrain_advantaged)?;
            let report = solution.report(&self.model);
            let cost = self.model.points_to_display(solution.cost());
            let iterations = mine.iter().map(|r| r.iterations).sum();
            let elapsed = mine.iter().map(|r| r.elapsed).max().unwrap_or_default();
            let cancelled = mine
                .iter()
                .any(|r| r.stop_reason == StopReason::Cancelled);
            let drift_repairs = mine.iter().map(|r| r.drift_repairs).sum();

            info!(
                scenario = %scenario.label,
                cost,
                iterations,
                cancelled,
                "scenario concluded"
            );
            outcomes.push(ScenarioOutcome {
                scenario: scenario.clone(),
                solution,
                report,
                cost,
                iterations,
                elapsed,
                cancelled,
                promoted: false,
                drift_repairs,
            });
        }

        // A balanced-advantage partition is also a valid unconstrained
        // partition, so a constrained result that ties or beats an
        // unconstrained one replaces it outright.
        let champion = outcomes
            .iter()
            .filter(|o| o.scenario.constrain_advantaged)
            .min_by_key(|o| o.solution.cost())
            .map(|o| (o.solution.clone(), o.report.clone(), o.cost));
        if let Some((solution, report, cost)) = champion {
            for outcome in outcomes
                .iter_mut()
                .filter(|o| !o.scenario.constrain_advantaged)
            {
                if solution.cost() <= outcome.solution.cost() {
                    info!(
                        scenario = %outcome.scenario.label,
                        "constrained champion promoted over unconstrained result"
                    );
                    outcome.solution = solution.clone();
                    outcome.report = report.clone();
                    outcome.cost = cost;
                    outcome.promoted = true;
                }
            }
        }

        Ok(RaceResult {
            scenarios: outcomes,
        })
    }
}
