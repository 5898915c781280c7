pub mod moves;
pub mod runner;
pub mod seed;
pub mod worker;

pub use self::runner::{
    ProgressCallback, Race, RaceOptions, RaceProgress, RaceResult, ScenarioOutcome,
    ScenarioProgress, SilentProgress,
};
pub use self::worker::{AnnealWorker, ProgressSnapshot, StopReason, WorkerReport};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag shared by every worker in a race.
/// Workers check it once per iteration and still finalize their best
/// solution when it trips.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Messages workers push onto the orchestrator channel. Workers never
/// share state directly; this channel and the CancelToken are the only
/// cross-thread traffic.
pub enum WorkerEvent {
    Progress(ProgressSnapshot),
    Finished(Box<WorkerReport>),
}
