/// Fixed-point multiplier applied to raw scores at ingestion.
/// All cost arithmetic happens on scaled integers; floats only appear
/// at the reporting boundary.
pub const SCORE_SCALE: i64 = 100_000;

/// Largest accepted raw score magnitude. Keeps every aggregate
/// (grand total, per-group deviation numerator) inside i64/i128 range.
pub const MAX_RAW_SCORE: f64 = 10_000_000.0;

/// Default number of hot-loop iterations between full aggregate
/// recomputations.
pub const DEFAULT_PARANOID_INTERVAL: u64 = 500;

/// Default wall-clock budget per worker (seconds).
pub const DEFAULT_TIME_BUDGET_SECS: u64 = 900;

/// Minimum interval between orchestrator progress callbacks (ms).
pub const CALLBACK_CADENCE_MS: u64 = 200;
