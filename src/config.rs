use crate::consts::{DEFAULT_PARANOID_INTERVAL, DEFAULT_TIME_BUDGET_SECS};
use crate::error::{GfResult, GroupForgeError};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Args, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchParams {
    /// Wall-clock budget per worker, in seconds.
    #[arg(long, default_value_t = DEFAULT_TIME_BUDGET_SECS)]
    pub time_budget_secs: u64,

    /// Hard iteration cap per worker. 0 means time budget only.
    #[arg(long, default_value_t = 0)]
    pub max_iterations: u64,

    // === Cooling schedule ===
    #[arg(long, default_value_t = 400.0)]
    pub temp_initial: f64,
    #[arg(long, default_value_t = 0.9999)]
    pub cooling_factor: f64,
    #[arg(long, default_value_t = 0.001)]
    pub temp_floor: f64,

    // === Reheat / stagnation escape ===
    #[arg(long, default_value_t = 0.4)]
    pub reheat_fraction: f64,
    #[arg(long, default_value_t = 20_000)]
    pub reheat_after: u64,
    #[arg(long, default_value_t = 12)]
    pub reheat_burst: usize,
    #[arg(long, default_value_t = 40)]
    pub max_stale_reheats: u32,

    // === Move selection ===
    #[arg(long, default_value_t = 0.8)]
    pub swap_probability: f64,
    #[arg(long, default_value_t = 3)]
    pub focus_window: usize,
    #[arg(long, default_value_t = 0.25)]
    pub explore_ratio: f64,
    #[arg(long, default_value_t = 64)]
    pub focus_refresh: u64,
    #[arg(long, default_value_t = 8)]
    pub constraint_retries: usize,

    // === Integrity & finalization ===
    /// Iterations between full aggregate recomputations. 0 disables the
    /// reconciliation pass.
    #[arg(long, default_value_t = DEFAULT_PARANOID_INTERVAL)]
    pub paranoid_interval: u64,
    #[arg(long, default_value_t = 2000)]
    pub polish_iterations: usize,

    // === Progress reporting ===
    #[arg(long, default_value_t = 50_000)]
    pub progress_iterations: u64,
    #[arg(long, default_value_t = 250)]
    pub progress_min_ms: u64,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            time_budget_secs: DEFAULT_TIME_BUDGET_SECS,
            max_iterations: 0,
            temp_initial: 400.0,
            cooling_factor: 0.9999,
            temp_floor: 0.001,
            reheat_fraction: 0.4,
            reheat_after: 20_000,
            reheat_burst: 12,
            max_stale_reheats: 40,
            swap_probability: 0.8,
            focus_window: 3,
            explore_ratio: 0.25,
            focus_refresh: 64,
            constraint_retries: 8,
            paranoid_interval: DEFAULT_PARANOID_INTERVAL,
            polish_iterations: 2000,
            progress_iterations: 50_000,
            progress_min_ms: 250,
        }
    }
}

impl SearchParams {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> GfResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn validate(&self) -> GfResult<()> {
        if self.temp_initial <= 0.0 {
            return Err(config_err("temp_initial must be positive"));
        }
        if !(self.cooling_factor > 0.0 && self.cooling_factor < 1.0) {
            return Err(config_err("cooling_factor must lie in (0, 1)"));
        }
        if self.temp_floor <= 0.0 || self.temp_floor >= self.temp_initial {
            return Err(config_err("temp_floor must sit between 0 and temp_initial"));
        }
        if !(0.0..=1.0).contains(&self.reheat_fraction) {
            return Err(config_err("reheat_fraction must lie in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.swap_probability) {
            return Err(config_err("swap_probability must lie in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&self.explore_ratio) {
            return Err(config_err("explore_ratio must lie in [0, 1]"));
        }
        if self.focus_window == 0 {
            return Err(config_err("focus_window must be at least 1"));
        }
        if self.focus_refresh == 0 || self.progress_iterations == 0 {
            return Err(config_err(
                "focus_refresh and progress_iterations must be at least 1",
            ));
        }
        Ok(())
    }
}

fn config_err(msg: &str) -> GroupForgeError {
    GroupForgeError::Config(msg.to_string())
}

/// One search scenario. Constraint behavior is a plain predicate value;
/// constrained and unconstrained runs share one worker implementation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioConfig {
    pub label: String,
    pub constrain_advantaged: bool,
    pub params: SearchParams,
}

impl ScenarioConfig {
    pub fn constrained(params: SearchParams) -> Self {
        Self {
            label: "Constrained".to_string(),
            constrain_advantaged: true,
            params,
        }
    }

    pub fn unconstrained(params: SearchParams) -> Self {
        Self {
            label: "Unconstrained".to_string(),
            constrain_advantaged: false,
            params,
        }
    }
}

/// The canonical race: one constrained and one unconstrained scenario
/// sharing the same search parameters.
pub fn default_scenarios(params: &SearchParams) -> Vec<ScenarioConfig> {
    vec![
        ScenarioConfig::constrained(params.clone()),
        ScenarioConfig::unconstrained(params.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass_validation() {
        SearchParams::default().validate().unwrap();
    }

    #[test]
    fn bad_cooling_factor_is_rejected() {
        let params = SearchParams {
            cooling_factor: 1.5,
            ..Default::default()
        };
        assert!(params.validate().is_err());
    }
}
