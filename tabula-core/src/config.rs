//! Configuration types

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Containment ceilings for sandboxed execution.
///
/// All limits are enforced by the host harness, outside the executed
/// code's control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecLimits {
    /// Wall-clock limit for one execution.
    pub timeout: Duration,
    /// Evaluation steps before the run is cut off.
    pub max_fuel: u64,
    /// Iteration ceiling per loop, and the cap on `range(n)` literals
    /// the gate will accept.
    pub max_loop_iterations: u64,
    /// Row cap for the result envelope.
    pub max_result_rows: usize,
    /// Column cap for the result envelope.
    pub max_result_cols: usize,
    /// Ceiling on cells materialized by intermediate values.
    pub max_cells: u64,
}

impl Default for ExecLimits {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_fuel: 250_000,
            max_loop_iterations: 10_000,
            max_result_rows: 100,
            max_result_cols: 32,
            max_cells: 2_000_000,
        }
    }
}

/// Bounds on prompt assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptLimits {
    /// Most recent turns included as conversation history.
    pub history_window: usize,
    /// Sample values retained per column in the schema block.
    pub sample_values: usize,
    /// Rows of a prior result shown in history previews.
    pub preview_rows: usize,
}

impl Default for PromptLimits {
    fn default() -> Self {
        Self {
            history_window: 4,
            sample_values: 5,
            preview_rows: 20,
        }
    }
}

/// LLM boundary configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Per-request transport timeout.
    pub request_timeout: Duration,
    /// Whether the single transient-failure retry is enabled.
    pub retry_transient: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            retry_transient: true,
        }
    }
}

/// Master configuration for the analysis pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TabulaConfig {
    pub exec: ExecLimits,
    pub prompt: PromptLimits,
    pub llm: LlmConfig,
}

impl TabulaConfig {
    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `TABULA_EXEC_TIMEOUT_MS`: execution wall-clock limit (default: 5000)
    /// - `TABULA_EXEC_MAX_FUEL`: evaluation step budget (default: 250000)
    /// - `TABULA_EXEC_MAX_LOOP_ITERATIONS`: per-loop ceiling (default: 10000)
    /// - `TABULA_EXEC_MAX_RESULT_ROWS`: envelope row cap (default: 100)
    /// - `TABULA_PROMPT_HISTORY_WINDOW`: history turns in prompt (default: 4)
    /// - `TABULA_PROMPT_SAMPLE_VALUES`: samples per column (default: 5)
    /// - `TABULA_LLM_TIMEOUT_MS`: LLM request timeout (default: 30000)
    /// - `TABULA_LLM_RETRY`: enable the single transient retry (default: true)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        fn parse_var<T: std::str::FromStr>(name: &str, fallback: T) -> T {
            std::env::var(name)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(fallback)
        }

        Self {
            exec: ExecLimits {
                timeout: Duration::from_millis(parse_var(
                    "TABULA_EXEC_TIMEOUT_MS",
                    defaults.exec.timeout.as_millis() as u64,
                )),
                max_fuel: parse_var("TABULA_EXEC_MAX_FUEL", defaults.exec.max_fuel),
                max_loop_iterations: parse_var(
                    "TABULA_EXEC_MAX_LOOP_ITERATIONS",
                    defaults.exec.max_loop_iterations,
                ),
                max_result_rows: parse_var(
                    "TABULA_EXEC_MAX_RESULT_ROWS",
                    defaults.exec.max_result_rows,
                ),
                max_result_cols: defaults.exec.max_result_cols,
                max_cells: defaults.exec.max_cells,
            },
            prompt: PromptLimits {
                history_window: parse_var(
                    "TABULA_PROMPT_HISTORY_WINDOW",
                    defaults.prompt.history_window,
                ),
                sample_values: parse_var(
                    "TABULA_PROMPT_SAMPLE_VALUES",
                    defaults.prompt.sample_values,
                ),
                preview_rows: defaults.prompt.preview_rows,
            },
            llm: LlmConfig {
                request_timeout: Duration::from_millis(parse_var(
                    "TABULA_LLM_TIMEOUT_MS",
                    defaults.llm.request_timeout.as_millis() as u64,
                )),
                retry_transient: parse_var("TABULA_LLM_RETRY", defaults.llm.retry_transient),
            },
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.exec.timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "exec.timeout".to_string(),
                value: format!("{:?}", self.exec.timeout),
                reason: "timeout must be positive".to_string(),
            });
        }
        if self.exec.max_fuel == 0 {
            return Err(ConfigError::InvalidValue {
                field: "exec.max_fuel".to_string(),
                value: "0".to_string(),
                reason: "fuel budget must be positive".to_string(),
            });
        }
        if self.exec.max_loop_iterations == 0 {
            return Err(ConfigError::InvalidValue {
                field: "exec.max_loop_iterations".to_string(),
                value: "0".to_string(),
                reason: "loop ceiling must be positive".to_string(),
            });
        }
        if self.exec.max_result_rows == 0 || self.exec.max_result_cols == 0 {
            return Err(ConfigError::InvalidValue {
                field: "exec.max_result_rows".to_string(),
                value: format!(
                    "{}x{}",
                    self.exec.max_result_rows, self.exec.max_result_cols
                ),
                reason: "result caps must be positive".to_string(),
            });
        }
        if self.llm.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "llm.request_timeout".to_string(),
                value: format!("{:?}", self.llm.request_timeout),
                reason: "request timeout must be positive".to_string(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(TabulaConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = TabulaConfig::default();
        config.exec.timeout = Duration::ZERO;
        let err = config.validate().unwrap_err();
        assert!(format!("{}", err).contains("exec.timeout"));
    }

    #[test]
    fn test_zero_fuel_rejected() {
        let mut config = TabulaConfig::default();
        config.exec.max_fuel = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_result_caps_rejected() {
        let mut config = TabulaConfig::default();
        config.exec.max_result_rows = 0;
        assert!(config.validate().is_err());
    }
}
