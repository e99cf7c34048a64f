//! Result envelope types
//!
//! Everything an execution produces is normalized into the tagged
//! `ExecutionResult` before it reaches a caller or the turn log.

use crate::dataset::CellValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Failure taxonomy for a turn.
///
/// Every failure anywhere in the pipeline is converted into one of
/// these kinds on an `Error` result; nothing propagates as an uncaught
/// fault and nothing is silently swallowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// Generated code was not parseable.
    ParseError,
    /// Generated code contained disallowed constructs; never executed.
    PolicyViolation,
    /// Execution exceeded the wall-clock limit.
    Timeout,
    /// Execution exceeded a fuel/iteration/size ceiling.
    ResourceLimitExceeded,
    /// Execution started but raised or crashed.
    RuntimeFailure,
    /// Execution produced a value the envelope cannot represent.
    UnsupportedResultShape,
    /// The LLM could not be reached, after the single permitted retry.
    LlmUnavailable,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureKind::ParseError => "parse_error",
            FailureKind::PolicyViolation => "policy_violation",
            FailureKind::Timeout => "timeout",
            FailureKind::ResourceLimitExceeded => "resource_limit_exceeded",
            FailureKind::RuntimeFailure => "runtime_failure",
            FailureKind::UnsupportedResultShape => "unsupported_result_shape",
            FailureKind::LlmUnavailable => "llm_unavailable",
        };
        write!(f, "{}", s)
    }
}

/// A tabular result, possibly truncated to fit the envelope caps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
    /// True when rows or columns were dropped to fit the caps.
    /// Truncation is always flagged, never silent.
    pub truncated: bool,
}

impl TableResult {
    /// Number of rows retained in the envelope.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// CSV-style preview, header plus at most `max_rows` rows.
    pub fn preview(&self, max_rows: usize) -> String {
        let mut out = self.columns.join(",");
        for row in self.rows.iter().take(max_rows) {
            out.push('\n');
            let line = row
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(",");
            out.push_str(&line);
        }
        out
    }
}

/// Normalized outcome of one turn's execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExecutionResult {
    /// A single value answer.
    Scalar(CellValue),
    /// A tabular answer.
    Table(TableResult),
    /// Any failure, tagged with its kind.
    Error { kind: FailureKind, message: String },
}

impl ExecutionResult {
    /// Build an error result.
    pub fn error(kind: FailureKind, message: impl Into<String>) -> Self {
        ExecutionResult::Error {
            kind,
            message: message.into(),
        }
    }

    /// Whether this result is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, ExecutionResult::Error { .. })
    }

    /// The failure kind, if this result is an error.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            ExecutionResult::Error { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// One-line-or-short preview used by prompt history and business
    /// summaries.
    pub fn preview(&self, max_rows: usize) -> String {
        match self {
            ExecutionResult::Scalar(v) => v.to_string(),
            ExecutionResult::Table(t) => t.preview(max_rows),
            ExecutionResult::Error { kind, message } => format!("error ({}): {}", kind, message),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_preview() {
        let r = ExecutionResult::Scalar(CellValue::Float(35.0));
        assert_eq!(r.preview(20), "35");
    }

    #[test]
    fn test_table_preview_caps_rows() {
        let t = TableResult {
            columns: vec!["x".to_string()],
            rows: (0..10).map(|i| vec![CellValue::Int(i)]).collect(),
            truncated: false,
        };
        let preview = t.preview(3);
        assert_eq!(preview.lines().count(), 4); // header + 3 rows
        assert!(preview.starts_with("x\n0"));
    }

    #[test]
    fn test_error_result_accessors() {
        let r = ExecutionResult::error(FailureKind::PolicyViolation, "refused");
        assert!(r.is_error());
        assert_eq!(r.failure_kind(), Some(FailureKind::PolicyViolation));
        assert!(r.preview(5).contains("policy_violation"));
    }

    #[test]
    fn test_scalar_is_not_error() {
        let r = ExecutionResult::Scalar(CellValue::Int(1));
        assert!(!r.is_error());
        assert_eq!(r.failure_kind(), None);
    }
}
