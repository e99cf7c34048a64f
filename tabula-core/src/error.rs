//! Error types for TABULA operations

use crate::result::FailureKind;
use crate::SessionId;
use thiserror::Error;

/// Dataset construction errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DatasetError {
    #[error("Duplicate column name: {name}")]
    DuplicateColumn { name: String },

    #[error("Column {name} has {got} rows, expected {expected}")]
    RaggedColumn {
        name: String,
        expected: usize,
        got: usize,
    },

    #[error("Column names must not be empty")]
    EmptyColumnName,
}

/// Sandboxed execution errors.
///
/// Exactly the executor contract: a run either returns a raw value or
/// fails with one of these. Validation rejections never reach here.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecError {
    #[error("Execution exceeded the {limit_ms}ms wall-clock limit")]
    Timeout { limit_ms: u64 },

    #[error("Resource limit exceeded: {resource} (limit {limit})")]
    ResourceLimitExceeded { resource: &'static str, limit: u64 },

    #[error("Runtime failure: {message}")]
    RuntimeFailure { message: String },
}

impl ExecError {
    /// The failure kind this error maps to in a result envelope.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            ExecError::Timeout { .. } => FailureKind::Timeout,
            ExecError::ResourceLimitExceeded { .. } => FailureKind::ResourceLimitExceeded,
            ExecError::RuntimeFailure { .. } => FailureKind::RuntimeFailure,
        }
    }
}

/// LLM provider errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LlmError {
    #[error("No LLM provider configured")]
    ProviderNotConfigured,

    #[error("Provider {provider} unavailable: {message}")]
    Unavailable { provider: String, message: String },

    #[error("Rate limited by {provider}")]
    RateLimited { provider: String },

    #[error("Invalid API key for {provider}")]
    InvalidApiKey { provider: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

impl LlmError {
    /// Whether this failure is transient transport trouble worth the
    /// single retry the engine is allowed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmError::Unavailable { .. } | LlmError::RateLimited { .. }
        )
    }
}

/// Session management errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found: {session_id}")]
    NotFound { session_id: SessionId },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Master error type for all TABULA errors.
#[derive(Debug, Clone, Error)]
pub enum TabulaError {
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Execution error: {0}")]
    Exec(#[from] ExecError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for TABULA operations.
pub type TabulaResult<T> = Result<T, TabulaError>;

// ============================================================================
// TESTS
// ============================================================================
