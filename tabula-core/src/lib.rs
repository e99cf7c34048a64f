//! TABULA Core - Data Types
//!
//! Pure data structures with no behavior beyond construction and
//! formatting. All other TABULA crates depend on this. This crate
//! contains ONLY data types - no parsing, no validation walks, no
//! interpretation.

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

mod config;
mod dataset;
mod error;
mod result;
mod schema;
mod turn;
mod verdict;

pub use config::{ExecLimits, LlmConfig, PromptLimits, TabulaConfig};
pub use dataset::{CellValue, Column, Dataset};
pub use error::{
    ConfigError, DatasetError, ExecError, LlmError, SessionError, TabulaError, TabulaResult,
};
pub use result::{ExecutionResult, FailureKind, TableResult};
pub use schema::{ColumnDescriptor, ColumnType, SchemaDescriptor};
pub use turn::Turn;
pub use verdict::{PolicyVerdict, Violation, ViolationKind};

// ============================================================================
// IDENTITY TYPES
// ============================================================================

/// Session identifier using UUIDv7 for timestamp-sortable IDs.
pub type SessionId = Uuid;

/// Turn identifier using UUIDv7 for timestamp-sortable IDs.
pub type TurnId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// SHA-256 content hash used for dataset integrity verification.
pub type ContentHash = [u8; 32];

/// Generate a new UUIDv7 SessionId (timestamp-sortable).
pub fn new_session_id() -> SessionId {
    Uuid::now_v7()
}

/// Generate a new UUIDv7 TurnId (timestamp-sortable).
pub fn new_turn_id() -> TurnId {
    Uuid::now_v7()
}

/// Compute SHA-256 hash of content.
pub fn compute_content_hash(content: &[u8]) -> ContentHash {
    let mut hasher = Sha256::new();
    hasher.update(content);
    let result = hasher.finalize();
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&result);
    hash
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_ids_are_unique() {
        let a = new_session_id();
        let b = new_session_id();
        assert_ne!(a, b);
    }

    #[test]
    fn test_content_hash_is_deterministic() {
        let h1 = compute_content_hash(b"hello");
        let h2 = compute_content_hash(b"hello");
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_content_hash_differs_on_different_input() {
        let h1 = compute_content_hash(b"hello");
        let h2 = compute_content_hash(b"hello!");
        assert_ne!(h1, h2);
    }
}
