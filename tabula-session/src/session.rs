//! Session state
//!
//! Each session owns its dataset, the derived schema snapshot, and an
//! append-only turn log. No cross-session references exist anywhere:
//! isolation is structural, not conventional.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tabula_context::extract_schema;
use tabula_core::{new_session_id, Dataset, SchemaDescriptor, SessionId, Timestamp, Turn};
use tokio::sync::{Mutex, RwLock};

// ============================================================================
// TURN LOG
// ============================================================================

/// Append-only ordered log of turns. There is deliberately no API to
/// remove or rewrite an entry; the log is the audit trail.
#[derive(Debug, Clone, Default)]
pub struct TurnLog {
    turns: Vec<Turn>,
}

impl TurnLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self { turns: Vec::new() }
    }

    /// Append a turn and return a reference to the stored entry.
    pub fn append(&mut self, turn: Turn) -> &Turn {
        self.turns.push(turn);
        self.turns.last().expect("just pushed")
    }

    /// Most recent `n` turns, in insertion order.
    pub fn recent(&self, n: usize) -> &[Turn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    /// The full history, for audit and export.
    pub fn history(&self) -> &[Turn] {
        &self.turns
    }

    /// Number of recorded turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

// ============================================================================
// SESSION
// ============================================================================

/// One analysis conversation over one dataset.
#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: SessionId,
    pub created_at: Timestamp,
    dataset: Dataset,
    descriptor: SchemaDescriptor,
    log: TurnLog,
}

impl Session {
    /// Create a session owning `dataset`. The schema snapshot is
    /// derived immediately with `sample_cap` samples per column.
    pub fn new(dataset: Dataset, sample_cap: usize) -> Self {
        let descriptor = extract_schema(&dataset, sample_cap);
        Self {
            session_id: new_session_id(),
            created_at: Utc::now(),
            dataset,
            descriptor,
            log: TurnLog::new(),
        }
    }

    /// The dataset under analysis, read-only.
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// The current schema snapshot.
    pub fn descriptor(&self) -> &SchemaDescriptor {
        &self.descriptor
    }

    /// The turn log.
    pub fn log(&self) -> &TurnLog {
        &self.log
    }

    /// Record a completed turn.
    pub fn record(&mut self, turn: Turn) -> &Turn {
        self.log.append(turn)
    }

    /// Replace the dataset and start a fresh conversation. A new
    /// dataset invalidates prior context, so the log restarts; the
    /// previous history can be exported first via [`Session::log`].
    pub fn replace_dataset(&mut self, dataset: Dataset, sample_cap: usize) {
        self.descriptor = extract_schema(&dataset, sample_cap);
        self.dataset = dataset;
        self.log = TurnLog::new();
    }
}

// ============================================================================
// SESSION MANAGER
// ============================================================================

/// Registry of live sessions. The map is read-locked briefly to fetch
/// a handle; each session then serializes its own turns behind its own
/// mutex, so distinct sessions never contend.
#[derive(Debug, Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<SessionId, Arc<Mutex<Session>>>>,
}

impl SessionManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Insert a session, returning its id.
    pub async fn insert(&self, session: Session) -> SessionId {
        let id = session.session_id;
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(session)));
        id
    }

    /// Fetch a handle to a session.
    pub async fn get(&self, session_id: SessionId) -> Option<Arc<Mutex<Session>>> {
        self.sessions.read().await.get(&session_id).cloned()
    }

    /// Drop a session entirely (UI session ended).
    pub async fn remove(&self, session_id: SessionId) -> bool {
        self.sessions.write().await.remove(&session_id).is_some()
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether no sessions are live.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

// ============================================================================
// TESTS
// ============================================================================


// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
