//! TABULA Session - Session State and Analysis Engine
//!
//! Owns the per-session state (dataset, schema snapshot, append-only
//! turn log) and orchestrates a full turn: question to prompt to
//! generated code, through the policy gate, into the sandbox, and back
//! out as a recorded Turn. One question is processed end-to-end at a
//! time within a session; sessions share nothing mutable with each
//! other.

mod chart;
mod engine;
mod session;

pub use chart::{suggest_chart, ChartKind, ChartSpec};
pub use engine::AnalystEngine;
pub use session::{Session, SessionManager, TurnLog};
