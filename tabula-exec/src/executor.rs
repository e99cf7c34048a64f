//! Executor facade
//!
//! Wraps the interpreter with the containment contract: single
//! attempt, hard limits, and a dataset integrity check before and
//! after every run.

use crate::interp::Interpreter;
use crate::normalize::normalize;
use crate::value::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use tabula_core::{Dataset, ExecError, ExecLimits, ExecutionResult};
use tabula_lang::Program;

/// Sandboxed executor. Holds no per-run state, so one instance is
/// safely callable from any number of sessions in parallel; the run
/// counter is the only (atomic) bookkeeping.
#[derive(Debug)]
pub struct Executor {
    limits: ExecLimits,
    runs: AtomicU64,
}

impl Executor {
    /// Create an executor with the given containment limits.
    pub fn new(limits: ExecLimits) -> Self {
        Self {
            limits,
            runs: AtomicU64::new(0),
        }
    }

    /// Run a validated program against a dataset, returning the raw
    /// result value. Single attempt, never retried.
    pub fn run(&self, program: &Program, dataset: &Dataset) -> Result<Value, ExecError> {
        self.runs.fetch_add(1, Ordering::Relaxed);

        let hash_before = dataset.content_hash();
        let result = Interpreter::new(dataset, &self.limits).run(program);

        // The dataset is borrowed immutably, so a mismatch here means
        // the containment model itself was broken.
        if dataset.content_hash() != hash_before {
            return Err(ExecError::RuntimeFailure {
                message: "dataset was mutated during execution".to_string(),
            });
        }

        result
    }

    /// Run a validated program and normalize the outcome into the
    /// result envelope.
    pub fn execute(&self, program: &Program, dataset: &Dataset) -> ExecutionResult {
        match self.run(program, dataset) {
            Ok(value) => normalize(value, &self.limits),
            Err(err) => ExecutionResult::error(err.failure_kind(), err.to_string()),
        }
    }

    /// Number of runs attempted since construction. Lets callers and
    /// tests observe that rejected code never reached execution.
    pub fn executions(&self) -> u64 {
        self.runs.load(Ordering::Relaxed)
    }

    /// The containment limits this executor enforces.
    pub fn limits(&self) -> &ExecLimits {
        &self.limits
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new(ExecLimits::default())
    }
}

// ============================================================================
// TESTS
// ============================================================================
