//! Turn types
//!
//! One question/answer exchange, recorded permanently in the session
//! log. Turns are append-only: once constructed they are never edited.

use crate::result::{ExecutionResult, FailureKind};
use crate::verdict::PolicyVerdict;
use crate::{new_turn_id, Timestamp, TurnId};
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// One recorded question/answer exchange.
///
/// The constructors encode the pipeline invariant: a non-error result
/// only exists behind an allowing verdict, and a rejected verdict
/// always carries an `Error` result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub turn_id: TurnId,
    pub question: String,
    /// The code the LLM produced, verbatim. `None` only when the LLM
    /// was unreachable and no code ever arrived.
    pub generated_code: Option<String>,
    /// The gate's judgement. `None` only alongside `generated_code: None`.
    pub verdict: Option<PolicyVerdict>,
    pub result: ExecutionResult,
    pub created_at: Timestamp,
}

impl Turn {
    /// A turn whose code passed the gate and was executed.
    pub fn executed(
        question: impl Into<String>,
        code: impl Into<String>,
        verdict: PolicyVerdict,
        result: ExecutionResult,
    ) -> Self {
        Self {
            turn_id: new_turn_id(),
            question: question.into(),
            generated_code: Some(code.into()),
            verdict: Some(verdict),
            result,
            created_at: Utc::now(),
        }
    }

    /// A turn whose code the gate refused; the executor was never
    /// invoked and the result carries every violation verbatim.
    pub fn denied(
        question: impl Into<String>,
        code: impl Into<String>,
        verdict: PolicyVerdict,
    ) -> Self {
        let kind = if verdict
            .kinds()
            .first()
            .is_some_and(|k| *k == crate::ViolationKind::ParseError)
        {
            FailureKind::ParseError
        } else {
            FailureKind::PolicyViolation
        };
        let result = ExecutionResult::error(kind, verdict.summary());
        Self {
            turn_id: new_turn_id(),
            question: question.into(),
            generated_code: Some(code.into()),
            verdict: Some(verdict),
            result,
            created_at: Utc::now(),
        }
    }

    /// A turn where the LLM was unreachable after the permitted retry.
    pub fn unavailable(question: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            turn_id: new_turn_id(),
            question: question.into(),
            generated_code: None,
            verdict: None,
            result: ExecutionResult::error(FailureKind::LlmUnavailable, message),
            created_at: Utc::now(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
