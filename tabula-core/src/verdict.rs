//! Policy verdict types
//!
//! The Policy Gate's output. Code with one or more violations is never
//! executed; the verdict travels with the turn so the caller can show
//! the user exactly why a program was refused.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of policy violation found in generated code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationKind {
    /// The code text could not be parsed at all.
    ParseError,
    /// Import of a module outside the approved allowlist.
    DisallowedImport,
    /// Call to a function or method outside the allowlist.
    ForbiddenCall,
    /// Access to a double-underscore object-protocol member.
    DunderAccess,
    /// Attribute read outside the allowed property surface.
    ForbiddenAttribute,
    /// Reference to a name outside the permitted bindings.
    UndeclaredName,
    /// Assignment to anything other than the result binding.
    ForbiddenAssignment,
    /// Statement form outside expression/assignment/simple control.
    DisallowedStatement,
    /// Loop whose iteration is not statically bounded.
    UnboundedLoop,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ViolationKind::ParseError => "parse_error",
            ViolationKind::DisallowedImport => "disallowed_import",
            ViolationKind::ForbiddenCall => "forbidden_call",
            ViolationKind::DunderAccess => "dunder_access",
            ViolationKind::ForbiddenAttribute => "forbidden_attribute",
            ViolationKind::UndeclaredName => "undeclared_name",
            ViolationKind::ForbiddenAssignment => "forbidden_assignment",
            ViolationKind::DisallowedStatement => "disallowed_statement",
            ViolationKind::UnboundedLoop => "unbounded_loop",
        };
        write!(f, "{}", s)
    }
}

/// One policy violation with its source location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub message: String,
    pub line: usize,
    pub column: usize,
}

impl Violation {
    /// Create a violation at a source location.
    pub fn new(kind: ViolationKind, message: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            kind,
            message: message.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at line {}, column {}: {}",
            self.kind, self.line, self.column, self.message
        )
    }
}

/// Result of validating one generated program.
///
/// `allowed` is true exactly when `violations` is empty; the
/// constructors maintain that invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyVerdict {
    pub allowed: bool,
    pub violations: Vec<Violation>,
}

impl PolicyVerdict {
    /// A verdict that permits execution.
    pub fn allow() -> Self {
        Self {
            allowed: true,
            violations: Vec::new(),
        }
    }

    /// A verdict that refuses execution with the collected violations.
    /// An empty list is treated as a refusal with no detail, which the
    /// gate never produces; callers should pass every violation found.
    pub fn deny(violations: Vec<Violation>) -> Self {
        Self {
            allowed: false,
            violations,
        }
    }

    /// Distinct violation kinds in first-occurrence order.
    pub fn kinds(&self) -> Vec<ViolationKind> {
        let mut kinds = Vec::new();
        for v in &self.violations {
            if !kinds.contains(&v.kind) {
                kinds.push(v.kind);
            }
        }
        kinds
    }

    /// Human-readable summary of every violation, one per line.
    pub fn summary(&self) -> String {
        self.violations
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_has_no_violations() {
        let verdict = PolicyVerdict::allow();
        assert!(verdict.allowed);
        assert!(verdict.violations.is_empty());
    }

    #[test]
    fn test_deny_keeps_violation_order() {
        let verdict = PolicyVerdict::deny(vec![
            Violation::new(ViolationKind::DisallowedImport, "import os", 1, 1),
            Violation::new(ViolationKind::ForbiddenCall, "os.system", 1, 12),
        ]);
        assert!(!verdict.allowed);
        assert_eq!(verdict.violations.len(), 2);
        assert_eq!(verdict.violations[0].kind, ViolationKind::DisallowedImport);
        assert_eq!(verdict.violations[1].kind, ViolationKind::ForbiddenCall);
    }

    #[test]
    fn test_kinds_deduplicates_preserving_order() {
        let verdict = PolicyVerdict::deny(vec![
            Violation::new(ViolationKind::ForbiddenCall, "eval", 1, 1),
            Violation::new(ViolationKind::ForbiddenCall, "exec", 2, 1),
            Violation::new(ViolationKind::DunderAccess, "__class__", 3, 1),
        ]);
        assert_eq!(
            verdict.kinds(),
            vec![ViolationKind::ForbiddenCall, ViolationKind::DunderAccess]
        );
    }

    #[test]
    fn test_summary_lists_every_violation() {
        let verdict = PolicyVerdict::deny(vec![
            Violation::new(ViolationKind::DisallowedImport, "import of os", 1, 1),
            Violation::new(ViolationKind::UndeclaredName, "name os", 2, 10),
        ]);
        let summary = verdict.summary();
        assert!(summary.contains("disallowed_import"));
        assert!(summary.contains("undeclared_name"));
        assert!(summary.contains("line 2, column 10"));
    }
}
