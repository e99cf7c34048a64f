//! Validator implementation

use crate::allowlist::{
    ALLOWED_IMPORTS, BUILTIN_FUNCTIONS, DATASET_BINDING, LIBRARY_FUNCTIONS, PROPERTIES,
    RESULT_BINDING, TABULAR_METHODS,
};
use std::collections::HashSet;
use tabula_core::{ExecLimits, PolicyVerdict, Violation, ViolationKind};
use tabula_lang::{parse_source, Expr, ExprKind, Index, Program, Stmt, StmtKind};

// ============================================================================
// VALIDATOR
// ============================================================================

/// The policy gate. Stateless between calls and safely shareable
/// across sessions; every judgement works on a fresh walk.
#[derive(Debug, Clone)]
pub struct Validator {
    /// Iteration ceiling accepted for `range(n)` literals. Matches the
    /// executor's per-loop ceiling so a pass here is meaningful there.
    max_range_literal: u64,
}

impl Validator {
    /// Create a validator with default limits.
    pub fn new() -> Self {
        Self::with_limits(&ExecLimits::default())
    }

    /// Create a validator aligned with the given execution limits.
    pub fn with_limits(limits: &ExecLimits) -> Self {
        Self {
            max_range_literal: limits.max_loop_iterations,
        }
    }

    /// Parse and validate a code text.
    ///
    /// Returns the verdict, plus the parsed program when (and only
    /// when) the verdict allows execution, so the caller never
    /// re-parses on the happy path. Unparseable code yields a
    /// `ParseError` verdict and the executor is never invoked.
    pub fn validate_source(&self, code: &str) -> (PolicyVerdict, Option<Program>) {
        match parse_source(code) {
            Ok(program) => {
                let verdict = self.validate_program(&program);
                if verdict.allowed {
                    (verdict, Some(program))
                } else {
                    (verdict, None)
                }
            }
            Err(err) => {
                let verdict = PolicyVerdict::deny(vec![Violation::new(
                    ViolationKind::ParseError,
                    err.message.clone(),
                    err.line,
                    err.column,
                )]);
                log_denial(&verdict);
                (verdict, None)
            }
        }
    }

    /// Validate an already-parsed program.
    pub fn validate_program(&self, program: &Program) -> PolicyVerdict {
        let mut walk = Walk {
            max_range_literal: self.max_range_literal,
            violations: Vec::new(),
            aliases: HashSet::new(),
            loop_vars: Vec::new(),
            loop_depth: 0,
            answer_assigned: false,
        };

        for stmt in &program.statements {
            walk.stmt(stmt);
        }

        if walk.violations.is_empty() {
            PolicyVerdict::allow()
        } else {
            let verdict = PolicyVerdict::deny(walk.violations);
            log_denial(&verdict);
            verdict
        }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

/// Structured denial record, the gate's one observable side effect.
fn log_denial(verdict: &PolicyVerdict) {
    tracing::warn!(
        violations = verdict.violations.len(),
        kinds = ?verdict.kinds(),
        "generated code denied by policy gate"
    );
}

// ============================================================================
// AST WALK
// ============================================================================

/// One exhaustive walk over a program. Violations are collected, never
/// short-circuited, so the user sees every reason at once.
struct Walk {
    max_range_literal: u64,
    violations: Vec<Violation>,
    /// Names bound by an allowed import.
    aliases: HashSet<String>,
    /// Loop target stack; names are readable while their loop is open.
    loop_vars: Vec<String>,
    loop_depth: usize,
    /// Whether the result binding has been assigned yet.
    answer_assigned: bool,
}

impl Walk {
    fn violation(
        &mut self,
        kind: ViolationKind,
        message: impl Into<String>,
        line: usize,
        column: usize,
    ) {
        self.violations.push(Violation::new(kind, message, line, column));
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match &stmt.kind {
            StmtKind::Expr(expr) => self.expr(expr),

            StmtKind::Assign { target, value } => {
                self.assignment_target(target);
                self.expr(value);
                if target.is_name(RESULT_BINDING) {
                    self.answer_assigned = true;
                }
            }

            StmtKind::AugAssign { target, value, .. } => {
                self.assignment_target(target);
                if target.is_name(RESULT_BINDING) && !self.answer_assigned {
                    self.violation(
                        ViolationKind::UndeclaredName,
                        format!("{} is read before assignment", RESULT_BINDING),
                        target.line,
                        target.column,
                    );
                }
                self.expr(value);
                if target.is_name(RESULT_BINDING) {
                    self.answer_assigned = true;
                }
            }

            StmtKind::Import { items } => {
                for item in items {
                    if ALLOWED_IMPORTS.contains(item.module.as_str()) {
                        let bound = item.alias.clone().unwrap_or_else(|| item.module.clone());
                        self.aliases.insert(bound);
                    } else {
                        self.violation(
                            ViolationKind::DisallowedImport,
                            format!("import of {} is not permitted", item.module),
                            stmt.line,
                            stmt.column,
                        );
                    }
                }
            }

            StmtKind::FromImport { module, .. } => {
                self.violation(
                    ViolationKind::DisallowedImport,
                    format!("from-import of {} is not permitted", module),
                    stmt.line,
                    stmt.column,
                );
            }

            StmtKind::For {
                targets,
                iterable,
                body,
            } => {
                self.check_iterable(iterable);
                self.expr(iterable);
                for target in targets {
                    self.loop_vars.push(target.clone());
                }
                self.loop_depth += 1;
                for inner in body {
                    self.stmt(inner);
                }
                self.loop_depth -= 1;
                for _ in targets {
                    self.loop_vars.pop();
                }
            }

            StmtKind::While { condition, body } => {
                self.violation(
                    ViolationKind::UnboundedLoop,
                    "while loops are not permitted; iterate over a materialized sequence",
                    stmt.line,
                    stmt.column,
                );
                self.expr(condition);
                self.loop_depth += 1;
                for inner in body {
                    self.stmt(inner);
                }
                self.loop_depth -= 1;
            }

            StmtKind::If {
                condition,
                body,
                elifs,
                orelse,
            } => {
                self.expr(condition);
                for inner in body {
                    self.stmt(inner);
                }
                for (cond, suite) in elifs {
                    self.expr(cond);
                    for inner in suite {
                        self.stmt(inner);
                    }
                }
                for inner in orelse {
                    self.stmt(inner);
                }
            }

            StmtKind::FuncDef { name, .. } => {
                // Body is not walked: the definition itself is refused.
                self.violation(
                    ViolationKind::DisallowedStatement,
                    format!("function definitions are not permitted ({})", name),
                    stmt.line,
                    stmt.column,
                );
            }

            StmtKind::ClassDef { name, .. } => {
                self.violation(
                    ViolationKind::DisallowedStatement,
                    format!("class definitions are not permitted ({})", name),
                    stmt.line,
                    stmt.column,
                );
            }

            StmtKind::Return { value } => {
                self.violation(
                    ViolationKind::DisallowedStatement,
                    "return is not permitted",
                    stmt.line,
                    stmt.column,
                );
                if let Some(value) = value {
                    self.expr(value);
                }
            }

            StmtKind::Pass => {}

            StmtKind::Break => {
                if self.loop_depth == 0 {
                    self.violation(
                        ViolationKind::DisallowedStatement,
                        "break outside a loop",
                        stmt.line,
                        stmt.column,
                    );
                }
            }

            StmtKind::Continue => {
                if self.loop_depth == 0 {
                    self.violation(
                        ViolationKind::DisallowedStatement,
                        "continue outside a loop",
                        stmt.line,
                        stmt.column,
                    );
                }
            }

            StmtKind::Del { target } => {
                self.violation(
                    ViolationKind::DisallowedStatement,
                    "del is not permitted",
                    stmt.line,
                    stmt.column,
                );
                self.expr(target);
            }

            StmtKind::Global { .. } => {
                self.violation(
                    ViolationKind::DisallowedStatement,
                    "global is not permitted",
                    stmt.line,
                    stmt.column,
                );
            }
        }
    }

    /// Assignments may only target the result binding.
    fn assignment_target(&mut self, target: &Expr) {
        if target.is_name(RESULT_BINDING) {
            return;
        }
        let message = match &target.kind {
            ExprKind::Name(name) => format!(
                "assignment to {}; only the result binding {} may be assigned",
                name, RESULT_BINDING
            ),
            _ => format!("only the result binding {} may be assigned", RESULT_BINDING),
        };
        self.violation(
            ViolationKind::ForbiddenAssignment,
            message,
            target.line,
            target.column,
        );
        // Still walk compound targets (df["x"] = ...) for other reasons.
        if !matches!(target.kind, ExprKind::Name(_)) {
            self.expr(target);
        }
    }

    fn expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Int(_)
            | ExprKind::Float(_)
            | ExprKind::Str(_)
            | ExprKind::Bool(_)
            | ExprKind::NoneLit => {}

            ExprKind::Name(name) => self.name_read(name, expr.line, expr.column),

            ExprKind::Attribute { value, attr } => {
                if attr.starts_with("__") {
                    self.violation(
                        ViolationKind::DunderAccess,
                        format!("access to {} is not permitted", attr),
                        expr.line,
                        expr.column,
                    );
                } else if !PROPERTIES.contains(attr.as_str()) {
                    let message = if TABULAR_METHODS.contains(attr.as_str()) {
                        format!("method {} must be called, not referenced", attr)
                    } else {
                        format!("attribute {} is not in the allowed surface", attr)
                    };
                    self.violation(
                        ViolationKind::ForbiddenAttribute,
                        message,
                        expr.line,
                        expr.column,
                    );
                }
                self.expr(value);
            }

            ExprKind::Subscript { value, index } => {
                self.expr(value);
                match index.as_ref() {
                    Index::Single(key) => self.expr(key),
                    Index::Slice { start, stop, step } => {
                        for part in [start, stop, step].into_iter().flatten() {
                            self.expr(part);
                        }
                    }
                }
            }

            ExprKind::Call { func, args, kwargs } => {
                self.call_target(func);
                for arg in args {
                    self.expr(arg);
                }
                for (_, value) in kwargs {
                    self.expr(value);
                }
            }

            ExprKind::Unary { operand, .. } => self.expr(operand),

            ExprKind::Binary { left, right, .. } => {
                self.expr(left);
                self.expr(right);
            }

            ExprKind::Compare { left, right, .. } => {
                self.expr(left);
                self.expr(right);
            }

            ExprKind::BoolOp { left, right, .. } => {
                self.expr(left);
                self.expr(right);
            }

            ExprKind::List(items) | ExprKind::Tuple(items) => {
                for item in items {
                    self.expr(item);
                }
            }
        }
    }

    /// Judge the callee of a call expression.
    fn call_target(&mut self, func: &Expr) {
        match &func.kind {
            ExprKind::Name(name) => {
                if !BUILTIN_FUNCTIONS.contains(name.as_str()) {
                    self.violation(
                        ViolationKind::ForbiddenCall,
                        format!("call to {} is not permitted", name),
                        func.line,
                        func.column,
                    );
                }
            }

            ExprKind::Attribute { value, attr } => {
                if attr.starts_with("__") {
                    self.violation(
                        ViolationKind::DunderAccess,
                        format!("access to {} is not permitted", attr),
                        func.line,
                        func.column,
                    );
                } else if let ExprKind::Name(receiver) = &value.kind {
                    if self.aliases.contains(receiver) {
                        if !LIBRARY_FUNCTIONS.contains(attr.as_str()) {
                            self.violation(
                                ViolationKind::ForbiddenCall,
                                format!("{}.{} is not permitted", receiver, attr),
                                func.line,
                                func.column,
                            );
                        }
                        return; // alias receiver needs no name check
                    } else if !TABULAR_METHODS.contains(attr.as_str()) {
                        self.violation(
                            ViolationKind::ForbiddenCall,
                            format!("method {} is not permitted", attr),
                            func.line,
                            func.column,
                        );
                    }
                } else if !TABULAR_METHODS.contains(attr.as_str()) {
                    self.violation(
                        ViolationKind::ForbiddenCall,
                        format!("method {} is not permitted", attr),
                        func.line,
                        func.column,
                    );
                }
                self.expr(value);
            }

            _ => {
                self.violation(
                    ViolationKind::ForbiddenCall,
                    "calling a computed value is not permitted",
                    func.line,
                    func.column,
                );
                self.expr(func);
            }
        }
    }

    fn name_read(&mut self, name: &str, line: usize, column: usize) {
        let readable = name == DATASET_BINDING
            || (name == RESULT_BINDING && self.answer_assigned)
            || self.loop_vars.iter().any(|v| v == name)
            || self.aliases.contains(name)
            || BUILTIN_FUNCTIONS.contains(name);

        if !readable {
            let message = if name == RESULT_BINDING {
                format!("{} is read before assignment", RESULT_BINDING)
            } else {
                format!("name {} is not available in the sandbox", name)
            };
            self.violation(ViolationKind::UndeclaredName, message, line, column);
        }
    }

    /// A `for` iterable must be a bounded, already-materialized
    /// sequence: a display literal, a column expression, a loop
    /// binding, or a literal-bounded `range`.
    fn check_iterable(&mut self, iterable: &Expr) {
        match &iterable.kind {
            ExprKind::List(_) | ExprKind::Tuple(_) | ExprKind::Str(_) => {}

            ExprKind::Subscript { .. } => {}

            ExprKind::Attribute { attr, .. } if attr == "columns" || attr == "values" => {}

            ExprKind::Name(name)
                if self.loop_vars.iter().any(|v| v == name) || name == DATASET_BINDING => {}

            ExprKind::Call { func, args, .. } => match &func.kind {
                ExprKind::Name(name) if name == "range" => self.check_range(args, iterable),
                ExprKind::Name(name) if name == "sorted" => {}
                ExprKind::Attribute { attr, .. }
                    if matches!(attr.as_str(), "unique" | "tolist" | "head" | "tail") => {}
                _ => self.violation(
                    ViolationKind::UnboundedLoop,
                    "loop iterable is not a materialized sequence",
                    iterable.line,
                    iterable.column,
                ),
            },

            _ => self.violation(
                ViolationKind::UnboundedLoop,
                "loop iterable is not a materialized sequence",
                iterable.line,
                iterable.column,
            ),
        }
    }

    /// `range` in loop position must have integer-literal bounds whose
    /// span stays under the iteration ceiling.
    fn check_range(&mut self, args: &[Expr], anchor: &Expr) {
        let mut literals = Vec::new();
        for arg in args {
            match arg.kind {
                ExprKind::Int(v) => literals.push(v as i128),
                _ => {
                    self.violation(
                        ViolationKind::UnboundedLoop,
                        "range bounds must be integer literals",
                        anchor.line,
                        anchor.column,
                    );
                    return;
                }
            }
        }

        let (start, stop, step) = match literals[..] {
            [stop] => (0, stop, 1),
            [start, stop] => (start, stop, 1),
            [start, stop, step] => (start, stop, step),
            _ => {
                self.violation(
                    ViolationKind::UnboundedLoop,
                    "range takes one to three arguments",
                    anchor.line,
                    anchor.column,
                );
                return;
            }
        };

        if step == 0 {
            self.violation(
                ViolationKind::UnboundedLoop,
                "range step must not be zero",
                anchor.line,
                anchor.column,
            );
            return;
        }

        let span = if step > 0 { stop - start } else { start - stop };
        let magnitude = step.unsigned_abs();
        let count = if span <= 0 {
            0
        } else {
            (span.unsigned_abs() + magnitude - 1) / magnitude
        };

        if count > self.max_range_literal as u128 {
            self.violation(
                ViolationKind::UnboundedLoop,
                format!(
                    "range of {} iterations exceeds the {} ceiling",
                    count, self.max_range_literal
                ),
                anchor.line,
                anchor.column,
            );
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(code: &str) -> PolicyVerdict {
        Validator::new().validate_source(code).0
    }

    #[test]
    fn test_mean_of_column_is_allowed() {
        let v = verdict("answer = df[\"age\"].mean()\n");
        assert!(v.allowed, "violations: {:?}", v.violations);
    }

    #[test]
    fn test_import_os_is_denied() {
        let v = verdict("import os\n");
        assert!(!v.allowed);
        assert_eq!(v.violations[0].kind, ViolationKind::DisallowedImport);
    }

    #[test]
    fn test_os_system_scenario_collects_every_reason() {
        let v = verdict("import os; os.system(\"rm -rf /\")\n");
        assert!(!v.allowed);
        let kinds = v.kinds();
        assert_eq!(kinds[0], ViolationKind::DisallowedImport);
        assert!(kinds.contains(&ViolationKind::ForbiddenCall));
        assert!(kinds.contains(&ViolationKind::UndeclaredName));
    }

    #[test]
    fn test_import_pandas_with_alias_is_allowed() {
        let v = verdict("import pandas as pd\nanswer = df[\"age\"].mean()\n");
        assert!(v.allowed, "violations: {:?}", v.violations);
    }

    #[test]
    fn test_alias_call_is_denied() {
        let v = verdict("import pandas as pd\nanswer = pd.read_csv(\"x.csv\")\n");
        assert!(!v.allowed);
        assert!(v.kinds().contains(&ViolationKind::ForbiddenCall));
    }

    #[test]
    fn test_from_import_is_denied() {
        let v = verdict("from pandas import read_csv\n");
        assert!(!v.allowed);
        assert_eq!(v.violations[0].kind, ViolationKind::DisallowedImport);
    }

    #[test]
    fn test_while_loop_is_unbounded() {
        let v = verdict("while True:\n    answer = 1\n");
        assert!(!v.allowed);
        assert!(v.kinds().contains(&ViolationKind::UnboundedLoop));
    }

    #[test]
    fn test_network_polling_loop_is_rejected_at_validation() {
        // Loops until a network response arrives: refused structurally,
        // both for the while form and for the unlisted callable.
        let v = verdict("while not requests.get(\"http://x\").ok:\n    pass\n");
        assert!(!v.allowed);
        let kinds = v.kinds();
        assert!(kinds.contains(&ViolationKind::UnboundedLoop));
        assert!(kinds.contains(&ViolationKind::UndeclaredName));
    }

    #[test]
    fn test_for_over_list_literal_is_allowed() {
        let v = verdict("answer = 0\nfor x in [1, 2, 3]:\n    answer += x\n");
        assert!(v.allowed, "violations: {:?}", v.violations);
    }

    #[test]
    fn test_for_over_column_values_is_allowed() {
        let v = verdict("answer = 0\nfor x in df[\"age\"].tolist():\n    answer += x\n");
        assert!(v.allowed, "violations: {:?}", v.violations);
    }

    #[test]
    fn test_for_over_small_range_is_allowed() {
        let v = verdict("answer = 0\nfor i in range(10):\n    answer += i\n");
        assert!(v.allowed, "violations: {:?}", v.violations);
    }

    #[test]
    fn test_for_over_huge_range_is_denied() {
        let v = verdict("answer = 0\nfor i in range(100000000):\n    answer += i\n");
        assert!(!v.allowed);
        assert!(v.kinds().contains(&ViolationKind::UnboundedLoop));
    }

    #[test]
    fn test_for_over_non_literal_range_is_denied() {
        let v = verdict("answer = 0\nfor i in range(len(df) * 1000):\n    answer += i\n");
        assert!(!v.allowed);
        assert!(v.kinds().contains(&ViolationKind::UnboundedLoop));
    }

    #[test]
    fn test_for_over_call_result_is_denied() {
        let v = verdict("answer = 0\nfor x in df[\"age\"].mean():\n    answer += x\n");
        assert!(!v.allowed);
        assert!(v.kinds().contains(&ViolationKind::UnboundedLoop));
    }

    #[test]
    fn test_dunder_access_is_denied() {
        let v = verdict("answer = df.__class__\n");
        assert!(!v.allowed);
        assert!(v.kinds().contains(&ViolationKind::DunderAccess));
    }

    #[test]
    fn test_dunder_call_is_denied() {
        let v = verdict("answer = df.__getattribute__(\"columns\")\n");
        assert!(!v.allowed);
        assert!(v.kinds().contains(&ViolationKind::DunderAccess));
    }

    #[test]
    fn test_scratch_variable_assignment_is_denied() {
        let v = verdict("tmp = df[\"age\"].mean()\nanswer = tmp\n");
        assert!(!v.allowed);
        let kinds = v.kinds();
        assert!(kinds.contains(&ViolationKind::ForbiddenAssignment));
        assert!(kinds.contains(&ViolationKind::UndeclaredName));
    }

    #[test]
    fn test_subscript_assignment_is_denied() {
        let v = verdict("df[\"age\"] = 0\n");
        assert!(!v.allowed);
        assert!(v.kinds().contains(&ViolationKind::ForbiddenAssignment));
    }

    #[test]
    fn test_eval_and_exec_are_forbidden_calls() {
        let v = verdict("answer = eval(\"1 + 1\")\n");
        assert!(!v.allowed);
        assert!(v.kinds().contains(&ViolationKind::ForbiddenCall));

        let v = verdict("exec(\"import os\")\n");
        assert!(!v.allowed);
        assert!(v.kinds().contains(&ViolationKind::ForbiddenCall));
    }

    #[test]
    fn test_open_is_forbidden() {
        let v = verdict("answer = open(\"/etc/passwd\").read()\n");
        assert!(!v.allowed);
        assert!(v.kinds().contains(&ViolationKind::ForbiddenCall));
    }

    #[test]
    fn test_persistence_method_is_forbidden() {
        let v = verdict("answer = df.to_csv(\"out.csv\")\n");
        assert!(!v.allowed);
        assert!(v.kinds().contains(&ViolationKind::ForbiddenCall));
    }

    #[test]
    fn test_def_and_class_are_disallowed_statements() {
        let v = verdict("def f():\n    return 1\n");
        assert!(!v.allowed);
        assert!(v.kinds().contains(&ViolationKind::DisallowedStatement));

        let v = verdict("class A:\n    pass\n");
        assert!(!v.allowed);
        assert!(v.kinds().contains(&ViolationKind::DisallowedStatement));
    }

    #[test]
    fn test_break_inside_loop_is_allowed() {
        let v = verdict("answer = 0\nfor x in [1, 2]:\n    if x > 1:\n        break\n    answer += x\n");
        assert!(v.allowed, "violations: {:?}", v.violations);
    }

    #[test]
    fn test_break_outside_loop_is_denied() {
        let v = verdict("break\n");
        assert!(!v.allowed);
        assert!(v.kinds().contains(&ViolationKind::DisallowedStatement));
    }

    #[test]
    fn test_answer_read_before_assignment_is_denied() {
        let v = verdict("answer += 1\n");
        assert!(!v.allowed);
        assert!(v.kinds().contains(&ViolationKind::UndeclaredName));
    }

    #[test]
    fn test_str_accessor_chain_is_allowed() {
        let v = verdict("answer = df[df[\"name\"].str.contains(\"a\")]\n");
        assert!(v.allowed, "violations: {:?}", v.violations);
    }

    #[test]
    fn test_unparseable_code_is_parse_error_verdict() {
        let (v, program) = Validator::new().validate_source("answer = = 1\n");
        assert!(!v.allowed);
        assert_eq!(v.violations.len(), 1);
        assert_eq!(v.violations[0].kind, ViolationKind::ParseError);
        assert!(program.is_none());
    }

    #[test]
    fn test_program_returned_only_when_allowed() {
        let (v, program) = Validator::new().validate_source("answer = len(df)\n");
        assert!(v.allowed);
        assert!(program.is_some());

        let (v, program) = Validator::new().validate_source("import os\n");
        assert!(!v.allowed);
        assert!(program.is_none());
    }

    #[test]
    fn test_verdict_is_deterministic() {
        let code = "import socket\nanswer = undefined_thing.run()\n";
        let a = verdict(code);
        let b = verdict(code);
        assert_eq!(a, b);
    }

    #[test]
    fn test_violations_are_in_source_order() {
        let v = verdict("import os\nanswer = eval(\"x\")\n");
        assert!(!v.allowed);
        assert!(v.violations.len() >= 2);
        assert!(v.violations[0].line <= v.violations[1].line);
        assert_eq!(v.violations[0].kind, ViolationKind::DisallowedImport);
    }

    #[test]
    fn test_sort_and_head_pipeline_is_allowed() {
        let v = verdict("answer = df.sort_values(\"revenue\", ascending=False).head(5)\n");
        assert!(v.allowed, "violations: {:?}", v.violations);
    }

    #[test]
    fn test_groupby_aggregation_is_allowed() {
        let v = verdict("answer = df.groupby(\"city\")[\"price\"].mean()\n");
        assert!(v.allowed, "violations: {:?}", v.violations);
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================
