//! Interpreter implementation
//!
//! Evaluation charges fuel on every step and checks the wall-clock
//! deadline from inside the loop, so a hostile-but-validated program
//! cannot disable its own limits.

use crate::value::{cell_cmp, value_to_cell, GroupedValue, SeriesValue, TableValue, Value};
use std::cmp::Ordering;
use std::time::Instant;
use tabula_core::{CellValue, Dataset, ExecError, ExecLimits};
use tabula_lang::{
    BinOp, BoolOpKind, CmpOp, Expr, ExprKind, Index, Program, Stmt, StmtKind, UnaryOp,
};

/// Result binding name injected into the environment.
const RESULT_BINDING: &str = "answer";
/// Dataset binding name injected into the environment.
const DATASET_BINDING: &str = "df";

/// Control-flow signal from one statement.
enum Flow {
    Normal,
    Break,
    Continue,
}

fn fail(message: impl Into<String>) -> ExecError {
    ExecError::RuntimeFailure {
        message: message.into(),
    }
}

// ============================================================================
// INTERPRETER
// ============================================================================

/// One contained evaluation of a validated program against a dataset.
pub struct Interpreter<'a> {
    limits: &'a ExecLimits,
    deadline: Instant,
    fuel: u64,
    cells: u64,
    df: TableValue,
    answer: Option<Value>,
    locals: Vec<(String, Value)>,
}

impl<'a> Interpreter<'a> {
    /// Create an interpreter over a read-only view of the dataset.
    pub fn new(dataset: &Dataset, limits: &'a ExecLimits) -> Self {
        Self {
            limits,
            deadline: Instant::now() + limits.timeout,
            fuel: limits.max_fuel,
            cells: 0,
            df: TableValue::from_dataset(dataset),
            answer: None,
            locals: Vec::new(),
        }
    }

    /// Run the program to completion and return the result binding.
    pub fn run(mut self, program: &Program) -> Result<Value, ExecError> {
        for stmt in &program.statements {
            self.exec_stmt(stmt)?;
        }
        self.answer.ok_or_else(|| {
            fail(format!(
                "program did not assign the result binding {}",
                RESULT_BINDING
            ))
        })
    }

    // ------------------------------------------------------------------
    // Limits
    // ------------------------------------------------------------------

    fn step(&mut self) -> Result<(), ExecError> {
        if self.fuel == 0 {
            return Err(ExecError::ResourceLimitExceeded {
                resource: "fuel",
                limit: self.limits.max_fuel,
            });
        }
        self.fuel -= 1;
        if self.fuel % 256 == 0 && Instant::now() >= self.deadline {
            return Err(ExecError::Timeout {
                limit_ms: self.limits.timeout.as_millis() as u64,
            });
        }
        Ok(())
    }

    fn charge(&mut self, cells: u64) -> Result<(), ExecError> {
        self.cells = self.cells.saturating_add(cells);
        if self.cells > self.limits.max_cells {
            return Err(ExecError::ResourceLimitExceeded {
                resource: "cells",
                limit: self.limits.max_cells,
            });
        }
        Ok(())
    }

    fn charged(&mut self, value: Value) -> Result<Value, ExecError> {
        self.charge(value.cell_count())?;
        Ok(value)
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn exec_stmt(&mut self, stmt: &Stmt) -> Result<Flow, ExecError> {
        self.step()?;

        match &stmt.kind {
            StmtKind::Expr(expr) => {
                self.eval(expr)?;
                Ok(Flow::Normal)
            }

            StmtKind::Assign { target, value } => {
                let value = self.eval(value)?;
                self.bind_answer(target, value)?;
                Ok(Flow::Normal)
            }

            StmtKind::AugAssign { target, op, value } => {
                if !target.is_name(RESULT_BINDING) {
                    return Err(fail("assignment target must be the result binding"));
                }
                let current = self
                    .answer
                    .clone()
                    .ok_or_else(|| fail(format!("{} is not assigned", RESULT_BINDING)))?;
                let rhs = self.eval(value)?;
                self.answer = Some(self.binary(*op, current, rhs)?);
                Ok(Flow::Normal)
            }

            // Allowed imports bind an inert alias; nothing to do at runtime.
            StmtKind::Import { .. } => Ok(Flow::Normal),

            StmtKind::For {
                targets,
                iterable,
                body,
            } => {
                let iterable = self.eval(iterable)?;
                let items = self.iteration_values(iterable)?;

                for target in targets {
                    self.locals.push((target.clone(), Value::Null));
                }

                let mut iterations: u64 = 0;
                'outer: for item in items {
                    iterations += 1;
                    if iterations > self.limits.max_loop_iterations {
                        return Err(ExecError::ResourceLimitExceeded {
                            resource: "loop iterations",
                            limit: self.limits.max_loop_iterations,
                        });
                    }

                    self.assign_loop_item(targets, item)?;
                    for inner in body {
                        match self.exec_stmt(inner)? {
                            Flow::Break => break 'outer,
                            Flow::Continue => continue 'outer,
                            Flow::Normal => {}
                        }
                    }
                }

                for _ in targets {
                    self.locals.pop();
                }
                Ok(Flow::Normal)
            }

            StmtKind::If {
                condition,
                body,
                elifs,
                orelse,
            } => {
                let mut branch: Option<&Vec<Stmt>> = None;

                let cond = self.eval(condition)?;
                if self.truthy(&cond)? {
                    branch = Some(body);
                } else {
                    for (elif_cond, suite) in elifs {
                        let cond = self.eval(elif_cond)?;
                        if self.truthy(&cond)? {
                            branch = Some(suite);
                            break;
                        }
                    }
                    if branch.is_none() && !orelse.is_empty() {
                        branch = Some(orelse);
                    }
                }

                if let Some(suite) = branch {
                    for inner in suite {
                        match self.exec_stmt(inner)? {
                            Flow::Normal => {}
                            flow => return Ok(flow),
                        }
                    }
                }
                Ok(Flow::Normal)
            }

            StmtKind::Pass => Ok(Flow::Normal),
            StmtKind::Break => Ok(Flow::Break),
            StmtKind::Continue => Ok(Flow::Continue),

            // The gate refuses these; reaching one means the contract
            // was bypassed, which is itself a runtime failure.
            StmtKind::While { .. }
            | StmtKind::FuncDef { .. }
            | StmtKind::ClassDef { .. }
            | StmtKind::Return { .. }
            | StmtKind::Del { .. }
            | StmtKind::Global { .. }
            | StmtKind::FromImport { .. } => Err(fail("statement is not available in the sandbox")),
        }
    }

    fn bind_answer(&mut self, target: &Expr, value: Value) -> Result<(), ExecError> {
        if target.is_name(RESULT_BINDING) {
            self.answer = Some(value);
            Ok(())
        } else {
            Err(fail("assignment target must be the result binding"))
        }
    }

    fn assign_loop_item(&mut self, targets: &[String], item: Value) -> Result<(), ExecError> {
        if targets.len() == 1 {
            self.set_local(&targets[0], item);
            return Ok(());
        }

        match item {
            Value::List(items) if items.len() == targets.len() => {
                for (target, value) in targets.iter().zip(items) {
                    self.set_local(target, value);
                }
                Ok(())
            }
            other => Err(fail(format!(
                "cannot unpack {} into {} loop targets",
                other.type_name(),
                targets.len()
            ))),
        }
    }

    fn set_local(&mut self, name: &str, value: Value) {
        if let Some(slot) = self.locals.iter_mut().rev().find(|(n, _)| n == name) {
            slot.1 = value;
        }
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn eval(&mut self, expr: &Expr) -> Result<Value, ExecError> {
        self.step()?;

        match &expr.kind {
            ExprKind::Int(v) => Ok(Value::Int(*v)),
            ExprKind::Float(v) => Ok(Value::Float(*v)),
            ExprKind::Str(s) => Ok(Value::Str(s.clone())),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::NoneLit => Ok(Value::Null),

            ExprKind::Name(name) => self.load_name(name),

            ExprKind::Attribute { value, attr } => {
                let receiver = self.eval(value)?;
                self.attribute(receiver, attr)
            }

            ExprKind::Subscript { value, index } => {
                let receiver = self.eval(value)?;
                match index.as_ref() {
                    Index::Single(key) => {
                        let key = self.eval(key)?;
                        self.subscript(receiver, key)
                    }
                    Index::Slice { start, stop, step } => {
                        let start = self.eval_slice_part(start)?;
                        let stop = self.eval_slice_part(stop)?;
                        let step = self.eval_slice_part(step)?;
                        self.slice(receiver, start, stop, step)
                    }
                }
            }

            ExprKind::Call { func, args, kwargs } => match &func.kind {
                ExprKind::Name(name) => {
                    if !kwargs.is_empty() {
                        return Err(fail(format!(
                            "{} does not accept keyword arguments",
                            name
                        )));
                    }
                    let argv = self.eval_args(args)?;
                    self.call_builtin(name, argv)
                }
                ExprKind::Attribute { value, attr } => {
                    let receiver = self.eval(value)?;
                    let argv = self.eval_args(args)?;
                    let mut kwargv = Vec::new();
                    for (name, value) in kwargs {
                        kwargv.push((name.clone(), self.eval(value)?));
                    }
                    self.call_method(receiver, attr, argv, kwargv)
                }
                _ => Err(fail("value is not callable")),
            },

            ExprKind::Unary { op, operand } => {
                let operand = self.eval(operand)?;
                match op {
                    UnaryOp::Neg => self.negate(operand),
                    UnaryOp::Not => Ok(Value::Bool(!self.truthy(&operand)?)),
                }
            }

            ExprKind::Binary { left, op, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                self.binary(*op, left, right)
            }

            ExprKind::Compare { left, op, right } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                self.compare(*op, left, right)
            }

            ExprKind::BoolOp { op, left, right } => {
                let left = self.eval(left)?;
                let left_truthy = self.truthy(&left)?;
                match op {
                    BoolOpKind::And if !left_truthy => Ok(Value::Bool(false)),
                    BoolOpKind::Or if left_truthy => Ok(Value::Bool(true)),
                    _ => {
                        let right = self.eval(right)?;
                        Ok(Value::Bool(self.truthy(&right)?))
                    }
                }
            }

            ExprKind::List(items) | ExprKind::Tuple(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item)?);
                }
                self.charged(Value::List(values))
            }
        }
    }

    fn eval_args(&mut self, args: &[Expr]) -> Result<Vec<Value>, ExecError> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg)?);
        }
        Ok(values)
    }

    fn eval_slice_part(&mut self, part: &Option<Expr>) -> Result<Option<i64>, ExecError> {
        match part {
            None => Ok(None),
            Some(expr) => match self.eval(expr)? {
                Value::Int(v) => Ok(Some(v)),
                other => Err(fail(format!(
                    "slice bounds must be integers, found {}",
                    other.type_name()
                ))),
            },
        }
    }

    fn load_name(&mut self, name: &str) -> Result<Value, ExecError> {
        if name == DATASET_BINDING {
            let table = Value::Table(self.df.clone());
            return self.charged(table);
        }
        if name == RESULT_BINDING {
            return self
                .answer
                .clone()
                .ok_or_else(|| fail(format!("{} is not assigned", RESULT_BINDING)));
        }
        if let Some((_, value)) = self.locals.iter().rev().find(|(n, _)| n == name) {
            let value = value.clone();
            return self.charged(value);
        }
        Err(fail(format!("name {} is not available", name)))
    }

    // ------------------------------------------------------------------
    // Attributes and subscripts
    // ------------------------------------------------------------------

    fn attribute(&mut self, receiver: Value, attr: &str) -> Result<Value, ExecError> {
        match (&receiver, attr) {
            (Value::Table(t), "columns") => {
                let names = t.column_names().into_iter().map(Value::Str).collect();
                self.charged(Value::List(names))
            }
            (Value::Table(t), "shape") => Ok(Value::List(vec![
                Value::Int(t.row_count() as i64),
                Value::Int(t.columns.len() as i64),
            ])),
            (Value::Table(t), "index") => {
                let index = (0..t.row_count() as i64).map(Value::Int).collect();
                self.charged(Value::List(index))
            }
            (Value::Table(t), "values") => {
                let rows: Vec<Value> = (0..t.row_count())
                    .map(|i| {
                        Value::List(
                            t.columns
                                .iter()
                                .map(|(_, cells)| Value::from(cells[i].clone()))
                                .collect(),
                        )
                    })
                    .collect();
                self.charge((t.row_count() * t.columns.len()) as u64)?;
                Ok(Value::List(rows))
            }
            (Value::Series(s), "values") => {
                let values = s.values.iter().cloned().map(Value::from).collect();
                self.charged(Value::List(values))
            }
            (Value::Series(s), "index") => {
                let index = (0..s.values.len() as i64).map(Value::Int).collect();
                self.charged(Value::List(index))
            }
            // Accessor namespaces; the string/date methods live
            // directly on the series.
            (Value::Series(_), "str") | (Value::Series(_), "dt") => Ok(receiver),
            _ => Err(fail(format!(
                "attribute {} is not available on {}",
                attr,
                receiver.type_name()
            ))),
        }
    }

    fn subscript(&mut self, receiver: Value, key: Value) -> Result<Value, ExecError> {
        match (receiver, key) {
            (Value::Table(t), Value::Str(name)) => {
                let cells = t
                    .column(&name)
                    .ok_or_else(|| fail(format!("unknown column {}", name)))?
                    .clone();
                self.charged(Value::Series(SeriesValue { name, values: cells }))
            }

            (Value::Table(t), Value::List(names)) => {
                let mut columns = Vec::new();
                for name in names {
                    let Value::Str(name) = name else {
                        return Err(fail("column selection must be a list of names"));
                    };
                    let cells = t
                        .column(&name)
                        .ok_or_else(|| fail(format!("unknown column {}", name)))?
                        .clone();
                    columns.push((name, cells));
                }
                self.charged(Value::Table(TableValue { columns }))
            }

            (Value::Table(t), Value::Series(mask)) => {
                let indices = self.mask_indices(&mask, t.row_count())?;
                self.charged(Value::Table(t.take_rows(&indices)))
            }

            (Value::Series(s), Value::Int(i)) => {
                let idx = normalize_index(i, s.values.len())
                    .ok_or_else(|| fail(format!("index {} out of range", i)))?;
                Ok(Value::from(s.values[idx].clone()))
            }

            (Value::Series(s), Value::Series(mask)) => {
                let indices = self.mask_indices(&mask, s.values.len())?;
                let values = indices.iter().map(|&i| s.values[i].clone()).collect();
                self.charged(Value::Series(SeriesValue {
                    name: s.name,
                    values,
                }))
            }

            (Value::List(items), Value::Int(i)) => {
                let idx = normalize_index(i, items.len())
                    .ok_or_else(|| fail(format!("index {} out of range", i)))?;
                Ok(items[idx].clone())
            }

            (Value::Str(s), Value::Int(i)) => {
                let chars: Vec<char> = s.chars().collect();
                let idx = normalize_index(i, chars.len())
                    .ok_or_else(|| fail(format!("index {} out of range", i)))?;
                Ok(Value::Str(chars[idx].to_string()))
            }

            (Value::Grouped(g), Value::Str(name)) => {
                let known = g
                    .groups
                    .first()
                    .map(|(_, t)| t.column(&name).is_some())
                    .unwrap_or(true);
                if !known {
                    return Err(fail(format!("unknown column {}", name)));
                }
                Ok(Value::Grouped(GroupedValue {
                    selected: Some(name),
                    ..g
                }))
            }

            (receiver, key) => Err(fail(format!(
                "cannot index {} with {}",
                receiver.type_name(),
                key.type_name()
            ))),
        }
    }

    fn mask_indices(&self, mask: &SeriesValue, len: usize) -> Result<Vec<usize>, ExecError> {
        if mask.values.len() != len {
            return Err(fail(format!(
                "boolean mask length {} does not match length {}",
                mask.values.len(),
                len
            )));
        }
        let mut indices = Vec::new();
        for (i, cell) in mask.values.iter().enumerate() {
            match cell {
                CellValue::Bool(true) => indices.push(i),
                CellValue::Bool(false) | CellValue::Null => {}
                other => {
                    return Err(fail(format!(
                        "mask must be boolean, found {}",
                        other.type_name()
                    )))
                }
            }
        }
        Ok(indices)
    }

    fn slice(
        &mut self,
        receiver: Value,
        start: Option<i64>,
        stop: Option<i64>,
        step: Option<i64>,
    ) -> Result<Value, ExecError> {
        let step = step.unwrap_or(1);
        if step <= 0 {
            return Err(fail("slice step must be positive"));
        }

        let len = match &receiver {
            Value::Table(t) => t.row_count(),
            Value::Series(s) => s.values.len(),
            Value::List(items) => items.len(),
            Value::Str(s) => s.chars().count(),
            other => return Err(fail(format!("cannot slice {}", other.type_name()))),
        };

        let clamp = |bound: Option<i64>, default: usize| -> usize {
            match bound {
                None => default,
                Some(v) if v < 0 => len.saturating_sub(v.unsigned_abs() as usize),
                Some(v) => (v as usize).min(len),
            }
        };
        let start = clamp(start, 0);
        let stop = clamp(stop, len);
        let indices: Vec<usize> = (start..stop).step_by(step as usize).collect();

        match receiver {
            Value::Table(t) => self.charged(Value::Table(t.take_rows(&indices))),
            Value::Series(s) => {
                let values = indices.iter().map(|&i| s.values[i].clone()).collect();
                self.charged(Value::Series(SeriesValue {
                    name: s.name,
                    values,
                }))
            }
            Value::List(items) => {
                let values = indices.iter().map(|&i| items[i].clone()).collect();
                self.charged(Value::List(values))
            }
            Value::Str(s) => {
                let chars: Vec<char> = s.chars().collect();
                Ok(Value::Str(indices.iter().map(|&i| chars[i]).collect()))
            }
            _ => unreachable!(),
        }
    }

    // ------------------------------------------------------------------
    // Truthiness and iteration
    // ------------------------------------------------------------------

    fn truthy(&self, value: &Value) -> Result<bool, ExecError> {
        match value {
            Value::Null => Ok(false),
            Value::Bool(b) => Ok(*b),
            Value::Int(i) => Ok(*i != 0),
            Value::Float(f) => Ok(*f != 0.0),
            Value::Str(s) => Ok(!s.is_empty()),
            Value::List(items) => Ok(!items.is_empty()),
            other => Err(fail(format!(
                "truth value of a {} is ambiguous",
                other.type_name()
            ))),
        }
    }

    fn iteration_values(&mut self, value: Value) -> Result<Vec<Value>, ExecError> {
        match value {
            Value::List(items) => Ok(items),
            Value::Series(s) => Ok(s.values.into_iter().map(Value::from).collect()),
            Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
            // Iterating a table yields its column names, as pandas does.
            Value::Table(t) => Ok(t.column_names().into_iter().map(Value::Str).collect()),
            other => Err(fail(format!("{} is not iterable", other.type_name()))),
        }
    }

    // ------------------------------------------------------------------
    // Operators
    // ------------------------------------------------------------------

    fn negate(&mut self, value: Value) -> Result<Value, ExecError> {
        match value {
            Value::Int(i) => i
                .checked_neg()
                .map(Value::Int)
                .ok_or_else(|| fail("integer overflow")),
            Value::Float(f) => Ok(Value::Float(-f)),
            Value::Series(s) => {
                let mut values = Vec::with_capacity(s.values.len());
                for cell in &s.values {
                    values.push(match cell {
                        CellValue::Null => CellValue::Null,
                        CellValue::Int(i) => CellValue::Int(
                            i.checked_neg().ok_or_else(|| fail("integer overflow"))?,
                        ),
                        CellValue::Float(f) => CellValue::Float(-f),
                        other => {
                            return Err(fail(format!("cannot negate {}", other.type_name())))
                        }
                    });
                }
                self.charged(Value::Series(SeriesValue {
                    name: s.name,
                    values,
                }))
            }
            other => Err(fail(format!("cannot negate {}", other.type_name()))),
        }
    }

    fn binary(&mut self, op: BinOp, left: Value, right: Value) -> Result<Value, ExecError> {
        match (left, right) {
            (Value::Series(s), rhs) if rhs.is_scalar() => {
                let rhs = value_to_cell(&rhs).expect("scalar");
                self.series_map2(s, |cell| scalar_binary(op, cell, &rhs))
            }
            (lhs, Value::Series(s)) if lhs.is_scalar() => {
                let lhs = value_to_cell(&lhs).expect("scalar");
                self.series_map2(s, |cell| scalar_binary(op, &lhs, cell))
            }
            (Value::Series(a), Value::Series(b)) => {
                if a.values.len() != b.values.len() {
                    return Err(fail("series lengths do not match"));
                }
                let mut values = Vec::with_capacity(a.values.len());
                for (x, y) in a.values.iter().zip(b.values.iter()) {
                    values.push(scalar_binary(op, x, y)?);
                }
                self.charged(Value::Series(SeriesValue {
                    name: a.name,
                    values,
                }))
            }
            (Value::Str(a), Value::Str(b)) if op == BinOp::Add => Ok(Value::Str(a + &b)),
            (Value::List(a), Value::List(b)) if op == BinOp::Add => {
                let mut items = a;
                items.extend(b);
                self.charged(Value::List(items))
            }
            (lhs, rhs) if lhs.is_scalar() && rhs.is_scalar() => {
                let a = value_to_cell(&lhs).expect("scalar");
                let b = value_to_cell(&rhs).expect("scalar");
                Ok(Value::from(scalar_binary(op, &a, &b)?))
            }
            (lhs, rhs) => Err(fail(format!(
                "cannot apply operator to {} and {}",
                lhs.type_name(),
                rhs.type_name()
            ))),
        }
    }

    fn series_map2(
        &mut self,
        series: SeriesValue,
        f: impl Fn(&CellValue) -> Result<CellValue, ExecError>,
    ) -> Result<Value, ExecError> {
        let mut values = Vec::with_capacity(series.values.len());
        for cell in &series.values {
            values.push(f(cell)?);
        }
        self.charged(Value::Series(SeriesValue {
            name: series.name,
            values,
        }))
    }

    fn compare(&mut self, op: CmpOp, left: Value, right: Value) -> Result<Value, ExecError> {
        if matches!(op, CmpOp::In | CmpOp::NotIn) {
            let contained = self.contains(&right, &left)?;
            let result = if op == CmpOp::In { contained } else { !contained };
            return Ok(Value::Bool(result));
        }

        match (left, right) {
            (Value::Series(s), rhs) if rhs.is_scalar() => {
                let rhs = value_to_cell(&rhs).expect("scalar");
                self.series_map2(s, |cell| Ok(CellValue::Bool(scalar_compare(op, cell, &rhs))))
            }
            (lhs, Value::Series(s)) if lhs.is_scalar() => {
                let lhs = value_to_cell(&lhs).expect("scalar");
                self.series_map2(s, |cell| Ok(CellValue::Bool(scalar_compare(op, &lhs, cell))))
            }
            (Value::Series(a), Value::Series(b)) => {
                if a.values.len() != b.values.len() {
                    return Err(fail("series lengths do not match"));
                }
                let mut values = Vec::with_capacity(a.values.len());
                for (x, y) in a.values.iter().zip(b.values.iter()) {
                    values.push(CellValue::Bool(scalar_compare(op, x, y)));
                }
                self.charged(Value::Series(SeriesValue {
                    name: a.name,
                    values,
                }))
            }
            (lhs, rhs) if lhs.is_scalar() && rhs.is_scalar() => {
                let a = value_to_cell(&lhs).expect("scalar");
                let b = value_to_cell(&rhs).expect("scalar");
                Ok(Value::Bool(scalar_compare(op, &a, &b)))
            }
            (lhs, rhs) => Err(fail(format!(
                "cannot compare {} with {}",
                lhs.type_name(),
                rhs.type_name()
            ))),
        }
    }

    fn contains(&self, container: &Value, needle: &Value) -> Result<bool, ExecError> {
        match container {
            Value::List(items) => Ok(items.iter().any(|item| item == needle)),
            Value::Series(s) => {
                let needle = value_to_cell(needle)
                    .ok_or_else(|| fail("membership test needs a scalar"))?;
                Ok(s.values.iter().any(|cell| cells_eq(cell, &needle)))
            }
            Value::Str(haystack) => match needle {
                Value::Str(sub) => Ok(haystack.contains(sub.as_str())),
                other => Err(fail(format!(
                    "cannot search for {} in a string",
                    other.type_name()
                ))),
            },
            Value::Table(t) => match needle {
                Value::Str(name) => Ok(t.column(name).is_some()),
                other => Err(fail(format!(
                    "cannot search for {} in a table",
                    other.type_name()
                ))),
            },
            other => Err(fail(format!("{} is not a container", other.type_name()))),
        }
    }
}

// ============================================================================
// SCALAR OPERATORS
// ============================================================================

fn as_number(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Bool(b) => Some(*b as i64 as f64),
        _ => cell.as_f64(),
    }
}

fn as_int(cell: &CellValue) -> Option<i64> {
    match cell {
        CellValue::Int(i) => Some(*i),
        CellValue::Bool(b) => Some(*b as i64),
        _ => None,
    }
}

/// Arithmetic over two cells with Python-style promotion: int op int
/// stays integral where exact, anything else goes through f64. Nulls
/// propagate.
fn scalar_binary(op: BinOp, a: &CellValue, b: &CellValue) -> Result<CellValue, ExecError> {
    if a.is_null() || b.is_null() {
        return Ok(CellValue::Null);
    }

    if op == BinOp::Add {
        if let (CellValue::Str(x), CellValue::Str(y)) = (a, b) {
            return Ok(CellValue::Str(format!("{}{}", x, y)));
        }
    }

    let (ia, ib) = (as_int(a), as_int(b));
    let (fa, fb) = (as_number(a), as_number(b));
    let (fa, fb) = match (fa, fb) {
        (Some(x), Some(y)) => (x, y),
        _ => {
            return Err(fail(format!(
                "cannot apply operator to {} and {}",
                a.type_name(),
                b.type_name()
            )))
        }
    };

    let int_result = |r: Option<i64>| r.map(CellValue::Int).ok_or_else(|| fail("integer overflow"));

    match op {
        BinOp::Add => match (ia, ib) {
            (Some(x), Some(y)) => int_result(x.checked_add(y)),
            _ => Ok(CellValue::Float(fa + fb)),
        },
        BinOp::Sub => match (ia, ib) {
            (Some(x), Some(y)) => int_result(x.checked_sub(y)),
            _ => Ok(CellValue::Float(fa - fb)),
        },
        BinOp::Mul => match (ia, ib) {
            (Some(x), Some(y)) => int_result(x.checked_mul(y)),
            _ => Ok(CellValue::Float(fa * fb)),
        },
        BinOp::Div => {
            if fb == 0.0 {
                Err(fail("division by zero"))
            } else {
                Ok(CellValue::Float(fa / fb))
            }
        }
        BinOp::FloorDiv => {
            if fb == 0.0 {
                Err(fail("division by zero"))
            } else {
                let r = (fa / fb).floor();
                match (ia, ib) {
                    (Some(_), Some(_)) => Ok(CellValue::Int(r as i64)),
                    _ => Ok(CellValue::Float(r)),
                }
            }
        }
        BinOp::Mod => {
            if fb == 0.0 {
                Err(fail("division by zero"))
            } else {
                let r = fa - fb * (fa / fb).floor();
                match (ia, ib) {
                    (Some(_), Some(_)) => Ok(CellValue::Int(r as i64)),
                    _ => Ok(CellValue::Float(r)),
                }
            }
        }
        BinOp::Pow => match (ia, ib) {
            (Some(x), Some(y)) if (0..=32).contains(&y) => match x.checked_pow(y as u32) {
                Some(r) => Ok(CellValue::Int(r)),
                None => Ok(CellValue::Float(fa.powf(fb))),
            },
            _ => Ok(CellValue::Float(fa.powf(fb))),
        },
    }
}

/// Equality across the numeric tower; other types match exactly.
fn cells_eq(a: &CellValue, b: &CellValue) -> bool {
    match (a, b) {
        (CellValue::Null, CellValue::Null) => true,
        (CellValue::Str(x), CellValue::Str(y)) => x == y,
        (CellValue::Bool(x), CellValue::Bool(y)) => x == y,
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => false,
        },
    }
}

/// Ordered comparison over two cells. Comparisons involving nulls or
/// mismatched types are false, matching how filters treat missing data.
fn scalar_compare(op: CmpOp, a: &CellValue, b: &CellValue) -> bool {
    match op {
        CmpOp::Eq => cells_eq(a, b),
        CmpOp::Ne => !cells_eq(a, b),
        CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => {
            let ordering = match (a, b) {
                (CellValue::Str(x), CellValue::Str(y)) => Some(x.cmp(y)),
                (CellValue::Null, _) | (_, CellValue::Null) => None,
                _ => match (as_number(a), as_number(b)) {
                    (Some(x), Some(y)) => x.partial_cmp(&y),
                    _ => None,
                },
            };
            match (op, ordering) {
                (_, None) => false,
                (CmpOp::Lt, Some(o)) => o == Ordering::Less,
                (CmpOp::Le, Some(o)) => o != Ordering::Greater,
                (CmpOp::Gt, Some(o)) => o == Ordering::Greater,
                (CmpOp::Ge, Some(o)) => o != Ordering::Less,
                _ => unreachable!(),
            }
        }
        CmpOp::In | CmpOp::NotIn => false,
    }
}

fn normalize_index(i: i64, len: usize) -> Option<usize> {
    let idx = if i < 0 {
        len.checked_sub(i.unsigned_abs() as usize)?
    } else {
        i as usize
    };
    (idx < len).then_some(idx)
}

mod builtins;

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::Column;
    use tabula_lang::parse_source;

    fn people() -> Dataset {
        Dataset::new(vec![
            Column::new("name", vec!["a".into(), "b".into()]),
            Column::new("age", vec![30i64.into(), 40i64.into()]),
        ])
        .unwrap()
    }

    fn run(source: &str, dataset: &Dataset) -> Result<Value, ExecError> {
        let limits = ExecLimits::default();
        let program = parse_source(source).unwrap();
        Interpreter::new(dataset, &limits).run(&program)
    }

    #[test]
    fn test_mean_of_age_scenario() {
        let result = run("answer = df[\"age\"].mean()\n", &people()).unwrap();
        assert_eq!(result, Value::Float(35.0));
    }

    #[test]
    fn test_missing_answer_is_runtime_failure() {
        let err = run("df[\"age\"].mean()\n", &people()).unwrap_err();
        assert!(matches!(err, ExecError::RuntimeFailure { .. }));
    }

    #[test]
    fn test_loop_accumulates_through_answer() {
        let result = run(
            "answer = 0\nfor x in df[\"age\"].tolist():\n    answer += x\n",
            &people(),
        )
        .unwrap();
        assert_eq!(result, Value::Int(70));
    }

    #[test]
    fn test_boolean_mask_filter() {
        let result = run("answer = len(df[df[\"age\"] > 35])\n", &people()).unwrap();
        assert_eq!(result, Value::Int(1));
    }

    #[test]
    fn test_division_is_float() {
        let result = run("answer = 7 / 2\n", &people()).unwrap();
        assert_eq!(result, Value::Float(3.5));
    }

    #[test]
    fn test_floor_division_stays_int() {
        let result = run("answer = 7 // 2\n", &people()).unwrap();
        assert_eq!(result, Value::Int(3));
    }

    #[test]
    fn test_division_by_zero_is_runtime_failure() {
        let err = run("answer = 1 / 0\n", &people()).unwrap_err();
        assert!(matches!(err, ExecError::RuntimeFailure { .. }));
    }

    #[test]
    fn test_fuel_exhaustion_on_adversarial_loop() {
        let limits = ExecLimits {
            max_fuel: 500,
            ..ExecLimits::default()
        };
        let program = parse_source(
            "answer = 0\nfor i in range(10000):\n    answer += i\n",
        )
        .unwrap();
        let err = Interpreter::new(&people(), &limits).run(&program).unwrap_err();
        assert!(matches!(
            err,
            ExecError::ResourceLimitExceeded { resource: "fuel", .. }
        ));
    }

    #[test]
    fn test_loop_iteration_ceiling() {
        let limits = ExecLimits {
            max_loop_iterations: 10,
            ..ExecLimits::default()
        };
        let program = parse_source(
            "answer = 0\nfor i in [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]:\n    answer += 1\n",
        )
        .unwrap();
        let err = Interpreter::new(&people(), &limits).run(&program).unwrap_err();
        assert!(matches!(
            err,
            ExecError::ResourceLimitExceeded {
                resource: "loop iterations",
                ..
            }
        ));
    }

    #[test]
    fn test_oversized_range_is_cut_off() {
        let limits = ExecLimits {
            max_loop_iterations: 10,
            ..ExecLimits::default()
        };
        let program = parse_source("answer = len(range(100))\n").unwrap();
        let err = Interpreter::new(&people(), &limits).run(&program).unwrap_err();
        assert!(matches!(
            err,
            ExecError::ResourceLimitExceeded {
                resource: "range size",
                ..
            }
        ));
    }

    #[test]
    fn test_if_elif_else() {
        let source = "\
if len(df) > 10:
    answer = \"big\"
elif len(df) > 1:
    answer = \"medium\"
else:
    answer = \"small\"
";
        let result = run(source, &people()).unwrap();
        assert_eq!(result, Value::Str("medium".to_string()));
    }

    #[test]
    fn test_break_and_continue() {
        let source = "\
answer = 0
for x in [1, 2, 3, 4, 5]:
    if x == 2:
        continue
    if x == 4:
        break
    answer += x
";
        let result = run(source, &people()).unwrap();
        assert_eq!(result, Value::Int(4));
    }

    #[test]
    fn test_import_pandas_is_inert() {
        let result = run("import pandas as pd\nanswer = len(df)\n", &people()).unwrap();
        assert_eq!(result, Value::Int(2));
    }

    #[test]
    fn test_negative_index() {
        let result = run("answer = df[\"age\"][-1]\n", &people()).unwrap();
        assert_eq!(result, Value::Int(40));
    }

    #[test]
    fn test_slice_rows() {
        let result = run("answer = len(df[0:1])\n", &people()).unwrap();
        assert_eq!(result, Value::Int(1));
    }

    #[test]
    fn test_string_concat_and_membership() {
        let result = run("answer = \"a\" + \"b\"\n", &people()).unwrap();
        assert_eq!(result, Value::Str("ab".to_string()));

        let result = run("answer = \"a\" in df[\"name\"]\n", &people()).unwrap();
        assert_eq!(result, Value::Bool(true));
    }

    #[test]
    fn test_determinism_same_program_same_result() {
        let ds = people();
        let a = run("answer = df.sort_values(\"age\").head(1)[\"age\"].sum()\n", &ds).unwrap();
        let b = run("answer = df.sort_values(\"age\").head(1)[\"age\"].sum()\n", &ds).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_columns_property() {
        let result = run("answer = df.columns\n", &people()).unwrap();
        assert_eq!(
            result,
            Value::List(vec![
                Value::Str("name".to_string()),
                Value::Str("age".to_string())
            ])
        );
    }

    #[test]
    fn test_truthiness_of_table_is_ambiguous() {
        let err = run("if df:\n    answer = 1\n", &people()).unwrap_err();
        assert!(matches!(err, ExecError::RuntimeFailure { .. }));
    }

    #[test]
    fn test_unary_not_and_boolop() {
        let result = run("answer = not (1 > 2) and True\n", &people()).unwrap();
        assert_eq!(result, Value::Bool(true));
    }
}
