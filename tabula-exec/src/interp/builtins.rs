//! Builtin functions and tabular method dispatch
//!
//! The callable surface matches the policy allowlist exactly: a method
//! the gate admits is implemented here, and nothing else exists.

use super::*;

// ============================================================================
// ARGUMENT HELPERS
// ============================================================================

fn int_arg(args: &[Value], idx: usize, default: i64) -> Result<i64, ExecError> {
    match args.get(idx) {
        None => Ok(default),
        Some(Value::Int(v)) => Ok(*v),
        Some(other) => Err(fail(format!(
            "argument {} must be an integer, found {}",
            idx + 1,
            other.type_name()
        ))),
    }
}

fn str_arg(args: &[Value], idx: usize) -> Result<String, ExecError> {
    match args.get(idx) {
        Some(Value::Str(s)) => Ok(s.clone()),
        Some(other) => Err(fail(format!(
            "argument {} must be a string, found {}",
            idx + 1,
            other.type_name()
        ))),
        None => Err(fail(format!("argument {} is required", idx + 1))),
    }
}

fn scalar_arg(args: &[Value], idx: usize) -> Result<CellValue, ExecError> {
    match args.get(idx) {
        Some(value) => value_to_cell(value)
            .ok_or_else(|| fail(format!("argument {} must be a scalar", idx + 1))),
        None => Err(fail(format!("argument {} is required", idx + 1))),
    }
}

fn kwarg<'v>(kwargs: &'v [(String, Value)], name: &str) -> Option<&'v Value> {
    kwargs.iter().find(|(n, _)| n == name).map(|(_, v)| v)
}

fn bool_kwarg(
    kwargs: &[(String, Value)],
    name: &str,
    default: bool,
) -> Result<bool, ExecError> {
    match kwarg(kwargs, name) {
        None => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => Err(fail(format!(
            "{} must be a boolean, found {}",
            name,
            other.type_name()
        ))),
    }
}

fn str_of_cell(cell: &CellValue) -> String {
    match cell {
        CellValue::Null => "None".to_string(),
        CellValue::Bool(true) => "True".to_string(),
        CellValue::Bool(false) => "False".to_string(),
        other => other.to_string(),
    }
}

const AGGREGATES: [&str; 8] = [
    "mean", "sum", "min", "max", "count", "median", "std", "nunique",
];

// ============================================================================
// BUILTINS
// ============================================================================

impl<'a> Interpreter<'a> {
    pub(super) fn call_builtin(
        &mut self,
        name: &str,
        args: Vec<Value>,
    ) -> Result<Value, ExecError> {
        match name {
            "len" => match args.first() {
                Some(Value::Table(t)) => Ok(Value::Int(t.row_count() as i64)),
                Some(Value::Series(s)) => Ok(Value::Int(s.values.len() as i64)),
                Some(Value::List(items)) => Ok(Value::Int(items.len() as i64)),
                Some(Value::Str(s)) => Ok(Value::Int(s.chars().count() as i64)),
                Some(other) => Err(fail(format!("{} has no length", other.type_name()))),
                None => Err(fail("len takes one argument")),
            },

            "min" | "max" => self.builtin_min_max(name, args),

            "sum" => {
                let cells = collection_cells(args.first())?;
                let non_null: Vec<&CellValue> = cells.iter().filter(|c| !c.is_null()).collect();
                sum_cells(&non_null)
            }

            "abs" => match args.first() {
                Some(Value::Int(i)) => i
                    .checked_abs()
                    .map(Value::Int)
                    .ok_or_else(|| fail("integer overflow")),
                Some(Value::Float(f)) => Ok(Value::Float(f.abs())),
                Some(other) => Err(fail(format!("cannot take abs of {}", other.type_name()))),
                None => Err(fail("abs takes one argument")),
            },

            "round" => {
                let digits = match args.get(1) {
                    None => None,
                    Some(Value::Int(d)) => Some(*d),
                    Some(other) => {
                        return Err(fail(format!(
                            "digits must be an integer, found {}",
                            other.type_name()
                        )))
                    }
                };
                match (args.first(), digits) {
                    (Some(Value::Int(i)), None) => Ok(Value::Int(*i)),
                    (Some(Value::Int(i)), Some(_)) => Ok(Value::Int(*i)),
                    (Some(Value::Float(f)), None) => Ok(Value::Int(f.round() as i64)),
                    (Some(Value::Float(f)), Some(d)) => Ok(Value::Float(round_to(*f, d))),
                    (Some(other), _) => {
                        Err(fail(format!("cannot round {}", other.type_name())))
                    }
                    (None, _) => Err(fail("round takes at least one argument")),
                }
            }

            "sorted" => {
                let mut cells = collection_cells(args.first())?;
                cells.sort_by(cell_cmp);
                let values = cells.into_iter().map(Value::from).collect();
                self.charged(Value::List(values))
            }

            "str" => {
                let cell = scalar_arg(&args, 0)?;
                Ok(Value::Str(str_of_cell(&cell)))
            }

            "int" => match args.first() {
                Some(Value::Int(i)) => Ok(Value::Int(*i)),
                Some(Value::Float(f)) => Ok(Value::Int(f.trunc() as i64)),
                Some(Value::Bool(b)) => Ok(Value::Int(*b as i64)),
                Some(Value::Str(s)) => s
                    .trim()
                    .parse::<i64>()
                    .map(Value::Int)
                    .map_err(|_| fail(format!("cannot convert {:?} to int", s))),
                Some(other) => Err(fail(format!(
                    "cannot convert {} to int",
                    other.type_name()
                ))),
                None => Err(fail("int takes one argument")),
            },

            "float" => match args.first() {
                Some(Value::Int(i)) => Ok(Value::Float(*i as f64)),
                Some(Value::Float(f)) => Ok(Value::Float(*f)),
                Some(Value::Bool(b)) => Ok(Value::Float(*b as i64 as f64)),
                Some(Value::Str(s)) => s
                    .trim()
                    .parse::<f64>()
                    .map(Value::Float)
                    .map_err(|_| fail(format!("cannot convert {:?} to float", s))),
                Some(other) => Err(fail(format!(
                    "cannot convert {} to float",
                    other.type_name()
                ))),
                None => Err(fail("float takes one argument")),
            },

            "range" => self.builtin_range(args),

            _ => Err(fail(format!("builtin {} is not available", name))),
        }
    }

    fn builtin_min_max(&mut self, name: &str, args: Vec<Value>) -> Result<Value, ExecError> {
        let cells: Vec<CellValue> = if args.len() >= 2 {
            args.iter()
                .map(|v| value_to_cell(v).ok_or_else(|| fail("arguments must be scalars")))
                .collect::<Result<_, _>>()?
        } else {
            collection_cells(args.first())?
        };

        let mut best: Option<&CellValue> = None;
        for cell in cells.iter().filter(|c| !c.is_null()) {
            best = Some(match best {
                None => cell,
                Some(current) => {
                    let ord = cell_cmp(cell, current);
                    let wins = if name == "min" {
                        ord == Ordering::Less
                    } else {
                        ord == Ordering::Greater
                    };
                    if wins {
                        cell
                    } else {
                        current
                    }
                }
            });
        }
        Ok(best.cloned().map(Value::from).unwrap_or(Value::Null))
    }

    fn builtin_range(&mut self, args: Vec<Value>) -> Result<Value, ExecError> {
        let mut bounds = Vec::new();
        for arg in &args {
            match arg {
                Value::Int(v) => bounds.push(*v),
                other => {
                    return Err(fail(format!(
                        "range bounds must be integers, found {}",
                        other.type_name()
                    )))
                }
            }
        }
        let (start, stop, step) = match bounds[..] {
            [stop] => (0, stop, 1),
            [start, stop] => (start, stop, 1),
            [start, stop, step] => (start, stop, step),
            _ => return Err(fail("range takes one to three arguments")),
        };
        if step == 0 {
            return Err(fail("range step must not be zero"));
        }

        let span = if step > 0 { stop - start } else { start - stop };
        let count = if span <= 0 {
            0
        } else {
            (span as u64).div_ceil(step.unsigned_abs())
        };
        if count > self.limits.max_loop_iterations {
            return Err(ExecError::ResourceLimitExceeded {
                resource: "range size",
                limit: self.limits.max_loop_iterations,
            });
        }

        let mut items = Vec::with_capacity(count as usize);
        let mut v = start;
        for _ in 0..count {
            items.push(Value::Int(v));
            v += step;
        }
        self.charged(Value::List(items))
    }

    // ========================================================================
    // METHOD DISPATCH
    // ========================================================================

    pub(super) fn call_method(
        &mut self,
        receiver: Value,
        attr: &str,
        args: Vec<Value>,
        kwargs: Vec<(String, Value)>,
    ) -> Result<Value, ExecError> {
        match receiver {
            Value::Table(t) => self.table_method(t, attr, &args, &kwargs),
            Value::Series(s) => self.series_method(s, attr, &args, &kwargs),
            Value::Grouped(g) => self.grouped_method(g, attr, &args),
            Value::Str(s) => str_method(&s, attr, &args),
            Value::List(items) => match attr {
                "tolist" => Ok(Value::List(items)),
                "count" => {
                    let needle = args
                        .first()
                        .ok_or_else(|| fail("count takes one argument"))?;
                    let n = items.iter().filter(|item| *item == needle).count();
                    Ok(Value::Int(n as i64))
                }
                _ => Err(fail(format!("method {} is not available on list", attr))),
            },
            other => Err(fail(format!(
                "method {} is not available on {}",
                attr,
                other.type_name()
            ))),
        }
    }

    // ------------------------------------------------------------------
    // Table methods
    // ------------------------------------------------------------------

    fn table_method(
        &mut self,
        t: TableValue,
        attr: &str,
        args: &[Value],
        kwargs: &[(String, Value)],
    ) -> Result<Value, ExecError> {
        match attr {
            "head" => {
                let n = int_arg(args, 0, 5)?.max(0) as usize;
                let indices: Vec<usize> = (0..t.row_count().min(n)).collect();
                self.charged(Value::Table(t.take_rows(&indices)))
            }

            "tail" => {
                let n = int_arg(args, 0, 5)?.max(0) as usize;
                let rows = t.row_count();
                let indices: Vec<usize> = (rows.saturating_sub(n)..rows).collect();
                self.charged(Value::Table(t.take_rows(&indices)))
            }

            "sort_values" => {
                let by = match args.first().or_else(|| kwarg(kwargs, "by")) {
                    Some(Value::Str(name)) => vec![name.clone()],
                    Some(Value::List(names)) => names
                        .iter()
                        .map(|v| match v {
                            Value::Str(s) => Ok(s.clone()),
                            other => Err(fail(format!(
                                "sort keys must be column names, found {}",
                                other.type_name()
                            ))),
                        })
                        .collect::<Result<_, _>>()?,
                    Some(other) => {
                        return Err(fail(format!(
                            "sort keys must be column names, found {}",
                            other.type_name()
                        )))
                    }
                    None => return Err(fail("sort_values needs a column name")),
                };
                let ascending = bool_kwarg(kwargs, "ascending", true)?;
                let indices = sort_indices(&t, &by, ascending)?;
                self.charged(Value::Table(t.take_rows(&indices)))
            }

            "nlargest" | "nsmallest" => {
                let n = int_arg(args, 0, 5)?.max(0) as usize;
                let by = vec![str_arg(args, 1)?];
                let indices = sort_indices(&t, &by, attr == "nsmallest")?;
                let indices: Vec<usize> = indices.into_iter().take(n).collect();
                self.charged(Value::Table(t.take_rows(&indices)))
            }

            "groupby" => {
                let key = str_arg(args, 0)?;
                let cells = t
                    .column(&key)
                    .ok_or_else(|| fail(format!("unknown column {}", key)))?
                    .clone();

                let mut partitions: Vec<(CellValue, Vec<usize>)> = Vec::new();
                for (i, cell) in cells.iter().enumerate() {
                    match partitions.iter_mut().find(|(k, _)| cells_eq(k, cell)) {
                        Some((_, rows)) => rows.push(i),
                        None => partitions.push((cell.clone(), vec![i])),
                    }
                }

                let groups: Vec<(CellValue, TableValue)> = partitions
                    .into_iter()
                    .map(|(k, rows)| (k, t.take_rows(&rows)))
                    .collect();
                self.charged(Value::Grouped(GroupedValue {
                    key,
                    groups,
                    selected: None,
                }))
            }

            "agg" => {
                let op = str_arg(args, 0)?;
                self.table_method(t, &op, &[], &[])
            }

            "mean" | "sum" | "median" | "std" | "min" | "max" | "count" | "nunique" => {
                let numeric_only = matches!(attr, "mean" | "sum" | "median" | "std");
                let mut names = Vec::new();
                let mut values = Vec::new();
                for (name, cells) in &t.columns {
                    let series = SeriesValue {
                        name: name.clone(),
                        values: cells.clone(),
                    };
                    match series_aggregate(&series, attr) {
                        Ok(value) => {
                            names.push(CellValue::Str(name.clone()));
                            values.push(value_to_cell(&value).unwrap_or(CellValue::Null));
                        }
                        Err(err) => {
                            if !numeric_only {
                                return Err(err);
                            }
                            // Non-numeric columns fall out of numeric aggregates.
                        }
                    }
                }
                self.charged(Value::Table(TableValue {
                    columns: vec![
                        ("column".to_string(), names),
                        (attr.to_string(), values),
                    ],
                }))
            }

            "dropna" => {
                let rows = t.row_count();
                let indices: Vec<usize> = (0..rows)
                    .filter(|&i| t.columns.iter().all(|(_, cells)| !cells[i].is_null()))
                    .collect();
                self.charged(Value::Table(t.take_rows(&indices)))
            }

            "fillna" => {
                let replacement = scalar_arg(args, 0)?;
                let columns = t
                    .columns
                    .iter()
                    .map(|(name, cells)| {
                        (
                            name.clone(),
                            cells
                                .iter()
                                .map(|c| {
                                    if c.is_null() {
                                        replacement.clone()
                                    } else {
                                        c.clone()
                                    }
                                })
                                .collect(),
                        )
                    })
                    .collect();
                self.charged(Value::Table(TableValue { columns }))
            }

            "round" => {
                let digits = int_arg(args, 0, 0)?;
                let columns = t
                    .columns
                    .iter()
                    .map(|(name, cells)| {
                        (
                            name.clone(),
                            cells
                                .iter()
                                .map(|c| match c {
                                    CellValue::Float(f) => CellValue::Float(round_to(*f, digits)),
                                    other => other.clone(),
                                })
                                .collect(),
                        )
                    })
                    .collect();
                self.charged(Value::Table(TableValue { columns }))
            }

            _ => Err(fail(format!("method {} is not available on table", attr))),
        }
    }

    // ------------------------------------------------------------------
    // Series methods
    // ------------------------------------------------------------------

    fn series_method(
        &mut self,
        s: SeriesValue,
        attr: &str,
        args: &[Value],
        kwargs: &[(String, Value)],
    ) -> Result<Value, ExecError> {
        if AGGREGATES.contains(&attr) {
            return series_aggregate(&s, attr);
        }

        match attr {
            "agg" => {
                let op = str_arg(args, 0)?;
                series_aggregate(&s, &op)
            }

            "unique" => {
                let mut seen: Vec<CellValue> = Vec::new();
                for cell in &s.values {
                    if !seen.iter().any(|k| cells_eq(k, cell)) {
                        seen.push(cell.clone());
                    }
                }
                self.charged(Value::Series(SeriesValue {
                    name: s.name,
                    values: seen,
                }))
            }

            "tolist" => {
                let values = s.values.into_iter().map(Value::from).collect();
                self.charged(Value::List(values))
            }

            "value_counts" => {
                let mut counts: Vec<(CellValue, i64)> = Vec::new();
                for cell in s.values.iter().filter(|c| !c.is_null()) {
                    match counts.iter_mut().find(|(k, _)| cells_eq(k, cell)) {
                        Some((_, n)) => *n += 1,
                        None => counts.push((cell.clone(), 1)),
                    }
                }
                counts.sort_by(|a, b| b.1.cmp(&a.1));
                let (keys, values): (Vec<CellValue>, Vec<CellValue>) = counts
                    .into_iter()
                    .map(|(k, n)| (k, CellValue::Int(n)))
                    .unzip();
                self.charged(Value::Table(TableValue {
                    columns: vec![(s.name, keys), ("count".to_string(), values)],
                }))
            }

            "head" => {
                let n = int_arg(args, 0, 5)?.max(0) as usize;
                let values = s.values.iter().take(n).cloned().collect();
                self.charged(Value::Series(SeriesValue {
                    name: s.name,
                    values,
                }))
            }

            "tail" => {
                let n = int_arg(args, 0, 5)?.max(0) as usize;
                let skip = s.values.len().saturating_sub(n);
                let values = s.values.iter().skip(skip).cloned().collect();
                self.charged(Value::Series(SeriesValue {
                    name: s.name,
                    values,
                }))
            }

            "sort_values" => {
                let ascending = bool_kwarg(kwargs, "ascending", true)?;
                let mut values = s.values.clone();
                values.sort_by(|a, b| {
                    let ord = cell_cmp(a, b);
                    if ascending {
                        ord
                    } else {
                        ord.reverse()
                    }
                });
                self.charged(Value::Series(SeriesValue {
                    name: s.name,
                    values,
                }))
            }

            "nlargest" | "nsmallest" => {
                let n = int_arg(args, 0, 5)?.max(0) as usize;
                let mut values: Vec<CellValue> =
                    s.values.iter().filter(|c| !c.is_null()).cloned().collect();
                values.sort_by(|a, b| {
                    let ord = cell_cmp(a, b);
                    if attr == "nsmallest" {
                        ord
                    } else {
                        ord.reverse()
                    }
                });
                values.truncate(n);
                self.charged(Value::Series(SeriesValue {
                    name: s.name,
                    values,
                }))
            }

            "dropna" => {
                let values = s.values.iter().filter(|c| !c.is_null()).cloned().collect();
                self.charged(Value::Series(SeriesValue {
                    name: s.name,
                    values,
                }))
            }

            "fillna" => {
                let replacement = scalar_arg(args, 0)?;
                let values = s
                    .values
                    .iter()
                    .map(|c| {
                        if c.is_null() {
                            replacement.clone()
                        } else {
                            c.clone()
                        }
                    })
                    .collect();
                self.charged(Value::Series(SeriesValue {
                    name: s.name,
                    values,
                }))
            }

            "round" => {
                let digits = int_arg(args, 0, 0)?;
                let values = s
                    .values
                    .iter()
                    .map(|c| match c {
                        CellValue::Float(f) => CellValue::Float(round_to(*f, digits)),
                        other => other.clone(),
                    })
                    .collect();
                self.charged(Value::Series(SeriesValue {
                    name: s.name,
                    values,
                }))
            }

            "astype" => {
                let target = str_arg(args, 0)?;
                let mut values = Vec::with_capacity(s.values.len());
                for cell in &s.values {
                    values.push(cast_cell(cell, &target)?);
                }
                self.charged(Value::Series(SeriesValue {
                    name: s.name,
                    values,
                }))
            }

            "isnull" | "notnull" => {
                let want_null = attr == "isnull";
                let values = s
                    .values
                    .iter()
                    .map(|c| CellValue::Bool(c.is_null() == want_null))
                    .collect();
                self.charged(Value::Series(SeriesValue {
                    name: s.name,
                    values,
                }))
            }

            "between" => {
                let lo = scalar_arg(args, 0)?;
                let hi = scalar_arg(args, 1)?;
                let values = s
                    .values
                    .iter()
                    .map(|c| {
                        CellValue::Bool(
                            scalar_compare(CmpOp::Ge, c, &lo) && scalar_compare(CmpOp::Le, c, &hi),
                        )
                    })
                    .collect();
                self.charged(Value::Series(SeriesValue {
                    name: s.name,
                    values,
                }))
            }

            "isin" => {
                let candidates = match args.first() {
                    Some(Value::List(items)) => items
                        .iter()
                        .map(|v| value_to_cell(v).ok_or_else(|| fail("isin needs scalars")))
                        .collect::<Result<Vec<_>, _>>()?,
                    Some(Value::Series(other)) => other.values.clone(),
                    _ => return Err(fail("isin takes a list of values")),
                };
                let values = s
                    .values
                    .iter()
                    .map(|c| CellValue::Bool(candidates.iter().any(|k| cells_eq(k, c))))
                    .collect();
                self.charged(Value::Series(SeriesValue {
                    name: s.name,
                    values,
                }))
            }

            "contains" | "startswith" => {
                let needle = str_arg(args, 0)?;
                let values = s
                    .values
                    .iter()
                    .map(|c| match c {
                        CellValue::Str(text) => CellValue::Bool(if attr == "contains" {
                            text.contains(&needle)
                        } else {
                            text.starts_with(&needle)
                        }),
                        _ => CellValue::Bool(false),
                    })
                    .collect();
                self.charged(Value::Series(SeriesValue {
                    name: s.name,
                    values,
                }))
            }

            "lower" | "upper" => {
                let mut values = Vec::with_capacity(s.values.len());
                for cell in &s.values {
                    values.push(match cell {
                        CellValue::Null => CellValue::Null,
                        CellValue::Str(text) => CellValue::Str(if attr == "lower" {
                            text.to_lowercase()
                        } else {
                            text.to_uppercase()
                        }),
                        other => {
                            return Err(fail(format!(
                                "cannot apply {} to {}",
                                attr,
                                other.type_name()
                            )))
                        }
                    });
                }
                self.charged(Value::Series(SeriesValue {
                    name: s.name,
                    values,
                }))
            }

            _ => Err(fail(format!("method {} is not available on series", attr))),
        }
    }

    // ------------------------------------------------------------------
    // Grouped methods
    // ------------------------------------------------------------------

    fn grouped_method(
        &mut self,
        g: GroupedValue,
        attr: &str,
        args: &[Value],
    ) -> Result<Value, ExecError> {
        let op = if attr == "agg" {
            str_arg(args, 0)?
        } else {
            attr.to_string()
        };
        if !AGGREGATES.contains(&op.as_str()) {
            return Err(fail(format!("method {} is not available on groups", attr)));
        }

        let label = g.selected.clone().unwrap_or_else(|| "count".to_string());
        let mut keys = Vec::with_capacity(g.groups.len());
        let mut values = Vec::with_capacity(g.groups.len());

        for (key, table) in &g.groups {
            let aggregate = match &g.selected {
                Some(column) => {
                    let cells = table
                        .column(column)
                        .ok_or_else(|| fail(format!("unknown column {}", column)))?;
                    series_aggregate(
                        &SeriesValue {
                            name: column.clone(),
                            values: cells.clone(),
                        },
                        &op,
                    )?
                }
                None if op == "count" => Value::Int(table.row_count() as i64),
                None => return Err(fail("select a column before aggregating groups")),
            };
            keys.push(key.clone());
            values.push(value_to_cell(&aggregate).unwrap_or(CellValue::Null));
        }

        self.charged(Value::Table(TableValue {
            columns: vec![(g.key, keys), (label, values)],
        }))
    }
}

// ============================================================================
// FREE HELPERS
// ============================================================================

fn str_method(s: &str, attr: &str, args: &[Value]) -> Result<Value, ExecError> {
    match attr {
        "contains" => Ok(Value::Bool(s.contains(&str_arg(args, 0)?))),
        "startswith" => Ok(Value::Bool(s.starts_with(&str_arg(args, 0)?))),
        "lower" => Ok(Value::Str(s.to_lowercase())),
        "upper" => Ok(Value::Str(s.to_uppercase())),
        _ => Err(fail(format!("method {} is not available on str", attr))),
    }
}

fn collection_cells(value: Option<&Value>) -> Result<Vec<CellValue>, ExecError> {
    match value {
        Some(Value::Series(s)) => Ok(s.values.clone()),
        Some(Value::List(items)) => items
            .iter()
            .map(|v| value_to_cell(v).ok_or_else(|| fail("collection must hold scalars")))
            .collect(),
        Some(other) => Err(fail(format!(
            "expected a sequence, found {}",
            other.type_name()
        ))),
        None => Err(fail("expected a sequence argument")),
    }
}

fn sort_indices(
    t: &TableValue,
    keys: &[String],
    ascending: bool,
) -> Result<Vec<usize>, ExecError> {
    for key in keys {
        if t.column(key).is_none() {
            return Err(fail(format!("unknown column {}", key)));
        }
    }
    let mut indices: Vec<usize> = (0..t.row_count()).collect();
    indices.sort_by(|&a, &b| {
        for key in keys {
            let cells = t.column(key).expect("checked above");
            let ord = cell_cmp(&cells[a], &cells[b]);
            if ord != Ordering::Equal {
                return if ascending { ord } else { ord.reverse() };
            }
        }
        Ordering::Equal
    });
    Ok(indices)
}

fn round_to(value: f64, digits: i64) -> f64 {
    let factor = 10f64.powi(digits.clamp(-12, 12) as i32);
    (value * factor).round() / factor
}

fn cast_cell(cell: &CellValue, target: &str) -> Result<CellValue, ExecError> {
    match target {
        "int" => match cell {
            CellValue::Null => Ok(CellValue::Null),
            CellValue::Int(i) => Ok(CellValue::Int(*i)),
            CellValue::Float(f) => Ok(CellValue::Int(f.trunc() as i64)),
            CellValue::Bool(b) => Ok(CellValue::Int(*b as i64)),
            CellValue::Str(s) => s
                .trim()
                .parse::<i64>()
                .map(CellValue::Int)
                .map_err(|_| fail(format!("cannot convert {:?} to int", s))),
        },
        "float" => match cell {
            CellValue::Null => Ok(CellValue::Null),
            CellValue::Int(i) => Ok(CellValue::Float(*i as f64)),
            CellValue::Float(f) => Ok(CellValue::Float(*f)),
            CellValue::Bool(b) => Ok(CellValue::Float(*b as i64 as f64)),
            CellValue::Str(s) => s
                .trim()
                .parse::<f64>()
                .map(CellValue::Float)
                .map_err(|_| fail(format!("cannot convert {:?} to float", s))),
        },
        "str" => match cell {
            CellValue::Null => Ok(CellValue::Null),
            other => Ok(CellValue::Str(str_of_cell(other))),
        },
        other => Err(fail(format!("unsupported astype target {}", other))),
    }
}

/// Aggregate one series. Numeric aggregates skip nulls and fail on
/// non-numeric cells; count/nunique/min/max work on any type.
fn series_aggregate(s: &SeriesValue, op: &str) -> Result<Value, ExecError> {
    let non_null: Vec<&CellValue> = s.values.iter().filter(|c| !c.is_null()).collect();

    match op {
        "count" => Ok(Value::Int(non_null.len() as i64)),

        "nunique" => {
            let mut seen: Vec<&CellValue> = Vec::new();
            for cell in &non_null {
                if !seen.iter().any(|k| cells_eq(k, cell)) {
                    seen.push(cell);
                }
            }
            Ok(Value::Int(seen.len() as i64))
        }

        "min" | "max" => {
            let mut best: Option<&&CellValue> = None;
            for cell in &non_null {
                best = Some(match best {
                    None => cell,
                    Some(current) => {
                        let ord = cell_cmp(cell, current);
                        let wins = if op == "min" {
                            ord == Ordering::Less
                        } else {
                            ord == Ordering::Greater
                        };
                        if wins {
                            cell
                        } else {
                            current
                        }
                    }
                });
            }
            Ok(best.map(|c| Value::from((*c).clone())).unwrap_or(Value::Null))
        }

        "sum" => sum_cells(&non_null),

        "mean" => {
            let nums = numeric_cells(s, &non_null)?;
            if nums.is_empty() {
                Ok(Value::Null)
            } else {
                Ok(Value::Float(nums.iter().sum::<f64>() / nums.len() as f64))
            }
        }

        "median" => {
            let mut nums = numeric_cells(s, &non_null)?;
            if nums.is_empty() {
                return Ok(Value::Null);
            }
            nums.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
            let mid = nums.len() / 2;
            let median = if nums.len() % 2 == 0 {
                (nums[mid - 1] + nums[mid]) / 2.0
            } else {
                nums[mid]
            };
            Ok(Value::Float(median))
        }

        "std" => {
            let nums = numeric_cells(s, &non_null)?;
            if nums.len() < 2 {
                return Ok(Value::Null);
            }
            let mean = nums.iter().sum::<f64>() / nums.len() as f64;
            let variance = nums.iter().map(|x| (x - mean).powi(2)).sum::<f64>()
                / (nums.len() - 1) as f64;
            Ok(Value::Float(variance.sqrt()))
        }

        other => Err(fail(format!("unknown aggregate {}", other))),
    }
}

fn numeric_cells(s: &SeriesValue, cells: &[&CellValue]) -> Result<Vec<f64>, ExecError> {
    cells
        .iter()
        .map(|c| {
            as_number(c).ok_or_else(|| fail(format!("column {} is not numeric", s.name)))
        })
        .collect()
}

fn sum_cells(cells: &[&CellValue]) -> Result<Value, ExecError> {
    let mut all_int = true;
    let mut int_sum: i64 = 0;
    let mut float_sum = 0.0;

    for cell in cells {
        if let Some(i) = as_int(cell) {
            if all_int {
                match int_sum.checked_add(i) {
                    Some(v) => int_sum = v,
                    None => {
                        all_int = false;
                        float_sum = int_sum as f64 + i as f64;
                    }
                }
            } else {
                float_sum += i as f64;
            }
        } else if let Some(f) = cell.as_f64() {
            if all_int {
                all_int = false;
                float_sum = int_sum as f64 + f;
            } else {
                float_sum += f;
            }
        } else {
            return Err(fail("cannot sum non-numeric values"));
        }
    }

    if all_int {
        Ok(Value::Int(int_sum))
    } else {
        Ok(Value::Float(float_sum))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: Vec<CellValue>) -> SeriesValue {
        SeriesValue {
            name: "x".to_string(),
            values,
        }
    }

    #[test]
    fn test_aggregate_mean_skips_nulls() {
        let s = series(vec![CellValue::Int(10), CellValue::Null, CellValue::Int(20)]);
        assert_eq!(series_aggregate(&s, "mean").unwrap(), Value::Float(15.0));
    }

    #[test]
    fn test_aggregate_mean_of_empty_is_null() {
        let s = series(vec![CellValue::Null]);
        assert_eq!(series_aggregate(&s, "mean").unwrap(), Value::Null);
    }

    #[test]
    fn test_aggregate_sum_stays_int() {
        let s = series(vec![CellValue::Int(1), CellValue::Int(2)]);
        assert_eq!(series_aggregate(&s, "sum").unwrap(), Value::Int(3));

        let s = series(vec![CellValue::Int(1), CellValue::Float(0.5)]);
        assert_eq!(series_aggregate(&s, "sum").unwrap(), Value::Float(1.5));
    }

    #[test]
    fn test_aggregate_median_even_count() {
        let s = series(vec![
            CellValue::Int(1),
            CellValue::Int(2),
            CellValue::Int(3),
            CellValue::Int(4),
        ]);
        assert_eq!(series_aggregate(&s, "median").unwrap(), Value::Float(2.5));
    }

    #[test]
    fn test_aggregate_std_sample() {
        let s = series(vec![CellValue::Int(2), CellValue::Int(4)]);
        match series_aggregate(&s, "std").unwrap() {
            Value::Float(v) => assert!((v - std::f64::consts::SQRT_2).abs() < 1e-9),
            other => panic!("expected float, got {:?}", other),
        }
    }

    #[test]
    fn test_aggregate_mean_of_text_fails() {
        let s = series(vec![CellValue::Str("a".to_string())]);
        assert!(series_aggregate(&s, "mean").is_err());
    }

    #[test]
    fn test_aggregate_min_max_on_strings() {
        let s = series(vec![
            CellValue::Str("pear".to_string()),
            CellValue::Str("apple".to_string()),
        ]);
        assert_eq!(
            series_aggregate(&s, "min").unwrap(),
            Value::Str("apple".to_string())
        );
        assert_eq!(
            series_aggregate(&s, "max").unwrap(),
            Value::Str("pear".to_string())
        );
    }

    #[test]
    fn test_cast_cell() {
        assert_eq!(
            cast_cell(&CellValue::Str(" 42 ".to_string()), "int").unwrap(),
            CellValue::Int(42)
        );
        assert_eq!(
            cast_cell(&CellValue::Int(1), "float").unwrap(),
            CellValue::Float(1.0)
        );
        assert!(cast_cell(&CellValue::Str("x".to_string()), "int").is_err());
    }

    #[test]
    fn test_round_to() {
        assert!((round_to(2.675, 2) - 2.68).abs() < 1e-9);
        assert_eq!(round_to(35.0, 0), 35.0);
    }
}
