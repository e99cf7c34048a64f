//! Runtime value model

use std::cmp::Ordering;
use tabula_core::{CellValue, Dataset};

// ============================================================================
// VALUES
// ============================================================================

/// A value inside the sandbox.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Series(SeriesValue),
    Table(TableValue),
    /// Intermediate group-by handle; must be aggregated before it can
    /// leave the sandbox.
    Grouped(GroupedValue),
}

/// A named vector of cells (one column, or a derived sequence).
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesValue {
    pub name: String,
    pub values: Vec<CellValue>,
}

/// A columnar table value, shaped like the dataset itself.
#[derive(Debug, Clone, PartialEq)]
pub struct TableValue {
    pub columns: Vec<(String, Vec<CellValue>)>,
}

/// A group-by handle: rows partitioned by a key column, optionally
/// narrowed to one value column.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupedValue {
    pub key: String,
    pub groups: Vec<(CellValue, TableValue)>,
    pub selected: Option<String>,
}

impl Value {
    /// Short name of the value's runtime type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Series(_) => "series",
            Value::Table(_) => "table",
            Value::Grouped(_) => "grouped",
        }
    }

    /// Whether this value is a plain scalar.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Str(_)
        )
    }

    /// Number of cells this value materializes, for the cell ceiling.
    pub fn cell_count(&self) -> u64 {
        match self {
            Value::List(items) => items.len() as u64,
            Value::Series(s) => s.values.len() as u64,
            Value::Table(t) => t
                .columns
                .iter()
                .map(|(_, cells)| cells.len() as u64)
                .sum(),
            Value::Grouped(g) => g
                .groups
                .iter()
                .map(|(_, t)| {
                    t.columns
                        .iter()
                        .map(|(_, cells)| cells.len() as u64)
                        .sum::<u64>()
                })
                .sum(),
            _ => 1,
        }
    }
}

impl From<CellValue> for Value {
    fn from(cell: CellValue) -> Self {
        match cell {
            CellValue::Null => Value::Null,
            CellValue::Bool(b) => Value::Bool(b),
            CellValue::Int(i) => Value::Int(i),
            CellValue::Float(f) => Value::Float(f),
            CellValue::Str(s) => Value::Str(s),
        }
    }
}

/// Convert a scalar value back into a cell. Non-scalars have no cell
/// form.
pub(crate) fn value_to_cell(value: &Value) -> Option<CellValue> {
    match value {
        Value::Null => Some(CellValue::Null),
        Value::Bool(b) => Some(CellValue::Bool(*b)),
        Value::Int(i) => Some(CellValue::Int(*i)),
        Value::Float(f) => Some(CellValue::Float(*f)),
        Value::Str(s) => Some(CellValue::Str(s.clone())),
        _ => None,
    }
}

impl TableValue {
    /// Copy a dataset into a table value. The dataset itself is never
    /// handed to generated code.
    pub fn from_dataset(dataset: &Dataset) -> Self {
        Self {
            columns: dataset
                .columns()
                .iter()
                .map(|c| (c.name.clone(), c.cells.clone()))
                .collect(),
        }
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.columns.first().map(|(_, cells)| cells.len()).unwrap_or(0)
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Vec<CellValue>> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, cells)| cells)
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|(n, _)| n.clone()).collect()
    }

    /// A new table keeping only the rows at `indices`, in that order.
    pub fn take_rows(&self, indices: &[usize]) -> Self {
        Self {
            columns: self
                .columns
                .iter()
                .map(|(name, cells)| {
                    (
                        name.clone(),
                        indices.iter().map(|&i| cells[i].clone()).collect(),
                    )
                })
                .collect(),
        }
    }
}

// ============================================================================
// CELL ORDERING
// ============================================================================

/// Total order over cells used by sorts and min/max: nulls sort last,
/// otherwise by type class (bool, numeric, string) then value.
pub(crate) fn cell_cmp(a: &CellValue, b: &CellValue) -> Ordering {
    fn rank(cell: &CellValue) -> u8 {
        match cell {
            CellValue::Bool(_) => 0,
            CellValue::Int(_) | CellValue::Float(_) => 1,
            CellValue::Str(_) => 2,
            CellValue::Null => 3,
        }
    }

    match (a, b) {
        (CellValue::Null, CellValue::Null) => Ordering::Equal,
        (CellValue::Bool(x), CellValue::Bool(y)) => x.cmp(y),
        (CellValue::Str(x), CellValue::Str(y)) => x.cmp(y),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => rank(a).cmp(&rank(b)),
        },
    }
}

// ============================================================================
// TESTS
// ============================================================================
