//! Dataset types
//!
//! The in-memory table a session analyzes. Immutable during analysis:
//! generated code only ever sees a borrowed view, and the executor
//! verifies the content hash before and after every run.

use crate::error::DatasetError;
use crate::{compute_content_hash, ContentHash};
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// CELL VALUES
// ============================================================================

/// A single cell of a dataset column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl CellValue {
    /// Whether this cell is null/missing.
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Numeric view of this cell, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Short name of the cell's runtime type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Null => "null",
            CellValue::Bool(_) => "bool",
            CellValue::Int(_) => "int",
            CellValue::Float(_) => "float",
            CellValue::Str(_) => "str",
        }
    }

    /// Canonical byte encoding used for content hashing.
    /// Tag byte followed by a fixed-width or length-free payload;
    /// floats hash by bit pattern so -0.0 and 0.0 stay distinct.
    fn hash_bytes(&self, out: &mut Vec<u8>) {
        match self {
            CellValue::Null => out.push(0),
            CellValue::Bool(b) => {
                out.push(1);
                out.push(*b as u8);
            }
            CellValue::Int(i) => {
                out.push(2);
                out.extend_from_slice(&i.to_le_bytes());
            }
            CellValue::Float(f) => {
                out.push(3);
                out.extend_from_slice(&f.to_bits().to_le_bytes());
            }
            CellValue::Str(s) => {
                out.push(4);
                out.extend_from_slice(&(s.len() as u64).to_le_bytes());
                out.extend_from_slice(s.as_bytes());
            }
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => write!(f, ""),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Int(i) => write!(f, "{}", i),
            CellValue::Float(x) => write!(f, "{}", x),
            CellValue::Str(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        CellValue::Int(v)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        CellValue::Float(v)
    }
}

impl From<bool> for CellValue {
    fn from(v: bool) -> Self {
        CellValue::Bool(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        CellValue::Str(v.to_string())
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        CellValue::Str(v)
    }
}

// ============================================================================
// COLUMNS AND DATASET
// ============================================================================

/// A named column of cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub cells: Vec<CellValue>,
}

impl Column {
    /// Create a column from a name and cells.
    pub fn new(name: impl Into<String>, cells: Vec<CellValue>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }

    /// Number of null cells in this column.
    pub fn null_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_null()).count()
    }
}

/// An in-memory table owned by a session.
///
/// Column names are unique and all columns have equal length; both
/// invariants are checked at construction. Loading bytes into a
/// `Dataset` (CSV/XLSX sniffing and parsing) is an external
/// collaborator's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<Column>,
}

impl Dataset {
    /// Build a dataset from columns, validating structural invariants.
    pub fn new(columns: Vec<Column>) -> Result<Self, DatasetError> {
        let mut seen = std::collections::HashSet::new();
        for col in &columns {
            if col.name.is_empty() {
                return Err(DatasetError::EmptyColumnName);
            }
            if !seen.insert(col.name.as_str()) {
                return Err(DatasetError::DuplicateColumn {
                    name: col.name.clone(),
                });
            }
        }
        if let Some(first) = columns.first() {
            let expected = first.cells.len();
            for col in &columns[1..] {
                if col.cells.len() != expected {
                    return Err(DatasetError::RaggedColumn {
                        name: col.name.clone(),
                        expected,
                        got: col.cells.len(),
                    });
                }
            }
        }
        Ok(Self { columns })
    }

    /// An empty dataset with no columns and no rows.
    pub fn empty() -> Self {
        Self { columns: Vec::new() }
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.columns.first().map(|c| c.cells.len()).unwrap_or(0)
    }

    /// Number of columns.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// All columns in declaration order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// SHA-256 hash over a canonical byte encoding of the whole table.
    ///
    /// Used by the executor to verify the dataset is observably
    /// unchanged after every run.
    pub fn content_hash(&self) -> ContentHash {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&(self.columns.len() as u64).to_le_bytes());
        for col in &self.columns {
            bytes.extend_from_slice(&(col.name.len() as u64).to_le_bytes());
            bytes.extend_from_slice(col.name.as_bytes());
            bytes.extend_from_slice(&(col.cells.len() as u64).to_le_bytes());
            for cell in &col.cells {
                cell.hash_bytes(&mut bytes);
            }
        }
        compute_content_hash(&bytes)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn people() -> Dataset {
        Dataset::new(vec![
            Column::new("name", vec!["a".into(), "b".into()]),
            Column::new("age", vec![30i64.into(), 40i64.into()]),
        ])
        .unwrap()
    }

    #[test]
    fn test_dataset_shape() {
        let ds = people();
        assert_eq!(ds.row_count(), 2);
        assert_eq!(ds.column_count(), 2);
        assert_eq!(ds.column_names(), vec!["name", "age"]);
    }

    #[test]
    fn test_empty_dataset_has_zero_rows() {
        let ds = Dataset::empty();
        assert_eq!(ds.row_count(), 0);
        assert_eq!(ds.column_count(), 0);
    }

    #[test]
    fn test_duplicate_column_rejected() {
        let err = Dataset::new(vec![
            Column::new("x", vec![]),
            Column::new("x", vec![]),
        ])
        .unwrap_err();
        assert!(matches!(err, DatasetError::DuplicateColumn { .. }));
    }

    #[test]
    fn test_ragged_columns_rejected() {
        let err = Dataset::new(vec![
            Column::new("a", vec![1i64.into()]),
            Column::new("b", vec![]),
        ])
        .unwrap_err();
        assert!(matches!(err, DatasetError::RaggedColumn { .. }));
    }

    #[test]
    fn test_content_hash_stable() {
        let ds = people();
        assert_eq!(ds.content_hash(), ds.content_hash());
        assert_eq!(ds.content_hash(), ds.clone().content_hash());
    }

    #[test]
    fn test_content_hash_sensitive_to_cells() {
        let a = people();
        let b = Dataset::new(vec![
            Column::new("name", vec!["a".into(), "b".into()]),
            Column::new("age", vec![30i64.into(), 41i64.into()]),
        ])
        .unwrap();
        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn test_content_hash_distinguishes_int_and_float() {
        let a = Dataset::new(vec![Column::new("x", vec![CellValue::Int(1)])]).unwrap();
        let b = Dataset::new(vec![Column::new("x", vec![CellValue::Float(1.0)])]).unwrap();
        assert_ne!(a.content_hash(), b.content_hash());
    }

    #[test]
    fn test_column_null_count() {
        let col = Column::new("x", vec![CellValue::Null, 1i64.into(), CellValue::Null]);
        assert_eq!(col.null_count(), 2);
    }
}

// ============================================================================
// PROPERTY-BASED TESTS
// ============================================================================

#[cfg(test)]
mod prop_tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_cell() -> impl Strategy<Value = CellValue> {
        prop_oneof![
            Just(CellValue::Null),
            any::<bool>().prop_map(CellValue::Bool),
            any::<i64>().prop_map(CellValue::Int),
            any::<f64>().prop_map(CellValue::Float),
            "[a-z ]{0,12}".prop_map(CellValue::Str),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Hashing the same cells twice yields the same hash.
        #[test]
        fn prop_content_hash_deterministic(cells in prop::collection::vec(arb_cell(), 0..32)) {
            let ds = Dataset::new(vec![Column::new("c", cells)]).unwrap();
            prop_assert_eq!(ds.content_hash(), ds.content_hash());
        }

        /// Appending a row always changes the hash.
        #[test]
        fn prop_content_hash_changes_on_append(
            cells in prop::collection::vec(arb_cell(), 0..16),
            extra in arb_cell()
        ) {
            let base = Dataset::new(vec![Column::new("c", cells.clone())]).unwrap();
            let mut grown_cells = cells;
            grown_cells.push(extra);
            let grown = Dataset::new(vec![Column::new("c", grown_cells)]).unwrap();
            prop_assert_ne!(base.content_hash(), grown.content_hash());
        }
    }
}
