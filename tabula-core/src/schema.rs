//! Schema descriptor types
//!
//! A derived snapshot of a dataset's shape, used to build prompts.
//! Regenerated whenever the dataset changes; never mutated in place.
//! The extraction logic itself lives in tabula-context.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Inferred semantic type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ColumnType {
    Numeric,
    Boolean,
    Datetime,
    Categorical,
    Text,
    /// Empty column or empty dataset.
    Unknown,
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ColumnType::Numeric => "numeric",
            ColumnType::Boolean => "boolean",
            ColumnType::Datetime => "datetime",
            ColumnType::Categorical => "categorical",
            ColumnType::Text => "text",
            ColumnType::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Snapshot of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub inferred_type: ColumnType,
    pub null_count: usize,
    /// Up to a fixed cap of distinct non-null samples, first-seen order.
    pub sample_values: Vec<String>,
}

/// Snapshot of a whole dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDescriptor {
    pub row_count: usize,
    pub columns: Vec<ColumnDescriptor>,
}

impl SchemaDescriptor {
    /// Look up a column descriptor by name.
    pub fn column(&self, name: &str) -> Option<&ColumnDescriptor> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Column names in dataset order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Columns of a given inferred type, in dataset order.
    pub fn columns_of_type(&self, ty: ColumnType) -> Vec<&ColumnDescriptor> {
        self.columns
            .iter()
            .filter(|c| c.inferred_type == ty)
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor() -> SchemaDescriptor {
        SchemaDescriptor {
            row_count: 3,
            columns: vec![
                ColumnDescriptor {
                    name: "city".to_string(),
                    inferred_type: ColumnType::Categorical,
                    null_count: 0,
                    sample_values: vec!["Oslo".to_string()],
                },
                ColumnDescriptor {
                    name: "price".to_string(),
                    inferred_type: ColumnType::Numeric,
                    null_count: 1,
                    sample_values: vec!["10".to_string(), "12.5".to_string()],
                },
            ],
        }
    }

    #[test]
    fn test_column_lookup() {
        let d = descriptor();
        assert_eq!(d.column("price").unwrap().null_count, 1);
        assert!(d.column("missing").is_none());
    }

    #[test]
    fn test_columns_of_type() {
        let d = descriptor();
        let numeric = d.columns_of_type(ColumnType::Numeric);
        assert_eq!(numeric.len(), 1);
        assert_eq!(numeric[0].name, "price");
    }

    #[test]
    fn test_serde_round_trip() {
        let d = descriptor();
        let json = serde_json::to_string(&d).unwrap();
        let back: SchemaDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(d, back);
    }
}
