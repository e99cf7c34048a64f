//! Chart suggestion
//!
//! Picks a sensible default visualization for a dataset from its
//! schema alone. Rendering is the display layer's job; this only
//! describes what to draw.

use serde::{Deserialize, Serialize};
use tabula_core::{ColumnType, SchemaDescriptor};

/// Kind of suggested chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartKind {
    Scatter,
    Histogram,
    Bar,
}

/// A renderable chart suggestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub kind: ChartKind,
    pub x: String,
    pub y: Option<String>,
    pub title: String,
}

/// Suggest a default chart for a dataset.
///
/// Two numeric columns plot against each other; a single numeric
/// column gets a distribution; otherwise the first categorical column
/// gets a value-count bar chart. Datasets with none of those get no
/// suggestion.
pub fn suggest_chart(schema: &SchemaDescriptor) -> Option<ChartSpec> {
    let numeric = schema.columns_of_type(ColumnType::Numeric);

    if numeric.len() >= 2 {
        return Some(ChartSpec {
            kind: ChartKind::Scatter,
            x: numeric[0].name.clone(),
            y: Some(numeric[1].name.clone()),
            title: format!("{} vs {}", numeric[0].name, numeric[1].name),
        });
    }

    if numeric.len() == 1 {
        return Some(ChartSpec {
            kind: ChartKind::Histogram,
            x: numeric[0].name.clone(),
            y: None,
            title: format!("Distribution of {}", numeric[0].name),
        });
    }

    let categorical = schema
        .columns
        .iter()
        .find(|c| {
            matches!(
                c.inferred_type,
                ColumnType::Categorical | ColumnType::Boolean | ColumnType::Text
            )
        })?;

    Some(ChartSpec {
        kind: ChartKind::Bar,
        x: categorical.name.clone(),
        y: None,
        title: format!("Category counts: {}", categorical.name),
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_context::extract_schema;
    use tabula_core::Dataset;
    use tabula_test_utils::{people_dataset, sales_dataset};

    #[test]
    fn test_two_numeric_columns_scatter() {
        let schema = extract_schema(&sales_dataset(), 5);
        let spec = suggest_chart(&schema).unwrap();
        assert_eq!(spec.kind, ChartKind::Scatter);
        assert_eq!(spec.x, "revenue");
        assert_eq!(spec.y.as_deref(), Some("units"));
    }

    #[test]
    fn test_single_numeric_column_histogram() {
        let schema = extract_schema(&people_dataset(), 5);
        let spec = suggest_chart(&schema).unwrap();
        assert_eq!(spec.kind, ChartKind::Histogram);
        assert_eq!(spec.x, "age");
        assert!(spec.title.contains("Distribution"));
    }

    #[test]
    fn test_no_columns_no_suggestion() {
        let schema = extract_schema(&Dataset::empty(), 5);
        assert!(suggest_chart(&schema).is_none());
    }

    #[test]
    fn test_categorical_only_bar() {
        use tabula_core::Column;
        let ds = Dataset::new(vec![Column::new(
            "city",
            vec!["a".into(), "a".into(), "b".into(), "a".into()],
        )])
        .unwrap();
        let schema = extract_schema(&ds, 5);
        let spec = suggest_chart(&schema).unwrap();
        assert_eq!(spec.kind, ChartKind::Bar);
        assert_eq!(spec.x, "city");
    }
}
