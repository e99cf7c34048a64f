//! Schema extractor
//!
//! Pure function from dataset to descriptor. Never errors: ambiguous
//! columns degrade to a best-guess type instead of failing, and an
//! empty dataset comes back with row count 0 and unknown types.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tabula_core::{CellValue, Column, ColumnDescriptor, ColumnType, Dataset, SchemaDescriptor};

/// Distinct-value ratio at or below which a string column counts as
/// categorical rather than free text.
const CATEGORICAL_RATIO: f64 = 0.5;

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%m/%d/%Y"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

/// Derive a schema descriptor from a dataset.
///
/// `sample_cap` bounds the distinct sample values kept per column so
/// very wide or very long datasets cannot blow up the prompt.
pub fn extract_schema(dataset: &Dataset, sample_cap: usize) -> SchemaDescriptor {
    SchemaDescriptor {
        row_count: dataset.row_count(),
        columns: dataset
            .columns()
            .iter()
            .map(|column| describe_column(column, sample_cap))
            .collect(),
    }
}

fn describe_column(column: &Column, sample_cap: usize) -> ColumnDescriptor {
    let mut samples: Vec<String> = Vec::new();
    for cell in column.cells.iter().filter(|c| !c.is_null()) {
        if samples.len() >= sample_cap {
            break;
        }
        let text = cell.to_string();
        if !samples.contains(&text) {
            samples.push(text);
        }
    }

    ColumnDescriptor {
        name: column.name.clone(),
        inferred_type: infer_type(&column.cells),
        null_count: column.null_count(),
        sample_values: samples,
    }
}

/// Majority-vote type inference over non-null cells with a fixed
/// tie-break: numeric > datetime > categorical > text. Boolean wins
/// only when every typed cell is boolean.
fn infer_type(cells: &[CellValue]) -> ColumnType {
    let typed: Vec<&CellValue> = cells.iter().filter(|c| !c.is_null()).collect();
    if typed.is_empty() {
        return ColumnType::Unknown;
    }

    let mut boolean = 0usize;
    let mut numeric = 0usize;
    let mut datetime = 0usize;
    let mut strings: Vec<&str> = Vec::new();

    for cell in &typed {
        match cell {
            CellValue::Bool(_) => boolean += 1,
            CellValue::Int(_) | CellValue::Float(_) => numeric += 1,
            CellValue::Str(s) => {
                if parses_as_datetime(s) {
                    datetime += 1;
                } else {
                    strings.push(s);
                }
            }
            CellValue::Null => unreachable!("nulls filtered above"),
        }
    }

    if boolean == typed.len() {
        return ColumnType::Boolean;
    }

    // Booleans side with numerics once the column is mixed.
    let numeric = numeric + boolean;
    let text = strings.len();

    if numeric >= datetime && numeric >= text {
        return ColumnType::Numeric;
    }
    if datetime >= text {
        return ColumnType::Datetime;
    }

    let mut distinct: Vec<&str> = Vec::new();
    for s in &strings {
        if !distinct.contains(s) {
            distinct.push(s);
        }
    }
    let ratio = distinct.len() as f64 / text as f64;
    if text >= 2 && ratio <= CATEGORICAL_RATIO {
        ColumnType::Categorical
    } else {
        ColumnType::Text
    }
}

fn parses_as_datetime(s: &str) -> bool {
    let s = s.trim();
    if DateTime::parse_from_rfc3339(s).is_ok() {
        return true;
    }
    if DATE_FORMATS
        .iter()
        .any(|fmt| NaiveDate::parse_from_str(s, fmt).is_ok())
    {
        return true;
    }
    DATETIME_FORMATS
        .iter()
        .any(|fmt| NaiveDateTime::parse_from_str(s, fmt).is_ok())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn column(cells: Vec<CellValue>) -> Column {
        Column::new("c", cells)
    }

    #[test]
    fn test_empty_dataset_descriptor() {
        let descriptor = extract_schema(&Dataset::empty(), 5);
        assert_eq!(descriptor.row_count, 0);
        assert!(descriptor.columns.is_empty());
    }

    #[test]
    fn test_empty_column_is_unknown() {
        assert_eq!(infer_type(&[]), ColumnType::Unknown);
        assert_eq!(infer_type(&[CellValue::Null]), ColumnType::Unknown);
    }

    #[test]
    fn test_numeric_column() {
        assert_eq!(
            infer_type(&[CellValue::Int(1), CellValue::Float(2.5), CellValue::Null]),
            ColumnType::Numeric
        );
    }

    #[test]
    fn test_all_boolean_column() {
        assert_eq!(
            infer_type(&[CellValue::Bool(true), CellValue::Bool(false)]),
            ColumnType::Boolean
        );
    }

    #[test]
    fn test_mixed_boolean_counts_as_numeric() {
        assert_eq!(
            infer_type(&[CellValue::Bool(true), CellValue::Int(3)]),
            ColumnType::Numeric
        );
    }

    #[test]
    fn test_datetime_column() {
        assert_eq!(
            infer_type(&[
                CellValue::Str("2024-01-01".into()),
                CellValue::Str("2024-02-15".into()),
            ]),
            ColumnType::Datetime
        );
    }

    #[test]
    fn test_tie_break_numeric_over_datetime() {
        // One numeric, one datetime string: numeric wins the tie.
        assert_eq!(
            infer_type(&[CellValue::Int(5), CellValue::Str("2024-01-01".into())]),
            ColumnType::Numeric
        );
    }

    #[test]
    fn test_tie_break_datetime_over_text() {
        assert_eq!(
            infer_type(&[
                CellValue::Str("2024-01-01".into()),
                CellValue::Str("hello".into()),
            ]),
            ColumnType::Datetime
        );
    }

    #[test]
    fn test_categorical_by_distinct_ratio() {
        assert_eq!(
            infer_type(&[
                CellValue::Str("yes".into()),
                CellValue::Str("no".into()),
                CellValue::Str("yes".into()),
                CellValue::Str("yes".into()),
            ]),
            ColumnType::Categorical
        );
    }

    #[test]
    fn test_text_when_mostly_distinct() {
        assert_eq!(
            infer_type(&[
                CellValue::Str("alpha".into()),
                CellValue::Str("beta".into()),
                CellValue::Str("gamma".into()),
            ]),
            ColumnType::Text
        );
    }

    #[test]
    fn test_single_string_is_text() {
        assert_eq!(
            infer_type(&[CellValue::Str("only".into())]),
            ColumnType::Text
        );
    }

    #[test]
    fn test_samples_are_distinct_and_capped() {
        let col = column(vec![
            CellValue::Str("a".into()),
            CellValue::Str("a".into()),
            CellValue::Str("b".into()),
            CellValue::Str("c".into()),
            CellValue::Str("d".into()),
        ]);
        let descriptor = describe_column(&col, 3);
        assert_eq!(descriptor.sample_values, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_null_count_recorded() {
        let col = column(vec![CellValue::Null, CellValue::Int(1), CellValue::Null]);
        let descriptor = describe_column(&col, 5);
        assert_eq!(descriptor.null_count, 2);
        assert_eq!(descriptor.inferred_type, ColumnType::Numeric);
    }

    #[test]
    fn test_extract_is_pure() {
        let ds = tabula_test_utils::sales_dataset();
        assert_eq!(extract_schema(&ds, 5), extract_schema(&ds, 5));
    }
}
