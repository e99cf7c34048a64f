//! Result normalizer
//!
//! Coerces whatever the executed code produced into the uniform result
//! envelope. Oversized tables are truncated with an explicit flag,
//! never silently dropped; shapes the envelope cannot represent are
//! reported as errors.

use crate::value::{SeriesValue, TableValue, Value};
use tabula_core::{
    CellValue, ExecLimits, ExecutionResult, FailureKind, TableResult,
};

/// Normalize a raw sandbox value into the result envelope.
pub fn normalize(value: Value, limits: &ExecLimits) -> ExecutionResult {
    match value {
        Value::Null => ExecutionResult::Scalar(CellValue::Null),
        Value::Bool(b) => ExecutionResult::Scalar(CellValue::Bool(b)),
        Value::Int(i) => ExecutionResult::Scalar(CellValue::Int(i)),
        Value::Float(f) => ExecutionResult::Scalar(CellValue::Float(f)),
        Value::Str(s) => ExecutionResult::Scalar(CellValue::Str(s)),

        Value::Series(series) => ExecutionResult::Table(series_table(series, limits)),

        Value::List(items) => match list_table(items, limits) {
            Some(table) => ExecutionResult::Table(table),
            None => ExecutionResult::error(
                FailureKind::UnsupportedResultShape,
                "list results must contain scalar values",
            ),
        },

        Value::Table(table) => ExecutionResult::Table(table_result(table, limits)),

        Value::Grouped(_) => ExecutionResult::error(
            FailureKind::UnsupportedResultShape,
            "group handle must be aggregated before it can be returned",
        ),
    }
}

fn series_table(series: SeriesValue, limits: &ExecLimits) -> TableResult {
    let name = if series.name.is_empty() {
        "value".to_string()
    } else {
        series.name
    };
    let truncated = series.values.len() > limits.max_result_rows;
    let rows = series
        .values
        .into_iter()
        .take(limits.max_result_rows)
        .map(|cell| vec![cell])
        .collect();
    TableResult {
        columns: vec![name],
        rows,
        truncated,
    }
}

fn list_table(items: Vec<Value>, limits: &ExecLimits) -> Option<TableResult> {
    let mut cells = Vec::with_capacity(items.len());
    for item in items {
        cells.push(crate::value::value_to_cell(&item)?);
    }
    let truncated = cells.len() > limits.max_result_rows;
    let rows = cells
        .into_iter()
        .take(limits.max_result_rows)
        .map(|cell| vec![cell])
        .collect();
    Some(TableResult {
        columns: vec!["value".to_string()],
        rows,
        truncated,
    })
}

fn table_result(table: TableValue, limits: &ExecLimits) -> TableResult {
    let row_count = table.row_count();
    let col_count = table.columns.len();
    let truncated = row_count > limits.max_result_rows || col_count > limits.max_result_cols;

    let kept: Vec<&(String, Vec<CellValue>)> =
        table.columns.iter().take(limits.max_result_cols).collect();
    let columns = kept.iter().map(|(name, _)| name.clone()).collect();
    let rows = (0..row_count.min(limits.max_result_rows))
        .map(|i| kept.iter().map(|(_, cells)| cells[i].clone()).collect())
        .collect();

    TableResult {
        columns,
        rows,
        truncated,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_shapes() {
        let limits = ExecLimits::default();
        assert_eq!(
            normalize(Value::Float(35.0), &limits),
            ExecutionResult::Scalar(CellValue::Float(35.0))
        );
        assert_eq!(
            normalize(Value::Str("x".to_string()), &limits),
            ExecutionResult::Scalar(CellValue::Str("x".to_string()))
        );
        assert_eq!(
            normalize(Value::Null, &limits),
            ExecutionResult::Scalar(CellValue::Null)
        );
    }

    #[test]
    fn test_series_becomes_single_column_table() {
        let limits = ExecLimits::default();
        let series = SeriesValue {
            name: "age".to_string(),
            values: vec![CellValue::Int(30), CellValue::Int(40)],
        };
        match normalize(Value::Series(series), &limits) {
            ExecutionResult::Table(t) => {
                assert_eq!(t.columns, vec!["age"]);
                assert_eq!(t.rows.len(), 2);
                assert!(!t.truncated);
            }
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn test_oversized_table_is_truncated_with_flag() {
        let limits = ExecLimits {
            max_result_rows: 3,
            ..ExecLimits::default()
        };
        let table = TableValue {
            columns: vec![(
                "x".to_string(),
                (0..10).map(CellValue::Int).collect(),
            )],
        };
        match normalize(Value::Table(table), &limits) {
            ExecutionResult::Table(t) => {
                assert_eq!(t.rows.len(), 3);
                assert!(t.truncated);
            }
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn test_excess_columns_are_truncated_with_flag() {
        let limits = ExecLimits {
            max_result_cols: 1,
            ..ExecLimits::default()
        };
        let table = TableValue {
            columns: vec![
                ("a".to_string(), vec![CellValue::Int(1)]),
                ("b".to_string(), vec![CellValue::Int(2)]),
            ],
        };
        match normalize(Value::Table(table), &limits) {
            ExecutionResult::Table(t) => {
                assert_eq!(t.columns, vec!["a"]);
                assert!(t.truncated);
            }
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn test_grouped_handle_is_unsupported_shape() {
        let limits = ExecLimits::default();
        let grouped = Value::Grouped(crate::value::GroupedValue {
            key: "k".to_string(),
            groups: Vec::new(),
            selected: None,
        });
        assert_eq!(
            normalize(grouped, &limits).failure_kind(),
            Some(FailureKind::UnsupportedResultShape)
        );
    }

    #[test]
    fn test_list_of_scalars_is_table() {
        let limits = ExecLimits::default();
        let list = Value::List(vec![Value::Int(1), Value::Str("a".to_string())]);
        match normalize(list, &limits) {
            ExecutionResult::Table(t) => {
                assert_eq!(t.columns, vec!["value"]);
                assert_eq!(t.rows.len(), 2);
            }
            other => panic!("expected table, got {:?}", other),
        }
    }

    #[test]
    fn test_list_of_lists_is_unsupported() {
        let limits = ExecLimits::default();
        let nested = Value::List(vec![Value::List(vec![Value::Int(1)])]);
        assert_eq!(
            normalize(nested, &limits).failure_kind(),
            Some(FailureKind::UnsupportedResultShape)
        );
    }
}
