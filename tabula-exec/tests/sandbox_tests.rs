//! Integration tests: validated programs through the full
//! validate-then-execute path, including the containment properties.

use tabula_core::{CellValue, ExecutionResult, FailureKind};
use tabula_exec::Executor;
use tabula_policy::Validator;
use tabula_test_utils::{people_dataset, sales_dataset};

fn gate_and_run(code: &str) -> ExecutionResult {
    let validator = Validator::new();
    let executor = Executor::default();
    let dataset = sales_dataset();
    let (verdict, program) = validator.validate_source(code);
    assert!(verdict.allowed, "violations: {:?}", verdict.violations);
    executor.execute(&program.unwrap(), &dataset)
}

#[test]
fn test_average_of_column_scenario() {
    // Question "average of column age" over [("a", 30), ("b", 40)].
    let validator = Validator::new();
    let executor = Executor::default();
    let (verdict, program) = validator.validate_source("answer = df[\"age\"].mean()\n");
    assert!(verdict.allowed);
    let result = executor.execute(&program.unwrap(), &people_dataset());
    assert_eq!(result, ExecutionResult::Scalar(CellValue::Float(35.0)));
}

#[test]
fn test_rejected_code_never_reaches_the_executor() {
    let validator = Validator::new();
    let executor = Executor::default();
    let (verdict, program) = validator.validate_source("import os; os.system(\"rm -rf /\")\n");
    assert!(!verdict.allowed);
    assert!(program.is_none());
    assert_eq!(executor.executions(), 0);
}

#[test]
fn test_top_cities_by_revenue() {
    let result = gate_and_run("answer = df.groupby(\"city\")[\"revenue\"].sum()\n");
    match result {
        ExecutionResult::Table(t) => {
            assert_eq!(t.columns, vec!["city", "revenue"]);
            assert_eq!(t.rows.len(), 2);
            // First-seen group order: Oslo then Bergen.
            assert_eq!(t.rows[0][0], CellValue::Str("Oslo".to_string()));
            assert_eq!(t.rows[0][1], CellValue::Float(220.0));
            assert_eq!(t.rows[1][1], CellValue::Float(140.0));
        }
        other => panic!("expected table, got {:?}", other),
    }
}

#[test]
fn test_value_counts_table() {
    let result = gate_and_run("answer = df[\"city\"].value_counts()\n");
    match result {
        ExecutionResult::Table(t) => {
            assert_eq!(t.columns, vec!["city", "count"]);
            assert_eq!(t.rows[0], vec![
                CellValue::Str("Oslo".to_string()),
                CellValue::Int(3)
            ]);
        }
        other => panic!("expected table, got {:?}", other),
    }
}

#[test]
fn test_filter_and_count_with_nulls() {
    // Null revenue rows fail the comparison and drop out of the mask.
    let result = gate_and_run("answer = len(df[df[\"revenue\"] > 70])\n");
    assert_eq!(result, ExecutionResult::Scalar(CellValue::Int(3)));
}

#[test]
fn test_sort_head_pipeline() {
    let result =
        gate_and_run("answer = df.sort_values(\"units\", ascending=False).head(2)[\"units\"].tolist()\n");
    match result {
        ExecutionResult::Table(t) => {
            assert_eq!(t.rows.len(), 2);
            assert_eq!(t.rows[0][0], CellValue::Int(12));
            assert_eq!(t.rows[1][0], CellValue::Int(11));
        }
        other => panic!("expected table, got {:?}", other),
    }
}

#[test]
fn test_bounded_loop_aggregation() {
    let code = "\
answer = 0
for u in df[\"units\"].tolist():
    if u > 8:
        answer += u
";
    let result = gate_and_run(code);
    assert_eq!(result, ExecutionResult::Scalar(CellValue::Int(33)));
}

#[test]
fn test_dataset_hash_is_invariant_across_runs() {
    let validator = Validator::new();
    let executor = Executor::default();
    let dataset = sales_dataset();
    let hash = dataset.content_hash();

    for code in [
        "answer = df[\"revenue\"].fillna(0).sum()\n",
        "answer = df.dropna()\n",
        "answer = df.sort_values(\"units\")\n",
        "answer = df[\"city\"].unique()\n",
    ] {
        let (verdict, program) = validator.validate_source(code);
        assert!(verdict.allowed, "{} rejected: {:?}", code, verdict.violations);
        executor.execute(&program.unwrap(), &dataset);
        assert_eq!(dataset.content_hash(), hash, "mutated by {}", code);
    }
}

#[test]
fn test_execution_is_deterministic() {
    let code = "answer = df.groupby(\"city\")[\"units\"].mean()\n";
    let a = gate_and_run(code);
    let b = gate_and_run(code);
    assert_eq!(a, b);
}

#[test]
fn test_missing_answer_binding_is_runtime_failure() {
    let result = gate_and_run("df[\"units\"].sum()\n");
    assert_eq!(result.failure_kind(), Some(FailureKind::RuntimeFailure));
    assert!(result.preview(5).contains("answer"));
}

#[test]
fn test_unsupported_shape_surfaces_as_error() {
    let result = gate_and_run("answer = df.groupby(\"city\")\n");
    assert_eq!(
        result.failure_kind(),
        Some(FailureKind::UnsupportedResultShape)
    );
}

#[test]
fn test_fillna_and_mean() {
    let result = gate_and_run("answer = df[\"revenue\"].fillna(0).mean()\n");
    assert_eq!(result, ExecutionResult::Scalar(CellValue::Float(72.0)));
}

#[test]
fn test_str_accessor_filter() {
    let result = gate_and_run("answer = len(df[df[\"city\"].str.startswith(\"O\")])\n");
    assert_eq!(result, ExecutionResult::Scalar(CellValue::Int(3)));
}
