//! TABULA Test Utils - Fixtures and Generators
//!
//! Canned datasets and proptest strategies shared by the crate test
//! suites. Not part of the public analysis API.

use proptest::prelude::*;
use tabula_core::{CellValue, Column, Dataset};

// ============================================================================
// FIXTURE DATASETS
// ============================================================================

/// Two-row people dataset: `{name: text, age: numeric}`.
pub fn people_dataset() -> Dataset {
    Dataset::new(vec![
        Column::new("name", vec!["a".into(), "b".into()]),
        Column::new("age", vec![30i64.into(), 40i64.into()]),
    ])
    .expect("fixture is well-formed")
}

/// Small sales dataset with a categorical column, floats, and nulls.
pub fn sales_dataset() -> Dataset {
    Dataset::new(vec![
        Column::new(
            "city",
            vec![
                "Oslo".into(),
                "Bergen".into(),
                "Oslo".into(),
                "Oslo".into(),
                "Bergen".into(),
            ],
        ),
        Column::new(
            "revenue",
            vec![
                100.0.into(),
                80.0.into(),
                CellValue::Null,
                120.0.into(),
                60.0.into(),
            ],
        ),
        Column::new(
            "units",
            vec![
                10i64.into(),
                8i64.into(),
                12i64.into(),
                11i64.into(),
                6i64.into(),
            ],
        ),
    ])
    .expect("fixture is well-formed")
}

/// Dataset with zero rows but typed columns.
pub fn empty_rows_dataset() -> Dataset {
    Dataset::new(vec![Column::new("x", vec![]), Column::new("y", vec![])])
        .expect("fixture is well-formed")
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

/// Strategy over single cells, nulls included.
pub fn arb_cell() -> impl Strategy<Value = CellValue> {
    prop_oneof![
        Just(CellValue::Null),
        any::<bool>().prop_map(CellValue::Bool),
        (-1_000_000i64..1_000_000).prop_map(CellValue::Int),
        (-1e6f64..1e6).prop_map(CellValue::Float),
        "[a-z]{0,8}".prop_map(CellValue::Str),
    ]
}

/// Strategy over small well-formed datasets (1-4 columns, 0-16 rows).
pub fn arb_dataset() -> impl Strategy<Value = Dataset> {
    (1usize..=4, 0usize..=16).prop_flat_map(|(cols, rows)| {
        proptest::collection::vec(proptest::collection::vec(arb_cell(), rows..=rows), cols..=cols)
            .prop_map(move |columns| {
                Dataset::new(
                    columns
                        .into_iter()
                        .enumerate()
                        .map(|(i, cells)| Column::new(format!("c{}", i), cells))
                        .collect(),
                )
                .expect("generated dataset is well-formed")
            })
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_are_well_formed() {
        assert_eq!(people_dataset().row_count(), 2);
        assert_eq!(sales_dataset().row_count(), 5);
        assert_eq!(empty_rows_dataset().row_count(), 0);
    }

    proptest! {
        #[test]
        fn prop_generated_datasets_are_consistent(ds in arb_dataset()) {
            for col in ds.columns() {
                prop_assert_eq!(col.cells.len(), ds.row_count());
            }
        }
    }
}
