//! Allowlist tables
//!
//! The permitted surface of the analysis dialect. Anything not listed
//! here is refused; there is no denylist. The tabular method and
//! property tables mirror exactly what the interpreter implements.

use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Modules generated code may import: the tabular-processing library
/// and the numeric library, nothing else. Submodules are not included.
pub static ALLOWED_IMPORTS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["pandas", "numpy"].into_iter().collect());

/// Builtin functions callable by bare name.
pub static BUILTIN_FUNCTIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "len", "min", "max", "sum", "abs", "round", "sorted", "str", "int", "float", "range",
    ]
    .into_iter()
    .collect()
});

/// Methods callable on tabular values (tables, series, group handles,
/// lists, strings, and the `.str` accessor).
pub static TABULAR_METHODS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "head",
        "tail",
        "sort_values",
        "nlargest",
        "nsmallest",
        "groupby",
        "agg",
        "mean",
        "sum",
        "min",
        "max",
        "count",
        "median",
        "std",
        "nunique",
        "unique",
        "tolist",
        "value_counts",
        "dropna",
        "fillna",
        "round",
        "astype",
        "isnull",
        "notnull",
        "between",
        "isin",
        "contains",
        "lower",
        "upper",
        "startswith",
    ]
    .into_iter()
    .collect()
});

/// Attribute reads permitted without a call.
pub static PROPERTIES: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["columns", "shape", "index", "values", "str", "dt"].into_iter().collect());

/// Functions callable on an allowed-import alias (`pd.x(...)`).
/// Deliberately empty: the import line itself is tolerated so models
/// that emit it are not rejected, but everything flows through the
/// dataset binding.
pub static LIBRARY_FUNCTIONS: Lazy<HashSet<&'static str>> = Lazy::new(HashSet::new);

/// The injected dataset binding.
pub const DATASET_BINDING: &str = "df";

/// The designated result binding.
pub const RESULT_BINDING: &str = "answer";

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_imports_are_tabular_and_numeric_only() {
        assert!(ALLOWED_IMPORTS.contains("pandas"));
        assert!(ALLOWED_IMPORTS.contains("numpy"));
        assert!(!ALLOWED_IMPORTS.contains("os"));
        assert!(!ALLOWED_IMPORTS.contains("subprocess"));
        assert_eq!(ALLOWED_IMPORTS.len(), 2);
    }

    #[test]
    fn test_no_io_or_reflection_builtins() {
        for name in ["open", "eval", "exec", "getattr", "setattr", "__import__", "input", "print"] {
            assert!(!BUILTIN_FUNCTIONS.contains(name), "{} must not be callable", name);
        }
    }

    #[test]
    fn test_no_persistence_methods() {
        for name in ["to_csv", "to_excel", "to_parquet", "read_csv", "eval", "query", "apply"] {
            assert!(!TABULAR_METHODS.contains(name), "{} must not be callable", name);
        }
    }
}
