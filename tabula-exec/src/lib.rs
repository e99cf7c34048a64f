//! TABULA Exec - Sandboxed Execution
//!
//! A tree-walking interpreter for validated analysis programs. The
//! execution context exposes exactly the dataset binding, the result
//! binding, loop bindings, and the builtin allowlist - there is no
//! filesystem, network, process, or reflection surface to reach,
//! because none exists in the interpreter.
//!
//! Containment is enforced by the harness, not by the executed code's
//! discipline: a fuel counter, a per-loop iteration ceiling, a
//! materialized-cell ceiling, and a wall-clock deadline checked inside
//! the evaluation loop. The dataset is borrowed immutably and its
//! content hash is verified after every run.

mod executor;
mod interp;
mod normalize;
mod value;

pub use executor::Executor;
pub use interp::Interpreter;
pub use normalize::normalize;
pub use value::{GroupedValue, SeriesValue, TableValue, Value};
