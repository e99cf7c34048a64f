//! TABULA Context - Schema Extraction and Prompt Assembly
//!
//! Derives a compact schema descriptor from a dataset and assembles
//! the model prompt from fixed sections in a fixed order. Both halves
//! are pure: identical inputs always produce identical output, so the
//! whole prompt path is testable by snapshotting.

mod prompt;
mod schema;

pub use prompt::PromptBuilder;
pub use schema::extract_schema;
