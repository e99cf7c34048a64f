//! Prompt assembly
//!
//! One prompt string from fixed sections in a fixed order: task
//! framing, safety rules, schema, bounded history, question. No hidden
//! randomness anywhere, so identical inputs snapshot identically.

use tabula_core::{PromptLimits, SchemaDescriptor, Turn};

/// Deterministic prompt builder.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    limits: PromptLimits,
}

impl PromptBuilder {
    /// Create a builder with default limits.
    pub fn new() -> Self {
        Self {
            limits: PromptLimits::default(),
        }
    }

    /// Create a builder with explicit limits.
    pub fn with_limits(limits: PromptLimits) -> Self {
        Self { limits }
    }

    /// Assemble the prompt for one question.
    ///
    /// `history` is the full turn log; only the most recent
    /// `history_window` turns are included, oldest first.
    pub fn build(&self, question: &str, schema: &SchemaDescriptor, history: &[Turn]) -> String {
        let mut prompt = String::new();

        prompt.push_str(
            "Convert the user's business question into a short program in a \
             restricted, Python-flavoured analysis dialect that runs against a \
             dataframe called `df`. Return only code, no backticks, no prose.\n\n",
        );

        prompt.push_str("Rules:\n");
        prompt.push_str("- df is already defined (the uploaded dataset) and is read-only\n");
        prompt.push_str("- End by assigning the final result to a variable named: answer\n");
        prompt.push_str("- Only `answer` may be assigned; accumulate through it when looping\n");
        prompt.push_str("- No imports beyond pandas/numpy; no file, network, process, or environment access\n");
        prompt.push_str("- No eval/exec, no double-underscore attributes, no function or class definitions\n");
        prompt.push_str(
            "- No while loops; for-loops only over list literals, column values \
             (.tolist(), .unique()), or range(<integer literal>)\n",
        );
        prompt.push_str("- Prefer a single expression; make a reasonable assumption if the question is ambiguous\n\n");

        self.push_schema(&mut prompt, schema);
        self.push_history(&mut prompt, history);

        prompt.push_str("Question: ");
        prompt.push_str(question);
        prompt.push('\n');

        prompt
    }

    fn push_schema(&self, prompt: &mut String, schema: &SchemaDescriptor) {
        prompt.push_str(&format!("Dataset: {} rows\n", schema.row_count));
        prompt.push_str("Columns:\n");
        for column in &schema.columns {
            let samples = column
                .sample_values
                .iter()
                .take(self.limits.sample_values)
                .cloned()
                .collect::<Vec<_>>()
                .join(", ");
            if samples.is_empty() {
                prompt.push_str(&format!(
                    "- {} ({}, nulls: {})\n",
                    column.name, column.inferred_type, column.null_count
                ));
            } else {
                prompt.push_str(&format!(
                    "- {} ({}, nulls: {}, examples: {})\n",
                    column.name, column.inferred_type, column.null_count, samples
                ));
            }
        }
        prompt.push('\n');
    }

    fn push_history(&self, prompt: &mut String, history: &[Turn]) {
        let window = self.limits.history_window;
        if window == 0 || history.is_empty() {
            return;
        }
        let start = history.len().saturating_sub(window);
        prompt.push_str("Recent conversation:\n");
        for turn in &history[start..] {
            prompt.push_str(&format!("Q: {}\n", turn.question));
            prompt.push_str(&format!(
                "A: {}\n",
                turn.result.preview(self.limits.preview_rows)
            ));
        }
        prompt.push('\n');
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract_schema;
    use tabula_core::{CellValue, ExecutionResult, PolicyVerdict};
    use tabula_test_utils::{people_dataset, sales_dataset};

    fn scalar_turn(question: &str, value: f64) -> Turn {
        Turn::executed(
            question,
            "answer = 1",
            PolicyVerdict::allow(),
            ExecutionResult::Scalar(CellValue::Float(value)),
        )
    }

    #[test]
    fn test_prompt_is_deterministic() {
        let builder = PromptBuilder::new();
        let schema = extract_schema(&sales_dataset(), 5);
        let a = builder.build("total revenue?", &schema, &[]);
        let b = builder.build("total revenue?", &schema, &[]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_prompt_contains_contract_and_constraints() {
        let builder = PromptBuilder::new();
        let schema = extract_schema(&people_dataset(), 5);
        let prompt = builder.build("average age?", &schema, &[]);

        assert!(prompt.contains("a variable named: answer"));
        assert!(prompt.contains("No imports beyond pandas/numpy"));
        assert!(prompt.contains("No while loops"));
        assert!(prompt.contains("no file, network, process, or environment access"));
        assert!(prompt.ends_with("Question: average age?\n"));
    }

    #[test]
    fn test_prompt_schema_block() {
        let builder = PromptBuilder::new();
        let schema = extract_schema(&sales_dataset(), 5);
        let prompt = builder.build("q", &schema, &[]);

        assert!(prompt.contains("Dataset: 5 rows"));
        assert!(prompt.contains("- city (categorical, nulls: 0, examples: Oslo, Bergen)"));
        assert!(prompt.contains("- revenue (numeric, nulls: 1"));
    }

    #[test]
    fn test_history_window_is_bounded() {
        let builder = PromptBuilder::with_limits(PromptLimits {
            history_window: 2,
            ..PromptLimits::default()
        });
        let schema = extract_schema(&people_dataset(), 5);
        let history: Vec<Turn> = (0..5)
            .map(|i| scalar_turn(&format!("question {}", i), i as f64))
            .collect();
        let prompt = builder.build("next", &schema, &history);

        assert!(!prompt.contains("question 0"));
        assert!(!prompt.contains("question 2"));
        assert!(prompt.contains("question 3"));
        assert!(prompt.contains("question 4"));
    }

    #[test]
    fn test_no_history_section_when_empty() {
        let builder = PromptBuilder::new();
        let schema = extract_schema(&people_dataset(), 5);
        let prompt = builder.build("q", &schema, &[]);
        assert!(!prompt.contains("Recent conversation:"));
    }

    #[test]
    fn test_history_shows_result_previews() {
        let builder = PromptBuilder::new();
        let schema = extract_schema(&people_dataset(), 5);
        let history = vec![scalar_turn("average age?", 35.0)];
        let prompt = builder.build("and the max?", &schema, &history);

        assert!(prompt.contains("Q: average age?"));
        assert!(prompt.contains("A: 35"));
    }

    #[test]
    fn test_sample_cap_respected_in_prompt() {
        let builder = PromptBuilder::with_limits(PromptLimits {
            sample_values: 1,
            ..PromptLimits::default()
        });
        let schema = extract_schema(&sales_dataset(), 5);
        let prompt = builder.build("q", &schema, &[]);
        assert!(prompt.contains("examples: Oslo)"));
        assert!(!prompt.contains("Oslo, Bergen"));
    }
}
