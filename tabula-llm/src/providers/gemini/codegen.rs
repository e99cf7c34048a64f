//! Gemini code generation and insight providers

use super::client::GeminiClient;
use super::types::{Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part};
use crate::{strip_code_fences, CodeGenerator, InsightWriter};
use async_trait::async_trait;
use std::time::Duration;
use tabula_core::{LlmError, TabulaError, TabulaResult};

const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Gemini code-generation provider.
pub struct GeminiCodeGenerator {
    client: GeminiClient,
    model: String,
}

impl GeminiCodeGenerator {
    /// Create a new provider for the given model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: GeminiClient::new(api_key, timeout, 4),
            model: model.into(),
        }
    }

    /// Create a provider with the default flash model.
    pub fn with_default_model(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self::new(api_key, DEFAULT_MODEL, timeout)
    }

    fn build_request(prompt: &str, max_tokens: i32) -> GenerateContentRequest {
        GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: Some(GenerationConfig {
                // Low temperature keeps generated programs repeatable.
                temperature: Some(0.2),
                max_output_tokens: Some(max_tokens),
            }),
        }
    }

    async fn generate(&self, prompt: &str, max_tokens: i32) -> TabulaResult<String> {
        let endpoint = format!("models/{}:generateContent", self.model);
        let request = Self::build_request(prompt, max_tokens);
        let response: GenerateContentResponse = self.client.request(&endpoint, request).await?;
        response.first_text().ok_or_else(|| {
            TabulaError::Llm(LlmError::InvalidResponse {
                provider: "gemini".to_string(),
                reason: "response contained no text".to_string(),
            })
        })
    }
}

#[async_trait]
impl CodeGenerator for GeminiCodeGenerator {
    async fn generate_code(&self, prompt: &str) -> TabulaResult<String> {
        let text = self.generate(prompt, 600).await?;
        Ok(strip_code_fences(&text))
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

/// Gemini business-summary provider.
pub struct GeminiInsightWriter {
    generator: GeminiCodeGenerator,
}

impl GeminiInsightWriter {
    /// Create a new insight writer for the given model.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            generator: GeminiCodeGenerator::new(api_key, model, timeout),
        }
    }
}

#[async_trait]
impl InsightWriter for GeminiInsightWriter {
    async fn write_summary(&self, question: &str, result_preview: &str) -> TabulaResult<String> {
        let prompt = format!(
            "You are a BI analyst speaking to business stakeholders.\n\
             Question: {}\n\n\
             RESULT (CSV or text preview):\n{}\n\n\
             Write a plain-English, decision-ready answer in 3-6 sentences.\n\
             Include exact numbers where possible.\n\
             End with 2 short recommended actions.",
            question, result_preview
        );
        self.generator.generate(&prompt, 500).await
    }

    async fn write_overview(&self, descriptor_json: &str) -> TabulaResult<String> {
        let prompt = format!(
            "You are a senior business analyst writing for executives (no technical jargon).\n\
             Use the dataset summary to produce crisp, decision-focused output.\n\n\
             DATASET SUMMARY (JSON):\n{}\n\n\
             Write:\n\
             ### Executive Summary\n\
             - 3-4 sentences on size, coverage, and what the data enables\n\n\
             ### Key Findings (5 bullets)\n\
             - Plain language, each bullet starts with a bold headline\n\n\
             ### Risks & Data Quality\n\
             - Brief list of gaps or missing data, with business impact",
            descriptor_json
        );
        self.generator.generate(&prompt, 900).await
    }
}

// ============================================================================
// TESTS
// ============================================================================
