//! TABULA LLM - Provider Boundary
//!
//! Provider-agnostic traits for code generation and business-summary
//! prose. The model is a black box behind `generate_code`: whatever it
//! returns is untrusted input and always passes through the policy
//! gate before it can touch a dataset.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tabula_core::{LlmError, TabulaError, TabulaResult};

pub mod providers;

pub use providers::gemini::{GeminiClient, GeminiCodeGenerator, GeminiInsightWriter};

// ============================================================================
// PROVIDER TRAITS
// ============================================================================

/// Trait for code-generation providers.
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait CodeGenerator: Send + Sync {
    /// Turn a prompt into raw code text.
    ///
    /// # Arguments
    /// * `prompt` - The fully assembled prompt
    ///
    /// # Returns
    /// * `Ok(String)` - The generated code text, verbatim
    /// * `Err(TabulaError::Llm)` - On transport, quota, or response failure
    async fn generate_code(&self, prompt: &str) -> TabulaResult<String>;

    /// Identifier of the model behind this provider.
    fn model_id(&self) -> &str;
}

/// Trait for business-summary prose providers.
///
/// Only the interface is specified here; the pipeline works without a
/// writer registered, it just returns no prose.
#[async_trait]
pub trait InsightWriter: Send + Sync {
    /// Plain-language answer for a computed result.
    async fn write_summary(&self, question: &str, result_preview: &str) -> TabulaResult<String>;

    /// Executive overview of a dataset from its schema descriptor JSON.
    async fn write_overview(&self, descriptor_json: &str) -> TabulaResult<String>;
}

// ============================================================================
// PROVIDER REGISTRY
// ============================================================================

/// Registry for LLM providers.
/// Providers must be explicitly registered - no auto-discovery.
pub struct ProviderRegistry {
    generator: Option<Arc<dyn CodeGenerator>>,
    insight: Option<Arc<dyn InsightWriter>>,
}

impl ProviderRegistry {
    /// Create a new empty provider registry.
    pub fn new() -> Self {
        Self {
            generator: None,
            insight: None,
        }
    }

    /// Register a code generator, replacing any previous one.
    pub fn register_generator(&mut self, provider: Box<dyn CodeGenerator>) {
        self.generator = Some(Arc::from(provider));
    }

    /// Register an insight writer, replacing any previous one.
    pub fn register_insight(&mut self, provider: Box<dyn InsightWriter>) {
        self.insight = Some(Arc::from(provider));
    }

    /// Register an already-shared code generator. Lets a caller keep
    /// its own handle to the provider (tests use this to observe the
    /// mock's call count).
    pub fn register_generator_shared(&mut self, provider: Arc<dyn CodeGenerator>) {
        self.generator = Some(provider);
    }

    /// Register an already-shared insight writer.
    pub fn register_insight_shared(&mut self, provider: Arc<dyn InsightWriter>) {
        self.insight = Some(provider);
    }

    /// Get the registered code generator.
    pub fn generator(&self) -> TabulaResult<Arc<dyn CodeGenerator>> {
        self.generator
            .clone()
            .ok_or(TabulaError::Llm(LlmError::ProviderNotConfigured))
    }

    /// Get the registered insight writer.
    pub fn insight(&self) -> TabulaResult<Arc<dyn InsightWriter>> {
        self.insight
            .clone()
            .ok_or(TabulaError::Llm(LlmError::ProviderNotConfigured))
    }

    /// Check if a code generator is registered.
    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    /// Check if an insight writer is registered.
    pub fn has_insight(&self) -> bool {
        self.insight.is_some()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("generator", &self.generator.is_some())
            .field("insight", &self.insight.is_some())
            .finish()
    }
}

// ============================================================================
// CODE FENCE STRIPPING
// ============================================================================

/// Strip markdown code fences the model tends to wrap code in.
/// Returns the inner text unchanged if there is no fence.
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    let rest = rest.strip_prefix("python").unwrap_or(rest);
    rest.trim().to_string()
}

// ============================================================================
// MOCK PROVIDERS FOR TESTING
// ============================================================================

/// Mock code generator with a scripted response queue and a call
/// counter, so tests can drive every pipeline branch deterministically.
pub struct MockCodeGenerator {
    responses: Mutex<VecDeque<TabulaResult<String>>>,
    prompts: Mutex<Vec<String>>,
    fallback: String,
    calls: AtomicU64,
}

impl MockCodeGenerator {
    /// Create a mock that always returns `fallback` once its queue is
    /// empty.
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            fallback: fallback.into(),
            calls: AtomicU64::new(0),
        }
    }

    /// Queue one scripted response (success or failure).
    pub fn push_response(&self, response: TabulaResult<String>) {
        self.responses
            .lock()
            .expect("mock queue lock")
            .push_back(response);
    }

    /// Number of generate_code calls so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    /// Every prompt received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("mock prompt lock").clone()
    }
}

#[async_trait]
impl CodeGenerator for MockCodeGenerator {
    async fn generate_code(&self, prompt: &str) -> TabulaResult<String> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.prompts
            .lock()
            .expect("mock prompt lock")
            .push(prompt.to_string());
        self.responses
            .lock()
            .expect("mock queue lock")
            .pop_front()
            .unwrap_or_else(|| Ok(self.fallback.clone()))
    }

    fn model_id(&self) -> &str {
        "mock-codegen"
    }
}

/// Mock insight writer producing deterministic prose.
#[derive(Debug, Clone, Default)]
pub struct MockInsightWriter;

#[async_trait]
impl InsightWriter for MockInsightWriter {
    async fn write_summary(&self, question: &str, result_preview: &str) -> TabulaResult<String> {
        Ok(format!("Answer to {:?}: {}", question, result_preview))
    }

    async fn write_overview(&self, descriptor_json: &str) -> TabulaResult<String> {
        Ok(format!("Overview of dataset: {}", descriptor_json))
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::{LlmError, TabulaError};

    #[test]
    fn test_registry_new_is_empty() {
        let registry = ProviderRegistry::new();
        assert!(!registry.has_generator());
        assert!(!registry.has_insight());
    }

    #[test]
    fn test_registry_unconfigured_generator_errors() {
        let registry = ProviderRegistry::new();
        match registry.generator() {
            Err(TabulaError::Llm(LlmError::ProviderNotConfigured)) => {}
            other => panic!("expected ProviderNotConfigured, got {:?}", other.is_ok()),
        }
    }

    #[test]
    fn test_registry_register_generator() {
        let mut registry = ProviderRegistry::new();
        registry.register_generator(Box::new(MockCodeGenerator::new("answer = 1")));
        assert!(registry.has_generator());
        assert!(registry.generator().is_ok());
    }

    #[tokio::test]
    async fn test_mock_generator_queue_and_fallback() {
        let generator = MockCodeGenerator::new("answer = 0");
        generator.push_response(Ok("answer = 1".to_string()));
        generator.push_response(Err(TabulaError::Llm(LlmError::Unavailable {
            provider: "mock".to_string(),
            message: "down".to_string(),
        })));

        assert_eq!(generator.generate_code("p").await.unwrap(), "answer = 1");
        assert!(generator.generate_code("p").await.is_err());
        assert_eq!(generator.generate_code("p").await.unwrap(), "answer = 0");
        assert_eq!(generator.calls(), 3);
    }

    #[tokio::test]
    async fn test_mock_insight_writer_is_deterministic() {
        let writer = MockInsightWriter;
        let a = writer.write_summary("q", "42").await.unwrap();
        let b = writer.write_summary("q", "42").await.unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_strip_code_fences_variants() {
        assert_eq!(strip_code_fences("answer = 1"), "answer = 1");
        assert_eq!(strip_code_fences("```python\nanswer = 1\n```"), "answer = 1");
        assert_eq!(strip_code_fences("```\nanswer = 1\n```"), "answer = 1");
        assert_eq!(strip_code_fences("  answer = 1  "), "answer = 1");
    }
}
