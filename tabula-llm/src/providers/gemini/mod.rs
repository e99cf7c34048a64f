//! Google Gemini provider implementation
//!
//! Code generation and business-summary prose over the Generative
//! Language API.

pub mod client;
pub mod codegen;
pub mod types;

pub use client::GeminiClient;
pub use codegen::{GeminiCodeGenerator, GeminiInsightWriter};
