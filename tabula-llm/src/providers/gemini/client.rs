//! Gemini HTTP client with rate limiting

use super::types::ApiError;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tabula_core::{LlmError, TabulaError, TabulaResult};
use tokio::sync::Semaphore;

/// Gemini API client with request timeout and rate limiting.
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    rate_limiter: Arc<Semaphore>,
}

impl GeminiClient {
    /// Create a new Gemini client.
    ///
    /// # Arguments
    /// * `api_key` - Generative Language API key
    /// * `request_timeout` - Per-request transport timeout
    /// * `max_concurrent` - Maximum in-flight requests
    pub fn new(api_key: impl Into<String>, request_timeout: Duration, max_concurrent: usize) -> Self {
        Self {
            client: Client::builder()
                .timeout(request_timeout)
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            rate_limiter: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Make an API request with rate limiting and error mapping.
    pub async fn request<Req: Serialize, Res: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: Req,
    ) -> TabulaResult<Res> {
        let _permit = self.rate_limiter.acquire().await.map_err(|e| {
            TabulaError::Llm(LlmError::Unavailable {
                provider: "gemini".to_string(),
                message: format!("Rate limiter error: {}", e),
            })
        })?;

        let url = format!("{}/{}", self.base_url, endpoint);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                TabulaError::Llm(LlmError::Unavailable {
                    provider: "gemini".to_string(),
                    message: format!("HTTP request failed: {}", e),
                })
            })?;

        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| {
                TabulaError::Llm(LlmError::InvalidResponse {
                    provider: "gemini".to_string(),
                    reason: format!("Failed to parse response: {}", e),
                })
            })
        } else {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let error_msg = if let Ok(api_error) = serde_json::from_str::<ApiError>(&error_text) {
                api_error.error.message
            } else {
                error_text
            };

            Err(match status {
                StatusCode::TOO_MANY_REQUESTS => TabulaError::Llm(LlmError::RateLimited {
                    provider: "gemini".to_string(),
                }),
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                    TabulaError::Llm(LlmError::InvalidApiKey {
                        provider: "gemini".to_string(),
                    })
                }
                _ => TabulaError::Llm(LlmError::Unavailable {
                    provider: "gemini".to_string(),
                    message: error_msg,
                }),
            })
        }
    }
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}
