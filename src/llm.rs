//! Provider abstraction
//!
//! One completion contract over `OpenAI`, Gemini, `DeepSeek` and an offline
//! mock. Adapters never retry; failures carry enough classification for
//! the caller to decide.

mod error;
mod gemini;
mod mock;
mod models;
mod openai;
mod registry;
mod types;

#[cfg(test)]
mod proptests;

pub use error::{LlmError, LlmErrorKind};
pub use mock::{MockService, MOCK_MODEL};
pub use models::{all_providers, Provider, ProviderDef};
pub use registry::{LlmConfig, ProviderInfo, ProviderRegistry, ResolveError, ResolvedService};
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;

/// Common interface for provider backends
#[async_trait]
pub trait LlmService: Send + Sync {
    /// Make a completion request
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Logging wrapper for provider services
pub struct LoggingService {
    inner: Arc<dyn LlmService>,
    provider: Provider,
    model_id: String,
}

impl LoggingService {
    pub fn new(provider: Provider, inner: Arc<dyn LlmService>) -> Self {
        let model_id = inner.model_id().to_string();
        Self {
            inner,
            provider,
            model_id,
        }
    }
}

#[async_trait]
impl LlmService for LoggingService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::info!(
                    provider = %self.provider,
                    model = %self.model_id,
                    intent = ?request.intent(),
                    duration_ms = %duration.as_millis(),
                    input_tokens = response.usage.input_tokens,
                    output_tokens = response.usage.output_tokens,
                    total_tokens = response.usage.total(),
                    "Provider request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    provider = %self.provider,
                    model = %self.model_id,
                    intent = ?request.intent(),
                    duration_ms = %duration.as_millis(),
                    kind = e.kind.as_str(),
                    status = ?e.status,
                    error = %e.message,
                    retryable = e.kind.is_retryable(),
                    "Provider request failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
