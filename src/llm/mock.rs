//! Offline provider returning canned card output

use super::types::{LlmRequest, LlmResponse, Usage};
use super::{LlmError, LlmService};
use crate::cards::PromptIntent;
use async_trait::async_trait;
use serde_json::json;

pub const MOCK_MODEL: &str = "mock-model";

/// Deterministic backend for local runs without API keys.
///
/// Decomposition requests get a two-card deck and follow-ups get a single
/// clarification card. Usage is always zero.
pub struct MockService {
    model: String,
}

impl MockService {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }

    fn render(request: &LlmRequest) -> String {
        match request.intent() {
            PromptIntent::Decompose => json!({
                "cards": [
                    {
                        "id": "overview",
                        "title": "Overview",
                        "content": "This is a mock response demonstrating the card layout.",
                        "kind": "text"
                    },
                    {
                        "id": "step-1",
                        "title": "Step 1",
                        "content": "Explain step one clearly and concisely.",
                        "kind": "text"
                    }
                ]
            }),
            PromptIntent::FollowUp => json!({
                "card": {
                    "title": "Clarification",
                    "body": format!("This is a mock answer to: {}", request.prompt.user.trim()),
                    "kind": "info"
                }
            }),
        }
        .to_string()
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new(MOCK_MODEL)
    }
}

#[async_trait]
impl LlmService for MockService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        Ok(LlmResponse {
            text: Self::render(request),
            usage: Usage::default(),
        })
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}
