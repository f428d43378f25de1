//! Common types for provider calls

use crate::cards::{PromptIntent, PromptRequest};
use serde::Serialize;

/// One completion call: a prompt plus sampling parameters
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub prompt: PromptRequest,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl LlmRequest {
    pub fn new(prompt: PromptRequest, temperature: f32, max_tokens: u32) -> Self {
        Self {
            prompt,
            temperature,
            max_tokens,
        }
    }

    pub fn intent(&self) -> PromptIntent {
        self.prompt.intent
    }
}

/// Raw model text, unparsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmResponse {
    pub text: String,
    pub usage: Usage,
}

/// Token accounting as reported by the provider; zero when not reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Usage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

impl Usage {
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}
