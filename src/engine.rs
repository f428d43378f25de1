//! Stateless generate and follow-up operations
//!
//! Each call validates its input, builds the prompt, resolves a provider,
//! makes exactly one completion call and parses the result. No conversation
//! state is touched here; sessions layer navigation on top.

use crate::cards::{parse_follow_up, parse_sequence, prompt, Card, CardDeck, PromptRequest};
use crate::error::CardError;
use crate::interaction_log::{ErrorDetail, InteractionLog, ModelOutput, RequestType, UserInput};
use crate::llm::{LlmRequest, ProviderRegistry};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const MAX_TEMPERATURE: f32 = 2.0;
pub const DEFAULT_GENERATE_MAX_TOKENS: u32 = 800;
pub const DEFAULT_FOLLOW_UP_MAX_TOKENS: u32 = 400;

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_generate_max_tokens() -> u32 {
    DEFAULT_GENERATE_MAX_TOKENS
}

fn default_follow_up_max_tokens() -> u32 {
    DEFAULT_FOLLOW_UP_MAX_TOKENS
}

/// Input of a decomposition call
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateParams {
    pub prompt: String,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// Extra system instruction placed before the card instruction
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_generate_max_tokens")]
    pub max_tokens: u32,
}

impl GenerateParams {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            provider: None,
            model: None,
            system: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_GENERATE_MAX_TOKENS,
        }
    }
}

/// Input of a follow-up call about one card
#[derive(Debug, Clone, Deserialize)]
pub struct FollowUpParams {
    #[serde(alias = "current_card_title")]
    pub card_title: String,
    #[serde(alias = "current_card_content")]
    pub card_body: String,
    pub question: String,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_follow_up_max_tokens")]
    pub max_tokens: u32,
}

impl FollowUpParams {
    pub fn new(card: &Card, question: impl Into<String>) -> Self {
        Self {
            card_title: card.title().to_string(),
            card_body: card.body().to_string(),
            question: question.into(),
            provider: None,
            model: None,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_FOLLOW_UP_MAX_TOKENS,
        }
    }
}

/// Who answered and what it cost
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageInfo {
    pub provider: String,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub latency_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateMeta {
    pub card_count: usize,
    /// Output only parsed after stripping wrapper text
    pub repaired: bool,
    pub request_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct GenerateOutcome {
    pub deck: CardDeck,
    pub usage: UsageInfo,
    pub raw_text: String,
    pub meta: GenerateMeta,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FollowUpMeta {
    pub repaired: bool,
    pub request_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct FollowUpOutcome {
    pub card: Card,
    pub usage: UsageInfo,
    pub raw_text: String,
    pub meta: FollowUpMeta,
}

/// Owns the provider registry and the interaction log
pub struct CardEngine {
    registry: ProviderRegistry,
    log: InteractionLog,
}

impl CardEngine {
    pub fn new(registry: ProviderRegistry, log: InteractionLog) -> Self {
        Self { registry, log }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub async fn generate(&self, params: &GenerateParams) -> Result<GenerateOutcome, CardError> {
        let request_id = Uuid::new_v4();
        let result = self.run_generate(request_id, params).await;
        if let Err(e) = &result {
            self.log_failure(request_id, RequestType::Generate, e).await;
        }
        result
    }

    pub async fn follow_up(&self, params: &FollowUpParams) -> Result<FollowUpOutcome, CardError> {
        let request_id = Uuid::new_v4();
        let result = self.run_follow_up(request_id, params).await;
        if let Err(e) = &result {
            self.log_failure(request_id, RequestType::Followup, e).await;
        }
        result
    }

    async fn run_generate(
        &self,
        request_id: Uuid,
        params: &GenerateParams,
    ) -> Result<GenerateOutcome, CardError> {
        require_text("prompt", &params.prompt)?;
        validate_sampling(params.temperature, params.max_tokens)?;

        let prompt = prompt::decomposition(params.prompt.trim(), params.system.as_deref());
        let call = Call {
            request_id,
            request_type: RequestType::Generate,
            provider: params.provider.as_deref(),
            model: params.model.as_deref(),
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };
        let (raw_text, usage) = self.complete(&call, prompt).await?;

        let parsed = parse_sequence(&raw_text)?;
        let meta = GenerateMeta {
            card_count: parsed.value.len(),
            repaired: parsed.repaired,
            request_id,
        };
        tracing::info!(
            request_id = %request_id,
            card_count = meta.card_count,
            repaired = meta.repaired,
            "Generated card sequence"
        );

        Ok(GenerateOutcome {
            deck: parsed.value,
            usage,
            raw_text,
            meta,
        })
    }

    async fn run_follow_up(
        &self,
        request_id: Uuid,
        params: &FollowUpParams,
    ) -> Result<FollowUpOutcome, CardError> {
        require_text("card title", &params.card_title)?;
        require_text("card content", &params.card_body)?;
        require_text("question", &params.question)?;
        validate_sampling(params.temperature, params.max_tokens)?;

        let prompt = prompt::follow_up(
            &params.card_title,
            &params.card_body,
            params.question.trim(),
        );
        let call = Call {
            request_id,
            request_type: RequestType::Followup,
            provider: params.provider.as_deref(),
            model: params.model.as_deref(),
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };
        let (raw_text, usage) = self.complete(&call, prompt).await?;

        let parsed = parse_follow_up(&raw_text)?;
        tracing::info!(request_id = %request_id, repaired = parsed.repaired, "Answered follow-up");

        Ok(FollowUpOutcome {
            card: parsed.value,
            usage,
            raw_text,
            meta: FollowUpMeta {
                repaired: parsed.repaired,
                request_id,
            },
        })
    }

    /// Log the request, resolve a provider, make the one call, log the output
    async fn complete(
        &self,
        call: &Call<'_>,
        prompt: PromptRequest,
    ) -> Result<(String, UsageInfo), CardError> {
        self.log
            .request(
                call.request_id,
                call.request_type,
                UserInput {
                    prompt: &prompt.user,
                    system_prompt: &prompt.system,
                    provider: call.provider,
                    model: call.model,
                    temperature: call.temperature,
                    max_tokens: call.max_tokens,
                },
            )
            .await;

        let resolved = self.registry.resolve(call.provider, call.model)?;
        let request = LlmRequest::new(prompt, call.temperature, call.max_tokens);

        let start = Instant::now();
        let response = resolved.service.complete(&request).await?;
        let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        let usage = UsageInfo {
            provider: resolved.provider.name().to_string(),
            model: resolved.model,
            input_tokens: response.usage.input_tokens,
            output_tokens: response.usage.output_tokens,
            latency_ms,
        };

        self.log
            .response(
                call.request_id,
                call.request_type,
                ModelOutput {
                    text: &response.text,
                    provider: &usage.provider,
                    model: &usage.model,
                    input_tokens: usage.input_tokens,
                    output_tokens: usage.output_tokens,
                    latency_ms,
                },
            )
            .await;

        Ok((response.text, usage))
    }

    async fn log_failure(&self, request_id: Uuid, request_type: RequestType, error: &CardError) {
        tracing::warn!(
            request_id = %request_id,
            error_type = error.error_type(),
            error = %error,
            "Card request failed"
        );
        let message = error.to_string();
        self.log
            .error(
                request_id,
                request_type,
                ErrorDetail {
                    error_type: error.error_type(),
                    message: &message,
                },
            )
            .await;
    }
}

/// Per-call settings shared by both operations
struct Call<'a> {
    request_id: Uuid,
    request_type: RequestType,
    provider: Option<&'a str>,
    model: Option<&'a str>,
    temperature: f32,
    max_tokens: u32,
}

fn require_text(field: &str, value: &str) -> Result<(), CardError> {
    if value.trim().is_empty() {
        return Err(CardError::validation(format!("{field} must not be empty")));
    }
    Ok(())
}

fn validate_sampling(temperature: f32, max_tokens: u32) -> Result<(), CardError> {
    if !(0.0..=MAX_TEMPERATURE).contains(&temperature) {
        return Err(CardError::validation(format!(
            "temperature must be between 0 and {MAX_TEMPERATURE}, got {temperature}"
        )));
    }
    if max_tokens == 0 {
        return Err(CardError::validation("max_tokens must be at least 1"));
    }
    Ok(())
}
