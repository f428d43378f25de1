//! Google Gemini provider implementation

use super::types::{LlmRequest, LlmResponse, Usage};
use super::{LlmError, LlmService};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini `generateContent` client for one model
pub struct GeminiService {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
}

impl GeminiService {
    pub fn new(client: Client, api_key: String, base_url: &str, model: impl Into<String>) -> Self {
        let model = model.into();
        let endpoint = format!(
            "{}/models/{}:generateContent",
            base_url.trim_end_matches('/'),
            model
        );
        Self {
            client,
            api_key,
            endpoint,
            model,
        }
    }
}

fn translate_request(request: &LlmRequest) -> GeminiRequest {
    let system_instruction = (!request.prompt.system.is_empty()).then(|| GeminiContent {
        role: None,
        parts: vec![GeminiPart {
            text: request.prompt.system.clone(),
        }],
    });

    GeminiRequest {
        contents: vec![GeminiContent {
            role: Some("user".to_string()),
            parts: vec![GeminiPart {
                text: request.prompt.user.clone(),
            }],
        }],
        system_instruction,
        generation_config: GeminiGenerationConfig {
            max_output_tokens: request.max_tokens,
            temperature: request.temperature,
            response_mime_type: "application/json".to_string(),
        },
    }
}

fn normalize_response(resp: GeminiResponse) -> Result<LlmResponse, LlmError> {
    let candidate = resp
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::unknown("No candidates in response"))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(LlmError::unknown(format!(
            "Empty completion (finish_reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("none")
        )));
    }

    let usage = resp.usage_metadata.map_or_else(Usage::default, |u| Usage {
        input_tokens: u64::from(u.prompt_token_count),
        output_tokens: u64::from(u.candidates_token_count),
    });

    Ok(LlmResponse { text, usage })
}

#[async_trait]
impl LlmService for GeminiService {
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let gemini_request = translate_request(request);

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .header("Content-Type", "application/json")
            .json(&gemini_request)
            .send()
            .await
            .map_err(|e| LlmError::from_reqwest(&e))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            let message = serde_json::from_str::<GeminiErrorResponse>(&body)
                .map_or(body, |error_resp| error_resp.error.message);
            return Err(LlmError::from_response(status.as_u16(), &headers, &message));
        }

        let gemini_response: GeminiResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::unknown(format!("Failed to parse response: {e} - body: {body}"))
        })?;

        normalize_response(gemini_response)
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

// Gemini API types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<GeminiContent>,
    pub generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
pub(super) struct GeminiPart {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GeminiGenerationConfig {
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub response_mime_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GeminiResponse {
    #[serde(default)]
    pub candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    pub usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GeminiCandidate {
    #[serde(default)]
    pub content: Option<GeminiContent>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct GeminiUsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
}

#[cfg(test)]
pub(super) mod test_helpers {
    use super::{GeminiRequest, GeminiResponse, LlmError, LlmRequest, LlmResponse};

    pub fn translate_request(request: &LlmRequest) -> GeminiRequest {
        super::translate_request(request)
    }

    pub fn normalize_response(resp: GeminiResponse) -> Result<LlmResponse, LlmError> {
        super::normalize_response(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::prompt;
    use serde_json::json;

    #[test]
    fn test_request_uses_camel_case_and_json_mime() {
        let request = LlmRequest::new(prompt::follow_up("Step 1", "Butter", "why?"), 0.2, 400);
        let wire = serde_json::to_value(translate_request(&request)).unwrap();

        assert_eq!(wire["generationConfig"]["maxOutputTokens"], 400);
        assert_eq!(wire["generationConfig"]["responseMimeType"], "application/json");
        assert!(wire["systemInstruction"]["parts"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Card title: Step 1"));
        assert_eq!(wire["contents"][0]["role"], "user");
        assert_eq!(wire["contents"][0]["parts"][0]["text"], "why?");
    }

    #[test]
    fn test_normalize_joins_parts() {
        let resp: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "{\"card\":" }, { "text": "{}}" }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 5, "candidatesTokenCount": 7, "totalTokenCount": 12 }
        }))
        .unwrap();

        let normalized = normalize_response(resp).unwrap();
        assert_eq!(normalized.text, "{\"card\":{}}");
        assert_eq!(normalized.usage.total(), 12);
    }

    #[test]
    fn test_blocked_candidate_is_an_error() {
        let resp: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{ "finishReason": "SAFETY" }]
        }))
        .unwrap();
        let err = normalize_response(resp).unwrap_err();
        assert!(err.message.contains("SAFETY"));
    }

    #[test]
    fn test_endpoint_includes_model() {
        let svc = GeminiService::new(
            Client::new(),
            "k".into(),
            GEMINI_BASE_URL,
            "gemini-1.5-flash",
        );
        assert!(svc.endpoint.ends_with("/models/gemini-1.5-flash:generateContent"));
    }
}
