//! Property-based tests for provider translation layers
//!
//! These tests verify that the translation between our internal types
//! and provider wire formats preserves key invariants:
//! - Empty completions are rejected
//! - Completion text passes through byte for byte
//! - Prompt text and sampling parameters reach the wire unchanged
//! - Token counts are carried over, and default to zero when absent

use super::gemini::{
    self, GeminiCandidate, GeminiContent, GeminiPart, GeminiResponse, GeminiUsageMetadata,
};
use super::openai::{self, OpenAIChoice, OpenAIMessage, OpenAIResponse, OpenAIUsage};
use super::types::LlmRequest;
use crate::cards::{PromptIntent, PromptRequest};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn arb_intent() -> impl Strategy<Value = PromptIntent> {
    prop_oneof![Just(PromptIntent::Decompose), Just(PromptIntent::FollowUp)]
}

fn arb_request() -> impl Strategy<Value = LlmRequest> {
    (
        arb_intent(),
        "[a-zA-Z0-9 _.!?,\n]{0,200}",
        "[a-zA-Z0-9 _.!?,]{1,100}",
        0u32..=200,
        1u32..4096,
    )
        .prop_map(|(intent, system, user, temp, max_tokens)| {
            LlmRequest::new(
                PromptRequest { intent, system, user },
                // 0.00..=2.00 in hundredths
                f32::from(u8::try_from(temp).unwrap_or(0)) / 100.0,
                max_tokens,
            )
        })
}

/// Completion text with at least one visible character
fn arb_text() -> impl Strategy<Value = String> {
    "[ \n]{0,3}[a-zA-Z0-9{}\":,\\[\\]]{1,120}[ \n]{0,3}"
}

fn make_openai_response(content: Option<String>, usage: Option<(u32, u32)>) -> OpenAIResponse {
    OpenAIResponse {
        choices: vec![OpenAIChoice {
            message: OpenAIMessage {
                role: "assistant".to_string(),
                content,
            },
            finish_reason: Some("stop".to_string()),
        }],
        usage: usage.map(|(prompt_tokens, completion_tokens)| OpenAIUsage {
            prompt_tokens,
            completion_tokens,
        }),
    }
}

fn make_gemini_response(parts: Vec<String>, usage: Option<(u32, u32)>) -> GeminiResponse {
    GeminiResponse {
        candidates: vec![GeminiCandidate {
            content: Some(GeminiContent {
                role: Some("model".to_string()),
                parts: parts.into_iter().map(|text| GeminiPart { text }).collect(),
            }),
            finish_reason: Some("STOP".to_string()),
        }],
        usage_metadata: usage.map(|(p, c)| GeminiUsageMetadata {
            prompt_token_count: p,
            candidates_token_count: c,
        }),
    }
}

// ============================================================================
// Group A: Response validation
// ============================================================================

proptest! {
    /// Blank or missing OpenAI content → Err
    #[test]
    fn prop_openai_normalize_rejects_blank(
        blank in proptest::option::of("[ \n\t]{0,10}")
    ) {
        let resp = make_openai_response(blank, None);
        prop_assert!(openai::test_helpers::normalize_response(resp).is_err());
    }

    /// No choices at all → Err
    #[test]
    fn prop_openai_normalize_rejects_no_choices(
        usage in proptest::option::of((0u32..1000, 0u32..1000)),
    ) {
        let mut resp = make_openai_response(Some("x".to_string()), usage);
        resp.choices.clear();
        prop_assert!(openai::test_helpers::normalize_response(resp).is_err());
    }

    /// Gemini candidates whose parts are all blank → Err
    #[test]
    fn prop_gemini_normalize_rejects_blank(parts in proptest::collection::vec("[ \n]{0,5}", 0..4)) {
        let resp = make_gemini_response(parts, None);
        prop_assert!(gemini::test_helpers::normalize_response(resp).is_err());
    }
}

// ============================================================================
// Group B: Text and usage preservation
// ============================================================================

proptest! {
    #[test]
    fn prop_openai_text_passes_through(
        text in arb_text(),
        usage in proptest::option::of((0u32..100_000, 0u32..100_000)),
    ) {
        let resp = make_openai_response(Some(text.clone()), usage);
        let normalized = openai::test_helpers::normalize_response(resp).unwrap();
        prop_assert_eq!(&normalized.text, &text);

        let (input, output) = usage.unwrap_or((0, 0));
        prop_assert_eq!(normalized.usage.input_tokens, u64::from(input));
        prop_assert_eq!(normalized.usage.output_tokens, u64::from(output));
    }

    /// Gemini parts are concatenated in order
    #[test]
    fn prop_gemini_parts_concatenate(
        parts in proptest::collection::vec(arb_text(), 1..4),
        usage in proptest::option::of((0u32..100_000, 0u32..100_000)),
    ) {
        let expected: String = parts.concat();
        let resp = make_gemini_response(parts, usage);
        let normalized = gemini::test_helpers::normalize_response(resp).unwrap();
        prop_assert_eq!(normalized.text, expected);

        let (input, output) = usage.unwrap_or((0, 0));
        prop_assert_eq!(normalized.usage.total(), u64::from(input) + u64::from(output));
    }
}

// ============================================================================
// Group C: Request translation
// ============================================================================

proptest! {
    #[test]
    fn prop_openai_request_carries_prompt(request in arb_request()) {
        let wire = openai::test_helpers::translate_request("gpt-4o-mini", &request);
        let has_system = !request.prompt.system.is_empty();

        prop_assert_eq!(wire.messages.len(), if has_system { 2 } else { 1 });
        let user = wire.messages.last().unwrap();
        prop_assert_eq!(user.role.as_str(), "user");
        prop_assert_eq!(user.content.as_deref(), Some(request.prompt.user.as_str()));
        if has_system {
            prop_assert_eq!(wire.messages[0].role.as_str(), "system");
            prop_assert_eq!(
                wire.messages[0].content.as_deref(),
                Some(request.prompt.system.as_str())
            );
        }
        prop_assert_eq!(wire.max_tokens, request.max_tokens);
        prop_assert!((wire.temperature - request.temperature).abs() < f32::EPSILON);
        prop_assert!(!wire.stream);
    }

    #[test]
    fn prop_gemini_request_carries_prompt(request in arb_request()) {
        let wire = gemini::test_helpers::translate_request(&request);

        prop_assert_eq!(wire.contents.len(), 1);
        prop_assert_eq!(&wire.contents[0].parts[0].text, &request.prompt.user);
        prop_assert_eq!(wire.system_instruction.is_some(), !request.prompt.system.is_empty());
        prop_assert_eq!(wire.generation_config.max_output_tokens, request.max_tokens);
    }

    /// Translated requests always serialize to a JSON object
    #[test]
    fn prop_translated_requests_serialize(request in arb_request()) {
        let openai_wire = openai::test_helpers::translate_request("m", &request);
        let openai_json = serde_json::to_value(openai_wire).unwrap();
        prop_assert!(openai_json.is_object());
        let gemini_wire = gemini::test_helpers::translate_request(&request);
        let gemini_json = serde_json::to_value(gemini_wire).unwrap();
        prop_assert!(gemini_json["generationConfig"].is_object());
    }
}
