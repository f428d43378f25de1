//! Prompt construction for the two card intents
//!
//! Both builders are pure: same input, same request.

use super::schema::{card_response_schema, follow_up_response_schema};
use serde::Serialize;

/// What the model is being asked to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptIntent {
    /// Break a topic into an ordered card sequence
    Decompose,
    /// Answer a question about one card with exactly one card
    FollowUp,
}

/// A system + user message pair ready for a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptRequest {
    pub intent: PromptIntent,
    pub system: String,
    pub user: String,
}

const DECOMPOSITION_INSTRUCTION: &str = "You turn a request into a sequence of cards. \
Decompose the request into an ordered list of minimal, self-contained steps or facts. \
Each card has a short `title` (at most 120 characters), a `body` with the display text \
(it may contain a list or a fenced code block), and a `kind` that is one of \"info\", \
\"question\" or \"step\". Keep the cards in the order the reader should see them.";

const FOLLOW_UP_INSTRUCTION: &str = "You are answering a clarifying question about one card. \
Use only the card below as context and do not bring in other steps or topics. \
Produce exactly one card that directly answers the question. \
Do not produce a new sequence of cards.";

const JSON_ONLY: &str = "Respond ONLY with a JSON object matching this schema, \
with no surrounding prose and no markdown fences:";

/// Request that decomposes `topic` into a card sequence.
///
/// `extra_system` is a caller-supplied instruction placed before the card
/// instruction.
pub fn decomposition(topic: &str, extra_system: Option<&str>) -> PromptRequest {
    let schema = card_response_schema().to_string();
    let instruction = format!("{DECOMPOSITION_INSTRUCTION}\n\n{JSON_ONLY}\n{schema}");

    let system = match extra_system.map(str::trim).filter(|s| !s.is_empty()) {
        Some(extra) => format!("{extra}\n\n{instruction}"),
        None => instruction,
    };

    PromptRequest {
        intent: PromptIntent::Decompose,
        system,
        user: topic.to_string(),
    }
}

/// Request that answers `question` scoped to a single card
pub fn follow_up(card_title: &str, card_body: &str, question: &str) -> PromptRequest {
    let schema = follow_up_response_schema().to_string();
    let system = format!(
        "{FOLLOW_UP_INSTRUCTION}\n\n\
         Card title: {card_title}\n\
         Card content:\n{card_body}\n\n\
         {JSON_ONLY}\n{schema}"
    );

    PromptRequest {
        intent: PromptIntent::FollowUp,
        system,
        user: question.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decomposition_carries_topic_and_schema() {
        let req = decomposition("How do I make a grilled cheese sandwich?", None);
        assert_eq!(req.intent, PromptIntent::Decompose);
        assert_eq!(req.user, "How do I make a grilled cheese sandwich?");
        assert!(req.system.contains("\"cards\""));
        assert!(req.system.contains("ONLY"));
        assert!(req.system.starts_with(DECOMPOSITION_INSTRUCTION));
    }

    #[test]
    fn test_decomposition_prepends_extra_system() {
        let req = decomposition("topic", Some("Answer in French."));
        assert!(req.system.starts_with("Answer in French.\n\n"));

        let blank = decomposition("topic", Some("   "));
        assert!(blank.system.starts_with(DECOMPOSITION_INSTRUCTION));
    }

    #[test]
    fn test_follow_up_is_scoped_to_card() {
        let req = follow_up(
            "Step 1: Butter the bread",
            "Spread butter on one side of each slice.",
            "what kind of cheese?",
        );
        assert_eq!(req.intent, PromptIntent::FollowUp);
        assert_eq!(req.user, "what kind of cheese?");
        assert!(req.system.contains("Step 1: Butter the bread"));
        assert!(req.system.contains("Spread butter on one side of each slice."));
        assert!(req.system.contains("exactly one card"));
        assert!(req.system.contains("Do not produce a new sequence"));
        assert!(req.system.contains("\"card\""));
    }

    #[test]
    fn test_builders_are_deterministic() {
        assert_eq!(decomposition("x", None), decomposition("x", None));
        assert_eq!(follow_up("t", "b", "q"), follow_up("t", "b", "q"));
    }
}
