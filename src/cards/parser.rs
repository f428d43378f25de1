//! Model output parsing
//!
//! Strict decode first, then at most one repair pass (strip a markdown fence
//! and surrounding prose) before giving up. Content is never invented.

use super::schema::{Card, CardDeck, DeckError, SchemaViolation, MAX_CARDS};
use serde_json::Value;
use thiserror::Error;

/// Characters of raw model text kept on a [`ParseError`]
pub const SNIPPET_CHARS: usize = 200;

/// A successfully parsed value and whether the repair pass was needed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed<T> {
    pub value: T,
    pub repaired: bool,
}

/// Model output that does not satisfy the card schema
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("could not parse model output: {reason}")]
pub struct ParseError {
    pub reason: ParseFailure,
    /// Leading part of the offending raw text
    pub snippet: String,
}

impl ParseError {
    fn new(reason: ParseFailure, raw: &str) -> Self {
        Self {
            reason,
            snippet: raw.chars().take(SNIPPET_CHARS).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    #[error("not valid JSON ({0})")]
    InvalidJson(String),
    #[error("expected a JSON object with a `{0}` field")]
    MissingEnvelope(&'static str),
    #[error("card {index}: {violation}")]
    InvalidCard {
        index: usize,
        violation: SchemaViolation,
    },
    #[error("the card sequence is empty")]
    EmptySequence,
    #[error("{count} cards exceeds the limit of {MAX_CARDS}")]
    TooManyCards { count: usize },
    #[error("a follow-up must be exactly one card, got {0}")]
    FollowUpCardCount(usize),
}

/// Parse a decomposition response into a deck
pub fn parse_sequence(raw: &str) -> Result<Parsed<CardDeck>, ParseError> {
    parse_with_repair(raw, decode_deck)
}

/// Parse a follow-up response into its single card
pub fn parse_follow_up(raw: &str) -> Result<Parsed<Card>, ParseError> {
    parse_with_repair(raw, decode_follow_up)
}

fn parse_with_repair<T>(
    raw: &str,
    decode: fn(&str) -> Result<T, ParseFailure>,
) -> Result<Parsed<T>, ParseError> {
    let strict_failure = match decode(raw) {
        Ok(value) => {
            return Ok(Parsed {
                value,
                repaired: false,
            })
        }
        Err(failure) => failure,
    };

    match repair(raw) {
        Some(candidate) if candidate != raw.trim() => {
            tracing::debug!(
                raw_len = raw.len(),
                candidate_len = candidate.len(),
                "Retrying parse on repaired model output"
            );
            decode(candidate)
                .map(|value| Parsed {
                    value,
                    repaired: true,
                })
                .map_err(|failure| ParseError::new(failure, raw))
        }
        _ => Err(ParseError::new(strict_failure, raw)),
    }
}

fn decode_object(
    text: &str,
    envelope: &'static str,
) -> Result<serde_json::Map<String, Value>, ParseFailure> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| ParseFailure::InvalidJson(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ParseFailure::MissingEnvelope(envelope)),
    }
}

fn decode_deck(text: &str) -> Result<CardDeck, ParseFailure> {
    let mut map = decode_object(text, "cards")?;
    let Some(Value::Array(items)) = map.remove("cards") else {
        return Err(ParseFailure::MissingEnvelope("cards"));
    };

    if items.is_empty() {
        return Err(ParseFailure::EmptySequence);
    }
    if items.len() > MAX_CARDS {
        return Err(ParseFailure::TooManyCards { count: items.len() });
    }

    let cards = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            Card::from_model_value(item)
                .map_err(|violation| ParseFailure::InvalidCard { index, violation })
        })
        .collect::<Result<Vec<_>, _>>()?;

    CardDeck::new(cards).map_err(|e| match e {
        DeckError::Empty => ParseFailure::EmptySequence,
        DeckError::TooMany { count } => ParseFailure::TooManyCards { count },
    })
}

fn decode_follow_up(text: &str) -> Result<Card, ParseFailure> {
    let map = decode_object(text, "card")?;

    let invalid = |violation| ParseFailure::InvalidCard {
        index: 0,
        violation,
    };

    if let Some(card) = map.get("card") {
        return Card::from_model_value(card).map_err(invalid);
    }

    if let Some(cards) = map.get("cards") {
        return match cards {
            Value::Array(items) if items.len() == 1 => {
                Card::from_model_value(&items[0]).map_err(invalid)
            }
            Value::Array(items) if items.is_empty() => Err(ParseFailure::EmptySequence),
            Value::Array(items) => Err(ParseFailure::FollowUpCardCount(items.len())),
            _ => Err(ParseFailure::MissingEnvelope("card")),
        };
    }

    // Bare card object
    if map.contains_key("title") {
        return Card::from_model_value(&Value::Object(map)).map_err(invalid);
    }

    Err(ParseFailure::MissingEnvelope("card"))
}

/// The single repair pass: unfence, then keep the outermost `{ ... }`
fn repair(raw: &str) -> Option<&str> {
    let unfenced = strip_code_fence(raw.trim());
    let start = unfenced.find('{')?;
    let end = unfenced.rfind('}')?;
    if end < start {
        return None;
    }
    unfenced.get(start..=end)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(open) = text.find("```") else {
        return text;
    };
    // A fence after the first brace sits inside a card body
    if text.find('{').is_some_and(|brace| brace < open) {
        return text;
    }
    let after_open = text.get(open + 3..).unwrap_or_default();

    // Drop a language tag such as `json` on the opening line
    let body = match after_open.split_once('\n') {
        Some((tag, rest)) if tag.trim().chars().all(|c| c.is_ascii_alphanumeric()) => rest,
        _ => after_open,
    };

    match body.rfind("```") {
        Some(close) => body.get(..close).unwrap_or(body),
        None => body,
    }
}
