//! Card schema
//!
//! The structured-output contract a model must emit, and the validation that
//! turns one untyped model value into a [`Card`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Upper bound on title length, in characters
pub const MAX_TITLE_CHARS: usize = 120;

/// Upper bound on cards per deck
pub const MAX_CARDS: usize = 100;

/// What a card represents. Unknown kinds fall back to [`CardKind::Info`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CardKind {
    #[default]
    Info,
    Question,
    Step,
}

impl CardKind {
    pub fn as_str(self) -> &'static str {
        match self {
            CardKind::Info => "info",
            CardKind::Question => "question",
            CardKind::Step => "step",
        }
    }

    /// Lenient mapping from whatever the model put in `kind`
    pub fn from_model_value(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str).map(str::trim) {
            Some(s) if s.eq_ignore_ascii_case("question") => CardKind::Question,
            Some(s) if s.eq_ignore_ascii_case("step") => CardKind::Step,
            _ => CardKind::Info,
        }
    }
}

impl<'de> Deserialize<'de> for CardKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(CardKind::from_model_value(Some(&value)))
    }
}

/// Why a single model value is not a valid card
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    #[error("card must be a JSON object")]
    NotAnObject,
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("field `{0}` must be a string")]
    NotAString(&'static str),
    #[error("title has {chars} characters, at most {MAX_TITLE_CHARS} allowed")]
    TitleTooLong { chars: usize },
}

/// A single step, fact or question
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    title: String,
    body: String,
    kind: CardKind,
    order: usize,
}

impl Card {
    /// Build a validated card. Its order is assigned when it joins a deck.
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
        kind: CardKind,
    ) -> Result<Self, SchemaViolation> {
        let title = title.into();
        let body = body.into();

        let title = title.trim();
        if title.is_empty() {
            return Err(SchemaViolation::MissingField("title"));
        }
        let chars = title.chars().count();
        if chars > MAX_TITLE_CHARS {
            return Err(SchemaViolation::TitleTooLong { chars });
        }
        if body.trim().is_empty() {
            return Err(SchemaViolation::MissingField("body"));
        }

        Ok(Self {
            title: title.to_string(),
            body,
            kind,
            order: 0,
        })
    }

    /// Validate one element of a model payload.
    ///
    /// `content` is accepted in place of `body`; extra fields are ignored.
    pub fn from_model_value(value: &Value) -> Result<Self, SchemaViolation> {
        let Value::Object(map) = value else {
            return Err(SchemaViolation::NotAnObject);
        };

        let title = required_string(map, "title", &["title"])?;
        let body = required_string(map, "body", &["body", "content"])?;
        let kind = CardKind::from_model_value(map.get("kind"));

        Card::new(title, body, kind)
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn kind(&self) -> CardKind {
        self.kind
    }

    /// Zero-based position within the owning deck
    pub fn order(&self) -> usize {
        self.order
    }

    pub(crate) fn with_order(mut self, order: usize) -> Self {
        self.order = order;
        self
    }
}

fn required_string<'a>(
    map: &'a Map<String, Value>,
    field: &'static str,
    keys: &[&str],
) -> Result<&'a str, SchemaViolation> {
    match keys.iter().find_map(|k| map.get(*k)) {
        None | Some(Value::Null) => Err(SchemaViolation::MissingField(field)),
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(SchemaViolation::NotAString(field)),
    }
}

/// Why a list of cards cannot form a deck
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeckError {
    #[error("a card sequence needs at least one card")]
    Empty,
    #[error("{count} cards exceeds the limit of {MAX_CARDS}")]
    TooMany { count: usize },
}

/// Non-empty, ordered list of cards produced by one model call.
///
/// Card `order` values are assigned from position and are always `0..len`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardDeck {
    cards: Vec<Card>,
}

impl CardDeck {
    pub fn new(cards: Vec<Card>) -> Result<Self, DeckError> {
        if cards.is_empty() {
            return Err(DeckError::Empty);
        }
        if cards.len() > MAX_CARDS {
            return Err(DeckError::TooMany { count: cards.len() });
        }
        let cards = cards
            .into_iter()
            .enumerate()
            .map(|(order, card)| card.with_order(order))
            .collect();
        Ok(Self { cards })
    }

    /// Deck holding exactly one card
    pub fn single(card: Card) -> Self {
        Self {
            cards: vec![card.with_order(0)],
        }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        false
    }

    /// First card; a deck is never empty
    pub fn first(&self) -> &Card {
        &self.cards[0]
    }

    pub fn get(&self, order: usize) -> Option<&Card> {
        self.cards.get(order)
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Card> {
        self.cards.iter()
    }

    pub fn into_cards(self) -> Vec<Card> {
        self.cards
    }
}

impl<'a> IntoIterator for &'a CardDeck {
    type Item = &'a Card;
    type IntoIter = std::slice::Iter<'a, Card>;

    fn into_iter(self) -> Self::IntoIter {
        self.cards.iter()
    }
}

fn card_object_schema() -> Value {
    json!({
        "type": "object",
        "required": ["title", "body"],
        "properties": {
            "title": { "type": "string", "minLength": 1, "maxLength": MAX_TITLE_CHARS },
            "body": { "type": "string", "minLength": 1 },
            "kind": { "type": "string", "enum": ["info", "question", "step"] }
        }
    })
}

/// JSON Schema of a decomposition response: `{ "cards": [Card, ...] }`
pub fn card_response_schema() -> Value {
    json!({
        "type": "object",
        "required": ["cards"],
        "properties": {
            "cards": {
                "type": "array",
                "minItems": 1,
                "items": card_object_schema()
            }
        }
    })
}

/// JSON Schema of a follow-up response: `{ "card": Card }`
pub fn follow_up_response_schema() -> Value {
    json!({
        "type": "object",
        "required": ["card"],
        "properties": { "card": card_object_schema() }
    })
}
