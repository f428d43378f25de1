//! Card contract: schema, prompts and model-output parsing

pub mod parser;
pub mod prompt;
pub mod schema;

#[cfg(test)]
mod proptests;

pub use parser::{parse_follow_up, parse_sequence, ParseError, ParseFailure, Parsed};
pub use prompt::{PromptIntent, PromptRequest};
pub use schema::{Card, CardDeck, CardKind, DeckError, SchemaViolation};
