//! Operation-level error taxonomy

use crate::cards::ParseError;
use crate::conversation::StateError;
use crate::llm::{LlmError, ResolveError};
use thiserror::Error;

/// Terminal failure of one generate or follow-up call. Nothing is retried.
#[derive(Debug, Error)]
pub enum CardError {
    /// Upstream call failed (network, auth, rate limit, server)
    #[error("provider error: {0}")]
    Provider(#[from] LlmError),

    /// Model output did not satisfy the card schema, even after repair
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Caller's card reference no longer matches the conversation
    #[error(transparent)]
    State(#[from] StateError),

    /// Malformed input, rejected before any provider call
    #[error("{0}")]
    Validation(String),
}

impl CardError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Stable machine-readable category
    pub fn error_type(&self) -> &'static str {
        match self {
            CardError::Provider(_) => "provider_error",
            CardError::Parse(_) => "parse_error",
            CardError::State(StateError::StaleContext { .. }) => "stale_context",
            CardError::State(StateError::NoActiveCard) => "state_error",
            CardError::Validation(_) => "validation_error",
        }
    }
}

impl From<ResolveError> for CardError {
    fn from(e: ResolveError) -> Self {
        if e.is_validation() {
            CardError::Validation(e.to_string())
        } else {
            CardError::Provider(e.into_llm_error())
        }
    }
}
