//! Hierarchical conversation model
//!
//! Card sequences in chronological order, the current navigation position,
//! and one level of follow-ups nested under individual cards.

mod state;

#[cfg(test)]
mod proptests;

pub use state::{
    CardRef, CardSequence, CardView, ConversationState, ConversationView, FollowUp, SequenceId,
    SequenceSource, StateError,
};
