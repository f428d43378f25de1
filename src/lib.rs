//! Cardwise - turns a free-text topic into a navigable sequence of cards
//!
//! A language model decomposes the topic into small cards. Users step
//! through them and ask follow-up questions that are answered in the
//! context of the card being viewed.

pub mod api;
pub mod cards;
pub mod config;
pub mod conversation;
pub mod engine;
pub mod error;
pub mod interaction_log;
pub mod llm;
pub mod session;

#[cfg(test)]
mod testing;
