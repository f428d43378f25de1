//! Conversation navigation state
//!
//! Owns every card sequence generated in a session, the current position
//! and the follow-up currently shown under the active card. Every operation
//! is synchronous and either fully applies or leaves the state untouched.

use crate::cards::{Card, CardDeck};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Identifier of a sequence (or follow-up) within one conversation.
/// Allocated from a single monotonic counter starting at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SequenceId(pub u64);

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Points at one top-level card: (sequence id, card order).
///
/// The sequence part is the sequence's id, not its position in history.
/// Follow-ups take ids from the same counter, so the two diverge after
/// the first follow-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CardRef {
    pub sequence: SequenceId,
    pub card: usize,
}

impl CardRef {
    pub fn new(sequence: SequenceId, card: usize) -> Self {
        Self { sequence, card }
    }
}

impl fmt::Display for CardRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.sequence, self.card)
    }
}

/// What a sequence was generated from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SequenceSource {
    Prompt { text: String },
    Card { card: CardRef },
}

/// Cards produced by one model call. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardSequence {
    id: SequenceId,
    source: SequenceSource,
    #[serde(flatten)]
    cards: CardDeck,
}

impl CardSequence {
    pub fn id(&self) -> SequenceId {
        self.id
    }

    pub fn source(&self) -> &SequenceSource {
        &self.source
    }

    pub fn cards(&self) -> &CardDeck {
        &self.cards
    }

    pub fn card_count(&self) -> usize {
        self.cards.len()
    }
}

/// A one-card sequence answering a question about a parent card
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FollowUp {
    parent: CardRef,
    sequence: CardSequence,
}

impl FollowUp {
    pub fn id(&self) -> SequenceId {
        self.sequence.id
    }

    pub fn parent(&self) -> CardRef {
        self.parent
    }

    pub fn card(&self) -> &Card {
        self.sequence.cards.first()
    }
}

/// Navigation reference does not match the current state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("no card is active")]
    NoActiveCard,
    #[error("stale context: follow-up was asked on card {requested} but card {active} is active")]
    StaleContext { requested: CardRef, active: CardRef },
}

/// One top-level card of the current sequence with its follow-ups inline
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardView {
    pub card: Card,
    pub is_current: bool,
    pub follow_ups: Vec<FollowUp>,
}

/// Read-only snapshot of the navigation position
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationView {
    pub sequence_id: Option<SequenceId>,
    pub sequence_index: Option<usize>,
    pub card_index: Option<usize>,
    pub card_count: usize,
    pub history_len: usize,
    pub current_card: Option<Card>,
    pub active_follow_up: Option<FollowUp>,
}

#[derive(Debug, Clone, Default)]
pub struct ConversationState {
    /// Top-level sequences, oldest first
    history: Vec<CardSequence>,
    /// Every follow-up ever attached, oldest first
    follow_ups: Vec<FollowUp>,
    current_sequence: Option<usize>,
    current_card: usize,
    /// Index into `follow_ups`; its parent is always the current card
    active_follow_up: Option<usize>,
    next_id: u64,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> SequenceId {
        let id = SequenceId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Append a new sequence and move to its first card
    pub fn apply_new_sequence(&mut self, cards: CardDeck, source: SequenceSource) -> SequenceId {
        let id = self.allocate_id();
        self.history.push(CardSequence { id, source, cards });
        self.current_sequence = Some(self.history.len() - 1);
        self.current_card = 0;
        self.active_follow_up = None;

        tracing::debug!(
            sequence = %id,
            history_len = self.history.len(),
            "Applied new card sequence"
        );
        id
    }

    /// Move to the next card. Returns whether the position changed.
    ///
    /// The follow-up view is dismissed even when already on the last card.
    pub fn next(&mut self) -> bool {
        self.active_follow_up = None;
        let count = self.current_sequence().map_or(0, CardSequence::card_count);
        if self.current_card + 1 < count {
            self.current_card += 1;
            true
        } else {
            false
        }
    }

    /// Move to the previous card. Returns whether the position changed.
    pub fn back(&mut self) -> bool {
        self.active_follow_up = None;
        if self.current_sequence.is_some() && self.current_card > 0 {
            self.current_card -= 1;
            true
        } else {
            false
        }
    }

    /// Attach a follow-up answer to the card it was asked on.
    ///
    /// `parent` is the reference captured when the question was sent; it must
    /// still be the active card. A new follow-up replaces the active one, the
    /// previous stays in history.
    pub fn attach_follow_up(
        &mut self,
        parent: CardRef,
        card: Card,
    ) -> Result<&FollowUp, StateError> {
        let active = self.current_ref().ok_or(StateError::NoActiveCard)?;
        if active != parent {
            return Err(StateError::StaleContext {
                requested: parent,
                active,
            });
        }

        let id = self.allocate_id();
        self.follow_ups.push(FollowUp {
            parent,
            sequence: CardSequence {
                id,
                source: SequenceSource::Card { card: parent },
                cards: CardDeck::single(card),
            },
        });
        let index = self.follow_ups.len() - 1;
        self.active_follow_up = Some(index);

        tracing::debug!(follow_up = %id, parent = %parent, "Attached follow-up");
        Ok(&self.follow_ups[index])
    }

    /// Cards of the current sequence with their follow-ups; does not move
    pub fn view_all(&self) -> Vec<CardView> {
        let Some(seq) = self.current_sequence() else {
            return Vec::new();
        };

        seq.cards()
            .iter()
            .map(|card| {
                let card_ref = CardRef::new(seq.id(), card.order());
                CardView {
                    card: card.clone(),
                    is_current: card.order() == self.current_card,
                    follow_ups: self.follow_ups_for(card_ref).cloned().collect(),
                }
            })
            .collect()
    }

    pub fn snapshot(&self) -> ConversationView {
        ConversationView {
            sequence_id: self.current_sequence().map(CardSequence::id),
            sequence_index: self.current_sequence,
            card_index: self.current_card_index(),
            card_count: self.current_sequence().map_or(0, CardSequence::card_count),
            history_len: self.history.len(),
            current_card: self.current_card().cloned(),
            active_follow_up: self.active_follow_up().cloned(),
        }
    }

    pub fn history(&self) -> &[CardSequence] {
        &self.history
    }

    pub fn follow_ups(&self) -> &[FollowUp] {
        &self.follow_ups
    }

    pub fn follow_ups_for(&self, card: CardRef) -> impl Iterator<Item = &FollowUp> {
        self.follow_ups.iter().filter(move |f| f.parent == card)
    }

    pub fn current_sequence_index(&self) -> Option<usize> {
        self.current_sequence
    }

    pub fn current_card_index(&self) -> Option<usize> {
        self.current_sequence.map(|_| self.current_card)
    }

    pub fn current_sequence(&self) -> Option<&CardSequence> {
        self.current_sequence.and_then(|i| self.history.get(i))
    }

    pub fn current_card(&self) -> Option<&Card> {
        self.current_sequence()
            .and_then(|seq| seq.cards().get(self.current_card))
    }

    pub fn current_ref(&self) -> Option<CardRef> {
        self.current_sequence()
            .map(|seq| CardRef::new(seq.id(), self.current_card))
    }

    pub fn active_follow_up(&self) -> Option<&FollowUp> {
        self.active_follow_up.and_then(|i| self.follow_ups.get(i))
    }

    /// Panics if a structural invariant is broken
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        if let Some(seq) = self.current_sequence() {
            assert!(self.current_card < seq.card_count(), "card index out of bounds");
            for (i, card) in seq.cards().iter().enumerate() {
                assert_eq!(card.order(), i, "card orders must be dense");
            }
        } else {
            assert!(self.active_follow_up.is_none(), "follow-up without a sequence");
        }
        if let Some(fu) = self.active_follow_up() {
            assert_eq!(
                Some(fu.parent()),
                self.current_ref(),
                "active follow-up not on current card"
            );
        }
        let mut ids: Vec<_> = self
            .history
            .iter()
            .map(CardSequence::id)
            .chain(self.follow_ups.iter().map(FollowUp::id))
            .collect();
        let len = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), len, "sequence ids must be unique");
    }
}
