//! Property-based tests for conversation navigation
//!
//! These tests drive random operation sequences and check that:
//! - The card index always stays within the current sequence
//! - Any navigation call dismisses the active follow-up
//! - `next` then `back` is an inverse pair away from the boundaries
//! - Follow-ups captured on another card are rejected without side effects

use super::state::*;
use crate::cards::{Card, CardDeck, CardKind};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn deck(len: usize) -> CardDeck {
    let cards = (0..len)
        .map(|i| Card::new(format!("Card {i}"), format!("body {i}"), CardKind::Step).unwrap())
        .collect();
    CardDeck::new(cards).unwrap()
}

fn prompt() -> SequenceSource {
    SequenceSource::Prompt {
        text: "topic".to_string(),
    }
}

fn answer() -> Card {
    Card::new("Answer", "clarification", CardKind::Info).unwrap()
}

#[derive(Debug, Clone)]
enum Op {
    Apply(usize),
    Next,
    Back,
    /// Capture the active card, navigate `moves` times, then attach
    FollowUp { moves: Vec<bool> },
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        2 => (1usize..6).prop_map(Op::Apply),
        4 => Just(Op::Next),
        3 => Just(Op::Back),
        2 => proptest::collection::vec(any::<bool>(), 0..3)
            .prop_map(|moves| Op::FollowUp { moves }),
    ]
}

fn run(state: &mut ConversationState, op: &Op) {
    match op {
        Op::Apply(len) => {
            state.apply_new_sequence(deck(*len), prompt());
        }
        Op::Next => {
            state.next();
        }
        Op::Back => {
            state.back();
        }
        Op::FollowUp { moves } => {
            let Some(captured) = state.current_ref() else {
                return;
            };
            for forward in moves {
                if *forward {
                    state.next();
                } else {
                    state.back();
                }
            }
            let still_active = state.current_ref() == Some(captured);
            let before = state.snapshot();
            let before_count = state.follow_ups().len();

            match state.attach_follow_up(captured, answer()) {
                Ok(fu) => {
                    assert!(still_active);
                    assert_eq!(fu.parent(), captured);
                }
                Err(StateError::StaleContext { requested, active }) => {
                    assert!(!still_active);
                    assert_eq!(requested, captured);
                    assert_ne!(active, captured);
                    assert_eq!(state.snapshot(), before);
                    assert_eq!(state.follow_ups().len(), before_count);
                }
                Err(StateError::NoActiveCard) => panic!("card was active when captured"),
            }
        }
    }
}

proptest! {
    #[test]
    fn prop_invariants_hold(ops in proptest::collection::vec(arb_op(), 0..40)) {
        let mut state = ConversationState::new();
        for op in &ops {
            run(&mut state, op);
            state.assert_invariants();
        }
    }

    #[test]
    fn prop_navigation_clears_follow_up(
        ops in proptest::collection::vec(arb_op(), 1..20),
        forward in any::<bool>(),
    ) {
        let mut state = ConversationState::new();
        state.apply_new_sequence(deck(3), prompt());
        for op in &ops {
            run(&mut state, op);
        }
        if let Some(card) = state.current_ref() {
            state.attach_follow_up(card, answer()).unwrap();
        }
        prop_assert!(state.active_follow_up().is_some());

        if forward {
            state.next();
        } else {
            state.back();
        }
        prop_assert!(state.active_follow_up().is_none());
    }

    #[test]
    fn prop_next_back_inverse(len in 1usize..8, start in 0usize..8) {
        let mut state = ConversationState::new();
        state.apply_new_sequence(deck(len), prompt());
        for _ in 0..start {
            state.next();
        }
        let before = state.current_card_index();
        let at_last = before == Some(len - 1);

        let moved = state.next();
        prop_assert_eq!(moved, !at_last);
        if moved {
            state.back();
        }
        prop_assert_eq!(state.current_card_index(), before);
    }

    #[test]
    fn prop_next_never_passes_last(len in 1usize..8, presses in 0usize..20) {
        let mut state = ConversationState::new();
        state.apply_new_sequence(deck(len), prompt());
        for _ in 0..presses {
            state.next();
            prop_assert!(state.current_card_index().unwrap() < len);
        }
        prop_assert_eq!(state.current_card_index(), Some(presses.min(len - 1)));
    }

    #[test]
    fn prop_back_never_passes_first(len in 1usize..8, presses in 0usize..20) {
        let mut state = ConversationState::new();
        state.apply_new_sequence(deck(len), prompt());
        for _ in 0..len {
            state.next();
        }
        for _ in 0..presses {
            state.back();
        }
        prop_assert_eq!(state.current_card_index(), Some((len - 1).saturating_sub(presses)));
    }

    #[test]
    fn prop_history_is_append_only(lens in proptest::collection::vec(1usize..5, 1..6)) {
        let mut state = ConversationState::new();
        let mut ids = Vec::new();
        for len in &lens {
            ids.push(state.apply_new_sequence(deck(*len), prompt()));
            prop_assert_eq!(state.current_card_index(), Some(0));
            prop_assert!(state.active_follow_up().is_none());
        }
        prop_assert_eq!(state.history().len(), lens.len());
        for (seq, (len, id)) in state.history().iter().zip(lens.iter().zip(&ids)) {
            prop_assert_eq!(seq.card_count(), *len);
            prop_assert_eq!(seq.id(), *id);
        }
        prop_assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }
}
