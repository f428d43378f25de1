//! Property-based tests for the card contract
//!
//! - Serialized decks parse back to the same deck
//! - Parsed decks are never empty and their orders are dense
//! - Wrapping valid output in prose or a fence only costs a repair

use super::parser::{parse_follow_up, parse_sequence, ParseFailure};
use super::schema::{Card, CardDeck, CardKind, MAX_CARDS};
use proptest::prelude::*;

fn arb_kind() -> impl Strategy<Value = CardKind> {
    prop_oneof![
        Just(CardKind::Info),
        Just(CardKind::Question),
        Just(CardKind::Step),
    ]
}

fn arb_card() -> impl Strategy<Value = Card> {
    (
        "[A-Za-z0-9][A-Za-z0-9 :,.!?]{0,40}[A-Za-z0-9]",
        "[A-Za-z0-9 \n\"{}.,-]{0,80}[A-Za-z0-9]",
        arb_kind(),
    )
        .prop_map(|(title, body, kind)| Card::new(title, body, kind).unwrap())
}

fn arb_deck() -> impl Strategy<Value = CardDeck> {
    proptest::collection::vec(arb_card(), 1..12).prop_map(|cards| CardDeck::new(cards).unwrap())
}

/// Cards whose bodies may carry fenced code blocks and stray backticks
fn arb_code_card() -> impl Strategy<Value = Card> {
    (
        "[A-Za-z0-9][A-Za-z0-9 :]{0,20}",
        "[A-Za-z0-9 `\n{}.-]{0,40}[A-Za-z0-9]",
        proptest::option::of("[a-z]{0,4}"),
        arb_kind(),
    )
        .prop_map(|(title, text, lang, kind)| {
            let body = match lang {
                Some(lang) => format!("{text}\n```{lang}\ncargo run\n```"),
                None => text,
            };
            Card::new(title, body, kind).unwrap()
        })
}

fn arb_code_deck() -> impl Strategy<Value = CardDeck> {
    proptest::collection::vec(arb_code_card(), 1..6).prop_map(|cards| CardDeck::new(cards).unwrap())
}

proptest! {
    #[test]
    fn prop_serialized_deck_round_trips(deck in arb_deck()) {
        let raw = serde_json::to_string(&deck).unwrap();
        let parsed = parse_sequence(&raw).unwrap();
        prop_assert!(!parsed.repaired);
        prop_assert_eq!(parsed.value, deck);
    }

    #[test]
    fn prop_parsed_orders_are_dense(deck in arb_deck()) {
        let raw = serde_json::to_string(&deck).unwrap();
        let parsed = parse_sequence(&raw).unwrap().value;
        prop_assert!(!parsed.cards().is_empty());
        for (i, card) in parsed.iter().enumerate() {
            prop_assert_eq!(card.order(), i);
        }
    }

    #[test]
    fn prop_wrapped_output_is_repaired(
        deck in arb_code_deck(),
        prefix in "[A-Za-z ,.!]{0,30}",
        suffix in "[A-Za-z ,.!]{0,30}",
        fenced in any::<bool>(),
    ) {
        let json = serde_json::to_string(&deck).unwrap();
        let raw = if fenced {
            format!("{prefix}\n```json\n{json}\n```\n{suffix}")
        } else {
            format!("{prefix} {json} {suffix}")
        };
        let parsed = parse_sequence(&raw).unwrap();
        prop_assert_eq!(parsed.value, deck);
    }

    #[test]
    fn prop_prose_without_braces_never_parses(text in "[A-Za-z0-9 ,.!?\n]{0,200}") {
        let err = parse_sequence(&text).unwrap_err();
        prop_assert!(matches!(
            err.reason,
            ParseFailure::InvalidJson(_) | ParseFailure::MissingEnvelope("cards")
        ));
        prop_assert!(err.snippet.chars().count() <= 200);
    }

    #[test]
    fn prop_follow_up_single_card_round_trips(card in arb_card()) {
        let raw = serde_json::json!({ "card": card }).to_string();
        let parsed = parse_follow_up(&raw).unwrap();
        prop_assert_eq!(parsed.value, card);
    }

    #[test]
    fn prop_deck_size_is_bounded(count in 0usize..(MAX_CARDS + 20)) {
        let cards: Vec<_> = (0..count)
            .map(|i| serde_json::json!({ "title": format!("Card {i}"), "body": "b" }))
            .collect();
        let raw = serde_json::json!({ "cards": cards }).to_string();
        match parse_sequence(&raw) {
            Ok(parsed) => {
                prop_assert!((1..=MAX_CARDS).contains(&count));
                prop_assert_eq!(parsed.value.len(), count);
            }
            Err(err) => {
                prop_assert!(count == 0 || count > MAX_CARDS);
                let bounded = matches!(
                    err.reason,
                    ParseFailure::EmptySequence | ParseFailure::TooManyCards { .. }
                );
                prop_assert!(bounded);
            }
        }
    }
}
