//! Property-based tests for the hand evaluator.
//!
//! These check the algebraic laws the table relies on: evaluation is a
//! deterministic, permutation-invariant function, comparison is a total
//! order, and the best seven-card hand dominates every five-card subset.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use proptest::prelude::*;

use holdem_core::game::{evaluate, evaluate_five, Card, HandCategory, Rank, Suit};

fn card_strategy() -> impl Strategy<Value = Card> {
    (0usize..13, 0usize..4).prop_map(|(rank_idx, suit_idx)| {
        Card::new(Rank::ALL[rank_idx], Suit::ALL[suit_idx])
    })
}

fn unique_cards(count: usize) -> impl Strategy<Value = Vec<Card>> {
    prop::collection::btree_set(card_strategy(), count).prop_map(|set| set.into_iter().collect())
}

proptest! {
    #[test]
    fn evaluation_is_deterministic(cards in unique_cards(7)) {
        prop_assert_eq!(evaluate(&cards).unwrap(), evaluate(&cards).unwrap());
    }

    #[test]
    fn evaluation_ignores_input_order(cards in unique_cards(7), rotation in 0usize..7) {
        let expected = evaluate(&cards).unwrap();
        let mut shuffled = cards.clone();
        shuffled.rotate_left(rotation);
        prop_assert_eq!(evaluate(&shuffled).unwrap(), expected.clone());
        shuffled.reverse();
        prop_assert_eq!(evaluate(&shuffled).unwrap(), expected);
    }

    #[test]
    fn comparison_is_antisymmetric(a in unique_cards(7), b in unique_cards(7)) {
        let ra = evaluate(&a).unwrap();
        let rb = evaluate(&b).unwrap();
        prop_assert_eq!(ra.cmp(&rb), rb.cmp(&ra).reverse());
    }

    #[test]
    fn self_comparison_is_equal(cards in unique_cards(7)) {
        let rank = evaluate(&cards).unwrap();
        prop_assert_eq!(rank.cmp(&rank), Ordering::Equal);
    }

    #[test]
    fn seven_card_rank_dominates_every_five_card_subset(cards in unique_cards(7)) {
        let best = evaluate(&cards).unwrap();
        // Spot-check contiguous windows; the evaluator enumerates all 21
        // subsets internally.
        for window in cards.windows(5) {
            let five: [Card; 5] = window.try_into().unwrap();
            prop_assert!(evaluate_five(&five) <= best);
        }
    }

    #[test]
    fn tiebreak_length_matches_category(cards in unique_cards(5)) {
        let five: [Card; 5] = cards.as_slice().try_into().unwrap();
        let rank = evaluate_five(&five);
        let expected_len = match rank.category {
            HandCategory::HighCard | HandCategory::Flush => 5,
            HandCategory::OnePair => 4,
            HandCategory::TwoPair | HandCategory::ThreeOfAKind => 3,
            HandCategory::FourOfAKind | HandCategory::FullHouse => 2,
            HandCategory::Straight
            | HandCategory::StraightFlush
            | HandCategory::RoyalFlush => 1,
        };
        prop_assert_eq!(rank.tiebreaks.len(), expected_len);

        // Every input card identity is distinct in these runs.
        let identities: BTreeSet<Card> = cards.iter().copied().collect();
        prop_assert_eq!(identities.len(), 5);
    }
}
