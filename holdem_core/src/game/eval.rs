//! Hand evaluation over the 52-card domain.
//!
//! `evaluate` ranks the best 5-card subset of 5 to 7 cards by enumerating
//! every 5-card combination. The 7-card hot path is 21 subset evaluations
//! of pure integer work, which is well under a microsecond; nothing here
//! allocates beyond the tiebreak vector of the returned rank.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::cards::{Card, Rank};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandCategory {
    HighCard,
    OnePair,
    TwoPair,
    ThreeOfAKind,
    Straight,
    Flush,
    FullHouse,
    FourOfAKind,
    StraightFlush,
    RoyalFlush,
}

/// A ranked 5-card hand. Ordering is lexicographic over (category,
/// tiebreaks); tiebreaks hold the significant ranks high-to-low, so the
/// derived `Ord` is the comparison the table needs. Two hands compare
/// equal exactly when their 5-card projections are rank-identical, which
/// is a true chop.
#[derive(Clone, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
pub struct HandRank {
    pub category: HandCategory,
    pub tiebreaks: Vec<Rank>,
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum EvalError {
    #[error("need at least 5 cards to evaluate, got {0}")]
    NotEnoughCards(usize),
}

/// Rank the best 5-card hand available in `cards`.
///
/// Accepts 5 to 7 cards (hole cards plus however much of the board has
/// been dealt). Fewer than 5 is a caller bug and returns an error rather
/// than a bogus rank.
pub fn evaluate(cards: &[Card]) -> Result<HandRank, EvalError> {
    if cards.len() < 5 {
        return Err(EvalError::NotEnoughCards(cards.len()));
    }

    let mut best: Option<HandRank> = None;
    let mut subset = [cards[0]; 5];
    for_each_five(cards, &mut subset, 0, 0, &mut |five| {
        let rank = evaluate_five(five);
        if best.as_ref().map_or(true, |b| rank > *b) {
            best = Some(rank);
        }
    });

    // At least one subset exists for len >= 5.
    Ok(best.expect("non-empty combination set"))
}

fn for_each_five(
    cards: &[Card],
    subset: &mut [Card; 5],
    start: usize,
    depth: usize,
    visit: &mut impl FnMut(&[Card; 5]),
) {
    if depth == 5 {
        visit(subset);
        return;
    }
    for i in start..cards.len() {
        subset[depth] = cards[i];
        for_each_five(cards, subset, i + 1, depth + 1, visit);
    }
}

/// Rank exactly five cards.
pub fn evaluate_five(cards: &[Card; 5]) -> HandRank {
    let mut ranks: Vec<Rank> = cards.iter().map(|c| c.rank).collect();
    ranks.sort_unstable_by(|a, b| b.cmp(a));

    let is_flush = cards.iter().all(|c| c.suit == cards[0].suit);
    let straight_high = straight_top(&ranks);

    if let (true, Some(high)) = (is_flush, straight_high) {
        let category = if high == Rank::Ace {
            HandCategory::RoyalFlush
        } else {
            HandCategory::StraightFlush
        };
        return HandRank {
            category,
            tiebreaks: vec![high],
        };
    }

    // Rank multiplicities, most frequent first, ties broken by rank.
    let mut groups: Vec<(usize, Rank)> = Vec::with_capacity(5);
    for &rank in &ranks {
        match groups.iter_mut().find(|(_, r)| *r == rank) {
            Some((count, _)) => *count += 1,
            None => groups.push((1, rank)),
        }
    }
    groups.sort_unstable_by(|a, b| b.cmp(a));

    let counts: Vec<usize> = groups.iter().map(|(c, _)| *c).collect();
    let significant: Vec<Rank> = groups.iter().map(|(_, r)| *r).collect();

    match (counts.as_slice(), is_flush, straight_high) {
        ([4, 1], _, _) => HandRank {
            category: HandCategory::FourOfAKind,
            tiebreaks: significant,
        },
        ([3, 2], _, _) => HandRank {
            category: HandCategory::FullHouse,
            tiebreaks: significant,
        },
        (_, true, _) => HandRank {
            category: HandCategory::Flush,
            tiebreaks: ranks,
        },
        (_, _, Some(high)) => HandRank {
            category: HandCategory::Straight,
            tiebreaks: vec![high],
        },
        ([3, 1, 1], _, _) => HandRank {
            category: HandCategory::ThreeOfAKind,
            tiebreaks: significant,
        },
        ([2, 2, 1], _, _) => HandRank {
            category: HandCategory::TwoPair,
            tiebreaks: significant,
        },
        ([2, 1, 1, 1], _, _) => HandRank {
            category: HandCategory::OnePair,
            tiebreaks: significant,
        },
        _ => HandRank {
            category: HandCategory::HighCard,
            tiebreaks: ranks,
        },
    }
}

/// Top card of a 5-card straight, if the ranks form one. `ranks` must be
/// sorted descending. The wheel A-2-3-4-5 counts with the five on top.
fn straight_top(ranks: &[Rank]) -> Option<Rank> {
    let consecutive = ranks
        .windows(2)
        .all(|w| w[0].value() == w[1].value() + 1);
    if consecutive {
        return Some(ranks[0]);
    }

    const WHEEL: [Rank; 5] = [Rank::Ace, Rank::Five, Rank::Four, Rank::Three, Rank::Two];
    if ranks == WHEEL.as_slice() {
        return Some(Rank::Five);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cards(names: &[&str]) -> Vec<Card> {
        names.iter().map(|s| s.parse().unwrap()).collect()
    }

    fn eval(names: &[&str]) -> HandRank {
        evaluate(&cards(names)).unwrap()
    }

    #[test]
    fn rejects_short_input() {
        let four = cards(&["AS", "KS", "QS", "JS"]);
        assert_eq!(evaluate(&four), Err(EvalError::NotEnoughCards(4)));
    }

    #[test]
    fn wheel_straight_tops_at_five() {
        let rank = eval(&["AS", "2H", "3D", "4C", "5S", "KC", "QD"]);
        assert_eq!(rank.category, HandCategory::Straight);
        assert_eq!(rank.tiebreaks, vec![Rank::Five]);
    }

    #[test]
    fn royal_flush_detected() {
        let rank = eval(&["TH", "JH", "QH", "2C", "5D", "AH", "KH"]);
        assert_eq!(rank.category, HandCategory::RoyalFlush);
        assert_eq!(rank.tiebreaks, vec![Rank::Ace]);
    }

    #[test]
    fn royal_flush_beats_lower_straight_flush() {
        let royal = eval(&["TH", "JH", "QH", "KH", "AH"]);
        let nine_high = eval(&["5S", "6S", "7S", "8S", "9S"]);
        assert_eq!(nine_high.category, HandCategory::StraightFlush);
        assert!(royal > nine_high);
    }

    #[test]
    fn full_house_tiebreaks_triple_then_pair() {
        let rank = eval(&["3S", "3H", "3D", "KC", "KS"]);
        assert_eq!(rank.category, HandCategory::FullHouse);
        assert_eq!(rank.tiebreaks, vec![Rank::Three, Rank::King]);
    }

    #[test]
    fn two_pair_orders_high_pair_first() {
        let rank = eval(&["9S", "9H", "4D", "4C", "AS"]);
        assert_eq!(rank.category, HandCategory::TwoPair);
        assert_eq!(rank.tiebreaks, vec![Rank::Nine, Rank::Four, Rank::Ace]);
    }

    #[test]
    fn quads_pick_best_kicker_from_seven() {
        let rank = eval(&["7S", "7H", "7D", "7C", "2S", "AC", "KD"]);
        assert_eq!(rank.category, HandCategory::FourOfAKind);
        assert_eq!(rank.tiebreaks, vec![Rank::Seven, Rank::Ace]);
    }

    #[test]
    fn straight_prefers_highest_run_in_seven() {
        let rank = eval(&["4S", "5H", "6D", "7C", "8S", "9H", "2C"]);
        assert_eq!(rank.category, HandCategory::Straight);
        assert_eq!(rank.tiebreaks, vec![Rank::Nine]);
    }

    #[test]
    fn flush_uses_all_five_ranks_descending() {
        let rank = eval(&["AD", "9D", "7D", "4D", "2D"]);
        assert_eq!(rank.category, HandCategory::Flush);
        assert_eq!(
            rank.tiebreaks,
            vec![Rank::Ace, Rank::Nine, Rank::Seven, Rank::Four, Rank::Two]
        );
    }

    #[test]
    fn kickers_break_pair_ties() {
        let ace_kicker = eval(&["8S", "8H", "AD", "5C", "2S"]);
        let king_kicker = eval(&["8D", "8C", "KD", "5H", "2D"]);
        assert!(ace_kicker > king_kicker);
    }

    #[test]
    fn identical_projections_chop() {
        let a = eval(&["8S", "8H", "AD", "5C", "2S"]);
        let b = eval(&["8D", "8C", "AH", "5S", "2C"]);
        assert_eq!(a, b);
    }

    #[test]
    fn evaluation_is_permutation_invariant() {
        let base = ["AS", "KD", "8C", "8H", "3D", "2S", "QH"];
        let expected = eval(&base);
        let mut rotated = base;
        rotated.rotate_left(3);
        assert_eq!(eval(&rotated), expected);
        rotated.reverse();
        assert_eq!(eval(&rotated), expected);
    }
}
