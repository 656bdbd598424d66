//! Pot settlement.
//!
//! The pot is kept as a single scalar during play; at settlement it is
//! rebuilt from per-seat contributions and swept in ascending layers so
//! that players all-in for different amounts are only paid from layers
//! they funded. Dead money from folded seats joins the layer it falls in.

use std::collections::HashMap;

use crate::game::{evaluate, Chips, HandRank, UserId};

use super::seat::Seat;

/// A seat's stake in the settlement, projected out of the room.
#[derive(Clone, Debug)]
pub struct Contender {
    pub user_id: UserId,
    pub contributed: Chips,
    /// Not folded; may win chips.
    pub eligible: bool,
    /// Hole cards plus board. May be shorter than 5 when the hand ended
    /// before the flop.
    pub cards: Vec<crate::game::Card>,
    /// Clockwise distance from the dealer; 1 is the seat directly after
    /// the button. Breaks odd-chip ties.
    pub button_distance: usize,
}

impl Contender {
    pub fn from_seat(seat: &Seat, board: &[crate::game::Card], button_distance: usize) -> Self {
        let mut cards = seat.hole_cards.clone();
        cards.extend_from_slice(board);
        Self {
            user_id: seat.user_id,
            contributed: seat.hand_contribution,
            eligible: seat.in_hand(),
            cards,
            button_distance,
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Payout {
    pub user_id: UserId,
    pub amount: Chips,
}

#[derive(Clone, Debug, Default)]
pub struct SettlementResult {
    /// Aggregated winnings per user, largest first.
    pub payouts: Vec<Payout>,
    /// Evaluated ranks of the seats that went to showdown.
    pub revealed: Vec<(UserId, HandRank)>,
}

/// Distribute every contributed chip among the eligible seats.
pub fn settle(contenders: &[Contender]) -> SettlementResult {
    let total: Chips = contenders.iter().map(|c| c.contributed).sum();
    let eligible: Vec<&Contender> = contenders.iter().filter(|c| c.eligible).collect();

    if total == 0 || eligible.is_empty() {
        return SettlementResult::default();
    }

    // A lone survivor takes everything without showing down.
    if eligible.len() == 1 {
        return SettlementResult {
            payouts: vec![Payout {
                user_id: eligible[0].user_id,
                amount: total,
            }],
            revealed: Vec::new(),
        };
    }

    // Rank every eligible seat. A hand that ended before five cards were
    // out cannot be ranked; the pot is then chopped evenly.
    let mut ranks: HashMap<UserId, HandRank> = HashMap::new();
    for contender in &eligible {
        match evaluate(&contender.cards) {
            Ok(rank) => {
                ranks.insert(contender.user_id, rank);
            }
            Err(_) => {
                let winners: Vec<&Contender> = eligible.to_vec();
                return SettlementResult {
                    payouts: split_between(total, &winners),
                    revealed: Vec::new(),
                };
            }
        }
    }

    // Sweep contribution layers from the smallest stake upward. Each
    // layer is funded by every contender up to that level and contested
    // only by eligible seats that covered it.
    let mut levels: Vec<Chips> = eligible.iter().map(|c| c.contributed).collect();
    levels.sort_unstable();
    levels.dedup();

    let mut won: HashMap<UserId, Chips> = HashMap::new();
    let mut prev: Chips = 0;
    let last = *levels.last().expect("eligible seats always have a level");
    for &level in &levels {
        let layer: Chips = contenders
            .iter()
            .map(|c| {
                // The top layer also absorbs any folded contribution
                // above the highest eligible stake.
                let cap = if level == last { c.contributed } else { c.contributed.min(level) };
                cap.saturating_sub(prev.min(c.contributed))
            })
            .sum();
        prev = level;
        if layer == 0 {
            continue;
        }

        let in_layer: Vec<&Contender> = eligible
            .iter()
            .copied()
            .filter(|c| c.contributed >= level)
            .collect();
        let best = in_layer
            .iter()
            .filter_map(|c| ranks.get(&c.user_id))
            .max()
            .cloned();
        let winners: Vec<&Contender> = in_layer
            .into_iter()
            .filter(|c| ranks.get(&c.user_id) == best.as_ref())
            .collect();
        for payout in split_between(layer, &winners) {
            *won.entry(payout.user_id).or_default() += payout.amount;
        }
    }

    let mut payouts: Vec<Payout> = won
        .into_iter()
        .map(|(user_id, amount)| Payout { user_id, amount })
        .collect();
    payouts.sort_unstable_by(|a, b| b.amount.cmp(&a.amount).then(a.user_id.cmp(&b.user_id)));

    let mut revealed: Vec<(UserId, HandRank)> = ranks.into_iter().collect();
    revealed.sort_unstable_by_key(|(user_id, _)| *user_id);

    SettlementResult { payouts, revealed }
}

/// Even split with the remainder chips going to the earliest seats
/// clockwise from the dealer, one apiece.
fn split_between(amount: Chips, winners: &[&Contender]) -> Vec<Payout> {
    let n = winners.len() as Chips;
    let share = amount / n;
    let mut odd = (amount % n) as usize;

    let mut ordered: Vec<&Contender> = winners.to_vec();
    ordered.sort_unstable_by_key(|c| c.button_distance);

    ordered
        .into_iter()
        .map(|c| {
            let extra = if odd > 0 {
                odd -= 1;
                1
            } else {
                0
            };
            Payout {
                user_id: c.user_id,
                amount: share + extra,
            }
        })
        .filter(|p| p.amount > 0)
        .collect()
}
