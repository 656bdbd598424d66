//! Per-street betting state.
//!
//! A betting round owns the turn rotation, the live bet, and each
//! player's contribution for one street. It never touches stacks or the
//! pot itself: accepted actions report how many chips were committed and
//! the room applies them under its lock.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{Chips, UserId};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerAction {
    Fold,
    Check,
    Call,
    Bet,
    Raise,
    AllIn,
}

/// Emitted when an action closes the street.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RoundEvent {
    /// Everyone still in has matched the bet; deal the next street.
    BettingComplete,
    /// At most one player remains unfolded; go straight to showdown.
    ShowCards,
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum ActionError {
    #[error("not your turn")]
    OutOfTurn,
    #[error("not part of this betting round")]
    UnknownPlayer,
    #[error("betting round already complete")]
    RoundComplete,
    #[error("cannot check against a live bet")]
    CheckFacingBet,
    #[error("nothing to call")]
    NothingToCall,
    #[error("bet amount must be positive")]
    NonPositiveBet,
    #[error("a bet is already live; call or raise instead")]
    BetFacingBet,
    #[error("raise must exceed the current bet")]
    RaiseTooSmall,
    #[error("not enough chips; go all-in instead")]
    InsufficientStack,
    #[error("no chips left to wager")]
    EmptyStack,
}

/// One seat's entry into a round: pre-flop blind posts arrive as initial
/// contributions, possibly already all-in for a short stack.
#[derive(Clone, Copy, Debug)]
pub struct RoundEntrant {
    pub user_id: UserId,
    pub posted: Chips,
    pub all_in: bool,
}

impl RoundEntrant {
    pub fn open(user_id: UserId) -> Self {
        Self {
            user_id,
            posted: 0,
            all_in: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct ActionOutcome {
    /// Chips the player committed with this action.
    pub chips: Chips,
    /// The action consumed the player's entire stack.
    pub went_all_in: bool,
    pub event: Option<RoundEvent>,
}

/// Betting state for a single street.
///
/// The round is complete when at most one unfolded player remains, or
/// when every unfolded player has acted at least once and either matches
/// the current bet or is all-in for less.
#[derive(Clone, Debug)]
pub struct BettingRound {
    order: Vec<UserId>,
    turn: usize,
    current_bet: Chips,
    contributions: HashMap<UserId, Chips>,
    actions: HashMap<UserId, PlayerAction>,
    folded: HashSet<UserId>,
    all_in: HashSet<UserId>,
    acted: HashSet<UserId>,
    completed: bool,
}

impl BettingRound {
    /// Build a round from seats in turn order. `opening_bet` is the big
    /// blind pre-flop and zero on later streets.
    pub fn new(entrants: Vec<RoundEntrant>, opening_bet: Chips) -> Self {
        let order: Vec<UserId> = entrants.iter().map(|e| e.user_id).collect();
        let contributions = entrants.iter().map(|e| (e.user_id, e.posted)).collect();
        let all_in = entrants
            .iter()
            .filter(|e| e.all_in)
            .map(|e| e.user_id)
            .collect();
        Self {
            order,
            turn: 0,
            current_bet: opening_bet,
            contributions,
            actions: HashMap::new(),
            folded: HashSet::new(),
            all_in,
            acted: HashSet::new(),
            completed: false,
        }
    }

    pub fn current_bet(&self) -> Chips {
        self.current_bet
    }

    pub fn contribution(&self, user_id: UserId) -> Chips {
        self.contributions.get(&user_id).copied().unwrap_or(0)
    }

    pub fn last_action(&self, user_id: UserId) -> Option<PlayerAction> {
        self.actions.get(&user_id).copied()
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    /// The seat whose turn it is, skipping folded and all-in players.
    pub fn current_player(&self) -> Option<UserId> {
        if self.completed {
            return None;
        }
        (0..self.order.len()).find_map(|step| {
            let user_id = self.order[(self.turn + step) % self.order.len()];
            self.actionable(user_id).then_some(user_id)
        })
    }

    /// Close the round if its completion predicate already holds. Called
    /// once right after opening a street: when everyone left is all-in
    /// there is nothing to bet and the street falls through.
    pub fn close_if_settled(&mut self) -> Option<RoundEvent> {
        let event = self.completion_event();
        if event.is_some() {
            self.completed = true;
        }
        event
    }

    /// Apply one player action. `stack` is the acting player's remaining
    /// chips; rejected actions leave the round untouched.
    pub fn process_action(
        &mut self,
        user_id: UserId,
        action: PlayerAction,
        amount: Chips,
        stack: Chips,
    ) -> Result<ActionOutcome, ActionError> {
        if self.completed {
            return Err(ActionError::RoundComplete);
        }
        if !self.order.contains(&user_id) {
            return Err(ActionError::UnknownPlayer);
        }
        if self.current_player() != Some(user_id) {
            return Err(ActionError::OutOfTurn);
        }
        // The validated actor may sit past a run of folded or all-in
        // seats; park the cursor on them so rotation advances from the
        // seat that actually acted.
        if let Some(index) = self.order.iter().position(|u| *u == user_id) {
            self.turn = index;
        }

        let already = self.contribution(user_id);
        let mut went_all_in = false;
        let chips = match action {
            PlayerAction::Fold => {
                self.folded.insert(user_id);
                0
            }
            PlayerAction::Check => {
                if self.current_bet > 0 {
                    return Err(ActionError::CheckFacingBet);
                }
                0
            }
            PlayerAction::Call => {
                if self.current_bet == 0 {
                    return Err(ActionError::NothingToCall);
                }
                let owed = self.current_bet.saturating_sub(already);
                if owed >= stack {
                    went_all_in = true;
                    stack
                } else {
                    owed
                }
            }
            PlayerAction::Bet => {
                if self.current_bet > 0 {
                    return Err(ActionError::BetFacingBet);
                }
                if amount == 0 {
                    return Err(ActionError::NonPositiveBet);
                }
                if amount > stack {
                    return Err(ActionError::InsufficientStack);
                }
                went_all_in = amount == stack;
                self.current_bet = amount;
                amount
            }
            PlayerAction::Raise => {
                if amount <= self.current_bet {
                    return Err(ActionError::RaiseTooSmall);
                }
                let owed = amount - already;
                if owed > stack {
                    return Err(ActionError::InsufficientStack);
                }
                went_all_in = owed == stack;
                self.current_bet = amount;
                owed
            }
            PlayerAction::AllIn => {
                if stack == 0 {
                    return Err(ActionError::EmptyStack);
                }
                went_all_in = true;
                let total = already + stack;
                if total > self.current_bet {
                    self.current_bet = total;
                }
                stack
            }
        };

        *self.contributions.entry(user_id).or_default() += chips;
        self.actions.insert(user_id, action);
        self.acted.insert(user_id);
        if went_all_in {
            self.all_in.insert(user_id);
        }
        self.advance_turn();

        let event = self.completion_event();
        if event.is_some() {
            self.completed = true;
        }

        Ok(ActionOutcome {
            chips,
            went_all_in,
            event,
        })
    }

    /// Fold a player out of turn, for seats that disconnect mid-street.
    /// The owning room decides what happens to the hand afterwards.
    pub fn mark_folded(&mut self, user_id: UserId) {
        if !self.order.contains(&user_id) || self.folded.contains(&user_id) {
            return;
        }
        let had_turn = self.current_player() == Some(user_id);
        self.folded.insert(user_id);
        self.actions.insert(user_id, PlayerAction::Fold);
        if had_turn {
            if let Some(index) = self.order.iter().position(|u| *u == user_id) {
                self.turn = index;
            }
            self.advance_turn();
        }
        if self.completion_event().is_some() {
            self.completed = true;
        }
    }

    fn actionable(&self, user_id: UserId) -> bool {
        !self.folded.contains(&user_id) && !self.all_in.contains(&user_id)
    }

    fn advance_turn(&mut self) {
        for step in 1..=self.order.len() {
            let idx = (self.turn + step) % self.order.len();
            if self.actionable(self.order[idx]) {
                self.turn = idx;
                return;
            }
        }
    }

    fn completion_event(&self) -> Option<RoundEvent> {
        let live: Vec<UserId> = self
            .order
            .iter()
            .copied()
            .filter(|u| !self.folded.contains(u))
            .collect();
        if live.len() <= 1 {
            return Some(RoundEvent::ShowCards);
        }
        let settled = live.iter().all(|u| {
            self.all_in.contains(u)
                || (self.acted.contains(u) && self.contribution(*u) == self.current_bet)
        });
        settled.then_some(RoundEvent::BettingComplete)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_round(users: &[UserId]) -> BettingRound {
        BettingRound::new(users.iter().copied().map(RoundEntrant::open).collect(), 0)
    }

    fn preflop_round(order: &[UserId], sb: (UserId, Chips), bb: (UserId, Chips)) -> BettingRound {
        let entrants = order
            .iter()
            .map(|&u| RoundEntrant {
                user_id: u,
                posted: if u == sb.0 {
                    sb.1
                } else if u == bb.0 {
                    bb.1
                } else {
                    0
                },
                all_in: false,
            })
            .collect();
        BettingRound::new(entrants, bb.1)
    }

    #[test]
    fn rejects_out_of_turn_actions() {
        let mut round = open_round(&[1, 2, 3]);
        let err = round
            .process_action(2, PlayerAction::Check, 0, 100)
            .unwrap_err();
        assert_eq!(err, ActionError::OutOfTurn);
        assert_eq!(round.current_player(), Some(1));
    }

    #[test]
    fn check_around_completes_the_street() {
        let mut round = open_round(&[1, 2, 3]);
        assert!(round
            .process_action(1, PlayerAction::Check, 0, 100)
            .unwrap()
            .event
            .is_none());
        assert!(round
            .process_action(2, PlayerAction::Check, 0, 100)
            .unwrap()
            .event
            .is_none());
        let outcome = round.process_action(3, PlayerAction::Check, 0, 100).unwrap();
        assert_eq!(outcome.event, Some(RoundEvent::BettingComplete));
        assert!(round.is_complete());
    }

    #[test]
    fn check_is_illegal_against_a_bet() {
        let mut round = open_round(&[1, 2]);
        round.process_action(1, PlayerAction::Bet, 30, 100).unwrap();
        let err = round
            .process_action(2, PlayerAction::Check, 0, 100)
            .unwrap_err();
        assert_eq!(err, ActionError::CheckFacingBet);
    }

    #[test]
    fn bet_call_completes_with_matched_contributions() {
        let mut round = open_round(&[1, 2]);
        round.process_action(1, PlayerAction::Bet, 30, 100).unwrap();
        let outcome = round.process_action(2, PlayerAction::Call, 0, 100).unwrap();
        assert_eq!(outcome.chips, 30);
        assert_eq!(outcome.event, Some(RoundEvent::BettingComplete));
        assert_eq!(round.contribution(1), 30);
        assert_eq!(round.contribution(2), 30);
    }

    #[test]
    fn raise_reopens_action_for_the_bettor() {
        let mut round = open_round(&[1, 2]);
        round.process_action(1, PlayerAction::Bet, 20, 500).unwrap();
        let outcome = round
            .process_action(2, PlayerAction::Raise, 60, 500)
            .unwrap();
        assert!(outcome.event.is_none());
        assert_eq!(round.current_player(), Some(1));

        let outcome = round.process_action(1, PlayerAction::Call, 0, 480).unwrap();
        assert_eq!(outcome.chips, 40);
        assert_eq!(outcome.event, Some(RoundEvent::BettingComplete));
    }

    #[test]
    fn raise_below_current_bet_is_rejected() {
        let mut round = open_round(&[1, 2]);
        round.process_action(1, PlayerAction::Bet, 50, 500).unwrap();
        let err = round
            .process_action(2, PlayerAction::Raise, 50, 500)
            .unwrap_err();
        assert_eq!(err, ActionError::RaiseTooSmall);
    }

    #[test]
    fn fold_to_one_emits_show_cards() {
        let mut round = open_round(&[1, 2]);
        round.process_action(1, PlayerAction::Bet, 25, 100).unwrap();
        let outcome = round.process_action(2, PlayerAction::Fold, 0, 100).unwrap();
        assert_eq!(outcome.event, Some(RoundEvent::ShowCards));
    }

    #[test]
    fn short_stack_call_goes_all_in_for_less() {
        let mut round = open_round(&[1, 2]);
        round.process_action(1, PlayerAction::Bet, 80, 500).unwrap();
        let outcome = round.process_action(2, PlayerAction::Call, 0, 50).unwrap();
        assert_eq!(outcome.chips, 50);
        assert!(outcome.went_all_in);
        // All-in for less still closes the street.
        assert_eq!(outcome.event, Some(RoundEvent::BettingComplete));
    }

    #[test]
    fn all_in_above_the_bet_raises_it() {
        let mut round = open_round(&[1, 2]);
        round.process_action(1, PlayerAction::Bet, 40, 500).unwrap();
        let outcome = round.process_action(2, PlayerAction::AllIn, 0, 150).unwrap();
        assert_eq!(outcome.chips, 150);
        assert!(outcome.event.is_none());
        assert_eq!(round.current_bet(), 150);
        assert_eq!(round.current_player(), Some(1));
    }

    #[test]
    fn big_blind_gets_the_option_before_the_street_closes() {
        // Blinds 10/20, three-handed: seat 3 is under the gun.
        let mut round = preflop_round(&[3, 1, 2], (1, 10), (2, 20));
        round.process_action(3, PlayerAction::Call, 0, 1000).unwrap();
        let sb = round.process_action(1, PlayerAction::Call, 0, 990).unwrap();
        assert_eq!(sb.chips, 10);
        assert!(sb.event.is_none(), "big blind has not acted yet");

        let bb = round.process_action(2, PlayerAction::Call, 0, 980).unwrap();
        assert_eq!(bb.chips, 0);
        assert_eq!(bb.event, Some(RoundEvent::BettingComplete));
    }

    #[test]
    fn leading_all_in_seat_is_skipped_without_revisiting_the_next() {
        // Seat 1 is all-in from a prior street and sits first in the
        // post-flop order; the live seats must each act exactly once.
        let entrants = vec![
            RoundEntrant {
                user_id: 1,
                posted: 0,
                all_in: true,
            },
            RoundEntrant::open(2),
            RoundEntrant::open(3),
        ];
        let mut round = BettingRound::new(entrants, 0);

        assert_eq!(round.current_player(), Some(2));
        let outcome = round.process_action(2, PlayerAction::Check, 0, 500).unwrap();
        assert!(outcome.event.is_none());

        // The turn moves on to seat 3; seat 2 cannot act again and in
        // particular cannot check and then open a bet.
        assert_eq!(round.current_player(), Some(3));
        let err = round
            .process_action(2, PlayerAction::Bet, 50, 500)
            .unwrap_err();
        assert_eq!(err, ActionError::OutOfTurn);

        let outcome = round.process_action(3, PlayerAction::Check, 0, 500).unwrap();
        assert_eq!(outcome.event, Some(RoundEvent::BettingComplete));
    }

    #[test]
    fn street_of_all_in_players_closes_on_open() {
        let entrants = vec![
            RoundEntrant {
                user_id: 1,
                posted: 0,
                all_in: true,
            },
            RoundEntrant {
                user_id: 2,
                posted: 0,
                all_in: true,
            },
        ];
        let mut round = BettingRound::new(entrants, 0);
        assert_eq!(round.close_if_settled(), Some(RoundEvent::BettingComplete));
        assert!(round.is_complete());
    }

    #[test]
    fn completed_round_rejects_further_actions() {
        let mut round = open_round(&[1, 2]);
        round.process_action(1, PlayerAction::Check, 0, 100).unwrap();
        round.process_action(2, PlayerAction::Check, 0, 100).unwrap();
        let err = round
            .process_action(1, PlayerAction::Bet, 10, 100)
            .unwrap_err();
        assert_eq!(err, ActionError::RoundComplete);
    }
}
