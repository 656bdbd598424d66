//! Core poker primitives: cards, deck, hand evaluation, betting, and the
//! hand state machine. Everything here is synchronous and deterministic;
//! concurrency lives in [`crate::room`] and [`crate::net`].

pub mod betting;
pub mod cards;
pub mod deck;
pub mod eval;
pub mod state_machine;

/// Whole-chip amounts. Stacks and pots never go fractional.
pub type Chips = u32;

/// Player identity as stored by the user record collaborator.
pub type UserId = i64;

pub use betting::{ActionError, ActionOutcome, BettingRound, PlayerAction, RoundEntrant, RoundEvent};
pub use cards::{Card, CardParseError, Rank, Suit};
pub use deck::{Deck, DeckError, DECK_SIZE};
pub use eval::{evaluate, evaluate_five, EvalError, HandCategory, HandRank};
pub use state_machine::{GameEvent, HandPhase, PhaseMachine, TransitionError};
