//! Hand progression state machine.
//!
//! The machine only validates and applies transitions; the owning room
//! performs state-entry work (dealing, opening betting rounds, settling)
//! and calls `revert` if that work fails, which rejects the event without
//! leaving the machine in the half-entered phase.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Phase of the current hand.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandPhase {
    Waiting,
    PreFlop,
    Flop,
    Turn,
    River,
    Showdown,
    End,
}

/// Events that drive a hand between phases.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GameEvent {
    StartGame,
    BettingComplete,
    ShowCards,
    DetermineWinner,
    NextRound,
    PlayerLeft,
    Reset,
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum TransitionError {
    #[error("event {event:?} is not legal in phase {phase:?}")]
    Illegal { phase: HandPhase, event: GameEvent },
}

fn next_phase(phase: HandPhase, event: GameEvent) -> Option<HandPhase> {
    use GameEvent::*;
    use HandPhase::*;

    Some(match (phase, event) {
        (_, Reset) => Waiting,
        (Waiting, StartGame) => PreFlop,
        (PreFlop, BettingComplete) => Flop,
        (PreFlop, ShowCards) => Showdown,
        (PreFlop, PlayerLeft) => End,
        (Flop, BettingComplete) => Turn,
        (Flop, ShowCards) => Showdown,
        (Flop, PlayerLeft) => End,
        (Turn, BettingComplete) => River,
        (Turn, ShowCards) => Showdown,
        (Turn, PlayerLeft) => End,
        (River, BettingComplete) => Showdown,
        (River, ShowCards) => Showdown,
        (River, PlayerLeft) => End,
        (Showdown, DetermineWinner) => End,
        (End, NextRound) => Waiting,
        _ => return None,
    })
}

#[derive(Clone, Debug)]
pub struct PhaseMachine {
    current: HandPhase,
}

impl PhaseMachine {
    pub fn new() -> Self {
        Self {
            current: HandPhase::Waiting,
        }
    }

    pub fn current(&self) -> HandPhase {
        self.current
    }

    pub fn can_fire(&self, event: GameEvent) -> bool {
        next_phase(self.current, event).is_some()
    }

    /// Apply `event`, returning the phase just entered.
    pub fn apply(&mut self, event: GameEvent) -> Result<HandPhase, TransitionError> {
        let next = next_phase(self.current, event).ok_or(TransitionError::Illegal {
            phase: self.current,
            event,
        })?;
        self.current = next;
        Ok(next)
    }

    /// Roll back to `phase` after a failed state-entry callback.
    pub fn revert(&mut self, phase: HandPhase) {
        self.current = phase;
    }

    pub fn reset(&mut self) {
        self.current = HandPhase::Waiting;
    }
}

impl Default for PhaseMachine {
    fn default() -> Self {
        Self::new()
    }
}
