use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::game::{Card, Chips, PlayerAction, UserId};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SeatStatus {
    /// Seated, no hand running.
    Sitting,
    /// In the current hand with chips behind.
    Active,
    Folded,
    AllIn,
    /// Joined mid-hand; plays from the next deal.
    Waiting,
}

/// One player's seat at a table. Created on join, mutated only by the
/// owning room, destroyed on leave.
#[derive(Clone, Debug)]
pub struct Seat {
    pub user_id: UserId,
    pub display_name: String,
    pub stack: Chips,
    pub seat_index: usize,
    pub status: SeatStatus,
    pub hole_cards: Vec<Card>,
    /// Chips committed on the current street.
    pub street_contribution: Chips,
    /// Chips committed across the whole hand, blinds included.
    pub hand_contribution: Chips,
    pub last_action: Option<PlayerAction>,
    pub is_dealer: bool,
    pub is_small_blind: bool,
    pub is_big_blind: bool,
    pub joined_at: DateTime<Utc>,
}

impl Seat {
    pub fn new(user_id: UserId, display_name: String, stack: Chips, seat_index: usize) -> Self {
        Self {
            user_id,
            display_name,
            stack,
            seat_index,
            status: SeatStatus::Sitting,
            hole_cards: Vec::with_capacity(2),
            street_contribution: 0,
            hand_contribution: 0,
            last_action: None,
            is_dealer: false,
            is_small_blind: false,
            is_big_blind: false,
            joined_at: Utc::now(),
        }
    }

    /// Still contesting the pot.
    pub fn in_hand(&self) -> bool {
        matches!(self.status, SeatStatus::Active | SeatStatus::AllIn)
    }

    /// Move chips from the stack into the pot. Callers must have capped
    /// `chips` at the stack.
    pub fn commit(&mut self, chips: Chips) {
        self.stack -= chips;
        self.street_contribution += chips;
        self.hand_contribution += chips;
    }

    pub fn reset_for_hand(&mut self) {
        self.status = SeatStatus::Active;
        self.hole_cards.clear();
        self.street_contribution = 0;
        self.hand_contribution = 0;
        self.last_action = None;
        self.is_dealer = false;
        self.is_small_blind = false;
        self.is_big_blind = false;
    }

    pub fn open_street(&mut self) {
        self.street_contribution = 0;
        self.last_action = None;
    }
}
