//! Per-viewer room snapshots for realtime fan-out.
//!
//! Hole cards are only present in the viewing player's own seat; every
//! other seat serializes without them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::{Card, Chips, HandPhase, PlayerAction, UserId};

use super::room::{Blinds, RoomId, RoomStatus};
use super::seat::{Seat, SeatStatus};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SeatView {
    pub user_id: UserId,
    pub display_name: String,
    pub stack: Chips,
    pub seat_index: usize,
    pub status: SeatStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hole_cards: Option<Vec<Card>>,
    pub street_contribution: Chips,
    pub hand_contribution: Chips,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_action: Option<PlayerAction>,
    pub is_dealer: bool,
    pub is_small_blind: bool,
    pub is_big_blind: bool,
}

impl SeatView {
    pub fn for_viewer(seat: &Seat, viewer: UserId) -> Self {
        let hole_cards = if seat.user_id == viewer && !seat.hole_cards.is_empty() {
            Some(seat.hole_cards.clone())
        } else {
            None
        };
        Self {
            user_id: seat.user_id,
            display_name: seat.display_name.clone(),
            stack: seat.stack,
            seat_index: seat.seat_index,
            status: seat.status,
            hole_cards,
            street_contribution: seat.street_contribution,
            hand_contribution: seat.hand_contribution,
            last_action: seat.last_action,
            is_dealer: seat.is_dealer,
            is_small_blind: seat.is_small_blind,
            is_big_blind: seat.is_big_blind,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RoomSnapshot {
    pub room_id: RoomId,
    pub name: String,
    pub status: RoomStatus,
    pub phase: HandPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hand_id: Option<Uuid>,
    pub blinds: Blinds,
    pub board: Vec<Card>,
    pub pot: Chips,
    pub dealer_seat: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_act: Option<UserId>,
    pub seats: Vec<SeatView>,
}
