//! Wire protocol for the realtime channel.
//!
//! Frames are UTF-8 JSON objects shaped `{"type": "...", "data": ...}`.
//! Serde's adjacent tagging produces exactly that envelope, so the enums
//! below are the protocol.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::{ActionError, Chips, HandRank, PlayerAction, UserId};
use crate::room::{Payout, RoomError, RoomId, RoomSnapshot};

/// Messages a client may send after the connection is established.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Application-level heartbeat; answered with `pong`.
    Ping,
    GameAction {
        room_id: RoomId,
        action: PlayerAction,
        #[serde(default)]
        amount: Chips,
    },
    JoinRoom {
        room_id: RoomId,
        buy_in: Chips,
    },
    LeaveRoom {
        room_id: RoomId,
    },
    StartHand {
        room_id: RoomId,
    },
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RevealedHand {
    pub user_id: UserId,
    pub rank: HandRank,
}

/// Messages pushed to clients.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Hello sent right after registration.
    Connected {
        client_id: Uuid,
        user_id: UserId,
    },
    /// Server unix-seconds timestamp, answering `ping`.
    Pong(i64),
    RoomSnapshot(RoomSnapshot),
    /// Sent only to the client whose action was refused.
    ActionRejected {
        reason: RejectReason,
        detail: String,
    },
    HandResult {
        room_id: RoomId,
        hand_id: Uuid,
        payouts: Vec<Payout>,
        revealed: Vec<RevealedHand>,
    },
}

/// Failure kinds surfaced to clients, deliberately coarser than the
/// engine's error enums.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    InvalidArgument,
    IllegalTransition,
    PreconditionFailed,
    ResourceExhausted,
    Unauthorized,
    Transient,
}

impl From<&RoomError> for RejectReason {
    fn from(error: &RoomError) -> Self {
        match error {
            RoomError::RoomFull
            | RoomError::AlreadySeated
            | RoomError::BelowMinBuyin { .. }
            | RoomError::NoSeatAvailable
            | RoomError::NotSeated
            | RoomError::NotEnoughPlayers
            | RoomError::HandInProgress => RejectReason::PreconditionFailed,
            RoomError::NotPlaying
            | RoomError::NoBettingRound
            | RoomError::RoomClosed
            | RoomError::Transition(_) => RejectReason::IllegalTransition,
            RoomError::Action(action) => match action {
                ActionError::OutOfTurn
                | ActionError::UnknownPlayer
                | ActionError::RoundComplete => RejectReason::IllegalTransition,
                ActionError::NonPositiveBet => RejectReason::InvalidArgument,
                ActionError::CheckFacingBet
                | ActionError::NothingToCall
                | ActionError::BetFacingBet
                | ActionError::RaiseTooSmall
                | ActionError::InsufficientStack
                | ActionError::EmptyStack => RejectReason::PreconditionFailed,
            },
            RoomError::HandAborted(_) => RejectReason::ResourceExhausted,
        }
    }
}

impl ServerMessage {
    pub fn rejection(error: &RoomError) -> Self {
        ServerMessage::ActionRejected {
            reason: RejectReason::from(error),
            detail: error.to_string(),
        }
    }
}
