//! # holdem_core
//!
//! Core engine of a multi-table Texas Hold'em server: a deterministic
//! hand evaluator, per-hand deck, street-by-street betting rounds, the
//! hand state machine, the per-table room aggregate with pot settlement,
//! and the realtime hub that fans game state out to connected clients.
//!
//! ## Architecture
//!
//! - [`game`]: pure, synchronous poker primitives.
//! - [`room`]: the per-table consistency unit; every mutation happens
//!   under the room's exclusive lock.
//! - [`net`]: the wire protocol and the hub coordinator task.
//! - [`auth`]: bearer-token verification for connection upgrades.
//! - [`db`]: the chip-balance boundary with the user record store.
//!
//! Randomness is injected wherever cards are shuffled, so a seeded
//! generator replays a hand exactly.

pub mod auth;
pub mod db;
pub mod game;
pub mod net;
pub mod room;

pub use game::{Chips, UserId};
pub use room::{RoomId, RoomRegistry};
