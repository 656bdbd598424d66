//! Per-table state: seats, the room aggregate, settlement, snapshots,
//! and the registry that owns each room behind its exclusive lock.

pub mod registry;
#[allow(clippy::module_inception)]
pub mod room;
pub mod seat;
pub mod settlement;
pub mod snapshot;

pub use registry::{RoomRegistry, SharedRoom};
pub use room::{
    Blinds, HandSettlement, RemoveOutcome, Room, RoomError, RoomId, RoomOptions, RoomStatus,
    Visibility,
};
pub use seat::{Seat, SeatStatus};
pub use settlement::{settle, Contender, Payout, SettlementResult};
pub use snapshot::{RoomSnapshot, SeatView};
