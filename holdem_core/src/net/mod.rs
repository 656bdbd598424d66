//! Realtime plumbing shared by the server: the wire protocol and the
//! connection hub.

pub mod hub;
pub mod messages;

pub use hub::{ClientHandle, Hub, HubHandle, SEND_QUEUE_CAPACITY};
pub use messages::{ClientMessage, RejectReason, RevealedHand, ServerMessage};
