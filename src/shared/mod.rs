//! Shared Types
//!
//! Wire-facing types used by both the coordinator core and the transport
//! layer: identifier newtypes and the JSON protocol events.

/// Identifier newtypes
pub mod ids;

/// Wire protocol signals and events
pub mod event;

pub use event::{ClientSignal, ServerEvent};
pub use ids::{ConnectionId, RoomId, UserId};
