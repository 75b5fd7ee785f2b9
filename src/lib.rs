//! Huddle - Realtime Presence & Broadcast Coordinator
//!
//! Huddle is the always-on realtime process of a social platform backend.
//! It tracks which users are currently connected, which rooms
//! (conversations, tournaments) each connection has joined, and fans out
//! ephemeral events - presence changes and typing indicators - to the
//! right set of sockets. Durable messaging, authentication, and the CRUD
//! API surface are external collaborators; this crate carries only the
//! ephemeral signal.
//!
//! # Module Structure
//!
//! The crate is organized leaves-first:
//!
//! - **`shared`** - identifier newtypes and the JSON wire protocol
//! - **`registry`** - live connections and their user bindings
//! - **`rooms`** - room/connection membership with lazy GC of empty rooms
//! - **`presence`** - online state derived from live connection counts
//! - **`broadcast`** - best-effort fan-out to room, user, or everyone
//! - **`coordinator`** - the connection lifecycle state machine
//! - **`ws`** - axum WebSocket transport, one actor per connection
//! - **`server`** - application state, configuration, router assembly
//! - **`error`** - the local-only error taxonomy
//!
//! # Concurrency
//!
//! One tokio task per connection processes inbound signals; the shared
//! state stores are `std::sync::Mutex`-protected with short, await-free
//! critical sections. Delivery is a non-blocking channel send into each
//! connection's writer task, so a slow client can never stall a broadcast
//! to the rest of a room.
//!
//! # Delivery Semantics
//!
//! Best-effort only: no acknowledgment, retry, or durability. A client
//! that misses a `typing:stop` shows a stale indicator until its own
//! timeout - an accepted limitation of favoring liveness over reliability
//! for ephemeral signals.

/// Identifier newtypes and wire protocol
pub mod shared;

/// Live connection registry
pub mod registry;

/// Room membership table
pub mod rooms;

/// Presence tracker
pub mod presence;

/// Event fan-out
pub mod broadcast;

/// Connection lifecycle state machine
pub mod coordinator;

/// WebSocket transport
pub mod ws;

/// Server assembly
pub mod server;

/// Error taxonomy
pub mod error;

pub use broadcast::EventBroadcaster;
pub use coordinator::Coordinator;
pub use error::CoordinatorError;
pub use presence::{PresenceTracker, PresenceTransition};
pub use registry::{ConnectionRegistry, EventSender};
pub use rooms::RoomMembershipTable;
pub use shared::{ClientSignal, ConnectionId, RoomId, ServerEvent, UserId};
