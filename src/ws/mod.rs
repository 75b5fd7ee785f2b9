//! WebSocket Transport
//!
//! The transport edge of the coordinator: the `GET /ws` upgrade handler and
//! the actor that runs each accepted connection. Everything above this
//! module is transport-agnostic; the actor is the only code that touches
//! axum's WebSocket types.
//!
//! # Actor Per Connection
//!
//! Each accepted socket is split into reader and writer halves. The writer
//! task owns the sink and drains two channels: the connection's event
//! channel (JSON-encoded coordinator events) and a control channel for
//! ping/pong/close frames. The reader loop decodes inbound JSON signals
//! and dispatches them to the coordinator; when it exits - for any reason,
//! the coordinator cannot distinguish a close from a network failure - the
//! terminal disconnect transition runs.

/// Connection actor and upgrade handler
pub mod actor;

pub use actor::ws_upgrade_handler;
