/**
 * Connection Registry
 *
 * This module owns the set of live connections: their identifiers, their
 * optional user binding, their timestamps, and the outbound event sender
 * used to reach each one. It is the single authority on "which connections
 * exist" - presence is derived from it and the broadcaster resolves every
 * delivery target through it.
 *
 * # Lifecycle
 *
 * A record is created when the transport is accepted (`register`) and
 * destroyed when the transport closes (`unregister`). A connection's bound
 * user identifier, once set, never changes for its lifetime; a user switch
 * requires a new connection.
 *
 * # Thread Safety
 *
 * The registry is a `std::sync::Mutex` over a map of records. Critical
 * sections are short and never perform I/O or await, so many connection
 * tasks can drive it concurrently without stalls.
 */

use crate::error::CoordinatorError;
use crate::shared::event::ServerEvent;
use crate::shared::ids::{ConnectionId, UserId};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Outbound channel for one connection.
///
/// Cloning the sender lets the broadcaster reach the connection's writer
/// task from anywhere without blocking; the send itself never awaits.
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// One live transport-level session.
#[derive(Debug, Clone)]
struct ConnectionRecord {
    /// Bound user identifier; `None` until the client identifies itself
    user: Option<UserId>,
    /// Channel into the connection's writer task
    sender: EventSender,
    created_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

/// Outcome of a `bind_user` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindOutcome {
    /// The connection was anonymous and is now bound; the caller should
    /// bump presence for the user.
    Bound,
    /// The connection was already bound to this same user; idempotent
    /// re-identify, presence must not be bumped again.
    AlreadyBound,
    /// The connection id is not registered (already closed); the signal
    /// is dropped.
    UnknownConnection,
}

/// Registry of live connections and their user bindings.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<ConnectionId, ConnectionRecord>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate and store a new anonymous connection record. Never fails.
    pub fn register(&self, sender: EventSender) -> ConnectionId {
        let id = ConnectionId::new();
        let now = Utc::now();
        let record = ConnectionRecord {
            user: None,
            sender,
            created_at: now,
            last_activity: now,
        };
        self.connections
            .lock()
            .expect("connection registry lock poisoned")
            .insert(id, record);
        tracing::debug!("[Registry] Connection {} registered", id);
        id
    }

    /// Bind a connection to a user identifier.
    ///
    /// Idempotent when called twice with the same user. Binding an
    /// already-bound connection to a *different* user is a protocol
    /// violation and alters no state.
    pub fn bind_user(
        &self,
        connection: ConnectionId,
        user: UserId,
    ) -> Result<BindOutcome, CoordinatorError> {
        let mut connections = self
            .connections
            .lock()
            .expect("connection registry lock poisoned");
        let Some(record) = connections.get_mut(&connection) else {
            return Ok(BindOutcome::UnknownConnection);
        };
        match &record.user {
            None => {
                record.user = Some(user);
                record.last_activity = Utc::now();
                Ok(BindOutcome::Bound)
            }
            Some(bound) if *bound == user => {
                record.last_activity = Utc::now();
                Ok(BindOutcome::AlreadyBound)
            }
            Some(bound) => {
                tracing::warn!(
                    "[Registry] Connection {} tried to rebind from {} to {}",
                    connection,
                    bound,
                    user
                );
                Err(CoordinatorError::already_bound(connection))
            }
        }
    }

    /// Remove a connection record, returning the user it was bound to.
    ///
    /// Safe to call on an unknown id (no-op) to tolerate duplicate
    /// disconnect signals.
    pub fn unregister(&self, connection: ConnectionId) -> Option<UserId> {
        let removed = self
            .connections
            .lock()
            .expect("connection registry lock poisoned")
            .remove(&connection);
        match removed {
            Some(record) => {
                tracing::debug!(
                    "[Registry] Connection {} unregistered (user: {:?}, lived since {}, last active {})",
                    connection,
                    record.user.as_ref().map(UserId::as_str),
                    record.created_at,
                    record.last_activity
                );
                record.user
            }
            None => None,
        }
    }

    /// The user a connection is bound to, if it has identified.
    pub fn user_of(&self, connection: ConnectionId) -> Option<UserId> {
        self.connections
            .lock()
            .expect("connection registry lock poisoned")
            .get(&connection)
            .and_then(|record| record.user.clone())
    }

    /// Every connection currently bound to a user, for multi-device fan-out.
    pub fn connections_for_user(&self, user: &UserId) -> Vec<ConnectionId> {
        self.connections
            .lock()
            .expect("connection registry lock poisoned")
            .iter()
            .filter(|(_, record)| record.user.as_ref() == Some(user))
            .map(|(id, _)| *id)
            .collect()
    }

    /// The outbound sender of one connection.
    pub fn sender_of(&self, connection: ConnectionId) -> Option<EventSender> {
        self.connections
            .lock()
            .expect("connection registry lock poisoned")
            .get(&connection)
            .map(|record| record.sender.clone())
    }

    /// Senders of the given connections, resolved in one lock acquisition.
    ///
    /// Connections that disappeared between enumeration and resolution are
    /// simply absent from the result; their delivery silently fails, as
    /// cancellation requires.
    pub fn senders_of(
        &self,
        connections: impl IntoIterator<Item = ConnectionId>,
    ) -> Vec<(ConnectionId, EventSender)> {
        let map = self
            .connections
            .lock()
            .expect("connection registry lock poisoned");
        connections
            .into_iter()
            .filter_map(|id| map.get(&id).map(|record| (id, record.sender.clone())))
            .collect()
    }

    /// Senders of every registered connection, for system-wide fan-out.
    pub fn all_senders(&self) -> Vec<(ConnectionId, EventSender)> {
        self.connections
            .lock()
            .expect("connection registry lock poisoned")
            .iter()
            .map(|(id, record)| (*id, record.sender.clone()))
            .collect()
    }

    /// Refresh a connection's last-activity timestamp.
    pub fn touch(&self, connection: ConnectionId) {
        if let Some(record) = self
            .connections
            .lock()
            .expect("connection registry lock poisoned")
            .get_mut(&connection)
        {
            record.last_activity = Utc::now();
        }
    }

    /// Number of live connections.
    pub fn connection_count(&self) -> usize {
        self.connections
            .lock()
            .expect("connection registry lock poisoned")
            .len()
    }
}
