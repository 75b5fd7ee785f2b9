/**
 * Connection Lifecycle Coordinator
 *
 * This module is the top-level orchestrator for the realtime subsystem.
 * Each connection walks the state machine
 *
 * ```text
 * Connecting -> Anonymous -> Identified -> Closed
 * ```
 *
 * driven by the signals a client sends: `connect` registers the connection
 * anonymously, `identify` binds it to a user (flipping presence online if
 * it is the user's first connection), join/leave/typing are handled in the
 * Identified state, and `disconnect` - graceful or abnormal, the
 * coordinator cannot tell - tears everything down in a fixed order.
 *
 * # State Ownership
 *
 * The coordinator owns nothing itself; it drives the three state stores
 * (registry, room table, presence tracker) through their narrow contracts
 * and the broadcaster for fan-out. Every signal is one method call:
 * (current state, signal) -> (new state, side effects), testable without a
 * live transport.
 *
 * # Rejections
 *
 * An Anonymous connection sending room or typing signals is rejected with
 * `IdentifyRequired` - the caller forwards the error back to that client
 * so a misbehaving client is observable, never a silent no-op. Signals for
 * a connection id that is already closed are dropped: Closed is terminal.
 */

use crate::broadcast::EventBroadcaster;
use crate::error::CoordinatorError;
use crate::presence::{PresenceTracker, PresenceTransition};
use crate::registry::{BindOutcome, ConnectionRegistry, EventSender};
use crate::rooms::RoomMembershipTable;
use crate::shared::event::{ClientSignal, ServerEvent};
use crate::shared::ids::{ConnectionId, RoomId, UserId};
use std::sync::Arc;

/// Orchestrates connection lifecycle over the state stores and broadcaster.
pub struct Coordinator {
    registry: Arc<ConnectionRegistry>,
    rooms: Arc<RoomMembershipTable>,
    presence: Arc<PresenceTracker>,
    broadcaster: EventBroadcaster,
}

impl Coordinator {
    pub fn new() -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let rooms = Arc::new(RoomMembershipTable::new());
        let presence = Arc::new(PresenceTracker::new());
        let broadcaster = EventBroadcaster::new(registry.clone(), rooms.clone());
        Self {
            registry,
            rooms,
            presence,
            broadcaster,
        }
    }

    /// Transport handshake completed: register the connection anonymously.
    ///
    /// `sender` is the channel into the connection's writer task; every
    /// event addressed to this connection goes through it.
    pub fn connect(&self, sender: EventSender) -> ConnectionId {
        let connection = self.registry.register(sender);
        tracing::info!("[Coordinator] Connection {} accepted (anonymous)", connection);
        connection
    }

    /// Dispatch one inbound signal for a connection.
    pub fn handle_signal(
        &self,
        connection: ConnectionId,
        signal: ClientSignal,
    ) -> Result<(), CoordinatorError> {
        match signal {
            ClientSignal::Identify { user_id } => self.identify(connection, user_id),
            ClientSignal::RoomJoin { room_id } => self.join_room(connection, room_id),
            ClientSignal::RoomLeave { room_id } => self.leave_room(connection, room_id),
            ClientSignal::TypingStart { room_id } => self.typing(connection, room_id, true),
            ClientSignal::TypingStop { room_id } => self.typing(connection, room_id, false),
        }
    }

    /// `Anonymous -> Identified`: bind the connection to a user.
    ///
    /// The user identifier is trusted as-is; authentication happened
    /// upstream. Re-identifying as the same user is idempotent. If this is
    /// the user's first live connection, the updated presence snapshot is
    /// broadcast to everyone.
    pub fn identify(
        &self,
        connection: ConnectionId,
        user: UserId,
    ) -> Result<(), CoordinatorError> {
        match self.registry.bind_user(connection, user.clone())? {
            BindOutcome::Bound => {
                tracing::info!(
                    "[Coordinator] Connection {} identified as {}",
                    connection,
                    user
                );
                if self.presence.on_user_connected(&user)
                    == Some(PresenceTransition::BecameOnline)
                {
                    self.broadcast_presence_snapshot();
                }
                Ok(())
            }
            BindOutcome::AlreadyBound => {
                tracing::debug!(
                    "[Coordinator] Connection {} re-identified as {} (no-op)",
                    connection,
                    user
                );
                Ok(())
            }
            BindOutcome::UnknownConnection => {
                // Closed is terminal; nothing to process
                tracing::debug!(
                    "[Coordinator] Dropping identify for closed connection {}",
                    connection
                );
                Ok(())
            }
        }
    }

    /// `Identified` self-loop: subscribe the connection to a room.
    ///
    /// Membership changes are not broadcast; only presence and typing are.
    pub fn join_room(
        &self,
        connection: ConnectionId,
        room: RoomId,
    ) -> Result<(), CoordinatorError> {
        self.require_identified(connection, "room:join")?;
        self.registry.touch(connection);
        self.rooms.join(room, connection);
        Ok(())
    }

    /// `Identified` self-loop: unsubscribe the connection from a room.
    pub fn leave_room(
        &self,
        connection: ConnectionId,
        room: RoomId,
    ) -> Result<(), CoordinatorError> {
        self.require_identified(connection, "room:leave")?;
        self.registry.touch(connection);
        self.rooms.leave(&room, connection);
        Ok(())
    }

    /// Relay a typing indicator to a room, excluding the sender.
    ///
    /// The indicator is transient: nothing records who is typing, the
    /// signal is fanned out and forgotten. Typing in a room the connection
    /// has not joined is dropped - a racing `room:leave` makes that
    /// reachable for well-behaved clients, so it is not a protocol error.
    pub fn typing(
        &self,
        connection: ConnectionId,
        room: RoomId,
        started: bool,
    ) -> Result<(), CoordinatorError> {
        let signal = if started { "typing:start" } else { "typing:stop" };
        let user = self.require_identified(connection, signal)?;
        self.registry.touch(connection);
        if !self.rooms.is_member(&room, connection) {
            tracing::debug!(
                "[Coordinator] Dropping {} from {} for non-member room {}",
                signal,
                user,
                room
            );
            return Ok(());
        }
        let event = ServerEvent::typing(user, room.clone(), started);
        self.broadcaster.to_room(&room, event, Some(connection));
        Ok(())
    }

    /// `any -> Closed`: the transport closed, client-initiated or not.
    ///
    /// Runs the teardown in a fixed order: leave every room, unregister
    /// the connection, then decrement presence; if that flipped the user
    /// offline, broadcast the updated snapshot. Idempotent - a duplicate
    /// disconnect finds nothing to do.
    pub fn disconnect(&self, connection: ConnectionId) {
        let rooms_left = self.rooms.leave_all(connection);
        let user = self.registry.unregister(connection);
        match user {
            Some(user) => {
                tracing::info!(
                    "[Coordinator] Connection {} of {} closed ({} room(s) left)",
                    connection,
                    user,
                    rooms_left.len()
                );
                if self.presence.on_user_disconnected(&user)
                    == Some(PresenceTransition::BecameOffline)
                {
                    self.broadcast_presence_snapshot();
                }
            }
            None => {
                tracing::debug!(
                    "[Coordinator] Connection {} closed while anonymous",
                    connection
                );
            }
        }
    }

    /// Broadcast the full online-user snapshot to every connection.
    ///
    /// O(online-users) work and bytes per transition - the accepted v1
    /// design; a delta protocol would change the wire contract.
    fn broadcast_presence_snapshot(&self) -> usize {
        let event = ServerEvent::presence_sync(self.presence.online_user_ids());
        self.broadcaster.to_everyone(event)
    }

    fn require_identified(
        &self,
        connection: ConnectionId,
        signal: &'static str,
    ) -> Result<UserId, CoordinatorError> {
        self.registry
            .user_of(connection)
            .ok_or(CoordinatorError::identify_required(signal))
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    pub fn rooms(&self) -> &RoomMembershipTable {
        &self.rooms
    }

    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    pub fn broadcaster(&self) -> &EventBroadcaster {
        &self.broadcaster
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}
