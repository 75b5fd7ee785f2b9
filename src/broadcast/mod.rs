/**
 * Event Broadcaster
 *
 * This module fans a single event out to many connections: every member of
 * a room (optionally excluding the sender), every connection bound to a
 * user, or every registered connection.
 *
 * # Best-Effort Delivery
 *
 * Delivery is a non-blocking channel send into each connection's writer
 * task. A failed send - the writer is gone or the transport died - is
 * counted and logged as a `DeliveryFailure`, never retried and never
 * surfaced to the event's originator, so one dead client cannot block a
 * broadcast to the rest of a room.
 *
 * # Ordering
 *
 * Each fan-out enumerates its targets and sends before returning, so two
 * events broadcast in sequence by the same task reach every shared
 * recipient in that order. No ordering is guaranteed across rooms or
 * across concurrent broadcasters.
 */

use crate::error::CoordinatorError;
use crate::registry::{ConnectionRegistry, EventSender};
use crate::rooms::RoomMembershipTable;
use crate::shared::event::ServerEvent;
use crate::shared::ids::{ConnectionId, RoomId, UserId};
use std::sync::Arc;

/// Fans events out through the registry's per-connection senders.
#[derive(Clone)]
pub struct EventBroadcaster {
    registry: Arc<ConnectionRegistry>,
    rooms: Arc<RoomMembershipTable>,
}

impl EventBroadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>, rooms: Arc<RoomMembershipTable>) -> Self {
        Self { registry, rooms }
    }

    /// Deliver an event to every connection currently in a room.
    ///
    /// `exclude` skips the sender so a user does not receive their own
    /// typing echo. Returns the number of connections reached.
    pub fn to_room(
        &self,
        room: &RoomId,
        event: ServerEvent,
        exclude: Option<ConnectionId>,
    ) -> usize {
        let members = self.rooms.members_of(room);
        let targets = members
            .into_iter()
            .filter(|id| Some(*id) != exclude);
        let delivered = self.deliver_to_all(self.registry.senders_of(targets), &event);
        tracing::debug!(
            "[Broadcast] Event delivered to {} member(s) of {}",
            delivered,
            room
        );
        delivered
    }

    /// Deliver an event to every connection bound to a user (multi-device
    /// fan-out). Returns the number of connections reached.
    pub fn to_user(&self, user: &UserId, event: ServerEvent) -> usize {
        let connections = self.registry.connections_for_user(user);
        let delivered = self.deliver_to_all(self.registry.senders_of(connections), &event);
        tracing::debug!(
            "[Broadcast] Event delivered to {} connection(s) of user {}",
            delivered,
            user
        );
        delivered
    }

    /// Deliver an event to every registered connection, identified or not.
    /// Used for the presence snapshot. Returns the number reached.
    pub fn to_everyone(&self, event: ServerEvent) -> usize {
        let delivered = self.deliver_to_all(self.registry.all_senders(), &event);
        tracing::debug!("[Broadcast] Event delivered to {} connection(s)", delivered);
        delivered
    }

    fn deliver_to_all(
        &self,
        targets: Vec<(ConnectionId, EventSender)>,
        event: &ServerEvent,
    ) -> usize {
        let mut delivered = 0;
        for (connection, sender) in targets {
            if sender.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                // Writer task is gone; the disconnect path will clean up
                let failure = CoordinatorError::delivery(connection);
                tracing::debug!("[Broadcast] {}", failure);
            }
        }
        delivered
    }
}
