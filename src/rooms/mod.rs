/**
 * Room Membership Table
 *
 * This module owns the many-to-many relationship between rooms and
 * connections. Rooms are opaque broadcast scopes (conversations,
 * tournaments); the table does not validate that a room exists or that the
 * joining user is authorized - that is enforced upstream before a join
 * reaches this subsystem.
 *
 * # Growth Bounds
 *
 * A room with zero members is not retained: the last `leave` (or the
 * owning connection's `leave_all`) deletes the room entry, so reconnect
 * churn cannot grow the table without bound.
 *
 * # Concurrency
 *
 * Mutation and read go through one `std::sync::Mutex` covering both the
 * forward (room -> connections) and reverse (connection -> rooms) indexes,
 * which keeps them consistent and makes every join/leave linearizable with
 * respect to every room. No I/O happens while the lock is held.
 */

use crate::shared::ids::{ConnectionId, RoomId};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct TableInner {
    /// room -> members, with each member's join timestamp
    rooms: HashMap<RoomId, HashMap<ConnectionId, DateTime<Utc>>>,
    /// connection -> rooms it has joined, for exhaustive leave on disconnect
    memberships: HashMap<ConnectionId, HashSet<RoomId>>,
}

/// Bidirectional mapping between rooms and the connections subscribed to
/// them.
#[derive(Debug, Default)]
pub struct RoomMembershipTable {
    inner: Mutex<TableInner>,
}

impl RoomMembershipTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to a room. Idempotent: joining twice has no
    /// additional effect. Returns whether the membership is new.
    pub fn join(&self, room: RoomId, connection: ConnectionId) -> bool {
        let mut inner = self.inner.lock().expect("room table lock poisoned");
        let members = inner.rooms.entry(room.clone()).or_default();
        if members.contains_key(&connection) {
            return false;
        }
        members.insert(connection, Utc::now());
        inner
            .memberships
            .entry(connection)
            .or_default()
            .insert(room.clone());
        tracing::debug!("[Rooms] Connection {} joined {}", connection, room);
        true
    }

    /// Remove a connection from a room. Leaving a room you are not in is a
    /// no-op, not an error. The room entry is deleted when this empties it.
    pub fn leave(&self, room: &RoomId, connection: ConnectionId) -> bool {
        let mut inner = self.inner.lock().expect("room table lock poisoned");
        let Some(members) = inner.rooms.get_mut(room) else {
            return false;
        };
        if members.remove(&connection).is_none() {
            return false;
        }
        if members.is_empty() {
            inner.rooms.remove(room);
        }
        if let Some(rooms) = inner.memberships.get_mut(&connection) {
            rooms.remove(room);
            if rooms.is_empty() {
                inner.memberships.remove(&connection);
            }
        }
        tracing::debug!("[Rooms] Connection {} left {}", connection, room);
        true
    }

    /// Remove a connection from every room it was in, returning the
    /// affected room identifiers. Used on disconnect; membership changes
    /// are not announced by this subsystem, so the caller decides whether
    /// any room-level follow-up is warranted.
    pub fn leave_all(&self, connection: ConnectionId) -> Vec<RoomId> {
        let mut inner = self.inner.lock().expect("room table lock poisoned");
        let Some(rooms) = inner.memberships.remove(&connection) else {
            return Vec::new();
        };
        let mut affected = Vec::with_capacity(rooms.len());
        for room in rooms {
            if let Some(members) = inner.rooms.get_mut(&room) {
                members.remove(&connection);
                if members.is_empty() {
                    inner.rooms.remove(&room);
                }
            }
            affected.push(room);
        }
        if !affected.is_empty() {
            tracing::debug!(
                "[Rooms] Connection {} left {} room(s) on disconnect",
                connection,
                affected.len()
            );
        }
        affected
    }

    /// Current members of a room; empty if the room has no members.
    pub fn members_of(&self, room: &RoomId) -> HashSet<ConnectionId> {
        self.inner
            .lock()
            .expect("room table lock poisoned")
            .rooms
            .get(room)
            .map(|members| members.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Whether a connection is currently a member of a room.
    pub fn is_member(&self, room: &RoomId, connection: ConnectionId) -> bool {
        self.inner
            .lock()
            .expect("room table lock poisoned")
            .rooms
            .get(room)
            .is_some_and(|members| members.contains_key(&connection))
    }

    /// Rooms a connection has joined.
    pub fn rooms_of(&self, connection: ConnectionId) -> Vec<RoomId> {
        self.inner
            .lock()
            .expect("room table lock poisoned")
            .memberships
            .get(&connection)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of rooms with at least one member.
    pub fn room_count(&self) -> usize {
        self.inner.lock().expect("room table lock poisoned").rooms.len()
    }
}
