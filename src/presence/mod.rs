/**
 * Presence Tracker
 *
 * This module derives each user's online/offline state from their live
 * connection count. A user is online while they have at least one bound
 * connection; the count is the only authority, so multi-device users stay
 * online until their last connection drops.
 *
 * # Transitions
 *
 * Only the edges matter to callers: `on_user_connected` reports
 * `BecameOnline` on the 0 -> 1 transition and `on_user_disconnected`
 * reports `BecameOffline` on 1 -> 0 (recording last-seen). The lifecycle
 * coordinator broadcasts the presence snapshot exactly on those edges,
 * which is what makes the multi-device scenario emit exactly two
 * broadcasts.
 */

use crate::shared::ids::UserId;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

/// An online/offline edge reported to the caller for broadcasting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceTransition {
    /// The user's first connection was bound (count 0 -> 1).
    BecameOnline,
    /// The user's last connection dropped (count 1 -> 0).
    BecameOffline,
}

/// Aggregate state of one user identifier.
#[derive(Debug, Clone, Default)]
struct PresenceEntry {
    /// Live bound connections for this user
    connections: usize,
    /// Set when the count last returned to zero
    last_seen: Option<DateTime<Utc>>,
}

/// Tracks user online state as a refcount over bound connections.
#[derive(Debug, Default)]
pub struct PresenceTracker {
    users: Mutex<HashMap<UserId, PresenceEntry>>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly bound connection for a user.
    ///
    /// Returns `BecameOnline` when this was the user's first connection.
    pub fn on_user_connected(&self, user: &UserId) -> Option<PresenceTransition> {
        let mut users = self.users.lock().expect("presence lock poisoned");
        let entry = users.entry(user.clone()).or_default();
        entry.connections += 1;
        if entry.connections == 1 {
            tracing::info!("[Presence] User {} came online", user);
            Some(PresenceTransition::BecameOnline)
        } else {
            tracing::debug!(
                "[Presence] User {} added a connection ({} total)",
                user,
                entry.connections
            );
            None
        }
    }

    /// Record a dropped connection for a user.
    ///
    /// Returns `BecameOffline` and records last-seen when this was the
    /// user's final connection. Decrementing a user that is not tracked is
    /// tolerated as a no-op so duplicate disconnect signals stay harmless.
    pub fn on_user_disconnected(&self, user: &UserId) -> Option<PresenceTransition> {
        let mut users = self.users.lock().expect("presence lock poisoned");
        let Some(entry) = users.get_mut(user) else {
            tracing::debug!("[Presence] Disconnect for untracked user {}", user);
            return None;
        };
        if entry.connections == 0 {
            return None;
        }
        entry.connections -= 1;
        if entry.connections == 0 {
            entry.last_seen = Some(Utc::now());
            tracing::info!("[Presence] User {} went offline", user);
            Some(PresenceTransition::BecameOffline)
        } else {
            tracing::debug!(
                "[Presence] User {} dropped a connection ({} remain)",
                user,
                entry.connections
            );
            None
        }
    }

    /// Whether the user currently has at least one bound connection.
    pub fn is_online(&self, user: &UserId) -> bool {
        self.users
            .lock()
            .expect("presence lock poisoned")
            .get(user)
            .is_some_and(|entry| entry.connections > 0)
    }

    /// Every online user id, for the full snapshot broadcast.
    ///
    /// O(online-users) per call, which is the accepted v1 tradeoff of the
    /// snapshot protocol.
    pub fn online_user_ids(&self) -> Vec<UserId> {
        self.users
            .lock()
            .expect("presence lock poisoned")
            .iter()
            .filter(|(_, entry)| entry.connections > 0)
            .map(|(user, _)| user.clone())
            .collect()
    }

    /// When the user last went offline, if they ever have.
    pub fn last_seen(&self, user: &UserId) -> Option<DateTime<Utc>> {
        self.users
            .lock()
            .expect("presence lock poisoned")
            .get(user)
            .and_then(|entry| entry.last_seen)
    }

    /// Number of users currently online.
    pub fn online_count(&self) -> usize {
        self.users
            .lock()
            .expect("presence lock poisoned")
            .values()
            .filter(|entry| entry.connections > 0)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_connection_reports_online() {
        let tracker = PresenceTracker::new();
        let user = UserId::from("u1");
        assert_eq!(
            tracker.on_user_connected(&user),
            Some(PresenceTransition::BecameOnline)
        );
        assert!(tracker.is_online(&user));
    }

    #[test]
    fn test_second_connection_is_silent() {
        let tracker = PresenceTracker::new();
        let user = UserId::from("u1");
        tracker.on_user_connected(&user);
        assert_eq!(tracker.on_user_connected(&user), None);
        assert!(tracker.is_online(&user));
    }

    #[test]
    fn test_only_last_disconnect_reports_offline() {
        let tracker = PresenceTracker::new();
        let user = UserId::from("u1");
        tracker.on_user_connected(&user);
        tracker.on_user_connected(&user);

        assert_eq!(tracker.on_user_disconnected(&user), None);
        assert!(tracker.is_online(&user));
        assert_eq!(
            tracker.on_user_disconnected(&user),
            Some(PresenceTransition::BecameOffline)
        );
        assert!(!tracker.is_online(&user));
    }

    #[test]
    fn test_last_seen_recorded_on_offline() {
        let tracker = PresenceTracker::new();
        let user = UserId::from("u1");
        assert_eq!(tracker.last_seen(&user), None);
        tracker.on_user_connected(&user);
        assert_eq!(tracker.last_seen(&user), None);
        tracker.on_user_disconnected(&user);
        assert!(tracker.last_seen(&user).is_some());
    }

    #[test]
    fn test_untracked_disconnect_is_noop() {
        let tracker = PresenceTracker::new();
        assert_eq!(tracker.on_user_disconnected(&UserId::from("ghost")), None);
        assert_eq!(tracker.online_count(), 0);
    }

    #[test]
    fn test_online_user_ids_excludes_offline() {
        let tracker = PresenceTracker::new();
        tracker.on_user_connected(&UserId::from("a"));
        tracker.on_user_connected(&UserId::from("b"));
        tracker.on_user_disconnected(&UserId::from("a"));

        let online = tracker.online_user_ids();
        assert_eq!(online, vec![UserId::from("b")]);
        assert_eq!(tracker.online_count(), 1);
    }
}
