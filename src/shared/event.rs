/**
 * Wire Protocol Events
 *
 * This module defines the JSON wire protocol spoken over a connection:
 * the signals a client may send and the events the coordinator delivers.
 *
 * # Inbound Signals
 *
 * Signals are tagged by a `type` field (`identify`, `room:join`,
 * `room:leave`, `typing:start`, `typing:stop`) with camelCase payload
 * fields. Disconnect is implicit: the transport closing is the signal.
 *
 * # Outbound Events
 *
 * - `presence:sync` - full snapshot of online user ids, broadcast to
 *   everyone on any online/offline transition
 * - `typing:start` / `typing:stop` - relayed to a room, excluding the
 *   sender
 * - `error` - rejection of a bad signal, delivered only to the offending
 *   client so that a misbehaving client is observable
 */

use crate::shared::ids::{RoomId, UserId};
use serde::{Deserialize, Serialize};

/// A signal sent by a connected client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ClientSignal {
    /// Bind this connection to a user identifier.
    ///
    /// The identifier is trusted as-is; authentication happened upstream
    /// before the transport was handed to this subsystem.
    #[serde(rename = "identify")]
    Identify {
        #[serde(rename = "userId")]
        user_id: UserId,
    },

    /// Subscribe this connection to a room. No broadcast is emitted.
    #[serde(rename = "room:join")]
    RoomJoin {
        #[serde(rename = "roomId")]
        room_id: RoomId,
    },

    /// Unsubscribe this connection from a room. No broadcast is emitted.
    #[serde(rename = "room:leave")]
    RoomLeave {
        #[serde(rename = "roomId")]
        room_id: RoomId,
    },

    /// The user started typing in a room.
    #[serde(rename = "typing:start")]
    TypingStart {
        #[serde(rename = "roomId")]
        room_id: RoomId,
    },

    /// The user stopped typing in a room.
    #[serde(rename = "typing:stop")]
    TypingStop {
        #[serde(rename = "roomId")]
        room_id: RoomId,
    },
}

impl ClientSignal {
    /// Wire name of this signal, used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Identify { .. } => "identify",
            Self::RoomJoin { .. } => "room:join",
            Self::RoomLeave { .. } => "room:leave",
            Self::TypingStart { .. } => "typing:start",
            Self::TypingStop { .. } => "typing:stop",
        }
    }
}

/// An event delivered to connected clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Full snapshot of every online user id.
    ///
    /// Broadcast to everyone on any online/offline transition. This is the
    /// accepted v1 design; a delta protocol is the flagged upgrade path.
    #[serde(rename = "presence:sync")]
    PresenceSync {
        #[serde(rename = "onlineUserIds")]
        online_user_ids: Vec<UserId>,
        timestamp: String,
    },

    /// A user started typing in a room the recipient has joined.
    #[serde(rename = "typing:start")]
    TypingStart {
        #[serde(rename = "userId")]
        user_id: UserId,
        #[serde(rename = "roomId")]
        room_id: RoomId,
    },

    /// A user stopped typing in a room the recipient has joined.
    #[serde(rename = "typing:stop")]
    TypingStop {
        #[serde(rename = "userId")]
        user_id: UserId,
        #[serde(rename = "roomId")]
        room_id: RoomId,
    },

    /// A signal from this client was rejected.
    #[serde(rename = "error")]
    Error { code: String, message: String },
}

impl ServerEvent {
    /// Create a presence snapshot event with the current timestamp.
    pub fn presence_sync(mut online_user_ids: Vec<UserId>) -> Self {
        // Sorted so every recipient sees the same list for the same state
        online_user_ids.sort();
        Self::PresenceSync {
            online_user_ids,
            timestamp: get_timestamp(),
        }
    }

    /// Create a typing event for a room.
    pub fn typing(user_id: UserId, room_id: RoomId, started: bool) -> Self {
        if started {
            Self::TypingStart { user_id, room_id }
        } else {
            Self::TypingStop { user_id, room_id }
        }
    }

    /// Create an error event for the offending client.
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Get the current timestamp as an RFC3339 string
fn get_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}
