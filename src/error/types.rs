/**
 * Coordinator Error Types
 *
 * This module defines the error taxonomy of the coordinator. Every error
 * here is local to a single connection: a malformed or out-of-order signal
 * from one client never tears down the coordinator or affects any other
 * connection. There is no fatal error class in this subsystem.
 *
 * # Error Types
 *
 * - `AlreadyBoundToDifferentUser` - a connection tried to identify as a
 *   second user; the signal is rejected and no state is altered
 * - `IdentifyRequired` - a room or typing signal arrived before identify;
 *   rejected, no state altered
 * - `DeliveryFailure` - a single connection's transport write failed during
 *   a broadcast; logged, never propagated, never retried
 * - `MalformedSignal` - an inbound frame could not be decoded
 */

use crate::shared::ids::ConnectionId;
use thiserror::Error;

/// Errors raised while processing a client signal.
///
/// All variants are local to one connection. `DeliveryFailure` never leaves
/// the broadcaster except as a log line; the remaining variants are sent
/// back to the offending client as an `error` wire event.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// A connection tried to identify as a second user.
    ///
    /// A connection's bound user identifier, once set, never changes; a
    /// user switch requires a new connection.
    #[error("connection {connection} is already bound to a different user")]
    AlreadyBoundToDifferentUser {
        /// The offending connection
        connection: ConnectionId,
    },

    /// A signal arrived while the connection was still anonymous.
    #[error("signal '{signal}' requires an identified connection")]
    IdentifyRequired {
        /// Wire name of the rejected signal
        signal: &'static str,
    },

    /// A transport write failed during a broadcast.
    ///
    /// Best-effort delivery: the next event for that room will simply also
    /// miss this connection until it recovers or disconnects.
    #[error("delivery to connection {connection} failed")]
    DeliveryFailure {
        /// The unreachable connection
        connection: ConnectionId,
    },

    /// An inbound frame could not be decoded as a client signal.
    #[error("malformed signal: {message}")]
    MalformedSignal {
        /// Decode failure detail
        message: String,
    },
}

impl CoordinatorError {
    /// Create an `AlreadyBoundToDifferentUser` error
    pub fn already_bound(connection: ConnectionId) -> Self {
        Self::AlreadyBoundToDifferentUser { connection }
    }

    /// Create an `IdentifyRequired` error for the named signal
    pub fn identify_required(signal: &'static str) -> Self {
        Self::IdentifyRequired { signal }
    }

    /// Create a `DeliveryFailure` error
    pub fn delivery(connection: ConnectionId) -> Self {
        Self::DeliveryFailure { connection }
    }

    /// Create a `MalformedSignal` error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedSignal {
            message: message.into(),
        }
    }

    /// Stable wire code for this error, carried in the `error` event.
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyBoundToDifferentUser { .. } => "already_bound",
            Self::IdentifyRequired { .. } => "identify_required",
            Self::DeliveryFailure { .. } => "delivery_failure",
            Self::MalformedSignal { .. } => "malformed_signal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_bound_error() {
        let conn = ConnectionId::new();
        let error = CoordinatorError::already_bound(conn);
        match error {
            CoordinatorError::AlreadyBoundToDifferentUser { connection } => {
                assert_eq!(connection, conn);
            }
            _ => panic!("Expected AlreadyBoundToDifferentUser"),
        }
    }

    #[test]
    fn test_identify_required_names_the_signal() {
        let error = CoordinatorError::identify_required("room:join");
        assert!(error.to_string().contains("room:join"));
    }

    #[test]
    fn test_code_mapping() {
        assert_eq!(
            CoordinatorError::identify_required("typing:start").code(),
            "identify_required"
        );
        assert_eq!(
            CoordinatorError::already_bound(ConnectionId::new()).code(),
            "already_bound"
        );
        assert_eq!(
            CoordinatorError::malformed("bad json").code(),
            "malformed_signal"
        );
    }
}
