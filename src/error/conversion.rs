/**
 * Error Conversion
 *
 * This module converts coordinator errors into the wire `error` event
 * delivered back to the offending client.
 *
 * # Wire Format
 *
 * ```json
 * {
 *   "type": "error",
 *   "code": "identify_required",
 *   "message": "signal 'room:join' requires an identified connection"
 * }
 * ```
 */

use crate::error::types::CoordinatorError;
use crate::shared::event::ServerEvent;

impl From<&CoordinatorError> for ServerEvent {
    /// Convert a coordinator error into an `error` wire event.
    ///
    /// The event carries the stable error code plus the human-readable
    /// message. It is only ever delivered to the connection that caused
    /// the error, never broadcast.
    fn from(error: &CoordinatorError) -> Self {
        ServerEvent::error(error.code(), error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identify_required_to_event() {
        let error = CoordinatorError::identify_required("typing:start");
        let event = ServerEvent::from(&error);
        match event {
            ServerEvent::Error { code, message } => {
                assert_eq!(code, "identify_required");
                assert!(message.contains("typing:start"));
            }
            _ => panic!("Expected Error event"),
        }
    }

    #[test]
    fn test_error_event_serializes_with_code() {
        let error = CoordinatorError::malformed("unexpected token");
        let event = ServerEvent::from(&error);
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""code":"malformed_signal""#));
    }
}
