use serde::{Deserialize, Serialize};

/// Lifecycle state of the streaming connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No transport open and none wanted
    Disconnected,
    /// A transport open is in flight
    Connecting,
    /// Transport open; audio may be sent
    Connected,
    /// Connection lost unexpectedly; a retry is scheduled
    Reconnecting,
    /// Retry ceiling reached; requires an explicit connect to leave
    Failed,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

/// One detection reported by the classification backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationEvent {
    pub label: String,
    /// Fixed at 1.0: the backend protocol carries no real confidence score
    pub confidence: f32,
}

/// Notification delivered to listeners of a [`super::StreamClient`]
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// The connection state changed
    StateChanged(ConnectionState),
    /// The backend reported a detection
    Classification(ClassificationEvent),
    /// A transient transport failure (open failure or mid-connection error)
    TransportError(String),
    /// The retry ceiling was reached; no further attempts will be made
    ReconnectionExhausted,
}

/// Prefix of detection frames sent by the backend
pub const DETECTION_PREFIX: &str = "Detected: ";

/// Parse an inbound text frame.
///
/// Only frames of the form `Detected: <label>` produce an event; anything
/// else is ignored by the streaming core.
pub fn parse_detection(text: &str) -> Option<ClassificationEvent> {
    text.strip_prefix(DETECTION_PREFIX)
        .map(|label| ClassificationEvent {
            label: label.to_string(),
            confidence: 1.0,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_detection_frames() {
        let event = parse_detection("Detected: Siren").unwrap();
        assert_eq!(event.label, "Siren");
        assert_eq!(event.confidence, 1.0);
    }

    #[test]
    fn ignores_other_payloads() {
        assert!(parse_detection("status: ok").is_none());
        assert!(parse_detection("detected: siren").is_none()); // case-sensitive prefix
        assert!(parse_detection("").is_none());
    }

    #[test]
    fn label_keeps_inner_whitespace() {
        let event = parse_detection("Detected: Smoke detector, smoke alarm").unwrap();
        assert_eq!(event.label, "Smoke detector, smoke alarm");
    }
}
