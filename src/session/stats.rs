use crate::classify::SoundCategory;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Statistics about a monitoring session
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    /// Whether monitoring is currently active
    pub is_monitoring: bool,

    /// When the session started
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Number of audio chunks transmitted so far
    pub chunks_sent: usize,

    /// Number of detections received
    pub detections: usize,
}

/// One detection kept in the in-memory session history
#[derive(Debug, Clone, Serialize)]
pub struct DetectionRecord {
    /// Raw label as reported by the backend
    pub label: String,

    /// Mapped display name
    pub display_name: &'static str,

    /// Mapped alert category
    pub category: SoundCategory,

    /// Reported confidence (fixed sentinel, see protocol notes)
    pub confidence: f32,

    /// When the detection arrived
    pub timestamp: DateTime<Utc>,
}
