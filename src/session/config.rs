use crate::config::{AudioSettings, Config, StreamSettings};
use serde::{Deserialize, Serialize};

/// Configuration for a monitoring session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier
    pub session_id: String,

    /// Connection settings for the classification backend
    pub stream: StreamSettings,

    /// Capture and chunking settings
    pub audio: AudioSettings,
}

impl SessionConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            session_id: format!("monitor-{}", uuid::Uuid::new_v4()),
            stream: config.stream.clone(),
            audio: config.audio.clone(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
