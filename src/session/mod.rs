//! Monitoring session management
//!
//! This module provides the `MonitorSession` abstraction that manages:
//! - Microphone capture and PCM chunking
//! - Streaming chunks to the classification backend
//! - Collecting detections into an in-memory history
//! - Session statistics

mod config;
mod session;
mod stats;

pub use config::SessionConfig;
pub use session::MonitorSession;
pub use stats::{DetectionRecord, SessionStats};
