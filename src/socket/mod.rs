//! Streaming WebSocket client for the classification backend
//!
//! One actor task owns the socket and its reconnection timer; handles talk
//! to it over a command channel, which serializes state checks against
//! sends and disconnects. Inbound `Detected: <label>` frames become
//! [`ClassificationEvent`]s; connection loss is retried a bounded number of
//! times with a fixed delay.

pub mod client;
pub mod event;

pub use client::StreamClient;
pub use event::{
    parse_detection, ClassificationEvent, ConnectionState, StreamEvent, DETECTION_PREFIX,
};
