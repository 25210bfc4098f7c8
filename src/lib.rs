pub mod audio;
pub mod classify;
pub mod config;
pub mod session;
pub mod socket;

pub use audio::{
    CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureError, CaptureEvent,
    CapturePipeline, ChunkerConfig, PcmChunker, PipelineEvent,
};
pub use classify::{classify_label, SoundCategory, SoundInfo};
pub use config::{AudioSettings, Config, StreamSettings};
pub use session::{DetectionRecord, MonitorSession, SessionConfig, SessionStats};
pub use socket::{ClassificationEvent, ConnectionState, StreamClient, StreamEvent};
