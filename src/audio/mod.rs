pub mod backend;
pub mod chunk;
pub mod pipeline;
pub mod resample;

#[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))]
pub mod cpal_backend;

pub use backend::{
    CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureError, CaptureEvent,
    UnimplementedBackend,
};
pub use chunk::{ChunkerConfig, PcmChunker};
pub use pipeline::{CapturePipeline, PipelineEvent};
