use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from setting up or running microphone capture
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("microphone access has not been granted")]
    PermissionDenied,

    #[error("no audio capture backend for this platform")]
    UnsupportedPlatform,

    #[error("no input device found on the default audio host")]
    NoDevice,

    #[error("failed to open input stream: {0}")]
    StreamOpen(String),

    #[error("capture device failed mid-stream: {0}")]
    Device(String),
}

/// Event delivered by a running capture backend
#[derive(Debug)]
pub enum CaptureEvent {
    /// One block of mono float samples in [-1.0, 1.0]
    Block(Vec<f32>),
    /// The device failed; the stream is closed and no more blocks follow
    Failed(CaptureError),
}

/// Configuration for a capture backend
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Target sample rate (device output is decimated if needed)
    pub sample_rate: u32,
    /// Target channel count (multi-channel input is downmixed)
    pub channels: u16,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
        }
    }
}

/// Microphone capture backend trait
///
/// Platform-specific implementations:
/// - desktop (Linux/macOS/Windows): cpal default input device
/// - everything else: `UnimplementedBackend`, which fails `start`
#[async_trait::async_trait]
pub trait CaptureBackend: Send {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive sample blocks. Setup
    /// failures (permission, missing device, unsupported platform) are
    /// returned synchronously; failures after the stream is running arrive
    /// as [`CaptureEvent::Failed`] followed by channel closure.
    async fn start(&mut self) -> Result<mpsc::Receiver<CaptureEvent>, CaptureError>;

    /// Stop capturing and release the device
    ///
    /// All platform resources are released before this returns; no sample
    /// callback remains in flight afterwards. No-op when not capturing.
    async fn stop(&mut self) -> Result<(), CaptureError>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Capture backend factory
pub struct CaptureBackendFactory;

impl CaptureBackendFactory {
    /// Create the capture backend for the current platform
    pub fn create(config: CaptureConfig) -> Box<dyn CaptureBackend> {
        #[cfg(any(target_os = "linux", target_os = "macos", target_os = "windows"))]
        {
            Box::new(super::cpal_backend::CpalBackend::new(config))
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
        {
            let _ = config;
            Box::new(UnimplementedBackend)
        }
    }
}

/// Placeholder backend for platforms without a capture implementation
pub struct UnimplementedBackend;

#[async_trait::async_trait]
impl CaptureBackend for UnimplementedBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<CaptureEvent>, CaptureError> {
        Err(CaptureError::UnsupportedPlatform)
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "unimplemented"
    }
}
