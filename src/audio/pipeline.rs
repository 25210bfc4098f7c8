use super::backend::{CaptureBackend, CaptureError, CaptureEvent};
use super::chunk::{ChunkerConfig, PcmChunker};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Output of a running capture pipeline
#[derive(Debug)]
pub enum PipelineEvent {
    /// One complete PCM chunk ready for transmission
    Chunk(Vec<u8>),
    /// Capture failed mid-stream; the pipeline has shut down
    Failed(CaptureError),
}

/// Converts a continuous microphone stream into fixed-size PCM chunks.
///
/// Owns a capture backend and a [`PcmChunker`]. While running, a forwarding
/// task drains sample blocks from the backend, feeds them through the
/// chunker, and emits each completed chunk on the channel given to `start`.
/// The accumulator lives inside the task, so stopping the pipeline discards
/// any partial chunk.
pub struct CapturePipeline {
    backend: Box<dyn CaptureBackend>,
    chunker_config: ChunkerConfig,
    task: Option<JoinHandle<()>>,
}

impl CapturePipeline {
    pub fn new(backend: Box<dyn CaptureBackend>, chunker_config: ChunkerConfig) -> Self {
        Self {
            backend,
            chunker_config,
            task: None,
        }
    }

    /// Start capturing and emitting chunks on `tx`.
    ///
    /// Permission and platform failures from the backend are returned
    /// synchronously; later device failures arrive as
    /// [`PipelineEvent::Failed`].
    pub async fn start(&mut self, tx: mpsc::Sender<PipelineEvent>) -> Result<(), CaptureError> {
        if self.task.is_some() {
            warn!("Capture pipeline already started");
            return Ok(());
        }

        let mut block_rx = self.backend.start().await?;
        info!(
            "Capture pipeline started ({} backend, {} samples/chunk)",
            self.backend.name(),
            self.chunker_config.chunk_samples()
        );

        let chunker_config = self.chunker_config.clone();
        let task = tokio::spawn(async move {
            let mut chunker = PcmChunker::new(chunker_config);

            while let Some(event) = block_rx.recv().await {
                match event {
                    CaptureEvent::Block(samples) => {
                        for chunk in chunker.push(&samples) {
                            if tx.send(PipelineEvent::Chunk(chunk)).await.is_err() {
                                // Consumer gone; nothing left to do
                                return;
                            }
                        }
                    }
                    CaptureEvent::Failed(e) => {
                        error!("Capture device failed: {}", e);
                        let _ = tx.send(PipelineEvent::Failed(e)).await;
                        return;
                    }
                }
            }
        });

        self.task = Some(task);
        Ok(())
    }

    /// Stop capturing and release the device.
    ///
    /// Waits for the forwarding task to drain, so no chunk callback is in
    /// flight once this returns. No-op when not started.
    pub async fn stop(&mut self) -> Result<(), CaptureError> {
        let Some(task) = self.task.take() else {
            return Ok(());
        };

        let result = self.backend.stop().await;
        if result.is_err() {
            // The backend may still be producing blocks; cut the forwarding
            // task so downstream consumers see their channel close.
            task.abort();
        } else if task.await.is_err() {
            warn!("Pipeline forwarding task panicked");
        }

        info!("Capture pipeline stopped");
        result
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }
}
