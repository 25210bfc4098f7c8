use super::config::SessionConfig;
use super::stats::{DetectionRecord, SessionStats};
use crate::audio::{
    CaptureBackendFactory, CaptureConfig, CapturePipeline, ChunkerConfig, PipelineEvent,
};
use crate::classify::classify_label;
use crate::socket::{StreamClient, StreamEvent};
use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// A monitoring session that wires microphone capture to the streaming
/// client and collects detections
///
/// The capture pipeline produces fixed-size PCM chunks; a forwarding task
/// hands each one to the socket actor in completion order. Classification
/// events are appended to an in-memory history for the life of the session.
pub struct MonitorSession {
    /// Session configuration
    config: SessionConfig,

    /// Handle to the streaming connection actor
    client: StreamClient,

    /// Capture pipeline (exclusive; locked for start/stop)
    pipeline: Mutex<CapturePipeline>,

    /// When the session was created
    started_at: chrono::DateTime<chrono::Utc>,

    /// Whether monitoring is currently active
    is_monitoring: Arc<AtomicBool>,

    /// Number of chunks handed to the transport
    chunks_sent: Arc<AtomicUsize>,

    /// Accumulated detection history
    history: Arc<Mutex<Vec<DetectionRecord>>>,

    /// Handle for the chunk forwarding task
    forward_task: Mutex<Option<JoinHandle<()>>>,

    /// Handle for the event listening task (runs for the session lifetime)
    event_task: Mutex<Option<JoinHandle<()>>>,
}

impl MonitorSession {
    /// Create a new monitoring session
    ///
    /// Spawns the socket actor and its event listener; nothing connects or
    /// captures until [`start`](Self::start).
    pub fn new(config: SessionConfig) -> Self {
        info!("Creating monitoring session: {}", config.session_id);

        let (client, event_rx) = StreamClient::spawn(config.stream.clone());

        let backend = CaptureBackendFactory::create(CaptureConfig {
            sample_rate: config.audio.sample_rate,
            channels: config.audio.channels,
        });
        let chunker_config = ChunkerConfig::new(
            config.audio.sample_rate,
            config.audio.chunk_duration_secs,
        );
        let pipeline = CapturePipeline::new(backend, chunker_config);

        let history = Arc::new(Mutex::new(Vec::new()));
        let event_task = tokio::spawn(Self::listen_events(event_rx, Arc::clone(&history)));

        Self {
            config,
            client,
            pipeline: Mutex::new(pipeline),
            started_at: Utc::now(),
            is_monitoring: Arc::new(AtomicBool::new(false)),
            chunks_sent: Arc::new(AtomicUsize::new(0)),
            history,
            forward_task: Mutex::new(None),
            event_task: Mutex::new(Some(event_task)),
        }
    }

    /// Start monitoring: connect to the backend and begin streaming chunks
    pub async fn start(&self) -> Result<()> {
        if self.is_monitoring.swap(true, Ordering::SeqCst) {
            warn!("Monitoring already started");
            return Ok(());
        }

        info!("Starting monitoring session: {}", self.config.session_id);

        self.client.connect().await;

        let (chunk_tx, mut chunk_rx) = mpsc::channel(16);
        {
            let mut pipeline = self.pipeline.lock().await;
            if let Err(e) = pipeline.start(chunk_tx).await {
                self.is_monitoring.store(false, Ordering::SeqCst);
                self.client.disconnect().await;
                return Err(e).context("Failed to start audio capture");
            }
        }

        let client = self.client.clone();
        let chunks_sent = Arc::clone(&self.chunks_sent);
        let is_monitoring = Arc::clone(&self.is_monitoring);

        let forward_task = tokio::spawn(async move {
            info!("Chunk forwarding task started");

            while let Some(event) = chunk_rx.recv().await {
                match event {
                    PipelineEvent::Chunk(chunk) => {
                        chunks_sent.fetch_add(1, Ordering::SeqCst);
                        client.send_audio(chunk).await;
                    }
                    PipelineEvent::Failed(e) => {
                        error!("Capture failed mid-session: {}", e);
                        is_monitoring.store(false, Ordering::SeqCst);
                        break;
                    }
                }
            }

            info!("Chunk forwarding task stopped");
        });

        {
            let mut handle = self.forward_task.lock().await;
            *handle = Some(forward_task);
        }

        info!("Monitoring session started");
        Ok(())
    }

    /// Stop monitoring and return final statistics
    pub async fn stop(&self) -> Result<SessionStats> {
        if !self.is_monitoring.swap(false, Ordering::SeqCst) {
            warn!("Monitoring not active");
            return self.stats().await;
        }

        info!("Stopping monitoring session: {}", self.config.session_id);

        // Stopping the pipeline closes the chunk channel, which ends the
        // forwarding task after it drains. Teardown runs to completion
        // even when the capture backend fails to stop cleanly.
        let stop_result = {
            let mut pipeline = self.pipeline.lock().await;
            pipeline.stop().await
        };

        {
            let mut handle = self.forward_task.lock().await;
            if let Some(task) = handle.take() {
                if task.await.is_err() {
                    error!("Chunk forwarding task panicked");
                }
            }
        }

        self.client.disconnect().await;

        stop_result.context("Failed to stop capture")?;

        info!("Monitoring session stopped");
        self.stats().await
    }

    /// Current session statistics
    pub async fn stats(&self) -> Result<SessionStats> {
        let duration = Utc::now().signed_duration_since(self.started_at);
        let detections = self.history.lock().await.len();

        Ok(SessionStats {
            is_monitoring: self.is_monitoring.load(Ordering::SeqCst),
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            chunks_sent: self.chunks_sent.load(Ordering::SeqCst),
            detections,
        })
    }

    /// Accumulated detection history (most recent last)
    pub async fn history(&self) -> Vec<DetectionRecord> {
        self.history.lock().await.clone()
    }

    /// Handle to the streaming client (connection state, last detection)
    pub fn client(&self) -> &StreamClient {
        &self.client
    }

    pub fn session_id(&self) -> &str {
        &self.config.session_id
    }

    async fn listen_events(
        mut event_rx: mpsc::Receiver<StreamEvent>,
        history: Arc<Mutex<Vec<DetectionRecord>>>,
    ) {
        while let Some(event) = event_rx.recv().await {
            match event {
                StreamEvent::Classification(classification) => {
                    let info = classify_label(&classification.label);
                    if info.category.is_emergency() {
                        warn!(
                            "EMERGENCY sound detected: {} ({})",
                            info.display_name, classification.label
                        );
                    } else {
                        info!(
                            "Sound detected: {} ({})",
                            info.display_name, classification.label
                        );
                    }

                    let record = DetectionRecord {
                        label: classification.label,
                        display_name: info.display_name,
                        category: info.category,
                        confidence: classification.confidence,
                        timestamp: Utc::now(),
                    };
                    history.lock().await.push(record);
                }
                StreamEvent::StateChanged(state) => {
                    info!("Connection state: {:?}", state);
                }
                StreamEvent::TransportError(message) => {
                    warn!("Transport error: {}", message);
                }
                StreamEvent::ReconnectionExhausted => {
                    error!("Connection lost and retries exhausted; reconnect manually");
                }
            }
        }
    }
}

impl Drop for MonitorSession {
    fn drop(&mut self) {
        // The event task outlives start/stop; abort it with the session.
        if let Ok(mut handle) = self.event_task.try_lock() {
            if let Some(task) = handle.take() {
                task.abort();
            }
        }
    }
}
