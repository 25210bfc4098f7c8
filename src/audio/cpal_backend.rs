use super::backend::{CaptureBackend, CaptureConfig, CaptureError, CaptureEvent};
use super::resample::{downmix_to_mono, Decimator};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

/// Channel capacity for sample blocks in flight between the audio thread
/// and the pipeline task. At ~100ms per hardware block this is over a
/// minute of headroom.
const BLOCK_CHANNEL_CAPACITY: usize = 1024;

/// Microphone capture via the system default cpal input device.
///
/// `cpal::Stream` is not `Send`, so the stream lives on a dedicated worker
/// thread for its whole lifetime. `start` hands back a channel of mono
/// float blocks already adapted to the configured sample rate; `stop`
/// signals the worker and joins it, which drops the stream and releases
/// the device before returning.
pub struct CpalBackend {
    config: CaptureConfig,
    worker: Option<Worker>,
}

struct Worker {
    stop_tx: std::sync::mpsc::Sender<()>,
    join: std::thread::JoinHandle<()>,
}

impl CpalBackend {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            worker: None,
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for CpalBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<CaptureEvent>, CaptureError> {
        if self.worker.is_some() {
            warn!("Capture already started");
            return Err(CaptureError::StreamOpen("capture already started".into()));
        }

        let (event_tx, event_rx) = mpsc::channel(BLOCK_CHANNEL_CAPACITY);
        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std::sync::mpsc::channel();
        let target_rate = self.config.sample_rate;

        let join = std::thread::Builder::new()
            .name("hear2help-capture".into())
            .spawn(move || capture_thread(target_rate, event_tx, ready_tx, stop_rx))
            .map_err(|e| CaptureError::StreamOpen(e.to_string()))?;

        match ready_rx.await {
            Ok(Ok(())) => {
                self.worker = Some(Worker { stop_tx, join });
                Ok(event_rx)
            }
            Ok(Err(e)) => {
                let _ = join.join();
                Err(e)
            }
            Err(_) => {
                let _ = join.join();
                Err(CaptureError::StreamOpen(
                    "capture thread exited during setup".into(),
                ))
            }
        }
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };

        let _ = worker.stop_tx.send(());
        tokio::task::spawn_blocking(move || {
            if worker.join.join().is_err() {
                warn!("Capture thread panicked during shutdown");
            }
        })
        .await
        .map_err(|e| CaptureError::Device(e.to_string()))?;

        info!("Capture stopped, device released");
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.worker.is_some()
    }

    fn name(&self) -> &str {
        "cpal"
    }
}

/// Owns the cpal stream from build to drop.
fn capture_thread(
    target_rate: u32,
    event_tx: mpsc::Sender<CaptureEvent>,
    ready_tx: oneshot::Sender<Result<(), CaptureError>>,
    stop_rx: std::sync::mpsc::Receiver<()>,
) {
    let stream = match build_stream(target_rate, event_tx.clone()) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(classify_stream_error(e.to_string())));
        return;
    }

    let _ = ready_tx.send(Ok(()));

    // Block until stop is requested or the backend handle is dropped.
    let _ = stop_rx.recv();
    drop(stream);
}

fn build_stream(
    target_rate: u32,
    event_tx: mpsc::Sender<CaptureEvent>,
) -> Result<cpal::Stream, CaptureError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or(CaptureError::NoDevice)?;

    let supported = device
        .default_input_config()
        .map_err(|e| classify_stream_error(e.to_string()))?;

    let device_rate = supported.sample_rate().0;
    let device_channels = supported.channels();
    let sample_format = supported.sample_format();
    let stream_config: cpal::StreamConfig = supported.into();

    check_device_rate(device_rate, target_rate)?;

    info!(
        "Opening input device {:?}: {}Hz, {} channel(s), {:?}",
        device.name().unwrap_or_else(|_| "unknown".to_string()),
        device_rate,
        device_channels,
        sample_format
    );

    let mut decimator = Decimator::new(device_rate, target_rate);
    let err_tx = event_tx.clone();
    let err_fn = move |err: cpal::StreamError| {
        // Audio-thread context: try_send only, never block
        let _ = err_tx.try_send(CaptureEvent::Failed(CaptureError::Device(err.to_string())));
    };

    let stream = match sample_format {
        SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                deliver_block(data, device_channels, &mut decimator, &event_tx);
            },
            err_fn,
            None,
        ),
        SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let floats: Vec<f32> = data.iter().map(|&s| s as f32 / 32768.0).collect();
                deliver_block(&floats, device_channels, &mut decimator, &event_tx);
            },
            err_fn,
            None,
        ),
        SampleFormat::U16 => device.build_input_stream(
            &stream_config,
            move |data: &[u16], _: &cpal::InputCallbackInfo| {
                let floats: Vec<f32> = data
                    .iter()
                    .map(|&s| (s as f32 - 32768.0) / 32768.0)
                    .collect();
                deliver_block(&floats, device_channels, &mut decimator, &event_tx);
            },
            err_fn,
            None,
        ),
        other => {
            return Err(CaptureError::StreamOpen(format!(
                "unsupported sample format {:?}",
                other
            )))
        }
    };

    stream.map_err(|e| classify_stream_error(e.to_string()))
}

fn deliver_block(
    data: &[f32],
    channels: u16,
    decimator: &mut Decimator,
    event_tx: &mpsc::Sender<CaptureEvent>,
) {
    let mono = downmix_to_mono(data, channels);
    let block = decimator.process(&mono);
    if block.is_empty() {
        return;
    }
    // try_send keeps the audio callback non-blocking; the channel is large
    // enough that overflow only happens if the consumer is gone or wedged.
    if event_tx.try_send(CaptureEvent::Block(block)).is_err() {
        warn!("Dropping capture block: pipeline not keeping up");
    }
}

/// The decimator only reduces rates. A device below the target rate would
/// ship slowed-down audio labeled with the wrong rate, so refuse to open it.
fn check_device_rate(device_rate: u32, target_rate: u32) -> Result<(), CaptureError> {
    if device_rate < target_rate {
        return Err(CaptureError::StreamOpen(format!(
            "input device rate {}Hz is below the required {}Hz",
            device_rate, target_rate
        )));
    }
    Ok(())
}

/// The OS reports microphone-permission denials as opaque backend error
/// strings, so match on the message to keep the error taxonomy honest.
fn classify_stream_error(message: String) -> CaptureError {
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("access denied") {
        CaptureError::PermissionDenied
    } else {
        CaptureError::StreamOpen(message)
    }
}
