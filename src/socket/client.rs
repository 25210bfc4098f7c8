use super::event::{parse_detection, ClassificationEvent, ConnectionState, StreamEvent};
use crate::config::StreamSettings;
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Duration, Instant};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Capacity of the command channel feeding the actor task
const COMMAND_CHANNEL_CAPACITY: usize = 64;
/// Capacity of the event channel toward listeners
const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug)]
enum Command {
    Connect,
    Disconnect,
    SendAudio(Vec<u8>),
}

/// Snapshot state shared between the actor task and client handles
struct Shared {
    state: Mutex<ConnectionState>,
    connected: AtomicBool,
    last_classification: Mutex<Option<ClassificationEvent>>,
    last_error: Mutex<Option<String>>,
}

impl Shared {
    fn new() -> Self {
        Self {
            state: Mutex::new(ConnectionState::Disconnected),
            connected: AtomicBool::new(false),
            last_classification: Mutex::new(None),
            last_error: Mutex::new(None),
        }
    }
}

/// Handle to the streaming connection actor.
///
/// One actor task exclusively owns the WebSocket; every handle operation is
/// a message to that task, so state checks and sends are serialized and a
/// disconnect always beats a scheduled reconnection attempt. Dropping the
/// last handle shuts the actor down, closing any open connection.
#[derive(Clone)]
pub struct StreamClient {
    cmd_tx: mpsc::Sender<Command>,
    shared: Arc<Shared>,
}

impl StreamClient {
    /// Spawn the connection actor.
    ///
    /// Returns the client handle and the receiver for [`StreamEvent`]
    /// notifications. The actor starts in `Disconnected` and opens nothing
    /// until [`connect`](Self::connect) is called.
    pub fn spawn(settings: StreamSettings) -> (Self, mpsc::Receiver<StreamEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let shared = Arc::new(Shared::new());

        let actor = ClientActor {
            settings,
            cmd_rx,
            event_tx,
            shared: Arc::clone(&shared),
            attempts: 0,
        };
        tokio::spawn(actor.run());

        (Self { cmd_tx, shared }, event_rx)
    }

    /// Open a connection to the backend.
    ///
    /// Any existing transport is closed first and any pending scheduled
    /// reconnection is discarded.
    pub async fn connect(&self) {
        if self.cmd_tx.send(Command::Connect).await.is_err() {
            warn!("Stream actor is gone; connect ignored");
        }
    }

    /// Close the connection intentionally.
    ///
    /// Cancels any pending reconnection, resets the attempt counter, and
    /// sends a normal-closure frame so the peer sees a clean shutdown.
    pub async fn disconnect(&self) {
        if self.cmd_tx.send(Command::Disconnect).await.is_err() {
            warn!("Stream actor is gone; disconnect ignored");
        }
    }

    /// Transmit one audio chunk as a binary frame.
    ///
    /// A no-op (with a warning) when not connected; never fails.
    pub async fn send_audio(&self, chunk: Vec<u8>) {
        if self.cmd_tx.send(Command::SendAudio(chunk)).await.is_err() {
            warn!("Stream actor is gone; audio chunk dropped");
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.lock().unwrap()
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Most recent classification, if any
    pub fn last_classification(&self) -> Option<ClassificationEvent> {
        self.shared.last_classification.lock().unwrap().clone()
    }

    pub fn clear_last_classification(&self) {
        self.shared.last_classification.lock().unwrap().take();
    }

    /// Most recent connectivity error message, if any
    pub fn last_error(&self) -> Option<String> {
        self.shared.last_error.lock().unwrap().clone()
    }
}

/// Outcome of serving one established connection
enum Serve {
    /// Peer closed with the normal-closure code
    CleanClose,
    /// Caller requested disconnect
    Disconnected,
    /// Connection lost unexpectedly; take the retry path
    Lost,
    /// Caller requested a fresh connect; retry immediately
    Reconnect,
    /// All handles dropped
    Shutdown,
}

/// Outcome of waiting out the retry delay
enum RetryWait {
    Proceed,
    Disconnected,
    Shutdown,
}

struct ClientActor {
    settings: StreamSettings,
    cmd_rx: mpsc::Receiver<Command>,
    event_tx: mpsc::Sender<StreamEvent>,
    shared: Arc<Shared>,
    attempts: u32,
}

impl ClientActor {
    async fn run(mut self) {
        loop {
            match self.cmd_rx.recv().await {
                None => return,
                Some(Command::Connect) => {
                    if self.connection_cycle().await {
                        return;
                    }
                }
                Some(Command::Disconnect) => {
                    self.attempts = 0;
                    self.set_state(ConnectionState::Disconnected);
                }
                Some(Command::SendAudio(_)) => {
                    warn!("Not connected, dropping audio chunk");
                }
            }
        }
    }

    /// Drive connection attempts until intentionally disconnected, the
    /// retry ceiling is hit, or shutdown. Returns true on shutdown.
    async fn connection_cycle(&mut self) -> bool {
        self.attempts = 0;
        self.set_error(None);
        let mut immediate = true;

        loop {
            if !immediate {
                if self.attempts >= self.settings.reconnection_attempts {
                    error!(
                        "Giving up after {} connection attempts",
                        self.settings.reconnection_attempts
                    );
                    self.set_error(Some(format!(
                        "Failed to connect after {} attempts",
                        self.settings.reconnection_attempts
                    )));
                    self.set_state(ConnectionState::Failed);
                    self.emit(StreamEvent::ReconnectionExhausted);
                    return false;
                }

                self.set_state(ConnectionState::Reconnecting);
                match self.wait_retry_delay().await {
                    RetryWait::Proceed => {}
                    RetryWait::Disconnected => {
                        self.attempts = 0;
                        self.set_state(ConnectionState::Disconnected);
                        return false;
                    }
                    RetryWait::Shutdown => return true,
                }
            }
            immediate = false;

            self.attempts += 1;
            info!(
                "Connecting to {} (attempt {}/{})",
                self.settings.url, self.attempts, self.settings.reconnection_attempts
            );
            self.set_state(ConnectionState::Connecting);

            match connect_async(self.settings.url.as_str()).await {
                Ok((ws, _)) => {
                    info!("Connected to classification backend");
                    self.attempts = 0;
                    self.set_error(None);
                    self.set_state(ConnectionState::Connected);

                    match self.serve(ws).await {
                        Serve::CleanClose => {
                            self.set_state(ConnectionState::Disconnected);
                            return false;
                        }
                        Serve::Disconnected => {
                            self.attempts = 0;
                            self.set_state(ConnectionState::Disconnected);
                            return false;
                        }
                        Serve::Lost => {}
                        Serve::Reconnect => {
                            immediate = true;
                        }
                        Serve::Shutdown => return true,
                    }
                }
                Err(e) => {
                    warn!("Connection attempt failed: {}", e);
                    self.set_error(Some(e.to_string()));
                    self.emit(StreamEvent::TransportError(e.to_string()));
                }
            }
        }
    }

    /// Wait out the fixed retry delay, letting commands preempt it.
    /// A disconnect during the wait cancels the pending attempt.
    async fn wait_retry_delay(&mut self) -> RetryWait {
        let deadline = Instant::now() + Duration::from_millis(self.settings.reconnection_delay_ms);
        loop {
            tokio::select! {
                _ = sleep_until(deadline) => return RetryWait::Proceed,
                cmd = self.cmd_rx.recv() => match cmd {
                    None => return RetryWait::Shutdown,
                    Some(Command::Disconnect) => return RetryWait::Disconnected,
                    // connect() discards the pending timer and retries now
                    Some(Command::Connect) => return RetryWait::Proceed,
                    Some(Command::SendAudio(_)) => {
                        warn!("Not connected, dropping audio chunk");
                    }
                },
            }
        }
    }

    /// Serve one established connection until it ends.
    async fn serve(&mut self, ws: WsStream) -> Serve {
        let (mut write, mut read) = ws.split();

        loop {
            tokio::select! {
                msg = read.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        match parse_detection(&text) {
                            Some(event) => {
                                info!("Detection: {} (confidence {})", event.label, event.confidence);
                                *self.shared.last_classification.lock().unwrap() = Some(event.clone());
                                self.emit(StreamEvent::Classification(event));
                            }
                            None => debug!("Ignoring unrecognized text frame: {}", text),
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        let normal = matches!(&frame, Some(f) if f.code == CloseCode::Normal);
                        if normal {
                            info!("Backend closed the connection cleanly");
                            return Serve::CleanClose;
                        }
                        warn!("Connection closed unexpectedly: {:?}", frame);
                        self.set_error(Some("connection closed unexpectedly".to_string()));
                        return Serve::Lost;
                    }
                    Some(Ok(_)) => {} // ping/pong/binary: nothing for us
                    Some(Err(e)) => {
                        error!("Transport error: {}", e);
                        self.set_error(Some(e.to_string()));
                        self.emit(StreamEvent::TransportError(e.to_string()));
                        return Serve::Lost;
                    }
                    None => {
                        warn!("Connection ended without a close frame");
                        self.set_error(Some("connection lost".to_string()));
                        return Serve::Lost;
                    }
                },
                cmd = self.cmd_rx.recv() => match cmd {
                    None => {
                        let _ = write.send(normal_close()).await;
                        return Serve::Shutdown;
                    }
                    Some(Command::SendAudio(chunk)) => {
                        debug!("Sending audio chunk ({} bytes)", chunk.len());
                        if let Err(e) = write.send(Message::Binary(chunk)).await {
                            error!("Failed to send audio chunk: {}", e);
                            self.set_error(Some(e.to_string()));
                            self.emit(StreamEvent::TransportError(e.to_string()));
                            return Serve::Lost;
                        }
                    }
                    Some(Command::Disconnect) => {
                        let _ = write.send(normal_close()).await;
                        return Serve::Disconnected;
                    }
                    Some(Command::Connect) => {
                        // Tear down the current handle before reconnecting
                        let _ = write.send(normal_close()).await;
                        return Serve::Reconnect;
                    }
                },
            }
        }
    }

    fn set_state(&self, state: ConnectionState) {
        let changed = {
            let mut current = self.shared.state.lock().unwrap();
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        };
        self.shared
            .connected
            .store(state.is_connected(), Ordering::SeqCst);
        if changed {
            debug!("Connection state -> {:?}", state);
            self.emit(StreamEvent::StateChanged(state));
        }
    }

    fn set_error(&self, error: Option<String>) {
        *self.shared.last_error.lock().unwrap() = error;
    }

    fn emit(&self, event: StreamEvent) {
        // Events are best-effort notifications. Never block the actor on a
        // slow or absent listener: a wedged emit would stall command
        // processing and a disconnect could no longer preempt a retry.
        if let Err(mpsc::error::TrySendError::Full(event)) = self.event_tx.try_send(event) {
            warn!("Event listener not keeping up, dropping {:?}", event);
        }
    }
}

fn normal_close() -> Message {
    Message::Close(Some(CloseFrame {
        code: CloseCode::Normal,
        reason: "client disconnect".into(),
    }))
}
