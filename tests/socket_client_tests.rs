// Integration tests for the streaming connection manager
//
// Each test runs the client against an in-process WebSocket server (or a
// deliberately dead port) to verify the state machine: bounded retries,
// attempt-counter reset on success, disconnect beating a scheduled
// reconnect, and exact binary transmission.

use futures::{SinkExt, StreamExt};
use hear2help::config::StreamSettings;
use hear2help::socket::{ConnectionState, StreamClient, StreamEvent};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Duration};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

fn settings(url: String, attempts: u32, delay_ms: u64) -> StreamSettings {
    StreamSettings {
        url,
        reconnection_attempts: attempts,
        reconnection_delay_ms: delay_ms,
    }
}

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    (listener, url)
}

/// Reserve a port with nothing listening on it
async fn dead_endpoint() -> (std::net::SocketAddr, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    (addr, format!("ws://{}", addr))
}

async fn accept_ws(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = listener.accept().await.unwrap();
    tokio_tungstenite::accept_async(stream).await.unwrap()
}

async fn next_event(rx: &mut mpsc::Receiver<StreamEvent>) -> StreamEvent {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for stream event")
        .expect("event channel closed")
}

async fn wait_for_state(rx: &mut mpsc::Receiver<StreamEvent>, state: ConnectionState) {
    loop {
        if let StreamEvent::StateChanged(s) = next_event(rx).await {
            if s == state {
                return;
            }
        }
    }
}

#[tokio::test]
async fn detection_frame_yields_exactly_one_event() {
    let (listener, url) = bind().await;

    let server = tokio::spawn(async move {
        let mut ws = accept_ws(&listener).await;
        ws.send(Message::Text("ignored payload".into())).await.unwrap();
        ws.send(Message::Text("Detected: siren_test".into())).await.unwrap();
        // Hold the connection until the client closes it
        while let Some(Ok(msg)) = ws.next().await {
            if let Message::Close(_) = msg {
                break;
            }
        }
    });

    let (client, mut events) = StreamClient::spawn(settings(url, 5, 50));
    client.connect().await;
    wait_for_state(&mut events, ConnectionState::Connected).await;

    // The non-matching payload must produce nothing; the detection exactly one event
    let classification = loop {
        match next_event(&mut events).await {
            StreamEvent::Classification(c) => break c,
            StreamEvent::StateChanged(_) => {}
            other => panic!("unexpected event: {:?}", other),
        }
    };
    assert_eq!(classification.label, "siren_test");
    assert_eq!(classification.confidence, 1.0);

    assert_eq!(client.last_classification().unwrap().label, "siren_test");
    client.clear_last_classification();
    assert!(client.last_classification().is_none());

    // No second classification shows up
    sleep(Duration::from_millis(200)).await;
    while let Ok(event) = events.try_recv() {
        assert!(
            !matches!(event, StreamEvent::Classification(_)),
            "got a second classification event"
        );
    }

    client.disconnect().await;
    wait_for_state(&mut events, ConnectionState::Disconnected).await;
    server.await.unwrap();
}

#[tokio::test]
async fn send_audio_is_byte_exact_and_harmless_when_disconnected() {
    let (listener, url) = bind().await;
    let (payload_tx, mut payload_rx) = mpsc::channel::<Vec<u8>>(4);

    let server = tokio::spawn(async move {
        let mut ws = accept_ws(&listener).await;
        while let Some(Ok(msg)) = ws.next().await {
            match msg {
                Message::Binary(data) => payload_tx.send(data).await.unwrap(),
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    let (client, mut events) = StreamClient::spawn(settings(url, 5, 50));

    // Not connected: dropped silently, never an error or a transmission
    client.send_audio(vec![9u8; 64]).await;
    assert!(!client.is_connected());

    client.connect().await;
    wait_for_state(&mut events, ConnectionState::Connected).await;

    let chunk: Vec<u8> = (0..160_000u32).map(|i| (i % 251) as u8).collect();
    client.send_audio(chunk.clone()).await;

    let received = timeout(Duration::from_secs(5), payload_rx.recv())
        .await
        .expect("timed out waiting for audio")
        .expect("server closed payload channel");
    assert_eq!(
        received, chunk,
        "first transmitted buffer must be the post-connect chunk, byte-identical"
    );

    client.disconnect().await;
    wait_for_state(&mut events, ConnectionState::Disconnected).await;
    server.await.unwrap();
}

#[tokio::test]
async fn retries_are_bounded_and_raise_one_exhausted_notification() {
    let (_addr, url) = dead_endpoint().await;

    let delay = Duration::from_millis(50);
    let (client, mut events) = StreamClient::spawn(settings(url, 3, 50));
    let started = tokio::time::Instant::now();
    client.connect().await;

    let mut connecting = 0;
    let mut exhausted = 0;
    loop {
        match next_event(&mut events).await {
            StreamEvent::StateChanged(ConnectionState::Connecting) => connecting += 1,
            StreamEvent::StateChanged(ConnectionState::Failed) => break,
            StreamEvent::ReconnectionExhausted => exhausted += 1,
            StreamEvent::TransportError(_) => {}
            StreamEvent::StateChanged(ConnectionState::Reconnecting) => {}
            other => panic!("unexpected event: {:?}", other),
        }
    }
    assert_eq!(connecting, 3, "exactly max_attempts open attempts");

    // The terminal notification arrives with (or right after) Failed
    sleep(Duration::from_millis(100)).await;
    while let Ok(event) = events.try_recv() {
        match event {
            StreamEvent::ReconnectionExhausted => exhausted += 1,
            StreamEvent::StateChanged(s) => panic!("state changed after Failed: {:?}", s),
            _ => {}
        }
    }
    assert_eq!(exhausted, 1, "exactly one exhausted notification");

    // Attempts are separated by the fixed delay (2 gaps for 3 attempts)
    assert!(started.elapsed() >= 2 * delay);

    assert_eq!(client.state(), ConnectionState::Failed);
    assert!(!client.is_connected());
    assert!(client.last_error().is_some());
}

#[tokio::test]
async fn successful_connection_resets_the_attempt_counter() {
    let (addr, url) = dead_endpoint().await;

    // Generous delay so the test can bind the listener between attempts
    let (client, mut events) = StreamClient::spawn(settings(url, 3, 200));
    client.connect().await;

    // Two failed attempts
    let mut failures = 0;
    while failures < 2 {
        if let StreamEvent::TransportError(_) = next_event(&mut events).await {
            failures += 1;
        }
    }

    // Third attempt finds a live server
    let listener = TcpListener::bind(addr).await.unwrap();
    let server = tokio::spawn(async move {
        let ws = accept_ws(&listener).await;
        // Abrupt drop: no close handshake, and the listener dies with the task
        drop(ws);
    });
    wait_for_state(&mut events, ConnectionState::Connected).await;
    server.await.unwrap();

    // The connection dies; with the counter reset the client must make the
    // full 3 attempts again before giving up, not fail immediately.
    let mut connecting = 0;
    loop {
        match next_event(&mut events).await {
            StreamEvent::StateChanged(ConnectionState::Connecting) => connecting += 1,
            StreamEvent::StateChanged(ConnectionState::Failed) => break,
            _ => {}
        }
    }
    assert_eq!(
        connecting, 3,
        "full retry budget available again after a successful connection"
    );
}

#[tokio::test]
async fn disconnect_wins_over_a_scheduled_reconnect() {
    let (listener, url) = bind().await;

    let server = tokio::spawn(async move {
        let ws = accept_ws(&listener).await;
        // Abrupt drop with no close frame, and nothing ever listens again
        drop(ws);
        drop(listener);
    });

    let (client, mut events) = StreamClient::spawn(settings(url, 5, 500));
    client.connect().await;
    wait_for_state(&mut events, ConnectionState::Connected).await;
    server.await.unwrap();

    // The lost connection schedules a retry...
    wait_for_state(&mut events, ConnectionState::Reconnecting).await;

    // ...which an intentional disconnect must cancel
    client.disconnect().await;
    wait_for_state(&mut events, ConnectionState::Disconnected).await;

    // No late reconnect attempt re-opens anything
    sleep(Duration::from_millis(1500)).await;
    while let Ok(event) = events.try_recv() {
        if let StreamEvent::StateChanged(s) = event {
            panic!("state changed after intentional disconnect: {:?}", s);
        }
    }
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(!client.is_connected());
}

#[tokio::test]
async fn disconnect_works_with_an_undrained_event_receiver() {
    let (_addr, url) = dead_endpoint().await;

    // A caller polling only the snapshot accessors may hold the receiver
    // without ever reading it. A rapid retry loop then fills the event
    // channel; commands must still get through.
    let (client, events) = StreamClient::spawn(settings(url, 1000, 1));
    client.connect().await;

    // Long enough for the retry loop to back up any bounded event channel
    sleep(Duration::from_millis(500)).await;

    client.disconnect().await;

    let settled = async {
        while client.state() != ConnectionState::Disconnected {
            sleep(Duration::from_millis(20)).await;
        }
    };
    timeout(Duration::from_secs(5), settled)
        .await
        .expect("disconnect must take effect even with a full event channel");
    assert!(!client.is_connected());

    drop(events);
}

#[tokio::test]
async fn normal_closure_from_the_peer_does_not_trigger_reconnection() {
    let (listener, url) = bind().await;

    let server = tokio::spawn(async move {
        let mut ws = accept_ws(&listener).await;
        ws.send(Message::Close(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: "done".into(),
        })))
        .await
        .unwrap();
        // Drain until the close handshake completes
        while ws.next().await.is_some() {}
    });

    let (client, mut events) = StreamClient::spawn(settings(url, 5, 50));
    client.connect().await;
    wait_for_state(&mut events, ConnectionState::Connected).await;

    // Normal closure is intentional regardless of who initiated it
    wait_for_state(&mut events, ConnectionState::Disconnected).await;
    server.await.unwrap();

    sleep(Duration::from_millis(300)).await;
    while let Ok(event) = events.try_recv() {
        if let StreamEvent::StateChanged(s) = event {
            panic!("unexpected reconnection after clean close: {:?}", s);
        }
    }
    assert_eq!(client.state(), ConnectionState::Disconnected);
}
