// Tests for monitoring-session state that need no audio hardware

use hear2help::{Config, MonitorSession, SessionConfig};

#[test]
fn session_config_carries_stream_and_audio_settings() {
    let cfg = Config::default();
    let session_cfg = SessionConfig::from_config(&cfg);

    assert!(session_cfg.session_id.starts_with("monitor-"));
    assert_eq!(session_cfg.stream.url, cfg.stream.url);
    assert_eq!(session_cfg.audio.sample_rate, cfg.audio.sample_rate);

    // Each session gets its own id
    let other = SessionConfig::from_config(&cfg);
    assert_ne!(session_cfg.session_id, other.session_id);
}

#[tokio::test]
async fn fresh_session_reports_idle_stats() {
    let session = MonitorSession::new(SessionConfig::default());

    let stats = session.stats().await.unwrap();
    assert!(!stats.is_monitoring);
    assert_eq!(stats.chunks_sent, 0);
    assert_eq!(stats.detections, 0);

    assert!(session.history().await.is_empty());
    assert!(!session.client().is_connected());
    assert!(session.client().last_classification().is_none());
}

#[tokio::test]
async fn stop_without_start_is_a_no_op() {
    let session = MonitorSession::new(SessionConfig::default());
    let stats = session.stop().await.unwrap();
    assert!(!stats.is_monitoring);
    assert_eq!(stats.chunks_sent, 0);
}
