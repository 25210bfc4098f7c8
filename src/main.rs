use anyhow::Result;
use clap::Parser;
use hear2help::{Config, MonitorSession, SessionConfig};
use tracing::info;

/// Stream ambient audio to the classification backend and log detections
#[derive(Parser, Debug)]
#[command(name = "hear2help", version, about)]
struct Args {
    /// Path to the configuration file (without extension)
    #[arg(short, long, default_value = "config/hear2help")]
    config: String,

    /// Print the detection history as JSON on exit
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("hear2help v{}", env!("CARGO_PKG_VERSION"));
    info!("Backend endpoint: {}", cfg.stream.url);
    info!(
        "Audio: {}Hz mono, {}s chunks ({} bytes each)",
        cfg.audio.sample_rate,
        cfg.audio.chunk_duration_secs,
        cfg.audio.chunk_bytes()
    );

    let session = MonitorSession::new(SessionConfig::from_config(&cfg));
    session.start().await?;

    info!("Monitoring; press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    let stats = session.stop().await?;
    info!(
        "Session {} finished: {} chunks sent, {} detections in {:.1}s",
        session.session_id(),
        stats.chunks_sent,
        stats.detections,
        stats.duration_secs
    );

    if args.json {
        let history = session.history().await;
        println!("{}", serde_json::to_string_pretty(&history)?);
    }

    Ok(())
}
