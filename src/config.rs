use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub stream: StreamSettings,
    pub audio: AudioSettings,
}

/// Settings for the WebSocket connection to the classification backend
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StreamSettings {
    /// Backend endpoint (e.g. "ws://localhost:8010/ws/audio")
    pub url: String,

    /// Maximum number of consecutive connection attempts before giving up
    pub reconnection_attempts: u32,

    /// Fixed delay between connection attempts, in milliseconds
    pub reconnection_delay_ms: u64,
}

/// Settings for microphone capture and PCM framing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AudioSettings {
    /// Capture sample rate in Hz (backend expects 16kHz)
    pub sample_rate: u32,

    /// Number of channels (1 = mono)
    pub channels: u16,

    /// Duration of each transmitted chunk in seconds
    pub chunk_duration_secs: f64,

    /// Sample width in bytes (only 2 = i16 is supported by the backend)
    pub bytes_per_sample: u16,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8010/ws/audio".to_string(),
            reconnection_attempts: 5,
            reconnection_delay_ms: 1000,
        }
    }
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // YAMNet expects 16kHz
            channels: 1,        // Mono
            chunk_duration_secs: 5.0,
            bytes_per_sample: 2,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stream: StreamSettings::default(),
            audio: AudioSettings::default(),
        }
    }
}

impl AudioSettings {
    /// Number of samples in one complete chunk
    pub fn chunk_samples(&self) -> usize {
        (self.sample_rate as f64 * self.chunk_duration_secs) as usize
    }

    /// Size of one complete chunk on the wire, in bytes
    pub fn chunk_bytes(&self) -> usize {
        self.chunk_samples() * self.bytes_per_sample as usize
    }
}

impl Config {
    /// Load configuration from a file (TOML), with environment overrides
    /// (HEAR2HELP__STREAM__URL etc.) on top of built-in defaults.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Config::default())?)
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("HEAR2HELP").separator("__"))
            .build()?;

        let cfg: Config = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.stream.url)
            .with_context(|| format!("Invalid stream URL: {}", self.stream.url))?;
        if url.scheme() != "ws" && url.scheme() != "wss" {
            bail!("Stream URL must use ws:// or wss://, got {}", url.scheme());
        }
        if self.audio.sample_rate == 0 {
            bail!("audio.sample_rate must be > 0");
        }
        if self.audio.channels == 0 {
            bail!("audio.channels must be > 0");
        }
        if !(self.audio.chunk_duration_secs > 0.0) {
            bail!("audio.chunk_duration_secs must be > 0");
        }
        if self.audio.bytes_per_sample != 2 {
            bail!(
                "audio.bytes_per_sample must be 2 (16-bit PCM), got {}",
                self.audio.bytes_per_sample
            );
        }
        Ok(())
    }
}
