use tracing::debug;

/// Chunker configuration
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Capture sample rate in Hz
    pub sample_rate: u32,
    /// Duration of each emitted chunk in seconds
    pub chunk_duration_secs: f64,
}

impl ChunkerConfig {
    pub fn new(sample_rate: u32, chunk_duration_secs: f64) -> Self {
        Self {
            sample_rate,
            chunk_duration_secs,
        }
    }

    /// Number of samples per emitted chunk (default config: 80,000 = 5s at 16kHz)
    pub fn chunk_samples(&self) -> usize {
        (self.sample_rate as f64 * self.chunk_duration_secs) as usize
    }
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            chunk_duration_secs: 5.0,
        }
    }
}

/// Accumulates float samples and emits fixed-size 16-bit PCM chunks
///
/// Incoming samples are clamped to [-1.0, 1.0], converted to i16, and
/// appended to a pending buffer. Every time the buffer reaches the chunk
/// sample count, one chunk is sliced off the front and serialized as
/// little-endian bytes; the remainder stays buffered for the next push.
pub struct PcmChunker {
    config: ChunkerConfig,
    pending: Vec<i16>,
}

impl PcmChunker {
    pub fn new(config: ChunkerConfig) -> Self {
        let chunk_samples = config.chunk_samples();
        Self {
            config,
            pending: Vec::with_capacity(chunk_samples),
        }
    }

    /// Convert one float sample to i16.
    ///
    /// The scale factor is asymmetric (32767 positive, 32768 negative) so
    /// the full two's-complement range is reachable without overflow.
    pub fn float_to_i16(sample: f32) -> i16 {
        let s = sample.clamp(-1.0, 1.0);
        if s < 0.0 {
            (s * 32768.0) as i16
        } else {
            (s * 32767.0) as i16
        }
    }

    /// Append a block of float samples; returns every chunk completed by it.
    ///
    /// A single large block can complete more than one chunk. Each returned
    /// buffer is exactly `chunk_samples * 2` bytes of i16 LE PCM.
    pub fn push(&mut self, samples: &[f32]) -> Vec<Vec<u8>> {
        self.pending
            .extend(samples.iter().copied().map(Self::float_to_i16));

        let chunk_samples = self.config.chunk_samples();
        let mut chunks = Vec::new();

        while self.pending.len() >= chunk_samples {
            let rest = self.pending.split_off(chunk_samples);
            let complete = std::mem::replace(&mut self.pending, rest);

            let mut bytes = Vec::with_capacity(chunk_samples * 2);
            for sample in complete {
                bytes.extend_from_slice(&sample.to_le_bytes());
            }

            debug!(
                "Chunk complete: {} samples ({} bytes), {} pending",
                chunk_samples,
                bytes.len(),
                self.pending.len()
            );
            chunks.push(bytes);
        }

        chunks
    }

    /// Number of samples buffered but not yet emitted
    pub fn pending_samples(&self) -> usize {
        self.pending.len()
    }

    /// Discard all buffered samples (called when capture stops)
    pub fn reset(&mut self) {
        self.pending.clear();
    }
}
