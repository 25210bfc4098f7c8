//! Downmix and decimation helpers for capture devices that cannot open a
//! 16kHz mono stream natively.

/// Average interleaved channels down to mono.
///
/// Returns the input unchanged when it is already mono.
pub fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }

    let channels = channels as usize;
    samples
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Sample-rate reducer that carries its phase across blocks.
///
/// Picks the nearest input sample for each output instant, so it works for
/// non-integer ratios (e.g. 44100 -> 16000). Upsampling is not supported;
/// callers open only sources at or above the target rate, and a source at
/// the target rate passes samples through.
pub struct Decimator {
    step: f64,
    pos: f64,
}

impl Decimator {
    pub fn new(source_rate: u32, target_rate: u32) -> Self {
        let step = if source_rate > target_rate {
            source_rate as f64 / target_rate as f64
        } else {
            1.0
        };
        Self { step, pos: 0.0 }
    }

    /// True when the source already matches the target rate
    pub fn is_passthrough(&self) -> bool {
        self.step == 1.0
    }

    /// Reduce one block of mono samples, preserving phase across calls
    pub fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        if self.is_passthrough() {
            return samples.to_vec();
        }

        let mut out = Vec::with_capacity((samples.len() as f64 / self.step) as usize + 1);
        while (self.pos as usize) < samples.len() {
            out.push(samples[self.pos as usize]);
            self.pos += self.step;
        }
        self.pos -= samples.len() as f64;
        out
    }
}
