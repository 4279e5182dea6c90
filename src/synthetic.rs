//! Labelled sine-burst recordings for demos and tests.
use std::f64::consts::PI;
use rand::{rngs::StdRng, Rng, SeedableRng};
use crate::processing::error::{PipelineError, Result};
use crate::processing::signal::{ChannelLayout, LabeledSignal, MultiChannelSignal, Phase};
struct Segment {
    phase: Phase,
    duration_s: f64,
    amplitude: f64,
}
/// Builds a [`LabeledSignal`] out of consecutive phases, each a sine of fixed
/// amplitude. The oscillation runs phase-continuously across segments, so only the
/// amplitude changes at a boundary. Channels get a small phase offset each.
pub struct SyntheticBuilder {
    sample_rate_hz: f64,
    layout: ChannelLayout,
    frequency_hz: f64,
    noise: f64,
    seed: u64,
    segments: Vec<Segment>,
}
impl SyntheticBuilder {
    pub fn new(sample_rate_hz: f64) -> Self {
        Self {
            sample_rate_hz,
            layout: ChannelLayout::muse(),
            frequency_hz: 10.0,
            noise: 0.0,
            seed: 7,
            segments: Vec::new(),
        }
    }
    pub fn layout(mut self, layout: ChannelLayout) -> Self {
        self.layout = layout;
        self
    }
    pub fn frequency_hz(mut self, frequency_hz: f64) -> Self {
        self.frequency_hz = frequency_hz;
        self
    }
    /// Uniform noise in `[-noise, noise)` added to every sample.
    pub fn noise(mut self, noise: f64) -> Self {
        self.noise = noise;
        self
    }
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
    pub fn phase(mut self, phase: Phase, duration_s: f64, amplitude: f64) -> Self {
        self.segments.push(Segment {
            phase,
            duration_s,
            amplitude,
        });
        self
    }
    pub fn build(self) -> Result<LabeledSignal> {
        let fs = self.sample_rate_hz;
        if !(fs.is_finite() && fs > 0.0) {
            return Err(PipelineError::InvalidSampleRate);
        }
        if !(self.noise >= 0.0 && self.noise.is_finite()) {
            return Err(PipelineError::InvalidConfig(format!(
                "noise amplitude must be non-negative, got {}",
                self.noise
            )));
        }
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut channels = vec![Vec::new(); self.layout.len()];
        let mut labels = Vec::new();
        for segment in &self.segments {
            let n = (segment.duration_s * fs).round() as usize;
            for _ in 0..n {
                let t = labels.len() as f64 / fs;
                for (ch, out) in channels.iter_mut().enumerate() {
                    let offset = ch as f64 * 0.3;
                    let mut value =
                        segment.amplitude * (2.0 * PI * self.frequency_hz * t + offset).sin();
                    if self.noise > 0.0 {
                        value += rng.gen_range(-self.noise..self.noise);
                    }
                    out.push(value);
                }
                labels.push(segment.phase);
            }
        }
        let signal = MultiChannelSignal::from_channels(self.layout, fs, channels)?;
        LabeledSignal::new(signal, labels)
    }
}
