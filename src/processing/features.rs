use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use crate::processing::error::{PipelineError, Result};
use crate::processing::signal::MultiChannelSignal;
/// Sliding window definition: duration in seconds plus overlap fraction in `[0, 1)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSpec {
    pub duration_s: f64,
    pub overlap: f64,
}
impl Default for WindowSpec {
    fn default() -> Self {
        Self {
            duration_s: 1.0,
            overlap: 0.5,
        }
    }
}
impl WindowSpec {
    pub fn new(duration_s: f64, overlap: f64) -> Self {
        Self {
            duration_s,
            overlap,
        }
    }
    /// Resolves the window and step lengths in samples:
    /// `window = round(duration * fs)` and `step = round(duration * fs * (1 - overlap))`.
    /// Both products are rounded once, from the unrounded values.
    pub fn resolve(&self, sample_rate_hz: f64) -> Result<(usize, usize)> {
        if !(sample_rate_hz.is_finite() && sample_rate_hz > 0.0) {
            return Err(PipelineError::InvalidSampleRate);
        }
        if !(self.duration_s.is_finite() && self.duration_s > 0.0) {
            return Err(PipelineError::InvalidWindow(format!(
                "duration must be positive, got {} s",
                self.duration_s
            )));
        }
        if !(0.0..1.0).contains(&self.overlap) {
            return Err(PipelineError::InvalidWindow(format!(
                "overlap must be in [0, 1), got {}",
                self.overlap
            )));
        }
        let exact = self.duration_s * sample_rate_hz;
        let window = exact.round() as usize;
        let step = (exact * (1.0 - self.overlap)).round() as usize;
        if window == 0 || step == 0 {
            return Err(PipelineError::InvalidWindow(format!(
                "{} s at {} Hz with overlap {} gives window {} / step {} samples",
                self.duration_s, sample_rate_hz, self.overlap, window, step
            )));
        }
        Ok((window, step))
    }
}
/// Number of whole windows that fit in `len` samples. Trailing partial windows are
/// dropped.
pub fn window_count(len: usize, window: usize, step: usize) -> usize {
    if window == 0 || step == 0 || len < window {
        return 0;
    }
    (len - window) / step + 1
}
/// Per-window features, one entry per window in every vector.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct WindowFeatures {
    /// Window centre, seconds from the first sample.
    pub times: Vec<f64>,
    pub rms: Vec<f64>,
    pub mav: Vec<f64>,
    pub energy: Vec<f64>,
}
impl WindowFeatures {
    pub fn len(&self) -> usize {
        self.times.len()
    }
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
    fn with_capacity(n: usize) -> Self {
        Self {
            times: Vec::with_capacity(n),
            rms: Vec::with_capacity(n),
            mav: Vec::with_capacity(n),
            energy: Vec::with_capacity(n),
        }
    }
}
/// RMS, mean absolute value and energy over sliding windows of one channel.
/// Fewer samples than one window yields an empty result.
pub fn extract_window_features<'a, I>(
    samples: I,
    sample_rate_hz: f64,
    spec: &WindowSpec,
) -> Result<WindowFeatures>
where
    I: IntoIterator<Item = &'a f64>,
{
    let (window, step) = spec.resolve(sample_rate_hz)?;
    let samples: Vec<f64> = samples.into_iter().copied().collect();
    let count = window_count(samples.len(), window, step);
    let mut features = WindowFeatures::with_capacity(count);
    for w in 0..count {
        let start = w * step;
        let chunk = &samples[start..start + window];
        let (mut sum_sq, mut sum_abs) = (0.0, 0.0);
        for &x in chunk {
            sum_sq += x * x;
            sum_abs += x.abs();
        }
        let n = window as f64;
        features
            .times
            .push((start as f64 + n / 2.0) / sample_rate_hz);
        features.rms.push((sum_sq / n).sqrt());
        features.mav.push(sum_abs / n);
        features.energy.push(sum_sq);
    }
    Ok(features)
}
/// Window features for one named channel of `signal`.
pub fn extract_channel_features(
    signal: &MultiChannelSignal,
    channel: &str,
    spec: &WindowSpec,
) -> Result<WindowFeatures> {
    let view = signal.channel_by_name(channel)?;
    extract_window_features(view.iter(), signal.sample_rate_hz(), spec)
}
/// Window features for every channel, keyed by channel name.
pub fn extract_all_channels(
    signal: &MultiChannelSignal,
    spec: &WindowSpec,
) -> Result<BTreeMap<String, WindowFeatures>> {
    signal
        .layout()
        .names()
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let features =
                extract_window_features(signal.channel(i).iter(), signal.sample_rate_hz(), spec)?;
            Ok((name.clone(), features))
        })
        .collect()
}
