use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use ndarray::{Array2, ArrayView1, ArrayViewMut1, Axis};
use serde::{Deserialize, Serialize};
use crate::processing::error::{PipelineError, Result};
/// Channel names of the Muse 2 headband, in stream order.
pub const MUSE_CHANNELS: [&str; 4] = ["TP9", "AF7", "AF8", "TP10"];
/// Ordered, validated set of channel names shared by every sample of a signal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct ChannelLayout {
    names: Vec<String>,
}
impl ChannelLayout {
    pub fn new<I, S>(names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(PipelineError::InvalidLayout(
                "at least one channel is required".into(),
            ));
        }
        for (i, name) in names.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(PipelineError::InvalidLayout(format!(
                    "channel {i} has an empty name"
                )));
            }
            if names[..i].contains(name) {
                return Err(PipelineError::InvalidLayout(format!(
                    "duplicate channel '{name}'"
                )));
            }
        }
        Ok(Self { names })
    }
    pub fn muse() -> Self {
        Self {
            names: MUSE_CHANNELS.iter().map(|s| s.to_string()).collect(),
        }
    }
    pub fn len(&self) -> usize {
        self.names.len()
    }
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
    pub fn names(&self) -> &[String] {
        &self.names
    }
    pub fn position(&self, name: &str) -> Result<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| PipelineError::UnknownChannel(name.to_string()))
    }
    /// Orders a name -> value reading into layout order. Extra keys are rejected so a
    /// misspelled channel cannot slip through silently.
    pub fn order(&self, reading: &HashMap<String, f64>) -> Result<Vec<f64>> {
        if let Some(extra) = reading.keys().find(|k| !self.names.contains(k)) {
            return Err(PipelineError::UnknownChannel(extra.clone()));
        }
        self.names
            .iter()
            .map(|name| {
                reading
                    .get(name)
                    .copied()
                    .ok_or_else(|| PipelineError::MissingChannel(name.clone()))
            })
            .collect()
    }
}
impl TryFrom<Vec<String>> for ChannelLayout {
    type Error = PipelineError;
    fn try_from(value: Vec<String>) -> Result<Self> {
        Self::new(value)
    }
}
impl From<ChannelLayout> for Vec<String> {
    fn from(value: ChannelLayout) -> Self {
        value.names
    }
}
/// Multi-channel recording at a constant sample rate. Stored channels x samples.
#[derive(Clone, Debug, PartialEq)]
pub struct MultiChannelSignal {
    layout: ChannelLayout,
    sample_rate_hz: f64,
    data: Array2<f64>,
}
impl MultiChannelSignal {
    pub fn new(layout: ChannelLayout, sample_rate_hz: f64, data: Array2<f64>) -> Result<Self> {
        validate_sample_rate(sample_rate_hz)?;
        if data.nrows() != layout.len() {
            return Err(PipelineError::ChannelMismatch {
                expected: layout.len(),
                actual: data.nrows(),
            });
        }
        Ok(Self {
            layout,
            sample_rate_hz,
            data,
        })
    }
    /// Builds a signal from per-channel columns (channels x samples).
    pub fn from_channels(
        layout: ChannelLayout,
        sample_rate_hz: f64,
        channels: Vec<Vec<f64>>,
    ) -> Result<Self> {
        if channels.len() != layout.len() {
            return Err(PipelineError::ChannelMismatch {
                expected: layout.len(),
                actual: channels.len(),
            });
        }
        let expected = channels.first().map(Vec::len).unwrap_or(0);
        for (name, channel) in layout.names().iter().zip(&channels) {
            if channel.len() != expected {
                return Err(PipelineError::LengthMismatch {
                    channel: name.clone(),
                    expected,
                    actual: channel.len(),
                });
            }
        }
        let flat: Vec<f64> = channels.into_iter().flatten().collect();
        let data = Array2::from_shape_vec((layout.len(), expected), flat)
            .map_err(|e| PipelineError::InvalidLayout(e.to_string()))?;
        Self::new(layout, sample_rate_hz, data)
    }
    /// Builds a signal from time-ordered samples, each holding one value per channel.
    pub fn from_samples(
        layout: ChannelLayout,
        sample_rate_hz: f64,
        samples: &[Vec<f64>],
    ) -> Result<Self> {
        if let Some(bad) = samples.iter().find(|s| s.len() != layout.len()) {
            return Err(PipelineError::ChannelMismatch {
                expected: layout.len(),
                actual: bad.len(),
            });
        }
        let data = Array2::from_shape_fn((layout.len(), samples.len()), |(ch, i)| samples[i][ch]);
        Self::new(layout, sample_rate_hz, data)
    }
    pub fn layout(&self) -> &ChannelLayout {
        &self.layout
    }
    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }
    pub fn nyquist_hz(&self) -> f64 {
        self.sample_rate_hz * 0.5
    }
    pub fn num_channels(&self) -> usize {
        self.data.nrows()
    }
    pub fn num_samples(&self) -> usize {
        self.data.ncols()
    }
    pub fn is_empty(&self) -> bool {
        self.num_samples() == 0
    }
    pub fn duration_seconds(&self) -> f64 {
        self.num_samples() as f64 / self.sample_rate_hz
    }
    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }
    pub fn channel(&self, index: usize) -> ArrayView1<'_, f64> {
        self.data.row(index)
    }
    pub fn channel_by_name(&self, name: &str) -> Result<ArrayView1<'_, f64>> {
        Ok(self.data.row(self.layout.position(name)?))
    }
    /// Copies sample `index` out in layout order.
    pub fn sample(&self, index: usize) -> Vec<f64> {
        self.data.column(index).to_vec()
    }
    /// Half-open sample range `[start, end)`, clamped to the signal length.
    pub fn slice(&self, start: usize, end: usize) -> Self {
        let end = end.min(self.num_samples());
        let start = start.min(end);
        Self {
            layout: self.layout.clone(),
            sample_rate_hz: self.sample_rate_hz,
            data: self.data.slice(ndarray::s![.., start..end]).to_owned(),
        }
    }
    /// Produces a new signal of the same shape by running `f` over every channel.
    /// `f` receives the source channel and the zeroed destination row.
    pub fn map_channels<F>(&self, mut f: F) -> Self
    where
        F: FnMut(ArrayView1<'_, f64>, ArrayViewMut1<'_, f64>),
    {
        let mut out = Array2::zeros(self.data.raw_dim());
        for (src, dst) in self.data.axis_iter(Axis(0)).zip(out.axis_iter_mut(Axis(0))) {
            f(src, dst);
        }
        Self {
            layout: self.layout.clone(),
            sample_rate_hz: self.sample_rate_hz,
            data: out,
        }
    }
    /// Mean of squared values across every channel and sample.
    pub fn mean_power(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().map(|v| v * v).sum::<f64>() / self.data.len() as f64
    }
}
fn validate_sample_rate(sample_rate_hz: f64) -> Result<()> {
    if !(sample_rate_hz.is_finite() && sample_rate_hz > 0.0) {
        return Err(PipelineError::InvalidSampleRate);
    }
    Ok(())
}
/// Mental/motor state, used both as a recording label and as the detector output.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    #[default]
    Rest,
    Active,
}
impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Rest => "REST",
            Phase::Active => "ACTIVE",
        }
    }
}
impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
impl FromStr for Phase {
    type Err = PipelineError;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "REST" => Ok(Phase::Rest),
            "ACTIVE" => Ok(Phase::Active),
            other => Err(PipelineError::InvalidConfig(format!(
                "unknown phase label '{other}'"
            ))),
        }
    }
}
/// Contiguous run of identically labelled samples, `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PhaseSegment {
    pub phase: Phase,
    pub start: usize,
    pub end: usize,
}
impl PhaseSegment {
    pub fn len(&self) -> usize {
        self.end - self.start
    }
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}
/// A recording plus one phase label per sample.
#[derive(Clone, Debug, PartialEq)]
pub struct LabeledSignal {
    signal: MultiChannelSignal,
    labels: Vec<Phase>,
}
impl LabeledSignal {
    pub fn new(signal: MultiChannelSignal, labels: Vec<Phase>) -> Result<Self> {
        if labels.len() != signal.num_samples() {
            return Err(PipelineError::LabelLengthMismatch {
                samples: signal.num_samples(),
                labels: labels.len(),
            });
        }
        Ok(Self { signal, labels })
    }
    pub fn signal(&self) -> &MultiChannelSignal {
        &self.signal
    }
    pub fn labels(&self) -> &[Phase] {
        &self.labels
    }
    pub fn len(&self) -> usize {
        self.labels.len()
    }
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
    pub fn segments(&self) -> Vec<PhaseSegment> {
        let mut segments: Vec<PhaseSegment> = Vec::new();
        for (i, &phase) in self.labels.iter().enumerate() {
            match segments.last_mut() {
                Some(last) if last.phase == phase => last.end = i + 1,
                _ => segments.push(PhaseSegment {
                    phase,
                    start: i,
                    end: i + 1,
                }),
            }
        }
        segments
    }
    /// Every sample carrying `phase`, concatenated in time order. `None` when the
    /// phase never occurs.
    pub fn phase_signal(&self, phase: Phase) -> Option<MultiChannelSignal> {
        let indices: Vec<usize> = self
            .labels
            .iter()
            .enumerate()
            .filter(|(_, p)| **p == phase)
            .map(|(i, _)| i)
            .collect();
        if indices.is_empty() {
            return None;
        }
        Some(MultiChannelSignal {
            layout: self.signal.layout.clone(),
            sample_rate_hz: self.signal.sample_rate_hz,
            data: self.signal.data.select(Axis(1), &indices),
        })
    }
}
