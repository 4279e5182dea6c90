//! Baseline z-scoring: both the reference (rest) segment and the target segment are
//! expressed in units of the reference's per-channel spread.
use log::debug;
use ndarray::Axis;
use serde::Serialize;
use crate::processing::error::{PipelineError, Result};
use crate::processing::signal::MultiChannelSignal;
/// Per-channel statistics of a baseline segment.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BaselineStats {
    pub mean: Vec<f64>,
    pub std: Vec<f64>,
}
impl BaselineStats {
    /// Mean and sample standard deviation (n - 1) of every channel.
    pub fn from_signal(reference: &MultiChannelSignal) -> Result<Self> {
        let n = reference.num_samples();
        if n < 2 {
            return Err(PipelineError::InsufficientBaseline {
                required: 2,
                actual: n,
            });
        }
        let mut mean = Vec::with_capacity(reference.num_channels());
        let mut std = Vec::with_capacity(reference.num_channels());
        for (name, row) in reference
            .layout()
            .names()
            .iter()
            .zip(reference.data().axis_iter(Axis(0)))
        {
            let m = row.sum() / n as f64;
            let var = row.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (n - 1) as f64;
            let s = var.sqrt();
            if !(s > 0.0 && s.is_finite()) {
                return Err(PipelineError::ZeroVariance {
                    channel: name.clone(),
                });
            }
            mean.push(m);
            std.push(s);
        }
        Ok(Self { mean, std })
    }
    /// Returns `(value - mean) / std` per channel as a new signal.
    pub fn apply(&self, signal: &MultiChannelSignal) -> Result<MultiChannelSignal> {
        if signal.num_channels() != self.mean.len() {
            return Err(PipelineError::ChannelMismatch {
                expected: self.mean.len(),
                actual: signal.num_channels(),
            });
        }
        let mut channel = 0;
        Ok(signal.map_channels(|src, mut dst| {
            let (m, s) = (self.mean[channel], self.std[channel]);
            dst.zip_mut_with(&src, |y, &x| *y = (x - m) / s);
            channel += 1;
        }))
    }
}
/// Reference and target after baseline normalisation, plus the statistics used.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedPair {
    pub reference: MultiChannelSignal,
    pub target: MultiChannelSignal,
    pub stats: BaselineStats,
}
/// Z-scores `reference` and `target` against the reference's per-channel mean and
/// standard deviation. Channel layouts must match; lengths may differ.
pub fn normalize_to_baseline(
    reference: &MultiChannelSignal,
    target: &MultiChannelSignal,
) -> Result<NormalizedPair> {
    if reference.num_channels() != target.num_channels() {
        return Err(PipelineError::ChannelMismatch {
            expected: reference.num_channels(),
            actual: target.num_channels(),
        });
    }
    if reference.layout() != target.layout() {
        return Err(PipelineError::InvalidLayout(format!(
            "baseline channels {:?} differ from target channels {:?}",
            reference.layout().names(),
            target.layout().names()
        )));
    }
    let stats = BaselineStats::from_signal(reference)?;
    debug!(
        "baseline over {} samples: mean {:?}, std {:?}",
        reference.num_samples(),
        stats.mean,
        stats.std
    );
    Ok(NormalizedPair {
        reference: stats.apply(reference)?,
        target: stats.apply(target)?,
        stats,
    })
}
