use std::collections::HashMap;
use log::{debug, trace};
use serde::Serialize;
use crate::config::{DetectorConfig, PipelineConfig};
use crate::processing::bands::FrequencyBand;
use crate::processing::buffer::FrameRing;
use crate::processing::error::{PipelineError, Result};
use crate::processing::filter::{BandFilter, FilterChain};
use crate::processing::signal::{ChannelLayout, Phase};
/// Outcome of one detector update.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Estimate {
    /// Buffers are still filling; the previous state is carried with zero confidence.
    WarmingUp { state: Phase },
    Ready {
        state: Phase,
        confidence: f64,
        /// `(detection_power - baseline_power) / baseline_power`.
        relative_change: f64,
    },
}
impl Estimate {
    pub fn state(&self) -> Phase {
        match *self {
            Estimate::WarmingUp { state } | Estimate::Ready { state, .. } => state,
        }
    }
    pub fn confidence(&self) -> f64 {
        match *self {
            Estimate::WarmingUp { .. } => 0.0,
            Estimate::Ready { confidence, .. } => confidence,
        }
    }
    pub fn is_ready(&self) -> bool {
        matches!(self, Estimate::Ready { .. })
    }
}
/// Causal REST/ACTIVE detector fed one sample at a time.
///
/// Each incoming sample is band-filtered per channel and enters the detection ring;
/// the frame it displaces moves into the baseline ring. The baseline therefore always
/// covers the stretch immediately before the detection window. Memory and per-update
/// cost are fixed by the configured durations.
#[derive(Clone, Debug)]
pub struct OnlineStateDetector {
    layout: ChannelLayout,
    sample_rate_hz: f64,
    band: FrequencyBand,
    erd_threshold: f64,
    filters: Vec<FilterChain>,
    detection: FrameRing,
    baseline: FrameRing,
    filtered: Vec<f64>,
    displaced: Vec<f64>,
    state: Phase,
    confidence: f64,
}
impl OnlineStateDetector {
    pub fn new(
        layout: ChannelLayout,
        sample_rate_hz: f64,
        band: FrequencyBand,
        filter: BandFilter,
        config: &DetectorConfig,
    ) -> Result<Self> {
        config.validate()?;
        let chain = filter.design(band, sample_rate_hz)?;
        let channels = layout.len();
        let detection = FrameRing::with_duration(channels, sample_rate_hz, config.detection_s)?;
        let baseline = FrameRing::with_duration(channels, sample_rate_hz, config.baseline_s)?;
        debug!(
            "detector on {:?}: band [{}, {}] Hz, baseline {} / detection {} samples, threshold {}",
            layout.names(),
            band.low_hz,
            band.high_hz,
            baseline.capacity(),
            detection.capacity(),
            config.erd_threshold
        );
        Ok(Self {
            filters: vec![chain; channels],
            filtered: vec![0.0; channels],
            displaced: vec![0.0; channels],
            layout,
            sample_rate_hz,
            band,
            erd_threshold: config.erd_threshold,
            detection,
            baseline,
            state: Phase::Rest,
            confidence: 0.0,
        })
    }
    /// Builds a detector from the pipeline's channel layout, band table and filter order.
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Self::new(
            config.channels.clone(),
            config.sample_rate_hz,
            config.band(&config.detector.band)?,
            config.band_filter()?,
            &config.detector,
        )
    }
    pub fn layout(&self) -> &ChannelLayout {
        &self.layout
    }
    pub fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }
    pub fn band(&self) -> FrequencyBand {
        self.band
    }
    /// Number of updates before the first decision.
    pub fn warm_up_samples(&self) -> usize {
        self.baseline.capacity() + self.detection.capacity()
    }
    pub fn current(&self) -> (Phase, f64) {
        (self.state, self.confidence)
    }
    /// Consumes one sample (one value per layout channel, in layout order).
    /// Samples must arrive in chronological order.
    pub fn update(&mut self, sample: &[f64]) -> Result<Estimate> {
        if sample.len() != self.layout.len() {
            return Err(PipelineError::ChannelMismatch {
                expected: self.layout.len(),
                actual: sample.len(),
            });
        }
        for ((out, filter), &x) in self.filtered.iter_mut().zip(&mut self.filters).zip(sample) {
            *out = filter.process_sample(x);
        }
        if self.detection.push(&self.filtered, Some(&mut self.displaced)) {
            self.baseline.push(&self.displaced, None);
        }
        if !(self.baseline.is_full() && self.detection.is_full()) {
            return Ok(Estimate::WarmingUp { state: self.state });
        }
        let baseline_power = self.baseline.mean_power();
        let detection_power = self.detection.mean_power();
        let estimate = if baseline_power > 0.0 {
            let relative_change = (detection_power - baseline_power) / baseline_power;
            let (state, confidence) = if relative_change < self.erd_threshold {
                (Phase::Active, relative_change.abs())
            } else {
                (Phase::Rest, 1.0 - relative_change.abs())
            };
            Estimate::Ready {
                state,
                confidence: confidence.clamp(0.0, 1.0),
                relative_change,
            }
        } else {
            Estimate::Ready {
                state: Phase::Rest,
                confidence: 0.0,
                relative_change: 0.0,
            }
        };
        trace!(
            "baseline {:.6} detection {:.6} -> {:?}",
            baseline_power,
            detection_power,
            estimate
        );
        self.state = estimate.state();
        self.confidence = estimate.confidence();
        Ok(estimate)
    }
    /// Same as [`update`](Self::update) for a name -> value reading.
    pub fn update_named(&mut self, reading: &HashMap<String, f64>) -> Result<Estimate> {
        let sample = self.layout.order(reading)?;
        self.update(&sample)
    }
    /// Forgets all buffered samples and filter history; state returns to REST.
    pub fn reset(&mut self) {
        self.filters.iter_mut().for_each(FilterChain::reset);
        self.detection.clear();
        self.baseline.clear();
        self.state = Phase::Rest;
        self.confidence = 0.0;
    }
}
