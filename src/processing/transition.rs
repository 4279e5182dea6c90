use std::fmt;
use log::{debug, warn};
use serde::Serialize;
use crate::config::{PipelineConfig, TransitionConfig};
use crate::processing::bands::FrequencyBand;
use crate::processing::error::{PipelineError, Result};
use crate::processing::filter::BandFilter;
use crate::processing::signal::{LabeledSignal, MultiChannelSignal, Phase};
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionDirection {
    RestToActive,
    ActiveToRest,
}
impl TransitionDirection {
    /// Direction of a change that lands on `next`.
    pub fn into_phase(next: Phase) -> Self {
        match next {
            Phase::Active => TransitionDirection::RestToActive,
            Phase::Rest => TransitionDirection::ActiveToRest,
        }
    }
}
impl fmt::Display for TransitionDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionDirection::RestToActive => f.write_str("REST->ACTIVE"),
            TransitionDirection::ActiveToRest => f.write_str("ACTIVE->REST"),
        }
    }
}
/// Label change at sample `index` (the first sample carrying the new label).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Boundary {
    pub index: usize,
    pub direction: TransitionDirection,
}
/// Every index `i >= 1` where `labels[i] != labels[i - 1]`.
pub fn find_boundaries(labels: &[Phase]) -> Vec<Boundary> {
    labels
        .windows(2)
        .enumerate()
        .filter(|(_, pair)| pair[0] != pair[1])
        .map(|(i, pair)| Boundary {
            index: i + 1,
            direction: TransitionDirection::into_phase(pair[1]),
        })
        .collect()
}
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Onset {
    /// Seconds from the boundary to the start of the first sub-window past threshold.
    Detected { latency_s: f64 },
    NotDetected,
}
impl Onset {
    pub fn latency_s(&self) -> Option<f64> {
        match *self {
            Onset::Detected { latency_s } => Some(latency_s),
            Onset::NotDetected => None,
        }
    }
}
/// Band power around one label boundary.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TransitionRecord {
    pub index: usize,
    pub time_s: f64,
    pub direction: TransitionDirection,
    /// Mean squared band-filtered amplitude over the window before the boundary.
    pub rest_power: f64,
    /// Same over the window after the boundary.
    pub active_power: f64,
    /// `100 * (active - rest) / rest`; `None` when the reference power is zero.
    pub percent_change: Option<f64>,
    pub onset: Onset,
}
/// Measures event-related (de)synchronisation around every label change of a
/// recording.
#[derive(Clone, Debug)]
pub struct TransitionAnalyzer {
    config: TransitionConfig,
    band: FrequencyBand,
    filter: BandFilter,
}
impl TransitionAnalyzer {
    pub fn new(config: TransitionConfig, band: FrequencyBand, filter: BandFilter) -> Result<Self> {
        for (field, value) in [
            ("before_s", config.before_s),
            ("after_s", config.after_s),
            ("onset.sub_window_s", config.onset.sub_window_s),
            ("onset.step_s", config.onset.step_s),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(PipelineError::InvalidConfig(format!(
                    "transition.{field} must be positive, got {value}"
                )));
            }
        }
        Ok(Self {
            config,
            band,
            filter,
        })
    }
    pub fn from_config(config: &PipelineConfig) -> Result<Self> {
        Self::new(
            config.transition.clone(),
            config.band(&config.transition.band)?,
            config.band_filter()?,
        )
    }
    pub fn band(&self) -> FrequencyBand {
        self.band
    }
    pub fn analyze(&self, recording: &LabeledSignal) -> Result<Vec<TransitionRecord>> {
        let boundaries = find_boundaries(recording.labels());
        if boundaries.is_empty() {
            return Ok(Vec::new());
        }
        let filtered = self.filter.filter_signal(recording.signal(), self.band)?;
        let fs = filtered.sample_rate_hz();
        let before = samples_for(self.config.before_s, fs);
        let after = samples_for(self.config.after_s, fs);
        let total = filtered.num_samples();
        let mut records = Vec::with_capacity(boundaries.len());
        for boundary in boundaries {
            let i = boundary.index;
            if i < before || i + after > total {
                debug!(
                    "skipping {} boundary at sample {i}: needs {before} before and {after} after, recording has {total}",
                    boundary.direction
                );
                continue;
            }
            let rest_power = filtered.slice(i - before, i).mean_power();
            let active_power = filtered.slice(i, i + after).mean_power();
            let percent_change = percent_change(rest_power, active_power);
            if percent_change.is_none() {
                warn!("zero band power before boundary at sample {i}");
            }
            let onset = self.onset(&filtered, i, after, rest_power);
            records.push(TransitionRecord {
                index: i,
                time_s: i as f64 / fs,
                direction: boundary.direction,
                rest_power,
                active_power,
                percent_change,
                onset,
            });
        }
        debug!(
            "{} transition records in band [{}, {}] Hz",
            records.len(),
            self.band.low_hz,
            self.band.high_hz
        );
        Ok(records)
    }
    fn onset(
        &self,
        filtered: &MultiChannelSignal,
        boundary: usize,
        after: usize,
        rest_power: f64,
    ) -> Onset {
        let fs = filtered.sample_rate_hz();
        let sub = samples_for(self.config.onset.sub_window_s, fs).max(1);
        let step = samples_for(self.config.onset.step_s, fs).max(1);
        let end = boundary + after;
        let mut start = boundary;
        while start + sub <= end {
            let power = filtered.slice(start, start + sub).mean_power();
            if let Some(change) = percent_change(rest_power, power) {
                if change <= self.config.onset.threshold_pct {
                    return Onset::Detected {
                        latency_s: (start - boundary) as f64 / fs,
                    };
                }
            }
            start += step;
        }
        Onset::NotDetected
    }
}
fn samples_for(seconds: f64, sample_rate_hz: f64) -> usize {
    (seconds * sample_rate_hz).round() as usize
}
fn percent_change(reference: f64, value: f64) -> Option<f64> {
    (reference > 0.0).then(|| 100.0 * (value - reference) / reference)
}
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DirectionSummary {
    pub count: usize,
    pub mean_percent_change: Option<f64>,
    /// Fraction of records with a detected onset.
    pub detection_rate: Option<f64>,
    pub mean_latency_s: Option<f64>,
}
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TransitionSummary {
    pub rest_to_active: DirectionSummary,
    pub active_to_rest: DirectionSummary,
}
/// Aggregates records per direction, ignoring undefined changes in the mean.
pub fn summarize(records: &[TransitionRecord]) -> TransitionSummary {
    let direction = |dir: TransitionDirection| {
        let subset: Vec<&TransitionRecord> =
            records.iter().filter(|r| r.direction == dir).collect();
        let changes: Vec<f64> = subset.iter().filter_map(|r| r.percent_change).collect();
        let latencies: Vec<f64> = subset.iter().filter_map(|r| r.onset.latency_s()).collect();
        DirectionSummary {
            count: subset.len(),
            mean_percent_change: mean(&changes),
            detection_rate: (!subset.is_empty())
                .then(|| latencies.len() as f64 / subset.len() as f64),
            mean_latency_s: mean(&latencies),
        }
    };
    TransitionSummary {
        rest_to_active: direction(TransitionDirection::RestToActive),
        active_to_rest: direction(TransitionDirection::ActiveToRest),
    }
}
fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic::SyntheticBuilder;
    fn analyzer() -> TransitionAnalyzer {
        TransitionAnalyzer::from_config(&PipelineConfig::with_threshold(-0.2)).unwrap()
    }
    fn erd_recording() -> LabeledSignal {
        SyntheticBuilder::new(256.0)
            .frequency_hz(10.0)
            .phase(Phase::Rest, 5.0, 2.0)
            .phase(Phase::Active, 5.0, 0.5)
            .phase(Phase::Rest, 5.0, 2.0)
            .build()
            .unwrap()
    }
    #[test]
    fn boundaries_follow_label_changes() {
        use Phase::*;
        let boundaries = find_boundaries(&[Rest, Rest, Active, Active, Rest]);
        assert_eq!(
            boundaries,
            vec![
                Boundary { index: 2, direction: TransitionDirection::RestToActive },
                Boundary { index: 4, direction: TransitionDirection::ActiveToRest },
            ]
        );
        assert!(find_boundaries(&[Rest; 10]).is_empty());
        assert!(find_boundaries(&[]).is_empty());
    }
    #[test]
    fn amplitude_drop_is_desynchronisation() {
        let records = analyzer().analyze(&erd_recording()).unwrap();
        let onsets: Vec<&TransitionRecord> = records
            .iter()
            .filter(|r| r.direction == TransitionDirection::RestToActive)
            .collect();
        assert_eq!(onsets.len(), 1);
        let record = onsets[0];
        assert_eq!(record.index, 5 * 256);
        assert!((record.time_s - 5.0).abs() < 1e-12);
        let change = record.percent_change.unwrap();
        assert!(change < 0.0, "change {change}");
        let latency = record.onset.latency_s().unwrap();
        assert!((0.0..1.0).contains(&latency), "latency {latency}");
        let back = records
            .iter()
            .find(|r| r.direction == TransitionDirection::ActiveToRest)
            .unwrap();
        assert!(back.percent_change.unwrap() > 0.0);
    }
    #[test]
    fn boundaries_near_edges_are_skipped() {
        let recording = SyntheticBuilder::new(256.0)
            .phase(Phase::Rest, 0.5, 1.0)
            .phase(Phase::Active, 5.0, 0.5)
            .phase(Phase::Rest, 1.0, 1.0)
            .build()
            .unwrap();
        assert!(analyzer().analyze(&recording).unwrap().is_empty());
    }
    #[test]
    fn unchanged_power_is_not_an_onset() {
        let recording = SyntheticBuilder::new(256.0)
            .phase(Phase::Rest, 4.0, 1.0)
            .phase(Phase::Active, 4.0, 1.0)
            .build()
            .unwrap();
        let records = analyzer().analyze(&recording).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].onset, Onset::NotDetected);
        assert!(records[0].percent_change.unwrap().abs() < 10.0);
    }
    #[test]
    fn immediate_onset_differs_from_none() {
        let detected = Onset::Detected { latency_s: 0.0 };
        assert_ne!(detected, Onset::NotDetected);
        assert_eq!(detected.latency_s(), Some(0.0));
        assert_eq!(Onset::NotDetected.latency_s(), None);
    }
    #[test]
    fn silent_recording_has_undefined_change() {
        let recording = SyntheticBuilder::new(256.0)
            .phase(Phase::Rest, 2.0, 0.0)
            .phase(Phase::Active, 3.0, 0.0)
            .build()
            .unwrap();
        let records = analyzer().analyze(&recording).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].percent_change, None);
        assert_eq!(records[0].onset, Onset::NotDetected);
    }
    #[test]
    fn summary_groups_by_direction() {
        let record = |direction, change, onset| TransitionRecord {
            index: 0,
            time_s: 0.0,
            direction,
            rest_power: 1.0,
            active_power: 1.0,
            percent_change: change,
            onset,
        };
        let records = vec![
            record(TransitionDirection::RestToActive, Some(-40.0), Onset::Detected { latency_s: 0.2 }),
            record(TransitionDirection::RestToActive, Some(-20.0), Onset::NotDetected),
            record(TransitionDirection::ActiveToRest, None, Onset::NotDetected),
        ];
        let summary = summarize(&records);
        assert_eq!(summary.rest_to_active.count, 2);
        assert_eq!(summary.rest_to_active.mean_percent_change, Some(-30.0));
        assert_eq!(summary.rest_to_active.detection_rate, Some(0.5));
        assert_eq!(summary.rest_to_active.mean_latency_s, Some(0.2));
        assert_eq!(summary.active_to_rest.count, 1);
        assert_eq!(summary.active_to_rest.mean_percent_change, None);
        assert_eq!(summary.active_to_rest.detection_rate, Some(0.0));
        assert_eq!(summarize(&[]), TransitionSummary::default());
    }
}
