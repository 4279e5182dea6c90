//! Offline analysis of one labelled recording: broadband cleanup, per-band
//! REST/ACTIVE features in baseline units, spectral shares and transition dynamics.
use std::collections::BTreeMap;
use log::{info, warn};
use serde::Serialize;
use crate::config::PipelineConfig;
use crate::processing::features::{extract_all_channels, WindowFeatures};
use crate::processing::filter::Preprocessor;
use crate::processing::normalize::{normalize_to_baseline, BaselineStats};
use crate::processing::spectrum::SpectrumBuilder;
use crate::processing::transition::{
    summarize, TransitionAnalyzer, TransitionRecord, TransitionSummary,
};
use crate::processing::{
    FrequencyBand, LabeledSignal, MultiChannelSignal, Phase, PhaseSegment, PipelineError, Result,
};
#[derive(Clone, Debug, Serialize)]
pub struct BandReport {
    pub low_hz: f64,
    pub high_hz: f64,
    pub baseline: BaselineStats,
    /// Mean squared band amplitude per phase, before normalisation.
    pub rest_power: f64,
    pub active_power: Option<f64>,
    pub rest_features: BTreeMap<String, WindowFeatures>,
    pub active_features: Option<BTreeMap<String, WindowFeatures>>,
}
#[derive(Clone, Debug, Serialize)]
pub struct SessionReport {
    pub sample_rate_hz: f64,
    pub duration_s: f64,
    pub channels: Vec<String>,
    pub segments: Vec<PhaseSegment>,
    pub bands: BTreeMap<String, BandReport>,
    /// Phase -> band -> relative spectral power per channel.
    pub spectral_shares: BTreeMap<Phase, BTreeMap<String, Vec<f64>>>,
    pub transitions: Vec<TransitionRecord>,
    pub summary: TransitionSummary,
}
pub fn analyze_session(recording: &LabeledSignal, config: &PipelineConfig) -> Result<SessionReport> {
    config.validate()?;
    let fs = recording.signal().sample_rate_hz();
    if fs != config.sample_rate_hz {
        return Err(PipelineError::InvalidConfig(format!(
            "recording is sampled at {fs} Hz but the configuration expects {} Hz",
            config.sample_rate_hz
        )));
    }
    let cleaned = if config.preprocess.enabled {
        Preprocessor::new(&config.preprocess, fs)?.apply(recording.signal())?
    } else {
        recording.signal().clone()
    };
    let labels = recording.labels().to_vec();
    let filter = config.band_filter()?;
    let mut bands = BTreeMap::new();
    let extracted = filter.extract_bands(&cleaned, &config.bands, &config.analysis_bands)?;
    for (name, band_signal) in extracted {
        let band = config.band(&name)?;
        let split = LabeledSignal::new(band_signal, labels.clone())?;
        let report = band_report(&split, band, config)?;
        info!(
            "{name} [{}, {}] Hz: rest power {:.4}, active power {:?}",
            band.low_hz, band.high_hz, report.rest_power, report.active_power
        );
        bands.insert(name, report);
    }
    let cleaned = LabeledSignal::new(cleaned, labels)?;
    let mut spectral_shares = BTreeMap::new();
    let fft_size = (fs.round() as usize).next_power_of_two();
    for phase in [Phase::Rest, Phase::Active] {
        if let Some(part) = cleaned.phase_signal(phase) {
            let spectrum = SpectrumBuilder::with_size(fft_size).compute(&part)?;
            spectral_shares.insert(phase, spectrum.band_powers(&config.bands));
        }
    }
    let transitions = TransitionAnalyzer::from_config(config)?.analyze(&cleaned)?;
    let summary = summarize(&transitions);
    info!(
        "{} transitions analysed, REST->ACTIVE mean change {:?} %",
        transitions.len(),
        summary.rest_to_active.mean_percent_change
    );
    Ok(SessionReport {
        sample_rate_hz: fs,
        duration_s: cleaned.signal().duration_seconds(),
        channels: cleaned.signal().layout().names().to_vec(),
        segments: cleaned.segments(),
        bands,
        spectral_shares,
        transitions,
        summary,
    })
}
fn band_report(
    split: &LabeledSignal,
    band: FrequencyBand,
    config: &PipelineConfig,
) -> Result<BandReport> {
    let rest = split
        .phase_signal(Phase::Rest)
        .ok_or(PipelineError::InsufficientBaseline {
            required: 2,
            actual: 0,
        })?;
    let active = split.phase_signal(Phase::Active);
    if active.is_none() {
        warn!("recording has no ACTIVE samples; reporting REST only");
    }
    let target = active.as_ref().unwrap_or(&rest);
    let pair = normalize_to_baseline(&rest, target)?;
    let features = |signal: &MultiChannelSignal| extract_all_channels(signal, &config.window);
    Ok(BandReport {
        low_hz: band.low_hz,
        high_hz: band.high_hz,
        rest_power: rest.mean_power(),
        active_power: active.as_ref().map(MultiChannelSignal::mean_power),
        rest_features: features(&pair.reference)?,
        active_features: match active {
            Some(_) => Some(features(&pair.target)?),
            None => None,
        },
        baseline: pair.stats,
    })
}
