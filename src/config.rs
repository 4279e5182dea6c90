use std::fs;
use std::path::Path;
use log::debug;
use serde::{Deserialize, Serialize};
use crate::processing::bands::{BandTable, FrequencyBand};
use crate::processing::error::{PipelineError, Result};
use crate::processing::features::WindowSpec;
use crate::processing::filter::{BandFilter, Preprocessor, MAX_FILTER_ORDER};
use crate::processing::signal::ChannelLayout;
/// Everything the processing core accepts from the acquisition side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_sample_rate")]
    pub sample_rate_hz: f64,
    #[serde(default = "ChannelLayout::muse")]
    pub channels: ChannelLayout,
    #[serde(default = "default_filter_order")]
    pub filter_order: usize,
    #[serde(default)]
    pub bands: BandTable,
    /// Bands extracted by the offline session analysis.
    #[serde(default = "default_analysis_bands")]
    pub analysis_bands: Vec<String>,
    #[serde(default)]
    pub preprocess: PreprocessConfig,
    #[serde(default)]
    pub window: WindowSpec,
    #[serde(default)]
    pub transition: TransitionConfig,
    pub detector: DetectorConfig,
}
fn default_sample_rate() -> f64 {
    256.0
}
fn default_filter_order() -> usize {
    BandFilter::DEFAULT_ORDER
}
fn default_analysis_bands() -> Vec<String> {
    vec!["mu".into(), "beta".into()]
}
fn default_band_name() -> String {
    "mu".into()
}
/// Broadband cleanup run before band extraction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    pub enabled: bool,
    pub low_hz: f64,
    pub high_hz: f64,
    pub order: usize,
    /// Mains frequency to notch out; `None` disables the notch.
    pub notch_hz: Option<f64>,
    pub notch_q: f64,
}
impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            low_hz: 1.0,
            high_hz: 50.0,
            order: 5,
            notch_hz: Some(60.0),
            notch_q: 30.0,
        }
    }
}
/// Window geometry and onset search around label transitions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionConfig {
    pub band: String,
    pub before_s: f64,
    pub after_s: f64,
    pub onset: OnsetConfig,
}
impl Default for TransitionConfig {
    fn default() -> Self {
        Self {
            band: default_band_name(),
            before_s: 1.0,
            after_s: 2.0,
            onset: OnsetConfig::default(),
        }
    }
}
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnsetConfig {
    pub sub_window_s: f64,
    pub step_s: f64,
    /// Percentage change (negative = desynchronisation) that marks the onset.
    pub threshold_pct: f64,
}
impl Default for OnsetConfig {
    fn default() -> Self {
        Self {
            sub_window_s: 0.05,
            step_s: 0.025,
            threshold_pct: -10.0,
        }
    }
}
/// Online detector tuning. The ERD threshold is participant specific and has no
/// default.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    #[serde(default = "default_band_name")]
    pub band: String,
    #[serde(default = "default_baseline_s")]
    pub baseline_s: f64,
    #[serde(default = "default_detection_s")]
    pub detection_s: f64,
    /// Relative power change below which the state flips to ACTIVE, e.g. -0.2.
    pub erd_threshold: f64,
}
fn default_baseline_s() -> f64 {
    2.0
}
fn default_detection_s() -> f64 {
    0.5
}
impl DetectorConfig {
    pub fn new(erd_threshold: f64) -> Self {
        Self {
            band: default_band_name(),
            baseline_s: default_baseline_s(),
            detection_s: default_detection_s(),
            erd_threshold,
        }
    }
    pub fn validate(&self) -> Result<()> {
        positive("detector.baseline_s", self.baseline_s)?;
        positive("detector.detection_s", self.detection_s)?;
        if self.detection_s >= self.baseline_s {
            return Err(PipelineError::InvalidConfig(format!(
                "detector.detection_s ({}) must be shorter than detector.baseline_s ({})",
                self.detection_s, self.baseline_s
            )));
        }
        if !(self.erd_threshold < 0.0 && self.erd_threshold > -1.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "detector.erd_threshold must lie in (-1, 0), got {}",
                self.erd_threshold
            )));
        }
        Ok(())
    }
}
impl PipelineConfig {
    /// Defaults everywhere except the mandatory detector threshold.
    pub fn with_threshold(erd_threshold: f64) -> Self {
        Self {
            sample_rate_hz: default_sample_rate(),
            channels: ChannelLayout::muse(),
            filter_order: default_filter_order(),
            bands: BandTable::default(),
            analysis_bands: default_analysis_bands(),
            preprocess: PreprocessConfig::default(),
            window: WindowSpec::default(),
            transition: TransitionConfig::default(),
            detector: DetectorConfig::new(erd_threshold),
        }
    }
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("loading pipeline config from {}", path.display());
        Self::from_json_str(&fs::read_to_string(path)?)
    }
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
    pub fn band_filter(&self) -> Result<BandFilter> {
        BandFilter::new(self.filter_order)
    }
    pub fn band(&self, name: &str) -> Result<FrequencyBand> {
        self.bands.get(name)
    }
    pub fn validate(&self) -> Result<()> {
        let fs = self.sample_rate_hz;
        if !(fs.is_finite() && fs > 0.0) {
            return Err(PipelineError::InvalidSampleRate);
        }
        if self.filter_order == 0 || self.filter_order > MAX_FILTER_ORDER {
            return Err(PipelineError::InvalidConfig(format!(
                "filter_order must be in 1..={MAX_FILTER_ORDER}, got {}",
                self.filter_order
            )));
        }
        self.bands.validate(fs)?;
        for name in &self.analysis_bands {
            self.bands.get(name)?;
        }
        if self.preprocess.enabled {
            Preprocessor::new(&self.preprocess, fs)?;
        }
        self.window.resolve(fs)?;
        self.bands.get(&self.transition.band)?;
        positive("transition.before_s", self.transition.before_s)?;
        positive("transition.after_s", self.transition.after_s)?;
        let onset = &self.transition.onset;
        positive("transition.onset.sub_window_s", onset.sub_window_s)?;
        positive("transition.onset.step_s", onset.step_s)?;
        if onset.sub_window_s > self.transition.after_s {
            return Err(PipelineError::InvalidConfig(
                "transition.onset.sub_window_s exceeds transition.after_s".into(),
            ));
        }
        if !(onset.threshold_pct < 0.0) {
            return Err(PipelineError::InvalidConfig(format!(
                "transition.onset.threshold_pct must be negative, got {}",
                onset.threshold_pct
            )));
        }
        self.bands.get(&self.detector.band)?;
        self.detector.validate()
    }
}
fn positive(field: &str, value: f64) -> Result<()> {
    if !(value.is_finite() && value > 0.0) {
        return Err(PipelineError::InvalidConfig(format!(
            "{field} must be positive, got {value}"
        )));
    }
    Ok(())
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn minimal_json_fills_defaults() {
        let config =
            PipelineConfig::from_json_str(r#"{ "detector": { "erd_threshold": -0.2 } }"#).unwrap();
        assert_eq!(config, PipelineConfig::with_threshold(-0.2));
        assert_eq!(config.channels.names(), ["TP9", "AF7", "AF8", "TP10"]);
        assert_eq!(config.band("mu").unwrap(), FrequencyBand::new(8.0, 13.0));
    }
    #[test]
    fn threshold_is_mandatory() {
        let err = PipelineConfig::from_json_str(r#"{ "detector": {} }"#).unwrap_err();
        assert!(matches!(err, PipelineError::Json(_)));
        let err = PipelineConfig::from_json_str("{}").unwrap_err();
        assert!(matches!(err, PipelineError::Json(_)));
    }
    #[test]
    fn round_trips_through_json() {
        let mut config = PipelineConfig::with_threshold(-0.3);
        config.bands.insert("alpha", FrequencyBand::new(8.0, 12.0));
        config.analysis_bands.push("alpha".into());
        let json = config.to_json_pretty().unwrap();
        assert_eq!(PipelineConfig::from_json_str(&json).unwrap(), config);
    }
    #[test]
    fn invalid_values_are_reported() {
        let cases = [
            r#"{ "sample_rate_hz": 0, "detector": { "erd_threshold": -0.2 } }"#,
            r#"{ "detector": { "erd_threshold": 0.2 } }"#,
            r#"{ "detector": { "erd_threshold": -0.2, "baseline_s": 0.5, "detection_s": 1.0 } }"#,
            r#"{ "analysis_bands": ["alpah"], "detector": { "erd_threshold": -0.2 } }"#,
            r#"{ "window": { "duration_s": 1.0, "overlap": 1.0 }, "detector": { "erd_threshold": -0.2 } }"#,
            r#"{ "sample_rate_hz": 128, "detector": { "erd_threshold": -0.2 } }"#,
            r#"{ "channels": ["TP9", "TP9"], "detector": { "erd_threshold": -0.2 } }"#,
            r#"{ "transition": { "onset": { "threshold_pct": 5.0 } }, "detector": { "erd_threshold": -0.2 } }"#,
        ];
        for json in cases {
            assert!(PipelineConfig::from_json_str(json).is_err(), "accepted {json}");
        }
    }
    #[test]
    fn preprocess_order_and_notch_are_checked() {
        let cases = [
            r#"{ "preprocess": { "order": 0 }, "detector": { "erd_threshold": -0.2 } }"#,
            r#"{ "preprocess": { "order": 13 }, "detector": { "erd_threshold": -0.2 } }"#,
            r#"{ "preprocess": { "notch_hz": 200.0 }, "detector": { "erd_threshold": -0.2 } }"#,
            r#"{ "preprocess": { "notch_q": 0.0 }, "detector": { "erd_threshold": -0.2 } }"#,
        ];
        for json in cases {
            assert!(
                matches!(
                    PipelineConfig::from_json_str(json),
                    Err(PipelineError::InvalidConfig(_))
                ),
                "accepted {json}"
            );
        }
        let disabled = r#"{ "preprocess": { "enabled": false, "order": 0, "notch_hz": 200.0 },
            "detector": { "erd_threshold": -0.2 } }"#;
        assert!(PipelineConfig::from_json_str(disabled).is_ok());
        let no_notch = r#"{ "preprocess": { "notch_hz": null }, "detector": { "erd_threshold": -0.2 } }"#;
        assert!(PipelineConfig::from_json_str(no_notch).is_ok());
    }
    #[test]
    fn missing_file_is_an_io_error() {
        let err = PipelineConfig::from_json_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
    }
}
