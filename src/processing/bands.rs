use std::collections::BTreeMap;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use crate::processing::error::{PipelineError, Result};
/// Closed frequency interval `[low_hz, high_hz]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBand {
    pub low_hz: f64,
    pub high_hz: f64,
}
impl FrequencyBand {
    pub const fn new(low_hz: f64, high_hz: f64) -> Self {
        Self { low_hz, high_hz }
    }
    /// Checks `0 < low < high < nyquist`, i.e. both normalized cutoffs sit strictly
    /// inside (0, 1).
    pub fn validate(&self, sample_rate_hz: f64) -> Result<()> {
        if !(sample_rate_hz.is_finite() && sample_rate_hz > 0.0) {
            return Err(PipelineError::InvalidSampleRate);
        }
        let nyquist = sample_rate_hz * 0.5;
        let low = self.low_hz / nyquist;
        let high = self.high_hz / nyquist;
        let inside = |w: f64| w.is_finite() && w > 0.0 && w < 1.0;
        if !(inside(low) && inside(high) && low < high) {
            return Err(PipelineError::InvalidBand {
                low: self.low_hz,
                high: self.high_hz,
                nyquist,
            });
        }
        Ok(())
    }
    /// Half-open `[low, high)` membership, so adjacent bands never share a bin.
    pub fn contains_bin(&self, freq_hz: f64) -> bool {
        freq_hz >= self.low_hz && freq_hz < self.high_hz
    }
}
static CANONICAL_BANDS: Lazy<BTreeMap<String, FrequencyBand>> = Lazy::new(|| {
    [
        ("delta", FrequencyBand::new(0.5, 4.0)),
        ("theta", FrequencyBand::new(4.0, 8.0)),
        ("mu", FrequencyBand::new(8.0, 13.0)),
        ("beta", FrequencyBand::new(13.0, 30.0)),
        ("gamma", FrequencyBand::new(30.0, 100.0)),
    ]
    .into_iter()
    .map(|(name, band)| (name.to_string(), band))
    .collect()
});
/// Named band lookup. Defaults to the canonical EEG rhythms.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BandTable {
    bands: BTreeMap<String, FrequencyBand>,
}
impl Default for BandTable {
    fn default() -> Self {
        Self {
            bands: CANONICAL_BANDS.clone(),
        }
    }
}
impl BandTable {
    pub fn insert(&mut self, name: impl Into<String>, band: FrequencyBand) -> Option<FrequencyBand> {
        self.bands.insert(name.into(), band)
    }
    pub fn get(&self, name: &str) -> Result<FrequencyBand> {
        self.bands
            .get(name)
            .copied()
            .ok_or_else(|| PipelineError::UnknownBand {
                name: name.to_string(),
                available: self.names().collect::<Vec<_>>().join(", "),
            })
    }
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bands.keys().map(String::as_str)
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FrequencyBand)> {
        self.bands.iter().map(|(k, v)| (k.as_str(), v))
    }
    pub fn len(&self) -> usize {
        self.bands.len()
    }
    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }
    /// Validates every band against the sample rate.
    pub fn validate(&self, sample_rate_hz: f64) -> Result<()> {
        self.bands
            .values()
            .try_for_each(|band| band.validate(sample_rate_hz))
    }
}
