use std::collections::BTreeMap;
use std::f64::consts::PI;
use rustfft::{num_complex::Complex64, FftPlanner};
use serde::Serialize;
use crate::processing::bands::BandTable;
use crate::processing::error::{PipelineError, Result};
use crate::processing::signal::MultiChannelSignal;
/// One-sided magnitude spectrum per channel.
#[derive(Clone, Debug, Serialize)]
pub struct FrequencySpectrum {
    pub sample_rate_hz: f64,
    pub frequencies_hz: Vec<f64>,
    pub magnitudes: Vec<Vec<f64>>, // channel -> bins
    pub channel_labels: Vec<String>,
}
impl FrequencySpectrum {
    /// Share of each band in the total (non-DC) spectral power, per channel. Bins are
    /// assigned half-open `[low, high)` so adjacent bands never share one.
    /// Map is band name -> one value per channel.
    pub fn band_powers(&self, table: &BandTable) -> BTreeMap<String, Vec<f64>> {
        let totals: Vec<f64> = self
            .magnitudes
            .iter()
            .map(|bins| bins.iter().skip(1).map(|m| m * m).sum())
            .collect();
        table
            .iter()
            .map(|(name, band)| {
                let shares = self
                    .magnitudes
                    .iter()
                    .zip(&totals)
                    .map(|(bins, &total)| {
                        if total <= 0.0 {
                            return 0.0;
                        }
                        let in_band: f64 = bins
                            .iter()
                            .zip(&self.frequencies_hz)
                            .skip(1)
                            .filter(|(_, f)| band.contains_bin(**f))
                            .map(|(m, _)| m * m)
                            .sum();
                        in_band / total
                    })
                    .collect();
                (name.to_string(), shares)
            })
            .collect()
    }
}
/// Computes Hann-windowed FFTs of a fixed size.
pub struct SpectrumBuilder {
    fft_size: usize,
}
impl SpectrumBuilder {
    pub fn with_size(fft_size: usize) -> Self {
        Self { fft_size }
    }
    /// Spectrum of the most recent `fft_size` samples of every channel. A shorter
    /// signal is tapered over the samples it has, then zero-padded, and magnitudes are
    /// scaled by the gain of that shorter taper.
    pub fn compute(&self, signal: &MultiChannelSignal) -> Result<FrequencySpectrum> {
        let n = self.fft_size;
        if n < 2 {
            return Err(PipelineError::InvalidWindow(format!(
                "FFT size must be at least 2, got {n}"
            )));
        }
        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(n);
        let len = signal.num_samples().min(n);
        let window = hann(len);
        let gain: f64 = window.iter().sum();
        let fs = signal.sample_rate_hz();
        let frequencies = (0..n / 2).map(|k| k as f64 * fs / n as f64).collect();
        let start = signal.num_samples() - len;
        let magnitudes = (0..signal.num_channels())
            .map(|ch| {
                let mut buffer: Vec<Complex64> = signal
                    .channel(ch)
                    .iter()
                    .skip(start)
                    .zip(&window)
                    .map(|(&v, &w)| Complex64::new(v * w, 0.0))
                    .collect();
                buffer.resize(n, Complex64::new(0.0, 0.0));
                fft.process(&mut buffer);
                if gain <= 0.0 {
                    return vec![0.0; n / 2];
                }
                buffer.iter().take(n / 2).map(|c| c.norm() / gain).collect()
            })
            .collect();
        Ok(FrequencySpectrum {
            sample_rate_hz: fs,
            frequencies_hz: frequencies,
            magnitudes,
            channel_labels: signal.layout().names().to_vec(),
        })
    }
}
fn hann(len: usize) -> Vec<f64> {
    match len {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => (0..len)
            .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / (len - 1) as f64).cos())
            .collect(),
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::signal::ChannelLayout;
    fn tone(freq_hz: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * PI * freq_hz * i as f64 / 256.0).sin())
            .collect()
    }
    #[test]
    fn peak_lands_on_tone_bin() {
        let layout = ChannelLayout::new(["C3", "C4"]).unwrap();
        let signal =
            MultiChannelSignal::from_channels(layout, 256.0, vec![tone(10.0, 512), tone(20.0, 512)])
                .unwrap();
        let spectrum = SpectrumBuilder::with_size(256).compute(&signal).unwrap();
        assert_eq!(spectrum.frequencies_hz.len(), 128);
        assert_eq!(spectrum.channel_labels, ["C3", "C4"]);
        let argmax = |bins: &Vec<f64>| {
            bins.iter()
                .enumerate()
                .fold((0, 0.0), |best, (i, &m)| if m > best.1 { (i, m) } else { best })
                .0
        };
        assert_eq!(argmax(&spectrum.magnitudes[0]), 10);
        assert_eq!(argmax(&spectrum.magnitudes[1]), 20);
    }
    #[test]
    fn band_powers_concentrate_on_the_tone() {
        let signal =
            MultiChannelSignal::from_channels(ChannelLayout::new(["Cz"]).unwrap(), 256.0, vec![tone(10.0, 256)])
                .unwrap();
        let spectrum = SpectrumBuilder::with_size(256).compute(&signal).unwrap();
        let powers = spectrum.band_powers(&BandTable::default());
        assert!(powers["mu"][0] > 0.95, "{powers:?}");
        let total: f64 = powers.values().map(|v| v[0]).sum();
        assert!(total <= 1.0 + 1e-9);
    }
    #[test]
    fn silent_and_short_inputs() {
        let signal =
            MultiChannelSignal::from_channels(ChannelLayout::new(["Cz"]).unwrap(), 256.0, vec![vec![0.0; 10]])
                .unwrap();
        let spectrum = SpectrumBuilder::with_size(64).compute(&signal).unwrap();
        assert!(spectrum.magnitudes[0].iter().all(|&m| m == 0.0));
        assert!(spectrum.band_powers(&BandTable::default())["beta"][0] == 0.0);
        assert!(SpectrumBuilder::with_size(0).compute(&signal).is_err());
    }
    #[test]
    fn short_input_is_tapered_before_padding() {
        let full = MultiChannelSignal::from_channels(
            ChannelLayout::new(["Cz"]).unwrap(),
            256.0,
            vec![tone(16.0, 256)],
        )
        .unwrap();
        let short = full.slice(0, 128);
        let full = SpectrumBuilder::with_size(256).compute(&full).unwrap();
        let padded = SpectrumBuilder::with_size(256).compute(&short).unwrap();
        let peak = |bins: &[f64]| bins.iter().cloned().fold(0.0, f64::max);
        assert!((padded.magnitudes[0][16] - peak(&padded.magnitudes[0])).abs() < 1e-12);
        assert!((padded.magnitudes[0][16] - full.magnitudes[0][16]).abs() < 0.01);
        assert!((padded.magnitudes[0][16] - 0.5).abs() < 0.01);
    }
}
