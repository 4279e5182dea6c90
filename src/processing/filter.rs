use std::collections::BTreeMap;
use std::f64::consts::PI;
use log::debug;
use rustfft::num_complex::Complex64;
use crate::config::PreprocessConfig;
use crate::processing::bands::{BandTable, FrequencyBand};
use crate::processing::error::{PipelineError, Result};
use crate::processing::signal::MultiChannelSignal;
/// Largest supported Butterworth order. Higher orders ring badly on narrow EEG bands.
pub const MAX_FILTER_ORDER: usize = 12;
#[derive(Clone, Copy, Debug, PartialEq)]
struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}
impl BiquadCoeffs {
    /// Magnitude response at normalized angular frequency `omega` (rad/sample).
    fn magnitude_at(&self, omega: f64) -> f64 {
        let z1 = Complex64::from_polar(1.0, -omega);
        let z2 = z1 * z1;
        let num = self.b0 + z1 * self.b1 + z2 * self.b2;
        let den = 1.0 + z1 * self.a1 + z2 * self.a2;
        (num / den).norm()
    }
}
#[derive(Clone, Copy, Debug, Default)]
struct BiquadState {
    z1: f64,
    z2: f64,
}
#[derive(Clone, Copy, Debug)]
struct BiquadFilter {
    coeffs: BiquadCoeffs,
    state: BiquadState,
}
impl BiquadFilter {
    fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            state: BiquadState::default(),
        }
    }
    fn process(&mut self, input: f64) -> f64 {
        // Transposed direct form II
        let y = self.coeffs.b0 * input + self.state.z1;
        self.state.z1 = self.coeffs.b1 * input - self.coeffs.a1 * y + self.state.z2;
        self.state.z2 = self.coeffs.b2 * input - self.coeffs.a2 * y;
        y
    }
}
/// Causal cascade of second-order sections. Cloning yields an independent filter
/// with the same coefficients and state.
#[derive(Clone, Debug, Default)]
pub struct FilterChain {
    sections: Vec<BiquadFilter>,
}
impl FilterChain {
    pub fn num_sections(&self) -> usize {
        self.sections.len()
    }
    /// Appends `other`'s sections after this chain's.
    pub fn then(mut self, other: FilterChain) -> Self {
        self.sections.extend(other.sections);
        self
    }
    pub fn process_sample(&mut self, mut value: f64) -> f64 {
        for section in &mut self.sections {
            value = section.process(value);
        }
        value
    }
    /// Clears the delay lines, as if no sample had been seen.
    pub fn reset(&mut self) {
        for section in &mut self.sections {
            section.state = BiquadState::default();
        }
    }
    /// Filters a whole sequence from a zeroed state, leaving `self` untouched.
    pub fn filter(&self, input: &[f64]) -> Vec<f64> {
        let mut chain = self.fresh();
        input.iter().map(|&x| chain.process_sample(x)).collect()
    }
    /// Magnitude response of the whole cascade at `freq_hz`.
    pub fn magnitude_at(&self, freq_hz: f64, sample_rate_hz: f64) -> f64 {
        let omega = 2.0 * PI * freq_hz / sample_rate_hz;
        self.sections
            .iter()
            .map(|s| s.coeffs.magnitude_at(omega))
            .product()
    }
    fn fresh(&self) -> Self {
        let mut chain = self.clone();
        chain.reset();
        chain
    }
}
/// Butterworth band-pass designer. Each channel is filtered independently with a
/// single causal pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BandFilter {
    order: usize,
}
impl Default for BandFilter {
    fn default() -> Self {
        Self {
            order: Self::DEFAULT_ORDER,
        }
    }
}
impl BandFilter {
    pub const DEFAULT_ORDER: usize = 5;
    pub fn new(order: usize) -> Result<Self> {
        if order == 0 || order > MAX_FILTER_ORDER {
            return Err(PipelineError::InvalidConfig(format!(
                "filter order must be in 1..={MAX_FILTER_ORDER}, got {order}"
            )));
        }
        Ok(Self { order })
    }
    pub fn order(&self) -> usize {
        self.order
    }
    /// Designs the band-pass as `order` second-order sections.
    pub fn design(&self, band: FrequencyBand, sample_rate_hz: f64) -> Result<FilterChain> {
        band.validate(sample_rate_hz)?;
        let sections = butterworth_bandpass(self.order, band, sample_rate_hz);
        debug!(
            "designed order-{} band-pass [{}, {}] Hz at {} Hz ({} sections)",
            self.order,
            band.low_hz,
            band.high_hz,
            sample_rate_hz,
            sections.len()
        );
        Ok(FilterChain {
            sections: sections.into_iter().map(BiquadFilter::new).collect(),
        })
    }
    pub fn filter_channel(
        &self,
        samples: &[f64],
        sample_rate_hz: f64,
        band: FrequencyBand,
    ) -> Result<Vec<f64>> {
        Ok(self.design(band, sample_rate_hz)?.filter(samples))
    }
    /// Returns a new signal with every channel band-passed. The input is not modified.
    pub fn filter_signal(
        &self,
        signal: &MultiChannelSignal,
        band: FrequencyBand,
    ) -> Result<MultiChannelSignal> {
        let chain = self.design(band, signal.sample_rate_hz())?;
        Ok(apply_chain(&chain, signal))
    }
    /// Filters `signal` once per requested band name. Each band is computed from the
    /// untouched input with its own filter state.
    pub fn extract_bands<S: AsRef<str>>(
        &self,
        signal: &MultiChannelSignal,
        table: &BandTable,
        names: &[S],
    ) -> Result<BTreeMap<String, MultiChannelSignal>> {
        names
            .iter()
            .map(|name| {
                let name = name.as_ref();
                let band = table.get(name)?;
                Ok((name.to_string(), self.filter_signal(signal, band)?))
            })
            .collect()
    }
}
fn apply_chain(chain: &FilterChain, signal: &MultiChannelSignal) -> MultiChannelSignal {
    signal.map_channels(|src, mut dst| {
        let mut state = chain.fresh();
        for (y, &x) in dst.iter_mut().zip(src.iter()) {
            *y = state.process_sample(x);
        }
    })
}
/// Broadband cleanup applied before band extraction: band-pass plus an optional
/// mains notch.
#[derive(Clone, Debug)]
pub struct Preprocessor {
    chain: FilterChain,
    sample_rate_hz: f64,
}
impl Preprocessor {
    pub fn new(config: &PreprocessConfig, sample_rate_hz: f64) -> Result<Self> {
        let bandpass = BandFilter::new(config.order)?.design(
            FrequencyBand::new(config.low_hz, config.high_hz),
            sample_rate_hz,
        )?;
        let chain = match config.notch_hz {
            Some(freq_hz) => bandpass.then(notch(freq_hz, config.notch_q, sample_rate_hz)?),
            None => bandpass,
        };
        Ok(Self {
            chain,
            sample_rate_hz,
        })
    }
    pub fn chain(&self) -> &FilterChain {
        &self.chain
    }
    pub fn apply(&self, signal: &MultiChannelSignal) -> Result<MultiChannelSignal> {
        if signal.sample_rate_hz() != self.sample_rate_hz {
            return Err(PipelineError::InvalidConfig(format!(
                "preprocessor built for {} Hz, signal is {} Hz",
                self.sample_rate_hz,
                signal.sample_rate_hz()
            )));
        }
        Ok(apply_chain(&self.chain, signal))
    }
}
/// Second-order IIR notch with -3 dB bandwidth `freq_hz / q`.
pub fn notch(freq_hz: f64, q: f64, sample_rate_hz: f64) -> Result<FilterChain> {
    let nyquist = sample_rate_hz * 0.5;
    if !(freq_hz > 0.0 && freq_hz < nyquist) || !(q > 0.0 && q.is_finite()) {
        return Err(PipelineError::InvalidConfig(format!(
            "notch at {freq_hz} Hz (q = {q}) is not realisable below nyquist {nyquist} Hz"
        )));
    }
    let w0 = 2.0 * PI * freq_hz / sample_rate_hz;
    let beta = (w0 / q / 2.0).tan();
    let gain = 1.0 / (1.0 + beta);
    let cos_w0 = w0.cos();
    let coeffs = BiquadCoeffs {
        b0: gain,
        b1: -2.0 * gain * cos_w0,
        b2: gain,
        a1: -2.0 * gain * cos_w0,
        a2: 2.0 * gain - 1.0,
    };
    Ok(FilterChain {
        sections: vec![BiquadFilter::new(coeffs)],
    })
}
/// Bilinear-transformed Butterworth band-pass split into `order` sections, each with
/// zeros at z = 1 and z = -1 and unity gain at the band centre.
fn butterworth_bandpass(order: usize, band: FrequencyBand, sample_rate_hz: f64) -> Vec<BiquadCoeffs> {
    let k = 2.0 * sample_rate_hz;
    let warp = |f: f64| k * (PI * f / sample_rate_hz).tan();
    let (wl, wh) = (warp(band.low_hz), warp(band.high_hz));
    let w0 = (wl * wh).sqrt();
    let bw = wh - wl;
    let n = order as f64;
    let mut complex_poles = Vec::with_capacity(order);
    let mut real_poles = Vec::with_capacity(2);
    for i in 0..order {
        let theta = PI * (2.0 * i as f64 + n + 1.0) / (2.0 * n);
        let proto = Complex64::from_polar(1.0, theta);
        let half = proto * (bw * 0.5);
        let root = (half * half - w0 * w0).sqrt();
        for s in [half + root, half - root] {
            let z = (k + s) / (k - s);
            if z.im.abs() <= 1e-12 {
                real_poles.push(z.re);
            } else if z.im > 0.0 {
                complex_poles.push(z);
            }
        }
    }
    let center = 2.0 * (w0 / k).atan();
    let mut sections: Vec<BiquadCoeffs> = complex_poles
        .into_iter()
        .map(|p| section(-2.0 * p.re, p.norm_sqr(), center))
        .collect();
    for pair in real_poles.chunks(2) {
        if let [r1, r2] = pair {
            sections.push(section(-(r1 + r2), r1 * r2, center));
        }
    }
    sections
}
fn section(a1: f64, a2: f64, center: f64) -> BiquadCoeffs {
    let raw = BiquadCoeffs {
        b0: 1.0,
        b1: 0.0,
        b2: -1.0,
        a1,
        a2,
    };
    let gain = 1.0 / raw.magnitude_at(center);
    BiquadCoeffs {
        b0: gain,
        b1: 0.0,
        b2: -gain,
        ..raw
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::signal::ChannelLayout;
    fn sine(freq_hz: f64, amplitude: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| amplitude * (2.0 * PI * freq_hz * i as f64 / fs).sin())
            .collect()
    }
    fn four_channel(fs: f64, n: usize) -> MultiChannelSignal {
        let channels = (0..4)
            .map(|c| sine(10.0 + c as f64, 1.0, fs, n))
            .collect();
        MultiChannelSignal::from_channels(ChannelLayout::muse(), fs, channels).unwrap()
    }
    #[test]
    fn design_produces_one_section_per_order() {
        for order in 1..=8 {
            let chain = BandFilter::new(order)
                .unwrap()
                .design(FrequencyBand::new(8.0, 13.0), 256.0)
                .unwrap();
            assert_eq!(chain.num_sections(), order);
        }
        let wide = BandFilter::new(5)
            .unwrap()
            .design(FrequencyBand::new(0.5, 4.0), 256.0)
            .unwrap();
        assert_eq!(wide.num_sections(), 5);
    }
    #[test]
    fn mu_filter_passes_centre_and_rejects_far_bands() {
        let chain = BandFilter::default()
            .design(FrequencyBand::new(8.0, 13.0), 256.0)
            .unwrap();
        let centre = (8.0f64 * 13.0).sqrt();
        assert!((chain.magnitude_at(centre, 256.0) - 1.0).abs() < 1e-6);
        assert!((chain.magnitude_at(8.0, 256.0) - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-3);
        assert!((chain.magnitude_at(13.0, 256.0) - std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-3);
        assert!(chain.magnitude_at(2.0, 256.0) < 1e-3);
        assert!(chain.magnitude_at(40.0, 256.0) < 1e-3);
    }
    #[test]
    fn filtered_sine_settles_to_input_amplitude() {
        let fs = 256.0;
        let input = sine(10.0, 2.0, fs, 2048);
        let output = BandFilter::default()
            .filter_channel(&input, fs, FrequencyBand::new(8.0, 13.0))
            .unwrap();
        let tail = &output[1024..];
        let peak = tail.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
        assert!((peak - 2.0).abs() < 0.1, "peak {peak}");
        let rejected = BandFilter::default()
            .filter_channel(&sine(40.0, 2.0, fs, 2048), fs, FrequencyBand::new(8.0, 13.0))
            .unwrap();
        let leak = rejected[1024..].iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
        assert!(leak < 0.01, "leak {leak}");
    }
    #[test]
    fn filtering_preserves_shape_and_input() {
        let signal = four_channel(256.0, 300);
        let snapshot = signal.clone();
        let filtered = BandFilter::default()
            .filter_signal(&signal, FrequencyBand::new(8.0, 13.0))
            .unwrap();
        assert_eq!(signal, snapshot);
        assert_eq!(filtered.data().dim(), signal.data().dim());
        assert_eq!(filtered.layout(), signal.layout());
        assert_ne!(filtered, signal);
    }
    #[test]
    fn channels_are_filtered_independently() {
        let fs = 256.0;
        let mut channels = vec![vec![0.0; 512]; 4];
        channels[1] = sine(10.0, 1.0, fs, 512);
        let signal = MultiChannelSignal::from_channels(ChannelLayout::muse(), fs, channels).unwrap();
        let filtered = BandFilter::default()
            .filter_signal(&signal, FrequencyBand::new(8.0, 13.0))
            .unwrap();
        assert!(filtered.channel(0).iter().all(|&v| v == 0.0));
        assert!(filtered.channel(1).iter().any(|&v| v != 0.0));
    }
    #[test]
    fn out_of_range_band_is_rejected() {
        let signal = four_channel(256.0, 64);
        let err = BandFilter::default()
            .filter_signal(&signal, FrequencyBand::new(0.0, 200.0))
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidBand { .. }));
        assert!(BandFilter::new(0).is_err());
    }
    #[test]
    fn extract_bands_returns_each_requested_band() {
        let signal = four_channel(256.0, 256);
        let bands = BandFilter::default()
            .extract_bands(&signal, &BandTable::default(), &["mu", "beta"])
            .unwrap();
        assert_eq!(bands.keys().collect::<Vec<_>>(), vec!["beta", "mu"]);
        let mu_alone = BandFilter::default()
            .filter_signal(&signal, FrequencyBand::new(8.0, 13.0))
            .unwrap();
        assert_eq!(bands["mu"], mu_alone);
        let err = BandFilter::default()
            .extract_bands(&signal, &BandTable::default(), &["mu", "alpah"])
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnknownBand { .. }));
    }
    #[test]
    fn notch_removes_mains() {
        let fs = 256.0;
        let chain = notch(60.0, 30.0, fs).unwrap();
        assert!(chain.magnitude_at(60.0, fs) < 1e-6);
        assert!((chain.magnitude_at(10.0, fs) - 1.0).abs() < 1e-2);
        assert!(notch(200.0, 30.0, fs).is_err());
    }
    #[test]
    fn preprocessor_keeps_shape() {
        let signal = four_channel(256.0, 512);
        let pre = Preprocessor::new(&PreprocessConfig::default(), 256.0).unwrap();
        assert_eq!(pre.chain().num_sections(), PreprocessConfig::default().order + 1);
        let cleaned = pre.apply(&signal).unwrap();
        assert_eq!(cleaned.data().dim(), signal.data().dim());
        let other_rate = four_channel(512.0, 16);
        assert!(pre.apply(&other_rate).is_err());
    }
    #[test]
    fn reset_restores_zero_state() {
        let mut chain = BandFilter::default()
            .design(FrequencyBand::new(8.0, 13.0), 256.0)
            .unwrap();
        let first: Vec<f64> = (0..32).map(|i| chain.process_sample(i as f64)).collect();
        chain.reset();
        let second: Vec<f64> = (0..32).map(|i| chain.process_sample(i as f64)).collect();
        assert_eq!(first, second);
    }
}
