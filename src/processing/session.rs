use log::info;
use serde::Serialize;
use crate::processing::detector::{Estimate, OnlineStateDetector};
use crate::processing::error::{PipelineError, Result};
use crate::processing::signal::Phase;
use crate::processing::source::SampleSource;
/// Detector output for one consumed sample.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TimedEstimate {
    pub index: usize,
    pub time_s: f64,
    pub estimate: Estimate,
}
/// Pumps samples from a source through an online detector.
pub struct StreamingSession<S: SampleSource> {
    source: S,
    detector: OnlineStateDetector,
    consumed: usize,
}
impl<S: SampleSource> StreamingSession<S> {
    pub fn new(source: S, detector: OnlineStateDetector) -> Result<Self> {
        check_layout(&source, &detector)?;
        Ok(Self {
            source,
            detector,
            consumed: 0,
        })
    }
    pub fn detector(&self) -> &OnlineStateDetector {
        &self.detector
    }
    pub fn consumed(&self) -> usize {
        self.consumed
    }
    pub fn pump_once(&mut self) -> Result<Option<TimedEstimate>> {
        let Some(sample) = self.source.next_sample()? else {
            return Ok(None);
        };
        let estimate = self.detector.update(&sample)?;
        let index = self.consumed;
        self.consumed += 1;
        Ok(Some(TimedEstimate {
            index,
            time_s: index as f64 / self.detector.sample_rate_hz(),
            estimate,
        }))
    }
    /// Drains the source and returns every estimate.
    pub fn run_to_end(&mut self) -> Result<Vec<TimedEstimate>> {
        let mut out = Vec::new();
        while let Some(estimate) = self.pump_once()? {
            out.push(estimate);
        }
        let active = out
            .iter()
            .filter(|e| e.estimate.is_ready() && e.estimate.state() == Phase::Active)
            .count();
        info!("streamed {} samples, {} flagged ACTIVE", out.len(), active);
        Ok(out)
    }
    /// Starts over with a new source and a cleared detector.
    pub fn restart(&mut self, source: S) -> Result<()> {
        check_layout(&source, &self.detector)?;
        self.source = source;
        self.detector.reset();
        self.consumed = 0;
        Ok(())
    }
}
fn check_layout<S: SampleSource>(source: &S, detector: &OnlineStateDetector) -> Result<()> {
    if source.layout() != detector.layout() {
        return Err(PipelineError::InvalidLayout(format!(
            "source channels {:?} differ from detector channels {:?}",
            source.layout().names(),
            detector.layout().names()
        )));
    }
    Ok(())
}
