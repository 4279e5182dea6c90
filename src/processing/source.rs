use std::collections::VecDeque;
use crate::processing::error::{PipelineError, Result};
use crate::processing::signal::{ChannelLayout, MultiChannelSignal};
/// Something that yields one multi-channel sample at a time, in chronological order.
pub trait SampleSource {
    fn layout(&self) -> &ChannelLayout;
    fn next_sample(&mut self) -> Result<Option<Vec<f64>>>;
}
/// Plays a recorded signal back sample by sample.
pub struct ReplaySource {
    signal: MultiChannelSignal,
    position: usize,
}
impl ReplaySource {
    pub fn new(signal: MultiChannelSignal) -> Self {
        Self {
            signal,
            position: 0,
        }
    }
    pub fn remaining(&self) -> usize {
        self.signal.num_samples() - self.position
    }
}
impl SampleSource for ReplaySource {
    fn layout(&self) -> &ChannelLayout {
        self.signal.layout()
    }
    fn next_sample(&mut self) -> Result<Option<Vec<f64>>> {
        if self.position >= self.signal.num_samples() {
            return Ok(None);
        }
        let sample = self.signal.sample(self.position);
        self.position += 1;
        Ok(Some(sample))
    }
}
/// In-memory queue of samples, useful for tests and hand-fed streams.
pub struct ManualSource {
    layout: ChannelLayout,
    queue: VecDeque<Vec<f64>>,
}
impl ManualSource {
    pub fn new(layout: ChannelLayout, samples: impl IntoIterator<Item = Vec<f64>>) -> Result<Self> {
        let queue: VecDeque<Vec<f64>> = samples.into_iter().collect();
        if let Some(bad) = queue.iter().find(|s| s.len() != layout.len()) {
            return Err(PipelineError::ChannelMismatch {
                expected: layout.len(),
                actual: bad.len(),
            });
        }
        Ok(Self { layout, queue })
    }
    pub fn push(&mut self, sample: Vec<f64>) -> Result<()> {
        if sample.len() != self.layout.len() {
            return Err(PipelineError::ChannelMismatch {
                expected: self.layout.len(),
                actual: sample.len(),
            });
        }
        self.queue.push_back(sample);
        Ok(())
    }
}
impl SampleSource for ManualSource {
    fn layout(&self) -> &ChannelLayout {
        &self.layout
    }
    fn next_sample(&mut self) -> Result<Option<Vec<f64>>> {
        Ok(self.queue.pop_front())
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn replay_yields_samples_in_order() {
        let layout = ChannelLayout::new(["C3", "C4"]).unwrap();
        let signal =
            MultiChannelSignal::from_channels(layout, 10.0, vec![vec![1.0, 2.0], vec![3.0, 4.0]])
                .unwrap();
        let mut source = ReplaySource::new(signal);
        assert_eq!(source.remaining(), 2);
        assert_eq!(source.next_sample().unwrap(), Some(vec![1.0, 3.0]));
        assert_eq!(source.next_sample().unwrap(), Some(vec![2.0, 4.0]));
        assert_eq!(source.next_sample().unwrap(), None);
        assert_eq!(source.remaining(), 0);
    }
    #[test]
    fn manual_source_checks_width() {
        let layout = ChannelLayout::new(["C3", "C4"]).unwrap();
        assert!(ManualSource::new(layout.clone(), vec![vec![1.0]]).is_err());
        let mut source = ManualSource::new(layout, vec![vec![1.0, 2.0]]).unwrap();
        assert!(source.push(vec![1.0, 2.0, 3.0]).is_err());
        source.push(vec![5.0, 6.0]).unwrap();
        assert_eq!(source.next_sample().unwrap(), Some(vec![1.0, 2.0]));
        assert_eq!(source.next_sample().unwrap(), Some(vec![5.0, 6.0]));
        assert!(source.next_sample().unwrap().is_none());
    }
}
