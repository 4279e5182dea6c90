use crate::processing::error::{PipelineError, Result};
/// Fixed-capacity FIFO of multi-channel frames backed by one flat arena.
///
/// Pushing into a full ring overwrites the oldest frame. The running sum of squares
/// makes `mean_power` O(1); it is recomputed exactly each time the write position
/// wraps so rounding error cannot accumulate over long sessions.
#[derive(Clone, Debug)]
pub struct FrameRing {
    arena: Vec<f64>,
    channels: usize,
    capacity: usize,
    /// Slot of the oldest frame.
    head: usize,
    len: usize,
    sum_sq: f64,
}
impl FrameRing {
    pub fn new(channels: usize, capacity: usize) -> Result<Self> {
        if channels == 0 || capacity == 0 {
            return Err(PipelineError::InvalidConfig(format!(
                "ring buffer needs at least one channel and one frame, got {channels} x {capacity}"
            )));
        }
        Ok(Self {
            arena: vec![0.0; channels * capacity],
            channels,
            capacity,
            head: 0,
            len: 0,
            sum_sq: 0.0,
        })
    }
    /// Capacity is `round(seconds * sample_rate_hz)` frames.
    pub fn with_duration(channels: usize, sample_rate_hz: f64, seconds: f64) -> Result<Self> {
        if !(sample_rate_hz.is_finite() && sample_rate_hz > 0.0) {
            return Err(PipelineError::InvalidSampleRate);
        }
        Self::new(channels, (sample_rate_hz * seconds).round() as usize)
    }
    pub fn capacity(&self) -> usize {
        self.capacity
    }
    pub fn channels(&self) -> usize {
        self.channels
    }
    pub fn len(&self) -> usize {
        self.len
    }
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
    pub fn is_full(&self) -> bool {
        self.len == self.capacity
    }
    /// Appends `frame`. When the ring was full, the overwritten oldest frame is copied
    /// into `evicted` (if given) and `true` is returned.
    pub fn push(&mut self, frame: &[f64], evicted: Option<&mut [f64]>) -> bool {
        debug_assert_eq!(frame.len(), self.channels);
        let full = self.is_full();
        let slot = if full {
            self.head
        } else {
            (self.head + self.len) % self.capacity
        };
        let range = slot * self.channels..(slot + 1) * self.channels;
        if full {
            let old = &self.arena[range.clone()];
            self.sum_sq -= old.iter().map(|v| v * v).sum::<f64>();
            if let Some(out) = evicted {
                out.copy_from_slice(old);
            }
            self.head = (self.head + 1) % self.capacity;
        } else {
            self.len += 1;
        }
        self.arena[range].copy_from_slice(frame);
        self.sum_sq += frame.iter().map(|v| v * v).sum::<f64>();
        if full && self.head == 0 {
            self.sum_sq = self.arena.iter().map(|v| v * v).sum();
        }
        full
    }
    /// Mean squared value over every stored frame and channel; 0 when empty.
    pub fn mean_power(&self) -> f64 {
        if self.len == 0 {
            return 0.0;
        }
        (self.sum_sq / (self.len * self.channels) as f64).max(0.0)
    }
    /// Frame `index` counted from the oldest.
    pub fn frame(&self, index: usize) -> Option<&[f64]> {
        if index >= self.len {
            return None;
        }
        let slot = (self.head + index) % self.capacity;
        Some(&self.arena[slot * self.channels..(slot + 1) * self.channels])
    }
    pub fn frames(&self) -> impl Iterator<Item = &[f64]> + '_ {
        (0..self.len).filter_map(move |i| self.frame(i))
    }
    pub fn clear(&mut self) {
        self.arena.iter_mut().for_each(|v| *v = 0.0);
        self.head = 0;
        self.len = 0;
        self.sum_sq = 0.0;
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn evicts_oldest_once_full() {
        let mut ring = FrameRing::new(2, 3).unwrap();
        let mut out = [0.0; 2];
        for i in 0..3 {
            assert!(!ring.push(&[i as f64, -(i as f64)], Some(&mut out)));
        }
        assert!(ring.is_full());
        assert!(ring.push(&[3.0, -3.0], Some(&mut out)));
        assert_eq!(out, [0.0, -0.0]);
        assert!(ring.push(&[4.0, -4.0], Some(&mut out)));
        assert_eq!(out, [1.0, -1.0]);
        let frames: Vec<Vec<f64>> = ring.frames().map(|f| f.to_vec()).collect();
        assert_eq!(frames, vec![vec![2.0, -2.0], vec![3.0, -3.0], vec![4.0, -4.0]]);
    }
    #[test]
    fn mean_power_tracks_contents() {
        let mut ring = FrameRing::new(1, 4).unwrap();
        assert_eq!(ring.mean_power(), 0.0);
        ring.push(&[2.0], None);
        ring.push(&[2.0], None);
        assert!((ring.mean_power() - 4.0).abs() < 1e-12);
        for _ in 0..1000 {
            ring.push(&[0.5], None);
        }
        assert!((ring.mean_power() - 0.25).abs() < 1e-12);
        ring.push(&[1.0], None);
        let expected = (0.25 * 3.0 + 1.0) / 4.0;
        assert!((ring.mean_power() - expected).abs() < 1e-12);
    }
    #[test]
    fn clear_empties_the_ring() {
        let mut ring = FrameRing::with_duration(4, 256.0, 0.5).unwrap();
        assert_eq!(ring.capacity(), 128);
        for _ in 0..200 {
            ring.push(&[1.0; 4], None);
        }
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.mean_power(), 0.0);
        assert!(ring.frame(0).is_none());
    }
    #[test]
    fn zero_sized_rings_are_rejected() {
        assert!(FrameRing::new(0, 4).is_err());
        assert!(FrameRing::with_duration(4, 256.0, 0.001).is_err());
        assert!(FrameRing::with_duration(4, 0.0, 1.0).is_err());
    }
}
