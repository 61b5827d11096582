//! Tap tempo

use crate::effects::tempo_sync::{MAX_BPM, MIN_BPM};
use std::collections::VecDeque;

/// Number of most recent taps averaged
pub const TAP_WINDOW: usize = 4;

/// Turns manual taps into a BPM estimate.
///
/// The window has no idle timeout: a tap after a long pause is still averaged
/// against the older taps until they are pushed out.
#[derive(Debug, Default, Clone)]
pub struct TempoTracker {
    taps: VecDeque<f64>,
}

impl TempoTracker {
    pub fn new() -> Self {
        Self {
            taps: VecDeque::with_capacity(TAP_WINDOW + 1),
        }
    }

    /// Record a tap at `timestamp_ms`.
    ///
    /// Returns the new tempo when at least two taps are held and the averaged
    /// interval gives a rounded BPM inside 40-200. Out-of-range estimates return
    /// `None`, but the tap stays in the window.
    pub fn tap(&mut self, timestamp_ms: f64) -> Option<u32> {
        self.taps.push_back(timestamp_ms);
        while self.taps.len() > TAP_WINDOW {
            self.taps.pop_front();
        }

        if self.taps.len() < 2 {
            return None;
        }

        let intervals: Vec<f64> = self
            .taps
            .iter()
            .zip(self.taps.iter().skip(1))
            .map(|(earlier, later)| later - earlier)
            .collect();
        let average = intervals.iter().sum::<f64>() / intervals.len() as f64;

        let bpm = (60_000.0 / average).round();
        if bpm.is_finite() && bpm >= MIN_BPM as f64 && bpm <= MAX_BPM as f64 {
            Some(bpm as u32)
        } else {
            None
        }
    }

    /// Tap timestamps currently in the window, oldest first
    pub fn taps(&self) -> impl Iterator<Item = f64> + '_ {
        self.taps.iter().copied()
    }

    pub fn tap_count(&self) -> usize {
        self.taps.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steady_taps_give_120() {
        let mut tracker = TempoTracker::new();
        assert_eq!(tracker.tap(0.0), None);
        assert_eq!(tracker.tap(500.0), Some(120));
        assert_eq!(tracker.tap(1000.0), Some(120));
        assert_eq!(tracker.tap(1500.0), Some(120));
    }

    #[test]
    fn test_window_keeps_four_newest() {
        let mut tracker = TempoTracker::new();
        for t in [0.0, 1000.0, 1500.0, 2000.0, 2500.0] {
            tracker.tap(t);
        }
        assert_eq!(tracker.tap_count(), TAP_WINDOW);
        assert_eq!(tracker.taps().next(), Some(1000.0));
    }

    #[test]
    fn test_out_of_range_tap_is_kept() {
        let mut tracker = TempoTracker::new();
        tracker.tap(0.0);
        // 3 s apart is 20 bpm
        assert_eq!(tracker.tap(3000.0), None);
        assert_eq!(tracker.tap_count(), 2);

        // Intervals [3000, 300] average 1650 ms -> 36 bpm, still rejected
        assert_eq!(tracker.tap(3300.0), None);
        // [3000, 300, 300] average 1200 ms -> 50 bpm
        assert_eq!(tracker.tap(3600.0), Some(50));
    }

    #[test]
    fn test_too_fast_is_rejected() {
        let mut tracker = TempoTracker::new();
        tracker.tap(0.0);
        assert_eq!(tracker.tap(100.0), None);
    }

    #[test]
    fn test_rounding() {
        let mut tracker = TempoTracker::new();
        tracker.tap(0.0);
        // 60000 / 460 = 130.43
        assert_eq!(tracker.tap(460.0), Some(130));
    }
}
