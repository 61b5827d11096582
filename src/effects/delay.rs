//! Feedback delay line for the siren send
//!
//! The line returns only its delayed (wet) signal. The siren's dry signal is summed
//! separately by the graph, so there is no mix control here: decay is governed by
//! the feedback gain alone.
//!
//! # Runaway feedback
//!
//! Feedback is accepted up to 2.0 (200 %). Anything above 1.0 makes every echo
//! louder than the one before it, and the loop grows without bound until the
//! source stops and the level overflows. No limiter is applied. This is the
//! self-oscillating dub mode and is intentional, but it can produce dangerously
//! loud output.

use crate::effects::Effect;
use crate::utils::smoother::SmoothedParam;

/// Capacity of the delay buffer in seconds
pub const MAX_DELAY_SECONDS: f32 = 2.0;

/// Largest feedback gain the loop accepts
pub const MAX_FEEDBACK_GAIN: f32 = 2.0;

/// Threshold for flushing denormal numbers to zero
const DENORMAL_THRESHOLD: f32 = 1e-15;

/// Glide times for live parameter changes
const TIME_SMOOTH_MS: f32 = 50.0;
const FEEDBACK_SMOOTH_MS: f32 = 30.0;

/// Delay line with a feedback gain stage wrapped around it
pub struct DelayEffect {
    sample_rate: f32,
    buffer: Vec<f32>,
    write_index: usize,
    time: SmoothedParam,
    feedback: SmoothedParam,
}

impl DelayEffect {
    /// # Arguments
    /// * `sample_rate` - Audio sample rate in Hz
    /// * `time` - Initial delay time in seconds (clamped to 0.0-2.0)
    /// * `feedback` - Initial feedback gain (clamped to 0.0-2.0)
    pub fn new(sample_rate: f32, time: f32, feedback: f32) -> Self {
        let buffer_size = (sample_rate * MAX_DELAY_SECONDS) as usize + 2;

        Self {
            sample_rate,
            buffer: vec![0.0; buffer_size],
            write_index: 0,
            time: SmoothedParam::new(time, 0.0, MAX_DELAY_SECONDS, sample_rate, TIME_SMOOTH_MS),
            feedback: SmoothedParam::new(
                feedback,
                0.0,
                MAX_FEEDBACK_GAIN,
                sample_rate,
                FEEDBACK_SMOOTH_MS,
            ),
        }
    }

    /// Target delay time in seconds
    pub fn time(&self) -> f32 {
        self.time.target()
    }

    /// Target feedback gain
    pub fn feedback(&self) -> f32 {
        self.feedback.target()
    }

    /// Set delay time in seconds (changes are smoothed)
    pub fn set_time(&mut self, seconds: f32) {
        self.time.set_target(seconds);
    }

    /// Set feedback gain (changes are smoothed)
    pub fn set_feedback(&mut self, gain: f32) {
        self.feedback.set_target(gain);
    }
}

impl Effect for DelayEffect {
    fn process(&mut self, input: f32) -> f32 {
        let input = if input.is_finite() { input } else { 0.0 };

        let time = self.time.tick();
        let feedback = self.feedback.tick();

        let buffer_len = self.buffer.len();

        // At least one sample, so the read never lands on the slot being written
        let delay_samples = (time * self.sample_rate).clamp(1.0, (buffer_len - 2) as f32);
        let delay_int = delay_samples as usize;
        let delay_frac = delay_samples - delay_int as f32;

        let read_index_1 = (self.write_index + buffer_len - delay_int) % buffer_len;
        let read_index_2 = (self.write_index + buffer_len - delay_int - 1) % buffer_len;

        let delayed = self.buffer[read_index_1] * (1.0 - delay_frac)
            + self.buffer[read_index_2] * delay_frac;

        let write_sample = input + delayed * feedback;
        let write_sample = if write_sample.abs() < DENORMAL_THRESHOLD {
            0.0
        } else {
            write_sample
        };
        // Only an overflowed loop reaches this
        let write_sample = if write_sample.is_finite() {
            write_sample
        } else {
            0.0
        };

        self.buffer[self.write_index] = write_sample;
        self.write_index = (self.write_index + 1) % buffer_len;

        delayed
    }
}
