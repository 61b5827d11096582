//! One-pole parameter smoothing for the render thread
//!
//! Every live parameter that reaches the audio thread (bus gains, pan, tone
//! frequency, delay time, feedback) goes through a `SmoothedParam` so that a step
//! from the control thread turns into a short exponential glide instead of a click.

/// Default smoothing time in milliseconds
pub const DEFAULT_SMOOTH_TIME_MS: f32 = 15.0;

/// Distance, relative to the target (or 1.0 for small targets), below which the
/// smoother snaps onto its target
const SETTLE_EPSILON: f32 = 1e-6;

/// A smoothed, range-limited parameter
#[derive(Clone, Debug)]
pub struct SmoothedParam {
    current: f32,
    target: f32,
    /// One-pole coefficient (0-1, higher = faster)
    coeff: f32,
    settled: bool,
    min: f32,
    max: f32,
}

impl SmoothedParam {
    /// Create a new smoothed parameter
    ///
    /// # Arguments
    /// * `initial_value` - Starting value (clamped to `min..=max`)
    /// * `min` - Minimum allowed value
    /// * `max` - Maximum allowed value
    /// * `sample_rate` - Audio sample rate in Hz
    /// * `smooth_time_ms` - Time constant in milliseconds, 0 disables smoothing
    pub fn new(initial_value: f32, min: f32, max: f32, sample_rate: f32, smooth_time_ms: f32) -> Self {
        let clamped = initial_value.clamp(min, max);
        Self {
            current: clamped,
            target: clamped,
            coeff: Self::calculate_coeff(sample_rate, smooth_time_ms),
            settled: true,
            min,
            max,
        }
    }

    fn calculate_coeff(sample_rate: f32, smooth_time_ms: f32) -> f32 {
        if smooth_time_ms <= 0.0 || sample_rate <= 0.0 {
            return 1.0;
        }
        let tau_samples = (smooth_time_ms / 1000.0) * sample_rate;
        1.0 - (-1.0 / tau_samples).exp()
    }

    /// Glide towards a new value. Non-finite targets are ignored.
    pub fn set_target(&mut self, target: f32) {
        if !target.is_finite() {
            return;
        }
        let clamped = target.clamp(self.min, self.max);
        if (self.target - clamped).abs() > 1e-8 {
            self.target = clamped;
            self.settled = false;
        }
    }

    /// Jump to a value without gliding
    pub fn set_immediate(&mut self, value: f32) {
        if !value.is_finite() {
            return;
        }
        let clamped = value.clamp(self.min, self.max);
        self.current = clamped;
        self.target = clamped;
        self.settled = true;
    }

    /// Advance one sample and return the smoothed value
    #[inline]
    pub fn tick(&mut self) -> f32 {
        if self.settled {
            return self.current;
        }

        let next = self.current + self.coeff * (self.target - self.current);
        let tolerance = SETTLE_EPSILON * self.target.abs().max(1.0);

        // A step too small to change the f32 value would stall short of the target
        if next == self.current || (next - self.target).abs() < tolerance {
            self.current = self.target;
            self.settled = true;
        } else {
            self.current = next;
        }

        self.current
    }

    #[inline]
    pub fn get(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn is_settled(&self) -> bool {
        self.settled
    }

    pub fn range(&self) -> (f32, f32) {
        (self.min, self.max)
    }
}
