use crate::gen::waveform::Waveform;
use crate::utils::smoother::SmoothedParam;
use std::f32::consts::PI;

/// Upper bound on partials summed for the band-limited shapes
const MAX_HARMONICS: usize = 32;

/// Highest frequency the oscillator accepts
pub const MAX_OSCILLATOR_HZ: f32 = 20_000.0;

/// Glide time for live frequency changes
const FREQUENCY_SMOOTH_MS: f32 = 5.0;

/// Phase-accumulating oscillator with additive, band-limited square, sawtooth and
/// triangle shapes.
///
/// Frequency changes never reset the phase, so retuning a running oscillator is
/// continuous. Partials above Nyquist are skipped.
pub struct Oscillator {
    sample_rate: f32,
    pub waveform: Waveform,
    /// Normalised phase, 0.0..1.0
    phase: f32,
    frequency: SmoothedParam,
    enabled: bool,
}

impl Oscillator {
    pub fn new(sample_rate: f32, frequency_hz: f32, waveform: Waveform) -> Self {
        Self {
            sample_rate,
            waveform,
            phase: 0.0,
            frequency: SmoothedParam::new(
                frequency_hz,
                0.0,
                MAX_OSCILLATOR_HZ,
                sample_rate,
                FREQUENCY_SMOOTH_MS,
            ),
            enabled: false,
        }
    }

    /// Begin generating from phase zero at the given frequency
    pub fn start(&mut self, frequency_hz: f32, waveform: Waveform) {
        self.waveform = waveform;
        self.frequency.set_immediate(frequency_hz);
        self.phase = 0.0;
        self.enabled = true;
    }

    pub fn stop(&mut self) {
        self.enabled = false;
    }

    /// Glide to a new frequency
    pub fn set_frequency(&mut self, frequency_hz: f32) {
        self.frequency.set_target(frequency_hz);
    }

    /// Jump to a new frequency, used when an automation curve already supplies
    /// a per-sample value
    pub fn set_frequency_immediate(&mut self, frequency_hz: f32) {
        self.frequency.set_immediate(frequency_hz);
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    pub fn frequency(&self) -> f32 {
        self.frequency.target()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn partial_count(&self, frequency_hz: f32) -> usize {
        if frequency_hz <= 0.0 {
            return MAX_HARMONICS;
        }
        let below_nyquist = (self.sample_rate * 0.5 / frequency_hz) as usize;
        below_nyquist.clamp(1, MAX_HARMONICS)
    }

    fn square(&self, theta: f32, partials: usize) -> f32 {
        let mut output = 0.0;
        for k in (1..=partials).step_by(2) {
            let k = k as f32;
            output += (k * theta).sin() / k;
        }
        output * 4.0 / PI
    }

    fn sawtooth(&self, theta: f32, partials: usize) -> f32 {
        let mut output = 0.0;
        for k in 1..=partials {
            let sign = if k % 2 == 1 { 1.0 } else { -1.0 };
            let k = k as f32;
            output += sign * (k * theta).sin() / k;
        }
        output * 2.0 / PI
    }

    fn triangle(&self, theta: f32, partials: usize) -> f32 {
        let mut output = 0.0;
        for (n, k) in (1..=partials).step_by(2).enumerate() {
            let sign = if n % 2 == 0 { 1.0 } else { -1.0 };
            let k = k as f32;
            output += sign * (k * theta).sin() / (k * k);
        }
        output * 8.0 / (PI * PI)
    }

    /// Generate one sample and advance the phase
    pub fn tick(&mut self) -> f32 {
        if !self.enabled {
            return 0.0;
        }

        let frequency_hz = self.frequency.tick();
        let theta = 2.0 * PI * self.phase;
        let partials = self.partial_count(frequency_hz);

        let output = match self.waveform {
            Waveform::Sine => theta.sin(),
            Waveform::Square => self.square(theta, partials),
            Waveform::Sawtooth => self.sawtooth(theta, partials),
            Waveform::Triangle => self.triangle(theta, partials),
        };

        self.phase += frequency_hz / self.sample_rate;
        self.phase -= self.phase.floor();

        output
    }
}
