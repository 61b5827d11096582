//! Engine start-up settings

use crate::effects::tempo_sync::DelayParameters;
use crate::engine::tone::ToneParameters;

pub const DEFAULT_SAMPLE_RATE: f32 = 44100.0;
pub const DEFAULT_COMMAND_CAPACITY: usize = 1024;

/// Settings applied when an [`Engine`](crate::engine::Engine) is built.
///
/// The sample rate is only a request; the output device may run at another
/// rate, and everything downstream uses whatever the device reports.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub sample_rate: f32,
    /// Slots in the control to render command queue
    pub command_capacity: usize,
    /// Fixed seed for the noise generator, entropy when `None`
    pub noise_seed: Option<u64>,
    pub tone: ToneParameters,
    pub delay: DelayParameters,
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sample_rate(mut self, sample_rate: f32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_command_capacity(mut self, capacity: usize) -> Self {
        self.command_capacity = capacity;
        self
    }

    pub fn with_noise_seed(mut self, seed: u64) -> Self {
        self.noise_seed = Some(seed);
        self
    }

    pub fn with_tone(mut self, tone: ToneParameters) -> Self {
        self.tone = tone;
        self
    }

    pub fn with_delay(mut self, delay: DelayParameters) -> Self {
        self.delay = delay;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            command_capacity: DEFAULT_COMMAND_CAPACITY,
            noise_seed: None,
            tone: ToneParameters::default(),
            delay: DelayParameters::default(),
        }
    }
}
