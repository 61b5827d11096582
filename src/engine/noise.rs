//! Control-side noise source
//!
//! Each start renders a fresh two second loop on the control thread and hands the
//! whole buffer to the renderer, which plays it until told to stop.

use crate::gen::noise::{generate_buffer, NoiseType};
use crate::graph::{Command, CommandSink};
use log::debug;
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Noise bus gain relative to the user volume
pub const NOISE_GAIN_SCALE: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum NoiseState {
    #[default]
    Idle,
    Active(NoiseType),
}

pub struct NoiseGenerator {
    state: NoiseState,
    rng: StdRng,
}

impl NoiseGenerator {
    pub fn new() -> Self {
        Self {
            state: NoiseState::Idle,
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible buffers for a given seed
    pub fn with_seed(seed: u64) -> Self {
        Self {
            state: NoiseState::Idle,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Replace any running noise with a new loop of `kind`
    pub fn start<S: CommandSink>(&mut self, sink: &mut S, kind: NoiseType, volume: f32) {
        self.stop(sink);

        let samples = generate_buffer(kind, sink.sample_rate(), &mut self.rng);
        debug!("Generated {} noise buffer of {} samples", kind, samples.len());

        sink.send(Command::NoiseStart {
            samples,
            gain: volume * NOISE_GAIN_SCALE,
        });
        self.state = NoiseState::Active(kind);
    }

    /// Returns false if no noise was playing
    pub fn stop<S: CommandSink>(&mut self, sink: &mut S) -> bool {
        if self.state == NoiseState::Idle {
            return false;
        }
        sink.send(Command::NoiseStop);
        self.state = NoiseState::Idle;
        true
    }

    pub fn set_volume<S: CommandSink>(&mut self, sink: &mut S, volume: f32) {
        if self.is_active() {
            sink.send(Command::NoiseGain(volume * NOISE_GAIN_SCALE));
        }
    }

    pub fn active_type(&self) -> Option<NoiseType> {
        match self.state {
            NoiseState::Idle => None,
            NoiseState::Active(kind) => Some(kind),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active_type().is_some()
    }
}

impl Default for NoiseGenerator {
    fn default() -> Self {
        Self::new()
    }
}
