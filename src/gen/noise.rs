//! Noise buffer synthesis
//!
//! Each noise colour is rendered once into a two second buffer which the render
//! thread then loops. A fresh buffer is generated on every start.

use crate::gen::pink_noise::PinkNoise;
use rand::Rng;
use std::f32::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Length of a generated noise loop
pub const NOISE_BUFFER_SECONDS: f32 = 2.0;

/// Carrier of the green noise tone
pub const GREEN_NOISE_HZ: f32 = 528.0;

/// Leaky integrator gain applied after brown noise generation
const BROWN_MAKEUP_GAIN: f32 = 3.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoiseType {
    #[default]
    White,
    Pink,
    Brown,
    Green,
}

impl NoiseType {
    pub const ALL: [NoiseType; 4] = [
        NoiseType::White,
        NoiseType::Pink,
        NoiseType::Brown,
        NoiseType::Green,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NoiseType::White => "white",
            NoiseType::Pink => "pink",
            NoiseType::Brown => "brown",
            NoiseType::Green => "green",
        }
    }
}

impl fmt::Display for NoiseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoiseType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "white" => Ok(NoiseType::White),
            "pink" => Ok(NoiseType::Pink),
            "brown" | "red" => Ok(NoiseType::Brown),
            "green" => Ok(NoiseType::Green),
            other => Err(anyhow::anyhow!("unknown noise type '{}'", other)),
        }
    }
}

/// Uniform white sample in [-1, 1)
#[inline]
pub fn white_sample<R: Rng + ?Sized>(rng: &mut R) -> f32 {
    rng.gen::<f32>() * 2.0 - 1.0
}

/// Brown (red) noise as a leaky integrator of white noise
///
/// There is deliberately no clamp on the output. The integrator normally sits
/// well inside [-1, 1] after the 3.5x makeup gain, but a long run of same-signed
/// white samples can push it past full scale for a few samples.
#[derive(Debug, Clone, Default)]
pub struct BrownNoise {
    last: f32,
}

impl BrownNoise {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self, white: f32) -> f32 {
        let out = (self.last + 0.02 * white) / 1.02;
        self.last = out;
        out * BROWN_MAKEUP_GAIN
    }
}

/// 528 Hz sine whose amplitude is re-drawn uniformly from [0, 0.1) every sample
#[inline]
pub fn green_sample<R: Rng + ?Sized>(rng: &mut R, index: usize, sample_rate: f32) -> f32 {
    let carrier = (2.0 * PI * GREEN_NOISE_HZ * index as f32 / sample_rate).sin();
    carrier * (rng.gen::<f32>() * 0.1)
}

/// Number of samples in a noise loop at the given rate
pub fn buffer_len(sample_rate: f32) -> usize {
    (sample_rate * NOISE_BUFFER_SECONDS) as usize
}

/// Render a complete noise loop for `kind`
pub fn generate_buffer<R: Rng + ?Sized>(kind: NoiseType, sample_rate: f32, rng: &mut R) -> Vec<f32> {
    let len = buffer_len(sample_rate);

    match kind {
        NoiseType::White => (0..len).map(|_| white_sample(rng)).collect(),
        NoiseType::Pink => {
            let mut pink = PinkNoise::new();
            (0..len).map(|_| pink.tick(white_sample(rng))).collect()
        }
        NoiseType::Brown => {
            let mut brown = BrownNoise::new();
            (0..len).map(|_| brown.tick(white_sample(rng))).collect()
        }
        NoiseType::Green => (0..len)
            .map(|i| green_sample(rng, i, sample_rate))
            .collect(),
    }
}
