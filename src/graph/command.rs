//! Control → render protocol
//!
//! The control thread never touches render state directly. It stamps each change
//! with the render frame it should take effect on and pushes it through a lock-free
//! ring buffer; the renderer applies it when its clock reaches that frame.

use crate::gen::waveform::Waveform;

/// How a siren frequency event reaches its target
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrequencyChange {
    /// Jump to the target at the command's frame
    Step,
    /// Glide exponentially from the current value, arriving at `end_frame`
    ExponentialRamp { end_frame: u64 },
}

#[derive(Debug)]
pub enum Command {
    ToneStart { frequency: f32, waveform: Waveform },
    ToneStop,
    ToneFrequency(f32),
    ToneWaveform(Waveform),
    MasterGain(f32),
    Pan(f32),
    NoiseStart { samples: Vec<f32>, gain: f32 },
    NoiseGain(f32),
    NoiseStop,
    SirenStart { generation: u32, frequency: f32, gain: f32 },
    SirenFrequency { generation: u32, frequency: f32, change: FrequencyChange },
    SirenGain(f32),
    SirenStop { generation: u32 },
    DelayTime(f32),
    DelayFeedback(f32),
}

impl Command {
    /// Whether this command is scheduled on behalf of the given siren instance
    pub fn belongs_to_siren(&self, generation: u32) -> bool {
        match self {
            Command::SirenFrequency { generation: g, .. } | Command::SirenStop { generation: g } => {
                *g == generation
            }
            _ => false,
        }
    }
}

/// A command stamped with the render frame it applies on
#[derive(Debug)]
pub struct ScheduledCommand {
    pub frame: u64,
    pub command: Command,
}

/// Anything the control-side components can hand timed commands to
pub trait CommandSink {
    /// Render clock position, in frames
    fn now_frame(&self) -> u64;

    fn sample_rate(&self) -> f32;

    fn send_at(&mut self, frame: u64, command: Command);

    /// Apply as soon as possible
    fn send(&mut self, command: Command) {
        let frame = self.now_frame();
        self.send_at(frame, command);
    }

    /// Render clock position, in seconds
    fn now(&self) -> f64 {
        self.now_frame() as f64 / self.sample_rate() as f64
    }

    /// Convert a duration to frames at the sink's rate
    fn seconds_to_frames(&self, seconds: f64) -> u64 {
        (seconds * self.sample_rate() as f64).round().max(0.0) as u64
    }
}
