//! Fixed signal graph and rendering device lifecycle
//!
//! `SignalGraph` is the control-thread owner of the graph. It opens the output
//! device, hands it a [`Renderer`] that holds all DSP state, and from then on only
//! talks to the render thread through timestamped [`Command`]s.

pub mod automation;
pub mod command;
pub mod renderer;

pub use command::{Command, CommandSink, FrequencyChange, ScheduledCommand};
pub use renderer::{Renderer, StereoFrame};

use crate::platform::AudioOutput;
use log::{debug, info, warn};
use rtrb::{Consumer, Producer, RingBuffer};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Output channel selection, mapped onto the stereo panner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Channel {
    Left,
    Right,
    #[default]
    Both,
}

impl Channel {
    /// Pan position: -1 hard left, 0 centre, +1 hard right
    pub fn pan(&self) -> f32 {
        match self {
            Channel::Left => -1.0,
            Channel::Right => 1.0,
            Channel::Both => 0.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Left => "left",
            Channel::Right => "right",
            Channel::Both => "both",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" | "l" => Ok(Channel::Left),
            "right" | "r" => Ok(Channel::Right),
            "both" | "stereo" | "lr" => Ok(Channel::Both),
            other => Err(anyhow::anyhow!("unknown channel '{}'", other)),
        }
    }
}

/// Slots for noise buffers travelling back from the renderer
const RETIRED_CAPACITY: usize = 8;

/// State that exists only while the device is open
struct Session {
    producer: Producer<ScheduledCommand>,
    retired: Consumer<Vec<f32>>,
    clock: Arc<AtomicU64>,
    sample_rate: f32,
}

/// Owner of the output device and the control end of the command queue
pub struct SignalGraph<O: AudioOutput> {
    output: O,
    requested_sample_rate: f32,
    command_capacity: usize,
    session: Option<Session>,
    pan: f32,
}

impl<O: AudioOutput> SignalGraph<O> {
    pub fn new(output: O, requested_sample_rate: f32, command_capacity: usize) -> Self {
        Self {
            output,
            requested_sample_rate,
            command_capacity: command_capacity.max(1),
            session: None,
            pan: Channel::Both.pan(),
        }
    }

    /// Open the device and start rendering.
    ///
    /// Returns `Ok(true)` when this call opened the device and `Ok(false)` when it
    /// was already open. A missing or failing device is returned as an error.
    pub fn initialize(&mut self) -> anyhow::Result<bool> {
        if self.session.is_some() {
            return Ok(false);
        }

        self.output.initialize(self.requested_sample_rate)?;
        let sample_rate = self.output.sample_rate();

        let (producer, consumer) = RingBuffer::new(self.command_capacity);
        let (retired_producer, retired) = RingBuffer::new(RETIRED_CAPACITY);
        let clock = Arc::new(AtomicU64::new(0));
        let renderer = Renderer::new(sample_rate, consumer, retired_producer, clock.clone());

        if let Err(err) = self.output.start(renderer) {
            if let Err(stop_err) = self.output.stop() {
                warn!("Failed to release output after start error: {}", stop_err);
            }
            return Err(err);
        }

        self.session = Some(Session {
            producer,
            retired,
            clock,
            sample_rate,
        });
        info!("Signal graph running at {} Hz", sample_rate);

        self.send(Command::Pan(self.pan));
        Ok(true)
    }

    pub fn is_initialized(&self) -> bool {
        self.session.is_some()
    }

    /// Route the mix to one side or both
    pub fn set_pan(&mut self, channel: Channel) {
        self.pan = channel.pan();
        self.send(Command::Pan(self.pan));
    }

    pub fn pan(&self) -> f32 {
        self.pan
    }

    /// Free the buffers the renderer has handed back. Returns how many.
    pub fn reclaim_buffers(&mut self) -> usize {
        let Some(session) = self.session.as_mut() else {
            return 0;
        };
        let mut freed = 0;
        while let Ok(buffer) = session.retired.pop() {
            drop(buffer);
            freed += 1;
        }
        if freed > 0 {
            debug!("Freed {} retired noise buffers", freed);
        }
        freed
    }

    /// Release the device. Only the first call after `initialize` does anything.
    pub fn teardown(&mut self) {
        if self.session.take().is_none() {
            return;
        }
        if let Err(err) = self.output.stop() {
            warn!("Error while releasing output device: {}", err);
        }
        info!("Signal graph torn down");
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }
}

impl<O: AudioOutput> CommandSink for SignalGraph<O> {
    fn now_frame(&self) -> u64 {
        self.session
            .as_ref()
            .map_or(0, |s| s.clock.load(Ordering::Acquire))
    }

    fn sample_rate(&self) -> f32 {
        self.session
            .as_ref()
            .map_or(self.requested_sample_rate, |s| s.sample_rate)
    }

    /// Commands sent while the device is closed are dropped; the engine pushes
    /// its full state again on the next `initialize`.
    fn send_at(&mut self, frame: u64, command: Command) {
        let Some(session) = self.session.as_mut() else {
            debug!("Graph not running, dropping {:?}", command);
            return;
        };
        if let Err(err) = session.producer.push(ScheduledCommand { frame, command }) {
            warn!("Command queue full, dropping command: {:?}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::OfflineOutput;

    #[test]
    fn test_initialize_is_idempotent() {
        let mut graph = SignalGraph::new(OfflineOutput::new(), 44100.0, 16);
        assert!(graph.initialize().unwrap());
        assert!(!graph.initialize().unwrap());
        assert!(graph.is_initialized());
    }

    #[test]
    fn test_teardown_releases_once() {
        let mut graph = SignalGraph::new(OfflineOutput::new(), 44100.0, 16);
        graph.initialize().unwrap();
        graph.teardown();
        graph.teardown();
        assert_eq!(graph.output().release_count(), 1);
        assert!(!graph.is_initialized());
    }

    #[test]
    fn test_missing_device_is_an_error() {
        let mut graph = SignalGraph::new(OfflineOutput::unavailable(), 44100.0, 16);
        assert!(graph.initialize().is_err());
        assert!(!graph.is_initialized());
    }

    #[test]
    fn test_pan_reaches_renderer() {
        let mut graph = SignalGraph::new(OfflineOutput::new(), 48000.0, 16);
        graph.set_pan(Channel::Right);
        graph.initialize().unwrap();
        graph.output_mut().render(1);
        assert_eq!(graph.output().renderer().unwrap().pan(), 1.0);

        graph.set_pan(Channel::Left);
        graph.output_mut().render(1);
        assert_eq!(graph.output().renderer().unwrap().pan(), -1.0);
    }

    #[test]
    fn test_stopped_noise_is_reclaimed_on_control_side() {
        let mut graph = SignalGraph::new(OfflineOutput::new(), 1000.0, 16);
        graph.initialize().unwrap();
        graph.send(Command::NoiseStart { samples: vec![0.5; 64], gain: 0.3 });
        graph.output_mut().render(4);
        assert_eq!(graph.reclaim_buffers(), 0);

        graph.send(Command::NoiseStop);
        graph.output_mut().render(1);
        assert_eq!(graph.reclaim_buffers(), 1);
        assert_eq!(graph.reclaim_buffers(), 0);
    }

    #[test]
    fn test_clock_follows_rendering() {
        let mut graph = SignalGraph::new(OfflineOutput::new(), 1000.0, 16);
        graph.initialize().unwrap();
        graph.output_mut().render(250);
        assert_eq!(graph.now_frame(), 250);
        assert!((graph.now() - 0.25).abs() < 1e-9);
        assert_eq!(graph.seconds_to_frames(0.2), 200);
    }
}
