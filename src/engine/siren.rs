//! Dub siren: a sawtooth voice played through one of three fixed patterns
//!
//! A pattern is a list of frequency events relative to the start time. The whole
//! list is scheduled against the render clock at start, together with a stop at
//! the end of the pattern. Every instance gets a fresh generation number, and the
//! renderer drops events whose generation is no longer playing.

use super::scheduler::{TimerAction, TimerOwner, TimerQueue};
use crate::graph::{Command, CommandSink, FrequencyChange};
use log::debug;
use std::fmt;
use std::str::FromStr;

pub const SIREN_START_HZ: f32 = 200.0;
pub const SIREN_END_HZ: f32 = 1000.0;
/// Siren bus gain relative to the user volume
pub const SIREN_GAIN_SCALE: f32 = 0.5;

const CHOP_EVENTS: usize = 20;
const CHOP_INTERVAL_SECONDS: f64 = 0.2;
const SIREN_CYCLES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SirenType {
    /// One slow rise and fall
    #[default]
    Sweep,
    /// Hard jumps between the two pitches
    Chop,
    /// Ten fast rise and fall cycles
    Siren,
}

impl SirenType {
    pub const ALL: [SirenType; 3] = [SirenType::Sweep, SirenType::Chop, SirenType::Siren];

    /// Pattern length; the instance stops itself after this
    pub fn duration(&self) -> f64 {
        match self {
            SirenType::Sweep => 4.0,
            SirenType::Chop => 4.0,
            SirenType::Siren => 10.0,
        }
    }

    pub fn events(&self) -> Vec<SirenEvent> {
        match self {
            SirenType::Sweep => vec![
                SirenEvent::step(0.0, SIREN_START_HZ),
                SirenEvent::ramp(2.0, SIREN_END_HZ),
                SirenEvent::ramp(4.0, SIREN_START_HZ),
            ],
            SirenType::Chop => (0..CHOP_EVENTS)
                .map(|i| {
                    let frequency = if i % 2 == 0 {
                        SIREN_START_HZ
                    } else {
                        SIREN_END_HZ
                    };
                    SirenEvent::step(i as f64 * CHOP_INTERVAL_SECONDS, frequency)
                })
                .collect(),
            SirenType::Siren => {
                let mut events = Vec::with_capacity(SIREN_CYCLES * 2 + 1);
                events.push(SirenEvent::step(0.0, SIREN_START_HZ));
                for cycle in 0..SIREN_CYCLES {
                    let base = cycle as f64;
                    events.push(SirenEvent::ramp(base + 0.5, SIREN_END_HZ));
                    events.push(SirenEvent::ramp(base + 1.0, SIREN_START_HZ));
                }
                events
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SirenType::Sweep => "sweep",
            SirenType::Chop => "chop",
            SirenType::Siren => "siren",
        }
    }
}

impl fmt::Display for SirenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SirenType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sweep" => Ok(SirenType::Sweep),
            "chop" => Ok(SirenType::Chop),
            "siren" => Ok(SirenType::Siren),
            other => Err(anyhow::anyhow!("unknown siren type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Step,
    /// Glide from the previous event's frequency, arriving at this event's offset
    ExponentialRamp,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SirenEvent {
    /// Seconds after the pattern starts
    pub offset: f64,
    pub frequency: f32,
    pub transition: Transition,
}

impl SirenEvent {
    fn step(offset: f64, frequency: f32) -> Self {
        Self {
            offset,
            frequency,
            transition: Transition::Step,
        }
    }

    fn ramp(offset: f64, frequency: f32) -> Self {
        Self {
            offset,
            frequency,
            transition: Transition::ExponentialRamp,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum SirenState {
    #[default]
    Idle,
    Active { kind: SirenType, generation: u32 },
}

#[derive(Debug, Default)]
pub struct DubSiren {
    state: SirenState,
    next_generation: u32,
    events: Vec<SirenEvent>,
}

impl DubSiren {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop any running pattern and schedule `kind` from the current render time
    pub fn start<S: CommandSink>(
        &mut self,
        sink: &mut S,
        timers: &mut TimerQueue,
        kind: SirenType,
        volume: f32,
    ) {
        self.stop(sink, timers);

        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);

        let start_frame = sink.now_frame();
        let start_seconds = sink.now();
        sink.send_at(
            start_frame,
            Command::SirenStart {
                generation,
                frequency: SIREN_START_HZ,
                gain: volume * SIREN_GAIN_SCALE,
            },
        );

        let events = kind.events();
        let mut previous_frame = start_frame;
        for event in &events {
            let frame = start_frame + sink.seconds_to_frames(event.offset);
            match event.transition {
                Transition::Step => sink.send_at(
                    frame,
                    Command::SirenFrequency {
                        generation,
                        frequency: event.frequency,
                        change: FrequencyChange::Step,
                    },
                ),
                // The ramp begins where the previous event left off
                Transition::ExponentialRamp => sink.send_at(
                    previous_frame,
                    Command::SirenFrequency {
                        generation,
                        frequency: event.frequency,
                        change: FrequencyChange::ExponentialRamp { end_frame: frame },
                    },
                ),
            }
            previous_frame = frame;
        }

        let duration = kind.duration();
        sink.send_at(
            start_frame + sink.seconds_to_frames(duration),
            Command::SirenStop { generation },
        );
        timers.schedule(
            TimerOwner::Siren,
            start_seconds + duration,
            TimerAction::SirenAutoStop { generation },
        );

        debug!(
            "Siren '{}' (generation {}) scheduled {} events over {}s",
            kind,
            generation,
            events.len(),
            duration
        );
        self.events = events;
        self.state = SirenState::Active { kind, generation };
    }

    /// Returns false if no siren was playing
    pub fn stop<S: CommandSink>(&mut self, sink: &mut S, timers: &mut TimerQueue) -> bool {
        timers.cancel_owner(TimerOwner::Siren);
        let SirenState::Active { generation, .. } = self.state else {
            return false;
        };
        sink.send(Command::SirenStop { generation });
        self.finish();
        true
    }

    /// Handle the end-of-pattern timer. Stale generations are ignored.
    pub fn auto_stop<S: CommandSink>(&mut self, sink: &mut S, generation: u32) -> bool {
        match self.state {
            SirenState::Active { generation: current, .. } if current == generation => {
                sink.send(Command::SirenStop { generation });
                self.finish();
                true
            }
            _ => false,
        }
    }

    fn finish(&mut self) {
        self.state = SirenState::Idle;
        self.events.clear();
    }

    pub fn set_volume<S: CommandSink>(&mut self, sink: &mut S, volume: f32) {
        if self.is_active() {
            sink.send(Command::SirenGain(volume * SIREN_GAIN_SCALE));
        }
    }

    pub fn active_type(&self) -> Option<SirenType> {
        match self.state {
            SirenState::Idle => None,
            SirenState::Active { kind, .. } => Some(kind),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active_type().is_some()
    }

    /// Pattern of the running instance, empty when idle
    pub fn scheduled_events(&self) -> &[SirenEvent] {
        &self.events
    }
}
