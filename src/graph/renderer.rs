//! Render-thread half of the signal graph
//!
//! The renderer owns every piece of DSP state: the tone oscillator, the looping
//! noise buffer, the siren voice, the delay line and the bus gains. It is moved
//! into the output backend and never shared. The only way in is the command
//! ring buffer. The ways out (besides audio) are the frame clock and a second
//! ring that hands finished noise buffers back to the control thread, so the
//! audio thread never frees them.
//!
//! Topology, per frame:
//! ```text
//! tone  -> master gain ---------------------------\
//! noise -> noise gain ------------------------------+-> pan -> L/R
//! siren -> siren gain --+--------------- (dry) ----/
//!                       \-> delay line --- (wet) -/
//!                             ^      |
//!                             \- feedback gain
//! ```

use crate::effects::{DelayEffect, Effect};
use crate::gen::oscillator::Oscillator;
use crate::gen::waveform::Waveform;
use crate::graph::automation::FrequencyAutomation;
use crate::graph::command::{Command, FrequencyChange, ScheduledCommand};
use crate::utils::smoother::{SmoothedParam, DEFAULT_SMOOTH_TIME_MS};
use rtrb::{Consumer, Producer, PushError};
use std::collections::VecDeque;
use std::f32::consts::FRAC_PI_4;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Room reserved for commands waiting on a future frame
const PENDING_CAPACITY: usize = 256;

/// Initial delay settings before the control side pushes its own
const INITIAL_DELAY_SECONDS: f32 = 0.25;
const INITIAL_FEEDBACK_GAIN: f32 = 0.5;

/// One stereo output frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StereoFrame {
    pub left: f32,
    pub right: f32,
}

impl StereoFrame {
    /// Mono fold-down for single channel devices
    pub fn mono(&self) -> f32 {
        (self.left + self.right) * 0.5
    }
}

pub struct Renderer {
    sample_rate: f32,
    commands: Consumer<ScheduledCommand>,
    pending: VecDeque<ScheduledCommand>,
    clock: Arc<AtomicU64>,
    frame: u64,
    retired: Producer<Vec<f32>>,
    /// Buffer waiting for room in `retired`
    parked: Option<Vec<f32>>,

    tone: Oscillator,
    master_gain: SmoothedParam,

    noise: Option<Vec<f32>>,
    noise_position: usize,
    noise_gain: SmoothedParam,

    siren: Oscillator,
    siren_frequency: FrequencyAutomation,
    siren_generation: Option<u32>,
    siren_gain: SmoothedParam,

    delay: DelayEffect,
    pan: SmoothedParam,
}

impl Renderer {
    pub fn new(
        sample_rate: f32,
        commands: Consumer<ScheduledCommand>,
        retired: Producer<Vec<f32>>,
        clock: Arc<AtomicU64>,
    ) -> Self {
        let frame = clock.load(Ordering::Acquire);
        Self {
            sample_rate,
            commands,
            pending: VecDeque::with_capacity(PENDING_CAPACITY),
            clock,
            frame,
            retired,
            parked: None,
            tone: Oscillator::new(sample_rate, 1000.0, Waveform::Sine),
            master_gain: SmoothedParam::new(0.0, 0.0, 1.0, sample_rate, DEFAULT_SMOOTH_TIME_MS),
            noise: None,
            noise_position: 0,
            noise_gain: SmoothedParam::new(0.0, 0.0, 1.0, sample_rate, DEFAULT_SMOOTH_TIME_MS),
            siren: Oscillator::new(sample_rate, 200.0, Waveform::Sawtooth),
            siren_frequency: FrequencyAutomation::new(200.0),
            siren_generation: None,
            siren_gain: SmoothedParam::new(0.0, 0.0, 1.0, sample_rate, DEFAULT_SMOOTH_TIME_MS),
            delay: DelayEffect::new(sample_rate, INITIAL_DELAY_SECONDS, INITIAL_FEEDBACK_GAIN),
            pan: SmoothedParam::new(0.0, -1.0, 1.0, sample_rate, DEFAULT_SMOOTH_TIME_MS),
        }
    }

    /// Pull everything the control thread has sent since the last block.
    /// Call once at the top of each audio callback.
    pub fn begin_block(&mut self) {
        if let Some(buffer) = self.parked.take() {
            self.retire(buffer);
        }
        while let Ok(scheduled) = self.commands.pop() {
            // Stable insert: equal frames keep send order
            let index = self.pending.partition_point(|c| c.frame <= scheduled.frame);
            self.pending.insert(index, scheduled);
        }
    }

    /// Render a block of frames, receiving commands first
    pub fn render(&mut self, out: &mut [StereoFrame]) {
        self.begin_block();
        for frame in out.iter_mut() {
            *frame = self.next_frame();
        }
    }

    /// Produce one frame and advance the clock
    pub fn next_frame(&mut self) -> StereoFrame {
        self.apply_due();

        let tone = self.tone.tick() * self.master_gain.tick();

        let noise_sample = match &self.noise {
            Some(buffer) if !buffer.is_empty() => {
                let sample = buffer[self.noise_position];
                self.noise_position = (self.noise_position + 1) % buffer.len();
                sample
            }
            _ => 0.0,
        };
        let noise = noise_sample * self.noise_gain.tick();

        if self.siren_generation.is_some() {
            let frequency = self.siren_frequency.value_at(self.frame);
            self.siren.set_frequency_immediate(frequency);
        }
        let siren = self.siren.tick() * self.siren_gain.tick();
        let wet = self.delay.process(siren);

        let mono = tone + noise + siren + wet;

        // Equal-power pan of a mono source
        let angle = (self.pan.tick() + 1.0) * FRAC_PI_4;
        let out = StereoFrame {
            left: mono * angle.cos(),
            right: mono * angle.sin(),
        };

        self.frame += 1;
        self.clock.store(self.frame, Ordering::Release);
        out
    }

    fn apply_due(&mut self) {
        while self.pending.front().map_or(false, |c| c.frame <= self.frame) {
            if let Some(scheduled) = self.pending.pop_front() {
                self.apply(scheduled.command);
            }
        }
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::ToneStart { frequency, waveform } => self.tone.start(frequency, waveform),
            Command::ToneStop => self.tone.stop(),
            Command::ToneFrequency(frequency) => self.tone.set_frequency(frequency),
            Command::ToneWaveform(waveform) => self.tone.set_waveform(waveform),
            Command::MasterGain(gain) => self.master_gain.set_target(gain),
            Command::Pan(pan) => self.pan.set_target(pan),
            Command::NoiseStart { samples, gain } => {
                if let Some(old) = self.noise.replace(samples) {
                    self.retire(old);
                }
                self.noise_position = 0;
                self.noise_gain.set_immediate(gain);
            }
            Command::NoiseGain(gain) => {
                if self.noise.is_some() {
                    self.noise_gain.set_target(gain);
                }
            }
            Command::NoiseStop => {
                if let Some(old) = self.noise.take() {
                    self.retire(old);
                }
                self.noise_position = 0;
                self.noise_gain.set_immediate(0.0);
            }
            Command::SirenStart {
                generation,
                frequency,
                gain,
            } => {
                self.siren_generation = Some(generation);
                self.siren_frequency.set(frequency);
                self.siren.start(frequency, Waveform::Sawtooth);
                self.siren_gain.set_immediate(gain);
            }
            Command::SirenFrequency {
                generation,
                frequency,
                change,
            } => {
                if self.siren_generation != Some(generation) {
                    return;
                }
                match change {
                    FrequencyChange::Step => self.siren_frequency.set(frequency),
                    FrequencyChange::ExponentialRamp { end_frame } => {
                        self.siren_frequency.ramp_to(self.frame, frequency, end_frame)
                    }
                }
            }
            Command::SirenGain(gain) => {
                if self.siren_generation.is_some() {
                    self.siren_gain.set_target(gain);
                }
            }
            Command::SirenStop { generation } => {
                if self.siren_generation == Some(generation) {
                    self.siren_generation = None;
                    self.siren.stop();
                    self.siren_gain.set_immediate(0.0);
                }
                self.pending.retain(|c| !c.command.belongs_to_siren(generation));
            }
            Command::DelayTime(seconds) => self.delay.set_time(seconds),
            Command::DelayFeedback(gain) => self.delay.set_feedback(gain),
        }
    }

    /// Send a buffer back to the control thread for freeing
    fn retire(&mut self, buffer: Vec<f32>) {
        if let Err(PushError::Full(buffer)) = self.retired.push(buffer) {
            // A buffer already parked is freed here. That takes more noise
            // switches between two drains than the ring has slots.
            self.parked = Some(buffer);
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Frames rendered so far
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Commands received but waiting on a future frame
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_tone_active(&self) -> bool {
        self.tone.is_enabled()
    }

    pub fn tone_frequency(&self) -> f32 {
        self.tone.frequency()
    }

    pub fn tone_waveform(&self) -> Waveform {
        self.tone.waveform
    }

    pub fn master_gain(&self) -> f32 {
        self.master_gain.target()
    }

    pub fn pan(&self) -> f32 {
        self.pan.target()
    }

    pub fn has_noise_buffer(&self) -> bool {
        self.noise.is_some()
    }

    pub fn noise_buffer_len(&self) -> usize {
        self.noise.as_ref().map_or(0, Vec::len)
    }

    pub fn noise_gain(&self) -> f32 {
        self.noise_gain.target()
    }

    pub fn is_siren_active(&self) -> bool {
        self.siren_generation.is_some()
    }

    /// Siren oscillator frequency as of the last rendered frame
    pub fn siren_frequency(&self) -> f32 {
        self.siren.frequency()
    }

    pub fn siren_gain(&self) -> f32 {
        self.siren_gain.target()
    }

    pub fn delay_time(&self) -> f32 {
        self.delay.time()
    }

    pub fn delay_feedback(&self) -> f32 {
        self.delay.feedback()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rtrb::{Producer, RingBuffer};

    fn renderer(sample_rate: f32) -> (Renderer, Producer<ScheduledCommand>) {
        let (renderer, producer, _retired) = renderer_with_retired(sample_rate);
        (renderer, producer)
    }

    fn renderer_with_retired(
        sample_rate: f32,
    ) -> (Renderer, Producer<ScheduledCommand>, Consumer<Vec<f32>>) {
        let (producer, consumer) = RingBuffer::new(64);
        let (retired_producer, retired) = RingBuffer::new(1);
        let clock = Arc::new(AtomicU64::new(0));
        let renderer = Renderer::new(sample_rate, consumer, retired_producer, clock);
        (renderer, producer, retired)
    }

    fn push(producer: &mut Producer<ScheduledCommand>, frame: u64, command: Command) {
        producer
            .push(ScheduledCommand { frame, command })
            .expect("queue has room");
    }

    #[test]
    fn test_idle_graph_is_silent() {
        let (mut renderer, _producer) = renderer(44100.0);
        let mut out = vec![StereoFrame::default(); 512];
        renderer.render(&mut out);
        assert!(out.iter().all(|f| f.left == 0.0 && f.right == 0.0));
        assert_eq!(renderer.frame(), 512);
    }

    #[test]
    fn test_commands_apply_on_their_frame() {
        let (mut renderer, mut producer) = renderer(1000.0);
        push(&mut producer, 0, Command::MasterGain(1.0));
        push(&mut producer, 10, Command::ToneStart { frequency: 100.0, waveform: Waveform::Square });

        let mut out = vec![StereoFrame::default(); 10];
        renderer.render(&mut out);
        assert!(!renderer.is_tone_active());
        assert_eq!(renderer.pending_len(), 1);

        let mut out = vec![StereoFrame::default(); 1];
        renderer.render(&mut out);
        assert!(renderer.is_tone_active());
        assert_eq!(renderer.pending_len(), 0);
    }

    #[test]
    fn test_hard_left_pan() {
        let (mut renderer, mut producer) = renderer(1000.0);
        push(&mut producer, 0, Command::Pan(-1.0));
        push(&mut producer, 0, Command::NoiseStart { samples: vec![0.5; 100], gain: 1.0 });

        let mut out = vec![StereoFrame::default(); 400];
        renderer.render(&mut out);

        let last = out[399];
        assert!((last.left - 0.5).abs() < 1e-3);
        assert!(last.right.abs() < 1e-3);
    }

    #[test]
    fn test_centre_pan_is_equal_power() {
        let (mut renderer, mut producer) = renderer(1000.0);
        push(&mut producer, 0, Command::NoiseStart { samples: vec![1.0; 10], gain: 1.0 });

        let mut out = vec![StereoFrame::default(); 1];
        renderer.render(&mut out);
        let expected = std::f32::consts::FRAC_1_SQRT_2;
        assert!((out[0].left - expected).abs() < 1e-6);
        assert!((out[0].right - expected).abs() < 1e-6);
    }

    #[test]
    fn test_noise_loops_and_stops() {
        let (mut renderer, mut producer) = renderer(1000.0);
        push(&mut producer, 0, Command::NoiseStart { samples: vec![1.0, -1.0], gain: 1.0 });

        let mut out = vec![StereoFrame::default(); 4];
        renderer.render(&mut out);
        assert!(out[0].left > 0.0 && out[1].left < 0.0 && out[2].left > 0.0);

        push(&mut producer, renderer.frame(), Command::NoiseStop);
        renderer.render(&mut out);
        assert_eq!(renderer.noise_gain(), 0.0);
        assert!(!renderer.has_noise_buffer());
        assert!(out.iter().all(|f| f.left == 0.0));
    }

    #[test]
    fn test_siren_stop_drops_its_pending_events() {
        let (mut renderer, mut producer) = renderer(1000.0);
        push(&mut producer, 0, Command::SirenStart { generation: 1, frequency: 200.0, gain: 0.25 });
        push(
            &mut producer,
            500,
            Command::SirenFrequency { generation: 1, frequency: 1000.0, change: FrequencyChange::Step },
        );
        push(&mut producer, 100, Command::SirenStop { generation: 1 });

        let mut out = vec![StereoFrame::default(); 200];
        renderer.render(&mut out);

        assert!(!renderer.is_siren_active());
        assert_eq!(renderer.siren_gain(), 0.0);
        assert_eq!(renderer.pending_len(), 0);
    }

    #[test]
    fn test_siren_stop_drops_its_own_later_stop() {
        let (mut renderer, mut producer) = renderer(1000.0);
        push(&mut producer, 0, Command::SirenStart { generation: 3, frequency: 200.0, gain: 0.25 });
        push(&mut producer, 4000, Command::SirenStop { generation: 3 });
        push(&mut producer, 10, Command::SirenStop { generation: 3 });

        let mut out = vec![StereoFrame::default(); 20];
        renderer.render(&mut out);

        assert!(!renderer.is_siren_active());
        assert_eq!(renderer.pending_len(), 0);
    }

    #[test]
    fn test_replaced_noise_buffers_go_back_to_control() {
        let (mut renderer, mut producer, mut retired) = renderer_with_retired(1000.0);
        push(&mut producer, 0, Command::NoiseStart { samples: vec![0.1; 8], gain: 1.0 });
        push(&mut producer, 1, Command::NoiseStart { samples: vec![0.2; 16], gain: 1.0 });
        push(&mut producer, 2, Command::NoiseStop);

        let mut out = vec![StereoFrame::default(); 3];
        renderer.render(&mut out);
        assert!(!renderer.has_noise_buffer());

        // The ring holds one; the second waits for room
        assert_eq!(retired.pop().ok().map(|b| b.len()), Some(8));
        assert!(retired.pop().is_err());

        renderer.render(&mut out);
        assert_eq!(retired.pop().ok().map(|b| b.len()), Some(16));
    }

    #[test]
    fn test_stale_generation_is_ignored() {
        let (mut renderer, mut producer) = renderer(1000.0);
        push(&mut producer, 0, Command::SirenStart { generation: 2, frequency: 200.0, gain: 0.25 });
        push(
            &mut producer,
            0,
            Command::SirenFrequency { generation: 1, frequency: 1000.0, change: FrequencyChange::Step },
        );
        push(&mut producer, 0, Command::SirenStop { generation: 1 });

        let mut out = vec![StereoFrame::default(); 10];
        renderer.render(&mut out);

        assert!(renderer.is_siren_active());
        assert_eq!(renderer.siren_frequency(), 200.0);
    }

    #[test]
    fn test_siren_feeds_delay_after_stop() {
        let (mut renderer, mut producer) = renderer(1000.0);
        push(&mut producer, 0, Command::DelayTime(0.1));
        push(&mut producer, 0, Command::DelayFeedback(0.5));
        push(&mut producer, 0, Command::SirenStart { generation: 1, frequency: 200.0, gain: 0.5 });
        push(&mut producer, 50, Command::SirenStop { generation: 1 });

        let mut out = vec![StereoFrame::default(); 300];
        renderer.render(&mut out);

        // The dry siren is gone but its echoes keep ringing
        let tail_energy: f32 = out[100..150].iter().map(|f| f.left.abs()).sum();
        assert!(tail_energy > 0.1, "tail energy {}", tail_energy);
    }
}
