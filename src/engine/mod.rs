//! Control-thread engine
//!
//! [`Engine`] is the single entry point applications talk to. It owns the signal
//! graph, every controller and the timer queue, and it is driven from one thread:
//! call the setters and start/stop operations as the user acts, and call
//! [`Engine::poll`] regularly so sweep steps and pattern ends are handled.

pub mod noise;
pub mod scheduler;
pub mod siren;
pub mod sweep;
pub mod tempo;
pub mod tone;

pub use noise::NoiseGenerator;
pub use scheduler::{TimerAction, TimerOwner, TimerQueue};
pub use siren::{DubSiren, SirenEvent, SirenType, Transition};
pub use sweep::{sweep_frequency, SweepController, SweepStep};
pub use tempo::TempoTracker;
pub use tone::{
    format_frequency, parse_frequency_text, ToneOscillator, ToneParameters, PRESET_FREQUENCIES,
};

use crate::config::EngineConfig;
use crate::effects::tempo_sync::{DelayParameters, NoteDivision, NoteStyle};
use crate::gen::noise::NoiseType;
use crate::gen::waveform::Waveform;
use crate::graph::{Channel, Command, CommandSink, SignalGraph};
use crate::platform::AudioOutput;
use log::{debug, info};
use std::time::Instant;

/// Things that happened while draining timers
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineEvent {
    SweepStep {
        step: u32,
        progress: f32,
        frequency: f32,
    },
    SweepFinished,
    SirenFinished,
}

pub struct Engine<O: AudioOutput> {
    graph: SignalGraph<O>,
    timers: TimerQueue,

    tone_params: ToneParameters,
    frequency_text: String,
    tone: ToneOscillator,
    sweep: SweepController,

    noise: NoiseGenerator,
    noise_type: NoiseType,

    siren: DubSiren,
    siren_type: SirenType,

    delay: DelayParameters,
    tempo: TempoTracker,
    epoch: Instant,
}

impl<O: AudioOutput> Engine<O> {
    pub fn new(output: O) -> Self {
        Self::with_config(output, EngineConfig::default())
    }

    pub fn with_config(output: O, config: EngineConfig) -> Self {
        let graph = SignalGraph::new(output, config.sample_rate, config.command_capacity);
        let noise = match config.noise_seed {
            Some(seed) => NoiseGenerator::with_seed(seed),
            None => NoiseGenerator::new(),
        };

        let mut engine = Self {
            graph,
            timers: TimerQueue::new(),
            frequency_text: config.tone.frequency().to_string(),
            tone_params: config.tone,
            tone: ToneOscillator::new(),
            sweep: SweepController::new(),
            noise,
            noise_type: NoiseType::default(),
            siren: DubSiren::new(),
            siren_type: SirenType::default(),
            delay: config.delay,
            tempo: TempoTracker::new(),
            epoch: Instant::now(),
        };
        engine.graph.set_pan(engine.tone_params.channel());
        engine
    }

    /// Open the output device and push the current settings to it.
    ///
    /// Safe to call repeatedly. Start operations call this themselves.
    pub fn initialize(&mut self) -> anyhow::Result<bool> {
        let opened = self.graph.initialize()?;
        if opened {
            self.graph
                .send(Command::MasterGain(self.tone_params.volume()));
            self.push_delay();
            info!("Engine ready at {} Hz", self.graph.sample_rate());
        }
        Ok(opened)
    }

    pub fn is_initialized(&self) -> bool {
        self.graph.is_initialized()
    }

    // Tone

    pub fn start_tone(&mut self) -> anyhow::Result<()> {
        self.initialize()?;
        self.tone.start(&mut self.graph, &self.tone_params);
        info!(
            "Tone on: {} {} ({})",
            format_frequency(self.tone_params.frequency()),
            self.tone_params.waveform(),
            self.tone_params.channel()
        );
        Ok(())
    }

    /// Stops the tone and any running sweep
    pub fn stop_tone(&mut self) -> bool {
        self.stop_sweep();
        let stopped = self.tone.stop(&mut self.graph);
        if stopped {
            info!("Tone off");
        }
        stopped
    }

    pub fn is_tone_playing(&self) -> bool {
        self.tone.is_active()
    }

    /// Set the tone frequency. Ignored while a sweep is running.
    pub fn set_frequency(&mut self, hz: f32) -> bool {
        if self.sweep.is_active() {
            debug!("Ignoring frequency {} while sweeping", hz);
            return false;
        }
        if !hz.is_finite() {
            return false;
        }
        self.tone_params.set_frequency(hz);
        self.frequency_text = self.tone_params.frequency().to_string();
        self.tone
            .set_frequency(&mut self.graph, self.tone_params.frequency());
        true
    }

    /// Keep `text` as typed and apply the number it starts with, if that is a
    /// valid frequency
    pub fn set_frequency_text(&mut self, text: &str) -> bool {
        self.frequency_text = text.to_string();

        let Some(hz) = parse_frequency_text(text) else {
            return false;
        };
        if !hz.is_finite() || !(0.0..=tone::MAX_FREQUENCY_HZ).contains(&hz) || self.sweep.is_active()
        {
            return false;
        }

        self.tone_params.set_frequency(hz);
        self.tone.set_frequency(&mut self.graph, hz);
        true
    }

    pub fn select_preset(&mut self, index: usize) -> bool {
        match PRESET_FREQUENCIES.get(index) {
            Some(&hz) => self.set_frequency(hz),
            None => false,
        }
    }

    pub fn frequency(&self) -> f32 {
        self.tone_params.frequency()
    }

    pub fn frequency_text(&self) -> &str {
        &self.frequency_text
    }

    pub fn frequency_label(&self) -> String {
        format_frequency(self.tone_params.frequency())
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.tone_params.set_waveform(waveform);
        self.tone.set_waveform(&mut self.graph, waveform);
    }

    pub fn waveform(&self) -> Waveform {
        self.tone_params.waveform()
    }

    /// Master volume, also scaling the noise and siren buses
    pub fn set_volume(&mut self, volume: f32) {
        self.tone_params.set_volume(volume);
        let volume = self.tone_params.volume();
        self.graph.send(Command::MasterGain(volume));
        self.noise.set_volume(&mut self.graph, volume);
        self.siren.set_volume(&mut self.graph, volume);
    }

    pub fn volume(&self) -> f32 {
        self.tone_params.volume()
    }

    pub fn set_channel(&mut self, channel: Channel) {
        self.tone_params.set_channel(channel);
        self.graph.set_pan(channel);
    }

    pub fn channel(&self) -> Channel {
        self.tone_params.channel()
    }

    pub fn tone_parameters(&self) -> &ToneParameters {
        &self.tone_params
    }

    // Sweep

    /// Sweep the tone from DC to 20 kHz over ten seconds, starting the tone.
    /// Returns false if a sweep is already running.
    pub fn start_sweep(&mut self) -> anyhow::Result<bool> {
        if self.sweep.is_active() {
            return Ok(false);
        }
        self.initialize()?;

        let now = self.graph.now();
        let Some(first) = self.sweep.start(now, &mut self.timers) else {
            return Ok(false);
        };
        self.tone_params.set_frequency(first.frequency);
        self.frequency_text = first.frequency.to_string();
        self.tone.start(&mut self.graph, &self.tone_params);
        self.tone.set_frequency(&mut self.graph, first.oscillator_hz);

        info!("Sweep started");
        Ok(true)
    }

    pub fn stop_sweep(&mut self) -> bool {
        let stopped = self.sweep.stop(&mut self.timers);
        if stopped {
            info!("Sweep stopped at {}", self.frequency_label());
        }
        stopped
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweep.is_active()
    }

    pub fn sweep_progress(&self) -> f32 {
        self.sweep.progress()
    }

    fn apply_sweep_step(&mut self, step: &SweepStep) {
        self.tone_params.set_frequency(step.frequency);
        self.frequency_text = step.frequency.to_string();
        self.tone.set_frequency(&mut self.graph, step.oscillator_hz);
    }

    // Noise

    pub fn start_noise(&mut self, kind: NoiseType) -> anyhow::Result<()> {
        self.initialize()?;
        self.graph.reclaim_buffers();
        self.noise_type = kind;
        self.noise
            .start(&mut self.graph, kind, self.tone_params.volume());
        info!("Noise on: {}", kind);
        Ok(())
    }

    pub fn stop_noise(&mut self) -> bool {
        let stopped = self.noise.stop(&mut self.graph);
        if stopped {
            info!("Noise off");
        }
        stopped
    }

    /// Choose the noise colour, switching a running source over immediately
    pub fn set_noise_type(&mut self, kind: NoiseType) -> anyhow::Result<()> {
        self.noise_type = kind;
        if self.noise.is_active() {
            self.start_noise(kind)?;
        }
        Ok(())
    }

    pub fn noise_type(&self) -> NoiseType {
        self.noise_type
    }

    pub fn is_noise_playing(&self) -> bool {
        self.noise.is_active()
    }

    // Siren

    pub fn start_siren(&mut self, kind: SirenType) -> anyhow::Result<()> {
        self.initialize()?;
        self.siren_type = kind;
        self.siren.start(
            &mut self.graph,
            &mut self.timers,
            kind,
            self.tone_params.volume(),
        );
        info!("Siren on: {}", kind);
        Ok(())
    }

    pub fn stop_siren(&mut self) -> bool {
        let stopped = self.siren.stop(&mut self.graph, &mut self.timers);
        if stopped {
            info!("Siren off");
        }
        stopped
    }

    pub fn set_siren_type(&mut self, kind: SirenType) {
        self.siren_type = kind;
    }

    pub fn siren_type(&self) -> SirenType {
        self.siren_type
    }

    pub fn is_siren_playing(&self) -> bool {
        self.siren.is_active()
    }

    pub fn siren_events(&self) -> &[SirenEvent] {
        self.siren.scheduled_events()
    }

    // Delay

    pub fn set_delay_feedback(&mut self, percent: f32) {
        self.delay.set_feedback_percent(percent);
        self.push_delay();
    }

    pub fn set_delay_manual_ms(&mut self, ms: u32) {
        self.delay.set_manual_delay_ms(ms);
        self.push_delay();
    }

    pub fn set_tempo_sync(&mut self, synced: bool) {
        self.delay.set_tempo_synced(synced);
        self.push_delay();
    }

    pub fn set_bpm(&mut self, bpm: u32) {
        self.delay.set_bpm(bpm);
        self.push_delay();
    }

    pub fn set_division(&mut self, division: NoteDivision) {
        self.delay.set_division(division);
        self.push_delay();
    }

    pub fn set_style(&mut self, style: NoteStyle) {
        self.delay.set_style(style);
        self.push_delay();
    }

    pub fn delay_parameters(&self) -> &DelayParameters {
        &self.delay
    }

    /// Effective delay time in seconds
    pub fn delay_time(&self) -> f32 {
        self.delay.delay_seconds()
    }

    fn push_delay(&mut self) {
        let time = self.delay.delay_seconds();
        let feedback = self.delay.feedback_gain();
        debug!("Delay: {:.4}s, feedback {:.2}", time, feedback);
        self.graph.send(Command::DelayTime(time));
        self.graph.send(Command::DelayFeedback(feedback));
    }

    // Tap tempo

    /// Register a tap now. Returns the committed BPM, if any.
    pub fn tap_tempo(&mut self) -> Option<u32> {
        let ms = self.epoch.elapsed().as_secs_f64() * 1000.0;
        self.tap_tempo_at(ms)
    }

    /// Register a tap at an explicit timestamp in milliseconds
    pub fn tap_tempo_at(&mut self, timestamp_ms: f64) -> Option<u32> {
        let bpm = self.tempo.tap(timestamp_ms)?;
        self.delay.set_bpm(bpm);
        self.push_delay();
        info!("Tap tempo: {} bpm", bpm);
        Some(bpm)
    }

    pub fn bpm(&self) -> u32 {
        self.delay.bpm()
    }

    // Timing

    /// Handle every timer that is due on the render clock and free buffers the
    /// renderer is done with
    pub fn poll(&mut self) -> Vec<EngineEvent> {
        self.graph.reclaim_buffers();
        let now = self.graph.now();
        let mut events = Vec::new();

        while let Some((_, action)) = self.timers.pop_due(now) {
            match action {
                TimerAction::SweepStep(n) => {
                    let Some(step) = self.sweep.advance(n, &mut self.timers) else {
                        continue;
                    };
                    self.apply_sweep_step(&step);
                    events.push(EngineEvent::SweepStep {
                        step: step.step,
                        progress: step.progress,
                        frequency: step.frequency,
                    });
                    if step.finished {
                        info!("Sweep finished");
                        events.push(EngineEvent::SweepFinished);
                    }
                }
                TimerAction::SirenAutoStop { generation } => {
                    if self.siren.auto_stop(&mut self.graph, generation) {
                        info!("Siren finished");
                        events.push(EngineEvent::SirenFinished);
                    }
                }
            }
        }
        events
    }

    /// Render clock in seconds
    pub fn now(&self) -> f64 {
        self.graph.now()
    }

    pub fn next_timer_due(&self) -> Option<f64> {
        self.timers.next_due()
    }

    pub fn sample_rate(&self) -> f32 {
        self.graph.sample_rate()
    }

    /// Stop everything and release the device. Safe to call more than once.
    pub fn teardown(&mut self) {
        self.stop_tone();
        self.stop_noise();
        self.stop_siren();
        self.timers.clear();
        self.graph.teardown();
    }

    pub fn output(&self) -> &O {
        self.graph.output()
    }

    pub fn output_mut(&mut self) -> &mut O {
        self.graph.output_mut()
    }
}

impl<O: AudioOutput> Drop for Engine<O> {
    fn drop(&mut self) {
        self.teardown();
    }
}
