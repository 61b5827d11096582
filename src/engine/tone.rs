//! Test tone parameters and the control-side tone voice

use crate::gen::waveform::Waveform;
use crate::graph::{Channel, Command, CommandSink};
use log::debug;

pub const MAX_FREQUENCY_HZ: f32 = 20000.0;
/// What the oscillator plays when 0 Hz (DC) is requested
pub const DC_SUBSTITUTE_HZ: f32 = 0.1;
pub const MAX_VOLUME: f32 = 0.5;

pub const PRESET_FREQUENCIES: [f32; 13] = [
    0.0, 10.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 10000.0, 16000.0,
    20000.0,
];

/// Frequency actually handed to the oscillator
pub fn oscillator_frequency(hz: f32) -> f32 {
    if hz <= 0.0 {
        DC_SUBSTITUTE_HZ
    } else {
        hz.min(MAX_FREQUENCY_HZ)
    }
}

/// Human readable frequency label
///
/// `0` is shown as DC, values from 1 kHz up in kHz with at most one decimal.
pub fn format_frequency(hz: f32) -> String {
    if hz == 0.0 {
        "0Hz (DC)".to_string()
    } else if hz >= 1000.0 {
        let khz = hz / 1000.0;
        if khz.fract() == 0.0 {
            format!("{}kHz", khz)
        } else {
            format!("{:.1}kHz", khz)
        }
    } else {
        format!("{}Hz", hz)
    }
}

/// Read the number at the start of `text`, ignoring whatever follows it
///
/// `"440Hz"` gives 440 and `" 12.5 kHz"` gives 12.5. An exponent only counts when
/// digits follow it. Returns `None` when the text does not start with a number.
pub fn parse_frequency_text(text: &str) -> Option<f32> {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let digits_from =
        |start: usize| start + bytes[start..].iter().take_while(|b| b.is_ascii_digit()).count();

    let mut end = match bytes.first() {
        Some(b'+' | b'-') => 1,
        _ => 0,
    };
    let integer_end = digits_from(end);
    let mut has_digits = integer_end > end;
    end = integer_end;

    if bytes.get(end) == Some(&b'.') {
        let fraction_end = digits_from(end + 1);
        has_digits |= fraction_end > end + 1;
        end = fraction_end;
    }
    if !has_digits {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exponent = end + 1;
        if matches!(bytes.get(exponent), Some(b'+' | b'-')) {
            exponent += 1;
        }
        let exponent_end = digits_from(exponent);
        if exponent_end > exponent {
            end = exponent_end;
        }
    }

    text[..end].parse().ok()
}

/// User-facing tone settings. Setters clamp into range.
#[derive(Debug, Clone, PartialEq)]
pub struct ToneParameters {
    frequency: f32,
    waveform: Waveform,
    volume: f32,
    channel: Channel,
}

impl ToneParameters {
    pub fn new(frequency: f32, waveform: Waveform, volume: f32, channel: Channel) -> Self {
        let mut params = Self {
            frequency: 0.0,
            waveform,
            volume: 0.0,
            channel,
        };
        params.set_frequency(frequency);
        params.set_volume(volume);
        params
    }

    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn channel(&self) -> Channel {
        self.channel
    }

    /// Non-finite input is ignored
    pub fn set_frequency(&mut self, frequency: f32) {
        if frequency.is_finite() {
            self.frequency = frequency.clamp(0.0, MAX_FREQUENCY_HZ);
        }
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    pub fn set_volume(&mut self, volume: f32) {
        if volume.is_finite() {
            self.volume = volume.clamp(0.0, MAX_VOLUME);
        }
    }

    pub fn set_channel(&mut self, channel: Channel) {
        self.channel = channel;
    }
}

impl Default for ToneParameters {
    fn default() -> Self {
        Self::new(1000.0, Waveform::Sine, 0.1, Channel::Both)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum ToneState {
    #[default]
    Idle,
    Active,
}

/// Control handle for the tone oscillator in the graph
#[derive(Debug, Default)]
pub struct ToneOscillator {
    state: ToneState,
}

impl ToneOscillator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start, or restart, the tone with `params`
    pub fn start<S: CommandSink>(&mut self, sink: &mut S, params: &ToneParameters) {
        if self.state == ToneState::Active {
            sink.send(Command::ToneStop);
        }
        sink.send(Command::MasterGain(params.volume()));
        sink.send(Command::ToneStart {
            frequency: oscillator_frequency(params.frequency()),
            waveform: params.waveform(),
        });
        self.state = ToneState::Active;
        debug!(
            "Tone started: {} {}",
            format_frequency(params.frequency()),
            params.waveform()
        );
    }

    /// Returns false if the tone was not playing
    pub fn stop<S: CommandSink>(&mut self, sink: &mut S) -> bool {
        if self.state == ToneState::Idle {
            return false;
        }
        sink.send(Command::ToneStop);
        self.state = ToneState::Idle;
        true
    }

    /// Retune a playing tone without restarting it
    pub fn set_frequency<S: CommandSink>(&mut self, sink: &mut S, hz: f32) {
        if self.state == ToneState::Active {
            sink.send(Command::ToneFrequency(oscillator_frequency(hz)));
        }
    }

    pub fn set_waveform<S: CommandSink>(&mut self, sink: &mut S, waveform: Waveform) {
        if self.state == ToneState::Active {
            sink.send(Command::ToneWaveform(waveform));
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == ToneState::Active
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Records everything sent to it; the clock is set by hand
    pub(crate) struct RecordingSink {
        pub frame: u64,
        pub sample_rate: f32,
        pub sent: Vec<(u64, Command)>,
    }

    impl RecordingSink {
        pub fn new(sample_rate: f32) -> Self {
            Self {
                frame: 0,
                sample_rate,
                sent: Vec::new(),
            }
        }
    }

    impl CommandSink for RecordingSink {
        fn now_frame(&self) -> u64 {
            self.frame
        }

        fn sample_rate(&self) -> f32 {
            self.sample_rate
        }

        fn send_at(&mut self, frame: u64, command: Command) {
            self.sent.push((frame, command));
        }
    }

    #[test]
    fn test_format_frequency() {
        assert_eq!(format_frequency(0.0), "0Hz (DC)");
        assert_eq!(format_frequency(440.0), "440Hz");
        assert_eq!(format_frequency(12.5), "12.5Hz");
        assert_eq!(format_frequency(1000.0), "1kHz");
        assert_eq!(format_frequency(1500.0), "1.5kHz");
        assert_eq!(format_frequency(20000.0), "20kHz");
    }

    #[test]
    fn test_frequency_text_reads_leading_number() {
        assert_eq!(parse_frequency_text("440Hz"), Some(440.0));
        assert_eq!(parse_frequency_text(" 12.5 kHz"), Some(12.5));
        assert_eq!(parse_frequency_text(".5"), Some(0.5));
        assert_eq!(parse_frequency_text("5."), Some(5.0));
        assert_eq!(parse_frequency_text("1e3"), Some(1000.0));
        assert_eq!(parse_frequency_text("1e"), Some(1.0));
        assert_eq!(parse_frequency_text("2E-1x"), Some(0.2));
        assert_eq!(parse_frequency_text("-1"), Some(-1.0));

        for text in ["abc", "", "-", ".", "Hz440", "  "] {
            assert_eq!(parse_frequency_text(text), None, "text {:?}", text);
        }
    }

    #[test]
    fn test_dc_is_substituted() {
        assert_eq!(oscillator_frequency(0.0), DC_SUBSTITUTE_HZ);
        assert_eq!(oscillator_frequency(440.0), 440.0);
    }

    #[test]
    fn test_parameters_clamp() {
        let mut params = ToneParameters::default();
        params.set_frequency(25000.0);
        assert_eq!(params.frequency(), MAX_FREQUENCY_HZ);
        params.set_frequency(-5.0);
        assert_eq!(params.frequency(), 0.0);
        params.set_frequency(f32::NAN);
        assert_eq!(params.frequency(), 0.0);
        params.set_volume(2.0);
        assert_eq!(params.volume(), MAX_VOLUME);
    }

    #[test]
    fn test_start_stop_commands() {
        let mut sink = RecordingSink::new(44100.0);
        let mut tone = ToneOscillator::new();
        let params = ToneParameters::new(0.0, Waveform::Square, 0.2, Channel::Left);

        tone.start(&mut sink, &params);
        assert!(matches!(sink.sent[0].1, Command::MasterGain(g) if g == 0.2));
        assert!(matches!(
            sink.sent[1].1,
            Command::ToneStart { frequency, waveform: Waveform::Square } if frequency == DC_SUBSTITUTE_HZ
        ));

        assert!(tone.stop(&mut sink));
        assert!(!tone.stop(&mut sink));
        assert_eq!(sink.sent.len(), 3);

        // Retuning an idle tone sends nothing
        tone.set_frequency(&mut sink, 500.0);
        assert_eq!(sink.sent.len(), 3);
    }
}
