//! Delay timing: manual milliseconds or a note value at the current tempo

use crate::effects::delay::{MAX_DELAY_SECONDS, MAX_FEEDBACK_GAIN};
use std::fmt;
use std::str::FromStr;

pub const MIN_BPM: u32 = 40;
pub const MAX_BPM: u32 = 200;
pub const MIN_MANUAL_DELAY_MS: u32 = 10;
pub const MAX_MANUAL_DELAY_MS: u32 = 2000;
pub const MAX_FEEDBACK_PERCENT: f32 = MAX_FEEDBACK_GAIN * 100.0;

/// Note value the delay time is locked to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoteDivision {
    Whole,
    Half,
    #[default]
    Quarter,
    Eighth,
    Sixteenth,
    ThirtySecond,
}

impl NoteDivision {
    pub const ALL: [NoteDivision; 6] = [
        NoteDivision::Whole,
        NoteDivision::Half,
        NoteDivision::Quarter,
        NoteDivision::Eighth,
        NoteDivision::Sixteenth,
        NoteDivision::ThirtySecond,
    ];

    /// Length of this note in beats (quarter notes)
    pub fn beats(&self) -> f32 {
        match self {
            NoteDivision::Whole => 4.0,
            NoteDivision::Half => 2.0,
            NoteDivision::Quarter => 1.0,
            NoteDivision::Eighth => 0.5,
            NoteDivision::Sixteenth => 0.25,
            NoteDivision::ThirtySecond => 0.125,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NoteDivision::Whole => "1",
            NoteDivision::Half => "1/2",
            NoteDivision::Quarter => "1/4",
            NoteDivision::Eighth => "1/8",
            NoteDivision::Sixteenth => "1/16",
            NoteDivision::ThirtySecond => "1/32",
        }
    }
}

impl fmt::Display for NoteDivision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoteDivision {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "1/1" | "whole" => Ok(NoteDivision::Whole),
            "1/2" | "half" => Ok(NoteDivision::Half),
            "1/4" | "quarter" => Ok(NoteDivision::Quarter),
            "1/8" | "eighth" => Ok(NoteDivision::Eighth),
            "1/16" | "sixteenth" => Ok(NoteDivision::Sixteenth),
            "1/32" | "thirtysecond" => Ok(NoteDivision::ThirtySecond),
            other => Err(anyhow::anyhow!("unknown note division '{}'", other)),
        }
    }
}

/// Rhythmic feel applied on top of the note division
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoteStyle {
    #[default]
    Regular,
    Dotted,
    Triplet,
}

impl NoteStyle {
    pub fn multiplier(&self) -> f32 {
        match self {
            NoteStyle::Regular => 1.0,
            NoteStyle::Dotted => 1.5,
            NoteStyle::Triplet => 2.0 / 3.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            NoteStyle::Regular => "regular",
            NoteStyle::Dotted => "dotted",
            NoteStyle::Triplet => "triplet",
        }
    }
}

impl fmt::Display for NoteStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NoteStyle {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "regular" | "straight" => Ok(NoteStyle::Regular),
            "dotted" => Ok(NoteStyle::Dotted),
            "triplet" => Ok(NoteStyle::Triplet),
            other => Err(anyhow::anyhow!("unknown note style '{}'", other)),
        }
    }
}

/// Control-side delay settings. Setters clamp into range.
#[derive(Debug, Clone, PartialEq)]
pub struct DelayParameters {
    feedback_percent: f32,
    tempo_synced: bool,
    manual_delay_ms: u32,
    bpm: u32,
    division: NoteDivision,
    style: NoteStyle,
}

impl Default for DelayParameters {
    fn default() -> Self {
        Self {
            feedback_percent: 50.0,
            tempo_synced: false,
            manual_delay_ms: 250,
            bpm: 120,
            division: NoteDivision::Quarter,
            style: NoteStyle::Regular,
        }
    }
}

impl DelayParameters {
    pub fn feedback_percent(&self) -> f32 {
        self.feedback_percent
    }

    /// Feedback as a linear gain, 0.0-2.0
    pub fn feedback_gain(&self) -> f32 {
        self.feedback_percent / 100.0
    }

    pub fn tempo_synced(&self) -> bool {
        self.tempo_synced
    }

    pub fn manual_delay_ms(&self) -> u32 {
        self.manual_delay_ms
    }

    pub fn bpm(&self) -> u32 {
        self.bpm
    }

    pub fn division(&self) -> NoteDivision {
        self.division
    }

    pub fn style(&self) -> NoteStyle {
        self.style
    }

    pub fn set_feedback_percent(&mut self, percent: f32) {
        if percent.is_finite() {
            self.feedback_percent = percent.clamp(0.0, MAX_FEEDBACK_PERCENT);
        }
    }

    pub fn set_tempo_synced(&mut self, synced: bool) {
        self.tempo_synced = synced;
    }

    pub fn set_manual_delay_ms(&mut self, ms: u32) {
        self.manual_delay_ms = ms.clamp(MIN_MANUAL_DELAY_MS, MAX_MANUAL_DELAY_MS);
    }

    pub fn set_bpm(&mut self, bpm: u32) {
        self.bpm = bpm.clamp(MIN_BPM, MAX_BPM);
    }

    pub fn set_division(&mut self, division: NoteDivision) {
        self.division = division;
    }

    pub fn set_style(&mut self, style: NoteStyle) {
        self.style = style;
    }

    /// Effective delay time in seconds, never above the line's capacity
    pub fn delay_seconds(&self) -> f32 {
        if self.tempo_synced {
            synced_delay_seconds(self.bpm, self.division, self.style)
        } else {
            (self.manual_delay_ms as f32 / 1000.0).min(MAX_DELAY_SECONDS)
        }
    }
}

/// Delay time for a note value at `bpm`, clamped to [`MAX_DELAY_SECONDS`]
pub fn synced_delay_seconds(bpm: u32, division: NoteDivision, style: NoteStyle) -> f32 {
    let beat_seconds = 60.0 / bpm.max(1) as f32;
    let time = beat_seconds * division.beats() * style.multiplier();
    time.min(MAX_DELAY_SECONDS)
}
