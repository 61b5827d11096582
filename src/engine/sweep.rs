//! Logarithmic frequency sweep across the audible range
//!
//! The sweep is a chain of timers: each step schedules the next one relative to
//! the sweep's start time, so late polls never accumulate drift.

use super::scheduler::{TimerAction, TimerOwner, TimerQueue};

pub const SWEEP_STEPS: u32 = 100;
pub const SWEEP_DURATION_SECONDS: f64 = 10.0;
pub const SWEEP_MIN_HZ: f64 = 0.1;
pub const SWEEP_END_HZ: f64 = 20000.0;

/// Frequency for a sweep step in `0..=SWEEP_STEPS`.
///
/// Step 0 is DC. Every other step sits on the exponential curve
/// `0.1 * (20000 / 0.1)^p` for `p = step / 100`.
pub fn sweep_frequency(step: u32) -> f64 {
    match step {
        0 => 0.0,
        s if s >= SWEEP_STEPS => SWEEP_END_HZ,
        s => {
            let position = s as f64 / SWEEP_STEPS as f64;
            SWEEP_MIN_HZ * (SWEEP_END_HZ / SWEEP_MIN_HZ).powf(position)
        }
    }
}

fn step_interval() -> f64 {
    SWEEP_DURATION_SECONDS / SWEEP_STEPS as f64
}

/// One applied sweep step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepStep {
    pub step: u32,
    /// Percent complete, 0-100
    pub progress: f32,
    /// Frequency as shown to the user, rounded to 0.1 Hz
    pub frequency: f32,
    /// Frequency for the oscillator, unrounded and never 0
    pub oscillator_hz: f32,
    /// Set on the last step; the sweep has already stopped itself
    pub finished: bool,
}

impl SweepStep {
    fn at(step: u32) -> Self {
        let exact = sweep_frequency(step);
        Self {
            step,
            progress: (step as f32 / SWEEP_STEPS as f32) * 100.0,
            frequency: ((exact * 10.0).round() / 10.0) as f32,
            oscillator_hz: super::tone::oscillator_frequency(exact as f32),
            finished: step >= SWEEP_STEPS,
        }
    }
}

#[derive(Debug, Default)]
pub struct SweepController {
    active: bool,
    started_at: f64,
    step: u32,
    progress: f32,
}

impl SweepController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a sweep at `now` seconds. Returns step 0 for the caller to apply, or
    /// `None` if a sweep is already running.
    pub fn start(&mut self, now: f64, timers: &mut TimerQueue) -> Option<SweepStep> {
        if self.active {
            return None;
        }
        self.active = true;
        self.started_at = now;
        Some(self.apply(0, timers))
    }

    /// Handle a fired `SweepStep` timer
    pub fn advance(&mut self, step: u32, timers: &mut TimerQueue) -> Option<SweepStep> {
        if !self.active || step > SWEEP_STEPS {
            return None;
        }
        Some(self.apply(step, timers))
    }

    fn apply(&mut self, step: u32, timers: &mut TimerQueue) -> SweepStep {
        let applied = SweepStep::at(step);
        self.step = step;
        self.progress = applied.progress;

        if applied.finished {
            self.reset();
        } else {
            let next = step + 1;
            let due = self.started_at + next as f64 * step_interval();
            timers.schedule(TimerOwner::Sweep, due, TimerAction::SweepStep(next));
        }
        applied
    }

    /// Cancel the sweep. Returns false if none was running.
    pub fn stop(&mut self, timers: &mut TimerQueue) -> bool {
        timers.cancel_owner(TimerOwner::Sweep);
        let was_active = self.active;
        self.reset();
        was_active
    }

    fn reset(&mut self) {
        self.active = false;
        self.step = 0;
        self.progress = 0.0;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn step(&self) -> u32 {
        self.step
    }
}
