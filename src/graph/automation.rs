//! Sample-accurate frequency automation for the siren voice

#[derive(Debug, Clone, Copy)]
struct ExponentialRamp {
    start_frame: u64,
    end_frame: u64,
    from: f32,
    to: f32,
}

/// A frequency value that is either held or gliding exponentially to a target
#[derive(Debug, Clone)]
pub struct FrequencyAutomation {
    value: f32,
    ramp: Option<ExponentialRamp>,
}

impl FrequencyAutomation {
    pub fn new(value: f32) -> Self {
        Self { value, ramp: None }
    }

    /// Hold a value, cancelling any ramp in flight
    pub fn set(&mut self, value: f32) {
        self.value = value;
        self.ramp = None;
    }

    /// Start an exponential glide at `frame` from the current value to `target`,
    /// arriving at `end_frame`.
    ///
    /// Exponential curves are undefined through zero, and a ramp that already
    /// ended has nothing to do: both degrade to a plain `set`.
    pub fn ramp_to(&mut self, frame: u64, target: f32, end_frame: u64) {
        let from = self.value_at(frame);
        if end_frame <= frame || from <= 0.0 || target <= 0.0 {
            self.set(target);
            return;
        }
        self.ramp = Some(ExponentialRamp {
            start_frame: frame,
            end_frame,
            from,
            to: target,
        });
    }

    /// Value at `frame`. Frames must not go backwards between calls.
    pub fn value_at(&mut self, frame: u64) -> f32 {
        if let Some(ramp) = self.ramp {
            if frame >= ramp.end_frame {
                self.value = ramp.to;
                self.ramp = None;
            } else {
                let elapsed = frame.saturating_sub(ramp.start_frame) as f64;
                let span = (ramp.end_frame - ramp.start_frame) as f64;
                let ratio = (ramp.to / ramp.from) as f64;
                self.value = (ramp.from as f64 * ratio.powf(elapsed / span)) as f32;
            }
        }
        self.value
    }

    pub fn is_ramping(&self) -> bool {
        self.ramp.is_some()
    }
}
