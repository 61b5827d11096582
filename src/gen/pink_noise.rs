//! Pink noise using Paul Kellet's refined filter bank
//!
//! Six one-pole lowpass stages with staggered corner frequencies are driven by the
//! same white source. Their sum, plus a direct white term and a one-sample-delayed
//! white term, approximates a -3 dB/octave slope across the audio band.

/// Pink noise filter bank with ~1/f spectrum
///
/// The delayed term `b6` is read before it is refreshed, so each output sample
/// contains the previous sample's white input. That ordering shapes the top
/// octave and must not be swapped.
#[derive(Debug, Clone, Default)]
pub struct PinkNoise {
    b0: f32,
    b1: f32,
    b2: f32,
    b3: f32,
    b4: f32,
    b5: f32,
    b6: f32,
}

impl PinkNoise {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter one white sample (uniform in [-1, 1]) into one pink sample
    pub fn tick(&mut self, white: f32) -> f32 {
        self.b0 = 0.99886 * self.b0 + white * 0.0555179;
        self.b1 = 0.99332 * self.b1 + white * 0.0750759;
        self.b2 = 0.96900 * self.b2 + white * 0.1538520;
        self.b3 = 0.86650 * self.b3 + white * 0.3104856;
        self.b4 = 0.55000 * self.b4 + white * 0.5329522;
        self.b5 = -0.7616 * self.b5 - white * 0.0168980;

        let output = (self.b0
            + self.b1
            + self.b2
            + self.b3
            + self.b4
            + self.b5
            + self.b6
            + white * 0.5362)
            * 0.11;

        self.b6 = white * 0.115926;
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_has_no_delayed_term() {
        let mut pink = PinkNoise::new();
        let white = 1.0;
        let expected = (0.0555179 + 0.0750759 + 0.1538520 + 0.3104856 + 0.5329522 - 0.0168980
            + 0.5362)
            * 0.11;
        assert!((pink.tick(white) - expected).abs() < 1e-6);
    }

    #[test]
    fn test_delayed_term_uses_previous_white() {
        let mut pink = PinkNoise::new();
        pink.tick(1.0);

        // With zero input the only fresh contributions are the decaying poles
        // and the previous sample's white * 0.115926
        let poles = 0.99886 * 0.0555179
            + 0.99332 * 0.0750759
            + 0.96900 * 0.1538520
            + 0.86650 * 0.3104856
            + 0.55000 * 0.5329522
            + -0.7616 * -0.0168980;
        let expected = (poles + 0.115926) * 0.11;
        assert!((pink.tick(0.0) - expected).abs() < 1e-6);
    }
}
