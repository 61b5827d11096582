//! Deviceless output that renders on demand
//!
//! Used by tests and for bouncing audio to disk. The caller decides when time
//! advances by asking for frames.

use super::AudioOutput;
use crate::graph::{Renderer, StereoFrame};
use log::info;

pub struct OfflineOutput {
    sample_rate: f32,
    fixed_rate: Option<f32>,
    available: bool,
    initialized: bool,
    renderer: Option<Renderer>,
    releases: usize,
}

impl OfflineOutput {
    /// An offline device that runs at whatever rate it is asked for
    pub fn new() -> Self {
        Self {
            sample_rate: 44100.0,
            fixed_rate: None,
            available: true,
            initialized: false,
            renderer: None,
            releases: 0,
        }
    }

    /// An offline device with a fixed native rate, like real hardware
    pub fn with_sample_rate(sample_rate: f32) -> Self {
        Self {
            sample_rate,
            fixed_rate: Some(sample_rate),
            ..Self::new()
        }
    }

    /// A device that fails to open
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Render `frames` frames. Returns nothing while no renderer is attached.
    pub fn render(&mut self, frames: usize) -> Vec<StereoFrame> {
        let Some(renderer) = self.renderer.as_mut() else {
            return Vec::new();
        };
        let mut out = vec![StereoFrame::default(); frames];
        renderer.render(&mut out);
        out
    }

    /// Render a duration of audio
    pub fn render_seconds(&mut self, seconds: f64) -> Vec<StereoFrame> {
        let frames = (seconds * self.sample_rate as f64).round() as usize;
        self.render(frames)
    }

    pub fn renderer(&self) -> Option<&Renderer> {
        self.renderer.as_ref()
    }

    /// How many times an open device was released
    pub fn release_count(&self) -> usize {
        self.releases
    }

    /// Render `seconds` of audio into a 32-bit float stereo WAV file
    #[cfg(feature = "bounce")]
    pub fn bounce_to_wav(
        &mut self,
        path: impl AsRef<std::path::Path>,
        seconds: f64,
    ) -> Result<(), anyhow::Error> {
        if self.renderer.is_none() {
            return Err(anyhow::anyhow!("Offline output has no renderer attached"));
        }

        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: self.sample_rate as u32,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut writer = hound::WavWriter::create(path.as_ref(), spec)?;
        for frame in self.render_seconds(seconds) {
            writer.write_sample(frame.left)?;
            writer.write_sample(frame.right)?;
        }
        writer.finalize()?;
        info!("Bounced {:.2}s to {}", seconds, path.as_ref().display());
        Ok(())
    }
}

impl Default for OfflineOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOutput for OfflineOutput {
    fn initialize(&mut self, sample_rate: f32) -> Result<(), anyhow::Error> {
        if !self.available {
            return Err(anyhow::anyhow!("Offline output device is not available"));
        }
        self.sample_rate = self.fixed_rate.unwrap_or(sample_rate);
        self.initialized = true;
        Ok(())
    }

    fn start(&mut self, renderer: Renderer) -> Result<(), anyhow::Error> {
        if !self.initialized {
            return Err(anyhow::anyhow!("Offline output not initialized"));
        }
        self.renderer = Some(renderer);
        info!("Offline output started at sample rate: {}", self.sample_rate);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), anyhow::Error> {
        if self.initialized {
            self.initialized = false;
            self.renderer = None;
            self.releases += 1;
        }
        Ok(())
    }

    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn is_active(&self) -> bool {
        self.renderer.is_some()
    }
}
