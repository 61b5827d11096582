/// Platform abstraction for audio output
/// The graph hands a fully owned `Renderer` to one of these backends, which then
/// drives it from whatever thread the platform renders on.

use crate::graph::Renderer;

/// Trait for platform-specific audio output implementations
pub trait AudioOutput {
    /// Open the device. `sample_rate` is a request; the device may pick another
    /// rate, which `sample_rate()` reports afterwards.
    fn initialize(&mut self, sample_rate: f32) -> Result<(), anyhow::Error>;

    /// Take ownership of the renderer and start pulling audio from it
    fn start(&mut self, renderer: Renderer) -> Result<(), anyhow::Error>;

    /// Stop rendering and release the device
    fn stop(&mut self) -> Result<(), anyhow::Error>;

    /// Get the current sample rate
    fn sample_rate(&self) -> f32;

    /// Check if the audio output is active
    fn is_active(&self) -> bool;
}

pub mod offline;
pub use self::offline::OfflineOutput;

#[cfg(feature = "native")]
pub mod cpal_output;

#[cfg(feature = "native")]
pub use self::cpal_output::CpalOutput;
