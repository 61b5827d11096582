pub mod delay;
pub mod tempo_sync;

pub use self::delay::*;
pub use self::tempo_sync::*;

/// Trait for in-line effect units on the render thread
pub trait Effect: Send {
    /// Process a single audio sample through the effect
    fn process(&mut self, input: f32) -> f32;
}
