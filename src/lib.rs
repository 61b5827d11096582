//! Real-time test tone, noise and dub siren engine with a tempo-synced delay
//!
//! The crate is split between the control thread ([`engine`]) and the render thread
//! ([`graph::Renderer`]). They only talk through timestamped commands and a shared
//! frame clock, so nothing on the audio path ever waits on a lock.

pub mod config;
pub mod effects;
pub mod engine;
pub mod gen;
pub mod graph;
pub mod platform;
pub mod utils;

pub use config::EngineConfig;
pub use effects::tempo_sync::{DelayParameters, NoteDivision, NoteStyle};
pub use engine::{Engine, EngineEvent, SirenType, ToneParameters};
pub use gen::noise::NoiseType;
pub use gen::waveform::Waveform;
pub use graph::Channel;
pub use platform::{AudioOutput, OfflineOutput};

#[cfg(feature = "native")]
pub use platform::CpalOutput;
