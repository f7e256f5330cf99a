pub mod dsp;
pub mod engine; // Composition root and render core
pub mod error;
pub mod graph; // Fixed signal chain: voice plus effects
pub mod params; // Normalized knob values to physical units
pub mod pattern;
pub mod sequencer;
pub mod store; // Saved-pattern CRUD
pub mod transport;

pub use engine::SynthEngine;
pub use error::EngineError;
pub use params::Param;
pub use pattern::{Note, Pattern, Step, PATTERN_LEN};

pub const MAX_BLOCK_SIZE: usize = 2048;
pub(crate) const MIN_TIME: f32 = 1.0 / 48_000.0;
/// Longest supported delay: 1 second at 192kHz.
pub(crate) const MAX_DELAY_SAMPLES: usize = 192_000;
