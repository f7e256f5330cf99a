//! Engine error taxonomy.
//!
//! Only `initialize()` can fail for environmental reasons; everything else in
//! here flags a caller mistake (bad parameter name, wrong pattern length) and
//! is surfaced immediately rather than retried. Out-of-range *values* are not
//! errors at all: normalized knob input saturates to [0, 1] so audio keeps
//! running.

use crate::pattern::PATTERN_LEN;

#[derive(Debug)]
pub enum EngineError {
    /// The audio host/device/stream could not be set up. Retryable by the
    /// caller; the engine stays uninitialized.
    InitializationFailed(Box<dyn std::error::Error + Send + Sync>),
    /// A parameter name outside the fixed control set was passed in.
    UnknownParameter(String),
    /// A pattern that is not exactly 16 steps was rejected before it could
    /// reach the render thread.
    InvalidPatternLength(usize),
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::InitializationFailed(source) => {
                write!(f, "audio engine initialization failed: {}", source)
            }
            EngineError::UnknownParameter(name) => {
                write!(f, "unknown parameter name: {:?}", name)
            }
            EngineError::InvalidPatternLength(len) => {
                write!(
                    f,
                    "pattern must have exactly {} steps, got {}",
                    PATTERN_LEN, len
                )
            }
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::InitializationFailed(source) => {
                Some(source.as_ref() as &(dyn std::error::Error + 'static))
            }
            _ => None,
        }
    }
}
