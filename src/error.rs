//! Error types for the simulation core.

use thiserror::Error;

/// Raised before an episode starts; the core never runs a malformed episode.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("population must contain at least one policy")]
    EmptyPopulation,

    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConfigError {
    #[must_use]
    pub fn invalid<S: Into<String>>(msg: S) -> Self {
        Self::Invalid(msg.into())
    }
}

/// A policy that fails simply does not jump this tick.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PolicyError {
    #[error("policy produced a non-finite signal: {0}")]
    NonFinite(f32),

    #[error("replay tape exhausted after {0} decisions")]
    TapeExhausted(usize),

    #[error("expected {expected} inputs, got {actual}")]
    InputArity { expected: usize, actual: usize },
}

/// Rendering failures are reported but never roll back a tick.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("frame buffer holds {actual} bytes, expected {expected}")]
    FrameSize { expected: usize, actual: usize },

    #[error("render backend failed: {0}")]
    Backend(String),
}
