//! Error type for the piano roll.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RollError {
    /// No drawing surface to render into. Fatal for the roll instance.
    #[error("no drawing surface available")]
    MissingSurface,

    #[error("invalid note range {first}..={last}")]
    InvalidRange { first: u8, last: u8 },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("snapshot encoding failed: {0}")]
    Encode(String),
}

pub type Result<T> = std::result::Result<T, RollError>;
