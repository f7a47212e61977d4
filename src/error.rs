//! Error types for signature-insights

use thiserror::Error;

/// Library error type. The fetch layer and CLI use `anyhow` on top of it.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type alias for signature-insights
pub type Result<T> = std::result::Result<T, Error>;
