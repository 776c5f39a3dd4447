//! Error types for the head pose library.

use thiserror::Error;

/// Main error type for the library
///
/// The numeric core never produces these: a singular system or a
/// non-converged refinement is reported through [`crate::pnp::Termination`].
/// Errors only come from the outer surface (input validation, configuration, I/O).
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Landmark frame could not be decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;
