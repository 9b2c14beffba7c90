//! Error types for the admission layer.

use thiserror::Error;

/// Main error type for admission operations.
///
/// Rate-limit rejections are not errors; they are ordinary [`Admission`]
/// values returned from the check path.
///
/// [`Admission`]: crate::admission::Admission
#[derive(Error, Debug)]
pub enum AdmissionError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for admission operations.
pub type Result<T> = std::result::Result<T, AdmissionError>;
