//! Extraction error types

use thiserror::Error;

/// Result type for fallible extraction entry points
pub type Result<T> = std::result::Result<T, ParseError>;

/// Errors raised while extracting uploads.
///
/// Malformed multipart framing is never an error; it degrades to a single
/// anonymous part instead. Only transport failures surface here.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to read request body: {0}")]
    Io(#[from] std::io::Error),
}
