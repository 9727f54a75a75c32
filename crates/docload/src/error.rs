//! Load errors.

use docload_io::StreamError;

/// Failures surfaced by the loading pipeline.
///
/// Malformed or absent charset metadata is never an error: detection
/// recovers locally and falls back to the default encoding.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("stream state error: {0}")]
    Stream(#[from] StreamError),

    #[error("I/O error while loading document: {0}")]
    Io(#[from] std::io::Error),

    #[error("declared charset must not be blank; pass None to detect from metadata")]
    BlankCharset,

    #[error("unsupported charset: {0}")]
    UnsupportedCharset(String),
}
