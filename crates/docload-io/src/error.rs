//! Stream state errors.

/// Misuse of the mark/reset protocol.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("mark limit {limit} exceeds buffer capacity {capacity}")]
    MarkLimitTooLarge { limit: usize, capacity: usize },

    #[error("reset called without an active mark")]
    ResetWithoutMark,
}
