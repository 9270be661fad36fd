use thiserror::Error;

/// Reasons a play request is refused.
///
/// The manager logs these at `warn` before returning them; neither one affects
/// voices that are already playing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlayError {
    #[error("invalid playback request: {reason}")]
    InvalidRequest { reason: &'static str },
    #[error("voice pool exhausted (capacity {capacity})")]
    PoolExhausted { capacity: usize },
}
