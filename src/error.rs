//! Delay engine error types

use thiserror::Error;

use crate::dsp::format::SampleKind;

/// Errors reported by the delay engine.
///
/// Everything here is returned as an explicit status; nothing on the
/// processing path panics.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DelayError {
    /// The negotiated sample representation has no processing routine
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(SampleKind),

    /// The negotiated format is structurally invalid
    #[error("Invalid audio format: {0}")]
    InvalidFormat(&'static str),

    /// The delay buffer could not be allocated on first use
    #[error("Failed to allocate {bytes} bytes for the delay buffer")]
    Allocation { bytes: usize },

    /// `max_delay` was changed while the stream is active
    #[error("Can't change maximum delay while the stream is active")]
    MaxDelayLocked,

    /// A delay of zero nanoseconds was requested
    #[error("Delay must be at least 1 ns")]
    ZeroDelay,

    /// Processing was requested before a format was accepted
    #[error("No audio format has been negotiated")]
    NotConfigured,

    /// The buffer's sample representation differs from the negotiated one
    #[error("Buffer holds {got} samples but {expected} was negotiated")]
    SampleKindMismatch {
        expected: SampleKind,
        got: SampleKind,
    },
}

/// Result type for delay engine operations
pub type DelayResult<T> = Result<T, DelayError>;
