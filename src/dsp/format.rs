//! # Sample Formats
//!
//! The host decides how audio is represented: how many channels, how many
//! frames per second, and what type each sample is. The delay engine only
//! knows how to work on floating point audio, in two widths:
//!
//! - **`F32`**: 32-bit floats, what nearly every plugin host delivers.
//! - **`F64`**: 64-bit floats, used by some offline renderers.
//!
//! Integer formats are listed so that a host can *offer* them and get a
//! clean rejection instead of silently garbled audio.
//!
//! ## Interleaving
//!
//! Buffers are interleaved: all channels of frame 0, then all channels of
//! frame 1, and so on.
//!
//! ```text
//! [L0 R0 L1 R1 L2 R2 ...]
//!  └─┬─┘ └─┬─┘
//!  frame 0 frame 1
//! ```

use std::fmt;

use crate::error::{DelayError, DelayResult};

/// How a single sample is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleKind {
    /// 32-bit float ("narrow float")
    F32,
    /// 64-bit float ("wide float")
    F64,
    /// Signed 16-bit integer
    S16,
    /// Signed 24-bit integer, packed into 3 bytes
    S24,
    /// Signed 32-bit integer
    S32,
    /// Unsigned 8-bit integer
    U8,
}

impl SampleKind {
    /// Size of one sample in bytes.
    pub const fn sample_size(self) -> usize {
        match self {
            Self::F32 | Self::S32 => 4,
            Self::F64 => 8,
            Self::S16 => 2,
            Self::S24 => 3,
            Self::U8 => 1,
        }
    }
}

impl fmt::Display for SampleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::F32 => "F32",
            Self::F64 => "F64",
            Self::S16 => "S16",
            Self::S24 => "S24",
            Self::S32 => "S32",
            Self::U8 => "U8",
        };
        f.write_str(name)
    }
}

/// The negotiated stream format. Fixed for the length of a streaming
/// session; a new one arrives through `DelayEngine::setup`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_kind: SampleKind,
    /// Frames per second
    pub rate: u32,
    pub channels: u32,
}

impl AudioFormat {
    pub const fn new(sample_kind: SampleKind, rate: u32, channels: u32) -> Self {
        Self {
            sample_kind,
            rate,
            channels,
        }
    }

    /// Bytes occupied by one frame (one sample for every channel).
    pub const fn bytes_per_frame(&self) -> usize {
        self.sample_kind.sample_size() * self.channels as usize
    }
}

/// The processing routine picked for a format.
///
/// This is resolved once, when the format is accepted, and decides which
/// monomorphic copy of the interpolation loop runs for every buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Processor {
    F32,
    F64,
}

impl Processor {
    /// Validate a format and pick its routine.
    ///
    /// Rejects zero channels, a zero rate, and every non-float sample kind.
    pub fn for_format(format: &AudioFormat) -> DelayResult<Self> {
        if format.channels == 0 {
            return Err(DelayError::InvalidFormat("channel count must be at least 1"));
        }
        if format.rate == 0 {
            return Err(DelayError::InvalidFormat("sample rate must be at least 1 Hz"));
        }

        match format.sample_kind {
            SampleKind::F32 => Ok(Self::F32),
            SampleKind::F64 => Ok(Self::F64),
            other => Err(DelayError::UnsupportedFormat(other)),
        }
    }

    pub const fn sample_kind(self) -> SampleKind {
        match self {
            Self::F32 => SampleKind::F32,
            Self::F64 => SampleKind::F64,
        }
    }
}

/// A floating point sample the delay line can store.
///
/// Interpolation always happens in `f64`, whatever the storage width, so
/// both routines produce the same result up to the final rounding.
pub trait Sample: Copy + Default + Send + 'static {
    fn to_f64(self) -> f64;
    fn from_f64(value: f64) -> Self;
}

impl Sample for f32 {
    #[inline]
    fn to_f64(self) -> f64 {
        f64::from(self)
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }
}

impl Sample for f64 {
    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }
}

/// A host-owned, interleaved buffer handed to the engine for in-place
/// processing.
pub enum Samples<'a> {
    F32(&'a mut [f32]),
    F64(&'a mut [f64]),
}

impl Samples<'_> {
    pub fn kind(&self) -> SampleKind {
        match self {
            Self::F32(_) => SampleKind::F32,
            Self::F64(_) => SampleKind::F64,
        }
    }
}

impl<'a> From<&'a mut [f32]> for Samples<'a> {
    fn from(data: &'a mut [f32]) -> Self {
        Self::F32(data)
    }
}

impl<'a> From<&'a mut [f64]> for Samples<'a> {
    fn from(data: &'a mut [f64]) -> Self {
        Self::F64(data)
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
