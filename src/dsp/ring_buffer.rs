//! # Ring Buffer
//!
//! The ring buffer stores the most recent `max_delay` worth of audio and
//! lets the interpolation loop read it back later. It is the "tape loop"
//! of the delay: a write cursor records incoming frames, and reads happen
//! a fixed distance behind it.
//!
//! ## Layout
//!
//! Storage is one contiguous, interleaved block of
//! `size_frames × channels` samples, the same layout as the host buffers:
//!
//! ```text
//! frame:   0       1       2           size_frames - 1
//!        [L R]   [L R]   [L R]  ...   [L R]
//!                  ▲
//!                 pos  (next frame to be written)
//! ```
//!
//! `pos` wraps back to 0 after the last frame, so the buffer always holds
//! the last `size_frames` frames of input.
//!
//! ## Lifecycle
//!
//! Nothing is allocated when the format is negotiated. The first
//! processing call allocates from the `max_delay` in effect at that
//! moment, so changes made between negotiation and playback are honored.
//! Stopping the stream or renegotiating the format releases the storage
//! again ([`DelayBuffer::reset`]).

use std::mem::size_of;
use std::num::NonZeroUsize;

use super::format::{Processor, Sample};
use crate::error::{DelayError, DelayResult};

/// A fixed-capacity, interleaved ring of past frames.
pub struct RingBuffer<S> {
    /// Zero-initialized (silent) samples, `size_frames * channels` long.
    buffer: Vec<S>,

    channels: usize,

    /// Capacity in frames. Never zero.
    size_frames: usize,

    /// Write/read cursor in frames. Always `< size_frames`.
    pos: usize,
}

impl<S: Sample> RingBuffer<S> {
    /// Allocate a silent ring of `size_frames` frames.
    ///
    /// Uses a fallible reservation, so an oversized request comes back as
    /// [`DelayError::Allocation`] instead of aborting the process.
    pub fn allocate(size_frames: NonZeroUsize, channels: NonZeroUsize) -> DelayResult<Self> {
        let len = size_frames
            .get()
            .checked_mul(channels.get())
            .ok_or(DelayError::Allocation { bytes: usize::MAX })?;
        let bytes = len.saturating_mul(size_of::<S>());

        let mut buffer = Vec::new();
        buffer
            .try_reserve_exact(len)
            .map_err(|_| DelayError::Allocation { bytes })?;
        buffer.resize(len, S::default());

        Ok(Self {
            buffer,
            channels: channels.get(),
            size_frames: size_frames.get(),
            pos: 0,
        })
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn size_frames(&self) -> usize {
        self.size_frames
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Total storage in bytes.
    pub fn byte_size(&self) -> usize {
        self.buffer.len() * size_of::<S>()
    }

    /// Read one sample. `frame` must be `< size_frames`.
    #[inline]
    pub fn sample(&self, frame: usize, channel: usize) -> S {
        self.buffer[frame * self.channels + channel]
    }

    /// Overwrite one sample. `frame` must be `< size_frames`.
    #[inline]
    pub fn set_sample(&mut self, frame: usize, channel: usize, value: S) {
        self.buffer[frame * self.channels + channel] = value;
    }

    /// Move the cursor forward one frame, wrapping at the end.
    #[inline]
    pub fn advance(&mut self) {
        self.pos = (self.pos + 1) % self.size_frames;
    }

    /// Silence the whole ring and rewind the cursor, keeping the storage.
    pub fn clear(&mut self) {
        self.buffer.fill(S::default());
        self.pos = 0;
    }
}

/// The engine's ring buffer, in whichever width the negotiated format uses.
#[derive(Default)]
pub enum DelayBuffer {
    #[default]
    Unallocated,
    F32(RingBuffer<f32>),
    F64(RingBuffer<f64>),
}

impl DelayBuffer {
    /// Allocate a silent ring for the given routine.
    pub fn allocate(
        processor: Processor,
        size_frames: NonZeroUsize,
        channels: NonZeroUsize,
    ) -> DelayResult<Self> {
        Ok(match processor {
            Processor::F32 => Self::F32(RingBuffer::allocate(size_frames, channels)?),
            Processor::F64 => Self::F64(RingBuffer::allocate(size_frames, channels)?),
        })
    }

    /// Release the storage. The next processing call allocates afresh.
    pub fn reset(&mut self) {
        *self = Self::Unallocated;
    }

    /// Silence the ring and rewind its cursor without releasing it.
    pub fn clear(&mut self) {
        match self {
            Self::Unallocated => {}
            Self::F32(ring) => ring.clear(),
            Self::F64(ring) => ring.clear(),
        }
    }

    pub fn is_allocated(&self) -> bool {
        !matches!(self, Self::Unallocated)
    }

    /// Capacity in frames; zero when unallocated.
    pub fn size_frames(&self) -> usize {
        match self {
            Self::Unallocated => 0,
            Self::F32(ring) => ring.size_frames(),
            Self::F64(ring) => ring.size_frames(),
        }
    }

    /// Cursor position in frames; zero when unallocated.
    pub fn pos(&self) -> usize {
        match self {
            Self::Unallocated => 0,
            Self::F32(ring) => ring.pos(),
            Self::F64(ring) => ring.pos(),
        }
    }

    pub fn byte_size(&self) -> usize {
        match self {
            Self::Unallocated => 0,
            Self::F32(ring) => ring.byte_size(),
            Self::F64(ring) => ring.byte_size(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
