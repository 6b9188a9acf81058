//! # Fractional Delay Interpolation
//!
//! This is the per-buffer loop that turns live input into delayed output.
//! It runs in place: every input sample is read, replaced by the delayed
//! sample, and then stored in the ring for later.
//!
//! ## Read Positions
//!
//! Per buffer, two numbers are fixed up front:
//!
//! ```text
//! delay_index = size_frames - delay_frames
//! delay_off   = delay_in_frames - delay_frames      (0.0 ≤ delay_off < 1.0)
//! ```
//!
//! For every frame, with the cursor at `pos`:
//!
//! ```text
//! read0 = (delay_index + pos) % size_frames   ← delay_frames behind pos
//! read1 = (read0 + 1)         % size_frames   ← the slot after it
//! write = pos
//! ```
//!
//! Because `delay_index + pos ≡ pos - delay_frames (mod size_frames)`,
//! `read0` is exactly `delay_frames` frames in the past. When
//! `delay_frames == size_frames`, `read0` equals `write`: the oldest frame
//! in the ring is read just before it is overwritten.
//!
//! ## Blending
//!
//! ```text
//! out = s0 + (s1 - s0) * delay_off
//! ```
//!
//! With `delay_off == 0.0` this is `s0` exactly, so whole-frame delays
//! reproduce their input bit for bit.

use super::delay_state::DelayParameters;
use super::format::Sample;
use super::ring_buffer::RingBuffer;

/// Read geometry for one processing call, taken from a single parameter
/// snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayTaps {
    /// Whole frames of delay, at least one.
    pub delay_frames: usize,
    /// Blend factor toward the second tap.
    pub delay_off: f64,
}

impl DelayTaps {
    pub fn from_parameters(params: &DelayParameters) -> Self {
        Self {
            delay_frames: params.delay_frames().max(1),
            delay_off: params.fractional_offset(),
        }
    }
}

/// Delay `data` in place through `ring`.
///
/// `data` is interleaved with `ring.channels()` channels. Only whole frames
/// are processed; a trailing partial frame is left as it was. An empty
/// buffer leaves the ring untouched.
pub fn process<S: Sample>(ring: &mut RingBuffer<S>, data: &mut [S], taps: DelayTaps) {
    let channels = ring.channels();
    let size_frames = ring.size_frames();

    // Capped so the subtraction can't underflow.
    let delay_index = size_frames - taps.delay_frames.min(size_frames);
    let delay_off = taps.delay_off;

    for frame in data.chunks_exact_mut(channels) {
        let pos = ring.pos();
        let read0 = (delay_index + pos) % size_frames;
        let read1 = (read0 + 1) % size_frames;
        let write = pos % size_frames;

        for (channel, sample) in frame.iter_mut().enumerate() {
            let input = *sample;
            let s0 = ring.sample(read0, channel).to_f64();
            let s1 = ring.sample(read1, channel).to_f64();

            *sample = S::from_f64(s0 + (s1 - s0) * delay_off);
            ring.set_sample(write, channel, input);
        }

        ring.advance();
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
