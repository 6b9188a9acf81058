//! # Delay Parameters
//!
//! Two values control the effect, both in integer nanoseconds:
//!
//! - **`delay`**: how far behind the input the output runs. Can change at
//!   any time, including in the middle of a stream.
//! - **`max_delay`**: the longest delay the ring buffer must be able to
//!   hold. It sizes the buffer, so it is frozen while a stream is active.
//!
//! ## Converting Time to Frames
//!
//! ```text
//! frames = floor(ns * rate / 1_000_000_000)
//! ```
//!
//! The product is taken in 128-bit integers, so very long delays at high
//! rates neither overflow nor lose precision. Both `delay_frames` and the
//! buffer size are floored at one frame.
//!
//! ## Mutability Policy
//!
//! | Request                | Inactive                    | Active                     |
//! |------------------------|-----------------------------|----------------------------|
//! | `delay` ≤ `max_delay`  | stored                      | stored                     |
//! | `delay` > `max_delay`  | stored, `max_delay` raised  | clipped to `max_delay`     |
//! | `max_delay` ≥ `delay`  | stored                      | rejected                   |
//! | `max_delay` < `delay`  | stored, `delay` lowered     | rejected                   |
//!
//! With these rules `delay ≤ max_delay` holds after every committed write,
//! which in turn guarantees `delay_frames ≤ buffer_size_frames`.

use std::num::NonZeroU32;

use crate::error::{DelayError, DelayResult};

pub const NANOS_PER_SECOND: u64 = 1_000_000_000;

/// Smallest accepted value for either parameter.
pub const MIN_DELAY_NS: u64 = 1;

/// Convert a duration in nanoseconds to whole frames, rounding down.
pub fn ns_to_frames(ns: u64, rate: u32) -> u64 {
    let frames = u128::from(ns) * u128::from(rate) / u128::from(NANOS_PER_SECOND);
    u64::try_from(frames).unwrap_or(u64::MAX)
}

/// Whole frames for a duration, never less than one.
///
/// Saturates at `usize::MAX` on narrow targets; an allocation of that size
/// fails cleanly later on.
pub fn frames_at_least_one(ns: u64, rate: u32) -> usize {
    usize::try_from(ns_to_frames(ns, rate).max(1)).unwrap_or(usize::MAX)
}

/// Outcome of a `delay` write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayUpdate {
    Applied,
    /// The request exceeded `max_delay` while active; `max_delay` was stored
    /// instead.
    Clipped { requested: u64, max_delay: u64 },
}

/// Outcome of a `max_delay` write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxDelayUpdate {
    Applied,
    /// The new maximum was below `delay`, so `delay` came down with it.
    DelayLowered { delay: u64 },
}

#[derive(Debug, Clone)]
pub struct DelayParameters {
    delay: u64,
    max_delay: u64,
    /// Known once a format has been accepted.
    rate: Option<NonZeroU32>,
    /// Cached `max(floor(delay * rate / 1e9), 1)`; zero until the rate is known.
    delay_frames: usize,
}

impl Default for DelayParameters {
    fn default() -> Self {
        Self {
            delay: MIN_DELAY_NS,
            max_delay: MIN_DELAY_NS,
            rate: None,
            delay_frames: 0,
        }
    }
}

impl DelayParameters {
    pub fn delay(&self) -> u64 {
        self.delay
    }

    pub fn max_delay(&self) -> u64 {
        self.max_delay
    }

    pub fn rate(&self) -> Option<u32> {
        self.rate.map(NonZeroU32::get)
    }

    /// The integer part of the delay in frames; zero until a rate is known.
    pub fn delay_frames(&self) -> usize {
        self.delay_frames
    }

    /// Set a new delay.
    ///
    /// While active the stored value is clipped to `max_delay`. While
    /// inactive the delay is taken as-is and `max_delay` grows to fit it.
    pub fn set_delay(&mut self, delay: u64, active: bool) -> DelayResult<DelayUpdate> {
        if delay < MIN_DELAY_NS {
            return Err(DelayError::ZeroDelay);
        }

        let update = if active && delay > self.max_delay {
            self.delay = self.max_delay;
            DelayUpdate::Clipped {
                requested: delay,
                max_delay: self.max_delay,
            }
        } else {
            self.delay = delay;
            if !active {
                self.max_delay = self.max_delay.max(delay);
            }
            DelayUpdate::Applied
        };

        self.refresh_delay_frames();
        Ok(update)
    }

    /// Set a new maximum delay. Only allowed while inactive.
    ///
    /// A maximum below the current delay pulls the delay down to match, so
    /// the buffer sized from it can always hold the delayed signal.
    pub fn set_max_delay(&mut self, max_delay: u64, active: bool) -> DelayResult<MaxDelayUpdate> {
        if active {
            return Err(DelayError::MaxDelayLocked);
        }
        if max_delay < MIN_DELAY_NS {
            return Err(DelayError::ZeroDelay);
        }

        self.max_delay = max_delay;
        if self.delay > max_delay {
            self.delay = max_delay;
            self.refresh_delay_frames();
            return Ok(MaxDelayUpdate::DelayLowered { delay: max_delay });
        }

        Ok(MaxDelayUpdate::Applied)
    }

    /// Record the negotiated rate and recompute the derived frame count.
    pub fn set_rate(&mut self, rate: NonZeroU32) {
        self.rate = Some(rate);
        self.refresh_delay_frames();
    }

    /// Ring buffer capacity for the current `max_delay`, once a rate is known.
    pub fn buffer_size_frames(&self) -> Option<usize> {
        self.rate
            .map(|rate| frames_at_least_one(self.max_delay, rate.get()))
    }

    /// The fractional part of the delay in frames, never negative.
    ///
    /// `delay * rate / 1e9 - delay_frames`. This is zero whenever the delay
    /// lands on a whole frame, and also when `delay_frames` was floored up
    /// to one.
    pub fn fractional_offset(&self) -> f64 {
        let Some(rate) = self.rate else {
            return 0.0;
        };

        let exact = self.delay as f64 * f64::from(rate.get()) / NANOS_PER_SECOND as f64;
        (exact - self.delay_frames as f64).max(0.0)
    }

    fn refresh_delay_frames(&mut self) {
        if let Some(rate) = self.rate {
            self.delay_frames = frames_at_least_one(self.delay, rate.get());
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
