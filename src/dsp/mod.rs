//! # DSP (Digital Signal Processing) Primitives
//!
//! The building blocks of the delay engine:
//!
//! - **`delay_state`**: The `delay` / `max_delay` parameters, their
//!   conversion to frames, and the rules for when each may change.
//!
//! - **`ring_buffer`**: The circular store of past frames, sized from
//!   `max_delay` and allocated on first use.
//!
//! - **`interpolate`**: The per-buffer loop that reads delayed, linearly
//!   interpolated samples out of the ring and writes the input into it.
//!
//! - **`format`**: Sample representations and the choice of processing
//!   routine for a negotiated format.

pub mod delay_state;
pub mod format;
pub mod interpolate;
pub mod ring_buffer;
