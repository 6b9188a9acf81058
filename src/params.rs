//! # Plugin Parameters
//!
//! The host sees two parameters, in milliseconds:
//!
//! - **Delay**: how far behind the input the output runs. Automatable,
//!   and with sample-accurate automation enabled every automation point
//!   reaches the engine before the samples that follow it.
//! - **Max Delay**: the size of the ring buffer. Marked non-automatable;
//!   the engine refuses to change it while audio is running.
//!
//! The engine works in integer nanoseconds. Every change is forwarded
//! through a parameter callback straight into the engine, which takes its
//! lock, so a value set from the GUI thread and a value set by automation
//! on the audio thread go through the same rules.
//!
//! Unique string IDs (`#[id = "..."]`) are what presets store. Never
//! rename them.

use std::sync::Arc;

use nih_plug::prelude::*;

use crate::dsp::delay_state::MIN_DELAY_NS;
use crate::engine::DelayEngine;
use crate::error::DelayResult;

const NANOS_PER_MILLISECOND: f64 = 1_000_000.0;

/// Convert a host value in milliseconds to engine nanoseconds, rounded to
/// the nearest nanosecond and never below the engine's minimum.
pub fn ms_to_ns(ms: f32) -> u64 {
    // Float-to-int casts saturate, and NaN becomes zero.
    let ns = (f64::from(ms) * NANOS_PER_MILLISECOND).round() as u64;
    ns.max(MIN_DELAY_NS)
}

/// All user-facing parameters of the delay plugin.
#[derive(Params)]
pub struct PluginParams {
    /// **Delay**: 0 to 1000 ms, default 500 ms.
    ///
    /// The range is skewed so that short delays, where small changes are
    /// audible, get more of the knob travel. A value of 0 ms still delays
    /// by one frame: the engine's shortest delay.
    #[id = "delay"]
    pub delay: FloatParam,

    /// **Max Delay**: 1 to 5000 ms, default 1000 ms.
    ///
    /// Sets how much audio the ring buffer can hold. Only takes effect
    /// while the plugin is deactivated; a delay above it is clipped.
    #[id = "maxdelay"]
    pub max_delay: FloatParam,
}

impl PluginParams {
    /// Build the parameter set, wiring each parameter to `engine`.
    pub fn new(engine: Arc<DelayEngine>) -> Self {
        let delay_engine = Arc::clone(&engine);
        let max_delay_engine = engine;

        Self {
            delay: FloatParam::new(
                "Delay",
                500.0,
                FloatRange::Skewed {
                    min: 0.0,
                    max: 1000.0,
                    factor: FloatRange::skew_factor(-1.0),
                },
            )
            .with_unit(" ms")
            .with_step_size(0.1)
            .with_callback(Arc::new(move |ms| {
                // Clipping is reported by the engine's own logging.
                let _ = delay_engine.set_delay(ms_to_ns(ms));
            })),

            max_delay: FloatParam::new(
                "Max Delay",
                1000.0,
                FloatRange::Linear {
                    min: 1.0,
                    max: 5000.0,
                },
            )
            .with_unit(" ms")
            .with_step_size(1.0)
            .non_automatable()
            .with_callback(Arc::new(move |ms| {
                // Rejected while active; the engine logs the error.
                let _ = max_delay_engine.set_max_delay(ms_to_ns(ms));
            })),
        }
    }

    /// Copy the current host values into `engine`.
    ///
    /// `max_delay` goes first so that the delay is checked against the new
    /// maximum. Call while the engine is inactive.
    pub fn sync_engine(&self, engine: &DelayEngine) -> DelayResult<()> {
        engine.set_max_delay(ms_to_ns(self.max_delay.value()))?;
        engine.set_delay(ms_to_ns(self.delay.value()))?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────
