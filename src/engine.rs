//! # Delay Engine
//!
//! One `DelayEngine` is one delay instance. It owns the parameters, the
//! negotiated format and the ring buffer, all behind a single lock:
//!
//! ```text
//!                 ┌──────────────── Mutex ────────────────┐
//! control path ──►│ DelayParameters   (delay, max_delay)  │
//!  (properties,   │ Negotiated        (format, routine)   │
//!   automation)   │ DelayBuffer       (ring, cursor)      │
//!                 │ active                                │
//! audio thread ──►│                                       │
//!                 └───────────────────────────────────────┘
//! ```
//!
//! The audio thread holds the lock for the whole of `process()`: the
//! parameter read, the allocation check and the interpolation pass. Every
//! buffer is therefore delayed with one consistent `delay` / `max_delay`
//! snapshot, and a control thread can never change the buffer size out from
//! under it.
//!
//! ## States
//!
//! ```text
//! Uninitialized ──setup──► Configured ──first process──► Allocated
//!       ▲                      ▲                             │
//!       └── setup rejected     └──────── stop / setup ───────┘
//! ```
//!
//! `stop()` also marks the stream inactive, which unlocks `max_delay`.

use std::num::{NonZeroU32, NonZeroUsize};
use std::sync::{Mutex, MutexGuard, PoisonError};

use nih_plug::util::permit_alloc;
use nih_plug::{nih_error, nih_log, nih_warn};

use crate::dsp::delay_state::{DelayParameters, DelayUpdate, MaxDelayUpdate};
use crate::dsp::format::{AudioFormat, Processor, Samples};
use crate::dsp::interpolate::{self, DelayTaps};
use crate::dsp::ring_buffer::DelayBuffer;
use crate::error::{DelayError, DelayResult};

/// Where the engine is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// No format accepted yet
    Uninitialized,
    /// Format accepted, ring not allocated yet
    Configured,
    /// Ring allocated; buffers are being delayed
    Allocated,
}

/// An accepted format, with the values the ring allocation needs already
/// validated.
#[derive(Debug, Clone, Copy)]
struct Negotiated {
    format: AudioFormat,

    /// The routine every buffer of this format goes through, and the width
    /// of the ring that backs it.
    processor: Processor,

    rate: NonZeroU32,
    channels: NonZeroUsize,
}

impl Negotiated {
    fn new(format: AudioFormat) -> DelayResult<Self> {
        // Rejects zero rates and channel counts along with integer formats,
        // so the conversions below never hit their fallback.
        let processor = Processor::for_format(&format)?;
        let rate = NonZeroU32::new(format.rate).unwrap_or(NonZeroU32::MIN);
        let channels = NonZeroUsize::new(format.channels as usize).unwrap_or(NonZeroUsize::MIN);

        Ok(Self {
            format,
            processor,
            rate,
            channels,
        })
    }
}

/// Everything the lock protects.
#[derive(Default)]
struct EngineInner {
    /// `delay` / `max_delay` and the frame counts derived from them.
    params: DelayParameters,

    /// `None` until a format is accepted, and again after one is rejected.
    negotiated: Option<Negotiated>,

    /// The ring. Unallocated until the first buffer after `setup()` or
    /// `stop()`, so it is always sized from the `max_delay` current at
    /// that moment.
    buffer: DelayBuffer,

    /// Whether a stream is running. While set, `max_delay` is frozen and
    /// an oversized `delay` is clipped instead of growing the maximum.
    active: bool,

    /// Set once a clip has been logged during the current activation.
    /// Automation can clip on every block; one warning is enough.
    clip_logged: bool,
}

impl EngineInner {
    /// Allocate the ring from the current `max_delay` if it doesn't exist.
    fn ensure_allocated(&mut self) -> DelayResult<()> {
        if self.buffer.is_allocated() {
            return Ok(());
        }
        let negotiated = self.negotiated.ok_or(DelayError::NotConfigured)?;

        self.params.set_rate(negotiated.rate);
        let size_frames = self
            .params
            .buffer_size_frames()
            .and_then(NonZeroUsize::new)
            .unwrap_or(NonZeroUsize::MIN);

        match DelayBuffer::allocate(negotiated.processor, size_frames, negotiated.channels) {
            Ok(buffer) => {
                nih_log!(
                    "Allocated delay buffer: {} frames of {} bytes, {} bytes total",
                    buffer.size_frames(),
                    negotiated.format.bytes_per_frame(),
                    buffer.byte_size()
                );
                self.buffer = buffer;
                Ok(())
            }
            Err(err) => {
                nih_error!("{err}");
                Err(err)
            }
        }
    }
}

/// A lock-guarded fractional delay line. Share it behind an `Arc` between
/// the audio thread and whatever drives the parameters.
#[derive(Default)]
pub struct DelayEngine {
    inner: Mutex<EngineInner>,
}

impl DelayEngine {
    /// A fresh engine: `delay = max_delay = 1 ns`, no format, inactive.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, EngineInner> {
        // Every critical section leaves the state consistent, so a panic
        // elsewhere doesn't invalidate it.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Accept a negotiated format and pick its processing routine.
    ///
    /// Any ring from a previous format is released, whether or not the new
    /// format is accepted. On rejection the engine is left unconfigured.
    pub fn setup(&self, format: AudioFormat) -> DelayResult<()> {
        let mut inner = self.lock();
        inner.buffer.reset();

        match Negotiated::new(format) {
            Ok(negotiated) => {
                inner.params.set_rate(negotiated.rate);
                inner.negotiated = Some(negotiated);
                Ok(())
            }
            Err(err) => {
                nih_error!(
                    "Rejected {} Hz, {} channel {} format: {err}",
                    format.rate,
                    format.channels,
                    format.sample_kind
                );
                inner.negotiated = None;
                Err(err)
            }
        }
    }

    /// Mark the stream active. From here on `max_delay` is frozen.
    pub fn start(&self) {
        let mut inner = self.lock();
        inner.active = true;
        inner.clip_logged = false;
    }

    /// Mark the stream inactive and release the ring. The negotiated format
    /// is kept, so the next `process()` reallocates from whatever
    /// `max_delay` is current by then.
    pub fn stop(&self) {
        let mut inner = self.lock();
        inner.active = false;
        inner.clip_logged = false;
        inner.buffer.reset();
    }

    /// Silence the ring and rewind its cursor without releasing it.
    pub fn flush(&self) {
        self.lock().buffer.clear();
    }

    /// Allocate the ring now instead of on the first `process()` call.
    pub fn prepare(&self) -> DelayResult<()> {
        self.lock().ensure_allocated()
    }

    /// Delay one interleaved buffer in place.
    ///
    /// Either the whole buffer is processed or nothing is touched and an
    /// error comes back.
    pub fn process(&self, samples: Samples<'_>) -> DelayResult<()> {
        let mut inner = self.lock();
        let negotiated = inner.negotiated.ok_or(DelayError::NotConfigured)?;

        let expected = negotiated.processor.sample_kind();
        if samples.kind() != expected {
            return Err(DelayError::SampleKindMismatch {
                expected,
                got: samples.kind(),
            });
        }

        inner.ensure_allocated()?;

        let taps = DelayTaps::from_parameters(&inner.params);
        match (&mut inner.buffer, samples) {
            (DelayBuffer::F32(ring), Samples::F32(data)) => interpolate::process(ring, data, taps),
            (DelayBuffer::F64(ring), Samples::F64(data)) => interpolate::process(ring, data, taps),
            (_, samples) => {
                return Err(DelayError::SampleKindMismatch {
                    expected,
                    got: samples.kind(),
                })
            }
        }

        Ok(())
    }

    /// Set the delay in nanoseconds.
    ///
    /// While active, a delay above `max_delay` is clipped to it and a
    /// warning is logged (once per activation). While inactive, `max_delay`
    /// grows to fit, and a ring sized for the old maximum is released.
    ///
    /// This runs on the audio thread when the host automates the delay.
    pub fn set_delay(&self, delay: u64) -> DelayResult<DelayUpdate> {
        let mut inner = self.lock();
        let active = inner.active;
        let previous_max = inner.params.max_delay();
        let update = inner.params.set_delay(delay, active)?;

        if inner.params.max_delay() != previous_max {
            inner.buffer.reset();
        }

        if let DelayUpdate::Clipped {
            requested,
            max_delay,
        } = update
        {
            if !inner.clip_logged {
                inner.clip_logged = true;
                // Formatting allocates; the audio thread must be allowed to.
                permit_alloc(|| {
                    nih_warn!(
                        "New delay ({requested} ns) is larger than maximum delay ({max_delay} ns)"
                    )
                });
            }
        }

        Ok(update)
    }

    /// Set the maximum delay in nanoseconds. Rejected while active.
    ///
    /// An already allocated ring is released so the next buffer gets one of
    /// the new size.
    pub fn set_max_delay(&self, max_delay: u64) -> DelayResult<MaxDelayUpdate> {
        let mut inner = self.lock();
        let active = inner.active;
        let update = inner
            .params
            .set_max_delay(max_delay, active)
            .inspect_err(|err| {
                if *err == DelayError::MaxDelayLocked {
                    nih_error!("Can't change maximum delay while the stream is active");
                }
            })?;

        if let MaxDelayUpdate::DelayLowered { delay } = update {
            nih_log!("Maximum delay ({max_delay} ns) is below the delay; delay lowered to {delay} ns");
        }
        inner.buffer.reset();

        Ok(update)
    }

    /// The committed delay in nanoseconds, after any clipping.
    pub fn delay(&self) -> u64 {
        self.lock().params.delay()
    }

    /// The maximum delay in nanoseconds. Sizes the next ring allocation.
    pub fn max_delay(&self) -> u64 {
        self.lock().params.max_delay()
    }

    /// Whole frames of delay at the negotiated rate; zero before `setup`.
    pub fn delay_frames(&self) -> usize {
        self.lock().params.delay_frames()
    }

    /// Whether `start()` was called more recently than `stop()`.
    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    pub fn format(&self) -> Option<AudioFormat> {
        self.lock().negotiated.map(|negotiated| negotiated.format)
    }

    /// Derived from the negotiated format and the ring; see the state
    /// diagram at the top of this module.
    pub fn state(&self) -> EngineState {
        let inner = self.lock();
        match (&inner.negotiated, inner.buffer.is_allocated()) {
            (None, _) => EngineState::Uninitialized,
            (Some(_), false) => EngineState::Configured,
            (Some(_), true) => EngineState::Allocated,
        }
    }

    /// Ring cursor in frames; zero when unallocated.
    pub fn buffer_pos(&self) -> usize {
        self.lock().buffer.pos()
    }

    /// Ring capacity in frames; zero when unallocated.
    pub fn buffer_size_frames(&self) -> usize {
        self.lock().buffer.size_frames()
    }

    /// How many frames of output are still owed after the input stops.
    pub fn tail_frames(&self) -> usize {
        let inner = self.lock();
        match inner.params.rate() {
            Some(_) => inner.params.delay_frames() + 1,
            None => 0,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::format::SampleKind;

    const SECOND: u64 = 1_000_000_000;

    fn stereo_f32(rate: u32) -> AudioFormat {
        AudioFormat::new(SampleKind::F32, rate, 2)
    }

    /// An engine that has negotiated a format and is streaming.
    fn running(format: AudioFormat, max_delay: u64, delay: u64) -> DelayEngine {
        let engine = DelayEngine::new();
        engine.set_max_delay(max_delay).unwrap();
        engine.set_delay(delay).unwrap();
        engine.setup(format).unwrap();
        engine.start();
        engine
    }

    #[test]
    fn test_new_engine_defaults() {
        let engine = DelayEngine::new();

        assert_eq!(engine.delay(), 1);
        assert_eq!(engine.max_delay(), 1);
        assert_eq!(engine.state(), EngineState::Uninitialized);
        assert!(!engine.is_active());
        assert_eq!(engine.format(), None);
        assert_eq!(engine.tail_frames(), 0);
    }

    /// The main scenario: one second of ring at 48 kHz, half a second of
    /// delay, a unit impulse in, a unit impulse out 24000 frames later.
    #[test]
    fn test_impulse_scenario_48k() {
        let engine = running(stereo_f32(48000), SECOND, SECOND / 2);

        let mut data = vec![0.0_f32; 72000 * 2];
        data[0] = 1.0;

        // Deliver in host-sized blocks to cover the cursor across calls.
        for block in data.chunks_mut(512 * 2) {
            engine.process(Samples::F32(block)).unwrap();
        }

        assert_eq!(engine.buffer_size_frames(), 48000);
        assert_eq!(engine.delay_frames(), 24000);
        for (i, &sample) in data.iter().enumerate() {
            let expected = if i == 24000 * 2 { 1.0 } else { 0.0 };
            assert_eq!(sample, expected, "sample {i}");
        }
    }

    /// 50 ms at 48 kHz is a whole number of frames: no blending.
    #[test]
    fn test_whole_frame_delay_has_no_offset() {
        let engine = running(stereo_f32(48000), SECOND, 50_000_000);
        assert_eq!(engine.delay_frames(), 2400);

        let inner = engine.lock();
        let taps = DelayTaps::from_parameters(&inner.params);
        assert_eq!(taps.delay_off, 0.0);
    }

    /// The wide-float routine blends toward the next slot by the
    /// fractional part of the delay.
    #[test]
    fn test_wide_float_fractional_delay() {
        let format = AudioFormat::new(SampleKind::F64, 1000, 1);
        let engine = running(format, 10_000_000, 2_500_000); // 10 frames, 2.5 frames

        let mut data = [1.0, 0.0, 0.0, 0.0, 0.0_f64];
        engine.process(Samples::F64(&mut data)).unwrap();

        let expected = [0.0, 0.5, 0.5, 0.0, 0.0];
        for (got, want) in data.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "Expected {want}, got {got}");
        }
    }

    #[test]
    fn test_setup_rejects_integer_formats() {
        let engine = DelayEngine::new();
        let format = AudioFormat::new(SampleKind::S16, 48000, 2);

        assert_eq!(
            engine.setup(format),
            Err(DelayError::UnsupportedFormat(SampleKind::S16))
        );
        assert_eq!(engine.state(), EngineState::Uninitialized);
    }

    /// A rejected renegotiation also drops the previous, working format.
    #[test]
    fn test_failed_setup_unconfigures() {
        let engine = running(stereo_f32(48000), SECOND, SECOND / 10);
        engine.prepare().unwrap();
        assert_eq!(engine.state(), EngineState::Allocated);

        let result = engine.setup(AudioFormat::new(SampleKind::S32, 48000, 2));

        assert!(result.is_err());
        assert_eq!(engine.state(), EngineState::Uninitialized);
        let mut data = [0.0_f32; 4];
        assert_eq!(
            engine.process(Samples::F32(&mut data)),
            Err(DelayError::NotConfigured)
        );
    }

    #[test]
    fn test_process_before_setup_fails() {
        let engine = DelayEngine::new();
        let mut data = [0.5_f32; 4];

        assert_eq!(
            engine.process(Samples::F32(&mut data)),
            Err(DelayError::NotConfigured)
        );
        assert_eq!(data, [0.5; 4], "Buffer must be left untouched");
    }

    #[test]
    fn test_process_rejects_wrong_sample_kind() {
        let engine = running(stereo_f32(48000), SECOND, SECOND / 10);
        let mut data = [0.5_f64; 4];

        assert_eq!(
            engine.process(Samples::F64(&mut data)),
            Err(DelayError::SampleKindMismatch {
                expected: SampleKind::F32,
                got: SampleKind::F64
            })
        );
        assert_eq!(data, [0.5; 4]);
        assert_eq!(engine.state(), EngineState::Configured);
    }

    /// Allocation waits for the first buffer, so a `max_delay` changed
    /// after negotiation still sizes the ring.
    #[test]
    fn test_allocation_is_lazy() {
        let engine = DelayEngine::new();
        engine.setup(stereo_f32(1000)).unwrap();
        assert_eq!(engine.state(), EngineState::Configured);
        assert_eq!(engine.buffer_size_frames(), 0);

        engine.set_max_delay(250_000_000).unwrap();
        engine.start();
        let mut data = [0.0_f32; 8];
        engine.process(Samples::F32(&mut data)).unwrap();

        assert_eq!(engine.state(), EngineState::Allocated);
        assert_eq!(engine.buffer_size_frames(), 250);
        assert_eq!(engine.buffer_pos(), 4);
    }

    #[test]
    fn test_empty_buffer_leaves_cursor() {
        let engine = running(stereo_f32(1000), SECOND, SECOND / 100);
        let mut data = [0.1_f32, 0.2, 0.3, 0.4];
        engine.process(Samples::F32(&mut data)).unwrap();
        assert_eq!(engine.buffer_pos(), 2);

        let mut empty: [f32; 0] = [];
        engine.process(Samples::F32(&mut empty)).unwrap();

        assert_eq!(engine.buffer_pos(), 2);
    }

    #[test]
    fn test_delay_clipped_while_active() {
        let engine = running(stereo_f32(48000), SECOND, SECOND / 2);

        let update = engine.set_delay(3 * SECOND).unwrap();

        assert_eq!(
            update,
            DelayUpdate::Clipped {
                requested: 3 * SECOND,
                max_delay: SECOND
            }
        );
        assert_eq!(engine.delay(), SECOND);
        assert_eq!(engine.max_delay(), SECOND);
        assert_eq!(engine.delay_frames(), 48000);
    }

    /// Automation that keeps clipping warns once per activation, and the
    /// delay stays clipped every time.
    #[test]
    fn test_clip_warning_once_per_activation() {
        let engine = running(stereo_f32(48000), SECOND, SECOND / 2);
        assert!(!engine.lock().clip_logged);

        for requested in [2 * SECOND, 3 * SECOND] {
            let update = engine.set_delay(requested).unwrap();
            assert!(matches!(update, DelayUpdate::Clipped { .. }));
            assert_eq!(engine.delay(), SECOND);
            assert!(engine.lock().clip_logged);
        }

        engine.stop();
        assert!(!engine.lock().clip_logged);
        engine.start();
        assert!(!engine.lock().clip_logged);
        engine.set_delay(4 * SECOND).unwrap();
        assert!(engine.lock().clip_logged);
    }

    /// Growing the delay while stopped also grows `max_delay`, so a ring
    /// prepared for the old maximum has to go. Otherwise the read tap would
    /// reach past the ring and the impulse would come out early.
    #[test]
    fn test_growing_delay_while_stopped_resizes_ring() {
        let engine = DelayEngine::new();
        engine.setup(AudioFormat::new(SampleKind::F32, 1000, 1)).unwrap();
        engine.set_max_delay(4_000_000).unwrap();
        engine.set_delay(2_000_000).unwrap();
        engine.prepare().unwrap();
        assert_eq!(engine.buffer_size_frames(), 4);

        engine.set_delay(8_000_000).unwrap();
        assert_eq!(engine.max_delay(), 8_000_000);
        assert_eq!(engine.state(), EngineState::Configured);

        engine.start();
        let mut data = [0.0_f32; 12];
        data[0] = 1.0;
        engine.process(Samples::F32(&mut data)).unwrap();

        assert_eq!(engine.buffer_size_frames(), 8);
        assert_eq!(engine.delay_frames(), 8);
        assert!(engine.delay_frames() <= engine.buffer_size_frames());
        for (i, &sample) in data.iter().enumerate() {
            let expected = if i == 8 { 1.0 } else { 0.0 };
            assert_eq!(sample, expected, "frame {i}");
        }
    }

    /// A delay that fits the current maximum leaves a prepared ring alone.
    #[test]
    fn test_delay_within_max_keeps_ring() {
        let engine = DelayEngine::new();
        engine.setup(AudioFormat::new(SampleKind::F32, 1000, 1)).unwrap();
        engine.set_max_delay(4_000_000).unwrap();
        engine.prepare().unwrap();

        engine.set_delay(3_000_000).unwrap();

        assert_eq!(engine.state(), EngineState::Allocated);
        assert_eq!(engine.buffer_size_frames(), 4);
    }

    /// A ring too large to allocate fails the buffer without touching it,
    /// and the engine stays ready to try again.
    #[test]
    fn test_allocation_failure_leaves_buffer_untouched() {
        let engine = DelayEngine::new();
        engine.setup(AudioFormat::new(SampleKind::F64, 192_000, 8)).unwrap();
        engine.set_max_delay(u64::MAX).unwrap();
        engine.start();

        let mut data = [0.5_f64; 16];
        let result = engine.process(Samples::F64(&mut data));

        assert!(
            matches!(result, Err(DelayError::Allocation { .. })),
            "Expected an allocation error, got {result:?}"
        );
        assert_eq!(data, [0.5; 16]);
        assert_eq!(engine.state(), EngineState::Configured);
        assert_eq!(engine.buffer_size_frames(), 0);
        assert_eq!(engine.buffer_pos(), 0);
    }

    #[test]
    fn test_max_delay_locked_while_active() {
        let engine = running(stereo_f32(48000), SECOND, SECOND / 2);

        assert_eq!(
            engine.set_max_delay(2 * SECOND),
            Err(DelayError::MaxDelayLocked)
        );
        assert_eq!(engine.set_max_delay(1), Err(DelayError::MaxDelayLocked));
        assert_eq!(engine.delay(), SECOND / 2);
        assert_eq!(engine.max_delay(), SECOND);
    }

    /// Once stopped, `max_delay` unlocks, the ring is gone, and the next
    /// buffer is delayed through a ring of the new size.
    #[test]
    fn test_stop_releases_and_reallocates() {
        let engine = running(stereo_f32(1000), SECOND, SECOND / 10);
        let mut data = [0.0_f32; 20];
        engine.process(Samples::F32(&mut data)).unwrap();
        assert_eq!(engine.buffer_size_frames(), 1000);

        engine.stop();
        assert!(!engine.is_active());
        assert_eq!(engine.buffer_pos(), 0);
        assert_eq!(engine.buffer_size_frames(), 0);
        assert_eq!(engine.state(), EngineState::Configured);

        engine.set_max_delay(SECOND / 2).unwrap();
        engine.start();
        engine.process(Samples::F32(&mut data)).unwrap();
        assert_eq!(engine.buffer_size_frames(), 500);
        assert_eq!(engine.buffer_pos(), 10);
    }

    /// Shrinking the maximum below the delay drags the delay down, so the
    /// read tap still fits in the ring that gets allocated.
    #[test]
    fn test_shrinking_max_delay_lowers_delay() {
        let engine = DelayEngine::new();
        engine.setup(AudioFormat::new(SampleKind::F32, 1000, 1)).unwrap();
        engine.set_delay(8_000_000).unwrap(); // 8 frames

        let update = engine.set_max_delay(3_000_000).unwrap();
        assert_eq!(update, MaxDelayUpdate::DelayLowered { delay: 3_000_000 });
        assert_eq!(engine.delay_frames(), 3);

        engine.start();
        let mut data = [1.0, 0.0, 0.0, 0.0, 0.0_f32];
        engine.process(Samples::F32(&mut data)).unwrap();
        assert_eq!(data, [0.0, 0.0, 0.0, 1.0, 0.0]);
    }

    /// Flushing keeps the allocation but forgets the audio.
    #[test]
    fn test_flush_silences_ring() {
        let engine = running(AudioFormat::new(SampleKind::F32, 1000, 1), 4_000_000, 2_000_000);
        let mut data = [1.0_f32, 1.0];
        engine.process(Samples::F32(&mut data)).unwrap();

        engine.flush();
        assert_eq!(engine.state(), EngineState::Allocated);
        assert_eq!(engine.buffer_pos(), 0);

        let mut data = [0.0_f32; 4];
        engine.process(Samples::F32(&mut data)).unwrap();
        assert_eq!(data, [0.0; 4]);
    }

    /// Renegotiating at a new rate rescales the delay and the ring.
    #[test]
    fn test_rate_change_rescales() {
        let engine = running(stereo_f32(1000), SECOND, SECOND / 4);
        engine.prepare().unwrap();
        assert_eq!(engine.buffer_size_frames(), 1000);
        assert_eq!(engine.delay_frames(), 250);

        engine.setup(stereo_f32(2000)).unwrap();
        assert_eq!(engine.state(), EngineState::Configured);
        assert_eq!(engine.delay_frames(), 500);

        engine.prepare().unwrap();
        assert_eq!(engine.buffer_size_frames(), 2000);
        assert_eq!(engine.tail_frames(), 501);
    }

    /// The control path and the audio thread share one engine.
    #[test]
    fn test_concurrent_parameter_updates() {
        use std::sync::Arc;
        use std::thread;

        let engine = Arc::new(running(stereo_f32(48000), SECOND, SECOND / 2));

        let control = {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for step in 1..=200_u64 {
                    engine.set_delay(step * 10_000_000).unwrap();
                    assert!(engine.set_max_delay(SECOND / 3).is_err());
                }
            })
        };

        let mut data = vec![0.0_f32; 256 * 2];
        for _ in 0..200 {
            engine.process(Samples::F32(&mut data)).unwrap();
        }
        control.join().unwrap();

        assert_eq!(engine.max_delay(), SECOND);
        assert_eq!(engine.delay(), SECOND);
        assert!(engine.delay_frames() <= engine.buffer_size_frames());
    }
}
