//! # Audio Delay: A Fractional-Delay AU/VST3/CLAP Plugin
//!
//! Reproduces every input sample after a configurable delay. Delays that
//! are not a whole number of frames are realized by linear interpolation,
//! and a hard maximum delay bounds the memory the effect may use. Built
//! with [nih-plug](https://github.com/robbert-vdh/nih-plug) and exported as
//! Audio Unit (AUv2), VST3, and CLAP from a single codebase.
//!
//! ## Signal Flow
//!
//! ```text
//!           ┌─────────── interleave ───────────┐
//! Input ───►│  [L0 R0 L1 R1 ...]               │
//!           │        │                         │
//!           │        ▼                         │
//!           │  ┌───────────────────────────┐   │
//!           │  │ DelayEngine (locked)      │   │
//!           │  │  read  s0, s1  ◄── ring   │   │
//!           │  │  out = s0 + (s1-s0)·off   │   │
//!           │  │  write input  ──► ring    │   │
//!           │  └───────────────────────────┘   │
//!           │        │                         │
//!           └────────┼─── de-interleave ───────┘
//!                    ▼
//!                 Output (100% wet)
//! ```
//!
//! The engine itself ([`engine::DelayEngine`]) knows nothing about plugin
//! hosts and can be embedded directly; this file is the nih-plug glue.

pub mod dsp;
pub mod engine;
pub mod error;
pub mod params;

use std::num::NonZeroU32;
use std::sync::Arc;

use dsp::format::{AudioFormat, SampleKind, Samples};
use engine::DelayEngine;
use nih_plug::prelude::*;
use nih_plug::util::permit_alloc;
use params::PluginParams;

pub use engine::EngineState;
pub use error::{DelayError, DelayResult};

/// The main plugin struct.
///
/// The engine is shared: the parameter callbacks hold one handle to it and
/// the audio thread holds this one. Both go through the engine's lock.
struct AudioDelay {
    /// Parameters shared with the host.
    ///
    /// This is an `Arc` because the host (and any GUI) reads parameter
    /// values from other threads while audio is processing. Each parameter
    /// holds its own handle to `engine` for its callback.
    params: Arc<PluginParams>,

    /// The delay line itself.
    ///
    /// Shared with the parameter callbacks, which run on the GUI thread for
    /// user edits and on the audio thread for automation. The engine's lock
    /// serializes them against `process()`.
    engine: Arc<DelayEngine>,

    /// Scratch space for the interleaved copy of each host buffer. Sized in
    /// `initialize()` for the host's largest block, so `process()` never
    /// allocates for it.
    interleaved: Vec<f32>,
}

impl Default for AudioDelay {
    fn default() -> Self {
        let engine = Arc::new(DelayEngine::new());
        Self {
            params: Arc::new(PluginParams::new(Arc::clone(&engine))),
            engine,
            // Populated in initialize() once the block size is known.
            interleaved: Vec::new(),
        }
    }
}

impl Plugin for AudioDelay {
    const NAME: &'static str = "Audio Delay";
    const VENDOR: &'static str = "Loveless Audio";
    const URL: &'static str = "";
    const EMAIL: &'static str = "steve.loveless@gmail.com";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    // The host picks the first layout it supports. The engine itself takes
    // any channel count; these two are what the plugin advertises.
    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[
        // Stereo in, stereo out. Both channels share one ring and one delay.
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(2),
            main_output_channels: NonZeroU32::new(2),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
        // Mono in, mono out, for mono tracks.
        AudioIOLayout {
            main_input_channels: NonZeroU32::new(1),
            main_output_channels: NonZeroU32::new(1),
            aux_input_ports: &[],
            aux_output_ports: &[],
            names: PortNames::const_default(),
        },
    ];

    // An audio effect; nothing to play.
    const MIDI_INPUT: MidiConfig = MidiConfig::None;

    // Automation points split the buffer, and the delay callback updates
    // the engine between the pieces, so each sub-block is delayed with the
    // value that was current at its first sample.
    const SAMPLE_ACCURATE_AUTOMATION: bool = true;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    /// Negotiate the format with the engine and start streaming.
    ///
    /// nih-plug always delivers 32-bit floats, so the format is `F32` at
    /// the host's rate and channel count. The ring buffer is *not* sized
    /// here; that waits for the first `process()` call.
    fn initialize(
        &mut self,
        audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        let channels = audio_io_layout
            .main_input_channels
            .map(NonZeroU32::get)
            .unwrap_or(2);
        let rate = buffer_config.sample_rate.round() as u32;

        // Some hosts re-initialize without deactivating first.
        self.engine.stop();

        if self
            .engine
            .setup(AudioFormat::new(SampleKind::F32, rate, channels))
            .is_err()
        {
            return false;
        }
        if let Err(err) = self.params.sync_engine(&self.engine) {
            nih_error!("Failed to apply delay parameters: {err}");
            return false;
        }

        self.interleaved = vec![0.0; buffer_config.max_buffer_size as usize * channels as usize];
        self.engine.start();

        true
    }

    /// Called when playback stops or the plugin is bypassed. Clears the
    /// ring so stale audio doesn't come out when playback resumes.
    fn reset(&mut self) {
        self.engine.flush();
    }

    /// The stream is over: unlock `max_delay` and free the ring.
    fn deactivate(&mut self) {
        self.engine.stop();
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        _context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        // The ring is allocated on the first buffer after initialize(). That
        // is the only allocation allowed on the audio thread.
        if permit_alloc(|| self.engine.prepare()).is_err() {
            return ProcessStatus::Error("Failed to allocate the delay buffer");
        }

        let channels = buffer.channels();
        let len = buffer.samples() * channels;
        let Some(interleaved) = self.interleaved.get_mut(..len) else {
            return ProcessStatus::Error("Host buffer exceeds the negotiated block size");
        };

        // nih-plug hands out one slice per channel; the engine wants frames.
        for (channel, samples) in buffer.as_slice().iter().enumerate() {
            for (frame, &sample) in samples.iter().enumerate() {
                interleaved[frame * channels + channel] = sample;
            }
        }

        if self.engine.process(Samples::F32(&mut *interleaved)).is_err() {
            return ProcessStatus::Error("Delay engine failed to process the buffer");
        }

        // Output is 100% wet: the delayed signal replaces the input.
        for (channel, samples) in buffer.as_slice().iter_mut().enumerate() {
            for (frame, sample) in samples.iter_mut().enumerate() {
                *sample = interleaved[frame * channels + channel];
            }
        }

        // Keep the host calling process() after the input goes silent until
        // the last delayed sample is out.
        let tail = u32::try_from(self.engine.tail_frames()).unwrap_or(u32::MAX);
        ProcessStatus::Tail(tail)
    }
}

// ─────────────────────────────────────────────────────────────────────
// Plugin format trait implementations
// ─────────────────────────────────────────────────────────────────────

impl ClapPlugin for AudioDelay {
    const CLAP_ID: &'static str = "com.loveless-audio.audio-delay";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("A fractional delay with a fixed maximum delay");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Mono,
        ClapFeature::Delay,
    ];
}

impl Vst3Plugin for AudioDelay {
    const VST3_CLASS_ID: [u8; 16] = *b"LvlssAudioDelay1";

    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Delay];
}

// ─────────────────────────────────────────────────────────────────────
// Export macros
// ─────────────────────────────────────────────────────────────────────
//
// nih_export_clap! exports the `clap_entry` symbol for CLAP hosts.
// nih_export_vst3! exports `GetPluginFactory` for VST3 hosts.
// clap_wrapper re-exports the CLAP entry point as AUv2 for Logic Pro.

nih_export_clap!(AudioDelay);
nih_export_vst3!(AudioDelay);

clap_wrapper::export_auv2!();
