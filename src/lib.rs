//! # Cool Chorus: An AU/VST3/CLAP Chorus & Flanger Plugin
//!
//! A stereo modulation effect built with
//! [nih-plug](https://github.com/robbert-vdh/nih-plug). One engine covers
//! both chorus and flanger: the mode only picks how far the LFO sweeps the
//! delay time.
//!
//! ## Signal Flow
//!
//! ```text
//! Input ──┬──────────────────────────────────────── × (1 - mix) ───┐
//!         │                                                        │
//!         │    ┌────────────── FEEDBACK LOOP ────────────┐         │
//!         │    │                                         │         │
//!         └──►(+)──► [Delay Line] ──► [Fractional Read] ─┴─ × mix ►(+)──► Output
//!                          ▲                 ▲
//!                          │                 │ read position
//!                    write head     [LFO] ──► [Delay Window] ──► [Smoother]
//!                                            (chorus 5-30 ms,
//!                                             flanger 1-5 ms)
//! ```
//!
//! The DSP lives in [`engine`] and [`dsp`]; this file is the host glue.

pub mod dsp;
pub mod engine;
pub mod params;

use std::num::NonZeroU32;
use std::sync::Arc;

use engine::ChorusEngine;
use nih_plug::prelude::*;
use params::ChorusParams;

/// Longest delay the lines are sized for. The widest mode only needs 30 ms;
/// the rest is headroom.
pub const MAX_DELAY_SECONDS: f32 = 2.0;

/// The main plugin struct.
///
/// Parameters are shared with the host through an `Arc` and may be written
/// from any thread. The engine is owned by the audio thread and only touched
/// in `initialize()`, `reset()` and `process()`, which the host never runs
/// concurrently.
struct CoolChorus {
    params: Arc<ChorusParams>,
    engine: ChorusEngine,
}

impl Default for CoolChorus {
    fn default() -> Self {
        Self {
            params: Arc::new(ChorusParams::default()),
            // Unprepared until initialize() knows the sample rate.
            engine: ChorusEngine::new(),
        }
    }
}

impl Plugin for CoolChorus {
    const NAME: &'static str = "Cool Chorus";
    const VENDOR: &'static str = "Loveless Audio";
    const URL: &'static str = "";
    const EMAIL: &'static str = "steve.loveless@gmail.com";
    const VERSION: &'static str = env!("CARGO_PKG_VERSION");

    // The effect is inherently stereo: the right channel's LFO is offset
    // from the left's.
    const AUDIO_IO_LAYOUTS: &'static [AudioIOLayout] = &[AudioIOLayout {
        main_input_channels: NonZeroU32::new(2),
        main_output_channels: NonZeroU32::new(2),
        aux_input_ports: &[],
        aux_output_ports: &[],
        names: PortNames::const_default(),
    }];

    const MIDI_INPUT: MidiConfig = MidiConfig::None;
    const SAMPLE_ACCURATE_AUTOMATION: bool = true;

    type SysExMessage = ();
    type BackgroundTask = ();

    fn params(&self) -> Arc<dyn Params> {
        self.params.clone()
    }

    /// Called when the plugin is loaded or the sample rate changes. This is
    /// the only place the delay lines are allocated.
    ///
    /// Returning `false` tells the host this configuration can't be used.
    fn initialize(
        &mut self,
        _audio_io_layout: &AudioIOLayout,
        buffer_config: &BufferConfig,
        _context: &mut impl InitContext<Self>,
    ) -> bool {
        let sample_rate = buffer_config.sample_rate;

        if !self.engine.prepare(sample_rate, MAX_DELAY_SECONDS) {
            nih_log!(
                "Cannot size delay lines for {sample_rate} Hz x {MAX_DELAY_SECONDS} s, rejecting configuration"
            );
            return false;
        }

        nih_log!(
            "Prepared at {sample_rate} Hz with {} samples per delay line",
            self.engine.capacity()
        );
        true
    }

    /// Called when playback stops or the plugin is bypassed. Runs on the
    /// audio thread, so this clears state without reallocating.
    fn reset(&mut self) {
        self.engine.reset();
    }

    fn process(
        &mut self,
        buffer: &mut Buffer,
        _aux: &mut AuxiliaryBuffers,
        _context: &mut impl ProcessContext<Self>,
    ) -> ProcessStatus {
        for mut channel_samples in buffer.iter_samples() {
            // One snapshot per sample: advances every parameter smoother once.
            let params = self.params.next_snapshot();

            let (Some(left), Some(right)) = (
                channel_samples.get_mut(0).map(|sample| *sample),
                channel_samples.get_mut(1).map(|sample| *sample),
            ) else {
                continue;
            };

            let (left_out, right_out) = self.engine.process_frame(left, right, &params);

            if let Some(sample) = channel_samples.get_mut(0) {
                *sample = finite_or_silence(left_out);
            }
            if let Some(sample) = channel_samples.get_mut(1) {
                *sample = finite_or_silence(right_out);
            }
        }

        // Modulation tails are a few tens of milliseconds; no tail reporting.
        ProcessStatus::Normal
    }
}

/// A NaN or infinite sample can take down the host's whole mix bus.
fn finite_or_silence(sample: f32) -> f32 {
    if sample.is_finite() {
        sample
    } else {
        0.0
    }
}

// ─────────────────────────────────────────────────────────────────────
// Plugin format trait implementations
// ─────────────────────────────────────────────────────────────────────

impl ClapPlugin for CoolChorus {
    const CLAP_ID: &'static str = "com.loveless-audio.cool-chorus";
    const CLAP_DESCRIPTION: Option<&'static str> =
        Some("A stereo chorus and flanger with feedback and LFO phase offset");
    const CLAP_MANUAL_URL: Option<&'static str> = None;
    const CLAP_SUPPORT_URL: Option<&'static str> = None;
    const CLAP_FEATURES: &'static [ClapFeature] = &[
        ClapFeature::AudioEffect,
        ClapFeature::Stereo,
        ClapFeature::Chorus,
        ClapFeature::Flanger,
    ];
}

impl Vst3Plugin for CoolChorus {
    const VST3_CLASS_ID: [u8; 16] = *b"LvlssCoolChorus1";

    const VST3_SUBCATEGORIES: &'static [Vst3SubCategory] =
        &[Vst3SubCategory::Fx, Vst3SubCategory::Modulation, Vst3SubCategory::Stereo];
}

nih_export_clap!(CoolChorus);
nih_export_vst3!(CoolChorus);

// AUv2 entry point for Logic Pro, wrapping the CLAP build.
clap_wrapper::export_auv2!();
