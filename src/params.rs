//! # Plugin Parameters
//!
//! The host (and the UI, and automation) own these values. The audio thread
//! never holds a reference into them while processing: once per sample it
//! copies the current smoothed values into a [`ModulationParams`] snapshot
//! and hands that to the engine.
//!
//! Every parameter has a stable string ID (`#[id = "..."]`) that the host
//! uses to save and recall presets. Once published, never change these IDs
//! or existing sessions will lose their settings.
//!
//! Ranges are enforced here, by nih-plug: the engine trusts that whatever it
//! receives is inside the documented bounds.

use nih_plug::prelude::*;

/// Which delay window the LFO sweeps.
#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectMode {
    /// 5 ms to 30 ms: detuned doubling.
    #[name = "Chorus"]
    Chorus,
    /// 1 ms to 5 ms: sweeping comb filter.
    #[name = "Flanger"]
    Flanger,
}

/// A plain copy of every value the engine reads for one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModulationParams {
    /// Dry/wet balance, `0.0..=1.0`. 0 = dry only, 1 = wet only.
    pub mix: f32,
    /// Share of the delayed signal fed back into the line, `0.0..=0.98`.
    pub feedback: f32,
    /// How much of the mode's delay window the LFO sweeps, `0.0..=1.0`.
    pub depth: f32,
    /// LFO rate, `0.1..=20.0` Hz.
    pub rate_hz: f32,
    /// Right channel LFO phase shift as a fraction of one cycle, `0.0..=1.0`.
    pub phase_offset: f32,
    pub mode: EffectMode,
}

impl Default for ModulationParams {
    fn default() -> Self {
        Self {
            mix: 0.5,
            feedback: 0.5,
            depth: 0.5,
            rate_hz: 10.0,
            phase_offset: 0.0,
            mode: EffectMode::Chorus,
        }
    }
}

/// All user-facing parameters for Cool Chorus.
#[derive(Params)]
pub struct ChorusParams {
    /// **Dry/Wet**: linear crossfade between the input and the modulated
    /// copy. 50% is the classic chorus blend; 100% turns the chorus into a
    /// vibrato.
    #[id = "drywet"]
    pub mix: FloatParam,

    /// **Feedback**: how much of the delayed signal goes back into the
    /// delay line. Makes flanging resonant and metallic. Capped at 98% so
    /// the loop always decays.
    #[id = "fdbk"]
    pub feedback: FloatParam,

    /// **Depth**: width of the delay sweep within the current mode's window.
    #[id = "depth"]
    pub depth: FloatParam,

    /// **Rate**: LFO speed. Skewed so slow, lush settings get most of the
    /// knob travel.
    #[id = "rate"]
    pub rate: FloatParam,

    /// **Phase Offset**: how far the right channel's LFO runs ahead of the
    /// left, as a fraction of a cycle. 0% is mono-compatible; 25-50% gives
    /// the widest stereo image.
    #[id = "phase"]
    pub phase_offset: FloatParam,

    /// **Type**: chorus or flanger delay window.
    #[id = "type"]
    pub mode: EnumParam<EffectMode>,
}

impl Default for ChorusParams {
    fn default() -> Self {
        let defaults = ModulationParams::default();

        Self {
            mix: percentage_param("Dry/Wet", defaults.mix, 1.0),

            feedback: percentage_param("Feedback", defaults.feedback, 0.98),

            depth: percentage_param("Depth", defaults.depth, 1.0),

            rate: FloatParam::new(
                "Rate",
                defaults.rate_hz,
                FloatRange::Skewed {
                    min: 0.1,
                    max: 20.0,
                    factor: FloatRange::skew_factor(-1.5),
                },
            )
            .with_unit(" Hz")
            .with_smoother(SmoothingStyle::Linear(20.0))
            .with_value_to_string(formatters::v2s_f32_rounded(2)),

            phase_offset: percentage_param("Phase Offset", defaults.phase_offset, 1.0),

            mode: EnumParam::new("Type", defaults.mode),
        }
    }
}

impl ChorusParams {
    /// Take the next smoothed value of every parameter.
    ///
    /// Call exactly once per sample: each call advances the smoothers.
    pub fn next_snapshot(&self) -> ModulationParams {
        ModulationParams {
            mix: self.mix.smoothed.next(),
            feedback: self.feedback.smoothed.next(),
            depth: self.depth.smoothed.next(),
            rate_hz: self.rate.smoothed.next(),
            phase_offset: self.phase_offset.smoothed.next(),
            mode: self.mode.value(),
        }
    }
}

/// A `0..=max` parameter shown as a percentage.
fn percentage_param(name: &'static str, default: f32, max: f32) -> FloatParam {
    FloatParam::new(name, default, FloatRange::Linear { min: 0.0, max })
        .with_unit("%")
        .with_smoother(SmoothingStyle::Linear(20.0))
        .with_value_to_string(formatters::v2s_f32_percentage(1))
        .with_string_to_value(formatters::s2v_f32_percentage())
}
