//! # Stereo Modulation Engine
//!
//! Everything the plugin does to audio happens here, one stereo frame at a
//! time. The engine owns two delay lines, one LFO, the delay-time smoother
//! and the feedback memory. It knows nothing about hosts, buffers or
//! parameter objects: it is prepared with a sample rate and then fed frames
//! plus a [`ModulationParams`] snapshot.
//!
//! ## Per-sample algorithm
//!
//! ```text
//!            ┌──────────────┐  left: smoothed   ┌──────────────┐
//!  LFO ──┬──►│ delay window │──────────────────►│ seconds→samp │──┐
//!        │   │ (mode/depth) │  right: raw       └──────────────┘  │
//!        └──►│ +phaseOffset │─────────────────────────────────────┤
//!            └──────────────┘                                     ▼
//!  in ──┬──►(+)──► [delay line] ──► fractional read ──┬──► × mix ──►(+)──► out
//!       │    ▲                                        │              ▲
//!       │    └──────────── × feedback ◄───────────────┘              │
//!       └──────────────────────────── × (1 - mix) ───────────────────┘
//! ```
//!
//! 1. Read the LFO for the left channel (`phase`) and the right channel
//!    (`phase + phase_offset`).
//! 2. Map both to a delay time in seconds; smooth the left one.
//! 3. Convert seconds to samples.
//! 4. Write `input + feedback` into each delay line.
//! 5. Read each line `delay_samples` behind the write head.
//! 6. Interpolate between the two bracketing samples.
//! 7. Store `delayed * feedback` for the next sample.
//! 8. Output `dry * (1 - mix) + delayed * mix` (linear crossfade, not
//!    equal power).
//! 9. Advance the write heads and the LFO.
//!
//! Only the left delay time goes through the smoother. The right channel
//! follows the raw mapped value. The two channels therefore sweep with a
//! slightly different shape even at zero phase offset, which is part of the
//! stereo character of this effect.
//!
//! ## Real-time rules
//!
//! `process` and `process_frame` never allocate, lock, log or block, and do
//! a fixed amount of work per sample. `prepare` allocates and must only be
//! called while the audio thread is not processing.

use std::num::NonZeroUsize;

use nih_plug::prelude::*;

use crate::dsp::delay_line::DelayLine;
use crate::dsp::delay_time::{map_delay_seconds, DelaySmoother};
use crate::dsp::lfo::Lfo;
use crate::params::ModulationParams;

/// A stereo chorus/flanger.
///
/// Starts out unprepared. [`prepare()`](Self::prepare) allocates the delay
/// lines for a sample rate; after that, `process` can be called any number
/// of times until the next `prepare`.
pub struct ChorusEngine {
    sample_rate: f32,

    /// Left and right delay lines. Empty until `prepare()` succeeds.
    delay_lines: Vec<DelayLine>,

    lfo: Lfo,

    /// Smooths the left channel's delay time only.
    delay_smoother: DelaySmoother,

    /// Last delayed sample per channel, already scaled by the feedback gain.
    feedback: [f32; 2],
}

impl Default for ChorusEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ChorusEngine {
    pub fn new() -> Self {
        Self {
            sample_rate: 0.0,
            delay_lines: Vec::new(),
            lfo: Lfo::new(),
            delay_smoother: DelaySmoother::new(),
            feedback: [0.0; 2],
        }
    }

    pub fn is_prepared(&self) -> bool {
        self.delay_lines.len() == 2
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Samples each delay line holds, or 0 when unprepared.
    pub fn capacity(&self) -> usize {
        self.delay_lines.first().map_or(0, DelayLine::capacity)
    }

    /// Allocate both delay lines for `sample_rate` and reset all state.
    ///
    /// The lines hold `floor(sample_rate * max_delay_seconds)` samples.
    /// Returns `false`, leaving the engine unprepared, when that is not a
    /// positive, finite number of samples.
    ///
    /// Allocates. Never call this from the audio thread while processing.
    pub fn prepare(&mut self, sample_rate: f32, max_delay_seconds: f32) -> bool {
        self.delay_lines.clear();
        self.sample_rate = 0.0;
        self.reset();

        let samples = (sample_rate * max_delay_seconds).floor();
        if !samples.is_finite() || samples < 1.0 {
            return false;
        }
        let Some(capacity) = NonZeroUsize::new(samples as usize) else {
            return false;
        };

        self.sample_rate = sample_rate;
        self.delay_lines = (0..2).map(|_| DelayLine::new(capacity)).collect();

        true
    }

    /// Silence the delay lines and rewind LFO, smoother and feedback without
    /// reallocating. Safe to call from the audio thread.
    pub fn reset(&mut self) {
        for delay_line in &mut self.delay_lines {
            delay_line.clear();
        }
        self.lfo.reset();
        self.delay_smoother.reset();
        self.feedback = [0.0; 2];
    }

    /// Current LFO phase in `[0, 1)`.
    pub fn lfo_phase(&self) -> f32 {
        self.lfo.phase()
    }

    /// Last smoothed left-channel delay time in seconds.
    pub fn smoothed_delay_seconds(&self) -> Option<f32> {
        self.delay_smoother.current()
    }

    /// Process a block in place with one parameter snapshot for every sample.
    ///
    /// Both slices should have the same length; if they don't, only the
    /// shorter length is processed.
    pub fn process(&mut self, left: &mut [f32], right: &mut [f32], params: &ModulationParams) {
        nih_debug_assert_eq!(left.len(), right.len());

        for (left_sample, right_sample) in left.iter_mut().zip(right.iter_mut()) {
            let (left_out, right_out) = self.process_frame(*left_sample, *right_sample, params);
            *left_sample = left_out;
            *right_sample = right_out;
        }
    }

    /// Process one stereo frame and return the output frame.
    ///
    /// Calling this before a successful `prepare()` is a contract violation:
    /// debug builds report a failed debug assertion, and the input is passed
    /// through untouched.
    pub fn process_frame(
        &mut self,
        left: f32,
        right: f32,
        params: &ModulationParams,
    ) -> (f32, f32) {
        let [left_line, right_line] = self.delay_lines.as_mut_slice() else {
            nih_debug_assert_failure!("ChorusEngine::process called before prepare()");
            return (left, right);
        };

        // Steps 1-3: LFO → delay time in samples.
        let left_target = map_delay_seconds(self.lfo.value(), params.depth, params.mode);
        let right_seconds = map_delay_seconds(
            self.lfo.value_with_offset(params.phase_offset),
            params.depth,
            params.mode,
        );
        let left_seconds = self.delay_smoother.next(left_target);

        let left_delay = left_seconds * self.sample_rate;
        let right_delay = right_seconds * self.sample_rate;

        // Step 4: input plus last sample's feedback goes into the line.
        left_line.write(left + self.feedback[0]);
        right_line.write(right + self.feedback[1]);

        // Steps 5-6: interpolated read behind the write head.
        let left_delayed = left_line.read(left_delay);
        let right_delayed = right_line.read(right_delay);

        // Step 7
        self.feedback = [left_delayed * params.feedback, right_delayed * params.feedback];

        // Step 8: linear dry/wet crossfade.
        let mix = params.mix;
        let left_out = left * (1.0 - mix) + left_delayed * mix;
        let right_out = right * (1.0 - mix) + right_delayed * mix;

        // Step 9
        left_line.advance();
        right_line.advance();
        self.lfo.advance(params.rate_hz, self.sample_rate);

        (left_out, right_out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::delay_time::CHORUS_RANGE;
    use crate::params::EffectMode;

    const SAMPLE_RATE: f32 = 48000.0;
    const MAX_DELAY_SECONDS: f32 = 2.0;

    fn prepared_engine() -> ChorusEngine {
        let mut engine = ChorusEngine::new();
        assert!(engine.prepare(SAMPLE_RATE, MAX_DELAY_SECONDS));
        engine
    }

    fn chorus_params() -> ModulationParams {
        ModulationParams {
            mix: 1.0,
            feedback: 0.0,
            depth: 0.5,
            rate_hz: 1.0,
            phase_offset: 0.0,
            mode: EffectMode::Chorus,
        }
    }

    fn impulse(len: usize) -> Vec<f32> {
        let mut signal = vec![0.0; len];
        signal[0] = 1.0;
        signal
    }

    fn sine(len: usize, freq_hz: f32) -> Vec<f32> {
        (0..len)
            .map(|n| (std::f32::consts::TAU * freq_hz * n as f32 / SAMPLE_RATE).sin() * 0.8)
            .collect()
    }

    fn first_nonzero(signal: &[f32]) -> Option<usize> {
        signal.iter().position(|sample| sample.abs() > 1e-6)
    }

    fn argmax(signal: &[f32]) -> usize {
        signal
            .iter()
            .enumerate()
            .fold((0, 0.0_f32), |(best_i, best), (i, &s)| {
                if s.abs() > best {
                    (i, s.abs())
                } else {
                    (best_i, best)
                }
            })
            .0
    }

    #[test]
    fn test_prepare_sizes_delay_lines() {
        let engine = prepared_engine();

        assert!(engine.is_prepared());
        assert_eq!(engine.capacity(), 96000);
        assert_eq!(engine.sample_rate(), SAMPLE_RATE);
        assert_eq!(engine.lfo_phase(), 0.0);
        assert_eq!(engine.smoothed_delay_seconds(), None);
    }

    #[test]
    fn test_prepare_rejects_empty_buffer() {
        let mut engine = ChorusEngine::new();

        assert!(!engine.prepare(48000.0, 0.0));
        assert!(!engine.prepare(0.0, 2.0));
        assert!(!engine.prepare(f32::NAN, 2.0));
        assert!(!engine.prepare(48000.0, f32::INFINITY));
        assert!(!engine.is_prepared());
        assert_eq!(engine.capacity(), 0);
    }

    /// Re-preparing for a new rate resizes the lines and forgets all state.
    #[test]
    fn test_prepare_again_resets_state() {
        let mut engine = prepared_engine();
        let params = ModulationParams {
            feedback: 0.9,
            ..chorus_params()
        };

        let mut left = sine(4096, 220.0);
        let mut right = sine(4096, 330.0);
        engine.process(&mut left, &mut right, &params);
        assert!(engine.lfo_phase() > 0.0);

        assert!(engine.prepare(44100.0, MAX_DELAY_SECONDS));
        assert_eq!(engine.capacity(), 88200);
        assert_eq!(engine.lfo_phase(), 0.0);
        assert_eq!(engine.smoothed_delay_seconds(), None);

        // Nothing left in the lines or the feedback path: silence in,
        // silence out.
        let mut left = vec![0.0; 8192];
        let mut right = vec![0.0; 8192];
        engine.process(&mut left, &mut right, &params);
        assert!(left.iter().chain(right.iter()).all(|&s| s == 0.0));
    }

    #[test]
    fn test_reset_clears_without_reallocating() {
        let mut engine = prepared_engine();
        let params = chorus_params();

        let mut left = sine(2048, 440.0);
        let mut right = sine(2048, 440.0);
        engine.process(&mut left, &mut right, &params);

        engine.reset();
        assert!(engine.is_prepared());
        assert_eq!(engine.capacity(), 96000);
        assert_eq!(engine.lfo_phase(), 0.0);

        let mut left = vec![0.0; 4096];
        let mut right = vec![0.0; 4096];
        engine.process(&mut left, &mut right, &params);
        assert!(left.iter().chain(right.iter()).all(|&s| s == 0.0));
    }

    /// An unprepared engine flags the misuse and passes audio straight
    /// through.
    #[test]
    fn test_unprepared_passes_through() {
        let mut engine = ChorusEngine::new();
        let (left, right) = engine.process_frame(0.3, -0.4, &chorus_params());
        assert_eq!((left, right), (0.3, -0.4));

        let mut left = vec![0.5; 16];
        let mut right = vec![-0.5; 16];
        engine.process(&mut left, &mut right, &chorus_params());
        assert!(left.iter().all(|&s| s == 0.5));
        assert!(right.iter().all(|&s| s == -0.5));
    }

    /// With `mix = 0` the output is bit-identical to the input, whatever the
    /// other parameters do.
    #[test]
    fn test_dry_bypass_is_exact() {
        for mode in [EffectMode::Chorus, EffectMode::Flanger] {
            let mut engine = prepared_engine();
            let params = ModulationParams {
                mix: 0.0,
                feedback: 0.98,
                depth: 1.0,
                rate_hz: 20.0,
                phase_offset: 0.37,
                mode,
            };

            let input_left = sine(9600, 440.0);
            let input_right = sine(9600, 97.0);
            let mut left = input_left.clone();
            let mut right = input_right.clone();
            engine.process(&mut left, &mut right, &params);

            assert_eq!(left, input_left);
            assert_eq!(right, input_right);
        }
    }

    /// With `mix = 1`, no feedback and no modulation the output is the input
    /// delayed by the centre of the chorus window, with no dry component.
    #[test]
    fn test_full_wet_is_pure_delayed_copy() {
        let mut engine = prepared_engine();
        let params = ModulationParams {
            depth: 0.0,
            ..chorus_params()
        };
        let delay = ((CHORUS_RANGE.min + CHORUS_RANGE.max) * 0.5 * SAMPLE_RATE).round() as usize;
        assert_eq!(delay, 840);

        let input = sine(4800, 440.0);
        let mut left = input.clone();
        let mut right = input.clone();
        engine.process(&mut left, &mut right, &params);

        for output in [&left, &right] {
            for n in 0..delay - 1 {
                assert!(output[n].abs() < 1e-3, "dry leak at {n}: {}", output[n]);
            }
            for n in delay + 1..input.len() {
                let expected = input[n - delay];
                assert!(
                    (output[n] - expected).abs() < 1e-3,
                    "sample {n}: expected {expected}, got {}",
                    output[n]
                );
            }
        }
    }

    /// Unit impulse, chorus, depth 0.5, 1 Hz, no feedback, fully wet. At
    /// phase 0 the mapped delay is the centre of the 5-30 ms window:
    /// 17.5 ms, or 840 samples at 48 kHz. The LFO keeps moving while the
    /// impulse travels, so the echo lands a little later than that, the
    /// raw right channel more so than the smoothed left one.
    #[test]
    fn test_impulse_arrives_after_mapped_delay() {
        let mut engine = prepared_engine();
        let params = chorus_params();

        let mut left = impulse(4800);
        let mut right = impulse(4800);
        engine.process(&mut left, &mut right, &params);

        let first_left = first_nonzero(&left).unwrap();
        let first_right = first_nonzero(&right).unwrap();
        assert!((839..=880).contains(&first_left), "left echo at {first_left}");
        assert!((839..=880).contains(&first_right), "right echo at {first_right}");
        assert!(first_left <= first_right);

        // The echo is a single interpolated blip, not a smear.
        assert!(left[first_left + 2..].iter().all(|&s| s == 0.0));
        assert!(right[first_right + 2..].iter().all(|&s| s == 0.0));
    }

    /// Same scenario with no modulation: the echo peak sits at 840 within a
    /// sample of interpolation.
    #[test]
    fn test_impulse_without_modulation_lands_on_840() {
        let mut engine = prepared_engine();
        let params = ModulationParams {
            depth: 0.0,
            ..chorus_params()
        };

        let mut left = impulse(2048);
        let mut right = impulse(2048);
        engine.process(&mut left, &mut right, &params);

        for output in [&left, &right] {
            let first = first_nonzero(output).unwrap();
            assert!((839..=841).contains(&first), "first echo sample at {first}");
            assert_eq!(argmax(output), 840);
        }
    }

    #[test]
    fn test_flanger_echo_is_short() {
        let mut engine = prepared_engine();
        let params = ModulationParams {
            mode: EffectMode::Flanger,
            depth: 0.0,
            ..chorus_params()
        };

        let mut left = impulse(1024);
        let mut right = impulse(1024);
        engine.process(&mut left, &mut right, &params);

        // Centre of the 1-5 ms window: 3 ms = 144 samples.
        assert_eq!(argmax(&left), 144);
        assert_eq!(argmax(&right), 144);
    }

    /// At 98% feedback each echo is quieter than the one before and the loop
    /// never grows.
    #[test]
    fn test_feedback_decays() {
        let mut engine = prepared_engine();
        let params = ModulationParams {
            feedback: 0.98,
            depth: 0.0,
            ..chorus_params()
        };

        let len = 48000;
        let mut left = impulse(len);
        let mut right = impulse(len);
        engine.process(&mut left, &mut right, &params);

        // The feedback sample is written one frame after it is read, so the
        // echoes repeat every 841 samples starting at 840.
        let period = 841;
        let peaks: Vec<f32> = left[420..]
            .chunks(period)
            .filter(|chunk| chunk.len() == period)
            .map(|chunk| chunk.iter().fold(0.0_f32, |max, s| max.max(s.abs())))
            .collect();

        assert!(peaks.len() > 40);
        assert!((peaks[0] - 1.0).abs() < 1e-3, "first echo {}", peaks[0]);
        for pair in peaks.windows(2) {
            assert!(pair[1] <= pair[0], "echo grew: {} -> {}", pair[0], pair[1]);
            assert!(pair[1] <= pair[0] * 0.98 + 1e-4, "decayed too slowly");
        }
        assert!(right.iter().all(|s| s.abs() <= 1.0 + 1e-6));
    }

    /// Any combination of documented parameters, including the most extreme
    /// ones, gives finite output no louder than the input.
    #[test]
    fn test_extreme_parameters_stay_bounded() {
        for mode in [EffectMode::Chorus, EffectMode::Flanger] {
            for (depth, rate_hz, phase_offset) in [(1.0, 20.0, 1.0), (1.0, 0.1, 0.5), (0.0, 20.0, 0.0)] {
                let mut engine = prepared_engine();
                let params = ModulationParams {
                    mix: 1.0,
                    feedback: 0.98,
                    depth,
                    rate_hz,
                    phase_offset,
                    mode,
                };

                let mut left = impulse(24000);
                let mut right = impulse(24000);
                engine.process(&mut left, &mut right, &params);

                for sample in left.iter().chain(right.iter()) {
                    assert!(sample.is_finite() && sample.abs() <= 1.0 + 1e-5, "{sample}");
                }
            }
        }
    }

    /// Out-of-range and NaN parameters degrade the sound, never the process.
    #[test]
    fn test_malformed_parameters_do_not_panic() {
        let mut engine = prepared_engine();
        let params = ModulationParams {
            mix: 1.0,
            feedback: 0.0,
            depth: 1.0e6,
            rate_hz: f32::NAN,
            phase_offset: -7.5,
            mode: EffectMode::Flanger,
        };

        let mut left = sine(1024, 440.0);
        let mut right = sine(1024, 440.0);
        engine.process(&mut left, &mut right, &params);

        assert!((0.0..1.0).contains(&engine.lfo_phase()));
    }

    /// A tiny buffer (shorter than the mapped delay) clamps the read head
    /// instead of reading outside the line.
    #[test]
    fn test_short_buffer_clamps_delay() {
        let mut engine = ChorusEngine::new();
        assert!(engine.prepare(SAMPLE_RATE, 0.001));
        assert_eq!(engine.capacity(), 48);

        let mut left = sine(2048, 440.0);
        let mut right = sine(2048, 440.0);
        engine.process(&mut left, &mut right, &chorus_params());

        assert!(left.iter().chain(right.iter()).all(|s| s.is_finite() && s.abs() <= 0.8 + 1e-5));
    }

    /// The left delay time glides while the right one follows the LFO
    /// directly, so with zero phase offset the channels still drift apart.
    #[test]
    fn test_left_channel_is_smoothed_right_is_not() {
        let mut engine = prepared_engine();
        let params = ModulationParams {
            rate_hz: 5.0,
            depth: 1.0,
            ..chorus_params()
        };

        let input = sine(4800, 440.0);
        let mut left = input.clone();
        let mut right = input;
        engine.process(&mut left, &mut right, &params);

        let max_difference = left
            .iter()
            .zip(&right)
            .fold(0.0_f32, |max, (l, r)| max.max((l - r).abs()));
        assert!(max_difference > 1e-2, "channels identical: {max_difference}");

        // The smoother lags behind the raw target, which has swept to
        // 5 Hz * 0.1 s = half a cycle, back to the centre.
        let smoothed = engine.smoothed_delay_seconds().unwrap();
        let centre = (CHORUS_RANGE.min + CHORUS_RANGE.max) * 0.5;
        assert!(smoothed > centre, "smoothed {smoothed} should trail above {centre}");
    }

    /// With the phase offset at half a cycle the two delay times mirror each
    /// other around the centre of the window.
    #[test]
    fn test_phase_offset_changes_right_channel_only() {
        let input = sine(4800, 440.0);

        let mut engine = prepared_engine();
        let mut left_a = input.clone();
        let mut right_a = input.clone();
        engine.process(&mut left_a, &mut right_a, &chorus_params());

        let mut engine = prepared_engine();
        let mut left_b = input.clone();
        let mut right_b = input;
        let shifted = ModulationParams {
            phase_offset: 0.5,
            ..chorus_params()
        };
        engine.process(&mut left_b, &mut right_b, &shifted);

        assert_eq!(left_a, left_b);
        assert_ne!(right_a, right_b);
    }

    /// Splitting the same audio into different block sizes gives the same
    /// result: all state carries across calls.
    #[test]
    fn test_block_size_independent() {
        let params = ModulationParams {
            feedback: 0.7,
            mix: 0.5,
            depth: 0.8,
            rate_hz: 3.0,
            phase_offset: 0.25,
            mode: EffectMode::Flanger,
        };
        let input = sine(6000, 330.0);

        let mut engine = prepared_engine();
        let mut left_whole = input.clone();
        let mut right_whole = input.clone();
        engine.process(&mut left_whole, &mut right_whole, &params);

        let mut engine = prepared_engine();
        let mut left_blocks = input.clone();
        let mut right_blocks = input;
        for (left, right) in left_blocks.chunks_mut(64).zip(right_blocks.chunks_mut(64)) {
            engine.process(left, right, &params);
        }

        assert_eq!(left_whole, left_blocks);
        assert_eq!(right_whole, right_blocks);
    }

    /// The LFO advances exactly once per processed frame.
    #[test]
    fn test_lfo_advances_once_per_sample() {
        let mut engine = prepared_engine();
        let params = ModulationParams {
            rate_hz: 2.0,
            ..chorus_params()
        };

        let mut left = vec![0.0; 6000];
        let mut right = vec![0.0; 6000];
        engine.process(&mut left, &mut right, &params);

        // 6000 * 2 / 48000 = 0.25 cycles.
        let phase = engine.lfo_phase();
        assert!((phase - 0.25).abs() < 1e-4, "Expected 0.25, got {phase}");
    }
}
