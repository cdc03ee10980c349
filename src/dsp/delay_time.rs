//! # LFO → Delay Time
//!
//! The LFO swings between -1 and +1. This module turns that swing into a
//! delay time in seconds, and smooths the result so the read head glides
//! instead of jumping.
//!
//! ## Mapping
//!
//! The LFO value is first scaled by `depth`, then mapped linearly from
//! `[-1, 1]` onto the delay window of the current mode:
//!
//! ```text
//! delay = min + (lfo * depth + 1) / 2 * (max - min)
//!
//!   Flanger:  1 ms ..  5 ms   (short: comb filter sweep, "jet plane")
//!   Chorus:   5 ms .. 30 ms   (long: detuned doubling)
//! ```
//!
//! With `depth = 0` the delay sits in the middle of the window; with
//! `depth = 1` it sweeps the whole window. The windows are fixed; switching
//! mode moves the target at once and the smoother takes care of the jump.
//!
//! ## Smoothing
//!
//! A one-pole lowpass on the delay time:
//!
//! ```text
//! smoothed = smoothed - k * (smoothed - target),   k = 0.001
//! ```
//!
//! This is the same recursion as a one-pole filter with coefficient
//! `1 - k`. At 48 kHz the time constant is about 21 ms: fast enough to
//! follow the LFO, slow enough to remove the clicks from a sudden change in
//! read position.

use crate::params::EffectMode;

/// Per-sample pull of the smoothed delay time toward its target.
pub const SMOOTHING_COEFFICIENT: f32 = 0.001;

/// Delay window, in seconds, swept by the LFO.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayRange {
    pub min: f32,
    pub max: f32,
}

pub const FLANGER_RANGE: DelayRange = DelayRange {
    min: 0.001,
    max: 0.005,
};

pub const CHORUS_RANGE: DelayRange = DelayRange {
    min: 0.005,
    max: 0.03,
};

pub fn delay_range(mode: EffectMode) -> DelayRange {
    match mode {
        EffectMode::Chorus => CHORUS_RANGE,
        EffectMode::Flanger => FLANGER_RANGE,
    }
}

/// Map an LFO output in `[-1, 1]` to a delay time in seconds.
#[inline]
pub fn map_delay_seconds(lfo_value: f32, depth: f32, mode: EffectMode) -> f32 {
    let range = delay_range(mode);
    let scaled = lfo_value * depth;

    range.min + (scaled + 1.0) * 0.5 * (range.max - range.min)
}

/// One-pole smoother for the delay time.
///
/// Starts out empty. The first target it sees is taken as-is, so a freshly
/// prepared engine starts at the mapped delay instead of gliding up from 0.
#[derive(Debug, Clone)]
pub struct DelaySmoother {
    coefficient: f32,
    value: Option<f32>,
}

impl Default for DelaySmoother {
    fn default() -> Self {
        Self::new()
    }
}

impl DelaySmoother {
    pub fn new() -> Self {
        Self {
            coefficient: SMOOTHING_COEFFICIENT,
            value: None,
        }
    }

    /// The last smoothed value, if any target has been seen since the last
    /// reset.
    pub fn current(&self) -> Option<f32> {
        self.value
    }

    /// Step once toward `target` and return the new smoothed value.
    #[inline]
    pub fn next(&mut self, target: f32) -> f32 {
        let current = self.value.unwrap_or(target);
        let smoothed = current - self.coefficient * (current - target);
        self.value = Some(smoothed);
        smoothed
    }

    /// Forget the smoothed value; the next target is taken as-is.
    pub fn reset(&mut self) {
        self.value = None;
    }
}
