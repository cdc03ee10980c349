//! # Low Frequency Oscillator
//!
//! The LFO is what turns a plain delay into a chorus or flanger: it sweeps
//! the delay time back and forth a few times per second, which bends the
//! pitch of the delayed copy slightly up and down.
//!
//! It is a phase accumulator. `phase` runs from 0.0 to 1.0 once per cycle
//! and the output is `sin(2π · phase)`:
//!
//! ```text
//!  +1 ┤    ╭──╮            ╭──╮
//!   0 ┼───╯    ╰──╮    ╭──╯    ╰──
//!  -1 ┤            ╰──╯
//!     0          1.0         2.0    (phase, wraps back to 0 at 1.0)
//! ```
//!
//! The right channel does not get a second oscillator. It reads the same
//! phase shifted by the "phase offset" parameter, which keeps both channels
//! locked together while spreading them apart in the stereo field.

use std::f32::consts::TAU;

/// A free-running sine LFO.
#[derive(Debug, Clone, Default)]
pub struct Lfo {
    /// Position within the current cycle, always in `[0.0, 1.0)`.
    phase: f32,
}

impl Lfo {
    pub fn new() -> Self {
        Self { phase: 0.0 }
    }

    /// Current phase in `[0.0, 1.0)`.
    pub fn phase(&self) -> f32 {
        self.phase
    }

    /// Output at the current phase, in `[-1.0, 1.0]`.
    #[inline]
    pub fn value(&self) -> f32 {
        sine(self.phase)
    }

    /// Output at the current phase shifted by `offset` cycles.
    ///
    /// `offset` is a fraction of one cycle (0.5 = half a cycle = 180°).
    #[inline]
    pub fn value_with_offset(&self, offset: f32) -> f32 {
        sine(wrap_phase(self.phase + offset))
    }

    /// Move forward by one sample at `rate_hz`.
    #[inline]
    pub fn advance(&mut self, rate_hz: f32, sample_rate: f32) {
        self.phase = wrap_phase(self.phase + rate_hz / sample_rate);
    }

    pub fn reset(&mut self) {
        self.phase = 0.0;
    }
}

#[inline]
fn sine(phase: f32) -> f32 {
    (TAU * phase).sin()
}

/// Fold a phase that has just crossed 1.0 back into `[0.0, 1.0)`.
///
/// At audio rates the increment is a tiny fraction of a cycle, so a single
/// subtraction is all that is ever needed. Increments of a whole cycle or
/// more, and negative phases, fall back to `rem_euclid`.
#[inline]
fn wrap_phase(phase: f32) -> f32 {
    let wrapped = if phase >= 1.0 { phase - 1.0 } else { phase };
    if (0.0..1.0).contains(&wrapped) {
        wrapped
    } else if wrapped.is_finite() {
        // `rem_euclid` can round up to exactly 1.0 for tiny negatives.
        let folded = wrapped.rem_euclid(1.0);
        if folded < 1.0 {
            folded
        } else {
            0.0
        }
    } else {
        0.0
    }
}
