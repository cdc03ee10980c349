//! # Fractional Reads
//!
//! A modulated delay almost never lands on a whole sample. At 48 kHz a
//! chorus sweeping between 5 ms and 30 ms asks for read positions like
//! `1234.567`, so we blend the two stored samples that bracket the position.
//!
//! ```text
//!            x0                 x1
//!   ... ──── ● ─────────●────── ● ──── ...     (stored samples)
//!          floor(pos)  pos   floor(pos) + 1
//!                 ◄─frac─►
//!
//! result = (1 - frac) * x0 + frac * x1
//! ```
//!
//! Linear interpolation is first-order: it can never overshoot the two
//! samples it blends, which keeps the feedback loop bounded.

/// Linear interpolation between `x0` and `x1`.
///
/// `frac = 0.0` returns `x0`, `frac = 1.0` returns `x1`.
#[inline]
pub fn lerp(x0: f32, x1: f32, frac: f32) -> f32 {
    (1.0 - frac) * x0 + frac * x1
}

/// Read `buffer` at a real-valued absolute position, wrapping around the end.
///
/// `position` is expected in `[0, buffer.len())`. Negative or too large
/// positions are folded back into range first and non-finite ones read slot
/// 0, so both indices are always valid. `buffer` must not be empty.
#[inline]
pub fn read_fractional(buffer: &[f32], position: f32) -> f32 {
    let len = buffer.len();
    let position = if position.is_finite() {
        position.rem_euclid(len as f32)
    } else {
        0.0
    };
    // `rem_euclid` may round a tiny negative input up to exactly `len`.
    let position = if position < len as f32 { position } else { 0.0 };

    let index_0 = (position as usize).min(len - 1);
    let index_1 = if index_0 + 1 >= len { 0 } else { index_0 + 1 };
    let frac = (position - index_0 as f32).clamp(0.0, 1.0);

    lerp(buffer[index_0], buffer[index_1], frac)
}
