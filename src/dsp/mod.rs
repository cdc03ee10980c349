//! # DSP Building Blocks
//!
//! - **`delay_line`**: a ring buffer per channel, written at the write head
//!   and read a fractional number of samples behind it.
//! - **`interpolation`**: linear interpolation between two stored samples.
//! - **`lfo`**: the sine oscillator that sweeps the delay time.
//! - **`delay_time`**: maps the LFO onto the chorus or flanger delay window
//!   and smooths the result.

pub mod delay_line;
pub mod delay_time;
pub mod interpolation;
pub mod lfo;
