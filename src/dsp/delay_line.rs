//! # Delay Line (Ring Buffer)
//!
//! Each audio channel owns one ring buffer that remembers the last
//! `capacity` samples. A "write head" records the incoming audio and the
//! modulated "read head" trails behind it by the current delay time.
//!
//! ```text
//!                 read head            write head
//!                     ▼                    ▼
//!   [ . . . . . . . . ● . . . . . . . . . ● . . . . . ]
//!                     ◄──── delay_samples ─►
//! ```
//!
//! Per sample the engine:
//!
//! 1. Writes `input + feedback` at the write head.
//! 2. Reads the delayed sample `delay_samples` behind the write head.
//! 3. Advances the write head by 1, wrapping back to 0 at the end.
//!
//! Writing and advancing are separate calls so the read in step 2 sees the
//! sample written in step 1: a delay of 0 returns the current input.

use std::num::NonZeroUsize;

use super::interpolation::read_fractional;

/// A fixed-capacity ring buffer used as a fractional delay line.
///
/// The buffer is allocated once, when the plugin is (re)initialized for a
/// sample rate, and never grows afterwards. Nothing in here allocates after
/// construction.
pub struct DelayLine {
    /// Stored samples, zero-initialized (silence).
    buffer: Vec<f32>,

    /// Slot the next `write()` stores into. Always `< buffer.len()`.
    write_pos: usize,
}

impl DelayLine {
    /// Create a silent delay line holding `capacity` samples.
    ///
    /// For a 2 second maximum delay at 48 kHz that is 96000 samples.
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            buffer: vec![0.0; capacity.get()],
            write_pos: 0,
        }
    }

    /// Number of samples the line can hold.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Current write head position.
    pub fn write_pos(&self) -> usize {
        self.write_pos
    }

    /// Store a sample at the write head. Does NOT advance it; call
    /// [`advance()`](Self::advance) once the delayed sample has been read.
    pub fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
    }

    /// Read `delay_samples` behind the write head with linear interpolation.
    ///
    /// The delay is clamped to `[0, capacity - 1]` so the read head can never
    /// lap the write head. The absolute read position is
    ///
    /// ```text
    /// position = write_pos - delay_samples   (+ capacity if negative)
    /// ```
    ///
    /// and is interpolated between `floor(position)` and the slot after it.
    pub fn read(&self, delay_samples: f32) -> f32 {
        let max_delay = (self.buffer.len() - 1) as f32;
        let delay = if delay_samples.is_nan() {
            0.0
        } else {
            delay_samples.clamp(0.0, max_delay)
        };

        let mut position = self.write_pos as f32 - delay;
        if position < 0.0 {
            position += self.buffer.len() as f32;
        }

        read_fractional(&self.buffer, position)
    }

    /// Move the write head forward one slot, wrapping to 0 at the end.
    pub fn advance(&mut self) {
        self.write_pos += 1;
        if self.write_pos >= self.buffer.len() {
            self.write_pos = 0;
        }
    }

    /// Silence the whole buffer and rewind the write head. No allocation.
    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.write_pos = 0;
    }
}
