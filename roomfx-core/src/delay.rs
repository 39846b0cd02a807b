//! Fixed-capacity mono delay line.
//!
//! Design goals:
//! - Single writer, many readers: `write` is the only mutator, reads take `&self`
//! - Saturating integer reads: a delay at or past the capacity clamps to the
//!   deepest tap (`capacity - 1`) instead of panicking
//! - Linear interpolation for fractional delays
//! - All allocation happens in `new`/`resize`; the audio path is allocation free
//!
//! Read offsets count completed writes: `read(1)` is the most recent write,
//! `read(0)` the slot about to be overwritten (the oldest sample). Negative
//! fractional delays are truncated to zero.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

#[derive(Clone, Debug)]
pub struct DelayLine {
    buf: Vec<f32>,
    write: usize,
}

impl DelayLine {
    /// Allocate a zero-filled line holding `capacity` samples (floored at 1).
    pub fn new(capacity: usize) -> Self {
        let mut line = Self { buf: Vec::new(), write: 0 };
        line.resize(capacity);
        line
    }

    /// Re-allocate to `capacity` samples. Contents are discarded and the
    /// write cursor resets.
    pub fn resize(&mut self, capacity: usize) {
        let capacity = capacity.max(1);
        self.buf.clear();
        self.buf.resize(capacity, 0.0);
        self.write = 0;
    }

    /// Zero the contents without reallocating.
    pub fn clear(&mut self) {
        for s in self.buf.iter_mut() {
            *s = 0.0;
        }
        self.write = 0;
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Store `sample` and advance the cursor.
    #[inline]
    pub fn write(&mut self, sample: f32) {
        self.buf[self.write] = sample;
        self.write = (self.write + 1) % self.buf.len();
    }

    /// The sample written `delay_samples` writes ago. Delays at or past the
    /// capacity clamp to `capacity - 1`.
    #[inline]
    pub fn read(&self, delay_samples: usize) -> f32 {
        let len = self.buf.len();
        let d = delay_samples.min(len - 1);
        self.buf[(self.write + len - d) % len]
    }

    /// Linearly interpolated read at a fractional delay. Each of the two
    /// integer taps clamps independently per [`read`](Self::read).
    #[inline]
    pub fn read_frac(&self, delay_samples: f32) -> f32 {
        let d = delay_samples.max(0.0);
        let d0 = d as usize;
        let frac = d - d0 as f32;
        self.read(d0) * (1.0 - frac) + self.read(d0.saturating_add(1)) * frac
    }
}
