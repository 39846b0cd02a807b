//! Modulation oscillators: phase ramp, sine, triangle.
//!
//! These drive effect parameters (chorus/flanger sweeps, tremolo level,
//! the detune window position); none of them is an audio voice. All run
//! on a unipolar [0, 1) phase accumulator. A negative frequency mirrors
//! the ramp (`1 - phase`), which the detune uses to read its grain window
//! backwards for upward shifts.

use roomfx_core::dsp::{self, TAU};

/// Unipolar ramp in [0, 1).
#[derive(Copy, Clone, Debug)]
pub struct Phasor {
    sr: f32,
    freq: f32,
    phase: f32,
    inc: f32,
}

impl Phasor {
    #[inline]
    pub fn new(freq_hz: f32, sr: f32) -> Self {
        let mut p = Self {
            sr: sr.max(1.0),
            freq: freq_hz,
            phase: 0.0,
            inc: 0.0,
        };
        p.recalc();
        p
    }

    #[inline]
    pub fn set_sample_rate(&mut self, sr: f32) {
        self.sr = sr.max(1.0);
        self.recalc();
    }

    #[inline]
    pub fn set_frequency(&mut self, freq_hz: f32) {
        self.freq = freq_hz;
        self.recalc();
    }

    #[inline]
    pub fn set_phase(&mut self, phase: f32) {
        self.phase = phase.rem_euclid(1.0);
    }

    #[inline]
    pub fn phase(&self) -> f32 {
        self.phase
    }

    #[inline]
    pub fn frequency(&self) -> f32 {
        self.freq
    }

    #[inline]
    fn recalc(&mut self) {
        self.inc = self.freq.abs() / self.sr;
    }

    #[inline]
    pub fn next(&mut self) -> f32 {
        self.phase += self.inc;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        if self.freq < 0.0 {
            1.0 - self.phase
        } else {
            self.phase
        }
    }
}

/// Sine LFO: `sin(2π · phase)`, bipolar.
#[derive(Copy, Clone, Debug)]
pub struct SinOsc {
    ph: Phasor,
}

impl SinOsc {
    #[inline]
    pub fn new(freq_hz: f32, sr: f32) -> Self {
        Self { ph: Phasor::new(freq_hz, sr) }
    }

    #[inline] pub fn set_sample_rate(&mut self, sr: f32) { self.ph.set_sample_rate(sr); }
    #[inline] pub fn set_frequency(&mut self, freq_hz: f32) { self.ph.set_frequency(freq_hz); }
    #[inline] pub fn set_phase(&mut self, phase: f32) { self.ph.set_phase(phase); }

    #[inline]
    pub fn next(&mut self) -> f32 {
        dsp::fast_sin(TAU * self.ph.next())
    }
}

/// Triangle LFO: `|2·phase − 1| · 2 − 1`, bipolar, +1 at phase 0.
#[derive(Copy, Clone, Debug)]
pub struct TriOsc {
    ph: Phasor,
}

impl TriOsc {
    #[inline]
    pub fn new(freq_hz: f32, sr: f32) -> Self {
        Self { ph: Phasor::new(freq_hz, sr) }
    }

    #[inline] pub fn set_sample_rate(&mut self, sr: f32) { self.ph.set_sample_rate(sr); }
    #[inline] pub fn set_frequency(&mut self, freq_hz: f32) { self.ph.set_frequency(freq_hz); }
    #[inline] pub fn set_phase(&mut self, phase: f32) { self.ph.set_phase(phase); }

    #[inline]
    pub fn next(&mut self) -> f32 {
        let p = self.ph.next();
        (2.0 * p - 1.0).abs() * 2.0 - 1.0
    }
}

// ------------------------------------ Tests --------------------------------------
