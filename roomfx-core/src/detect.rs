//! Level detection: smoothed peak detection and an opto-coupler lag.
//!
//! Contents
//! - `PeakDetectorDb` : decoupled smoothed peak detector operating on
//!   log-domain values (attack/release ballistics for dynamics processors)
//! - `Vactrol`        : asymmetric one-pole lag emulating a resistive
//!   opto-isolator (drives the envelope filter's cutoff sweep)
//!
//! Notes
//! - `PeakDetectorDb` follows the "decoupled" detector of Giannoulis,
//!   Massberg & Reiss (2012), Eq. 17: an instant-rise/smooth-fall peak
//!   stage followed by a one-pole attack smoother. Inputs are dB-domain
//!   level or gain-reduction values and may be negative.
//! - Smoothing coefficients are "keep" weights (see
//!   [`one_pole_coeff_ms`](crate::dsp::one_pole_coeff_ms)); the callers own
//!   them so attack/release conversions happen at parameter-set time.

use crate::dsp::{lin_mix, millis_to_samples, t60_gain};

/// Decoupled smoothed peak detector in the log domain.
#[derive(Copy, Clone, Debug, Default)]
pub struct PeakDetectorDb {
    y1: f32,
    y_smooth: f32,
}

impl PeakDetectorDb {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn reset(&mut self) {
        self.y1 = 0.0;
        self.y_smooth = 0.0;
    }

    /// Advance one sample. `a_attack`/`a_release` are the per-sample keep
    /// weights for the attack and release legs.
    #[inline]
    pub fn process(&mut self, x_db: f32, a_attack: f32, a_release: f32) -> f32 {
        // peak stage: rises instantly, falls at the release rate
        self.y1 = x_db.max(a_release * self.y1 + (1.0 - a_release) * x_db);
        // smooth stage: attack lag
        self.y_smooth = a_attack * self.y_smooth + (1.0 - a_attack) * self.y1;
        self.y_smooth
    }
}

/// Opto-coupler lag: a one-pole whose time constant crossfades between a
/// fast attack and a slow decay depending on the (rectified, 0..1) input.
///
/// Defaults follow typical vactrol response: 10 ms rise, 500 ms fall.
#[derive(Copy, Clone, Debug)]
pub struct Vactrol {
    attack_ms: f32,
    decay_ms: f32,
    sr: f32,
    y1: f32,
}

impl Vactrol {
    #[inline]
    pub fn new(sr: f32) -> Self {
        Self {
            attack_ms: 10.0,
            decay_ms: 500.0,
            sr: sr.max(1.0),
            y1: 0.0,
        }
    }

    #[inline]
    pub fn set_sample_rate(&mut self, sr: f32) {
        self.sr = sr.max(1.0);
    }

    #[inline]
    pub fn set_attack_ms(&mut self, ms: f32) {
        self.attack_ms = ms.max(0.0);
    }

    #[inline]
    pub fn set_decay_ms(&mut self, ms: f32) {
        self.decay_ms = ms.max(0.0);
    }

    #[inline]
    pub fn reset(&mut self) {
        self.y1 = 0.0;
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.y1
    }

    /// Advance one sample; `x` is expected rectified into [0, 1].
    /// High inputs pull the time constant toward the attack, low inputs
    /// toward the decay, then the lag runs one step at that rate.
    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let rise_or_fall = lin_mix(self.decay_ms, self.attack_ms, x);
        let samps = millis_to_samples(rise_or_fall, self.sr).max(1.0);
        self.y1 = lin_mix(x, self.y1, t60_gain(samps));
        self.y1
    }
}

// ------------------------------------ Tests --------------------------------------
