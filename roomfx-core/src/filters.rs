//! Filters: lightweight one-poles and a TPT (state-variable) filter.
//!
//! Goals
//! - `no_std`-friendly, allocation free
//! - Stable under parameter modulation (the envelope filter sweeps cutoff
//!   every sample)
//! - Clear APIs and predictable parameterization
//!
//! Contents
//! - `OnePoleLP`  : "RC-style" one-pole low-pass (feedback damping, smoothing)
//! - `OnePoleHP`  : "RC-style" one-pole high-pass
//! - `DcBlock`    : high-pass wrapper specialized for DC removal in feedback loops
//! - `SvfMode`    : LP/HP/BP/Notch tap selection for the SVF
//! - `SvfTpt`     : State-Variable Filter via Topology Preserving Transform
//!
//! Notes
//! - `OnePole*` use the inexpensive `y += a * (x - y)` form, where
//!   `a = 1 - exp(-2π fc / sr)`. These are not bilinear/TPT matched;
//!   they're great for parameter smoothing and gentle tonal shaping.
//!   The low-pass also accepts its "keep" weight directly via [`OnePoleLP::set_g`],
//!   which is how the echo exposes its damping control.
//! - `SvfTpt` uses the "g = tan(π fc / sr)" formulation with `R = 1/(2Q)`.
//!   It is robust to high resonance and parameter modulation.

use crate::dsp::{clamp, kill_denormals, one_pole_coeff_hz, tpt_g};
use core::fmt::Debug;

/// One-pole low-pass `y += a * (x - y)`.
///
/// `a` is derived from cutoff (Hz) and sample rate
/// (`a = 1 - exp(-2π * fc / sr)`), or set directly through [`set_g`](Self::set_g)
/// as the complementary "keep" weight.
#[derive(Copy, Clone, Debug)]
pub struct OnePoleLP {
    a: f32,
    y: f32,
    sr: f32,
    fc: f32,
}

impl OnePoleLP {
    /// Create a low-pass with cutoff `cut_hz` and sample rate `sr`.
    #[inline]
    pub fn new(cut_hz: f32, sr: f32) -> Self {
        let mut s = Self {
            a: 0.0,
            y: 0.0,
            sr: sr.max(1.0),
            fc: cut_hz.max(0.0),
        };
        s.update_coeffs();
        s
    }

    /// Create a low-pass directly from its "keep" weight `g` in
    /// `y = (1-g)*x + g*y1`. `g` is clamped into [0, 1]; 0 is transparent,
    /// values near 1 smear heavily.
    #[inline]
    pub fn from_g(g: f32) -> Self {
        let mut s = Self { a: 0.0, y: 0.0, sr: 1.0, fc: 0.0 };
        s.set_g(g);
        s
    }

    #[inline]
    pub fn set_sample_rate(&mut self, sr: f32) {
        self.sr = sr.max(1.0);
        self.update_coeffs();
    }

    #[inline]
    pub fn set_cutoff_hz(&mut self, cut_hz: f32) {
        self.fc = cut_hz.max(0.0);
        self.update_coeffs();
    }

    /// Bypass the cutoff mapping and set the "keep" weight directly.
    #[inline]
    pub fn set_g(&mut self, g: f32) {
        self.a = 1.0 - clamp(g, 0.0, 1.0);
    }

    #[inline]
    fn update_coeffs(&mut self) {
        // For the "y += a*(x-y)" form, many references set a = 1 - exp(..).
        // We compute `exp(-..)` once and fold to a.
        let exp_term = one_pole_coeff_hz(self.fc, self.sr); // = exp(-2π fc / sr)
        self.a = 1.0 - exp_term;
    }

    /// Process one sample.
    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        self.y += self.a * (x - self.y);
        self.y = kill_denormals(self.y);
        self.y
    }

    #[inline] pub fn reset(&mut self) { self.y = 0.0; }
    #[inline] pub fn value(&self) -> f32 { self.y }
}

/// One-pole high-pass using the standard "leaky integrator" form:
///
/// Difference equation:
/// `y[n] = x[n] - x[n-1] + b * y[n-1]`, with `b = exp(-2π fc / sr)`.
#[derive(Copy, Clone, Debug)]
pub struct OnePoleHP {
    b: f32,
    x1: f32,
    y1: f32,
    sr: f32,
    fc: f32,
}

impl OnePoleHP {
    #[inline]
    pub fn new(cut_hz: f32, sr: f32) -> Self {
        let mut s = Self {
            b: 0.0,
            x1: 0.0,
            y1: 0.0,
            sr: sr.max(1.0),
            fc: cut_hz.max(0.0),
        };
        s.update_coeffs();
        s
    }

    #[inline] pub fn set_sample_rate(&mut self, sr: f32) { self.sr = sr.max(1.0); self.update_coeffs(); }
    #[inline] pub fn set_cutoff_hz(&mut self, cut_hz: f32) { self.fc = cut_hz.max(0.0); self.update_coeffs(); }
    #[inline] pub fn reset(&mut self) { self.x1 = 0.0; self.y1 = 0.0; }

    #[inline]
    fn update_coeffs(&mut self) {
        // HP leaky integrator uses the exponential directly.
        self.b = one_pole_coeff_hz(self.fc, self.sr); // exp(-2π fc / sr)
    }

    #[inline]
    pub fn process(&mut self, x: f32) -> f32 {
        let y = x - self.x1 + self.b * self.y1;
        self.x1 = x;
        self.y1 = kill_denormals(y);
        self.y1
    }

    #[inline] pub fn value(&self) -> f32 { self.y1 }
}

/// Convenience DC blocker: a high-pass with a very low cutoff.
///
/// 20 Hz is a sane default for output cleanup; feedback loops that
/// recirculate their own output (the echo) sit it much lower, around 3 Hz,
/// so the blocker itself stays inaudible inside the loop.
#[derive(Copy, Clone, Debug)]
pub struct DcBlock {
    hp: OnePoleHP,
}

impl DcBlock {
    #[inline]
    pub fn new(cut_hz: f32, sr: f32) -> Self {
        Self { hp: OnePoleHP::new(cut_hz, sr) }
    }

    #[inline] pub fn set_sample_rate(&mut self, sr: f32) { self.hp.set_sample_rate(sr); }
    #[inline] pub fn set_cutoff_hz(&mut self, hz: f32) { self.hp.set_cutoff_hz(hz); }
    #[inline] pub fn reset(&mut self) { self.hp.reset(); }

    #[inline] pub fn process(&mut self, x: f32) -> f32 { self.hp.process(x) }
    #[inline] pub fn value(&self) -> f32 { self.hp.value() }
}

/// SVF output tap selection.
#[derive(Copy, Clone, Debug)]
pub enum SvfMode {
    Lowpass,
    Highpass,
    Bandpass,
    Notch,
}

/// Topology-Preserving Transform SVF (State-Variable Filter).
///
/// Parameters:
/// - `cut_hz`  : cutoff / center frequency in Hz
/// - `q`       : quality factor (>= ~0.5 typical; lower increases damping)
///
/// Internals:
/// - `g = tan(π fc / sr)`
/// - `R = 1 / (2Q)`
///
/// This implementation follows common SVF/TPT references (Vadim Zavalishin et al.).
/// Cutoff may be re-set every sample; the envelope filter drives it from a
/// rectified level follower.
#[derive(Copy, Clone, Debug)]
pub struct SvfTpt {
    sr: f32,
    cut: f32,
    q: f32,
    // derived
    g: f32,
    r: f32,
    // states
    ic1eq: f32,
    ic2eq: f32,
}

impl SvfTpt {
    #[inline]
    pub fn new(cut_hz: f32, q: f32, sr: f32) -> Self {
        let mut s = Self {
            sr: sr.max(1.0),
            cut: cut_hz.max(0.0),
            q: q.max(1e-4),
            g: 0.0,
            r: 0.0,
            ic1eq: 0.0,
            ic2eq: 0.0,
        };
        s.recalc();
        s
    }

    #[inline] pub fn set_sample_rate(&mut self, sr: f32) { self.sr = sr.max(1.0); self.recalc(); }
    #[inline] pub fn set_cutoff_hz(&mut self, cut_hz: f32) { self.cut = cut_hz.max(0.0); self.recalc(); }
    #[inline] pub fn set_q(&mut self, q: f32) { self.q = q.max(1e-4); self.recalc(); }
    #[inline] pub fn reset(&mut self) { self.ic1eq = 0.0; self.ic2eq = 0.0; }

    #[inline]
    fn recalc(&mut self) {
        self.g = tpt_g(self.cut, self.sr);       // tan(π fc / sr)
        self.r = 1.0 / (2.0 * self.q);           // damping
    }

    /// Process one sample, returning the four taps `(lp, bp, hp, notch)`.
    #[inline]
    pub fn process_all(&mut self, x: f32) -> (f32, f32, f32, f32) {
        // TPT SVF (Zavalishin), zero-delay loop solved with k = 2R = 1/Q:
        // hp = (x - (g + k) * ic1eq - ic2eq) / (1 + g * (g + k))
        // bp = g * hp + ic1eq
        // lp = g * bp + ic2eq
        // ic1eq' = bp + g * hp
        // ic2eq' = lp + g * bp
        let k = 2.0 * self.r;
        let a = 1.0 / (1.0 + self.g * (self.g + k));
        let hp = a * (x - (self.g + k) * self.ic1eq - self.ic2eq);
        let bp = self.g * hp + self.ic1eq;
        let lp = self.g * bp + self.ic2eq;

        // Update states (trapezoid integrators)
        self.ic1eq = kill_denormals(bp + self.g * hp);
        self.ic2eq = kill_denormals(lp + self.g * bp);

        // x = hp + k * bp + lp, so the notch is what's left without the band
        let notch = x - k * bp;

        (lp, bp, hp, notch)
    }

    /// Process one sample, returning only the mode requested.
    #[inline]
    pub fn process(&mut self, x: f32, mode: SvfMode) -> f32 {
        let (lp, bp, hp, n) = self.process_all(x);
        match mode {
            SvfMode::Lowpass => lp,
            SvfMode::Highpass => hp,
            SvfMode::Bandpass => bp,
            SvfMode::Notch => n,
        }
    }

    /// Convenience helpers per mode
    #[inline] pub fn process_lp(&mut self, x: f32) -> f32 { self.process(x, SvfMode::Lowpass) }
    #[inline] pub fn process_hp(&mut self, x: f32) -> f32 { self.process(x, SvfMode::Highpass) }
    #[inline] pub fn process_bp(&mut self, x: f32) -> f32 { self.process(x, SvfMode::Bandpass) }
    #[inline] pub fn process_notch(&mut self, x: f32) -> f32 { self.process(x, SvfMode::Notch) }
}

// ------------------------------------ Tests --------------------------------------
