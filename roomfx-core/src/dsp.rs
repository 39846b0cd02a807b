//! Generic DSP utilities and math helpers.
//!
//! Design goals:
//! - `no_std` ready (guarded by the crate feature `no-std`)
//! - Math backend selection that works in both `std` and `no_std` contexts
//! - Optional `fast-math` approximations for hot paths
//! - Clean, side-effect free helpers that are easy to test
//!
//! Features used by this file:
//! - `fast-math` : enables polynomial/rational approximations (faster, approx.)
//! - `simd`      : enables the `wide` path in the block helpers
//!
//! Conventions:
//! - All functions are `#[inline]` where useful to help the optimizer.
//! - Argument and return domains are documented per function.
//! - Helpers that mirror C++ template utilities are generic over
//!   `num_traits::Float`; per-sample filter state stays concrete `f32`.

#![allow(clippy::excessive_precision)]

use core::f32::consts::PI;

use cfg_if::cfg_if;
use num_traits::float::FloatConst;
use num_traits::Float;

// ----------------------------- Math backend selection -----------------------------

cfg_if! {
    // micromath preferred if explicitly requested (works in no_std)
    if #[cfg(feature = "micromath")] {
        use micromath::F32Ext as _;
        #[inline] fn m_sin(x: f32) -> f32 { x.sin() }
        #[inline] fn m_cos(x: f32) -> f32 { x.cos() }
        #[inline] fn m_exp(x: f32) -> f32 { x.exp() }
        #[inline] fn m_ln(x: f32) -> f32 { x.ln() }
        #[inline] fn m_tanh(x: f32) -> f32 { x.tanh() }
        #[inline] fn m_tan(x: f32) -> f32 { (x.sin()) / (x.cos()) }
        #[inline] fn m_abs(x: f32) -> f32 { x.abs() }
    // libm (C math) in no_std
    } else if #[cfg(feature = "no-std")] {
        #[inline] fn m_sin(x: f32) -> f32 { libm::sinf(x) }
        #[inline] fn m_cos(x: f32) -> f32 { libm::cosf(x) }
        #[inline] fn m_exp(x: f32) -> f32 { libm::expf(x) }
        #[inline] fn m_ln(x: f32) -> f32 { libm::logf(x) }
        #[inline] fn m_tanh(x: f32) -> f32 { libm::tanhf(x) }
        #[inline] fn m_tan(x: f32) -> f32 { libm::tanf(x) }
        #[inline] fn m_abs(x: f32) -> f32 { libm::fabsf(x) }
    // std backend
    } else {
        #[inline] fn m_sin(x: f32) -> f32 { x.sin() }
        #[inline] fn m_cos(x: f32) -> f32 { x.cos() }
        #[inline] fn m_exp(x: f32) -> f32 { x.exp() }
        #[inline] fn m_ln(x: f32) -> f32 { x.ln() }
        #[inline] fn m_tanh(x: f32) -> f32 { x.tanh() }
        #[inline] fn m_tan(x: f32) -> f32 { x.tan() }
        #[inline] fn m_abs(x: f32) -> f32 { x.abs() }
    }
}

// --------------------------------- Constants -------------------------------------

/// 2π (commonly useful)
pub const TAU: f32 = 2.0 * PI;

/// A very small epsilon used in denormal handling and safe divisions.
pub const EPS_SMALL: f32 = 1.0e-20;

/// Amplitude floor treated as "fully decayed" by the T60 helpers
/// (about -194 dB, well under a 24-bit noise floor). Stored as its
/// natural log so decay gains come out of a single `exp`.
const T60_FLOOR_LN: f32 = -22.332_703_749_f32; // ln(2.0e-10)

// --------------------------------- Utilities -------------------------------------

#[inline]
pub fn clamp(x: f32, lo: f32, hi: f32) -> f32 {
    if x < lo { lo } else if x > hi { hi } else { x }
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Kill denormal/subnormal values. Returns 0.0 if |x| < EPS_SMALL.
#[inline]
pub fn kill_denormals(x: f32) -> f32 {
    if x > -EPS_SMALL && x < EPS_SMALL { 0.0 } else { x }
}

// --------------------------------- Mixing laws -----------------------------------

/// Linear crossfade between `a` and `b`; `mix` is clamped into [0, 1].
/// `mix = 0` returns `a`, `mix = 1` returns `b`.
#[inline]
pub fn lin_mix<T: Float>(a: T, b: T, mix: T) -> T {
    let m = mix.max(T::zero()).min(T::one());
    a * (T::one() - m) + b * m
}

/// Equal-power crossfade between `a` and `b`; `mix` is clamped into [0, 1].
/// Weights follow cos/sin quarter-cycles so perceived level holds through
/// the transition.
#[inline]
pub fn pow_mix<T: Float + FloatConst>(a: T, b: T, mix: T) -> T {
    let m = mix.max(T::zero()).min(T::one());
    let theta = m * T::FRAC_PI_2();
    a * theta.cos() + b * theta.sin()
}

/// Remap `x` from [in_lo, in_hi] to [out_lo, out_hi] (no clamping).
#[inline]
pub fn scale<T: Float>(x: T, in_lo: T, in_hi: T, out_lo: T, out_hi: T) -> T {
    if in_hi == in_lo {
        return out_lo;
    }
    (x - in_lo) / (in_hi - in_lo) * (out_hi - out_lo) + out_lo
}

// --------------------------------- Nonlinearities --------------------------------

/// Sigmoid `x / sqrt(x^2 + 1)`: odd, monotonic, asymptotes at ±1.
#[inline]
pub fn bi_sigmoid<T: Float>(x: T) -> T {
    x / (x * x + T::one()).sqrt()
}

/// Hard-clip at ±`thresh`, then fold the overflow through [`bi_sigmoid`]
/// scaled into the remaining headroom. Output magnitude stays below 1 for
/// any input when `thresh < 1`.
#[inline]
pub fn soft_limit<T: Float>(x: T, thresh: T) -> T {
    let t = thresh.max(T::zero()).min(T::one() - T::epsilon());
    let lin = x.max(-t).min(t);
    let head = T::one() - t;
    lin + bi_sigmoid((x - lin) / head) * head
}

/// Soft clip via tanh. If `fast-math` is enabled, uses a stable rational approximation.
///
/// Approximation used when `fast-math`:
/// `tanh(x) ≈ x * (27 + x^2) / (27 + 9 x^2)`
///
/// This is smooth, monotonic, and clamps towards ±1.
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    #[cfg(feature = "fast-math")]
    {
        let x2 = x * x;
        let num = x * (27.0 + x2);
        let den = 27.0 + 9.0 * x2;
        return num / den;
    }
    m_tanh(x)
}

/// Drive + soft saturation helper: `tanh(drive * x)` (or fast approx).
#[inline]
pub fn saturate(x: f32, drive: f32) -> f32 {
    soft_clip(x * drive)
}

// --------------------------------- dB / linear -----------------------------------

/// Convert dB to linear gain: lin = 10^(db/20).
#[inline]
pub fn db_to_lin(db: f32) -> f32 {
    if db <= -120.0 { 0.0 } else { m_exp(0.11512925464970229_f32 * db) } // ln(10)/20 ≈ 0.115129...
}

/// Convert linear gain to dB: db = 20*log10(|lin|), floored at -120 dB.
#[inline]
pub fn lin_to_db(lin: f32) -> f32 {
    let a = m_abs(lin);
    if a <= EPS_SMALL {
        -120.0
    } else {
        8.685889638065036553_f32 * m_ln(a) // 20/ln(10)
    }
}

// --------------------------------- Time / decay ----------------------------------

/// Milliseconds to a (fractional) sample count at `sr`.
#[inline]
pub fn millis_to_samples(ms: f32, sr: f32) -> f32 {
    ms * sr * 0.001
}

/// Sample count to milliseconds at `sr`.
#[inline]
pub fn samples_to_millis(n: f32, sr: f32) -> f32 {
    if sr <= 0.0 { 0.0 } else { n / sr * 1000.0 }
}

/// Per-sample feedback gain that decays unity to the amplitude floor over
/// `num_samps` samples. `num_samps` is floored at 1.
#[inline]
pub fn t60_gain(num_samps: f32) -> f32 {
    m_exp(T60_FLOOR_LN / num_samps.max(1.0))
}

/// Inverse of [`t60_gain`]: how many samples a geometric decay at |gain|
/// per sample needs to reach the amplitude floor.
#[inline]
pub fn t60_samples(gain: f32) -> f32 {
    let g = m_abs(gain);
    if g >= 1.0 {
        return f32::INFINITY;
    }
    if g <= 0.0 {
        return 0.0;
    }
    T60_FLOOR_LN / m_ln(g)
}

// --------------------------------- Exponentials / smoothing ----------------------

/// One-pole smoothing coefficient for a time constant `t_ms` (milliseconds).
///
/// Returns `a = exp(-1/(tau * sr))` for a first-order lag with time constant
/// `tau`: the "keep" weight in `y[n] = (1-a)*x[n] + a*y[n-1]`. `t_ms <= 0`
/// yields 0.0 (no smoothing).
///
/// We interpret `t_ms` as the time to reach ~63% (1 - 1/e). Used for both
/// parameter smoothing and the dynamics detectors.
#[inline]
pub fn one_pole_coeff_ms(t_ms: f32, sr: f32) -> f32 {
    if t_ms <= 0.0 { return 0.0; }
    let tau = t_ms * 0.001;
    m_exp(-1.0 / (tau * sr))
}

/// Convert cutoff in Hz to a simple one-pole (non-TPT) coefficient.
/// Same "keep" weight convention as [`one_pole_coeff_ms`]. This is not an
/// exactly bilinear-matched filter; it's a lightweight "RC" style
/// discretization.
#[inline]
pub fn one_pole_coeff_hz(cut_hz: f32, sr: f32) -> f32 {
    let fc = cut_hz.max(0.0).min(0.499 * sr);
    m_exp(-2.0 * PI * fc / sr)
}

/// TPT (Topology-Preserving Transform) `g = tan(π fc / sr)` helper for state-variable filters.
///
/// If `fast-math` is enabled and `tan` is expensive, we compute `tan(x)`
/// via `sin(x)/cos(x)` using our faster approximations, which is generally sufficient for musical ranges.
#[inline]
pub fn tpt_g(cut_hz: f32, sr: f32) -> f32 {
    let x = core::f32::consts::PI * (cut_hz / sr);
    cfg_if! {
        if #[cfg(feature = "fast-math")] {
            let s = fast_sin(x);
            let c = fast_cos(x);
            s / c
        } else {
            m_tan(x)
        }
    }
}

// --------------------------------- Fast trig -------------------------------------

/// Fast sine with range reduction into [-π, π] and 5th-order minimax-style poly.
/// Max abs error ~1e-3 for musical uses when `fast-math` is enabled; falls back to exact otherwise.
#[inline]
pub fn fast_sin(x: f32) -> f32 {
    cfg_if! {
        if #[cfg(feature = "fast-math")] {
            // Range reduce to [-π, π] without making the parameter mutable in the signature.
            let mut xr = x;
            let k = (xr / TAU).round();
            xr -= k * TAU;

            // 5th-order odd polynomial: sin(x) ≈ x * (a + b x^2 + c x^4)
            let x2 = xr * xr;
            xr * (0.999_979_313_3 + x2 * (-0.166_624_432_0 + x2 * 0.008_308_978_98))
        } else {
            m_sin(x)
        }
    }
}

#[inline]
pub fn fast_cos(x: f32) -> f32 {
    cfg_if! {
        if #[cfg(feature = "fast-math")] {
            // cos(x) = sin(x + π/2)
            fast_sin(x + core::f32::consts::PI * 0.5)
        } else {
            m_cos(x)
        }
    }
}

// --------------------------------- Block helpers ---------------------------------

/// In-place gain: `buf[i] *= gain`. Uses `wide` 4-lane chunks under `simd`.
#[inline]
pub fn apply_gain(buf: &mut [f32], gain: f32) {
    cfg_if! {
        if #[cfg(feature = "simd")] {
            use wide::f32x4;
            let g = f32x4::splat(gain);
            let mut chunks = buf.chunks_exact_mut(4);
            for ch in &mut chunks {
                let v = f32x4::from([ch[0], ch[1], ch[2], ch[3]]) * g;
                ch.copy_from_slice(&v.to_array());
            }
            for x in chunks.into_remainder() {
                *x *= gain;
            }
        } else {
            for x in buf.iter_mut() {
                *x *= gain;
            }
        }
    }
}

/// In-place mix: `dst[i] += src[i] * gain` (pure scalar, portable).
#[inline]
pub fn mix_in_place(dst: &mut [f32], src: &[f32], gain: f32) {
    if dst.len() != src.len() || dst.is_empty() {
        return;
    }
    for (d, s) in dst.iter_mut().zip(src.iter()) {
        *d += *s * gain;
    }
}

// --------------------------------- Tests (std only) ------------------------------
