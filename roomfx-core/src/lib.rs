#![cfg_attr(not(feature = "std"), no_std)]
//! RoomFX Core — no_std-ready DSP primitives with optional fast-math and SIMD hooks.
//!
//! Features
//! - `std`      : (default) use the Rust standard library
//! - `no-std`   : build with `#![no_std]` and use `libm`/`micromath` math backends
//! - `fast-math`: enable approximations (polys/rationals) for tanh/trig, etc.
//! - `simd`     : enable portable SIMD helper code paths (`wide`)
//!
//! Modules
//! - [`dsp`]     : math backend, utils (db/lin, mixing laws, decay times, smoothing)
//! - [`delay`]   : fixed-capacity delay line with saturating and interpolated reads
//! - [`filters`] : one-pole LP/HP/DC blocker, TPT SVF
//! - [`detect`]  : log-domain peak detector, vactrol lag
//!
//! Design
//! - Allocation only at configuration time (the delay line's backing store);
//!   every per-sample path is allocation free
//! - Clear separation between math helpers and stateful building blocks
//! - Friendly to embedded / real-time targets

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod delay;
pub mod detect;
pub mod dsp;
pub mod filters;

/// Commonly used types/functions for convenience:
pub mod prelude {
    pub use crate::delay::DelayLine;
    pub use crate::detect::{PeakDetectorDb, Vactrol};
    pub use crate::dsp::{
        clamp, db_to_lin, kill_denormals, lerp, lin_mix, lin_to_db, millis_to_samples,
        one_pole_coeff_hz, one_pole_coeff_ms, pow_mix, samples_to_millis, soft_clip, soft_limit,
        t60_gain, tpt_g, TAU,
    };
    pub use crate::filters::{DcBlock, OnePoleHP, OnePoleLP, SvfMode, SvfTpt};
}
