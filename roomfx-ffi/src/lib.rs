//! C ABI wrapper for the RoomFX reverberator.
//!
//! Exposes a small set of functions to create/destroy a reverb, process
//! samples (single or block, in place), and set the acoustic parameters.
//!
//! ABI notes
//! - All functions are `extern "C"` and `#[no_mangle]`.
//! - Opaque handle type: `RoomfxReverb` (heap-allocated; you own/delete it).
//! - Room shapes cross the boundary as `int32_t` holding a
//!   [`RoomfxRoomShape`] discriminant; unknown values fall back to Sphere.
//! - Every function null-checks its handle and returns a default instead of
//!   crashing. Nothing here unwinds across the boundary.
//!
//! Threading
//! - The object is NOT thread-safe; call all functions from the same audio thread.

use roomfx_engine::effect::Effect;
use roomfx_engine::reverb::{Reverb, RoomShape};

/// Room geometry for the decay model, as seen from C.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RoomfxRoomShape {
    Cube = 0,
    Sphere = 1,
}

#[inline]
fn shape_from_raw(raw: i32) -> RoomShape {
    match raw {
        0 => RoomShape::Cube,
        _ => RoomShape::Sphere,
    }
}

/// Opaque reverb wrapper we hand to C.
///
/// We keep the sample rate here for introspection; the inner reverb derives
/// everything else from its setters. Recreate the handle if the host changes
/// its device rate.
#[repr(C)]
pub struct RoomfxReverb {
    sr: f32,
    inner: Reverb,
}

// --- Creation / destruction -------------------------------------------------------

/// Create a reverb: `combs` parallel comb filters bracketed by `pre_apf` and
/// `post_apf` series allpass stages. The reverb starts bypassed; call
/// `roomfx_reverb_set_enabled` once parameters are in place.
///
/// Returns a non-null pointer on success, or null on allocation failure.
#[no_mangle]
pub extern "C" fn roomfx_reverb_create(
    sample_rate: f32,
    combs: u32,
    pre_apf: u32,
    post_apf: u32,
) -> *mut RoomfxReverb {
    let sr = if sample_rate.is_finite() { sample_rate.max(1.0) } else { 48_000.0 };
    let inner = Reverb::new(sr, combs as usize, pre_apf as usize, post_apf as usize);
    let handle = RoomfxReverb { sr, inner };
    match Box::into_raw(Box::new(handle)) as *mut RoomfxReverb {
        p if p.is_null() => std::ptr::null_mut(),
        p => p,
    }
}

/// Destroy a reverb previously returned by `roomfx_reverb_create`.
#[no_mangle]
pub extern "C" fn roomfx_reverb_destroy(reverb: *mut RoomfxReverb) {
    if !reverb.is_null() {
        unsafe {
            drop(Box::from_raw(reverb));
        }
    }
}

/// The sample rate the handle was created with, or 0 for a null handle.
#[no_mangle]
pub extern "C" fn roomfx_reverb_sample_rate(reverb: *const RoomfxReverb) -> f32 {
    if reverb.is_null() {
        return 0.0;
    }
    let r = unsafe { &*reverb };
    r.sr
}

// --- Parameters -------------------------------------------------------------------

/// Spread the comb delays over a pre-delay span in milliseconds.
#[no_mangle]
pub extern "C" fn roomfx_reverb_set_time_ms(reverb: *mut RoomfxReverb, time_ms: f32) {
    if reverb.is_null() {
        return;
    }
    let r = unsafe { &mut *reverb };
    r.inner.set_time_ms(time_ms);
}

/// Frequency-dependent decay amount in [0, 1).
#[no_mangle]
pub extern "C" fn roomfx_reverb_set_damping(reverb: *mut RoomfxReverb, damping: f32) {
    if reverb.is_null() {
        return;
    }
    let r = unsafe { &mut *reverb };
    r.inner.set_damping(damping);
}

/// Derive comb feedback gains from a simulated room. `length` is meters;
/// `shape` is a `RoomfxRoomShape` discriminant; `absorption` is the wall
/// absorption coefficient.
#[no_mangle]
pub extern "C" fn roomfx_reverb_set_room(
    reverb: *mut RoomfxReverb,
    length: f32,
    shape: i32,
    absorption: f32,
) {
    if reverb.is_null() {
        return;
    }
    let r = unsafe { &mut *reverb };
    r.inner.set_room(length, shape_from_raw(shape), absorption);
}

/// All acoustic parameters in one call.
#[no_mangle]
pub extern "C" fn roomfx_reverb_set_params(
    reverb: *mut RoomfxReverb,
    time_ms: f32,
    damping: f32,
    length: f32,
    shape: i32,
    absorption: f32,
) {
    if reverb.is_null() {
        return;
    }
    let r = unsafe { &mut *reverb };
    r.inner
        .set_params(time_ms, damping, length, shape_from_raw(shape), absorption);
}

/// Decay time in seconds for the current room, 0 until a room is set.
#[no_mangle]
pub extern "C" fn roomfx_reverb_rt60_seconds(reverb: *const RoomfxReverb) -> f32 {
    if reverb.is_null() {
        return 0.0;
    }
    let r = unsafe { &*reverb };
    r.inner.rt60_seconds()
}

/// Enable or bypass the reverb. Bypassed, it still records input history.
#[no_mangle]
pub extern "C" fn roomfx_reverb_set_enabled(reverb: *mut RoomfxReverb, enabled: bool) {
    if reverb.is_null() {
        return;
    }
    let r = unsafe { &mut *reverb };
    r.inner.set_enabled(enabled);
}

/// Whether the reverb is processing; false for a null handle.
#[no_mangle]
pub extern "C" fn roomfx_reverb_is_enabled(reverb: *const RoomfxReverb) -> bool {
    if reverb.is_null() {
        return false;
    }
    let r = unsafe { &*reverb };
    r.inner.is_enabled()
}

// --- Processing -------------------------------------------------------------------

/// Process one mono sample. A null handle passes the input through.
#[no_mangle]
pub extern "C" fn roomfx_reverb_process(reverb: *mut RoomfxReverb, x: f32) -> f32 {
    if reverb.is_null() {
        return x;
    }
    let r = unsafe { &mut *reverb };
    r.inner.process_sample(x)
}

/// Process `frames` mono samples in place. Null pointers or zero frames are
/// a no-op.
#[no_mangle]
pub extern "C" fn roomfx_reverb_process_block(
    reverb: *mut RoomfxReverb,
    buf: *mut f32,
    frames: u32,
) {
    if reverb.is_null() || buf.is_null() || frames == 0 {
        return;
    }
    let r = unsafe { &mut *reverb };
    let samples = unsafe { std::slice::from_raw_parts_mut(buf, frames as usize) };
    for s in samples.iter_mut() {
        *s = r.inner.process_sample(*s);
    }
}

// ------------------------------------ Tests --------------------------------------
