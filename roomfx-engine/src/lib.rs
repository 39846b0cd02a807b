//! RoomFX Engine — the reverberator, its companion effects, and demo sources.
//!
//! Crate layout:
//! - [`effect`]    : the `Effect` trait and the serial `FxChain`
//! - [`osc`]       : phasor-driven modulation oscillators
//! - [`reverb`]    : Schroeder reverberator (comb bank + allpass stages)
//! - [`echo`]      : feedback delay with damping and a soft-limited loop
//! - [`modfx`]     : tremolo, chorus, flanger, detune
//! - [`dynamics`]  : log-domain compressor and downward expander
//! - [`drive`]     : asymmetric waveshaping saturation
//! - [`envfilter`] : envelope-following low-pass filter
//! - [`sources`]   : `Generator` trait, demo sources, and the `Engine<G>` wrapper
//! - [`audio`]     : cpal output glue (behind the `realtime` feature)
//!
//! The engine deliberately avoids heap allocations in the audio thread.
//! Effects are plain structs; parameters are simple floats, clamped in the
//! setters.

pub mod drive;
pub mod dynamics;
pub mod echo;
pub mod effect;
pub mod envfilter;
pub mod modfx;
pub mod osc;
pub mod reverb;
pub mod sources;

#[cfg(feature = "realtime")]
pub mod audio;

// Re-export some commonly used items to make downstream imports ergonomic.
pub use effect::{Effect, FxChain};
pub use reverb::{Reverb, RoomShape};
pub use sources::{Engine, Generator};
