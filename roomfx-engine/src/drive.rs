//! Asymmetric saturation.
//!
//! The positive half of the wave runs through `tanh(drive * x)`, the
//! negative half through `tanh(3 * drive * x)`, each normalized by its
//! value at x = 1 so unity input hits unity output regardless of drive.
//! The negative half clipping three times harder puts even harmonics back
//! into the spectrum the way single-ended circuits do.
//!
//! Gains are set in dB. A pre-amp pushes level into the shaper, an output
//! volume trims it back after.

use roomfx_core::dsp::{db_to_lin, soft_clip};

use crate::effect::Effect;

/// Keeps the normalization denominator away from zero.
const MIN_DRIVE: f32 = 1.0e-6;

/// Negative-half drive multiplier.
const NEG_HARDNESS: f32 = 3.0;

pub struct Saturation {
    enabled: bool,
    drive: f32,
    preamp: f32,
    volume: f32,
}

impl Saturation {
    pub fn new() -> Self {
        Self {
            enabled: false,
            drive: 1.0,
            preamp: 1.0,
            volume: 1.0,
        }
    }

    #[inline] pub fn drive(&self) -> f32 { self.drive }
    #[inline] pub fn preamp(&self) -> f32 { self.preamp }
    #[inline] pub fn volume(&self) -> f32 { self.volume }

    /// Shaper intensity in dB; the linear value is floored just above
    /// zero so the normalization stays defined.
    pub fn set_drive_db(&mut self, db: f32) {
        self.drive = db_to_lin(db).max(MIN_DRIVE);
    }

    /// Input gain ahead of the shaper, in dB.
    pub fn set_preamp_db(&mut self, db: f32) {
        self.preamp = db_to_lin(db);
    }

    /// Output trim after the shaper, in dB.
    pub fn set_volume_db(&mut self, db: f32) {
        self.volume = db_to_lin(db);
    }

    #[inline]
    fn shape(&self, x: f32) -> f32 {
        if x >= 0.0 {
            soft_clip(self.drive * x) / soft_clip(self.drive)
        } else {
            soft_clip(NEG_HARDNESS * self.drive * x) / soft_clip(NEG_HARDNESS * self.drive)
        }
    }
}

impl Default for Saturation {
    fn default() -> Self {
        Self::new()
    }
}

impl Effect for Saturation {
    fn is_enabled(&self) -> bool { self.enabled }
    fn set_enabled(&mut self, on: bool) { self.enabled = on; }

    fn process_sample(&mut self, x: f32) -> f32 {
        if !self.enabled {
            return x;
        }
        self.shape(self.preamp * x) * self.volume
    }
}

// ------------------------------------ Tests --------------------------------------
