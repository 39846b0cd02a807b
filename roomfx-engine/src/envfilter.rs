//! Envelope filter (auto-wah): input level sweeps a resonant low-pass.
//!
//! The control path rectifies the input, smooths it through the vactrol
//! lag, warps the 0..1 level through `sqrt(log10(9x + 1))` so small level
//! changes near silence move the cutoff more than equal changes near full
//! scale, then maps it onto a 185..3500 Hz sweep driving the SVF cutoff
//! every sample.

use roomfx_core::detect::Vactrol;
use roomfx_core::dsp::{lin_to_db, scale};
use roomfx_core::filters::SvfTpt;

use crate::effect::Effect;

/// Sweep range endpoints, a guitar-ish wah voicing.
const CUT_FLOOR_HZ: f32 = 185.0;
const CUT_CEIL_HZ: f32 = 3500.0;

pub struct EnvelopeFilter {
    enabled: bool,
    vactrol: Vactrol,
    svf: SvfTpt,
}

impl EnvelopeFilter {
    pub fn new(sample_rate: f32) -> Self {
        let sr = sample_rate.max(1.0);
        let mut f = Self {
            enabled: false,
            vactrol: Vactrol::new(sr),
            svf: SvfTpt::new(CUT_FLOOR_HZ, 10.0, sr),
        };
        f.set_attack_ms(7.76);
        f.set_release_ms(1105.0);
        f
    }

    /// Filter resonance at the swept cutoff.
    pub fn set_q(&mut self, q: f32) {
        self.svf.set_q(q);
    }

    /// How fast the sweep opens on rising level.
    pub fn set_attack_ms(&mut self, ms: f32) {
        self.vactrol.set_attack_ms(ms);
    }

    /// How slowly the sweep falls back after the level drops.
    pub fn set_release_ms(&mut self, ms: f32) {
        self.vactrol.set_decay_ms(ms);
    }
}

impl Effect for EnvelopeFilter {
    fn is_enabled(&self) -> bool { self.enabled }
    fn set_enabled(&mut self, on: bool) { self.enabled = on; }

    fn process_sample(&mut self, x: f32) -> f32 {
        if !self.enabled {
            return x;
        }
        let level = self.vactrol.process(x.abs());
        // lin_to_db(v) / 20 is log10(v) for v >= 1
        let curved = (lin_to_db(9.0 * level + 1.0) * 0.05).sqrt();
        self.svf.set_cutoff_hz(scale(curved, 0.0, 1.0, CUT_FLOOR_HZ, CUT_CEIL_HZ));
        self.svf.process_lp(x)
    }
}

// ------------------------------------ Tests --------------------------------------
