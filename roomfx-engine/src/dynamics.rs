//! Log-domain dynamics: a feed-forward compressor and a downward expander.
//!
//! Both follow the Giannoulis/Massberg/Reiss (2012) design: convert the
//! level to dB, run a soft-knee gain computer, smooth the gain delta with
//! the decoupled peak detector, convert back and multiply. Attack and
//! release times become per-sample keep weights at set time, so the audio
//! path is mul/add only apart from the two log/exp conversions.
//!
//! The expander can key off an external side-chain sample fed once per
//! frame; the compressor is self-keyed.

use roomfx_core::detect::PeakDetectorDb;
use roomfx_core::dsp::{clamp, db_to_lin, lin_to_db, one_pole_coeff_ms};

use crate::effect::Effect;

const MIN_THRESH_DB: f32 = -60.0;
const MAX_RATIO: f32 = 20.0;
const MAX_KNEE_DB: f32 = 10.0;
const MAX_MAKEUP_DB: f32 = 20.0;

/// Ratios at exactly 1:1 make the computer a no-op; nudge just above.
const MIN_RATIO: f32 = 1.0 + 1.0e-6;

/// Zero-width knees divide by zero in the quadratic section.
const MIN_KNEE_DB: f32 = 1.0e-6;

/// Compressor gain computer (Reiss Eq. 4). Returns the prescribed output
/// level for input level `x_db`; the quadratic section bridges the unity
/// and `1/ratio` slopes over `knee` dB centered on the threshold.
fn compressor_gain_db(x_db: f32, thresh: f32, ratio: f32, knee: f32) -> f32 {
    let over = x_db - thresh;
    if 2.0 * over < -knee {
        x_db
    } else if 2.0 * over.abs() <= knee {
        let t = over + 0.5 * knee;
        x_db + (1.0 / ratio - 1.0) * t * t / (2.0 * knee)
    } else {
        thresh + over / ratio
    }
}

/// Downward expander computer (the compressor curve inverted below the
/// threshold): quiet material is pushed down at `ratio`, loud material
/// passes, the knee bridges quadratically.
fn expander_gain_db(x_db: f32, thresh: f32, ratio: f32, knee: f32) -> f32 {
    let under = x_db - thresh;
    if 2.0 * under < -knee {
        thresh + under * ratio
    } else if 2.0 * under.abs() <= knee {
        let t = under - 0.5 * knee;
        x_db + (1.0 - ratio) * t * t / (2.0 * knee)
    } else {
        x_db
    }
}

// ---------------------------------- Compressor -----------------------------------

pub struct Compressor {
    enabled: bool,
    sr: f32,
    thresh_db: f32,
    ratio: f32,
    knee_db: f32,
    makeup_db: f32,
    a_attack: f32,
    a_release: f32,
    detector: PeakDetectorDb,
}

impl Compressor {
    pub fn new(sample_rate: f32) -> Self {
        let mut c = Self {
            enabled: false,
            sr: sample_rate.max(1.0),
            thresh_db: 0.0,
            ratio: 2.0,
            knee_db: 1.0,
            makeup_db: 0.0,
            a_attack: 0.0,
            a_release: 0.0,
            detector: PeakDetectorDb::new(),
        };
        c.set_attack_ms(3.5);
        c.set_release_ms(100.0);
        c
    }

    #[inline] pub fn thresh_db(&self) -> f32 { self.thresh_db }
    #[inline] pub fn ratio(&self) -> f32 { self.ratio }
    #[inline] pub fn knee_db(&self) -> f32 { self.knee_db }
    #[inline] pub fn makeup_db(&self) -> f32 { self.makeup_db }

    pub fn set_thresh_db(&mut self, db: f32) {
        self.thresh_db = clamp(db, MIN_THRESH_DB, 0.0);
    }

    pub fn set_ratio(&mut self, ratio: f32) {
        self.ratio = clamp(ratio, MIN_RATIO, MAX_RATIO);
    }

    pub fn set_knee_db(&mut self, db: f32) {
        self.knee_db = clamp(db, MIN_KNEE_DB, MAX_KNEE_DB);
    }

    pub fn set_makeup_db(&mut self, db: f32) {
        self.makeup_db = clamp(db, -MAX_MAKEUP_DB, MAX_MAKEUP_DB);
    }

    pub fn set_attack_ms(&mut self, ms: f32) {
        self.a_attack = one_pole_coeff_ms(ms, self.sr);
    }

    pub fn set_release_ms(&mut self, ms: f32) {
        self.a_release = one_pole_coeff_ms(ms, self.sr);
    }

    pub fn set_params(&mut self, thresh_db: f32, ratio: f32, makeup_db: f32, knee_db: f32, attack_ms: f32, release_ms: f32) {
        self.set_thresh_db(thresh_db);
        self.set_ratio(ratio);
        self.set_makeup_db(makeup_db);
        self.set_knee_db(knee_db);
        self.set_attack_ms(attack_ms);
        self.set_release_ms(release_ms);
    }
}

impl Effect for Compressor {
    fn is_enabled(&self) -> bool { self.enabled }
    fn set_enabled(&mut self, on: bool) { self.enabled = on; }

    fn process_sample(&mut self, x: f32) -> f32 {
        if !self.enabled {
            return x;
        }
        let x_g = lin_to_db(x);
        let y_g = compressor_gain_db(x_g, self.thresh_db, self.ratio, self.knee_db);
        let y_l = self.detector.process(x_g - y_g, self.a_attack, self.a_release);
        x * db_to_lin(self.makeup_db - y_l)
    }
}

// ----------------------------------- Expander ------------------------------------

pub struct Expander {
    enabled: bool,
    sr: f32,
    thresh_db: f32,
    ratio: f32,
    knee_db: f32,
    a_attack: f32,
    a_release: f32,
    side_chain: bool,
    side_value: f32,
    detector: PeakDetectorDb,
}

impl Expander {
    pub fn new(sample_rate: f32) -> Self {
        let mut e = Self {
            enabled: false,
            sr: sample_rate.max(1.0),
            thresh_db: 0.0,
            ratio: 4.0,
            knee_db: 2.0,
            a_attack: 0.0,
            a_release: 0.0,
            side_chain: false,
            side_value: 0.0,
            detector: PeakDetectorDb::new(),
        };
        e.set_attack_ms(3.5);
        e.set_release_ms(100.0);
        e
    }

    #[inline] pub fn thresh_db(&self) -> f32 { self.thresh_db }
    #[inline] pub fn ratio(&self) -> f32 { self.ratio }
    #[inline] pub fn knee_db(&self) -> f32 { self.knee_db }
    #[inline] pub fn side_chain_enabled(&self) -> bool { self.side_chain }

    pub fn set_thresh_db(&mut self, db: f32) {
        self.thresh_db = clamp(db, MIN_THRESH_DB, 0.0);
    }

    pub fn set_ratio(&mut self, ratio: f32) {
        self.ratio = clamp(ratio, MIN_RATIO, MAX_RATIO);
    }

    pub fn set_knee_db(&mut self, db: f32) {
        self.knee_db = clamp(db, MIN_KNEE_DB, MAX_KNEE_DB);
    }

    pub fn set_attack_ms(&mut self, ms: f32) {
        self.a_attack = one_pole_coeff_ms(ms, self.sr);
    }

    pub fn set_release_ms(&mut self, ms: f32) {
        self.a_release = one_pole_coeff_ms(ms, self.sr);
    }

    /// Key the detector from [`feed_side_chain`](Self::feed_side_chain)
    /// instead of the processed signal.
    pub fn set_side_chain(&mut self, on: bool) {
        self.side_chain = on;
    }

    /// Latest side-chain sample; call once per frame before
    /// `process_sample` when the side-chain is on.
    #[inline]
    pub fn feed_side_chain(&mut self, x: f32) {
        self.side_value = x;
    }

    fn gain_for(&mut self, key: f32) -> f32 {
        let x_db = lin_to_db(key);
        let x_sc = expander_gain_db(x_db, self.thresh_db, self.ratio, self.knee_db);
        let g_s = self.detector.process(x_sc - x_db, self.a_attack, self.a_release);
        db_to_lin(g_s)
    }
}

impl Effect for Expander {
    fn is_enabled(&self) -> bool { self.enabled }
    fn set_enabled(&mut self, on: bool) { self.enabled = on; }

    fn process_sample(&mut self, x: f32) -> f32 {
        if !self.enabled {
            return x;
        }
        let key = if self.side_chain { self.side_value } else { x };
        x * self.gain_for(key)
    }
}

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 48000.0;

    fn instant(mut c: Compressor) -> Compressor {
        c.set_attack_ms(0.0);
        c.set_release_ms(0.0);
        c.set_enabled(true);
        c
    }

    #[test]
    fn compressor_curve_is_continuous_at_the_knee_edges() {
        let (t, r, w) = (-20.0, 4.0, 6.0);
        for edge in [t - 0.5 * w, t + 0.5 * w] {
            let below = compressor_gain_db(edge - 1e-3, t, r, w);
            let above = compressor_gain_db(edge + 1e-3, t, r, w);
            assert!((below - above).abs() < 1e-2, "jump at {}: {} vs {}", edge, below, above);
        }
    }

    #[test]
    fn compressor_curve_reduces_inside_the_knee() {
        let (t, r, w) = (-20.0f32, 4.0, 6.0);
        // at the knee center the quadratic gives (1/r - 1) * w / 8
        let y = compressor_gain_db(t, t, r, w);
        let expect = t + (1.0 / r - 1.0) * w / 8.0;
        assert!((y - expect).abs() < 1e-4, "y={} expect={}", y, expect);
        assert!(y < t, "no reduction at the threshold: {}", y);
    }

    #[test]
    fn above_knee_follows_the_ratio_slope() {
        let mut c = instant(Compressor::new(SR));
        c.set_thresh_db(-20.0);
        c.set_ratio(4.0);
        c.set_knee_db(0.0); // floors just above zero

        let x = db_to_lin(-10.0);
        let y = c.process_sample(x);
        // 10 dB over at 4:1 leaves 2.5 dB over: 7.5 dB of reduction
        let expect = x * db_to_lin(-7.5);
        assert!((y - expect).abs() < 1e-3 * expect.abs() + 1e-6, "y={} expect={}", y, expect);
    }

    #[test]
    fn below_threshold_is_transparent() {
        let mut c = instant(Compressor::new(SR));
        c.set_thresh_db(-20.0);
        let x = db_to_lin(-40.0);
        assert_eq!(c.process_sample(x), x);
    }

    #[test]
    fn makeup_gain_scales_the_output() {
        let mut c = instant(Compressor::new(SR));
        c.set_thresh_db(-20.0);
        c.set_makeup_db(6.0);
        let x = db_to_lin(-40.0);
        let y = c.process_sample(x);
        assert!((y - x * db_to_lin(6.0)).abs() < 1e-6, "y={}", y);
    }

    #[test]
    fn bypass_is_exact() {
        let mut c = Compressor::new(SR);
        for x in [0.9, -0.5, 0.0] {
            assert_eq!(c.process_sample(x), x);
        }
    }

    #[test]
    fn attack_and_release_shape_the_gain() {
        let mut c = Compressor::new(SR);
        c.set_thresh_db(-20.0);
        c.set_ratio(2.0);
        c.set_knee_db(0.0);
        c.set_attack_ms(3.5);
        c.set_release_ms(100.0);
        c.set_enabled(true);

        // loud step: gain walks down toward 10 dB of reduction
        let mut gain = 1.0;
        let mut prev = 1.0;
        for n in 0..2000 {
            gain = c.process_sample(1.0);
            assert!(gain <= prev + 1e-6, "gain rose during attack at n={}", n);
            prev = gain;
        }
        let target = db_to_lin(-10.0);
        assert!((gain - target).abs() < 0.02, "gain={} target={}", gain, target);

        // quiet probe: gain recovers at the release rate
        let probe = db_to_lin(-60.0);
        let mut after_10ms = 0.0;
        for n in 0..(SR as usize) {
            let g = c.process_sample(probe) / probe;
            if n == 480 {
                after_10ms = g;
            }
        }
        let final_gain = c.process_sample(probe) / probe;
        assert!(after_10ms < 0.5, "released too fast: {}", after_10ms);
        assert!(final_gain > 0.95, "never recovered: {}", final_gain);
    }

    #[test]
    fn expander_curve_is_continuous_at_the_knee_edges() {
        let (t, r, w) = (-30.0, 4.0, 6.0);
        for edge in [t - 0.5 * w, t + 0.5 * w] {
            let below = expander_gain_db(edge - 1e-3, t, r, w);
            let above = expander_gain_db(edge + 1e-3, t, r, w);
            assert!((below - above).abs() < 5e-2, "jump at {}: {} vs {}", edge, below, above);
        }
    }

    #[test]
    fn expander_attenuates_quiet_passes_loud() {
        let mut e = Expander::new(SR);
        e.set_thresh_db(-20.0);
        e.set_attack_ms(0.0);
        e.set_release_ms(0.0);
        e.set_enabled(true);

        let loud = db_to_lin(0.0);
        assert_eq!(e.process_sample(loud), loud, "loud material touched");

        let quiet = db_to_lin(-40.0);
        let y = e.process_sample(quiet);
        // 20 dB under at 4:1 maps to 80 under: 60 dB of cut
        assert!(y.abs() < quiet * 1e-2, "y={}", y);
    }

    #[test]
    fn expander_side_chain_keys_the_gain() {
        let mut e = Expander::new(SR);
        e.set_thresh_db(-20.0);
        e.set_attack_ms(0.0);
        e.set_release_ms(0.0);
        e.set_side_chain(true);
        e.set_enabled(true);

        let quiet = db_to_lin(-40.0);
        let loud = db_to_lin(0.0);

        // loud key holds the gate open for a quiet signal
        e.feed_side_chain(loud);
        assert_eq!(e.process_sample(quiet), quiet);

        // quiet key shuts it on a loud signal
        e.feed_side_chain(quiet);
        let y = e.process_sample(loud);
        assert!(y.abs() < loud * 1e-2, "y={}", y);

        // dropping back to self-keyed restores loud passthrough
        e.set_side_chain(false);
        assert_eq!(e.process_sample(loud), loud);
    }

    #[test]
    fn ratio_and_knee_clamps_hold() {
        let mut c = Compressor::new(SR);
        c.set_ratio(0.5);
        assert!(c.ratio() > 1.0);
        c.set_ratio(100.0);
        assert_eq!(c.ratio(), MAX_RATIO);
        c.set_knee_db(-3.0);
        assert!(c.knee_db() > 0.0);

        let mut e = Expander::new(SR);
        e.set_ratio(0.0);
        assert!(e.ratio() > 1.0);
        e.set_thresh_db(-200.0);
        assert_eq!(e.thresh_db(), MIN_THRESH_DB);
    }
}
