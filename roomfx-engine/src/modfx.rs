//! Modulation effects: tremolo, chorus, flanger, detune.
//!
//! The delay-based three (chorus, flanger, detune) share one scheme: the
//! line records input every call, bypassed or not, and an LFO steers a
//! fractional read tap. Only the tap geometry differs:
//!
//! - chorus  : tap swings around a 5 ms guard offset, wide enough to
//!   pitch-wobble, never close enough to comb
//! - flanger : tap swings from zero to twice the depth, combing against
//!   the dry signal
//! - detune  : two half-phase-offset taps ramp across a grain window with
//!   equal-power cosine gains, trading the wobble for a constant shift
//!
//! LFOs advance only while the effect is enabled, so a bypassed slot
//! re-enters at the phase it left.

use core::f32::consts::PI;

use roomfx_core::delay::DelayLine;
use roomfx_core::dsp::{clamp, fast_cos, lin_mix, millis_to_samples, pow_mix, samples_to_millis};

use crate::effect::Effect;
use crate::osc::{Phasor, SinOsc, TriOsc};

// ------------------------------------ Tremolo ------------------------------------

/// Periods shorter than this alias against the audio band.
const TREMOLO_MIN_SPEED_MS: f32 = 0.05;

/// Sine amplitude modulation. `speed` is the period in milliseconds;
/// `depth` sets how far the level dips at the modulator's peak, from
/// untouched (0) to full silence (1). Gain never exceeds unity.
pub struct Tremolo {
    enabled: bool,
    osc: SinOsc,
    speed_ms: f32,
    depth: f32,
}

impl Tremolo {
    pub fn new(sample_rate: f32) -> Self {
        let speed_ms = 1000.0;
        Self {
            enabled: false,
            osc: SinOsc::new(1000.0 / speed_ms, sample_rate),
            speed_ms,
            depth: 1.0,
        }
    }

    #[inline] pub fn speed_ms(&self) -> f32 { self.speed_ms }
    #[inline] pub fn depth(&self) -> f32 { self.depth }

    /// Modulation period in milliseconds per cycle.
    pub fn set_speed_ms(&mut self, millis_per_cycle: f32) {
        self.speed_ms = millis_per_cycle.max(TREMOLO_MIN_SPEED_MS);
        self.osc.set_frequency(1000.0 / self.speed_ms);
    }

    pub fn set_depth(&mut self, depth: f32) {
        self.depth = clamp(depth, 0.0, 1.0);
    }
}

impl Effect for Tremolo {
    fn is_enabled(&self) -> bool { self.enabled }
    fn set_enabled(&mut self, on: bool) { self.enabled = on; }

    fn process_sample(&mut self, x: f32) -> f32 {
        if !self.enabled {
            return x;
        }
        // unipolar modulator: 0 at the sine trough, 1 at its peak
        let uni = 0.5 * (self.osc.next() + 1.0);
        x * (1.0 - self.depth * uni)
    }
}

// ------------------------------------ Chorus -------------------------------------

/// Tap excursions stay under 50 ms, the edge of the band where delays
/// start to read as discrete echoes (Roads 2004).
const CHORUS_BUFFER_MS: f32 = 50.0;

/// Guard between the write head and the closest tap position.
const CHORUS_GUARD_MS: f32 = 5.0;

/// Triangle-swept doppler wobble blended equal-power with the dry path.
pub struct Chorus {
    sr: f32,
    enabled: bool,
    line: DelayLine,
    osc: TriOsc,
    depth: f32,  // samples
    offset: f32, // samples, depth + guard
    blend: f32,
}

impl Chorus {
    pub fn new(sample_rate: f32) -> Self {
        let sr = sample_rate.max(1.0);
        let mut c = Self {
            sr,
            enabled: false,
            line: DelayLine::new(millis_to_samples(CHORUS_BUFFER_MS, sr) as usize),
            osc: TriOsc::new(0.2, sr),
            depth: 0.0,
            offset: 0.0,
            blend: 0.5,
        };
        c.set_depth_ms(15.0);
        c
    }

    #[inline] pub fn depth_ms(&self) -> f32 { samples_to_millis(self.depth, self.sr) }
    #[inline] pub fn blend(&self) -> f32 { self.blend }

    pub fn set_rate_hz(&mut self, hz: f32) {
        self.osc.set_frequency(hz.max(0.0));
    }

    /// Tap excursion from the average position. Clamped so the farthest
    /// swing (guard + 2x depth) stays inside the line.
    pub fn set_depth_ms(&mut self, ms: f32) {
        let guard = millis_to_samples(CHORUS_GUARD_MS, self.sr);
        let max_depth = 0.5 * (self.line.capacity() as f32 - guard);
        self.depth = clamp(millis_to_samples(ms.max(0.0), self.sr), 0.0, max_depth);
        self.offset = self.depth + guard;
    }

    pub fn set_blend(&mut self, blend: f32) {
        self.blend = clamp(blend, 0.0, 1.0);
    }
}

impl Effect for Chorus {
    fn is_enabled(&self) -> bool { self.enabled }
    fn set_enabled(&mut self, on: bool) { self.enabled = on; }

    fn process_sample(&mut self, x: f32) -> f32 {
        self.line.write(x);
        if !self.enabled {
            return x;
        }
        let tap = self.offset + self.osc.next() * self.depth;
        let wet = self.line.read_frac(tap);
        pow_mix(x, wet, self.blend)
    }
}

// ------------------------------------ Flanger ------------------------------------

/// Sweep ceiling; past 10 ms the effect stops reading as flange
/// (Dattorro 1997).
const FLANGER_BUFFER_MS: f32 = 10.0;

/// Triangle-swept comb against the dry path. Same skeleton as [`Chorus`]
/// minus the guard offset: the tap is allowed all the way up to the write
/// head, which is what makes it comb.
pub struct Flanger {
    sr: f32,
    enabled: bool,
    line: DelayLine,
    osc: TriOsc,
    depth: f32, // samples
    blend: f32,
}

impl Flanger {
    pub fn new(sample_rate: f32) -> Self {
        let sr = sample_rate.max(1.0);
        let mut f = Self {
            sr,
            enabled: false,
            line: DelayLine::new(millis_to_samples(FLANGER_BUFFER_MS, sr) as usize),
            osc: TriOsc::new(0.2, sr),
            depth: 0.0,
            blend: 0.5,
        };
        f.set_depth_ms(5.0);
        f
    }

    #[inline] pub fn depth_ms(&self) -> f32 { samples_to_millis(self.depth, self.sr) }
    #[inline] pub fn blend(&self) -> f32 { self.blend }

    pub fn set_rate_hz(&mut self, hz: f32) {
        self.osc.set_frequency(hz.max(0.0));
    }

    /// Sweep center; the tap covers [0, 2x depth], so depth clamps to half
    /// the line.
    pub fn set_depth_ms(&mut self, ms: f32) {
        let max_depth = 0.5 * self.line.capacity() as f32;
        self.depth = clamp(millis_to_samples(ms.max(0.0), self.sr), 0.0, max_depth);
    }

    pub fn set_blend(&mut self, blend: f32) {
        self.blend = clamp(blend, 0.0, 1.0);
    }
}

impl Effect for Flanger {
    fn is_enabled(&self) -> bool { self.enabled }
    fn set_enabled(&mut self, on: bool) { self.enabled = on; }

    fn process_sample(&mut self, x: f32) -> f32 {
        self.line.write(x);
        if !self.enabled {
            return x;
        }
        let tap = self.depth + self.osc.next() * self.depth;
        let wet = self.line.read_frac(tap);
        pow_mix(x, wet, self.blend)
    }
}

// ------------------------------------ Detune -------------------------------------

const DETUNE_BUFFER_MS: f32 = 300.0;

/// Windows under a millisecond make the phasor rate blow up.
const DETUNE_MIN_WINDOW_MS: f32 = 1.0;

/// Granular pitch shifter: a phasor ramps two read taps across a short
/// window, half a phase apart, each weighted by a cosine gain so one tap
/// fades in as the other fades out. The ramp rate is chosen so the taps
/// recede (or approach) at exactly the speed that produces the requested
/// pitch ratio; the windows hide each tap's wrap-around.
pub struct Detune {
    sr: f32,
    enabled: bool,
    line: DelayLine,
    osc: Phasor,
    ratio: f32,
    window: f32, // samples
    blend: f32,
}

impl Detune {
    pub fn new(sample_rate: f32) -> Self {
        let sr = sample_rate.max(1.0);
        let mut d = Self {
            sr,
            enabled: false,
            line: DelayLine::new(millis_to_samples(DETUNE_BUFFER_MS, sr) as usize),
            osc: Phasor::new(0.0, sr),
            ratio: 1.0,
            window: 0.0,
            blend: 0.5,
        };
        d.set_window_ms(22.0);
        d
    }

    #[inline] pub fn pitch_ratio(&self) -> f32 { self.ratio }
    #[inline] pub fn window_ms(&self) -> f32 { samples_to_millis(self.window, self.sr) }
    #[inline] pub fn blend(&self) -> f32 { self.blend }

    /// Output pitch as a fraction of input pitch, clamped to [0.5, 2]
    /// (down or up one octave). Unity parks the phasor.
    pub fn set_pitch_ratio(&mut self, ratio: f32) {
        self.ratio = clamp(ratio, 0.5, 2.0);
        self.retune();
    }

    /// Grain window length. Longer windows track lower material but smear
    /// transients further.
    pub fn set_window_ms(&mut self, ms: f32) {
        let samps = millis_to_samples(clamp(ms, DETUNE_MIN_WINDOW_MS, DETUNE_BUFFER_MS), self.sr);
        self.window = samps.min(self.line.capacity() as f32);
        self.retune();
    }

    pub fn set_blend(&mut self, blend: f32) {
        self.blend = clamp(blend, 0.0, 1.0);
    }

    /// Ratio above 1 needs the tap sliding toward the write head, which
    /// the phasor expresses as a negative frequency.
    fn retune(&mut self) {
        let window_ms = samples_to_millis(self.window, self.sr);
        self.osc.set_frequency(1000.0 * (1.0 - self.ratio) / window_ms);
    }
}

impl Effect for Detune {
    fn is_enabled(&self) -> bool { self.enabled }
    fn set_enabled(&mut self, on: bool) { self.enabled = on; }

    fn process_sample(&mut self, x: f32) -> f32 {
        self.line.write(x);
        if !self.enabled {
            return x;
        }
        let p1 = self.osc.next();
        let mut p2 = p1 + 0.5;
        if p2 >= 1.0 {
            p2 -= 1.0;
        }

        let tap1 = self.line.read_frac(p1 * self.window);
        let tap2 = self.line.read_frac(p2 * self.window);
        let w1 = fast_cos((p1 - 0.5) * PI);
        let w2 = fast_cos((p2 - 0.5) * PI);

        lin_mix(x, tap1 * w1 + tap2 * w2, self.blend)
    }
}

// ------------------------------------ Tests --------------------------------------
