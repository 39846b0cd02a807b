//! Feedback echo with damped, soft-limited repeats.
//!
//! Signal path per sample: read the wet tap `delay_ms` behind the write
//! head, low-pass it (damping), then write `input + soft_limit(wet * fb)`
//! back through a DC blocker. The soft limiter keeps the loop bounded for
//! any feedback setting; the blocker sits at 3 Hz so offset cannot
//! recirculate and ratchet up. The loop runs even while bypassed.
//!
//! Defaults are a dotted-eighth 398 ms at moderate regeneration.

use roomfx_core::delay::DelayLine;
use roomfx_core::dsp::{clamp, lin_mix, millis_to_samples, soft_limit, t60_gain};
use roomfx_core::filters::{DcBlock, OnePoleLP};

use crate::effect::Effect;

/// Delay line length; `set_delay_ms` clamps into this window.
pub const ECHO_BUFFER_SECONDS: f32 = 3.0;

/// Soft limiter knee inside the feedback loop.
const LOOP_LIMIT: f32 = 0.75;

/// Loop DC blocker cutoff. Low enough to stay inaudible after many
/// recirculations.
const LOOP_DC_HZ: f32 = 3.0;

const DEFAULT_DELAY_MS: f32 = 398.0;
const DEFAULT_FEEDBACK: f32 = 0.3;
const DEFAULT_DAMPING: f32 = 0.5;
const DEFAULT_BLEND: f32 = 0.5;

pub struct Echo {
    sr: f32,
    enabled: bool,
    line: DelayLine,
    damp: OnePoleLP,
    dc: DcBlock,
    delay_ms: f32,
    feedback: f32,
    blend: f32,
}

impl Echo {
    pub fn new(sample_rate: f32) -> Self {
        let sr = sample_rate.max(1.0);
        Self {
            sr,
            enabled: false,
            line: DelayLine::new((sr * ECHO_BUFFER_SECONDS) as usize),
            damp: OnePoleLP::from_g(DEFAULT_DAMPING),
            dc: DcBlock::new(LOOP_DC_HZ, sr),
            delay_ms: DEFAULT_DELAY_MS,
            feedback: DEFAULT_FEEDBACK,
            blend: DEFAULT_BLEND,
        }
    }

    #[inline] pub fn delay_ms(&self) -> f32 { self.delay_ms }
    #[inline] pub fn feedback(&self) -> f32 { self.feedback }
    #[inline] pub fn blend(&self) -> f32 { self.blend }

    /// Tap position behind the write head, clamped into the buffer.
    #[inline]
    pub fn set_delay_ms(&mut self, ms: f32) {
        self.delay_ms = clamp(ms, 0.0, ECHO_BUFFER_SECONDS * 1000.0);
    }

    /// Regeneration per repeat. Values past unity stay bounded thanks to
    /// the loop limiter, at the price of sustained self-oscillation.
    #[inline]
    pub fn set_feedback(&mut self, fb: f32) {
        self.feedback = fb;
    }

    /// Pick the feedback so the repeats decay to the amplitude floor over
    /// `decay_ms` of wall time at the current tap position.
    pub fn set_feedback_t60(&mut self, decay_ms: f32) {
        let delay_samps = millis_to_samples(self.delay_ms, self.sr).max(1.0);
        let repeats = (millis_to_samples(decay_ms.max(0.0), self.sr) / delay_samps).round();
        self.feedback = t60_gain(repeats);
    }

    /// Repeat brightness: 0 leaves repeats untouched, values toward 1
    /// progressively darken each pass.
    #[inline]
    pub fn set_damping(&mut self, damping: f32) {
        self.damp.set_g(clamp(damping, 0.0, 1.0));
    }

    /// Dry/wet balance in [0, 1].
    #[inline]
    pub fn set_blend(&mut self, blend: f32) {
        self.blend = clamp(blend, 0.0, 1.0);
    }
}

impl Effect for Echo {
    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, on: bool) {
        self.enabled = on;
    }

    /// The loop ticks unconditionally; bypass only switches the return
    /// value, so a live tail keeps decaying behind a bypassed slot.
    fn process_sample(&mut self, x: f32) -> f32 {
        let wet = self.damp.process(self.line.read_frac(millis_to_samples(self.delay_ms, self.sr)));
        let regen = soft_limit(wet * self.feedback, LOOP_LIMIT);
        self.line.write(self.dc.process(x + regen));
        if !self.enabled {
            return x;
        }
        lin_mix(x, wet, self.blend)
    }
}

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use roomfx_core::dsp::t60_gain;

    const SR: f32 = 48000.0;

    fn wet_echo(delay_ms: f32) -> Echo {
        let mut e = Echo::new(SR);
        e.set_delay_ms(delay_ms);
        e.set_damping(0.0);
        e.set_blend(1.0);
        e.set_enabled(true);
        e
    }

    #[test]
    fn defaults_sit_on_the_documented_values() {
        let e = Echo::new(SR);
        assert!(!e.is_enabled());
        assert_eq!(e.delay_ms(), 398.0);
        assert_eq!(e.feedback(), 0.3);
        assert_eq!(e.blend(), 0.5);
    }

    #[test]
    fn setters_clamp_into_range() {
        let mut e = Echo::new(SR);
        e.set_delay_ms(-5.0);
        assert_eq!(e.delay_ms(), 0.0);
        e.set_delay_ms(10_000.0);
        assert_eq!(e.delay_ms(), 3000.0);
        e.set_blend(4.0);
        assert_eq!(e.blend(), 1.0);
    }

    #[test]
    fn first_repeat_arrives_after_the_delay_time() {
        let mut e = wet_echo(100.0);
        let d = millis_to_samples(100.0, SR).round() as usize;
        let mut first = (0usize, 0.0f32);
        for n in 0..(2 * d) {
            let x = if n == 0 { 1.0 } else { 0.0 };
            let y = e.process_sample(x);
            if first.1 == 0.0 && y.abs() > 1e-3 {
                first = (n, y);
            }
        }
        assert_eq!(first.0, d, "repeat surfaced at {}", first.0);
        assert!((first.1 - 1.0).abs() < 1e-3, "amplitude {}", first.1);
    }

    #[test]
    fn repeats_decay_by_the_feedback_gain() {
        let mut e = wet_echo(100.0);
        e.set_feedback(0.5);
        let d = millis_to_samples(100.0, SR).round() as usize;
        let mut peaks = Vec::new();
        for n in 0..(3 * d + 2) {
            let x = if n == 0 { 1.0 } else { 0.0 };
            let y = e.process_sample(x).abs();
            if y > 1e-3 {
                peaks.push(y);
            }
        }
        assert!(peaks.len() >= 3, "peaks={:?}", peaks);
        assert!((peaks[1] / peaks[0] - 0.5).abs() < 1e-2, "ratio={}", peaks[1] / peaks[0]);
        assert!((peaks[2] / peaks[1] - 0.5).abs() < 1e-2, "ratio={}", peaks[2] / peaks[1]);
    }

    #[test]
    fn bypassed_input_still_seeds_the_line() {
        let mut e = Echo::new(SR);
        e.set_delay_ms(100.0);
        e.set_damping(0.0);
        e.set_blend(1.0);

        assert_eq!(e.process_sample(1.0), 1.0, "bypass returns dry");
        e.set_enabled(true);

        let d = millis_to_samples(100.0, SR).round() as usize;
        let mut peak = (0usize, 0.0f32);
        for n in 1..(d + 2) {
            let y = e.process_sample(0.0).abs();
            if y > peak.1 {
                peak = (n, y);
            }
        }
        assert_eq!(peak.0, d, "bypassed impulse surfaced at {}", peak.0);
        assert!((peak.1 - 1.0).abs() < 1e-3, "amplitude {}", peak.1);
    }

    #[test]
    fn feedback_t60_counts_repeats() {
        let mut e = Echo::new(SR);
        e.set_delay_ms(100.0);
        e.set_feedback_t60(1000.0); // 10 repeats to the floor
        let expect = t60_gain(10.0);
        assert!((e.feedback() - expect).abs() < 1e-6, "fb={}", e.feedback());

        // shorter decay than one repeat floors at a single-step decay
        e.set_feedback_t60(0.0);
        assert!(e.feedback() <= t60_gain(1.0) + 1e-6, "fb={}", e.feedback());
    }

    #[test]
    fn blend_zero_is_fully_dry() {
        let mut e = Echo::new(SR);
        e.set_blend(0.0);
        e.set_enabled(true);
        for x in [0.5, -0.25, 1.0, 0.0] {
            assert_eq!(e.process_sample(x), x);
        }
    }

    #[test]
    fn damping_shrinks_the_first_repeat() {
        let d = millis_to_samples(100.0, SR).round() as usize;
        let run = |damping: f32| -> f32 {
            let mut e = wet_echo(100.0);
            e.set_damping(damping);
            let mut peak = 0.0f32;
            for n in 0..(d + 2) {
                let x = if n == 0 { 1.0 } else { 0.0 };
                peak = peak.max(e.process_sample(x).abs());
            }
            peak
        };
        let bright = run(0.0);
        let dark = run(0.9);
        assert!(dark < bright * 0.5, "bright={} dark={}", bright, dark);
    }

    #[test]
    fn hot_feedback_stays_bounded() {
        let mut e = wet_echo(50.0);
        e.set_feedback(1.5);
        let mut peak = 0.0f32;
        for n in 0..(SR as usize) {
            let x = if n < 10 { 0.8 } else { 0.0 };
            let y = e.process_sample(x);
            assert!(y.is_finite(), "n={}", n);
            peak = peak.max(y.abs());
        }
        assert!(peak < 2.0, "peak={}", peak);
    }
}
