//! Demo signal sources and the engine wrapper around them.
//!
//! Sources are **mono** generators; the CLI duplicates the sample to however
//! many channels the device needs. `Engine` owns one generator, an
//! [`FxChain`], and a master gain, and renders either sample-by-sample or a
//! block at a time. Everything is allocation-free per sample; `reset` may
//! allocate.
//!
//! Contents:
//! - `Generator`    : the per-sample source contract
//! - `ImpulseTrain` : periodic unit impulses, for auditioning echo density
//! - `NoiseBurst`   : seeded noise bursts with an exponential tail
//! - `Pluck`        : Karplus-Strong plucked string (Karplus & Strong 1983)
//! - `Engine`       : source -> chain -> master gain

use crate::effect::FxChain;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use roomfx_core::delay::DelayLine;
use roomfx_core::dsp::{apply_gain, kill_denormals, millis_to_samples, t60_gain};

// ------------------------------------ Generator --------------------------------------

/// Anything that can produce one mono sample at a time.
pub trait Generator {
    /// Called when the engine is (re)initialized or when the sample rate
    /// changes.
    fn reset(&mut self, sr: f32);

    /// Produce the next mono sample. Implementations may assume the sample
    /// rate last passed to `reset`.
    fn next(&mut self) -> f32;
}

// ------------------------------------ ImpulseTrain --------------------------------------

/// Unit impulses at a fixed period, starting on the first sample.
pub struct ImpulseTrain {
    sr: f32,
    period_ms: f32,
    until_next: usize,
}

impl ImpulseTrain {
    pub fn new(period_ms: f32) -> Self {
        Self {
            sr: 48_000.0,
            period_ms: period_ms.max(1.0),
            until_next: 0,
        }
    }

    /// Time between impulses, floored at 1 ms. Takes effect at the next
    /// impulse.
    #[inline]
    pub fn set_period_ms(&mut self, ms: f32) {
        self.period_ms = ms.max(1.0);
    }

    #[inline]
    fn period_samples(&self) -> usize {
        (millis_to_samples(self.period_ms, self.sr) as usize).max(1)
    }
}

impl Generator for ImpulseTrain {
    fn reset(&mut self, sr: f32) {
        self.sr = sr.max(1.0);
        self.until_next = 0;
    }

    #[inline]
    fn next(&mut self) -> f32 {
        if self.until_next == 0 {
            self.until_next = self.period_samples() - 1;
            1.0
        } else {
            self.until_next -= 1;
            0.0
        }
    }
}

// ------------------------------------ NoiseBurst --------------------------------------

/// Periodic bursts of uniform white noise with an exponential tail.
///
/// The RNG is seeded, so a given seed renders the same signal on every run.
/// The tail multiplier comes from [`t60_gain`] over the decay length, the
/// same fade law the comb bank uses.
pub struct NoiseBurst {
    sr: f32,
    period_ms: f32,
    decay_ms: f32,
    seed: u64,
    rng: StdRng,
    fade: f32,
    env: f32,
    until_next: usize,
}

impl NoiseBurst {
    pub fn new(period_ms: f32, decay_ms: f32, seed: u64) -> Self {
        let mut s = Self {
            sr: 48_000.0,
            period_ms: period_ms.max(1.0),
            decay_ms: decay_ms.max(1.0),
            seed,
            rng: StdRng::seed_from_u64(seed),
            fade: 0.0,
            env: 0.0,
            until_next: 0,
        };
        s.refade();
        s
    }

    /// Time between burst onsets, floored at 1 ms.
    #[inline]
    pub fn set_period_ms(&mut self, ms: f32) {
        self.period_ms = ms.max(1.0);
    }

    /// Length of the burst tail, floored at 1 ms.
    #[inline]
    pub fn set_decay_ms(&mut self, ms: f32) {
        self.decay_ms = ms.max(1.0);
        self.refade();
    }

    #[inline]
    fn refade(&mut self) {
        self.fade = t60_gain(millis_to_samples(self.decay_ms, self.sr));
    }
}

impl Generator for NoiseBurst {
    fn reset(&mut self, sr: f32) {
        self.sr = sr.max(1.0);
        self.rng = StdRng::seed_from_u64(self.seed);
        self.env = 0.0;
        self.until_next = 0;
        self.refade();
    }

    #[inline]
    fn next(&mut self) -> f32 {
        if self.until_next == 0 {
            self.until_next = (millis_to_samples(self.period_ms, self.sr) as usize).max(1) - 1;
            self.env = 1.0;
        } else {
            self.until_next -= 1;
        }
        let s: f32 = self.rng.gen_range(-1.0..=1.0);
        let y = s * self.env;
        self.env = kill_denormals(self.env * self.fade);
        y
    }
}

// ------------------------------------ Pluck --------------------------------------

/// Lowest pitch the string line is sized for.
const PLUCK_MIN_FREQ_HZ: f32 = 20.0;

/// Karplus-Strong plucked string.
///
/// A fractional-length delay loop with a two-tap average in the feedback
/// path; each pluck pushes one period of seeded noise into the loop. The
/// average halves the loop gain at Nyquist, so high partials die first and
/// the tone mellows as it rings. Re-plucks itself on a fixed interval.
pub struct Pluck {
    sr: f32,
    line: DelayLine,
    freq_hz: f32,
    loss: f32,
    seed: u64,
    rng: StdRng,
    period: f32,
    excite_left: usize,
    interval_ms: f32,
    until_next: usize,
}

impl Pluck {
    pub fn new(freq_hz: f32, seed: u64) -> Self {
        let mut s = Self {
            sr: 48_000.0,
            line: DelayLine::new(1),
            freq_hz: freq_hz.clamp(PLUCK_MIN_FREQ_HZ, 10_000.0),
            loss: 0.996,
            seed,
            rng: StdRng::seed_from_u64(seed),
            period: 0.0,
            excite_left: 0,
            interval_ms: 900.0,
            until_next: 0,
        };
        s.reset(48_000.0);
        s
    }

    #[inline]
    pub fn set_freq_hz(&mut self, hz: f32) {
        self.freq_hz = hz.clamp(PLUCK_MIN_FREQ_HZ, 10_000.0);
        self.period = self.sr / self.freq_hz;
    }

    /// Loop gain per period, clamped shy of unity so the string always dies.
    #[inline]
    pub fn set_loss(&mut self, loss: f32) {
        self.loss = loss.clamp(0.0, 0.9999);
    }

    /// Time between automatic re-plucks, floored at 1 ms.
    #[inline]
    pub fn set_interval_ms(&mut self, ms: f32) {
        self.interval_ms = ms.max(1.0);
    }

    /// Queue one period of fresh excitation noise starting on the next
    /// sample.
    #[inline]
    pub fn pluck(&mut self) {
        self.excite_left = (self.period.ceil() as usize).max(1);
    }
}

impl Generator for Pluck {
    fn reset(&mut self, sr: f32) {
        self.sr = sr.max(1.0);
        self.line.resize((self.sr / PLUCK_MIN_FREQ_HZ) as usize + 4);
        self.rng = StdRng::seed_from_u64(self.seed);
        self.period = self.sr / self.freq_hz;
        self.excite_left = 0;
        self.until_next = 0;
    }

    #[inline]
    fn next(&mut self) -> f32 {
        if self.until_next == 0 {
            self.until_next = (millis_to_samples(self.interval_ms, self.sr) as usize).max(1) - 1;
            self.pluck();
        } else {
            self.until_next -= 1;
        }
        let fed = 0.5 * (self.line.read_frac(self.period) + self.line.read_frac(self.period + 1.0));
        let mut y = fed * self.loss;
        if self.excite_left > 0 {
            self.excite_left -= 1;
            let burst: f32 = self.rng.gen_range(-1.0..=1.0);
            y += burst;
        }
        y = kill_denormals(y);
        self.line.write(y);
        y
    }
}

// ------------------------------------ Engine --------------------------------------

/// Owns a generator, an effect chain, and a master gain.
///
/// The audio callback calls [`next`](Self::next) per sample or
/// [`render_block`](Self::render_block) per buffer. If the host sample rate
/// changes mid-stream the generator is `reset` once and rendering continues.
pub struct Engine<G: Generator> {
    sr: f32,
    gen: G,
    chain: FxChain,
    gain: f32,
}

impl<G: Generator> Engine<G> {
    /// Construct around a generator; `reset` runs immediately so the source
    /// agrees with the given sample rate.
    pub fn new(mut gen: G, sr: f32) -> Self {
        let sr = sr.max(1.0);
        gen.reset(sr);
        Self {
            sr,
            gen,
            chain: FxChain::new(),
            gain: 1.0,
        }
    }

    #[inline]
    pub fn sample_rate(&self) -> f32 {
        self.sr
    }

    #[inline]
    pub fn set_gain(&mut self, g: f32) {
        self.gain = g.max(0.0);
    }

    #[inline]
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Mutable access to the source for live parameter tweaks.
    #[inline]
    pub fn source_mut(&mut self) -> &mut G {
        &mut self.gen
    }

    /// Mutable access to the effect chain.
    #[inline]
    pub fn chain_mut(&mut self) -> &mut FxChain {
        &mut self.chain
    }

    #[inline]
    fn sync(&mut self, sr: f32) {
        let sr = sr.max(1.0);
        if sr != self.sr {
            self.sr = sr;
            self.gen.reset(sr);
        }
    }

    /// Produce one mono sample at the given sample rate.
    #[inline]
    pub fn next(&mut self, sr: f32) -> f32 {
        self.sync(sr);
        self.chain.process_sample(self.gen.next()) * self.gain
    }

    /// Fill `out` with mono samples, then apply the master gain in one pass.
    pub fn render_block(&mut self, out: &mut [f32], sr: f32) {
        self.sync(sr);
        for slot in out.iter_mut() {
            *slot = self.chain.process_sample(self.gen.next());
        }
        apply_gain(out, self.gain);
    }
}

// ------------------------------------ Tests --------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::Effect;

    const SR: f32 = 48_000.0;

    #[test]
    fn impulse_train_spacing_follows_the_period() {
        let mut it = ImpulseTrain::new(10.0);
        it.reset(SR);
        for n in 0..1441 {
            let y = it.next();
            if n % 480 == 0 {
                assert_eq!(y, 1.0, "n={} y={}", n, y);
            } else {
                assert_eq!(y, 0.0, "n={} y={}", n, y);
            }
        }
    }

    #[test]
    fn noise_burst_is_reproducible_per_seed() {
        let mut a = NoiseBurst::new(500.0, 100.0, 7);
        let mut b = NoiseBurst::new(500.0, 100.0, 7);
        a.reset(SR);
        b.reset(SR);
        for n in 0..1000 {
            let (ya, yb) = (a.next(), b.next());
            assert_eq!(ya, yb, "n={} ya={} yb={}", n, ya, yb);
        }

        let mut c = NoiseBurst::new(500.0, 100.0, 8);
        c.reset(SR);
        a.reset(SR);
        let mut differs = false;
        for _ in 0..64 {
            if a.next() != c.next() {
                differs = true;
            }
        }
        assert!(differs, "seeds 7 and 8 rendered the same stream");
    }

    #[test]
    fn noise_burst_tail_fades_out() {
        let mut nb = NoiseBurst::new(500.0, 50.0, 11);
        nb.reset(SR);

        let mut onset_peak = 0.0f32;
        for _ in 0..100 {
            onset_peak = onset_peak.max(nb.next().abs());
        }
        assert!(onset_peak > 0.15, "onset_peak={}", onset_peak);

        for _ in 100..4000 {
            nb.next();
        }
        let mut tail_peak = 0.0f32;
        for _ in 4000..6000 {
            tail_peak = tail_peak.max(nb.next().abs());
        }
        assert!(tail_peak < 1e-6, "tail_peak={}", tail_peak);
    }

    #[test]
    fn noise_burst_retriggers_on_the_period() {
        let mut nb = NoiseBurst::new(100.0, 10.0, 3);
        nb.reset(SR);
        for _ in 0..4800 {
            nb.next();
        }
        let mut peak = 0.0f32;
        for _ in 0..100 {
            peak = peak.max(nb.next().abs());
        }
        assert!(peak > 0.15, "peak={}", peak);
    }

    #[test]
    fn pluck_feedback_matches_the_averaging_recurrence() {
        let mut pk = Pluck::new(100.0, 42);
        pk.set_loss(0.9);
        pk.set_interval_ms(10_000.0);
        pk.reset(SR);

        let y: Vec<f32> = (0..2000).map(|_| pk.next()).collect();
        // One period of excitation is 480 samples; past it the loop is a pure
        // linear recurrence over the two oldest taps.
        for n in 481..2000 {
            let want = kill_denormals(0.5 * (y[n - 480] + y[n - 481]) * 0.9);
            assert!(
                (y[n] - want).abs() <= 1e-12,
                "n={} y={} want={}",
                n,
                y[n],
                want
            );
        }
    }

    #[test]
    fn pluck_ring_decays_between_windows() {
        let mut pk = Pluck::new(100.0, 42);
        pk.set_loss(0.9);
        pk.set_interval_ms(10_000.0);
        pk.reset(SR);

        let y: Vec<f32> = (0..5000).map(|_| pk.next()).collect();
        let rms = |w: &[f32]| (w.iter().map(|v| v * v).sum::<f32>() / w.len() as f32).sqrt();
        let early = rms(&y[500..1000]);
        let late = rms(&y[4500..5000]);
        assert!(early > 0.05, "early={}", early);
        assert!(late < early * 0.5, "early={} late={}", early, late);
    }

    #[test]
    fn pluck_excitation_is_seeded() {
        let mut a = Pluck::new(220.0, 5);
        let mut b = Pluck::new(220.0, 5);
        a.reset(SR);
        b.reset(SR);
        for n in 0..1000 {
            let (ya, yb) = (a.next(), b.next());
            assert_eq!(ya, yb, "n={} ya={} yb={}", n, ya, yb);
        }

        let mut c = Pluck::new(220.0, 6);
        c.reset(SR);
        a.reset(SR);
        let mut differs = false;
        for _ in 0..64 {
            if a.next() != c.next() {
                differs = true;
            }
        }
        assert!(differs, "seeds 5 and 6 plucked the same string");
    }

    #[test]
    fn pluck_retriggers_on_the_interval() {
        let mut pk = Pluck::new(100.0, 9);
        pk.set_loss(0.5);
        pk.set_interval_ms(50.0);
        pk.reset(SR);
        for _ in 0..2400 {
            pk.next();
        }
        let mut peak = 0.0f32;
        for _ in 0..100 {
            peak = peak.max(pk.next().abs());
        }
        assert!(peak > 0.15, "peak={}", peak);
    }

    struct Half {
        on: bool,
    }

    impl Effect for Half {
        fn is_enabled(&self) -> bool {
            self.on
        }
        fn set_enabled(&mut self, on: bool) {
            self.on = on;
        }
        fn process_sample(&mut self, x: f32) -> f32 {
            if self.on {
                0.5 * x
            } else {
                x
            }
        }
    }

    #[test]
    fn engine_applies_chain_then_master_gain() {
        let mut eng = Engine::new(ImpulseTrain::new(10.0), SR);
        eng.set_gain(0.25);
        eng.chain_mut().push(Box::new(Half { on: true }));

        let y0 = eng.next(SR);
        assert_eq!(y0, 0.125, "y0={}", y0);
        for n in 1..480 {
            let y = eng.next(SR);
            assert_eq!(y, 0.0, "n={} y={}", n, y);
        }
        let y = eng.next(SR);
        assert_eq!(y, 0.125, "y={}", y);
    }

    #[test]
    fn render_block_matches_per_sample_rendering() {
        let mut a = Engine::new(ImpulseTrain::new(1.0), SR);
        let mut b = Engine::new(ImpulseTrain::new(1.0), SR);
        a.set_gain(0.5);
        b.set_gain(0.5);

        let ya: Vec<f32> = (0..128).map(|_| a.next(SR)).collect();
        let mut yb = [0.0f32; 128];
        b.render_block(&mut yb, SR);
        for n in 0..128 {
            assert_eq!(ya[n], yb[n], "n={} ya={} yb={}", n, ya[n], yb[n]);
        }
    }

    #[test]
    fn engine_resets_the_source_when_the_rate_changes() {
        let mut eng = Engine::new(ImpulseTrain::new(10.0), SR);
        assert_eq!(eng.next(SR), 1.0);
        for _ in 0..10 {
            assert_eq!(eng.next(SR), 0.0);
        }
        // A rate change mid-stream restarts the train at its first impulse.
        let y = eng.next(44_100.0);
        assert_eq!(y, 1.0, "y={}", y);
        assert_eq!(eng.sample_rate(), 44_100.0);
    }
}
