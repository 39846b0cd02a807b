//! The common effect surface: per-sample processors with a bypass switch.
//!
//! Effects construct disabled and return input untouched until enabled.
//! Delay-based effects still record input history while bypassed, so
//! enabling one mid-stream picks up a seamless tail instead of silence.

/// One mono in, one mono out, once per audio frame.
pub trait Effect {
    fn is_enabled(&self) -> bool;
    fn set_enabled(&mut self, on: bool);

    fn toggle(&mut self) {
        let on = self.is_enabled();
        self.set_enabled(!on);
    }

    fn process_sample(&mut self, x: f32) -> f32;
}

/// Serial chain of boxed effects, applied in push order.
///
/// The chain itself has no bypass: a disabled slot already passes through.
#[derive(Default)]
pub struct FxChain {
    slots: Vec<Box<dyn Effect + Send>>,
}

impl FxChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fx: Box<dyn Effect + Send>) {
        self.slots.push(fx);
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slot_mut(&mut self, i: usize) -> Option<&mut (dyn Effect + Send + 'static)> {
        self.slots.get_mut(i).map(|b| b.as_mut())
    }

    #[inline]
    pub fn process_sample(&mut self, x: f32) -> f32 {
        let mut y = x;
        for fx in self.slots.iter_mut() {
            y = fx.process_sample(y);
        }
        y
    }
}

// ------------------------------------ Tests --------------------------------------
