//! Work budget for long parses and writes.
//!
//! The engine is single threaded. A host that needs to interleave other work
//! installs a hook; the hook runs after every `per_tick` units of work (one
//! unit per object parsed or serialized).

use std::fmt;

pub struct WorkBudget<'a> {
    per_tick: usize,
    units: usize,
    ticks: usize,
    hook: Option<Box<dyn FnMut(usize) + 'a>>,
}

impl<'a> WorkBudget<'a> {
    pub fn new(per_tick: usize) -> Self {
        Self {
            per_tick: per_tick.max(1),
            units: 0,
            ticks: 0,
            hook: None,
        }
    }

    /// Installs the yield hook. It receives the number of ticks elapsed so far.
    pub fn with_hook(mut self, hook: impl FnMut(usize) + 'a) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn set_hook(&mut self, hook: Box<dyn FnMut(usize) + 'a>) {
        self.hook = Some(hook);
    }

    /// Records one unit of work, yielding to the hook at tick boundaries.
    pub fn spend(&mut self) {
        self.units += 1;
        if self.units % self.per_tick == 0 {
            self.ticks += 1;
            if let Some(hook) = self.hook.as_mut() {
                hook(self.ticks);
            }
        }
    }

    pub fn units(&self) -> usize {
        self.units
    }

    pub fn ticks(&self) -> usize {
        self.ticks
    }
}

impl fmt::Debug for WorkBudget<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkBudget")
            .field("per_tick", &self.per_tick)
            .field("units", &self.units)
            .field("ticks", &self.ticks)
            .field("hook", &self.hook.is_some())
            .finish()
    }
}
