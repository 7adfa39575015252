/// Flags shared with the host.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering}
};

#[derive(Debug, Default)]
struct Flags {
    running: AtomicBool,
    halted: AtomicBool,
    irq: AtomicBool,
    in_irq: AtomicBool,
}

/// Handle to the control flags of a core.
///
/// Clones share the same flags, so any thread holding one can stop,
/// halt or interrupt a running core. Each flag is a level, not an event.
#[derive(Clone, Debug, Default)]
pub struct Signals(Arc<Flags>);

impl Signals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop the run loop at the next tick boundary.
    /// A halted core is released once the stop is visible.
    pub fn stop(&self) {
        self.0.running.store(false, Ordering::SeqCst);
        self.0.halted.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.0.running.load(Ordering::SeqCst)
    }

    pub fn halt(&self, halted: bool) {
        self.0.halted.store(halted, Ordering::SeqCst);
    }

    pub fn is_halted(&self) -> bool {
        self.0.halted.load(Ordering::SeqCst)
    }

    /// Set the IRQ line. It stays raised until the host lowers it.
    pub fn irq(&self, raised: bool) {
        self.0.irq.store(raised, Ordering::SeqCst);
    }

    pub fn irq_raised(&self) -> bool {
        self.0.irq.load(Ordering::SeqCst)
    }

    /// True while the core is in IRQ mode.
    pub fn in_irq(&self) -> bool {
        self.0.in_irq.load(Ordering::SeqCst)
    }

    pub(super) fn set_running(&self, running: bool) {
        self.0.running.store(running, Ordering::SeqCst);
    }

    pub(super) fn set_in_irq(&self, in_irq: bool) {
        self.0.in_irq.store(in_irq, Ordering::SeqCst);
    }
}
