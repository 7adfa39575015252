/// Instruction tracing.

use std::collections::VecDeque;
use std::fmt;

/// One executed instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TraceEvent {
    pub address: u32,
    pub instruction: u32,
    pub thumb: bool,
    pub mnemonic: &'static str,
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.thumb {
            write!(f, "{:08X}: {:04X}     {}", self.address, self.instruction, self.mnemonic)
        } else {
            write!(f, "{:08X}: {:08X} {}", self.address, self.instruction, self.mnemonic)
        }
    }
}

/// Receives every instruction the core executes.
pub trait Tracer {
    /// Events are only built when this returns true.
    fn enabled(&self) -> bool {
        true
    }

    fn trace(&mut self, event: &TraceEvent);
}

/// Tracing switched off.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoTrace;

impl Tracer for NoTrace {
    #[inline(always)]
    fn enabled(&self) -> bool {
        false
    }

    #[inline(always)]
    fn trace(&mut self, _event: &TraceEvent) {}
}

/// Writes each instruction to the `log` facade at trace level.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogTracer;

impl Tracer for LogTracer {
    fn enabled(&self) -> bool {
        log::log_enabled!(log::Level::Trace)
    }

    fn trace(&mut self, event: &TraceEvent) {
        log::trace!("{}", event);
    }
}

/// Keeps the last `capacity` instructions.
#[derive(Clone, Debug)]
pub struct RingTracer {
    entries: VecDeque<TraceEvent>,
    capacity: usize,
}

impl RingTracer {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn entries(&self) -> &VecDeque<TraceEvent> {
        &self.entries
    }

    pub fn drain(&mut self) -> Vec<TraceEvent> {
        self.entries.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl Tracer for RingTracer {
    fn enabled(&self) -> bool {
        self.capacity > 0
    }

    fn trace(&mut self, event: &TraceEvent) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(event.clone());
    }
}
