/// Debugger interface

use crate::core::Mode;

/// Snapshot of the processor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CPUState {
    /// Registers as seen from the current mode.
    pub regs: [u32; 16],
    pub cpsr: u32,
    pub spsr: u32,
    pub mode: Mode,
    pub thumb_mode: bool,

    /// Decoded, then prefetched instruction.
    pub pipeline: [Option<u32>; 2],
}

impl CPUState {
    /// Address of the next instruction to execute.
    pub fn program_counter(&self) -> u32 {
        let size = if self.thumb_mode {2} else {4};
        match self.pipeline[0] {
            Some(_) => self.regs[15].wrapping_sub(2 * size),
            None => self.regs[15],
        }
    }
}

pub trait Debugger {
    fn inspect_state(&mut self) -> CPUState;
}
