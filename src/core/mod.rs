/// Core traits and types for ARM processors (data access).

mod registers;
mod condition;
mod shifter;
pub mod armv4;
pub mod thumb;

#[cfg(test)]
pub(crate) mod test_utils;

use bitflags::bitflags;
use crate::common::{bit, bits};
use crate::memory::Mem32;

pub use registers::{RegisterFile, physical_slot, NUM_SLOTS, CPSR_INDEX, SPSR_INDEX};
pub use condition::{ARMCondition, evaluate};
pub use shifter::{ShiftType, apply_shift};
pub use armv4::{ARMv4, ArmFamily, ArmTable, TableError};
pub use thumb::{Thumbv4, ThumbFormat, ThumbTable};

pub mod constants {
    pub const SP_REG: usize = 13;
    pub const LINK_REG: usize = 14;
    pub const PC_REG: usize = 15;

    /// ARM instruction size.
    pub const I_SIZE: u32 = 4;
    /// Thumb instruction size.
    pub const T_SIZE: u32 = 2;

    pub const RESET_VECTOR: u32 = 0x0000_0000;
    pub const UNDEFINED_VECTOR: u32 = 0x0000_0004;
    pub const SWI_VECTOR: u32 = 0x0000_0008;
    pub const IRQ_VECTOR: u32 = 0x0000_0018;
}

bitflags! {
    #[derive(Default)]
    pub struct CPSR: u32 {
        const N = bit(31);
        const Z = bit(30);
        const C = bit(29);
        const V = bit(28);
        const I = bit(7);
        const F = bit(6);
        const T = bit(5);
        const MODE = bits(0, 4);

        const FLAGS = bits(28, 31);
    }
}

impl CPSR {
    pub fn carry(self) -> u32 {
        if self.contains(CPSR::C) {
            1
        } else {
            0
        }
    }

    /// The processor mode.
    ///
    /// The register file never stores an undefined mode, so anything else
    /// here is a bug in the core.
    pub fn mode(self) -> Mode {
        match Mode::from_bits(self.bits()) {
            Some(mode) => mode,
            None => unreachable!("undefined mode bits {:05b}", self.bits() & CPSR::MODE.bits()),
        }
    }

    pub fn set_mode(&mut self, mode: Mode) {
        self.remove(CPSR::MODE);
        self.insert(CPSR::from_bits_truncate(mode as u32));
    }

    pub fn is_thumb(self) -> bool {
        self.contains(CPSR::T)
    }

    /// Size of the instructions for the current state.
    pub fn instr_size(self) -> u32 {
        if self.contains(CPSR::T) {
            constants::T_SIZE
        } else {
            constants::I_SIZE
        }
    }

    /// Set N and Z from a result.
    pub fn set_nz(&mut self, result: u32) {
        self.set(CPSR::N, (result >> 31) != 0);
        self.set(CPSR::Z, result == 0);
    }
}

pub type SPSR = CPSR;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mode {
    USR = 0b10000,  // User
    FIQ = 0b10001,  // Fast Interrupt
    IRQ = 0b10010,  // Interrupt
    SVC = 0b10011,  // Supervisor
    ABT = 0b10111,  // Abort
    UND = 0b11011,  // Undefined
    SYS = 0b11111,  // System
}

impl Mode {
    /// Decode the mode field (bits 0-4) of a status word.
    pub const fn from_bits(bits: u32) -> Option<Mode> {
        use Mode::*;
        match bits & 0x1F {
            0b10000 => Some(USR),
            0b10001 => Some(FIQ),
            0b10010 => Some(IRQ),
            0b10011 => Some(SVC),
            0b10111 => Some(ABT),
            0b11011 => Some(UND),
            0b11111 => Some(SYS),
            _ => None,
        }
    }

    pub const fn is_privileged(self) -> bool {
        !matches!(self, Mode::USR)
    }

    /// User and System modes have no saved status register.
    pub const fn has_spsr(self) -> bool {
        !matches!(self, Mode::USR | Mode::SYS)
    }
}

/// Access to the architectural state of a core.
///
/// Instruction sets are written against this trait and never see
/// the surrounding pipeline.
pub trait ARMCore<M: Mem32> {
    fn regs(&self) -> &RegisterFile;
    fn regs_mut(&mut self) -> &mut RegisterFile;
    fn ref_mem(&mut self) -> &mut M;

    /// Read a register as seen from the current mode.
    fn read_reg(&self, n: usize) -> u32 {
        self.regs().read(n)
    }
    /// Write a register as seen from the current mode.
    /// Writing R15 flags a branch for the pipeline.
    fn write_reg(&mut self, n: usize, data: u32) {
        self.regs_mut().write(n, data);
    }

    fn read_usr_reg(&self, n: usize) -> u32 {
        self.regs().read_user(n)
    }
    fn write_usr_reg(&mut self, n: usize, data: u32) {
        self.regs_mut().write_user(n, data);
    }

    fn read_cpsr(&self) -> CPSR {
        self.regs().cpsr()
    }
    /// Write the whole CPSR. Changing mode swaps the visible register bank.
    fn write_cpsr(&mut self, data: CPSR) {
        self.regs_mut().write_cpsr(data);
    }
    /// Write only the condition flags.
    fn write_flags(&mut self, flags: CPSR) {
        let mut cpsr = self.read_cpsr();
        cpsr.remove(CPSR::FLAGS);
        cpsr.insert(flags & CPSR::FLAGS);
        self.regs_mut().write_cpsr(cpsr);
    }

    fn read_spsr(&self) -> SPSR {
        self.regs().spsr()
    }
    fn write_spsr(&mut self, data: SPSR) {
        self.regs_mut().write_spsr(data);
    }

    /// Copy SPSR into CPSR.
    fn return_from_exception(&mut self) {
        let spsr = self.read_spsr();
        self.write_cpsr(spsr);
    }

    /// Take an exception.
    ///
    /// The old CPSR is saved in the SPSR of `mode`, the core switches to ARM
    /// state with IRQs masked, and execution continues at `vector`.
    fn enter_exception(&mut self, mode: Mode, vector: u32, return_addr: u32) {
        let old_cpsr = self.read_cpsr();
        let mut cpsr = old_cpsr;
        cpsr.set_mode(mode);
        cpsr.insert(CPSR::I);
        cpsr.remove(CPSR::T);
        self.write_cpsr(cpsr);
        self.write_spsr(old_cpsr);
        self.write_reg(constants::LINK_REG, return_addr);
        self.write_reg(constants::PC_REG, vector);
    }
}
