/// Banked register file.

use super::{constants::PC_REG, Mode, CPSR, SPSR};

/// Number of physical registers: 31 general purpose + 6 status.
pub const NUM_SLOTS: usize = 37;

/// Logical index of the current status register.
pub const CPSR_INDEX: usize = 16;
/// Logical index of the saved status register.
pub const SPSR_INDEX: usize = 17;

const FIQ_BANK: usize = 17;     // R8-R14, SPSR
const SVC_BANK: usize = 25;     // R13-R14, SPSR
const ABT_BANK: usize = 28;
const IRQ_BANK: usize = 31;
const UND_BANK: usize = 34;

/// Map a logical register (0-15, CPSR, SPSR) to its physical slot in `mode`.
///
/// Returns `None` for the SPSR of User and System mode, which do not have one.
pub const fn physical_slot(mode: Mode, logical: usize) -> Option<usize> {
    use Mode::*;
    match (mode, logical) {
        (_, 0..=7) | (_, PC_REG) | (_, CPSR_INDEX) => Some(logical),
        (USR, SPSR_INDEX) | (SYS, SPSR_INDEX) => None,
        (USR, _) | (SYS, _) => Some(logical),

        (FIQ, 8..=14) => Some(FIQ_BANK + logical - 8),
        (FIQ, SPSR_INDEX) => Some(FIQ_BANK + 7),

        (SVC, 13..=14) => Some(SVC_BANK + logical - 13),
        (SVC, SPSR_INDEX) => Some(SVC_BANK + 2),
        (ABT, 13..=14) => Some(ABT_BANK + logical - 13),
        (ABT, SPSR_INDEX) => Some(ABT_BANK + 2),
        (IRQ, 13..=14) => Some(IRQ_BANK + logical - 13),
        (IRQ, SPSR_INDEX) => Some(IRQ_BANK + 2),
        (UND, 13..=14) => Some(UND_BANK + logical - 13),
        (UND, SPSR_INDEX) => Some(UND_BANK + 2),

        // R8-R12 outside FIQ.
        (_, _) => Some(logical),
    }
}

/// All physical registers of the processor.
///
/// The mode used to resolve banking is always the one in the stored CPSR.
#[derive(Clone, Debug)]
pub struct RegisterFile {
    slots: [u32; NUM_SLOTS],
    branch_pending: bool,
}

impl Default for RegisterFile {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterFile {
    /// All zero, System mode, ARM state.
    pub fn new() -> Self {
        let mut slots = [0; NUM_SLOTS];
        slots[CPSR_INDEX] = Mode::SYS as u32;
        Self {
            slots,
            branch_pending: false,
        }
    }

    pub fn mode(&self) -> Mode {
        self.cpsr().mode()
    }

    /// Read a logical register as seen from `mode`.
    pub fn get(&self, mode: Mode, n: usize) -> u32 {
        match physical_slot(mode, n) {
            Some(slot) => self.slots[slot],
            None => self.slots[CPSR_INDEX],
        }
    }

    /// Write a logical register as seen from `mode`.
    pub fn set(&mut self, mode: Mode, n: usize, data: u32) {
        if n == CPSR_INDEX {
            self.write_cpsr(CPSR::from_bits_truncate(data));
            return;
        }
        if let Some(slot) = physical_slot(mode, n) {
            self.slots[slot] = data;
            if n == PC_REG {
                self.branch_pending = true;
            }
        }
    }

    pub fn read(&self, n: usize) -> u32 {
        self.get(self.mode(), n)
    }

    pub fn write(&mut self, n: usize, data: u32) {
        self.set(self.mode(), n, data);
    }

    /// User bank access, used by block transfers with the S bit.
    pub fn read_user(&self, n: usize) -> u32 {
        self.get(Mode::USR, n)
    }

    pub fn write_user(&mut self, n: usize, data: u32) {
        self.set(Mode::USR, n, data);
    }

    pub fn cpsr(&self) -> CPSR {
        CPSR::from_bits_truncate(self.slots[CPSR_INDEX])
    }

    /// Replace the CPSR.
    ///
    /// A status word with an undefined mode field keeps the current mode.
    pub fn write_cpsr(&mut self, data: CPSR) {
        let mut data = data;
        if Mode::from_bits(data.bits()).is_none() {
            let current = self.mode();
            log::warn!("ignoring undefined mode bits {:05b}, staying in {:?}", data.bits() & CPSR::MODE.bits(), current);
            data.set_mode(current);
        }
        self.slots[CPSR_INDEX] = data.bits();
    }

    /// SPSR of the current mode. User and System read the CPSR.
    pub fn spsr(&self) -> SPSR {
        if self.mode().has_spsr() {
            SPSR::from_bits_truncate(self.read(SPSR_INDEX))
        } else {
            self.cpsr()
        }
    }

    /// Write the SPSR of the current mode. Ignored in User and System.
    pub fn write_spsr(&mut self, data: SPSR) {
        if self.mode().has_spsr() {
            self.write(SPSR_INDEX, data.bits());
        }
    }

    pub fn branch_pending(&self) -> bool {
        self.branch_pending
    }

    /// Read and clear the branch signal.
    pub fn take_branch(&mut self) -> bool {
        std::mem::replace(&mut self.branch_pending, false)
    }

    /// Update R15 without signalling a branch.
    /// Only the pipeline should do this.
    pub fn set_pc_silent(&mut self, data: u32) {
        self.slots[PC_REG] = data;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ALL_MODES: [Mode; 7] = [Mode::USR, Mode::FIQ, Mode::IRQ, Mode::SVC, Mode::ABT, Mode::UND, Mode::SYS];

    #[test]
    fn user_and_system_are_identity() {
        for n in 0..=CPSR_INDEX {
            assert_eq!(physical_slot(Mode::USR, n), Some(n));
            assert_eq!(physical_slot(Mode::SYS, n), Some(n));
        }
        assert_eq!(physical_slot(Mode::USR, SPSR_INDEX), None);
        assert_eq!(physical_slot(Mode::SYS, SPSR_INDEX), None);
    }

    #[test]
    fn fiq_banks_r8_to_r14() {
        for n in 0..8 {
            assert_eq!(physical_slot(Mode::FIQ, n), Some(n));
        }
        assert_eq!(physical_slot(Mode::FIQ, 8), Some(17));
        assert_eq!(physical_slot(Mode::FIQ, 14), Some(23));
        assert_eq!(physical_slot(Mode::FIQ, PC_REG), Some(PC_REG));
        assert_eq!(physical_slot(Mode::FIQ, SPSR_INDEX), Some(24));
    }

    #[test]
    fn privileged_modes_bank_r13_r14_spsr() {
        let table = [
            (Mode::SVC, 25),
            (Mode::ABT, 28),
            (Mode::IRQ, 31),
            (Mode::UND, 34),
        ];
        for (mode, base) in table {
            for n in 0..13 {
                assert_eq!(physical_slot(mode, n), Some(n), "{:?} r{}", mode, n);
            }
            assert_eq!(physical_slot(mode, 13), Some(base));
            assert_eq!(physical_slot(mode, 14), Some(base + 1));
            assert_eq!(physical_slot(mode, SPSR_INDEX), Some(base + 2));
        }
    }

    #[test]
    fn slots_are_unique_and_in_range() {
        let mut used = [false; NUM_SLOTS];
        for mode in ALL_MODES {
            for n in 0..=SPSR_INDEX {
                if let Some(slot) = physical_slot(mode, n) {
                    assert!(slot < NUM_SLOTS);
                    used[slot] = true;
                }
            }
        }
        assert!(used.iter().all(|u| *u));
    }

    #[test]
    fn bank_switch_on_mode_change() {
        let mut regs = RegisterFile::new();
        regs.write(13, 0x0300_7F00);
        regs.write(8, 0x88);

        let mut cpsr = regs.cpsr();
        cpsr.set_mode(Mode::IRQ);
        regs.write_cpsr(cpsr);
        assert_eq!(regs.read(13), 0);
        assert_eq!(regs.read(8), 0x88);
        regs.write(13, 0x0300_7FA0);

        cpsr.set_mode(Mode::FIQ);
        regs.write_cpsr(cpsr);
        assert_eq!(regs.read(8), 0);
        assert_eq!(regs.read(13), 0);

        cpsr.set_mode(Mode::SYS);
        regs.write_cpsr(cpsr);
        assert_eq!(regs.read(13), 0x0300_7F00);
        assert_eq!(regs.get(Mode::IRQ, 13), 0x0300_7FA0);
    }

    #[test]
    fn pc_write_signals_branch() {
        let mut regs = RegisterFile::new();
        regs.write(0, 5);
        assert!(!regs.branch_pending());
        regs.write(PC_REG, 0x100);
        assert!(regs.take_branch());
        assert!(!regs.take_branch());
        regs.set_pc_silent(0x200);
        assert!(!regs.branch_pending());
        assert_eq!(regs.read(PC_REG), 0x200);
    }

    #[test]
    fn spsr_in_user_and_system() {
        let mut regs = RegisterFile::new();
        regs.write(0, 1);
        regs.write_spsr(CPSR::N);
        assert_eq!(regs.spsr(), regs.cpsr());

        let mut cpsr = regs.cpsr();
        cpsr.set_mode(Mode::SVC);
        regs.write_cpsr(cpsr);
        regs.write_spsr(CPSR::Z | CPSR::from_bits_truncate(Mode::USR as u32));
        assert_eq!(regs.spsr().mode(), Mode::USR);
        assert!(regs.spsr().contains(CPSR::Z));
    }

    #[test]
    fn spsr_follows_has_spsr() {
        for mode in ALL_MODES {
            let mut regs = RegisterFile::new();
            let mut cpsr = regs.cpsr();
            cpsr.set_mode(mode);
            regs.write_cpsr(cpsr);
            regs.write_spsr(CPSR::V | CPSR::from_bits_truncate(Mode::USR as u32));
            assert_eq!(regs.spsr().contains(CPSR::V), mode.has_spsr(), "{:?}", mode);
            assert_eq!(physical_slot(mode, SPSR_INDEX).is_some(), mode.has_spsr(), "{:?}", mode);
        }
    }

    #[test]
    fn undefined_mode_is_rejected() {
        let mut regs = RegisterFile::new();
        regs.write_cpsr(CPSR::N | CPSR::from_bits_truncate(0b00101));
        assert_eq!(regs.mode(), Mode::SYS);
        assert!(regs.cpsr().contains(CPSR::N));
    }
}
