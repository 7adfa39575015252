use pretty_assertions::assert_eq;

use crate::{
    core::*,
    core::constants::*,
    error::CoreResult,
    memory::*
};

/// Construct a word from bytes (low to high).
const fn make_32(bytes: &[u8]) -> u32 {
    ((bytes[3] as u32) << 24) |
    ((bytes[2] as u32) << 16) |
    ((bytes[1] as u32) << 8) |
    (bytes[0] as u32)
}

/// Word-addressed RAM starting at 0.
///
/// Fresh memory holds the low byte of each address at that address.
/// Accesses past the end fail.
pub struct TestMem(Vec<u32>);

impl TestMem {
    pub fn new(size: usize) -> Self {
        Self((0..size).map(|i| (i & 0xFF) as u8)
            .collect::<Vec<_>>()
            .chunks_exact(4)
            .map(make_32)
            .collect::<Vec<_>>()
        )
    }

    pub fn word(&self, addr: u32) -> u32 {
        self.0[(addr >> 2) as usize]
    }

    pub fn set_word(&mut self, addr: u32, data: u32) {
        self.0[(addr >> 2) as usize] = data;
    }

    /// Write consecutive halfwords starting at `addr`.
    pub fn set_halfwords(&mut self, addr: u32, data: &[u16]) {
        for (n, half) in data.iter().enumerate() {
            let addr = addr + (n as u32) * 2;
            let shift = (addr & 2) * 8;
            let stored = self.word(addr) & !(0xFFFF << shift);
            self.set_word(addr, stored | ((*half as u32) << shift));
        }
    }

    fn index(&self, addr: u32) -> MemResult<usize> {
        let idx = (addr >> 2) as usize;
        if idx < self.0.len() {
            Ok(idx)
        } else {
            Err(MemoryError::new(addr, "address out of range"))
        }
    }
}

impl Mem32 for TestMem {
    fn load_byte(&mut self, addr: u32) -> MemResult<u8> {
        let data = self.0[self.index(addr)?];
        let shift = (addr & 3) * 8;
        Ok((data >> shift) as u8)
    }
    fn store_byte(&mut self, addr: u32, data: u8) -> MemResult<()> {
        let idx = self.index(addr)?;
        let shift = (addr & 3) * 8;
        let mask = !(0xFF << shift);
        self.0[idx] = (self.0[idx] & mask) | ((data as u32) << shift);
        Ok(())
    }

    fn load_halfword(&mut self, addr: u32) -> MemResult<u16> {
        let data = self.0[self.index(addr)?];
        let shift = (addr & 2) * 8;
        Ok((data >> shift) as u16)
    }
    fn store_halfword(&mut self, addr: u32, data: u16) -> MemResult<()> {
        let idx = self.index(addr)?;
        let shift = (addr & 2) * 8;
        let mask = !(0xFFFF << shift);
        self.0[idx] = (self.0[idx] & mask) | ((data as u32) << shift);
        Ok(())
    }

    fn load_word(&mut self, addr: u32) -> MemResult<u32> {
        Ok(self.0[self.index(addr)?])
    }
    fn store_word(&mut self, addr: u32, data: u32) -> MemResult<()> {
        let idx = self.index(addr)?;
        self.0[idx] = data;
        Ok(())
    }
}

/// Bare core without a pipeline: R15 is set up by hand before each instruction.
pub struct TestCore {
    pub regs: RegisterFile,
    pub mem: TestMem,
    arm_table: ArmTable,
    pub thumb_table: ThumbTable,
}

impl TestCore {
    pub fn new() -> Self {
        Self {
            regs: RegisterFile::new(),
            mem: TestMem::new(0x400),
            arm_table: ArmTable::new().unwrap(),
            thumb_table: ThumbTable::new(),
        }
    }

    /// Run an ARM instruction as if it were fetched from `addr`.
    pub fn run_arm_at(&mut self, addr: u32, i: u32) -> CoreResult {
        self.regs.set_pc_silent(addr.wrapping_add(2 * I_SIZE));
        let instr = self.arm_table.decode(i);
        instr.execute(self)
    }

    pub fn run_arm(&mut self, i: u32) -> CoreResult {
        self.run_arm_at(0, i)
    }

    /// Run a thumb instruction as if it were fetched from `addr`.
    pub fn run_thumb_at(&mut self, addr: u32, i: u16) -> CoreResult {
        self.regs.set_pc_silent(addr.wrapping_add(2 * T_SIZE));
        let table = self.thumb_table;
        self.execute_thumb(&table, i)
    }

    pub fn set_flags(&mut self, flags: CPSR) {
        self.write_flags(flags);
    }

    pub fn flags(&self) -> CPSR {
        self.read_cpsr() & CPSR::FLAGS
    }
}

impl ARMCore<TestMem> for TestCore {
    fn regs(&self) -> &RegisterFile {
        &self.regs
    }
    fn regs_mut(&mut self) -> &mut RegisterFile {
        &mut self.regs
    }
    fn ref_mem(&mut self) -> &mut TestMem {
        &mut self.mem
    }
}

impl ARMv4<TestMem> for TestCore {}
impl Thumbv4<TestMem> for TestCore {}

/// Input state of a single instruction test.
#[derive(Default)]
pub struct TestIn {
    pub regs: Vec<u32>,
    pub flags: CPSR,
    pub thumb: bool,
    pub mem: Vec<(u32, u32)>,
    pub instr: u32,
}

/// Expected state after a single instruction test.
#[derive(Default)]
pub struct TestOut {
    pub regs: Vec<Option<u32>>,
    pub flags: Option<CPSR>,
    pub mem: Vec<(u32, u32)>,
    pub branched: Option<bool>,
}

impl TestIn {
    /// Run the instruction from address 0 and check the result.
    pub fn run_test(&self, out: &TestOut) {
        let mut cpu = TestCore::new();
        for (i, val) in self.regs.iter().enumerate() {
            cpu.regs.write(i, *val);
        }
        for (addr, data) in self.mem.iter() {
            cpu.mem.set_word(*addr, *data);
        }
        cpu.set_flags(self.flags);
        if self.thumb {
            let mut cpsr = cpu.read_cpsr();
            cpsr.insert(CPSR::T);
            cpu.write_cpsr(cpsr);
        }
        cpu.regs.take_branch();

        let result = if self.thumb {
            cpu.run_thumb_at(0, self.instr as u16)
        } else {
            cpu.run_arm(self.instr)
        };
        assert!(result.is_ok(), "{:08X}: {:?}", self.instr, result);

        for (i, val) in out.regs.iter().enumerate() {
            if let Some(expected) = val {
                assert_eq!(cpu.read_reg(i), *expected, "{:08X}: r{}", self.instr, i);
            }
        }
        if let Some(flags) = out.flags {
            assert_eq!(cpu.flags(), flags, "{:08X}: flags", self.instr);
        }
        for (addr, data) in out.mem.iter() {
            assert_eq!(cpu.mem.word(*addr), *data, "{:08X}: mem {:X}", self.instr, addr);
        }
        if let Some(branched) = out.branched {
            assert_eq!(cpu.regs.branch_pending(), branched, "{:08X}: branch", self.instr);
        }
    }
}

/// Run a batch of tests.
pub fn run_tests(data: &[(TestIn, TestOut)]) {
    for (test_in, test_out) in data.iter() {
        test_in.run_test(test_out);
    }
}
