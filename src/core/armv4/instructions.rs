// Instructions

use crate::{
    core::{ARMCondition, ARMv4, ShiftType},
    error::CoreResult,
    memory::Mem32
};

/// A decoded instruction and the condition it runs under.
///
/// Thumb instructions decode to the same type with an `AL` condition,
/// apart from conditional branches.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ARMv4Instruction {
    cond:   ARMCondition,
    instr:  ARMv4InstructionType,
}

impl ARMv4Instruction {
    pub fn new(cond: ARMCondition, instr: ARMv4InstructionType) -> Self {
        Self {
            cond, instr
        }
    }

    pub fn cond(&self) -> ARMCondition {
        self.cond
    }

    pub fn instr(&self) -> &ARMv4InstructionType {
        &self.instr
    }

    /// Execute the instruction on the core provided.
    ///
    /// A failed condition leaves the core untouched.
    pub fn execute<M: Mem32, A: ARMv4<M> + ?Sized>(self, core: &mut A) -> CoreResult {
        if self.cond.eval(core.read_cpsr()) {
            self.instr.execute(core)
        } else {
            Ok(())
        }
    }
}

/// Common parameters for transfer instructions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferParams {
    pub base_reg:   usize,
    pub inc:        bool,
    pub pre_index:  bool,
    pub writeback:  bool,
}

/// ALU 2nd operand types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ALUOperand {
    Normal(ShiftOperand),
    /// Shift "reg" by the bottom byte of "shift_reg".
    RegShift{
        shift: ShiftType,
        shift_reg: usize,
        reg: usize
    }
}

/// Transfer offset and ALU 2nd operand types.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShiftOperand {
    /// Leaves the shifter carry alone.
    Immediate(u32),
    /// 8-bit immediate rotated right by `rotate`.
    /// A non-zero rotation sets the shifter carry to bit 31.
    Rotated{imm: u32, rotate: u32},
    /// Register shifted by a 5-bit immediate.
    Register{reg: usize, shift: ShiftType, amount: u32},
}

impl ShiftOperand {
    /// Plain register.
    pub const fn reg(reg: usize) -> Self {
        ShiftOperand::Register{reg, shift: ShiftType::LSL, amount: 0}
    }
}

/// Simple data types, used for halfword offset and msr.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpData {
    Immediate(u32),
    Register(usize)
}

/// Decoded instructions.
///
/// Each instruction has a set of parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ARMv4InstructionType {
    SWI{comment: u32},
    /// Undefined instruction trap.
    UND,
    /// Encoding with no behaviour on this core.
    UNSUPPORTED{instr: u32},
    // Branch
    B{offset: u32},
    BL{offset: u32},
    BX{reg: usize},
    /// Thumb B
    TB{offset: u32},
    /// Thumb BL prefix
    TBLLO{offset: u32},
    /// Thumb BL suffix
    TBLHI{offset: u32},
    // Transfer
    SWP{rn: usize, rd: usize, rm: usize},
    SWPB{rn: usize, rd: usize, rm: usize},
    LDR{transfer_params: TransferParams, data_reg: usize, offset: ShiftOperand},
    /// Thumb PC-relative load
    TLDRPC{data_reg: usize, offset: u32},
    STR{transfer_params: TransferParams, data_reg: usize, offset: ShiftOperand},
    LDRB{transfer_params: TransferParams, data_reg: usize, offset: ShiftOperand},
    STRB{transfer_params: TransferParams, data_reg: usize, offset: ShiftOperand},
    LDRH{transfer_params: TransferParams, data_reg: usize, offset: OpData},
    STRH{transfer_params: TransferParams, data_reg: usize, offset: OpData},
    LDRSB{transfer_params: TransferParams, data_reg: usize, offset: OpData},
    LDRSH{transfer_params: TransferParams, data_reg: usize, offset: OpData},
    LDM{transfer_params: TransferParams, reg_list: u32, psr: bool},
    STM{transfer_params: TransferParams, reg_list: u32, psr: bool},
    // ALU
    AND{rd: usize, rn: usize, op2: ALUOperand, set_flags: bool},
    EOR{rd: usize, rn: usize, op2: ALUOperand, set_flags: bool},
    SUB{rd: usize, rn: usize, op2: ALUOperand, set_flags: bool},
    RSB{rd: usize, rn: usize, op2: ALUOperand, set_flags: bool},
    ADD{rd: usize, rn: usize, op2: ALUOperand, set_flags: bool},
    /// Thumb PC-relative add
    TADDPC{rd: usize, op2: u32},
    ADC{rd: usize, rn: usize, op2: ALUOperand, set_flags: bool},
    SBC{rd: usize, rn: usize, op2: ALUOperand, set_flags: bool},
    RSC{rd: usize, rn: usize, op2: ALUOperand, set_flags: bool},
    ORR{rd: usize, rn: usize, op2: ALUOperand, set_flags: bool},
    BIC{rd: usize, rn: usize, op2: ALUOperand, set_flags: bool},
    TST{rn: usize, op2: ALUOperand},
    TEQ{rn: usize, op2: ALUOperand},
    CMP{rn: usize, op2: ALUOperand},
    CMN{rn: usize, op2: ALUOperand},
    MOV{rd: usize, op2: ALUOperand, set_flags: bool},
    MVN{rd: usize, op2: ALUOperand, set_flags: bool},
    // Multiply
    MUL{set_flags: bool, rd: usize, rs: usize, rm: usize},
    MLA{set_flags: bool, rd: usize, rn: usize, rs: usize, rm: usize},
    UMULL{set_flags: bool, rd_hi: usize, rd_lo: usize, rs: usize, rm: usize},
    UMLAL{set_flags: bool, rd_hi: usize, rd_lo: usize, rs: usize, rm: usize},
    SMULL{set_flags: bool, rd_hi: usize, rd_lo: usize, rs: usize, rm: usize},
    SMLAL{set_flags: bool, rd_hi: usize, rd_lo: usize, rs: usize, rm: usize},
    // Other
    MSR{spsr: bool, mask: u32, data: OpData},
    MRS{spsr: bool, rd: usize},
}

impl ARMv4InstructionType {
    /// Execute the instruction on the core provided.
    fn execute<M: Mem32, A: ARMv4<M> + ?Sized>(self, core: &mut A) -> CoreResult {
        use ARMv4InstructionType::*;
        match self {
            SWI{comment} => core.swi(comment),
            UND => core.undefined(),
            UNSUPPORTED{instr} => core.unsupported(instr),

            B{offset} => core.b(offset),
            BL{offset} => core.bl(offset),
            BX{reg} => core.bx(reg),
            TB{offset} => core.tb(offset),
            TBLLO{offset} => core.tbl_lo(offset),
            TBLHI{offset} => core.tbl_hi(offset),

            SWP{rn, rd, rm} => core.swp(rn, rd, rm),
            SWPB{rn, rd, rm} => core.swpb(rn, rd, rm),
            LDR{transfer_params, data_reg, offset} => core.ldr(transfer_params, data_reg, offset),
            TLDRPC{data_reg, offset} => core.tldrpc(data_reg, offset),
            STR{transfer_params, data_reg, offset} => core.str(transfer_params, data_reg, offset),
            LDRB{transfer_params, data_reg, offset} => core.ldrb(transfer_params, data_reg, offset),
            STRB{transfer_params, data_reg, offset} => core.strb(transfer_params, data_reg, offset),
            LDRH{transfer_params, data_reg, offset} => core.ldrh(transfer_params, data_reg, offset),
            STRH{transfer_params, data_reg, offset} => core.strh(transfer_params, data_reg, offset),
            LDRSB{transfer_params, data_reg, offset} => core.ldrsb(transfer_params, data_reg, offset),
            LDRSH{transfer_params, data_reg, offset} => core.ldrsh(transfer_params, data_reg, offset),
            LDM{transfer_params, reg_list, psr} => core.ldm(transfer_params, reg_list, psr),
            STM{transfer_params, reg_list, psr} => core.stm(transfer_params, reg_list, psr),

            AND{rd, rn, op2, set_flags} => core.and(set_flags, rd, rn, op2),
            EOR{rd, rn, op2, set_flags} => core.eor(set_flags, rd, rn, op2),
            ORR{rd, rn, op2, set_flags} => core.orr(set_flags, rd, rn, op2),
            BIC{rd, rn, op2, set_flags} => core.bic(set_flags, rd, rn, op2),
            ADD{rd, rn, op2, set_flags} => core.add(set_flags, rd, rn, op2),
            TADDPC{rd, op2} => core.taddpc(rd, op2),
            SUB{rd, rn, op2, set_flags} => core.sub(set_flags, rd, rn, op2),
            RSB{rd, rn, op2, set_flags} => core.rsb(set_flags, rd, rn, op2),
            ADC{rd, rn, op2, set_flags} => core.adc(set_flags, rd, rn, op2),
            SBC{rd, rn, op2, set_flags} => core.sbc(set_flags, rd, rn, op2),
            RSC{rd, rn, op2, set_flags} => core.rsc(set_flags, rd, rn, op2),
            TST{rn, op2} => core.tst(rn, op2),
            TEQ{rn, op2} => core.teq(rn, op2),
            CMP{rn, op2} => core.cmp(rn, op2),
            CMN{rn, op2} => core.cmn(rn, op2),
            MOV{rd, op2, set_flags} => core.mov(set_flags, rd, op2),
            MVN{rd, op2, set_flags} => core.mvn(set_flags, rd, op2),

            MUL{set_flags, rd, rs, rm} => core.mul(set_flags, rd, rs, rm),
            MLA{set_flags, rd, rn, rs, rm} => core.mla(set_flags, rd, rn, rs, rm),
            UMULL{set_flags, rd_hi, rd_lo, rs, rm} => core.umull(set_flags, rd_hi, rd_lo, rs, rm),
            UMLAL{set_flags, rd_hi, rd_lo, rs, rm} => core.umlal(set_flags, rd_hi, rd_lo, rs, rm),
            SMULL{set_flags, rd_hi, rd_lo, rs, rm} => core.smull(set_flags, rd_hi, rd_lo, rs, rm),
            SMLAL{set_flags, rd_hi, rd_lo, rs, rm} => core.smlal(set_flags, rd_hi, rd_lo, rs, rm),

            MSR{spsr, mask, data} => core.msr(spsr, mask, data),
            MRS{spsr, rd} => core.mrs(spsr, rd),
        }
    }
}
