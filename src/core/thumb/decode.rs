use super::ThumbFormat;
use crate::{
    common::{bit, test_bit, field, low_reg_field, sign_extend},
    core::{
        ARMCondition, ShiftType,
        constants::*,
        armv4::instructions::*
    }
};

/// Translate a thumb instruction of a known format into ARM form.
///
/// Only conditional branches carry a condition.
pub fn decode_thumb(format: ThumbFormat, i: u16) -> ARMv4Instruction {
    use ThumbFormat::*;
    let instr = match format {
        ShiftedMove =>      decode_shifted_move(i),
        AddSub =>           decode_add_sub(i),
        ImmOps =>           decode_imm_ops(i),
        AluOps =>           decode_alu_ops(i),
        HiRegOps =>         decode_hi_reg_ops(i),
        PcLoad =>           ARMv4InstructionType::TLDRPC {
            data_reg: low_reg_field(i, 8),
            offset: (field(i, 0, 8) as u32) << 2,
        },
        RegOffset =>        decode_reg_offset(i),
        SignExtended =>     decode_sign_extended(i),
        ImmOffset =>        decode_imm_offset(i),
        Halfword =>         decode_halfword(i),
        SpRelative =>       decode_sp_relative(i),
        LoadAddress =>      decode_load_address(i),
        SpAdjust =>         decode_sp_adjust(i),
        PushPop =>          decode_push_pop(i),
        MultipleTransfer => decode_multiple(i),
        CondBranch =>       return decode_cond_branch(i),
        SoftwareInterrupt => ARMv4InstructionType::SWI { comment: field(i, 0, 8) as u32 },
        Branch =>           ARMv4InstructionType::TB {
            offset: sign_extend(field(i, 0, 11) as u32, 11) << 1,
        },
        LongBranchPrefix => ARMv4InstructionType::TBLLO {
            offset: sign_extend(field(i, 0, 11) as u32, 11) << 12,
        },
        LongBranchSuffix => ARMv4InstructionType::TBLHI {
            offset: (field(i, 0, 11) as u32) << 1,
        },
        Undefined =>        ARMv4InstructionType::UND,
    };
    ARMv4Instruction::new(ARMCondition::AL, instr)
}

/// Base + immediate offset, no writeback.
const fn offset_params(base_reg: usize) -> TransferParams {
    TransferParams {
        base_reg,
        inc: true,
        pre_index: true,
        writeback: false,
    }
}

/// Move shifted register. Always sets flags.
fn decode_shifted_move(i: u16) -> ARMv4InstructionType {
    let op2 = ShiftOperand::Register {
        reg: low_reg_field(i, 3),
        shift: ShiftType::from_bits((i >> 11) as u32),
        amount: field(i, 6, 5) as u32,
    };
    ARMv4InstructionType::MOV { rd: low_reg_field(i, 0), op2: ALUOperand::Normal(op2), set_flags: true }
}

/// Add or subtract a register or 3-bit immediate.
fn decode_add_sub(i: u16) -> ARMv4InstructionType {
    let rd = low_reg_field(i, 0);
    let rn = low_reg_field(i, 3);
    let op2 = if test_bit(i, 10) {
        ShiftOperand::Immediate(field(i, 6, 3) as u32)
    } else {
        ShiftOperand::reg(low_reg_field(i, 6))
    };
    let op2 = ALUOperand::Normal(op2);
    if test_bit(i, 9) {
        ARMv4InstructionType::SUB { rd, rn, op2, set_flags: true }
    } else {
        ARMv4InstructionType::ADD { rd, rn, op2, set_flags: true }
    }
}

/// Move, compare, add and subtract with 8-bit immediate.
fn decode_imm_ops(i: u16) -> ARMv4InstructionType {
    use ARMv4InstructionType::*;
    let rd = low_reg_field(i, 8);
    let op2 = ALUOperand::Normal(ShiftOperand::Immediate(field(i, 0, 8) as u32));
    match field(i, 11, 2) {
        0b00 => MOV { rd, op2, set_flags: true },
        0b01 => CMP { rn: rd, op2 },
        0b10 => ADD { rd, rn: rd, op2, set_flags: true },
        _ => SUB { rd, rn: rd, op2, set_flags: true },
    }
}

/// Register-register ALU operations. All set flags.
fn decode_alu_ops(i: u16) -> ARMv4InstructionType {
    use ARMv4InstructionType::*;
    let rs = low_reg_field(i, 3);
    let rd = low_reg_field(i, 0);
    let op2 = ALUOperand::Normal(ShiftOperand::reg(rs));
    let shift_by = |shift| ALUOperand::RegShift { shift, shift_reg: rs, reg: rd };
    match field(i, 6, 4) {
        0x0 => AND { rd, rn: rd, op2, set_flags: true },
        0x1 => EOR { rd, rn: rd, op2, set_flags: true },
        0x2 => MOV { rd, op2: shift_by(ShiftType::LSL), set_flags: true },
        0x3 => MOV { rd, op2: shift_by(ShiftType::LSR), set_flags: true },
        0x4 => MOV { rd, op2: shift_by(ShiftType::ASR), set_flags: true },
        0x5 => ADC { rd, rn: rd, op2, set_flags: true },
        0x6 => SBC { rd, rn: rd, op2, set_flags: true },
        0x7 => MOV { rd, op2: shift_by(ShiftType::ROR), set_flags: true },
        0x8 => TST { rn: rd, op2 },
        // NEG
        0x9 => RSB { rd, rn: rs, op2: ALUOperand::Normal(ShiftOperand::Immediate(0)), set_flags: true },
        0xA => CMP { rn: rd, op2 },
        0xB => CMN { rn: rd, op2 },
        0xC => ORR { rd, rn: rd, op2, set_flags: true },
        0xD => MUL { set_flags: true, rd, rs: rd, rm: rs },
        0xE => BIC { rd, rn: rd, op2, set_flags: true },
        _ => MVN { rd, op2, set_flags: true },
    }
}

/// ADD, CMP and MOV across the full register set, and BX.
/// Only CMP sets flags.
fn decode_hi_reg_ops(i: u16) -> ARMv4InstructionType {
    use ARMv4InstructionType::*;
    let rs = field(i, 3, 4) as usize;
    let rd = low_reg_field(i, 0) | if test_bit(i, 7) {8} else {0};
    let op2 = ALUOperand::Normal(ShiftOperand::reg(rs));
    match field(i, 8, 2) {
        0b00 => ADD { rd, rn: rd, op2, set_flags: false },
        0b01 => CMP { rn: rd, op2 },
        0b10 => MOV { rd, op2, set_flags: false },
        _ => BX { reg: rs },
    }
}

/// Word and byte transfers with register offset.
fn decode_reg_offset(i: u16) -> ARMv4InstructionType {
    use ARMv4InstructionType::*;
    let transfer_params = offset_params(low_reg_field(i, 3));
    let data_reg = low_reg_field(i, 0);
    let offset = ShiftOperand::reg(low_reg_field(i, 6));
    match field(i, 10, 2) {
        0b00 => STR { transfer_params, data_reg, offset },
        0b01 => STRB { transfer_params, data_reg, offset },
        0b10 => LDR { transfer_params, data_reg, offset },
        _ => LDRB { transfer_params, data_reg, offset },
    }
}

/// Halfword and sign-extended transfers with register offset.
fn decode_sign_extended(i: u16) -> ARMv4InstructionType {
    use ARMv4InstructionType::*;
    let transfer_params = offset_params(low_reg_field(i, 3));
    let data_reg = low_reg_field(i, 0);
    let offset = OpData::Register(low_reg_field(i, 6));
    match field(i, 10, 2) {
        0b00 => STRH { transfer_params, data_reg, offset },
        0b01 => LDRSB { transfer_params, data_reg, offset },
        0b10 => LDRH { transfer_params, data_reg, offset },
        _ => LDRSH { transfer_params, data_reg, offset },
    }
}

/// Word and byte transfers with 5-bit immediate offset.
/// Word offsets are scaled by 4.
fn decode_imm_offset(i: u16) -> ARMv4InstructionType {
    use ARMv4InstructionType::*;
    let transfer_params = offset_params(low_reg_field(i, 3));
    let data_reg = low_reg_field(i, 0);
    let imm = field(i, 6, 5) as u32;
    match field(i, 11, 2) {
        0b00 => STR { transfer_params, data_reg, offset: ShiftOperand::Immediate(imm << 2) },
        0b01 => LDR { transfer_params, data_reg, offset: ShiftOperand::Immediate(imm << 2) },
        0b10 => STRB { transfer_params, data_reg, offset: ShiftOperand::Immediate(imm) },
        _ => LDRB { transfer_params, data_reg, offset: ShiftOperand::Immediate(imm) },
    }
}

fn decode_halfword(i: u16) -> ARMv4InstructionType {
    let transfer_params = offset_params(low_reg_field(i, 3));
    let data_reg = low_reg_field(i, 0);
    let offset = OpData::Immediate((field(i, 6, 5) as u32) << 1);
    if test_bit(i, 11) {
        ARMv4InstructionType::LDRH { transfer_params, data_reg, offset }
    } else {
        ARMv4InstructionType::STRH { transfer_params, data_reg, offset }
    }
}

fn decode_sp_relative(i: u16) -> ARMv4InstructionType {
    let transfer_params = offset_params(SP_REG);
    let data_reg = low_reg_field(i, 8);
    let offset = ShiftOperand::Immediate((field(i, 0, 8) as u32) << 2);
    if test_bit(i, 11) {
        ARMv4InstructionType::LDR { transfer_params, data_reg, offset }
    } else {
        ARMv4InstructionType::STR { transfer_params, data_reg, offset }
    }
}

/// Add an immediate to PC or SP.
fn decode_load_address(i: u16) -> ARMv4InstructionType {
    let rd = low_reg_field(i, 8);
    let imm = (field(i, 0, 8) as u32) << 2;
    if test_bit(i, 11) {
        let op2 = ALUOperand::Normal(ShiftOperand::Immediate(imm));
        ARMv4InstructionType::ADD { rd, rn: SP_REG, op2, set_flags: false }
    } else {
        ARMv4InstructionType::TADDPC { rd, op2: imm }
    }
}

/// Add a signed offset to SP.
fn decode_sp_adjust(i: u16) -> ARMv4InstructionType {
    let op2 = ALUOperand::Normal(ShiftOperand::Immediate((field(i, 0, 7) as u32) << 2));
    if test_bit(i, 7) {
        ARMv4InstructionType::SUB { rd: SP_REG, rn: SP_REG, op2, set_flags: false }
    } else {
        ARMv4InstructionType::ADD { rd: SP_REG, rn: SP_REG, op2, set_flags: false }
    }
}

/// PUSH is STMDB SP!, POP is LDMIA SP!.
/// The extra register bit adds LR to a push and PC to a pop.
fn decode_push_pop(i: u16) -> ARMv4InstructionType {
    let low_regs = field(i, 0, 8) as u32;
    let extra = test_bit(i, 8);
    if test_bit(i, 11) {
        let transfer_params = TransferParams {
            base_reg: SP_REG,
            inc: true,
            pre_index: false,
            writeback: true,
        };
        let reg_list = low_regs | if extra {bit(PC_REG)} else {0};
        ARMv4InstructionType::LDM { transfer_params, reg_list, psr: false }
    } else {
        let transfer_params = TransferParams {
            base_reg: SP_REG,
            inc: false,
            pre_index: true,
            writeback: true,
        };
        let reg_list = low_regs | if extra {bit(LINK_REG)} else {0};
        ARMv4InstructionType::STM { transfer_params, reg_list, psr: false }
    }
}

/// LDMIA and STMIA, always with writeback.
fn decode_multiple(i: u16) -> ARMv4InstructionType {
    let transfer_params = TransferParams {
        base_reg: low_reg_field(i, 8),
        inc: true,
        pre_index: false,
        writeback: true,
    };
    let reg_list = field(i, 0, 8) as u32;
    if test_bit(i, 11) {
        ARMv4InstructionType::LDM { transfer_params, reg_list, psr: false }
    } else {
        ARMv4InstructionType::STM { transfer_params, reg_list, psr: false }
    }
}

/// Conditional branch. The AL encoding is undefined.
fn decode_cond_branch(i: u16) -> ARMv4Instruction {
    let cond_bits = field(i, 8, 4) as u32;
    if cond_bits == 0xE {
        return ARMv4Instruction::new(ARMCondition::AL, ARMv4InstructionType::UND);
    }
    let offset = sign_extend(field(i, 0, 8) as u32, 8) << 1;
    ARMv4Instruction::new(ARMCondition::from_bits(cond_bits), ARMv4InstructionType::TB { offset })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::core::ThumbTable;
    use ARMv4InstructionType::*;

    fn decode(i: u16) -> ARMv4Instruction {
        ThumbTable::new().decode(i)
    }

    #[test]
    fn shifts_and_immediates() {
        // LSR R0, R1, #0 (LSR #32)
        assert_eq!(decode(0x0808).instr(), &MOV {
            rd: 0, set_flags: true,
            op2: ALUOperand::Normal(ShiftOperand::Register { reg: 1, shift: ShiftType::LSR, amount: 0 }),
        });
        // SUB R2, R3, #7
        assert_eq!(decode(0x1FDA).instr(), &SUB {
            rd: 2, rn: 3, set_flags: true,
            op2: ALUOperand::Normal(ShiftOperand::Immediate(7)),
        });
        // CMP R0, #0xFF
        assert_eq!(decode(0x28FF).instr(), &CMP {
            rn: 0,
            op2: ALUOperand::Normal(ShiftOperand::Immediate(0xFF)),
        });
    }

    #[test]
    fn alu_ops() {
        // NEG R0, R1
        assert_eq!(decode(0x4248).instr(), &RSB {
            rd: 0, rn: 1, set_flags: true,
            op2: ALUOperand::Normal(ShiftOperand::Immediate(0)),
        });
        // ROR R2, R3
        assert_eq!(decode(0x41DA).instr(), &MOV {
            rd: 2, set_flags: true,
            op2: ALUOperand::RegShift { shift: ShiftType::ROR, shift_reg: 3, reg: 2 },
        });
        // MUL R4, R5
        assert_eq!(decode(0x436C).instr(), &MUL { set_flags: true, rd: 4, rs: 4, rm: 5 });
    }

    #[test]
    fn hi_registers() {
        // MOV R8, R0
        assert_eq!(decode(0x4680).instr(), &MOV {
            rd: 8, set_flags: false,
            op2: ALUOperand::Normal(ShiftOperand::reg(0)),
        });
        // ADD R0, PC
        assert_eq!(decode(0x4478).instr(), &ADD {
            rd: 0, rn: 0, set_flags: false,
            op2: ALUOperand::Normal(ShiftOperand::reg(15)),
        });
        assert_eq!(decode(0x4770).instr(), &BX { reg: 14 });
    }

    #[test]
    fn stack_ops() {
        // PUSH {R0, R4, LR}
        assert_eq!(decode(0xB511).instr(), &STM {
            transfer_params: TransferParams { base_reg: 13, inc: false, pre_index: true, writeback: true },
            reg_list: 0x4011,
            psr: false,
        });
        // POP {R1, PC}
        assert_eq!(decode(0xBD02).instr(), &LDM {
            transfer_params: TransferParams { base_reg: 13, inc: true, pre_index: false, writeback: true },
            reg_list: 0x8002,
            psr: false,
        });
        // ADD SP, #-0x1FC
        assert_eq!(decode(0xB0FF).instr(), &SUB {
            rd: 13, rn: 13, set_flags: false,
            op2: ALUOperand::Normal(ShiftOperand::Immediate(0x1FC)),
        });
        // ADD R1, SP, #8
        assert_eq!(decode(0xA902).instr(), &ADD {
            rd: 1, rn: 13, set_flags: false,
            op2: ALUOperand::Normal(ShiftOperand::Immediate(8)),
        });
    }

    #[test]
    fn transfers() {
        // LDRB R0, [R1, #31]
        assert_eq!(decode(0x7FC8).instr(), &LDRB {
            transfer_params: offset_params(1),
            data_reg: 0,
            offset: ShiftOperand::Immediate(31),
        });
        // STRH R2, [R3, #0x3E]
        assert_eq!(decode(0x87DA).instr(), &STRH {
            transfer_params: offset_params(3),
            data_reg: 2,
            offset: OpData::Immediate(0x3E),
        });
        // LDSB R0, [R1, R2]
        assert_eq!(decode(0x5688).instr(), &LDRSB {
            transfer_params: offset_params(1),
            data_reg: 0,
            offset: OpData::Register(2),
        });
        // LDR R7, [PC, #0x3FC]
        assert_eq!(decode(0x4FFF).instr(), &TLDRPC { data_reg: 7, offset: 0x3FC });
    }

    #[test]
    fn branches() {
        // BNE -4
        assert_eq!(decode(0xD1FE), ARMv4Instruction::new(ARMCondition::NE, TB { offset: 0xFFFF_FFFC }));
        assert_eq!(decode(0xDE00), ARMv4Instruction::new(ARMCondition::AL, UND));
        assert_eq!(decode(0xDF2A).instr(), &SWI { comment: 0x2A });
        assert_eq!(decode(0xE400).instr(), &TB { offset: 0xFFFF_F800 });
        assert_eq!(decode(0xF7FF).instr(), &TBLLO { offset: 0xFFFF_F000 });
        assert_eq!(decode(0xF800).instr(), &TBLHI { offset: 0 });
        assert_eq!(decode(0xFFFF).instr(), &TBLHI { offset: 0xFFE });
        assert_eq!(decode(0xBE00).instr(), &UND);
    }
}
