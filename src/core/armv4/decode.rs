
use super::{
    instructions::*,
    table::ArmFamily
};
use crate::{
    common::{test_bit, reg_field, sign_extend},
    core::{ARMCondition, ShiftType}
};

/// Make fsxc mask for manipulating PSR.
/// Creates a 32-bit mask based on the status of certain bits in the input value.
/// Bit 19: flags. Bits 24-31
/// Bit 18: status. Bits 16-23
/// Bit 17: extension. Bits 8-15
/// Bit 16: control. Bits 0-7
pub const fn fsxc_mask(from: u32) -> u32 {
    let mut mask = 0;
    if (from >> 19) & 1 == 1 {
        mask |= 0xFF00_0000;
    }
    if (from >> 18) & 1 == 1 {
        mask |= 0x00FF_0000;
    }
    if (from >> 17) & 1 == 1 {
        mask |= 0x0000_FF00;
    }
    if (from >> 16) & 1 == 1 {
        mask |= 0x0000_00FF;
    }
    mask
}

/// Decode an ARM instruction of a known family.
pub fn decode_arm(family: ArmFamily, i: u32) -> ARMv4Instruction {
    use ArmFamily::*;
    let cond = ARMCondition::from_bits(i >> 28);
    let instr = match family {
        DataProcImmShift => decode_alu(i, ALUOperand::Normal(decode_shift_imm(i))),
        DataProcRegShift => decode_alu(i, ALUOperand::RegShift {
            shift: ShiftType::from_bits(i >> 5),
            shift_reg: reg_field(i, 8),
            reg: reg_field(i, 0),
        }),
        DataProcImm => decode_alu(i, ALUOperand::Normal(decode_rotated_imm(i))),
        Mrs => ARMv4InstructionType::MRS {
            spsr: test_bit(i, 22),
            rd: reg_field(i, 12),
        },
        MsrReg => ARMv4InstructionType::MSR {
            spsr: test_bit(i, 22),
            mask: fsxc_mask(i),
            data: OpData::Register(reg_field(i, 0)),
        },
        MsrImm => ARMv4InstructionType::MSR {
            spsr: test_bit(i, 22),
            mask: fsxc_mask(i),
            data: OpData::Immediate((i & 0xFF).rotate_right(((i >> 8) & 0xF) * 2)),
        },
        BranchExchange => ARMv4InstructionType::BX { reg: reg_field(i, 0) },
        Multiply => decode_multiply(i),
        MultiplyLong => decode_multiply_long(i),
        Swap => decode_swap(i),
        HalfwordTransfer => decode_halfword_transfer(i),
        SingleTransferImm => decode_single_transfer(i, ShiftOperand::Immediate(i & 0xFFF)),
        SingleTransferReg => decode_single_transfer(i, decode_shift_imm(i)),
        BlockTransfer => decode_block_transfer(i),
        Branch => {
            let offset = sign_extend(i & 0xFF_FFFF, 24) << 2;
            if test_bit(i, 24) {
                ARMv4InstructionType::BL { offset }
            } else {
                ARMv4InstructionType::B { offset }
            }
        },
        SoftwareInterrupt => ARMv4InstructionType::SWI { comment: i & 0xFF_FFFF },
        Undefined => ARMv4InstructionType::UND,
    };
    ARMv4Instruction::new(cond, instr)
}

/// Register shifted by 5-bit immediate, as used by data processing and
/// register-offset transfers.
fn decode_shift_imm(i: u32) -> ShiftOperand {
    ShiftOperand::Register {
        reg: reg_field(i, 0),
        shift: ShiftType::from_bits(i >> 5),
        amount: (i >> 7) & 0x1F,
    }
}

fn decode_rotated_imm(i: u32) -> ShiftOperand {
    ShiftOperand::Rotated {
        imm: i & 0xFF,
        rotate: ((i >> 8) & 0xF) * 2,
    }
}

/// Decode a data processing instruction.
fn decode_alu(i: u32, op2: ALUOperand) -> ARMv4InstructionType {
    use ARMv4InstructionType::*;
    let set_flags = test_bit(i, 20);
    let rn = reg_field(i, 16);
    let rd = reg_field(i, 12);
    match (i >> 21) & 0xF {
        0x0 => AND{rd, rn, op2, set_flags},
        0x1 => EOR{rd, rn, op2, set_flags},
        0x2 => SUB{rd, rn, op2, set_flags},
        0x3 => RSB{rd, rn, op2, set_flags},
        0x4 => ADD{rd, rn, op2, set_flags},
        0x5 => ADC{rd, rn, op2, set_flags},
        0x6 => SBC{rd, rn, op2, set_flags},
        0x7 => RSC{rd, rn, op2, set_flags},
        0x8 => TST{rn, op2},
        0x9 => TEQ{rn, op2},
        0xA => CMP{rn, op2},
        0xB => CMN{rn, op2},
        0xC => ORR{rd, rn, op2, set_flags},
        0xD => MOV{rd, op2, set_flags},
        0xE => BIC{rd, rn, op2, set_flags},
        _ => MVN{rd, op2, set_flags},
    }
}

/// MUL and MLA. Bit 22 set is reserved.
fn decode_multiply(i: u32) -> ARMv4InstructionType {
    if test_bit(i, 22) {
        return ARMv4InstructionType::UNSUPPORTED { instr: i };
    }
    let set_flags = test_bit(i, 20);
    let rd = reg_field(i, 16);
    let rn = reg_field(i, 12);
    let rs = reg_field(i, 8);
    let rm = reg_field(i, 0);
    if test_bit(i, 21) {
        ARMv4InstructionType::MLA { set_flags, rd, rn, rs, rm }
    } else {
        ARMv4InstructionType::MUL { set_flags, rd, rs, rm }
    }
}

fn decode_multiply_long(i: u32) -> ARMv4InstructionType {
    use ARMv4InstructionType::*;
    let set_flags = test_bit(i, 20);
    let rd_hi = reg_field(i, 16);
    let rd_lo = reg_field(i, 12);
    let rs = reg_field(i, 8);
    let rm = reg_field(i, 0);
    match (test_bit(i, 22), test_bit(i, 21)) {
        (false, false) => UMULL { set_flags, rd_hi, rd_lo, rs, rm },
        (false, true) => UMLAL { set_flags, rd_hi, rd_lo, rs, rm },
        (true, false) => SMULL { set_flags, rd_hi, rd_lo, rs, rm },
        (true, true) => SMLAL { set_flags, rd_hi, rd_lo, rs, rm },
    }
}

fn decode_swap(i: u32) -> ARMv4InstructionType {
    let rn = reg_field(i, 16);
    let rd = reg_field(i, 12);
    let rm = reg_field(i, 0);
    if test_bit(i, 22) {
        ARMv4InstructionType::SWPB { rn, rd, rm }
    } else {
        ARMv4InstructionType::SWP { rn, rd, rm }
    }
}

fn decode_transfer_params(i: u32) -> TransferParams {
    let pre_index = test_bit(i, 24);
    TransferParams {
        base_reg: reg_field(i, 16),
        inc: test_bit(i, 23),
        pre_index,
        // Post-indexed transfers always write back.
        writeback: test_bit(i, 21) || !pre_index,
    }
}

/// LDRH, STRH, LDRSB, LDRSH.
fn decode_halfword_transfer(i: u32) -> ARMv4InstructionType {
    use ARMv4InstructionType::*;
    let transfer_params = decode_transfer_params(i);
    let data_reg = reg_field(i, 12);
    let offset = if test_bit(i, 22) {
        OpData::Immediate(((i >> 4) & 0xF0) | (i & 0xF))
    } else {
        OpData::Register(reg_field(i, 0))
    };
    match (test_bit(i, 20), (i >> 5) & 0b11) {
        (false, 0b01) => STRH { transfer_params, data_reg, offset },
        (true, 0b01) => LDRH { transfer_params, data_reg, offset },
        (true, 0b10) => LDRSB { transfer_params, data_reg, offset },
        (true, 0b11) => LDRSH { transfer_params, data_reg, offset },
        // Doubleword transfers do not exist on this core.
        _ => UNSUPPORTED { instr: i },
    }
}

/// LDR, STR, LDRB, STRB.
fn decode_single_transfer(i: u32, offset: ShiftOperand) -> ARMv4InstructionType {
    use ARMv4InstructionType::*;
    let transfer_params = decode_transfer_params(i);
    let data_reg = reg_field(i, 12);
    match (test_bit(i, 22), test_bit(i, 20)) {
        (false, false) => STR { transfer_params, data_reg, offset },
        (false, true) => LDR { transfer_params, data_reg, offset },
        (true, false) => STRB { transfer_params, data_reg, offset },
        (true, true) => LDRB { transfer_params, data_reg, offset },
    }
}

fn decode_block_transfer(i: u32) -> ARMv4InstructionType {
    let transfer_params = TransferParams {
        base_reg: reg_field(i, 16),
        inc: test_bit(i, 23),
        pre_index: test_bit(i, 24),
        writeback: test_bit(i, 21),
    };
    let reg_list = i & 0xFFFF;
    let psr = test_bit(i, 22);
    if test_bit(i, 20) {
        ARMv4InstructionType::LDM { transfer_params, reg_list, psr }
    } else {
        ARMv4InstructionType::STM { transfer_params, reg_list, psr }
    }
}
