
use super::instructions::*;
use crate::{
    common::*,
    core::{ARMCore, CPSR, Mode, apply_shift, constants::*},
    error::{CoreError, CoreResult},
    memory::*
};

/// Execution of ARMv4 instructions.
///
/// Every handler assumes its condition already passed. R15 reads as the
/// address of the instruction plus two instruction widths.
pub trait ARMv4<M: Mem32>: ARMCore<M> {

    /// SWI
    /// Software interrupt
    fn swi(&mut self, comment: u32) -> CoreResult {
        let return_addr = self.read_reg(PC_REG).wrapping_sub(self.read_cpsr().instr_size());
        log::debug!("swi {:X}, return to {:08X}", comment, return_addr);
        self.enter_exception(Mode::SVC, SWI_VECTOR, return_addr);
        Ok(())
    }

    /// Called when an undefined instruction is encountered.
    /// Traps to the undefined vector.
    fn undefined(&mut self) -> CoreResult {
        let return_addr = self.read_reg(PC_REG).wrapping_sub(self.read_cpsr().instr_size());
        log::debug!("undefined instruction, return to {:08X}", return_addr);
        self.enter_exception(Mode::UND, UNDEFINED_VECTOR, return_addr);
        Ok(())
    }

    /// Called for encodings that have no behaviour on this core.
    fn unsupported(&mut self, instr: u32) -> CoreResult {
        let cpsr = self.read_cpsr();
        let address = self.read_reg(PC_REG).wrapping_sub(cpsr.instr_size() * 2);
        Err(CoreError::Unsupported {
            address,
            instruction: instr,
            thumb: cpsr.is_thumb(),
        })
    }

    // Logic

    /// Write back a logical result.
    /// Also sets the n, z and shifter carry flags optionally.
    fn writeback_logical(&mut self, s: bool, rd: usize, result: u32, carry: bool) {
        self.write_reg(rd, result);
        if s {
            if rd == PC_REG {
                self.return_from_exception();
            } else {
                let mut cpsr = self.read_cpsr();
                cpsr.set_nz(result);
                cpsr.set(CPSR::C, carry);
                self.write_flags(cpsr);
            }
        }
    }

    /// Write back an arithmetic result.
    /// Also sets all flags optionally.
    fn writeback_arithmetic(&mut self, s: bool, rd: usize, result: u32, carry: bool, overflow: bool) {
        self.write_reg(rd, result);
        if s {
            if rd == PC_REG {
                self.return_from_exception();
            } else {
                let mut cpsr = self.read_cpsr();
                cpsr.set_nz(result);
                cpsr.set(CPSR::C, carry);
                cpsr.set(CPSR::V, overflow);
                self.write_flags(cpsr);
            }
        }
    }

    /// AND
    /// Bitwise AND
    fn and(&mut self, s: bool, rd: usize, rn: usize, op2: ALUOperand) -> CoreResult {
        let (op2_val, carry) = self.eval_alu_op(op2);
        let op1 = self.alu_op1(rn, op2);
        self.writeback_logical(s, rd, op1 & op2_val, carry);
        Ok(())
    }

    /// EOR
    /// Bitwise exclusive OR (xor)
    fn eor(&mut self, s: bool, rd: usize, rn: usize, op2: ALUOperand) -> CoreResult {
        let (op2_val, carry) = self.eval_alu_op(op2);
        let op1 = self.alu_op1(rn, op2);
        self.writeback_logical(s, rd, op1 ^ op2_val, carry);
        Ok(())
    }

    /// ORR
    /// Bitwise inclusive OR
    fn orr(&mut self, s: bool, rd: usize, rn: usize, op2: ALUOperand) -> CoreResult {
        let (op2_val, carry) = self.eval_alu_op(op2);
        let op1 = self.alu_op1(rn, op2);
        self.writeback_logical(s, rd, op1 | op2_val, carry);
        Ok(())
    }

    /// BIC
    /// NOT op2 with AND
    fn bic(&mut self, s: bool, rd: usize, rn: usize, op2: ALUOperand) -> CoreResult {
        let (op2_val, carry) = self.eval_alu_op(op2);
        let op1 = self.alu_op1(rn, op2);
        self.writeback_logical(s, rd, op1 & !op2_val, carry);
        Ok(())
    }

    /// MOV
    /// Move op2 into rd.
    fn mov(&mut self, s: bool, rd: usize, op2: ALUOperand) -> CoreResult {
        let (data, carry) = self.eval_alu_op(op2);
        self.writeback_logical(s, rd, data, carry);
        Ok(())
    }

    /// MVN
    /// Move NOT op2 into rd.
    fn mvn(&mut self, s: bool, rd: usize, op2: ALUOperand) -> CoreResult {
        let (data, carry) = self.eval_alu_op(op2);
        self.writeback_logical(s, rd, !data, carry);
        Ok(())
    }

    // Comparisons

    /// TST
    /// Bitwise AND and set flags.
    fn tst(&mut self, rn: usize, op2: ALUOperand) -> CoreResult {
        let (op2_val, carry) = self.eval_alu_op(op2);
        let result = self.alu_op1(rn, op2) & op2_val;
        let mut cpsr = self.read_cpsr();
        cpsr.set_nz(result);
        cpsr.set(CPSR::C, carry);
        self.write_flags(cpsr);
        Ok(())
    }

    /// TEQ
    /// Bitwise XOR and set flags.
    fn teq(&mut self, rn: usize, op2: ALUOperand) -> CoreResult {
        let (op2_val, carry) = self.eval_alu_op(op2);
        let result = self.alu_op1(rn, op2) ^ op2_val;
        let mut cpsr = self.read_cpsr();
        cpsr.set_nz(result);
        cpsr.set(CPSR::C, carry);
        self.write_flags(cpsr);
        Ok(())
    }

    /// CMP
    /// Arithmetic sub and set flags.
    fn cmp(&mut self, rn: usize, op2: ALUOperand) -> CoreResult {
        let (op2_val, _) = self.eval_alu_op(op2);
        let op1 = self.alu_op1(rn, op2);
        let result = op1.wrapping_sub(op2_val);
        let mut cpsr = self.read_cpsr();
        cpsr.set_nz(result);
        cpsr.set(CPSR::C, !borrowed_sub(op1, op2_val, result));
        cpsr.set(CPSR::V, overflowed_sub(op1, op2_val, result));
        self.write_flags(cpsr);
        Ok(())
    }

    /// CMN
    /// Arithmetic add and set flags.
    fn cmn(&mut self, rn: usize, op2: ALUOperand) -> CoreResult {
        let (op2_val, _) = self.eval_alu_op(op2);
        let op1 = self.alu_op1(rn, op2);
        let result = op1.wrapping_add(op2_val);
        let mut cpsr = self.read_cpsr();
        cpsr.set_nz(result);
        cpsr.set(CPSR::C, carried_add(op1, op2_val, result));
        cpsr.set(CPSR::V, overflowed_add(op1, op2_val, result));
        self.write_flags(cpsr);
        Ok(())
    }

    // Arithmetic

    /// ADD
    /// Arithmetic add without carry.
    fn add(&mut self, s: bool, rd: usize, rn: usize, op2: ALUOperand) -> CoreResult {
        let (op2_val, _) = self.eval_alu_op(op2);
        let op1 = self.alu_op1(rn, op2);
        let result = op1.wrapping_add(op2_val);
        self.writeback_arithmetic(s, rd, result, carried_add(op1, op2_val, result), overflowed_add(op1, op2_val, result));
        Ok(())
    }

    /// ADD Rd,PC,#
    /// Arithmetic add constant to word-aligned PC. (thumb)
    fn taddpc(&mut self, rd: usize, op2: u32) -> CoreResult {
        let op1 = self.read_reg(PC_REG) & 0xFFFF_FFFC;
        self.write_reg(rd, op1.wrapping_add(op2));
        Ok(())
    }

    /// SUB
    /// Arithmetic subtract without carry.
    fn sub(&mut self, s: bool, rd: usize, rn: usize, op2: ALUOperand) -> CoreResult {
        let (op2_val, _) = self.eval_alu_op(op2);
        let op1 = self.alu_op1(rn, op2);
        let result = op1.wrapping_sub(op2_val);
        self.writeback_arithmetic(s, rd, result, !borrowed_sub(op1, op2_val, result), overflowed_sub(op1, op2_val, result));
        Ok(())
    }

    /// RSB
    /// Reverse subtract without carry.
    fn rsb(&mut self, s: bool, rd: usize, rn: usize, op2: ALUOperand) -> CoreResult {
        let (op2_val, _) = self.eval_alu_op(op2);
        let op1 = self.alu_op1(rn, op2);
        let result = op2_val.wrapping_sub(op1);
        self.writeback_arithmetic(s, rd, result, !borrowed_sub(op2_val, op1, result), overflowed_sub(op2_val, op1, result));
        Ok(())
    }

    /// ADC
    /// Arithmetic add with carry.
    fn adc(&mut self, s: bool, rd: usize, rn: usize, op2: ALUOperand) -> CoreResult {
        let (op2_val, _) = self.eval_alu_op(op2);
        let op1 = self.alu_op1(rn, op2);
        let result = op1.wrapping_add(op2_val).wrapping_add(self.read_cpsr().carry());
        self.writeback_arithmetic(s, rd, result, carried_add(op1, op2_val, result), overflowed_add(op1, op2_val, result));
        Ok(())
    }

    /// SBC
    /// Arithmetic subtract with borrow.
    fn sbc(&mut self, s: bool, rd: usize, rn: usize, op2: ALUOperand) -> CoreResult {
        let (op2_val, _) = self.eval_alu_op(op2);
        let op1 = self.alu_op1(rn, op2);
        let borrow = 1 - self.read_cpsr().carry();
        let result = op1.wrapping_sub(op2_val).wrapping_sub(borrow);
        self.writeback_arithmetic(s, rd, result, !borrowed_sub(op1, op2_val, result), overflowed_sub(op1, op2_val, result));
        Ok(())
    }

    /// RSC
    /// Reverse subtract with borrow.
    fn rsc(&mut self, s: bool, rd: usize, rn: usize, op2: ALUOperand) -> CoreResult {
        let (op2_val, _) = self.eval_alu_op(op2);
        let op1 = self.alu_op1(rn, op2);
        let borrow = 1 - self.read_cpsr().carry();
        let result = op2_val.wrapping_sub(op1).wrapping_sub(borrow);
        self.writeback_arithmetic(s, rd, result, !borrowed_sub(op2_val, op1, result), overflowed_sub(op2_val, op1, result));
        Ok(())
    }

    // Multiplication
    // The carry flag is left as it is.

    /// Set N and Z for a 32-bit multiply.
    fn set_mul_flags(&mut self, result: u32) {
        let mut cpsr = self.read_cpsr();
        cpsr.set_nz(result);
        self.write_flags(cpsr);
    }

    /// Set N and Z for a 64-bit multiply.
    fn set_mul_long_flags(&mut self, result: u64) {
        let mut cpsr = self.read_cpsr();
        cpsr.set(CPSR::N, (result >> 63) != 0);
        cpsr.set(CPSR::Z, result == 0);
        self.write_flags(cpsr);
    }

    /// MUL
    /// Multiply
    fn mul(&mut self, s: bool, rd: usize, rs: usize, rm: usize) -> CoreResult {
        let result = self.read_reg(rm).wrapping_mul(self.read_reg(rs));
        self.write_reg(rd, result);
        if s {
            self.set_mul_flags(result);
        }
        Ok(())
    }

    /// MLA
    /// Multiply and accumulate
    fn mla(&mut self, s: bool, rd: usize, rn: usize, rs: usize, rm: usize) -> CoreResult {
        let mul_result = self.read_reg(rm).wrapping_mul(self.read_reg(rs));
        let result = mul_result.wrapping_add(self.read_reg(rn));
        self.write_reg(rd, result);
        if s {
            self.set_mul_flags(result);
        }
        Ok(())
    }

    /// Write a 64-bit result and optionally set flags from it.
    fn writeback_long(&mut self, s: bool, rd_hi: usize, rd_lo: usize, result: u64) {
        self.write_reg(rd_lo, lo_64(result));
        self.write_reg(rd_hi, hi_64(result));
        if s {
            self.set_mul_long_flags(result);
        }
    }

    /// UMULL
    /// Unsigned long multiply
    fn umull(&mut self, s: bool, rd_hi: usize, rd_lo: usize, rs: usize, rm: usize) -> CoreResult {
        let op1 = self.read_reg(rm) as u64;
        let op2 = self.read_reg(rs) as u64;
        self.writeback_long(s, rd_hi, rd_lo, op1.wrapping_mul(op2));
        Ok(())
    }

    /// UMLAL
    /// Unsigned long multiply and accumulate
    fn umlal(&mut self, s: bool, rd_hi: usize, rd_lo: usize, rs: usize, rm: usize) -> CoreResult {
        let op1 = self.read_reg(rm) as u64;
        let op2 = self.read_reg(rs) as u64;
        let acc = make_64(self.read_reg(rd_hi), self.read_reg(rd_lo));
        self.writeback_long(s, rd_hi, rd_lo, op1.wrapping_mul(op2).wrapping_add(acc));
        Ok(())
    }

    /// SMULL
    /// Signed long multiply
    fn smull(&mut self, s: bool, rd_hi: usize, rd_lo: usize, rs: usize, rm: usize) -> CoreResult {
        let op1 = (self.read_reg(rm) as i32) as i64;
        let op2 = (self.read_reg(rs) as i32) as i64;
        self.writeback_long(s, rd_hi, rd_lo, op1.wrapping_mul(op2) as u64);
        Ok(())
    }

    /// SMLAL
    /// Signed long multiply and accumulate
    fn smlal(&mut self, s: bool, rd_hi: usize, rd_lo: usize, rs: usize, rm: usize) -> CoreResult {
        let op1 = (self.read_reg(rm) as i32) as i64;
        let op2 = (self.read_reg(rs) as i32) as i64;
        let acc = make_64(self.read_reg(rd_hi), self.read_reg(rd_lo));
        self.writeback_long(s, rd_hi, rd_lo, (op1.wrapping_mul(op2) as u64).wrapping_add(acc));
        Ok(())
    }

    // Branch

    /// B
    /// Branch
    fn b(&mut self, offset: u32) -> CoreResult {
        let dest = self.read_reg(PC_REG).wrapping_add(offset);
        self.write_reg(PC_REG, dest);
        Ok(())
    }

    /// BL
    /// Branch and link (using r14)
    fn bl(&mut self, offset: u32) -> CoreResult {
        let pc = self.read_reg(PC_REG);
        self.write_reg(LINK_REG, pc.wrapping_sub(I_SIZE));
        self.write_reg(PC_REG, pc.wrapping_add(offset));
        Ok(())
    }

    /// BX
    /// Branch and exchange - bit 0 of the target selects Thumb.
    fn bx(&mut self, reg: usize) -> CoreResult {
        let reg_val = self.read_reg(reg);
        let mut cpsr = self.read_cpsr();
        cpsr.set(CPSR::T, test_bit(reg_val, 0));
        self.write_cpsr(cpsr);
        self.write_reg(PC_REG, reg_val & 0xFFFF_FFFE);
        Ok(())
    }

    /// Thumb B
    /// Branch
    fn tb(&mut self, offset: u32) -> CoreResult {
        let dest = self.read_reg(PC_REG).wrapping_add(offset);
        self.write_reg(PC_REG, dest);
        Ok(())
    }

    /// Thumb BL (first halfword)
    /// Stage the upper part of the target in LR.
    fn tbl_lo(&mut self, offset: u32) -> CoreResult {
        let target_addr = self.read_reg(PC_REG).wrapping_add(offset);
        self.write_reg(LINK_REG, target_addr);
        Ok(())
    }

    /// Thumb BL (second halfword)
    /// Branch to LR plus the low offset, link to the next instruction.
    fn tbl_hi(&mut self, offset: u32) -> CoreResult {
        let return_addr = self.read_reg(PC_REG).wrapping_sub(T_SIZE);
        let dest = self.read_reg(LINK_REG).wrapping_add(offset);
        self.write_reg(LINK_REG, return_addr | 1);
        self.write_reg(PC_REG, dest);
        Ok(())
    }

    // Status transfer

    /// MRS
    /// Move program status register into general purpose register
    fn mrs(&mut self, spsr: bool, rd: usize) -> CoreResult {
        let data = if spsr {
            self.read_spsr().bits()
        } else {
            self.read_cpsr().bits()
        };
        self.write_reg(rd, data);
        Ok(())
    }

    /// MSR
    /// Move general purpose register into program status register
    ///
    /// User mode may only write the flags. The T bit of the CPSR cannot be changed.
    fn msr(&mut self, spsr: bool, mask: u32, op: OpData) -> CoreResult {
        let data = self.eval_op_data(op);
        if spsr {
            let old_spsr = self.read_spsr().bits() & !mask;
            self.write_spsr(CPSR::from_bits_truncate((data & mask) | old_spsr));
        } else {
            let old_cpsr = self.read_cpsr();
            let mut mask = mask & !CPSR::T.bits();
            if !old_cpsr.mode().is_privileged() {
                mask &= 0xFF00_0000;
            }
            let new_cpsr = (data & mask) | (old_cpsr.bits() & !mask);
            self.write_cpsr(CPSR::from_bits_truncate(new_cpsr));
        }
        Ok(())
    }

    // Data transfer

    /// SWP
    /// Single data swap (word).
    fn swp(&mut self, rn: usize, rd: usize, rm: usize) -> CoreResult {
        let addr = self.read_reg(rn);
        let reg_data = self.read_reg(rm);
        let mem_data = self.load_word_rotated(addr)?;
        self.ref_mem().store_word(addr & 0xFFFF_FFFC, reg_data)?;
        self.write_reg(rd, mem_data);
        Ok(())
    }

    /// SWPB
    /// Single data swap (byte).
    fn swpb(&mut self, rn: usize, rd: usize, rm: usize) -> CoreResult {
        let addr = self.read_reg(rn);
        let reg_data = self.read_reg(rm);
        let mem_data = self.ref_mem().load_byte(addr)?;
        self.ref_mem().store_byte(addr, reg_data as u8)?;
        self.write_reg(rd, mem_data as u32);
        Ok(())
    }

    /// LDR
    /// Load a single word from memory and store it in a register.
    /// Misaligned loads are rotated.
    fn ldr(&mut self, transfer_params: TransferParams, dest_reg: usize, offset: ShiftOperand) -> CoreResult {
        let (offset, _) = self.eval_shift_op(offset);
        let (transfer_addr, offset_addr) = self.transfer_addresses(&transfer_params, offset);
        let data = self.load_word_rotated(transfer_addr)?;
        self.load_writeback(transfer_params, offset_addr, dest_reg, data);
        Ok(())
    }

    /// Thumb LDR PC-relative
    fn tldrpc(&mut self, dest_reg: usize, offset: u32) -> CoreResult {
        let base_addr = self.read_reg(PC_REG) & 0xFFFF_FFFC;
        let data = self.ref_mem().load_word(base_addr.wrapping_add(offset))?;
        self.write_reg(dest_reg, data);
        Ok(())
    }

    /// LDRB
    /// Load a single byte from memory and store it in a register.
    fn ldrb(&mut self, transfer_params: TransferParams, dest_reg: usize, offset: ShiftOperand) -> CoreResult {
        let (offset, _) = self.eval_shift_op(offset);
        let (transfer_addr, offset_addr) = self.transfer_addresses(&transfer_params, offset);
        let data = self.ref_mem().load_byte(transfer_addr)?;
        self.load_writeback(transfer_params, offset_addr, dest_reg, data as u32);
        Ok(())
    }

    /// STR
    /// Store a single word into memory.
    fn str(&mut self, transfer_params: TransferParams, src_reg: usize, offset: ShiftOperand) -> CoreResult {
        let data = self.read_store_reg(src_reg);
        let (offset, _) = self.eval_shift_op(offset);
        let (transfer_addr, offset_addr) = self.transfer_addresses(&transfer_params, offset);
        self.ref_mem().store_word(transfer_addr & 0xFFFF_FFFC, data)?;
        if transfer_params.writeback {
            self.write_reg(transfer_params.base_reg, offset_addr);
        }
        Ok(())
    }

    /// STRB
    /// Store a single byte into memory.
    fn strb(&mut self, transfer_params: TransferParams, src_reg: usize, offset: ShiftOperand) -> CoreResult {
        let data = self.read_store_reg(src_reg);
        let (offset, _) = self.eval_shift_op(offset);
        let (transfer_addr, offset_addr) = self.transfer_addresses(&transfer_params, offset);
        self.ref_mem().store_byte(transfer_addr, data as u8)?;
        if transfer_params.writeback {
            self.write_reg(transfer_params.base_reg, offset_addr);
        }
        Ok(())
    }

    /// LDRH
    /// Load 2 bytes from memory.
    fn ldrh(&mut self, transfer_params: TransferParams, dest_reg: usize, offset: OpData) -> CoreResult {
        let offset = self.eval_op_data(offset);
        let (transfer_addr, offset_addr) = self.transfer_addresses(&transfer_params, offset);
        let data = self.ref_mem().load_halfword(transfer_addr & 0xFFFF_FFFE)?;
        self.load_writeback(transfer_params, offset_addr, dest_reg, rotate_misaligned_halfword(data, transfer_addr));
        Ok(())
    }

    /// STRH
    /// Store 2 bytes into memory.
    fn strh(&mut self, transfer_params: TransferParams, src_reg: usize, offset: OpData) -> CoreResult {
        let data = self.read_store_reg(src_reg);
        let offset = self.eval_op_data(offset);
        let (transfer_addr, offset_addr) = self.transfer_addresses(&transfer_params, offset);
        self.ref_mem().store_halfword(transfer_addr & 0xFFFF_FFFE, data as u16)?;
        if transfer_params.writeback {
            self.write_reg(transfer_params.base_reg, offset_addr);
        }
        Ok(())
    }

    /// LDRSB
    /// Load byte from memory, and sign-extend.
    fn ldrsb(&mut self, transfer_params: TransferParams, dest_reg: usize, offset: OpData) -> CoreResult {
        let offset = self.eval_op_data(offset);
        let (transfer_addr, offset_addr) = self.transfer_addresses(&transfer_params, offset);
        let data = self.ref_mem().load_byte(transfer_addr)?;
        self.load_writeback(transfer_params, offset_addr, dest_reg, sign_extend(data as u32, 8));
        Ok(())
    }

    /// LDRSH
    /// Load halfword from memory, and sign-extend.
    /// A misaligned load sign-extends the high byte.
    fn ldrsh(&mut self, transfer_params: TransferParams, dest_reg: usize, offset: OpData) -> CoreResult {
        let offset = self.eval_op_data(offset);
        let (transfer_addr, offset_addr) = self.transfer_addresses(&transfer_params, offset);
        let data = self.ref_mem().load_halfword(transfer_addr & 0xFFFF_FFFE)?;
        self.load_writeback(transfer_params, offset_addr, dest_reg, shift_misaligned_signed_halfword(data, transfer_addr));
        Ok(())
    }

    /// LDM
    /// Block load from memory into registers.
    /// Registers are always loaded low-high from the lowest address.
    ///
    /// If psr == true, then the processor will return from exception if PC is loaded,
    /// or it will transfer into user registers.
    fn ldm(&mut self, transfer_params: TransferParams, reg_list: u32, psr: bool) -> CoreResult {
        if reg_list == 0 {
            return Ok(());
        }
        let load_pc = test_bit(reg_list, PC_REG);
        let load_from_user = psr && !load_pc;
        let (mut transfer_addr, writeback_addr) = self.block_addresses(&transfer_params, reg_list);

        // A loaded base overrides the written back one.
        if transfer_params.writeback {
            self.write_reg(transfer_params.base_reg, writeback_addr);
        }

        for reg in (0..16).filter(|reg| test_bit(reg_list, *reg)) {
            let data = self.ref_mem().load_word(transfer_addr & 0xFFFF_FFFC)?;
            if load_from_user {
                self.write_usr_reg(reg, data);
            } else {
                self.write_reg(reg, data);
            }
            transfer_addr = transfer_addr.wrapping_add(4);
        }

        if psr && load_pc {
            self.return_from_exception();
        }
        Ok(())
    }

    /// STM
    /// Block store from registers into memory.
    /// Registers are always stored low-high from the lowest address.
    ///
    /// If psr == true, then the processor will transfer from user registers.
    fn stm(&mut self, transfer_params: TransferParams, reg_list: u32, psr: bool) -> CoreResult {
        if reg_list == 0 {
            return Ok(());
        }
        let (mut transfer_addr, writeback_addr) = self.block_addresses(&transfer_params, reg_list);
        let first_reg = reg_list.trailing_zeros() as usize;

        for reg in (0..16).filter(|reg| test_bit(reg_list, *reg)) {
            // The base is stored as written back unless it is stored first.
            let data = if transfer_params.writeback && reg == transfer_params.base_reg && reg != first_reg {
                writeback_addr
            } else if psr && reg != PC_REG {
                self.read_usr_reg(reg)
            } else {
                self.read_store_reg(reg)
            };
            self.ref_mem().store_word(transfer_addr & 0xFFFF_FFFC, data)?;
            transfer_addr = transfer_addr.wrapping_add(4);
        }

        if transfer_params.writeback {
            self.write_reg(transfer_params.base_reg, writeback_addr);
        }
        Ok(())
    }

    // Helpers

    /// First operand of the ALU.
    /// The PC reads one word further on when the shift amount comes from a register.
    fn alu_op1(&self, rn: usize, op2: ALUOperand) -> u32 {
        match op2 {
            ALUOperand::RegShift{..} if rn == PC_REG => self.read_reg(PC_REG).wrapping_add(4),
            _ => self.read_reg(rn),
        }
    }

    /// Evaluate the second operand of the ALU.
    ///
    /// Returns the value and the shifter carry out.
    fn eval_alu_op(&self, op: ALUOperand) -> (u32, bool) {
        match op {
            ALUOperand::Normal(op) => self.eval_shift_op(op),
            ALUOperand::RegShift{shift, shift_reg, reg} => {
                let val = if reg == PC_REG {
                    self.read_reg(PC_REG).wrapping_add(4)
                } else {
                    self.read_reg(reg)
                };
                let amount = self.read_reg(shift_reg) & 0xFF;
                apply_shift(shift, amount, true, val, self.read_cpsr().contains(CPSR::C))
            }
        }
    }

    /// Evaluate the operand.
    ///
    /// Returns the value and the shifter carry out.
    fn eval_shift_op(&self, op: ShiftOperand) -> (u32, bool) {
        let carry = self.read_cpsr().contains(CPSR::C);
        match op {
            ShiftOperand::Immediate(i) => (i, carry),
            ShiftOperand::Rotated{imm, rotate} => if rotate == 0 {
                (imm, carry)
            } else {
                let val = imm.rotate_right(rotate);
                (val, test_bit(val, 31))
            },
            ShiftOperand::Register{reg, shift, amount} => apply_shift(shift, amount, false, self.read_reg(reg), carry),
        }
    }

    /// Evaluate the operand.
    fn eval_op_data(&self, op: OpData) -> u32 {
        match op {
            OpData::Immediate(i) => i,
            OpData::Register(reg) => self.read_reg(reg),
        }
    }

    /// Value of a register being stored. The PC is stored 12 bytes on.
    fn read_store_reg(&self, reg: usize) -> u32 {
        if reg == PC_REG {
            self.read_reg(PC_REG).wrapping_add(4)
        } else {
            self.read_reg(reg)
        }
    }

    /// Returns the transfer address and the address to write back.
    fn transfer_addresses(&self, transfer_params: &TransferParams, offset: u32) -> (u32, u32) {
        let base_addr = self.read_reg(transfer_params.base_reg);
        let offset_addr = if transfer_params.inc {
            base_addr.wrapping_add(offset)  // Inc
        } else {
            base_addr.wrapping_sub(offset)  // Dec
        };
        let transfer_addr = if transfer_params.pre_index {
            offset_addr // Pre
        } else {
            base_addr   // Post
        };
        (transfer_addr, offset_addr)
    }

    /// Lowest address of a block transfer, and the address to write back.
    fn block_addresses(&self, transfer_params: &TransferParams, reg_list: u32) -> (u32, u32) {
        let base_addr = self.read_reg(transfer_params.base_reg);
        let size = reg_list.count_ones() * 4;
        let (low_addr, writeback_addr) = if transfer_params.inc {
            (base_addr, base_addr.wrapping_add(size))
        } else {
            let low_addr = base_addr.wrapping_sub(size);
            (low_addr, low_addr)
        };
        if transfer_params.pre_index == transfer_params.inc {
            (low_addr.wrapping_add(4), writeback_addr)
        } else {
            (low_addr, writeback_addr)
        }
    }

    /// Finish a single load. The base is written back before the
    /// destination so a load into the base wins.
    fn load_writeback(&mut self, transfer_params: TransferParams, offset_addr: u32, dest_reg: usize, data: u32) {
        if transfer_params.writeback {
            self.write_reg(transfer_params.base_reg, offset_addr);
        }
        self.write_reg(dest_reg, data);
    }

    /// Word load with the misaligned rotation applied.
    fn load_word_rotated(&mut self, addr: u32) -> CoreResult<u32> {
        let data = self.ref_mem().load_word(addr & 0xFFFF_FFFC)?;
        Ok(rotate_misaligned_word(data, addr))
    }
}
