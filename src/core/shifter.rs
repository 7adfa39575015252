/// Barrel shifter.

use std::fmt;

use crate::common::test_bit;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShiftType {
    LSL,
    LSR,
    ASR,
    ROR,
}

impl ShiftType {
    /// Decode the two-bit shift type field.
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0b00 => ShiftType::LSL,
            0b01 => ShiftType::LSR,
            0b10 => ShiftType::ASR,
            _ => ShiftType::ROR,
        }
    }
}

impl fmt::Display for ShiftType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ShiftType::*;
        match self {
            LSL => write!(f, "LSL"),
            LSR => write!(f, "LSR"),
            ASR => write!(f, "ASR"),
            ROR => write!(f, "ROR"),
        }
    }
}

/// Shift `operand`, returning the result and the shifter carry out.
///
/// `amount` is the raw field: 5 bits for an immediate shift, the bottom byte
/// of Rs for a register shift. The two differ when the amount is zero:
/// an immediate 0 encodes LSR #32, ASR #32 or RRX, while a register 0 leaves
/// both operand and carry alone.
pub fn apply_shift(shift: ShiftType, amount: u32, from_register: bool, operand: u32, carry: bool) -> (u32, bool) {
    use ShiftType::*;
    if from_register && amount == 0 {
        return (operand, carry);
    }
    match shift {
        LSL => match amount {
            0 => (operand, carry),
            1..=31 => (operand << amount, test_bit(operand, (32 - amount) as usize)),
            32 => (0, test_bit(operand, 0)),
            _ => (0, false),
        },
        LSR => match amount {
            // Immediate LSR #0 is LSR #32.
            0 | 32 => (0, test_bit(operand, 31)),
            1..=31 => (operand >> amount, test_bit(operand, (amount - 1) as usize)),
            _ => (0, false),
        },
        ASR => match amount {
            1..=31 => (((operand as i32) >> amount) as u32, test_bit(operand, (amount - 1) as usize)),
            // Immediate ASR #0 is ASR #32. Anything larger saturates.
            _ => (((operand as i32) >> 31) as u32, test_bit(operand, 31)),
        },
        ROR => if amount == 0 {
            // RRX
            let carry_in = if carry {1 << 31} else {0};
            (carry_in | (operand >> 1), test_bit(operand, 0))
        } else {
            let n = amount & 0x1F;
            if n == 0 {
                (operand, test_bit(operand, 31))
            } else {
                (operand.rotate_right(n), test_bit(operand, (n - 1) as usize))
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use ShiftType::*;

    #[test]
    fn edge_cases() {
        // (shift, amount, from_register, operand, carry_in, result, carry_out)
        let table = [
            // LSL
            (LSL, 0, false, 0x8000_0001, true, 0x8000_0001, true),
            (LSL, 0, false, 0x8000_0001, false, 0x8000_0001, false),
            (LSL, 1, false, 0x8000_0001, false, 0x0000_0002, true),
            (LSL, 31, false, 0x0000_0003, false, 0x8000_0000, true),
            (LSL, 32, true, 0x0000_0001, false, 0, true),
            (LSL, 32, true, 0x0000_0002, true, 0, false),
            (LSL, 33, true, 0xFFFF_FFFF, true, 0, false),
            (LSL, 0, true, 0x1234_5678, true, 0x1234_5678, true),
            // LSR
            (LSR, 0, false, 0x8000_0000, true, 0, true),
            (LSR, 0, false, 0x7FFF_FFFF, true, 0, false),
            (LSR, 1, false, 0x8000_0001, false, 0x4000_0000, true),
            (LSR, 4, false, 0x0000_00F7, false, 0x0000_000F, false),
            (LSR, 32, true, 0x8000_0000, false, 0, true),
            (LSR, 40, true, 0xFFFF_FFFF, true, 0, false),
            (LSR, 0, true, 0x8000_0000, false, 0x8000_0000, false),
            // ASR
            (ASR, 0, false, 0x8000_0000, false, 0xFFFF_FFFF, true),
            (ASR, 0, false, 0x7FFF_FFFF, true, 0, false),
            (ASR, 4, false, 0x8000_0008, false, 0xF800_0000, true),
            (ASR, 32, true, 0x8000_0000, false, 0xFFFF_FFFF, true),
            (ASR, 200, true, 0x4000_0000, true, 0, false),
            (ASR, 0, true, 0x8000_0000, true, 0x8000_0000, true),
            // ROR
            (ROR, 0, false, 0x0000_0001, false, 0x0000_0000, true),
            (ROR, 0, false, 0x0000_0002, true, 0x8000_0001, false),
            (ROR, 4, false, 0x0000_001F, false, 0xF000_0001, true),
            (ROR, 8, true, 0x0000_0080, false, 0x8000_0000, true),
            (ROR, 32, true, 0x8000_0000, false, 0x8000_0000, true),
            (ROR, 64, true, 0x7FFF_FFFF, true, 0x7FFF_FFFF, false),
            (ROR, 36, true, 0x0000_0018, false, 0x8000_0001, true),
            (ROR, 0, true, 0x0000_0001, false, 0x0000_0001, false),
        ];
        for (shift, amount, reg, op, c_in, result, c_out) in table {
            assert_eq!(
                apply_shift(shift, amount, reg, op, c_in),
                (result, c_out),
                "{} {} (reg: {}) of {:08X}", shift, amount, reg, op
            );
        }
    }

    #[test]
    fn decode() {
        assert_eq!(ShiftType::from_bits(0), LSL);
        assert_eq!(ShiftType::from_bits(1), LSR);
        assert_eq!(ShiftType::from_bits(2), ASR);
        assert_eq!(ShiftType::from_bits(3), ROR);
        assert_eq!(ShiftType::from_bits(0xE0 >> 5), ROR);
    }
}
