/// Common bit and byte manip.

use num_traits::{PrimInt, Unsigned};

/// Set the nth bit.
pub const fn bit(n: usize) -> u32 {
    1 << n
}

/// Set all bits between the top and bottom (inclusive).
pub const fn bits(mut bottom: usize, top: usize) -> u32 {
    let mut out = 0;
    while bottom <= top {
        out |= bit(bottom);
        bottom += 1;
    }
    out
}

/// Check if the nth bit is set.
/// Works for any unsigned word (thumb halfwords and ARM words).
#[inline]
pub fn test_bit<T: PrimInt + Unsigned>(val: T, n: usize) -> bool {
    ((val >> n) & T::one()) == T::one()
}

/// Extract `width` bits starting at `shift`.
#[inline]
pub fn field<T: PrimInt + Unsigned>(val: T, shift: usize, width: usize) -> T {
    let mask = if width >= T::zero().count_zeros() as usize {
        !T::zero()
    } else {
        (T::one() << width) - T::one()
    };
    (val >> shift) & mask
}

/// Extract a register index (4 bits) starting at `shift`.
#[inline]
pub fn reg_field<T: PrimInt + Unsigned>(val: T, shift: usize) -> usize {
    field(val, shift, 4).to_usize().unwrap_or_default()
}

/// Extract a low register index (3 bits) starting at `shift`.
#[inline]
pub fn low_reg_field<T: PrimInt + Unsigned>(val: T, shift: usize) -> usize {
    field(val, shift, 3).to_usize().unwrap_or_default()
}

/// Sign-extend the low `width` bits of `val`.
pub const fn sign_extend(val: u32, width: u32) -> u32 {
    let shift = 32 - width;
    (((val << shift) as i32) >> shift) as u32
}

/// Make a 64-bit value from two 32-bit values (high to low).
pub const fn make_64(hi: u32, lo: u32) -> u64 {
    ((hi as u64) << 32) | (lo as u64)
}

/// Get the low word of a doubleword.
pub const fn lo_64(val: u64) -> u32 {
    val as u32
}

/// Get the high word of a doubleword.
pub const fn hi_64(val: u64) -> u32 {
    (val >> 32) as u32
}

// Arithmetic flags.
// Each takes the operands and the already computed result, so they stay
// correct when the caller folded a carry/borrow into the result.

/// Carry out of bit 31 for `result = a + b (+ c)`.
pub const fn carried_add(a: u32, b: u32, result: u32) -> bool {
    (((a & b) | ((a | b) & !result)) >> 31) != 0
}

/// Signed overflow for `result = a + b (+ c)`.
pub const fn overflowed_add(a: u32, b: u32, result: u32) -> bool {
    (((a ^ result) & (b ^ result)) >> 31) != 0
}

/// Borrow out of bit 31 for `result = a - b (- borrow)`.
/// The ARM carry flag after a subtraction is the inverse of this.
pub const fn borrowed_sub(a: u32, b: u32, result: u32) -> bool {
    (((!a & b) | ((!a | b) & result)) >> 31) != 0
}

/// Signed overflow for `result = a - b (- borrow)`.
pub const fn overflowed_sub(a: u32, b: u32, result: u32) -> bool {
    (((a ^ b) & (a ^ result)) >> 31) != 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::Rng;

    #[test]
    fn bit_masks() {
        assert_eq!(bit(31), 0x8000_0000);
        assert_eq!(bits(0, 4), 0x1F);
        assert_eq!(bits(28, 31), 0xF000_0000);
    }

    #[test]
    fn fields() {
        assert_eq!(field(0xE3A0_1001_u32, 12, 4), 1);
        assert_eq!(field(0xE3A0_1001_u32, 28, 4), 0xE);
        assert_eq!(field(0xFFFF_FFFF_u32, 0, 32), 0xFFFF_FFFF);
        assert_eq!(field(0x20FF_u16, 11, 2), 0);
        assert_eq!(reg_field(0xE591_2004_u32, 16), 1);
        assert_eq!(low_reg_field(0x2AFF_u16, 8), 2);
        assert!(test_bit(0x8000_u16, 15));
        assert!(!test_bit(0x8000_0000_u32, 30));
    }

    #[test]
    fn sign_extension() {
        assert_eq!(sign_extend(0x80_0000, 24), 0xFF80_0000);
        assert_eq!(sign_extend(0x7F_FFFF, 24), 0x007F_FFFF);
        assert_eq!(sign_extend(0x400, 11), 0xFFFF_FC00);
        assert_eq!(sign_extend(0xFF, 8), 0xFFFF_FFFF);
    }

    #[test]
    fn add_flags() {
        // (a, b, carry, overflow)
        let table = [
            (0xFFFF_FFFF_u32, 1_u32, true, false),
            (0x7FFF_FFFF, 1, false, true),
            (0x8000_0000, 0x8000_0000, true, true),
            (1, 2, false, false),
            (0, 0, false, false),
        ];
        for (a, b, c, v) in table {
            let r = a.wrapping_add(b);
            assert_eq!(carried_add(a, b, r), c, "carry {:X}+{:X}", a, b);
            assert_eq!(overflowed_add(a, b, r), v, "overflow {:X}+{:X}", a, b);
        }
    }

    #[test]
    fn sub_flags() {
        // (a, b, borrow, overflow)
        let table = [
            (0_u32, 1_u32, true, false),
            (1, 1, false, false),
            (0x8000_0000, 1, false, true),
            (0x7FFF_FFFF, 0xFFFF_FFFF, true, true),
            (5, 3, false, false),
        ];
        for (a, b, borrow, v) in table {
            let r = a.wrapping_sub(b);
            assert_eq!(borrowed_sub(a, b, r), borrow, "borrow {:X}-{:X}", a, b);
            assert_eq!(overflowed_sub(a, b, r), v, "overflow {:X}-{:X}", a, b);
        }
    }

    #[test]
    fn flags_match_wide_arithmetic_with_carry_in() {
        let mut rng = rand::thread_rng();
        for _ in 0..2000 {
            let a: u32 = rng.gen();
            let b: u32 = rng.gen();
            let c: u32 = rng.gen_range(0..=1);

            let r = a.wrapping_add(b).wrapping_add(c);
            let wide = a as u64 + b as u64 + c as u64;
            assert_eq!(carried_add(a, b, r), wide > u32::MAX as u64);
            let signed = a as i32 as i64 + b as i32 as i64 + c as i64;
            assert_eq!(overflowed_add(a, b, r), signed != (r as i32) as i64);

            let borrow = 1 - c;
            let r = a.wrapping_sub(b).wrapping_sub(borrow);
            assert_eq!(borrowed_sub(a, b, r), (a as u64) < (b as u64 + borrow as u64));
            let signed = a as i32 as i64 - b as i32 as i64 - borrow as i64;
            assert_eq!(overflowed_sub(a, b, r), signed != (r as i32) as i64);
        }
    }
}
