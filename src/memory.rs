/// Memory interface for ARM processor.

use thiserror::Error;

/// Failure raised by a memory collaborator.
///
/// The core never recovers from these: they are passed straight back to the host.
#[derive(Debug, Error)]
#[error("memory access at 0x{addr:08X} failed")]
pub struct MemoryError {
    pub addr: u32,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl MemoryError {
    pub fn new<E>(addr: u32, source: E) -> Self
        where E: Into<Box<dyn std::error::Error + Send + Sync>>
    {
        Self {
            addr,
            source: source.into(),
        }
    }
}

pub type MemResult<T> = Result<T, MemoryError>;

/// A 32-bit memory interface.
/// Capable of loading and storing bytes (8-bit), halfwords (16-bit), and words (32-bit).
///
/// Halfword and word accesses are always made to aligned addresses.
/// The core applies the misaligned read rules itself.
pub trait Mem32 {
    fn load_byte(&mut self, addr: u32) -> MemResult<u8>;
    fn store_byte(&mut self, addr: u32, data: u8) -> MemResult<()>;

    fn load_halfword(&mut self, addr: u32) -> MemResult<u16>;
    fn store_halfword(&mut self, addr: u32, data: u16) -> MemResult<()>;

    fn load_word(&mut self, addr: u32) -> MemResult<u32>;
    fn store_word(&mut self, addr: u32, data: u32) -> MemResult<()>;
}

/// A word read from a misaligned address is rotated so the addressed byte
/// ends up in the low byte.
pub const fn rotate_misaligned_word(data: u32, addr: u32) -> u32 {
    data.rotate_right((addr & 3) * 8)
}

/// Unsigned halfword read from an odd address.
pub const fn rotate_misaligned_halfword(data: u16, addr: u32) -> u32 {
    (data as u32).rotate_right((addr & 1) * 8)
}

/// Signed halfword read from an odd address: the result is sign-extended
/// from the high byte.
pub const fn shift_misaligned_signed_halfword(data: u16, addr: u32) -> u32 {
    (((data as i16) as i32) >> ((addr & 1) * 8)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn misaligned_word() {
        assert_eq!(rotate_misaligned_word(0x1122_3344, 0x100), 0x1122_3344);
        assert_eq!(rotate_misaligned_word(0x1122_3344, 0x101), 0x4411_2233);
        assert_eq!(rotate_misaligned_word(0x1122_3344, 0x102), 0x3344_1122);
        assert_eq!(rotate_misaligned_word(0x1122_3344, 0x103), 0x2233_4411);
    }

    #[test]
    fn misaligned_halfword() {
        assert_eq!(rotate_misaligned_halfword(0x8899, 0x10), 0x8899);
        assert_eq!(rotate_misaligned_halfword(0x8899, 0x11), 0x9900_0088);
        assert_eq!(shift_misaligned_signed_halfword(0x8899, 0x10), 0xFFFF_8899);
        assert_eq!(shift_misaligned_signed_halfword(0x8899, 0x11), 0xFFFF_FF88);
        assert_eq!(shift_misaligned_signed_halfword(0x7F99, 0x11), 0x0000_007F);
    }

    #[test]
    fn error_display() {
        let err = MemoryError::new(0x0E00_0000, "save file unavailable");
        assert_eq!(err.to_string(), "memory access at 0x0E000000 failed");
    }
}
