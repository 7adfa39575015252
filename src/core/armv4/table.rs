/// ARM instruction family lookup.
///
/// Instructions are classified by bits 27-20 and 7-4, which between them
/// select every ARMv4 family. The table is built once from bit patterns
/// and never changes afterwards.

use thiserror::Error;

use super::{decode::decode_arm, instructions::ARMv4Instruction};
use crate::common::test_bit;

/// Number of entries: 8 high bits + 4 low bits.
pub const ARM_TABLE_SIZE: usize = 1 << 12;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArmFamily {
    DataProcImmShift,
    DataProcRegShift,
    DataProcImm,
    Mrs,
    MsrReg,
    MsrImm,
    BranchExchange,
    Multiply,
    MultiplyLong,
    Swap,
    HalfwordTransfer,
    SingleTransferImm,
    SingleTransferReg,
    BlockTransfer,
    Branch,
    SoftwareInterrupt,
    Undefined,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("pattern {pattern:?} for {family:?} overlaps {existing:?} at index 0x{index:03X}")]
    Overlap {
        pattern: &'static str,
        family: ArmFamily,
        existing: ArmFamily,
        index: usize,
    },
    #[error("malformed pattern {0:?}: expected 12 of '0', '1' or 'x'")]
    Malformed(&'static str),
}

/// Patterns are bits 27-20, then bits 7-4. Underscores are ignored.
pub const ARM_PATTERNS: &[(&str, ArmFamily)] = {
    use ArmFamily::*;
    &[
        ("0000xxxx_xxx0", DataProcImmShift),
        ("00010xx1_xxx0", DataProcImmShift),
        ("00011xxx_xxx0", DataProcImmShift),
        ("0000xxxx_0xx1", DataProcRegShift),
        ("00010xx1_0xx1", DataProcRegShift),
        ("00011xxx_0xx1", DataProcRegShift),
        ("0010xxxx_xxxx", DataProcImm),
        ("00110xx1_xxxx", DataProcImm),
        ("00111xxx_xxxx", DataProcImm),

        ("00010x00_0000", Mrs),
        ("00010x10_0000", MsrReg),
        ("00110x10_xxxx", MsrImm),
        ("00010010_0001", BranchExchange),

        ("000000xx_1001", Multiply),
        ("000001xx_1001", Multiply),     // Reserved: rejected when decoded.
        ("00001xxx_1001", MultiplyLong),
        ("00010x00_1001", Swap),
        ("000xxxxx_1011", HalfwordTransfer),
        ("000xxxxx_11x1", HalfwordTransfer),

        ("010xxxxx_xxxx", SingleTransferImm),
        ("011xxxxx_xxx0", SingleTransferReg),
        ("100xxxxx_xxxx", BlockTransfer),
        ("101xxxxx_xxxx", Branch),
        ("1111xxxx_xxxx", SoftwareInterrupt),
    ]
};

/// Table index for an instruction.
#[inline]
pub const fn arm_index(i: u32) -> usize {
    (((i >> 16) & 0xFF0) | ((i >> 4) & 0xF)) as usize
}

/// Parse a pattern into (mask, expected) over the 12 index bits.
fn parse_pattern(pattern: &'static str) -> Result<(usize, usize), TableError> {
    let mut mask = 0;
    let mut expected = 0;
    let mut count = 0;
    for c in pattern.chars().filter(|c| *c != '_') {
        mask <<= 1;
        expected <<= 1;
        match c {
            '0' => mask |= 1,
            '1' => {
                mask |= 1;
                expected |= 1;
            },
            'x' => {},
            _ => return Err(TableError::Malformed(pattern)),
        }
        count += 1;
    }
    if count != 12 {
        return Err(TableError::Malformed(pattern));
    }
    Ok((mask, expected))
}

/// Family lookup for ARM state.
pub struct ArmTable {
    entries: Vec<ArmFamily>,
}

impl ArmTable {
    /// Build the ARMv4 table.
    pub fn new() -> Result<Self, TableError> {
        Self::from_patterns(ARM_PATTERNS)
    }

    /// Build a table from patterns. Every index matched by more than one
    /// pattern is an error. Indices matched by none are undefined.
    pub fn from_patterns(patterns: &[(&'static str, ArmFamily)]) -> Result<Self, TableError> {
        let mut entries: Vec<Option<ArmFamily>> = vec![None; ARM_TABLE_SIZE];
        for (pattern, family) in patterns.iter().copied() {
            let (mask, expected) = parse_pattern(pattern)?;
            for (index, entry) in entries.iter_mut().enumerate() {
                if index & mask != expected {
                    continue;
                }
                if let Some(existing) = *entry {
                    return Err(TableError::Overlap { pattern, family, existing, index });
                }
                *entry = Some(family);
            }
        }
        let entries = entries.into_iter()
            .map(|e| e.unwrap_or(ArmFamily::Undefined))
            .collect::<Vec<_>>();
        log::debug!("arm table built: {} of {} entries assigned",
            entries.iter().filter(|e| **e != ArmFamily::Undefined).count(), ARM_TABLE_SIZE);
        Ok(Self { entries })
    }

    #[inline]
    pub fn family(&self, i: u32) -> ArmFamily {
        self.entries[arm_index(i)]
    }

    /// Classify and decode an instruction.
    pub fn decode(&self, i: u32) -> ARMv4Instruction {
        decode_arm(self.family(i), i)
    }

    /// Short name of the instruction, for tracing.
    pub fn mnemonic(&self, i: u32) -> &'static str {
        mnemonic(self.family(i), i)
    }
}

const DP_NAMES: [&str; 16] = [
    "AND", "EOR", "SUB", "RSB", "ADD", "ADC", "SBC", "RSC",
    "TST", "TEQ", "CMP", "CMN", "ORR", "MOV", "BIC", "MVN",
];

/// Name of an instruction in a family.
pub fn mnemonic(family: ArmFamily, i: u32) -> &'static str {
    use ArmFamily::*;
    let load = test_bit(i, 20);
    match family {
        DataProcImmShift | DataProcRegShift | DataProcImm => DP_NAMES[((i >> 21) & 0xF) as usize],
        Mrs => "MRS",
        MsrReg | MsrImm => "MSR",
        BranchExchange => "BX",
        Multiply => if test_bit(i, 21) {"MLA"} else {"MUL"},
        MultiplyLong => match (i >> 21) & 0b11 {
            0b00 => "UMULL",
            0b01 => "UMLAL",
            0b10 => "SMULL",
            _ => "SMLAL",
        },
        Swap => if test_bit(i, 22) {"SWPB"} else {"SWP"},
        HalfwordTransfer => match ((i >> 5) & 0b11, load) {
            (0b01, false) => "STRH",
            (0b01, true) => "LDRH",
            (0b10, true) => "LDRSB",
            (0b11, true) => "LDRSH",
            _ => "UND",
        },
        SingleTransferImm | SingleTransferReg => match (test_bit(i, 22), load) {
            (false, false) => "STR",
            (false, true) => "LDR",
            (true, false) => "STRB",
            (true, true) => "LDRB",
        },
        BlockTransfer => if load {"LDM"} else {"STM"},
        Branch => if test_bit(i, 24) {"BL"} else {"B"},
        SoftwareInterrupt => "SWI",
        Undefined => "UND",
    }
}
