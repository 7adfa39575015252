/// ARMv4 Thumb Instruction Set
///
/// Thumb instructions are translated into the equivalent ARM instruction
/// and run through the same handlers.

mod decode;

use super::armv4::{ARMv4, ARMv4Instruction};
use crate::{
    common::test_bit,
    error::CoreResult,
    memory::Mem32
};

pub use decode::decode_thumb;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ThumbFormat {
    ShiftedMove,
    AddSub,
    ImmOps,
    AluOps,
    HiRegOps,
    PcLoad,
    RegOffset,
    SignExtended,
    ImmOffset,
    Halfword,
    SpRelative,
    LoadAddress,
    SpAdjust,
    PushPop,
    MultipleTransfer,
    CondBranch,
    SoftwareInterrupt,
    Branch,
    LongBranchPrefix,
    LongBranchSuffix,
    Undefined,
}

/// Parse a 16-character pattern into (mask, expected).
/// '0' and '1' are fixed bits, anything else is don't care.
const fn parse_pattern(pattern: &[u8; 16]) -> (u16, u16) {
    let mut mask = 0;
    let mut expected = 0;
    let mut n = 0;
    while n < 16 {
        let bit = 1 << (15 - n);
        match pattern[n] {
            b'0' => mask |= bit,
            b'1' => {
                mask |= bit;
                expected |= bit;
            },
            _ => {},
        }
        n += 1;
    }
    (mask, expected)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ThumbRule {
    pub mask:       u16,
    pub expected:   u16,
    pub format:     ThumbFormat,
}

impl ThumbRule {
    #[inline]
    pub const fn matches(&self, i: u16) -> bool {
        (i & self.mask) == self.expected
    }
}

macro_rules! rule {
    ($pattern:expr, $format:ident) => {{
        const P: (u16, u16) = parse_pattern($pattern);
        ThumbRule {
            mask: P.0,
            expected: P.1,
            format: ThumbFormat::$format,
        }
    }};
}

/// Thumb formats in priority order. Earlier rules shadow later, looser ones.
pub const THUMB_RULES: &[ThumbRule] = &[
    rule!(b"11110xxxxxxxxxxx", LongBranchPrefix),
    rule!(b"11111xxxxxxxxxxx", LongBranchSuffix),
    rule!(b"11100xxxxxxxxxxx", Branch),
    rule!(b"11011111xxxxxxxx", SoftwareInterrupt),
    rule!(b"1101xxxxxxxxxxxx", CondBranch),
    rule!(b"1100xxxxxxxxxxxx", MultipleTransfer),
    rule!(b"10110000xxxxxxxx", SpAdjust),
    rule!(b"1011x10xxxxxxxxx", PushPop),
    rule!(b"1010xxxxxxxxxxxx", LoadAddress),
    rule!(b"1001xxxxxxxxxxxx", SpRelative),
    rule!(b"1000xxxxxxxxxxxx", Halfword),
    rule!(b"011xxxxxxxxxxxxx", ImmOffset),
    rule!(b"0101xx1xxxxxxxxx", SignExtended),
    rule!(b"0101xx0xxxxxxxxx", RegOffset),
    rule!(b"01001xxxxxxxxxxx", PcLoad),
    rule!(b"010001xxxxxxxxxx", HiRegOps),
    rule!(b"010000xxxxxxxxxx", AluOps),
    rule!(b"001xxxxxxxxxxxxx", ImmOps),
    rule!(b"00011xxxxxxxxxxx", AddSub),
    rule!(b"000xxxxxxxxxxxxx", ShiftedMove),
];

/// First-match lookup over an ordered rule list.
#[derive(Clone, Copy, Debug)]
pub struct ThumbTable {
    rules: &'static [ThumbRule],
}

impl Default for ThumbTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ThumbTable {
    pub const fn new() -> Self {
        Self::from_rules(THUMB_RULES)
    }

    /// Lookup over a custom rule list. Instructions no rule matches are undefined.
    pub const fn from_rules(rules: &'static [ThumbRule]) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &'static [ThumbRule] {
        self.rules
    }

    /// Find the format of an instruction.
    pub fn format(&self, i: u16) -> ThumbFormat {
        self.rules.iter()
            .find(|rule| rule.matches(i))
            .map_or(ThumbFormat::Undefined, |rule| rule.format)
    }

    /// Classify and decode an instruction.
    pub fn decode(&self, i: u16) -> ARMv4Instruction {
        decode_thumb(self.format(i), i)
    }

    /// Short name of the instruction, for tracing.
    pub fn mnemonic(&self, i: u16) -> &'static str {
        mnemonic(self.format(i), i)
    }
}

const ALU_NAMES: [&str; 16] = [
    "AND", "EOR", "LSL", "LSR", "ASR", "ADC", "SBC", "ROR",
    "TST", "NEG", "CMP", "CMN", "ORR", "MUL", "BIC", "MVN",
];

/// Name of an instruction in a format.
pub fn mnemonic(format: ThumbFormat, i: u16) -> &'static str {
    use ThumbFormat::*;
    match format {
        ShiftedMove => match (i >> 11) & 0b11 {
            0b00 => "LSL",
            0b01 => "LSR",
            _ => "ASR",
        },
        AddSub => if test_bit(i, 9) {"SUB"} else {"ADD"},
        ImmOps => match (i >> 11) & 0b11 {
            0b00 => "MOV",
            0b01 => "CMP",
            0b10 => "ADD",
            _ => "SUB",
        },
        AluOps => ALU_NAMES[((i >> 6) & 0xF) as usize],
        HiRegOps => match (i >> 8) & 0b11 {
            0b00 => "ADD",
            0b01 => "CMP",
            0b10 => "MOV",
            _ => "BX",
        },
        PcLoad => "LDR",
        RegOffset => match (i >> 10) & 0b11 {
            0b00 => "STR",
            0b01 => "STRB",
            0b10 => "LDR",
            _ => "LDRB",
        },
        SignExtended => match (i >> 10) & 0b11 {
            0b00 => "STRH",
            0b01 => "LDSB",
            0b10 => "LDRH",
            _ => "LDSH",
        },
        ImmOffset => match (i >> 11) & 0b11 {
            0b00 => "STR",
            0b01 => "LDR",
            0b10 => "STRB",
            _ => "LDRB",
        },
        Halfword => if test_bit(i, 11) {"LDRH"} else {"STRH"},
        SpRelative => if test_bit(i, 11) {"LDR"} else {"STR"},
        LoadAddress | SpAdjust => "ADD",
        PushPop => if test_bit(i, 11) {"POP"} else {"PUSH"},
        MultipleTransfer => if test_bit(i, 11) {"LDMIA"} else {"STMIA"},
        CondBranch => if (i >> 8) & 0xF == 0xE {"UND"} else {"B"},
        SoftwareInterrupt => "SWI",
        Branch => "B",
        LongBranchPrefix | LongBranchSuffix => "BL",
        Undefined => "UND",
    }
}

/// Execution of Thumb instructions.
pub trait Thumbv4<M: Mem32>: ARMv4<M> {
    /// Decode the instruction with `table` and execute it.
    fn execute_thumb(&mut self, table: &ThumbTable, i: u16) -> CoreResult {
        table.decode(i).execute(self)
    }
}
