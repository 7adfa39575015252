/// Condition codes.

use std::fmt;

use super::CPSR;

/// Instruction condition field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ARMCondition {
    EQ, // Z set
    NE, // Z clear
    CS, // C set
    CC, // C clear
    MI, // N set
    PL, // N clear
    VS, // V set
    VC, // V clear
    HI, // C set and Z clear
    LS, // C clear or Z set
    GE, // N equals V
    LT, // N not equal to V
    GT, // Z clear and N equals V
    LE, // Z set or N not equal to V
    AL, // Always
    NV, // Never
}

impl ARMCondition {
    /// Decode the condition from the top 4 bits of an instruction,
    /// or from the condition field of a thumb branch.
    pub const fn from_bits(cond_bits: u32) -> Self {
        use ARMCondition::*;
        match cond_bits & 0xF {
            0x0 => EQ,
            0x1 => NE,
            0x2 => CS,
            0x3 => CC,
            0x4 => MI,
            0x5 => PL,
            0x6 => VS,
            0x7 => VC,
            0x8 => HI,
            0x9 => LS,
            0xA => GE,
            0xB => LT,
            0xC => GT,
            0xD => LE,
            0xE => AL,
            _ => NV,
        }
    }

    /// Check the condition against the flags.
    pub fn eval(self, cpsr: CPSR) -> bool {
        use ARMCondition::*;
        let n = cpsr.contains(CPSR::N);
        let z = cpsr.contains(CPSR::Z);
        let c = cpsr.contains(CPSR::C);
        let v = cpsr.contains(CPSR::V);
        match self {
            EQ => z,
            NE => !z,
            CS => c,
            CC => !c,
            MI => n,
            PL => !n,
            VS => v,
            VC => !v,
            HI => c && !z,
            LS => !c || z,
            GE => n == v,
            LT => n != v,
            GT => !z && (n == v),
            LE => z || (n != v),
            AL => true,
            NV => false,
        }
    }
}

/// Decide whether an instruction with condition field `cond` runs.
pub fn evaluate(cond: u32, flags: CPSR) -> bool {
    ARMCondition::from_bits(cond).eval(flags)
}

impl fmt::Display for ARMCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use ARMCondition::*;
        match self {
            EQ => write!(f, "EQ"),
            NE => write!(f, "NE"),
            CS => write!(f, "CS"),
            CC => write!(f, "CC"),
            MI => write!(f, "MI"),
            PL => write!(f, "PL"),
            VS => write!(f, "VS"),
            VC => write!(f, "VC"),
            HI => write!(f, "HI"),
            LS => write!(f, "LS"),
            GE => write!(f, "GE"),
            LT => write!(f, "LT"),
            GT => write!(f, "GT"),
            LE => write!(f, "LE"),
            AL => write!(f, ""),
            NV => write!(f, "NV"),
        }
    }
}
