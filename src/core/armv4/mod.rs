/// ARMv4 Instruction Set

mod table;
mod decode;
pub mod instructions;
pub mod execute;

pub use table::{ArmFamily, ArmTable, TableError, ARM_PATTERNS, ARM_TABLE_SIZE, arm_index, mnemonic};
pub use decode::{decode_arm, fsxc_mask};
pub use instructions::ARMv4Instruction;
pub use execute::ARMv4;
