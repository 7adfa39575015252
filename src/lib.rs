mod common;
pub mod core;
mod memory;
mod error;
mod config;
mod trace;
mod debugger;
mod arm7;

pub use crate::core::{
    ARMCore, ARMv4, Thumbv4,
    CPSR, SPSR, Mode, RegisterFile,
    ARMCondition, ShiftType,
    ArmFamily, ArmTable, TableError,
    ThumbFormat, ThumbTable,
    constants,
};

pub use crate::core::armv4::instructions::{
    ARMv4Instruction, ARMv4InstructionType, ALUOperand, ShiftOperand, OpData, TransferParams
};

pub use crate::memory::{
    Mem32, MemoryError, MemResult
};

pub use crate::error::{
    CoreError, CoreResult
};

pub use crate::config::CoreConfig;

pub use crate::trace::{
    Tracer, TraceEvent, NoTrace, LogTracer, RingTracer
};

pub use crate::arm7::{
    ARM7TDMI, Signals, RunState, HaltTask
};

pub use crate::debugger::*;
