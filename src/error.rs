//! Engine-level error type: architectural traps.
//!
//! `Trap` carries `thiserror` impls rather than being a bare `Debug`-only
//! enum, and is trimmed to the U-mode-with-minimal-M-mode subset this
//! engine models (no interrupts, no S-mode delegation). Host IO faults
//! have no typed-error counterpart here because [`crate::io::IoFacade`]
//! is an infallible contract; engine invariant violations (a decoder
//! producing a null handler, a block with no terminator) are bugs, not
//! recoverable conditions, and reach `unreachable!`/`panic!` directly
//! rather than a typed `Result` path with no caller to ever construct it.

use thiserror::Error;

/// An architectural exception or interrupt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Trap {
    #[error("instruction address misaligned: {0:#x}")]
    InstructionAddressMisaligned(u32),
    #[error("instruction access fault: {0:#x}")]
    InstructionAccessFault(u32),
    #[error("illegal instruction: {0:#010x}")]
    IllegalInstruction(u32),
    #[error("breakpoint at {0:#x}")]
    Breakpoint(u32),
    #[error("load address misaligned: {0:#x}")]
    LoadAddressMisaligned(u32),
    #[error("load access fault: {0:#x}")]
    LoadAccessFault(u32),
    #[error("store address misaligned: {0:#x}")]
    StoreAddressMisaligned(u32),
    #[error("store access fault: {0:#x}")]
    StoreAccessFault(u32),
    #[error("environment call from U-mode")]
    EnvironmentCallFromU,
    #[error("environment call from M-mode")]
    EnvironmentCallFromM,
}

impl Trap {
    /// mcause encoding for this trap (bit 31 is reserved for interrupts,
    /// which this engine does not generate).
    pub fn code(&self) -> u32 {
        match self {
            Trap::InstructionAddressMisaligned(_) => 0,
            Trap::InstructionAccessFault(_) => 1,
            Trap::IllegalInstruction(_) => 2,
            Trap::Breakpoint(_) => 3,
            Trap::LoadAddressMisaligned(_) => 4,
            Trap::LoadAccessFault(_) => 5,
            Trap::StoreAddressMisaligned(_) => 6,
            Trap::StoreAccessFault(_) => 7,
            Trap::EnvironmentCallFromU => 8,
            Trap::EnvironmentCallFromM => 11,
        }
    }

    /// mtval encoding: bad address or offending instruction word.
    pub fn value(&self) -> u32 {
        match self {
            Trap::InstructionAddressMisaligned(v)
            | Trap::InstructionAccessFault(v)
            | Trap::IllegalInstruction(v)
            | Trap::Breakpoint(v)
            | Trap::LoadAddressMisaligned(v)
            | Trap::LoadAccessFault(v)
            | Trap::StoreAddressMisaligned(v)
            | Trap::StoreAccessFault(v) => *v,
            _ => 0,
        }
    }
}
