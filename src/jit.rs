//! JIT emitter recipe: a backend-agnostic micro-op vocabulary.
//!
//! This module defines the data contract a tier-1 native code generator
//! would consume to compile a hot block, and the per-opcode recipes as
//! static data — it does not generate machine code. `EmitOp` generalizes
//! the inline `dynasm!` register-register instruction shapes a
//! dynasm-based x86-64 backend would emit into a named,
//! backend-independent enum. A concrete backend walking these recipes
//! is out of scope; the `jit-dynasm` feature gates a minimal compiler
//! for the ALU-only subset, kept close to those instruction shapes.

use crate::ops::OpCode;

/// A scratch location a recipe reads from or writes to. Backend-specific
/// register allocation maps these onto real registers at emission time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scratch(pub u8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AluOp {
    Add,
    Sub,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Sar,
    Slt,
    Sltu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemOp {
    Load,
    Store,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    Byte,
    Half,
    Word,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
    Eq,
    Ne,
    Lt,
    Ge,
    Ltu,
    Geu,
}

/// A single micro-op in an opcode's emitter recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitOp {
    /// Load RISC-V register `reg` into scratch `dst`.
    Ld { reg: u8, dst: Scratch },
    /// Store scratch `src` back into RISC-V register `reg`.
    St { src: Scratch, reg: u8 },
    /// `dst <- dst op src` (32-bit).
    Alu32 { op: AluOp, dst: Scratch, src: Scratch },
    /// Materialize an immediate into a scratch location.
    Imm32 { dst: Scratch, value: i32 },
    /// A sized load/store through the IO facade.
    Mem { op: MemOp, width: Width, base: Scratch, offset: i32 },
    /// Conditional branch to a recipe-local label.
    Jcc { cond: Cond, target: u16 },
    /// Define label `label` at this point in the recipe.
    SetJmpOff { label: u16 },
    /// Unconditional jump to label `label`.
    JmpOff { label: u16 },
    /// Begin a conditionally-emitted region (e.g. SRLI vs SRAI sharing a
    /// recipe shape that differs only in the ALU op emitted).
    Cond { op: AluOp },
    /// End a conditionally-emitted region opened by `Cond`.
    End,
    /// Escape to a non-inlinable host routine (ECALL, CSR access,
    /// F-extension ops — anything with no native recipe).
    Call { target: &'static str },
    /// Terminate the compiled region, returning control with `pc`.
    Exit { pc: Option<u32> },
}

/// The emitter recipe for one opcode, or `None` when the opcode always
/// compiles to a `Call` escape into the interpreter handler.
pub fn recipe(op: OpCode) -> Option<&'static [EmitOp]> {
    use AluOp::*;
    const A: Scratch = Scratch(0);
    const B: Scratch = Scratch(1);

    match op {
        OpCode::Add => Some(&[
            EmitOp::Ld { reg: 0, dst: A },
            EmitOp::Ld { reg: 0, dst: B },
            EmitOp::Alu32 { op: Add, dst: A, src: B },
            EmitOp::St { src: A, reg: 0 },
        ]),
        OpCode::Sub => Some(&[
            EmitOp::Ld { reg: 0, dst: A },
            EmitOp::Ld { reg: 0, dst: B },
            EmitOp::Alu32 { op: Sub, dst: A, src: B },
            EmitOp::St { src: A, reg: 0 },
        ]),
        OpCode::And => Some(&[
            EmitOp::Ld { reg: 0, dst: A },
            EmitOp::Ld { reg: 0, dst: B },
            EmitOp::Alu32 { op: And, dst: A, src: B },
            EmitOp::St { src: A, reg: 0 },
        ]),
        OpCode::Or => Some(&[
            EmitOp::Ld { reg: 0, dst: A },
            EmitOp::Ld { reg: 0, dst: B },
            EmitOp::Alu32 { op: Or, dst: A, src: B },
            EmitOp::St { src: A, reg: 0 },
        ]),
        OpCode::Xor => Some(&[
            EmitOp::Ld { reg: 0, dst: A },
            EmitOp::Ld { reg: 0, dst: B },
            EmitOp::Alu32 { op: Xor, dst: A, src: B },
            EmitOp::St { src: A, reg: 0 },
        ]),
        // Every other opcode — loads/stores, branches, M/A/F-extension,
        // CSR/system instructions — has no native recipe in this engine
        // and always escapes to the interpreter.
        _ => None,
    }
}

#[cfg(feature = "jit-dynasm")]
pub mod dynasm_backend {
    //! Minimal x86-64 compiler for the ALU-only [`recipe`] subset,
    //! mirroring the structure of the retrieved `dynasm`-based backend:
    //! one dynasm assembler per compiled region, `Alu32` recipes folded
    //! directly into register-register instructions, everything else
    //! left uncompiled (a `Call` escape).

    use dynasmrt::{dynasm, DynasmApi, ExecutableBuffer};

    use super::{AluOp, EmitOp};

    pub struct NativeBlock {
        pub code: ExecutableBuffer,
    }

    /// Compile a recipe of `Alu32`-only micro-ops into a native region
    /// that mutates a `[u32; 32]` register file passed in `rdi`.
    /// Returns `None` if the recipe contains anything this minimal
    /// backend doesn't lower (loads/stores, branches, escapes).
    pub fn compile(ops: &[EmitOp]) -> Option<NativeBlock> {
        let mut asm = dynasmrt::x64::Assembler::new().ok()?;
        let start = asm.offset();

        for op in ops {
            match op {
                EmitOp::Ld { reg, dst } => {
                    let reg = *reg as i32;
                    let dst = *dst as i32 as u8;
                    dynasm!(asm
                        ; .arch x64
                        ; mov Rd(dst), [rdi + reg * 4]
                    );
                }
                EmitOp::St { src, reg } => {
                    let reg = *reg as i32;
                    let src = *src as i32 as u8;
                    dynasm!(asm
                        ; .arch x64
                        ; mov [rdi + reg * 4], Rd(src)
                    );
                }
                EmitOp::Alu32 { op, dst, src } => {
                    let dst = *dst as i32 as u8;
                    let src = *src as i32 as u8;
                    match op {
                        AluOp::Add => dynasm!(asm; .arch x64; add Rd(dst), Rd(src)),
                        AluOp::Sub => dynasm!(asm; .arch x64; sub Rd(dst), Rd(src)),
                        AluOp::And => dynasm!(asm; .arch x64; and Rd(dst), Rd(src)),
                        AluOp::Or => dynasm!(asm; .arch x64; or Rd(dst), Rd(src)),
                        AluOp::Xor => dynasm!(asm; .arch x64; xor Rd(dst), Rd(src)),
                        _ => return None,
                    }
                }
                _ => return None,
            }
        }

        dynasm!(asm; .arch x64; ret);
        let code = asm.finalize().ok()?;
        let _ = start;
        Some(NativeBlock { code })
    }
}
