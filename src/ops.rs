//! Instruction semantics: the Operation Table's handler half.
//!
//! `execute` is one dispatch match mutating hart state and advancing
//! `pc` in place, returning `Err(Trap)` on an architectural exception,
//! covering the full RV32IMAFC surface this engine models. The
//! emitter-recipe half of the table lives in [`crate::jit`].

use crate::csr;
use crate::decode::Operation;
use crate::error::Trap;
use crate::fpu::{self, RoundingMode};
use crate::hart::Hart;
use crate::io::IoFacade;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    Lui,
    Auipc,
    Jal,
    Jalr,
    Beq,
    Bne,
    Blt,
    Bge,
    Bltu,
    Bgeu,
    Lb,
    Lh,
    Lw,
    Lbu,
    Lhu,
    Sb,
    Sh,
    Sw,
    Addi,
    Slti,
    Sltiu,
    Xori,
    Ori,
    Andi,
    Slli,
    Srli,
    Srai,
    Add,
    Sub,
    Sll,
    Slt,
    Sltu,
    Xor,
    Srl,
    Sra,
    Or,
    And,
    Mul,
    Mulh,
    Mulhsu,
    Mulhu,
    Div,
    Divu,
    Rem,
    Remu,
    Fence,
    FenceI,
    Ecall,
    Ebreak,
    Mret,
    Wfi,
    Csrrw,
    Csrrs,
    Csrrc,
    Csrrwi,
    Csrrsi,
    Csrrci,
    LrW,
    ScW,
    AmoswapW,
    AmoaddW,
    AmoxorW,
    AmoandW,
    AmoorW,
    AmominW,
    AmomaxW,
    AmominuW,
    AmomaxuW,
    Flw,
    Fsw,
    FaddS,
    FsubS,
    FmulS,
    FdivS,
    FsqrtS,
    FsgnjS,
    FsgnjnS,
    FsgnjxS,
    FminS,
    FmaxS,
    FcvtWS,
    FcvtWuS,
    FcvtSW,
    FcvtSWu,
    FmvXW,
    FmvWX,
    FeqS,
    FltS,
    FleS,
    FclassS,
    FmaddS,
    FmsubS,
    FnmsubS,
    FnmaddS,
    Illegal,
}

/// Execute one decoded operation against `hart`, through `io`.
///
/// On success, `hart.pc` has already been advanced to the next
/// instruction (or to a branch/jump target). On a trap, `hart.pc` is left
/// pointing at the offending instruction so the caller can commit mepc
/// before vectoring (see [`crate::dispatch`]).
pub fn execute(
    hart: &mut Hart,
    io: &mut dyn IoFacade,
    op: &Operation,
    ext_c: bool,
) -> Result<(), Trap> {
    let pc = hart.pc;
    let len = op.insn_len as u32;

    match op.op {
        OpCode::Lui => {
            hart.write_reg(op.rd, op.imm as u32);
            hart.pc = pc.wrapping_add(len);
        }
        OpCode::Auipc => {
            hart.write_reg(op.rd, pc.wrapping_add(op.imm as u32));
            hart.pc = pc.wrapping_add(len);
        }
        OpCode::Jal => {
            let target = pc.wrapping_add(op.imm as u32);
            check_branch_alignment(target, ext_c)?;
            if op.rd != 0 {
                hart.write_reg(op.rd, pc.wrapping_add(len));
            }
            hart.pc = target;
        }
        OpCode::Jalr => {
            let target = hart.read_reg(op.rs1).wrapping_add(op.imm as u32) & !1;
            check_branch_alignment(target, ext_c)?;
            hart.write_reg(op.rd, pc.wrapping_add(len));
            hart.pc = target;
        }
        OpCode::Beq | OpCode::Bne | OpCode::Blt | OpCode::Bge | OpCode::Bltu | OpCode::Bgeu => {
            let rs1 = hart.read_reg(op.rs1);
            let rs2 = hart.read_reg(op.rs2);
            let taken = match op.op {
                OpCode::Beq => rs1 == rs2,
                OpCode::Bne => rs1 != rs2,
                OpCode::Blt => (rs1 as i32) < (rs2 as i32),
                OpCode::Bge => (rs1 as i32) >= (rs2 as i32),
                OpCode::Bltu => rs1 < rs2,
                OpCode::Bgeu => rs1 >= rs2,
                _ => unreachable!(),
            };
            if taken {
                let target = pc.wrapping_add(op.imm as u32);
                check_branch_alignment(target, ext_c)?;
                hart.pc = target;
            } else {
                hart.pc = pc.wrapping_add(len);
            }
        }
        OpCode::Lb | OpCode::Lh | OpCode::Lw | OpCode::Lbu | OpCode::Lhu => {
            let addr = hart.read_reg(op.rs1).wrapping_add(op.imm as u32);
            let value = match op.op {
                OpCode::Lb => io.read8(addr) as i8 as i32 as u32,
                OpCode::Lh => {
                    if addr & 1 != 0 {
                        return Err(Trap::LoadAddressMisaligned(addr));
                    }
                    io.read16(addr) as i16 as i32 as u32
                }
                OpCode::Lw => {
                    if addr & 3 != 0 {
                        return Err(Trap::LoadAddressMisaligned(addr));
                    }
                    io.read32(addr)
                }
                OpCode::Lbu => io.read8(addr) as u32,
                OpCode::Lhu => {
                    if addr & 1 != 0 {
                        return Err(Trap::LoadAddressMisaligned(addr));
                    }
                    io.read16(addr) as u32
                }
                _ => unreachable!(),
            };
            hart.write_reg(op.rd, value);
            hart.pc = pc.wrapping_add(len);
        }
        OpCode::Sb | OpCode::Sh | OpCode::Sw => {
            let addr = hart.read_reg(op.rs1).wrapping_add(op.imm as u32);
            let value = hart.read_reg(op.rs2);
            match op.op {
                OpCode::Sb => io.write8(addr, value as u8),
                OpCode::Sh => {
                    if addr & 1 != 0 {
                        return Err(Trap::StoreAddressMisaligned(addr));
                    }
                    io.write16(addr, value as u16);
                }
                OpCode::Sw => {
                    if addr & 3 != 0 {
                        return Err(Trap::StoreAddressMisaligned(addr));
                    }
                    io.write32(addr, value);
                }
                _ => unreachable!(),
            }
            hart.pc = pc.wrapping_add(len);
        }
        OpCode::Addi
        | OpCode::Slti
        | OpCode::Sltiu
        | OpCode::Xori
        | OpCode::Ori
        | OpCode::Andi
        | OpCode::Slli
        | OpCode::Srli
        | OpCode::Srai => {
            let rs1 = hart.read_reg(op.rs1);
            let imm = op.imm as u32;
            let shamt = (op.shamt & 0x1F) as u32;
            let result = match op.op {
                OpCode::Addi => rs1.wrapping_add(imm),
                OpCode::Slti => ((rs1 as i32) < (imm as i32)) as u32,
                OpCode::Sltiu => (rs1 < imm) as u32,
                OpCode::Xori => rs1 ^ imm,
                OpCode::Ori => rs1 | imm,
                OpCode::Andi => rs1 & imm,
                OpCode::Slli => rs1 << shamt,
                OpCode::Srli => rs1 >> shamt,
                OpCode::Srai => ((rs1 as i32) >> shamt) as u32,
                _ => unreachable!(),
            };
            hart.write_reg(op.rd, result);
            hart.pc = pc.wrapping_add(len);
        }
        OpCode::Add
        | OpCode::Sub
        | OpCode::Sll
        | OpCode::Slt
        | OpCode::Sltu
        | OpCode::Xor
        | OpCode::Srl
        | OpCode::Sra
        | OpCode::Or
        | OpCode::And => {
            let rs1 = hart.read_reg(op.rs1);
            let rs2 = hart.read_reg(op.rs2);
            let result = match op.op {
                OpCode::Add => rs1.wrapping_add(rs2),
                OpCode::Sub => rs1.wrapping_sub(rs2),
                OpCode::Sll => rs1 << (rs2 & 0x1F),
                OpCode::Slt => ((rs1 as i32) < (rs2 as i32)) as u32,
                OpCode::Sltu => (rs1 < rs2) as u32,
                OpCode::Xor => rs1 ^ rs2,
                OpCode::Srl => rs1 >> (rs2 & 0x1F),
                OpCode::Sra => ((rs1 as i32) >> (rs2 & 0x1F)) as u32,
                OpCode::Or => rs1 | rs2,
                OpCode::And => rs1 & rs2,
                _ => unreachable!(),
            };
            hart.write_reg(op.rd, result);
            hart.pc = pc.wrapping_add(len);
        }
        OpCode::Mul | OpCode::Mulh | OpCode::Mulhsu | OpCode::Mulhu | OpCode::Div
        | OpCode::Divu | OpCode::Rem | OpCode::Remu => {
            let rs1 = hart.read_reg(op.rs1);
            let rs2 = hart.read_reg(op.rs2);
            hart.write_reg(op.rd, execute_m_extension(op.op, rs1, rs2));
            hart.pc = pc.wrapping_add(len);
        }
        OpCode::Fence => {
            hart.pc = pc.wrapping_add(len);
        }
        OpCode::FenceI => {
            // Flushing cached decoded blocks is the dispatcher's job
            // (see crate::dispatch); the instruction itself is a barrier
            // with no register-level effect.
            hart.pc = pc.wrapping_add(len);
        }
        OpCode::Ecall => {
            io.on_ecall(regs_snapshot(hart));
            return Err(Trap::EnvironmentCallFromU);
        }
        OpCode::Ebreak => {
            io.on_ebreak(regs_snapshot(hart));
            return Err(Trap::Breakpoint(pc));
        }
        OpCode::Mret => {
            let mstatus = hart.csr.mstatus;
            let mpie = (mstatus & csr::MSTATUS_MPIE) != 0;
            let mut status = mstatus;
            if mpie {
                status |= csr::MSTATUS_MIE;
            } else {
                status &= !csr::MSTATUS_MIE;
            }
            status |= csr::MSTATUS_MPIE;
            status &= !csr::MSTATUS_MPP;
            hart.csr.mstatus = status;
            hart.pc = hart.csr.mepc;
        }
        OpCode::Wfi => {
            hart.pc = pc.wrapping_add(len);
        }
        OpCode::Csrrw | OpCode::Csrrs | OpCode::Csrrc | OpCode::Csrrwi | OpCode::Csrrsi
        | OpCode::Csrrci => {
            execute_csr(hart, op)?;
            hart.pc = pc.wrapping_add(len);
        }
        OpCode::LrW | OpCode::ScW | OpCode::AmoswapW | OpCode::AmoaddW | OpCode::AmoxorW
        | OpCode::AmoandW | OpCode::AmoorW | OpCode::AmominW | OpCode::AmomaxW
        | OpCode::AmominuW | OpCode::AmomaxuW => {
            execute_amo(hart, io, op)?;
            hart.pc = pc.wrapping_add(len);
        }
        OpCode::Flw => {
            let addr = hart.read_reg(op.rs1).wrapping_add(op.imm as u32);
            if addr & 3 != 0 {
                return Err(Trap::LoadAddressMisaligned(addr));
            }
            let value = io.read32(addr);
            hart.fpu.write_f32(op.rd as u32, value);
            hart.pc = pc.wrapping_add(len);
        }
        OpCode::Fsw => {
            let addr = hart.read_reg(op.rs1).wrapping_add(op.imm as u32);
            if addr & 3 != 0 {
                return Err(Trap::StoreAddressMisaligned(addr));
            }
            io.write32(addr, hart.fpu.read_f32(op.rs2 as u32));
            hart.pc = pc.wrapping_add(len);
        }
        OpCode::FaddS | OpCode::FsubS | OpCode::FmulS | OpCode::FdivS | OpCode::FsqrtS => {
            let a = hart.fpu.read_f32(op.rs1 as u32);
            let b = hart.fpu.read_f32(op.rs2 as u32);
            let rm = hart.fpu.effective_rm(op.rm as u32);
            let (result, flags) = match op.op {
                OpCode::FaddS => fpu::f32_add(a, b, rm),
                OpCode::FsubS => fpu::f32_sub(a, b, rm),
                OpCode::FmulS => fpu::f32_mul(a, b, rm),
                OpCode::FdivS => fpu::f32_div(a, b, rm),
                OpCode::FsqrtS => fpu::f32_sqrt(a, rm),
                _ => unreachable!(),
            };
            hart.fpu.fflags.merge(flags);
            hart.fpu.write_f32(op.rd as u32, result);
            hart.csr.mstatus |= csr::MSTATUS_FS;
            hart.pc = pc.wrapping_add(len);
        }
        OpCode::FsgnjS | OpCode::FsgnjnS | OpCode::FsgnjxS => {
            let a = hart.fpu.read_f32(op.rs1 as u32);
            let b = hart.fpu.read_f32(op.rs2 as u32);
            let result = match op.op {
                OpCode::FsgnjS => fpu::f32_sgnj(a, b),
                OpCode::FsgnjnS => fpu::f32_sgnjn(a, b),
                OpCode::FsgnjxS => fpu::f32_sgnjx(a, b),
                _ => unreachable!(),
            };
            hart.fpu.write_f32(op.rd as u32, result);
            hart.pc = pc.wrapping_add(len);
        }
        OpCode::FminS | OpCode::FmaxS => {
            let a = hart.fpu.read_f32(op.rs1 as u32);
            let b = hart.fpu.read_f32(op.rs2 as u32);
            let (result, flags) = if op.op == OpCode::FminS {
                fpu::f32_min(a, b)
            } else {
                fpu::f32_max(a, b)
            };
            hart.fpu.fflags.merge(flags);
            hart.fpu.write_f32(op.rd as u32, result);
            hart.pc = pc.wrapping_add(len);
        }
        OpCode::FcvtWS | OpCode::FcvtWuS => {
            let a = hart.fpu.read_f32(op.rs1 as u32);
            let rm = hart.fpu.effective_rm(op.rm as u32);
            let (result, flags) = if op.op == OpCode::FcvtWS {
                let (v, f) = fpu::f32_to_i32(a, rm);
                (v as u32, f)
            } else {
                fpu::f32_to_u32(a, rm)
            };
            hart.fpu.fflags.merge(flags);
            hart.write_reg(op.rd, result);
            hart.pc = pc.wrapping_add(len);
        }
        OpCode::FcvtSW | OpCode::FcvtSWu => {
            let a = hart.read_reg(op.rs1);
            let rm = hart.fpu.effective_rm(op.rm as u32);
            let (result, flags) = if op.op == OpCode::FcvtSW {
                fpu::i32_to_f32(a as i32, rm)
            } else {
                fpu::u32_to_f32(a, rm)
            };
            hart.fpu.fflags.merge(flags);
            hart.fpu.write_f32(op.rd as u32, result);
            hart.pc = pc.wrapping_add(len);
        }
        OpCode::FmvXW => {
            hart.write_reg(op.rd, hart.fpu.read_f32(op.rs1 as u32));
            hart.pc = pc.wrapping_add(len);
        }
        OpCode::FmvWX => {
            hart.fpu.write_f32(op.rd as u32, hart.read_reg(op.rs1));
            hart.pc = pc.wrapping_add(len);
        }
        OpCode::FeqS | OpCode::FltS | OpCode::FleS => {
            let a = hart.fpu.read_f32(op.rs1 as u32);
            let b = hart.fpu.read_f32(op.rs2 as u32);
            let (result, flags) = match op.op {
                OpCode::FeqS => fpu::f32_eq(a, b),
                OpCode::FltS => fpu::f32_lt(a, b),
                OpCode::FleS => fpu::f32_le(a, b),
                _ => unreachable!(),
            };
            hart.fpu.fflags.merge(flags);
            hart.write_reg(op.rd, result as u32);
            hart.pc = pc.wrapping_add(len);
        }
        OpCode::FclassS => {
            let a = hart.fpu.read_f32(op.rs1 as u32);
            hart.write_reg(op.rd, fpu::f32_classify(a));
            hart.pc = pc.wrapping_add(len);
        }
        OpCode::FmaddS | OpCode::FmsubS | OpCode::FnmsubS | OpCode::FnmaddS => {
            let a = hart.fpu.read_f32(op.rs1 as u32);
            let b = hart.fpu.read_f32(op.rs2 as u32);
            let c = hart.fpu.read_f32(op.rs3 as u32);
            let rm = hart.fpu.effective_rm(op.rm as u32);
            let (mut product, mut flags) = fpu::f32_mul(a, b, rm);
            let result = match op.op {
                OpCode::FmaddS => {
                    let (r, f) = fpu::f32_add(product, c, rm);
                    flags.merge(f);
                    r
                }
                OpCode::FmsubS => {
                    let (r, f) = fpu::f32_sub(product, c, rm);
                    flags.merge(f);
                    r
                }
                OpCode::FnmsubS => {
                    product ^= 0x8000_0000;
                    let (r, f) = fpu::f32_add(product, c, rm);
                    flags.merge(f);
                    r
                }
                OpCode::FnmaddS => {
                    product ^= 0x8000_0000;
                    let (r, f) = fpu::f32_sub(product, c, rm);
                    flags.merge(f);
                    r
                }
                _ => unreachable!(),
            };
            hart.fpu.fflags.merge(flags);
            hart.fpu.write_f32(op.rd as u32, result);
            hart.pc = pc.wrapping_add(len);
        }
        OpCode::Illegal => {
            return Err(Trap::IllegalInstruction(op.raw));
        }
    }

    Ok(())
}

/// M-extension semantics: the exact divide-by-zero and signed-overflow
/// special cases defined by the unprivileged RISC-V specification.
fn execute_m_extension(op: OpCode, rs1: u32, rs2: u32) -> u32 {
    match op {
        OpCode::Mul => rs1.wrapping_mul(rs2),
        OpCode::Mulh => ((rs1 as i32 as i64).wrapping_mul(rs2 as i32 as i64) >> 32) as u32,
        OpCode::Mulhsu => ((rs1 as i32 as i64).wrapping_mul(rs2 as u64 as i64) >> 32) as u32,
        OpCode::Mulhu => ((rs1 as u64).wrapping_mul(rs2 as u64) >> 32) as u32,
        OpCode::Div => {
            if rs2 == 0 {
                u32::MAX
            } else if rs1 as i32 == i32::MIN && rs2 as i32 == -1 {
                rs1
            } else {
                ((rs1 as i32).wrapping_div(rs2 as i32)) as u32
            }
        }
        OpCode::Divu => {
            if rs2 == 0 {
                u32::MAX
            } else {
                rs1 / rs2
            }
        }
        OpCode::Rem => {
            if rs2 == 0 {
                rs1
            } else if rs1 as i32 == i32::MIN && rs2 as i32 == -1 {
                0
            } else {
                ((rs1 as i32).wrapping_rem(rs2 as i32)) as u32
            }
        }
        OpCode::Remu => {
            if rs2 == 0 {
                rs1
            } else {
                rs1 % rs2
            }
        }
        _ => unreachable!(),
    }
}

fn execute_csr(hart: &mut Hart, op: &Operation) -> Result<(), Trap> {
    let csr_addr = op.imm as u32;
    let is_imm = matches!(op.op, OpCode::Csrrwi | OpCode::Csrrsi | OpCode::Csrrci);
    let rs1_val = if is_imm {
        op.rs1 as u32
    } else {
        hart.read_reg(op.rs1)
    };

    let old_val = match csr_addr {
        csr::CSR_FFLAGS => hart.fpu.fflags.to_bits(),
        csr::CSR_FRM => hart.fpu.frm as u32,
        csr::CSR_FCSR => hart.fpu.read_fcsr(),
        _ => hart.csr.read(csr_addr),
    };

    let is_write_only = matches!(op.op, OpCode::Csrrw | OpCode::Csrrwi);
    let new_val = match op.op {
        OpCode::Csrrw | OpCode::Csrrwi => rs1_val,
        OpCode::Csrrs | OpCode::Csrrsi => old_val | rs1_val,
        OpCode::Csrrc | OpCode::Csrrci => old_val & !rs1_val,
        _ => unreachable!(),
    };

    if is_write_only || rs1_val != 0 {
        match csr_addr {
            csr::CSR_FFLAGS => {
                hart.fpu.fflags = crate::fpu::FFlags::from_bits(new_val & 0x1F);
                hart.csr.mstatus |= csr::MSTATUS_FS;
            }
            csr::CSR_FRM => {
                hart.fpu.frm = RoundingMode::from(new_val);
                hart.csr.mstatus |= csr::MSTATUS_FS;
            }
            csr::CSR_FCSR => {
                hart.fpu.write_fcsr(new_val);
                hart.csr.mstatus |= csr::MSTATUS_FS;
            }
            _ => {
                if !hart.csr.write(csr_addr, new_val) {
                    return Err(Trap::IllegalInstruction(op.raw));
                }
            }
        }
    }

    hart.write_reg(op.rd, old_val);
    Ok(())
}

fn execute_amo(hart: &mut Hart, io: &mut dyn IoFacade, op: &Operation) -> Result<(), Trap> {
    let addr = hart.read_reg(op.rs1);
    if addr & 3 != 0 {
        return Err(Trap::StoreAddressMisaligned(addr));
    }

    match op.op {
        OpCode::LrW => {
            let value = io.read32(addr);
            hart.write_reg(op.rd, value);
            hart.reservation = Some(addr);
        }
        OpCode::ScW => {
            let success = hart.reservation == Some(addr);
            if success {
                io.write32(addr, hart.read_reg(op.rs2));
                hart.write_reg(op.rd, 0);
            } else {
                hart.write_reg(op.rd, 1);
            }
            hart.reservation = None;
        }
        _ => {
            let old_val = io.read32(addr);
            let rs2 = hart.read_reg(op.rs2);
            let new_val = match op.op {
                OpCode::AmoswapW => rs2,
                OpCode::AmoaddW => old_val.wrapping_add(rs2),
                OpCode::AmoxorW => old_val ^ rs2,
                OpCode::AmoandW => old_val & rs2,
                OpCode::AmoorW => old_val | rs2,
                OpCode::AmominW => std::cmp::min(old_val as i32, rs2 as i32) as u32,
                OpCode::AmomaxW => std::cmp::max(old_val as i32, rs2 as i32) as u32,
                OpCode::AmominuW => std::cmp::min(old_val, rs2),
                OpCode::AmomaxuW => std::cmp::max(old_val, rs2),
                _ => return Err(Trap::IllegalInstruction(op.raw)),
            };
            io.write32(addr, new_val);
            hart.write_reg(op.rd, old_val);
        }
    }
    Ok(())
}

fn check_branch_alignment(target: u32, ext_c: bool) -> Result<(), Trap> {
    let misaligned = if ext_c { target & 1 != 0 } else { target & 3 != 0 };
    if misaligned {
        Err(Trap::InstructionAddressMisaligned(target))
    } else {
        Ok(())
    }
}

fn regs_snapshot(hart: &Hart) -> &[u32; 32] {
    hart.regs_ref()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{decode, DecodeOptions};
    use crate::io::FlatMemory;

    fn opts() -> DecodeOptions {
        DecodeOptions {
            ext_m: true,
            ext_a: true,
            ext_f: true,
            ext_c: true,
            ext_zicsr: true,
            ext_zifencei: true,
        }
    }

    #[test]
    fn addi_chain() {
        let mut hart = Hart::new(0x1000);
        let mut mem = FlatMemory::new(0x2000);
        let op1 = decode(0x00500093, &opts()); // addi x1, x0, 5
        execute(&mut hart, &mut mem, &op1, true).unwrap();
        assert_eq!(hart.read_reg(1), 5);
    }

    #[test]
    fn division_by_zero_returns_all_ones() {
        assert_eq!(execute_m_extension(OpCode::Div, 10, 0), u32::MAX);
        assert_eq!(execute_m_extension(OpCode::Divu, 10, 0), u32::MAX);
    }

    #[test]
    fn signed_division_overflow_returns_dividend() {
        assert_eq!(
            execute_m_extension(OpCode::Div, 0x8000_0000, 0xFFFF_FFFF),
            0x8000_0000
        );
    }

    #[test]
    fn rem_by_zero_returns_dividend() {
        assert_eq!(execute_m_extension(OpCode::Rem, 7, 0), 7);
    }

    #[test]
    fn rem_overflow_returns_zero() {
        assert_eq!(execute_m_extension(OpCode::Rem, 0x8000_0000, 0xFFFF_FFFF), 0);
    }

    #[test]
    fn misaligned_word_load_traps() {
        let mut hart = Hart::new(0x1000);
        let mut mem = FlatMemory::new(0x2000);
        hart.write_reg(1, 1);
        let op = decode(0x0000A103, &opts()); // lw x2, 0(x1)
        let err = execute(&mut hart, &mut mem, &op, true).unwrap_err();
        assert_eq!(err, Trap::LoadAddressMisaligned(1));
    }

    #[test]
    fn half_word_jump_target_is_fine_with_compressed_enabled() {
        let mut hart = Hart::new(0);
        let mut mem = FlatMemory::new(0x100);
        let op = decode(0x0020006F, &opts()); // jal x0, 2
        execute(&mut hart, &mut mem, &op, true).unwrap();
        assert_eq!(hart.pc, 2);
    }

    #[test]
    fn half_word_jump_target_traps_with_compressed_disabled() {
        let mut hart = Hart::new(0);
        let mut mem = FlatMemory::new(0x100);
        let op = decode(0x0020006F, &opts()); // jal x0, 2
        let err = execute(&mut hart, &mut mem, &op, false).unwrap_err();
        assert_eq!(err, Trap::InstructionAddressMisaligned(2));
    }

    #[test]
    fn csrrs_with_rs1_x0_reads_without_writing() {
        let mut hart = Hart::new(0);
        let mut mem = FlatMemory::new(0x100);
        hart.csr.mscratch = 0x55;
        let op = decode(0x340022F3, &opts()); // csrrs x5, mscratch, x0
        execute(&mut hart, &mut mem, &op, true).unwrap();
        assert_eq!(hart.read_reg(5), 0x55);
        assert_eq!(hart.csr.mscratch, 0x55);
    }

    #[test]
    fn csrrc_with_rs1_x0_reads_without_writing() {
        let mut hart = Hart::new(0);
        let mut mem = FlatMemory::new(0x100);
        hart.csr.mscratch = 0x55;
        let op = decode(0x34003373, &opts()); // csrrc x6, mscratch, x0
        execute(&mut hart, &mut mem, &op, true).unwrap();
        assert_eq!(hart.read_reg(6), 0x55);
        assert_eq!(hart.csr.mscratch, 0x55);
    }

    #[test]
    fn lb_sign_extends_what_sb_truncated() {
        let mut hart = Hart::new(0);
        let mut mem = FlatMemory::new(0x100);
        hart.write_reg(1, 0x10); // base address
        hart.write_reg(2, 0xFFFF_FFFF); // store -1, truncated to one byte

        let sb = decode(0x00208023, &opts()); // sb x2, 0(x1)
        execute(&mut hart, &mut mem, &sb, true).unwrap();

        let lb = decode(0x00008183, &opts()); // lb x3, 0(x1)
        execute(&mut hart, &mut mem, &lb, true).unwrap();
        assert_eq!(hart.read_reg(3), 0xFFFF_FFFF);

        let lbu = decode(0x0000C203, &opts()); // lbu x4, 0(x1)
        execute(&mut hart, &mut mem, &lbu, true).unwrap();
        assert_eq!(hart.read_reg(4), 0xFF);
    }

    proptest::proptest! {
        #[test]
        fn div_by_zero_is_always_all_ones(rs1: u32) {
            proptest::prop_assert_eq!(execute_m_extension(OpCode::Div, rs1, 0), u32::MAX);
            proptest::prop_assert_eq!(execute_m_extension(OpCode::Divu, rs1, 0), u32::MAX);
        }

        #[test]
        fn rem_by_zero_is_always_the_dividend(rs1: u32) {
            proptest::prop_assert_eq!(execute_m_extension(OpCode::Rem, rs1, 0), rs1);
            proptest::prop_assert_eq!(execute_m_extension(OpCode::Remu, rs1, 0), rs1);
        }

        #[test]
        fn div_never_panics_across_the_full_input_range(rs1: u32, rs2: u32) {
            // wrapping_div/wrapping_rem must absorb every (rs1, rs2) pair,
            // including the INT_MIN/-1 overflow case, without a panic.
            let _ = execute_m_extension(OpCode::Div, rs1, rs2);
            let _ = execute_m_extension(OpCode::Rem, rs1, rs2);
            let _ = execute_m_extension(OpCode::Divu, rs1, rs2);
            let _ = execute_m_extension(OpCode::Remu, rs1, rs2);
        }
    }
}
