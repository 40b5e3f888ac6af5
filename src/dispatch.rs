//! The dispatcher: the hot loop that walks blocks until a yield point.
//!
//! Each iteration resolves a block (cache hit, else block-map build),
//! then runs its operations one at a time through [`crate::ops::execute`].
//! A block's terminator already leaves `hart.pc` pointing at its
//! successor (see `ops::execute`'s doc comment), so the dispatcher never
//! re-derives control flow itself — it only decides *when to stop*
//! tail-chaining and return control to the host.
//!
//! Bounding execution by a cycle count rather than looping forever is
//! what lets a host interleave the engine with its own scheduling; an
//! unbounded `run` would make this a library that never gives control
//! back.

use std::rc::Rc;

use crate::bht::BranchHistoryTable;
use crate::block::{Block, BlockMap};
use crate::cache::BlockCache;
use crate::config::EngineConfig;
use crate::csr;
use crate::decode::DecodeOptions;
use crate::error::Trap;
use crate::hart::Hart;
use crate::io::IoFacade;
use crate::ops::{self, OpCode};

/// Why a call to [`run`] returned control to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The block's instruction budget was spent.
    CycleLimit,
    /// An `ecall` was executed; the IO facade's `on_ecall` has already run.
    Ecall,
    /// An `ebreak` was executed; the IO facade's `on_ebreak` has already run.
    Ebreak,
}

/// Resolve the block starting at `pc`: cache hit, or build-and-cache via
/// the block map.
fn resolve_block(
    pc: u32,
    map: &mut BlockMap,
    cache: &mut BlockCache,
    io: &mut dyn IoFacade,
    opts: &DecodeOptions,
) -> Rc<Block> {
    if let Some(block) = cache.get(pc) {
        return block;
    }
    tracing::trace!(pc, "block cache miss, falling back to block map");
    let block = map.get_or_build(pc, io, opts);
    cache.put(pc, Rc::clone(&block));
    block
}

/// Vector a trap: commit mepc/mcause/mtval and jump to mtvec. This engine
/// models no vectored-mode trap dispatch (mtvec's mode bits are masked
/// off at write time in [`crate::csr`]), only direct.
fn vector_trap(hart: &mut Hart, trap: Trap) {
    tracing::debug!(pc = hart.pc, cause = trap.code(), "dispatching trap to mtvec");
    hart.csr.mepc = hart.pc;
    hart.csr.mcause = trap.code();
    hart.csr.mtval = trap.value();

    let mie_was_set = hart.csr.mstatus & csr::MSTATUS_MIE != 0;
    let mut status = hart.csr.mstatus & !(csr::MSTATUS_MIE | csr::MSTATUS_MPIE);
    if mie_was_set {
        status |= csr::MSTATUS_MPIE;
    }
    hart.csr.mstatus = status;

    hart.pc = hart.csr.mtvec;
}

/// Run until `max_cycles` instructions have retired or a yield point
/// (ecall, ebreak) is reached, whichever comes first.
pub fn run(
    hart: &mut Hart,
    io: &mut dyn IoFacade,
    map: &mut BlockMap,
    cache: &mut BlockCache,
    bht: &mut BranchHistoryTable,
    cfg: &EngineConfig,
    max_cycles: u64,
) -> StopReason {
    let opts = DecodeOptions::from(cfg);
    let mut cycles: u64 = 0;

    loop {
        let block = resolve_block(hart.pc, map, cache, io, &opts);

        for op in block.ops.iter() {
            let is_indirect = matches!(op.op, OpCode::Jalr);
            let op_pc = hart.pc;

            if let Err(trap) = ops::execute(hart, io, op, cfg.ext_c) {
                cycles += 1;
                hart.csr.cycle = hart.csr.cycle.wrapping_add(1);
                hart.csr.instret = hart.csr.instret.wrapping_add(1);

                match trap {
                    Trap::EnvironmentCallFromU => return StopReason::Ecall,
                    Trap::Breakpoint(_) => return StopReason::Ebreak,
                    _ => {
                        vector_trap(hart, trap);
                        if cycles >= max_cycles {
                            return StopReason::CycleLimit;
                        }
                        // Re-resolve from the trap vector on the outer loop.
                        break;
                    }
                }
            }

            cycles += 1;
            hart.csr.cycle = hart.csr.cycle.wrapping_add(1);
            hart.csr.instret = hart.csr.instret.wrapping_add(1);

            if is_indirect {
                bht.record(op_pc, hart.pc);
            }

            if op.op == OpCode::FenceI {
                // The fence's ordering guarantee is that no stale decode
                // from before it is ever dispatched again.
                map.invalidate_all();
                cache.invalidate_all();
                bht.clear();
            }

            if cycles >= max_cycles {
                return StopReason::CycleLimit;
            }
        }
    }
}
