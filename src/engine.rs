//! The public engine surface: a hart plus the block map/cache/BHT the
//! dispatcher needs, composed behind a single `run`/`step` API.

use crate::bht::BranchHistoryTable;
use crate::block::BlockMap;
use crate::cache::BlockCache;
use crate::config::EngineConfig;
use crate::dispatch::{self, StopReason};
use crate::hart::Hart;
use crate::io::IoFacade;

/// A single RV32IMAFC hart and its decoded-block caches. Owns no memory —
/// every load/store/ecall/ebreak is routed through the `IoFacade` passed
/// to [`Engine::run`].
pub struct Engine {
    pub hart: Hart,
    pub cfg: EngineConfig,
    map: BlockMap,
    cache: BlockCache,
    bht: BranchHistoryTable,
}

impl Engine {
    pub fn new(entry_pc: u32, cfg: EngineConfig) -> Self {
        Engine {
            hart: Hart::new(entry_pc),
            cache: BlockCache::new(cfg.block_cache_capacity, cfg.hot_threshold),
            bht: BranchHistoryTable::new(cfg.history_size),
            map: BlockMap::new(),
            cfg,
        }
    }

    /// Run until `max_cycles` instructions retire or a yield point
    /// (ecall/ebreak) is reached.
    pub fn run(&mut self, io: &mut dyn IoFacade, max_cycles: u64) -> StopReason {
        dispatch::run(
            &mut self.hart,
            io,
            &mut self.map,
            &mut self.cache,
            &mut self.bht,
            &self.cfg,
            max_cycles,
        )
    }

    /// Run exactly one instruction's worth of dispatch (may still be
    /// fewer than one full block if the first op yields).
    pub fn step(&mut self, io: &mut dyn IoFacade) -> StopReason {
        self.run(io, 1)
    }

    /// Drop every cached/mapped block — use after loading new code or
    /// after a FENCE.I the host wants reflected beyond this instance's
    /// own self-invalidation.
    pub fn invalidate_code(&mut self) {
        self.map.invalidate_all();
        self.cache.invalidate_all();
        self.bht.clear();
    }

    pub fn reset(&mut self, entry_pc: u32) {
        self.hart.reset(entry_pc);
        self.invalidate_code();
    }
}
