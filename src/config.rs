//! Engine configuration surface.
//!
//! A plain value type the embedding host builds and passes to [`crate::hart::Hart::new`].
//! This crate does no file or environment parsing itself (that is the host's
//! concern); the implementation-defined, power-of-two defaults below follow
//! the same convention as the block-cache sizing constants elsewhere in this
//! engine.

/// Extensions and tunables the engine is constructed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub ext_m: bool,
    pub ext_a: bool,
    pub ext_f: bool,
    pub ext_c: bool,
    pub ext_zicsr: bool,
    pub ext_zifencei: bool,
    /// Maximum resident entries in the block cache.
    pub block_cache_capacity: usize,
    /// Access count above which a cached block is considered hot.
    pub hot_threshold: u32,
    /// Entries in each indirect jump's branch history table.
    pub history_size: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            ext_m: true,
            ext_a: true,
            ext_f: true,
            ext_c: true,
            ext_zicsr: true,
            ext_zifencei: true,
            block_cache_capacity: 1024,
            hot_threshold: 64,
            history_size: 4,
        }
    }
}
