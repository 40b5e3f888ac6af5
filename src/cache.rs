//! Bounded, frequency-promoted block cache.
//!
//! Grounded on the page-hotness bookkeeping in the bb-jit module
//! (`PageStats`/`JitState::record_execution`), narrowed from per-page
//! heat accumulation to a simple per-block access counter: this cache
//! does not compile anything itself, it is only a linking hint the
//! dispatcher consults before falling back to the unbounded
//! [`crate::block`] map. Eviction never frees block storage — the
//! evicted entry simply stops being a cache hit and the map remains the
//! source of truth.

use std::collections::HashMap;
use std::rc::Rc;

use crate::block::Block;

struct Entry {
    block: Rc<Block>,
    accesses: u32,
}

/// Bounded cache of recently/frequently entered blocks, keyed by entry PC.
pub struct BlockCache {
    capacity: usize,
    hot_threshold: u32,
    entries: HashMap<u32, Entry>,
}

impl BlockCache {
    pub fn new(capacity: usize, hot_threshold: u32) -> Self {
        BlockCache {
            capacity,
            hot_threshold,
            entries: HashMap::with_capacity(capacity),
        }
    }

    /// Look up a cached block, bumping its access counter on hit.
    pub fn get(&mut self, pc: u32) -> Option<Rc<Block>> {
        let entry = self.entries.get_mut(&pc)?;
        entry.accesses += 1;
        if entry.accesses == self.hot_threshold {
            tracing::debug!(pc, "block crossed hot threshold");
        }
        Some(Rc::clone(&entry.block))
    }

    /// Insert or refresh a block, evicting the least-frequently-used
    /// non-hot entry if the cache is at capacity.
    pub fn put(&mut self, pc: u32, block: Rc<Block>) {
        if self.entries.contains_key(&pc) {
            self.entries.get_mut(&pc).unwrap().block = block;
            return;
        }

        if self.entries.len() >= self.capacity {
            self.evict_one();
        }

        self.entries.insert(pc, Entry { block, accesses: 1 });
    }

    /// Whether `pc`'s access counter has crossed the hot threshold.
    pub fn hot(&self, pc: u32) -> bool {
        self.entries
            .get(&pc)
            .map(|e| e.accesses >= self.hot_threshold)
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn invalidate_all(&mut self) {
        self.entries.clear();
    }

    fn evict_one(&mut self) {
        let victim = self
            .entries
            .iter()
            .filter(|(_, e)| e.accesses < self.hot_threshold)
            .min_by_key(|(_, e)| e.accesses)
            .map(|(pc, _)| *pc);

        let victim = match victim {
            Some(pc) => pc,
            // Every resident entry is hot: fall back to evicting the
            // globally least-accessed one rather than refusing to insert.
            None => match self.entries.iter().min_by_key(|(_, e)| e.accesses) {
                Some((pc, _)) => *pc,
                None => return,
            },
        };

        tracing::trace!(pc = victim, "evicting block cache entry");
        self.entries.remove(&victim);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(pc: u32) -> Rc<Block> {
        Rc::new(Block {
            start_pc: pc,
            ops: Vec::new(),
            hit_count: 0,
        })
    }

    #[test]
    fn get_miss_returns_none() {
        let mut cache = BlockCache::new(2, 3);
        assert!(cache.get(0x1000).is_none());
    }

    #[test]
    fn hot_after_threshold_accesses() {
        let mut cache = BlockCache::new(2, 2);
        cache.put(0x1000, block(0x1000));
        assert!(!cache.hot(0x1000));
        cache.get(0x1000);
        assert!(cache.hot(0x1000));
    }

    #[test]
    fn eviction_prefers_least_accessed_non_hot_entry() {
        let mut cache = BlockCache::new(2, 100);
        cache.put(0x1000, block(0x1000));
        cache.put(0x2000, block(0x2000));
        cache.get(0x2000);
        cache.put(0x3000, block(0x3000));
        assert!(cache.get(0x1000).is_none());
        assert!(cache.get(0x2000).is_some());
        assert!(cache.get(0x3000).is_some());
    }
}
