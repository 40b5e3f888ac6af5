//! Branch history table: per-indirect-jump target memoization.
//!
//! Each indirect-jump site (JALR, C.JR, C.JALR) gets its own small
//! direct-mapped history of recently computed targets, so a frequently
//! revisited computed jump (e.g. a virtual-call site or a loop-closing
//! `ret`) can skip the block-map lookup entirely. A miss still falls
//! back to [`crate::block`]'s map, which remains authoritative.

use std::collections::HashMap;

struct SiteHistory {
    targets: Vec<u32>,
    next_slot: usize,
}

impl SiteHistory {
    fn new(size: usize) -> Self {
        SiteHistory {
            targets: Vec::with_capacity(size),
            next_slot: 0,
        }
    }

    fn contains(&self, target: u32) -> bool {
        self.targets.contains(&target)
    }

    fn record(&mut self, target: u32, size: usize) {
        if self.targets.contains(&target) {
            return;
        }
        if self.targets.len() < size {
            self.targets.push(target);
        } else {
            self.targets[self.next_slot] = target;
            self.next_slot = (self.next_slot + 1) % size;
        }
    }
}

/// Per-call-site branch history, keyed by the indirect jump's own PC.
pub struct BranchHistoryTable {
    history_size: usize,
    sites: HashMap<u32, SiteHistory>,
}

impl BranchHistoryTable {
    pub fn new(history_size: usize) -> Self {
        BranchHistoryTable {
            history_size,
            sites: HashMap::new(),
        }
    }

    /// Has `target` been seen before at this call site?
    pub fn hit(&self, site_pc: u32, target: u32) -> bool {
        self.sites
            .get(&site_pc)
            .map(|h| h.contains(target))
            .unwrap_or(false)
    }

    /// Record a resolved target for a call site, evicting the oldest
    /// entry in round-robin order once the per-site history is full.
    pub fn record(&mut self, site_pc: u32, target: u32) {
        let size = self.history_size;
        let site = self
            .sites
            .entry(site_pc)
            .or_insert_with(|| SiteHistory::new(size));
        if !site.contains(target) {
            tracing::trace!(site_pc, target, "branch history table miss");
        }
        site.record(target, size);
    }

    pub fn clear(&mut self) {
        self.sites.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_before_any_record() {
        let bht = BranchHistoryTable::new(4);
        assert!(!bht.hit(0x1000, 0x2000));
    }

    #[test]
    fn hit_after_record() {
        let mut bht = BranchHistoryTable::new(4);
        bht.record(0x1000, 0x2000);
        assert!(bht.hit(0x1000, 0x2000));
    }

    #[test]
    fn oldest_entry_evicted_once_full() {
        let mut bht = BranchHistoryTable::new(2);
        bht.record(0x1000, 0xA);
        bht.record(0x1000, 0xB);
        bht.record(0x1000, 0xC); // evicts 0xA
        assert!(!bht.hit(0x1000, 0xA));
        assert!(bht.hit(0x1000, 0xB));
        assert!(bht.hit(0x1000, 0xC));
    }

    #[test]
    fn separate_sites_are_independent() {
        let mut bht = BranchHistoryTable::new(4);
        bht.record(0x1000, 0xA);
        assert!(!bht.hit(0x2000, 0xA));
    }
}
