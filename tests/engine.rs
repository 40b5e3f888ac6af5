//! End-to-end scenarios driving the engine through the public API with
//! hand-encoded instruction words, the way a host embedding this crate
//! would: build a `FlatMemory` image, run it, inspect the committed
//! state. No assembler is in scope, so every word below is annotated
//! with the instruction it encodes.

use rv32_engine::bht::BranchHistoryTable;
use rv32_engine::block::BlockMap;
use rv32_engine::cache::BlockCache;
use rv32_engine::config::EngineConfig;
use rv32_engine::dispatch::{self, StopReason};
use rv32_engine::error::Trap;
use rv32_engine::hart::Hart;
use rv32_engine::io::FlatMemory;

fn harness(mem_size: usize) -> (Hart, FlatMemory, BlockMap, BlockCache, BranchHistoryTable, EngineConfig) {
    (
        Hart::new(0),
        FlatMemory::new(mem_size),
        BlockMap::new(),
        BlockCache::new(16, 64),
        BranchHistoryTable::new(4),
        EngineConfig::default(),
    )
}

#[test]
fn addi_chain_reaches_ebreak() {
    let (mut hart, mut mem, mut map, mut cache, mut bht, cfg) = harness(0x100);
    mem.load(0, &0x00500093u32.to_le_bytes()); // addi x1, x0, 5
    mem.load(4, &0xFFE08093u32.to_le_bytes()); // addi x1, x1, -2
    mem.load(8, &0x00100073u32.to_le_bytes()); // ebreak

    let reason = dispatch::run(&mut hart, &mut mem, &mut map, &mut cache, &mut bht, &cfg, 100);

    assert_eq!(reason, StopReason::Ebreak);
    assert_eq!(hart.read_reg(1), 3);
    assert_eq!(mem.ebreaks.len(), 1);
    assert_eq!(hart.pc, 8);
}

#[test]
fn loop_with_branch_linking_promotes_loop_body_to_hot() {
    let (mut hart, mut mem, mut map, mut cache, mut bht, cfg) = harness(0x100);
    // x3 = 10
    mem.load(0, &0x00A00193u32.to_le_bytes()); // addi x3, x0, 10
    // loop body, entered at pc=4
    mem.load(4, &0x00110113u32.to_le_bytes()); // addi x2, x2, 1
    mem.load(8, &0xFE311EE3u32.to_le_bytes()); // bne x2, x3, -4
    mem.load(12, &0x00000073u32.to_le_bytes()); // ecall

    // A low hot threshold so the 9 re-entries into the loop body clear it.
    cache = BlockCache::new(16, 5);

    let reason = dispatch::run(&mut hart, &mut mem, &mut map, &mut cache, &mut bht, &cfg, 1000);

    assert_eq!(reason, StopReason::Ecall);
    assert_eq!(hart.read_reg(2), 10);
    assert_eq!(hart.read_reg(3), 10);
    // Two distinct blocks: the setup block at 0, the loop body at 4.
    assert_eq!(map.len(), 2);
    assert!(cache.hot(4));
}

#[test]
fn indirect_jump_resolves_through_branch_history_and_a_single_block_build() {
    let (mut hart, mut mem, mut map, mut cache, mut bht, cfg) = harness(0x100);
    mem.load(0, &0x01000093u32.to_le_bytes()); // addi x1, x0, 16
    mem.load(4, &0x00008067u32.to_le_bytes()); // jalr x0, 0(x1)  -> 16
    mem.load(16, &0x00120213u32.to_le_bytes()); // addi x4, x4, 1
    mem.load(20, &0x00008067u32.to_le_bytes()); // jalr x0, 0(x1) -> 16 (loops)

    // Enough cycles to revisit the indirect-jump target several times.
    let reason = dispatch::run(&mut hart, &mut mem, &mut map, &mut cache, &mut bht, &cfg, 13);

    assert_eq!(reason, StopReason::CycleLimit);
    assert!(hart.read_reg(4) >= 5);
    // Same call site, same computed target, every time: one block built
    // for the dispatch entry and one for the target, never rebuilt.
    assert_eq!(map.len(), 2);
    assert!(bht.hit(20, 16));
}

#[test]
fn signed_division_overflow_does_not_trap() {
    let (mut hart, mut mem, mut map, mut cache, mut bht, cfg) = harness(0x100);
    mem.load(0, &0x800000B7u32.to_le_bytes()); // lui x1, 0x80000  (x1 = 0x80000000)
    mem.load(4, &0xFFF00113u32.to_le_bytes()); // addi x2, x0, -1
    mem.load(8, &0x0220C1B3u32.to_le_bytes()); // div x3, x1, x2
    mem.load(12, &0x00000073u32.to_le_bytes()); // ecall

    let reason = dispatch::run(&mut hart, &mut mem, &mut map, &mut cache, &mut bht, &cfg, 100);

    assert_eq!(reason, StopReason::Ecall);
    assert_eq!(hart.read_reg(1), 0x80000000);
    assert_eq!(hart.read_reg(3), 0x80000000);
}

#[test]
fn misaligned_load_traps_with_the_bad_address_in_mtval() {
    let (mut hart, mut mem, mut map, mut cache, mut bht, cfg) = harness(0x100);
    hart.csr.mtvec = 0x40;
    mem.load(0, &0x00102083u32.to_le_bytes()); // lw x1, 1(x0)
    mem.load(0x40, &0x00000073u32.to_le_bytes()); // ecall at the trap vector

    let reason = dispatch::run(&mut hart, &mut mem, &mut map, &mut cache, &mut bht, &cfg, 100);

    assert_eq!(reason, StopReason::Ecall);
    assert_eq!(hart.csr.mcause, Trap::LoadAddressMisaligned(1).code());
    assert_eq!(hart.csr.mtval, 1);
}

#[test]
fn ecall_observes_the_committed_register_file() {
    let (mut hart, mut mem, mut map, mut cache, mut bht, cfg) = harness(0x100);
    mem.load(0, &0x05D00893u32.to_le_bytes()); // addi x17, x0, 93  (a7 = 93)
    mem.load(4, &0x02A00513u32.to_le_bytes()); // addi x10, x0, 42 (a0 = 42)
    mem.load(8, &0x00000073u32.to_le_bytes()); // ecall

    let reason = dispatch::run(&mut hart, &mut mem, &mut map, &mut cache, &mut bht, &cfg, 100);

    assert_eq!(reason, StopReason::Ecall);
    assert_eq!(mem.ecalls.len(), 1);
    let regs = &mem.ecalls[0];
    assert_eq!(regs[17], 93);
    assert_eq!(regs[10], 42);
    assert_eq!(hart.pc, 8);
}
