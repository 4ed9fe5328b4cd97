//! Cached Port State-Machine Tests.
//!
//! Verifies miss-latency pacing, pending-miss cancellation on redirect,
//! store write-once replay, and the store-to-load drain penalty.

use a64sim_core::core::pipeline::latches::ExMemEntry;
use a64sim_core::core::pipeline::ports::{FetchPort, MemPort, StoreDrain};
use a64sim_core::core::units::cache::{Cache, CacheConfig, STORE_FORWARD_LATENCY};
use a64sim_core::isa::decode;
use a64sim_core::mem::Memory;

use crate::common::asm;

fn small_cache(miss_latency: u64) -> Cache {
    Cache::new(&CacheConfig {
        size_bytes: 1024,
        line_bytes: 64,
        ways: 2,
        hit_latency: 1,
        miss_latency,
    })
}

fn store_entry(pc: u64, addr: u64, value: u64) -> ExMemEntry {
    ExMemEntry {
        valid: true,
        pc,
        inst: decode::decode(asm::str64(1, 2, 0)).expect("decodes"),
        alu_result: addr,
        store_value: value,
        mem_write: true,
        rd: 1,
        ..Default::default()
    }
}

fn load_entry(pc: u64, addr: u64) -> ExMemEntry {
    ExMemEntry {
        valid: true,
        pc,
        inst: decode::decode(asm::ldr64(1, 2, 0)).expect("decodes"),
        alu_result: addr,
        mem_read: true,
        mem_to_reg: true,
        rd: 1,
        ..Default::default()
    }
}

// ══════════════════════════════════════════════════════════
// 1. Fetch port
// ══════════════════════════════════════════════════════════

#[test]
fn fetch_without_cache_never_stalls() {
    let mut port = FetchPort::default();
    let mut mem = Memory::new();
    mem.write_u32(0x1000, 0xDEADBEEF);
    let result = port.fetch(0x1000, None, &mem);
    assert!(!result.stall);
    assert_eq!(result.word, 0xDEADBEEF);
}

#[test]
fn fetch_miss_pays_latency_then_returns() {
    let mut port = FetchPort::default();
    let mut cache = small_cache(3);
    let mut mem = Memory::new();
    mem.write_u32(0x1000, 0x12345678);

    assert!(port.fetch(0x1000, Some(&mut cache), &mem).stall);
    assert!(port.fetch(0x1000, Some(&mut cache), &mem).stall);
    let result = port.fetch(0x1000, Some(&mut cache), &mem);
    assert!(!result.stall, "latency 3 completes on the third cycle");
    assert_eq!(result.word, 0x12345678);

    // The line is now resident: an immediate refetch hits.
    assert!(!port.fetch(0x1000, Some(&mut cache), &mem).stall);
}

#[test]
fn fetch_redirect_cancels_pending_miss() {
    let mut port = FetchPort::default();
    let mut cache = small_cache(4);
    let mut mem = Memory::new();
    mem.write_u32(0x1000, 0x11111111);
    mem.write_u32(0x5000, 0x22222222);

    assert!(port.fetch(0x1000, Some(&mut cache), &mem).stall);
    // A taken branch moves the fetch PC: the old miss is abandoned and a
    // fresh access starts.
    assert!(port.fetch(0x5000, Some(&mut cache), &mem).stall);
    assert!(port.fetch(0x5000, Some(&mut cache), &mem).stall);
    assert!(port.fetch(0x5000, Some(&mut cache), &mem).stall);
    let result = port.fetch(0x5000, Some(&mut cache), &mem);
    assert!(!result.stall);
    assert_eq!(result.word, 0x22222222);
}

// ══════════════════════════════════════════════════════════
// 2. Memory port
// ══════════════════════════════════════════════════════════

#[test]
fn load_miss_stalls_then_returns_data() {
    let mut port = MemPort::default();
    let mut cache = small_cache(3);
    let mut mem = Memory::new();
    let mut drain = StoreDrain::default();
    mem.write_u64(0x2000, 777);

    let entry = load_entry(0x1000, 0x2000);
    assert!(port.access(&entry, Some(&mut cache), &mut mem, &mut drain).stall);
    assert!(port.access(&entry, Some(&mut cache), &mut mem, &mut drain).stall);
    let result = port.access(&entry, Some(&mut cache), &mut mem, &mut drain);
    assert!(!result.stall);
    assert_eq!(result.data, 777);
}

#[test]
fn completed_load_replays_cached_data() {
    let mut port = MemPort::default();
    let mut mem = Memory::new();
    let mut drain = StoreDrain::default();
    mem.write_u64(0x2000, 777);

    let entry = load_entry(0x1000, 0x2000);
    let first = port.access(&entry, None, &mut mem, &mut drain);
    assert!(!first.stall);

    // A sibling port stalls the group; the value must replay unchanged even
    // if memory moves underneath.
    mem.write_u64(0x2000, 888);
    let replay = port.access(&entry, None, &mut mem, &mut drain);
    assert_eq!(replay.data, 777);
}

#[test]
fn replayed_store_writes_exactly_once() {
    let mut port = MemPort::default();
    let mut mem = Memory::new();
    let mut drain = StoreDrain::default();

    let entry = store_entry(0x1000, 0x2000, 42);
    assert!(!port.access(&entry, None, &mut mem, &mut drain).stall);
    assert_eq!(mem.read_u64(0x2000), 42);

    // Group replay for the same (pc, addr): the store must not re-issue.
    mem.write_u64(0x2000, 0);
    let _ = port.access(&entry, None, &mut mem, &mut drain);
    assert_eq!(mem.read_u64(0x2000), 0, "second write suppressed");

    // A different instruction to the same port starts a fresh access.
    let other = store_entry(0x1004, 0x2000, 43);
    let _ = port.access(&other, None, &mut mem, &mut drain);
    assert_eq!(mem.read_u64(0x2000), 43);
}

#[test]
fn store_miss_writes_only_at_completion() {
    let mut port = MemPort::default();
    let mut cache = small_cache(2);
    let mut mem = Memory::new();
    let mut drain = StoreDrain::default();

    let entry = store_entry(0x1000, 0x2000, 42);
    assert!(port.access(&entry, Some(&mut cache), &mut mem, &mut drain).stall);
    assert_eq!(mem.read_u64(0x2000), 0, "no write while the miss counts");
    assert!(!port.access(&entry, Some(&mut cache), &mut mem, &mut drain).stall);
    assert_eq!(mem.read_u64(0x2000), 42);
}

// ══════════════════════════════════════════════════════════
// 3. Store drain
// ══════════════════════════════════════════════════════════

#[test]
fn load_to_draining_line_pays_forward_penalty() {
    let mut port = MemPort::default();
    let mut cache = small_cache(1);
    let mut mem = Memory::new();
    let mut drain = StoreDrain::default();

    // Warm the line, then store through it.
    let warm = load_entry(0x0FFC, 0x2000);
    let _ = port.access(&warm, Some(&mut cache), &mut mem, &mut drain);
    let store = store_entry(0x1000, 0x2000, 9);
    let _ = port.access(&store, Some(&mut cache), &mut mem, &mut drain);
    assert!(drain.conflicts(0x2000));

    // A load to the same line now stalls for the drain.
    let mut load_port = MemPort::default();
    let load = load_entry(0x1004, 0x2008);
    let first = load_port.access(&load, Some(&mut cache), &mut mem, &mut drain);
    assert!(first.stall, "same line: store-forward stall applies");
}

#[test]
fn drain_expires_after_its_latency() {
    let mut drain = StoreDrain::default();
    drain.note_store(0x2000);
    for _ in 0..STORE_FORWARD_LATENCY {
        assert!(drain.conflicts(0x2000));
        drain.tick();
    }
    assert!(!drain.conflicts(0x2000));
}
