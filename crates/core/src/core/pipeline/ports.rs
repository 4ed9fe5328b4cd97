//! Cached fetch and memory port state machines.
//!
//! Each port wraps the optional cache with a small pending-miss machine so a
//! multi-cycle miss is paid exactly once and the access replays cleanly while
//! the pipeline holds. It implements:
//! 1. **Fetch Port:** Instruction fetch with miss latency; any redirect to a
//!    different PC cancels the pending miss.
//! 2. **Memory Ports:** One per memory-capable slot. Loads cache their result
//!    for stall-free replay; stores write at most once per logical store no
//!    matter how often the group replays.
//! 3. **Store Drain:** Completed stores drain for [`STORE_FORWARD_LATENCY`]
//!    cycles, stalling loads to the same line until done.

use super::latches::ExMemEntry;
use crate::core::units::cache::{Cache, STORE_FORWARD_LATENCY};
use crate::mem::Memory;

/// Result of one fetch-port access.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FetchResult {
    /// Fetched instruction word; meaningful when not stalled.
    pub word: u32,
    /// Access has not completed this cycle.
    pub stall: bool,
}

/// Instruction fetch port with miss-latency modeling.
#[derive(Clone, Copy, Debug, Default)]
pub struct FetchPort {
    pending: bool,
    pending_pc: u64,
    latency_remaining: u64,
    cached_word: u32,
}

impl FetchPort {
    /// Fetches the word at `pc`, consulting the I-cache when present.
    ///
    /// A pending miss for a different PC is cancelled: any taken branch
    /// invalidates the outstanding fetch.
    pub fn fetch(&mut self, pc: u64, icache: Option<&mut Cache>, mem: &Memory) -> FetchResult {
        if self.pending && self.pending_pc != pc {
            self.pending = false;
        }
        if self.pending {
            self.latency_remaining = self.latency_remaining.saturating_sub(1);
            if self.latency_remaining > 0 {
                return FetchResult {
                    word: 0,
                    stall: true,
                };
            }
            self.pending = false;
            return FetchResult {
                word: self.cached_word,
                stall: false,
            };
        }

        let word = mem.read_u32(pc);
        let Some(cache) = icache else {
            return FetchResult { word, stall: false };
        };
        let access = cache.access(pc);
        if access.latency <= 1 {
            return FetchResult { word, stall: false };
        }
        self.pending = true;
        self.pending_pc = pc;
        self.latency_remaining = access.latency - 1;
        self.cached_word = word;
        FetchResult {
            word: 0,
            stall: true,
        }
    }

    /// Clears any pending miss (used on flush).
    pub const fn reset(&mut self) {
        self.pending = false;
        self.latency_remaining = 0;
    }
}

/// Result of one memory-port access.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MemAccess {
    /// Loaded value (first register of a pair); meaningful when not stalled.
    pub data: u64,
    /// Loaded value for the second register of a pair.
    pub data2: u64,
    /// Access has not completed this cycle.
    pub stall: bool,
}

/// Per-slot data-memory port.
///
/// The port remembers its last completed access keyed by `(pc, addr)`: when a
/// sibling port stalls the whole group and the access replays next cycle, a
/// completed load returns its cached data and a completed store does not
/// write again.
#[derive(Clone, Copy, Debug, Default)]
pub struct MemPort {
    pending: bool,
    pending_pc: u64,
    pending_addr: u64,
    /// Line address of the pending access when a D-cache is attached.
    pending_line: Option<u64>,
    latency_remaining: u64,
    cached_data: u64,
    cached_data2: u64,
    load_done: bool,
    write_issued: bool,
}

impl MemPort {
    /// Performs (or replays) the memory access for one EX/MEM entry.
    pub fn access(
        &mut self,
        entry: &ExMemEntry,
        dcache: Option<&mut Cache>,
        mem: &mut Memory,
        drain: &mut StoreDrain,
    ) -> MemAccess {
        if !entry.mem_read && !entry.mem_write {
            self.pending = false;
            return MemAccess::default();
        }
        let addr = entry.alu_result;
        if self.pending && (self.pending_pc != entry.pc || self.pending_addr != addr) {
            self.pending = false;
        }

        if self.pending {
            if self.latency_remaining > 0 {
                self.latency_remaining -= 1;
            }
            if self.latency_remaining > 0 {
                return MemAccess {
                    data: 0,
                    data2: 0,
                    stall: true,
                };
            }
            // Miss latency elapsed, or a completed access replaying while a
            // sibling port holds the group.
            return self.complete(entry, mem, drain);
        }

        // Fresh access.
        self.pending = true;
        self.pending_pc = entry.pc;
        self.pending_addr = addr;
        self.pending_line = None;
        self.write_issued = false;
        self.load_done = false;

        let mut latency = 1;
        if let Some(cache) = dcache {
            let access = cache.access(addr);
            latency = access.latency;
            let line = cache.line_addr(addr);
            self.pending_line = Some(line);
            if entry.mem_read && drain.conflicts(line) {
                latency += STORE_FORWARD_LATENCY;
            }
        }
        if latency > 1 {
            self.latency_remaining = latency - 1;
            return MemAccess {
                data: 0,
                data2: 0,
                stall: true,
            };
        }
        self.latency_remaining = 0;
        self.complete(entry, mem, drain)
    }

    /// Finishes an access whose latency has elapsed. The data transfer
    /// happens exactly once per logical store; load replays return the
    /// cached result.
    fn complete(
        &mut self,
        entry: &ExMemEntry,
        mem: &mut Memory,
        drain: &mut StoreDrain,
    ) -> MemAccess {
        let addr = self.pending_addr;
        let size = entry.inst.mem_size();
        if entry.mem_write {
            if !self.write_issued {
                mem.write(addr, size, entry.store_value);
                if is_pair(entry) {
                    mem.write(addr.wrapping_add(size), size, entry.store_value2);
                }
                self.write_issued = true;
                if let Some(line) = self.pending_line {
                    drain.note_store(line);
                }
            }
            return MemAccess::default();
        }
        if !self.load_done {
            let raw = mem.read(addr, size);
            self.cached_data = entry.inst.extend_loaded(raw);
            self.cached_data2 = if is_pair(entry) {
                mem.read(addr.wrapping_add(size), size)
            } else {
                0
            };
            self.load_done = true;
        }
        MemAccess {
            data: self.cached_data,
            data2: self.cached_data2,
            stall: false,
        }
    }

    /// Clears pending state (used on flush).
    pub const fn reset(&mut self) {
        self.pending = false;
        self.pending_line = None;
        self.latency_remaining = 0;
        self.load_done = false;
        self.write_issued = false;
    }
}

/// True for load/store pair operations.
fn is_pair(entry: &ExMemEntry) -> bool {
    matches!(
        entry.inst.op,
        crate::isa::instruction::Op::Ldp | crate::isa::instruction::Op::Stp
    )
}

/// Tracks cache lines still draining a completed store.
///
/// A store is fire-and-forget for the pipeline, but a load touching the same
/// line within [`STORE_FORWARD_LATENCY`] cycles pays the forwarding penalty.
#[derive(Clone, Debug, Default)]
pub struct StoreDrain {
    lines: Vec<(u64, u64)>,
}

impl StoreDrain {
    /// Advances all drains by one cycle.
    pub fn tick(&mut self) {
        for (_, remaining) in &mut self.lines {
            *remaining -= 1;
        }
        self.lines.retain(|&(_, remaining)| remaining > 0);
    }

    /// Notes a completed store to `addr`'s line.
    pub fn note_store(&mut self, line_addr: u64) {
        if let Some(entry) = self.lines.iter_mut().find(|(line, _)| *line == line_addr) {
            entry.1 = STORE_FORWARD_LATENCY;
        } else {
            self.lines.push((line_addr, STORE_FORWARD_LATENCY));
        }
    }

    /// True when a load to `line_addr` must wait for a draining store.
    pub fn conflicts(&self, line_addr: u64) -> bool {
        self.lines.iter().any(|&(line, _)| line == line_addr)
    }

    /// Drops all drains (used on flush of the memory state in tests).
    pub fn clear(&mut self) {
        self.lines.clear();
    }
}
