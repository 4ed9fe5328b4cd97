//! Per-instruction execute latencies.
//!
//! This module defines the latency table driving the execute-stage countdown
//! and the memory-hierarchy constants consumed by the cached stages. Values
//! are calibrated to an M2-class core: single-cycle simple ALU, multi-cycle
//! multiplies and divides, and a short front-end mispredict penalty on top of
//! the flush refill.

use serde::Deserialize;

use crate::isa::instruction::{DecodedInst, Op};

/// Execute and memory-hierarchy latencies, in cycles.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct LatencyTable {
    /// Simple integer ALU operations.
    #[serde(default = "LatencyTable::default_alu")]
    pub alu: u64,

    /// Branch resolution in execute.
    #[serde(default = "LatencyTable::default_branch")]
    pub branch: u64,

    /// Extra fetch-hold cycles after a mispredict flush.
    #[serde(default = "LatencyTable::default_mispredict")]
    pub branch_mispredict_penalty: u64,

    /// Load address generation in execute (cache timing is modeled separately).
    #[serde(default = "LatencyTable::default_load")]
    pub load: u64,

    /// Store address generation in execute.
    #[serde(default = "LatencyTable::default_store")]
    pub store: u64,

    /// Integer multiply.
    #[serde(default = "LatencyTable::default_multiply")]
    pub multiply: u64,

    /// Integer divide, best case.
    #[serde(default = "LatencyTable::default_divide_min")]
    pub divide_min: u64,

    /// Integer divide, worst case (documented bound; issue timing uses the
    /// best case).
    #[serde(default = "LatencyTable::default_divide_max")]
    pub divide_max: u64,

    /// Supervisor call dispatch.
    #[serde(default = "LatencyTable::default_syscall")]
    pub syscall: u64,

    /// L1 hit latency.
    #[serde(default = "LatencyTable::default_l1")]
    pub l1_hit: u64,

    /// L2 hit latency.
    #[serde(default = "LatencyTable::default_l2")]
    pub l2_hit: u64,

    /// L3 hit latency.
    #[serde(default = "LatencyTable::default_l3")]
    pub l3_hit: u64,

    /// Main-memory access latency.
    #[serde(default = "LatencyTable::default_memory")]
    pub memory: u64,
}

impl LatencyTable {
    /// Returns the default simple-ALU latency.
    fn default_alu() -> u64 {
        1
    }

    /// Returns the default branch execute latency.
    fn default_branch() -> u64 {
        1
    }

    /// Returns the default extra mispredict penalty.
    fn default_mispredict() -> u64 {
        2
    }

    /// Returns the default load execute latency.
    fn default_load() -> u64 {
        1
    }

    /// Returns the default store execute latency.
    fn default_store() -> u64 {
        1
    }

    /// Returns the default multiply latency.
    fn default_multiply() -> u64 {
        3
    }

    /// Returns the default best-case divide latency.
    fn default_divide_min() -> u64 {
        8
    }

    /// Returns the default worst-case divide latency.
    fn default_divide_max() -> u64 {
        20
    }

    /// Returns the default syscall dispatch latency.
    fn default_syscall() -> u64 {
        1
    }

    /// Returns the default L1 hit latency.
    fn default_l1() -> u64 {
        1
    }

    /// Returns the default L2 hit latency.
    fn default_l2() -> u64 {
        10
    }

    /// Returns the default L3 hit latency.
    fn default_l3() -> u64 {
        30
    }

    /// Returns the default main-memory latency.
    fn default_memory() -> u64 {
        100
    }

    /// Execute-stage cycles for a decoded instruction.
    ///
    /// Loads and stores report their address-generation cost only; the cached
    /// memory stage accounts for the hierarchy.
    pub const fn get_latency(&self, inst: &DecodedInst) -> u64 {
        match inst.op {
            Op::Madd | Op::Msub | Op::Smulh | Op::Umulh => self.multiply,
            Op::Sdiv | Op::Udiv => self.divide_min,
            Op::Svc => self.syscall,
            Op::B
            | Op::Bl
            | Op::Bcond
            | Op::Cbz
            | Op::Cbnz
            | Op::Tbz
            | Op::Tbnz
            | Op::Br
            | Op::Blr
            | Op::Ret => self.branch,
            _ => {
                if inst.is_load() {
                    self.load
                } else if inst.is_store() {
                    self.store
                } else {
                    self.alu
                }
            }
        }
    }
}

impl Default for LatencyTable {
    fn default() -> Self {
        Self {
            alu: Self::default_alu(),
            branch: Self::default_branch(),
            branch_mispredict_penalty: Self::default_mispredict(),
            load: Self::default_load(),
            store: Self::default_store(),
            multiply: Self::default_multiply(),
            divide_min: Self::default_divide_min(),
            divide_max: Self::default_divide_max(),
            syscall: Self::default_syscall(),
            l1_hit: Self::default_l1(),
            l2_hit: Self::default_l2(),
            l3_hit: Self::default_l3(),
            memory: Self::default_memory(),
        }
    }
}
