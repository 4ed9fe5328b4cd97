//! Data hazard detection and operand forwarding.
//!
//! This module implements the logic for maintaining pipeline consistency when
//! data dependencies exist between instructions. It provides:
//! 1. **Hazard Detection:** Load-use hazards that require a consumer to wait
//!    in IF/ID.
//! 2. **Operand Forwarding:** Read-after-write resolution that bypasses the
//!    register file from the EX/MEM and MEM/WB latches.
//! 3. **Wide Support:** Youngest-wins scans over every slot of both latch
//!    arrays, plus flag-value selection mirroring the operand logic.
//!
//! All functions here are pure; the tick engine and the issue arbiter call
//! them against captured prior-cycle latch state.

use super::latches::{ExMemEntry, IdExEntry, MemWbEntry};
use crate::common::constants::ZERO_REG;
use crate::isa::instruction::DecodedInst;

/// Where a source operand's value comes from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ForwardSource {
    /// Register file value is current.
    #[default]
    None,
    /// Bypass from the EX/MEM latch (one-cycle-old ALU result).
    FromExMem,
    /// Bypass from the MEM/WB latch (two-cycle-old result or load data).
    FromMemWb,
}

/// Forwarding decision for one ID/EX entry's three register sources.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ForwardingDecision {
    /// Source for the `rn` operand.
    pub rn_src: ForwardSource,
    /// Source for the `rm` operand.
    pub rm_src: ForwardSource,
    /// Source for the `rd`-as-source operand (store data, `MOVK`).
    pub rd_src: ForwardSource,
}

/// True when `producer_rd` is a forwardable destination matching `source`.
fn matches_dest(producer_rd: u8, source: u8) -> bool {
    producer_rd != ZERO_REG && producer_rd == source
}

/// Decides the forwarding source for each register read by `entry`.
///
/// EX/MEM wins over MEM/WB when both carry the register: the EX/MEM value is
/// younger. Loads still in EX/MEM cannot forward (their data arrives at the
/// end of the memory stage); the issue arbiter keeps consumers out of that
/// window.
pub fn detect_forwarding(
    entry: &IdExEntry,
    exmem: &ExMemEntry,
    memwb: &MemWbEntry,
) -> ForwardingDecision {
    let mut decision = ForwardingDecision::default();
    let inst = &entry.inst;

    let pick = |reg: u8, used: bool| -> ForwardSource {
        if !used || reg == ZERO_REG {
            return ForwardSource::None;
        }
        if exmem.valid && exmem.reg_write && !exmem.mem_read && matches_dest(exmem.rd, reg) {
            return ForwardSource::FromExMem;
        }
        if memwb.valid && memwb.reg_write && matches_dest(memwb.rd, reg) {
            return ForwardSource::FromMemWb;
        }
        ForwardSource::None
    };

    decision.rn_src = pick(inst.rn, inst.uses_rn());
    decision.rm_src = pick(inst.rm, inst.uses_rm());
    decision.rd_src = pick(inst.rd, inst.reads_rd());
    decision
}

/// Materializes a forwarded value chosen by [`detect_forwarding`].
///
/// For a MEM/WB source the load data is taken when the producer writes back
/// from memory, otherwise its ALU result.
pub const fn get_forwarded_value(
    src: ForwardSource,
    original: u64,
    exmem: &ExMemEntry,
    memwb: &MemWbEntry,
) -> u64 {
    match src {
        ForwardSource::None => original,
        ForwardSource::FromExMem => exmem.alu_result,
        ForwardSource::FromMemWb => {
            if memwb.mem_to_reg {
                memwb.mem_data
            } else {
                memwb.alu_result
            }
        }
    }
}

/// Core load-use test against already-extracted consumer fields.
///
/// A load writing register 31 produces nothing visible and never stalls a
/// consumer.
pub const fn detect_load_use_hazard_decoded(
    load_rd: u8,
    next_rn: u8,
    next_rm: u8,
    uses_rn: bool,
    uses_rm: bool,
) -> bool {
    if load_rd == ZERO_REG {
        return false;
    }
    (uses_rn && next_rn == load_rd) || (uses_rm && next_rm == load_rd)
}

/// Load-use test for a decoded consumer, covering all four register sources.
///
/// The ALU-to-AGU exemption does not apply here: it covers same-cycle ALU
/// producers, while an in-flight load's data is simply not available yet, no
/// matter which input wants it.
pub fn detect_load_use_hazard_for_inst(load_rd: u8, inst: &DecodedInst) -> bool {
    if load_rd == ZERO_REG {
        return false;
    }
    (inst.uses_rn() && inst.rn == load_rd)
        || (inst.uses_rm() && inst.rm == load_rd)
        || (inst.reads_rd() && inst.rd == load_rd)
        || (inst.uses_rt2() && inst.rt2 == load_rd)
}

/// Stall/flush control wires for the single-issue in-order path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StallControl {
    /// Hold the IF/ID latch (refetch the same instruction).
    pub stall_if: bool,
    /// Hold the ID stage (no new issue).
    pub stall_id: bool,
    /// Insert a bubble into execute.
    pub insert_bubble_ex: bool,
    /// Clear the IF/ID latch (taken-branch redirect).
    pub flush_if: bool,
    /// Clear the ID/EX latch.
    pub flush_id: bool,
}

/// The canonical in-order stall table.
///
/// A load-use hazard holds fetch and decode and bubbles execute for one
/// cycle; a taken branch flushes the two front stages.
pub const fn compute_stalls(load_use_hazard: bool, branch_taken: bool) -> StallControl {
    StallControl {
        stall_if: load_use_hazard,
        stall_id: load_use_hazard,
        insert_bubble_ex: load_use_hazard,
        flush_if: branch_taken && !load_use_hazard,
        flush_id: branch_taken && !load_use_hazard,
    }
}

/// Youngest-wins scan of both latch arrays for a register's current value.
///
/// Priority: EX/MEM (youngest slot first), then MEM/WB (youngest slot first),
/// then the architectural `fallback`. Loads in EX/MEM are skipped; their data
/// is not available until the memory stage completes.
pub fn forward_operand(
    reg: u8,
    fallback: u64,
    exmem: &[ExMemEntry],
    memwb: &[MemWbEntry],
) -> u64 {
    if reg == ZERO_REG {
        return 0;
    }
    for entry in exmem.iter().rev() {
        if entry.valid && entry.reg_write && !entry.mem_read && entry.rd == reg {
            return entry.alu_result;
        }
    }
    for entry in memwb.iter().rev() {
        if entry.valid && entry.reg_write && entry.rd == reg {
            return if entry.mem_to_reg {
                entry.mem_data
            } else {
                entry.alu_result
            };
        }
    }
    fallback
}

/// Selects flag values the way operands are forwarded: youngest prior-cycle
/// EX/MEM producer wins, else the architectural flags.
pub fn forward_flags(exmem: &[ExMemEntry], fallback: (bool, bool, bool, bool)) -> (bool, bool, bool, bool) {
    for entry in exmem.iter().rev() {
        if entry.valid && entry.sets_flags {
            return (entry.n, entry.z, entry.c, entry.v);
        }
    }
    fallback
}
