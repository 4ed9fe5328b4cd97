//! Dispatch/issue arbitration for co-issue groups.
//!
//! Each cycle the decode stage offers up to `width` candidates in program
//! order. The arbiter admits a candidate only if it is structurally and
//! data-wise compatible with everything already admitted this cycle and with
//! the in-flight producer set. It enforces:
//! 1. **Slot Discipline:** Branches, supervisor calls, and fused pairs only in
//!    slot 0; serializing instructions issue alone.
//! 2. **Port Caps:** ALU, load, store, combined-memory, and write-port limits.
//! 3. **RAW Rules:** Same-cycle ALU-to-ALU forwarding with one-hop chain
//!    depth, the unconditional ALU-to-AGU path into load addresses, and
//!    rejection of same-cycle load consumers and store-data producers.
//! 4. **Base-Writeback Ordering:** Pre/post-indexed `rn` updates are
//!    un-forwardable; readers and writers of a pending base are rejected.
//! 5. **Speculation Gates:** No store issues behind an unresolved
//!    predicted-taken branch.
//!
//! Candidates that fail any check stay in IF/ID and are re-queued through the
//! instruction window. Only admitted operations occupy ports.

use super::latches::{FusionPayload, IfIdEntry};
use crate::common::constants::{
    MAX_ALU_PORTS, MAX_LOAD_PORTS, MAX_MEM_PORTS, MAX_STORE_PORTS, MAX_WRITE_PORTS, ZERO_REG,
};
use crate::isa::instruction::{DecodedInst, Op};

/// Per-group structural issue limits for one configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IssueLimits {
    /// ALU operations per group.
    pub alu_ports: usize,
    /// Loads per group.
    pub load_ports: usize,
    /// Stores per group.
    pub store_ports: usize,
    /// Combined memory operations per group (also the number of slots with a
    /// memory port).
    pub mem_ports: usize,
    /// Register-writing operations per group.
    pub write_ports: usize,
}

impl IssueLimits {
    /// Limits for a given issue width.
    ///
    /// Widths of 6 and above get the full M2-class port complement; narrower
    /// configurations are clamped to the width, with memory ports capped at 3.
    pub const fn for_width(width: usize) -> Self {
        if width >= 6 {
            Self {
                alu_ports: MAX_ALU_PORTS,
                load_ports: MAX_LOAD_PORTS,
                store_ports: MAX_STORE_PORTS,
                mem_ports: MAX_MEM_PORTS,
                write_ports: MAX_WRITE_PORTS,
            }
        } else {
            let load_ports = if width < 2 { width } else { 2 };
            let mem_ports = if width < 3 { width } else { 3 };
            Self {
                alu_ports: width,
                load_ports,
                store_ports: 1,
                mem_ports,
                write_ports: width,
            }
        }
    }
}

/// Why a candidate could not join the current issue group.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reject {
    /// Branches, SVC, and fused pairs only issue from slot 0.
    NotPrimary,
    /// A serializing instruction (SVC or undecodable word) owns the group.
    Serialized,
    /// A required port (slot, ALU, load, store, memory, write) is exhausted.
    PortCap,
    /// Reads a register produced by a same-cycle load.
    LoadProducer,
    /// Store data cannot take the same-cycle forwarding path.
    StoreValueRaw,
    /// Same-cycle forwarding chain would exceed one hop.
    ChainDepth,
    /// Reads or writes a pending pre/post-index base update.
    BaseWriteback,
    /// Depends on (or writes past) a candidate skipped earlier this cycle.
    SkippedDependence,
    /// Needs flags from a compare that has not issued.
    FlagDependence,
    /// Load may not pass a same-address store in its own group.
    StoreLoadOrdering,
    /// Consumer of an in-flight load's destination (load-use hazard).
    LoadUse,
    /// Store in the shadow of an unresolved predicted-taken branch.
    SpeculativeStore,
}

impl Reject {
    /// Whether the rejection counts as a data (RAW) or structural stall.
    pub const fn is_data_hazard(&self) -> bool {
        matches!(
            self,
            Self::LoadProducer
                | Self::StoreValueRaw
                | Self::ChainDepth
                | Self::BaseWriteback
                | Self::SkippedDependence
                | Self::FlagDependence
                | Self::StoreLoadOrdering
                | Self::LoadUse
        )
    }
}

/// Successful admission: the issue slot taken and forwarding metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Admitted {
    /// ID/EX slot the candidate occupies.
    pub slot: usize,
    /// Candidate consumes a same-cycle ALU result.
    pub forwarded: bool,
}

/// Bookkeeping for one admitted candidate.
#[derive(Clone, Copy, Debug)]
struct IssuedOp {
    /// Destination register, or 31 when none.
    rd: u8,
    /// Pending pre/post base update register.
    base_wb: Option<u8>,
    is_load: bool,
    /// Producer itself consumed a same-cycle forward (chain-depth limit).
    forwarded: bool,
    /// Store address key for same-group ordering checks.
    store_key: Option<(u8, i64)>,
}

/// Arbitration state for one cycle's issue group.
#[derive(Debug)]
pub struct IssueGroup {
    limits: IssueLimits,
    /// Destinations of loads currently in ID/EX (load-use window).
    inflight_load_rds: Vec<u8>,
    /// Base registers with un-retired pre/post updates in ID/EX or EX/MEM.
    pending_base_wb: Vec<u8>,
    issued: Vec<IssuedOp>,
    /// Destination registers of skipped candidates (program-order fence).
    skipped_writes: Vec<u8>,
    skipped_any: bool,
    skipped_sets_flags: bool,
    /// A branch was skipped: nothing younger may issue, or its shadow could
    /// commit before any checkpoint exists.
    skipped_branch: bool,
    alu_count: usize,
    load_count: usize,
    store_count: usize,
    mem_count: usize,
    write_count: usize,
    /// An admitted predicted-taken branch is still unresolved.
    taken_branch_in_group: bool,
    serialized: bool,
}

impl IssueGroup {
    /// Starts a new issue group.
    ///
    /// # Arguments
    ///
    /// * `limits` - Structural limits for the configured width.
    /// * `inflight_load_rds` - Destinations of loads presently in ID/EX.
    /// * `pending_base_wb` - Base registers of pre/post-indexed operations
    ///   that have not yet retired.
    pub fn new(limits: IssueLimits, inflight_load_rds: Vec<u8>, pending_base_wb: Vec<u8>) -> Self {
        Self {
            limits,
            inflight_load_rds,
            pending_base_wb,
            issued: Vec::new(),
            skipped_writes: Vec::new(),
            skipped_any: false,
            skipped_sets_flags: false,
            skipped_branch: false,
            alu_count: 0,
            load_count: 0,
            store_count: 0,
            mem_count: 0,
            write_count: 0,
            taken_branch_in_group: false,
            serialized: false,
        }
    }

    /// Number of candidates admitted so far.
    pub fn issued_count(&self) -> usize {
        self.issued.len()
    }

    /// Records a candidate that stays in IF/ID, fencing later dependents.
    pub fn note_skipped(&mut self, inst: &DecodedInst) {
        self.skipped_any = true;
        if inst.set_flags {
            self.skipped_sets_flags = true;
        }
        if inst.is_branch() {
            self.skipped_branch = true;
        }
        if inst.writes_reg() && inst.rd != ZERO_REG {
            self.skipped_writes.push(inst.rd);
        }
        if let Some(base) = inst.base_writeback() {
            self.skipped_writes.push(base);
        }
    }

    /// Registers read by a candidate, with the load-address read kept apart
    /// for the ALU-to-AGU exemption. Fused pairs read the compare's sources.
    fn source_regs(inst: &DecodedInst, fusion: Option<&FusionPayload>) -> (Vec<u8>, Option<u8>) {
        if let Some(payload) = fusion {
            let mut reads = vec![payload.rn];
            if !payload.is_imm {
                reads.push(payload.rm);
            }
            return (reads, None);
        }
        let mut reads = Vec::new();
        let mut addr_read = None;
        if inst.uses_rn() {
            if inst.is_load() {
                addr_read = Some(inst.rn);
            } else {
                reads.push(inst.rn);
            }
        }
        if inst.uses_rm() {
            reads.push(inst.rm);
        }
        if inst.reads_rd() {
            reads.push(inst.rd);
        }
        if inst.uses_rt2() {
            reads.push(inst.rt2);
        }
        (reads, addr_read)
    }

    /// Attempts to admit the next candidate in program order.
    ///
    /// On rejection the candidate must be re-queued and
    /// [`Self::note_skipped`] called for it.
    pub fn try_admit(
        &mut self,
        inst: &DecodedInst,
        entry: &IfIdEntry,
        fusion: Option<&FusionPayload>,
    ) -> Result<Admitted, Reject> {
        if self.serialized {
            return Err(Reject::Serialized);
        }
        if self.skipped_branch {
            // Nothing passes a held branch: its shadow would commit with no
            // checkpoint to roll back to.
            return Err(Reject::SkippedDependence);
        }
        let slot = self.issued.len();
        let serializing = matches!(inst.op, Op::Svc | Op::Udf);
        let primary_only = inst.is_branch() || serializing || fusion.is_some();

        if primary_only && (slot != 0 || self.skipped_any) {
            return Err(Reject::NotPrimary);
        }
        // Speculative stores cannot be rolled back.
        if inst.is_store() && (entry.after_branch || self.taken_branch_in_group) {
            return Err(Reject::SpeculativeStore);
        }

        // Memory ops may not bypass a skipped candidate: the memory order
        // against the held instruction would be unrecoverable. Flag readers
        // are fenced by a skipped compare.
        if self.skipped_any {
            if inst.is_mem() {
                return Err(Reject::SkippedDependence);
            }
            if inst.reads_flags() && self.skipped_sets_flags {
                return Err(Reject::FlagDependence);
            }
        }

        // Structural port accounting (admitted ops only).
        if inst.is_mem() {
            if slot >= self.limits.mem_ports || self.mem_count >= self.limits.mem_ports {
                return Err(Reject::PortCap);
            }
            if inst.is_load() && self.load_count >= self.limits.load_ports {
                return Err(Reject::PortCap);
            }
            if inst.is_store() && self.store_count >= self.limits.store_ports {
                return Err(Reject::PortCap);
            }
        } else if !inst.is_branch() && !serializing && !matches!(inst.op, Op::Nop) {
            if self.alu_count >= self.limits.alu_ports {
                return Err(Reject::PortCap);
            }
        }
        // Effective write destination: a fused compare keeps its result.
        let write_rd = match fusion {
            Some(payload) => payload.rd,
            None if inst.writes_reg() => inst.rd,
            None => ZERO_REG,
        };
        let writes = write_rd != ZERO_REG;
        if (writes || inst.base_writeback().is_some()) && self.write_count >= self.limits.write_ports
        {
            return Err(Reject::PortCap);
        }

        let (reads, addr_read) = Self::source_regs(inst, fusion);

        // Load-use: consumers of an in-flight load's destination wait in
        // IF/ID; independent instructions may still pass them.
        for &load_rd in &self.inflight_load_rds {
            if load_rd == ZERO_REG {
                continue;
            }
            if reads.contains(&load_rd) || addr_read == Some(load_rd) {
                return Err(Reject::LoadUse);
            }
        }

        // Dependences on skipped candidates fence both reads and writes.
        for &skipped in &self.skipped_writes {
            if reads.contains(&skipped) || addr_read == Some(skipped) {
                return Err(Reject::SkippedDependence);
            }
            if (writes && write_rd == skipped)
                || inst.base_writeback().is_some_and(|b| b == skipped)
            {
                return Err(Reject::SkippedDependence);
            }
        }

        // Pending base updates are un-forwardable in every direction.
        for &base in &self.pending_base_wb {
            if reads.contains(&base)
                || addr_read == Some(base)
                || (writes && write_rd == base)
                || inst.base_writeback().is_some_and(|b| b == base)
            {
                return Err(Reject::BaseWriteback);
            }
        }

        // RAW against already-admitted producers.
        let mut forwarded = false;
        for producer in &self.issued {
            if let Some(base) = producer.base_wb {
                if reads.contains(&base)
                    || addr_read == Some(base)
                    || (writes && write_rd == base)
                    || inst.base_writeback().is_some_and(|b| b == base)
                {
                    return Err(Reject::BaseWriteback);
                }
            }
            if producer.rd == ZERO_REG {
                continue;
            }
            if inst.base_writeback().is_some_and(|b| b == producer.rd) {
                // Pre/post writer over a register still owed by this group.
                return Err(Reject::BaseWriteback);
            }
            let feeds_value = reads.contains(&producer.rd);
            let feeds_addr = addr_read == Some(producer.rd);
            if !feeds_value && !feeds_addr {
                continue;
            }
            if feeds_value && inst.is_store() && inst.reads_rd() && producer.rd == inst.rd {
                // No same-cycle path into the store-data input.
                return Err(Reject::StoreValueRaw);
            }
            if producer.is_load {
                return Err(Reject::LoadProducer);
            }
            if feeds_addr {
                // ALU-to-AGU: a load's address accepts any same-cycle ALU
                // result, chained or not.
                continue;
            }
            if producer.forwarded {
                return Err(Reject::ChainDepth);
            }
            forwarded = true;
        }

        // Loads may not pass a same-group store to the same address.
        if inst.is_load() {
            let key = (inst.rn, inst.signed_imm);
            for producer in &self.issued {
                if producer.store_key == Some(key) {
                    return Err(Reject::StoreLoadOrdering);
                }
            }
        }

        // Admission.
        if serializing {
            self.serialized = true;
        }
        if inst.is_branch() && entry.predicted_taken && !entry.early_resolved {
            self.taken_branch_in_group = true;
        }
        if inst.is_mem() {
            self.mem_count += 1;
            if inst.is_load() {
                self.load_count += 1;
            } else {
                self.store_count += 1;
            }
        } else if !inst.is_branch() && !serializing && !matches!(inst.op, Op::Nop) {
            self.alu_count += 1;
        }
        if writes || inst.base_writeback().is_some() {
            self.write_count += 1;
        }
        self.issued.push(IssuedOp {
            rd: write_rd,
            base_wb: inst.base_writeback(),
            is_load: inst.is_load(),
            forwarded,
            store_key: if inst.is_store() {
                Some((inst.rn, inst.signed_imm))
            } else {
                None
            },
        });
        Ok(Admitted { slot, forwarded })
    }
}
