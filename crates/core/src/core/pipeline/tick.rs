//! The wide tick engine.
//!
//! One call to [`Pipeline::tick`] advances every stage by one cycle. Stages
//! are computed in reverse pipeline order so each reads the previous cycle's
//! latches before anything overwrites them; all outputs are gathered into
//! `next_*` locals and latched together at the end, modeling a rising clock
//! edge. The stall rules are:
//!
//! - **Memory stall:** any memory port still counting a miss holds EX/MEM,
//!   ID/EX, IF/ID, and the window; MEM/WB receives bubbles (its previous
//!   contents retired this cycle).
//! - **Exec stall:** a slot still counting execute latency holds itself and
//!   every younger slot of its group; older slots drain ahead. No new issue
//!   while any slot counts, which keeps retirement in program order.
//! - **Mispredict:** flush IF/ID, ID/EX, and the window; clear same-cycle
//!   results younger than the branch; restore the register checkpoint;
//!   redirect fetch and hold it for the configured penalty.

use tracing::{debug, trace};

use super::Pipeline;
use super::fusion;
use super::hazards;
use super::issue::{IssueGroup, Reject};
use super::latches::{ExMemEntry, FusionPayload, IdExEntry, IfIdEntry, MemWbEntry};
use crate::common::constants::{INSTRUCTION_SIZE, MAX_ISSUE_WIDTH, ZERO_REG};
use crate::core::arch::RegisterFile;
use crate::core::units::alu;
use crate::isa::instruction::{DecodedInst, Format, Op};
use crate::isa::{branch as branch_isa, decode};

/// Outcome of resolving one branch at execute.
struct Resolution {
    taken: bool,
    target: u64,
    correct: bool,
    correct_next: u64,
    /// Arithmetic result of a fused compare with a live destination.
    fused_value: Option<u64>,
}

/// Looks up an operand with same-cycle results preferred, then the prior
/// latches, then the register file.
fn resolve_operand(
    reg: u8,
    cycle_table: &[Option<u64>; 32],
    regs: &RegisterFile,
    exmem: &[super::latches::ExMemEntry],
    memwb: &[super::latches::MemWbEntry],
) -> u64 {
    if reg >= ZERO_REG {
        return 0;
    }
    if let Some(value) = cycle_table[reg as usize] {
        return value;
    }
    hazards::forward_operand(reg, regs.read(reg), exmem, memwb)
}

impl Pipeline {
    /// Advances the pipeline by exactly one cycle.
    pub(super) fn tick_once(&mut self) {
        self.stats.cycles += 1;
        self.store_drain.tick();
        let w = self.width;

        // ------------------------------------------------------------------
        // Writeback: retire slots 0..w-1 in program order.
        // ------------------------------------------------------------------
        for slot in 0..w {
            let wb = self.memwb[slot];
            if !wb.valid {
                continue;
            }
            if wb.reg_write && wb.rd != ZERO_REG {
                let value = if wb.mem_to_reg { wb.mem_data } else { wb.alu_result };
                self.regs.write(wb.rd, value);
                self.checkpoint.note_retire(wb.rd, value);
            }
            if wb.inst.op == Op::Ldp && wb.inst.rt2 != ZERO_REG {
                self.regs.write(wb.inst.rt2, wb.mem_data2);
                self.checkpoint.note_retire(wb.inst.rt2, wb.mem_data2);
            }
            if let Some((reg, value)) = wb.base_writeback {
                self.regs.write(reg, value);
                self.checkpoint.note_retire(reg, value);
            }
            self.stats.instructions += if wb.is_fused { 2 } else { 1 };
            trace!(pc = wb.pc, retired = self.stats.instructions, "retire");
        }
        if let Some(cap) = self.max_instructions {
            if self.stats.instructions >= cap {
                debug!(cap, "instruction cap reached");
                self.halted = true;
                self.exit_code = 0;
                return;
            }
        }

        // ------------------------------------------------------------------
        // Memory: port accesses first so a stalling port is known before any
        // irreversible work (syscall dispatch) happens.
        // ------------------------------------------------------------------
        let mut next_memwb = [MemWbEntry::default(); MAX_ISSUE_WIDTH];
        let mut port_results = [super::ports::MemAccess::default(); MAX_ISSUE_WIDTH];
        let mut mem_stall = false;
        for slot in 0..w {
            let ex = self.exmem[slot];
            if !ex.valid || (!ex.mem_read && !ex.mem_write) {
                continue;
            }
            let result = self.mem_ports[slot].access(
                &ex,
                self.dcache.as_mut(),
                &mut self.mem,
                &mut self.store_drain,
            );
            if result.stall {
                mem_stall = true;
            }
            port_results[slot] = result;
        }
        if mem_stall {
            // The previous MEM/WB contents retired above; only bubbles may
            // follow them while the group replays.
            self.memwb = [MemWbEntry::default(); MAX_ISSUE_WIDTH];
            self.stats.memory_stalls += 1;
            trace!("memory stall");
            return;
        }
        for slot in 0..w {
            let ex = self.exmem[slot];
            if !ex.valid {
                continue;
            }
            if slot == 0 && ex.inst.op == Op::Svc {
                let outcome = self.syscall.handle(&mut self.regs, &mut self.mem);
                if outcome.exited {
                    debug!(code = outcome.exit_code, "guest exit");
                    self.halted = true;
                    self.exit_code = outcome.exit_code;
                    return;
                }
            }
            if slot == 0 && ex.inst.op == Op::Udf {
                debug!(pc = ex.pc, "unknown instruction");
                self.halted = true;
                self.exit_code = -1;
                return;
            }
            next_memwb[slot] = MemWbEntry {
                valid: true,
                pc: ex.pc,
                inst: ex.inst,
                alu_result: ex.alu_result,
                mem_data: port_results[slot].data,
                mem_data2: port_results[slot].data2,
                rd: ex.rd,
                reg_write: ex.reg_write,
                mem_to_reg: ex.mem_to_reg,
                is_fused: ex.is_fused,
                base_writeback: ex.base_writeback,
            };
        }

        // ------------------------------------------------------------------
        // Execute: count down latencies, then run ready slots oldest-first.
        // ------------------------------------------------------------------
        let mut next_exmem = [ExMemEntry::default(); MAX_ISSUE_WIDTH];
        let mut stall_from = w;
        for slot in 0..w {
            if self.idex[slot].valid && self.idex[slot].latency_remaining > 1 {
                self.idex[slot].latency_remaining -= 1;
                if stall_from == w {
                    stall_from = slot;
                }
            }
        }

        // Same-cycle forwarding table: youngest completed result per register.
        let mut cycle_table: [Option<u64>; 32] = [None; 32];
        let mut cycle_flags: Option<(bool, bool, bool, bool)> = None;
        let mut mispredict: Option<u64> = None;

        for slot in 0..stall_from {
            let id = self.idex[slot];
            if !id.valid {
                continue;
            }
            let inst = id.inst;

            if inst.is_branch() {
                if !self.checkpoint.valid {
                    self.checkpoint.capture(&self.regs, self.pstate);
                }
                let res = self.resolve_branch(&id, &cycle_table, cycle_flags);
                self.predictor.update(id.pc, res.taken, res.target);
                self.predictor.note_resolution(res.correct);
                if res.correct {
                    self.checkpoint.discard();
                    self.after_branch = false;
                    self.window.clear_after_branch();
                    for entry in &mut self.ifid {
                        entry.after_branch = false;
                    }
                } else {
                    mispredict = Some(res.correct_next);
                }
                // A fused compare keeps its arithmetic result; BL/BLR keep
                // the link value.
                let (branch_rd, branch_result) = match (&id.fusion, res.fused_value) {
                    (Some(payload), Some(value)) => (payload.rd, value),
                    _ => (inst.rd, id.pc.wrapping_add(INSTRUCTION_SIZE)),
                };
                let branch_writes =
                    (inst.writes_reg() || res.fused_value.is_some()) && branch_rd != ZERO_REG;
                next_exmem[slot] = ExMemEntry {
                    valid: true,
                    pc: id.pc,
                    inst,
                    alu_result: branch_result,
                    rd: branch_rd,
                    reg_write: branch_writes,
                    is_fused: id.fusion.is_some(),
                    ..Default::default()
                };
                if branch_writes {
                    cycle_table[branch_rd as usize] = Some(branch_result);
                }
                if mispredict.is_some() {
                    // Younger same-cycle slots are wrong-path work.
                    break;
                }
                continue;
            }

            let rn_val = resolve_operand(
                inst.rn,
                &cycle_table,
                &self.regs,
                &self.exmem[..w],
                &self.memwb[..w],
            );
            let rm_val = resolve_operand(
                inst.rm,
                &cycle_table,
                &self.regs,
                &self.exmem[..w],
                &self.memwb[..w],
            );
            let rd_val = resolve_operand(
                inst.rd,
                &cycle_table,
                &self.regs,
                &self.exmem[..w],
                &self.memwb[..w],
            );
            let rt2_val = resolve_operand(
                inst.rt2,
                &cycle_table,
                &self.regs,
                &self.exmem[..w],
                &self.memwb[..w],
            );

            let mut entry = ExMemEntry {
                valid: true,
                pc: id.pc,
                inst,
                rd: inst.rd,
                reg_write: inst.writes_reg(),
                ..Default::default()
            };

            if inst.is_mem() {
                let (addr, writeback) = alu::compute_address(&inst, rn_val, rm_val);
                entry.alu_result = addr;
                entry.mem_read = inst.is_load();
                entry.mem_write = inst.is_store();
                entry.mem_to_reg = inst.is_load();
                entry.store_value = rd_val;
                entry.store_value2 = rt2_val;
                entry.base_writeback = writeback.map(|value| (inst.rn, value));
            } else if matches!(inst.op, Op::Svc | Op::Udf | Op::Nop) {
                entry.reg_write = false;
            } else {
                let flags_in = cycle_flags.map_or(
                    hazards::forward_flags(
                        &self.exmem[..w],
                        (self.pstate.n, self.pstate.z, self.pstate.c, self.pstate.v),
                    ),
                    |f| f,
                );
                let extra = if inst.op == Op::Movk { rd_val } else { rt2_val };
                let pstate_in = crate::core::arch::Pstate {
                    n: flags_in.0,
                    z: flags_in.1,
                    c: flags_in.2,
                    v: flags_in.3,
                };
                let out = alu::execute_data(&inst, id.pc, rn_val, rm_val, extra, pstate_in);
                entry.alu_result = out.value;
                if let Some((n, z, c, v)) = out.nzcv {
                    entry.sets_flags = true;
                    entry.n = n;
                    entry.z = z;
                    entry.c = c;
                    entry.v = v;
                    self.pstate.set_nzcv(n, z, c, v);
                    cycle_flags = Some((n, z, c, v));
                }
                if entry.reg_write && entry.rd != ZERO_REG {
                    cycle_table[entry.rd as usize] = Some(entry.alu_result);
                }
            }
            next_exmem[slot] = entry;
        }

        if let Some(correct_pc) = mispredict {
            self.handle_mispredict(correct_pc, &mut next_exmem, &next_memwb);
            return;
        }

        let exec_stall = stall_from < w;
        if exec_stall {
            self.stats.exec_stalls += 1;
            let mut next_idex = [IdExEntry::default(); MAX_ISSUE_WIDTH];
            for slot in stall_from..w {
                next_idex[slot] = self.idex[slot];
            }
            self.memwb = next_memwb;
            self.exmem = next_exmem;
            self.idex = next_idex;
            return;
        }

        // ------------------------------------------------------------------
        // Decode / dispatch: admit IF/ID candidates under the issue rules.
        // ------------------------------------------------------------------
        let mut next_idex = [IdExEntry::default(); MAX_ISSUE_WIDTH];
        let mut consumed = [false; MAX_ISSUE_WIDTH];
        let mut hold_fetch = false;

        let inflight_loads: Vec<u8> = self.idex[..w]
            .iter()
            .filter(|entry| entry.valid && entry.inst.is_load())
            .map(|entry| entry.inst.rd)
            .collect();
        let pending_base_wb: Vec<u8> = self.idex[..w]
            .iter()
            .filter(|entry| entry.valid)
            .filter_map(|entry| entry.inst.base_writeback())
            .collect();

        let mut group = IssueGroup::new(self.limits, inflight_loads, pending_base_wb);
        let mut candidates: [Option<DecodedInst>; MAX_ISSUE_WIDTH] = [None; MAX_ISSUE_WIDTH];
        for slot in 0..w {
            if self.ifid[slot].valid {
                candidates[slot] = Some(
                    decode::decode(self.ifid[slot].inst_word).unwrap_or(DecodedInst {
                        op: Op::Udf,
                        format: Format::System,
                        ..Default::default()
                    }),
                );
            }
        }

        let mut raw_reject = false;
        let mut structural_reject = false;
        let mut slot0_load_use = false;

        // Fusion: adjacent compare + conditional branch in slots 0 and 1.
        let fused_pair = match (&candidates[0], &candidates[1]) {
            (Some(cmp), Some(br)) => fusion::try_fuse(cmp, br),
            _ => None,
        };
        if let Some(mut payload) = fused_pair {
            let branch_inst = candidates[1].unwrap_or_default();
            match group.try_admit(&branch_inst, &self.ifid[1], Some(&payload)) {
                Ok(admitted) => {
                    payload.rn_val = self.regs.read(payload.rn);
                    payload.rm_val = self.regs.read(payload.rm);
                    next_idex[admitted.slot] = IdExEntry {
                        valid: true,
                        pc: self.ifid[1].pc,
                        inst: branch_inst,
                        latency_remaining: self.latency.get_latency(&branch_inst),
                        predicted_taken: self.ifid[1].predicted_taken,
                        predicted_target: self.ifid[1].predicted_target,
                        early_resolved: self.ifid[1].early_resolved,
                        fusion: Some(payload),
                        ..Default::default()
                    };
                    consumed[0] = true;
                    consumed[1] = true;
                    self.stats.fused_pairs += 1;
                }
                Err(reject) => {
                    // Fall through: both halves arbitrate separately below.
                    trace!(?reject, "fusion suppressed");
                }
            }
        }

        for slot in 0..w {
            if consumed[slot] {
                continue;
            }
            let Some(inst) = candidates[slot] else { continue };
            match group.try_admit(&inst, &self.ifid[slot], None) {
                Ok(admitted) => {
                    next_idex[admitted.slot] = IdExEntry {
                        valid: true,
                        pc: self.ifid[slot].pc,
                        inst,
                        rn_val: self.regs.read(inst.rn),
                        rm_val: self.regs.read(inst.rm),
                        rd_val: self.regs.read(inst.rd),
                        rt2_val: self.regs.read(inst.rt2),
                        latency_remaining: self.latency.get_latency(&inst),
                        predicted_taken: self.ifid[slot].predicted_taken,
                        predicted_target: self.ifid[slot].predicted_target,
                        early_resolved: self.ifid[slot].early_resolved,
                        fusion: None,
                    };
                    consumed[slot] = true;
                }
                Err(reject) => {
                    group.note_skipped(&inst);
                    if reject.is_data_hazard() {
                        raw_reject = true;
                    } else {
                        structural_reject = true;
                    }
                    if slot == 0 && reject == Reject::LoadUse {
                        slot0_load_use = true;
                    }
                    trace!(pc = self.ifid[slot].pc, ?reject, "issue reject");
                }
            }
        }
        if raw_reject {
            self.stats.raw_hazard_stalls += 1;
        }
        if structural_reject {
            self.stats.structural_hazard_stalls += 1;
        }
        if w == 1 && slot0_load_use {
            // The canonical single-issue stall table: hold fetch, bubble EX.
            let control = hazards::compute_stalls(true, false);
            hold_fetch = control.stall_if;
        }

        // ------------------------------------------------------------------
        // Fetch: re-queue unissued entries, refill the window, drain to IF/ID.
        // ------------------------------------------------------------------
        let mut next_ifid = [IfIdEntry::default(); MAX_ISSUE_WIDTH];
        self.window.push_unconsumed(&self.ifid[..w], &consumed[..w]);
        if self.redirect_stall > 0 {
            self.redirect_stall -= 1;
            self.stats.branch_mispredict_stalls += 1;
        } else if !hold_fetch {
            self.fetch_into_window();
        }
        self.window.pop_to_ifid(&mut next_ifid[..w], w);

        // ------------------------------------------------------------------
        // Latch.
        // ------------------------------------------------------------------
        self.memwb = next_memwb;
        self.exmem = next_exmem;
        self.idex = next_idex;
        self.ifid = next_ifid;
    }

    /// Resolves a branch in execute, returning direction, target, and the
    /// verification verdict against the fetch-time prediction.
    fn resolve_branch(
        &self,
        id: &IdExEntry,
        cycle_table: &[Option<u64>; 32],
        cycle_flags: Option<(bool, bool, bool, bool)>,
    ) -> Resolution {
        let inst = id.inst;
        let w = self.width;
        let fall_through = id.pc.wrapping_add(INSTRUCTION_SIZE);
        let mut fused_value = None;

        let (taken, target) = match inst.op {
            Op::B | Op::Bl => (true, id.pc.wrapping_add(inst.branch_offset as u64)),
            Op::Br | Op::Blr | Op::Ret => {
                let target = resolve_operand(
                    inst.rn,
                    cycle_table,
                    &self.regs,
                    &self.exmem[..w],
                    &self.memwb[..w],
                );
                (true, target)
            }
            Op::Bcond => {
                let (n, z, c, v) = if let Some(payload) = &id.fusion {
                    let (value, flags) = self.evaluate_fused_compare(payload, cycle_table);
                    if payload.rd != ZERO_REG {
                        fused_value = Some(value);
                    }
                    flags
                } else {
                    cycle_flags.map_or(
                        hazards::forward_flags(
                            &self.exmem[..w],
                            (self.pstate.n, self.pstate.z, self.pstate.c, self.pstate.v),
                        ),
                        |f| f,
                    )
                };
                (
                    inst.cond.holds(n, z, c, v),
                    id.pc.wrapping_add(inst.branch_offset as u64),
                )
            }
            Op::Cbz | Op::Cbnz => {
                let val = resolve_operand(
                    inst.rd,
                    cycle_table,
                    &self.regs,
                    &self.exmem[..w],
                    &self.memwb[..w],
                );
                let val = if inst.is_64 { val } else { val & 0xFFFF_FFFF };
                let zero = val == 0;
                (
                    if inst.op == Op::Cbz { zero } else { !zero },
                    id.pc.wrapping_add(inst.branch_offset as u64),
                )
            }
            Op::Tbz | Op::Tbnz => {
                let val = resolve_operand(
                    inst.rd,
                    cycle_table,
                    &self.regs,
                    &self.exmem[..w],
                    &self.memwb[..w],
                );
                let bit = (val >> inst.imm2) & 1;
                (
                    if inst.op == Op::Tbz { bit == 0 } else { bit == 1 },
                    id.pc.wrapping_add(inst.branch_offset as u64),
                )
            }
            _ => (false, fall_through),
        };

        let correct = if id.early_resolved {
            true
        } else if taken {
            id.predicted_taken && id.predicted_target == target
        } else {
            !id.predicted_taken
        };
        let correct_next = if taken { target } else { fall_through };
        Resolution {
            taken,
            target,
            correct,
            correct_next,
            fused_value,
        }
    }

    /// Evaluates a fused compare directly from its payload, without touching
    /// architectural PSTATE. Returns the arithmetic result and the flags.
    fn evaluate_fused_compare(
        &self,
        payload: &FusionPayload,
        cycle_table: &[Option<u64>; 32],
    ) -> (u64, (bool, bool, bool, bool)) {
        let w = self.width;
        let a = resolve_operand(
            payload.rn,
            cycle_table,
            &self.regs,
            &self.exmem[..w],
            &self.memwb[..w],
        );
        let b = if payload.is_imm {
            payload.imm_val
        } else {
            resolve_operand(
                payload.rm,
                cycle_table,
                &self.regs,
                &self.exmem[..w],
                &self.memwb[..w],
            )
        };
        if payload.is_cmn {
            alu::add_with_carry(a, b, false, payload.is_64)
        } else {
            alu::add_with_carry(a, !b, true, payload.is_64)
        }
    }

    /// Applies a misprediction: flush the front end, clear wrong-path results,
    /// roll back the checkpoint, and redirect fetch.
    fn handle_mispredict(
        &mut self,
        correct_pc: u64,
        next_exmem: &mut [ExMemEntry; MAX_ISSUE_WIDTH],
        next_memwb: &[MemWbEntry; MAX_ISSUE_WIDTH],
    ) {
        debug!(correct_pc, "branch mispredict");
        // Same-cycle results younger than the branch (slot 0) are wrong-path.
        for entry in next_exmem.iter_mut().skip(1) {
            *entry = ExMemEntry::default();
        }
        self.checkpoint.restore(&mut self.regs, &mut self.pstate);
        self.window.flush();
        self.idex = [IdExEntry::default(); MAX_ISSUE_WIDTH];
        self.ifid = [IfIdEntry::default(); MAX_ISSUE_WIDTH];
        self.pc = correct_pc;
        self.after_branch = false;
        self.fetch_port.reset();
        self.redirect_stall = self.latency.branch_mispredict_penalty;
        self.stats.flushes += 1;

        self.memwb = *next_memwb;
        self.exmem = *next_exmem;
    }

    /// Fetches into the window until it fills or fetch stalls, eliminating
    /// pure unconditional branches and redirecting on predictions.
    fn fetch_into_window(&mut self) {
        let mut attempts = self.window.capacity();
        while attempts > 0 && !self.window.is_full() {
            attempts -= 1;
            let pc = self.pc;
            let fetched = self.fetch_port.fetch(pc, self.icache.as_mut(), &self.mem);
            if fetched.stall {
                self.stats.fetch_stalls += 1;
                break;
            }
            let word = fetched.word;

            // Pure B: jump the fetch PC, consume no slot.
            if branch_isa::is_eliminable(word) {
                if let Some(target) = branch_isa::static_target(pc, word) {
                    self.stats.eliminated_branches += 1;
                    trace!(pc, target, "eliminated branch");
                    self.pc = target;
                    continue;
                }
            }

            let mut entry = IfIdEntry {
                valid: true,
                pc,
                inst_word: word,
                after_branch: self.after_branch,
                ..Default::default()
            };
            let mut next_pc = pc.wrapping_add(INSTRUCTION_SIZE);

            match branch_isa::classify(word) {
                Some(branch_isa::BranchClass::UncondLink) => {
                    // Early resolution: direction and target certain at fetch.
                    let target = branch_isa::static_target(pc, word).unwrap_or(next_pc);
                    entry.predicted_taken = true;
                    entry.predicted_target = target;
                    entry.early_resolved = true;
                    next_pc = target;
                }
                Some(
                    branch_isa::BranchClass::Cond
                    | branch_isa::BranchClass::CompareZero
                    | branch_isa::BranchClass::TestBit,
                ) => {
                    let mut prediction = self.predictor.predict(pc);
                    if prediction.taken && !prediction.target_known {
                        // Cold BTB: the direct target is recoverable from the
                        // encoding, sparing a full mispredict on a correctly
                        // guessed direction.
                        if let Some(target) = branch_isa::static_target(pc, word) {
                            prediction.target = target;
                            prediction.target_known = true;
                        }
                    }
                    if prediction.taken && prediction.target_known {
                        entry.predicted_taken = true;
                        entry.predicted_target = prediction.target;
                        next_pc = prediction.target;
                    }
                }
                Some(branch_isa::BranchClass::Indirect) => {
                    let prediction = self.predictor.predict(pc);
                    if prediction.taken && prediction.target_known {
                        entry.predicted_taken = true;
                        entry.predicted_target = prediction.target;
                        next_pc = prediction.target;
                    }
                }
                _ => {}
            }

            let speculative_taken = entry.predicted_taken && !entry.early_resolved;
            if !self.window.push_fetched(entry) {
                break;
            }
            if speculative_taken {
                self.after_branch = true;
            }
            self.pc = next_pc;
        }
    }
}
