//! Hazard and Forwarding Unit Tests.
//!
//! Verifies forwarding source selection, value materialization, load-use
//! detection, and the canonical single-issue stall table.

use a64sim_core::core::pipeline::hazards::{
    ForwardSource, compute_stalls, detect_forwarding, detect_load_use_hazard_decoded,
    detect_load_use_hazard_for_inst, forward_flags, forward_operand, get_forwarded_value,
};
use a64sim_core::core::pipeline::latches::{ExMemEntry, IdExEntry, MemWbEntry};
use a64sim_core::isa::decode;

use crate::common::asm;

/// Helper: an ID/EX entry consuming `rn` and `rm`.
fn consumer(rn: u32, rm: u32) -> IdExEntry {
    IdExEntry {
        valid: true,
        inst: decode::decode(asm::add_reg(0, rn, rm)).expect("decodes"),
        ..Default::default()
    }
}

/// Helper: an EX/MEM entry producing `rd` from the ALU.
fn alu_producer(rd: u8, value: u64) -> ExMemEntry {
    ExMemEntry {
        valid: true,
        rd,
        alu_result: value,
        reg_write: true,
        ..Default::default()
    }
}

/// Helper: a MEM/WB entry with a completed load.
fn load_producer(rd: u8, data: u64) -> MemWbEntry {
    MemWbEntry {
        valid: true,
        rd,
        mem_data: data,
        reg_write: true,
        mem_to_reg: true,
        ..Default::default()
    }
}

// ══════════════════════════════════════════════════════════
// 1. Forwarding source selection
// ══════════════════════════════════════════════════════════

#[test]
fn exmem_wins_over_memwb() {
    let entry = consumer(5, 6);
    let exmem = alu_producer(5, 111);
    let memwb = load_producer(5, 222);
    let decision = detect_forwarding(&entry, &exmem, &memwb);
    assert_eq!(decision.rn_src, ForwardSource::FromExMem);
    assert_eq!(decision.rm_src, ForwardSource::None);
}

#[test]
fn memwb_forwards_when_exmem_is_a_load() {
    let entry = consumer(5, 0);
    let mut exmem = alu_producer(5, 111);
    exmem.mem_read = true;
    let memwb = load_producer(5, 222);
    let decision = detect_forwarding(&entry, &exmem, &memwb);
    assert_eq!(
        decision.rn_src,
        ForwardSource::FromMemWb,
        "loads in EX/MEM cannot forward; their data is not ready"
    );
}

#[test]
fn register_31_never_forwards() {
    let entry = consumer(31, 31);
    let exmem = alu_producer(31, 111);
    let memwb = load_producer(31, 222);
    let decision = detect_forwarding(&entry, &exmem, &memwb);
    assert_eq!(decision.rn_src, ForwardSource::None);
    assert_eq!(decision.rm_src, ForwardSource::None);
}

#[test]
fn forwarded_value_selection() {
    let exmem = alu_producer(5, 111);
    let memwb = load_producer(5, 222);
    assert_eq!(
        get_forwarded_value(ForwardSource::None, 7, &exmem, &memwb),
        7
    );
    assert_eq!(
        get_forwarded_value(ForwardSource::FromExMem, 7, &exmem, &memwb),
        111
    );
    assert_eq!(
        get_forwarded_value(ForwardSource::FromMemWb, 7, &exmem, &memwb),
        222,
        "MEM/WB load source returns mem_data"
    );
}

#[test]
fn memwb_alu_value_when_not_load() {
    let exmem = ExMemEntry::default();
    let mut memwb = load_producer(5, 222);
    memwb.mem_to_reg = false;
    memwb.alu_result = 333;
    assert_eq!(
        get_forwarded_value(ForwardSource::FromMemWb, 0, &exmem, &memwb),
        333
    );
}

// ══════════════════════════════════════════════════════════
// 2. Wide youngest-wins scans
// ══════════════════════════════════════════════════════════

#[test]
fn youngest_exmem_slot_wins() {
    let exmem = [alu_producer(5, 1), alu_producer(5, 2), alu_producer(5, 3)];
    let memwb: [MemWbEntry; 0] = [];
    assert_eq!(forward_operand(5, 0, &exmem, &memwb), 3);
}

#[test]
fn falls_back_to_register_file_value() {
    let exmem: [ExMemEntry; 0] = [];
    let memwb: [MemWbEntry; 0] = [];
    assert_eq!(forward_operand(9, 42, &exmem, &memwb), 42);
}

#[test]
fn flag_selection_prefers_youngest_producer() {
    let mut older = alu_producer(1, 0);
    older.sets_flags = true;
    older.z = true;
    let mut younger = alu_producer(2, 0);
    younger.sets_flags = true;
    younger.n = true;
    let exmem = [older, younger];
    assert_eq!(
        forward_flags(&exmem, (false, false, false, false)),
        (true, false, false, false)
    );
}

#[test]
fn flag_selection_falls_back_to_pstate() {
    let exmem = [alu_producer(1, 0)];
    assert_eq!(
        forward_flags(&exmem, (false, true, true, false)),
        (false, true, true, false)
    );
}

// ══════════════════════════════════════════════════════════
// 3. Load-use detection
// ══════════════════════════════════════════════════════════

#[test]
fn load_use_on_rn_and_rm() {
    assert!(detect_load_use_hazard_decoded(5, 5, 0, true, false));
    assert!(detect_load_use_hazard_decoded(5, 0, 5, false, true));
    assert!(!detect_load_use_hazard_decoded(5, 6, 7, true, true));
    assert!(!detect_load_use_hazard_decoded(5, 5, 0, false, false));
}

#[test]
fn load_to_register_31_never_stalls() {
    assert!(
        !detect_load_use_hazard_decoded(31, 31, 31, true, true),
        "a load discarding into the zero register produces nothing"
    );
    let inst = decode::decode(asm::add_reg(0, 31, 31)).expect("decodes");
    assert!(!detect_load_use_hazard_for_inst(31, &inst));
}

#[test]
fn load_use_covers_store_data_and_address() {
    let store = decode::decode(asm::str64(5, 6, 0)).expect("decodes");
    assert!(
        detect_load_use_hazard_for_inst(5, &store),
        "store data depends on the load"
    );
    assert!(
        detect_load_use_hazard_for_inst(6, &store),
        "store address depends on the load"
    );
    let load = decode::decode(asm::ldr64(0, 5, 0)).expect("decodes");
    assert!(
        detect_load_use_hazard_for_inst(5, &load),
        "a dependent load address still waits for the in-flight load"
    );
}

// ══════════════════════════════════════════════════════════
// 4. Stall table
// ══════════════════════════════════════════════════════════

#[test]
fn load_use_stall_control() {
    let control = compute_stalls(true, false);
    assert!(control.stall_if);
    assert!(control.stall_id);
    assert!(control.insert_bubble_ex);
    assert!(!control.flush_if);
}

#[test]
fn taken_branch_flush_control() {
    let control = compute_stalls(false, true);
    assert!(control.flush_if);
    assert!(control.flush_id);
    assert!(!control.stall_if);
}

#[test]
fn load_use_dominates_branch_flush() {
    let control = compute_stalls(true, true);
    assert!(control.stall_if && !control.flush_if);
}
