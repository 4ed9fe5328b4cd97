//! Issue Arbitration Tests.
//!
//! Verifies the co-issue admission rules: slot discipline, port caps,
//! same-cycle RAW handling with one-hop chaining, base-writeback fencing,
//! and the speculative-store gate.

use a64sim_core::core::pipeline::issue::{IssueGroup, IssueLimits, Reject};
use a64sim_core::core::pipeline::latches::IfIdEntry;
use a64sim_core::isa::decode;
use a64sim_core::isa::instruction::DecodedInst;

use crate::common::asm;

fn limits8() -> IssueLimits {
    IssueLimits::for_width(8)
}

fn group8() -> IssueGroup {
    IssueGroup::new(limits8(), Vec::new(), Vec::new())
}

fn entry() -> IfIdEntry {
    IfIdEntry {
        valid: true,
        ..Default::default()
    }
}

fn inst(word: u32) -> DecodedInst {
    decode::decode(word).expect("test word decodes")
}

// ══════════════════════════════════════════════════════════
// 1. Width-derived limits
// ══════════════════════════════════════════════════════════

#[test]
fn wide_limits_use_full_port_complement() {
    let limits = IssueLimits::for_width(8);
    assert_eq!(limits.alu_ports, 6);
    assert_eq!(limits.load_ports, 3);
    assert_eq!(limits.store_ports, 2);
    assert_eq!(limits.mem_ports, 5);
    assert_eq!(limits.write_ports, 8);
    assert_eq!(IssueLimits::for_width(6), limits);
}

#[test]
fn narrow_limits_clamp_to_width() {
    let limits = IssueLimits::for_width(2);
    assert_eq!(limits.alu_ports, 2);
    assert_eq!(limits.load_ports, 2);
    assert_eq!(limits.store_ports, 1);
    assert_eq!(limits.mem_ports, 2);

    let single = IssueLimits::for_width(1);
    assert_eq!(single.mem_ports, 1);
    assert_eq!(single.load_ports, 1);
}

// ══════════════════════════════════════════════════════════
// 2. Slot discipline
// ══════════════════════════════════════════════════════════

#[test]
fn branch_only_in_slot_zero() {
    let mut group = group8();
    group
        .try_admit(&inst(asm::add_imm(0, 1, 1)), &entry(), None)
        .expect("plain ALU admits");
    let err = group
        .try_admit(&inst(asm::b_cond(0, 8)), &entry(), None)
        .expect_err("branch in slot 1 rejected");
    assert_eq!(err, Reject::NotPrimary);
}

#[test]
fn svc_issues_alone() {
    let mut group = group8();
    group
        .try_admit(&inst(asm::svc()), &entry(), None)
        .expect("svc admits at slot 0");
    let err = group
        .try_admit(&inst(asm::add_imm(0, 1, 1)), &entry(), None)
        .expect_err("nothing joins an svc group");
    assert_eq!(err, Reject::Serialized);
}

#[test]
fn nothing_passes_a_skipped_branch() {
    let mut group = group8();
    group
        .try_admit(&inst(asm::add_imm(0, 1, 1)), &entry(), None)
        .expect("admits");
    group.note_skipped(&inst(asm::b_cond(0, 8)));
    let err = group
        .try_admit(&inst(asm::add_imm(2, 3, 1)), &entry(), None)
        .expect_err("shadow of a held branch cannot issue");
    assert_eq!(err, Reject::SkippedDependence);
}

// ══════════════════════════════════════════════════════════
// 3. Port caps
// ══════════════════════════════════════════════════════════

#[test]
fn alu_port_cap_enforced() {
    let mut group = group8();
    for i in 0..6 {
        group
            .try_admit(&inst(asm::add_imm(i, 20, 1)), &entry(), None)
            .expect("within ALU cap");
    }
    let err = group
        .try_admit(&inst(asm::add_imm(7, 20, 1)), &entry(), None)
        .expect_err("seventh ALU op exceeds the cap");
    assert_eq!(err, Reject::PortCap);
}

#[test]
fn load_port_cap_enforced() {
    let mut group = group8();
    for i in 0..3 {
        group
            .try_admit(&inst(asm::ldr64(i, 20, 0)), &entry(), None)
            .expect("within load cap");
    }
    let err = group
        .try_admit(&inst(asm::ldr64(4, 20, 0)), &entry(), None)
        .expect_err("fourth load exceeds the cap");
    assert_eq!(err, Reject::PortCap);
}

#[test]
fn store_port_cap_enforced() {
    let mut group = group8();
    group
        .try_admit(&inst(asm::str64(1, 20, 0)), &entry(), None)
        .expect("first store");
    group
        .try_admit(&inst(asm::str64(2, 20, 8)), &entry(), None)
        .expect("second store");
    let err = group
        .try_admit(&inst(asm::str64(3, 20, 16)), &entry(), None)
        .expect_err("third store exceeds the cap");
    assert_eq!(err, Reject::PortCap);
}

#[test]
fn combined_memory_cap_enforced() {
    let mut group = group8();
    for i in 0..3 {
        group
            .try_admit(&inst(asm::ldr64(i, 20, (i * 8) as u32)), &entry(), None)
            .expect("loads");
    }
    group
        .try_admit(&inst(asm::str64(4, 21, 0)), &entry(), None)
        .expect("store four");
    group
        .try_admit(&inst(asm::str64(5, 21, 8)), &entry(), None)
        .expect("store five");
    let err = group
        .try_admit(&inst(asm::ldr64(6, 22, 0)), &entry(), None)
        .expect_err("sixth memory op exceeds the combined cap");
    assert_eq!(err, Reject::PortCap);
}

// ══════════════════════════════════════════════════════════
// 4. Same-cycle RAW rules
// ══════════════════════════════════════════════════════════

#[test]
fn alu_to_alu_forwarding_admits_one_hop() {
    let mut group = group8();
    group
        .try_admit(&inst(asm::add_imm(1, 0, 5)), &entry(), None)
        .expect("producer");
    let admitted = group
        .try_admit(&inst(asm::add_imm(2, 1, 1)), &entry(), None)
        .expect("consumer admits via same-cycle forwarding");
    assert!(admitted.forwarded);

    let err = group
        .try_admit(&inst(asm::add_imm(3, 2, 1)), &entry(), None)
        .expect_err("second hop of the chain rejected");
    assert_eq!(err, Reject::ChainDepth);
}

#[test]
fn same_cycle_load_producer_rejected() {
    let mut group = group8();
    group
        .try_admit(&inst(asm::ldr64(1, 20, 0)), &entry(), None)
        .expect("load");
    let err = group
        .try_admit(&inst(asm::add_imm(2, 1, 1)), &entry(), None)
        .expect_err("load data is not ready in the same cycle");
    assert_eq!(err, Reject::LoadProducer);
}

#[test]
fn store_data_has_no_same_cycle_path() {
    let mut group = group8();
    group
        .try_admit(&inst(asm::add_imm(1, 0, 5)), &entry(), None)
        .expect("producer");
    let err = group
        .try_admit(&inst(asm::str64(1, 20, 0)), &entry(), None)
        .expect_err("store value input rejects same-cycle producers");
    assert_eq!(err, Reject::StoreValueRaw);
}

#[test]
fn alu_to_agu_path_is_unconditional() {
    let mut group = group8();
    group
        .try_admit(&inst(asm::add_imm(1, 0, 5)), &entry(), None)
        .expect("producer");
    group
        .try_admit(&inst(asm::add_imm(2, 1, 1)), &entry(), None)
        .expect("chained consumer");
    // The load's address may consume even the chained result.
    group
        .try_admit(&inst(asm::ldr64(3, 2, 0)), &entry(), None)
        .expect("load address accepts a chained ALU result");
}

#[test]
fn pure_waw_is_permitted() {
    let mut group = group8();
    group
        .try_admit(&inst(asm::movz(1, 10)), &entry(), None)
        .expect("first writer");
    group
        .try_admit(&inst(asm::movz(1, 20)), &entry(), None)
        .expect("same-register writer co-issues; in-order retire resolves it");
}

#[test]
fn load_use_against_inflight_load() {
    let mut group = IssueGroup::new(limits8(), vec![5], Vec::new());
    let err = group
        .try_admit(&inst(asm::add_imm(0, 5, 1)), &entry(), None)
        .expect_err("consumer of the in-flight load waits");
    assert_eq!(err, Reject::LoadUse);
    group
        .try_admit(&inst(asm::add_imm(0, 6, 1)), &entry(), None)
        .expect("independent instruction bypasses the held consumer");
}

// ══════════════════════════════════════════════════════════
// 5. Base writeback and memory ordering
// ══════════════════════════════════════════════════════════

#[test]
fn pending_base_update_fences_readers_and_writers() {
    let mut group = IssueGroup::new(limits8(), Vec::new(), vec![2]);
    let err = group
        .try_admit(&inst(asm::add_imm(0, 2, 1)), &entry(), None)
        .expect_err("reader of the un-retired base rejected");
    assert_eq!(err, Reject::BaseWriteback);
    let err = group
        .try_admit(&inst(asm::movz(2, 1)), &entry(), None)
        .expect_err("writer of the un-retired base rejected");
    assert_eq!(err, Reject::BaseWriteback);
}

#[test]
fn same_group_base_update_consumer_rejected() {
    let mut group = group8();
    group
        .try_admit(&inst(asm::ldr64_post(1, 2, 8)), &entry(), None)
        .expect("post-indexed load");
    let err = group
        .try_admit(&inst(asm::add_imm(3, 2, 0)), &entry(), None)
        .expect_err("base update is un-forwardable in its own group");
    assert_eq!(err, Reject::BaseWriteback);
}

#[test]
fn load_rejected_behind_same_address_store() {
    let mut group = group8();
    group
        .try_admit(&inst(asm::str64(1, 20, 8)), &entry(), None)
        .expect("store");
    let err = group
        .try_admit(&inst(asm::ldr64(2, 20, 8)), &entry(), None)
        .expect_err("load may not pass the store to its own address");
    assert_eq!(err, Reject::StoreLoadOrdering);
    group
        .try_admit(&inst(asm::ldr64(3, 20, 16)), &entry(), None)
        .expect("different offset co-issues");
}

// ══════════════════════════════════════════════════════════
// 6. Speculative-store gating
// ══════════════════════════════════════════════════════════

#[test]
fn store_rejected_in_branch_shadow() {
    let mut group = group8();
    let shadowed = IfIdEntry {
        valid: true,
        after_branch: true,
        ..Default::default()
    };
    let err = group
        .try_admit(&inst(asm::str64(1, 20, 0)), &shadowed, None)
        .expect_err("speculative store rejected");
    assert_eq!(err, Reject::SpeculativeStore);
    group
        .try_admit(&inst(asm::add_imm(1, 2, 3)), &shadowed, None)
        .expect("non-store in the shadow is fine");
}

#[test]
fn store_rejected_behind_taken_branch_in_group() {
    let mut group = group8();
    let taken = IfIdEntry {
        valid: true,
        predicted_taken: true,
        predicted_target: 0x2000,
        ..Default::default()
    };
    group
        .try_admit(&inst(asm::b_cond(0, 8)), &taken, None)
        .expect("branch at slot 0");
    let err = group
        .try_admit(&inst(asm::str64(1, 20, 0)), &entry(), None)
        .expect_err("store cannot co-issue behind a predicted-taken branch");
    assert_eq!(err, Reject::SpeculativeStore);
}
