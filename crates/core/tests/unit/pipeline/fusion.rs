//! Fusion Recognizer Tests.
//!
//! Verifies the compare + conditional-branch pattern match and payload
//! contents.

use a64sim_core::core::pipeline::fusion::{is_fusible_compare, try_fuse};
use a64sim_core::isa::decode;

use crate::common::asm;

fn decoded(word: u32) -> a64sim_core::isa::instruction::DecodedInst {
    decode::decode(word).expect("test word decodes")
}

#[test]
fn cmp_immediate_fuses_with_bcond() {
    let cmp = decoded(asm::subs_imm(31, 4, 10));
    let branch = decoded(asm::b_cond(0, 8));
    let payload = try_fuse(&cmp, &branch).expect("pattern fuses");
    assert_eq!(payload.rd, 31);
    assert_eq!(payload.rn, 4);
    assert!(payload.is_imm);
    assert_eq!(payload.imm_val, 10);
    assert!(!payload.is_cmn);
    assert!(payload.is_64);
}

#[test]
fn cmp_register_fuses_with_bcond() {
    // The S3 seed pair: SUBS XZR, X0, X1 + B.EQ.
    let cmp = decoded(0xEB01001F);
    let branch = decoded(0x54000040);
    let payload = try_fuse(&cmp, &branch).expect("pattern fuses");
    assert_eq!((payload.rn, payload.rm), (0, 1));
    assert!(!payload.is_imm);
}

#[test]
fn subs_with_live_destination_fuses() {
    // A loop counter decrement keeps its result through the fused op.
    let cmp = decoded(asm::subs_imm(7, 7, 1));
    let branch = decoded(asm::b_cond(1, -8));
    let payload = try_fuse(&cmp, &branch).expect("pattern fuses");
    assert_eq!(payload.rd, 7);
}

#[test]
fn adds_fuses_as_cmn() {
    let cmp = decoded(asm::adds_imm(31, 2, 1));
    let branch = decoded(asm::b_cond(1, 8));
    let payload = try_fuse(&cmp, &branch).expect("pattern fuses");
    assert!(payload.is_cmn);
}

#[test]
fn shifted_register_compare_does_not_fuse() {
    // SUBS XZR, X0, X1, LSL #4 keeps its shift in the ALU.
    let word = 0xEB01101F;
    let cmp = decoded(word);
    assert!(!is_fusible_compare(&cmp));
}

#[test]
fn non_compare_does_not_fuse() {
    let add = decoded(asm::add_imm(1, 2, 3));
    let branch = decoded(asm::b_cond(0, 8));
    assert!(try_fuse(&add, &branch).is_none(), "flags must be set");

    let load = decoded(asm::ldr64(1, 2, 0));
    assert!(try_fuse(&load, &branch).is_none());
}

#[test]
fn non_conditional_branch_does_not_fuse() {
    let cmp = decoded(asm::subs_imm(31, 4, 10));
    assert!(try_fuse(&cmp, &decoded(asm::b(8))).is_none());
    assert!(try_fuse(&cmp, &decoded(asm::cbz64(1, 8))).is_none());
}
