//! Branch Classification Tests.
//!
//! Verifies the fetch-path raw-word classifier: elimination eligibility,
//! early-resolution targets, and sign-extended offset arithmetic at the
//! encoding boundaries.

use a64sim_core::isa::branch::{BranchClass, classify, is_eliminable, static_target};
use proptest::prelude::*;

use crate::common::asm;

// ══════════════════════════════════════════════════════════
// 1. Classification
// ══════════════════════════════════════════════════════════

#[test]
fn classify_all_kinds() {
    assert_eq!(classify(asm::b(8)), Some(BranchClass::Uncond));
    assert_eq!(classify(asm::bl(8)), Some(BranchClass::UncondLink));
    assert_eq!(classify(asm::b_cond(0, 8)), Some(BranchClass::Cond));
    assert_eq!(classify(asm::cbz64(3, 8)), Some(BranchClass::CompareZero));
    assert_eq!(classify(asm::tbz(3, 5, 8)), Some(BranchClass::TestBit));
    assert_eq!(classify(asm::br(7)), Some(BranchClass::Indirect));
    assert_eq!(classify(asm::ret()), Some(BranchClass::Indirect));
}

#[test]
fn non_branches_not_classified() {
    assert_eq!(classify(asm::add_imm(0, 1, 2)), None);
    assert_eq!(classify(asm::ldr64(0, 1, 0)), None);
    assert_eq!(classify(asm::svc()), None);
    assert_eq!(classify(0), None);
}

#[test]
fn only_pure_b_is_eliminable() {
    assert!(is_eliminable(asm::b(-4)));
    assert!(!is_eliminable(asm::bl(-4)), "BL writes X30, cannot vanish");
    assert!(!is_eliminable(asm::b_cond(1, 8)));
    assert!(!is_eliminable(asm::cbz64(0, 8)));
}

// ══════════════════════════════════════════════════════════
// 2. Target arithmetic
// ══════════════════════════════════════════════════════════

#[test]
fn forward_and_backward_targets() {
    assert_eq!(static_target(0x1000, asm::b(8)), Some(0x1008));
    assert_eq!(static_target(0x1000, asm::b(-8)), Some(0xFF8));
    assert_eq!(static_target(0x1000, asm::b_cond(0, -4)), Some(0xFFC));
    assert_eq!(static_target(0x1000, asm::tbz(0, 3, 12)), Some(0x100C));
}

#[test]
fn indirect_has_no_static_target() {
    assert_eq!(static_target(0x1000, asm::br(2)), None);
    assert_eq!(static_target(0x1000, asm::ret()), None);
}

#[test]
fn maximum_negative_b_offset() {
    // imm26 = 0x2000000 is the most negative encoding: -2^25 words.
    let word = 0x1400_0000 | 0x0200_0000;
    let expected = 0x1000_0000_u64.wrapping_add(-(1_i64 << 27) as u64);
    assert_eq!(static_target(0x1000_0000, word), Some(expected));
}

proptest! {
    /// Round trip: every encodable word offset survives encode + classify.
    #[test]
    fn b_offset_round_trip(words in -(1_i64 << 25)..(1_i64 << 25)) {
        let offset = words * 4;
        let pc = 0x4000_0000_u64;
        let target = static_target(pc, asm::b(offset));
        prop_assert_eq!(target, Some(pc.wrapping_add(offset as u64)));
    }

    /// Conditional branches carry 19-bit word offsets.
    #[test]
    fn b_cond_offset_round_trip(words in -(1_i64 << 18)..(1_i64 << 18)) {
        let offset = words * 4;
        let pc = 0x4000_0000_u64;
        let target = static_target(pc, asm::b_cond(0, offset));
        prop_assert_eq!(target, Some(pc.wrapping_add(offset as u64)));
    }
}
