//! Raw-word branch classification.
//!
//! The fetch stage needs to recognize control flow before full decode: pure
//! unconditional branches are eliminated outright, `BL` is resolved early, and
//! a predicted-taken conditional branch with a cold BTB can still redirect to
//! the target computed from its own encoding. This module provides that
//! classification directly from the 32-bit word.

/// Fetch-time classification of a branch word.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BranchClass {
    /// Pure `B`: eliminable at fetch, never occupies a pipeline slot.
    Uncond,
    /// `BL`: early-resolved at fetch but consumes a slot for the link write.
    UncondLink,
    /// `B.cond`.
    Cond,
    /// `CBZ`/`CBNZ`.
    CompareZero,
    /// `TBZ`/`TBNZ`.
    TestBit,
    /// `BR`/`BLR`/`RET`: target comes from a register, unknowable at fetch.
    Indirect,
}

/// Extracts bits `[hi:lo]` of an instruction word.
const fn bits(word: u32, hi: u32, lo: u32) -> u32 {
    (word >> lo) & ((1 << (hi - lo + 1)) - 1)
}

/// Sign-extends the low `n` bits of `value`.
const fn sext(value: u64, n: u32) -> i64 {
    let shift = 64 - n;
    ((value << shift) as i64) >> shift
}

/// Classifies a raw word as a branch, if it is one.
pub const fn classify(word: u32) -> Option<BranchClass> {
    if bits(word, 31, 26) == 0b000101 {
        return Some(BranchClass::Uncond);
    }
    if bits(word, 31, 26) == 0b100101 {
        return Some(BranchClass::UncondLink);
    }
    if bits(word, 31, 24) == 0x54 && bits(word, 4, 4) == 0 {
        return Some(BranchClass::Cond);
    }
    if bits(word, 30, 25) == 0b011010 {
        return Some(BranchClass::CompareZero);
    }
    if bits(word, 30, 25) == 0b011011 {
        return Some(BranchClass::TestBit);
    }
    if bits(word, 31, 25) == 0b1101_011
        && bits(word, 20, 16) == 0b11111
        && bits(word, 15, 10) == 0
        && bits(word, 4, 0) == 0
        && bits(word, 24, 21) <= 0b0010
    {
        return Some(BranchClass::Indirect);
    }
    None
}

/// True for a pure `B` (not `BL`): the only branch eliminable at fetch.
pub const fn is_eliminable(word: u32) -> bool {
    matches!(classify(word), Some(BranchClass::Uncond))
}

/// Computes the taken-path byte target encoded in a direct branch word.
///
/// Returns `None` for indirect branches, whose target is register-carried.
pub const fn static_target(pc: u64, word: u32) -> Option<u64> {
    let offset = match classify(word) {
        Some(BranchClass::Uncond | BranchClass::UncondLink) => {
            sext(bits(word, 25, 0) as u64, 26) * 4
        }
        Some(BranchClass::Cond | BranchClass::CompareZero) => {
            sext(bits(word, 23, 5) as u64, 19) * 4
        }
        Some(BranchClass::TestBit) => sext(bits(word, 18, 5) as u64, 14) * 4,
        _ => return None,
    };
    Some(pc.wrapping_add(offset as u64))
}
