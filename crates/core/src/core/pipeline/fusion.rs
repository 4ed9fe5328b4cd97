//! Compare + conditional-branch macro-op fusion.
//!
//! Adjacent flag-setting compare and `B.cond` instructions in IF/ID slots 0
//! and 1 fuse into a single slot-0 micro-op: the branch carries the compare's
//! operands as a payload and evaluates its condition directly, bypassing the
//! architectural flag read and write. A `SUBS`/`ADDS` with a live destination
//! keeps its arithmetic result through the fused entry. The fused entry
//! retires as two instructions.
//!
//! Fusion is suppressed while the compare is held by a load-use hazard; both
//! instructions then arbitrate separately.

use super::latches::FusionPayload;
use crate::isa::instruction::{DecodedInst, Format, Op};

/// True for a flag-setting add/subtract the recognizer can fuse with a
/// following conditional branch (`CMP`/`CMN` aliases included).
pub const fn is_fusible_compare(inst: &DecodedInst) -> bool {
    if !inst.set_flags || !matches!(inst.op, Op::Add | Op::Sub) {
        return false;
    }
    match inst.format {
        Format::DataProcImm => true,
        // Shifted-register compares keep their shift in the ALU; only the
        // plain form fuses.
        Format::DataProcReg => inst.shift == 0,
        _ => false,
    }
}

/// Attempts to fuse a compare with the conditional branch that follows it.
///
/// # Returns
///
/// The compare payload to hang on the branch's ID/EX entry, or `None` when
/// the pair does not match the fusible pattern. Operand values are filled in
/// by the dispatcher from the register file.
pub const fn try_fuse(cmp: &DecodedInst, branch: &DecodedInst) -> Option<FusionPayload> {
    if !is_fusible_compare(cmp) || !matches!(branch.op, Op::Bcond) {
        return None;
    }
    Some(FusionPayload {
        rd: cmp.rd,
        rn: cmp.rn,
        rm: cmp.rm,
        rn_val: 0,
        rm_val: 0,
        is_64: cmp.is_64,
        is_imm: matches!(cmp.format, Format::DataProcImm),
        imm_val: cmp.imm,
        is_cmn: matches!(cmp.op, Op::Add),
    })
}
