//! A64 instruction word decoding.
//!
//! This module turns raw 32-bit instruction words into [`DecodedInst`] values.
//! It implements:
//! 1. **Top-Level Dispatch:** The four A64 encoding quadrants (data-processing
//!    immediate, branches/system, loads/stores, data-processing register).
//! 2. **Field Extraction:** Immediate assembly including the logical bitmask
//!    immediate expansion.
//! 3. **Graceful Rejection:** Unsupported or malformed words decode to `None`;
//!    the pipeline turns those into the unknown-instruction halt.

use super::instruction::{Cond, DecodedInst, Format, IndexMode, Op, ShiftType};

/// Extracts bits `[hi:lo]` of an instruction word.
const fn bits(word: u32, hi: u32, lo: u32) -> u32 {
    (word >> lo) & ((1 << (hi - lo + 1)) - 1)
}

/// Sign-extends the low `n` bits of `value`.
const fn sext(value: u64, n: u32) -> i64 {
    let shift = 64 - n;
    ((value << shift) as i64) >> shift
}

/// Decodes a 32-bit instruction word.
///
/// # Returns
///
/// The decoded instruction, or `None` if the word is not in the supported
/// integer subset.
pub fn decode(word: u32) -> Option<DecodedInst> {
    let mut inst = DecodedInst::default();
    if decode_into(word, &mut inst) {
        Some(inst)
    } else {
        None
    }
}

/// Allocation-free variant of [`decode`]: fills `inst` in place.
///
/// # Returns
///
/// `true` if the word decoded; on `false` the contents of `inst` are
/// unspecified.
pub fn decode_into(word: u32, inst: &mut DecodedInst) -> bool {
    *inst = DecodedInst::default();
    match bits(word, 28, 25) {
        0b1000 | 0b1001 => decode_dp_imm(word, inst),
        0b1010 | 0b1011 => decode_branch_system(word, inst),
        0b0100 | 0b0110 | 0b1100 | 0b1110 => decode_load_store(word, inst),
        0b0101 | 0b1101 => decode_dp_reg(word, inst),
        _ => false,
    }
}

/// Replicates the low `esize` bits of `pattern` across a 64-bit value.
const fn replicate(pattern: u64, esize: u32) -> u64 {
    let mut out = pattern;
    let mut filled = esize;
    while filled < 64 {
        out |= out << filled;
        filled *= 2;
    }
    out
}

/// Expands an A64 logical bitmask immediate from its `(N, immr, imms)` fields.
///
/// Returns `None` for reserved encodings (`imms` selecting the all-ones
/// element, or an empty element size).
fn decode_bit_masks(n: u32, immr: u32, imms: u32, is_64: bool) -> Option<u64> {
    let combined = (n << 6) | (!imms & 0x3F);
    if combined == 0 {
        return None;
    }
    let len = 31 - combined.leading_zeros();
    if len < 1 || (!is_64 && len > 5) {
        return None;
    }
    let esize = 1u32 << len;
    let levels = esize - 1;
    let s = imms & levels;
    let r = immr & levels;
    if s == levels {
        return None;
    }

    let emask = if esize == 64 {
        u64::MAX
    } else {
        (1u64 << esize) - 1
    };
    let welem: u64 = if s == 63 { u64::MAX } else { (1u64 << (s + 1)) - 1 };
    let rotated = if r == 0 {
        welem
    } else {
        ((welem >> r) | (welem << (u64::from(esize) - u64::from(r)))) & emask
    };
    let mask = replicate(rotated, esize);
    Some(if is_64 { mask } else { mask & 0xFFFF_FFFF })
}

/// Decodes the data-processing-immediate quadrant.
fn decode_dp_imm(word: u32, inst: &mut DecodedInst) -> bool {
    let is_64 = bits(word, 31, 31) == 1;
    inst.is_64 = is_64;
    inst.rd = bits(word, 4, 0) as u8;

    match bits(word, 25, 23) {
        // ADR / ADRP
        0b000 | 0b001 => {
            inst.format = Format::PcRel;
            inst.is_64 = true;
            inst.op = if bits(word, 31, 31) == 1 {
                Op::Adrp
            } else {
                Op::Adr
            };
            let immhi = u64::from(bits(word, 23, 5));
            let immlo = u64::from(bits(word, 30, 29));
            inst.signed_imm = sext((immhi << 2) | immlo, 21);
            true
        }
        // ADD/SUB immediate
        0b010 => {
            inst.format = Format::DataProcImm;
            inst.rn = bits(word, 9, 5) as u8;
            inst.set_flags = bits(word, 29, 29) == 1;
            inst.op = if bits(word, 30, 30) == 1 { Op::Sub } else { Op::Add };
            let imm12 = u64::from(bits(word, 21, 10));
            inst.imm = if bits(word, 22, 22) == 1 {
                imm12 << 12
            } else {
                imm12
            };
            true
        }
        // Logical immediate
        0b100 => {
            let n = bits(word, 22, 22);
            if !is_64 && n == 1 {
                return false;
            }
            inst.format = Format::LogicalImm;
            inst.rn = bits(word, 9, 5) as u8;
            let Some(mask) = decode_bit_masks(n, bits(word, 21, 16), bits(word, 15, 10), is_64)
            else {
                return false;
            };
            inst.imm = mask;
            inst.op = match bits(word, 30, 29) {
                0b00 => Op::And,
                0b01 => Op::Orr,
                0b10 => Op::Eor,
                _ => {
                    inst.set_flags = true;
                    Op::And
                }
            };
            true
        }
        // Move wide
        0b101 => {
            inst.format = Format::MoveWide;
            let hw = bits(word, 22, 21);
            if !is_64 && hw > 1 {
                return false;
            }
            inst.op = match bits(word, 30, 29) {
                0b00 => Op::Movn,
                0b10 => Op::Movz,
                0b11 => Op::Movk,
                _ => return false,
            };
            inst.imm = u64::from(bits(word, 20, 5));
            inst.imm2 = u64::from(hw * 16);
            true
        }
        // Bitfield
        0b110 => {
            let n = bits(word, 22, 22);
            if (is_64 && n != 1) || (!is_64 && n != 0) {
                return false;
            }
            inst.format = Format::Bitfield;
            inst.rn = bits(word, 9, 5) as u8;
            inst.op = match bits(word, 30, 29) {
                0b00 => Op::Sbfm,
                0b10 => Op::Ubfm,
                _ => return false,
            };
            inst.shift = bits(word, 21, 16) as u8;
            inst.imm2 = u64::from(bits(word, 15, 10));
            if !is_64 && (inst.shift >= 32 || inst.imm2 >= 32) {
                return false;
            }
            true
        }
        _ => false,
    }
}

/// Decodes the branch/exception/system quadrant.
fn decode_branch_system(word: u32, inst: &mut DecodedInst) -> bool {
    // B / BL
    if bits(word, 30, 26) == 0b00101 {
        inst.format = Format::Branch;
        inst.op = if bits(word, 31, 31) == 1 { Op::Bl } else { Op::B };
        inst.is_64 = true;
        inst.branch_offset = sext(u64::from(bits(word, 25, 0)), 26) * 4;
        if inst.op == Op::Bl {
            inst.rd = crate::common::constants::LINK_REG;
        }
        return true;
    }
    // CBZ / CBNZ
    if bits(word, 30, 25) == 0b011010 {
        inst.format = Format::CompareBranch;
        inst.is_64 = bits(word, 31, 31) == 1;
        inst.op = if bits(word, 24, 24) == 1 { Op::Cbnz } else { Op::Cbz };
        inst.branch_offset = sext(u64::from(bits(word, 23, 5)), 19) * 4;
        inst.rd = bits(word, 4, 0) as u8;
        return true;
    }
    // TBZ / TBNZ
    if bits(word, 30, 25) == 0b011011 {
        inst.format = Format::TestBranch;
        inst.op = if bits(word, 24, 24) == 1 { Op::Tbnz } else { Op::Tbz };
        inst.is_64 = bits(word, 31, 31) == 1;
        inst.imm2 = u64::from((bits(word, 31, 31) << 5) | bits(word, 23, 19));
        inst.branch_offset = sext(u64::from(bits(word, 18, 5)), 14) * 4;
        inst.rd = bits(word, 4, 0) as u8;
        return true;
    }
    // B.cond
    if bits(word, 31, 24) == 0b0101_0100 && bits(word, 4, 4) == 0 {
        inst.format = Format::BranchCond;
        inst.op = Op::Bcond;
        inst.cond = Cond::from_bits(bits(word, 3, 0));
        inst.branch_offset = sext(u64::from(bits(word, 23, 5)), 19) * 4;
        return true;
    }
    // BR / BLR / RET
    if bits(word, 31, 25) == 0b1101_011
        && bits(word, 20, 16) == 0b11111
        && bits(word, 15, 10) == 0
        && bits(word, 4, 0) == 0
    {
        inst.format = Format::BranchReg;
        inst.is_64 = true;
        inst.rn = bits(word, 9, 5) as u8;
        inst.op = match bits(word, 24, 21) {
            0b0000 => Op::Br,
            0b0001 => {
                inst.rd = crate::common::constants::LINK_REG;
                Op::Blr
            }
            0b0010 => Op::Ret,
            _ => return false,
        };
        return true;
    }
    // SVC
    if (word & 0xFFE0_001F) == 0xD400_0001 {
        inst.format = Format::System;
        inst.op = Op::Svc;
        inst.imm = u64::from(bits(word, 20, 5));
        return true;
    }
    // Hint space (NOP, YIELD, WFE, ...)
    if (word & 0xFFFF_F01F) == 0xD503_201F {
        inst.format = Format::System;
        inst.op = Op::Nop;
        return true;
    }
    false
}

/// Decodes the load/store quadrant.
fn decode_load_store(word: u32, inst: &mut DecodedInst) -> bool {
    // Load/store pair (V = 0).
    if bits(word, 29, 27) == 0b101 && bits(word, 26, 26) == 0 {
        let opc = bits(word, 31, 30);
        let is_64 = match opc {
            0b00 => false,
            0b10 => true,
            _ => return false,
        };
        let mode = match bits(word, 25, 23) {
            0b001 => IndexMode::Post,
            0b010 => IndexMode::None,
            0b011 => IndexMode::Pre,
            _ => return false,
        };
        let load = bits(word, 22, 22) == 1;
        inst.format = Format::LoadStorePair;
        inst.op = if load { Op::Ldp } else { Op::Stp };
        inst.is_64 = is_64;
        inst.index_mode = mode;
        let scale = if is_64 { 3 } else { 2 };
        inst.signed_imm = sext(u64::from(bits(word, 21, 15)), 7) << scale;
        inst.rt2 = bits(word, 14, 10) as u8;
        inst.rn = bits(word, 9, 5) as u8;
        inst.rd = bits(word, 4, 0) as u8;
        return true;
    }

    // Load/store register (V = 0).
    if bits(word, 29, 27) != 0b111 || bits(word, 26, 26) != 0 {
        return false;
    }
    let size = bits(word, 31, 30);
    let opc = bits(word, 23, 22);
    let Some((op, is_64)) = classify_load_store(size, opc) else {
        return false;
    };
    inst.op = op;
    inst.is_64 = is_64;
    inst.format = Format::LoadStore;
    inst.rn = bits(word, 9, 5) as u8;
    inst.rd = bits(word, 4, 0) as u8;

    if bits(word, 25, 24) == 0b01 {
        // Unsigned scaled immediate offset.
        inst.index_mode = IndexMode::None;
        inst.signed_imm = (u64::from(bits(word, 21, 10)) << size) as i64;
        return true;
    }
    if bits(word, 25, 24) == 0b00 && bits(word, 21, 21) == 0 {
        // Unscaled / pre-index / post-index with a signed 9-bit offset.
        inst.index_mode = match bits(word, 11, 10) {
            0b00 => IndexMode::Signed,
            0b01 => IndexMode::Post,
            0b11 => IndexMode::Pre,
            _ => return false,
        };
        inst.signed_imm = sext(u64::from(bits(word, 20, 12)), 9);
        return true;
    }
    if bits(word, 25, 24) == 0b00 && bits(word, 21, 21) == 1 && bits(word, 11, 10) == 0b10 {
        // Register offset with extend/shift option.
        let option = bits(word, 15, 13);
        if !matches!(option, 0b010 | 0b011 | 0b110 | 0b111) {
            return false;
        }
        inst.index_mode = IndexMode::RegBase;
        inst.rm = bits(word, 20, 16) as u8;
        inst.imm2 = u64::from(option);
        inst.shift = if bits(word, 12, 12) == 1 { size as u8 } else { 0 };
        return true;
    }
    false
}

/// Maps the `(size, opc)` fields of a register load/store to an operation.
const fn classify_load_store(size: u32, opc: u32) -> Option<(Op, bool)> {
    match (size, opc) {
        (0b00, 0b00) => Some((Op::Strb, false)),
        (0b00, 0b01) => Some((Op::Ldrb, false)),
        (0b00, 0b10) => Some((Op::Ldrsb, true)),
        (0b00, 0b11) => Some((Op::Ldrsb, false)),
        (0b01, 0b00) => Some((Op::Strh, false)),
        (0b01, 0b01) => Some((Op::Ldrh, false)),
        (0b01, 0b10) => Some((Op::Ldrsh, true)),
        (0b01, 0b11) => Some((Op::Ldrsh, false)),
        (0b10, 0b00) => Some((Op::Str, false)),
        (0b10, 0b01) => Some((Op::Ldr, false)),
        (0b10, 0b10) => Some((Op::Ldrsw, true)),
        (0b11, 0b00) => Some((Op::Str, true)),
        (0b11, 0b01) => Some((Op::Ldr, true)),
        _ => None,
    }
}

/// Decodes the data-processing-register quadrant.
fn decode_dp_reg(word: u32, inst: &mut DecodedInst) -> bool {
    let is_64 = bits(word, 31, 31) == 1;
    inst.is_64 = is_64;
    inst.rd = bits(word, 4, 0) as u8;
    inst.rn = bits(word, 9, 5) as u8;
    inst.rm = bits(word, 20, 16) as u8;

    // Data-processing 3-source (MADD/MSUB, SMULH/UMULH).
    if bits(word, 28, 24) == 0b11011 {
        inst.format = Format::DataProc3Src;
        inst.rt2 = bits(word, 14, 10) as u8;
        let op31 = bits(word, 23, 21);
        let o0 = bits(word, 15, 15);
        inst.op = match (op31, o0) {
            (0b000, 0) => Op::Madd,
            (0b000, 1) => Op::Msub,
            (0b010, 0) if is_64 && inst.rt2 == 31 => Op::Smulh,
            (0b110, 0) if is_64 && inst.rt2 == 31 => Op::Umulh,
            _ => return false,
        };
        return true;
    }

    // Add/sub shifted register.
    if bits(word, 28, 24) == 0b01011 && bits(word, 21, 21) == 0 {
        inst.format = Format::DataProcReg;
        inst.set_flags = bits(word, 29, 29) == 1;
        inst.op = if bits(word, 30, 30) == 1 { Op::Sub } else { Op::Add };
        inst.shift_type = match bits(word, 23, 22) {
            0b00 => ShiftType::Lsl,
            0b01 => ShiftType::Lsr,
            0b10 => ShiftType::Asr,
            _ => return false,
        };
        inst.shift = bits(word, 15, 10) as u8;
        if !is_64 && inst.shift >= 32 {
            return false;
        }
        return true;
    }

    // Logical shifted register.
    if bits(word, 28, 24) == 0b01010 {
        inst.format = Format::DataProcReg;
        inst.shift_type = match bits(word, 23, 22) {
            0b00 => ShiftType::Lsl,
            0b01 => ShiftType::Lsr,
            0b10 => ShiftType::Asr,
            _ => ShiftType::Ror,
        };
        inst.shift = bits(word, 15, 10) as u8;
        if !is_64 && inst.shift >= 32 {
            return false;
        }
        let negate = bits(word, 21, 21) == 1;
        inst.op = match (bits(word, 30, 29), negate) {
            (0b00, false) => Op::And,
            (0b00, true) => Op::Bic,
            (0b01, false) => Op::Orr,
            (0b01, true) => Op::Orn,
            (0b10, false) => Op::Eor,
            (0b10, true) => Op::Eon,
            (0b11, false) => {
                inst.set_flags = true;
                Op::And
            }
            (_, true) => {
                inst.set_flags = true;
                Op::Bic
            }
            _ => return false,
        };
        return true;
    }

    // Conditional select.
    if bits(word, 28, 21) == 0b1101_0100 && bits(word, 29, 29) == 0 {
        inst.format = Format::CondSelect;
        inst.cond = Cond::from_bits(bits(word, 15, 12));
        inst.op = match (bits(word, 30, 30), bits(word, 11, 10)) {
            (0, 0b00) => Op::Csel,
            (0, 0b01) => Op::Csinc,
            (1, 0b00) => Op::Csinv,
            (1, 0b01) => Op::Csneg,
            _ => return false,
        };
        return true;
    }

    // Data-processing 2-source (divides and variable shifts).
    if bits(word, 30, 29) == 0 && bits(word, 28, 21) == 0b1101_0110 {
        inst.format = Format::DataProcReg;
        inst.op = match bits(word, 15, 10) {
            0b000010 => Op::Udiv,
            0b000011 => Op::Sdiv,
            0b001000 => Op::Lslv,
            0b001001 => Op::Lsrv,
            0b001010 => Op::Asrv,
            0b001011 => Op::Rorv,
            _ => return false,
        };
        return true;
    }

    // Data-processing 1-source (CLZ, RBIT, REV).
    if bits(word, 30, 29) == 0b10 && bits(word, 28, 21) == 0b1101_0110 && bits(word, 20, 16) == 0 {
        inst.format = Format::DataProcReg;
        inst.op = match bits(word, 15, 10) {
            0b000000 => Op::Rbit,
            0b000010 if !is_64 => Op::Rev,
            0b000011 if is_64 => Op::Rev,
            0b000100 => Op::Clz,
            _ => return false,
        };
        return true;
    }

    false
}
