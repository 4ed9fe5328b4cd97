//! Integer ALU and flag arithmetic.
//!
//! Pure functions computing data-processing results and N/Z/C/V flags. They
//! are shared by the pipeline execute stage and the serial reference model so
//! that both produce bit-identical architectural results. It implements:
//! 1. **Flag Arithmetic:** Add-with-carry covering ADD/ADDS/SUB/SUBS/CMP/CMN.
//! 2. **Operand Shaping:** Shifted-register and extended-register operands.
//! 3. **Data Operations:** Logic, moves, bitfields, multiplies, divides,
//!    conditional selects, and bit-manipulation ops.
//! 4. **Address Generation:** Load/store addressing with pre/post writeback.

use crate::core::arch::Pstate;
use crate::isa::instruction::{DecodedInst, Format, IndexMode, Op, ShiftType};

/// Result of a data-processing operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AluOut {
    /// Value destined for the target register (already zero-extended for W ops).
    pub value: u64,
    /// New N/Z/C/V flags, when the operation sets them.
    pub nzcv: Option<(bool, bool, bool, bool)>,
}

/// Masks a value to the operation width, zero-extending W results.
#[inline]
const fn mask_width(value: u64, is_64: bool) -> u64 {
    if is_64 { value } else { value & 0xFFFF_FFFF }
}

/// Most significant bit of the operation width.
#[inline]
const fn sign_bit(value: u64, is_64: bool) -> bool {
    if is_64 {
        value >> 63 != 0
    } else {
        (value >> 31) & 1 != 0
    }
}

/// Adds `a + b + carry_in` at the operation width, producing N/Z/C/V.
///
/// Subtraction is `add_with_carry(a, !b, true)` per the A64 definition.
pub const fn add_with_carry(a: u64, b: u64, carry_in: bool, is_64: bool) -> (u64, (bool, bool, bool, bool)) {
    let a = mask_width(a, is_64);
    let b = mask_width(b, is_64);
    let wide = a as u128 + b as u128 + carry_in as u128;
    let result = mask_width(wide as u64, is_64);
    let carry_bit = if is_64 { 64 } else { 32 };
    let c = (wide >> carry_bit) != 0;
    let v = {
        let sa = sign_bit(a, is_64);
        let sb = sign_bit(b, is_64);
        let sr = sign_bit(result, is_64);
        sa == sb && sa != sr
    };
    let n = sign_bit(result, is_64);
    let z = result == 0;
    (result, (n, z, c, v))
}

/// Applies a shift to a register operand at the operation width.
pub const fn shift_value(value: u64, shift_type: ShiftType, amount: u32, is_64: bool) -> u64 {
    let value = mask_width(value, is_64);
    let width: u32 = if is_64 { 64 } else { 32 };
    let amount = amount % width;
    let shifted = match shift_type {
        ShiftType::Lsl => {
            if amount == 0 {
                value
            } else {
                value << amount
            }
        }
        ShiftType::Lsr => value >> amount,
        ShiftType::Asr => {
            if is_64 {
                ((value as i64) >> amount) as u64
            } else {
                ((value as u32 as i32) >> amount) as u32 as u64
            }
        }
        ShiftType::Ror => {
            if is_64 {
                value.rotate_right(amount)
            } else {
                ((value as u32).rotate_right(amount)) as u64
            }
        }
    };
    mask_width(shifted, is_64)
}

/// Applies a register-offset extend option (`UXTW`/`LSL`/`SXTW`/`SXTX`).
const fn extend_offset(value: u64, option: u64, shift: u8) -> u64 {
    let extended = match option {
        0b010 => value as u32 as u64,
        0b110 => value as u32 as i32 as i64 as u64,
        _ => value,
    };
    extended << shift
}

/// Computes a load/store effective address.
///
/// # Returns
///
/// The access address and, for pre/post-indexed modes, the updated base value
/// written back to `rn`.
pub const fn compute_address(inst: &DecodedInst, base: u64, offset_reg: u64) -> (u64, Option<u64>) {
    match inst.index_mode {
        IndexMode::None | IndexMode::Signed => (base.wrapping_add(inst.signed_imm as u64), None),
        IndexMode::Pre => {
            let addr = base.wrapping_add(inst.signed_imm as u64);
            (addr, Some(addr))
        }
        IndexMode::Post => (base, Some(base.wrapping_add(inst.signed_imm as u64))),
        IndexMode::RegBase => (
            base.wrapping_add(extend_offset(offset_reg, inst.imm2, inst.shift)),
            None,
        ),
    }
}

/// Bitfield move (`UBFM`/`SBFM`) at the operation width.
fn bitfield_move(inst: &DecodedInst, src: u64) -> u64 {
    let width: u64 = if inst.is_64 { 64 } else { 32 };
    let r = u64::from(inst.shift);
    let s = inst.imm2;
    let src = mask_width(src, inst.is_64);
    let signed = inst.op == Op::Sbfm;

    let (value, top_bit) = if s >= r {
        let len = s - r + 1;
        let field = (src >> r) & ones(len);
        (field, len - 1)
    } else {
        let len = s + 1;
        let field = (src & ones(len)) << (width - r);
        (mask_width(field, inst.is_64), width - r + s)
    };

    if signed && top_bit < width - 1 && (value >> top_bit) & 1 == 1 {
        mask_width(value | (u64::MAX << (top_bit + 1)), inst.is_64)
    } else {
        value
    }
}

/// A mask of `n` low ones (`n` <= 64).
const fn ones(n: u64) -> u64 {
    if n >= 64 { u64::MAX } else { (1u64 << n) - 1 }
}

/// Executes a non-memory, non-branch data operation.
///
/// # Arguments
///
/// * `inst` - The decoded instruction.
/// * `pc` - Instruction address (for PC-relative address generation).
/// * `rn_val` / `rm_val` - Forwarded source operand values.
/// * `extra` - Third operand: the `Ra` addend for 3-source multiplies, or the
///   old destination value for `MOVK`.
/// * `pstate` - Current flags, read by the conditional-select family.
pub fn execute_data(
    inst: &DecodedInst,
    pc: u64,
    rn_val: u64,
    rm_val: u64,
    extra: u64,
    pstate: Pstate,
) -> AluOut {
    let is_64 = inst.is_64;
    let operand2 = match inst.format {
        Format::DataProcImm | Format::LogicalImm => inst.imm,
        Format::DataProcReg => shift_value(rm_val, inst.shift_type, u32::from(inst.shift), is_64),
        _ => mask_width(rm_val, is_64),
    };
    let a = mask_width(rn_val, is_64);

    match inst.op {
        Op::Add => {
            let (value, flags) = add_with_carry(a, operand2, false, is_64);
            AluOut {
                value,
                nzcv: inst.set_flags.then_some(flags),
            }
        }
        Op::Sub => {
            let (value, flags) = add_with_carry(a, !operand2, true, is_64);
            AluOut {
                value,
                nzcv: inst.set_flags.then_some(flags),
            }
        }
        Op::And | Op::Bic | Op::Orr | Op::Orn | Op::Eor | Op::Eon => {
            let b = match inst.op {
                Op::Bic | Op::Orn | Op::Eon => mask_width(!operand2, is_64),
                _ => operand2,
            };
            let value = match inst.op {
                Op::And | Op::Bic => a & b,
                Op::Orr | Op::Orn => a | b,
                _ => a ^ b,
            };
            AluOut {
                value,
                nzcv: inst
                    .set_flags
                    .then_some((sign_bit(value, is_64), value == 0, false, false)),
            }
        }
        Op::Movz => AluOut {
            value: mask_width(inst.imm << inst.imm2, is_64),
            nzcv: None,
        },
        Op::Movn => AluOut {
            value: mask_width(!(inst.imm << inst.imm2), is_64),
            nzcv: None,
        },
        Op::Movk => {
            let keep = mask_width(extra, is_64) & !(0xFFFF << inst.imm2);
            AluOut {
                value: mask_width(keep | (inst.imm << inst.imm2), is_64),
                nzcv: None,
            }
        }
        Op::Adr => AluOut {
            value: pc.wrapping_add(inst.signed_imm as u64),
            nzcv: None,
        },
        Op::Adrp => AluOut {
            value: (pc & !0xFFF).wrapping_add((inst.signed_imm as u64) << 12),
            nzcv: None,
        },
        Op::Ubfm | Op::Sbfm => AluOut {
            value: bitfield_move(inst, rn_val),
            nzcv: None,
        },
        Op::Lslv => AluOut {
            value: shift_value(a, ShiftType::Lsl, operand_amount(rm_val, is_64), is_64),
            nzcv: None,
        },
        Op::Lsrv => AluOut {
            value: shift_value(a, ShiftType::Lsr, operand_amount(rm_val, is_64), is_64),
            nzcv: None,
        },
        Op::Asrv => AluOut {
            value: shift_value(a, ShiftType::Asr, operand_amount(rm_val, is_64), is_64),
            nzcv: None,
        },
        Op::Rorv => AluOut {
            value: shift_value(a, ShiftType::Ror, operand_amount(rm_val, is_64), is_64),
            nzcv: None,
        },
        Op::Madd => AluOut {
            value: mask_width(extra.wrapping_add(a.wrapping_mul(mask_width(rm_val, is_64))), is_64),
            nzcv: None,
        },
        Op::Msub => AluOut {
            value: mask_width(extra.wrapping_sub(a.wrapping_mul(mask_width(rm_val, is_64))), is_64),
            nzcv: None,
        },
        Op::Smulh => AluOut {
            value: ((i128::from(rn_val as i64) * i128::from(rm_val as i64)) >> 64) as u64,
            nzcv: None,
        },
        Op::Umulh => AluOut {
            value: ((u128::from(rn_val) * u128::from(rm_val)) >> 64) as u64,
            nzcv: None,
        },
        Op::Sdiv => AluOut {
            value: signed_divide(a, mask_width(rm_val, is_64), is_64),
            nzcv: None,
        },
        Op::Udiv => {
            let b = mask_width(rm_val, is_64);
            AluOut {
                value: if b == 0 { 0 } else { a / b },
                nzcv: None,
            }
        }
        Op::Csel | Op::Csinc | Op::Csinv | Op::Csneg => {
            let b = mask_width(rm_val, is_64);
            let value = if inst.cond.holds(pstate.n, pstate.z, pstate.c, pstate.v) {
                a
            } else {
                match inst.op {
                    Op::Csinc => mask_width(b.wrapping_add(1), is_64),
                    Op::Csinv => mask_width(!b, is_64),
                    Op::Csneg => mask_width(b.wrapping_neg(), is_64),
                    _ => b,
                }
            };
            AluOut { value, nzcv: None }
        }
        Op::Clz => AluOut {
            value: if is_64 {
                u64::from(a.leading_zeros())
            } else {
                u64::from((a as u32).leading_zeros())
            },
            nzcv: None,
        },
        Op::Rbit => AluOut {
            value: if is_64 {
                a.reverse_bits()
            } else {
                u64::from((a as u32).reverse_bits())
            },
            nzcv: None,
        },
        Op::Rev => AluOut {
            value: if is_64 {
                a.swap_bytes()
            } else {
                u64::from((a as u32).swap_bytes())
            },
            nzcv: None,
        },
        // Memory, branch, and system ops are handled by their own stages.
        _ => AluOut::default(),
    }
}

/// Variable-shift amount from the low bits of `rm`.
const fn operand_amount(rm_val: u64, is_64: bool) -> u32 {
    if is_64 {
        (rm_val & 63) as u32
    } else {
        (rm_val & 31) as u32
    }
}

/// Signed division with the A64 zero-divisor and overflow rules.
const fn signed_divide(a: u64, b: u64, is_64: bool) -> u64 {
    if is_64 {
        let (a, b) = (a as i64, b as i64);
        if b == 0 {
            0
        } else {
            a.wrapping_div(b) as u64
        }
    } else {
        let (a, b) = (a as u32 as i32, b as u32 as i32);
        if b == 0 {
            0
        } else {
            a.wrapping_div(b) as u32 as u64
        }
    }
}
