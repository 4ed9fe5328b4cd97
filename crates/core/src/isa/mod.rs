//! AArch64 instruction set support.
//!
//! This module covers the integer subset of the A64 encoding space that the
//! pipeline models. It provides:
//! 1. **Instruction Model:** `DecodedInst` with operation, format, register, and immediate fields.
//! 2. **Decoding:** `decode` / `decode_into` from raw 32-bit little-endian words.
//! 3. **Branch Classification:** Raw-word branch recognition and target arithmetic
//!    used by the fetch stage before full decode.

/// Decoded instruction representation and field conventions.
pub mod instruction;

/// A64 instruction word decoding.
pub mod decode;

/// Raw-word branch classification and target computation.
pub mod branch;

pub use decode::{decode, decode_into};
pub use instruction::{Cond, DecodedInst, Format, IndexMode, Op, ShiftType};
