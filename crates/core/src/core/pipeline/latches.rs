//! Pipeline latch structures for inter-stage communication.
//!
//! This module defines the buffers that connect the five stages of the
//! pipeline. It implements:
//! 1. **Instruction Flow:** Entries carrying state between Fetch, Decode/Issue,
//!    Execute, Memory, and Writeback.
//! 2. **Superscalar Support:** One entry per slot, stored in width-indexed
//!    arrays on the pipeline.
//! 3. **Speculation Metadata:** Prediction fields, the after-branch store gate,
//!    and the fused compare payload.
//!
//! Across any cycle boundary each slot's latch is either rewritten by the
//! producing stage or deliberately held/cleared by the stall logic; latches
//! are never mutated mid-cycle.

use crate::isa::instruction::DecodedInst;

/// Entry in the IF/ID latch (fetch to decode), also the instruction-window
/// element type.
#[derive(Clone, Copy, Debug, Default)]
pub struct IfIdEntry {
    /// Slot holds a fetched instruction.
    pub valid: bool,
    /// Program counter of the instruction.
    pub pc: u64,
    /// Raw 32-bit instruction word.
    pub inst_word: u32,
    /// Fetch-time direction prediction.
    pub predicted_taken: bool,
    /// Fetch-time target prediction; meaningful when predicted taken.
    pub predicted_target: u64,
    /// Branch direction and target were fully resolved at fetch (`BL`).
    pub early_resolved: bool,
    /// Fetched in the shadow of an unresolved predicted-taken branch; gates
    /// store issue.
    pub after_branch: bool,
}

/// Operands carried by a fused compare+branch, letting the branch evaluate
/// its condition without reading architectural flags.
#[derive(Clone, Copy, Debug, Default)]
pub struct FusionPayload {
    /// Compare's destination register (31 for the discarding `CMP`/`CMN`
    /// aliases; a flag-setting `SUBS`/`ADDS` keeps its result).
    pub rd: u8,
    /// Compare's first source register (for forwarding correction).
    pub rn: u8,
    /// Compare's second source register (register-form compares).
    pub rm: u8,
    /// Compare's first operand value as read at dispatch.
    pub rn_val: u64,
    /// Compare's second operand value as read at dispatch.
    pub rm_val: u64,
    /// Compare operates at 64-bit width.
    pub is_64: bool,
    /// Compare's second operand is an immediate.
    pub is_imm: bool,
    /// Immediate operand value for immediate-form compares.
    pub imm_val: u64,
    /// Compare adds instead of subtracting (`CMN` rather than `CMP`).
    pub is_cmn: bool,
}

/// Entry in the ID/EX latch (decode/issue to execute).
#[derive(Clone, Copy, Debug, Default)]
pub struct IdExEntry {
    /// Slot holds an issued instruction.
    pub valid: bool,
    /// Program counter of the instruction.
    pub pc: u64,
    /// Decoded instruction.
    pub inst: DecodedInst,
    /// `rn` value as read at dispatch (execute re-resolves via forwarding).
    pub rn_val: u64,
    /// `rm` value as read at dispatch.
    pub rm_val: u64,
    /// `rd`-as-source value as read at dispatch (store data, `MOVK`,
    /// compare/test branches).
    pub rd_val: u64,
    /// `rt2` value as read at dispatch (store pairs, multiply addend).
    pub rt2_val: u64,
    /// Remaining execute cycles; the slot stalls while above one.
    pub latency_remaining: u64,
    /// Fetch-time direction prediction.
    pub predicted_taken: bool,
    /// Fetch-time target prediction.
    pub predicted_target: u64,
    /// Branch was resolved at fetch.
    pub early_resolved: bool,
    /// Compare operands for a fused compare+branch in slot 0.
    pub fusion: Option<FusionPayload>,
}

/// Entry in the EX/MEM latch (execute to memory).
#[derive(Clone, Copy, Debug, Default)]
pub struct ExMemEntry {
    /// Slot holds an executed instruction.
    pub valid: bool,
    /// Program counter of the instruction.
    pub pc: u64,
    /// Decoded instruction.
    pub inst: DecodedInst,
    /// ALU result, or the effective address for memory operations.
    pub alu_result: u64,
    /// Data for the store port (first register of a pair).
    pub store_value: u64,
    /// Data for the second register of a store pair.
    pub store_value2: u64,
    /// Destination register.
    pub rd: u8,
    /// Memory read requested.
    pub mem_read: bool,
    /// Memory write requested.
    pub mem_write: bool,
    /// Register write requested at writeback.
    pub reg_write: bool,
    /// Writeback takes the memory data instead of the ALU result.
    pub mem_to_reg: bool,
    /// Entry retires as a fused compare+branch (counts as two instructions).
    pub is_fused: bool,
    /// Entry produced new flag values.
    pub sets_flags: bool,
    /// Negative flag produced by this entry.
    pub n: bool,
    /// Zero flag produced by this entry.
    pub z: bool,
    /// Carry flag produced by this entry.
    pub c: bool,
    /// Overflow flag produced by this entry.
    pub v: bool,
    /// Pre/post-index base update retired alongside the entry.
    pub base_writeback: Option<(u8, u64)>,
}

/// Entry in the MEM/WB latch (memory to writeback).
#[derive(Clone, Copy, Debug, Default)]
pub struct MemWbEntry {
    /// Slot holds a completed instruction.
    pub valid: bool,
    /// Program counter of the instruction.
    pub pc: u64,
    /// Decoded instruction.
    pub inst: DecodedInst,
    /// ALU result for non-load writebacks.
    pub alu_result: u64,
    /// Loaded data (first register of a pair).
    pub mem_data: u64,
    /// Loaded data for the second register of a pair.
    pub mem_data2: u64,
    /// Destination register.
    pub rd: u8,
    /// Register write requested.
    pub reg_write: bool,
    /// Writeback takes `mem_data` instead of `alu_result`.
    pub mem_to_reg: bool,
    /// Entry retires as a fused compare+branch.
    pub is_fused: bool,
    /// Pre/post-index base update retired alongside the entry.
    pub base_writeback: Option<(u8, u64)>,
}
