//! Decoded instruction representation.
//!
//! This module defines the structures a decoded A64 instruction is carried in
//! throughout the pipeline. It provides:
//! 1. **Operation and Format Tags:** `Op` and `Format` classifying each instruction.
//! 2. **Field Conventions:** Register, immediate, shift, and addressing-mode fields.
//! 3. **Pipeline Queries:** Source/destination usage helpers the hazard and issue
//!    logic is written against.
//!
//! Field conventions follow the A64 assembler view: `rd` is the destination (or
//! the transfer register `Rt` for loads and stores, which makes it the *source*
//! of a store's data), `rn` is the first operand or address base, `rm` the
//! second operand or register offset, and `rt2` the second transfer register of
//! pair operations (also the addend `Ra` of 3-source multiplies).

/// Operation performed by a decoded instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Op {
    /// Integer addition.
    #[default]
    Add,
    /// Integer subtraction.
    Sub,
    /// Bitwise AND.
    And,
    /// Bitwise inclusive OR.
    Orr,
    /// Bitwise exclusive OR.
    Eor,
    /// Bitwise AND with complement of the second operand.
    Bic,
    /// Bitwise OR with complement of the second operand.
    Orn,
    /// Bitwise XOR with complement of the second operand.
    Eon,
    /// Move wide with zero (`MOVZ`).
    Movz,
    /// Move wide with NOT (`MOVN`).
    Movn,
    /// Move wide with keep (`MOVK`); reads and partially rewrites `rd`.
    Movk,
    /// PC-relative address (`ADR`).
    Adr,
    /// PC-relative page address (`ADRP`).
    Adrp,
    /// Unsigned bitfield move (`UBFM`; covers `LSL`/`LSR` immediate aliases).
    Ubfm,
    /// Signed bitfield move (`SBFM`; covers `ASR` immediate and sign extends).
    Sbfm,
    /// Variable shift left (`LSLV`).
    Lslv,
    /// Variable logical shift right (`LSRV`).
    Lsrv,
    /// Variable arithmetic shift right (`ASRV`).
    Asrv,
    /// Variable rotate right (`RORV`).
    Rorv,
    /// Multiply-add (`MADD`; `rt2` is the addend register `Ra`).
    Madd,
    /// Multiply-subtract (`MSUB`; `rt2` is the minuend register `Ra`).
    Msub,
    /// Signed multiply high (`SMULH`).
    Smulh,
    /// Unsigned multiply high (`UMULH`).
    Umulh,
    /// Signed divide (`SDIV`).
    Sdiv,
    /// Unsigned divide (`UDIV`).
    Udiv,
    /// Conditional select (`CSEL`).
    Csel,
    /// Conditional select increment (`CSINC`; covers `CSET`/`CINC`).
    Csinc,
    /// Conditional select invert (`CSINV`).
    Csinv,
    /// Conditional select negate (`CSNEG`).
    Csneg,
    /// Count leading zeros.
    Clz,
    /// Reverse bit order.
    Rbit,
    /// Reverse bytes.
    Rev,
    /// Load register (32- or 64-bit per `is_64`).
    Ldr,
    /// Load byte, zero-extended.
    Ldrb,
    /// Load halfword, zero-extended.
    Ldrh,
    /// Load byte, sign-extended.
    Ldrsb,
    /// Load halfword, sign-extended.
    Ldrsh,
    /// Load word, sign-extended to 64 bits.
    Ldrsw,
    /// Load pair (`rd` and `rt2`).
    Ldp,
    /// Store register (32- or 64-bit per `is_64`).
    Str,
    /// Store byte.
    Strb,
    /// Store halfword.
    Strh,
    /// Store pair (`rd` and `rt2`).
    Stp,
    /// Unconditional branch.
    B,
    /// Branch with link (writes X30).
    Bl,
    /// Conditional branch (`B.cond`).
    Bcond,
    /// Compare and branch on zero.
    Cbz,
    /// Compare and branch on non-zero.
    Cbnz,
    /// Test bit and branch on zero.
    Tbz,
    /// Test bit and branch on non-zero.
    Tbnz,
    /// Indirect branch to register.
    Br,
    /// Indirect branch with link.
    Blr,
    /// Return (indirect branch, defaults to X30).
    Ret,
    /// Supervisor call.
    Svc,
    /// No operation (covers the hint space).
    Nop,
    /// Undecodable word; drives the unknown-instruction halt when it reaches
    /// the memory stage's primary slot.
    Udf,
}

/// Encoding family of a decoded instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Format {
    /// Add/subtract immediate.
    #[default]
    DataProcImm,
    /// Register-register data processing (2 sources).
    DataProcReg,
    /// Register data processing with 3 sources (`MADD`/`MSUB`).
    DataProc3Src,
    /// Logical operation with bitmask immediate.
    LogicalImm,
    /// Bitfield move (`UBFM`/`SBFM`).
    Bitfield,
    /// Move-wide immediate (`MOVZ`/`MOVN`/`MOVK`).
    MoveWide,
    /// PC-relative address generation.
    PcRel,
    /// Conditional select family.
    CondSelect,
    /// Single-register load or store.
    LoadStore,
    /// Load/store pair.
    LoadStorePair,
    /// Unconditional immediate branch.
    Branch,
    /// Conditional branch.
    BranchCond,
    /// Compare-and-branch (`CBZ`/`CBNZ`).
    CompareBranch,
    /// Test-bit-and-branch (`TBZ`/`TBNZ`).
    TestBranch,
    /// Register-indirect branch.
    BranchReg,
    /// System instruction (`SVC`, hints).
    System,
}

/// Addressing mode of a load or store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum IndexMode {
    /// Unsigned scaled immediate offset (no base update).
    #[default]
    None,
    /// Signed unscaled immediate offset (`LDUR`/`STUR`).
    Signed,
    /// Pre-indexed: base is updated before the access.
    Pre,
    /// Post-indexed: base is updated after the access.
    Post,
    /// Register offset with optional extend/shift.
    RegBase,
}

/// Shift applied to a register operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ShiftType {
    /// Logical shift left.
    #[default]
    Lsl,
    /// Logical shift right.
    Lsr,
    /// Arithmetic shift right.
    Asr,
    /// Rotate right.
    Ror,
}

/// A64 condition codes, in encoding order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Cond {
    /// Equal (Z set).
    #[default]
    Eq,
    /// Not equal (Z clear).
    Ne,
    /// Carry set / unsigned higher-or-same.
    Cs,
    /// Carry clear / unsigned lower.
    Cc,
    /// Minus / negative (N set).
    Mi,
    /// Plus / non-negative (N clear).
    Pl,
    /// Overflow set.
    Vs,
    /// Overflow clear.
    Vc,
    /// Unsigned higher.
    Hi,
    /// Unsigned lower-or-same.
    Ls,
    /// Signed greater-or-equal.
    Ge,
    /// Signed less-than.
    Lt,
    /// Signed greater-than.
    Gt,
    /// Signed less-or-equal.
    Le,
    /// Always.
    Al,
    /// Always (second encoding).
    Nv,
}

impl Cond {
    /// Decodes a 4-bit condition field.
    pub const fn from_bits(bits: u32) -> Self {
        match bits & 0xF {
            0 => Self::Eq,
            1 => Self::Ne,
            2 => Self::Cs,
            3 => Self::Cc,
            4 => Self::Mi,
            5 => Self::Pl,
            6 => Self::Vs,
            7 => Self::Vc,
            8 => Self::Hi,
            9 => Self::Ls,
            10 => Self::Ge,
            11 => Self::Lt,
            12 => Self::Gt,
            13 => Self::Le,
            14 => Self::Al,
            _ => Self::Nv,
        }
    }

    /// Evaluates the condition against N/Z/C/V flag values.
    pub const fn holds(self, n: bool, z: bool, c: bool, v: bool) -> bool {
        match self {
            Self::Eq => z,
            Self::Ne => !z,
            Self::Cs => c,
            Self::Cc => !c,
            Self::Mi => n,
            Self::Pl => !n,
            Self::Vs => v,
            Self::Vc => !v,
            Self::Hi => c && !z,
            Self::Ls => !(c && !z),
            Self::Ge => n == v,
            Self::Lt => n != v,
            Self::Gt => !z && n == v,
            Self::Le => !(!z && n == v),
            Self::Al | Self::Nv => true,
        }
    }
}

/// A fully decoded A64 instruction.
///
/// All fields are populated by [`crate::isa::decode`]; unused fields for a
/// given format are left at their defaults. The struct is `Copy` so that
/// pipeline latches can carry it by value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DecodedInst {
    /// Operation tag.
    pub op: Op,
    /// Encoding family.
    pub format: Format,
    /// 64-bit operand width (`sf` bit); 32-bit results are zero-extended.
    pub is_64: bool,
    /// Instruction updates the N/Z/C/V flags.
    pub set_flags: bool,
    /// Destination register, or transfer register `Rt` for loads/stores.
    pub rd: u8,
    /// First source / address base register.
    pub rn: u8,
    /// Second source / register-offset register.
    pub rm: u8,
    /// Second transfer register of pairs; addend `Ra` of 3-source multiplies.
    pub rt2: u8,
    /// Primary immediate (zero-extended payload; meaning depends on `op`).
    pub imm: u64,
    /// Secondary immediate: move-wide shift amount, test-branch bit number,
    /// bitfield `imms`, or register-offset extend option.
    pub imm2: u64,
    /// Shift amount for shifted-register operands (bitfield `immr`).
    pub shift: u8,
    /// Shift kind for shifted-register operands.
    pub shift_type: ShiftType,
    /// Signed byte offset of load/store addressing.
    pub signed_imm: i64,
    /// Signed branch displacement in bytes, relative to the instruction.
    pub branch_offset: i64,
    /// Load/store addressing mode.
    pub index_mode: IndexMode,
    /// Condition for `B.cond` and the conditional-select family.
    pub cond: Cond,
}

impl DecodedInst {
    /// True for loads (memory read into a register).
    pub const fn is_load(&self) -> bool {
        matches!(
            self.op,
            Op::Ldr | Op::Ldrb | Op::Ldrh | Op::Ldrsb | Op::Ldrsh | Op::Ldrsw | Op::Ldp
        )
    }

    /// True for stores (register written to memory).
    pub const fn is_store(&self) -> bool {
        matches!(self.op, Op::Str | Op::Strb | Op::Strh | Op::Stp)
    }

    /// True for any memory-bearing operation.
    pub const fn is_mem(&self) -> bool {
        self.is_load() || self.is_store()
    }

    /// True for any control-flow instruction.
    pub const fn is_branch(&self) -> bool {
        matches!(
            self.op,
            Op::B
                | Op::Bl
                | Op::Bcond
                | Op::Cbz
                | Op::Cbnz
                | Op::Tbz
                | Op::Tbnz
                | Op::Br
                | Op::Blr
                | Op::Ret
        )
    }

    /// True when the instruction reads the N/Z/C/V flags.
    pub const fn reads_flags(&self) -> bool {
        matches!(
            self.op,
            Op::Bcond | Op::Csel | Op::Csinc | Op::Csinv | Op::Csneg
        )
    }

    /// True when the instruction writes a general-purpose register.
    ///
    /// Pre/post-indexed base updates are reported separately by
    /// [`Self::base_writeback`].
    pub const fn writes_reg(&self) -> bool {
        !matches!(
            self.op,
            Op::Str
                | Op::Strb
                | Op::Strh
                | Op::Stp
                | Op::B
                | Op::Bcond
                | Op::Cbz
                | Op::Cbnz
                | Op::Tbz
                | Op::Tbnz
                | Op::Br
                | Op::Ret
                | Op::Svc
                | Op::Nop
                | Op::Udf
        )
    }

    /// True when the instruction reads `rn`.
    pub const fn uses_rn(&self) -> bool {
        !matches!(
            self.format,
            Format::MoveWide
                | Format::PcRel
                | Format::Branch
                | Format::BranchCond
                | Format::CompareBranch
                | Format::TestBranch
                | Format::System
        )
    }

    /// True when the instruction reads `rm`.
    pub const fn uses_rm(&self) -> bool {
        match self.format {
            Format::DataProcReg | Format::DataProc3Src | Format::CondSelect => {
                !matches!(self.op, Op::Clz | Op::Rbit | Op::Rev)
            }
            Format::LoadStore | Format::LoadStorePair => {
                matches!(self.index_mode, IndexMode::RegBase)
            }
            _ => false,
        }
    }

    /// True when the instruction reads `rd` as a data source: stores read the
    /// value to write from `Rt`, `MOVK` rewrites part of its old destination,
    /// and compare/test branches test the register in the `Rt` position.
    pub const fn reads_rd(&self) -> bool {
        self.is_store() || matches!(self.op, Op::Movk | Op::Cbz | Op::Cbnz | Op::Tbz | Op::Tbnz)
    }

    /// True when the instruction reads `rt2` (second store-pair register or
    /// the `Ra` addend of 3-source multiplies).
    pub const fn uses_rt2(&self) -> bool {
        matches!(self.op, Op::Stp | Op::Madd | Op::Msub)
    }

    /// Base register written back by pre/post-indexed addressing, if any.
    pub const fn base_writeback(&self) -> Option<u8> {
        if self.is_mem() && matches!(self.index_mode, IndexMode::Pre | IndexMode::Post) {
            Some(self.rn)
        } else {
            None
        }
    }

    /// Bytes transferred per register of a load/store.
    pub const fn mem_size(&self) -> u64 {
        match self.op {
            Op::Ldrb | Op::Strb | Op::Ldrsb => 1,
            Op::Ldrh | Op::Strh | Op::Ldrsh => 2,
            Op::Ldr | Op::Str | Op::Ldp | Op::Stp => {
                if self.is_64 {
                    8
                } else {
                    4
                }
            }
            Op::Ldrsw => 4,
            _ => 0,
        }
    }

    /// Applies the load's zero/sign extension to a raw memory value.
    pub const fn extend_loaded(&self, raw: u64) -> u64 {
        match self.op {
            Op::Ldrsb => raw as u8 as i8 as i64 as u64,
            Op::Ldrsh => raw as u16 as i16 as i64 as u64,
            Op::Ldrsw => raw as u32 as i32 as i64 as u64,
            _ => raw,
        }
    }
}
