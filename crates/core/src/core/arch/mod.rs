//! Architectural state of the modeled core.
//!
//! This module holds the AArch64 programmer-visible state the pipeline operates
//! on. It provides:
//! 1. **Register File:** X0–X30 plus SP, with register 31 as the zero register.
//! 2. **PSTATE:** The N/Z/C/V condition flags.
//! 3. **Checkpoint:** The branch-speculation snapshot used for mispredict rollback.

/// General-purpose register file.
pub mod regs;

/// N/Z/C/V condition flags.
pub mod pstate;

/// Register checkpoint for speculation rollback.
pub mod checkpoint;

pub use checkpoint::Checkpoint;
pub use pstate::Pstate;
pub use regs::RegisterFile;
