//! The modeled core: architectural state, pipeline, and execution units.
//!
//! This module groups everything belonging to a single simulated core:
//! 1. **Arch:** Register file, PSTATE flags, and the speculation checkpoint.
//! 2. **Pipeline:** The cycle-accurate wide-issue 5-stage pipeline.
//! 3. **Units:** ALU, branch prediction, and cache timing.
//! 4. **Latency:** The per-instruction execute latency table.
//! 5. **Syscall:** The supervisor-call seam and its Linux-ABI default.

/// Architectural register and flag state.
pub mod arch;

/// Per-instruction latency table.
pub mod latency;

/// The cycle-accurate pipeline.
pub mod pipeline;

/// Supervisor-call handling.
pub mod syscall;

/// Execution units (ALU, branch prediction, caches).
pub mod units;

pub use pipeline::Pipeline;
