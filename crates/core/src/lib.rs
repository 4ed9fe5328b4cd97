//! Cycle-accurate AArch64 superscalar pipeline simulator.
//!
//! This crate implements an M2-class wide-issue core modeled over an in-order
//! 5-stage backbone, with:
//! 1. **Pipeline:** Per-cycle tick across 1/2/4/6/8 parallel slots, with
//!    hazard detection, operand forwarding, and load/store port arbitration.
//! 2. **Speculation:** Bimodal+BTB branch prediction, early resolution and
//!    elimination of unconditional branches, mispredict flush with register
//!    checkpoint rollback, and speculative-store gating.
//! 3. **Fusion:** Compare + conditional-branch macro-op fusion.
//! 4. **Memory:** Optional I-/D-cache timing with miss latency and
//!    store-to-load forwarding penalties over a sparse byte-addressed memory.
//! 5. **ISA:** An integer AArch64 decoder, a serial functional reference
//!    model, and ELF/flat program loading.

/// Common constants and error types.
pub mod common;
/// Simulator configuration (options, predictor sizing).
pub mod config;
/// The modeled core (arch state, pipeline, units, latency, syscalls).
pub mod core;
/// Instruction set support (decode, instruction model, branch classification).
pub mod isa;
/// Byte-addressed guest memory.
pub mod mem;
/// Simulation drivers (loader, direct mode, simulator wrapper).
pub mod sim;
/// Statistics collection and reporting.
pub mod stats;

/// Top-level options type; deserialize from JSON or use `SimOptions::default()`.
pub use crate::config::SimOptions;
/// The cycle-accurate pipeline; constructed from register file + memory + options.
pub use crate::core::Pipeline;
/// Serial functional reference model.
pub use crate::sim::DirectCore;
/// Pipeline plus loaded program.
pub use crate::sim::Simulator;
/// Observable performance counters.
pub use crate::stats::PipelineStats;
