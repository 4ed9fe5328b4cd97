//! Execution units.
//!
//! This module contains the functional units the pipeline stages delegate to:
//! 1. **ALU:** Pure integer arithmetic, logic, shifts, and flag generation,
//!    shared between the pipeline execute stage and the serial reference model.
//! 2. **BRU:** Bimodal branch direction prediction and the branch target buffer.
//! 3. **Cache:** Set-associative timing model for the optional I- and D-caches.

/// Integer ALU and flag arithmetic.
pub mod alu;

/// Branch prediction unit (bimodal BHT + BTB).
pub mod bru;

/// Set-associative cache timing model.
pub mod cache;
