//! Simulation drivers.
//!
//! This module contains everything above the pipeline itself:
//! 1. **Loader:** ELF and flat-binary program loading.
//! 2. **Direct:** The serial instruction-at-a-time functional model used as
//!    the architectural reference and as a fast execution mode.
//! 3. **Simulator:** The thin wrapper owning a pipeline and a loaded program.

/// Program loading (ELF via `object`, flat binaries).
pub mod loader;

/// Serial functional execution model.
pub mod direct;

/// Top-level simulator wrapper.
pub mod simulator;

pub use direct::DirectCore;
pub use simulator::Simulator;
