//! Simulator error definitions.
//!
//! This module defines the error types for the simulator's fallible outer
//! surfaces. It provides:
//! 1. **Loader Errors:** I/O and ELF-parsing failures when loading guest programs.
//! 2. **Configuration Errors:** Rejected option combinations such as unsupported widths.
//!
//! The pipeline core itself never produces these: program outcomes (clean halt,
//! unknown instruction, instruction cap) are encoded as state transitions on the
//! pipeline, inspected via `halted()` and `exit_code()`.

use thiserror::Error;

/// Errors produced while constructing or feeding a simulation.
#[derive(Debug, Error)]
pub enum SimError {
    /// The requested issue width is not one of the supported configurations.
    #[error("unsupported issue width {0} (supported: 1, 2, 4, 6, 8)")]
    UnsupportedWidth(usize),

    /// A structural configuration value was rejected.
    ///
    /// The associated string names the offending option and constraint.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A guest program file could not be read from disk.
    #[error("failed to read program: {0}")]
    Io(#[from] std::io::Error),

    /// A guest ELF image could not be parsed.
    #[error("failed to parse ELF image: {0}")]
    Elf(#[from] object::Error),
}
