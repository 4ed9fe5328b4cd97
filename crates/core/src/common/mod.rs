//! Common utilities and types used throughout the AArch64 pipeline simulator.
//!
//! This module provides fundamental building blocks that are shared across all
//! components of the simulator. It includes:
//! 1. **Constants:** Issue-width limits, port counts, and register conventions.
//! 2. **Error Handling:** Outer-surface error types for loading and configuration.

/// Common constants used throughout the simulator.
pub mod constants;

/// Error types for the fallible outer surfaces (loader, configuration).
pub mod error;

pub use constants::{INSTRUCTION_SIZE, MAX_ISSUE_WIDTH, ZERO_REG};
pub use error::SimError;
