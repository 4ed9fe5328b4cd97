//! Global pipeline constants.
//!
//! This module defines the structural constants of the modeled core. It includes:
//! 1. **Issue Constants:** Supported widths and the slot-array upper bound.
//! 2. **Port Constants:** Execution and memory port counts for the widest configuration.
//! 3. **Register Conventions:** The zero register and the link register.

/// Largest supported issue width; all slot arrays are sized to this.
pub const MAX_ISSUE_WIDTH: usize = 8;

/// Issue widths the tick engine accepts.
pub const SUPPORTED_WIDTHS: &[usize] = &[1, 2, 4, 6, 8];

/// Size of an AArch64 instruction in bytes.
pub const INSTRUCTION_SIZE: u64 = 4;

/// Register index 31: reads return zero, writes are discarded.
pub const ZERO_REG: u8 = 31;

/// Register index of the procedure link register (X30), written by `BL`/`BLR`.
pub const LINK_REG: u8 = 30;

/// ALU ports available to a single issue group at 6-wide and above.
pub const MAX_ALU_PORTS: usize = 6;

/// Load ports available to a single issue group at 6-wide and above.
pub const MAX_LOAD_PORTS: usize = 3;

/// Store ports available to a single issue group at 6-wide and above.
pub const MAX_STORE_PORTS: usize = 2;

/// Combined memory ports available to a single issue group at 6-wide and above.
pub const MAX_MEM_PORTS: usize = 5;

/// Register-file write ports available to a single issue group at 6-wide and above.
pub const MAX_WRITE_PORTS: usize = 8;

/// Instruction-window capacity for a given issue width (two full fetch groups).
pub const fn window_capacity(width: usize) -> usize {
    2 * width
}
