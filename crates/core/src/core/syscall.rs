//! Supervisor-call handling.
//!
//! This module defines the handler invoked when an `SVC` reaches the memory
//! stage's primary slot. It provides:
//! 1. **Handler Seam:** The `SyscallHandler` trait the pipeline dispatches to.
//! 2. **Linux ABI Default:** exit/exit_group terminate the simulation with the
//!    guest's status; write(1/2) goes to the host's stdout/stderr; anything
//!    else returns `-ENOSYS` without halting.

use std::io::Write;

use crate::core::arch::RegisterFile;
use crate::mem::Memory;

/// Linux AArch64 syscall number for `write`.
const SYS_WRITE: u64 = 64;

/// Linux AArch64 syscall number for `exit`.
const SYS_EXIT: u64 = 93;

/// Linux AArch64 syscall number for `exit_group`.
const SYS_EXIT_GROUP: u64 = 94;

/// `-ENOSYS`, returned in X0 for unimplemented syscall numbers.
const ENOSYS: i64 = -38;

/// Result of dispatching one supervisor call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SyscallOutcome {
    /// The guest requested termination.
    pub exited: bool,
    /// Exit status; meaningful only when `exited`.
    pub exit_code: i64,
}

/// Handler for supervisor calls reaching the memory stage.
pub trait SyscallHandler {
    /// Dispatches the call described by the current register state.
    ///
    /// The syscall number is in X8 and arguments in X0–X5, per the Linux
    /// AArch64 convention. Return values are written back into X0.
    fn handle(&mut self, regs: &mut RegisterFile, mem: &mut Memory) -> SyscallOutcome;
}

/// Default handler implementing the minimal Linux user ABI.
#[derive(Clone, Copy, Debug, Default)]
pub struct LinuxAbi;

impl SyscallHandler for LinuxAbi {
    fn handle(&mut self, regs: &mut RegisterFile, mem: &mut Memory) -> SyscallOutcome {
        let number = regs.read(8);
        match number {
            SYS_EXIT | SYS_EXIT_GROUP => SyscallOutcome {
                exited: true,
                exit_code: regs.read(0) as i64,
            },
            SYS_WRITE => {
                let fd = regs.read(0);
                let buf = regs.read(1);
                let len = regs.read(2);
                let bytes = mem.read_bytes(buf, len);
                let written = match fd {
                    1 => std::io::stdout().write(&bytes).ok(),
                    2 => std::io::stderr().write(&bytes).ok(),
                    _ => None,
                };
                match written {
                    Some(n) => regs.write(0, n as u64),
                    None => regs.write(0, ENOSYS as u64),
                }
                SyscallOutcome::default()
            }
            _ => {
                tracing::debug!(number, "unimplemented syscall");
                regs.write(0, ENOSYS as u64);
                SyscallOutcome::default()
            }
        }
    }
}
