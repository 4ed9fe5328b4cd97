//! Register checkpoint for speculation rollback.
//!
//! A checkpoint is captured when a branch enters execute and discarded on
//! correct resolution. On a misprediction the checkpoint is restored, undoing
//! every register-file and PSTATE write performed by instructions younger than
//! the branch. Instructions *older* than the branch retire while the
//! checkpoint is live; their writes are mirrored into the snapshot so that a
//! later restore never undoes committed pre-branch state.

use super::pstate::Pstate;
use super::regs::RegisterFile;
use crate::common::constants::ZERO_REG;

/// Snapshot of the architectural register state at branch-execute entry.
#[derive(Clone, Debug, Default)]
pub struct Checkpoint {
    /// Whether a branch is currently covered by this checkpoint.
    pub valid: bool,
    x: [u64; 31],
    sp: u64,
    pstate: Pstate,
}

impl Checkpoint {
    /// Captures the current architectural state.
    pub fn capture(&mut self, regs: &RegisterFile, pstate: Pstate) {
        self.x = regs.raw();
        self.sp = regs.sp();
        self.pstate = pstate;
        self.valid = true;
    }

    /// Mirrors an in-order retirement into a live snapshot.
    ///
    /// Retiring instructions are always older than the checkpointed branch, so
    /// their writes belong to the restored state as well.
    pub const fn note_retire(&mut self, reg: u8, val: u64) {
        if self.valid && reg < ZERO_REG {
            self.x[reg as usize] = val;
        }
    }

    /// Restores the snapshot into the register file and PSTATE.
    pub fn restore(&mut self, regs: &mut RegisterFile, pstate: &mut Pstate) {
        if self.valid {
            regs.restore_raw(self.x);
            regs.set_sp(self.sp);
            *pstate = self.pstate;
            self.valid = false;
        }
    }

    /// Discards the snapshot after a correct resolution.
    pub const fn discard(&mut self) {
        self.valid = false;
    }
}
