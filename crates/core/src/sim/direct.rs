//! Serial instruction-at-a-time functional model.
//!
//! Executes the same decoded instructions over the same architectural state
//! as the pipeline, one at a time with no timing. It serves two purposes:
//! 1. **Reference:** The architectural-equivalence tests compare final
//!    register and memory state against this model across issue widths.
//! 2. **Fast Mode:** The CLI's direct mode for functional-only runs.

use crate::core::arch::{Pstate, RegisterFile};
use crate::core::syscall::{LinuxAbi, SyscallHandler};
use crate::core::units::alu;
use crate::isa::decode;
use crate::isa::instruction::{DecodedInst, Op};
use crate::mem::Memory;

/// Serial functional core.
pub struct DirectCore {
    /// Program counter.
    pub pc: u64,
    /// Register file.
    pub regs: RegisterFile,
    /// Condition flags.
    pub pstate: Pstate,
    /// Guest memory.
    pub mem: Memory,
    halted: bool,
    exit_code: i64,
    retired: u64,
    syscall: Box<dyn SyscallHandler>,
}

impl DirectCore {
    /// Creates a functional core over the given state.
    pub fn new(regs: RegisterFile, mem: Memory) -> Self {
        Self {
            pc: 0,
            regs,
            pstate: Pstate::default(),
            mem,
            halted: false,
            exit_code: 0,
            retired: 0,
            syscall: Box::new(LinuxAbi),
        }
    }

    /// Replaces the supervisor-call handler.
    pub fn with_syscall_handler(mut self, handler: Box<dyn SyscallHandler>) -> Self {
        self.syscall = handler;
        self
    }

    /// Whether the core has halted.
    pub const fn halted(&self) -> bool {
        self.halted
    }

    /// Guest exit code; meaningful once halted.
    pub const fn exit_code(&self) -> i64 {
        self.exit_code
    }

    /// Instructions executed so far.
    pub const fn retired(&self) -> u64 {
        self.retired
    }

    /// Executes a single instruction. No-op once halted.
    pub fn step(&mut self) {
        if self.halted {
            return;
        }
        let pc = self.pc;
        let word = self.mem.read_u32(pc);
        let Some(inst) = decode::decode(word) else {
            self.halted = true;
            self.exit_code = -1;
            return;
        };
        self.retired += 1;
        let mut next_pc = pc.wrapping_add(4);

        if inst.is_branch() {
            if let Some(target) = self.branch_target(&inst, pc) {
                next_pc = target;
            }
            if matches!(inst.op, Op::Bl | Op::Blr) {
                self.regs.write(30, pc.wrapping_add(4));
            }
        } else if inst.is_mem() {
            self.step_mem(&inst);
        } else {
            match inst.op {
                Op::Svc => {
                    let outcome = self.syscall.handle(&mut self.regs, &mut self.mem);
                    if outcome.exited {
                        self.halted = true;
                        self.exit_code = outcome.exit_code;
                        return;
                    }
                }
                Op::Udf => {
                    self.halted = true;
                    self.exit_code = -1;
                    return;
                }
                Op::Nop => {}
                _ => {
                    let extra = if inst.op == Op::Movk {
                        self.regs.read(inst.rd)
                    } else {
                        self.regs.read(inst.rt2)
                    };
                    let out = alu::execute_data(
                        &inst,
                        pc,
                        self.regs.read(inst.rn),
                        self.regs.read(inst.rm),
                        extra,
                        self.pstate,
                    );
                    if inst.writes_reg() {
                        self.regs.write(inst.rd, out.value);
                    }
                    if let Some((n, z, c, v)) = out.nzcv {
                        self.pstate.set_nzcv(n, z, c, v);
                    }
                }
            }
        }
        self.pc = next_pc;
    }

    /// Runs until the core halts or `max_steps` instructions execute.
    pub fn run(&mut self, max_steps: u64) {
        for _ in 0..max_steps {
            if self.halted {
                return;
            }
            self.step();
        }
    }

    /// Taken-path target of a branch, or `None` when not taken.
    fn branch_target(&self, inst: &DecodedInst, pc: u64) -> Option<u64> {
        let static_target = || pc.wrapping_add(inst.branch_offset as u64);
        match inst.op {
            Op::B | Op::Bl => Some(static_target()),
            Op::Br | Op::Blr | Op::Ret => Some(self.regs.read(inst.rn)),
            Op::Bcond => inst
                .cond
                .holds(self.pstate.n, self.pstate.z, self.pstate.c, self.pstate.v)
                .then(static_target),
            Op::Cbz | Op::Cbnz => {
                let val = self.regs.read(inst.rd);
                let val = if inst.is_64 { val } else { val & 0xFFFF_FFFF };
                let taken = (val == 0) == (inst.op == Op::Cbz);
                taken.then(static_target)
            }
            Op::Tbz | Op::Tbnz => {
                let bit = (self.regs.read(inst.rd) >> inst.imm2) & 1;
                let taken = (bit == 0) == (inst.op == Op::Tbz);
                taken.then(static_target)
            }
            _ => None,
        }
    }

    /// Executes one load or store, including pair forms and base writeback.
    fn step_mem(&mut self, inst: &DecodedInst) {
        let base = self.regs.read(inst.rn);
        let offset = self.regs.read(inst.rm);
        let (addr, writeback) = alu::compute_address(inst, base, offset);
        let size = inst.mem_size();
        let pair = matches!(inst.op, Op::Ldp | Op::Stp);

        if inst.is_load() {
            let raw = self.mem.read(addr, size);
            self.regs.write(inst.rd, inst.extend_loaded(raw));
            if pair {
                let raw2 = self.mem.read(addr.wrapping_add(size), size);
                self.regs.write(inst.rt2, raw2);
            }
        } else {
            self.mem.write(addr, size, self.regs.read(inst.rd));
            if pair {
                self.mem
                    .write(addr.wrapping_add(size), size, self.regs.read(inst.rt2));
            }
        }
        if let Some(value) = writeback {
            self.regs.write(inst.rn, value);
        }
    }
}

impl std::fmt::Debug for DirectCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectCore")
            .field("pc", &self.pc)
            .field("halted", &self.halted)
            .field("retired", &self.retired)
            .finish()
    }
}
