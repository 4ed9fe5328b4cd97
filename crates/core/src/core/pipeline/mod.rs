//! The cycle-accurate pipeline.
//!
//! This module contains the superscalar 5-stage pipeline infrastructure:
//! 1. **State Store:** The `Pipeline` struct owning all latches, the PC,
//!    statistics, checkpoints, the instruction window, and the collaborating
//!    units (this file).
//! 2. **Tick Engine:** The per-cycle wide tick driving Fetch through Writeback.
//! 3. **Latches:** Inter-stage buffers, one entry per slot.
//! 4. **Issue:** Co-issue arbitration under port, hazard, and speculation rules.
//! 5. **Hazards:** Forwarding detection and load-use tests.
//! 6. **Fusion:** Compare + conditional-branch macro-op recognition.
//! 7. **Window:** The cross-cycle instruction buffer.
//! 8. **Ports:** Cached fetch/memory state machines with miss latency.

/// Inter-stage pipeline latches.
pub mod latches;

/// Data hazard detection and operand forwarding.
pub mod hazards;

/// Dispatch/issue arbitration.
pub mod issue;

/// Compare+branch macro-op fusion.
pub mod fusion;

/// Cross-cycle instruction window.
pub mod window;

/// Cached fetch and memory ports.
pub mod ports;

mod tick;

use crate::common::constants::{MAX_ISSUE_WIDTH, SUPPORTED_WIDTHS, window_capacity};
use crate::common::error::SimError;
use crate::config::SimOptions;
use crate::core::arch::{Checkpoint, Pstate, RegisterFile};
use crate::core::latency::LatencyTable;
use crate::core::syscall::{LinuxAbi, SyscallHandler};
use crate::core::units::bru::BimodalPredictor;
use crate::core::units::cache::Cache;
use crate::mem::Memory;
use crate::stats::PipelineStats;

use self::issue::IssueLimits;
use self::latches::{ExMemEntry, IdExEntry, IfIdEntry, MemWbEntry};
use self::ports::{FetchPort, MemPort, StoreDrain};
use self::window::InstructionWindow;

/// The cycle-accurate superscalar pipeline for one core.
///
/// Owns the architectural state, every inter-stage latch, and the
/// collaborating units. All mutation happens inside [`Pipeline::tick`]; the
/// public surface otherwise exposes read-only snapshots for callers and test
/// suites.
pub struct Pipeline {
    width: usize,
    limits: IssueLimits,
    pc: u64,
    halted: bool,
    exit_code: i64,

    regs: RegisterFile,
    pstate: Pstate,
    mem: Memory,

    ifid: [IfIdEntry; MAX_ISSUE_WIDTH],
    idex: [IdExEntry; MAX_ISSUE_WIDTH],
    exmem: [ExMemEntry; MAX_ISSUE_WIDTH],
    memwb: [MemWbEntry; MAX_ISSUE_WIDTH],

    window: InstructionWindow,
    predictor: BimodalPredictor,
    checkpoint: Checkpoint,

    icache: Option<Cache>,
    dcache: Option<Cache>,
    fetch_port: FetchPort,
    mem_ports: [MemPort; MAX_ISSUE_WIDTH],
    store_drain: StoreDrain,

    latency: LatencyTable,
    syscall: Box<dyn SyscallHandler>,

    /// Remaining fetch-hold cycles after a mispredict flush.
    redirect_stall: u64,
    /// A predicted-taken branch is in flight; fetched entries carry the gate.
    after_branch: bool,
    max_instructions: Option<u64>,

    stats: PipelineStats,
}

impl Pipeline {
    /// Constructs a pipeline over the given architectural state.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::UnsupportedWidth`] when the configured issue width
    /// is not one of 1, 2, 4, 6, or 8.
    pub fn new(regs: RegisterFile, mem: Memory, options: SimOptions) -> Result<Self, SimError> {
        let width = options.issue_width;
        if !SUPPORTED_WIDTHS.contains(&width) {
            return Err(SimError::UnsupportedWidth(width));
        }
        if !options.predictor.bht_size.is_power_of_two() {
            return Err(SimError::InvalidConfig(format!(
                "bht_size {} is not a power of two",
                options.predictor.bht_size
            )));
        }
        if !options.predictor.btb_size.is_power_of_two() {
            return Err(SimError::InvalidConfig(format!(
                "btb_size {} is not a power of two",
                options.predictor.btb_size
            )));
        }
        let predictor = BimodalPredictor::new(
            options.predictor.bht_size,
            options.predictor.btb_size,
        );
        Ok(Self {
            width,
            limits: IssueLimits::for_width(width),
            pc: 0,
            halted: false,
            exit_code: 0,
            regs,
            pstate: Pstate::default(),
            mem,
            ifid: Default::default(),
            idex: Default::default(),
            exmem: Default::default(),
            memwb: Default::default(),
            window: InstructionWindow::new(window_capacity(width)),
            predictor,
            checkpoint: Checkpoint::default(),
            icache: options.icache.as_ref().map(Cache::new),
            dcache: options.dcache.as_ref().map(Cache::new),
            fetch_port: FetchPort::default(),
            mem_ports: Default::default(),
            store_drain: StoreDrain::default(),
            latency: options.latency,
            syscall: Box::new(LinuxAbi),
            redirect_stall: 0,
            after_branch: false,
            max_instructions: options.max_instructions,
            stats: PipelineStats::default(),
        })
    }

    /// Attaches an instruction cache (replacing any previous one).
    pub fn with_icache(mut self, cache: Cache) -> Self {
        self.icache = Some(cache);
        self
    }

    /// Attaches a data cache (replacing any previous one).
    pub fn with_dcache(mut self, cache: Cache) -> Self {
        self.dcache = Some(cache);
        self
    }

    /// Replaces the supervisor-call handler.
    pub fn with_syscall_handler(mut self, handler: Box<dyn SyscallHandler>) -> Self {
        self.syscall = handler;
        self
    }

    /// Sets the fetch program counter.
    pub const fn set_pc(&mut self, addr: u64) {
        self.pc = addr;
    }

    /// Current fetch program counter.
    pub const fn pc(&self) -> u64 {
        self.pc
    }

    /// Configured issue width.
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Whether the pipeline has halted. Halt is sticky.
    pub const fn halted(&self) -> bool {
        self.halted
    }

    /// Guest exit code; meaningful once halted.
    pub const fn exit_code(&self) -> i64 {
        self.exit_code
    }

    /// Advances one cycle. No-op when halted.
    pub fn tick(&mut self) {
        if self.halted {
            return;
        }
        self.tick_once();
    }

    /// Runs until the pipeline halts.
    pub fn run(&mut self) {
        while !self.halted {
            self.tick_once();
        }
    }

    /// Architectural register file.
    pub const fn regs(&self) -> &RegisterFile {
        &self.regs
    }

    /// Mutable register file access for program setup.
    pub const fn regs_mut(&mut self) -> &mut RegisterFile {
        &mut self.regs
    }

    /// Condition flags.
    pub const fn pstate(&self) -> Pstate {
        self.pstate
    }

    /// Guest memory.
    pub const fn mem(&self) -> &Memory {
        &self.mem
    }

    /// Mutable guest memory access for program setup.
    pub const fn mem_mut(&mut self) -> &mut Memory {
        &mut self.mem
    }

    /// Snapshot of the IF/ID latch slots.
    pub fn ifid(&self) -> &[IfIdEntry] {
        &self.ifid[..self.width]
    }

    /// Snapshot of the ID/EX latch slots.
    pub fn idex(&self) -> &[IdExEntry] {
        &self.idex[..self.width]
    }

    /// Snapshot of the EX/MEM latch slots.
    pub fn exmem(&self) -> &[ExMemEntry] {
        &self.exmem[..self.width]
    }

    /// Snapshot of the MEM/WB latch slots.
    pub fn memwb(&self) -> &[MemWbEntry] {
        &self.memwb[..self.width]
    }

    /// Read-only view of the instruction window.
    pub const fn window(&self) -> &InstructionWindow {
        &self.window
    }

    /// Statistics snapshot with predictor and cache counters folded in.
    pub fn stats(&self) -> PipelineStats {
        let mut stats = self.stats.clone();
        stats.branch_predictions = self.predictor.stats.predictions;
        stats.branch_correct = self.predictor.stats.correct;
        stats.branch_mispredictions = self.predictor.stats.mispredictions;
        stats.btb_hits = self.predictor.stats.btb_hits;
        stats.btb_misses = self.predictor.stats.btb_misses;
        if let Some(cache) = &self.icache {
            stats.icache_hits = cache.stats.hits;
            stats.icache_misses = cache.stats.misses;
        }
        if let Some(cache) = &self.dcache {
            stats.dcache_hits = cache.stats.hits;
            stats.dcache_misses = cache.stats.misses;
        }
        stats
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("width", &self.width)
            .field("pc", &self.pc)
            .field("halted", &self.halted)
            .field("cycles", &self.stats.cycles)
            .finish()
    }
}
