//! Top-level simulator wrapper.
//!
//! Owns a pipeline and ties program loading to it, so callers construct,
//! load, and run in three lines. The pipeline remains directly accessible
//! for latch inspection and statistics.

use crate::common::error::SimError;
use crate::config::SimOptions;
use crate::core::Pipeline;
use crate::core::arch::RegisterFile;
use crate::mem::Memory;
use crate::sim::loader;

/// A pipeline plus its loaded program.
#[derive(Debug)]
pub struct Simulator {
    /// The simulated pipeline.
    pub pipeline: Pipeline,
}

impl Simulator {
    /// Creates a simulator with fresh architectural state.
    ///
    /// # Errors
    ///
    /// Propagates configuration validation from [`Pipeline::new`].
    pub fn new(options: SimOptions) -> Result<Self, SimError> {
        let pipeline = Pipeline::new(RegisterFile::new(), Memory::new(), options)?;
        Ok(Self { pipeline })
    }

    /// Loads a program image: ELF when the magic matches, flat at
    /// `flat_addr` otherwise. Sets the PC to the entry point.
    ///
    /// # Errors
    ///
    /// Propagates ELF parse failures.
    pub fn load_program(&mut self, bytes: &[u8], flat_addr: u64) -> Result<(), SimError> {
        let entry = if loader::is_elf(bytes) {
            loader::load_elf(self.pipeline.mem_mut(), bytes)?
        } else {
            loader::load_flat(self.pipeline.mem_mut(), flat_addr, bytes);
            flat_addr
        };
        self.pipeline.set_pc(entry);
        Ok(())
    }

    /// Runs to halt and returns the guest exit code.
    pub fn run(&mut self) -> i64 {
        self.pipeline.run();
        self.pipeline.exit_code()
    }
}
