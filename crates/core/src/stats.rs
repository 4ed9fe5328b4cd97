//! Pipeline statistics collection and reporting.
//!
//! This module tracks performance counters for the simulator. It provides:
//! 1. **Cycle and CPI:** Total cycles, retired instructions, and derived CPI.
//! 2. **Stalls:** Per-kind stall counters (RAW, structural, execute latency,
//!    memory, fetch, branch mispredict).
//! 3. **Branch Prediction:** Resolutions, accuracy, BTB hit rate, eliminated
//!    branches, and fused pairs.
//! 4. **Reporting:** A stall-profile string suitable for terminal diagnostics.

use std::fmt::Write as _;

/// Performance counters for one pipeline.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Total simulated cycles.
    pub cycles: u64,
    /// Retired instructions (a fused pair counts as two).
    pub instructions: u64,

    /// Cycles in which a candidate failed issue on a data (RAW) hazard.
    pub raw_hazard_stalls: u64,
    /// Cycles in which a candidate failed issue on a structural limit.
    pub structural_hazard_stalls: u64,
    /// Cycles spent with a slot counting multi-cycle execute latency.
    pub exec_stalls: u64,
    /// Cycles the whole pipeline held for a memory-port miss.
    pub memory_stalls: u64,
    /// Cycles fetch could not supply the window.
    pub fetch_stalls: u64,
    /// Post-flush fetch-hold cycles charged to mispredicts.
    pub branch_mispredict_stalls: u64,

    /// Pipeline flushes (mispredict recoveries).
    pub flushes: u64,

    /// Resolved branch predictions.
    pub branch_predictions: u64,
    /// Resolutions matching both direction and target.
    pub branch_correct: u64,
    /// Resolutions missing direction or target.
    pub branch_mispredictions: u64,
    /// Taken predictions with a BTB target.
    pub btb_hits: u64,
    /// Taken predictions without a BTB target.
    pub btb_misses: u64,
    /// Pure unconditional branches removed at fetch.
    pub eliminated_branches: u64,
    /// Compare+branch pairs issued fused.
    pub fused_pairs: u64,

    /// Instruction-cache hits (when an I-cache is attached).
    pub icache_hits: u64,
    /// Instruction-cache misses.
    pub icache_misses: u64,
    /// Data-cache hits (when a D-cache is attached).
    pub dcache_hits: u64,
    /// Data-cache misses.
    pub dcache_misses: u64,
}

impl PipelineStats {
    /// Cycles per retired instruction; 0 before anything retires.
    pub fn cpi(&self) -> f64 {
        if self.instructions == 0 {
            0.0
        } else {
            self.cycles as f64 / self.instructions as f64
        }
    }

    /// Fraction of resolved branches predicted correctly.
    pub fn branch_accuracy(&self) -> f64 {
        if self.branch_predictions == 0 {
            0.0
        } else {
            self.branch_correct as f64 / self.branch_predictions as f64
        }
    }

    /// Fraction of taken predictions with a BTB target.
    pub fn btb_hit_rate(&self) -> f64 {
        let total = self.btb_hits + self.btb_misses;
        if total == 0 {
            0.0
        } else {
            self.btb_hits as f64 / total as f64
        }
    }

    /// Renders the stall profile for terminal diagnostics.
    pub fn report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "==========================================================");
        let _ = writeln!(out, "PIPELINE STALL PROFILE");
        let _ = writeln!(out, "==========================================================");
        let _ = writeln!(out, "Cycles                   {}", self.cycles);
        let _ = writeln!(out, "Instructions             {}", self.instructions);
        let _ = writeln!(out, "CPI                      {:.4}", self.cpi());
        let _ = writeln!(out, "RAW Hazard Stalls        {}", self.raw_hazard_stalls);
        let _ = writeln!(
            out,
            "Structural Hazard Stalls {}",
            self.structural_hazard_stalls
        );
        let _ = writeln!(out, "Exec Stalls              {}", self.exec_stalls);
        let _ = writeln!(out, "Mem Stalls               {}", self.memory_stalls);
        let _ = writeln!(
            out,
            "Branch Mispred Stalls    {}",
            self.branch_mispredict_stalls
        );
        let _ = writeln!(out, "Pipeline Flushes         {}", self.flushes);
        let _ = writeln!(
            out,
            "Branch Mispredictions    {}",
            self.branch_mispredictions
        );
        let _ = writeln!(out, "Fetch/Other Stalls       {}", self.fetch_stalls);
        let _ = writeln!(out, "----------------------------------------------------------");
        let _ = writeln!(
            out,
            "Branch Accuracy          {:.2}%",
            self.branch_accuracy() * 100.0
        );
        let _ = writeln!(
            out,
            "BTB Hit Rate             {:.2}%",
            self.btb_hit_rate() * 100.0
        );
        let _ = writeln!(out, "Eliminated Branches      {}", self.eliminated_branches);
        let _ = writeln!(out, "Fused Pairs              {}", self.fused_pairs);
        let _ = writeln!(out, "==========================================================");
        out
    }
}
