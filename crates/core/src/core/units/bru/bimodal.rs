//! Bimodal branch predictor.
//!
//! A table of per-branch 2-bit saturating counters indexed by the (aligned)
//! program counter, paired with a direct-mapped BTB for targets. Counters are
//! initialized weakly-taken, which biases cold loops toward their common
//! taken back-edge.
//!
//! # Performance
//!
//! - **Time Complexity:** `predict()` and `update()` are O(1).
//! - **Best Case:** Strongly biased branches (loop back-edges, error paths).
//! - **Worst Case:** Alternating branches, which oscillate around the
//!   weakly-taken/weakly-not-taken boundary.

use super::btb::Btb;

/// Counter value at and above which a branch predicts taken.
const TAKEN_THRESHOLD: u8 = 2;

/// Saturating counter ceiling (strongly taken).
const COUNTER_MAX: u8 = 3;

/// Initial counter state: weakly taken.
const INITIAL_COUNTER: u8 = 2;

/// Outcome of a fetch-time branch prediction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Prediction {
    /// Predicted direction.
    pub taken: bool,
    /// Predicted target address; meaningful only when `target_known`.
    pub target: u64,
    /// Whether the BTB supplied a target for this PC.
    pub target_known: bool,
}

/// Predictor bookkeeping counters, folded into the pipeline statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PredictorStats {
    /// Resolved branch predictions.
    pub predictions: u64,
    /// Resolved predictions that matched direction and target.
    pub correct: u64,
    /// Resolved predictions that missed direction or target.
    pub mispredictions: u64,
    /// Taken predictions whose target was found in the BTB.
    pub btb_hits: u64,
    /// Taken predictions with no BTB target.
    pub btb_misses: u64,
}

/// Bimodal branch history table plus BTB.
#[derive(Clone, Debug)]
pub struct BimodalPredictor {
    bht: Vec<u8>,
    btb: Btb,
    /// Prediction outcome counters.
    pub stats: PredictorStats,
}

impl BimodalPredictor {
    /// Creates a predictor with the given table sizes (both powers of two).
    pub fn new(bht_size: usize, btb_size: usize) -> Self {
        debug_assert!(bht_size.is_power_of_two());
        Self {
            bht: vec![INITIAL_COUNTER; bht_size],
            btb: Btb::new(btb_size),
            stats: PredictorStats::default(),
        }
    }

    /// Index of the counter for a branch at `pc`.
    fn index(&self, pc: u64) -> usize {
        ((pc >> 2) as usize) & (self.bht.len() - 1)
    }

    /// Predicts the direction and target of a branch at `pc`.
    ///
    /// Taken iff the counter is at or above the weakly-taken threshold; the
    /// target comes from the BTB on a tag match. BTB hit/miss counters are
    /// bumped only for taken predictions, where the target matters.
    pub fn predict(&mut self, pc: u64) -> Prediction {
        let taken = self.bht[self.index(pc)] >= TAKEN_THRESHOLD;
        if !taken {
            return Prediction::default();
        }
        match self.btb.lookup(pc) {
            Some(target) => {
                self.stats.btb_hits += 1;
                Prediction {
                    taken: true,
                    target,
                    target_known: true,
                }
            }
            None => {
                self.stats.btb_misses += 1;
                Prediction {
                    taken: true,
                    target: 0,
                    target_known: false,
                }
            }
        }
    }

    /// Trains the predictor with a resolved branch outcome.
    ///
    /// Saturates the direction counter toward the actual outcome and, for
    /// taken branches, installs the resolved target in the BTB.
    pub fn update(&mut self, pc: u64, taken: bool, target: u64) {
        let idx = self.index(pc);
        let counter = self.bht[idx];
        if taken && counter < COUNTER_MAX {
            self.bht[idx] = counter + 1;
        } else if !taken && counter > 0 {
            self.bht[idx] = counter - 1;
        }
        if taken {
            self.btb.update(pc, target);
        }
    }

    /// Records whether a resolved prediction was correct.
    pub const fn note_resolution(&mut self, correct: bool) {
        self.stats.predictions += 1;
        if correct {
            self.stats.correct += 1;
        } else {
            self.stats.mispredictions += 1;
        }
    }

    /// Returns the predictor to its initial state: counters weakly-taken,
    /// BTB empty, statistics zeroed.
    pub fn reset(&mut self) {
        self.bht.fill(INITIAL_COUNTER);
        self.btb.clear();
        self.stats = PredictorStats::default();
    }
}
