//! Branch prediction unit.
//!
//! This module contains the direction predictor and target cache used by the
//! fetch stage:
//! 1. **Bimodal Predictor:** Per-branch 2-bit saturating counters.
//! 2. **BTB:** Direct-mapped branch target buffer.

pub use self::bimodal::{BimodalPredictor, Prediction, PredictorStats};
pub use self::btb::Btb;

/// Bimodal (2-bit saturating counter) direction predictor.
pub mod bimodal;

/// Branch Target Buffer for predicted branch targets.
pub mod btb;
