//! Simulator configuration.
//!
//! This module defines the option structures used to parameterize the
//! pipeline. It provides:
//! 1. **Defaults:** Baseline constants for the issue width, predictor tables,
//!    and the instruction cap.
//! 2. **Structures:** `SimOptions` (top level) and `PredictorConfig`.
//! 3. **Deserialization:** All structures accept JSON via serde, so harnesses
//!    and sweep scripts can drive configurations externally; `SimOptions::default()`
//!    serves the CLI.

use serde::Deserialize;

use crate::core::latency::LatencyTable;
use crate::core::units::cache::CacheConfig;

/// Default configuration constants for the simulator.
mod defaults {
    /// Default issue width: the full M2-class 8-wide configuration.
    pub const ISSUE_WIDTH: usize = 8;

    /// Default branch history table entries.
    pub const BHT_SIZE: usize = 1024;

    /// Default branch target buffer entries.
    pub const BTB_SIZE: usize = 256;
}

/// Branch predictor table sizing.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PredictorConfig {
    /// Branch history table entries (power of two).
    #[serde(default = "PredictorConfig::default_bht")]
    pub bht_size: usize,

    /// Branch target buffer entries (power of two).
    #[serde(default = "PredictorConfig::default_btb")]
    pub btb_size: usize,
}

impl PredictorConfig {
    /// Returns the default BHT size.
    fn default_bht() -> usize {
        defaults::BHT_SIZE
    }

    /// Returns the default BTB size.
    fn default_btb() -> usize {
        defaults::BTB_SIZE
    }
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            bht_size: defaults::BHT_SIZE,
            btb_size: defaults::BTB_SIZE,
        }
    }
}

/// Top-level pipeline options.
///
/// # Examples
///
/// ```
/// use a64sim_core::config::SimOptions;
///
/// let options = SimOptions::default();
/// assert_eq!(options.issue_width, 8);
/// assert_eq!(options.predictor.bht_size, 1024);
///
/// let narrow: SimOptions = serde_json::from_str(
///     r#"{ "issue_width": 2, "predictor": { "btb_size": 64 } }"#,
/// ).unwrap();
/// assert_eq!(narrow.issue_width, 2);
/// assert_eq!(narrow.predictor.btb_size, 64);
/// assert_eq!(narrow.predictor.bht_size, 1024);
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct SimOptions {
    /// Parallel slots per cycle: 1, 2, 4, 6, or 8.
    #[serde(default = "SimOptions::default_width")]
    pub issue_width: usize,

    /// Execute and memory-hierarchy latencies.
    #[serde(default)]
    pub latency: LatencyTable,

    /// Branch predictor table sizes.
    #[serde(default)]
    pub predictor: PredictorConfig,

    /// Hard retirement cap for test runs; the pipeline halts cleanly with
    /// exit code 0 once reached.
    #[serde(default)]
    pub max_instructions: Option<u64>,

    /// Optional instruction cache.
    #[serde(default)]
    pub icache: Option<CacheConfig>,

    /// Optional data cache.
    #[serde(default)]
    pub dcache: Option<CacheConfig>,
}

impl SimOptions {
    /// Returns the default issue width.
    fn default_width() -> usize {
        defaults::ISSUE_WIDTH
    }

    /// Options for a given issue width, defaults elsewhere.
    pub fn with_width(width: usize) -> Self {
        Self {
            issue_width: width,
            ..Self::default()
        }
    }
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            issue_width: defaults::ISSUE_WIDTH,
            latency: LatencyTable::default(),
            predictor: PredictorConfig::default(),
            max_instructions: None,
            icache: None,
            dcache: None,
        }
    }
}
