//! Set-associative cache timing model.
//!
//! This module implements the configurable cache used by the optional cached
//! fetch and memory stages. It models:
//! 1. **Hit/Miss Timing:** A hit costs the hit latency; a miss costs the miss
//!    latency and installs the line.
//! 2. **LRU Replacement:** Per-set least-recently-used victim selection.
//! 3. **Statistics:** Hit/miss counters surfaced through the pipeline stats.
//!
//! The model is tags-only: data always comes from the backing memory, the
//! cache decides how many cycles the access costs.

use serde::Deserialize;

/// Extra cycles a load to a line with an in-flight store drain must wait.
pub const STORE_FORWARD_LATENCY: u64 = 2;

/// Configuration for one cache.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Total capacity in bytes.
    #[serde(default = "CacheConfig::default_size")]
    pub size_bytes: usize,

    /// Line size in bytes.
    #[serde(default = "CacheConfig::default_line")]
    pub line_bytes: usize,

    /// Associativity (number of ways).
    #[serde(default = "CacheConfig::default_ways")]
    pub ways: usize,

    /// Cycles for a hit.
    #[serde(default = "CacheConfig::default_hit_latency")]
    pub hit_latency: u64,

    /// Cycles for a miss (next-level access).
    #[serde(default = "CacheConfig::default_miss_latency")]
    pub miss_latency: u64,
}

impl CacheConfig {
    /// Returns the default cache capacity (32 KiB).
    fn default_size() -> usize {
        32 * 1024
    }

    /// Returns the default line size in bytes.
    fn default_line() -> usize {
        64
    }

    /// Returns the default associativity.
    fn default_ways() -> usize {
        8
    }

    /// Returns the default hit latency in cycles.
    fn default_hit_latency() -> u64 {
        1
    }

    /// Returns the default miss latency in cycles.
    fn default_miss_latency() -> u64 {
        10
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            size_bytes: Self::default_size(),
            line_bytes: Self::default_line(),
            ways: Self::default_ways(),
            hit_latency: Self::default_hit_latency(),
            miss_latency: Self::default_miss_latency(),
        }
    }
}

/// Result of a timed cache access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheAccess {
    /// Whether the line was present.
    pub hit: bool,
    /// Cycles the access costs.
    pub latency: u64,
}

/// Hit/miss counters for one cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Accesses that found their line.
    pub hits: u64,
    /// Accesses that missed and installed a line.
    pub misses: u64,
}

impl CacheStats {
    /// Fraction of accesses that hit, or 0 with no accesses.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Cache line entry containing tag and validity.
#[derive(Clone, Copy, Default)]
struct CacheLine {
    tag: u64,
    valid: bool,
    /// LRU age within the set; 0 is most recently used.
    age: u8,
}

/// Set-associative LRU cache.
pub struct Cache {
    lines: Vec<CacheLine>,
    num_sets: usize,
    ways: usize,
    line_bytes: usize,
    hit_latency: u64,
    miss_latency: u64,
    /// Access counters.
    pub stats: CacheStats,
}

impl Cache {
    /// Creates a cache from its configuration.
    ///
    /// Degenerate values (zero size, ways, or line bytes) fall back to the
    /// configuration defaults.
    pub fn new(config: &CacheConfig) -> Self {
        let ways = if config.ways == 0 { 1 } else { config.ways };
        let line_bytes = if config.line_bytes == 0 {
            CacheConfig::default_line()
        } else {
            config.line_bytes
        };
        let size = if config.size_bytes == 0 {
            CacheConfig::default_size()
        } else {
            config.size_bytes
        };
        let num_lines = (size / line_bytes).max(ways);
        let num_sets = num_lines / ways;
        Self {
            lines: vec![CacheLine::default(); num_sets * ways],
            num_sets,
            ways,
            line_bytes,
            hit_latency: config.hit_latency,
            miss_latency: config.miss_latency,
            stats: CacheStats::default(),
        }
    }

    /// The line-aligned address containing `addr`, used for store-drain
    /// conflict checks.
    pub const fn line_addr(&self, addr: u64) -> u64 {
        addr & !(self.line_bytes as u64 - 1)
    }

    /// Miss latency of this cache.
    pub const fn miss_latency(&self) -> u64 {
        self.miss_latency
    }

    /// Performs a timed access, installing the line on a miss.
    ///
    /// Reads and writes are timed identically; the cache is write-allocate.
    pub fn access(&mut self, addr: u64) -> CacheAccess {
        let set = ((addr as usize) / self.line_bytes) % self.num_sets;
        let tag = addr / (self.line_bytes * self.num_sets) as u64;
        let base = set * self.ways;

        for way in 0..self.ways {
            let line = self.lines[base + way];
            if line.valid && line.tag == tag {
                self.touch(base, way);
                self.stats.hits += 1;
                return CacheAccess {
                    hit: true,
                    latency: self.hit_latency,
                };
            }
        }

        let victim = self.victim_way(base);
        self.lines[base + victim] = CacheLine {
            tag,
            valid: true,
            age: 0,
        };
        self.touch(base, victim);
        self.stats.misses += 1;
        CacheAccess {
            hit: false,
            latency: self.miss_latency,
        }
    }

    /// Marks `way` most recently used in its set, aging the others.
    fn touch(&mut self, base: usize, way: usize) {
        let touched_age = self.lines[base + way].age;
        for i in 0..self.ways {
            let line = &mut self.lines[base + i];
            if i == way {
                line.age = 0;
            } else if line.age <= touched_age {
                line.age = line.age.saturating_add(1);
            }
        }
    }

    /// Selects the eviction victim: an invalid way, else the oldest.
    fn victim_way(&self, base: usize) -> usize {
        let mut oldest = 0;
        for i in 0..self.ways {
            let line = self.lines[base + i];
            if !line.valid {
                return i;
            }
            if line.age > self.lines[base + oldest].age {
                oldest = i;
            }
        }
        oldest
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("num_sets", &self.num_sets)
            .field("ways", &self.ways)
            .field("line_bytes", &self.line_bytes)
            .field("stats", &self.stats)
            .finish()
    }
}
