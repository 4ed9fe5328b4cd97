//! Branch Target Buffer (BTB).
//!
//! The BTB is a direct-mapped cache that stores target addresses for control
//! flow instructions. It allows the fetch stage to redirect to a branch's
//! target before the instruction is decoded.

/// An entry in the Branch Target Buffer.
#[derive(Clone, Copy, Default)]
struct BtbEntry {
    /// The tag used to verify if this entry corresponds to the requested PC.
    tag: u64,
    /// The predicted target address.
    target: u64,
    /// Indicates if this entry contains valid data.
    valid: bool,
}

/// Branch Target Buffer structure.
#[derive(Clone)]
pub struct Btb {
    /// The table of BTB entries.
    table: Vec<BtbEntry>,
    /// The total number of entries in the BTB.
    size: usize,
}

impl Btb {
    /// Creates a new Branch Target Buffer with the specified size.
    ///
    /// # Arguments
    ///
    /// * `size` - The number of entries in the BTB. Must be a power of 2.
    pub fn new(size: usize) -> Self {
        debug_assert!(size.is_power_of_two());
        Self {
            table: vec![BtbEntry::default(); size],
            size,
        }
    }

    /// Calculates the index into the BTB table for a given program counter.
    ///
    /// Shifts the PC right by 2 bits (instruction alignment) and masks it
    /// against the table size.
    fn index(&self, pc: u64) -> usize {
        ((pc >> 2) as usize) & (self.size - 1)
    }

    /// Looks up a target address for the given program counter.
    ///
    /// # Returns
    ///
    /// The predicted target address if a valid entry exists and the tag
    /// matches, otherwise `None`.
    pub fn lookup(&self, pc: u64) -> Option<u64> {
        let idx = self.index(pc);
        let e = self.table[idx];
        if e.valid && e.tag == pc { Some(e.target) } else { None }
    }

    /// Installs or overwrites the entry for a branch at `pc`.
    pub fn update(&mut self, pc: u64, target: u64) {
        let idx = self.index(pc);
        self.table[idx] = BtbEntry {
            tag: pc,
            target,
            valid: true,
        };
    }

    /// Invalidates every entry.
    pub fn clear(&mut self) {
        self.table.fill(BtbEntry::default());
    }
}

impl std::fmt::Debug for Btb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Btb").field("size", &self.size).finish()
    }
}
