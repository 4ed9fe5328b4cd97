//! Cross-cycle instruction window.
//!
//! A fixed-capacity, program-ordered buffer of fetched-but-unissued
//! instructions sitting between fetch and the IF/ID latch. Entries that fail
//! to issue are pushed back to the front (keeping their order); freshly
//! fetched words append at the back. The window is what allows dispatch to
//! pick independent younger instructions around a held load-use consumer.

use super::latches::IfIdEntry;

/// Fixed-capacity ordered buffer of pre-fetched instructions.
#[derive(Clone, Debug)]
pub struct InstructionWindow {
    entries: Vec<IfIdEntry>,
    capacity: usize,
}

impl InstructionWindow {
    /// Creates an empty window holding at most `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Number of buffered entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when no further fetch can be accepted this cycle.
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }

    /// Maximum number of entries.
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Read-only view of the buffered entries, oldest first.
    pub fn entries(&self) -> &[IfIdEntry] {
        &self.entries
    }

    /// Moves un-issued IF/ID entries to the front of the window.
    ///
    /// Entries with `valid && !consumed` are re-queued ahead of the existing
    /// contents, preserving their program order; overflow is dropped from the
    /// back (youngest first).
    pub fn push_unconsumed(&mut self, ifid: &[IfIdEntry], consumed: &[bool]) {
        let mut merged: Vec<IfIdEntry> = ifid
            .iter()
            .zip(consumed)
            .filter(|(slot, done)| slot.valid && !**done)
            .map(|(slot, _)| *slot)
            .collect();
        if merged.is_empty() {
            return;
        }
        merged.append(&mut self.entries);
        merged.truncate(self.capacity);
        self.entries = merged;
    }

    /// Appends a freshly fetched entry.
    ///
    /// # Returns
    ///
    /// `false` when the window is full and the entry was dropped.
    pub fn push_fetched(&mut self, entry: IfIdEntry) -> bool {
        if self.is_full() {
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// Drains the first `width` entries into the IF/ID slots, clearing the
    /// remainder of the slot array and compacting the window.
    pub fn pop_to_ifid(&mut self, ifid: &mut [IfIdEntry], width: usize) {
        let take = width.min(self.entries.len());
        for (slot, entry) in ifid.iter_mut().take(take).zip(self.entries.drain(..take)) {
            *slot = entry;
        }
        for slot in ifid.iter_mut().take(width).skip(take) {
            *slot = IfIdEntry::default();
        }
    }

    /// Discards every buffered entry (mispredict flush).
    pub fn flush(&mut self) {
        self.entries.clear();
    }

    /// Clears the after-branch gate on all buffered entries after a correct
    /// branch resolution.
    pub fn clear_after_branch(&mut self) {
        for entry in &mut self.entries {
            entry.after_branch = false;
        }
    }
}
