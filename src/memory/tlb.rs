use crate::{
    config::{ConfigError, MAX_TLB_ENTRIES},
    utils::bits,
};

use super::{
    addr::{Operation, Pfn, Vpn},
    entry::TlbEntry,
};

/// Receives the modified/referenced state of a frame whenever the TLB lets go of it.
///
/// Called on eviction and on flush. The same frame may be reported any number of times; each
/// call carries the full current state and replaces the previous one.
pub trait BitmapSink {
    fn notify_bitmap(&mut self, pfn: Pfn, modified: bool, referenced: bool);
}

/// A fully associative TLB with NRU clock replacement.
pub struct Tlb {
    entries: Vec<TlbEntry>,
    clock_hand: usize,
    // capacity - 1, capacity is a power of two
    wrap_mask: usize,
}

impl Tlb {
    /// Creates a TLB with `capacity` invalid entries. `capacity` must be a power of two no
    /// larger than 65536.
    pub fn new(capacity: u32) -> Result<Self, ConfigError> {
        if !bits::is_pow2(capacity) || capacity > MAX_TLB_ENTRIES {
            return Err(ConfigError::TlbCapacity(capacity));
        }
        let capacity = capacity as usize;
        Ok(Tlb {
            entries: vec![TlbEntry::INVALID; capacity],
            clock_hand: 0,
            wrap_mask: capacity - 1,
        })
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    pub fn clock_hand(&self) -> usize {
        self.clock_hand
    }

    pub fn entries(&self) -> &[TlbEntry] {
        &self.entries
    }

    /// Index of the valid line caching `vpn`
    fn position(&self, vpn: Vpn) -> Option<usize> {
        self.entries.iter().position(|entry| entry.matches(vpn))
    }

    /// Looks up a cached translation.
    ///
    /// A hit marks the line referenced, and modified when `op` is a store. A miss changes
    /// nothing.
    pub fn lookup(&mut self, vpn: Vpn, op: Operation) -> Option<Pfn> {
        let idx = self.position(vpn)?;
        let entry = &mut self.entries[idx];
        entry.referenced = true;
        if op.is_store() {
            entry.modified = true;
        }
        Some(entry.pfn)
    }

    /// Inserts a translation, evicting a line with the NRU clock if needed.
    ///
    /// The line replaced, if it was valid, has its state written to `sink` first and is
    /// returned.
    pub fn insert(
        &mut self,
        vpn: Vpn,
        pfn: Pfn,
        modified: bool,
        referenced: bool,
        sink: &mut impl BitmapSink,
    ) -> Option<TlbEntry> {
        // A second line for the same page would make lookups ambiguous.
        if let Some(stale) = self.position(vpn) {
            let entry = &mut self.entries[stale];
            sink.notify_bitmap(entry.pfn, entry.modified, entry.referenced);
            entry.valid = false;
        }

        let victim = self.select_victim();
        let old = std::mem::replace(
            &mut self.entries[victim],
            TlbEntry::new(vpn, pfn, modified, referenced),
        );
        self.clock_hand = (victim + 1) & self.wrap_mask;

        if !old.valid {
            return None;
        }
        log::debug!(
            "tlb evict slot {}: vpn {:#07x} -> pfn {:#07x} (m={}, r={})",
            victim, old.vpn, old.pfn, old.modified as u8, old.referenced as u8
        );
        sink.notify_bitmap(old.pfn, old.modified, old.referenced);
        Some(old)
    }

    /// First line at or after the clock hand that is invalid or unreferenced.
    /// Falls back to the clock hand when every line is valid and referenced.
    fn select_victim(&self) -> usize {
        (0..self.capacity())
            .map(|step| (self.clock_hand + step) & self.wrap_mask)
            .find(|&idx| {
                let entry = &self.entries[idx];
                !entry.valid || !entry.referenced
            })
            .unwrap_or(self.clock_hand)
    }

    /// Invalidates every line
    pub fn invalidate_all(&mut self) {
        for entry in self.entries.iter_mut() {
            entry.valid = false;
        }
    }

    /// Invalidates the line caching `vpn`, if any. Returns whether a line was dropped.
    pub fn invalidate_one(&mut self, vpn: Vpn) -> bool {
        match self.position(vpn) {
            Some(idx) => {
                self.entries[idx].valid = false;
                true
            }
            None => false,
        }
    }

    /// Clears the referenced bit of every valid line
    pub fn clear_all_referenced(&mut self) {
        self.entries
            .iter_mut()
            .filter(|entry| entry.valid)
            .for_each(|entry| entry.referenced = false);
    }

    /// Writes the state of every valid line to `sink`
    pub fn flush(&self, sink: &mut impl BitmapSink) {
        for entry in self.entries.iter().filter(|entry| entry.valid) {
            sink.notify_bitmap(entry.pfn, entry.modified, entry.referenced);
        }
    }
}

impl std::fmt::Debug for Tlb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "TLB ({} entries, clock hand at {}):", self.capacity(), self.clock_hand)?;
        for (idx, e) in self.entries.iter().enumerate().filter(|(_, e)| e.valid) {
            writeln!(f, "\t[{:3}] vpn: {:05x}  pfn: {:05x}  m: {}  r: {}",
                idx, e.vpn, e.pfn, e.modified as u8, e.referenced as u8)?;
        }
        Ok(())
    }
}
