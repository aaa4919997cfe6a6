use crate::utils::bits;

use super::{
    addr::{Pfn, Vpn, VPN_MASK},
    entry::PageTableEntry,
};

/// Bits of the VPN used to index each level
pub const TABLE_BITS: u32 = 10;
/// Entries per table, same for both levels
pub const TABLE_ENTRIES: usize = 1 << TABLE_BITS;

type SecondLevelTable = [PageTableEntry; TABLE_ENTRIES];

/// A sparse two-level page table.
///
/// The first level always has 1024 slots. A second-level table is allocated the first time
/// any page in its 1024-page block is mapped and lives until the table is reset.
pub struct PageTable {
    directory: Box<[Option<Box<SecondLevelTable>>]>,
}

impl PageTable {
    pub fn new() -> Self {
        let directory = std::iter::repeat_with(|| None)
            .take(TABLE_ENTRIES)
            .collect();
        PageTable { directory }
    }

    /// Drops every second-level table, discarding all mappings
    pub fn reset(&mut self) {
        self.directory.iter_mut().for_each(|slot| *slot = None);
    }

    /// Splits a VPN into (first level, second level) indices
    fn split(vpn: Vpn) -> (usize, usize) {
        debug_assert!(vpn <= VPN_MASK, "vpn {:#x} is wider than 20 bits", vpn);
        let (l1, l2) = bits::split_at(vpn & VPN_MASK, TABLE_BITS);
        (l1 as usize, l2 as usize)
    }

    /// Walks the table for `vpn`. `None` means the page is not present.
    pub fn lookup(&self, vpn: Vpn) -> Option<Pfn> {
        let (l1, l2) = Self::split(vpn);
        self.directory[l1]
            .as_ref()
            .and_then(|table| table[l2].translation())
    }

    /// Maps `vpn` to `pfn`, overwriting any existing entry
    pub fn insert(&mut self, vpn: Vpn, pfn: Pfn) {
        let (l1, l2) = Self::split(vpn);
        let table = self.directory[l1].get_or_insert_with(|| {
            log::trace!("allocating second-level table {:#05x}", l1);
            Box::new([PageTableEntry::EMPTY; TABLE_ENTRIES])
        });
        table[l2] = PageTableEntry::mapped(pfn);
    }

    /// Removes the mapping for `vpn`. Called when its frame is evicted.
    pub fn clear(&mut self, vpn: Vpn) {
        let (l1, l2) = Self::split(vpn);
        match self.directory[l1].as_mut() {
            Some(table) => table[l2] = PageTableEntry::EMPTY,
            None => log::warn!(
                "tried to clear vpn {:#07x} but its second-level table {:#05x} was never created",
                vpn, l1
            ),
        }
    }

    /// Number of second-level tables currently allocated
    pub fn second_level_tables(&self) -> usize {
        self.directory.iter().filter(|slot| slot.is_some()).count()
    }

    /// Every present mapping, in VPN order
    pub fn mapped(&self) -> impl Iterator<Item = (Vpn, Pfn)> + '_ {
        self.directory
            .iter()
            .enumerate()
            .filter_map(|(l1, slot)| slot.as_ref().map(|table| (l1, table)))
            .flat_map(|(l1, table)| {
                table.iter().enumerate().filter_map(move |(l2, pte)| {
                    pte.translation()
                        .map(|pfn| (bits::join_at(l1 as u32, l2 as u32, TABLE_BITS), pfn))
                })
            })
    }
}

impl Default for PageTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PageTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "PageTable:")?;
        for (l1, slot) in self.directory.iter().enumerate() {
            let Some(table) = slot else { continue };
            writeln!(f, "\tL1 {:#05x}:", l1)?;
            for (l2, pte) in table.iter().enumerate() {
                if let Some(pfn) = pte.translation() {
                    writeln!(f, "\t\t[{:#05x}] -> {:#07x}", l2, pfn)?;
                }
            }
        }
        Ok(())
    }
}
