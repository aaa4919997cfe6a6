//! Hardware word layouts for page table and TLB entries.
//!
//! Everything that touches a mask or a shift lives here. The rest of the crate works with the
//! decoded [`TlbEntry`] and the accessor methods on [`PageTableEntry`].
//!
//! ```text
//! page table entry   [31] present            [19:0] frame
//! TLB word A         [31] valid              [19:0] virtual page
//! TLB word B         [31] referenced [30] modified  [19:0] frame
//! ```
//! All other bits are reserved and ignored on decode.

use bitflags::bitflags;

use super::addr::{Pfn, Vpn, PFN_MASK, VPN_MASK};

bitflags! {
    /// Flag bits of a second-level page table entry.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PteFlags: u32 {
        const PRESENT = 1 << 31;
    }
}

bitflags! {
    /// Flag bits of the first TLB word (tag word).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct TagFlags: u32 {
        const VALID = 1 << 31;
    }
}

bitflags! {
    /// Flag bits of the second TLB word (status word).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct StatusFlags: u32 {
        const REFERENCED = 1 << 31;
        const MODIFIED   = 1 << 30;
    }
}

/// A packed second-level page table entry.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct PageTableEntry(u32);

impl PageTableEntry {
    pub const EMPTY: PageTableEntry = PageTableEntry(0);

    /// A present entry mapping to `pfn`
    pub fn mapped(pfn: Pfn) -> Self {
        PageTableEntry(PteFlags::PRESENT.bits() | (pfn & PFN_MASK))
    }

    pub fn from_raw(raw: u32) -> Self {
        PageTableEntry(raw)
    }

    pub fn raw(self) -> u32 {
        self.0
    }

    pub fn is_present(self) -> bool {
        PteFlags::from_bits_truncate(self.0).contains(PteFlags::PRESENT)
    }

    pub fn frame(self) -> Pfn {
        self.0 & PFN_MASK
    }

    /// The mapped frame, if the present bit is set
    pub fn translation(self) -> Option<Pfn> {
        self.is_present().then(|| self.frame())
    }
}

impl std::fmt::Debug for PageTableEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.translation() {
            Some(pfn) => write!(f, "PTE(present, frame {:#07x})", pfn),
            None => write!(f, "PTE(absent)"),
        }
    }
}

/// A decoded TLB cache line.
///
/// When `valid` is false none of the other fields mean anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TlbEntry {
    pub valid: bool,
    pub vpn: Vpn,
    pub modified: bool,
    pub referenced: bool,
    pub pfn: Pfn,
}

impl TlbEntry {
    pub const INVALID: TlbEntry = TlbEntry {
        valid: false,
        vpn: 0,
        modified: false,
        referenced: false,
        pfn: 0,
    };

    pub fn new(vpn: Vpn, pfn: Pfn, modified: bool, referenced: bool) -> Self {
        TlbEntry {
            valid: true,
            vpn: vpn & VPN_MASK,
            modified,
            referenced,
            pfn: pfn & PFN_MASK,
        }
    }

    /// True if this line holds a translation for `vpn`
    pub fn matches(&self, vpn: Vpn) -> bool {
        self.valid && self.vpn == vpn & VPN_MASK
    }

    /// Packs the entry into its two-word register form
    pub fn encode(&self) -> (u32, u32) {
        let mut tag = TagFlags::empty();
        tag.set(TagFlags::VALID, self.valid);

        let mut status = StatusFlags::empty();
        status.set(StatusFlags::REFERENCED, self.referenced);
        status.set(StatusFlags::MODIFIED, self.modified);

        (
            tag.bits() | (self.vpn & VPN_MASK),
            status.bits() | (self.pfn & PFN_MASK),
        )
    }

    /// Unpacks the two-word register form, ignoring reserved bits
    pub fn decode(word_a: u32, word_b: u32) -> Self {
        let tag = TagFlags::from_bits_truncate(word_a);
        let status = StatusFlags::from_bits_truncate(word_b);
        TlbEntry {
            valid: tag.contains(TagFlags::VALID),
            vpn: word_a & VPN_MASK,
            modified: status.contains(StatusFlags::MODIFIED),
            referenced: status.contains(StatusFlags::REFERENCED),
            pfn: word_b & PFN_MASK,
        }
    }
}
