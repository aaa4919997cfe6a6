use crate::utils::bits;

/// Width of a virtual page number. The address space is 32 bits with 4KB pages.
pub const VPN_BITS: u32 = 20;
/// Width of a page frame number.
pub const PFN_BITS: u32 = 20;
/// Width of the byte offset into a page.
pub const OFFSET_BITS: u32 = 12;
pub const PAGE_SIZE: u32 = 1 << OFFSET_BITS;

pub const VPN_MASK: u32 = bits::low_mask(VPN_BITS);
pub const PFN_MASK: u32 = bits::low_mask(PFN_BITS);

/// Virtual page number (low 20 bits significant)
pub type Vpn = u32;
/// Page frame number (low 20 bits significant)
pub type Pfn = u32;

/// The kind of memory access the CPU is performing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    #[default]
    Load,
    Store,
}

impl Operation {
    pub fn is_store(self) -> bool {
        matches!(self, Operation::Store)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Load => "R",
            Operation::Store => "W",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualAddr {
    pub page_num: Vpn,
    pub page_offset: u32,
}

impl VirtualAddr {
    pub fn split(addr: u32) -> Self {
        let (page_num, page_offset) = bits::split_at(addr, OFFSET_BITS);
        VirtualAddr { page_num, page_offset }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalAddr {
    pub frame_num: Pfn,
    pub page_offset: u32,
}

impl PhysicalAddr {
    pub fn raw(&self) -> u32 {
        bits::join_at(self.frame_num & PFN_MASK, self.page_offset, OFFSET_BITS)
    }
}
