use super::{
    addr::{Pfn, Vpn},
    tlb::BitmapSink,
};

#[derive(Debug, Default, Clone, Copy)]
struct Frame {
    owner: Option<Vpn>,
    modified: bool,
    referenced: bool,
}

impl Frame {
    /// NRU class: unreferenced clean pages go first, referenced dirty pages last
    fn class(&self) -> u8 {
        ((self.referenced as u8) << 1) | self.modified as u8
    }
}

/// A page that was pushed out of physical memory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvictedPage {
    pub vpn: Vpn,
    pub pfn: Pfn,
    pub dirty: bool,
}

/// Physical frames and their modified/referenced bitmaps.
///
/// This is the system of record the TLB writes back into. Free frames are handed out in
/// ascending order; once memory is full a victim is picked by NRU class.
#[derive(Debug)]
pub struct FrameTable {
    frames: Vec<Frame>,
    next_free: usize,
}

impl FrameTable {
    pub fn new(count: u32) -> Self {
        FrameTable {
            frames: vec![Frame::default(); count as usize],
            next_free: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Frames currently holding a page
    pub fn resident(&self) -> usize {
        self.frames.iter().filter(|f| f.owner.is_some()).count()
    }

    /// Hands out the next never-used frame to `vpn`
    pub fn allocate(&mut self, vpn: Vpn) -> Option<Pfn> {
        let frame = self.frames.get_mut(self.next_free)?;
        *frame = Frame { owner: Some(vpn), ..Frame::default() };
        let pfn = self.next_free as Pfn;
        self.next_free += 1;
        Some(pfn)
    }

    /// Lowest-numbered occupied frame in the lowest NRU class
    pub fn choose_victim(&self) -> Option<Pfn> {
        self.frames
            .iter()
            .enumerate()
            .filter(|(_, f)| f.owner.is_some())
            .min_by_key(|&(pfn, f)| (f.class(), pfn))
            .map(|(pfn, _)| pfn as Pfn)
    }

    /// Empties `pfn`, returning the page that lived there
    pub fn evict(&mut self, pfn: Pfn) -> Option<EvictedPage> {
        let frame = self.frames.get_mut(pfn as usize)?;
        let old = std::mem::take(frame);
        old.owner.map(|vpn| EvictedPage { vpn, pfn, dirty: old.modified })
    }

    /// Gives an evicted frame to a new page with clean bitmaps
    pub fn assign(&mut self, pfn: Pfn, vpn: Vpn) {
        if let Some(frame) = self.frames.get_mut(pfn as usize) {
            *frame = Frame { owner: Some(vpn), ..Frame::default() };
        }
    }

    pub fn owner(&self, pfn: Pfn) -> Option<Vpn> {
        self.frames.get(pfn as usize).and_then(|f| f.owner)
    }

    pub fn is_modified(&self, pfn: Pfn) -> bool {
        self.frames.get(pfn as usize).is_some_and(|f| f.modified)
    }

    pub fn is_referenced(&self, pfn: Pfn) -> bool {
        self.frames.get(pfn as usize).is_some_and(|f| f.referenced)
    }

    /// Ages the referenced bitmap
    pub fn clear_referenced(&mut self) {
        self.frames.iter_mut().for_each(|f| f.referenced = false);
    }
}

impl BitmapSink for FrameTable {
    fn notify_bitmap(&mut self, pfn: Pfn, modified: bool, referenced: bool) {
        match self.frames.get_mut(pfn as usize) {
            Some(frame) => {
                frame.modified = modified;
                frame.referenced = referenced;
            }
            None => log::warn!("bitmap update for frame {:#07x} outside physical memory", pfn),
        }
    }
}
