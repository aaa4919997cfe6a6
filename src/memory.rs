pub mod addr;
pub mod entry;
pub mod frames;
pub mod page;
pub mod tlb;

use crate::{
    config::{Config, ConfigError, KernelConfig},
    stats::Stats,
    trace::TraceEvent,
    memory::{
        addr::{Operation, PhysicalAddr, Pfn, VirtualAddr, Vpn},
        frames::{EvictedPage, FrameTable},
        page::PageTable,
        tlb::Tlb,
    },
};

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("trace error: {0}")]
    Trace(#[from] crate::trace::TraceError),
    #[error("no frame could be freed for vpn {0:#07x}")]
    OutOfFrames(Vpn),
}

/// The MMU and the slice of the kernel it needs: TLB, page table, physical frames.
pub struct Mmu {
    tlb: Tlb,
    pt: PageTable,
    frames: FrameTable,
    kernel: KernelConfig,
    stats: Stats,
}

impl Mmu {
    pub fn new(config: &Config) -> Result<Self, SimError> {
        config.validate()?;
        let tlb = Tlb::new(config.tlb.entries)?;
        let pt = PageTable::new();
        let frames = FrameTable::new(config.phys.frames);
        log::info!(
            "mmu ready: {} tlb entries, {} physical frames",
            tlb.capacity(), frames.len()
        );
        Ok(Mmu { tlb, pt, frames, kernel: config.kernel.clone(), stats: Stats::default() })
    }

    pub fn tlb(&self) -> &Tlb {
        &self.tlb
    }

    pub fn page_table(&self) -> &PageTable {
        &self.pt
    }

    pub fn frames(&self) -> &FrameTable {
        &self.frames
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    /// Writes every cached M/R bit back to the frame bitmaps
    pub fn flush(&mut self) {
        self.tlb.flush(&mut self.frames);
    }

    pub fn replay(&mut self, event: TraceEvent) -> Result<AccessEvent, SimError> {
        self.access(event.operation(), event.addr())
    }

    /// Translates one CPU access, walking the page table and faulting as needed.
    pub fn access(&mut self, op: Operation, addr: u32) -> Result<AccessEvent, SimError> {
        let va = VirtualAddr::split(addr);
        let vpn = va.page_num;

        self.stats.accesses += 1;
        match op {
            Operation::Load => self.stats.loads += 1,
            Operation::Store => self.stats.stores += 1,
        }

        let mut event = AccessEvent {
            op,
            addr,
            vpn,
            page_offset: va.page_offset,
            ..Default::default()
        };

        let pfn = match self.tlb.lookup(vpn, op) {
            Some(pfn) => {
                self.stats.tlb_hits += 1;
                event.tlb_res = Query::Hit;
                pfn
            }
            None => {
                self.stats.tlb_misses += 1;
                event.tlb_res = Query::Miss;
                let pfn = match self.pt.lookup(vpn) {
                    Some(pfn) => {
                        self.stats.page_table_hits += 1;
                        event.page_table_res = Some(Query::Hit);
                        pfn
                    }
                    None => {
                        event.page_table_res = Some(Query::Miss);
                        let (pfn, evicted) = self.handle_fault(vpn)?;
                        event.evicted = evicted;
                        self.pt.insert(vpn, pfn);
                        pfn
                    }
                };
                let modified = op.is_store() || self.frames.is_modified(pfn);
                self.tlb.insert(vpn, pfn, modified, true, &mut self.frames);
                pfn
            }
        };

        event.pfn = pfn;
        self.tick();
        log::trace!("{}", event);
        Ok(event)
    }

    /// Finds a frame for `vpn`, pushing another page out when memory is full
    fn handle_fault(&mut self, vpn: Vpn) -> Result<(Pfn, Option<EvictedPage>), SimError> {
        self.stats.page_faults += 1;
        if let Some(pfn) = self.frames.allocate(vpn) {
            log::debug!("page fault on vpn {:#07x}: free frame {:#07x}", vpn, pfn);
            return Ok((pfn, None));
        }

        // bitmaps have to be current before ranking frames
        self.tlb.flush(&mut self.frames);
        let victim = self.frames.choose_victim().ok_or(SimError::OutOfFrames(vpn))?;
        let evicted = self.frames.evict(victim).ok_or(SimError::OutOfFrames(vpn))?;

        self.pt.clear(evicted.vpn);
        self.tlb.invalidate_one(evicted.vpn);
        self.frames.assign(victim, vpn);

        self.stats.evictions += 1;
        if evicted.dirty {
            self.stats.dirty_evictions += 1;
        }
        log::debug!(
            "page fault on vpn {:#07x}: evicted vpn {:#07x} from frame {:#07x}{}",
            vpn, evicted.vpn, victim, if evicted.dirty { " (dirty)" } else { "" }
        );
        Ok((victim, Some(evicted)))
    }

    /// Periodic kernel work driven by the access count
    fn tick(&mut self) {
        let n = self.stats.accesses;
        let every = |interval: u32| interval != 0 && n % u64::from(interval) == 0;

        if every(self.kernel.flush_interval) {
            self.tlb.flush(&mut self.frames);
        }
        if every(self.kernel.reference_clear_interval) {
            log::trace!("clearing referenced bits after {} accesses", n);
            self.tlb.clear_all_referenced();
            self.frames.clear_referenced();
        }
    }
}

/// Represents the details of a completed access of the memory simulation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AccessEvent {
    pub op: Operation,
    pub addr: u32,
    pub vpn: Vpn,
    pub page_offset: u32,
    pub tlb_res: Query,
    /// Only walked on a TLB miss
    pub page_table_res: Option<Query>,
    pub evicted: Option<EvictedPage>,
    pub pfn: Pfn,
}

impl AccessEvent {
    pub fn physical_addr(&self) -> u32 {
        PhysicalAddr { frame_num: self.pfn, page_offset: self.page_offset }.raw()
    }

    pub fn page_fault(&self) -> bool {
        self.page_table_res == Some(Query::Miss)
    }
}

impl std::fmt::Display for AccessEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f,
            //op addr  vpn  off  tlb   pt  pfn  paddr
            "{} {:08x} {:05x} {:03x} {:4} {:5} {:05x} {:08x}",
            self.op.as_str(),
            self.addr,
            self.vpn,
            self.page_offset,
            self.tlb_res.as_str(),
            self.page_table_res.as_ref().map_or("", |q| q.as_str()),
            self.pfn,
            self.physical_addr(),
        )?;
        if let Some(e) = self.evicted {
            write!(f, " evict {:05x}", e.vpn)?;
            if e.dirty {
                write!(f, " dirty")?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Query {
    Hit,
    #[default]
    Miss,
}

impl Query {
    pub fn as_str(&self) -> &'static str {
        match self {
            Query::Hit => "hit",
            Query::Miss => "miss",
        }
    }
}
