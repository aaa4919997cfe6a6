/// Running counters for a simulation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Stats {
    pub accesses: u64,
    pub loads: u64,
    pub stores: u64,
    pub tlb_hits: u64,
    pub tlb_misses: u64,
    pub page_table_hits: u64,
    pub page_faults: u64,
    pub evictions: u64,
    pub dirty_evictions: u64,
}

impl Stats {
    pub fn tlb_hit_ratio(&self) -> f64 {
        ratio(self.tlb_hits, self.accesses)
    }

    pub fn page_fault_ratio(&self) -> f64 {
        ratio(self.page_faults, self.accesses)
    }
}

fn ratio(n: u64, d: u64) -> f64 {
    if d == 0 {
        0.0
    } else {
        n as f64 / d as f64
    }
}

impl std::fmt::Display for Stats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Simulation statistics")?;
        writeln!(f)?;
        writeln!(f, "total accesses    : {}", self.accesses)?;
        writeln!(f, "loads             : {}", self.loads)?;
        writeln!(f, "stores            : {}", self.stores)?;
        writeln!(f, "tlb hits          : {}", self.tlb_hits)?;
        writeln!(f, "tlb misses        : {}", self.tlb_misses)?;
        writeln!(f, "tlb hit ratio     : {:.6}", self.tlb_hit_ratio())?;
        writeln!(f, "page table hits   : {}", self.page_table_hits)?;
        writeln!(f, "page faults       : {}", self.page_faults)?;
        writeln!(f, "page fault ratio  : {:.6}", self.page_fault_ratio())?;
        writeln!(f, "frame evictions   : {}", self.evictions)?;
        write!(f, "dirty evictions   : {}", self.dirty_evictions)
    }
}
