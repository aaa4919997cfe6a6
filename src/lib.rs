//! Address translation for a virtual memory simulator: a sparse two-level page table behind
//! a fully associative TLB with NRU clock replacement.

pub mod config;
pub mod memory;
pub mod stats;
pub mod trace;
pub mod utils;

pub use config::{Config, ConfigError};
pub use memory::{
    addr::{Operation, Pfn, Vpn},
    entry::TlbEntry,
    page::PageTable,
    tlb::{BitmapSink, Tlb},
    AccessEvent, Mmu, Query, SimError,
};
pub use stats::Stats;
pub use trace::{TraceError, TraceEvent, TraceReader};
