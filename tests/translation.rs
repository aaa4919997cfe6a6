//! End-to-end translation through the public API.

use vmsim_rs::{
    memory::frames::EvictedPage, BitmapSink, Config, Mmu, Operation, PageTable, Pfn, Query, Tlb,
    TraceReader,
};

#[derive(Default)]
struct Bitmaps(Vec<(Pfn, bool, bool)>);

impl BitmapSink for Bitmaps {
    fn notify_bitmap(&mut self, pfn: Pfn, modified: bool, referenced: bool) {
        self.0.push((pfn, modified, referenced));
    }
}

/// The CPU loop: probe the TLB, walk the table on a miss, and fill the TLB.
fn translate(
    tlb: &mut Tlb,
    pt: &PageTable,
    bitmaps: &mut Bitmaps,
    vpn: u32,
    op: Operation,
) -> Option<Pfn> {
    if let Some(pfn) = tlb.lookup(vpn, op) {
        return Some(pfn);
    }
    let pfn = pt.lookup(vpn)?;
    tlb.insert(vpn, pfn, op == Operation::Store, true, bitmaps);
    Some(pfn)
}

#[test]
fn tlb_backed_by_page_table() {
    let mut pt = PageTable::new();
    let mut tlb = Tlb::new(4).unwrap();
    let mut bitmaps = Bitmaps::default();

    assert_eq!(translate(&mut tlb, &pt, &mut bitmaps, 0x400, Operation::Load), None);

    for vpn in 1..=5u32 {
        pt.insert(vpn, vpn * 10);
    }
    for vpn in 1..=4u32 {
        assert_eq!(translate(&mut tlb, &pt, &mut bitmaps, vpn, Operation::Load), Some(vpn * 10));
    }
    assert_eq!(tlb.clock_hand(), 0);

    assert_eq!(translate(&mut tlb, &pt, &mut bitmaps, 5, Operation::Store), Some(50));
    assert_eq!(bitmaps.0, vec![(10, false, true)]);
    assert_eq!(tlb.clock_hand(), 1);

    // the kernel evicts vpn 3's frame
    pt.clear(3);
    tlb.invalidate_one(3);
    assert_eq!(translate(&mut tlb, &pt, &mut bitmaps, 3, Operation::Load), None);

    bitmaps.0.clear();
    tlb.flush(&mut bitmaps);
    bitmaps.0.sort_unstable();
    assert_eq!(bitmaps.0, vec![(20, false, true), (40, false, true), (50, true, true)]);
}

#[test]
fn replaying_a_trace() {
    let config = Config::parse("tlb entries: 2\nphysical frames: 2\n").unwrap();
    let mut mmu = Mmu::new(&config).unwrap();

    let trace = "\
W:00001000
R:00001004
R:00002000
R:00003000
R:00001008
";
    let events: Vec<_> = TraceReader::new(trace.as_bytes())
        .map(|event| mmu.replay(event.unwrap()).unwrap())
        .collect();

    let tlb: Vec<_> = events.iter().map(|e| e.tlb_res).collect();
    assert_eq!(tlb, vec![Query::Miss, Query::Hit, Query::Miss, Query::Miss, Query::Hit]);

    // frame 0 holds dirty vpn 1, frame 1 clean vpn 2: vpn 2 goes
    assert_eq!(events[3].evicted, Some(EvictedPage { vpn: 2, pfn: 1, dirty: false }));
    // vpn 3 took the slot vpn 2 left behind, so vpn 1 is still cached
    assert_eq!(events[4].page_table_res, None);
    assert_eq!(events[4].physical_addr(), 0x008);

    let stats = mmu.stats();
    assert_eq!(stats.accesses, 5);
    assert_eq!(stats.stores, 1);
    assert_eq!(stats.tlb_hits, 2);
    assert_eq!(stats.page_faults, 3);
    assert_eq!(stats.evictions, 1);
}
