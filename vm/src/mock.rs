//! Host-side frame allocator for tests

use std::{
    alloc::{alloc, dealloc, Layout},
    collections::BTreeSet,
    vec::Vec,
};

use crate::{
    config::{PAGE_SIZE, SV39_LEVELS},
    FrameAllocator,
    KernelAddr,
    PageTable,
    PhysPageNum,
};

/// Hands out real, page aligned host pages filled with garbage and records
/// every call.
pub struct MockFrames {
    live: BTreeSet<usize>,
    budget: Option<usize>,
    calls: usize,
    /// frames returned by `alloc_frame`, in order
    pub allocated: Vec<KernelAddr>,
    /// frames passed to `free_frame`, in order
    pub freed: Vec<KernelAddr>,
}

fn layout() -> Layout {
    Layout::from_size_align(PAGE_SIZE, PAGE_SIZE).unwrap()
}

impl MockFrames {
    pub fn new() -> Self {
        Self {
            live: BTreeSet::new(),
            budget: None,
            calls: 0,
            allocated: Vec::new(),
            freed: Vec::new(),
        }
    }
    /// Let `n` more allocations succeed, fail every one after that
    pub fn fail_after(&mut self, n: usize) {
        self.budget = Some(n);
    }
    pub fn alloc_calls(&self) -> usize {
        self.calls
    }
    /// Frames allocated and not yet freed
    pub fn live(&self) -> usize {
        self.live.len()
    }
}

impl Default for MockFrames {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameAllocator for MockFrames {
    fn alloc_frame(&mut self) -> Option<KernelAddr> {
        self.calls += 1;
        if let Some(budget) = self.budget.as_mut() {
            if *budget == 0 {
                return None;
            }
            *budget -= 1;
        }
        let ptr = unsafe { alloc(layout()) };
        if ptr.is_null() {
            return None;
        }
        unsafe { ptr.write_bytes(0xa5, PAGE_SIZE) };
        self.live.insert(ptr as usize);
        let frame = KernelAddr(ptr as usize);
        self.allocated.push(frame);
        Some(frame)
    }
    fn free_frame(&mut self, frame: KernelAddr) {
        self.freed.push(frame);
        // leaves pointing at made-up physical addresses were never ours
        if self.live.remove(&frame.0) {
            unsafe { dealloc(frame.as_mut_ptr(), layout()) };
        }
    }
}

impl Drop for MockFrames {
    fn drop(&mut self) {
        for addr in core::mem::take(&mut self.live) {
            unsafe { dealloc(addr as *mut u8, layout()) };
        }
    }
}

fn check_table(ppn: PhysPageNum, level: usize) {
    for pte in ppn.get_pte_array().iter() {
        if !pte.is_valid() {
            continue;
        }
        if level == 0 {
            assert!(pte.is_leaf(), "non-leaf entry {:?} at level 0", pte);
        } else {
            assert!(pte.is_interior(), "leaf entry {:?} at level {}", pte, level);
            check_table(pte.ppn(), level - 1);
        }
    }
}

/// Leaves only at level 0, interior entries everywhere above
pub fn assert_well_formed(table: &PageTable) {
    check_table(table.root_ppn(), SV39_LEVELS - 1);
}
