//! The kernel page table
//!
//! There is exactly one per system. It is built at boot by mapping physical
//! ranges into the kernel window with [`KernelPageTable::kmap`], activated once,
//! and from then on its upper half serves as the template every user page
//! table starts from.

use crate::{
    address::{kernel_split, p2v_wo, page_round_down},
    arch::{sfence_vma, w_satp},
    config::PAGE_SIZE,
    FrameAllocator,
    MapPermission,
    PageTable,
    PageTableEntry,
    PhysAddr,
    VirtAddr,
    VmError,
};

/// The kernel's root page table
pub struct KernelPageTable {
    page_table: PageTable,
}

impl KernelPageTable {
    /// `kvminit`: allocate the zeroed kernel root
    pub fn new<A: FrameAllocator>(alloc: &mut A) -> Result<Self, VmError> {
        let page_table = PageTable::new(alloc)?;
        info!("kernel root page table at {:?}", page_table.root());
        Ok(Self { page_table })
    }
    /// `kmap`: map the physical range `[pa, pa + size)` into the kernel window.
    ///
    /// Every page touched by the range is mapped, so a range inside a single
    /// page yields one mapping and an empty range yields none. Stops at the
    /// first failing page without undoing earlier ones.
    pub fn kmap<A: FrameAllocator>(
        &mut self,
        pa: PhysAddr,
        size: usize,
        perm: MapPermission,
        alloc: &mut A,
    ) -> Result<(), VmError> {
        if size == 0 {
            return Ok(());
        }
        let last = pa.0.checked_add(size - 1).ok_or(VmError::OutOfRange)?;
        let mut pstart = page_round_down(pa.0);
        let pend = page_round_down(last);
        debug!(
            "kmap [{:#x}, {:#x}] -> {:#x} {:?}",
            pstart,
            pend + PAGE_SIZE - 1,
            p2v_wo(pstart),
            perm
        );
        loop {
            self.page_table.map(
                VirtAddr(p2v_wo(pstart)),
                PhysAddr(pstart),
                perm,
                alloc,
            )?;
            if pstart == pend {
                break;
            }
            pstart += PAGE_SIZE;
        }
        Ok(())
    }
    /// `activate_kernel_pgtbl`: point satp at this table and flush the TLB.
    pub fn activate(&self) {
        let satp = self.page_table.token();
        w_satp(satp);
        sfence_vma();
        info!("paging enabled, satp = {:#x}", satp);
    }
    /// The kernel root page table
    pub fn page_table(&self) -> &PageTable {
        &self.page_table
    }
    /// Root slots `[split, 512)`, shared with every user page table
    pub fn kernel_half(&self) -> &[PageTableEntry] {
        &self.page_table.entries()[kernel_split()..]
    }
    /// get the token from the page table
    pub fn token(&self) -> usize {
        self.page_table.token()
    }
}
