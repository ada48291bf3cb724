//! Per-process page tables
//!
//! A user page table owns the lower part of its root (`[0, split)`) with all
//! the interior tables and frames below it. The upper part is a copy of the
//! kernel root's slots: the interior tables behind them belong to the kernel
//! and are never walked here.

use crate::{
    address::kernel_split,
    config::PTE_PER_TABLE,
    frame::zero_frame,
    FrameAllocator,
    KernelPageTable,
    MapPermission,
    PageTable,
    PageTableEntry,
    PhysAddr,
    VirtAddr,
    VmError,
};

/// Page table of one process
pub struct UserPageTable {
    page_table: PageTable,
}

impl UserPageTable {
    /// `new_user_pgtbl`: a fresh root sharing the kernel half of `kernel`
    pub fn new<A: FrameAllocator>(kernel: &KernelPageTable, alloc: &mut A) -> Option<Self> {
        let Some(frame) = alloc.alloc_frame() else {
            warn!("no frame for a user root page table");
            return None;
        };
        zero_frame(frame);
        let mut page_table = PageTable::from_root(frame);
        // shallow copy: interior tables of the kernel half are shared
        page_table.entries_mut()[kernel_split()..].copy_from_slice(kernel.kernel_half());
        debug!("create a user page table, root {:?}", frame);
        Some(Self { page_table })
    }
    fn check_user(va: VirtAddr) -> Result<(), VmError> {
        if !va.is_canonical() || va.index(2) >= kernel_split() {
            return Err(VmError::OutOfRange);
        }
        Ok(())
    }
    /// Map a page of the user half
    pub fn map<A: FrameAllocator>(
        &mut self,
        va: VirtAddr,
        pa: PhysAddr,
        perm: MapPermission,
        alloc: &mut A,
    ) -> Result<(), VmError> {
        Self::check_user(va)?;
        self.page_table.map(va, pa, perm, alloc)
    }
    /// Unmap a page of the user half and free its frame
    pub fn unmap<A: FrameAllocator>(&mut self, va: VirtAddr, alloc: &mut A) -> Result<(), VmError> {
        Self::check_user(va)?;
        self.page_table.unmap(va, alloc)
    }
    /// Base physical address of the frame backing `va`
    pub fn lookup(&self, va: VirtAddr) -> Option<PhysAddr> {
        self.page_table.lookup(va)
    }
    /// Leaf entry of the page containing `va`
    pub fn translate(&self, va: VirtAddr) -> Option<PageTableEntry> {
        self.page_table.translate(va)
    }
    /// The underlying page table
    pub fn page_table(&self) -> &PageTable {
        &self.page_table
    }
    /// get the token from the page table
    pub fn token(&self) -> usize {
        self.page_table.token()
    }
    /// `destroy_user_pgtbl`: free every interior table and frame of the user
    /// half, then the root itself.
    pub fn destroy<A: FrameAllocator>(self, alloc: &mut A) {
        let root = self.page_table.root();
        for pte in &self.page_table.entries()[..kernel_split()] {
            recursive_cleanup(pte, alloc);
        }
        alloc.free_frame(root);
        debug!("destroy user page table, root {:?}", root);
    }
}

/// Free whatever `pte` owns: an interior table with everything below it, or
/// the frame of a leaf.
fn recursive_cleanup<A: FrameAllocator>(pte: &PageTableEntry, alloc: &mut A) {
    if !pte.is_valid() {
        return;
    }
    let ppn = pte.ppn();
    if pte.is_interior() {
        let children = ppn.get_pte_array();
        debug_assert_eq!(children.len(), PTE_PER_TABLE);
        for child in children.iter() {
            recursive_cleanup(child, alloc);
        }
    }
    alloc.free_frame(ppn.kernel_addr());
}
