//! Implementation of [`PageTableEntry`] and [`PageTable`].

use crate::{
    address::satp_sv39,
    config::{PA_WIDTH_SV39, SV39_LEVELS},
    frame::{zero_frame, FrameAllocator},
    KernelAddr,
    PhysAddr,
    PhysPageNum,
    VirtAddr,
    VirtPageNum,
    VmError,
};

bitflags! {
    /// page table entry flags
    pub struct PTEFlags: u16 {
        const V = 1 << 0;
        const R = 1 << 1;
        const W = 1 << 2;
        const X = 1 << 3;
        const U = 1 << 4;
        const G = 1 << 5;
        const A = 1 << 6;
        const D = 1 << 7;
        const RSW0 = 1 << 8;
        const RSW1 = 1 << 9;
    }
}

bitflags! {
    /// map permission corresponding to that in pte: `R W X U G`
    pub struct MapPermission: u8 {
        ///Readable
        const R = 1 << 1;
        ///Writable
        const W = 1 << 2;
        ///Excutable
        const X = 1 << 3;
        ///Accessible in U mode
        const U = 1 << 4;
        ///Present in every address space
        const G = 1 << 5;
    }
}

impl From<MapPermission> for PTEFlags {
    fn from(perm: MapPermission) -> Self {
        PTEFlags::from_bits_truncate(perm.bits() as u16)
    }
}

const FLAGS_BITS: usize = 10;
const PPN_MASK: usize = (1usize << 44) - 1;

#[derive(Copy, Clone, PartialEq, Eq)]
#[repr(C)]
/// page table entry structure
pub struct PageTableEntry {
    /// bits of page table entry
    pub bits: usize,
}

impl PageTableEntry {
    /// Create a new page table entry
    pub fn new(ppn: PhysPageNum, flags: PTEFlags) -> Self {
        PageTableEntry {
            bits: ppn.0 << FLAGS_BITS | flags.bits() as usize,
        }
    }
    /// Create an empty page table entry
    pub fn empty() -> Self {
        PageTableEntry { bits: 0 }
    }
    /// Get the physical page number from the page table entry
    pub fn ppn(&self) -> PhysPageNum {
        (self.bits >> FLAGS_BITS & PPN_MASK).into()
    }
    /// Get the flags from the page table entry
    pub fn flags(&self) -> PTEFlags {
        PTEFlags::from_bits_truncate(self.bits as u16)
    }
    /// The page pointered by page table entry is valid?
    pub fn is_valid(&self) -> bool {
        self.flags().contains(PTEFlags::V)
    }
    /// Valid and names a mapped page
    pub fn is_leaf(&self) -> bool {
        self.is_valid() && self.flags().intersects(PTEFlags::R | PTEFlags::W | PTEFlags::X)
    }
    /// Valid and names a next-level page table
    pub fn is_interior(&self) -> bool {
        self.is_valid() && !self.is_leaf()
    }
    /// The page pointered by page table entry is readable?
    pub fn readable(&self) -> bool {
        self.flags().contains(PTEFlags::R)
    }
    /// The page pointered by page table entry is writable?
    pub fn writable(&self) -> bool {
        self.flags().contains(PTEFlags::W)
    }
    /// The page pointered by page table entry is executable?
    pub fn executable(&self) -> bool {
        self.flags().contains(PTEFlags::X)
    }
}

impl core::fmt::Debug for PageTableEntry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PageTableEntry")
            .field("ppn", &self.ppn())
            .field("flags", &self.flags())
            .finish()
    }
}

/// An SV39 page table, identified by its root frame.
///
/// The table does not own its frames: user tables are torn down by
/// [`UserPageTable::destroy`](crate::UserPageTable::destroy), the kernel
/// table lives forever.
pub struct PageTable {
    root_ppn: PhysPageNum,
}

impl PageTable {
    /// Allocate a zeroed root frame
    pub fn new<A: FrameAllocator>(alloc: &mut A) -> Result<Self, VmError> {
        let frame = alloc.alloc_frame().ok_or(VmError::OutOfMemory)?;
        zero_frame(frame);
        debug!("create a new page table, root {:?}", frame);
        Ok(Self::from_root(frame))
    }
    /// Wrap an existing root table living in the kernel window
    pub fn from_root(root: KernelAddr) -> Self {
        Self {
            root_ppn: PhysAddr::from(root).floor(),
        }
    }
    /// Temporarily used to inspect the table a satp value points at.
    pub fn from_token(satp: usize) -> Self {
        Self {
            root_ppn: PhysPageNum::from(satp & PPN_MASK),
        }
    }
    /// Physical page number of the root table
    pub fn root_ppn(&self) -> PhysPageNum {
        self.root_ppn
    }
    /// Root table seen through the kernel window
    pub fn root(&self) -> KernelAddr {
        self.root_ppn.kernel_addr()
    }
    /// The 512 entries of the root table
    pub fn entries(&self) -> &[PageTableEntry] {
        self.root_ppn.get_pte_array()
    }
    pub(crate) fn entries_mut(&mut self) -> &mut [PageTableEntry] {
        self.root_ppn.get_pte_array()
    }
    fn find_pte_create<A: FrameAllocator>(
        &mut self,
        vpn: VirtPageNum,
        alloc: &mut A,
    ) -> Result<&mut PageTableEntry, VmError> {
        let idxs = vpn.indexes();
        let mut ppn = self.root_ppn;
        for idx in &idxs[..SV39_LEVELS - 1] {
            let pte = &mut ppn.get_pte_array()[*idx];
            if !pte.is_valid() {
                let frame = alloc.alloc_frame().ok_or_else(|| {
                    error!("no frame for an interior table on the way to {:?}", vpn);
                    VmError::OutOfMemory
                })?;
                zero_frame(frame);
                // publish only after the table is zeroed
                *pte = PageTableEntry::new(PhysAddr::from(frame).floor(), PTEFlags::V);
            } else if pte.is_leaf() {
                return Err(VmError::HugePage);
            }
            ppn = pte.ppn();
        }
        Ok(&mut ppn.get_pte_array()[idxs[SV39_LEVELS - 1]])
    }
    fn find_pte(&self, vpn: VirtPageNum) -> Result<&mut PageTableEntry, VmError> {
        let idxs = vpn.indexes();
        let mut ppn = self.root_ppn;
        for idx in &idxs[..SV39_LEVELS - 1] {
            let pte = &ppn.get_pte_array()[*idx];
            if !pte.is_valid() {
                return Err(VmError::NotMapped);
            }
            if pte.is_leaf() {
                return Err(VmError::HugePage);
            }
            ppn = pte.ppn();
        }
        Ok(&mut ppn.get_pte_array()[idxs[SV39_LEVELS - 1]])
    }
    /// Map the page at `va` to the frame at `pa`.
    ///
    /// Interior tables are allocated on demand and stay installed if a later
    /// allocation fails. No TLB fence is issued.
    pub fn map<A: FrameAllocator>(
        &mut self,
        va: VirtAddr,
        pa: PhysAddr,
        perm: MapPermission,
        alloc: &mut A,
    ) -> Result<(), VmError> {
        if !va.aligned() || !pa.aligned() {
            return Err(VmError::Misaligned);
        }
        if !va.is_canonical() || pa.0 >> PA_WIDTH_SV39 != 0 {
            return Err(VmError::OutOfRange);
        }
        if !perm.intersects(MapPermission::R | MapPermission::W | MapPermission::X) {
            return Err(VmError::InvalidPermission);
        }
        let pte = self.find_pte_create(va.floor(), alloc)?;
        if pte.is_valid() {
            warn!("{:?} is mapped before mapping", va);
            return Err(VmError::Remap);
        }
        *pte = PageTableEntry::new(pa.floor(), PTEFlags::from(perm) | PTEFlags::V);
        trace!("map {:?} -> {:?} {:?}", va, pa, perm);
        Ok(())
    }
    /// Remove the mapping at `va` and free the frame behind it.
    ///
    /// Emptied interior tables are kept. No TLB fence is issued.
    pub fn unmap<A: FrameAllocator>(&mut self, va: VirtAddr, alloc: &mut A) -> Result<(), VmError> {
        if !va.aligned() {
            return Err(VmError::Misaligned);
        }
        if !va.is_canonical() {
            return Err(VmError::OutOfRange);
        }
        let pte = self.find_pte(va.floor()).map_err(|_| VmError::NotMapped)?;
        if !pte.is_valid() {
            return Err(VmError::NotMapped);
        }
        alloc.free_frame(pte.ppn().kernel_addr());
        *pte = PageTableEntry::empty();
        trace!("unmap {:?}", va);
        Ok(())
    }
    /// get the leaf page table entry of the page containing `va`
    pub fn translate(&self, va: VirtAddr) -> Option<PageTableEntry> {
        if !va.is_canonical() {
            return None;
        }
        self.find_pte(va.floor())
            .ok()
            .map(|pte| *pte)
            .filter(PageTableEntry::is_valid)
    }
    /// Base physical address of the frame backing `va`
    pub fn lookup(&self, va: VirtAddr) -> Option<PhysAddr> {
        self.translate(va).map(|pte| pte.ppn().into())
    }
    /// get the token from the page table
    pub fn token(&self) -> usize {
        satp_sv39(self.root_ppn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::PAGE_SIZE,
        mock::{assert_well_formed, MockFrames},
    };

    fn urw() -> MapPermission {
        MapPermission::R | MapPermission::W | MapPermission::U
    }

    fn fresh() -> (MockFrames, PageTable) {
        let mut frames = MockFrames::default();
        let table = PageTable::new(&mut frames).expect("root");
        (frames, table)
    }

    #[test]
    fn pte_encoding_is_bit_exact() {
        let pte = PageTableEntry::new(PhysPageNum(0x80400), PTEFlags::V | PTEFlags::R);
        assert_eq!(pte.bits, (0x80400 << 10) | 0b11);
        assert_eq!(PhysAddr::from(pte.ppn()), PhysAddr(0x8040_0000));
        assert!(pte.is_leaf());
        let dir = PageTableEntry::new(PhysPageNum(0x80401), PTEFlags::V);
        assert!(dir.is_interior());
        assert!(!PageTableEntry::empty().is_valid());
    }

    #[test]
    fn root_is_zeroed() {
        let (_frames, table) = fresh();
        assert!(table.entries().iter().all(|pte| pte.bits == 0));
    }

    #[test]
    fn map_lookup_unmap() {
        let (mut frames, mut table) = fresh();
        table
            .map(VirtAddr(0x1000), PhysAddr(0x8040_0000), urw(), &mut frames)
            .unwrap();
        assert_eq!(table.lookup(VirtAddr(0x1000)), Some(PhysAddr(0x8040_0000)));
        assert_eq!(table.lookup(VirtAddr(0x1abc)), Some(PhysAddr(0x8040_0000)));
        let pte = table.translate(VirtAddr(0x1000)).unwrap();
        assert_eq!(pte.flags(), PTEFlags::V | PTEFlags::R | PTEFlags::W | PTEFlags::U);

        table.unmap(VirtAddr(0x1000), &mut frames).unwrap();
        assert_eq!(table.lookup(VirtAddr(0x1000)), None);
        assert_eq!(frames.freed, [KernelAddr::from(PhysAddr(0x8040_0000))]);
        assert_well_formed(&table);
    }

    #[test]
    fn remap_is_rejected() {
        let (mut frames, mut table) = fresh();
        table
            .map(VirtAddr(0x1000), PhysAddr(0x8040_0000), urw(), &mut frames)
            .unwrap();
        assert_eq!(
            table.map(VirtAddr(0x1000), PhysAddr(0x8050_0000), urw(), &mut frames),
            Err(VmError::Remap)
        );
        assert_eq!(table.lookup(VirtAddr(0x1000)), Some(PhysAddr(0x8040_0000)));
    }

    #[test]
    fn oom_leaves_zeroed_interior_table() {
        let (mut frames, mut table) = fresh();
        frames.fail_after(1);
        assert_eq!(
            table.map(VirtAddr(0x20_0000), PhysAddr(0x8100_0000), urw(), &mut frames),
            Err(VmError::OutOfMemory)
        );
        let l2 = table.entries()[crate::address::px(2, 0x20_0000)];
        assert!(l2.is_interior());
        assert!(l2.ppn().get_pte_array().iter().all(|pte| pte.bits == 0));
        assert_eq!(table.lookup(VirtAddr(0x20_0000)), None);
        assert_well_formed(&table);
    }

    #[test]
    fn interior_tables_are_shared_by_neighbours() {
        let (mut frames, mut table) = fresh();
        table
            .map(VirtAddr(0x1000), PhysAddr(0x8040_0000), urw(), &mut frames)
            .unwrap();
        let after_first = frames.alloc_calls();
        table
            .map(VirtAddr(0x2000), PhysAddr(0x8040_1000), urw(), &mut frames)
            .unwrap();
        assert_eq!(frames.alloc_calls(), after_first);
    }

    #[test]
    fn unmap_missing_page() {
        let (mut frames, mut table) = fresh();
        assert_eq!(table.unmap(VirtAddr(0x1000), &mut frames), Err(VmError::NotMapped));
        table
            .map(VirtAddr(0x1000), PhysAddr(0x8040_0000), urw(), &mut frames)
            .unwrap();
        // same leaf table, empty slot
        assert_eq!(table.unmap(VirtAddr(0x3000), &mut frames), Err(VmError::NotMapped));
        assert!(frames.freed.is_empty());
    }

    #[test]
    fn rejects_bad_arguments() {
        let (mut frames, mut table) = fresh();
        assert_eq!(
            table.map(VirtAddr(0x1001), PhysAddr(0x8040_0000), urw(), &mut frames),
            Err(VmError::Misaligned)
        );
        assert_eq!(
            table.map(VirtAddr(0x1000), PhysAddr(0x8040_0001), urw(), &mut frames),
            Err(VmError::Misaligned)
        );
        assert_eq!(
            table.map(VirtAddr(1usize << 50), PhysAddr(0x8040_0000), urw(), &mut frames),
            Err(VmError::OutOfRange)
        );
        assert_eq!(
            table.map(VirtAddr(0x1000), PhysAddr(0x8040_0000), MapPermission::empty(), &mut frames),
            Err(VmError::InvalidPermission)
        );
        assert_eq!(
            table.map(VirtAddr(0x1000), PhysAddr(0x8040_0000), MapPermission::U, &mut frames),
            Err(VmError::InvalidPermission)
        );
        assert_eq!(table.unmap(VirtAddr(0x1800), &mut frames), Err(VmError::Misaligned));
        assert!(table.entries().iter().all(|pte| !pte.is_valid()));
    }

    #[test]
    fn non_canonical_alias_is_not_a_user_page() {
        let (mut frames, mut table) = fresh();
        table
            .map(VirtAddr(0x1000), PhysAddr(0x8040_0000), urw(), &mut frames)
            .unwrap();
        // same low 39 bits as 0x1000
        let alias = VirtAddr(0x1000 | 1usize << 40);
        assert_eq!(table.lookup(alias), None);
        assert!(table.translate(alias).is_none());
        assert_eq!(table.unmap(alias, &mut frames), Err(VmError::OutOfRange));
        assert_eq!(table.lookup(VirtAddr(0x1000)), Some(PhysAddr(0x8040_0000)));
        assert!(frames.freed.is_empty());
    }

    #[test]
    fn physical_address_wider_than_sv39_is_refused() {
        let (mut frames, mut table) = fresh();
        assert_eq!(
            table.map(
                VirtAddr(0x1000),
                PhysAddr(0x1000_0000_8040_0000),
                MapPermission::R,
                &mut frames
            ),
            Err(VmError::OutOfRange)
        );
        assert_eq!(table.lookup(VirtAddr(0x1000)), None);
        // the highest frame SV39 can name still maps
        let top = PhysAddr((1usize << PA_WIDTH_SV39) - PAGE_SIZE);
        table.map(VirtAddr(0x1000), top, MapPermission::R, &mut frames).unwrap();
        assert_eq!(table.lookup(VirtAddr(0x1000)), Some(top));
    }

    #[test]
    fn huge_page_entries_are_refused() {
        let (mut frames, mut table) = fresh();
        // a gigapage at slot 0, never produced by `map` itself
        table.entries_mut()[0] =
            PageTableEntry::new(PhysPageNum(0x80000), PTEFlags::V | PTEFlags::R | PTEFlags::W);
        assert_eq!(
            table.map(VirtAddr(0x1000), PhysAddr(0x8040_0000), urw(), &mut frames),
            Err(VmError::HugePage)
        );
        assert_eq!(table.lookup(VirtAddr(0x1000)), None);
        assert_eq!(table.unmap(VirtAddr(0x1000), &mut frames), Err(VmError::NotMapped));
    }

    #[test]
    fn lowest_and_highest_user_pages() {
        let (mut frames, mut table) = fresh();
        let top = (1usize << 38) - PAGE_SIZE;
        table
            .map(VirtAddr(0), PhysAddr(0x8040_0000), urw(), &mut frames)
            .unwrap();
        table
            .map(VirtAddr(top), PhysAddr(0x8040_1000), urw(), &mut frames)
            .unwrap();
        assert_eq!(table.lookup(VirtAddr(0)), Some(PhysAddr(0x8040_0000)));
        assert_eq!(table.lookup(VirtAddr(top)), Some(PhysAddr(0x8040_1000)));
        assert_well_formed(&table);
    }

    #[test]
    fn token_names_root() {
        let (_frames, table) = fresh();
        assert_eq!(table.token() >> 60, 8);
        assert_eq!(PageTable::from_token(table.token()).root_ppn(), table.root_ppn());
        assert_eq!(PhysAddr::from(table.root()), PhysAddr::from(table.root_ppn()));
    }
}
