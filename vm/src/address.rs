//! Implementation of physical and virtual address and page number.
//!
//! Besides the usual SV39 address types there is [`KernelAddr`], a virtual
//! address inside the kernel window. Page tables and frames handed out by the
//! frame allocator are always addressed through it, so the walker can
//! dereference them directly.

use core::fmt::{self, Debug, Formatter};

use crate::page_table::PageTableEntry;
use crate::config::{
    PAGE_SIZE, PAGE_SIZE_BITS, PPN_WIDTH_SV39, PTE_PER_TABLE, PX_BITS, PX_MASK, SATP_MODE_SHIFT,
    SATP_MODE_SV39, SV39_LEVELS, VA_WIDTH_SV39, VPN_WIDTH_SV39, V_P_DIFF,
};

/// physical address
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct PhysAddr(pub usize);

/// virtual address
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct VirtAddr(pub usize);

/// virtual address inside the kernel window (`pa + V_P_DIFF`)
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct KernelAddr(pub usize);

/// physical page number
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct PhysPageNum(pub usize);

/// virtual page number
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct VirtPageNum(pub usize);

impl Debug for VirtAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("VA:{:#x}", self.0))
    }
}
impl Debug for VirtPageNum {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("VPN:{:#x}", self.0))
    }
}
impl Debug for PhysAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("PA:{:#x}", self.0))
    }
}
impl Debug for PhysPageNum {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("PPN:{:#x}", self.0))
    }
}
impl Debug for KernelAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("KA:{:#x}", self.0))
    }
}

impl From<usize> for PhysAddr {
    fn from(v: usize) -> Self {
        Self(v)
    }
}
impl From<usize> for PhysPageNum {
    fn from(v: usize) -> Self {
        Self(v & ((1 << PPN_WIDTH_SV39) - 1))
    }
}
impl From<usize> for VirtAddr {
    fn from(v: usize) -> Self {
        Self(v)
    }
}
impl From<usize> for VirtPageNum {
    fn from(v: usize) -> Self {
        Self(v & ((1 << VPN_WIDTH_SV39) - 1))
    }
}
impl From<usize> for KernelAddr {
    fn from(v: usize) -> Self {
        Self(v)
    }
}
impl From<PhysAddr> for usize {
    fn from(v: PhysAddr) -> Self {
        v.0
    }
}
impl From<PhysPageNum> for usize {
    fn from(v: PhysPageNum) -> Self {
        v.0
    }
}
impl From<VirtAddr> for usize {
    fn from(v: VirtAddr) -> Self {
        v.0
    }
}
impl From<VirtPageNum> for usize {
    fn from(v: VirtPageNum) -> Self {
        v.0
    }
}
impl From<KernelAddr> for usize {
    fn from(v: KernelAddr) -> Self {
        v.0
    }
}

/// P2V
impl From<PhysAddr> for KernelAddr {
    fn from(pa: PhysAddr) -> Self {
        Self(pa.0.wrapping_add(V_P_DIFF))
    }
}
/// V2P
impl From<KernelAddr> for PhysAddr {
    fn from(ka: KernelAddr) -> Self {
        Self(ka.0.wrapping_sub(V_P_DIFF))
    }
}
impl From<KernelAddr> for VirtAddr {
    fn from(ka: KernelAddr) -> Self {
        Self(ka.0)
    }
}

impl VirtAddr {
    /// `VirtAddr`->`VirtPageNum`
    pub fn floor(&self) -> VirtPageNum {
        VirtPageNum::from(self.0 / PAGE_SIZE)
    }
    /// `VirtAddr`->`VirtPageNum`
    pub fn ceil(&self) -> VirtPageNum {
        VirtPageNum::from(page_round_up(self.0) / PAGE_SIZE)
    }
    /// Get page offset
    pub fn page_offset(&self) -> usize {
        self.0 & (PAGE_SIZE - 1)
    }
    /// Check page aligned
    pub fn aligned(&self) -> bool {
        self.page_offset() == 0
    }
    /// Bits above bit 38 must all equal bit 38
    pub fn is_canonical(&self) -> bool {
        let upper = (self.0 as isize) >> (VA_WIDTH_SV39 - 1);
        upper == 0 || upper == -1
    }
    /// Page table index of this address at `level`
    pub fn index(&self, level: usize) -> usize {
        px(level, self.0)
    }
}
impl From<VirtAddr> for VirtPageNum {
    fn from(v: VirtAddr) -> Self {
        assert_eq!(v.page_offset(), 0);
        v.floor()
    }
}
impl From<VirtPageNum> for VirtAddr {
    fn from(v: VirtPageNum) -> Self {
        // sign-extend bit 38 so the result stays canonical
        let va = v.0 << PAGE_SIZE_BITS;
        let shift = usize::BITS as usize - VA_WIDTH_SV39;
        Self((((va << shift) as isize) >> shift) as usize)
    }
}

impl PhysAddr {
    /// `PhysAddr`->`PhysPageNum`
    pub fn floor(&self) -> PhysPageNum {
        PhysPageNum::from(self.0 / PAGE_SIZE)
    }
    /// `PhysAddr`->`PhysPageNum`
    pub fn ceil(&self) -> PhysPageNum {
        PhysPageNum::from(page_round_up(self.0) / PAGE_SIZE)
    }
    /// Get page offset
    pub fn page_offset(&self) -> usize {
        self.0 & (PAGE_SIZE - 1)
    }
    /// Check page aligned
    pub fn aligned(&self) -> bool {
        self.page_offset() == 0
    }
}
impl From<PhysAddr> for PhysPageNum {
    fn from(v: PhysAddr) -> Self {
        assert_eq!(v.page_offset(), 0);
        v.floor()
    }
}
impl From<PhysPageNum> for PhysAddr {
    fn from(v: PhysPageNum) -> Self {
        Self(v.0 << PAGE_SIZE_BITS)
    }
}

impl KernelAddr {
    /// Get page offset
    pub fn page_offset(&self) -> usize {
        self.0 & (PAGE_SIZE - 1)
    }
    /// Get mutable pointer to the byte at this address
    pub fn as_mut_ptr(&self) -> *mut u8 {
        self.0 as *mut u8
    }
}

impl VirtPageNum {
    /// Page table indexes, root level first
    pub fn indexes(&self) -> [usize; SV39_LEVELS] {
        let mut vpn = self.0;
        let mut idx = [0usize; SV39_LEVELS];
        for i in (0..SV39_LEVELS).rev() {
            idx[i] = vpn & PX_MASK;
            vpn >>= PX_BITS;
        }
        idx
    }
}

impl PhysPageNum {
    /// The frame seen through the kernel window
    pub fn kernel_addr(&self) -> KernelAddr {
        PhysAddr::from(*self).into()
    }
    /// Get the page table stored in this frame
    pub fn get_pte_array(&self) -> &'static mut [PageTableEntry] {
        let ka = self.kernel_addr();
        unsafe { core::slice::from_raw_parts_mut(ka.0 as *mut PageTableEntry, PTE_PER_TABLE) }
    }
}

/// Step the page number by one
pub trait StepByOne {
    /// step
    fn step(&mut self);
}
impl StepByOne for VirtPageNum {
    fn step(&mut self) {
        self.0 += 1;
    }
}
impl StepByOne for PhysPageNum {
    fn step(&mut self) {
        self.0 += 1;
    }
}

/// `PX`: index into the page table at `level` (0 is the leaf level)
pub const fn px(level: usize, va: usize) -> usize {
    (va >> (PAGE_SIZE_BITS + PX_BITS * level)) & PX_MASK
}

/// `PGROUNDDOWN`
pub const fn page_round_down(addr: usize) -> usize {
    addr & !(PAGE_SIZE - 1)
}

/// `PGROUNDUP`
pub const fn page_round_up(addr: usize) -> usize {
    (addr + PAGE_SIZE - 1) & !(PAGE_SIZE - 1)
}

/// `LOAD_SATP`: satp value selecting SV39 with root table `root`
pub const fn satp_sv39(root: PhysPageNum) -> usize {
    (SATP_MODE_SV39 << SATP_MODE_SHIFT) | root.0
}

/// `P2V_WO`: map a physical address into the kernel window, leaving
/// addresses that already point into the window untouched. Usable before
/// paging is enabled.
pub const fn p2v_wo(addr: usize) -> usize {
    if addr >= V_P_DIFF {
        addr
    } else {
        addr.wrapping_add(V_P_DIFF)
    }
}

/// First level-2 slot that belongs to the kernel half
pub const fn kernel_split() -> usize {
    px(SV39_LEVELS - 1, V_P_DIFF)
}
