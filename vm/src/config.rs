//! Constants of the SV39 memory layout

/// page size : 4KB
pub const PAGE_SIZE: usize = 0x1000;
/// page size bits: 12
pub const PAGE_SIZE_BITS: usize = 0xc;
/// number of entries in one page table
pub const PTE_PER_TABLE: usize = 512;
/// bits of one page table index
pub const PX_BITS: usize = 9;
/// mask of one page table index
pub const PX_MASK: usize = (1 << PX_BITS) - 1;
/// levels of an SV39 page table
pub const SV39_LEVELS: usize = 3;

/// significant bits of an SV39 virtual address
pub const VA_WIDTH_SV39: usize = 39;
/// significant bits of an SV39 physical address
pub const PA_WIDTH_SV39: usize = 56;
/// bits of a physical page number
pub const PPN_WIDTH_SV39: usize = PA_WIDTH_SV39 - PAGE_SIZE_BITS;
/// bits of a virtual page number
pub const VPN_WIDTH_SV39: usize = VA_WIDTH_SV39 - PAGE_SIZE_BITS;

/// exclusive upper bound of the lower (user) half of the SV39 space
pub const USER_SPACE_END: usize = 1 << (VA_WIDTH_SV39 - 1);

/// satp MODE field value selecting SV39
pub const SATP_MODE_SV39: usize = 8;
/// shift of the satp MODE field
pub const SATP_MODE_SHIFT: usize = 60;

/// Offset of the kernel window: every physical byte `pa` is reachable at
/// `pa + V_P_DIFF` once paging is on. RAM at `0x8000_0000` shows up at
/// `0xffff_ffff_c000_0000`, the gigapage the boot page table maps.
pub const V_P_DIFF: usize = 0xffff_ffff_4000_0000;
