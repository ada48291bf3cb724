//! Memory management of the kernel
//!
//! The SV39 page table code lives in the `vm` crate. This module owns the
//! global instances it works on: the kernel heap, the physical frame
//! allocator and the single kernel page table. It also exposes the page
//! table operations as free functions bound to those globals.

mod frame_allocator;
mod heap_allocator;

use lazy_static::*;
use frame_allocator::{frame_alloc, frame_remaining, FRAME_ALLOCATOR};
use vm::{
    KernelAddr,
    KernelPageTable,
    MapPermission,
    PhysAddr,
    StepByOne,
    UserPageTable,
    VirtAddr,
    VmError,
};

use crate::{
    config::{MEMORY_END, MEMORY_START, MMIO},
    sync::UPSafeCell,
};

lazy_static! {
    /// The kernel page table, allocated on first use (`kvminit`)
    pub static ref KERNEL_PAGE_TABLE: UPSafeCell<KernelPageTable> = unsafe {
        let mut frames = FRAME_ALLOCATOR.exclusive_access(file!(), line!());
        match KernelPageTable::new(&mut *frames) {
            Ok(table) => UPSafeCell::new(table),
            Err(e) => panic!("kvminit: {}", e),
        }
    };
}

/// Allocate the kernel root page table
pub fn kvminit() {
    lazy_static::initialize(&KERNEL_PAGE_TABLE);
}

/// Map the physical range `[pa, pa + size)` into the kernel window
pub fn kmap(pa: usize, size: usize, perm: MapPermission) -> Result<(), VmError> {
    // the kernel table first: its lazy initializer takes the frame allocator
    let mut kernel = KERNEL_PAGE_TABLE.exclusive_access(file!(), line!());
    let mut frames = FRAME_ALLOCATOR.exclusive_access(file!(), line!());
    kernel.kmap(PhysAddr(pa), size, perm, &mut *frames)
}

/// Switch this hart to the kernel page table
pub fn activate_kernel_pgtbl() {
    KERNEL_PAGE_TABLE.exclusive_access(file!(), line!()).activate();
}

/// satp value of the kernel page table
pub fn kernel_token() -> usize {
    KERNEL_PAGE_TABLE.exclusive_access(file!(), line!()).token()
}

/// A new user page table sharing the kernel half, `None` when out of frames
pub fn new_user_pgtbl() -> Option<UserPageTable> {
    let kernel = KERNEL_PAGE_TABLE.exclusive_access(file!(), line!());
    let mut frames = FRAME_ALLOCATOR.exclusive_access(file!(), line!());
    UserPageTable::new(&kernel, &mut *frames)
}

/// Release a user page table with every frame mapped in its user half
pub fn destroy_user_pgtbl(page_table: UserPageTable) {
    let mut frames = FRAME_ALLOCATOR.exclusive_access(file!(), line!());
    page_table.destroy(&mut *frames);
}

/// Map one page of a user page table
pub fn map(
    page_table: &mut UserPageTable,
    va: VirtAddr,
    pa: PhysAddr,
    perm: MapPermission,
) -> Result<(), VmError> {
    let mut frames = FRAME_ALLOCATOR.exclusive_access(file!(), line!());
    page_table.map(va, pa, perm, &mut *frames)
}

/// Unmap one page of a user page table, freeing its frame
pub fn unmap(page_table: &mut UserPageTable, va: VirtAddr) -> Result<(), VmError> {
    let mut frames = FRAME_ALLOCATOR.exclusive_access(file!(), line!());
    page_table.unmap(va, &mut *frames)
}

/// Physical frame behind `va` in a user page table
pub fn lookup(page_table: &UserPageTable, va: VirtAddr) -> Option<PhysAddr> {
    page_table.lookup(va)
}

/// kmap or die: boot cannot continue without the kernel mappings
fn kmap_section(name: &str, start: usize, end: usize, perm: MapPermission) {
    let pa = PhysAddr::from(KernelAddr(start)).0;
    info!("mapping {} [{:#x}, {:#x}) {:?}", name, start, end, perm);
    if let Err(e) = kmap(pa, end - start, perm) {
        panic!("kmap {} failed: {}", name, e);
    }
}

/// initiate heap allocator, frame allocator and the kernel page table, then
/// switch to it
pub fn init() {
    extern "C" {
        fn stext();
        fn etext();
        fn srodata();
        fn erodata();
        fn sdata();
        fn edata();
        fn sbss_with_stack();
        fn ebss();
        fn ekernel();
    }
    debug!("heap allocator initialize");
    heap_allocator::init_heap();
    heap_allocator::heap_test();
    info!("physical memory [{:#x}, {:#x})", MEMORY_START, MEMORY_END);
    debug!("frame allocator initialize");
    frame_allocator::init_frame_allocator(MEMORY_END);
    frame_allocator::frame_allocator_test();
    debug!("kernel page table initialize");
    kvminit();

    let rw = MapPermission::R | MapPermission::W;
    kmap_section(".text", stext as usize, etext as usize, MapPermission::R | MapPermission::X);
    kmap_section(".rodata", srodata as usize, erodata as usize, MapPermission::R);
    kmap_section(".data", sdata as usize, edata as usize, rw);
    kmap_section(".bss", sbss_with_stack as usize, ebss as usize, rw);
    let ram_end = KernelAddr::from(PhysAddr(MEMORY_END)).0;
    kmap_section("physical memory", ekernel as usize, ram_end, rw);
    for &(base, size) in MMIO {
        let start = KernelAddr::from(PhysAddr(base)).0;
        kmap_section("mmio", start, start + size, rw);
    }
    activate_kernel_pgtbl();
}

/// Check the section permissions of the live kernel page table and take a
/// user page table through its whole life
pub fn remap_test() {
    extern "C" {
        fn stext();
        fn etext();
        fn srodata();
        fn sdata();
    }
    {
        let kernel = KERNEL_PAGE_TABLE.exclusive_access(file!(), line!());
        let table = kernel.page_table();
        let mut vpn = VirtAddr(stext as usize).floor();
        let end = VirtAddr(etext as usize).ceil();
        while vpn != end {
            let pte = table
                .translate(vpn.into())
                .unwrap_or_else(|| panic!("{:?} of .text is not mapped", vpn));
            assert!(pte.executable() && !pte.writable());
            vpn.step();
        }
        let rodata = table.translate(VirtAddr(srodata as usize)).unwrap();
        assert!(!rodata.writable() && !rodata.executable());
        let data = table.translate(VirtAddr(sdata as usize)).unwrap();
        assert!(data.writable() && !data.executable());
    }
    info!("remap_test: kernel sections passed!");

    let before = frame_remaining();
    let mut user = new_user_pgtbl().expect("remap_test: no frame for a user page table");
    let page = PhysAddr::from(frame_alloc().expect("remap_test: out of memory"));
    let va = VirtAddr(0x1000);
    let urw = MapPermission::R | MapPermission::W | MapPermission::U;
    map(&mut user, va, page, urw).unwrap();
    assert_eq!(lookup(&user, va), Some(page));
    assert_eq!(map(&mut user, va, page, urw), Err(VmError::Remap));
    // the kernel half came along
    assert_eq!(
        lookup(&user, VirtAddr(stext as usize)),
        Some(PhysAddr::from(KernelAddr(stext as usize)))
    );
    unmap(&mut user, va).unwrap();
    assert_eq!(lookup(&user, va), None);

    let page = PhysAddr::from(frame_alloc().expect("remap_test: out of memory"));
    map(&mut user, va, page, urw).unwrap();
    destroy_user_pgtbl(user);
    assert_eq!(frame_remaining(), before);
    info!("remap_test: user page table passed!");
}
