//! The global allocator

use core::ptr::addr_of_mut;

use buddy_system_allocator::LockedHeap;

use crate::config::KERNEL_HEAP_SIZE;

/// heap allocator instance
#[global_allocator]
static HEAP_ALLOCATOR: LockedHeap = LockedHeap::empty();

/// heap space ([u8; KERNEL_HEAP_SIZE])
static mut HEAP_SPACE: [u8; KERNEL_HEAP_SIZE] = [0; KERNEL_HEAP_SIZE];

/// initiate heap allocator
pub fn init_heap() {
    unsafe {
        let start = addr_of_mut!(HEAP_SPACE) as usize;
        HEAP_ALLOCATOR.lock().init(start, KERNEL_HEAP_SIZE);
        debug!("kernel heap [{:#x}, {:#x})", start, start + KERNEL_HEAP_SIZE);
    }
}

/// boot-time check that boxes and vectors land in the heap
pub fn heap_test() {
    use alloc::{boxed::Box, vec::Vec};
    extern "C" {
        fn sbss();
        fn ebss();
    }
    let bss_range = sbss as usize..ebss as usize;
    let a = Box::new(5);
    assert_eq!(*a, 5);
    assert!(bss_range.contains(&(a.as_ref() as *const _ as usize)));
    drop(a);
    let mut v: Vec<usize> = Vec::new();
    for i in 0..500 {
        v.push(i);
    }
    for (i, val) in v.iter().take(500).enumerate() {
        assert_eq!(*val, i);
    }
    assert!(bss_range.contains(&(v.as_ptr() as usize)));
    drop(v);
    info!("heap_test passed!");
}
