//! The physical frame allocator contract

use crate::{config::PAGE_SIZE, KernelAddr};

/// Source of physical frames for page tables and mapped pages.
///
/// Frames are page aligned, one page long and addressed through the kernel
/// window. Returned frames are not zeroed.
pub trait FrameAllocator {
    /// Allocate a frame, `None` when out of memory
    fn alloc_frame(&mut self) -> Option<KernelAddr>;
    /// Release a frame previously returned by `alloc_frame`
    fn free_frame(&mut self, frame: KernelAddr);
}

/// `memzero` one frame
pub fn zero_frame(frame: KernelAddr) {
    unsafe {
        core::ptr::write_bytes(frame.as_mut_ptr(), 0, PAGE_SIZE);
    }
}
