//! Physical page frame allocator

use alloc::vec::Vec;

use lazy_static::*;
use vm::{FrameAllocator, KernelAddr, PhysAddr, PhysPageNum};

use crate::sync::UPSafeCell;

/// Bump allocator over `[current, end)` with a stack of recycled frames
pub struct StackFrameAllocator {
    start:    usize,
    current:  usize,
    end:      usize,
    recycled: Vec<usize>,
}

impl StackFrameAllocator {
    pub const fn new() -> Self {
        Self {
            start:    0,
            current:  0,
            end:      0,
            recycled: Vec::new(),
        }
    }
    pub fn init(&mut self, l: PhysPageNum, r: PhysPageNum) {
        self.start = l.0;
        self.current = l.0;
        self.end = r.0;
        info!("last {} Physical Frames.", self.end - self.current);
    }
    /// frames still available
    pub fn free_count(&self) -> usize {
        self.end - self.current + self.recycled.len()
    }
    fn alloc(&mut self) -> Option<PhysPageNum> {
        if let Some(ppn) = self.recycled.pop() {
            Some(ppn.into())
        } else if self.current == self.end {
            error!("FrameAllocator out of memory!");
            None
        } else {
            self.current += 1;
            Some((self.current - 1).into())
        }
    }
    fn dealloc(&mut self, ppn: PhysPageNum) {
        let ppn = ppn.0;
        // validity check
        if ppn < self.start || ppn >= self.current || self.recycled.iter().any(|&v| v == ppn) {
            panic!("Frame ppn={:#x} has not been allocated!", ppn);
        }
        // recycle
        self.recycled.push(ppn);
    }
}

impl FrameAllocator for StackFrameAllocator {
    fn alloc_frame(&mut self) -> Option<KernelAddr> {
        self.alloc().map(|ppn| {
            trace!("alloc frame {:?}", ppn);
            ppn.kernel_addr()
        })
    }
    fn free_frame(&mut self, frame: KernelAddr) {
        let ppn = PhysAddr::from(frame).floor();
        trace!("free frame {:?}", ppn);
        self.dealloc(ppn);
    }
}

type FrameAllocatorImpl = StackFrameAllocator;

lazy_static! {
    /// frame allocator instance through lazy_static!
    pub static ref FRAME_ALLOCATOR: UPSafeCell<FrameAllocatorImpl> =
        unsafe { UPSafeCell::new(FrameAllocatorImpl::new()) };
}

/// hand every frame between the end of the kernel image and `memory_end` to
/// the allocator
pub fn init_frame_allocator(memory_end: usize) {
    extern "C" {
        fn ekernel();
    }
    let start = PhysAddr::from(KernelAddr(ekernel as usize)).ceil();
    let end = PhysAddr(memory_end).floor();
    debug!("init_frame_allocator: frames [{:?}, {:?})", start, end);
    FRAME_ALLOCATOR
        .exclusive_access(file!(), line!())
        .init(start, end);
}

/// Allocate a physical page frame, addressed through the kernel window
pub fn frame_alloc() -> Option<KernelAddr> {
    FRAME_ALLOCATOR
        .exclusive_access(file!(), line!())
        .alloc_frame()
}

/// Deallocate a frame returned by [`frame_alloc`]
pub fn frame_dealloc(frame: KernelAddr) {
    FRAME_ALLOCATOR
        .exclusive_access(file!(), line!())
        .free_frame(frame);
}

/// frames left in the allocator
pub fn frame_remaining() -> usize {
    FRAME_ALLOCATOR.exclusive_access(file!(), line!()).free_count()
}

/// boot-time check of allocation order and recycling
pub fn frame_allocator_test() {
    let mut v: Vec<KernelAddr> = Vec::new();
    for _ in 0..5 {
        let frame = frame_alloc().expect("frame_allocator_test: out of memory");
        debug!("{:?}", frame);
        v.push(frame);
    }
    let remaining = frame_remaining();
    for frame in v.drain(..) {
        frame_dealloc(frame);
    }
    assert_eq!(frame_remaining(), remaining + 5);
    for _ in 0..5 {
        let frame = frame_alloc().expect("frame_allocator_test: out of memory");
        v.push(frame);
    }
    for frame in v.drain(..) {
        frame_dealloc(frame);
    }
    info!("frame_allocator_test passed!");
}
