//! Constants in the kernel

pub use crate::boards::{CLOCK_FREQ, MMIO};

/// kernel heap size
pub const KERNEL_HEAP_SIZE: usize = 0x30_0000;
/// physical memory start address
pub const MEMORY_START: usize = 0x8000_0000;
/// physical memory end address
pub const MEMORY_END: usize = 0x8800_0000;
/// system name
pub const SYS_NAME: &str = "xv6-qemu";
