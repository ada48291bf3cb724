//! Constants of the QEMU `virt` board

/// timebase frequency of the board
pub const CLOCK_FREQ: usize = 12500000;

/// Physical MMIO ranges `(base, size)` mapped into the kernel window
pub const MMIO: &[(usize, usize)] = &[
    (0x0010_0000, 0x00_2000), // VIRT_TEST/RTC in virt machine
    (0x0200_0000, 0x01_0000), // CLINT
    (0x0c00_0000, 0x21_0000), // PLIC
    (0x1000_0000, 0x00_9000), // UART and VIRTIO
];

/// Power off the board through SBI
pub fn shutdown(failure: bool) -> ! {
    crate::sbi::shutdown(failure)
}
