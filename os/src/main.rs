//! The main module and entrypoint
//!
//! A minimal kernel for the QEMU `virt` board that brings up SV39 paging.
//! The submodules are:
//!
//! - [`mm`]: heap, frame allocator and the kernel page table built with the
//!   `vm` crate
//! - [`sbi`]: calls into the SBI firmware
//! - [`sync`]: Wrap a static data structure inside it so that we are able to
//!   access it without any `unsafe`.
//!
//! Kernel code starts executing from `entry.S`, which turns on a boot page
//! table and jumps to [`rust_main()`] in the kernel window.

#![no_std]
#![no_main]

use core::arch::global_asm;

#[macro_use]
extern crate log;

extern crate alloc;

mod boards;

#[macro_use]
mod console;
pub mod config;
pub mod lang_items;
pub mod logging;
pub mod mm;
pub mod sbi;
pub mod sync;

use boards::shutdown;
use riscv::register::satp;
use config::{CLOCK_FREQ, SYS_NAME};

global_asm!(include_str!("entry.S"));

fn clear_bss() {
    extern "C" {
        fn sbss();
        fn ebss();
    }
    unsafe {
        core::slice::from_raw_parts_mut(sbss as usize as *mut u8, ebss as usize - sbss as usize)
            .fill(0);
    }
}

#[no_mangle]
/// the rust entry-point of os
pub fn rust_main() -> ! {
    clear_bss();
    println!("[kernel] Hello, {}!", SYS_NAME);
    logging::init();
    info!("logging init done");
    info!("boot satp: {:#x}", satp::read().bits());
    info!("board: qemu virt, timebase {} Hz", CLOCK_FREQ);
    sbi::print_sbi_info();
    mm::init();
    assert_eq!(satp::read().bits(), mm::kernel_token());
    info!("mm init done");
    mm::remap_test();
    info!("mm remap test done");
    println!("[kernel] shutting down...");
    shutdown(false)
}
