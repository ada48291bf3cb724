//! SV39 virtual memory core
//!
//! Everything the kernel needs to manipulate RISC-V SV39 page tables lives
//! here, independent of the board it runs on:
//!
//! - [`address`]: physical, virtual and kernel-window addresses, and the bit
//!   tricks on them (`PX`, `PGROUNDDOWN`, `LOAD_SATP`, `P2V_WO`)
//! - [`PageTable`]: `map`, `lookup` and `unmap` on a three-level tree,
//!   allocating interior tables on demand
//! - [`KernelPageTable`]: the single kernel root, `kmap` into the kernel window
//!   and activation
//! - [`UserPageTable`]: per-process roots sharing the kernel half, and their
//!   teardown
//!
//! Physical frames come from the caller through the [`FrameAllocator`] trait.
//! No function here issues a TLB fence except [`KernelPageTable::activate`].

#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate log;

#[macro_use]
extern crate bitflags;

pub mod address;
mod arch;
pub mod config;
mod error;
mod frame;
mod kernel;
mod page_table;
mod user;

#[cfg(test)]
mod mock;
#[cfg(test)]
mod tests_prop;

pub use address::{KernelAddr, PhysAddr, PhysPageNum, StepByOne, VirtAddr, VirtPageNum};
pub use arch::{sfence_vma, w_satp};
pub use error::VmError;
pub use frame::{zero_frame, FrameAllocator};
pub use kernel::KernelPageTable;
pub use page_table::{MapPermission, PTEFlags, PageTable, PageTableEntry};
pub use user::UserPageTable;
