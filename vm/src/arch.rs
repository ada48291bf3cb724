//! satp and TLB fence wrappers

#[cfg(target_arch = "riscv64")]
mod imp {
    use core::arch::asm;

    use riscv::register::satp;

    /// Write the satp CSR
    pub fn w_satp(bits: usize) {
        unsafe {
            satp::write(bits);
        }
    }

    /// Global `sfence.vma` with zero `rs1` and `rs2`
    pub fn sfence_vma() {
        unsafe {
            asm!("sfence.vma zero, zero");
        }
    }
}

/// Stand-ins for builds that do not run on a RISC-V hart. They keep the last
/// satp value and stamp every call with a sequence number.
#[cfg(not(target_arch = "riscv64"))]
pub(crate) mod host {
    use core::sync::atomic::{AtomicUsize, Ordering};

    static SEQ: AtomicUsize = AtomicUsize::new(0);
    static SATP: AtomicUsize = AtomicUsize::new(0);
    static SATP_SEQ: AtomicUsize = AtomicUsize::new(0);
    static FENCE_SEQ: AtomicUsize = AtomicUsize::new(0);

    pub fn w_satp(bits: usize) {
        SATP.store(bits, Ordering::SeqCst);
        SATP_SEQ.store(SEQ.fetch_add(1, Ordering::SeqCst) + 1, Ordering::SeqCst);
    }

    pub fn sfence_vma() {
        FENCE_SEQ.store(SEQ.fetch_add(1, Ordering::SeqCst) + 1, Ordering::SeqCst);
    }

    #[cfg(test)]
    pub fn last_satp() -> usize {
        SATP.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub fn last_satp_seq() -> usize {
        SATP_SEQ.load(Ordering::SeqCst)
    }

    #[cfg(test)]
    pub fn last_fence_seq() -> usize {
        FENCE_SEQ.load(Ordering::SeqCst)
    }
}

#[cfg(not(target_arch = "riscv64"))]
use host as imp;

pub use imp::{sfence_vma, w_satp};
