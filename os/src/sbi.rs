//! SBI call wrappers

#![allow(unused)]

use core::arch::asm;

/// console putchar sbi call id
const SBI_CONSOLE_PUTCHAR: usize = 1;
/// shutdown sbi call id
const SBI_SHUTDOWN: usize = 8;

/// base extension id
const EID_BASE: usize = 0x10;
/// system reset extension id ("SRST")
const EID_SRST: usize = 0x5352_5354;
/// remote fence extension id ("RFNC")
pub const EID_RFENCE: usize = 0x5246_4e43;

const FID_GET_SPEC_VERSION: usize = 0;
const FID_GET_IMPL_ID: usize = 1;
const FID_GET_IMPL_VERSION: usize = 2;
const FID_PROBE_EXTENSION: usize = 3;
const FID_GET_MVENDORID: usize = 4;
const FID_GET_MARCHID: usize = 5;
const FID_GET_MIMPID: usize = 6;

const FID_SYSTEM_RESET: usize = 0;
const SRST_SHUTDOWN: usize = 0;
const SRST_REASON_NONE: usize = 0;
const SRST_REASON_FAILURE: usize = 1;

/// legacy sbi call
#[inline(always)]
fn sbi_call(which: usize, arg0: usize, arg1: usize, arg2: usize) -> usize {
    let mut ret;
    unsafe {
        asm!(
            "ecall",     // sbi call
            inlateout("x10") arg0 => ret, // sbi call arg0 and return value
            in("x11") arg1, // sbi call arg1
            in("x12") arg2, // sbi call arg2
            in("x16") 0usize, // legacy calls take function id 0
            in("x17") which,// sbi call id
        );
    }
    ret
}

/// Result of an SBI v0.2 call
#[derive(Debug, Clone, Copy)]
pub struct SbiRet {
    /// standard SBI error code, 0 on success
    pub error: isize,
    /// call specific value
    pub value: usize,
}

impl SbiRet {
    /// the call succeeded
    pub fn is_ok(&self) -> bool {
        self.error == 0
    }
}

/// sbi call with extension and function id
#[inline(always)]
fn sbi_call_v2(eid: usize, fid: usize, arg0: usize, arg1: usize) -> SbiRet {
    let error;
    let value;
    unsafe {
        asm!(
            "ecall",
            inlateout("x10") arg0 => error,
            inlateout("x11") arg1 => value,
            in("x16") fid,
            in("x17") eid,
        );
    }
    SbiRet { error, value }
}

/// use sbi call to putchar in console (qemu uart handler)
pub fn console_putchar(c: usize) {
    sbi_call(SBI_CONSOLE_PUTCHAR, c, 0, 0);
}

/// SBI specification version, major in bits [24..31), minor in [0..24)
pub fn get_spec_version() -> SbiRet {
    sbi_call_v2(EID_BASE, FID_GET_SPEC_VERSION, 0, 0)
}

/// SBI implementation id (0 BBL, 1 OpenSBI, 2 Xvisor, 3 KVM, 4 RustSBI, ...)
pub fn get_impl_id() -> SbiRet {
    sbi_call_v2(EID_BASE, FID_GET_IMPL_ID, 0, 0)
}

/// SBI implementation version
pub fn get_impl_version() -> SbiRet {
    sbi_call_v2(EID_BASE, FID_GET_IMPL_VERSION, 0, 0)
}

/// value is non-zero if extension `eid` is available
pub fn probe_extension(eid: usize) -> SbiRet {
    sbi_call_v2(EID_BASE, FID_PROBE_EXTENSION, eid, 0)
}

/// mvendorid CSR of the hart
pub fn get_mvendorid() -> SbiRet {
    sbi_call_v2(EID_BASE, FID_GET_MVENDORID, 0, 0)
}

/// marchid CSR of the hart
pub fn get_marchid() -> SbiRet {
    sbi_call_v2(EID_BASE, FID_GET_MARCHID, 0, 0)
}

/// mimpid CSR of the hart
pub fn get_mimpid() -> SbiRet {
    sbi_call_v2(EID_BASE, FID_GET_MIMPID, 0, 0)
}

/// Log what the firmware tells about itself
pub fn print_sbi_info() {
    let spec = get_spec_version();
    info!(
        "SBI specification v{}.{}",
        (spec.value >> 24) & 0x7f,
        spec.value & 0xff_ffff
    );
    info!(
        "SBI implementation {:#x} version {:#x}",
        get_impl_id().value,
        get_impl_version().value
    );
    info!(
        "mvendorid {:#x} marchid {:#x} mimpid {:#x}",
        get_mvendorid().value,
        get_marchid().value,
        get_mimpid().value
    );
    let rfence = probe_extension(EID_RFENCE);
    info!("RFENCE extension available: {}", rfence.is_ok() && rfence.value != 0);
}

/// use sbi call to shutdown the kernel
pub fn shutdown(failure: bool) -> ! {
    let reason = if failure {
        SRST_REASON_FAILURE
    } else {
        SRST_REASON_NONE
    };
    let srst = probe_extension(EID_SRST);
    if srst.is_ok() && srst.value != 0 {
        sbi_call_v2(EID_SRST, FID_SYSTEM_RESET, SRST_SHUTDOWN, reason);
    }
    sbi_call(SBI_SHUTDOWN, 0, 0, 0);
    panic!("It should shutdown!");
}
