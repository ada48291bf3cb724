//! The panic handler

use core::panic::PanicInfo;

use crate::boards::shutdown;

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    if let Some(location) = info.location() {
        error!(
            "[kernel] Panicked at {}:{} {}",
            location.file(),
            location.line(),
            info.message()
        );
    } else {
        error!("[kernel] Panicked: {}", info.message());
    }
    // the logger may be filtered or not yet installed
    println!("[kernel] panic, shutting down");
    shutdown(true)
}
