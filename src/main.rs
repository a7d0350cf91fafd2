//! Bare-metal entry point. Thin by design: all real work happens in
//! `protokernel::boot` and the subsystems it calls, so this file and the
//! library crate can share a panic handler and test harness wiring.

#![no_std]
#![no_main]
#![feature(custom_test_frameworks)]
#![test_runner(protokernel::test_framework::test_runner)]
#![reexport_test_harness_main = "test_main"]

use core::panic::PanicInfo;

/// Physical address the boot loader places the filesystem image at. Boot
/// glue (multiboot module parsing) is treated as a primitive out of
/// scope for this crate; this constant stands in for whatever the real
/// loader hands off.
const FS_IMAGE_BASE: *const u8 = 0x0040_0000 as *const u8;

#[no_mangle]
pub extern "C" fn _start() -> ! {
    // SAFETY: `FS_IMAGE_BASE` is where boot glue is expected to have placed
    // a valid filesystem image before jumping to `_start`.
    unsafe {
        protokernel::boot(FS_IMAGE_BASE);
    }

    #[cfg(test)]
    test_main();

    protokernel::arch::halt();
}

#[cfg(not(test))]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    protokernel::serial::panic_print(format_args!("[KERNEL PANIC] {info}\n"));
    protokernel::arch::halt();
}

#[cfg(test)]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    protokernel::test_framework::test_panic_handler(info)
}
