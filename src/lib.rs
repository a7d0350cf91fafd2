//! protokernel library crate.
//!
//! Exposes every subsystem as a module so both `main.rs` (the bare-metal
//! `_start` binary) and the host-target test binaries can drive the same
//! code. On the host target (`cfg(not(target_os = "none"))`) this builds
//! against `std` purely so ordinary `#[cfg(test)]` unit tests can run under
//! plain `cargo test`; on the `i686` bare-metal target it is `#![no_std]`.

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", feature(alloc_error_handler))]
#![cfg_attr(target_os = "none", feature(custom_test_frameworks))]
#![cfg_attr(target_os = "none", test_runner(crate::test_framework::test_runner))]
#![cfg_attr(target_os = "none", reexport_test_harness_main = "test_main")]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(not(target_os = "none"))]
extern crate std;

#[cfg(all(target_os = "none", feature = "alloc"))]
use linked_list_allocator::LockedHeap;

#[cfg(all(target_os = "none", feature = "alloc"))]
#[global_allocator]
static ALLOCATOR: LockedHeap = LockedHeap::empty();

#[cfg(all(not(target_os = "none"), feature = "alloc"))]
#[global_allocator]
static SYSTEM_ALLOCATOR: std::alloc::System = std::alloc::System;

/// Heap allocation failure in a no_std kernel is unrecoverable.
#[cfg(target_os = "none")]
#[alloc_error_handler]
fn alloc_error_handler(layout: core::alloc::Layout) -> ! {
    panic!("allocation error: {layout:?}");
}

#[macro_use]
pub mod serial;

pub mod arch;
pub mod config;
pub mod drivers;
pub mod error;
pub mod fs;
pub mod process;
pub mod sched;
pub mod sync;

#[cfg(target_os = "none")]
pub mod test_framework;

/// Called by the physical memory manager's boot glue once the filesystem
/// image has been located; kept as a thin, named seam so `main.rs` has one
/// obvious call to make instead of reaching into [`fs`] directly.
///
/// # Safety
/// See [`fs::init`].
pub unsafe fn boot(fs_image_base: *const u8) {
    serial::init();
    log::info!(
        "protokernel {} ({}) booting",
        env!("CARGO_PKG_VERSION"),
        &env!("GIT_HASH")[..7.min(env!("GIT_HASH").len())]
    );

    arch::init();

    // SAFETY: delegated to caller.
    if let Err(e) = unsafe { fs::init(fs_image_base) } {
        log::error!("filesystem init failed: {e}");
    }

    drivers::pit::init();
    drivers::keyboard::init();
    drivers::rtc::init();

    sched::start();
    arch::enable_interrupts();
}

#[cfg(all(test, target_os = "none"))]
#[no_mangle]
pub extern "C" fn _start() -> ! {
    test_main();
    arch::halt();
}

#[cfg(all(test, target_os = "none"))]
#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    test_framework::test_panic_handler(info)
}
