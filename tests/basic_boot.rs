//! Boot-to-QEMU-exit integration test. Runs `protokernel::boot` against a
//! minimal in-image filesystem blob and checks that the subsystems it wires
//! up (fs, scheduler, terminal 0) come up without panicking.

#![no_std]
#![no_main]

use core::panic::PanicInfo;

use protokernel::test_framework::{exit_qemu, test_panic_handler, QemuExitCode};
use protokernel::{serial_print, serial_println};

/// A boot block with zero dentries/inodes/data blocks: `fs::init` only reads
/// the three leading counts, so an all-zero page is a valid (empty) image.
#[repr(align(4096))]
struct EmptyImage([u8; 4096]);
static EMPTY_IMAGE: EmptyImage = EmptyImage([0u8; 4096]);

#[no_mangle]
pub extern "C" fn _start() -> ! {
    serial_println!("starting boot test");

    test_boot_brings_up_terminal_zero();
    test_syscall_dispatch_rejects_unknown_vector();

    serial_println!("all boot tests passed");
    exit_qemu(QemuExitCode::Success)
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    test_panic_handler(info)
}

fn test_boot_brings_up_terminal_zero() {
    serial_print!("boot_brings_up_terminal_zero...\t");
    // SAFETY: `EMPTY_IMAGE` is 4 KiB and lives for the program's duration.
    unsafe {
        protokernel::boot(EMPTY_IMAGE.0.as_ptr());
    }
    assert_eq!(protokernel::sched::active_terminal(), 0);
    serial_println!("[ok]");
}

fn test_syscall_dispatch_rejects_unknown_vector() {
    serial_print!("syscall_dispatch_rejects_unknown_vector...\t");
    let result = protokernel::process::syscall::dispatch(999, 0, 0, 0);
    assert_eq!(result, -1);
    serial_println!("[ok]");
}
