//! Bare-metal `#[test_case]` harness: QEMU-exit-code integration tests for
//! scenarios that need real hardware (boot sequence, interrupt delivery).
//! Ordinary logic (dentry lookup, PIC mask math, ...) is covered by
//! `#[cfg(test)]` unit tests that also compile for the host target and run
//! under plain `cargo test`.

use core::panic::PanicInfo;

use crate::error::KernelError;
use crate::{serial_print, serial_println};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum QemuExitCode {
    Success = 0x10,
    Failed = 0x11,
}

pub trait Testable {
    fn run(&self) -> Result<(), KernelError>;
}

impl<T> Testable for T
where
    T: Fn() -> Result<(), KernelError>,
{
    fn run(&self) -> Result<(), KernelError> {
        serial_print!("{}...\t", core::any::type_name::<T>());
        match self() {
            Ok(()) => {
                serial_println!("[ok]");
                Ok(())
            }
            Err(e) => {
                serial_println!("[failed]: {e}");
                Err(e)
            }
        }
    }
}

pub fn test_runner(tests: &[&dyn Testable]) -> ! {
    serial_println!("running {} integration tests", tests.len());
    let mut failed = 0;
    for test in tests {
        if test.run().is_err() {
            failed += 1;
        }
    }
    serial_println!("{} failed", failed);
    if failed == 0 {
        exit_qemu(QemuExitCode::Success);
    } else {
        exit_qemu(QemuExitCode::Failed);
    }
}

pub fn test_panic_handler(info: &PanicInfo) -> ! {
    serial_println!("[failed]");
    serial_println!("{info}");
    exit_qemu(QemuExitCode::Failed);
}

/// Writes the exit code to QEMU's `isa-debug-exit` device (port `0xf4`),
/// configured by the boot harness's QEMU invocation, then halts.
pub fn exit_qemu(code: QemuExitCode) -> ! {
    // SAFETY: 0xf4 is only meaningful under the `isa-debug-exit` QEMU
    // device this test harness is run with; on real hardware the write is
    // inert.
    unsafe {
        crate::arch::io::outl(0xf4, code as u32);
    }
    crate::arch::x86::halt();
}
