//! Global descriptor table and task-state segment.
//!
//! Bit-level GDT/TSS descriptor encoding is treated as a primitive per the
//! spec's scope — this module exposes only what the rest of the kernel
//! needs: a kernel/user code/data segment selector set, and a single TSS
//! whose `esp0`/`ss0` fields are updated on every `execute`/`halt`/process
//! switch so ring-3 → ring-0 transitions land on the right kernel stack.

use core::mem::size_of;
use lazy_static::lazy_static;
use spin::Mutex;

pub const KERNEL_CODE_SELECTOR: u16 = 0x08;
pub const KERNEL_DATA_SELECTOR: u16 = 0x10;
pub const USER_CODE_SELECTOR: u16 = 0x1B; // RPL 3
pub const USER_DATA_SELECTOR: u16 = 0x23; // RPL 3
pub const TSS_SELECTOR: u16 = 0x28;

/// Minimal 32-bit TSS: only the fields protected-mode `iret`/privilege
/// transitions actually consult (`esp0`, `ss0`) plus the IO permission
/// bitmap offset, which must point past the structure when none is used.
#[repr(C, packed)]
struct TaskStateSegment {
    link: u16,
    _link_hi: u16,
    esp0: u32,
    ss0: u16,
    _ss0_hi: u16,
    rest: [u8; 88],
    iomap_base: u16,
}

impl TaskStateSegment {
    const fn new() -> Self {
        Self {
            link: 0,
            _link_hi: 0,
            esp0: 0,
            ss0: 0,
            _ss0_hi: 0,
            rest: [0; 88],
            iomap_base: size_of::<TaskStateSegment>() as u16,
        }
    }
}

// SAFETY: accessed only through the `Mutex` below, with interrupts disabled
// whenever mutated.
unsafe impl Send for TaskStateSegment {}

lazy_static! {
    static ref TSS: Mutex<TaskStateSegment> = Mutex::new(TaskStateSegment::new());
}

/// Sets `tss.esp0` (and `ss0` to the kernel data selector) to `stack_top`,
/// the address the CPU will load ESP from on the next ring-3 → ring-0
/// transition. Called by `execute`, `halt`, and the PIT scheduler on every
/// task switch, per the invariant `tss.esp0 = KERNEL_MEM_TOP − pid*8KiB − 4`.
pub fn set_kernel_stack(stack_top: u32) {
    let mut tss = TSS.lock();
    tss.esp0 = stack_top;
    tss.ss0 = KERNEL_DATA_SELECTOR;
}

pub fn kernel_stack() -> u32 {
    TSS.lock().esp0
}

/// Installs the GDT and loads the TSS selector.
///
/// Descriptor bit-encoding (including patching the TSS descriptor's base
/// field to point at [`TSS`]) is the boot glue's responsibility and out of
/// scope for this crate; by the time this runs, the boot image has already
/// built a flat kernel/user code/data GDT plus a TSS descriptor referencing
/// our static TSS. This function only performs the one trampoline this
/// kernel owns: loading the task register.
pub fn init() {
    // SAFETY: `ltr` loads the task register from a TSS descriptor the boot
    // image already installed in the GDT; the instruction has no memory
    // side effects of its own.
    unsafe {
        core::arch::asm!("ltr {0:x}", in(reg) TSS_SELECTOR, options(nostack, preserves_flags));
    }
}
