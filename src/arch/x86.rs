//! Low-level primitives used by every other subsystem: interrupt
//! enable/disable, halting, TLB flush, and control-register access. GDT/IDT
//! bit-level descriptor layout is treated as a primitive and lives behind
//! [`super::gdt`]/[`super::idt`]; this module is the one below even those.

use core::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTS_ENABLED: AtomicBool = AtomicBool::new(false);

/// Disables hardware interrupts (`cli`).
pub fn disable_interrupts() {
    // SAFETY: `cli` has no memory effects; it only affects the IF flag.
    unsafe {
        core::arch::asm!("cli", options(nomem, nostack, preserves_flags));
    }
    INTERRUPTS_ENABLED.store(false, Ordering::Relaxed);
}

/// Enables hardware interrupts (`sti`).
pub fn enable_interrupts() {
    INTERRUPTS_ENABLED.store(true, Ordering::Relaxed);
    // SAFETY: `sti` has no memory effects; it only affects the IF flag.
    unsafe {
        core::arch::asm!("sti", options(nomem, nostack, preserves_flags));
    }
}

/// Best-effort tracking of whether interrupts are currently enabled, used by
/// [`crate::sync::without_interrupts`] to decide whether to restore IF on
/// exit. This kernel never nests interrupt-disabled regions across a
/// suspension point, so a single flag (rather than a real `pushf`/`popf`
/// save) is sufficient.
pub fn interrupts_enabled() -> bool {
    INTERRUPTS_ENABLED.load(Ordering::Relaxed)
}

/// Halts the CPU until the next interrupt (`hlt`), looping forever. Used by
/// fatal exception handlers and the idle path.
pub fn halt() -> ! {
    loop {
        // SAFETY: `hlt` stops the CPU until the next interrupt; harmless to
        // call repeatedly.
        unsafe {
            core::arch::asm!("hlt", options(nomem, nostack, preserves_flags));
        }
    }
}

/// Reloads CR3 with its current value, flushing all non-global TLB entries.
/// This is the mechanism `setup_process_memory` and `vidmap` use after
/// rewriting a page-directory entry.
pub fn tlb_flush_all() {
    // SAFETY: reading then rewriting CR3 with the same value is always
    // valid; it only has the side effect of flushing the TLB.
    unsafe {
        let cr3: u32;
        core::arch::asm!("mov {}, cr3", out(reg) cr3, options(nomem, nostack, preserves_flags));
        core::arch::asm!("mov cr3, {}", in(reg) cr3, options(nostack, preserves_flags));
    }
}

/// Loads `dir_phys_addr` (must be 4 KiB aligned) into CR3, switching the
/// active page directory.
///
/// # Safety
/// `dir_phys_addr` must point at a valid, fully-populated page directory or
/// the next memory access may fault or read/write the wrong physical page.
pub unsafe fn load_page_directory(dir_phys_addr: u32) {
    // SAFETY: delegated to caller.
    unsafe {
        core::arch::asm!("mov cr3, {}", in(reg) dir_phys_addr, options(nostack, preserves_flags));
    }
}

/// Enables paging and the page-size-extension bit (PSE, for 4 MiB pages) in
/// CR0/CR4. Called once during [`super::paging::init`].
///
/// # Safety
/// CR3 must already hold a valid page directory physical address.
pub unsafe fn enable_paging() {
    // SAFETY: sets CR4.PSE (bit 4) so 4 MiB page-directory entries are
    // legal, then CR0.PG (bit 31) to turn on paging. Caller guarantees CR3
    // is valid first.
    unsafe {
        core::arch::asm!(
            "mov {tmp:r}, cr4",
            "or {tmp:e}, 0x10",
            "mov cr4, {tmp:r}",
            "mov {tmp:r}, cr0",
            "or {tmp:e}, 0x80000000",
            "mov cr0, {tmp:r}",
            tmp = out(reg) _,
            options(nostack, preserves_flags),
        );
    }
}
