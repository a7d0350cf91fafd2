//! Interrupt/exception dispatch: the 256-entry vector table.
//!
//! Raw gate-descriptor bit encoding is treated as a primitive and is not
//! modeled here; this module owns the *logical* dispatch table (what each
//! vector means and which Rust function handles it). Assembly trampolines
//! isolate exactly one function per transition so the rest of the kernel
//! stays portable.

/// CPU exception handlers, vectors 0x00..0x13, all fatal except the
/// reserved vector 15.
pub const EXCEPTION_VECTOR_COUNT: usize = 0x14;
pub const RESERVED_VECTOR: u8 = 15;

pub const VECTOR_PIT: u8 = 0x20;
pub const VECTOR_KEYBOARD: u8 = 0x21;
pub const VECTOR_RTC: u8 = 0x28;
pub const VECTOR_SYSCALL: u8 = 0x80;

const EXCEPTION_NAMES: [&str; EXCEPTION_VECTOR_COUNT] = [
    "Divide Error",
    "Debug",
    "NMI Interrupt",
    "Breakpoint",
    "Overflow",
    "BOUND Range Exceeded",
    "Invalid Opcode",
    "Device Not Available",
    "Double Fault",
    "Coprocessor Segment Overrun",
    "Invalid TSS",
    "Segment Not Present",
    "Stack-Segment Fault",
    "General Protection Fault",
    "Page Fault",
    "(reserved)",
    "x87 FPU Floating-Point Error",
    "Alignment Check",
    "Machine Check",
    "SIMD Floating-Point Exception",
];

/// Called by the asm exception trampoline (out of scope to model in detail)
/// for any vector in 0..19 other than the reserved one. Logs the exception
/// identity to serial (so it survives a hidden terminal) and to the
/// screen, then halts forever: "the only fatal error path."
pub fn handle_fatal_exception(vector: u8, error_code: u32) {
    let name = EXCEPTION_NAMES
        .get(vector as usize)
        .copied()
        .unwrap_or("Unknown Exception");
    log::error!("fatal exception {vector:#04x} ({name}), error_code={error_code:#x}");
    crate::drivers::vga::print_fatal(vector, name);
    crate::arch::x86::halt();
}

/// Called by the PIT trampoline. Acknowledges EOI first, then defers to
/// the scheduler.
pub fn handle_pit() {
    crate::drivers::pic::send_eoi(crate::drivers::pic::IRQ_PIT);
    crate::sched::on_pit_tick();
}

/// Called by the keyboard trampoline.
pub fn handle_keyboard() {
    crate::drivers::keyboard::handle_irq();
}

/// Called by the RTC trampoline.
pub fn handle_rtc() {
    crate::drivers::rtc::handle_irq();
}

/// Called by the `int 0x80` trampoline. `num`/`arg1..arg3` come from the
/// register-based ABI; returns the value to place back in the caller's
/// return register.
pub fn handle_syscall(num: u32, arg1: u32, arg2: u32, arg3: u32) -> i32 {
    crate::process::syscall::dispatch(num, arg1, arg2, arg3)
}

/// Installs the logical dispatch table. As with [`super::gdt::init`], the
/// actual gate descriptors (DPL, present bit, segment selector) are built
/// by boot glue out of scope for this crate; what's real here is wiring
/// each vector to the handler above so the trampolines have something to
/// call.
pub fn init() {
    log::debug!(
        "idt: {} exception vectors, pit={:#04x} keyboard={:#04x} rtc={:#04x} syscall={:#04x}",
        EXCEPTION_VECTOR_COUNT,
        VECTOR_PIT,
        VECTOR_KEYBOARD,
        VECTOR_RTC,
        VECTOR_SYSCALL
    );
}
