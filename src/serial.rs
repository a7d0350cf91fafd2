//! COM1 serial diagnostics, independent of VGA/terminal state.
//!
//! The `log` facade is backed by this UART so diagnostic output keeps
//! flowing even when the screen is showing a hidden terminal or a wedged
//! user program.

use core::fmt::Write;

use log::{LevelFilter, Metadata, Record};
use spin::Mutex;
use uart_16550::SerialPort;

const COM1_BASE: u16 = 0x3F8;

lazy_static::lazy_static! {
    static ref SERIAL1: Mutex<SerialPort> = {
        // SAFETY: 0x3F8 is the standard PC COM1 I/O base; constructing the
        // port does not perform I/O until `init` is called below.
        let mut port = unsafe { SerialPort::new(COM1_BASE) };
        port.init();
        Mutex::new(port)
    };
}

struct SerialLogger;

impl log::Log for SerialLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        crate::sync::without_interrupts(|| {
            let mut port = SERIAL1.lock();
            let _ = writeln!(port, "[{:<5}] {}", record.level(), record.args());
        });
    }

    fn flush(&self) {}
}

static LOGGER: SerialLogger = SerialLogger;

/// Installs the serial-backed logger as the global `log` sink.
///
/// Must run before any other subsystem calls `log::info!` et al. Idempotent
/// only in the sense that `log::set_logger` itself rejects a second call;
/// callers should invoke this exactly once, from `arch::init`.
pub fn init() {
    let level = if cfg!(debug_assertions) {
        LevelFilter::Trace
    } else {
        LevelFilter::Info
    };
    log::set_max_level(level);
    // A second call to set_logger during boot would be a programming error,
    // not a recoverable condition.
    log::set_logger(&LOGGER).expect("logger already installed");
}

/// Prints directly to the serial port, bypassing the `log` facade. Used by
/// the panic handler, which must not assume the allocator or locks are in a
/// good state.
pub fn panic_print(args: core::fmt::Arguments) {
    // SAFETY: constructing a fresh port handle and writing to it is safe
    // even if the logger's lock is held by a thread that panicked while
    // holding it; on this single-core kernel that can only be us.
    let mut port = unsafe { SerialPort::new(COM1_BASE) };
    let _ = port.write_fmt(args);
}

#[macro_export]
macro_rules! serial_print {
    ($($arg:tt)*) => ($crate::serial::panic_print(format_args!($($arg)*)));
}

#[macro_export]
macro_rules! serial_println {
    () => ($crate::serial_print!("\n"));
    ($($arg:tt)*) => ($crate::serial_print!("{}\n", format_args!($($arg)*)));
}
