//! Programmable interval timer.
//!
//! Programs channel 0 for ≈100 Hz and drives the scheduler's tick; the
//! rotation/process-switch logic itself lives in [`crate::sched`] since it
//! is not really about the timer hardware.

use crate::arch::io::outb;
use crate::config::{PIT_INPUT_FREQ_HZ, PIT_TARGET_FREQ_HZ};
use core::sync::atomic::{AtomicU64, Ordering};

const PIT_CMD: u16 = 0x43;
const PIT_CHANNEL0: u16 = 0x40;
const PIT_MODE_SQUARE_WAVE: u8 = 0x36;

static TICKS: AtomicU64 = AtomicU64::new(0);

pub fn init() {
    let divisor = (PIT_INPUT_FREQ_HZ / PIT_TARGET_FREQ_HZ) as u16;
    // SAFETY: 0x43/0x40 are the documented PIT command/channel-0 ports;
    // mode byte 0x36 selects channel 0, lobyte/hibyte access, square wave.
    unsafe {
        outb(PIT_CMD, PIT_MODE_SQUARE_WAVE);
        outb(PIT_CHANNEL0, (divisor & 0xFF) as u8);
        outb(PIT_CHANNEL0, (divisor >> 8) as u8);
    }
    crate::drivers::pic::enable_irq(crate::drivers::pic::IRQ_PIT);
    log::info!("pit: programmed for ~{PIT_TARGET_FREQ_HZ}Hz (divisor {divisor})");
}

/// Called once per tick by [`crate::arch::idt::handle_pit`], after EOI has
/// already been sent.
pub fn tick() -> u64 {
    TICKS.fetch_add(1, Ordering::Relaxed) + 1
}

pub fn ticks() -> u64 {
    TICKS.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn divisor_is_close_to_100hz() {
        let divisor = PIT_INPUT_FREQ_HZ / PIT_TARGET_FREQ_HZ;
        assert_eq!(divisor, 11_931);
    }
}
