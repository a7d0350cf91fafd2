//! CMOS real-time clock driver, virtualized per process.
//!
//! The hardware is programmed exactly once, at boot, to 1024 Hz. Every
//! other rate a process asks for is virtualized by counting hardware
//! interrupts in software, per [`crate::process::pcb`]'s `rtc_*` fields.

use crate::arch::io::{inb, outb};
use crate::config::{RTC_BASE_HZ, RTC_MAX_HZ, RTC_MIN_HZ};
use crate::error::{KernelError, KernelResult};

const CMOS_INDEX: u16 = 0x70;
const CMOS_DATA: u16 = 0x71;
const REG_A: u8 = 0x0A;
const REG_B: u8 = 0x0B;
const REG_C: u8 = 0x0C;
const NMI_DISABLE_BIT: u8 = 0x80;

/// Register A rate-select value for 1024 Hz (rate code 6, per the CMOS/RTC
/// datasheet): base frequency 32768 Hz >> (rate - 1).
const RATE_1024HZ: u8 = 0x06;

fn cmos_read(reg: u8) -> u8 {
    // SAFETY: 0x70/0x71 are the documented CMOS index/data ports; selecting
    // a register and reading data back is the standard two-step protocol.
    unsafe {
        outb(CMOS_INDEX, NMI_DISABLE_BIT | reg);
        inb(CMOS_DATA)
    }
}

fn cmos_write(reg: u8, value: u8) {
    // SAFETY: same protocol as `cmos_read`, writing instead of reading.
    unsafe {
        outb(CMOS_INDEX, NMI_DISABLE_BIT | reg);
        outb(CMOS_DATA, value);
    }
}

/// Programs the RTC to 1024 Hz and enables its periodic-interrupt bit.
/// Called once at boot; no process ever reprograms the hardware rate.
pub fn init() {
    let prev_a = cmos_read(REG_A);
    cmos_write(REG_A, (prev_a & 0xF0) | RATE_1024HZ);

    let prev_b = cmos_read(REG_B);
    cmos_write(REG_B, prev_b | 0x40); // enable periodic interrupt (PIE)

    crate::drivers::pic::enable_irq(crate::drivers::pic::IRQ_RTC);
    log::info!("rtc: hardware rate fixed at {RTC_BASE_HZ}Hz");
}

/// Computes `max_rtc_count = RTC_BASE_HZ / requested_hz` for `rtc_write`,
/// validating that `requested_hz` is a power of two in `2..=1024`.
pub fn max_count_for_rate(requested_hz: u32) -> KernelResult<u32> {
    if requested_hz < RTC_MIN_HZ
        || requested_hz > RTC_MAX_HZ
        || !requested_hz.is_power_of_two()
    {
        return Err(KernelError::ResourceExhausted);
    }
    Ok(RTC_BASE_HZ / requested_hz)
}

/// Entry point from [`crate::arch::idt::handle_rtc`]. Reading register C is
/// what re-arms the RTC for its next interrupt; it must happen on every
/// IRQ regardless of whether any process has the device open.
pub fn handle_irq() {
    let _ = cmos_read(REG_C);
    crate::process::table::tick_all_rtc_waiters();
    crate::drivers::pic::send_eoi(crate::drivers::pic::IRQ_RTC);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_count_matches_base_over_rate() {
        assert_eq!(max_count_for_rate(1024).unwrap(), 1);
        assert_eq!(max_count_for_rate(2).unwrap(), 512);
        assert_eq!(max_count_for_rate(8).unwrap(), 128);
    }

    #[test]
    fn rejects_non_power_of_two() {
        assert!(max_count_for_rate(100).is_err());
    }

    #[test]
    fn rejects_out_of_range() {
        assert!(max_count_for_rate(1).is_err());
        assert!(max_count_for_rate(2048).is_err());
    }
}
