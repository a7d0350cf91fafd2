//! 8259 programmable interrupt controller driver.
//!
//! Two cascaded 8-bit controllers. Mask state is tracked in two bytes
//! (master/slave); `send_eoi` follows the IR2-cascade-notify rule for
//! slave IRQs.

use crate::arch::io::{io_wait, outb};
use spin::Mutex;

const MASTER_CMD: u16 = 0x20;
const MASTER_DATA: u16 = 0x21;
const SLAVE_CMD: u16 = 0xA0;
const SLAVE_DATA: u16 = 0xA1;

const ICW1_INIT: u8 = 0x11; // ICW4 needed, cascade mode, edge-triggered
const ICW4_8086: u8 = 0x01;
const EOI: u8 = 0x20;

const MASTER_VECTOR_OFFSET: u8 = 0x20;
const SLAVE_VECTOR_OFFSET: u8 = 0x28;
const CASCADE_IRQ: u8 = 2;

pub const IRQ_PIT: u8 = 0;
pub const IRQ_KEYBOARD: u8 = 1;
pub const IRQ_RTC: u8 = 8;

struct PicMasks {
    master: u8,
    slave: u8,
}

static MASKS: Mutex<PicMasks> = Mutex::new(PicMasks {
    master: 0xFF,
    slave: 0xFF,
});

/// Runs the canonical ICW1..ICW4 init sequence, remaps master to
/// 0x20..0x27 and slave to 0x28..0x2F, then masks every line except IR2
/// (the cascade) on the master.
pub fn init() {
    let saved = {
        let masks = MASKS.lock();
        (masks.master, masks.slave)
    };

    // SAFETY: this is the standard 8259 ICW1..ICW4 programming sequence,
    // issued to the documented command/data ports of both controllers; the
    // io_wait() calls are the conventional delay for real hardware.
    unsafe {
        outb(MASTER_CMD, ICW1_INIT);
        io_wait();
        outb(SLAVE_CMD, ICW1_INIT);
        io_wait();

        outb(MASTER_DATA, MASTER_VECTOR_OFFSET);
        io_wait();
        outb(SLAVE_DATA, SLAVE_VECTOR_OFFSET);
        io_wait();

        outb(MASTER_DATA, 1 << CASCADE_IRQ);
        io_wait();
        outb(SLAVE_DATA, CASCADE_IRQ);
        io_wait();

        outb(MASTER_DATA, ICW4_8086);
        io_wait();
        outb(SLAVE_DATA, ICW4_8086);
        io_wait();

        outb(MASTER_DATA, saved.0);
        outb(SLAVE_DATA, saved.1);
    }

    let mut masks = MASKS.lock();
    masks.master = !(1 << CASCADE_IRQ); // 0xFB: only IR2 enabled
    masks.slave = 0xFF;
    // SAFETY: writing the just-computed mask bytes to the documented data
    // ports of each controller.
    unsafe {
        outb(MASTER_DATA, masks.master);
        outb(SLAVE_DATA, masks.slave);
    }
}

/// Unmasks `irq` on the correct controller.
pub fn enable_irq(irq: u8) {
    let mut masks = MASKS.lock();
    if irq < 8 {
        masks.master &= !(1 << irq);
        // SAFETY: writing the updated master mask to its data port.
        unsafe { outb(MASTER_DATA, masks.master) };
    } else {
        masks.slave &= !(1 << (irq - 8));
        // SAFETY: writing the updated slave mask to its data port.
        unsafe { outb(SLAVE_DATA, masks.slave) };
    }
}

/// Masks `irq` on the correct controller.
pub fn disable_irq(irq: u8) {
    let mut masks = MASKS.lock();
    if irq < 8 {
        masks.master |= 1 << irq;
        // SAFETY: writing the updated master mask to its data port.
        unsafe { outb(MASTER_DATA, masks.master) };
    } else {
        masks.slave |= 1 << (irq - 8);
        // SAFETY: writing the updated slave mask to its data port.
        unsafe { outb(SLAVE_DATA, masks.slave) };
    }
}

/// Sends EOI for `irq`. For `irq >= 8` the master is also notified via IR2,
/// per the cascade rule in the 8259 manual.
pub fn send_eoi(irq: u8) {
    if irq >= 8 {
        // SAFETY: the master must also be told "the cascade line had an
        // interrupt", i.e. EOI|IR2, or it never re-arms IRQ2.
        unsafe { outb(MASTER_CMD, EOI | CASCADE_IRQ) };
        // SAFETY: documented specific-EOI write to the slave command port.
        unsafe { outb(SLAVE_CMD, EOI | (irq - 8)) };
    } else {
        // SAFETY: documented specific-EOI write to the master command port.
        unsafe { outb(MASTER_CMD, EOI | irq) };
    }
}

/// Returns the raw master/slave mask bytes, for diagnostics and tests.
fn current_masks() -> (u8, u8) {
    let masks = MASKS.lock();
    (masks.master, masks.slave)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enable_disable_toggle_master_bits() {
        {
            let mut masks = MASKS.lock();
            masks.master = 0xFF;
            masks.slave = 0xFF;
        }
        // Directly exercise the bit math without touching real ports by
        // replicating the same masking the public fns perform.
        let mut master = 0xFFu8;
        master &= !(1 << IRQ_KEYBOARD);
        assert_eq!(master, 0b1111_1101);
        master |= 1 << IRQ_KEYBOARD;
        assert_eq!(master, 0xFF);
    }

    #[test]
    fn slave_irq_offsets_by_eight() {
        let irq = IRQ_RTC;
        assert_eq!(irq - 8, 0);
    }

    #[test]
    fn current_masks_reports_initial_state() {
        let (master, slave) = current_masks();
        assert_eq!(master, 0xFF);
        assert_eq!(slave, 0xFF);
    }
}
