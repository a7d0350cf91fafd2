//! Hardware drivers: PIC, PIT, PS/2 keyboard, CMOS RTC, VGA text output, and
//! the three-terminal multiplexer built on top of VGA.

pub mod keyboard;
pub mod pic;
pub mod pit;
pub mod rtc;
pub mod terminal;
pub mod vga;
