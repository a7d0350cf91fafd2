//! Compile-time configuration. The kernel is delivered as a boot image with
//! "no CLI, no environment variables, no persistent state"; every tunable
//! is a `const` here rather than scattered magic numbers.

pub const FOUR_MIB: u32 = 4 * 1024 * 1024;
pub const EIGHT_KIB: u32 = 8 * 1024;
pub const FOUR_KIB: u32 = 4 * 1024;

/// Physical/virtual base of the 4 MiB supervisor page holding the kernel
/// image (directory entry 1).
pub const KERNEL_PHYS_BASE: u32 = 0x0040_0000;

/// Top of the region kernel stacks are carved from; PCBs live at the top of
/// each 8 KiB slot, slot N at `KERNEL_MEM_TOP - (N+1)*8KiB`.
pub const KERNEL_MEM_TOP: u32 = KERNEL_PHYS_BASE + FOUR_MIB;

/// Virtual address of the user-visible 4 MiB code/data window.
pub const USER_MEM_VIRT: u32 = 0x0800_0000;
pub const USER_DIR_INDEX: usize = (USER_MEM_VIRT / FOUR_MIB) as usize; // 32

/// Physical base from which each PID's 4 MiB user frame is carved:
/// `USER_MEM_BASE + pid * FOUR_MIB`.
pub const USER_MEM_BASE: u32 = 0x0080_0000;

/// Virtual entry point every user image is loaded at and jumped to.
pub const USER_ENTRY_VIRT: u32 = 0x0804_8000;

/// Virtual address `vidmap` hands back to user space.
pub const VIDMAP_VIRT: u32 = 0x0880_0000;
pub const VIDMAP_DIR_INDEX: usize = (VIDMAP_VIRT / FOUR_MIB) as usize; // 34

pub const VIDEO_MEMORY_START: u32 = 0xB_8000;
pub const VIDEO_MEMORY_END: u32 = 0xB_FFFF;

/// One real-VRAM-shadow backing page per terminal, indexed by terminal id.
pub const VIDEO_PAGE_ADDRS: [u32; 3] = [0xB_A000, 0xB_B000, 0xB_C000];

pub const MAX_PROCESSES: usize = 6;
pub const MAX_OPEN_FILES: usize = 8;
pub const ARGS_BUF_SIZE: usize = 1024;
pub const MAX_FILENAME_LEN: usize = 32;
pub const MAX_DENTRIES: usize = 63;
pub const DATA_BLOCK_SIZE: usize = 4096;
pub const MAX_DATA_BLOCKS_PER_INODE: usize = 1023;

pub const NUM_TERMINALS: usize = 3;
pub const TERM_SCREEN_COLS: usize = 80;
pub const TERM_SCREEN_ROWS: usize = 25;
pub const KBUF_SIZE: usize = 128;

/// PIT: input clock / divisor ≈ target Hz.
pub const PIT_INPUT_FREQ_HZ: u32 = 1_193_182;
pub const PIT_TARGET_FREQ_HZ: u32 = 100;

/// RTC is always programmed to this hardware rate; per-process rates are
/// virtualized as `max_rtc_count = RTC_BASE_HZ / requested_hz`.
pub const RTC_BASE_HZ: u32 = 1024;
pub const RTC_MIN_HZ: u32 = 2;
pub const RTC_MAX_HZ: u32 = 1024;

pub const EXECUTABLE_MAGIC: [u8; 4] = [0x7F, 0x45, 0x4C, 0x46];
/// Offset of the little-endian entry-point EIP within a loaded executable.
pub const EXECUTABLE_ENTRY_OFFSET: usize = 24;
