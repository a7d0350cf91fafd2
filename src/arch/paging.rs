//! Paging subsystem: page directory, page tables, and the video/vidmap
//! window.
//!
//! Page-directory and page-table entries are modeled as strongly-typed
//! record values with explicit `to_raw`/constructors rather than a dozen
//! positional bitfields.

use crate::config;
use crate::error::{KernelError, KernelResult};
use spin::Mutex;

const ENTRIES: usize = 1024;

/// A 4 KiB page-directory entry pointing at a page table.
#[derive(Clone, Copy)]
struct DirEntryTable {
    present: bool,
    writable: bool,
    user: bool,
    table_phys: u32,
}

impl DirEntryTable {
    fn to_raw(self) -> u32 {
        let mut raw = self.table_phys & 0xFFFF_F000;
        if self.present {
            raw |= 1 << 0;
        }
        if self.writable {
            raw |= 1 << 1;
        }
        if self.user {
            raw |= 1 << 2;
        }
        raw
    }
}

/// A 4 MiB page-directory entry (PS bit set) mapping directly to a physical
/// 4 MiB frame.
#[derive(Clone, Copy)]
struct DirEntryHuge {
    present: bool,
    writable: bool,
    user: bool,
    frame_phys: u32,
}

impl DirEntryHuge {
    fn to_raw(self) -> u32 {
        let mut raw = self.frame_phys & 0xFFC0_0000;
        if self.present {
            raw |= 1 << 0;
        }
        if self.writable {
            raw |= 1 << 1;
        }
        if self.user {
            raw |= 1 << 2;
        }
        raw |= 1 << 7; // page size: 4 MiB
        raw
    }
}

/// A 4 KiB page-table entry.
#[derive(Clone, Copy)]
struct TableEntry {
    present: bool,
    writable: bool,
    user: bool,
    frame_phys: u32,
}

impl TableEntry {
    const NOT_PRESENT: Self = Self {
        present: false,
        writable: false,
        user: false,
        frame_phys: 0,
    };

    fn to_raw(self) -> u32 {
        let mut raw = self.frame_phys & 0xFFFF_F000;
        if self.present {
            raw |= 1 << 0;
        }
        if self.writable {
            raw |= 1 << 1;
        }
        if self.user {
            raw |= 1 << 2;
        }
        raw
    }
}

#[repr(C, align(4096))]
struct PageTable([u32; ENTRIES]);

#[repr(C, align(4096))]
struct PageDirectory([u32; ENTRIES]);

struct PagingState {
    directory: PageDirectory,
    /// Covers virtual/physical 0..4 MiB; only the video-window slots are
    /// ever marked present (directory entry 0).
    low_table: PageTable,
    /// Directory entry 34 (`0x08800000 / 4MiB`); filled in lazily by
    /// `vidmap`.
    vidmap_table: PageTable,
}

static PAGING: Mutex<PagingState> = Mutex::new(PagingState {
    directory: PageDirectory([0; ENTRIES]),
    low_table: PageTable([0; ENTRIES]),
    vidmap_table: PageTable([0; ENTRIES]),
});

fn table_index(addr: u32) -> usize {
    ((addr & 0x003F_F000) >> 12) as usize
}

/// Installs the boot-time page directory:
/// - Directory 0 → `low_table`, with real VRAM and the three backing pages
///   present.
/// - Directory 1 → a 4 MiB supervisor page at `config::KERNEL_PHYS_BASE`.
/// - All other directory entries non-present.
///
/// Does not itself enable paging; callers that want paging live must follow
/// this with [`crate::arch::x86::enable_paging`] once CR3 is loaded.
pub fn init() {
    let mut state = PAGING.lock();

    let video_pages = [config::VIDEO_MEMORY_START]
        .into_iter()
        .chain(config::VIDEO_PAGE_ADDRS);
    for addr in video_pages {
        let idx = table_index(addr);
        state.low_table.0[idx] = TableEntry {
            present: true,
            writable: true,
            user: false,
            frame_phys: addr,
        }
        .to_raw();
    }

    let low_table_phys = &state.low_table as *const PageTable as u32;
    state.directory.0[0] = DirEntryTable {
        present: true,
        writable: true,
        user: false,
        table_phys: low_table_phys,
    }
    .to_raw();

    state.directory.0[1] = DirEntryHuge {
        present: true,
        writable: true,
        user: false,
        frame_phys: config::KERNEL_PHYS_BASE,
    }
    .to_raw();

    let dir_phys = &state.directory as *const PageDirectory as u32;
    drop(state);

    // SAFETY: `dir_phys` points at a directory we just fully populated
    // above (entries 0 and 1 present, the rest zeroed/non-present).
    unsafe {
        crate::arch::x86::load_page_directory(dir_phys);
        crate::arch::x86::enable_paging();
    }
    log::info!("paging: directory installed at {dir_phys:#x}");
}

/// Installs a user-accessible 4 MiB mapping at directory index
/// `config::USER_DIR_INDEX` (virtual `0x08000000`) pointing at
/// `config::USER_MEM_BASE + pid * 4 MiB`, then flushes the TLB.
pub fn setup_process_memory(pid: u32) {
    let mut state = PAGING.lock();
    let frame_phys = config::USER_MEM_BASE + pid * config::FOUR_MIB;
    state.directory.0[config::USER_DIR_INDEX] = DirEntryHuge {
        present: true,
        writable: true,
        user: true,
        frame_phys,
    }
    .to_raw();
    drop(state);
    crate::arch::x86::tlb_flush_all();
}

/// Installs the video-map page table at directory index
/// `config::VIDMAP_DIR_INDEX` (virtual `0x08800000`), pointing its first
/// entry at real VRAM when `active == visible`, otherwise at the active
/// terminal's backing page. Writes `0x08800000` into `*dst_user_ptr` and
/// flushes the TLB. Fails if `dst_user_ptr` does not lie in the calling
/// process's 4 MiB user region.
pub fn vidmap(dst_user_ptr: u32) -> KernelResult<u32> {
    if dst_user_ptr < config::USER_MEM_VIRT
        || dst_user_ptr >= config::USER_MEM_VIRT + config::FOUR_MIB
    {
        return Err(KernelError::BadArgument);
    }

    let active = crate::sched::active_terminal();
    let visible = crate::sched::visible_terminal();
    let target_phys = if active == visible {
        config::VIDEO_MEMORY_START
    } else {
        config::VIDEO_PAGE_ADDRS[active]
    };

    let mut state = PAGING.lock();
    state.vidmap_table.0[0] = TableEntry {
        present: true,
        writable: true,
        user: true,
        frame_phys: target_phys,
    }
    .to_raw();
    for entry in state.vidmap_table.0[1..].iter_mut() {
        *entry = TableEntry::NOT_PRESENT.to_raw();
    }

    let vidmap_table_phys = &state.vidmap_table as *const PageTable as u32;
    state.directory.0[config::VIDMAP_DIR_INDEX] = DirEntryTable {
        present: true,
        writable: true,
        user: true,
        table_phys: vidmap_table_phys,
    }
    .to_raw();
    drop(state);

    crate::arch::x86::tlb_flush_all();

    // SAFETY: caller-provided pointer was range-checked against the active
    // process's mapped 4 MiB user region above.
    unsafe {
        core::ptr::write(dst_user_ptr as *mut u32, config::VIDMAP_VIRT);
    }
    Ok(config::VIDMAP_VIRT)
}

/// Writes one byte through the active terminal's backing page rather than
/// real VRAM, used by `terminal_write` when the active terminal is hidden.
pub fn putc_diff(term: usize, offset: usize, value: u16) {
    let phys = config::VIDEO_PAGE_ADDRS[term];
    // SAFETY: `phys` is one of the three backing-page physical addresses,
    // identity-mapped by the boot directory entry 0; `offset` is bounds
    // checked by callers to the 80x25 cell grid (4000 bytes).
    unsafe {
        let ptr = (phys as *mut u16).add(offset);
        core::ptr::write_volatile(ptr, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_index_extracts_middle_bits() {
        assert_eq!(table_index(0xB8000), 0xB8);
        assert_eq!(table_index(0xBA000), 0xBA);
    }

    #[test]
    fn dir_entry_table_round_trips_present_bit() {
        let raw = DirEntryTable {
            present: true,
            writable: true,
            user: false,
            table_phys: 0x1000,
        }
        .to_raw();
        assert_eq!(raw & 1, 1);
        assert_eq!(raw & 0xFFFF_F000, 0x1000);
    }

    #[test]
    fn dir_entry_huge_sets_page_size_bit() {
        let raw = DirEntryHuge {
            present: true,
            writable: true,
            user: true,
            frame_phys: 0x0040_0000,
        }
        .to_raw();
        assert_eq!(raw & (1 << 7), 1 << 7);
        assert_eq!(raw & 0xFFC0_0000, 0x0040_0000);
    }
}
