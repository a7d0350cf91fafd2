//! Three-terminal text console multiplexer.
//!
//! Each terminal owns a cursor, two 128-byte line buffers, and a 4 KiB
//! backing page. Exactly one terminal is visible (its content is on real
//! VRAM); any terminal may be active (its process holds the CPU). The two
//! need not coincide, which is the entire reason the backing pages exist.

use crate::config;
use crate::drivers::vga;
use spin::Mutex;

pub struct Terminal {
    pub cursor_x: usize,
    pub cursor_y: usize,
    kbuf: [u8; config::KBUF_SIZE],
    kbuf_len: usize,
    kbuf_entered: [u8; config::KBUF_SIZE],
    kbuf_entered_len: usize,
    pub enter_flag: bool,
}

impl Terminal {
    const fn new() -> Self {
        Self {
            cursor_x: 0,
            cursor_y: 0,
            kbuf: [0; config::KBUF_SIZE],
            kbuf_len: 0,
            kbuf_entered: [0; config::KBUF_SIZE],
            kbuf_entered_len: 0,
            enter_flag: false,
        }
    }

    fn reset_edit_buffer(&mut self) {
        self.kbuf = [0; config::KBUF_SIZE];
        self.kbuf_len = 0;
    }
}

struct TerminalState {
    terminals: [Terminal; config::NUM_TERMINALS],
    active_term_idx: usize,
    visible_term_idx: usize,
}

static STATE: Mutex<TerminalState> = Mutex::new(TerminalState {
    terminals: [Terminal::new(), Terminal::new(), Terminal::new()],
    active_term_idx: 0,
    visible_term_idx: 0,
});

pub fn backing_page_phys(term: usize) -> u32 {
    config::VIDEO_PAGE_ADDRS[term]
}

pub fn active_terminal() -> usize {
    STATE.lock().active_term_idx
}

pub fn visible_terminal() -> usize {
    STATE.lock().visible_term_idx
}

pub fn set_active_terminal(idx: usize) {
    STATE.lock().active_term_idx = idx;
}

/// Resets terminal `idx`'s buffers and cursor to a fresh-shell state. The
/// PIT boot path and `init_terminal` call this before launching each
/// terminal's root shell; it does not itself call `execute` (that is
/// [`crate::process`]'s job, to avoid a dependency cycle).
pub fn reset(idx: usize) {
    let mut state = STATE.lock();
    let term = &mut state.terminals[idx];
    term.reset_edit_buffer();
    term.kbuf_entered = [0; config::KBUF_SIZE];
    term.kbuf_entered_len = 0;
    term.enter_flag = false;
    term.cursor_x = 7;
    term.cursor_y = 1;
    vga::clear_page(backing_page_phys(idx));
}

/// Appends `ch` to the currently-edited terminal's line buffer and echoes
/// it. Returns `false` if the buffer is already at the
/// 127-data-byte cap (newline always fits in the last slot).
pub fn push_char(ch: u8) -> bool {
    let mut state = STATE.lock();
    let visible = state.visible_term_idx;
    let term = &mut state.terminals[visible];
    if term.kbuf_len >= config::KBUF_SIZE - 1 {
        return false;
    }
    term.kbuf[term.kbuf_len] = ch;
    term.kbuf_len += 1;
    echo_locked(term, visible, ch);
    true
}

/// Deletes the last character in the visible terminal's edit buffer,
/// erasing four columns instead of one if the deleted byte was a literal
/// tab.
pub fn backspace() {
    let mut state = STATE.lock();
    let visible = state.visible_term_idx;
    let term = &mut state.terminals[visible];
    if term.kbuf_len == 0 {
        return;
    }
    term.kbuf_len -= 1;
    let deleted = term.kbuf[term.kbuf_len];
    term.kbuf[term.kbuf_len] = 0;
    let erase_cols = if deleted == b'\t' { 4 } else { 1 };
    for _ in 0..erase_cols {
        erase_one_column(term, visible);
    }
}

/// Completes the current line: copies `kbuf` into `kbuf_entered`, appends a
/// newline, sets `enter_flag`, and clears `kbuf`.
pub fn enter_line() {
    let mut state = STATE.lock();
    let visible = state.visible_term_idx;
    let term = &mut state.terminals[visible];
    let len = term.kbuf_len.min(config::KBUF_SIZE - 1);
    term.kbuf_entered[..len].copy_from_slice(&term.kbuf[..len]);
    term.kbuf_entered[len] = b'\n';
    term.kbuf_entered_len = len + 1;
    term.enter_flag = true;
    term.reset_edit_buffer();
    newline_locked(term, visible);
}

/// Clears the visible terminal's screen and edit buffer (Ctrl-L).
pub fn clear_visible() {
    let mut state = STATE.lock();
    let visible = state.visible_term_idx;
    vga::clear_page(visible_phys(&state, visible));
    let term = &mut state.terminals[visible];
    term.cursor_x = 0;
    term.cursor_y = 0;
    term.reset_edit_buffer();
}

fn visible_phys(state: &TerminalState, term_idx: usize) -> u32 {
    if state.active_term_idx == state.visible_term_idx && term_idx == state.visible_term_idx {
        config::VIDEO_MEMORY_START
    } else {
        backing_page_phys(term_idx)
    }
}

fn echo_locked(term: &mut Terminal, term_idx: usize, ch: u8) {
    let phys = config::VIDEO_MEMORY_START;
    let _ = term_idx;
    vga::write_cell(phys, term.cursor_x, term.cursor_y, ch);
    advance_cursor(term);
}

fn newline_locked(term: &mut Terminal, _term_idx: usize) {
    term.cursor_x = 0;
    term.cursor_y = (term.cursor_y + 1) % config::TERM_SCREEN_ROWS;
}

fn advance_cursor(term: &mut Terminal) {
    term.cursor_x += 1;
    if term.cursor_x >= config::TERM_SCREEN_COLS {
        term.cursor_x = 0;
        term.cursor_y = (term.cursor_y + 1) % config::TERM_SCREEN_ROWS;
    }
}

fn erase_one_column(term: &mut Terminal, term_idx: usize) {
    if term.cursor_x == 0 && term.cursor_y == 0 {
        return;
    }
    if term.cursor_x == 0 {
        term.cursor_x = config::TERM_SCREEN_COLS - 1;
        term.cursor_y -= 1;
    } else {
        term.cursor_x -= 1;
    }
    vga::write_cell(config::VIDEO_MEMORY_START, term.cursor_x, term.cursor_y, b' ');
    let _ = term_idx;
}

/// Swaps terminal `to_idx` onto the screen (Alt-F{1,2,3}):
/// saves the outgoing cursor, restores the incoming one, and exchanges real
/// VRAM content with the incoming/outgoing backing pages.
pub fn switch(to_idx: usize) {
    let mut state = STATE.lock();
    let from_idx = state.visible_term_idx;
    if from_idx == to_idx {
        return;
    }

    vga::copy_page(config::VIDEO_MEMORY_START, backing_page_phys(from_idx));
    vga::copy_page(backing_page_phys(to_idx), config::VIDEO_MEMORY_START);

    state.visible_term_idx = to_idx;
}

/// Blocks (busy-waits) until the active terminal is visible and has a
/// completed line, then copies up to `nbytes` from `kbuf_entered` into
/// `buf`, stopping at the newline. Clears `enter_flag` before returning.
pub fn terminal_read(buf: &mut [u8]) -> i32 {
    loop {
        let mut state = STATE.lock();
        let active = state.active_term_idx;
        if state.visible_term_idx == active && state.terminals[active].enter_flag {
            let term = &mut state.terminals[active];
            let mut written = 0usize;
            for i in 0..buf.len() {
                if i == config::KBUF_SIZE - 1 {
                    buf[i] = b'\n';
                    written += 1;
                    break;
                }
                let byte = term.kbuf_entered[i];
                buf[i] = byte;
                written += 1;
                if byte == b'\n' {
                    break;
                }
            }
            term.enter_flag = false;
            return written as i32;
        }
        drop(state);
        core::hint::spin_loop();
    }
}

/// Writes `buf` to real VRAM if the active terminal is visible, otherwise
/// to its backing page. NUL bytes are skipped and not counted.
pub fn terminal_write(buf: &[u8]) -> i32 {
    let mut state = STATE.lock();
    let active = state.active_term_idx;
    let mut written = 0i32;
    for &byte in buf {
        if byte == 0 {
            continue;
        }
        let phys = visible_phys(&state, active);
        let term = &mut state.terminals[active];
        if byte == b'\n' {
            newline_locked(term, active);
        } else {
            vga::write_cell(phys, term.cursor_x, term.cursor_y, byte);
            advance_cursor(term);
        }
        written += 1;
    }
    written
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_char_respects_capacity() {
        let mut t = Terminal::new();
        t.kbuf_len = config::KBUF_SIZE - 1;
        assert_eq!(t.kbuf_len >= config::KBUF_SIZE - 1, true);
    }

    #[test]
    fn advance_cursor_wraps_at_row_end() {
        let mut t = Terminal::new();
        t.cursor_x = config::TERM_SCREEN_COLS - 1;
        t.cursor_y = 0;
        advance_cursor(&mut t);
        assert_eq!(t.cursor_x, 0);
        assert_eq!(t.cursor_y, 1);
    }

    #[test]
    fn enter_line_appends_trailing_newline() {
        let mut state = TerminalState {
            terminals: [Terminal::new(), Terminal::new(), Terminal::new()],
            active_term_idx: 0,
            visible_term_idx: 0,
        };
        let term = &mut state.terminals[0];
        term.kbuf[..5].copy_from_slice(b"hello");
        term.kbuf_len = 5;
        let len = term.kbuf_len.min(config::KBUF_SIZE - 1);
        term.kbuf_entered[..len].copy_from_slice(&term.kbuf[..len]);
        term.kbuf_entered[len] = b'\n';
        assert_eq!(&term.kbuf_entered[..6], b"hello\n");
    }
}
