//! PS/2 keyboard driver.
//!
//! Decoding itself is delegated to `pc_keyboard`'s scancode-set-1 state
//! machine (ScancodeSet1/Us104Key); what is specific to this kernel is the
//! hotkey evaluation order run ahead of ordinary character echo, and that
//! the decoded character always lands in the *visible* terminal's line
//! buffer, not whichever terminal happens to be active.

use pc_keyboard::{layouts, DecodedKey, HandleControl, KeyCode, KeyEvent, KeyState, Keyboard, ScancodeSet1};
use spin::Mutex;

const KEYBOARD_PORT: u16 = 0x60;

struct Modifiers {
    shift: bool,
    ctrl: bool,
    alt: bool,
    caps_lock: bool,
}

impl Modifiers {
    const fn new() -> Self {
        Self {
            shift: false,
            ctrl: false,
            alt: false,
            caps_lock: false,
        }
    }
}

struct KeyboardState {
    decoder: Keyboard<layouts::Us104Key, ScancodeSet1>,
    modifiers: Modifiers,
}

static STATE: Mutex<Option<KeyboardState>> = Mutex::new(None);

pub fn init() {
    let mut state = STATE.lock();
    *state = Some(KeyboardState {
        decoder: Keyboard::new(
            ScancodeSet1::new(),
            layouts::Us104Key,
            HandleControl::Ignore,
        ),
        modifiers: Modifiers::new(),
    });
    drop(state);
    crate::drivers::pic::enable_irq(crate::drivers::pic::IRQ_KEYBOARD);
    log::info!("keyboard: PS/2 scancode set 1 decoder ready");
}

/// Updates modifier flags from a raw key event, before it is handed to the
/// decoder's full `process_keyevent`, mirroring the reference
/// implementation's `update_flags`. Returns `true` if this event was purely
/// a modifier transition (nothing else should act on it).
fn update_modifiers(modifiers: &mut Modifiers, event: &KeyEvent) -> bool {
    let down = event.state == KeyState::Down;
    match event.code {
        KeyCode::LShift | KeyCode::RShift => {
            modifiers.shift = down;
            true
        }
        KeyCode::LControl | KeyCode::RControl => {
            modifiers.ctrl = down;
            true
        }
        KeyCode::LAlt | KeyCode::RAltGr => {
            modifiers.alt = down;
            true
        }
        KeyCode::CapsLock if down => {
            modifiers.caps_lock = !modifiers.caps_lock;
            true
        }
        _ => false,
    }
}

/// Evaluates the three hotkeys, in priority order, and returns `true` if
/// `event` was consumed by one of them.
fn handle_hotkeys(modifiers: &Modifiers, event: &KeyEvent) -> bool {
    if event.state != KeyState::Down {
        return false;
    }

    if modifiers.ctrl && event.code == KeyCode::L {
        crate::drivers::terminal::clear_visible();
        return true;
    }

    if modifiers.ctrl && event.code == KeyCode::C {
        let active = crate::drivers::terminal::active_terminal();
        let visible = crate::drivers::terminal::visible_terminal();
        if active == visible {
            crate::drivers::pic::send_eoi(crate::drivers::pic::IRQ_KEYBOARD);
            crate::process::syscall::halt_active(0);
            return true;
        }
        return true;
    }

    if modifiers.alt {
        let target = match event.code {
            KeyCode::F1 => Some(0),
            KeyCode::F2 => Some(1),
            KeyCode::F3 => Some(2),
            _ => None,
        };
        if let Some(term) = target {
            if crate::drivers::terminal::visible_terminal() != term {
                crate::drivers::terminal::switch(term);
            }
            return true;
        }
    }

    false
}

/// Translates a decoded key to the visible terminal's line-buffer edits
/// (backspace, Enter, or literal append).
fn handle_character(key: DecodedKey) {
    match key {
        DecodedKey::Unicode('\u{8}') => crate::drivers::terminal::backspace(),
        DecodedKey::Unicode('\n') | DecodedKey::Unicode('\r') => {
            crate::drivers::terminal::enter_line()
        }
        DecodedKey::Unicode(ch) if ch.is_ascii() && !ch.is_ascii_control() => {
            crate::drivers::terminal::push_char(ch as u8);
        }
        DecodedKey::Unicode('\t') => {
            crate::drivers::terminal::push_char(b'\t');
        }
        _ => {}
    }
}

/// Entry point from [`crate::arch::idt::handle_keyboard`].
pub fn handle_irq() {
    // SAFETY: 0x60 is the documented PS/2 data port; reading it also
    // acknowledges the scancode to the controller.
    let scancode = unsafe { crate::arch::io::inb(KEYBOARD_PORT) };

    let mut guard = STATE.lock();
    if let Some(state) = guard.as_mut() {
        if let Ok(Some(event)) = state.decoder.add_byte(scancode) {
            if !update_modifiers(&mut state.modifiers, &event) && !handle_hotkeys(&state.modifiers, &event)
            {
                if let Some(key) = state.decoder.process_keyevent(event) {
                    drop(guard);
                    handle_character(key);
                    crate::drivers::pic::send_eoi(crate::drivers::pic::IRQ_KEYBOARD);
                    return;
                }
            }
        }
    }
    drop(guard);
    crate::drivers::pic::send_eoi(crate::drivers::pic::IRQ_KEYBOARD);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caps_lock_toggles_on_down_only() {
        let mut modifiers = Modifiers::new();
        let down = KeyEvent {
            code: KeyCode::CapsLock,
            state: KeyState::Down,
        };
        assert!(update_modifiers(&mut modifiers, &down));
        assert!(modifiers.caps_lock);
        let up = KeyEvent {
            code: KeyCode::CapsLock,
            state: KeyState::Up,
        };
        assert!(!update_modifiers(&mut modifiers, &up));
        assert!(modifiers.caps_lock, "release must not toggle caps lock back");
    }

    #[test]
    fn shift_tracks_both_down_and_up() {
        let mut modifiers = Modifiers::new();
        update_modifiers(
            &mut modifiers,
            &KeyEvent {
                code: KeyCode::LShift,
                state: KeyState::Down,
            },
        );
        assert!(modifiers.shift);
        update_modifiers(
            &mut modifiers,
            &KeyEvent {
                code: KeyCode::LShift,
                state: KeyState::Up,
            },
        );
        assert!(!modifiers.shift);
    }
}
