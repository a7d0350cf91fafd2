//! Global kernel-context state.
//!
//! The design calls for "a single kernel context value
//! initialized once at boot... mutation restricted to interrupt-disabled
//! regions." Rather than one God struct, each subsystem below owns a small
//! `static` cell of its own, always a `spin::Mutex<T>` behind a
//! `lazy_static!` or const initializer — never a bare `static mut`. Locks
//! are only ever taken with interrupts already disabled by the caller, so
//! contention cannot happen and a lock is never held across a suspension
//! point.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicBool, Ordering};

/// A value that is set exactly once, then read freely without locking.
///
/// Used for state that is computed once during boot (the filesystem image's
/// base pointer, page directory physical address) and never mutated again.
pub struct OnceCell<T> {
    initialized: AtomicBool,
    value: UnsafeCell<Option<T>>,
}

// SAFETY: access is gated by `initialized`; writers only run once, during
// single-threaded boot, before any reader can observe `initialized == true`.
unsafe impl<T: Send> Sync for OnceCell<T> {}

impl<T> OnceCell<T> {
    pub const fn new() -> Self {
        Self {
            initialized: AtomicBool::new(false),
            value: UnsafeCell::new(None),
        }
    }

    /// Initializes the cell. Panics if already initialized.
    pub fn init(&self, value: T) {
        if self.initialized.swap(true, Ordering::AcqRel) {
            panic!("OnceCell initialized twice");
        }
        // SAFETY: we just proved we are the sole initializer via the swap
        // above; no reader can have observed `initialized == true` yet.
        unsafe {
            *self.value.get() = Some(value);
        }
    }

    pub fn get(&self) -> &T {
        assert!(
            self.initialized.load(Ordering::Acquire),
            "OnceCell read before init"
        );
        // SAFETY: initialization happened-before this load per the Acquire
        // ordering above, and the value is never mutated again.
        unsafe { (*self.value.get()).as_ref().unwrap() }
    }

    pub fn try_get(&self) -> Option<&T> {
        if self.initialized.load(Ordering::Acquire) {
            // SAFETY: same reasoning as `get`.
            unsafe { (*self.value.get()).as_ref() }
        } else {
            None
        }
    }
}

impl<T> Default for OnceCell<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs `f` with interrupts disabled, restoring the prior IF state on exit.
/// Every shared mutable kernel-context cell is meant to be touched only from
/// inside a block like this (or from interrupt context, where IF is already
/// clear).
pub fn without_interrupts<F, R>(f: F) -> R
where
    F: FnOnce() -> R,
{
    let was_enabled = crate::arch::x86::interrupts_enabled();
    crate::arch::x86::disable_interrupts();
    let result = f();
    if was_enabled {
        crate::arch::x86::enable_interrupts();
    }
    result
}
