//! PCB arena, per-PID kernel stacks, and the per-terminal schedule table.
//!
//! Modeled on a `pid_status`/`schedule`/`get_pcb` triple, redesigned as an
//! explicit array of PCB records plus a separate 8 KiB-aligned stack object
//! per slot, instead of deriving a PCB's address from kernel stack
//! arithmetic.

use crate::config::{EIGHT_KIB, MAX_PROCESSES, NUM_TERMINALS};
use crate::error::{KernelError, KernelResult};
use crate::process::pcb::Pcb;
use spin::Mutex;

#[repr(align(8192))]
struct KernelStack([u8; EIGHT_KIB as usize]);

impl KernelStack {
    const fn new() -> Self {
        Self([0; EIGHT_KIB as usize])
    }

    fn top(&self) -> u32 {
        (self.0.as_ptr() as u32) + EIGHT_KIB
    }
}

struct Slot {
    pcb: Option<Pcb>,
    stack: KernelStack,
}

struct Table {
    slots: [Slot; MAX_PROCESSES],
    schedule: [Option<u32>; NUM_TERMINALS],
}

// Work around `[T; N]::map` not being const-friendly in a static initializer.
macro_rules! slot_array {
    () => {
        [
            Slot { pcb: None, stack: KernelStack::new() },
            Slot { pcb: None, stack: KernelStack::new() },
            Slot { pcb: None, stack: KernelStack::new() },
            Slot { pcb: None, stack: KernelStack::new() },
            Slot { pcb: None, stack: KernelStack::new() },
            Slot { pcb: None, stack: KernelStack::new() },
        ]
    };
}

static TABLE: Mutex<Table> = Mutex::new(Table {
    slots: slot_array!(),
    schedule: [None; NUM_TERMINALS],
});

const _: () = assert!(MAX_PROCESSES == 6, "slot_array! is hand-unrolled for 6 slots");

/// Finds a free slot, marks it in-use, and returns its PID. Mirrors
/// `execute`'s linear scan of `pid_status`.
pub fn allocate_pid() -> KernelResult<u32> {
    let mut table = TABLE.lock();
    for (index, slot) in table.slots.iter_mut().enumerate() {
        if slot.pcb.is_none() {
            slot.pcb = Some(Pcb::empty(index as u32));
            return Ok(index as u32);
        }
    }
    Err(KernelError::ResourceExhausted)
}

pub fn free_pid(pid: u32) {
    let mut table = TABLE.lock();
    if let Some(slot) = table.slots.get_mut(pid as usize) {
        slot.pcb = None;
    }
}

pub fn kernel_stack_top(pid: u32) -> u32 {
    TABLE.lock().slots[pid as usize].stack.top()
}

/// Runs `f` against the PCB at `pid`, returning `None` if the slot is free.
pub fn with_pcb<R>(pid: u32, f: impl FnOnce(&mut Pcb) -> R) -> Option<R> {
    let mut table = TABLE.lock();
    table
        .slots
        .get_mut(pid as usize)
        .and_then(|slot| slot.pcb.as_mut())
        .map(f)
}

pub fn active_pid(term: usize) -> Option<u32> {
    TABLE.lock().schedule[term]
}

pub fn set_active_pid(term: usize, pid: Option<u32>) {
    TABLE.lock().schedule[term] = pid;
}

/// Entry point from [`crate::drivers::rtc::handle_irq`]: every live PCB with
/// an open RTC fd advances its tick counter, and flips `pending` once per
/// `max_count` hardware ticks.
pub fn tick_all_rtc_waiters() {
    let mut table = TABLE.lock();
    for slot in table.slots.iter_mut() {
        if let Some(pcb) = slot.pcb.as_mut() {
            if pcb.rtc.waiting_fd.is_none() || pcb.rtc.max_count == 0 {
                continue;
            }
            pcb.rtc.ticks += 1;
            if pcb.rtc.ticks >= pcb.rtc.max_count {
                pcb.rtc.ticks = 0;
                pcb.rtc.pending = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_and_free_round_trips_a_slot() {
        let pid = allocate_pid().unwrap();
        assert!(with_pcb(pid, |pcb| pcb.pid).is_some());
        free_pid(pid);
        assert!(with_pcb(pid, |pcb| pcb.pid).is_none());
    }

    #[test]
    fn kernel_stack_top_is_eight_kib_aligned() {
        let pid = allocate_pid().unwrap();
        let top = kernel_stack_top(pid);
        assert_eq!(top % EIGHT_KIB, 0);
        free_pid(pid);
    }
}
