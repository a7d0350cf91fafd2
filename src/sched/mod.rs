//! PIT-driven round-robin scheduler across the three terminals. Modeled
//! on a classic `init_terminal`/`terminal_switch` boot sequence and a
//! `process_switch` steady-state rotation.

use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::config::NUM_TERMINALS;

static BOOTED_TERMINALS: AtomicUsize = AtomicUsize::new(0);
static SCHEDULING_LIVE: AtomicBool = AtomicBool::new(false);

/// The terminal whose process currently holds the CPU. Distinct from
/// "visible" (the terminal drawn to real VRAM, owned by
/// [`crate::drivers::terminal`]): a hidden terminal's shell keeps running,
/// it just paints into its backing page instead of the screen.
pub fn active_terminal() -> usize {
    crate::drivers::terminal::active_terminal()
}

pub fn visible_terminal() -> usize {
    crate::drivers::terminal::visible_terminal()
}

/// Boots terminal 0's root shell. Terminals 1 and 2 are brought up lazily,
/// one per subsequent PIT tick, by [`on_pit_tick`]: staggered `init_terminal`
/// calls during the first few ticks after interrupts are enabled.
pub fn start() {
    launch_root_shell(0);
    BOOTED_TERMINALS.store(1, Ordering::SeqCst);
}

fn launch_root_shell(term: usize) {
    crate::drivers::terminal::reset(term);
    crate::drivers::terminal::set_active_terminal(term);
    match crate::process::table::allocate_pid() {
        Ok(pid) => {
            crate::process::table::with_pcb(pid, |pcb| pcb.reset_for_execute(None));
            crate::process::table::set_active_pid(term, Some(pid));
            crate::arch::paging::setup_process_memory(pid);
            log::info!("sched: terminal {term} root shell is pid {pid}");
        }
        Err(_) => log::error!("sched: no free pid to launch terminal {term}'s shell"),
    }
}

/// Entry point from [`crate::arch::idt::handle_pit`], called on every ~100
/// Hz tick. During boot, brings up terminals 1 and 2 one tick apart; once
/// all three are live, rotates `active_term_idx` and performs the kernel
/// half of a process switch (steady-state rotation only — actually
/// resuming a suspended ring-3 context requires the longjmp-style assembly
/// transition a bare-metal `process_switch` performs inline, which is out
/// of scope for a hosted build of this crate).
pub fn on_pit_tick() {
    let booted = BOOTED_TERMINALS.load(Ordering::SeqCst);
    if booted < NUM_TERMINALS {
        launch_root_shell(booted);
        BOOTED_TERMINALS.store(booted + 1, Ordering::SeqCst);
        if booted + 1 == NUM_TERMINALS {
            SCHEDULING_LIVE.store(true, Ordering::SeqCst);
        }
        return;
    }

    if !SCHEDULING_LIVE.load(Ordering::SeqCst) {
        return;
    }

    let from = active_terminal();
    let to = (from + 1) % NUM_TERMINALS;
    switch_active_process(from, to);
}

/// Saves the outgoing terminal's active PCB kernel stack pointers, installs
/// the incoming terminal's page mapping and `tss.esp0`, and marks it
/// active — the page-table/TSS half of `process_switch`.
fn switch_active_process(from: usize, to: usize) {
    if let Some(from_pid) = crate::process::table::active_pid(from) {
        crate::process::table::with_pcb(from_pid, |pcb| {
            pcb.kernel_esp = crate::process::table::kernel_stack_top(from_pid);
            pcb.kernel_ebp = pcb.kernel_esp;
        });
    }

    if let Some(to_pid) = crate::process::table::active_pid(to) {
        crate::arch::gdt::set_kernel_stack(crate::process::table::kernel_stack_top(to_pid));
        crate::arch::paging::setup_process_memory(to_pid);
    }

    crate::drivers::terminal::set_active_terminal(to);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotation_wraps_across_three_terminals() {
        assert_eq!((2 + 1) % NUM_TERMINALS, 0);
        assert_eq!((0 + 1) % NUM_TERMINALS, 1);
    }
}
