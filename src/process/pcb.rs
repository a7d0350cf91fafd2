//! Process control block.
//!
//! A PCB is an explicit record in a fixed arena rather than a value
//! implicitly located by kernel-stack address arithmetic; [`super::table`]
//! pairs each slot with its own 8 KiB-aligned kernel stack object and
//! computes ESP from that object.

use crate::config::{ARGS_BUF_SIZE, MAX_OPEN_FILES};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FileKind {
    Stdin,
    Stdout,
    Rtc,
    Directory,
    Regular,
}

/// Explicit open/closed state for a file descriptor slot. A bare `flags`
/// byte with "unused" encoded as `0` collides with a legitimate inode
/// index of `0`; an explicit enum removes the ambiguity entirely.
#[derive(Clone, Copy, Debug, Default)]
pub enum FdSlot {
    #[default]
    Unused,
    Open {
        kind: FileKind,
        inode: u32,
        file_pos: u32,
    },
}

impl FdSlot {
    pub fn is_used(&self) -> bool {
        !matches!(self, FdSlot::Unused)
    }
}

/// Virtualized per-process RTC state: the hardware always fires at
/// 1024 Hz, and a process's `rtc_read` at a lower rate `f` is satisfied by
/// letting `ticks` free-run and firing once every `max_count =
/// 1024 / f` hardware interrupts.
#[derive(Clone, Copy)]
pub struct RtcState {
    pub max_count: u32,
    pub ticks: u32,
    pub pending: bool,
    pub waiting_fd: Option<usize>,
}

impl RtcState {
    const fn new() -> Self {
        Self {
            max_count: 0,
            ticks: 0,
            pending: false,
            waiting_fd: None,
        }
    }
}

pub struct Pcb {
    pub pid: u32,
    pub parent_pid: Option<u32>,
    pub user_eip: u32,
    pub kernel_ebp: u32,
    pub kernel_esp: u32,
    pub exe_ebp: u32,
    pub exe_esp: u32,
    pub rtc: RtcState,
    pub fds: [FdSlot; MAX_OPEN_FILES],
    pub args: [u8; ARGS_BUF_SIZE],
    pub args_len: usize,
}

impl Pcb {
    pub const fn empty(pid: u32) -> Self {
        Self {
            pid,
            parent_pid: None,
            user_eip: 0,
            kernel_ebp: 0,
            kernel_esp: 0,
            exe_ebp: 0,
            exe_esp: 0,
            rtc: RtcState::new(),
            fds: [FdSlot::Unused; MAX_OPEN_FILES],
            args: [0; ARGS_BUF_SIZE],
            args_len: 0,
        }
    }

    /// `fd 0` and `fd 1` start open on stdin/stdout ops.
    pub fn reset_for_execute(&mut self, parent_pid: Option<u32>) {
        self.parent_pid = parent_pid;
        self.user_eip = 0;
        self.rtc = RtcState::new();
        self.fds = [FdSlot::Unused; MAX_OPEN_FILES];
        self.fds[0] = FdSlot::Open {
            kind: FileKind::Stdin,
            inode: 0,
            file_pos: 0,
        };
        self.fds[1] = FdSlot::Open {
            kind: FileKind::Stdout,
            inode: 0,
            file_pos: 0,
        };
        self.args = [0; ARGS_BUF_SIZE];
        self.args_len = 0;
    }

    pub fn first_free_fd(&self) -> Option<usize> {
        self.fds.iter().position(|slot| !slot.is_used())
    }

    pub fn is_root_shell(&self) -> bool {
        self.parent_pid.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_pcb_has_stdin_stdout_open_and_rest_unused() {
        let mut pcb = Pcb::empty(0);
        pcb.reset_for_execute(None);
        assert!(pcb.fds[0].is_used());
        assert!(pcb.fds[1].is_used());
        for slot in &pcb.fds[2..] {
            assert!(!slot.is_used());
        }
        assert_eq!(pcb.first_free_fd(), Some(2));
    }

    #[test]
    fn root_shell_has_no_parent() {
        let mut pcb = Pcb::empty(0);
        pcb.reset_for_execute(None);
        assert!(pcb.is_root_shell());
        pcb.reset_for_execute(Some(0));
        assert!(!pcb.is_root_shell());
    }
}
