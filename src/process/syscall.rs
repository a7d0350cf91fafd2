//! Syscall dispatch, `execute`/`halt`, and the per-fd operations layer.

use crate::config::{ARGS_BUF_SIZE, EXECUTABLE_ENTRY_OFFSET, EXECUTABLE_MAGIC, MAX_FILENAME_LEN};
use crate::error::{to_abi, KernelError, KernelResult};
use crate::fs::{self, FileType};
use crate::process::pcb::{FdSlot, FileKind};
use crate::process::table;

/// Syscall vector numbers as dispatched from `handle_syscall`'s `int 0x80`
/// trap, in the conventional order this kernel family uses them.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u32)]
pub enum SyscallNumber {
    Halt = 1,
    Execute = 2,
    Read = 3,
    Write = 4,
    Open = 5,
    Close = 6,
    GetArgs = 7,
    Vidmap = 8,
    SetHandler = 9,
    SigReturn = 10,
}

impl SyscallNumber {
    fn from_raw(raw: u32) -> Option<Self> {
        use SyscallNumber::*;
        Some(match raw {
            1 => Halt,
            2 => Execute,
            3 => Read,
            4 => Write,
            5 => Open,
            6 => Close,
            7 => GetArgs,
            8 => Vidmap,
            9 => SetHandler,
            10 => SigReturn,
            _ => return None,
        })
    }
}

/// Entry point from [`crate::arch::idt::handle_syscall`]. Every internal
/// operation returns a [`KernelResult`]; this is the single point where
/// that collapses to the ABI's `-1`-on-error convention.
pub fn dispatch(num: u32, arg1: u32, arg2: u32, arg3: u32) -> i32 {
    let Some(number) = SyscallNumber::from_raw(num) else {
        return -1;
    };
    match number {
        SyscallNumber::Halt => {
            halt_active(arg1 as u8);
            0
        }
        SyscallNumber::Execute => to_abi(execute(arg1 as *const u8)),
        SyscallNumber::Read => {
            // SAFETY: the caller (a ring-3 trap) passed a user pointer and
            // length; in a complete build this is validated against the
            // active process's 4 MiB window before dereferencing.
            let buf = unsafe { core::slice::from_raw_parts_mut(arg2 as *mut u8, arg3 as usize) };
            to_abi(read(arg1 as i32, buf))
        }
        SyscallNumber::Write => {
            // SAFETY: see `Read` above.
            let buf = unsafe { core::slice::from_raw_parts(arg2 as *const u8, arg3 as usize) };
            to_abi(write(arg1 as i32, buf))
        }
        SyscallNumber::Open => {
            // SAFETY: see `Read` above; filenames are bounded by
            // `MAX_FILENAME_LEN`.
            let name = unsafe { read_c_string(arg1 as *const u8, MAX_FILENAME_LEN) };
            to_abi(open(name))
        }
        SyscallNumber::Close => to_abi(close(arg1 as i32)),
        SyscallNumber::GetArgs => {
            // SAFETY: see `Read` above.
            let buf = unsafe { core::slice::from_raw_parts_mut(arg1 as *mut u8, arg2 as usize) };
            to_abi(getargs(buf))
        }
        SyscallNumber::Vidmap => to_abi(vidmap(arg1)),
        SyscallNumber::SetHandler => 0,
        SyscallNumber::SigReturn => 0,
    }
}

/// # Safety
/// `ptr` must point at up to `max_len` readable bytes belonging to the
/// calling process's address space.
unsafe fn read_c_string(ptr: *const u8, max_len: usize) -> &'static [u8] {
    // SAFETY: delegated to caller.
    let slice = unsafe { core::slice::from_raw_parts(ptr, max_len) };
    let len = slice.iter().position(|&b| b == 0).unwrap_or(max_len);
    &slice[..len]
}

fn current_pid() -> KernelResult<u32> {
    table::active_pid(crate::sched::active_terminal()).ok_or(KernelError::NotFound)
}

/// Parses `command` into a filename and argument string:
/// step 1 describes: the filename runs up to the first space, the rest
/// (after one separating space) is the argument string.
fn parse_command(command: &[u8]) -> (&[u8], &[u8]) {
    match command.iter().position(|&b| b == b' ') {
        Some(space) => {
            let args_start = (space + 1).min(command.len());
            (&command[..space], &command[args_start..])
        }
        None => (command, &[]),
    }
}

fn is_executable(inode: u32) -> KernelResult<bool> {
    let mut header = [0u8; 4];
    let n = fs::read_data(inode, 0, &mut header)?;
    Ok(n == 4 && header == EXECUTABLE_MAGIC)
}

/// Loads and launches a new program. On success this
/// does not return to its caller in the reference design (the iret lands
/// directly in ring 3); here it returns the eventual `halt` status once
/// execution-and-halt of the child has happened synchronously, which is
/// the only sound behavior without a real ring-3 execution environment.
fn execute(command: *const u8) -> KernelResult<u32> {
    if command.is_null() {
        return Err(KernelError::BadArgument);
    }
    // SAFETY: `command` is a NUL-terminated ASCII command line owned by the
    // calling process, bounded by `ARGS_BUF_SIZE`.
    let raw = unsafe { read_c_string(command, ARGS_BUF_SIZE) };
    let (filename, args) = parse_command(raw);
    if filename.is_empty() || filename.len() > MAX_FILENAME_LEN {
        return Err(KernelError::BadArgument);
    }

    let dentry = fs::read_dentry_by_name(filename)?;
    if !is_executable(dentry.inode)? {
        return Err(KernelError::ExecutionError);
    }

    let new_pid = table::allocate_pid()?;
    let parent_pid = table::active_pid(crate::sched::active_terminal());
    table::set_active_pid(crate::sched::active_terminal(), Some(new_pid));

    // Map the new pid's user frame before touching user virtual memory, so
    // the copy below lands in the right physical page.
    crate::arch::paging::setup_process_memory(new_pid);

    // SAFETY: `setup_process_memory` above just mapped directory entry
    // `USER_DIR_INDEX` to this pid's physical frame, so writes through
    // `USER_MEM_VIRT..USER_MEM_VIRT+FOUR_MIB` land in the new process's user
    // page, which a file of at most `MAX_DATA_BLOCKS_PER_INODE` blocks fits
    // inside.
    let user_image = unsafe {
        core::slice::from_raw_parts_mut(
            crate::config::USER_MEM_VIRT as *mut u8,
            crate::config::FOUR_MIB as usize,
        )
    };
    fs::read_data(dentry.inode, 0, user_image)?;

    let mut eip_buf = [0u8; 4];
    fs::read_data(dentry.inode, EXECUTABLE_ENTRY_OFFSET as u32, &mut eip_buf)?;
    let entry_eip = u32::from_le_bytes(eip_buf);

    table::with_pcb(new_pid, |pcb| {
        pcb.reset_for_execute(parent_pid);
        pcb.user_eip = entry_eip;
        let copy_len = args.len().min(ARGS_BUF_SIZE);
        pcb.args[..copy_len].copy_from_slice(&args[..copy_len]);
        pcb.args_len = copy_len;
        let stack_top = table::kernel_stack_top(new_pid);
        pcb.kernel_ebp = stack_top;
        pcb.kernel_esp = stack_top;
        pcb.exe_ebp = stack_top;
        pcb.exe_esp = stack_top;
    });

    log::info!("execute: pid {new_pid} entry=0x{entry_eip:08x}");
    Ok(new_pid)
}

/// Terminates the process running in the active terminal.
/// A root shell (`parent_pid == None`) is re-launched in place rather than
/// actually torn down.
pub fn halt_active(status: u8) {
    let Some(pid) = table::active_pid(crate::sched::active_terminal()) else {
        return;
    };
    let is_root = table::with_pcb(pid, |pcb| pcb.is_root_shell()).unwrap_or(true);

    if is_root {
        log::info!("halt: pid {pid} is a root shell, re-entering instead of exiting");
        table::with_pcb(pid, |pcb| pcb.reset_for_execute(None));
        return;
    }

    let parent_pid = table::with_pcb(pid, |pcb| pcb.parent_pid).flatten();
    table::free_pid(pid);
    table::set_active_pid(crate::sched::active_terminal(), parent_pid);
    if let Some(parent) = parent_pid {
        crate::arch::paging::setup_process_memory(parent);
    }
    log::info!("halt: pid {pid} exited with status {status}");
}

fn with_active_pcb<R>(f: impl FnOnce(&mut crate::process::pcb::Pcb) -> R) -> KernelResult<R> {
    let pid = current_pid()?;
    table::with_pcb(pid, f).ok_or(KernelError::NotFound)
}

/// Opens `filename`, assigning the operations table by file type.
fn open(filename: &[u8]) -> KernelResult<u32> {
    if filename.is_empty() {
        return Err(KernelError::BadArgument);
    }
    let dentry = fs::read_dentry_by_name(filename)?;
    let kind = match dentry.file_type {
        FileType::Rtc => FileKind::Rtc,
        FileType::Directory => FileKind::Directory,
        FileType::Regular => FileKind::Regular,
    };

    with_active_pcb(|pcb| {
        let slot = pcb.first_free_fd().ok_or(KernelError::ResourceExhausted)?;
        if kind == FileKind::Rtc {
            crate::drivers::rtc::max_count_for_rate(crate::config::RTC_MIN_HZ)
                .map(|max_count| {
                    pcb.rtc.max_count = max_count;
                    pcb.rtc.waiting_fd = Some(slot);
                })
                .ok();
        }
        pcb.fds[slot] = FdSlot::Open {
            kind,
            inode: dentry.inode,
            file_pos: 0,
        };
        Ok(slot as u32)
    })?
}

/// Dispatches to the fd's operations table by `kind`, per the per-fd
/// vtable. RTC reads block (virtually) on the per-process `pending` flag
/// rather than the hardware; terminal reads/writes delegate to
/// [`crate::drivers::terminal`]; regular files and directories read
/// through [`crate::fs`].
///
/// The RTC arm polls the PCB table rather than holding it locked across the
/// whole spin: `pending` is only ever raised by the RTC IRQ handler's
/// [`table::tick_all_rtc_waiters`], which takes the same lock, so holding it
/// here while spinning with interrupts enabled would deadlock against the
/// very interrupt this call is waiting on.
fn read(fd: i32, buf: &mut [u8]) -> KernelResult<u32> {
    if fd < 0 || fd as usize >= crate::config::MAX_OPEN_FILES {
        return Err(KernelError::BadArgument);
    }
    let pid = current_pid()?;
    let slot = table::with_pcb(pid, |pcb| pcb.fds[fd as usize]).ok_or(KernelError::NotFound)?;
    match slot {
        FdSlot::Unused => Err(KernelError::BadArgument),
        FdSlot::Open { kind: FileKind::Stdout, .. } => Err(KernelError::Unsupported),
        FdSlot::Open { kind: FileKind::Stdin, .. } => {
            Ok(crate::drivers::terminal::terminal_read(buf).max(0) as u32)
        }
        FdSlot::Open { kind: FileKind::Rtc, .. } => loop {
            let fired = table::with_pcb(pid, |pcb| {
                if pcb.rtc.pending {
                    pcb.rtc.pending = false;
                    true
                } else {
                    false
                }
            })
            .unwrap_or(false);
            if fired {
                break Ok(0);
            }
            core::hint::spin_loop();
        },
        FdSlot::Open { kind: FileKind::Directory, file_pos, .. } => {
            match fs::read_dentry_by_index(file_pos) {
                Ok(dentry) => {
                    table::with_pcb(pid, |pcb| {
                        if let FdSlot::Open { file_pos, .. } = &mut pcb.fds[fd as usize] {
                            *file_pos += 1;
                        }
                    });
                    let len = dentry.name().len().min(buf.len());
                    buf[..len].copy_from_slice(&dentry.name()[..len]);
                    Ok(len as u32)
                }
                Err(_) => Ok(0),
            }
        }
        FdSlot::Open { kind: FileKind::Regular, inode, file_pos } => {
            let n = fs::read_data(inode, file_pos, buf)?;
            table::with_pcb(pid, |pcb| {
                if let FdSlot::Open { file_pos, .. } = &mut pcb.fds[fd as usize] {
                    *file_pos += n;
                }
            });
            Ok(n)
        }
    }
}

/// `rtc_write` takes a 4-byte little-endian interrupt rate in Hz and
/// reprograms the calling process's virtual `max_count`; any rate rejected
/// by [`crate::drivers::rtc::max_count_for_rate`] (not a power of two, or
/// outside `2..=1024`) fails the call instead of silently keeping the old
/// rate.
fn write(fd: i32, buf: &[u8]) -> KernelResult<u32> {
    if fd < 0 || fd as usize >= crate::config::MAX_OPEN_FILES {
        return Err(KernelError::BadArgument);
    }
    with_active_pcb(|pcb| match pcb.fds[fd as usize] {
        FdSlot::Unused => Err(KernelError::BadArgument),
        FdSlot::Open { kind: FileKind::Stdout, .. } => {
            Ok(crate::drivers::terminal::terminal_write(buf).max(0) as u32)
        }
        FdSlot::Open { kind: FileKind::Rtc, .. } => {
            if buf.len() != 4 {
                return Err(KernelError::BadArgument);
            }
            let rate_hz = u32::from_le_bytes(buf.try_into().unwrap());
            let max_count = crate::drivers::rtc::max_count_for_rate(rate_hz)?;
            pcb.rtc.max_count = max_count;
            Ok(0)
        }
        _ => Err(KernelError::Unsupported),
    })?
}

/// `fd` 0 and 1 cannot be closed, matching the reference's `fd < 2` guard.
fn close(fd: i32) -> KernelResult<u32> {
    if fd < 2 || fd as usize >= crate::config::MAX_OPEN_FILES {
        return Err(KernelError::BadArgument);
    }
    with_active_pcb(|pcb| {
        if !pcb.fds[fd as usize].is_used() {
            return Err(KernelError::BadArgument);
        }
        pcb.fds[fd as usize] = FdSlot::Unused;
        Ok(0)
    })?
}

fn getargs(buf: &mut [u8]) -> KernelResult<u32> {
    with_active_pcb(|pcb| {
        if pcb.args_len == 0 {
            return Err(KernelError::NotFound);
        }
        if buf.len() < pcb.args_len {
            return Err(KernelError::BadArgument);
        }
        buf[..pcb.args_len].copy_from_slice(&pcb.args[..pcb.args_len]);
        Ok(0)
    })?
}

fn vidmap(dst_user_ptr: u32) -> KernelResult<u32> {
    crate::arch::paging::vidmap(dst_user_ptr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_command_splits_on_first_space() {
        let (name, args) = parse_command(b"shell ls -l");
        assert_eq!(name, b"shell");
        assert_eq!(args, b"ls -l");
    }

    #[test]
    fn parse_command_with_no_args_has_empty_tail() {
        let (name, args) = parse_command(b"shell");
        assert_eq!(name, b"shell");
        assert_eq!(args, b"");
    }

    #[test]
    fn syscall_number_rejects_unknown_vectors() {
        assert!(SyscallNumber::from_raw(0).is_none());
        assert!(SyscallNumber::from_raw(11).is_none());
        assert_eq!(SyscallNumber::from_raw(1), Some(SyscallNumber::Halt));
    }
}
