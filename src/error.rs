//! Kernel-internal error type.
//!
//! Every fallible function below the syscall gate returns [`KernelResult`].
//! `syscall::dispatch` is the single place that projects a [`KernelError`]
//! down to the ABI's `-1` sentinel; nothing else in the kernel should invent
//! its own magic-number failure convention.

use core::fmt;

/// Kernel-internal failure reason.
///
/// Variants line up with the categories in the error-handling design: every
/// `-1` the syscall ABI can return traces back to exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// Null pointer, fd outside 0..7, negative length, or a buffer that does
    /// not lie within the caller's mapped 4 MiB region.
    BadArgument,
    /// No free PID, no free fd slot, or an RTC frequency that cannot be
    /// represented as `1024 / f`.
    ResourceExhausted,
    /// Unknown filename, inode index out of range, or a data-block index the
    /// boot block did not allocate.
    FsStructural,
    /// The command named a file that is not a valid executable image, or the
    /// command string was empty.
    ExecutionError,
    /// Lookup failed but no data was corrupt (e.g. directory listing past
    /// the last entry).
    NotFound,
    /// The call is recognized but intentionally does nothing (`set_handler`,
    /// `sigreturn`) or the caller asked for something this kernel does not
    /// implement.
    Unsupported,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            KernelError::BadArgument => "bad argument",
            KernelError::ResourceExhausted => "resource exhausted",
            KernelError::FsStructural => "filesystem structural error",
            KernelError::ExecutionError => "execution error",
            KernelError::NotFound => "not found",
            KernelError::Unsupported => "unsupported",
        };
        f.write_str(msg)
    }
}

pub type KernelResult<T> = Result<T, KernelError>;

/// Collapses a [`KernelResult`] into the syscall ABI's `i32` convention:
/// `Ok(v)` becomes `v as i32`, any `Err` becomes `-1`.
pub fn to_abi(result: KernelResult<u32>) -> i32 {
    match result {
        Ok(value) => value as i32,
        Err(_) => -1,
    }
}
