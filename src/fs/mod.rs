//! Read-only filesystem reader.
//!
//! The image is a fixed on-disk-style blob mapped read-only in kernel
//! memory at boot: boot block, inode array, data-block array. Raw records
//! are modeled as strongly-typed values with explicit decode functions
//! rather than being read as C-style structs in place.

use crate::config::{DATA_BLOCK_SIZE, MAX_DENTRIES, MAX_FILENAME_LEN};
use crate::error::{KernelError, KernelResult};
use crate::sync::OnceCell;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum FileType {
    Rtc,
    Directory,
    Regular,
}

impl FileType {
    fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(FileType::Rtc),
            1 => Some(FileType::Directory),
            2 => Some(FileType::Regular),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct DirEntry {
    pub name: [u8; MAX_FILENAME_LEN],
    pub name_len: usize,
    pub file_type: FileType,
    pub inode: u32,
}

impl DirEntry {
    pub fn name(&self) -> &[u8] {
        &self.name[..self.name_len]
    }
}

struct FsImage {
    base: *const u8,
    dir_count: u32,
    inode_count: u32,
    data_count: u32,
}

// SAFETY: the image is read-only for the kernel's entire lifetime after
// `init`; concurrent readers never race with a writer because there is no
// writer.
unsafe impl Send for FsImage {}
unsafe impl Sync for FsImage {}

static IMAGE: OnceCell<FsImage> = OnceCell::new();

const BOOT_BLOCK_SIZE: usize = 4096;
// name(32) + type(4) + inode(4), padded to 64 with reserved bytes.
const DENTRY_RAW_SIZE: usize = 64;
const BOOT_BLOCK_RESERVED: usize = 52;
const INODE_SIZE: usize = 4096;

/// Captures base pointers and counts from the boot block at `base`.
///
/// # Safety
/// `base` must point at a valid, fully-populated filesystem image of at
/// least `BOOT_BLOCK_SIZE` bytes that outlives the kernel.
pub unsafe fn init(base: *const u8) -> KernelResult<()> {
    if base.is_null() {
        return Err(KernelError::BadArgument);
    }
    // SAFETY: caller guarantees `base` points at a valid boot block;
    // reading the three leading u32 counts is in-bounds.
    let (dir_count, inode_count, data_count) = unsafe {
        (
            read_u32(base, 0),
            read_u32(base, 4),
            read_u32(base, 8),
        )
    };
    IMAGE.init(FsImage {
        base,
        dir_count,
        inode_count,
        data_count,
    });
    log::info!(
        "fs: {dir_count} dentries, {inode_count} inodes, {data_count} data blocks"
    );
    Ok(())
}

fn image() -> &'static FsImage {
    IMAGE.get()
}

/// # Safety
/// `base` must have at least `offset + 4` readable bytes.
unsafe fn read_u32(base: *const u8, offset: usize) -> u32 {
    // SAFETY: delegated to caller.
    unsafe {
        let ptr = base.add(offset) as *const u32;
        core::ptr::read_unaligned(ptr)
    }
}

fn dentry_offset(index: u32) -> usize {
    BOOT_BLOCK_RESERVED + 12 + (index as usize) * DENTRY_RAW_SIZE
}

fn decode_dentry(raw: &[u8]) -> DirEntry {
    let mut name = [0u8; MAX_FILENAME_LEN];
    name.copy_from_slice(&raw[0..MAX_FILENAME_LEN]);
    // A name need not be NUL-terminated within its 32-byte slot; clamp to
    // the first NUL, or the full 32 bytes if none is present, so every
    // comparison has a well-defined length instead of scanning past the
    // fixed-size field.
    let name_len = name.iter().position(|&b| b == 0).unwrap_or(MAX_FILENAME_LEN);
    let file_type_raw = u32::from_le_bytes(
        raw[MAX_FILENAME_LEN..MAX_FILENAME_LEN + 4]
            .try_into()
            .unwrap(),
    );
    let inode = u32::from_le_bytes(
        raw[MAX_FILENAME_LEN + 4..MAX_FILENAME_LEN + 8]
            .try_into()
            .unwrap(),
    );
    DirEntry {
        name,
        name_len,
        file_type: FileType::from_raw(file_type_raw).unwrap_or(FileType::Regular),
        inode,
    }
}

/// Bounds-checks `index` against `dir_count` and decodes the dentry at that
/// slot.
pub fn read_dentry_by_index(index: u32) -> KernelResult<DirEntry> {
    let img = image();
    if index >= img.dir_count || index as usize >= MAX_DENTRIES {
        return Err(KernelError::FsStructural);
    }
    let offset = dentry_offset(index);
    // SAFETY: `offset..offset+64` lies within the boot block, which `init`
    // guaranteed is at least `BOOT_BLOCK_SIZE` bytes.
    let raw = unsafe { core::slice::from_raw_parts(img.base.add(offset), DENTRY_RAW_SIZE) };
    Ok(decode_dentry(raw))
}

/// Linear scan comparing up to [`MAX_FILENAME_LEN`] bytes.
pub fn read_dentry_by_name(name: &[u8]) -> KernelResult<DirEntry> {
    if name.is_empty() || name.len() > MAX_FILENAME_LEN {
        return Err(KernelError::BadArgument);
    }
    let img = image();
    for index in 0..img.dir_count {
        let dentry = read_dentry_by_index(index)?;
        if dentry.name() == name {
            return Ok(dentry);
        }
    }
    Err(KernelError::FsStructural)
}

fn inode_base(inode: u32) -> *const u8 {
    let img = image();
    let offset = BOOT_BLOCK_SIZE + (inode as usize) * INODE_SIZE;
    // SAFETY: bounds-checked by callers against `img.inode_count` before
    // this is called.
    unsafe { img.base.add(offset) }
}

fn data_block_base(block_index: u32) -> *const u8 {
    let img = image();
    let offset =
        BOOT_BLOCK_SIZE + (img.inode_count as usize) * INODE_SIZE + (block_index as usize) * DATA_BLOCK_SIZE;
    // SAFETY: bounds-checked by callers against `img.data_count` before
    // this is called.
    unsafe { img.base.add(offset) }
}

/// Walks `inode`'s data-block list starting at `offset`, copying up to
/// `buf.len()` bytes (clipped further by the inode's own length) into
/// `buf`. Returns the number of bytes copied, `0` at EOF, or an error if
/// the inode or any referenced data-block index is out of range.
pub fn read_data(inode: u32, offset: u32, buf: &mut [u8]) -> KernelResult<u32> {
    let img = image();
    if inode >= img.inode_count {
        return Err(KernelError::FsStructural);
    }

    let inode_ptr = inode_base(inode);
    // SAFETY: `inode_ptr` was validated to lie within the image above.
    let file_size = unsafe { read_u32(inode_ptr, 0) };

    if offset >= file_size {
        return Ok(0);
    }

    let mut length = buf.len() as u32;
    if file_size - offset < length {
        length = file_size - offset;
    }

    let mut bytes_read = 0u32;
    let mut pos = offset;
    while bytes_read < length {
        let block_slot = (pos as usize) / DATA_BLOCK_SIZE;
        // SAFETY: `inode_ptr + 4 + block_slot*4` lies within the 4 KiB
        // inode record as long as `block_slot < MAX_DATA_BLOCKS_PER_INODE`,
        // which a file of at most `file_size` bytes guarantees.
        let block_index = unsafe { read_u32(inode_ptr, 4 + block_slot * 4) };
        if block_index >= img.data_count {
            return Err(KernelError::FsStructural);
        }

        let block_offset = (pos as usize) % DATA_BLOCK_SIZE;
        let mut chunk = (DATA_BLOCK_SIZE - block_offset) as u32;
        if file_size - pos < chunk {
            chunk = file_size - pos;
        }
        if length - bytes_read < chunk {
            chunk = length - bytes_read;
        }

        let block_ptr = data_block_base(block_index);
        // SAFETY: `block_ptr + block_offset .. +chunk` lies within the 4
        // KiB data block since `block_offset + chunk <= DATA_BLOCK_SIZE`.
        let src = unsafe {
            core::slice::from_raw_parts(block_ptr.add(block_offset), chunk as usize)
        };
        let dst_start = bytes_read as usize;
        buf[dst_start..dst_start + chunk as usize].copy_from_slice(src);

        bytes_read += chunk;
        pos += chunk;
    }

    Ok(bytes_read)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_fixture() -> [u8; BOOT_BLOCK_SIZE + INODE_SIZE + 2 * DATA_BLOCK_SIZE] {
        let mut image = [0u8; BOOT_BLOCK_SIZE + INODE_SIZE + 2 * DATA_BLOCK_SIZE];
        image[0..4].copy_from_slice(&1u32.to_le_bytes()); // dir_count
        image[4..8].copy_from_slice(&1u32.to_le_bytes()); // inode_count
        image[8..12].copy_from_slice(&2u32.to_le_bytes()); // data_count

        let dentry_off = dentry_offset(0);
        image[dentry_off..dentry_off + 4].copy_from_slice(b"hi\0\0");
        image[dentry_off + MAX_FILENAME_LEN..dentry_off + MAX_FILENAME_LEN + 4]
            .copy_from_slice(&2u32.to_le_bytes()); // regular file
        image[dentry_off + MAX_FILENAME_LEN + 4..dentry_off + MAX_FILENAME_LEN + 8]
            .copy_from_slice(&0u32.to_le_bytes()); // inode 0

        let inode_off = BOOT_BLOCK_SIZE;
        image[inode_off..inode_off + 4].copy_from_slice(&5u32.to_le_bytes()); // 5-byte file
        image[inode_off + 4..inode_off + 8].copy_from_slice(&0u32.to_le_bytes()); // block 0

        let data_off = BOOT_BLOCK_SIZE + INODE_SIZE;
        image[data_off..data_off + 5].copy_from_slice(b"hello");

        image
    }

    fn with_fixture<F: FnOnce()>(f: F) {
        let image = build_fixture();
        // SAFETY: `image` outlives this call; tests are single-threaded.
        unsafe {
            init(image.as_ptr()).unwrap();
        }
        f();
        core::mem::forget(image);
    }

    #[test]
    fn dentry_round_trip_by_index_and_name() {
        with_fixture(|| {
            let d = read_dentry_by_index(0).unwrap();
            assert_eq!(d.name(), b"hi");
            let d2 = read_dentry_by_name(b"hi").unwrap();
            assert_eq!(d, d2);
        });
    }

    #[test]
    fn read_data_clips_at_file_length() {
        with_fixture(|| {
            let mut buf = [0u8; 16];
            let n = read_data(0, 0, &mut buf).unwrap();
            assert_eq!(n, 5);
            assert_eq!(&buf[..5], b"hello");
            let n2 = read_data(0, 5, &mut buf).unwrap();
            assert_eq!(n2, 0);
        });
    }

    #[test]
    fn read_dentry_by_name_missing_file_errors() {
        with_fixture(|| {
            assert!(read_dentry_by_name(b"nope").is_err());
        });
    }
}
