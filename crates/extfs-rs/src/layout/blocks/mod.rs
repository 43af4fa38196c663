//! The three 64-byte block shapes: directory, file data and pointer blocks.

#[cfg(test)]
mod blocks_tests;

use crate::constants::{BLOCK_SIZE, DIR_ENTRIES, NAME_LEN, POINTERS_PER_BLOCK};
use crate::error::{FsError, FsResult};
use crate::layout::codec::{OnDisk, ensure_len, get_index, get_str, put_index, put_str};

/// First directory slot available to children; 0 is `.` and 1 is `..`.
pub const FIRST_CHILD_SLOT: usize = 2;

const ENTRY_SIZE: usize = NAME_LEN + 4;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderEntry {
    pub name: String,
    pub inode: Option<u32>,
}

impl FolderEntry {
    #[must_use]
    pub fn new(name: &str, inode: u32) -> Self {
        Self {
            name: name.to_owned(),
            inode: Some(inode),
        }
    }

    #[must_use]
    pub const fn is_free(&self) -> bool {
        self.inode.is_none()
    }
}

/// validate_name checks a directory entry name against the on-disk limits.
///
/// # Errors
/// Fails with [`FsError::InvalidName`] for empty, `.`/`..` or names containing `/` or NUL,
/// and with [`FsError::NameTooLong`] past [`NAME_LEN`] bytes.
pub fn validate_name(name: &str) -> FsResult<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\0']) {
        return Err(FsError::InvalidName(name.to_owned()));
    }
    if name.len() > NAME_LEN {
        return Err(FsError::NameTooLong {
            name: name.to_owned(),
            max: NAME_LEN,
        });
    }
    Ok(())
}

/// names_match compares directory entry names case-insensitively.
#[must_use]
pub fn names_match(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderBlock {
    pub entries: [FolderEntry; DIR_ENTRIES],
}

impl FolderBlock {
    /// `new` builds a block with `.` and `..` set and both child slots free.
    #[must_use]
    pub fn new(self_inode: u32, parent_inode: u32) -> Self {
        let mut entries: [FolderEntry; DIR_ENTRIES] = Default::default();
        entries[0] = FolderEntry::new(".", self_inode);
        entries[1] = FolderEntry::new("..", parent_inode);
        Self { entries }
    }

    #[must_use]
    pub fn parent(&self) -> Option<u32> {
        self.entries[1].inode
    }

    /// `free_slot` returns the first free child slot.
    #[must_use]
    pub fn free_slot(&self) -> Option<usize> {
        (FIRST_CHILD_SLOT..DIR_ENTRIES).find(|&i| self.entries[i].is_free())
    }

    /// `children` yields `(slot, name, inode)` for every used child slot.
    pub fn children(&self) -> impl Iterator<Item = (usize, &str, u32)> {
        self.entries
            .iter()
            .enumerate()
            .skip(FIRST_CHILD_SLOT)
            .filter_map(|(slot, e)| e.inode.map(|ino| (slot, e.name.as_str(), ino)))
    }

    /// `find` returns the slot and inode of the child named `name`.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<(usize, u32)> {
        self.children()
            .find(|(_, entry, _)| names_match(entry, name))
            .map(|(slot, _, ino)| (slot, ino))
    }
}

impl OnDisk for FolderBlock {
    const SIZE: usize = BLOCK_SIZE;

    fn from_bytes(buf: &[u8]) -> FsResult<Self> {
        ensure_len(buf, Self::SIZE, "directory block")?;
        let mut entries: [FolderEntry; DIR_ENTRIES] = Default::default();
        for (i, entry) in entries.iter_mut().enumerate() {
            let off = i * ENTRY_SIZE;
            let inode = get_index(buf, off + NAME_LEN);
            *entry = FolderEntry {
                name: if inode.is_some() {
                    get_str(buf, off, NAME_LEN)?
                } else {
                    String::new()
                },
                inode,
            };
        }
        Ok(Self { entries })
    }

    fn write_bytes(&self, buf: &mut [u8]) {
        for (i, entry) in self.entries.iter().enumerate() {
            let off = i * ENTRY_SIZE;
            let name = if entry.inode.is_some() {
                entry.name.as_str()
            } else {
                ""
            };
            put_str(buf, off, NAME_LEN, name);
            put_index(buf, off + NAME_LEN, entry.inode);
        }
    }
}

/// Raw file content block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataBlock(pub [u8; BLOCK_SIZE]);

impl DataBlock {
    /// `from_chunk` zero-pads a chunk of at most one block.
    #[must_use]
    pub fn from_chunk(chunk: &[u8]) -> Self {
        let mut data = [0u8; BLOCK_SIZE];
        let n = chunk.len().min(BLOCK_SIZE);
        data[..n].copy_from_slice(&chunk[..n]);
        Self(data)
    }
}

impl OnDisk for DataBlock {
    const SIZE: usize = BLOCK_SIZE;

    fn from_bytes(buf: &[u8]) -> FsResult<Self> {
        ensure_len(buf, Self::SIZE, "data block")?;
        Ok(Self::from_chunk(&buf[..BLOCK_SIZE]))
    }

    fn write_bytes(&self, buf: &mut [u8]) {
        buf[..BLOCK_SIZE].copy_from_slice(&self.0);
    }
}

/// Internal node of an indirection tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerBlock {
    pub ptrs: [Option<u32>; POINTERS_PER_BLOCK],
}

impl PointerBlock {
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            ptrs: [None; POINTERS_PER_BLOCK],
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ptrs.iter().all(Option::is_none)
    }

    #[must_use]
    pub fn first_free(&self) -> Option<usize> {
        self.ptrs.iter().position(Option::is_none)
    }
}

impl OnDisk for PointerBlock {
    const SIZE: usize = BLOCK_SIZE;

    fn from_bytes(buf: &[u8]) -> FsResult<Self> {
        ensure_len(buf, Self::SIZE, "pointer block")?;
        let mut ptrs = [None; POINTERS_PER_BLOCK];
        for (i, p) in ptrs.iter_mut().enumerate() {
            *p = get_index(buf, i * 4);
        }
        Ok(Self { ptrs })
    }

    fn write_bytes(&self, buf: &mut [u8]) {
        for (i, p) in self.ptrs.iter().enumerate() {
            put_index(buf, i * 4, *p);
        }
    }
}
