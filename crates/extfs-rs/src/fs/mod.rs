//! Filesystem engine: format, mount and every operation over a formatted partition.
//!
//! Every call reads and writes the partition directly. Allocation helpers persist the
//! superblock right after flipping a bitmap bit so counts never lag the bitmaps on disk.

mod alloc;
mod data;
mod dir;
mod file;
mod find;
mod journal;
mod pointers;
mod recovery;
mod remove;

#[cfg(test)]
mod data_tests;
#[cfg(test)]
mod pointers_tests;
#[cfg(test)]
pub(crate) mod test_support;

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::info;

use crate::constants::{BLOCK_SIZE, DEFAULT_USERS, ROOT_INODE, USERS_FILE};
use crate::error::{FsError, FsResult};
use crate::layout::blocks::FolderBlock;
use crate::layout::codec::OnDisk;
use crate::layout::inode::{Inode, InodeKind, Permissions};
use crate::layout::journal::JournalOp;
use crate::layout::superblock::{FsKind, Superblock};
use crate::retention::partition::Partition;

pub use dir::{DirEntry, TreeNode};
pub use file::generate_content;
pub use recovery::RecoveryReport;

/// Owner stamped on inodes created through this handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Owner {
    pub uid: u32,
    pub gid: u32,
}

impl Owner {
    pub const ROOT: Self = Self { uid: 1, gid: 1 };
}

impl Default for Owner {
    fn default() -> Self {
        Self::ROOT
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatOptions {
    pub kind: FsKind,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self { kind: FsKind::Ext2 }
    }
}

/// Allocation summary, including the bitmap population for consistency checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub kind: FsKind,
    pub total_inodes: u32,
    pub used_inodes: u32,
    pub free_inodes: u32,
    pub total_blocks: u32,
    pub used_blocks: u32,
    pub free_blocks: u32,
    pub inode_bits_set: u32,
    pub block_bits_set: u32,
}

pub struct FileSystem {
    part: Partition,
    sb: Superblock,
    owner: Owner,
    replaying: bool,
}

impl FileSystem {
    /// `format` lays out a fresh filesystem over the whole partition, creating the root
    /// directory and the users file (and the journal for [`FsKind::Ext3`]).
    ///
    /// # Errors
    /// Fails if the partition is too small or cannot be written.
    pub fn format(part: Partition, options: FormatOptions) -> FsResult<Self> {
        let sb = Superblock::layout(part.size(), options.kind, unix_now())?;
        let mut fs = Self {
            part,
            sb,
            owner: Owner::ROOT,
            replaying: false,
        };

        fs.sb.inode_bitmap().create(&mut fs.part)?;
        fs.sb.block_bitmap().create(&mut fs.part)?;
        if fs.sb.is_journaled() {
            fs.init_journal()?;
        }
        fs.save_superblock()?;

        fs.create_root()?;
        fs.log(JournalOp::MkDir, "/", "")?;
        fs.log(JournalOp::MkFile, &join_path(&[], USERS_FILE), DEFAULT_USERS)?;
        fs.make_file(ROOT_INODE, USERS_FILE, DEFAULT_USERS.as_bytes(), Permissions::ALL_OPEN)?;

        info!(
            kind = %fs.sb.kind,
            inodes = fs.sb.total_inodes(),
            blocks = fs.sb.total_blocks(),
            "formatted partition"
        );
        Ok(fs)
    }

    /// `mount` opens an already formatted partition and records the mount.
    ///
    /// # Errors
    /// Fails with [`FsError::NotFormatted`] if the superblock magic is missing.
    pub fn mount(part: Partition) -> FsResult<Self> {
        let mut fs = Self::open(part)?;
        fs.sb.mnt_count += 1;
        fs.sb.mtime = unix_now();
        fs.save_superblock()?;
        info!(kind = %fs.sb.kind, mounts = fs.sb.mnt_count, "mounted partition");
        Ok(fs)
    }

    /// `open` validates the superblock of a formatted partition without recording a mount.
    ///
    /// # Errors
    /// Fails with [`FsError::NotFormatted`] if the superblock magic is missing, or when the
    /// layout does not fit the partition.
    pub fn open(part: Partition) -> FsResult<Self> {
        let sb: Superblock = part.read_struct(0)?;
        if sb.region_end() > part.size() {
            return Err(FsError::Corrupt(format!(
                "layout ends at {} past partition size {}",
                sb.region_end(),
                part.size()
            )));
        }
        Ok(Self {
            part,
            sb,
            owner: Owner::ROOT,
            replaying: false,
        })
    }

    #[must_use]
    pub const fn superblock(&self) -> &Superblock {
        &self.sb
    }

    #[must_use]
    pub const fn kind(&self) -> FsKind {
        self.sb.kind
    }

    #[must_use]
    pub const fn partition(&self) -> &Partition {
        &self.part
    }

    #[must_use]
    pub fn into_partition(self) -> Partition {
        self.part
    }

    #[must_use]
    pub const fn owner(&self) -> Owner {
        self.owner
    }

    pub const fn set_owner(&mut self, owner: Owner) {
        self.owner = owner;
    }

    /// # Errors
    /// Fails if `index` is past the inode table or the record does not decode.
    pub fn load_inode(&self, index: u32) -> FsResult<Inode> {
        self.check_inode_index(index)?;
        self.part.read_struct(self.sb.inode_offset(index))
    }

    /// # Errors
    /// Fails if `index` is past the inode table or the write fails.
    pub fn store_inode(&mut self, index: u32, inode: &Inode) -> FsResult<()> {
        self.check_inode_index(index)?;
        self.part.write_struct(self.sb.inode_offset(index), inode)
    }

    pub(crate) fn read_block<T: OnDisk>(&self, index: u32) -> FsResult<T> {
        self.check_block_index(index)?;
        self.part.read_struct(self.sb.block_offset(index))
    }

    pub(crate) fn write_block<T: OnDisk>(&mut self, index: u32, value: &T) -> FsResult<()> {
        self.check_block_index(index)?;
        self.part.write_struct(self.sb.block_offset(index), value)
    }

    pub(crate) fn save_superblock(&mut self) -> FsResult<()> {
        self.part.write_struct(0, &self.sb)
    }

    /// `sync` pushes every dirty page of the image to disk.
    ///
    /// # Errors
    /// Returns an I/O error if the flush fails.
    pub fn sync(&self) -> FsResult<()> {
        self.part.disk().sync()
    }

    /// # Errors
    /// Fails if a bitmap cannot be read.
    pub fn usage(&self) -> FsResult<Usage> {
        Ok(Usage {
            kind: self.sb.kind,
            total_inodes: self.sb.total_inodes(),
            used_inodes: self.sb.inodes_count,
            free_inodes: self.sb.free_inodes_count,
            total_blocks: self.sb.total_blocks(),
            used_blocks: self.sb.blocks_count,
            free_blocks: self.sb.free_blocks_count,
            inode_bits_set: self.sb.inode_bitmap().count_set(&self.part)?,
            block_bits_set: self.sb.block_bitmap().count_set(&self.part)?,
        })
    }

    /// `stat` returns the inode index and record behind `path`.
    ///
    /// # Errors
    /// Fails if the path does not resolve.
    pub fn stat(&self, path: &str) -> FsResult<(u32, Inode)> {
        let index = self.lookup(path)?;
        Ok((index, self.load_inode(index)?))
    }

    /// `create_root` allocates inode 0 and block 0 as an empty root directory.
    fn create_root(&mut self) -> FsResult<()> {
        let index = self.alloc_inode()?;
        let block = self.alloc_block()?;
        if index != ROOT_INODE {
            return Err(FsError::Corrupt(format!("root allocated at inode {index}")));
        }

        let mut root = Inode::new(
            InodeKind::Directory,
            Permissions::ALL_OPEN,
            Owner::ROOT.uid,
            Owner::ROOT.gid,
            unix_now(),
        );
        root.block[0] = Some(block);
        root.size = BLOCK_SIZE as u32;
        self.write_block(block, &FolderBlock::new(ROOT_INODE, ROOT_INODE))?;
        self.store_inode(ROOT_INODE, &root)
    }

    fn check_inode_index(&self, index: u32) -> FsResult<()> {
        if index >= self.sb.total_inodes() {
            return Err(FsError::InvalidIndex {
                region: "inode",
                index,
            });
        }
        Ok(())
    }

    fn check_block_index(&self, index: u32) -> FsResult<()> {
        if index >= self.sb.total_blocks() {
            return Err(FsError::InvalidIndex {
                region: "block",
                index,
            });
        }
        Ok(())
    }
}

/// `split_path` turns `/a/b/name` into (`["a", "b"]`, `"name"`). Empty segments are ignored,
/// so `/` yields an empty name.
#[must_use]
pub fn split_path(path: &str) -> (Vec<&str>, &str) {
    let mut segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let name = segments.pop().unwrap_or("");
    (segments, name)
}

/// `join_path` renders parent segments and a leaf name as an absolute path.
#[must_use]
pub fn join_path(parents: &[&str], name: &str) -> String {
    let mut out = String::new();
    for seg in parents.iter().copied().chain(std::iter::once(name)) {
        if seg.is_empty() {
            continue;
        }
        out.push('/');
        out.push_str(seg);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}
