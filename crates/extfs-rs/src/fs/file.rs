//! File content engine: create, read, edit and resize regular files.

use tracing::debug;

use super::{FileSystem, join_path, split_path, unix_now};
use crate::constants::BLOCK_SIZE;
use crate::error::{FsError, FsResult};
use crate::layout::blocks::{DataBlock, validate_name};
use crate::layout::inode::{Inode, InodeKind, Permissions};
use crate::layout::journal::JournalOp;

/// `generate_content` returns `size` bytes of the repeating digits `0123456789`.
#[must_use]
pub fn generate_content(size: usize) -> String {
    "0123456789".chars().cycle().take(size).collect()
}

impl FileSystem {
    /// `create_file` creates `name` under `parents` holding `content`, one block per
    /// `BLOCK_SIZE` chunk. Returns the new inode.
    ///
    /// # Errors
    /// Fails if the parent is missing (and `make_parents` is off), the name is taken, or
    /// space runs out.
    pub fn create_file(
        &mut self,
        parents: &[&str],
        name: &str,
        content: &[u8],
        make_parents: bool,
    ) -> FsResult<u32> {
        validate_name(name)?;
        let path = join_path(parents, name);
        let parent = self.parent_for_create(parents, make_parents)?;
        let dir = self.load_inode(parent)?;
        if self.find_entry(&dir, name)?.is_some() {
            return Err(FsError::AlreadyExists(path));
        }

        self.log(JournalOp::MkFile, &path, &String::from_utf8_lossy(content))?;
        self.make_file(parent, name, content, Permissions::DEFAULT)
    }

    pub(crate) fn make_file(
        &mut self,
        parent: u32,
        name: &str,
        content: &[u8],
        perm: Permissions,
    ) -> FsResult<u32> {
        let size = u32::try_from(content.len()).map_err(|_| FsError::IndirectionFull)?;
        let index = self.alloc_inode()?;
        let mut inode = Inode::new(
            InodeKind::File,
            perm,
            self.owner.uid,
            self.owner.gid,
            unix_now(),
        );
        for chunk in content.chunks(BLOCK_SIZE) {
            let block = self.add_block(&mut inode)?;
            self.write_block(block, &DataBlock::from_chunk(chunk))?;
        }
        inode.size = size;
        self.store_inode(index, &inode)?;

        self.insert_entry(parent, name, index)?;
        debug!(parent, inode = index, name, size, "created file");
        Ok(index)
    }

    /// `file_at` resolves `path` and checks it is a regular file.
    pub(crate) fn file_at(&self, path: &str) -> FsResult<(u32, Inode)> {
        let index = self.lookup(path)?;
        let inode = self.load_inode(index)?;
        if !inode.is_file() {
            return Err(FsError::NotAFile(path.to_owned()));
        }
        Ok((index, inode))
    }

    /// `read_file` returns the content of the file at `path`.
    ///
    /// # Errors
    /// Fails if the path is missing or names a directory.
    pub fn read_file(&self, path: &str) -> FsResult<Vec<u8>> {
        let (_, inode) = self.file_at(path)?;
        self.read_data(&inode)
    }

    /// `edit_file` replaces the content of the file at `path`.
    ///
    /// # Errors
    /// Fails if the path is missing, names a directory, or space runs out.
    pub fn edit_file(&mut self, path: &str, content: &[u8]) -> FsResult<()> {
        let (index, mut inode) = self.file_at(path)?;
        self.log(JournalOp::Edit, &canonical(path), &String::from_utf8_lossy(content))?;
        self.write_data(&mut inode, content)?;
        self.store_inode(index, &inode)
    }

    /// `truncate_file` resizes the file at `path` to `size` bytes, adding zeroed blocks or
    /// releasing trailing ones.
    ///
    /// # Errors
    /// Fails if the path is missing, names a directory, or space runs out.
    pub fn truncate_file(&mut self, path: &str, size: u32) -> FsResult<()> {
        let (index, mut inode) = self.file_at(path)?;
        self.log(JournalOp::Truncate, &canonical(path), &size.to_string())?;

        let needed = (size as usize).div_ceil(BLOCK_SIZE);
        let current = self.resolve_all_block_indices(&inode)?.len();
        if needed > current {
            for _ in current..needed {
                self.add_block(&mut inode)?;
            }
        } else if needed < current {
            self.shrink_blocks(&mut inode, needed)?;
        }

        // Bytes past the new end of the last block must read back as zero after a regrow.
        let tail = size as usize % BLOCK_SIZE;
        if tail != 0 && size < inode.size {
            let blocks = self.resolve_all_block_indices(&inode)?;
            if let Some(&last) = blocks.last() {
                let DataBlock(mut raw) = self.read_block(last)?;
                raw[tail..].fill(0);
                self.write_block(last, &DataBlock(raw))?;
            }
        }

        inode.size = size;
        inode.mtime = unix_now();
        self.store_inode(index, &inode)
    }
}

/// `canonical` normalizes a user path to the `/a/b` form stored in the journal.
fn canonical(path: &str) -> String {
    let (parents, name) = split_path(path);
    join_path(&parents, name)
}
