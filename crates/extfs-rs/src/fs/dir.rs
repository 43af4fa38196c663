//! Directory engine: entry lookup, path resolution, creation and listing.

use tracing::debug;

use super::{FileSystem, join_path, split_path, unix_now};
use crate::constants::{BLOCK_SIZE, ROOT_INODE};
use crate::error::{FsError, FsResult};
use crate::layout::blocks::{FolderBlock, FolderEntry, validate_name};
use crate::layout::inode::{Inode, InodeKind, Permissions};
use crate::layout::journal::JournalOp;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub inode: u32,
    pub kind: InodeKind,
}

/// Recursive snapshot of a directory subtree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    pub name: String,
    pub inode: u32,
    pub kind: InodeKind,
    pub size: u32,
    pub children: Vec<TreeNode>,
}

/// Where a child entry lives: directory block, slot within it, and the child inode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EntryLocation {
    pub block: u32,
    pub slot: usize,
    pub inode: u32,
}

pub(crate) fn dir_path(parents: &[&str]) -> String {
    join_path(parents, "")
}

impl FileSystem {
    /// `find_entry` scans every directory block of `dir` for a child named `name`.
    pub(crate) fn find_entry(&self, dir: &Inode, name: &str) -> FsResult<Option<EntryLocation>> {
        for block in self.resolve_all_block_indices(dir)? {
            let fb: FolderBlock = self.read_block(block)?;
            if let Some((slot, inode)) = fb.find(name) {
                return Ok(Some(EntryLocation { block, slot, inode }));
            }
        }
        Ok(None)
    }

    /// `dir_children` lists `(name, inode)` for every child of `dir`, in block order.
    pub(crate) fn dir_children(&self, dir: &Inode) -> FsResult<Vec<(String, u32)>> {
        let mut out = Vec::new();
        for block in self.resolve_all_block_indices(dir)? {
            let fb: FolderBlock = self.read_block(block)?;
            out.extend(fb.children().map(|(_, name, ino)| (name.to_owned(), ino)));
        }
        Ok(out)
    }

    /// `resolve_dir` walks `segments` from the root and returns the directory inode.
    ///
    /// # Errors
    /// Fails with [`FsError::NotFound`] when a segment is missing and
    /// [`FsError::NotADirectory`] when a segment names a file.
    pub fn resolve_dir(&self, segments: &[&str]) -> FsResult<u32> {
        let mut current = ROOT_INODE;
        for (depth, segment) in segments.iter().enumerate() {
            let dir = self.load_inode(current)?;
            let here = dir_path(&segments[..=depth]);
            let loc = self
                .find_entry(&dir, segment)?
                .ok_or_else(|| FsError::NotFound(here.clone()))?;
            if !self.load_inode(loc.inode)?.is_dir() {
                return Err(FsError::NotADirectory(here));
            }
            current = loc.inode;
        }
        Ok(current)
    }

    /// `lookup` resolves an absolute path to an inode of any kind. `/` is the root.
    ///
    /// # Errors
    /// Fails with [`FsError::NotFound`] if any component is missing.
    pub fn lookup(&self, path: &str) -> FsResult<u32> {
        let (parents, name) = split_path(path);
        if name.is_empty() {
            return Ok(ROOT_INODE);
        }
        let parent = self.resolve_dir(&parents)?;
        let dir = self.load_inode(parent)?;
        self.find_entry(&dir, name)?
            .map(|loc| loc.inode)
            .ok_or_else(|| FsError::NotFound(join_path(&parents, name)))
    }

    /// `parent_for_create` resolves the parent of a new entry, creating missing parents
    /// when `make_parents` is set.
    pub(crate) fn parent_for_create(&mut self, parents: &[&str], make_parents: bool) -> FsResult<u32> {
        match self.resolve_dir(parents) {
            Ok(index) => Ok(index),
            Err(FsError::NotFound(_)) if make_parents => self.make_parents(parents),
            Err(FsError::NotFound(_)) => Err(FsError::ParentNotFound(dir_path(parents))),
            Err(err) => Err(err),
        }
    }

    fn make_parents(&mut self, parents: &[&str]) -> FsResult<u32> {
        let mut current = ROOT_INODE;
        for (depth, segment) in parents.iter().enumerate() {
            validate_name(segment)?;
            let dir = self.load_inode(current)?;
            current = match self.find_entry(&dir, segment)? {
                Some(loc) => {
                    if !self.load_inode(loc.inode)?.is_dir() {
                        return Err(FsError::NotADirectory(dir_path(&parents[..=depth])));
                    }
                    loc.inode
                }
                None => {
                    self.log(JournalOp::MkDir, &dir_path(&parents[..=depth]), "")?;
                    self.make_directory(current, segment)?
                }
            };
        }
        Ok(current)
    }

    /// `create_directory` creates `name` under the directory at `parents` and returns its
    /// inode. An existing directory of that name is returned unchanged.
    ///
    /// # Errors
    /// Fails with [`FsError::ParentNotFound`] when the parent is missing and `make_parents`
    /// is off, [`FsError::AlreadyExists`] when a file holds the name, or a capacity error.
    pub fn create_directory(
        &mut self,
        parents: &[&str],
        name: &str,
        make_parents: bool,
    ) -> FsResult<u32> {
        validate_name(name)?;
        let parent = self.parent_for_create(parents, make_parents)?;
        let dir = self.load_inode(parent)?;
        if let Some(loc) = self.find_entry(&dir, name)? {
            if self.load_inode(loc.inode)?.is_dir() {
                return Ok(loc.inode);
            }
            return Err(FsError::AlreadyExists(join_path(parents, name)));
        }

        self.log(JournalOp::MkDir, &join_path(parents, name), "")?;
        self.make_directory(parent, name)
    }

    /// `make_directory` allocates the inode and first block of a new directory and links
    /// it into `parent`.
    fn make_directory(&mut self, parent: u32, name: &str) -> FsResult<u32> {
        let index = self.alloc_inode()?;
        let block = self.alloc_block()?;

        let mut inode = Inode::new(
            InodeKind::Directory,
            Permissions::DEFAULT,
            self.owner.uid,
            self.owner.gid,
            unix_now(),
        );
        inode.block[0] = Some(block);
        inode.size = BLOCK_SIZE as u32;
        self.write_block(block, &FolderBlock::new(index, parent))?;
        self.store_inode(index, &inode)?;

        self.insert_entry(parent, name, index)?;
        debug!(parent, inode = index, name, "created directory");
        Ok(index)
    }

    /// `insert_entry` writes `name -> child` into the first free slot of `dir_index`,
    /// growing the directory by one block when every slot is taken.
    pub(crate) fn insert_entry(&mut self, dir_index: u32, name: &str, child: u32) -> FsResult<()> {
        let mut dir = self.load_inode(dir_index)?;
        let blocks = self.resolve_all_block_indices(&dir)?;
        for &block in &blocks {
            let mut fb: FolderBlock = self.read_block(block)?;
            if let Some(slot) = fb.free_slot() {
                fb.entries[slot] = FolderEntry::new(name, child);
                self.write_block(block, &fb)?;
                dir.mtime = unix_now();
                return self.store_inode(dir_index, &dir);
            }
        }

        let grandparent = match blocks.first() {
            Some(&first) => self.read_block::<FolderBlock>(first)?.parent(),
            None => None,
        }
        .unwrap_or(dir_index);

        let block = self.add_block(&mut dir)?;
        let mut fb = FolderBlock::new(dir_index, grandparent);
        fb.entries[2] = FolderEntry::new(name, child);
        self.write_block(block, &fb)?;
        dir.size += BLOCK_SIZE as u32;
        dir.mtime = unix_now();
        debug!(dir = dir_index, block, "grew directory");
        self.store_inode(dir_index, &dir)
    }

    /// `clear_entry` zeroes the name and unsets the inode of a child slot.
    pub(crate) fn clear_entry(&mut self, loc: EntryLocation) -> FsResult<()> {
        let mut fb: FolderBlock = self.read_block(loc.block)?;
        fb.entries[loc.slot] = FolderEntry::default();
        self.write_block(loc.block, &fb)
    }

    /// `list_directory` returns the children of the directory at `path`.
    ///
    /// # Errors
    /// Fails if the path is missing or not a directory.
    pub fn list_directory(&self, path: &str) -> FsResult<Vec<DirEntry>> {
        let index = self.lookup(path)?;
        let dir = self.load_inode(index)?;
        if !dir.is_dir() {
            return Err(FsError::NotADirectory(path.to_owned()));
        }
        self.dir_children(&dir)?
            .into_iter()
            .map(|(name, inode)| {
                Ok(DirEntry {
                    name,
                    inode,
                    kind: self.load_inode(inode)?.kind,
                })
            })
            .collect()
    }

    /// `tree` snapshots the whole directory hierarchy starting at the root.
    ///
    /// # Errors
    /// Fails if any reachable inode or block cannot be read.
    pub fn tree(&self) -> FsResult<TreeNode> {
        self.subtree("/".to_owned(), ROOT_INODE)
    }

    fn subtree(&self, name: String, index: u32) -> FsResult<TreeNode> {
        let inode = self.load_inode(index)?;
        let children = if inode.is_dir() {
            self.dir_children(&inode)?
                .into_iter()
                .map(|(child, ino)| self.subtree(child, ino))
                .collect::<FsResult<Vec<_>>>()?
        } else {
            Vec::new()
        };
        Ok(TreeNode {
            name,
            inode: index,
            kind: inode.kind,
            size: inode.size,
            children,
        })
    }
}
