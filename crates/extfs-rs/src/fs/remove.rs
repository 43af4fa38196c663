use tracing::debug;

use super::{FileSystem, join_path, split_path};
use super::dir::EntryLocation;
use crate::error::{FsError, FsResult};
use crate::layout::blocks::{FolderBlock, validate_name};
use crate::layout::journal::JournalOp;

impl FileSystem {
    /// `delete_file` removes the regular file `name` under `parents`, journaling its path
    /// and content before any block is released.
    ///
    /// # Errors
    /// Fails if the entry is missing or is a directory.
    pub fn delete_file(&mut self, parents: &[&str], name: &str) -> FsResult<()> {
        let path = join_path(parents, name);
        let (parent, loc) = self.locate(parents, name)?;
        let inode = self.load_inode(loc.inode)?;
        if !inode.is_file() {
            return Err(FsError::NotAFile(path));
        }

        self.release_file(loc.inode, &path)?;
        self.unlink(parent, loc)
    }

    /// `delete_directory` removes the directory `name` under `parents` together with
    /// everything below it. Children are journaled and released before their parent.
    ///
    /// # Errors
    /// Fails if the entry is missing or is a file.
    pub fn delete_directory(&mut self, parents: &[&str], name: &str) -> FsResult<()> {
        let path = join_path(parents, name);
        let (parent, loc) = self.locate(parents, name)?;
        if !self.load_inode(loc.inode)?.is_dir() {
            return Err(FsError::NotADirectory(path));
        }

        self.release_tree(loc.inode, &path)?;
        self.unlink(parent, loc)
    }

    /// `remove` deletes whatever lives at `path`, recursing into directories.
    ///
    /// # Errors
    /// Fails if the path is missing or is the root.
    pub fn remove(&mut self, path: &str) -> FsResult<()> {
        let (parents, name) = split_path(path);
        if name.is_empty() {
            return Err(FsError::InvalidName(path.to_owned()));
        }
        let index = self.lookup(path)?;
        if self.load_inode(index)?.is_dir() {
            self.delete_directory(&parents, name)
        } else {
            self.delete_file(&parents, name)
        }
    }

    /// `rename_entry` renames the child `old_name` of the directory at `parents`.
    ///
    /// # Errors
    /// Fails if `new_name` is invalid or already used by a sibling, or `old_name` is
    /// missing.
    pub fn rename_entry(&mut self, parents: &[&str], old_name: &str, new_name: &str) -> FsResult<()> {
        validate_name(new_name)?;
        let parent = self.resolve_dir(parents)?;
        let dir = self.load_inode(parent)?;
        let loc = self
            .find_entry(&dir, old_name)?
            .ok_or_else(|| FsError::NotFound(join_path(parents, old_name)))?;
        // A case-only rename matches its own entry.
        if self.find_entry(&dir, new_name)?.is_some_and(|other| other != loc) {
            return Err(FsError::AlreadyExists(join_path(parents, new_name)));
        }

        self.log(JournalOp::Rename, &join_path(parents, old_name), new_name)?;
        let mut fb: FolderBlock = self.read_block(loc.block)?;
        fb.entries[loc.slot].name = new_name.to_owned();
        self.write_block(loc.block, &fb)?;
        debug!(parent, old_name, new_name, "renamed entry");
        Ok(())
    }

    fn locate(&self, parents: &[&str], name: &str) -> FsResult<(u32, EntryLocation)> {
        if name.is_empty() {
            return Err(FsError::InvalidName(name.to_owned()));
        }
        let parent = self.resolve_dir(parents)?;
        let dir = self.load_inode(parent)?;
        let loc = self
            .find_entry(&dir, name)?
            .ok_or_else(|| FsError::NotFound(join_path(parents, name)))?;
        Ok((parent, loc))
    }

    /// `release_file` journals a file's content, then frees its blocks and inode.
    fn release_file(&mut self, index: u32, path: &str) -> FsResult<()> {
        let mut inode = self.load_inode(index)?;
        if self.sb.is_journaled() && !self.replaying {
            let content = self.read_data(&inode)?;
            self.log(JournalOp::Remove, path, &String::from_utf8_lossy(&content))?;
        }
        self.free_all_blocks(&mut inode)?;
        self.store_inode(index, &inode)?;
        self.free_inode(index)
    }

    /// `release_tree` releases a directory and its subtree, children first.
    fn release_tree(&mut self, index: u32, path: &str) -> FsResult<()> {
        let mut dir = self.load_inode(index)?;
        for (name, child) in self.dir_children(&dir)? {
            let child_path = format!("{path}/{name}");
            if self.load_inode(child)?.is_dir() {
                self.release_tree(child, &child_path)?;
            } else {
                self.release_file(child, &child_path)?;
            }
        }

        self.log(JournalOp::RemoveDir, path, "")?;
        self.free_all_blocks(&mut dir)?;
        self.store_inode(index, &dir)?;
        self.free_inode(index)
    }

    /// `unlink` clears the parent's entry and collapses pointer blocks it no longer needs.
    fn unlink(&mut self, parent: u32, loc: EntryLocation) -> FsResult<()> {
        self.clear_entry(loc)?;
        let mut dir = self.load_inode(parent)?;
        if self.check_and_free_empty_indirect_blocks(&mut dir)? > 0 {
            self.store_inode(parent, &dir)?;
        }
        debug!(parent, inode = loc.inode, "unlinked entry");
        Ok(())
    }
}
