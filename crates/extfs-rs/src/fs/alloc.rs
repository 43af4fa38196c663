use tracing::debug;

use super::FileSystem;
use crate::error::{FsError, FsResult};
use crate::layout::blocks::DataBlock;

impl FileSystem {
    /// `alloc_inode` claims the first free inode slot and updates the superblock.
    pub(crate) fn alloc_inode(&mut self) -> FsResult<u32> {
        let bitmap = self.sb.inode_bitmap();
        let index = bitmap.find_free(&self.part)?;
        bitmap.set(&mut self.part, index, true)?;
        self.sb.after_inode_alloc();
        self.save_superblock()?;
        debug!(inode = index, "allocated inode");
        Ok(index)
    }

    pub(crate) fn free_inode(&mut self, index: u32) -> FsResult<()> {
        let bitmap = self.sb.inode_bitmap();
        if !bitmap.is_set(&self.part, index)? {
            return Err(FsError::Corrupt(format!("inode {index} freed twice")));
        }
        bitmap.set(&mut self.part, index, false)?;
        self.sb.after_inode_dealloc();
        self.save_superblock()?;
        debug!(inode = index, "freed inode");
        Ok(())
    }

    /// `alloc_block` claims the first free block, zeroes it and updates the superblock.
    pub(crate) fn alloc_block(&mut self) -> FsResult<u32> {
        let bitmap = self.sb.block_bitmap();
        let index = bitmap.find_free(&self.part)?;
        bitmap.set(&mut self.part, index, true)?;
        self.sb.after_block_alloc();
        self.save_superblock()?;
        self.write_block(index, &DataBlock::from_chunk(&[]))?;
        debug!(block = index, "allocated block");
        Ok(index)
    }

    pub(crate) fn free_block(&mut self, index: u32) -> FsResult<()> {
        let bitmap = self.sb.block_bitmap();
        if !bitmap.is_set(&self.part, index)? {
            return Err(FsError::Corrupt(format!("block {index} freed twice")));
        }
        bitmap.set(&mut self.part, index, false)?;
        self.sb.after_block_dealloc();
        self.save_superblock()?;
        debug!(block = index, "freed block");
        Ok(())
    }

    /// `is_block_allocated` reports the block bitmap state of `index`.
    ///
    /// # Errors
    /// Fails if `index` is out of range.
    pub fn is_block_allocated(&self, index: u32) -> FsResult<bool> {
        self.sb.block_bitmap().is_set(&self.part, index)
    }

    /// # Errors
    /// Fails if `index` is out of range.
    pub fn is_inode_allocated(&self, index: u32) -> FsResult<bool> {
        self.sb.inode_bitmap().is_set(&self.part, index)
    }
}

