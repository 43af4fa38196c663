use super::pointers::tables_for;
use super::{FileSystem, unix_now};
use crate::constants::BLOCK_SIZE;
use crate::error::{FsError, FsResult};
use crate::layout::blocks::DataBlock;
use crate::layout::inode::Inode;

impl FileSystem {
    /// `read_data` concatenates the inode's data blocks and cuts them to its size.
    ///
    /// # Errors
    /// Fails if a block cannot be read.
    pub fn read_data(&self, inode: &Inode) -> FsResult<Vec<u8>> {
        let blocks = self.resolve_all_block_indices(inode)?;
        let mut out = Vec::with_capacity(blocks.len() * BLOCK_SIZE);
        for block in blocks {
            let data: DataBlock = self.read_block(block)?;
            out.extend_from_slice(&data.0);
        }
        out.truncate(inode.size as usize);
        Ok(out)
    }

    /// `write_data` replaces the inode's content with `data`.
    ///
    /// When the block count changes, every block is freed and exactly
    /// `ceil(len / BLOCK_SIZE)` fresh blocks are allocated; otherwise the existing blocks
    /// are overwritten in place. A write that cannot fit is refused before anything is
    /// freed. The caller persists the inode.
    ///
    /// # Errors
    /// Fails when space runs out or a block cannot be written.
    pub fn write_data(&mut self, inode: &mut Inode, data: &[u8]) -> FsResult<()> {
        let size = u32::try_from(data.len()).map_err(|_| FsError::IndirectionFull)?;
        let needed = data.len().div_ceil(BLOCK_SIZE);

        let mut blocks = self.resolve_all_block_indices(inode)?;
        if blocks.len() != needed {
            let owned = self.owned_blocks(inode)?.len();
            let wanted = needed + tables_for(needed)?;
            if wanted > self.sb.free_blocks_count as usize + owned {
                return Err(FsError::NoFreeSlot { region: "block" });
            }
            self.free_all_blocks(inode)?;
            blocks.clear();
            for _ in 0..needed {
                blocks.push(self.add_block(inode)?);
            }
        }

        for (&block, chunk) in blocks.iter().zip(data.chunks(BLOCK_SIZE)) {
            self.write_block(block, &DataBlock::from_chunk(chunk))?;
        }
        inode.size = size;
        inode.mtime = unix_now();
        Ok(())
    }
}
