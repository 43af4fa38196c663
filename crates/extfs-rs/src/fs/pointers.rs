//! Block-pointer resolution: direct slots, then single, double and triple indirection.
//!
//! The three indirect levels share one recursive walk keyed by `depth`, the number of
//! pointer-block levels below an inode slot (1 = the table points at data blocks).

use tracing::debug;

use super::{FileSystem, unix_now};
use crate::constants::{DIRECT_PTRS, INODE_PTRS, POINTERS_PER_BLOCK};
use crate::error::{FsError, FsResult};
use crate::layout::blocks::PointerBlock;
use crate::layout::inode::Inode;

/// Inode slot and tree depth of each indirect level.
const INDIRECT: [(usize, u32); 3] = [(DIRECT_PTRS, 1), (DIRECT_PTRS + 1, 2), (DIRECT_PTRS + 2, 3)];

/// `span` is the number of data blocks reachable through one table at `depth`.
const fn span(depth: u32) -> usize {
    POINTERS_PER_BLOCK.pow(depth)
}

/// `tables_for` counts the pointer blocks a fresh inode needs to hold `count` data blocks.
///
/// # Errors
/// Fails with [`FsError::IndirectionFull`] when `count` exceeds the triple-indirect tree.
pub(crate) fn tables_for(count: usize) -> FsResult<usize> {
    let mut rest = count.saturating_sub(DIRECT_PTRS);
    let mut tables = 0;
    for (_, depth) in INDIRECT {
        if rest == 0 {
            break;
        }
        let take = rest.min(span(depth));
        tables += (1..=depth).map(|k| take.div_ceil(span(k))).sum::<usize>();
        rest -= take;
    }
    if rest > 0 {
        return Err(FsError::IndirectionFull);
    }
    Ok(tables)
}

impl FileSystem {
    /// `resolve_all_block_indices` returns the inode's data blocks in logical order.
    /// Pointer blocks are not included.
    ///
    /// # Errors
    /// Fails if a pointer block cannot be read.
    pub fn resolve_all_block_indices(&self, inode: &Inode) -> FsResult<Vec<u32>> {
        self.collect_blocks(inode, false)
    }

    /// `owned_blocks` returns every block the inode holds: data blocks and pointer blocks.
    pub(crate) fn owned_blocks(&self, inode: &Inode) -> FsResult<Vec<u32>> {
        self.collect_blocks(inode, true)
    }

    fn collect_blocks(&self, inode: &Inode, with_tables: bool) -> FsResult<Vec<u32>> {
        let mut out: Vec<u32> = inode.block[..DIRECT_PTRS].iter().flatten().copied().collect();
        for (slot, depth) in INDIRECT {
            if let Some(table) = inode.block[slot] {
                if with_tables {
                    out.push(table);
                }
                self.walk_table(table, depth, with_tables, &mut out)?;
            }
        }
        Ok(out)
    }

    fn walk_table(
        &self,
        table: u32,
        depth: u32,
        with_tables: bool,
        out: &mut Vec<u32>,
    ) -> FsResult<()> {
        let pb: PointerBlock = self.read_block(table)?;
        for child in pb.ptrs.into_iter().flatten() {
            if depth == 1 {
                out.push(child);
                continue;
            }
            if with_tables {
                out.push(child);
            }
            self.walk_table(child, depth - 1, with_tables, out)?;
        }
        Ok(())
    }

    /// `add_block` appends one zeroed data block to the inode and returns its index.
    ///
    /// Direct slots fill first; then each indirect level in turn, filling any partially
    /// used table before building a new one. The caller persists the inode.
    ///
    /// # Errors
    /// Fails with [`FsError::IndirectionFull`] when the triple-indirect tree is full, or
    /// with a capacity error when the block bitmap is exhausted.
    pub fn add_block(&mut self, inode: &mut Inode) -> FsResult<u32> {
        if let Some(slot) = inode.block[..DIRECT_PTRS].iter().position(Option::is_none) {
            let block = self.alloc_block()?;
            inode.block[slot] = Some(block);
            return Ok(block);
        }

        for (slot, depth) in INDIRECT {
            let table = match inode.block[slot] {
                Some(table) => table,
                None => {
                    let table = self.new_table()?;
                    inode.block[slot] = Some(table);
                    debug!(slot, table, "opened indirect level");
                    table
                }
            };
            if let Some(block) = self.add_in_table(table, depth)? {
                return Ok(block);
            }
        }
        Err(FsError::IndirectionFull)
    }

    /// `add_in_table` places one new data block under `table`, or returns `None` when the
    /// subtree is full.
    fn add_in_table(&mut self, table: u32, depth: u32) -> FsResult<Option<u32>> {
        let mut pb: PointerBlock = self.read_block(table)?;
        for i in 0..POINTERS_PER_BLOCK {
            match pb.ptrs[i] {
                None if depth == 1 => {
                    let block = self.alloc_block()?;
                    pb.ptrs[i] = Some(block);
                    self.write_block(table, &pb)?;
                    return Ok(Some(block));
                }
                None => {
                    let child = self.new_table()?;
                    pb.ptrs[i] = Some(child);
                    self.write_block(table, &pb)?;
                    return self.add_in_table(child, depth - 1);
                }
                Some(_) if depth == 1 => {}
                Some(child) => {
                    if let Some(block) = self.add_in_table(child, depth - 1)? {
                        return Ok(Some(block));
                    }
                }
            }
        }
        Ok(None)
    }

    fn new_table(&mut self) -> FsResult<u32> {
        let table = self.alloc_block()?;
        self.write_block(table, &PointerBlock::empty())?;
        Ok(table)
    }

    /// `free_all_blocks` releases every data and pointer block, unsets all slots and
    /// zeroes the size. The caller persists the inode.
    ///
    /// # Errors
    /// Fails if a block cannot be read or released.
    pub fn free_all_blocks(&mut self, inode: &mut Inode) -> FsResult<()> {
        for block in self.owned_blocks(inode)? {
            self.free_block(block)?;
        }
        inode.block = [None; INODE_PTRS];
        inode.size = 0;
        inode.mtime = unix_now();
        Ok(())
    }

    /// `check_and_free_empty_indirect_blocks` frees pointer blocks with no live entries,
    /// deepest first, and unsets the owning slots. Returns how many tables were freed.
    ///
    /// # Errors
    /// Fails if a table cannot be read, rewritten or released.
    pub fn check_and_free_empty_indirect_blocks(&mut self, inode: &mut Inode) -> FsResult<u32> {
        let mut freed = 0;
        for (slot, depth) in INDIRECT {
            let Some(table) = inode.block[slot] else {
                continue;
            };
            if self.prune_table(table, depth, &mut freed)? {
                self.free_block(table)?;
                inode.block[slot] = None;
                freed += 1;
            }
        }
        Ok(freed)
    }

    /// `prune_table` collapses empty sub-tables under `table` and reports whether `table`
    /// itself ended up empty.
    fn prune_table(&mut self, table: u32, depth: u32, freed: &mut u32) -> FsResult<bool> {
        let mut pb: PointerBlock = self.read_block(table)?;
        if depth > 1 {
            let mut changed = false;
            for i in 0..POINTERS_PER_BLOCK {
                let Some(child) = pb.ptrs[i] else {
                    continue;
                };
                if self.prune_table(child, depth - 1, freed)? {
                    self.free_block(child)?;
                    pb.ptrs[i] = None;
                    *freed += 1;
                    changed = true;
                }
            }
            if changed {
                self.write_block(table, &pb)?;
            }
        }
        Ok(pb.is_empty())
    }

    /// `shrink_blocks` keeps the first `keep` data blocks, releases the rest from the end
    /// and collapses any pointer block left empty. The caller persists the inode.
    ///
    /// # Errors
    /// Fails if a block cannot be read, rewritten or released.
    pub fn shrink_blocks(&mut self, inode: &mut Inode, keep: usize) -> FsResult<()> {
        let blocks = self.resolve_all_block_indices(inode)?;
        for logical in (keep..blocks.len()).rev() {
            if let Some(block) = self.clear_logical(inode, logical)? {
                self.free_block(block)?;
            }
        }
        self.check_and_free_empty_indirect_blocks(inode)?;
        Ok(())
    }

    /// `clear_logical` unsets the pointer to logical block `index` and returns it.
    fn clear_logical(&mut self, inode: &mut Inode, index: usize) -> FsResult<Option<u32>> {
        if index < DIRECT_PTRS {
            return Ok(inode.block[index].take());
        }
        let mut rest = index - DIRECT_PTRS;
        for (slot, depth) in INDIRECT {
            if rest < span(depth) {
                return match inode.block[slot] {
                    Some(table) => self.clear_in_table(table, depth, rest),
                    None => Ok(None),
                };
            }
            rest -= span(depth);
        }
        Ok(None)
    }

    fn clear_in_table(&mut self, table: u32, depth: u32, index: usize) -> FsResult<Option<u32>> {
        let mut pb: PointerBlock = self.read_block(table)?;
        let below = span(depth - 1);
        let slot = index / below;
        if depth == 1 {
            let cleared = pb.ptrs[slot].take();
            self.write_block(table, &pb)?;
            return Ok(cleared);
        }
        match pb.ptrs[slot] {
            Some(child) => self.clear_in_table(child, depth - 1, index % below),
            None => Ok(None),
        }
    }
}
