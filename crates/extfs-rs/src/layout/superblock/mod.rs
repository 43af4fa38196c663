//! Superblock: layout offsets and allocation counters of a formatted partition.

#[cfg(test)]
mod superblock_tests;

use crate::constants::{
    BLOCK_SIZE, BLOCKS_PER_INODE, INODE_SIZE, JOURNAL_ENTRIES, JOURNAL_ENTRY_SIZE, MAGIC,
    SUPERBLOCK_SIZE,
};
use crate::error::{FsError, FsResult};
use crate::layout::bitmap::Bitmap;
use crate::layout::codec::{
    OnDisk, ensure_len, get_i64, get_u32, get_u64, put_i64, put_u32, put_u64,
};

/// Plain (ext2) or journaled (ext3) layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsKind {
    Ext2,
    Ext3,
}

impl FsKind {
    fn from_u32(raw: u32) -> FsResult<Self> {
        match raw {
            2 => Ok(Self::Ext2),
            3 => Ok(Self::Ext3),
            other => Err(FsError::Corrupt(format!("filesystem type {other}"))),
        }
    }

    #[must_use]
    pub const fn to_u32(self) -> u32 {
        match self {
            Self::Ext2 => 2,
            Self::Ext3 => 3,
        }
    }

    #[must_use]
    pub const fn is_journaled(self) -> bool {
        matches!(self, Self::Ext3)
    }
}

impl std::fmt::Display for FsKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ext2 => f.write_str("ext2"),
            Self::Ext3 => f.write_str("ext3"),
        }
    }
}

/// Superblock stored at offset 0 of the partition. All `*_start` and `first_*` fields are
/// byte offsets relative to the partition start.
///
/// `inodes_count` and `blocks_count` are the number of slots in use; the totals are
/// `inodes_count + free_inodes_count` and `blocks_count + free_blocks_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Superblock {
    pub kind: FsKind,
    pub inodes_count: u32,
    pub blocks_count: u32,
    pub free_blocks_count: u32,
    pub free_inodes_count: u32,
    pub mtime: i64,
    pub umtime: i64,
    pub mnt_count: u32,
    pub magic: u32,
    pub inode_size: u32,
    pub block_size: u32,
    pub first_ino: u64,
    pub first_blo: u64,
    pub bm_inode_start: u64,
    pub bm_block_start: u64,
    pub inode_start: u64,
    pub block_start: u64,
}

impl Superblock {
    /// `per_inode_overhead` is the number of partition bytes consumed per unit of `n`.
    #[must_use]
    pub const fn per_inode_overhead(kind: FsKind) -> u64 {
        let base =
            1 + BLOCKS_PER_INODE as u64 + INODE_SIZE as u64 + BLOCKS_PER_INODE as u64 * BLOCK_SIZE as u64;
        if kind.is_journaled() {
            base + JOURNAL_ENTRY_SIZE as u64
        } else {
            base
        }
    }

    /// `layout` solves for the inode count `n` of a partition of `size` bytes and returns
    /// a fresh superblock with every slot free.
    ///
    /// # Errors
    /// Fails with [`FsError::PartitionTooSmall`] when not even one inode fits.
    pub fn layout(size: u64, kind: FsKind, now: i64) -> FsResult<Self> {
        let usable = size.saturating_sub(SUPERBLOCK_SIZE as u64);
        let mut n = usable / Self::per_inode_overhead(kind);
        n = n.min(u64::from(u32::MAX / BLOCKS_PER_INODE));

        loop {
            if n == 0 {
                return Err(FsError::PartitionTooSmall { size });
            }
            let sb = Self::with_inode_count(kind, n as u32, now);
            if sb.region_end() <= size {
                return Ok(sb);
            }
            n -= 1;
        }
    }

    fn with_inode_count(kind: FsKind, n: u32, now: i64) -> Self {
        let blocks = n * BLOCKS_PER_INODE;
        let journal_len = if kind.is_journaled() {
            (JOURNAL_ENTRIES * JOURNAL_ENTRY_SIZE) as u64
        } else {
            0
        };
        let bm_inode_start = SUPERBLOCK_SIZE as u64 + journal_len;
        let bm_block_start = bm_inode_start + u64::from(n);
        let inode_start = bm_block_start + u64::from(blocks);
        let block_start = inode_start + u64::from(n) * INODE_SIZE as u64;

        Self {
            kind,
            inodes_count: 0,
            blocks_count: 0,
            free_blocks_count: blocks,
            free_inodes_count: n,
            mtime: now,
            umtime: now,
            mnt_count: 1,
            magic: MAGIC,
            inode_size: INODE_SIZE as u32,
            block_size: BLOCK_SIZE as u32,
            first_ino: inode_start,
            first_blo: block_start,
            bm_inode_start,
            bm_block_start,
            inode_start,
            block_start,
        }
    }

    #[must_use]
    pub const fn total_inodes(&self) -> u32 {
        self.inodes_count + self.free_inodes_count
    }

    #[must_use]
    pub const fn total_blocks(&self) -> u32 {
        self.blocks_count + self.free_blocks_count
    }

    #[must_use]
    pub const fn is_journaled(&self) -> bool {
        self.kind.is_journaled()
    }

    /// `region_end` is the first byte past the data-block region.
    #[must_use]
    pub const fn region_end(&self) -> u64 {
        self.block_start + self.total_blocks() as u64 * self.block_size as u64
    }

    /// `journal_region_start` is anchored right after the superblock.
    #[must_use]
    pub const fn journal_region_start(&self) -> u64 {
        SUPERBLOCK_SIZE as u64
    }

    #[must_use]
    pub const fn journal_region_end(&self) -> u64 {
        self.journal_region_start() + (JOURNAL_ENTRIES * JOURNAL_ENTRY_SIZE) as u64
    }

    #[must_use]
    pub const fn inode_bitmap(&self) -> Bitmap {
        Bitmap::new("inode", self.bm_inode_start, self.total_inodes())
    }

    #[must_use]
    pub const fn block_bitmap(&self) -> Bitmap {
        Bitmap::new("block", self.bm_block_start, self.total_blocks())
    }

    #[must_use]
    pub const fn inode_offset(&self, index: u32) -> u64 {
        self.inode_start + index as u64 * self.inode_size as u64
    }

    #[must_use]
    pub const fn block_offset(&self, index: u32) -> u64 {
        self.block_start + index as u64 * self.block_size as u64
    }

    pub const fn after_block_alloc(&mut self) {
        self.blocks_count += 1;
        self.free_blocks_count = self.free_blocks_count.saturating_sub(1);
        self.first_blo += self.block_size as u64;
    }

    pub const fn after_block_dealloc(&mut self) {
        self.blocks_count = self.blocks_count.saturating_sub(1);
        self.free_blocks_count += 1;
        self.first_blo = self.first_blo.saturating_sub(self.block_size as u64);
    }

    pub const fn after_inode_alloc(&mut self) {
        self.inodes_count += 1;
        self.free_inodes_count = self.free_inodes_count.saturating_sub(1);
        self.first_ino += self.inode_size as u64;
    }

    pub const fn after_inode_dealloc(&mut self) {
        self.inodes_count = self.inodes_count.saturating_sub(1);
        self.free_inodes_count += 1;
        self.first_ino = self.first_ino.saturating_sub(self.inode_size as u64);
    }

    /// `reset_counters` marks every slot free again without touching the layout.
    pub const fn reset_counters(&mut self) {
        let (inodes, blocks) = (self.total_inodes(), self.total_blocks());
        self.inodes_count = 0;
        self.free_inodes_count = inodes;
        self.blocks_count = 0;
        self.free_blocks_count = blocks;
        self.first_ino = self.inode_start;
        self.first_blo = self.block_start;
    }
}

impl OnDisk for Superblock {
    const SIZE: usize = SUPERBLOCK_SIZE;

    fn from_bytes(buf: &[u8]) -> FsResult<Self> {
        ensure_len(buf, Self::SIZE, "superblock")?;
        let magic = get_u32(buf, 40);
        if magic != MAGIC {
            return Err(FsError::NotFormatted { found: magic });
        }
        let sb = Self {
            kind: FsKind::from_u32(get_u32(buf, 0))?,
            inodes_count: get_u32(buf, 4),
            blocks_count: get_u32(buf, 8),
            free_blocks_count: get_u32(buf, 12),
            free_inodes_count: get_u32(buf, 16),
            mtime: get_i64(buf, 20),
            umtime: get_i64(buf, 28),
            mnt_count: get_u32(buf, 36),
            magic,
            inode_size: get_u32(buf, 44),
            block_size: get_u32(buf, 48),
            first_ino: get_u64(buf, 52),
            first_blo: get_u64(buf, 60),
            bm_inode_start: get_u64(buf, 68),
            bm_block_start: get_u64(buf, 76),
            inode_start: get_u64(buf, 84),
            block_start: get_u64(buf, 92),
        };
        if sb.inode_size as usize != INODE_SIZE || sb.block_size as usize != BLOCK_SIZE {
            return Err(FsError::Corrupt(format!(
                "superblock sizes: inode {} block {}",
                sb.inode_size, sb.block_size
            )));
        }
        if !(sb.bm_inode_start < sb.bm_block_start
            && sb.bm_block_start < sb.inode_start
            && sb.inode_start < sb.block_start)
        {
            return Err(FsError::Corrupt("superblock region offsets".into()));
        }
        Ok(sb)
    }

    fn write_bytes(&self, buf: &mut [u8]) {
        buf[..Self::SIZE].fill(0);
        put_u32(buf, 0, self.kind.to_u32());
        put_u32(buf, 4, self.inodes_count);
        put_u32(buf, 8, self.blocks_count);
        put_u32(buf, 12, self.free_blocks_count);
        put_u32(buf, 16, self.free_inodes_count);
        put_i64(buf, 20, self.mtime);
        put_i64(buf, 28, self.umtime);
        put_u32(buf, 36, self.mnt_count);
        put_u32(buf, 40, self.magic);
        put_u32(buf, 44, self.inode_size);
        put_u32(buf, 48, self.block_size);
        put_u64(buf, 52, self.first_ino);
        put_u64(buf, 60, self.first_blo);
        put_u64(buf, 68, self.bm_inode_start);
        put_u64(buf, 76, self.bm_block_start);
        put_u64(buf, 84, self.inode_start);
        put_u64(buf, 92, self.block_start);
    }
}
