//! Fixed-width on-disk structures and the bitmap allocator.

pub mod bitmap;
pub mod blocks;
pub mod codec;
pub mod inode;
pub mod journal;
pub mod superblock;
