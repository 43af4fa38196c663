use tempfile::NamedTempFile;

use super::{FileSystem, FormatOptions};
use crate::layout::superblock::FsKind;
use crate::retention::disk::Disk;
use crate::retention::partition::Partition;

pub(crate) const MIB: u64 = 1024 * 1024;

/// `partition` backs a whole-disk partition of `size` bytes with a temp file.
pub(crate) fn partition(size: u64) -> (NamedTempFile, Partition) {
    let tf = NamedTempFile::new().expect("tmp file");
    let disk = Disk::create(tf.path(), size).expect("disk");
    let part = Partition::new(disk, 0, size).expect("partition");
    (tf, part)
}

/// `formatted` returns a freshly formatted filesystem of `size` bytes. Keep the temp file
/// alive for as long as the filesystem is used.
pub(crate) fn formatted(size: u64, kind: FsKind) -> (NamedTempFile, FileSystem) {
    let (tf, part) = partition(size);
    let fs = FileSystem::format(part, FormatOptions { kind }).expect("format");
    (tf, fs)
}

pub(crate) fn ext2() -> (NamedTempFile, FileSystem) {
    formatted(MIB, FsKind::Ext2)
}

pub(crate) fn ext3() -> (NamedTempFile, FileSystem) {
    formatted(MIB, FsKind::Ext3)
}

/// `assert_consistent` checks that the superblock counters agree with both bitmaps.
pub(crate) fn assert_consistent(fs: &FileSystem) {
    let usage = fs.usage().expect("usage");
    assert_eq!(usage.inode_bits_set, usage.used_inodes, "inode bitmap vs superblock");
    assert_eq!(usage.block_bits_set, usage.used_blocks, "block bitmap vs superblock");
    assert_eq!(usage.used_inodes + usage.free_inodes, usage.total_inodes);
    assert_eq!(usage.used_blocks + usage.free_blocks, usage.total_blocks);
}
