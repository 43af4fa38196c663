use super::*;

#[test]
fn plain_layout_follows_overhead_formula() {
    let size = 1 << 20;
    let sb = Superblock::layout(size, FsKind::Ext2, 0).expect("layout");

    let n = (size - SUPERBLOCK_SIZE as u64) / 296;
    assert_eq!(u64::from(sb.total_inodes()), n);
    assert_eq!(sb.total_blocks(), sb.total_inodes() * 3);
    assert_eq!(sb.bm_inode_start, SUPERBLOCK_SIZE as u64);
    assert_eq!(sb.bm_block_start, sb.bm_inode_start + n);
    assert_eq!(sb.inode_start, sb.bm_block_start + 3 * n);
    assert_eq!(sb.block_start, sb.inode_start + n * INODE_SIZE as u64);
    assert!(sb.region_end() <= size);
}

#[test]
fn journaled_layout_reserves_journal_after_superblock() {
    let sb = Superblock::layout(1 << 20, FsKind::Ext3, 0).expect("layout");
    assert_eq!(sb.journal_region_start(), SUPERBLOCK_SIZE as u64);
    assert_eq!(
        sb.journal_region_end(),
        SUPERBLOCK_SIZE as u64 + (JOURNAL_ENTRIES * JOURNAL_ENTRY_SIZE) as u64
    );
    assert_eq!(sb.bm_inode_start, sb.journal_region_end());
}

#[test]
fn small_journaled_partition_still_fits() {
    // The per-n formula undercounts the fixed journal region for tiny partitions.
    let size = 20 * 1024;
    let sb = Superblock::layout(size, FsKind::Ext3, 0).expect("layout");
    assert!(sb.region_end() <= size);
    assert!(sb.total_inodes() > 0);
}

#[test]
fn tiny_partition_is_rejected() {
    let err = Superblock::layout(300, FsKind::Ext2, 0).unwrap_err();
    assert!(matches!(err, FsError::PartitionTooSmall { size: 300 }));
}

#[test]
fn counters_pair_up() {
    let mut sb = Superblock::layout(64 * 1024, FsKind::Ext2, 0).expect("layout");
    let (inodes, blocks) = (sb.total_inodes(), sb.total_blocks());

    sb.after_block_alloc();
    sb.after_block_alloc();
    sb.after_inode_alloc();
    assert_eq!(sb.blocks_count, 2);
    assert_eq!(sb.first_blo, sb.block_start + 2 * BLOCK_SIZE as u64);
    assert_eq!(sb.first_ino, sb.inode_start + INODE_SIZE as u64);

    sb.after_block_dealloc();
    sb.after_inode_dealloc();
    assert_eq!(sb.blocks_count, 1);
    assert_eq!(sb.inodes_count, 0);
    assert_eq!(sb.total_inodes(), inodes);
    assert_eq!(sb.total_blocks(), blocks);

    sb.reset_counters();
    assert_eq!(sb.blocks_count, 0);
    assert_eq!(sb.free_blocks_count, blocks);
    assert_eq!(sb.first_blo, sb.block_start);
}

#[test]
fn encoding_preserves_every_field() {
    let mut sb = Superblock::layout(1 << 20, FsKind::Ext3, 1_700_000_000).expect("layout");
    sb.after_inode_alloc();
    sb.mnt_count = 4;

    let mut buf = [0u8; SUPERBLOCK_SIZE];
    sb.write_bytes(&mut buf);
    assert_eq!(&buf[40..44], &MAGIC.to_le_bytes());
    let back = Superblock::from_bytes(&buf).expect("decode");
    assert_eq!(back, sb);
}

#[test]
fn zeroed_bytes_are_not_formatted() {
    let buf = [0u8; SUPERBLOCK_SIZE];
    let err = Superblock::from_bytes(&buf).unwrap_err();
    assert!(matches!(err, FsError::NotFormatted { found: 0 }));
}
