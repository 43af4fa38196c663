use super::pointers::tables_for;
use super::test_support::{MIB, assert_consistent, ext2, formatted};
use crate::constants::{BLOCK_SIZE, DIRECT_PTRS, POINTERS_PER_BLOCK};
use crate::error::FsError;
use crate::layout::superblock::FsKind;

/// Data blocks reachable through the direct slots and all three indirect levels.
const MAX_BLOCKS: usize = DIRECT_PTRS
    + POINTERS_PER_BLOCK
    + POINTERS_PER_BLOCK * POINTERS_PER_BLOCK
    + POINTERS_PER_BLOCK * POINTERS_PER_BLOCK * POINTERS_PER_BLOCK;

/// `blocks_for` creates a file spanning `count` data blocks and returns
/// (data blocks resolved, blocks consumed including pointer tables).
fn blocks_for(count: usize) -> (usize, u32) {
    let (_tf, mut fs) = formatted(2 * MIB, FsKind::Ext2);
    let before = fs.usage().expect("usage").used_blocks;
    fs.create_file(&[], "f", &vec![b'z'; count * BLOCK_SIZE], false)
        .expect("mkfile");

    let (_, inode) = fs.stat("/f").expect("stat");
    let data = fs.resolve_all_block_indices(&inode).expect("resolve").len();
    assert_consistent(&fs);
    (data, fs.usage().expect("usage").used_blocks - before)
}

#[test]
fn direct_slots_need_no_tables() {
    assert_eq!(blocks_for(12), (12, 12));
}

#[test]
fn thirteenth_block_opens_single_indirect() {
    assert_eq!(blocks_for(13), (13, 14));
}

#[test]
fn single_indirect_fills_before_double() {
    assert_eq!(blocks_for(12 + 16), (28, 29));
    assert_eq!(blocks_for(12 + 16 + 1), (29, 32));
}

#[test]
fn triple_indirect_opens_after_double_is_full() {
    // single table, double root + 16 children, triple root + one chain of two
    let count = 12 + 16 + 256 + 1;
    assert_eq!(blocks_for(count), (count, count as u32 + 1 + 17 + 3));
}

/// `placed` creates a file of `count` data blocks on a fresh image and returns its data
/// blocks in logical order along with every block it owns, tables included.
fn placed(count: usize) -> (Vec<u32>, Vec<u32>) {
    let (_tf, mut fs) = formatted(2 * MIB, FsKind::Ext2);
    fs.create_file(&[], "f", &vec![b'p'; count * BLOCK_SIZE], false)
        .expect("mkfile");
    let (_, inode) = fs.stat("/f").expect("stat");
    let data = fs.resolve_all_block_indices(&inode).expect("resolve");
    let mut owned = fs.owned_blocks(&inode).expect("owned");
    for &block in &owned {
        assert!(fs.is_block_allocated(block).expect("bit"), "block {block} not marked");
    }
    owned.sort_unstable();
    (data, owned)
}

#[test]
fn direct_blocks_follow_the_users_file() {
    // Blocks 0 and 1 hold the root directory and users.txt.
    let (data, owned) = placed(12);
    assert_eq!(data, (2..=13).collect::<Vec<u32>>());
    assert_eq!(owned, data);
}

#[test]
fn single_table_sits_between_direct_and_indirect_data() {
    let (data, owned) = placed(13);
    let mut expected: Vec<u32> = (2..=13).collect();
    expected.push(15);
    assert_eq!(data, expected);
    assert_eq!(owned, (2..=15).collect::<Vec<u32>>());

    let (data, _) = placed(16);
    assert_eq!(&data[12..], &[15, 16, 17, 18]);
}

#[test]
fn double_tables_interleave_with_their_data() {
    let count = 12 + 16 * 16 + 1;
    let (data, owned) = placed(count);
    assert_eq!(data.len(), count);

    // 14 is the single table, 31 the double root; child k of the root sits at 32 + 17k
    // with its 16 data blocks right after it.
    let mut expected: Vec<u32> = (2..=13).collect();
    expected.extend(15..=30);
    for k in 0..16u32 {
        let child = 32 + 17 * k;
        let left = count - expected.len();
        expected.extend((child + 1..=child + 16).take(left));
    }
    assert_eq!(data, expected);
    assert_eq!(data.last(), Some(&288));
    assert_eq!(owned, (2..=288).collect::<Vec<u32>>());
}

#[test]
fn table_count_matches_allocation() {
    assert_eq!(tables_for(0).expect("tables"), 0);
    assert_eq!(tables_for(12).expect("tables"), 0);
    assert_eq!(tables_for(13).expect("tables"), 1);
    assert_eq!(tables_for(29).expect("tables"), 3);
    assert_eq!(tables_for(12 + 16 + 256 + 1).expect("tables"), 1 + 17 + 3);
    assert_eq!(tables_for(MAX_BLOCKS).expect("tables"), 1 + 17 + 273);
    assert!(matches!(tables_for(MAX_BLOCKS + 1), Err(FsError::IndirectionFull)));
}

#[test]
fn logical_order_is_preserved() {
    let (_tf, mut fs) = ext2();
    let content: Vec<u8> = (0..40 * BLOCK_SIZE).map(|i| (i / BLOCK_SIZE) as u8).collect();
    fs.create_file(&[], "ordered", &content, false).expect("mkfile");
    assert_eq!(fs.read_file("/ordered").expect("read"), content);
}

#[test]
fn full_tree_reports_indirection_full() {
    let (_tf, mut fs) = formatted(2 * MIB, FsKind::Ext2);
    fs.create_file(&[], "huge", &vec![1u8; MAX_BLOCKS * BLOCK_SIZE], false)
        .expect("mkfile");
    let (_, mut inode) = fs.stat("/huge").expect("stat");
    assert_eq!(
        fs.resolve_all_block_indices(&inode).expect("resolve").len(),
        MAX_BLOCKS
    );

    let used = fs.usage().expect("usage").used_blocks;
    assert!(matches!(fs.add_block(&mut inode), Err(FsError::IndirectionFull)));
    assert_eq!(fs.usage().expect("usage").used_blocks, used);
}

#[test]
fn shrinking_releases_data_and_empty_tables() {
    let (_tf, mut fs) = ext2();
    let base = fs.usage().expect("usage").used_blocks;
    fs.create_file(&[], "f", &vec![3u8; 29 * BLOCK_SIZE], false)
        .expect("mkfile");
    let (index, mut inode) = fs.stat("/f").expect("stat");

    fs.shrink_blocks(&mut inode, DIRECT_PTRS).expect("shrink");
    fs.store_inode(index, &inode).expect("store");
    assert!(inode.block[DIRECT_PTRS..].iter().all(Option::is_none));
    assert_eq!(fs.usage().expect("usage").used_blocks, base + 12);
    assert_consistent(&fs);
}

#[test]
fn shrinking_inside_single_indirect_keeps_its_table() {
    let (_tf, mut fs) = ext2();
    fs.create_file(&[], "f", &vec![3u8; 20 * BLOCK_SIZE], false)
        .expect("mkfile");
    let (_, mut inode) = fs.stat("/f").expect("stat");
    let table = inode.block[DIRECT_PTRS].expect("single indirect");

    fs.shrink_blocks(&mut inode, 14).expect("shrink");
    assert_eq!(inode.block[DIRECT_PTRS], Some(table));
    assert!(fs.is_block_allocated(table).expect("bit"));
    assert_eq!(fs.resolve_all_block_indices(&inode).expect("resolve").len(), 14);
}

#[test]
fn empty_tables_are_collapsed_on_demand() {
    let (_tf, mut fs) = ext2();
    fs.create_file(&[], "f", &vec![3u8; 13 * BLOCK_SIZE], false)
        .expect("mkfile");
    let (_, mut inode) = fs.stat("/f").expect("stat");
    let table = inode.block[DIRECT_PTRS].expect("single indirect");

    // Nothing to collapse while the table still points at data.
    assert_eq!(fs.check_and_free_empty_indirect_blocks(&mut inode).expect("check"), 0);

    fs.shrink_blocks(&mut inode, 12).expect("shrink");
    assert_eq!(inode.block[DIRECT_PTRS], None);
    assert!(!fs.is_block_allocated(table).expect("bit"));
}

#[test]
fn free_all_blocks_returns_everything() {
    let (_tf, mut fs) = ext2();
    let base = fs.usage().expect("usage").used_blocks;
    fs.create_file(&[], "f", &vec![3u8; 300 * BLOCK_SIZE], false)
        .expect("mkfile");
    let (index, mut inode) = fs.stat("/f").expect("stat");

    fs.free_all_blocks(&mut inode).expect("free");
    fs.store_inode(index, &inode).expect("store");
    assert_eq!(inode.size, 0);
    assert!(inode.block.iter().all(Option::is_none));
    assert_eq!(fs.usage().expect("usage").used_blocks, base);
    assert_consistent(&fs);
}
