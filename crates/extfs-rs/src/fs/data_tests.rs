use rand::RngCore;

use super::generate_content;
use super::test_support::{assert_consistent, ext2, ext3, formatted};
use crate::constants::BLOCK_SIZE;
use crate::error::FsError;
use crate::layout::journal::JournalOp;
use crate::layout::superblock::FsKind;

#[test]
fn empty_file_owns_no_blocks() {
    let (_tf, mut fs) = ext2();
    let before = fs.usage().expect("usage").used_blocks;
    fs.create_file(&[], "empty", b"", false).expect("mkfile");

    let (_, inode) = fs.stat("/empty").expect("stat");
    assert_eq!(inode.size, 0);
    assert!(inode.block.iter().all(Option::is_none));
    assert!(fs.read_file("/empty").expect("read").is_empty());
    assert_eq!(fs.usage().expect("usage").used_blocks, before);
}

#[test]
fn sizes_around_block_boundaries_read_back() {
    let (_tf, mut fs) = ext2();
    for (i, len) in [1usize, BLOCK_SIZE - 1, BLOCK_SIZE, BLOCK_SIZE + 1].into_iter().enumerate() {
        let name = format!("f{i}");
        let content = generate_content(len);
        fs.create_file(&[], &name, content.as_bytes(), false)
            .expect("mkfile");

        let (_, inode) = fs.stat(&format!("/{name}")).expect("stat");
        assert_eq!(inode.size as usize, len);
        assert_eq!(
            fs.resolve_all_block_indices(&inode).expect("resolve").len(),
            len.div_ceil(BLOCK_SIZE)
        );
        assert_eq!(fs.read_file(&format!("/{name}")).expect("read"), content.as_bytes());
    }
}

#[test]
fn random_multi_level_content_survives() {
    let (_tf, mut fs) = ext2();
    let mut content = vec![0u8; 300 * BLOCK_SIZE + 17];
    rand::rng().fill_bytes(&mut content);
    fs.create_file(&[], "noise", &content, false).expect("mkfile");
    assert_eq!(fs.read_file("/noise").expect("read"), content);
}

#[test]
fn generated_content_cycles_digits() {
    assert_eq!(generate_content(0), "");
    assert_eq!(generate_content(12), "012345678901");
}

#[test]
fn edit_reallocates_when_block_count_changes() {
    let (_tf, mut fs) = ext2();
    let base = fs.usage().expect("usage").used_blocks;
    fs.create_file(&[], "f", &[1u8; 3 * BLOCK_SIZE], false)
        .expect("mkfile");

    fs.edit_file("/f", b"short").expect("edit");
    assert_eq!(fs.read_file("/f").expect("read"), b"short");
    assert_eq!(fs.usage().expect("usage").used_blocks, base + 1);

    let long = generate_content(20 * BLOCK_SIZE);
    fs.edit_file("/f", long.as_bytes()).expect("edit");
    assert_eq!(fs.read_file("/f").expect("read"), long.as_bytes());
    assert_eq!(fs.usage().expect("usage").used_blocks, base + 21);
    assert_consistent(&fs);
}

#[test]
fn edit_in_place_keeps_blocks() {
    let (_tf, mut fs) = ext2();
    fs.create_file(&[], "f", b"first", false).expect("mkfile");
    let (_, before) = fs.stat("/f").expect("stat");

    fs.edit_file("/f", b"second!").expect("edit");
    let (_, after) = fs.stat("/f").expect("stat");
    assert_eq!(before.block, after.block);
    assert_eq!(after.size, 7);
}

#[test]
fn oversized_edit_is_refused_before_freeing() {
    let (_tf, mut fs) = formatted(64 * 1024, FsKind::Ext2);
    fs.create_file(&[], "f", b"keep", false).expect("mkfile");
    let before = fs.usage().expect("usage");

    let too_big = vec![b'x'; (before.free_blocks as usize + 2) * BLOCK_SIZE];
    let err = fs.edit_file("/f", &too_big).unwrap_err();
    assert!(matches!(err, FsError::NoFreeSlot { region: "block" }));
    assert_eq!(fs.usage().expect("usage"), before);
    assert_eq!(fs.read_file("/f").expect("read"), b"keep");
    assert_consistent(&fs);
}

#[test]
fn directories_are_not_files() {
    let (_tf, mut fs) = ext2();
    fs.create_directory(&[], "d", false).expect("mkdir");
    assert!(matches!(fs.read_file("/d"), Err(FsError::NotAFile(_))));
    assert!(matches!(fs.edit_file("/d", b"x"), Err(FsError::NotAFile(_))));
    assert!(matches!(fs.read_file("/missing"), Err(FsError::NotFound(_))));
}

#[test]
fn truncate_shrinks_and_zero_fills_on_regrow() {
    let (_tf, mut fs) = ext2();
    let base = fs.usage().expect("usage").used_blocks;
    let content = generate_content(3 * BLOCK_SIZE);
    fs.create_file(&[], "f", content.as_bytes(), false)
        .expect("mkfile");

    fs.truncate_file("/f", 10).expect("shrink");
    assert_eq!(fs.read_file("/f").expect("read"), &content.as_bytes()[..10]);
    assert_eq!(fs.usage().expect("usage").used_blocks, base + 1);

    fs.truncate_file("/f", 100).expect("grow");
    let grown = fs.read_file("/f").expect("read");
    assert_eq!(grown.len(), 100);
    assert_eq!(&grown[..10], &content.as_bytes()[..10]);
    assert!(grown[10..].iter().all(|&b| b == 0));
    assert_eq!(fs.usage().expect("usage").used_blocks, base + 2);
    assert_consistent(&fs);
}

#[test]
fn truncate_is_journaled_with_its_target_size() {
    let (_tf, mut fs) = ext3();
    fs.create_file(&[], "f", b"abcdef", false).expect("mkfile");
    fs.truncate_file("/f", 3).expect("truncate");

    let last = fs.find_valid_entries().expect("journal").pop().expect("entry");
    assert_eq!(last.op, JournalOp::Truncate);
    assert_eq!(last.path, "/f");
    assert_eq!(last.content, "3");
}
