use super::*;

#[test]
fn new_folder_block_links_self_and_parent() {
    let fb = FolderBlock::new(7, 3);
    assert_eq!(fb.entries[0], FolderEntry::new(".", 7));
    assert_eq!(fb.parent(), Some(3));
    assert_eq!(fb.free_slot(), Some(FIRST_CHILD_SLOT));
    assert_eq!(fb.children().count(), 0);
}

#[test]
fn folder_block_layout_is_name_then_index() {
    let mut fb = FolderBlock::new(0, 0);
    fb.entries[2] = FolderEntry::new("users.txt", 1);

    let mut buf = [0u8; BLOCK_SIZE];
    fb.write_bytes(&mut buf);
    assert_eq!(&buf[32..41], b"users.txt");
    assert!(buf[41..44].iter().all(|&b| b == 0));
    assert_eq!(&buf[44..48], &1i32.to_le_bytes());
    assert_eq!(&buf[60..64], &(-1i32).to_le_bytes(), "free slot is unset");
    assert!(buf[48..60].iter().all(|&b| b == 0), "free slot name is zeroed");

    assert_eq!(FolderBlock::from_bytes(&buf).expect("decode"), fb);
}

#[test]
fn lookup_skips_dot_entries_and_ignores_case() {
    let mut fb = FolderBlock::new(4, 0);
    fb.entries[3] = FolderEntry::new("Docs", 9);

    assert_eq!(fb.find("docs"), Some((3, 9)));
    assert_eq!(fb.find("DOCS"), Some((3, 9)));
    assert_eq!(fb.find("."), None);
    assert_eq!(fb.find(".."), None);
    assert_eq!(fb.free_slot(), Some(2));
}

#[test]
fn names_are_validated() {
    assert!(validate_name("a.txt").is_ok());
    assert!(validate_name("exactly12chr").is_ok());
    assert!(matches!(
        validate_name("thirteen-char"),
        Err(FsError::NameTooLong { max: 12, .. })
    ));
    for bad in ["", ".", "..", "a/b"] {
        assert!(matches!(validate_name(bad), Err(FsError::InvalidName(_))));
    }
}

#[test]
fn pointer_block_tracks_free_slots() {
    let mut pb = PointerBlock::empty();
    assert!(pb.is_empty());
    pb.ptrs[0] = Some(10);
    pb.ptrs[1] = Some(11);
    assert_eq!(pb.first_free(), Some(2));

    let mut buf = [0u8; BLOCK_SIZE];
    pb.write_bytes(&mut buf);
    assert_eq!(&buf[8..12], &(-1i32).to_le_bytes());
    assert_eq!(PointerBlock::from_bytes(&buf).expect("decode"), pb);
}

#[test]
fn data_block_pads_short_chunks() {
    let block = DataBlock::from_chunk(b"hello");
    assert_eq!(&block.0[..5], b"hello");
    assert!(block.0[5..].iter().all(|&b| b == 0));
}
