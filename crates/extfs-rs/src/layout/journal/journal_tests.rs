use super::*;

#[test]
fn tags_roundtrip_through_names() {
    for op in [
        JournalOp::MkDir,
        JournalOp::MkFile,
        JournalOp::Remove,
        JournalOp::RemoveDir,
        JournalOp::Rename,
        JournalOp::Edit,
        JournalOp::Truncate,
    ] {
        assert_eq!(JournalOp::from_tag(op.tag()), Some(op));
    }
    assert_eq!(JournalOp::from_tag("cat"), None);
}

#[test]
fn entry_fields_land_at_fixed_offsets() {
    let entry = JournalEntry {
        seq: 3,
        op: JournalOp::MkFile,
        path: "/a/f.txt".into(),
        content: "hello".into(),
        timestamp: 1_700_000_000,
    };
    let mut buf = [0u8; JOURNAL_ENTRY_SIZE];
    entry.write_bytes(&mut buf);

    assert_eq!(&buf[0..4], &3u32.to_le_bytes());
    assert_eq!(&buf[4..10], b"mkfile");
    assert_eq!(buf[13], 5);
    assert_eq!(&buf[14..22], b"/a/f.txt");
    assert_eq!(&buf[46..51], b"hello");
    assert_eq!(&buf[110..118], &1_700_000_000i64.to_le_bytes());
    assert!(!slot_is_empty(&buf));
    assert_eq!(slot_seq(&buf), 3);

    assert_eq!(JournalEntry::from_bytes(&buf).expect("decode"), entry);
}

#[test]
fn zeroed_slot_is_empty_and_garbage_tag_is_corrupt() {
    let mut buf = [0u8; JOURNAL_ENTRY_SIZE];
    assert!(slot_is_empty(&buf));

    buf[4..8].copy_from_slice(b"junk");
    assert!(!slot_is_empty(&buf));
    let err = JournalEntry::from_bytes(&buf).unwrap_err();
    assert!(err.to_string().contains("journal operation"));
}

#[test]
fn trailing_nul_bytes_survive_decode() {
    let entry = JournalEntry {
        seq: 1,
        op: JournalOp::Edit,
        path: "/f".into(),
        content: "ab\0\0".into(),
        timestamp: 0,
    };
    let mut buf = [0u8; JOURNAL_ENTRY_SIZE];
    entry.write_bytes(&mut buf);

    let decoded = JournalEntry::from_bytes(&buf).expect("decode");
    assert_eq!(decoded.content.as_bytes(), b"ab\0\0");
}

#[test]
fn oversized_content_length_is_corrupt() {
    let mut buf = [0u8; JOURNAL_ENTRY_SIZE];
    JournalEntry {
        seq: 1,
        op: JournalOp::Edit,
        path: "/f".into(),
        content: "x".into(),
        timestamp: 0,
    }
    .write_bytes(&mut buf);
    buf[13] = 65;
    assert!(JournalEntry::from_bytes(&buf).is_err());
}
