use super::*;
use crate::retention::disk::Disk;
use tempfile::NamedTempFile;

fn partition() -> (NamedTempFile, Partition) {
    let tf = NamedTempFile::new().expect("tmp file");
    let disk = Disk::create(tf.path(), 8192).expect("disk");
    (tf, Partition::new(disk, 0, 8192).expect("partition"))
}

#[test]
fn bit_order_is_lsb_first() {
    let mut bytes = [0u8; 2];

    set_bit(&mut bytes, 0, true);
    assert_eq!(bytes[0], 0b0000_0001);

    set_bit(&mut bytes, 7, true);
    assert_eq!(bytes[0], 0b1000_0001);

    set_bit(&mut bytes, 8, true);
    assert!(get_bit(&bytes, 8));
    assert_eq!(bytes[1], 0b0000_0001);

    set_bit(&mut bytes, 7, false);
    assert!(!get_bit(&bytes, 7));
    assert_eq!(bytes[0], 0b0000_0001);
}

#[test]
fn create_zero_fills_ceil_bytes() {
    let (_tf, mut part) = partition();
    part.write_at(100, &[0xFFu8; 8]).expect("dirty");

    let bm = Bitmap::new("block", 100, 13);
    assert_eq!(bm.byte_len(), 2);
    bm.create(&mut part).expect("create");

    let mut raw = [0u8; 3];
    part.read_at(100, &mut raw).expect("read");
    assert_eq!(raw, [0, 0, 0xFF], "only ceil(13/8) bytes are cleared");
}

#[test]
fn find_free_is_first_fit() {
    let (_tf, mut part) = partition();
    let bm = Bitmap::new("inode", 0, 20);
    bm.create(&mut part).expect("create");

    for i in [0, 1, 2, 4] {
        bm.set(&mut part, i, true).expect("set");
    }
    assert_eq!(bm.find_free(&part).expect("free"), 3);

    bm.set(&mut part, 3, true).expect("set");
    assert_eq!(bm.find_free(&part).expect("free"), 5);

    bm.set(&mut part, 1, false).expect("clear");
    assert_eq!(bm.find_free(&part).expect("free"), 1);
    assert_eq!(bm.count_set(&part).expect("count"), 4);
}

#[test]
fn exhausted_bitmap_reports_region() {
    let (_tf, mut part) = partition();
    let bm = Bitmap::new("inode", 0, 3);
    bm.create(&mut part).expect("create");
    for i in 0..3 {
        bm.set(&mut part, i, true).expect("set");
    }

    let err = bm.find_free(&part).unwrap_err();
    assert_eq!(err.to_string(), "no free inode slot");
}

#[test]
fn index_past_count_is_rejected() {
    let (_tf, mut part) = partition();
    let bm = Bitmap::new("block", 0, 10);
    assert!(matches!(
        bm.set(&mut part, 10, true),
        Err(FsError::InvalidIndex {
            region: "block",
            index: 10
        })
    ));
    assert!(bm.is_set(&part, 9).is_ok());
}
