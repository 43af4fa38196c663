use super::{Identity, Record, UsersTable, validate_field};
use crate::constants::{DEFAULT_USERS, ROOT_PASSWORD, ROOT_USER};
use crate::error::FsError;
use crate::fs::test_support::{ext2, ext3};

fn default_table() -> UsersTable {
    UsersTable::parse(DEFAULT_USERS).expect("parse defaults")
}

#[test]
fn defaults_hold_root_group_and_user() {
    let table = default_table();
    assert_eq!(table.records().len(), 2);
    assert_eq!(table.find_group("root").map(|g| g.id), Some(1));
    let root = table.find_user(ROOT_USER).expect("root user");
    assert_eq!((root.id, root.group.as_str()), (1, "root"));
    assert_eq!(table.render(), DEFAULT_USERS);
}

#[test]
fn parse_reports_malformed_line() {
    let err = UsersTable::parse("1,G,root\n\n2,X,what\n").unwrap_err();
    assert!(matches!(err, FsError::MalformedUsers { line: 3, .. }));
    assert!(UsersTable::parse("x,G,root\n").is_err());
}

#[test]
fn ids_grow_per_record_kind() {
    let mut table = default_table();
    assert_eq!(table.add_group("dev").expect("mkgrp"), 2);
    assert_eq!(table.add_group("ops").expect("mkgrp"), 3);
    assert_eq!(table.add_user("ana", "pw", "dev").expect("mkusr"), 2);
    assert!(table.render().ends_with("2,U,dev,ana,pw\n"));
}

#[test]
fn duplicate_and_missing_names_are_rejected() {
    let mut table = default_table();
    assert!(matches!(table.add_group("root"), Err(FsError::GroupExists(_))));
    assert!(matches!(
        table.add_user("bob", "pw", "nope"),
        Err(FsError::GroupNotFound(_))
    ));
    assert!(matches!(
        table.add_user("root", "pw", "root"),
        Err(FsError::UserExists(_))
    ));
    assert!(matches!(table.remove_user("ghost"), Err(FsError::UserNotFound(_))));
}

#[test]
fn fields_are_bounded_and_separator_free() {
    assert!(validate_field("abcdefghij").is_ok());
    assert!(matches!(
        validate_field("abcdefghijk"),
        Err(FsError::NameTooLong { max: 10, .. })
    ));
    assert!(matches!(validate_field("a,b"), Err(FsError::InvalidName(_))));
    assert!(matches!(validate_field(""), Err(FsError::InvalidName(_))));
}

#[test]
fn removing_a_group_tombstones_its_users() {
    let mut table = default_table();
    table.add_group("dev").expect("mkgrp");
    table.add_user("ana", "pw", "dev").expect("mkusr");
    table.add_user("bob", "pw", "dev").expect("mkusr");
    table.add_user("cid", "pw", "root").expect("mkusr");

    assert_eq!(table.remove_group("dev").expect("rmgrp"), 2);
    assert!(table.find_group("dev").is_none());
    assert!(table.find_user("ana").is_none());
    assert!(table.find_user("cid").is_some());

    let text = table.render();
    assert!(text.contains("0,G,dev\n"));
    assert!(text.contains("0,U,dev,ana,pw\n"));
    assert_eq!(table.records().iter().filter(|r| r.is_removed()).count(), 3);

    // A tombstoned name may be reused.
    assert_eq!(table.add_group("dev").expect("mkgrp again"), 2);
}

#[test]
fn root_accounts_cannot_be_removed() {
    let mut table = default_table();
    assert!(matches!(table.remove_user(ROOT_USER), Err(FsError::PermissionDenied)));
    assert!(matches!(table.remove_group("root"), Err(FsError::PermissionDenied)));
}

#[test]
fn change_group_moves_user() {
    let mut table = default_table();
    table.add_group("dev").expect("mkgrp");
    table.add_user("ana", "pw", "root").expect("mkusr");
    table.change_group("ana", "dev").expect("chgrp");
    assert_eq!(table.find_user("ana").map(|u| u.group.as_str()), Some("dev"));
    assert!(matches!(
        table.change_group("ana", "nope"),
        Err(FsError::GroupNotFound(_))
    ));
}

#[test]
fn authenticate_checks_password_and_liveness() {
    let mut table = default_table();
    assert_eq!(
        table.authenticate(ROOT_USER, ROOT_PASSWORD).expect("login"),
        Identity { uid: 1, gid: 1 }
    );
    assert!(matches!(
        table.authenticate(ROOT_USER, "wrong"),
        Err(FsError::BadCredentials(_))
    ));

    table.add_group("dev").expect("mkgrp");
    table.add_user("ana", "pw", "dev").expect("mkusr");
    assert_eq!(
        table.authenticate("ana", "pw").expect("login"),
        Identity { uid: 2, gid: 2 }
    );
    table.remove_user("ana").expect("rmusr");
    assert!(table.authenticate("ana", "pw").is_err());
}

#[test]
fn table_round_trips_through_users_file() {
    let (_tf, mut fs) = ext2();
    let mut table = fs.load_users().expect("load");
    table.add_group("dev").expect("mkgrp");
    for i in 0..6 {
        table
            .add_user(&format!("user{i}"), "secret", "dev")
            .expect("mkusr");
    }
    fs.save_users(&table).expect("save");

    let back = fs.load_users().expect("reload");
    assert_eq!(back, table);
    assert!(matches!(back.records().last(), Some(Record::User(u)) if u.name == "user5"));
    let (_, inode) = fs.stat("/users.txt").expect("stat");
    assert!(inode.size > 64);
}

#[test]
fn users_rewrites_are_not_journaled() {
    let (_tf, mut fs) = ext3();
    let before = fs.find_valid_entries().expect("journal").len();
    let mut table = fs.load_users().expect("load");
    table.add_group("dev").expect("mkgrp");
    fs.save_users(&table).expect("save");
    assert_eq!(fs.find_valid_entries().expect("journal").len(), before);
}
