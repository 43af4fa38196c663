use std::path::Path;

use anyhow::{Context, bail};
use extfs_rs::fs::{FileSystem, FormatOptions, TreeNode, generate_content, split_path};
use extfs_rs::retention::disk::Disk;
use extfs_rs::Session;
use tracing::info;

use crate::cli::{Cli, Command, TargetArgs};

const MOUNT_ID: &str = "cli";

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let target = cli.target;
    match cli.command {
        Command::Mkdisk { len } => mkdisk(&target.disk, len),
        Command::Mkfs { kind } => {
            let session = mounted(&target)?;
            let fs = session.format(MOUNT_ID, FormatOptions { kind: kind.into() })?;
            print_usage(&fs)
        }
        command @ (Command::Journal | Command::Loss | Command::Recovery) => {
            let session = mounted(&target)?;
            run_maintenance(&session, &command)
        }
        command => {
            let mut session = mounted(&target)?;
            session.login(&target.user, &target.password, MOUNT_ID)?;
            run_logged_in(&session, command)
        }
    }
}

fn mkdisk(path: &Path, len: u64) -> anyhow::Result<()> {
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    let disk = Disk::create(path, len)?;
    disk.sync()?;
    info!(path = %path.display(), len, "created disk image");
    Ok(())
}

/// `mounted` registers the target range in a fresh session.
fn mounted(target: &TargetArgs) -> anyhow::Result<Session> {
    let size = match target.size {
        Some(size) => size,
        None => {
            let len = std::fs::metadata(&target.disk)
                .with_context(|| format!("failed to stat {}", target.disk.display()))?
                .len();
            len.checked_sub(target.start)
                .with_context(|| format!("start {} is past the end of the image", target.start))?
        }
    };

    let mut session = Session::new();
    session.mount(MOUNT_ID, "cli", &target.disk, target.start, size)?;
    Ok(session)
}

fn run_logged_in(session: &Session, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Mkgrp { name } => {
            let id = session.mkgrp(&name)?;
            println!("group {name} created with id {id}");
            return Ok(());
        }
        Command::Rmgrp { name } => {
            let users = session.rmgrp(&name)?;
            println!("group {name} removed with {users} user(s)");
            return Ok(());
        }
        Command::Mkusr { name, password, group } => {
            let id = session.mkusr(&name, &password, &group)?;
            println!("user {name} created with id {id}");
            return Ok(());
        }
        Command::Rmusr { name } => {
            session.rmusr(&name)?;
            println!("user {name} removed");
            return Ok(());
        }
        Command::Chgrp { user, group } => {
            session.chgrp(&user, &group)?;
            println!("user {user} moved to {group}");
            return Ok(());
        }
        _ => {}
    }

    let mut fs = session.open_fs()?;
    match command {
        Command::Mkdir { path, parents } => {
            let (dirs, name) = leaf(&path)?;
            let index = fs.create_directory(&dirs, name, parents)?;
            println!("{path} -> inode {index}");
        }
        Command::Mkfile {
            path,
            parents,
            size,
            cont,
        } => {
            let (dirs, name) = leaf(&path)?;
            let content = match (cont, size) {
                (Some(text), _) => text,
                (None, Some(size)) => generate_content(size),
                (None, None) => String::new(),
            };
            let index = fs.create_file(&dirs, name, content.as_bytes(), parents)?;
            println!("{path} -> inode {index} ({} bytes)", content.len());
        }
        Command::Cat { paths } => {
            for path in paths {
                let data = fs.read_file(&path)?;
                println!("{}", String::from_utf8_lossy(&data));
            }
        }
        Command::Edit { path, cont } => {
            fs.edit_file(&path, cont.as_bytes())?;
            println!("{path} rewritten ({} bytes)", cont.len());
        }
        Command::Rm { path } => {
            fs.remove(&path)?;
            println!("{path} removed");
        }
        Command::Rename { path, new_name } => {
            let (dirs, name) = leaf(&path)?;
            fs.rename_entry(&dirs, name, &new_name)?;
            println!("{path} renamed to {new_name}");
        }
        Command::Truncate { path, size } => {
            fs.truncate_file(&path, size)?;
            println!("{path} truncated to {size} bytes");
        }
        Command::Ls { path } => {
            for entry in fs.list_directory(&path)? {
                println!("{:>6}  {:<4}  {}", entry.inode, entry.kind, entry.name);
            }
        }
        Command::Tree => print_tree(&fs.tree()?, 0),
        Command::Find { path, name } => {
            for hit in fs.find(&path, &name)? {
                println!("{hit}");
            }
        }
        Command::Stat { path } => {
            let (index, inode) = fs.stat(&path)?;
            println!("inode:  {index}");
            println!("kind:   {}", inode.kind);
            println!("size:   {}", inode.size);
            println!("owner:  {}:{}", inode.uid, inode.gid);
            println!("perm:   {}", inode.perm);
            println!("atime:  {}", inode.atime);
            println!("ctime:  {}", inode.ctime);
            println!("mtime:  {}", inode.mtime);
            println!("blocks: {:?}", fs.resolve_all_block_indices(&inode)?);
        }
        Command::Usage => print_usage(&fs)?,
        Command::Mkdisk { .. }
        | Command::Mkfs { .. }
        | Command::Journal
        | Command::Loss
        | Command::Recovery
        | Command::Mkgrp { .. }
        | Command::Rmgrp { .. }
        | Command::Mkusr { .. }
        | Command::Rmusr { .. }
        | Command::Chgrp { .. } => bail!("command does not operate on an open filesystem"),
    }
    fs.sync()?;
    Ok(())
}

/// `run_maintenance` handles the journal commands. They run without a login because the
/// users file is unreadable between a loss and the recovery that follows it.
fn run_maintenance(session: &Session, command: &Command) -> anyhow::Result<()> {
    let mut fs = session.open_mount(MOUNT_ID)?;
    match command {
        Command::Journal => {
            for entry in fs.find_valid_entries()? {
                println!(
                    "{:>4}  {:<8}  {:<32}  {:?}  @{}",
                    entry.seq, entry.op, entry.path, entry.content, entry.timestamp
                );
            }
        }
        Command::Loss => {
            fs.simulate_loss()?;
            println!("structures wiped; run `recovery` to rebuild from the journal");
        }
        Command::Recovery => {
            let report = fs.recover()?;
            println!(
                "replayed {} entries, skipped {}{}",
                report.replayed,
                report.skipped,
                if report.reseeded_users { ", users file re-seeded" } else { "" }
            );
        }
        _ => bail!("not a journal command"),
    }
    fs.sync()?;
    Ok(())
}

/// `leaf` splits a path into parent segments and a non-empty final name.
fn leaf(path: &str) -> anyhow::Result<(Vec<&str>, &str)> {
    let (dirs, name) = split_path(path);
    if name.is_empty() {
        bail!("{path:?} does not name an entry");
    }
    Ok((dirs, name))
}

fn print_tree(node: &TreeNode, depth: usize) {
    println!("{:indent$}{} [{} #{}, {} B]", "", node.name, node.kind, node.inode, node.size, indent = depth * 2);
    for child in &node.children {
        print_tree(child, depth + 1);
    }
}

fn print_usage(fs: &FileSystem) -> anyhow::Result<()> {
    let usage = fs.usage()?;
    println!("kind:   {}", usage.kind);
    println!(
        "inodes: {} used / {} free / {} total ({} bits set)",
        usage.used_inodes, usage.free_inodes, usage.total_inodes, usage.inode_bits_set
    );
    println!(
        "blocks: {} used / {} free / {} total ({} bits set)",
        usage.used_blocks, usage.free_blocks, usage.total_blocks, usage.block_bits_set
    );
    Ok(())
}
