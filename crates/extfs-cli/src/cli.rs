use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use extfs_rs::FsKind;
use extfs_rs::constants::{ROOT_PASSWORD, ROOT_USER};

pub const DEFAULT_DISK_LEN: u64 = 4 * 1024 * 1024;

#[derive(Parser)]
#[command(
    name = "extfs-cli",
    author,
    version,
    about = "Format and manipulate ext2/ext3-style partitions inside a disk image"
)]
pub struct Cli {
    #[command(flatten)]
    pub target: TargetArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Which image, which byte range, and who is acting.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    #[arg(long, env = "EXTFS_DISK", default_value = "disk.img")]
    pub disk: PathBuf,

    #[arg(long, env = "EXTFS_START", default_value_t = 0)]
    pub start: u64,

    /// Partition length in bytes; defaults to the rest of the image.
    #[arg(long, env = "EXTFS_SIZE")]
    pub size: Option<u64>,

    #[arg(long, env = "EXTFS_USER", default_value = ROOT_USER)]
    pub user: String,

    #[arg(long, env = "EXTFS_PASSWORD", default_value = ROOT_PASSWORD, hide_env_values = true)]
    pub password: String,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a zero-filled disk image.
    Mkdisk {
        #[arg(long, default_value_t = DEFAULT_DISK_LEN)]
        len: u64,
    },

    /// Format the partition.
    Mkfs {
        #[arg(long = "fs", value_enum, default_value_t = FsArg::Ext2)]
        kind: FsArg,
    },

    Mkdir {
        path: String,

        /// Create missing parent directories.
        #[arg(short = 'p', long)]
        parents: bool,
    },

    Mkfile {
        path: String,

        /// Create missing parent directories.
        #[arg(short = 'r', long)]
        parents: bool,

        /// Fill with `size` bytes of repeating digits.
        #[arg(long, conflicts_with = "cont")]
        size: Option<usize>,

        /// Literal file content.
        #[arg(long)]
        cont: Option<String>,
    },

    Cat {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Replace the content of a file.
    Edit {
        path: String,

        #[arg(long)]
        cont: String,
    },

    /// Remove a file or a directory tree.
    Rm { path: String },

    Rename { path: String, new_name: String },

    Truncate { path: String, size: u32 },

    Ls {
        #[arg(default_value = "/")]
        path: String,
    },

    Tree,

    /// Search by name; `*` and `?` are wildcards.
    Find {
        #[arg(default_value = "/")]
        path: String,

        #[arg(long)]
        name: String,
    },

    Stat { path: String },

    /// Show superblock counters and bitmap population.
    Usage,

    /// Print the journal, oldest entry first.
    Journal,

    /// Wipe bitmaps, inode table and blocks, keeping the journal.
    Loss,

    /// Rebuild the filesystem from the journal.
    Recovery,

    Mkgrp { name: String },

    Rmgrp { name: String },

    Mkusr {
        name: String,
        password: String,
        group: String,
    },

    Rmusr { name: String },

    Chgrp { user: String, group: String },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum FsArg {
    Ext2,
    Ext3,
}

impl From<FsArg> for FsKind {
    fn from(arg: FsArg) -> Self {
        match arg {
            FsArg::Ext2 => Self::Ext2,
            FsArg::Ext3 => Self::Ext3,
        }
    }
}
