//! Error type shared by every filesystem operation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FsError {
    #[error("i/o error during {op} at offset {offset}: {source}")]
    Io {
        op: &'static str,
        offset: u64,
        #[source]
        source: std::io::Error,
    },
    #[error("short {op} at offset {offset}: wanted {wanted} bytes, image ends after {available}")]
    ShortTransfer {
        op: &'static str,
        offset: u64,
        wanted: usize,
        available: usize,
    },
    #[error("range {offset}+{len} lies outside the partition of {size} bytes")]
    OutOfRange { offset: u64, len: usize, size: u64 },
    #[error("partition of {size} bytes is too small to hold a filesystem")]
    PartitionTooSmall { size: u64 },
    #[error("partition is not formatted (magic {found:#06x})")]
    NotFormatted { found: u32 },
    #[error("corrupt {0}")]
    Corrupt(String),

    #[error("no free {region} slot")]
    NoFreeSlot { region: &'static str },
    #[error("{region} index {index} is out of range")]
    InvalidIndex { region: &'static str, index: u32 },
    #[error("block pointer tree is full")]
    IndirectionFull,

    #[error("no such file or directory: {0}")]
    NotFound(String),
    #[error("parent directory not found: {0}")]
    ParentNotFound(String),
    #[error("not a directory: {0}")]
    NotADirectory(String),
    #[error("not a regular file: {0}")]
    NotAFile(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("name {name:?} is longer than {max} bytes")]
    NameTooLong { name: String, max: usize },
    #[error("invalid name {0:?}")]
    InvalidName(String),
    #[error("invalid search pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("filesystem is not journaled")]
    NotJournaled,

    #[error("group {0:?} already exists")]
    GroupExists(String),
    #[error("group {0:?} does not exist")]
    GroupNotFound(String),
    #[error("user {0:?} already exists")]
    UserExists(String),
    #[error("user {0:?} does not exist")]
    UserNotFound(String),
    #[error("malformed users file line {line}: {text:?}")]
    MalformedUsers { line: usize, text: String },
    #[error("invalid credentials for user {0:?}")]
    BadCredentials(String),
    #[error("operation requires the root user")]
    PermissionDenied,
    #[error("no user is logged in")]
    NotLoggedIn,
    #[error("user {0:?} is already logged in")]
    AlreadyLoggedIn(String),
    #[error("no partition mounted with id {0:?}")]
    UnknownMount(String),
}

pub type FsResult<T> = Result<T, FsError>;

impl FsError {
    pub(crate) fn io(op: &'static str, offset: u64, source: std::io::Error) -> Self {
        Self::Io { op, offset, source }
    }
}
