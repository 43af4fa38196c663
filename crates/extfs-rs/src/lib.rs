//! ext2/ext3-style filesystem engine stored inside a byte range of a disk image.

pub mod constants;
pub mod error;
pub mod fs;
pub mod layout;
pub mod retention;
pub mod session;
pub mod users;

pub use error::{FsError, FsResult};
pub use fs::{FileSystem, FormatOptions, Owner};
pub use layout::superblock::FsKind;
pub use session::Session;
