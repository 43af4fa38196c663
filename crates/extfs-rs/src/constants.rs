//! On-disk format constants and defaults.

/// MAGIC identifies a formatted partition.
pub const MAGIC: u32 = 0xEF53;
/// BLOCK_SIZE is the size of every data, directory and pointer block in bytes.
pub const BLOCK_SIZE: usize = 64;
/// INODE_SIZE is the encoded size of one inode record.
pub const INODE_SIZE: usize = 100;
/// SUPERBLOCK_SIZE is the encoded size of the superblock.
pub const SUPERBLOCK_SIZE: usize = 100;
/// DIRECT_PTRS is the number of direct block slots in an inode.
pub const DIRECT_PTRS: usize = 12;
/// INODE_PTRS is the total number of block slots in an inode (direct + 3 indirect).
pub const INODE_PTRS: usize = DIRECT_PTRS + 3;
/// POINTERS_PER_BLOCK is the number of block indices held by a pointer block.
pub const POINTERS_PER_BLOCK: usize = BLOCK_SIZE / 4;
/// DIR_ENTRIES is the number of entries in a directory block.
pub const DIR_ENTRIES: usize = 4;
/// NAME_LEN is the maximum length of a directory entry name in bytes.
pub const NAME_LEN: usize = 12;
/// BLOCKS_PER_INODE is the number of blocks reserved per inode at format time.
pub const BLOCKS_PER_INODE: u32 = 3;

/// JOURNAL_ENTRIES is the fixed capacity of the journal.
pub const JOURNAL_ENTRIES: usize = 50;
/// JOURNAL_OP_LEN is the width of the operation tag of a journal entry.
pub const JOURNAL_OP_LEN: usize = 9;
/// JOURNAL_PATH_LEN is the maximum path length stored in a journal entry.
pub const JOURNAL_PATH_LEN: usize = 32;
/// JOURNAL_CONTENT_LEN is the maximum content payload stored in a journal entry.
pub const JOURNAL_CONTENT_LEN: usize = 64;
/// JOURNAL_ENTRY_SIZE is the encoded size of one journal entry.
pub const JOURNAL_ENTRY_SIZE: usize = 4 + JOURNAL_OP_LEN + 1 + JOURNAL_PATH_LEN + JOURNAL_CONTENT_LEN + 8;

/// ROOT_INODE is the inode index of the root directory.
pub const ROOT_INODE: u32 = 0;
/// USERS_FILE is the name of the users file inside the root directory.
pub const USERS_FILE: &str = "users.txt";
/// ROOT_USER is the name of the built-in administrator.
pub const ROOT_USER: &str = "root";
/// ROOT_PASSWORD is the initial password of the built-in administrator.
pub const ROOT_PASSWORD: &str = "123";
/// DEFAULT_USERS is the users file content written at format time.
pub const DEFAULT_USERS: &str = "1,G,root\n1,U,root,root,123\n";
/// ACCOUNT_FIELD_LEN bounds user, group and password fields in the users file.
pub const ACCOUNT_FIELD_LEN: usize = 10;
