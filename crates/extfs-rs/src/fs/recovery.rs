//! Crash simulation and journal-replay recovery.

use tracing::{debug, info, warn};

use super::{FileSystem, join_path, split_path, unix_now};
use crate::constants::{DEFAULT_USERS, ROOT_INODE, USERS_FILE};
use crate::error::{FsError, FsResult};
use crate::layout::blocks::names_match;
use crate::layout::inode::Permissions;
use crate::layout::journal::{JournalEntry, JournalOp};

/// Outcome of a recovery run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    pub replayed: usize,
    pub skipped: usize,
    pub reseeded_users: bool,
}

impl FileSystem {
    /// `simulate_loss` zeroes both bitmaps, the inode table and the block region, keeping
    /// the superblock and journal.
    ///
    /// # Errors
    /// Fails with [`FsError::NotJournaled`] on a plain filesystem, or on I/O failure.
    pub fn simulate_loss(&mut self) -> FsResult<()> {
        if !self.sb.is_journaled() {
            return Err(FsError::NotJournaled);
        }
        self.wipe_structures()?;
        warn!("filesystem structures wiped");
        Ok(())
    }

    fn wipe_structures(&mut self) -> FsResult<()> {
        let start = self.sb.bm_inode_start;
        let end = self.sb.region_end();
        self.part.zero_range(start, end - start)
    }

    /// `recover` rebuilds the filesystem from the journal: wipe every structure, recreate
    /// the root, replay each logged operation in order, then persist the superblock.
    /// Entries that no longer apply are skipped.
    ///
    /// # Errors
    /// Fails with [`FsError::NotJournaled`] on a plain filesystem, or if the journal or the
    /// structure regions cannot be read or written.
    pub fn recover(&mut self) -> FsResult<RecoveryReport> {
        if !self.sb.is_journaled() {
            return Err(FsError::NotJournaled);
        }
        let entries = self.find_valid_entries()?;

        self.wipe_structures()?;
        self.sb.reset_counters();
        self.save_superblock()?;
        self.create_root()?;

        let mut report = RecoveryReport::default();
        self.replaying = true;
        for entry in &entries {
            match self.replay(entry) {
                Ok(()) => {
                    report.replayed += 1;
                    debug!(seq = entry.seq, op = %entry.op, path = %entry.path, "replayed");
                }
                Err(err) => {
                    report.skipped += 1;
                    warn!(seq = entry.seq, op = %entry.op, path = %entry.path, %err, "skipped journal entry");
                }
            }
        }
        self.replaying = false;

        let root = self.load_inode(ROOT_INODE)?;
        if self.find_entry(&root, USERS_FILE)?.is_none() {
            self.make_file(ROOT_INODE, USERS_FILE, DEFAULT_USERS.as_bytes(), Permissions::ALL_OPEN)?;
            report.reseeded_users = true;
        }

        self.sb.mtime = unix_now();
        self.save_superblock()?;
        info!(
            replayed = report.replayed,
            skipped = report.skipped,
            "recovered filesystem from journal"
        );
        Ok(report)
    }

    fn replay(&mut self, entry: &JournalEntry) -> FsResult<()> {
        let (parents, name) = split_path(&entry.path);
        match entry.op {
            JournalOp::MkDir if name.is_empty() => Ok(()),
            JournalOp::MkDir => self.create_directory(&parents, name, true).map(|_| ()),
            JournalOp::MkFile if parents.is_empty() && names_match(name, USERS_FILE) => {
                let root = self.load_inode(ROOT_INODE)?;
                if self.find_entry(&root, name)?.is_some() {
                    return Err(FsError::AlreadyExists(entry.path.clone()));
                }
                let content = entry.content.as_bytes();
                self.make_file(ROOT_INODE, USERS_FILE, content, Permissions::ALL_OPEN)
                    .map(|_| ())
            }
            JournalOp::MkFile => self
                .create_file(&parents, name, entry.content.as_bytes(), true)
                .map(|_| ()),
            JournalOp::Remove => self.delete_file(&parents, name),
            JournalOp::RemoveDir => self.delete_directory(&parents, name),
            JournalOp::Rename => self.rename_entry(&parents, name, &entry.content),
            JournalOp::Edit => self.edit_file(&join_path(&parents, name), entry.content.as_bytes()),
            JournalOp::Truncate => {
                let size = entry.content.parse().map_err(|_| {
                    FsError::Corrupt(format!("truncate size {:?}", entry.content))
                })?;
                self.truncate_file(&join_path(&parents, name), size)
            }
        }
    }
}
