//! Write-ahead journal stored between the superblock and the inode bitmap.

use tracing::{debug, warn};

use super::{FileSystem, unix_now};
use crate::constants::{
    JOURNAL_CONTENT_LEN, JOURNAL_ENTRIES, JOURNAL_ENTRY_SIZE, JOURNAL_PATH_LEN,
};
use crate::error::{FsError, FsResult};
use crate::layout::codec::{OnDisk, truncate_utf8};
use crate::layout::journal::{JournalEntry, JournalOp, slot_is_empty, slot_seq};

impl FileSystem {
    fn slot_offset(&self, slot: usize) -> u64 {
        self.sb.journal_region_start() + (slot * JOURNAL_ENTRY_SIZE) as u64
    }

    fn read_slot(&self, slot: usize) -> FsResult<[u8; JOURNAL_ENTRY_SIZE]> {
        let mut buf = [0u8; JOURNAL_ENTRY_SIZE];
        self.part.read_at(self.slot_offset(slot), &mut buf)?;
        Ok(buf)
    }

    /// `init_journal` empties every journal slot.
    pub(crate) fn init_journal(&mut self) -> FsResult<()> {
        let start = self.sb.journal_region_start();
        let len = self.sb.journal_region_end() - start;
        self.part.zero_range(start, len)?;
        self.part.flush_range(start, len as usize)
    }

    /// `log` appends to the journal when the filesystem is journaled and not replaying.
    pub(crate) fn log(&mut self, op: JournalOp, path: &str, content: &str) -> FsResult<()> {
        if !self.sb.is_journaled() || self.replaying {
            return Ok(());
        }
        self.journal_append(op, path, content)
    }

    /// `journal_append` records one operation and flushes it to the image.
    ///
    /// The entry goes into the first empty slot. When the log is full the entry with the
    /// lowest sequence number is overwritten. Paths longer than the slot are not recorded;
    /// content is cut to the slot width.
    ///
    /// # Errors
    /// Fails with [`FsError::NotJournaled`] on a plain filesystem, or on I/O failure.
    pub fn journal_append(&mut self, op: JournalOp, path: &str, content: &str) -> FsResult<()> {
        if !self.sb.is_journaled() {
            return Err(FsError::NotJournaled);
        }
        if path.len() > JOURNAL_PATH_LEN {
            warn!(%op, path, "path does not fit in a journal entry; not recorded");
            return Ok(());
        }
        let stored = truncate_utf8(content, JOURNAL_CONTENT_LEN);
        if stored.len() < content.len() {
            warn!(%op, path, len = content.len(), "journal content truncated");
        }

        let mut first_empty = None;
        let mut oldest: Option<(u32, usize)> = None;
        let mut last_seq = 0u32;
        for slot in 0..JOURNAL_ENTRIES {
            let raw = self.read_slot(slot)?;
            if slot_is_empty(&raw) {
                first_empty.get_or_insert(slot);
                continue;
            }
            // Unreadable slots count as the oldest so they are reused first.
            let seq = JournalEntry::from_bytes(&raw).map_or(0, |_| slot_seq(&raw));
            last_seq = last_seq.max(seq);
            if oldest.is_none_or(|(s, _)| seq < s) {
                oldest = Some((seq, slot));
            }
        }
        let slot = first_empty.or(oldest.map(|(_, slot)| slot)).unwrap_or(0);

        let entry = JournalEntry {
            seq: last_seq.wrapping_add(1),
            op,
            path: path.to_owned(),
            content: stored.to_owned(),
            timestamp: unix_now(),
        };
        let off = self.slot_offset(slot);
        self.part.write_struct(off, &entry)?;
        self.part.flush_range(off, JOURNAL_ENTRY_SIZE)?;
        debug!(slot, seq = entry.seq, %op, path, "journaled");
        Ok(())
    }

    /// `find_valid_entries` returns the decodable entries, oldest first. Scanning stops at
    /// the first empty slot; slots with an unknown tag are skipped.
    ///
    /// # Errors
    /// Fails with [`FsError::NotJournaled`] on a plain filesystem, or if the journal region
    /// cannot be read.
    pub fn find_valid_entries(&self) -> FsResult<Vec<JournalEntry>> {
        if !self.sb.is_journaled() {
            return Err(FsError::NotJournaled);
        }
        let mut entries = Vec::new();
        for slot in 0..JOURNAL_ENTRIES {
            let raw = self.read_slot(slot)?;
            if slot_is_empty(&raw) {
                break;
            }
            match JournalEntry::from_bytes(&raw) {
                Ok(entry) => entries.push(entry),
                Err(err) => warn!(slot, %err, "skipping journal slot"),
            }
        }
        entries.sort_by_key(|e| e.seq);
        Ok(entries)
    }
}
