//! Journal entry record.

#[cfg(test)]
mod journal_tests;

use crate::constants::{
    JOURNAL_CONTENT_LEN, JOURNAL_ENTRY_SIZE, JOURNAL_OP_LEN, JOURNAL_PATH_LEN,
};
use crate::error::{FsError, FsResult};
use crate::layout::codec::{
    OnDisk, ensure_len, get_i64, get_str, get_u32, put_i64, put_str, put_u32,
};

/// Mutating operations recorded in the journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalOp {
    MkDir,
    MkFile,
    Remove,
    RemoveDir,
    Rename,
    Edit,
    Truncate,
}

impl JournalOp {
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::MkDir => "mkdir",
            Self::MkFile => "mkfile",
            Self::Remove => "rm",
            Self::RemoveDir => "rmdir",
            Self::Rename => "rename",
            Self::Edit => "edit",
            Self::Truncate => "truncate",
        }
    }

    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        [
            Self::MkDir,
            Self::MkFile,
            Self::Remove,
            Self::RemoveDir,
            Self::Rename,
            Self::Edit,
            Self::Truncate,
        ]
        .into_iter()
        .find(|op| op.tag() == tag)
    }
}

impl std::fmt::Display for JournalOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.tag())
    }
}

/// One journal slot. `seq` orders entries across wraparound. The content length is stored
/// alongside the payload, so trailing NUL bytes survive a round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntry {
    pub seq: u32,
    pub op: JournalOp,
    pub path: String,
    pub content: String,
    pub timestamp: i64,
}

const OP_OFF: usize = 4;
const LEN_OFF: usize = OP_OFF + JOURNAL_OP_LEN;
const PATH_OFF: usize = LEN_OFF + 1;
const CONTENT_OFF: usize = PATH_OFF + JOURNAL_PATH_LEN;
const TIME_OFF: usize = CONTENT_OFF + JOURNAL_CONTENT_LEN;

/// `slot_is_empty` reports whether an encoded slot has an all-zero operation tag.
#[must_use]
pub fn slot_is_empty(buf: &[u8]) -> bool {
    buf[OP_OFF..LEN_OFF].iter().all(|&b| b == 0)
}

/// `slot_seq` reads the sequence number of an encoded slot without decoding the rest.
#[must_use]
pub fn slot_seq(buf: &[u8]) -> u32 {
    get_u32(buf, 0)
}

impl OnDisk for JournalEntry {
    const SIZE: usize = JOURNAL_ENTRY_SIZE;

    fn from_bytes(buf: &[u8]) -> FsResult<Self> {
        ensure_len(buf, Self::SIZE, "journal entry")?;
        let tag = get_str(buf, OP_OFF, JOURNAL_OP_LEN)?;
        let op = JournalOp::from_tag(&tag)
            .ok_or_else(|| FsError::Corrupt(format!("journal operation {tag:?}")))?;
        Ok(Self {
            seq: get_u32(buf, 0),
            op,
            path: get_str(buf, PATH_OFF, JOURNAL_PATH_LEN)?,
            content: content_field(buf)?,
            timestamp: get_i64(buf, TIME_OFF),
        })
    }

    fn write_bytes(&self, buf: &mut [u8]) {
        put_u32(buf, 0, self.seq);
        put_str(buf, OP_OFF, JOURNAL_OP_LEN, self.op.tag());
        put_str(buf, PATH_OFF, JOURNAL_PATH_LEN, &self.path);
        put_str(buf, CONTENT_OFF, JOURNAL_CONTENT_LEN, &self.content);
        buf[LEN_OFF] = u8::try_from(self.content.len().min(JOURNAL_CONTENT_LEN)).unwrap_or(u8::MAX);
        put_i64(buf, TIME_OFF, self.timestamp);
    }
}

/// `content_field` decodes exactly the stored number of content bytes.
fn content_field(buf: &[u8]) -> FsResult<String> {
    let len = usize::from(buf[LEN_OFF]);
    if len > JOURNAL_CONTENT_LEN {
        return Err(FsError::Corrupt(format!("journal content length {len}")));
    }
    let raw = &buf[CONTENT_OFF..CONTENT_OFF + len];
    std::str::from_utf8(raw)
        .map(str::to_owned)
        .map_err(|_| FsError::Corrupt("non utf-8 journal content".into()))
}
