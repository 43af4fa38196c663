
use crate::constants::{INODE_PTRS, INODE_SIZE};
use crate::error::{FsError, FsResult};
use crate::layout::codec::{
    OnDisk, ensure_len, get_i64, get_index, get_u32, put_i64, put_index, put_u32,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InodeKind {
    Directory,
    File,
}

impl InodeKind {
    fn from_byte(byte: u8) -> FsResult<Self> {
        match byte {
            b'0' => Ok(Self::Directory),
            b'1' => Ok(Self::File),
            other => Err(FsError::Corrupt(format!("inode type byte {other:#04x}"))),
        }
    }

    const fn to_byte(self) -> u8 {
        match self {
            Self::Directory => b'0',
            Self::File => b'1',
        }
    }
}

impl std::fmt::Display for InodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Directory => f.pad("dir"),
            Self::File => f.pad("file"),
        }
    }
}

/// Three octal permission digits stored as ASCII (`"664"`). Advisory only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permissions([u8; 3]);

impl Permissions {
    pub const ALL_OPEN: Self = Self(*b"777");
    pub const DEFAULT: Self = Self(*b"664");

    /// # Errors
    /// Fails unless `text` is exactly three digits between 0 and 7.
    pub fn parse(text: &str) -> FsResult<Self> {
        let bytes: [u8; 3] = text
            .as_bytes()
            .try_into()
            .map_err(|_| FsError::Corrupt(format!("permissions {text:?}")))?;
        if !bytes.iter().all(|b| (b'0'..=b'7').contains(b)) {
            return Err(FsError::Corrupt(format!("permissions {text:?}")));
        }
        Ok(Self(bytes))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).unwrap_or("???")
    }
}

impl std::fmt::Display for Permissions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inode record. Slots 0..12 are direct, 12 single, 13 double and 14 triple indirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inode {
    pub uid: u32,
    pub gid: u32,
    pub size: u32,
    pub atime: i64,
    pub ctime: i64,
    pub mtime: i64,
    pub block: [Option<u32>; INODE_PTRS],
    pub kind: InodeKind,
    pub perm: Permissions,
}

impl Inode {
    #[must_use]
    pub const fn new(kind: InodeKind, perm: Permissions, uid: u32, gid: u32, now: i64) -> Self {
        Self {
            uid,
            gid,
            size: 0,
            atime: now,
            ctime: now,
            mtime: now,
            block: [None; INODE_PTRS],
            kind,
            perm,
        }
    }

    #[must_use]
    pub const fn is_dir(&self) -> bool {
        matches!(self.kind, InodeKind::Directory)
    }

    #[must_use]
    pub const fn is_file(&self) -> bool {
        matches!(self.kind, InodeKind::File)
    }
}

impl OnDisk for Inode {
    const SIZE: usize = INODE_SIZE;

    fn from_bytes(buf: &[u8]) -> FsResult<Self> {
        ensure_len(buf, Self::SIZE, "inode")?;
        let mut block = [None; INODE_PTRS];
        for (i, slot) in block.iter_mut().enumerate() {
            *slot = get_index(buf, 36 + i * 4);
        }
        let perm_text = std::str::from_utf8(&buf[97..100])
            .map_err(|_| FsError::Corrupt("inode permissions".into()))?;
        Ok(Self {
            uid: get_u32(buf, 0),
            gid: get_u32(buf, 4),
            size: get_u32(buf, 8),
            atime: get_i64(buf, 12),
            ctime: get_i64(buf, 20),
            mtime: get_i64(buf, 28),
            block,
            kind: InodeKind::from_byte(buf[96])?,
            perm: Permissions::parse(perm_text)?,
        })
    }

    fn write_bytes(&self, buf: &mut [u8]) {
        buf[..Self::SIZE].fill(0);
        put_u32(buf, 0, self.uid);
        put_u32(buf, 4, self.gid);
        put_u32(buf, 8, self.size);
        put_i64(buf, 12, self.atime);
        put_i64(buf, 20, self.ctime);
        put_i64(buf, 28, self.mtime);
        for (i, slot) in self.block.iter().enumerate() {
            put_index(buf, 36 + i * 4, *slot);
        }
        buf[96] = self.kind.to_byte();
        buf[97..100].copy_from_slice(&self.perm.0);
    }
}
