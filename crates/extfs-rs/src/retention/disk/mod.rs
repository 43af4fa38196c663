
use anyhow::Context;
use memmap2::{MmapMut, MmapOptions};
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::{FsError, FsResult};

/// A disk image file mapped into memory. Reads and writes go straight to the mapping.
pub struct Disk {
    path: PathBuf,
    file: File,
    map: MmapMut,
    len: u64,
}

impl Disk {
    /// Creates (or resizes) the image at `path` to `len` bytes and maps it.
    ///
    /// # Errors
    /// Returns an error if the disk image cannot be created/opened or mapped.
    pub fn create(path: impl AsRef<Path>, len: u64) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if len == 0 {
            anyhow::bail!("disk image {} must not be empty", path.display());
        }

        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .with_context(|| format!("failed to create disk image {}", path.display()))?;
        file.set_len(len)
            .with_context(|| format!("failed to size disk image {}", path.display()))?;

        Self::map(path, file, len)
    }

    /// Maps an existing disk image at its current length.
    ///
    /// # Errors
    /// Returns an error if the image is missing, empty, or cannot be mapped.
    pub fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .with_context(|| format!("failed to open disk image {}", path.display()))?;
        let len = file
            .metadata()
            .with_context(|| format!("failed to stat disk image {}", path.display()))?
            .len();
        if len == 0 {
            anyhow::bail!("disk image {} is empty", path.display());
        }

        Self::map(path, file, len)
    }

    fn map(path: PathBuf, file: File, len: u64) -> anyhow::Result<Self> {
        let map_len = usize::try_from(len)
            .map_err(|_| anyhow::anyhow!("disk length {len} exceeds addressable size"))?;
        let map = unsafe { MmapOptions::new().len(map_len).map_mut(&file)? };

        Ok(Self {
            path,
            file,
            map,
            len,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn len(&self) -> u64 {
        self.len
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// `read_at` fills `buf` from the image starting at `off`.
    ///
    /// # Errors
    /// Fails with [`FsError::ShortTransfer`] if the range runs past the end of the image.
    pub fn read_at(&self, off: u64, buf: &mut [u8]) -> FsResult<()> {
        let range = self.checked_range("read", off, buf.len())?;
        buf.copy_from_slice(&self.map[range]);
        Ok(())
    }

    /// `write_at` copies `data` into the image starting at `off`.
    ///
    /// # Errors
    /// Fails with [`FsError::ShortTransfer`] if the range runs past the end of the image.
    pub fn write_at(&mut self, off: u64, data: &[u8]) -> FsResult<()> {
        let range = self.checked_range("write", off, data.len())?;
        self.map[range].copy_from_slice(data);
        Ok(())
    }

    /// `flush_range` forces `len` bytes starting at `off` out to the backing file.
    ///
    /// # Errors
    /// Returns an I/O error if the kernel refuses the flush.
    pub fn flush_range(&self, off: u64, len: usize) -> FsResult<()> {
        let range = self.checked_range("flush", off, len)?;
        self.map
            .flush_range(range.start, range.len())
            .map_err(|err| FsError::io("flush", off, err))
    }

    /// `sync` flushes the whole mapping and the file metadata.
    ///
    /// # Errors
    /// Returns an I/O error if the flush or fsync fails.
    pub fn sync(&self) -> FsResult<()> {
        self.map.flush().map_err(|err| FsError::io("flush", 0, err))?;
        self.file.sync_all().map_err(|err| FsError::io("sync", 0, err))
    }

    fn checked_range(
        &self,
        op: &'static str,
        off: u64,
        len: usize,
    ) -> FsResult<std::ops::Range<usize>> {
        let available = self.len.saturating_sub(off);
        let short = || FsError::ShortTransfer {
            op,
            offset: off,
            wanted: len,
            available: usize::try_from(available).unwrap_or(usize::MAX),
        };
        let start = usize::try_from(off).map_err(|_| short())?;
        let end = start.checked_add(len).ok_or_else(short)?;
        if (end as u64) > self.len {
            return Err(short());
        }
        Ok(start..end)
    }
}
