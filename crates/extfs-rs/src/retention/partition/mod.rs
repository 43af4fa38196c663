//! A byte range of a disk image that a filesystem is formatted onto.


use crate::error::{FsError, FsResult};
use crate::layout::codec::OnDisk;
use crate::retention::disk::Disk;

/// Partition addresses `[start, start + size)` of a [`Disk`]. Every offset taken by its
/// methods is relative to `start`.
pub struct Partition {
    disk: Disk,
    start: u64,
    size: u64,
}

impl Partition {
    /// # Errors
    /// Returns an error if the range does not fit inside the disk image.
    pub fn new(disk: Disk, start: u64, size: u64) -> anyhow::Result<Self> {
        let end = start
            .checked_add(size)
            .ok_or_else(|| anyhow::anyhow!("partition range {start}+{size} overflows"))?;
        if size == 0 || end > disk.len() {
            anyhow::bail!(
                "partition {start}+{size} does not fit in {} ({} bytes)",
                disk.path().display(),
                disk.len()
            );
        }
        Ok(Self { disk, start, size })
    }

    #[must_use]
    pub const fn start(&self) -> u64 {
        self.start
    }

    #[must_use]
    pub const fn size(&self) -> u64 {
        self.size
    }

    #[must_use]
    pub const fn disk(&self) -> &Disk {
        &self.disk
    }

    #[must_use]
    pub fn into_disk(self) -> Disk {
        self.disk
    }

    /// # Errors
    /// Fails if the range leaves the partition or the image.
    pub fn read_at(&self, off: u64, buf: &mut [u8]) -> FsResult<()> {
        let abs = self.absolute(off, buf.len())?;
        self.disk.read_at(abs, buf)
    }

    /// # Errors
    /// Fails if the range leaves the partition or the image.
    pub fn write_at(&mut self, off: u64, data: &[u8]) -> FsResult<()> {
        let abs = self.absolute(off, data.len())?;
        self.disk.write_at(abs, data)
    }

    /// `zero_range` overwrites `len` bytes at `off` with zeros.
    ///
    /// # Errors
    /// Fails if the range leaves the partition or the image.
    pub fn zero_range(&mut self, off: u64, len: u64) -> FsResult<()> {
        const CHUNK: u64 = 4096;
        let zeros = [0u8; CHUNK as usize];
        let mut done = 0u64;
        while done < len {
            let n = (len - done).min(CHUNK) as usize;
            self.write_at(off + done, &zeros[..n])?;
            done += n as u64;
        }
        Ok(())
    }

    /// # Errors
    /// Fails if the range leaves the partition or the flush fails.
    pub fn flush_range(&self, off: u64, len: usize) -> FsResult<()> {
        let abs = self.absolute(off, len)?;
        self.disk.flush_range(abs, len)
    }

    /// `read_struct` decodes a `T` stored at `off`.
    ///
    /// # Errors
    /// Fails on a short read or if the bytes do not decode.
    pub fn read_struct<T: OnDisk>(&self, off: u64) -> FsResult<T> {
        let mut buf = vec![0u8; T::SIZE];
        self.read_at(off, &mut buf)?;
        T::from_bytes(&buf)
    }

    /// `write_struct` encodes `value` at `off`.
    ///
    /// # Errors
    /// Fails on a short write.
    pub fn write_struct<T: OnDisk>(&mut self, off: u64, value: &T) -> FsResult<()> {
        let mut buf = vec![0u8; T::SIZE];
        value.write_bytes(&mut buf);
        self.write_at(off, &buf)
    }

    fn absolute(&self, off: u64, len: usize) -> FsResult<u64> {
        let out_of_range = || FsError::OutOfRange {
            offset: off,
            len,
            size: self.size,
        };
        let end = off.checked_add(len as u64).ok_or_else(out_of_range)?;
        if end > self.size {
            return Err(out_of_range());
        }
        Ok(self.start + off)
    }
}
