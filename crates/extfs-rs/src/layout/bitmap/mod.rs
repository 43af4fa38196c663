//! Packed allocation bitmaps for inodes and blocks.

#[cfg(test)]
mod bitmap_tests;

use crate::error::{FsError, FsResult};
use crate::retention::partition::Partition;

/// `get_bit` returns the bit value at the provided index of a packed byte slice.
///
/// # Arguments
/// * `bytes` - The packed bitmap bytes.
/// * `i` - The bit index within the buffer.
#[inline]
#[must_use]
pub const fn get_bit(bytes: &[u8], i: usize) -> bool {
    let (byte, bit) = (i >> 3, i & 7);
    (bytes[byte] >> bit) & 1 == 1
}

/// `set_bit` updates the bit at the provided index of a packed byte slice.
///
/// # Arguments
/// * `bytes` - The packed bitmap bytes.
/// * `i` - The bit index within the buffer.
/// * `val` - Whether the bit should be set.
#[inline]
pub const fn set_bit(bytes: &mut [u8], i: usize, val: bool) {
    let (byte, bit) = (i >> 3, i & 7);
    let m = 1u8 << bit;
    if val {
        bytes[byte] |= m;
    } else {
        bytes[byte] &= !m;
    }
}

/// Bitmap describes one on-disk bitmap region: `count` bits starting at byte `start`
/// of the partition. A set bit marks an occupied slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bitmap {
    region: &'static str,
    start: u64,
    count: u32,
}

impl Bitmap {
    #[must_use]
    pub const fn new(region: &'static str, start: u64, count: u32) -> Self {
        Self {
            region,
            start,
            count,
        }
    }

    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// `byte_len` is the number of bytes holding `count` bits.
    #[must_use]
    pub const fn byte_len(&self) -> usize {
        (self.count as usize).div_ceil(8)
    }

    /// `create` zero-fills the region, marking every slot free.
    ///
    /// # Errors
    /// Fails if the region cannot be written.
    pub fn create(&self, part: &mut Partition) -> FsResult<()> {
        part.zero_range(self.start, self.byte_len() as u64)
    }

    /// # Errors
    /// Fails if `index` is out of range or the byte cannot be read.
    pub fn is_set(&self, part: &Partition, index: u32) -> FsResult<bool> {
        let off = self.byte_offset(index)?;
        let mut byte = [0u8; 1];
        part.read_at(off, &mut byte)?;
        Ok(get_bit(&byte, (index & 7) as usize))
    }

    /// `set` flips the single bit for `index`.
    ///
    /// # Errors
    /// Fails if `index` is out of range or the byte cannot be rewritten.
    pub fn set(&self, part: &mut Partition, index: u32, occupied: bool) -> FsResult<()> {
        let off = self.byte_offset(index)?;
        let mut byte = [0u8; 1];
        part.read_at(off, &mut byte)?;
        set_bit(&mut byte, (index & 7) as usize, occupied);
        part.write_at(off, &byte)
    }

    /// `find_free` returns the first free index, scanning from 0. It does not mark it.
    ///
    /// # Errors
    /// Fails with [`FsError::NoFreeSlot`] when every slot is occupied.
    pub fn find_free(&self, part: &Partition) -> FsResult<u32> {
        let bytes = self.load(part)?;
        (0..self.count)
            .find(|&i| !get_bit(&bytes, i as usize))
            .ok_or(FsError::NoFreeSlot {
                region: self.region,
            })
    }

    /// `count_set` returns how many slots are occupied.
    ///
    /// # Errors
    /// Fails if the region cannot be read.
    pub fn count_set(&self, part: &Partition) -> FsResult<u32> {
        let bytes = self.load(part)?;
        Ok((0..self.count)
            .filter(|&i| get_bit(&bytes, i as usize))
            .count() as u32)
    }

    fn load(&self, part: &Partition) -> FsResult<Vec<u8>> {
        let mut bytes = vec![0u8; self.byte_len()];
        part.read_at(self.start, &mut bytes)?;
        Ok(bytes)
    }

    fn byte_offset(&self, index: u32) -> FsResult<u64> {
        if index >= self.count {
            return Err(FsError::InvalidIndex {
                region: self.region,
                index,
            });
        }
        Ok(self.start + u64::from(index >> 3))
    }
}
