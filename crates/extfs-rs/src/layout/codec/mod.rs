//! Little-endian encoding helpers for the fixed-size on-disk structures.
//!
//! Unset block and inode indices are stored as `-1` (i32) and surface as `None`.
//! Strings are zero-padded to their field width and trimmed of trailing NULs on decode.


use crate::error::{FsError, FsResult};

/// A structure with a static encoded width.
pub trait OnDisk: Sized {
    const SIZE: usize;

    /// Decodes `Self` from the first `SIZE` bytes of `buf`.
    ///
    /// # Errors
    /// Returns [`FsError::Corrupt`] when the bytes are not a valid encoding.
    fn from_bytes(buf: &[u8]) -> FsResult<Self>;

    /// Encodes `self` into the first `SIZE` bytes of `buf`.
    fn write_bytes(&self, buf: &mut [u8]);
}

pub(crate) fn ensure_len(buf: &[u8], size: usize, what: &str) -> FsResult<()> {
    if buf.len() < size {
        return Err(FsError::Corrupt(format!(
            "{what}: need {size} bytes, got {}",
            buf.len()
        )));
    }
    Ok(())
}

fn array<const N: usize>(buf: &[u8], off: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&buf[off..off + N]);
    out
}

pub(crate) fn get_u32(buf: &[u8], off: usize) -> u32 {
    u32::from_le_bytes(array(buf, off))
}

pub(crate) fn get_u64(buf: &[u8], off: usize) -> u64 {
    u64::from_le_bytes(array(buf, off))
}

pub(crate) fn get_i64(buf: &[u8], off: usize) -> i64 {
    i64::from_le_bytes(array(buf, off))
}

pub(crate) fn put_u32(buf: &mut [u8], off: usize, v: u32) {
    buf[off..off + 4].copy_from_slice(&v.to_le_bytes());
}

pub(crate) fn put_u64(buf: &mut [u8], off: usize, v: u64) {
    buf[off..off + 8].copy_from_slice(&v.to_le_bytes());
}

pub(crate) fn put_i64(buf: &mut [u8], off: usize, v: i64) {
    buf[off..off + 8].copy_from_slice(&v.to_le_bytes());
}

/// `get_index` decodes an optional index; any negative value means unset.
pub(crate) fn get_index(buf: &[u8], off: usize) -> Option<u32> {
    let raw = i32::from_le_bytes(array(buf, off));
    u32::try_from(raw).ok()
}

pub(crate) fn put_index(buf: &mut [u8], off: usize, v: Option<u32>) {
    let raw = v.and_then(|i| i32::try_from(i).ok()).unwrap_or(-1);
    buf[off..off + 4].copy_from_slice(&raw.to_le_bytes());
}

/// `get_str` decodes a zero-padded UTF-8 field of `len` bytes.
pub(crate) fn get_str(buf: &[u8], off: usize, len: usize) -> FsResult<String> {
    let field = &buf[off..off + len];
    let end = field.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
    std::str::from_utf8(&field[..end])
        .map(str::to_owned)
        .map_err(|_| FsError::Corrupt(format!("non utf-8 string field at byte {off}")))
}

/// `put_str` zero-fills the field then copies at most `len` bytes of `s`.
pub(crate) fn put_str(buf: &mut [u8], off: usize, len: usize, s: &str) {
    let field = &mut buf[off..off + len];
    field.fill(0);
    let bytes = s.as_bytes();
    let n = bytes.len().min(len);
    field[..n].copy_from_slice(&bytes[..n]);
}

/// `truncate_utf8` cuts `s` to at most `max` bytes without splitting a character.
#[must_use]
pub fn truncate_utf8(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
