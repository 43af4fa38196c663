//! Retention layer: the disk image file and the partition byte range carved out of it.

pub mod disk;
pub mod partition;
