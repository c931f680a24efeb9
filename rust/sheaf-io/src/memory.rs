//! Implementations of `ReadAt` for memory buffers.

use std::ops::Range;

use bytes::Bytes;

use crate::{ReadAt, StorageProfile, verify};

impl ReadAt for Vec<u8> {
    fn size(&self) -> std::io::Result<u64> {
        Ok(self.len() as u64)
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes> {
        verify!(range.end >= range.start);
        let start = range.start as usize;
        let end = std::cmp::min(range.end as usize, self.len());
        if start >= end {
            return Ok(Bytes::new());
        }
        Ok(Bytes::copy_from_slice(&self[start..end]))
    }

    fn storage_profile(&self) -> StorageProfile {
        StorageProfile {
            min_io_size: 1,
            max_io_size: StorageProfile::default().max_io_size,
        }
    }
}

impl ReadAt for Bytes {
    fn size(&self) -> std::io::Result<u64> {
        Ok(self.len() as u64)
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes> {
        verify!(range.end >= range.start);
        let start = range.start as usize;
        let end = std::cmp::min(range.end as usize, self.len());
        if start >= end {
            return Ok(Bytes::new());
        }
        Ok(self.slice(start..end))
    }

    fn storage_profile(&self) -> StorageProfile {
        StorageProfile {
            min_io_size: 1,
            max_io_size: StorageProfile::default().max_io_size,
        }
    }
}
