//! I/O abstractions for column chunk access:
//! - `ReadAt`: positional reader with the ability to fetch a specified byte
//!   range from a file or buffer.
//!
//! Provides memory-based and file-based implementations, a slicing adapter,
//! and a windowed buffering adapter for sequential page iteration.

use std::{ops::Range, sync::Arc};

use bytes::Bytes;

pub mod file;
pub mod memory;
pub mod utils;

pub use file::FileReader;
pub use utils::{sliced_file::SlicedFile, windowed_read::WindowedReadAt};

/// A trait representing a conceptual file or buffer that supports reading
/// from arbitrary positions.
pub trait ReadAt: Send + Sync + 'static {
    /// Returns the size of the underlying object.
    fn size(&self) -> std::io::Result<u64>;

    /// Reads a specified range of bytes from the object.
    ///
    /// **NOTE**: `read_at` should not return with a short read, unless
    /// end-of-file is encountered. The function may return fewer bytes than
    /// requested if the range extends beyond the end of the object.
    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes>;

    /// Retrieves the storage profile associated with this reader.
    fn storage_profile(&self) -> StorageProfile;
}

/// Suggested I/O request sizing for a storage medium.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageProfile {
    /// Suggested minimum size for an effective I/O request.
    /// Using buffers smaller than this size may be inefficient, as the
    /// round-trip time could dominate the overall I/O operation time.
    pub min_io_size: usize,

    /// Suggested maximum size for a single I/O request.
    /// Buffers larger than this size won't enhance performance and might
    /// even degrade the system's efficiency.
    pub max_io_size: usize,
}

impl StorageProfile {
    /// Clamps a given I/O size to the recommended range defined by this
    /// profile. The minimum size is guaranteed to be at least 1, and the
    /// maximum size is guaranteed to be at least the minimum size.
    pub fn clamp_io_size(&self, size: usize) -> usize {
        let min = self.min_io_size.max(1).min(self.max_io_size);
        let max = self.max_io_size.max(1).max(min);
        size.clamp(min, max)
    }
}

impl Default for StorageProfile {
    fn default() -> StorageProfile {
        Self {
            min_io_size: 4 * 1024,
            max_io_size: 4 * 1024 * 1024,
        }
    }
}

impl<T> ReadAt for Arc<T>
where
    T: ReadAt + ?Sized,
{
    fn size(&self) -> std::io::Result<u64> {
        self.as_ref().size()
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes> {
        self.as_ref().read_at(range)
    }

    fn storage_profile(&self) -> StorageProfile {
        self.as_ref().storage_profile()
    }
}
