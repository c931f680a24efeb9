//! A prefetching reader adapter for sequential scan access patterns.

use std::ops::Range;
use std::sync::Mutex;

use bytes::Bytes;

use crate::{ReadAt, StorageProfile, verify};

/// Default prefetch window size, subject to clamping by the storage profile
/// of the underlying reader.
pub const DEFAULT_WINDOW_SIZE: usize = 256 * 1024;

/// `WindowedReadAt` wraps a `ReadAt` reader and serves small sequential
/// reads from a cached window, refilling the window from the underlying
/// reader whenever a request falls outside of it.
///
/// Requests larger than the window bypass the cache entirely.
pub struct WindowedReadAt<R> {
    inner: R,
    size: u64,
    window_size: u64,
    window: Mutex<Window>,
}

#[derive(Default)]
struct Window {
    offset: u64,
    buffer: Bytes,
}

impl Window {
    fn end(&self) -> u64 {
        self.offset + self.buffer.len() as u64
    }

    fn contains(&self, range: &Range<u64>) -> bool {
        range.start >= self.offset && range.end <= self.end()
    }

    fn slice(&self, range: Range<u64>) -> Bytes {
        let start = (range.start - self.offset) as usize;
        let end = (range.end - self.offset) as usize;
        self.buffer.slice(start..end)
    }
}

impl<R: ReadAt> WindowedReadAt<R> {
    pub fn new(inner: R) -> std::io::Result<WindowedReadAt<R>> {
        let window_size = inner.storage_profile().clamp_io_size(DEFAULT_WINDOW_SIZE);
        WindowedReadAt::with_window_size(inner, window_size as u64)
    }

    pub fn with_window_size(inner: R, window_size: u64) -> std::io::Result<WindowedReadAt<R>> {
        verify!(window_size > 0);
        let size = inner.size()?;
        Ok(WindowedReadAt {
            inner,
            size,
            window_size,
            window: Mutex::new(Window::default()),
        })
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn refill(&self, window: &mut Window, start: u64, len: u64) -> std::io::Result<()> {
        let fetch = len.max(self.window_size).min(self.size - start);
        window.buffer = self.inner.read_at(start..start + fetch)?;
        window.offset = start;
        Ok(())
    }
}

impl<R: ReadAt> ReadAt for WindowedReadAt<R> {
    fn size(&self) -> std::io::Result<u64> {
        Ok(self.size)
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes> {
        verify!(range.start <= range.end);
        let start = std::cmp::min(range.start, self.size);
        let end = std::cmp::min(range.end, self.size);
        if start == end {
            return Ok(Bytes::new());
        }
        let len = end - start;
        if len >= self.window_size {
            return self.inner.read_at(start..end);
        }
        let mut window = self.window.lock().expect("windowed reader lock");
        if !window.contains(&(start..end)) {
            self.refill(&mut window, start, len)?;
        }
        verify!(window.contains(&(start..end)));
        Ok(window.slice(start..end))
    }

    fn storage_profile(&self) -> StorageProfile {
        StorageProfile {
            min_io_size: 1,
            max_io_size: self.inner.storage_profile().max_io_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::ops::Range;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bytes::Bytes;

    use super::WindowedReadAt;
    use crate::{ReadAt, StorageProfile};

    struct CountingReader {
        data: Vec<u8>,
        reads: AtomicUsize,
    }

    impl CountingReader {
        fn new(data: Vec<u8>) -> CountingReader {
            CountingReader {
                data,
                reads: AtomicUsize::new(0),
            }
        }

        fn read_count(&self) -> usize {
            self.reads.load(Ordering::Relaxed)
        }
    }

    impl ReadAt for CountingReader {
        fn size(&self) -> std::io::Result<u64> {
            Ok(self.data.len() as u64)
        }

        fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes> {
            self.reads.fetch_add(1, Ordering::Relaxed);
            self.data.read_at(range)
        }

        fn storage_profile(&self) -> StorageProfile {
            StorageProfile {
                min_io_size: 1,
                max_io_size: 1024 * 1024,
            }
        }
    }

    #[test]
    fn test_sequential_reads_share_one_window() -> std::io::Result<()> {
        let data: Vec<u8> = (0..4096u32).flat_map(|i| i.to_le_bytes()).collect();
        let reader = WindowedReadAt::with_window_size(CountingReader::new(data), 1024)?;

        for i in 0..256u64 {
            let bytes = reader.read_at(i * 4..(i + 1) * 4)?;
            assert_eq!(u32::from_le_bytes(bytes[..].try_into().unwrap()), i as u32);
        }
        assert_eq!(reader.inner().read_count(), 1);

        let bytes = reader.read_at(2048..2052)?;
        assert_eq!(u32::from_le_bytes(bytes[..].try_into().unwrap()), 512);
        assert_eq!(reader.inner().read_count(), 2);
        Ok(())
    }

    #[test]
    fn test_oversized_read_bypasses_window() -> std::io::Result<()> {
        let data = vec![3u8; 8192];
        let reader = WindowedReadAt::with_window_size(CountingReader::new(data), 1024)?;

        let bytes = reader.read_at(0..4096)?;
        assert_eq!(bytes.len(), 4096);
        let bytes = reader.read_at(0..16)?;
        assert_eq!(bytes.len(), 16);
        assert_eq!(reader.inner().read_count(), 2);
        Ok(())
    }

    #[test]
    fn test_window_clamped_at_eof() -> std::io::Result<()> {
        let data: Vec<u8> = (0u8..100).collect();
        let reader = WindowedReadAt::with_window_size(CountingReader::new(data), 64)?;

        let bytes = reader.read_at(90..100)?;
        assert_eq!(&bytes[..], &(90u8..100).collect::<Vec<_>>()[..]);
        assert!(reader.read_at(100..120)?.is_empty());
        assert_eq!(reader.inner().read_count(), 1);
        Ok(())
    }
}
