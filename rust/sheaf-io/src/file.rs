//! `ReadAt` implementation for the local file system.

use std::fs::File;
use std::ops::Range;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use bytes::{Bytes, BytesMut};

use crate::{ReadAt, StorageProfile, verify};

/// A positional file reader.
///
/// Reads never move a shared cursor, so a single `FileReader` can be
/// used concurrently from multiple threads.
pub struct FileReader {
    file: Arc<File>,
    size: OnceLock<u64>,
}

impl FileReader {
    pub fn new(file: impl Into<Arc<File>>) -> FileReader {
        FileReader {
            file: file.into(),
            size: OnceLock::new(),
        }
    }

    pub fn open(path: impl AsRef<Path>) -> std::io::Result<FileReader> {
        let file = File::open(path)?;
        Ok(FileReader::new(file))
    }

    fn get_size(&self) -> std::io::Result<u64> {
        if let Some(&size) = self.size.get() {
            return Ok(size);
        }
        let size = self.file.metadata()?.len();
        let _ = self.size.set(size);
        Ok(size)
    }

    fn adjust_read_range(&self, range: Range<u64>) -> std::io::Result<Range<u64>> {
        verify!(range.start <= range.end);
        let size = self.get_size()?;
        let start = std::cmp::min(range.start, size);
        let end = std::cmp::min(range.end, size);
        Ok(start..end)
    }

    fn read_at_impl(&self, range: Range<u64>) -> std::io::Result<Bytes> {
        let len = (range.end - range.start) as usize;
        let mut buf = BytesMut::zeroed(len);
        file_read_at_exact(&self.file, range.start, &mut buf)?;
        Ok(buf.freeze())
    }
}

#[cfg(unix)]
pub fn file_read_at_exact(file: &File, pos: u64, buf: &mut [u8]) -> std::io::Result<()> {
    use std::os::unix::fs::FileExt;

    file.read_exact_at(buf, pos)?;
    Ok(())
}

#[cfg(windows)]
pub fn file_read_at_exact(file: &File, mut pos: u64, mut buf: &mut [u8]) -> std::io::Result<()> {
    use std::os::windows::fs::FileExt;

    while !buf.is_empty() {
        match file.seek_read(buf, pos) {
            Ok(0) => break,
            Ok(n) => {
                buf = &mut buf[n..];
                pos += n as u64;
            }
            Err(e) => return Err(e),
        }
    }
    if !buf.is_empty() {
        return Err(std::io::ErrorKind::UnexpectedEof.into());
    }
    Ok(())
}

impl ReadAt for FileReader {
    fn size(&self) -> std::io::Result<u64> {
        self.get_size()
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes> {
        let range = self.adjust_read_range(range)?;
        if range.is_empty() {
            return Ok(Bytes::new());
        }
        self.read_at_impl(range)
    }

    fn storage_profile(&self) -> StorageProfile {
        StorageProfile::default()
    }
}
