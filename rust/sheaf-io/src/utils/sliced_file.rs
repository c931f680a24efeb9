//! A reader adapter restricted to a sub-range of the underlying artifact.

use std::ops::Range;

use bytes::Bytes;

use crate::{ReadAt, StorageProfile, verify};

/// `SlicedFile` wraps a `ReadAt` reader and exposes only a specified
/// sub-range of it, translating all relative positions into absolute
/// positions of the underlying reader.
#[derive(Clone)]
pub struct SlicedFile<R> {
    inner: R,
    range: Range<u64>,
}

impl<R> SlicedFile<R> {
    pub fn new(inner: R, range: Range<u64>) -> SlicedFile<R> {
        assert!(range.start <= range.end);
        SlicedFile { inner, range }
    }

    /// Size of the exposed slice, in bytes.
    pub fn slice_size(&self) -> u64 {
        self.range.end - self.range.start
    }

    /// Absolute range of the slice within the underlying reader.
    pub fn slice_range(&self) -> Range<u64> {
        self.range.clone()
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: ReadAt> SlicedFile<R> {
    /// Creates a nested slice from a range relative to this slice.
    pub fn slice(&self, range: Range<u64>) -> std::io::Result<SlicedFile<R>>
    where
        R: Clone,
    {
        verify!(range.start <= range.end);
        verify!(range.end <= self.slice_size());
        let start = self.range.start + range.start;
        let end = self.range.start + range.end;
        Ok(SlicedFile::new(self.inner.clone(), start..end))
    }

    /// Reads the entire slice.
    pub fn read_all(&self) -> std::io::Result<Bytes> {
        self.inner.read_at(self.range.clone())
    }
}

impl<R: ReadAt> ReadAt for SlicedFile<R> {
    fn size(&self) -> std::io::Result<u64> {
        Ok(self.slice_size())
    }

    fn read_at(&self, range: Range<u64>) -> std::io::Result<Bytes> {
        verify!(range.start <= range.end);
        let size = self.slice_size();
        let start = std::cmp::min(range.start, size);
        let end = std::cmp::min(range.end, size);
        self.inner
            .read_at(self.range.start + start..self.range.start + end)
    }

    fn storage_profile(&self) -> StorageProfile {
        self.inner.storage_profile()
    }
}
