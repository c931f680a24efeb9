//! Offset storage for variable-length and repeated data.

use std::ops::Range;

/// An array of `u64` offsets delimiting `item_count` consecutive slots.
/// A non-empty offsets array always holds `item_count + 1` entries and
/// starts at 0; slot `i` spans `offsets[i]..offsets[i + 1]`.
#[derive(Debug, Clone)]
pub struct Offsets(Vec<u64>);

impl Offsets {
    pub fn new() -> Offsets {
        Offsets(vec![0])
    }

    pub fn with_capacity(capacity: usize) -> Offsets {
        let mut inner = Vec::with_capacity(capacity + 1);
        inner.push(0);
        Offsets(inner)
    }

    pub fn item_count(&self) -> usize {
        self.0.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.item_count() == 0
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.0
    }

    pub fn last(&self) -> u64 {
        *self.0.last().expect("non-empty offsets")
    }

    pub fn range_at(&self, index: usize) -> Range<u64> {
        self.0[index]..self.0[index + 1]
    }

    /// Appends a slot of the given length.
    pub fn push_length(&mut self, len: usize) {
        self.0.push(self.last() + len as u64);
    }

    /// Appends `count` empty slots.
    pub fn push_empty(&mut self, count: usize) {
        let last = self.last();
        self.0.resize(self.0.len() + count, last);
    }

    /// Extends the final slot by `delta` positions.
    ///
    /// # Panics
    ///
    /// Panics if there is no slot yet.
    pub fn extend_last(&mut self, delta: usize) {
        assert!(self.item_count() > 0);
        *self.0.last_mut().expect("non-empty offsets") += delta as u64;
    }

    pub fn truncate(&mut self, item_count: usize) {
        if item_count < self.item_count() {
            self.0.truncate(item_count + 1);
        }
    }

    pub fn clear(&mut self) {
        self.0.truncate(1);
    }
}

impl Default for Offsets {
    fn default() -> Offsets {
        Offsets::new()
    }
}
