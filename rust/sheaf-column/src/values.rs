//! Type-erased value storage.

/// A byte buffer for primitive values, backed by `Vec<u64>` so that the
/// storage start is always 8-byte aligned. Typed access goes through
/// `bytemuck` casts; every supported value type has an alignment of at most
/// 8, so casting a prefix of the buffer is always valid.
#[derive(Debug, Clone, Default)]
pub struct Values {
    buf: Vec<u64>,
    /// Logical length in bytes; the tail of the last word is unused.
    len: usize,
}

impl Values {
    pub fn new() -> Values {
        Values::default()
    }

    pub fn with_byte_capacity(capacity: usize) -> Values {
        Values {
            buf: Vec::with_capacity(capacity.div_ceil(8)),
            len: 0,
        }
    }

    /// Creates a buffer of `len` zeroed values of type `T`.
    pub fn zeroed<T: bytemuck::Pod>(len: usize) -> Values {
        let bytes = len * size_of::<T>();
        Values {
            buf: vec![0u64; bytes.div_ceil(8)],
            len: bytes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn bytes_len(&self) -> usize {
        self.len
    }

    /// Number of stored values of type `T`.
    pub fn len<T>(&self) -> usize {
        debug_assert_eq!(self.len % size_of::<T>(), 0);
        self.len / size_of::<T>()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &bytemuck::cast_slice(&self.buf)[..self.len]
    }

    pub fn as_slice<T: bytemuck::Pod>(&self) -> &[T] {
        bytemuck::cast_slice(self.as_bytes())
    }

    pub fn as_mut_bytes(&mut self) -> &mut [u8] {
        &mut bytemuck::cast_slice_mut(&mut self.buf)[..self.len]
    }

    pub fn as_mut_slice<T: bytemuck::Pod>(&mut self) -> &mut [T] {
        bytemuck::cast_slice_mut(self.as_mut_bytes())
    }

    pub fn push<T: bytemuck::NoUninit>(&mut self, value: T) {
        self.push_bytes(bytemuck::bytes_of(&value));
    }

    pub fn extend_from_slice<T: bytemuck::NoUninit>(&mut self, values: &[T]) {
        self.push_bytes(bytemuck::cast_slice(values));
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        let new_len = self.len + bytes.len();
        self.reserve_words(new_len);
        bytemuck::cast_slice_mut::<u64, u8>(&mut self.buf)[self.len..new_len]
            .copy_from_slice(bytes);
        self.len = new_len;
    }

    /// Appends `count` zero bytes.
    pub fn append_zero_bytes(&mut self, count: usize) {
        let new_len = self.len + count;
        self.reserve_words(new_len);
        bytemuck::cast_slice_mut::<u64, u8>(&mut self.buf)[self.len..new_len].fill(0);
        self.len = new_len;
    }

    /// Appends `count` zeroed values of type `T`.
    pub fn append_zeros<T>(&mut self, count: usize) {
        self.append_zero_bytes(count * size_of::<T>());
    }

    pub fn truncate_bytes(&mut self, new_len: usize) {
        if new_len < self.len {
            self.len = new_len;
        }
    }

    /// Truncates to `new_len` values of type `T`.
    pub fn truncate<T>(&mut self, new_len: usize) {
        self.truncate_bytes(new_len * size_of::<T>());
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    fn reserve_words(&mut self, byte_len: usize) {
        let words = byte_len.div_ceil(8);
        if words > self.buf.len() {
            self.buf.resize(words, 0);
        }
    }
}
