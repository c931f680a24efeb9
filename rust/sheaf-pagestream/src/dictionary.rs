//! Decoded dictionary page of a column chunk.

use std::sync::OnceLock;

use ahash::AHashMap;

use sheaf_column::column::ScalarColumn;
use sheaf_common::{Error, Result};

/// The distinct values of a dictionary-encoded chunk, addressed by code.
///
/// Codes are positions within the dictionary page, in page order. The
/// value-to-code index is built on first lookup; plain decode paths never
/// pay for it.
pub struct PageDictionary {
    values: ScalarColumn,
    index: OnceLock<AHashMap<Vec<u8>, u32>>,
}

impl PageDictionary {
    pub fn new(values: ScalarColumn) -> PageDictionary {
        PageDictionary {
            values,
            index: OnceLock::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &ScalarColumn {
        &self.values
    }

    /// Raw bytes of the value behind `code`.
    pub fn value_bytes(&self, code: u32) -> Result<&[u8]> {
        let index = code as usize;
        if index >= self.values.len() {
            return Err(Error::corruption(
                "dictionary page",
                format!("code {code} out of range for dictionary of {}", self.len()),
            ));
        }
        match self.values.type_desc.fixed_size() {
            Some(size) => Ok(&self.values.values.as_bytes()[index * size..(index + 1) * size]),
            None => Ok(self.values.binary_at(index)),
        }
    }

    /// Looks up the code of a value, by its raw byte representation.
    pub fn code_for(&self, value: &[u8]) -> Option<u32> {
        let index = self.index.get_or_init(|| {
            let mut map = AHashMap::with_capacity(self.values.len());
            for code in 0..self.values.len() as u32 {
                let bytes = match self.values.type_desc.fixed_size() {
                    Some(size) => {
                        &self.values.values.as_bytes()[code as usize * size..][..size]
                    }
                    None => self.values.binary_at(code as usize),
                };
                map.entry(bytes.to_vec()).or_insert(code);
            }
            map
        });
        index.get(value).copied()
    }

    /// Appends every dictionary value to `column`, in code order.
    pub fn materialize_into(&self, column: &mut ScalarColumn) {
        if self.values.type_desc.fixed_size().is_some() {
            column.values.push_bytes(self.values.values.as_bytes());
        } else {
            for index in 0..self.values.len() {
                column.push_binary(self.values.binary_at(index));
            }
        }
    }

    /// Appends the values behind `codes` to `column`.
    pub fn append_codes(&self, codes: &[u32], column: &mut ScalarColumn) -> Result<()> {
        for &code in codes {
            let bytes = self.value_bytes(code)?;
            if column.offsets.is_some() {
                column.push_binary(bytes);
            } else {
                column.values.push_bytes(bytes);
            }
        }
        Ok(())
    }
}
