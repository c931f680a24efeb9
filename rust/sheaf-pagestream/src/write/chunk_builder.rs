//! Encoder producing column chunk byte streams.

use ahash::AHashMap;
use itertools::Itertools;

use sheaf_column::column::ScalarColumn;
use sheaf_common::{Result, verify_arg};
use sheaf_format::metadata::ColumnChunkMeta;
use sheaf_format::schema::PhysicalType;

use crate::page::{PageEncoding, PageHeader, PageKind};

/// Default cap on value slots per page.
pub const DEFAULT_MAX_PAGE_VALUES: usize = 64 * 1024;

struct DictState {
    values: ScalarColumn,
    index: AHashMap<Vec<u8>, u32>,
}

struct PendingPage {
    header: PageHeader,
    body: Vec<u8>,
}

/// Builds the byte stream of one column chunk, page by page.
///
/// Pages are buffered until [`finish`](Self::finish) so that the
/// dictionary page, which grows while data pages are added, can be laid
/// out first.
pub struct ChunkBuilder {
    type_desc: PhysicalType,
    max_page_values: usize,
    dict: Option<DictState>,
    pages: Vec<PendingPage>,
    num_values: u64,
}

impl ChunkBuilder {
    pub fn new(type_desc: PhysicalType) -> ChunkBuilder {
        ChunkBuilder {
            type_desc,
            max_page_values: DEFAULT_MAX_PAGE_VALUES,
            dict: None,
            pages: Vec::new(),
            num_values: 0,
        }
    }

    /// Switches the chunk to dictionary encoding. Must precede the first
    /// page.
    pub fn set_dictionary(&mut self, enabled: bool) -> Result<()> {
        verify_arg!(pages, self.pages.is_empty());
        self.dict = enabled.then(|| DictState {
            values: ScalarColumn::new(self.type_desc),
            index: AHashMap::new(),
        });
        Ok(())
    }

    pub fn set_max_page_values(&mut self, max: usize) {
        assert!(max > 0);
        self.max_page_values = max;
    }

    /// Appends one data page.
    ///
    /// `rep_levels` and `def_levels` may be empty when the leaf carries no
    /// such stream; `values` holds the present values of the page. The
    /// slot count of the page is `def_levels.len()`, or `values.len()`
    /// when there are no definition levels. A page always starts at a row
    /// boundary, so the first repetition level, when present, is zero.
    pub fn add_page(
        &mut self,
        rep_levels: &[u16],
        def_levels: &[u16],
        values: &ScalarColumn,
    ) -> Result<()> {
        let num_values = if def_levels.is_empty() {
            values.len()
        } else {
            def_levels.len()
        };
        verify_arg!(values, values.type_desc == self.type_desc);
        verify_arg!(values, values.len() <= num_values);
        verify_arg!(
            rep_levels,
            rep_levels.is_empty() || rep_levels.len() == num_values
        );
        verify_arg!(rep_levels, rep_levels.first().is_none_or(|&level| level == 0));
        verify_arg!(num_values, num_values <= self.max_page_values);

        let mut body = Vec::new();
        let rep_len = encode_levels(rep_levels, &mut body);
        let def_len = encode_levels(def_levels, &mut body);
        let values_start = body.len();
        let encoding = match &mut self.dict {
            Some(dict) => {
                encode_dict_codes(dict, values, &mut body);
                PageEncoding::DictCodes
            }
            None => {
                encode_plain(values, &mut body);
                PageEncoding::Plain
            }
        };
        let header = PageHeader {
            kind: PageKind::Data,
            encoding,
            num_values: num_values as u32,
            rep_levels_len: rep_len as u32,
            def_levels_len: def_len as u32,
            values_len: (body.len() - values_start) as u32,
        };
        self.pages.push(PendingPage { header, body });
        self.num_values += num_values as u64;
        Ok(())
    }

    /// Assembles the chunk stream: the dictionary page first when enabled,
    /// then the data pages in insertion order.
    pub fn finish(self, file_offset: u64) -> Result<(Vec<u8>, ColumnChunkMeta)> {
        let mut buf = Vec::new();
        let has_dictionary = self.dict.is_some();
        if let Some(dict) = &self.dict {
            let mut body = Vec::new();
            encode_plain(&dict.values, &mut body);
            PageHeader {
                kind: PageKind::Dictionary,
                encoding: PageEncoding::Plain,
                num_values: dict.values.len() as u32,
                rep_levels_len: 0,
                def_levels_len: 0,
                values_len: body.len() as u32,
            }
            .encode_into(&mut buf);
            buf.extend_from_slice(&body);
        }
        for page in &self.pages {
            page.header.encode_into(&mut buf);
            buf.extend_from_slice(&page.body);
        }
        let meta = ColumnChunkMeta {
            file_offset,
            size: buf.len() as u64,
            num_values: self.num_values,
            has_dictionary,
        };
        Ok((buf, meta))
    }
}

fn encode_levels(levels: &[u16], out: &mut Vec<u8>) -> usize {
    let start = out.len();
    for (level, run) in &levels.iter().chunk_by(|&&level| level) {
        let count = run.count() as u32;
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&level.to_le_bytes());
    }
    out.len() - start
}

fn encode_plain(values: &ScalarColumn, out: &mut Vec<u8>) {
    match &values.offsets {
        Some(offsets) => {
            for index in 0..offsets.item_count() {
                let value = values.binary_at(index);
                out.extend_from_slice(&(value.len() as u32).to_le_bytes());
                out.extend_from_slice(value);
            }
        }
        None => out.extend_from_slice(values.values.as_bytes()),
    }
}

fn encode_dict_codes(dict: &mut DictState, values: &ScalarColumn, out: &mut Vec<u8>) {
    for index in 0..values.len() {
        let bytes: &[u8] = match values.type_desc.fixed_size() {
            Some(size) => &values.values.as_bytes()[index * size..][..size],
            None => values.binary_at(index),
        };
        let next_code = dict.values.len() as u32;
        let code = *dict.index.entry(bytes.to_vec()).or_insert(next_code);
        if code == next_code {
            if dict.values.offsets.is_some() {
                dict.values.push_binary(bytes);
            } else {
                dict.values.values.push_bytes(bytes);
            }
        }
        out.extend_from_slice(&code.to_le_bytes());
    }
}
