//! Page walker and value decoder for one column chunk.

use std::ops::Range;
use std::sync::Arc;

use bytes::Bytes;

use sheaf_column::column::ScalarColumn;
use sheaf_common::{Error, Result, verify_arg, verify_data};
use sheaf_format::metadata::ColumnChunkMeta;
use sheaf_format::schema::{FieldSchema, PhysicalType};
use sheaf_io::{ReadAt, SlicedFile};

use crate::decode::{DecodeOptions, ValueDecoder};
use crate::dictionary::PageDictionary;
use crate::levels::LevelDecoder;
use crate::page::{PAGE_HEADER_LEN, PageEncoding, PageHeader, PageKind};
use crate::select::{ColumnSelectVector, ReadRunKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReaderState {
    /// Constructed, `init` not yet called.
    Fresh,
    /// Between pages.
    Ready,
    /// A page header is parsed, its body not yet loaded.
    HeaderParsed,
    /// The current page body is loaded and the decoders are live.
    DataLoaded,
}

/// Sequential reader over the pages of one column chunk.
///
/// The reader separates header parsing from body loading so that callers
/// can inspect `num_values` of a page and decide to [`skip_page`]
/// (binding no I/O for the body) before committing to
/// [`load_page_data`].
///
/// Value-slot accounting: `remaining_num_values` counts level slots of the
/// current page, nulls included. [`skip_values`] and [`decode_values`]
/// both charge against it; the caller keeps the level decoders in step by
/// consuming the same number of levels.
///
/// [`skip_page`]: ChunkPageReader::skip_page
/// [`load_page_data`]: ChunkPageReader::load_page_data
/// [`skip_values`]: ChunkPageReader::skip_values
/// [`decode_values`]: ChunkPageReader::decode_values
pub struct ChunkPageReader {
    chunk: SlicedFile<Arc<dyn ReadAt>>,
    meta: ColumnChunkMeta,
    type_desc: PhysicalType,
    max_def_level: u16,
    max_rep_level: u16,
    opts: DecodeOptions,
    state: ReaderState,
    /// Offset of the next unparsed page header within the chunk slice.
    offset: u64,
    header: Option<PageHeader>,
    body_offset: u64,
    remaining_values: usize,
    rep_decoder: Option<LevelDecoder>,
    def_decoder: Option<LevelDecoder>,
    values: Option<ValueDecoder>,
    dict: Option<PageDictionary>,
    codes_scratch: Vec<u32>,
}

impl ChunkPageReader {
    pub fn new(
        chunk: SlicedFile<Arc<dyn ReadAt>>,
        meta: &ColumnChunkMeta,
        leaf: &FieldSchema,
        opts: DecodeOptions,
    ) -> Result<ChunkPageReader> {
        verify_arg!(leaf, leaf.is_leaf());
        verify_arg!(chunk, chunk.slice_size() == meta.size);
        let type_desc = leaf
            .physical_type
            .ok_or_else(|| Error::invalid_arg("leaf", "leaf field without a physical type"))?;
        Ok(ChunkPageReader {
            chunk,
            meta: meta.clone(),
            type_desc,
            max_def_level: leaf.definition_level,
            max_rep_level: leaf.repetition_level,
            opts,
            state: ReaderState::Fresh,
            offset: 0,
            header: None,
            body_offset: 0,
            remaining_values: 0,
            rep_decoder: None,
            def_decoder: None,
            values: None,
            dict: None,
            codes_scratch: Vec::new(),
        })
    }

    /// Loads the dictionary page when the chunk has one. Must be called
    /// once before any page access.
    pub fn init(&mut self) -> Result<()> {
        if self.state != ReaderState::Fresh {
            return Err(Error::invalid_operation("chunk reader double init"));
        }
        if self.meta.has_dictionary {
            self.load_dictionary()?;
        }
        self.state = ReaderState::Ready;
        Ok(())
    }

    pub fn physical_type(&self) -> PhysicalType {
        self.type_desc
    }

    pub fn max_def_level(&self) -> u16 {
        self.max_def_level
    }

    pub fn max_rep_level(&self) -> u16 {
        self.max_rep_level
    }

    /// Whether another page follows the current one.
    pub fn has_next_page(&self) -> bool {
        self.offset < self.chunk.slice_size()
    }

    /// Value slots left in the current page, nulls included.
    pub fn remaining_num_values(&self) -> usize {
        self.remaining_values
    }

    /// Parses the header of the next page. The body stays unread until
    /// [`load_page_data`](Self::load_page_data).
    pub fn next_page(&mut self) -> Result<()> {
        match self.state {
            ReaderState::Fresh => return Err(Error::invalid_operation("next_page before init")),
            ReaderState::HeaderParsed => {
                return Err(Error::invalid_operation("next_page with an unloaded page"));
            }
            ReaderState::Ready | ReaderState::DataLoaded => {}
        }
        let header_start = self.offset;
        let header_bytes = self.read_chunk(header_start..header_start + PAGE_HEADER_LEN as u64)?;
        let header = PageHeader::parse(&header_bytes)?;
        verify_data!(page, header.kind == PageKind::Data);
        if header.encoding == PageEncoding::DictCodes && self.dict.is_none() {
            return Err(Error::corruption(
                "column chunk",
                "dictionary-coded page in a chunk without a dictionary",
            ));
        }
        let next_offset = header_start + header.page_len();
        if next_offset > self.chunk.slice_size() {
            return Err(Error::corruption(
                "column chunk",
                "page body extends beyond the chunk",
            ));
        }
        self.remaining_values = header.num_values as usize;
        self.body_offset = header_start + PAGE_HEADER_LEN as u64;
        self.header = Some(header);
        self.offset = next_offset;
        self.rep_decoder = None;
        self.def_decoder = None;
        self.values = None;
        self.state = ReaderState::HeaderParsed;
        Ok(())
    }

    /// Reads and splits the body of the current page. Idempotent.
    pub fn load_page_data(&mut self) -> Result<()> {
        match self.state {
            ReaderState::DataLoaded => return Ok(()),
            ReaderState::HeaderParsed => {}
            _ => {
                return Err(Error::invalid_operation(
                    "load_page_data without a parsed page header",
                ));
            }
        }
        let header = match &self.header {
            Some(header) => header.clone(),
            None => return Err(Error::invalid_operation("page data not loaded")),
        };
        let body = self.read_chunk(self.body_offset..self.body_offset + header.body_len())?;
        let rep_len = header.rep_levels_len as usize;
        let def_len = header.def_levels_len as usize;
        let num_values = header.num_values as usize;
        self.rep_decoder = Some(LevelDecoder::new(body.slice(0..rep_len), num_values));
        self.def_decoder = Some(LevelDecoder::new(
            body.slice(rep_len..rep_len + def_len),
            num_values,
        ));
        self.values = Some(ValueDecoder::new(
            body.slice(rep_len + def_len..),
            self.type_desc,
            &self.opts,
        ));
        self.state = ReaderState::DataLoaded;
        Ok(())
    }

    /// Drops the rest of the current page without reading its body.
    pub fn skip_page(&mut self) -> Result<()> {
        match self.state {
            ReaderState::HeaderParsed | ReaderState::DataLoaded => {}
            _ => return Err(Error::invalid_operation("skip_page without a current page")),
        }
        self.remaining_values = 0;
        self.header = None;
        self.rep_decoder = None;
        self.def_decoder = None;
        self.values = None;
        self.state = ReaderState::Ready;
        Ok(())
    }

    pub fn rep_level_decoder(&mut self) -> Result<&mut LevelDecoder> {
        self.rep_decoder
            .as_mut()
            .ok_or_else(|| Error::invalid_operation("rep_level_decoder without loaded page data"))
    }

    pub fn def_level_decoder(&mut self) -> Result<&mut LevelDecoder> {
        self.def_decoder
            .as_mut()
            .ok_or_else(|| Error::invalid_operation("def_level_decoder without loaded page data"))
    }

    /// Consumes `count` value slots. Null slots are absent from the value
    /// stream and cost nothing; set `in_value_stream` only when the slots
    /// hold present values.
    pub fn skip_values(&mut self, count: usize, in_value_stream: bool) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        if self.state != ReaderState::DataLoaded {
            return Err(Error::invalid_operation("skip_values without loaded page data"));
        }
        if count > self.remaining_values {
            return Err(Error::corruption(
                "column chunk",
                "skip beyond the page value count",
            ));
        }
        self.remaining_values -= count;
        if in_value_stream {
            self.skip_run(count)?;
        }
        Ok(())
    }

    /// Decodes the batch staged in `select` into `column`.
    ///
    /// With `is_dict_filter`, dictionary codes are appended verbatim (an
    /// `Int32`-shaped target) instead of being materialized through the
    /// dictionary.
    pub fn decode_values(
        &mut self,
        column: &mut ScalarColumn,
        select: &mut ColumnSelectVector,
        is_dict_filter: bool,
    ) -> Result<()> {
        if self.state != ReaderState::DataLoaded {
            return Err(Error::invalid_operation(
                "decode_values without loaded page data",
            ));
        }
        if is_dict_filter && self.dict.is_none() {
            return Err(Error::invalid_operation(
                "dictionary filter on a chunk without a dictionary",
            ));
        }
        let num_values = select.num_values();
        if num_values > self.remaining_values {
            return Err(Error::corruption(
                "column chunk",
                "decode beyond the page value count",
            ));
        }
        self.remaining_values -= num_values;
        while let Some((kind, count)) = select.get_next_run() {
            match kind {
                ReadRunKind::Values => self.decode_run(column, count, is_dict_filter)?,
                ReadRunKind::Nulls => column.append_nulls(count),
                ReadRunKind::FilteredValues => self.skip_run(count)?,
                ReadRunKind::FilteredNulls => {}
            }
        }
        Ok(())
    }

    pub fn has_dict(&self) -> bool {
        self.dict.is_some()
    }

    /// Appends every dictionary value to `column`, in code order.
    pub fn read_dict_values_to_column(&self, column: &mut ScalarColumn) -> Result<()> {
        match &self.dict {
            Some(dict) => {
                dict.materialize_into(column);
                Ok(())
            }
            None => Err(Error::invalid_operation("chunk has no dictionary")),
        }
    }

    /// Looks up the dictionary codes of the given values; `None` marks a
    /// value outside the dictionary.
    pub fn get_dict_codes(&self, values: &[&[u8]]) -> Result<Vec<Option<u32>>> {
        match &self.dict {
            Some(dict) => Ok(values.iter().map(|value| dict.code_for(value)).collect()),
            None => Err(Error::invalid_operation("chunk has no dictionary")),
        }
    }

    /// Rebuilds a value column from a column of dictionary codes.
    pub fn convert_dict_codes_to_binary_column(&self, codes: &ScalarColumn) -> Result<ScalarColumn> {
        let dict = self
            .dict
            .as_ref()
            .ok_or_else(|| Error::invalid_operation("chunk has no dictionary"))?;
        let mut column = ScalarColumn::new(self.type_desc);
        dict.append_codes(codes.as_slice::<u32>(), &mut column)?;
        Ok(column)
    }

    fn load_dictionary(&mut self) -> Result<()> {
        let header_bytes = self.read_chunk(0..PAGE_HEADER_LEN as u64)?;
        let header = PageHeader::parse(&header_bytes)?;
        verify_data!(dictionary_page, header.kind == PageKind::Dictionary);
        verify_data!(dictionary_page, header.encoding == PageEncoding::Plain);
        verify_data!(
            dictionary_page,
            header.rep_levels_len == 0 && header.def_levels_len == 0
        );
        let body_start = PAGE_HEADER_LEN as u64;
        let body = self.read_chunk(body_start..body_start + header.values_len as u64)?;
        let mut decoder = ValueDecoder::new(body, self.type_desc, &self.opts);
        let mut values = ScalarColumn::new(self.type_desc);
        decoder.decode_plain(&mut values, header.num_values as usize)?;
        self.dict = Some(PageDictionary::new(values));
        self.offset = header.page_len();
        Ok(())
    }

    fn decode_run(
        &mut self,
        column: &mut ScalarColumn,
        count: usize,
        is_dict_filter: bool,
    ) -> Result<()> {
        let encoding = match &self.header {
            Some(header) => header.encoding,
            None => return Err(Error::invalid_operation("page data not loaded")),
        };
        let values = match &mut self.values {
            Some(values) => values,
            None => return Err(Error::invalid_operation("page data not loaded")),
        };
        match encoding {
            PageEncoding::Plain => values.decode_plain(column, count),
            PageEncoding::DictCodes => {
                self.codes_scratch.clear();
                values.decode_codes(&mut self.codes_scratch, count)?;
                if is_dict_filter {
                    column.values.extend_from_slice(self.codes_scratch.as_slice());
                } else {
                    match &self.dict {
                        Some(dict) => dict.append_codes(&self.codes_scratch, column)?,
                        None => {
                            return Err(Error::corruption(
                                "column chunk",
                                "dictionary-coded page in a chunk without a dictionary",
                            ));
                        }
                    }
                }
                Ok(())
            }
        }
    }

    fn skip_run(&mut self, count: usize) -> Result<()> {
        let encoding = match &self.header {
            Some(header) => header.encoding,
            None => return Err(Error::invalid_operation("page data not loaded")),
        };
        let values = match &mut self.values {
            Some(values) => values,
            None => return Err(Error::invalid_operation("page data not loaded")),
        };
        match encoding {
            PageEncoding::Plain => values.skip_plain(count),
            PageEncoding::DictCodes => values.skip_codes(count),
        }
    }

    fn read_chunk(&self, range: Range<u64>) -> Result<Bytes> {
        if range.end > self.chunk.slice_size() {
            return Err(Error::corruption(
                "column chunk",
                "page extends beyond the chunk",
            ));
        }
        let len = range.end - range.start;
        let bytes = self
            .chunk
            .read_at(range)
            .map_err(|e| Error::io("column chunk", e))?;
        verify_data!(page, bytes.len() as u64 == len);
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use sheaf_column::column::ScalarColumn;
    use sheaf_column::presence::Presence;
    use sheaf_format::metadata::ColumnChunkMeta;
    use sheaf_format::schema::{FieldBuilder, FieldSchema, PhysicalType, SchemaBuilder};
    use sheaf_io::{ReadAt, SlicedFile};

    use crate::decode::DecodeOptions;
    use crate::select::ColumnSelectVector;
    use crate::write::chunk_builder::ChunkBuilder;

    use super::ChunkPageReader;

    fn flat_leaf(physical_type: PhysicalType, nullable: bool) -> FieldSchema {
        let mut field = FieldBuilder::scalar("v", physical_type);
        if !nullable {
            field = field.required();
        }
        let root = SchemaBuilder::new(vec![field]).finish();
        root.children[0].clone()
    }

    fn open_chunk(
        data: Vec<u8>,
        meta: &ColumnChunkMeta,
        leaf: &FieldSchema,
    ) -> ChunkPageReader {
        let file: Arc<dyn ReadAt> = Arc::new(data);
        let size = file.size().unwrap();
        let slice = SlicedFile::new(file, 0..size);
        let mut reader =
            ChunkPageReader::new(slice, meta, leaf, DecodeOptions::default()).unwrap();
        reader.init().unwrap();
        reader
    }

    fn int64_chunk(values: &[i64], def: &[u16], page_rows: usize) -> (Vec<u8>, ColumnChunkMeta) {
        let mut builder = ChunkBuilder::new(PhysicalType::Int64);
        let mut value_index = 0;
        for slot_chunk in def.chunks(page_rows.max(1)) {
            let mut page = ScalarColumn::new(PhysicalType::Int64);
            for &d in slot_chunk {
                if d == 1 {
                    page.values.push(values[value_index]);
                    value_index += 1;
                }
            }
            builder.add_page(&[], slot_chunk, &page).unwrap();
        }
        builder.finish(0).unwrap()
    }

    fn required_int64_chunk(values: &[i64], page_rows: usize) -> (Vec<u8>, ColumnChunkMeta) {
        let mut builder = ChunkBuilder::new(PhysicalType::Int64);
        for value_chunk in values.chunks(page_rows.max(1)) {
            let mut page = ScalarColumn::new(PhysicalType::Int64);
            page.values.extend_from_slice(value_chunk);
            builder.add_page(&[], &[], &page).unwrap();
        }
        builder.finish(0).unwrap()
    }

    #[test]
    fn test_plain_pages_with_nulls() {
        let leaf = flat_leaf(PhysicalType::Int64, true);
        // def [1, 0, 1, 1, 0] over one page.
        let (data, meta) = int64_chunk(&[10, 20, 30], &[1, 0, 1, 1, 0], 5);
        let mut reader = open_chunk(data, &meta, &leaf);

        assert!(reader.has_next_page());
        reader.next_page().unwrap();
        assert_eq!(reader.remaining_num_values(), 5);
        reader.load_page_data().unwrap();

        let mut select = ColumnSelectVector::new();
        let mut presence = Presence::new();
        select.set_run_length_null_map(&[1, 1, 2, 1], 5, Some(&mut presence));
        let mut column = ScalarColumn::new(PhysicalType::Int64);
        reader.decode_values(&mut column, &mut select, false).unwrap();

        assert_eq!(column.as_slice::<i64>(), [10, 0, 20, 30, 0]);
        assert_eq!(presence.count_nulls(), 2);
        assert_eq!(reader.remaining_num_values(), 0);
        assert!(!reader.has_next_page());
    }

    #[test]
    fn test_page_boundaries_and_skip_page() {
        let leaf = flat_leaf(PhysicalType::Int64, false);
        let values: Vec<i64> = (0..10).collect();
        let (data, meta) = required_int64_chunk(&values, 4);
        assert_eq!(meta.num_values, 10);
        let mut reader = open_chunk(data, &meta, &leaf);

        // Page sizes 4, 4, 2. Skip the middle page without loading it.
        reader.next_page().unwrap();
        assert_eq!(reader.remaining_num_values(), 4);
        reader.load_page_data().unwrap();
        let mut select = ColumnSelectVector::new();
        select.set_run_length_null_map(&[4], 4, None);
        let mut column = ScalarColumn::new(PhysicalType::Int64);
        reader.decode_values(&mut column, &mut select, false).unwrap();
        assert_eq!(column.as_slice::<i64>(), [0, 1, 2, 3]);

        reader.next_page().unwrap();
        reader.skip_page().unwrap();
        assert_eq!(reader.remaining_num_values(), 0);

        reader.next_page().unwrap();
        reader.load_page_data().unwrap();
        select.set_run_length_null_map(&[2], 2, None);
        reader.decode_values(&mut column, &mut select, false).unwrap();
        assert_eq!(column.as_slice::<i64>(), [0, 1, 2, 3, 8, 9]);
        assert!(!reader.has_next_page());
    }

    #[test]
    fn test_skip_values_in_and_out_of_stream() {
        let leaf = flat_leaf(PhysicalType::Int64, true);
        // Slots: 10, null, 20, 30, null, 40.
        let (data, meta) = int64_chunk(&[10, 20, 30, 40], &[1, 0, 1, 1, 0, 1], 6);
        let mut reader = open_chunk(data, &meta, &leaf);
        reader.next_page().unwrap();
        reader.load_page_data().unwrap();

        // Skip the first three slots: two present values and one null.
        reader.skip_values(2, true).unwrap();
        reader.skip_values(1, false).unwrap();
        // Levels advance independently of the value stream.
        let mut levels = Vec::new();
        reader.def_level_decoder().unwrap().get_levels(&mut levels, 6).unwrap();

        let mut select = ColumnSelectVector::new();
        select.set_run_length_null_map(&[1, 1, 1], 3, None);
        let mut column = ScalarColumn::new(PhysicalType::Int64);
        reader.decode_values(&mut column, &mut select, false).unwrap();
        assert_eq!(column.as_slice::<i64>(), [30, 0, 40]);
        assert_eq!(reader.remaining_num_values(), 0);
    }

    #[test]
    fn test_dictionary_chunk_roundtrip() {
        let leaf = flat_leaf(PhysicalType::Binary, false);
        let mut builder = ChunkBuilder::new(PhysicalType::Binary);
        builder.set_dictionary(true).unwrap();
        let mut page = ScalarColumn::new(PhysicalType::Binary);
        for value in [b"ore".as_slice(), b"ingot", b"ore", b"slag", b"ingot"] {
            page.push_binary(value);
        }
        builder.add_page(&[], &[], &page).unwrap();
        let (data, meta) = builder.finish(0).unwrap();
        assert!(meta.has_dictionary);

        let mut reader = open_chunk(data, &meta, &leaf);
        assert!(reader.has_dict());
        let mut dict_values = ScalarColumn::new(PhysicalType::Binary);
        reader.read_dict_values_to_column(&mut dict_values).unwrap();
        assert_eq!(dict_values.len(), 3);
        assert_eq!(dict_values.binary_at(0), b"ore");

        let codes = reader
            .get_dict_codes(&[b"slag".as_slice(), b"gold"])
            .unwrap();
        assert_eq!(codes, [Some(2), None]);

        reader.next_page().unwrap();
        reader.load_page_data().unwrap();
        let mut select = ColumnSelectVector::new();
        select.set_run_length_null_map(&[5], 5, None);
        let mut column = ScalarColumn::new(PhysicalType::Binary);
        reader.decode_values(&mut column, &mut select, false).unwrap();
        assert_eq!(column.binary_at(0), b"ore");
        assert_eq!(column.binary_at(2), b"ore");
        assert_eq!(column.binary_at(3), b"slag");
    }

    #[test]
    fn test_dict_filter_decodes_codes() {
        let leaf = flat_leaf(PhysicalType::Binary, false);
        let mut builder = ChunkBuilder::new(PhysicalType::Binary);
        builder.set_dictionary(true).unwrap();
        let mut page = ScalarColumn::new(PhysicalType::Binary);
        for value in [b"a".as_slice(), b"b", b"a"] {
            page.push_binary(value);
        }
        builder.add_page(&[], &[], &page).unwrap();
        let (data, meta) = builder.finish(0).unwrap();

        let mut reader = open_chunk(data, &meta, &leaf);
        reader.next_page().unwrap();
        reader.load_page_data().unwrap();
        let mut select = ColumnSelectVector::new();
        select.set_run_length_null_map(&[3], 3, None);
        let mut codes = ScalarColumn::new(PhysicalType::Int32);
        reader.decode_values(&mut codes, &mut select, true).unwrap();
        assert_eq!(codes.as_slice::<u32>(), [0, 1, 0]);

        let back = reader.convert_dict_codes_to_binary_column(&codes).unwrap();
        assert_eq!(back.binary_at(0), b"a");
        assert_eq!(back.binary_at(1), b"b");
        assert_eq!(back.binary_at(2), b"a");
    }

    #[test]
    fn test_state_machine_misuse() {
        let leaf = flat_leaf(PhysicalType::Int64, false);
        let (data, meta) = required_int64_chunk(&[1, 2], 2);
        let file: Arc<dyn ReadAt> = Arc::new(data);
        let size = file.size().unwrap();
        let slice = SlicedFile::new(file, 0..size);
        let mut reader =
            ChunkPageReader::new(slice, &meta, &leaf, DecodeOptions::default()).unwrap();

        assert!(reader.next_page().is_err());
        reader.init().unwrap();
        assert!(reader.init().is_err());
        assert!(reader.load_page_data().is_err());
        reader.next_page().unwrap();
        assert!(reader.next_page().is_err());
        reader.load_page_data().unwrap();
        assert!(reader.get_dict_codes(&[b"x".as_slice()]).is_err());

        let mut select = ColumnSelectVector::new();
        select.set_run_length_null_map(&[2], 2, None);
        let mut column = ScalarColumn::new(PhysicalType::Int64);
        assert!(reader.decode_values(&mut column, &mut select, true).is_err());
    }

    #[test]
    fn test_truncated_chunk_is_corruption() {
        let leaf = flat_leaf(PhysicalType::Int64, false);
        let (data, meta) = required_int64_chunk(&[1, 2, 3], 3);
        let mut truncated = data.clone();
        truncated.truncate(data.len() - 10);
        let meta = ColumnChunkMeta {
            size: truncated.len() as u64,
            ..meta
        };
        let mut reader = open_chunk(truncated, &meta, &leaf);
        assert!(reader.next_page().is_err());
    }
}
