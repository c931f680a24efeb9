//! Leaf reader over one column chunk.

use std::sync::Arc;

use sheaf_column::column::{ColumnData, ScalarColumn};
use sheaf_column::presence::Presence;
use sheaf_common::{Error, Result, verify_data};
use sheaf_format::metadata::RowGroupMeta;
use sheaf_format::row_range::RowRange;
use sheaf_format::schema::FieldSchema;
use sheaf_io::{ReadAt, SlicedFile, WindowedReadAt};
use sheaf_pagestream::{ChunkPageReader, ColumnSelectVector, DecodeOptions};

use crate::read::column_reader::ReadOutcome;

/// Reader for one leaf column.
///
/// Walks the pages of the backing chunk and decodes the selected rows. A
/// flat (top-level) leaf prunes against the selected row ranges and applies
/// the filter skipping heuristics; a nested leaf decodes whole pages in
/// batch-sized steps and caches the level streams for the composite readers
/// above it.
pub struct ScalarColumnReader {
    field: FieldSchema,
    chunk: ChunkPageReader,
    row_ranges: Arc<Vec<RowRange>>,
    /// Cursor into `row_ranges`, advanced past ranges that end at or before
    /// the current read position. Flat chunks only.
    row_range_index: usize,
    /// Row-group row index of the next unread value. Flat chunks only.
    current_row_index: u64,
    nested: bool,
    /// A repetition level consumed past the batch boundary, pending for the
    /// next call.
    pending_rep: Option<u16>,
    /// Level streams of the most recently read nested batch.
    rep_levels: Vec<u16>,
    def_levels: Vec<u16>,
}

impl ScalarColumnReader {
    pub(crate) fn new(
        file: Arc<dyn ReadAt>,
        field: &FieldSchema,
        row_group: &RowGroupMeta,
        row_ranges: Arc<Vec<RowRange>>,
        opts: DecodeOptions,
    ) -> Result<ScalarColumnReader> {
        verify_data!(
            row_group,
            field.physical_column_index < row_group.columns.len()
        );
        let meta = row_group.columns[field.physical_column_index].clone();
        let chunk_end = meta
            .file_offset
            .checked_add(meta.size)
            .ok_or_else(|| Error::invalid_format("column chunk range"))?;
        let window = SlicedFile::new(file, meta.file_offset..chunk_end);
        let buffered = WindowedReadAt::new(window).map_err(|e| Error::io("column chunk", e))?;
        let chunk_slice = SlicedFile::new(Arc::new(buffered) as Arc<dyn ReadAt>, 0..meta.size);
        let mut chunk = ChunkPageReader::new(chunk_slice, &meta, field, opts)?;
        chunk.init()?;
        Ok(ScalarColumnReader {
            field: field.clone(),
            chunk,
            row_ranges,
            row_range_index: 0,
            current_row_index: 0,
            nested: false,
            pending_rep: None,
            rep_levels: Vec::new(),
            def_levels: Vec::new(),
        })
    }

    pub(crate) fn set_nested(&mut self) {
        self.nested = true;
    }

    pub(crate) fn rep_levels(&self) -> &[u16] {
        &self.rep_levels
    }

    pub(crate) fn def_levels(&self) -> &[u16] {
        &self.def_levels
    }

    pub fn read_column_data(
        &mut self,
        column: &mut ColumnData,
        select: &mut ColumnSelectVector,
        batch_size: usize,
        is_dict_filter: bool,
    ) -> Result<ReadOutcome> {
        if self.chunk.remaining_num_values() == 0 {
            if !self.chunk.has_next_page() {
                return Ok(ReadOutcome {
                    rows_read: 0,
                    end_of_chunk: true,
                });
            }
            self.chunk.next_page()?;
        }
        if self.nested {
            self.chunk.load_page_data()?;
            return self.read_nested_column(column, select, batch_size, is_dict_filter);
        }

        let mut read_ranges = Vec::new();
        let page_end = self.current_row_index + self.chunk.remaining_num_values() as u64;
        self.generate_read_ranges(self.current_row_index, page_end, &mut read_ranges);

        let rows_read;
        if read_ranges.is_empty() {
            // nothing selected within this page
            self.current_row_index = page_end;
            self.chunk.skip_page()?;
            rows_read = 0;
        } else {
            let mut skip_whole_batch = false;
            // page and batch skipping engage above 60% rejection
            if select.has_filter() && select.filter_ratio() > 0.6 {
                let range_total: usize =
                    read_ranges.iter().map(|r| r.row_count() as usize).sum();
                if batch_size >= range_total && select.can_filter_all(range_total) {
                    // every selected row left in this page is rejected
                    select.skip(range_total);
                    self.current_row_index = page_end;
                    self.chunk.skip_page()?;
                    return Ok(ReadOutcome {
                        rows_read: range_total,
                        end_of_chunk: !self.chunk.has_next_page(),
                    });
                }
                skip_whole_batch =
                    batch_size <= range_total && select.can_filter_all(batch_size);
                if skip_whole_batch {
                    select.skip(batch_size);
                }
            }
            self.chunk.load_page_data()?;
            let mut has_read = 0usize;
            for range in &read_ranges {
                let gap = (range.first_row - self.current_row_index) as usize;
                self.skip_values(gap)?;
                self.current_row_index += gap as u64;
                let read = (range.row_count() as usize).min(batch_size - has_read);
                if skip_whole_batch {
                    self.skip_values(read)?;
                } else {
                    self.read_values(read, column, select, is_dict_filter)?;
                }
                has_read += read;
                self.current_row_index += read as u64;
                if has_read == batch_size {
                    break;
                }
            }
            rows_read = has_read;
        }

        Ok(ReadOutcome {
            rows_read,
            end_of_chunk: self.chunk.remaining_num_values() == 0 && !self.chunk.has_next_page(),
        })
    }

    /// Skips `rows` upcoming top-level rows of the chunk.
    pub(crate) fn skip(&mut self, rows: usize) -> Result<()> {
        if self.nested {
            return Err(Error::invalid_operation("row skip on a nested column"));
        }
        let mut left = rows;
        while left > 0 {
            if self.chunk.remaining_num_values() == 0 {
                if !self.chunk.has_next_page() {
                    return Err(Error::invalid_operation(
                        "row skip beyond the end of the chunk",
                    ));
                }
                self.chunk.next_page()?;
            }
            let step = left.min(self.chunk.remaining_num_values());
            self.chunk.load_page_data()?;
            self.skip_values(step)?;
            self.current_row_index += step as u64;
            left -= step;
        }
        Ok(())
    }

    /// Intersects the page window `[start, end)` with the selected row
    /// ranges. Nested leaves take the whole window: their value slots do
    /// not correspond to top-level rows.
    fn generate_read_ranges(&mut self, start: u64, end: u64, out: &mut Vec<RowRange>) {
        if self.nested {
            out.push(RowRange::new(start, end));
            return;
        }
        let mut index = self.row_range_index;
        while index < self.row_ranges.len() {
            let range = &self.row_ranges[index];
            if range.last_row <= start {
                index += 1;
                self.row_range_index += 1;
                continue;
            }
            if range.first_row >= end {
                break;
            }
            out.push(RowRange::new(
                range.first_row.max(start),
                range.last_row.min(end),
            ));
            index += 1;
        }
    }

    /// Skips `num_values` value slots, splitting them into null and
    /// non-null counts when the chunk carries definition levels.
    fn skip_values(&mut self, num_values: usize) -> Result<()> {
        if num_values == 0 {
            return Ok(());
        }
        if self.chunk.max_def_level() > 0 {
            let def_decoder = self.chunk.def_level_decoder()?;
            let mut skipped = 0usize;
            let mut null_size = 0usize;
            let mut nonnull_size = 0usize;
            while skipped < num_values {
                let (def_level, run) = def_decoder.get_next_run(num_values - skipped)?;
                if def_level == 0 {
                    null_size += run;
                } else {
                    nonnull_size += run;
                }
                skipped += run;
            }
            self.chunk.skip_values(null_size, false)?;
            self.chunk.skip_values(nonnull_size, true)?;
        } else {
            self.chunk.skip_values(num_values, true)?;
        }
        Ok(())
    }

    /// Decodes `num_values` slots of the current page into `column`.
    fn read_values(
        &mut self,
        num_values: usize,
        column: &mut ColumnData,
        select: &mut ColumnSelectVector,
        is_dict_filter: bool,
    ) -> Result<()> {
        if num_values == 0 {
            return Ok(());
        }
        let (presence, data) = self.split_target(column)?;
        let mut null_map: Vec<u16> = Vec::new();
        if self.chunk.max_def_level() > 0 {
            let def_decoder = self.chunk.def_level_decoder()?;
            let mut has_read = 0usize;
            let mut prev_is_null = true;
            while has_read < num_values {
                let (def_level, run) = def_decoder.get_next_run(num_values - has_read)?;
                let is_null = def_level == 0;
                if !(prev_is_null ^ is_null) {
                    null_map.push(0);
                }
                push_capped_run(&mut null_map, run);
                prev_is_null = is_null;
                has_read += run;
            }
        }
        if null_map.is_empty() {
            // no definition levels: one all-non-null run
            push_capped_run(&mut null_map, num_values);
        }
        select.set_run_length_null_map(&null_map, num_values, presence);
        self.chunk.decode_values(data, select, is_dict_filter)
    }

    /// Decodes one batch of a nested leaf: up to `batch_size` rows' worth
    /// of level slots, never splitting a row.
    fn read_nested_column(
        &mut self,
        column: &mut ColumnData,
        select: &mut ColumnSelectVector,
        batch_size: usize,
        is_dict_filter: bool,
    ) -> Result<ReadOutcome> {
        self.rep_levels.clear();
        self.def_levels.clear();
        let mut parsed_rows = 0usize;
        let mut remaining_values = self.chunk.remaining_num_values();

        if self.chunk.max_rep_level() > 0 {
            while parsed_rows <= batch_size && remaining_values > 0 {
                let rep_level = match self.pending_rep.take() {
                    Some(level) => level,
                    None => self.chunk.rep_level_decoder()?.get_next()?,
                };
                if rep_level == 0 {
                    if parsed_rows == batch_size {
                        // the level opens the next batch's first row
                        self.pending_rep = Some(rep_level);
                        break;
                    }
                    parsed_rows += 1;
                }
                self.rep_levels.push(rep_level);
                remaining_values -= 1;
            }
        } else {
            parsed_rows = remaining_values.min(batch_size);
            remaining_values -= parsed_rows;
            self.rep_levels.extend(std::iter::repeat_n(0, parsed_rows));
        }
        let parsed_values = self.chunk.remaining_num_values() - remaining_values;
        if self.chunk.max_def_level() > 0 {
            self.chunk
                .def_level_decoder()?
                .get_levels(&mut self.def_levels, parsed_values)?;
        } else {
            self.def_levels.extend(std::iter::repeat_n(0, parsed_values));
        }

        let (presence, data) = self.split_target(column)?;
        let mut null_map: Vec<u16> = vec![0];
        let mut prev_is_null = false;
        let mut ancestor_nulls = 0usize;
        let mut has_read = 0usize;
        while has_read < parsed_values {
            let def_level = self.def_levels[has_read];
            let mut run = 1usize;
            has_read += 1;
            while has_read < parsed_values && self.def_levels[has_read] == def_level {
                has_read += 1;
                run += 1;
            }
            if def_level < self.field.repeated_parent_def_level {
                // the level closes a null ancestor and owns no slot here
                ancestor_nulls += run;
                continue;
            }
            let is_null = def_level < self.field.definition_level;
            if prev_is_null == is_null {
                extend_capped_run(&mut null_map, run);
            } else {
                push_capped_run(&mut null_map, run);
                prev_is_null = is_null;
            }
        }

        let num_values = parsed_values - ancestor_nulls;
        select.set_run_length_null_map(&null_map, num_values, presence);
        self.chunk.decode_values(data, select, is_dict_filter)?;
        self.chunk.skip_values(ancestor_nulls, false)?;

        Ok(ReadOutcome {
            rows_read: parsed_rows,
            end_of_chunk: self.chunk.remaining_num_values() == 0 && !self.chunk.has_next_page(),
        })
    }

    /// Loads the chunk's dictionary values into `column`, advancing to the
    /// first data page. Returns `false` when no page was advanced or the
    /// chunk has no dictionary.
    pub(crate) fn read_dict_values_to_column(
        &mut self,
        column: &mut ScalarColumn,
    ) -> Result<bool> {
        if self.chunk.remaining_num_values() != 0 || !self.chunk.has_next_page() {
            return Ok(false);
        }
        self.chunk.next_page()?;
        if !self.chunk.has_dict() {
            return Ok(false);
        }
        self.chunk.read_dict_values_to_column(column)?;
        Ok(true)
    }

    pub(crate) fn get_dict_codes(&self, values: &[&[u8]]) -> Result<Vec<Option<u32>>> {
        self.chunk.get_dict_codes(values)
    }

    pub(crate) fn convert_dict_codes_to_binary_column(
        &self,
        codes: &ScalarColumn,
    ) -> Result<ScalarColumn> {
        self.chunk.convert_dict_codes_to_binary_column(codes)
    }

    /// Splits the target column into presence and scalar payload, checking
    /// that a nullable field lands in a presence-carrying column.
    fn split_target<'a>(
        &self,
        column: &'a mut ColumnData,
    ) -> Result<(Option<&'a mut Presence>, &'a mut ScalarColumn)> {
        let (presence, data) = column.split_presence_mut();
        if presence.is_none() && self.field.is_nullable {
            return Err(Error::corruption(
                self.field.name.as_str(),
                "null values in a column read as non-nullable",
            ));
        }
        let data = data.as_scalar_mut().ok_or_else(|| {
            Error::invalid_arg("column", "scalar reader over a non-scalar column")
        })?;
        Ok((presence, data))
    }
}

/// Appends a fresh run of `count` slots to an alternating null map, padding
/// with `(65535, 0)` pairs past the u16 capacity.
fn push_capped_run(null_map: &mut Vec<u16>, count: usize) {
    let mut remaining = count;
    while remaining > u16::MAX as usize {
        null_map.push(u16::MAX);
        null_map.push(0);
        remaining -= u16::MAX as usize;
    }
    null_map.push(remaining as u16);
}

/// Extends the trailing run of an alternating null map by `count` slots,
/// spilling past the u16 capacity with zero-length separators.
fn extend_capped_run(null_map: &mut Vec<u16>, count: usize) {
    let mut remaining = count;
    loop {
        let last = null_map.last_mut().expect("seeded null map");
        let room = (u16::MAX - *last) as usize;
        if remaining <= room {
            *last += remaining as u16;
            return;
        }
        *last = u16::MAX;
        remaining -= room;
        null_map.push(0);
        null_map.push(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_capped_run_splits_past_u16() {
        let mut runs = Vec::new();
        push_capped_run(&mut runs, 70_000);
        assert_eq!(runs, vec![65535, 0, 4465]);
        assert_eq!(runs.iter().map(|&r| r as usize).sum::<usize>(), 70_000);
    }

    #[test]
    fn test_extend_capped_run_spills() {
        let mut runs = vec![0u16, 60_000];
        extend_capped_run(&mut runs, 10_000);
        assert_eq!(runs, vec![0, 65535, 0, 4465]);
        assert_eq!(
            runs.iter().map(|&r| r as usize).sum::<usize>(),
            70_000
        );

        let mut exact = vec![65_000u16];
        extend_capped_run(&mut exact, 535);
        assert_eq!(exact, vec![65535]);
    }
}
