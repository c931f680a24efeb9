//! The column reader tree.
//!
//! [`ColumnReader`] mirrors one top-level schema node and its subtree. Leaf
//! readers own the page stream of their backing chunk; composite readers own
//! their child readers and rebuild offsets and presence from the level
//! streams cached by the leaves underneath.
//!
//! Row selection happens at the leaves. Each flat (top-level) scalar reader
//! intersects its page windows with the selected row ranges and skips
//! everything outside; readers below a collection are marked nested and
//! decode whole pages, since their value slots no longer align with
//! top-level row indexes.

use std::sync::Arc;

use sheaf_column::column::{ColumnData, ScalarColumn};
use sheaf_common::{Error, Result, verify_arg};
use sheaf_format::metadata::RowGroupMeta;
use sheaf_format::row_range::RowRange;
use sheaf_format::schema::{FieldKind, FieldSchema};
use sheaf_io::ReadAt;
use sheaf_pagestream::{ColumnSelectVector, DecodeOptions};

use array::ArrayColumnReader;
use map::MapColumnReader;
use scalar::ScalarColumnReader;
use structure::StructColumnReader;

pub mod array;
pub mod map;
pub mod scalar;
pub mod structure;

/// Result of a single [`ColumnReader::read_column_data`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadOutcome {
    /// Rows consumed by this call, counting rows rejected by the filter.
    pub rows_read: usize,
    /// The backing chunk has no further values or pages.
    pub end_of_chunk: bool,
}

/// Reader for one schema node.
pub enum ColumnReader {
    /// Leaf reader decoding one column chunk.
    Scalar(ScalarColumnReader),
    /// Array reader wrapping its element reader.
    Array(Box<ArrayColumnReader>),
    /// Map reader wrapping its key and value readers.
    Map(Box<MapColumnReader>),
    /// Struct reader wrapping one reader per field.
    Struct(StructColumnReader),
}

impl ColumnReader {
    /// Builds the reader tree for `field` over one row group of `file`.
    ///
    /// `row_ranges` is the ordered, disjoint set of selected row positions
    /// within the row group; pass a single full range to read everything.
    pub fn create(
        file: Arc<dyn ReadAt>,
        field: &FieldSchema,
        row_group: &RowGroupMeta,
        row_ranges: Arc<Vec<RowRange>>,
        opts: DecodeOptions,
    ) -> Result<ColumnReader> {
        match field.kind {
            FieldKind::Scalar => Ok(ColumnReader::Scalar(ScalarColumnReader::new(
                file, field, row_group, row_ranges, opts,
            )?)),
            FieldKind::Array => {
                verify_arg!(field, field.children.len() == 1);
                let mut elements =
                    ColumnReader::create(file, &field.children[0], row_group, row_ranges, opts)?;
                elements.mark_nested();
                Ok(ColumnReader::Array(Box::new(ArrayColumnReader::new(
                    field.clone(),
                    elements,
                ))))
            }
            FieldKind::Map => {
                verify_arg!(field, field.children.len() == 2);
                let mut keys = ColumnReader::create(
                    file.clone(),
                    &field.children[0],
                    row_group,
                    row_ranges.clone(),
                    opts,
                )?;
                keys.mark_nested();
                let mut values =
                    ColumnReader::create(file, &field.children[1], row_group, row_ranges, opts)?;
                values.mark_nested();
                Ok(ColumnReader::Map(Box::new(MapColumnReader::new(
                    field.clone(),
                    keys,
                    values,
                ))))
            }
            FieldKind::Struct => {
                verify_arg!(field, !field.children.is_empty());
                let mut children = Vec::with_capacity(field.children.len());
                for child in &field.children {
                    let mut reader = ColumnReader::create(
                        file.clone(),
                        child,
                        row_group,
                        row_ranges.clone(),
                        opts,
                    )?;
                    reader.mark_nested();
                    children.push(reader);
                }
                Ok(ColumnReader::Struct(StructColumnReader::new(
                    field.clone(),
                    children,
                )))
            }
        }
    }

    /// Marks every leaf of this subtree as nested, disabling row-range
    /// pruning on it.
    fn mark_nested(&mut self) {
        match self {
            ColumnReader::Scalar(reader) => reader.set_nested(),
            ColumnReader::Array(reader) => reader.elements_mut().mark_nested(),
            ColumnReader::Map(reader) => {
                reader.keys_mut().mark_nested();
                reader.values_mut().mark_nested();
            }
            ColumnReader::Struct(reader) => {
                for child in reader.children_mut() {
                    child.mark_nested();
                }
            }
        }
    }

    /// Reads up to `batch_size` rows of this node into `column`.
    ///
    /// `column` must have the shape [`ColumnData::for_field`] builds for the
    /// node's field. `select` carries the per-row filter state; it is staged
    /// anew by every leaf batch, so the same instance must be passed until
    /// the chunk ends. With `is_dict_filter`, leaf chunks append raw
    /// dictionary codes instead of materialized values.
    pub fn read_column_data(
        &mut self,
        column: &mut ColumnData,
        select: &mut ColumnSelectVector,
        batch_size: usize,
        is_dict_filter: bool,
    ) -> Result<ReadOutcome> {
        match self {
            ColumnReader::Scalar(reader) => {
                reader.read_column_data(column, select, batch_size, is_dict_filter)
            }
            ColumnReader::Array(reader) => {
                reader.read_column_data(column, select, batch_size, is_dict_filter)
            }
            ColumnReader::Map(reader) => {
                reader.read_column_data(column, select, batch_size, is_dict_filter)
            }
            ColumnReader::Struct(reader) => {
                reader.read_column_data(column, select, batch_size, is_dict_filter)
            }
        }
    }

    /// Skips `rows` upcoming rows without decoding them. Rejected on nested
    /// shapes, where row boundaries are not visible to a single chunk.
    pub fn skip(&mut self, rows: usize) -> Result<()> {
        match self {
            ColumnReader::Scalar(reader) => reader.skip(rows),
            _ => Err(Error::invalid_operation("row skip on a composite column")),
        }
    }

    /// Loads the dictionary values of the backing chunk into `column`.
    /// Returns `false` when the chunk has no dictionary.
    pub fn read_dict_values_to_column(&mut self, column: &mut ScalarColumn) -> Result<bool> {
        match self {
            ColumnReader::Scalar(reader) => reader.read_dict_values_to_column(column),
            _ => Err(Error::invalid_operation(
                "dictionary read on a composite column",
            )),
        }
    }

    /// Looks up the dictionary codes of `values` in the backing chunk.
    pub fn get_dict_codes(&self, values: &[&[u8]]) -> Result<Vec<Option<u32>>> {
        match self {
            ColumnReader::Scalar(reader) => reader.get_dict_codes(values),
            _ => Err(Error::invalid_operation(
                "dictionary lookup on a composite column",
            )),
        }
    }

    /// Materializes a column of dictionary codes back into values.
    pub fn convert_dict_codes_to_binary_column(
        &self,
        codes: &ScalarColumn,
    ) -> Result<ScalarColumn> {
        match self {
            ColumnReader::Scalar(reader) => reader.convert_dict_codes_to_binary_column(codes),
            _ => Err(Error::invalid_operation(
                "dictionary conversion on a composite column",
            )),
        }
    }

    /// Repetition levels of the most recently read batch, taken from the
    /// leftmost leaf underneath.
    pub(crate) fn rep_levels(&self) -> &[u16] {
        match self {
            ColumnReader::Scalar(reader) => reader.rep_levels(),
            ColumnReader::Array(reader) => reader.elements().rep_levels(),
            ColumnReader::Map(reader) => reader.keys().rep_levels(),
            ColumnReader::Struct(reader) => reader.children()[0].rep_levels(),
        }
    }

    /// Definition levels of the most recently read batch, taken from the
    /// leftmost leaf underneath.
    pub(crate) fn def_levels(&self) -> &[u16] {
        match self {
            ColumnReader::Scalar(reader) => reader.def_levels(),
            ColumnReader::Array(reader) => reader.elements().def_levels(),
            ColumnReader::Map(reader) => reader.keys().def_levels(),
            ColumnReader::Struct(reader) => reader.children()[0].def_levels(),
        }
    }
}
