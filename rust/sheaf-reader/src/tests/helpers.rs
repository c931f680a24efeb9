//! Shared fixtures for the reader integration tests.

use std::sync::Arc;

use sheaf_column::column::{ColumnData, ScalarColumn};
use sheaf_format::metadata::{FOOTER_TAIL_LEN, FileMeta, decode_footer_tail};
use sheaf_format::row_range::RowRange;
use sheaf_format::schema::{FieldSchema, PhysicalType};
use sheaf_pagestream::{ColumnSelectVector, DecodeOptions};
use sheaf_testkit::file_gen::build_file;
use sheaf_testkit::rows::Cell;

use crate::read::column_reader::ColumnReader;

/// An in-memory sheaf file plus its decoded footer.
pub struct TestFile {
    pub data: Arc<Vec<u8>>,
    pub meta: FileMeta,
}

impl TestFile {
    /// Encodes `row_groups` of rows matching `root` into an in-memory file.
    pub fn build(
        root: &FieldSchema,
        row_groups: &[Vec<Cell>],
        page_rows: usize,
        dict: bool,
    ) -> TestFile {
        let data = build_file(root, row_groups, page_rows, dict).unwrap();
        let meta = decode_file_meta(&data);
        TestFile {
            data: Arc::new(data),
            meta,
        }
    }

    pub fn field(&self, name: &str) -> &FieldSchema {
        self.meta.schema.field_by_name(name).unwrap()
    }

    /// Builds a reader over one top-level field of one row group.
    pub fn reader(&self, group: usize, name: &str, row_ranges: Vec<RowRange>) -> ColumnReader {
        self.reader_with_opts(group, name, row_ranges, DecodeOptions::default())
    }

    pub fn reader_with_opts(
        &self,
        group: usize,
        name: &str,
        row_ranges: Vec<RowRange>,
        opts: DecodeOptions,
    ) -> ColumnReader {
        ColumnReader::create(
            self.data.clone(),
            self.field(name),
            &self.meta.row_groups[group],
            Arc::new(row_ranges),
            opts,
        )
        .unwrap()
    }

    /// The full row range of one row group.
    pub fn all_rows(&self, group: usize) -> Vec<RowRange> {
        vec![RowRange::new(0, self.meta.row_groups[group].num_rows)]
    }
}

pub fn decode_file_meta(file: &[u8]) -> FileMeta {
    let meta_len = decode_footer_tail(&file[file.len() - FOOTER_TAIL_LEN..]).unwrap();
    let meta_end = file.len() - FOOTER_TAIL_LEN;
    FileMeta::decode(&file[meta_end - meta_len..meta_end]).unwrap()
}

/// Reads the column to the end of its chunk in `batch_size` steps and
/// returns the decoded data with the total row count.
pub fn read_all(
    reader: &mut ColumnReader,
    field: &FieldSchema,
    batch_size: usize,
) -> (ColumnData, usize) {
    let mut column = ColumnData::for_field(field);
    let mut select = ColumnSelectVector::new();
    let mut rows = 0;
    for _ in 0..100_000 {
        let outcome = reader
            .read_column_data(&mut column, &mut select, batch_size, false)
            .unwrap();
        rows += outcome.rows_read;
        if outcome.end_of_chunk {
            return (column, rows);
        }
    }
    panic!("reader did not reach the end of the chunk");
}

/// Projects the cells of one top-level field out of whole-row records.
pub fn field_cells(root: &FieldSchema, rows: &[Cell], name: &str) -> Vec<Cell> {
    let index = root
        .children
        .iter()
        .position(|child| child.name == name)
        .unwrap();
    rows.iter()
        .map(|row| match row {
            Cell::Record(cells) => cells[index].clone(),
            other => panic!("top-level row is not a record: {other:?}"),
        })
        .collect()
}

/// Rebuilds row cells from a decoded column, the inverse of shredding.
pub fn column_to_cells(field: &FieldSchema, column: &ColumnData) -> Vec<Cell> {
    (0..column.len())
        .map(|index| cell_at(field, column, index))
        .collect()
}

fn cell_at(field: &FieldSchema, column: &ColumnData, index: usize) -> Cell {
    match column {
        ColumnData::Nullable(nullable) => {
            if nullable.presence.is_null(index) {
                Cell::Null
            } else {
                cell_at(field, &nullable.inner, index)
            }
        }
        ColumnData::Scalar(scalar) => scalar_cell(scalar, index),
        ColumnData::Array(array) => {
            let range = array.offsets.range_at(index);
            Cell::List(
                (range.start as usize..range.end as usize)
                    .map(|at| cell_at(&field.children[0], &array.elements, at))
                    .collect(),
            )
        }
        ColumnData::Map(map) => {
            let range = map.offsets.range_at(index);
            Cell::Map(
                (range.start as usize..range.end as usize)
                    .map(|at| {
                        (
                            cell_at(&field.children[0], &map.keys, at),
                            cell_at(&field.children[1], &map.values, at),
                        )
                    })
                    .collect(),
            )
        }
        ColumnData::Struct(record) => Cell::Record(
            field
                .children
                .iter()
                .zip(&record.fields)
                .map(|(child, data)| cell_at(child, data, index))
                .collect(),
        ),
    }
}

fn scalar_cell(scalar: &ScalarColumn, index: usize) -> Cell {
    match scalar.type_desc {
        PhysicalType::Boolean => Cell::Bool(scalar.as_slice::<u8>()[index] != 0),
        PhysicalType::Int32 => Cell::Int(scalar.as_slice::<i32>()[index] as i64),
        PhysicalType::Int64 => Cell::Int(scalar.as_slice::<i64>()[index]),
        PhysicalType::Float32 => Cell::Float(scalar.as_slice::<f32>()[index] as f64),
        PhysicalType::Float64 => Cell::Float(scalar.as_slice::<f64>()[index]),
        PhysicalType::Timestamp => Cell::Ts(scalar.as_slice::<i64>()[index]),
        PhysicalType::Binary => Cell::Bytes(scalar.binary_at(index).to_vec()),
    }
}
