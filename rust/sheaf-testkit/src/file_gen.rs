//! Chunk, row group and file assembly from shredded rows.

use sheaf_column::column::ScalarColumn;
use sheaf_format::metadata::{ColumnChunkMeta, FileMeta, RowGroupMeta};
use sheaf_format::schema::FieldSchema;
use sheaf_pagestream::write::ChunkBuilder;

use crate::rows::{Cell, ShreddedColumn, shred};

/// Encodes the column chunk of one shredded leaf, split into pages of
/// `page_rows` top-level rows each (the last page may be shorter).
///
/// When `dict` is set the chunk carries a dictionary page and data pages
/// hold dictionary codes. The returned metadata records `file_offset` as
/// the chunk position, so the caller can append the bytes at exactly that
/// offset.
pub fn build_chunk(
    column: &ShreddedColumn,
    page_rows: usize,
    dict: bool,
    file_offset: u64,
) -> anyhow::Result<(Vec<u8>, ColumnChunkMeta)> {
    assert_ne!(page_rows, 0);
    let leaf = &column.leaf;
    let mut builder = ChunkBuilder::new(leaf.physical_type.expect("leaf physical type"));
    builder.set_dictionary(dict)?;

    // Level slots whose repetition level is zero begin a top-level row.
    let row_starts: Vec<usize> = (0..column.rep_levels.len())
        .filter(|&slot| column.rep_levels[slot] == 0)
        .collect();
    let mut value_cursor = 0;
    let mut page_row = 0;
    while page_row < row_starts.len() {
        let end_row = (page_row + page_rows).min(row_starts.len());
        let begin = row_starts[page_row];
        let end = if end_row == row_starts.len() {
            column.rep_levels.len()
        } else {
            row_starts[end_row]
        };
        let rep_slice = &column.rep_levels[begin..end];
        let def_slice = &column.def_levels[begin..end];
        let present = def_slice
            .iter()
            .filter(|&&def| def >= leaf.definition_level)
            .count();
        let values = copy_values(&column.values, value_cursor, present);
        value_cursor += present;
        let rep_arg: &[u16] = if leaf.repetition_level > 0 { rep_slice } else { &[] };
        let def_arg: &[u16] = if leaf.definition_level > 0 { def_slice } else { &[] };
        builder.add_page(rep_arg, def_arg, &values)?;
        page_row = end_row;
    }
    Ok(builder.finish(file_offset)?)
}

/// Shreds `rows`, appends one chunk per leaf of `root` to `sink` and
/// returns the row group metadata describing them.
pub fn build_row_group(
    root: &FieldSchema,
    rows: &[Cell],
    page_rows: usize,
    dict: bool,
    sink: &mut Vec<u8>,
) -> anyhow::Result<RowGroupMeta> {
    let columns = shred(root, rows)?;
    let mut metas = Vec::with_capacity(columns.len());
    for column in &columns {
        let (bytes, meta) = build_chunk(column, page_rows, dict, sink.len() as u64)?;
        sink.extend_from_slice(&bytes);
        metas.push(meta);
    }
    Ok(RowGroupMeta {
        num_rows: rows.len() as u64,
        columns: metas,
    })
}

/// Builds a complete in-memory file: one row group per entry of
/// `row_groups`, followed by the footer.
pub fn build_file(
    root: &FieldSchema,
    row_groups: &[Vec<Cell>],
    page_rows: usize,
    dict: bool,
) -> anyhow::Result<Vec<u8>> {
    let mut sink = Vec::new();
    let mut groups = Vec::with_capacity(row_groups.len());
    for rows in row_groups {
        groups.push(build_row_group(root, rows, page_rows, dict, &mut sink)?);
    }
    let meta = FileMeta {
        schema: root.clone(),
        row_groups: groups,
    };
    meta.write_footer(&mut sink);
    Ok(sink)
}

fn copy_values(source: &ScalarColumn, from: usize, count: usize) -> ScalarColumn {
    let mut out = ScalarColumn::new(source.type_desc);
    match source.type_desc.fixed_size() {
        Some(size) => {
            let bytes = source.values.as_bytes();
            out.values.push_bytes(&bytes[from * size..(from + count) * size]);
        }
        None => {
            for index in from..from + count {
                out.push_binary(source.binary_at(index));
            }
        }
    }
    out
}
