use std::sync::Arc;

use sheaf_column::column::{ColumnData, ScalarColumn};
use sheaf_format::metadata::{ColumnChunkMeta, FileMeta, RowGroupMeta};
use sheaf_format::row_range::RowRange;
use sheaf_format::schema::{FieldBuilder, FieldSchema, PhysicalType, SchemaBuilder};
use sheaf_io::ReadAt;
use sheaf_pagestream::write::ChunkBuilder;
use sheaf_pagestream::{ColumnSelectVector, DecodeOptions};
use sheaf_testkit::sample::{sample_rows, sample_schema};

use crate::ColumnReader;
use crate::tests::helpers::TestFile;

/// Lays chunks out back to back and wraps them in a one-group file.
fn single_group_file(
    schema: &FieldSchema,
    chunks: &[(&[u16], &[u16], ScalarColumn)],
    num_rows: u64,
) -> (Arc<Vec<u8>>, FileMeta) {
    let mut data = Vec::new();
    let mut columns = Vec::new();
    for (rep, def, values) in chunks {
        let mut builder = ChunkBuilder::new(values.type_desc);
        builder.add_page(rep, def, values).unwrap();
        let (bytes, meta) = builder.finish(data.len() as u64).unwrap();
        data.extend_from_slice(&bytes);
        columns.push(meta);
    }
    let meta = FileMeta {
        schema: schema.clone(),
        row_groups: vec![RowGroupMeta { num_rows, columns }],
    };
    (Arc::new(data), meta)
}

fn reader_over(
    data: &Arc<Vec<u8>>,
    meta: &FileMeta,
    name: &str,
    num_rows: u64,
) -> ColumnReader {
    ColumnReader::create(
        data.clone() as Arc<dyn ReadAt>,
        meta.schema.field_by_name(name).unwrap(),
        &meta.row_groups[0],
        Arc::new(vec![RowRange::new(0, num_rows)]),
        DecodeOptions::default(),
    )
    .unwrap()
}

fn int_column(values: &[i64]) -> ScalarColumn {
    let mut column = ScalarColumn::new(PhysicalType::Int64);
    column.values.extend_from_slice(values);
    column
}

#[test]
fn test_composite_reader_rejects_leaf_operations() {
    let schema = sample_schema();
    let rows = sample_rows(10, 31);
    let file = TestFile::build(&schema, &[rows], 8, true);

    let mut reader = file.reader(0, "tags", file.all_rows(0));
    assert!(reader.skip(2).is_err());
    let mut dict_values = ScalarColumn::new(PhysicalType::Binary);
    assert!(reader.read_dict_values_to_column(&mut dict_values).is_err());
    assert!(reader.get_dict_codes(&[b"amber".as_slice()]).is_err());
    assert!(
        reader
            .convert_dict_codes_to_binary_column(&ScalarColumn::new(PhysicalType::Int32))
            .is_err()
    );
}

#[test]
fn test_mismatched_target_column_is_an_error() {
    let schema = sample_schema();
    let rows = sample_rows(10, 32);
    let file = TestFile::build(&schema, &[rows], 8, false);
    let mut select = ColumnSelectVector::new();

    // Scalar reader over an array-shaped target.
    let mut id_reader = file.reader(0, "id", file.all_rows(0));
    let mut wrong = ColumnData::for_field(file.field("tags"));
    assert!(
        id_reader
            .read_column_data(&mut wrong, &mut select, 4, false)
            .is_err()
    );

    // Array reader over a scalar-shaped target.
    let mut tags_reader = file.reader(0, "tags", file.all_rows(0));
    let mut wrong = ColumnData::for_field(file.field("id"));
    assert!(
        tags_reader
            .read_column_data(&mut wrong, &mut select, 4, false)
            .is_err()
    );

    // Nullable column decoded into a target without a presence map.
    let mut name_reader = file.reader(0, "name", file.all_rows(0));
    let mut bare = ColumnData::Scalar(ScalarColumn::new(PhysicalType::Binary));
    assert!(
        name_reader
            .read_column_data(&mut bare, &mut select, 4, false)
            .is_err()
    );
}

#[test]
fn test_struct_children_with_unequal_chunks_error() {
    let schema = SchemaBuilder::new(vec![
        FieldBuilder::record(
            "s",
            vec![
                FieldBuilder::scalar("a", PhysicalType::Int64).required(),
                FieldBuilder::scalar("b", PhysicalType::Int64).required(),
            ],
        )
        .required(),
    ])
    .finish();
    let (data, meta) = single_group_file(
        &schema,
        &[
            (&[], &[], int_column(&[1, 2, 3])),
            (&[], &[], int_column(&[4, 5])),
        ],
        3,
    );
    let mut reader = reader_over(&data, &meta, "s", 3);
    let mut column = ColumnData::for_field(meta.schema.field_by_name("s").unwrap());
    let mut select = ColumnSelectVector::new();
    let result = reader.read_column_data(&mut column, &mut select, 10, false);
    assert!(result.is_err());
}

#[test]
fn test_map_key_value_chunk_disagreement_is_an_error() {
    let schema = SchemaBuilder::new(vec![
        FieldBuilder::map(
            "m",
            FieldBuilder::scalar("k", PhysicalType::Int64).required(),
            FieldBuilder::scalar("v", PhysicalType::Int64).required(),
        )
        .required(),
    ])
    .finish();
    // One row of two entries on the key side, two rows of one entry on the
    // value side.
    let (data, meta) = single_group_file(
        &schema,
        &[
            (&[0, 1], &[1, 1], int_column(&[10, 20])),
            (&[0, 0], &[1, 1], int_column(&[7, 8])),
        ],
        2,
    );
    let mut reader = reader_over(&data, &meta, "m", 2);
    let mut column = ColumnData::for_field(meta.schema.field_by_name("m").unwrap());
    let mut select = ColumnSelectVector::new();
    let result = reader.read_column_data(&mut column, &mut select, 10, false);
    assert!(result.is_err());
}

#[test]
fn test_leaf_without_backing_chunk_is_an_error() {
    let schema = SchemaBuilder::new(vec![FieldBuilder::scalar(
        "id",
        PhysicalType::Int64,
    )
    .required()])
    .finish();
    let meta = FileMeta {
        schema: schema.clone(),
        row_groups: vec![RowGroupMeta {
            num_rows: 4,
            columns: Vec::new(),
        }],
    };
    let data: Arc<Vec<u8>> = Arc::new(Vec::new());
    let result = ColumnReader::create(
        data as Arc<dyn ReadAt>,
        meta.schema.field_by_name("id").unwrap(),
        &meta.row_groups[0],
        Arc::new(vec![RowRange::new(0, 4)]),
        DecodeOptions::default(),
    );
    assert!(result.is_err());
}
