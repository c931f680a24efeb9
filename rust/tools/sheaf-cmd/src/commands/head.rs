//! Head command implementation

use anyhow::{Context, Result};
use serde_json::Value;
use std::sync::Arc;

use sheaf_column::column::{ColumnData, ScalarColumn};
use sheaf_format::metadata::RowGroupMeta;
use sheaf_format::row_range::RowRange;
use sheaf_format::schema::{FieldKind, FieldSchema, PhysicalType};
use sheaf_io::ReadAt;
use sheaf_pagestream::{ColumnSelectVector, DecodeOptions};
use sheaf_reader::ColumnReader;

use crate::commands::open_file;

/// Run the head command
pub fn run(
    count: Option<u64>,
    column: Option<String>,
    batch_size: u64,
    file_path: String,
) -> Result<()> {
    if batch_size == 0 {
        anyhow::bail!("batch-size must be at least 1");
    }

    let (file, meta) = open_file(&file_path)?;
    let fields: Vec<&FieldSchema> = match &column {
        Some(name) => {
            let field = meta
                .schema
                .field_by_name(name)
                .with_context(|| format!("Column not found: {name}"))?;
            vec![field]
        }
        None => meta.schema.children.iter().collect(),
    };
    if fields.is_empty() {
        anyhow::bail!("The file has no columns");
    }

    let limit = count.unwrap_or(10);
    let mut remaining = limit;
    for row_group in &meta.row_groups {
        if remaining == 0 {
            break;
        }
        remaining = print_row_group(&file, &fields, row_group, batch_size as usize, remaining)?;
    }

    if remaining == limit {
        println!("No rows found.");
    }
    Ok(())
}

/// Reads one row group, printing rows until `remaining` hits zero or
/// the group ends. Returns the updated remaining count.
fn print_row_group(
    file: &Arc<dyn ReadAt>,
    fields: &[&FieldSchema],
    row_group: &RowGroupMeta,
    batch_size: usize,
    mut remaining: u64,
) -> Result<u64> {
    let row_ranges = Arc::new(vec![RowRange::new(0, row_group.num_rows)]);
    let mut readers = Vec::with_capacity(fields.len());
    for field in fields {
        readers.push(ColumnReader::create(
            file.clone(),
            field,
            row_group,
            row_ranges.clone(),
            DecodeOptions::default(),
        )?);
    }
    let mut selects: Vec<_> = fields.iter().map(|_| ColumnSelectVector::new()).collect();

    loop {
        if remaining == 0 {
            return Ok(0);
        }

        let mut columns = Vec::with_capacity(fields.len());
        let mut rows_read = None;
        let mut end_of_chunk = true;
        for ((field, reader), select) in fields.iter().zip(&mut readers).zip(&mut selects) {
            let mut data = ColumnData::for_field(field);
            let outcome = reader.read_column_data(&mut data, select, batch_size, false)?;
            if let Some(rows) = rows_read {
                anyhow::ensure!(
                    outcome.rows_read == rows,
                    "columns of the row group returned different row counts"
                );
            }
            rows_read = Some(outcome.rows_read);
            end_of_chunk &= outcome.end_of_chunk;
            columns.push(data);
        }

        let take = remaining.min(rows_read.unwrap_or(0) as u64) as usize;
        for row in 0..take {
            let mut object = serde_json::Map::new();
            for (field, data) in fields.iter().zip(&columns) {
                object.insert(field.name.clone(), value_at(field, data, row));
            }
            println!("{}", serde_json::to_string(&Value::Object(object))?);
        }
        remaining -= take as u64;

        if end_of_chunk {
            return Ok(remaining);
        }
    }
}

/// Renders row `row` of `column` as a JSON value. The column shape is the
/// one [`ColumnData::for_field`] builds for `field`.
fn value_at(field: &FieldSchema, column: &ColumnData, row: usize) -> Value {
    if let ColumnData::Nullable(nullable) = column {
        if nullable.presence.is_null(row) {
            return Value::Null;
        }
        return value_at(field, &nullable.inner, row);
    }
    match (field.kind, column) {
        (FieldKind::Scalar, ColumnData::Scalar(scalar)) => scalar_value(scalar, row),
        (FieldKind::Array, ColumnData::Array(array)) => {
            let range = array.offsets.range_at(row);
            Value::Array(
                (range.start..range.end)
                    .map(|index| value_at(&field.children[0], &array.elements, index as usize))
                    .collect(),
            )
        }
        (FieldKind::Map, ColumnData::Map(map)) => {
            let range = map.offsets.range_at(row);
            let mut object = serde_json::Map::new();
            for index in range.start..range.end {
                let key = json_key(value_at(&field.children[0], &map.keys, index as usize));
                let value = value_at(&field.children[1], &map.values, index as usize);
                object.insert(key, value);
            }
            Value::Object(object)
        }
        (FieldKind::Struct, ColumnData::Struct(record)) => {
            let mut object = serde_json::Map::new();
            for (child, data) in field.children.iter().zip(&record.fields) {
                object.insert(child.name.clone(), value_at(child, data, row));
            }
            Value::Object(object)
        }
        _ => unreachable!("column data shaped by the field schema"),
    }
}

fn scalar_value(scalar: &ScalarColumn, row: usize) -> Value {
    match scalar.type_desc {
        PhysicalType::Boolean => Value::Bool(scalar.values.as_slice::<u8>()[row] != 0),
        PhysicalType::Int32 => Value::from(scalar.values.as_slice::<i32>()[row]),
        PhysicalType::Int64 => Value::from(scalar.values.as_slice::<i64>()[row]),
        PhysicalType::Float32 => Value::from(scalar.values.as_slice::<f32>()[row] as f64),
        PhysicalType::Float64 => Value::from(scalar.values.as_slice::<f64>()[row]),
        PhysicalType::Timestamp => Value::from(scalar.values.as_slice::<i64>()[row]),
        PhysicalType::Binary => {
            Value::String(String::from_utf8_lossy(scalar.binary_at(row)).into_owned())
        }
    }
}

fn json_key(value: Value) -> String {
    match value {
        Value::String(key) => key,
        other => other.to_string(),
    }
}
