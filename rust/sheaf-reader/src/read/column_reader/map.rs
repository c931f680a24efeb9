//! Map reader: key and value chunks sharing one set of offsets.

use sheaf_column::column::ColumnData;
use sheaf_common::{Error, Result, verify_data};
use sheaf_format::schema::FieldSchema;
use sheaf_pagestream::ColumnSelectVector;

use crate::read::column_reader::{ColumnReader, ReadOutcome};
use crate::read::levels;

/// Reads a map column by decoding the key and value subtrees in lockstep.
///
/// Key and value leaves of one map carry identical repetition structure, so
/// offsets and presence come from the key side alone; the value side must
/// report the same row count and end state.
pub struct MapColumnReader {
    field: FieldSchema,
    keys: ColumnReader,
    values: ColumnReader,
}

impl MapColumnReader {
    pub(crate) fn new(
        field: FieldSchema,
        keys: ColumnReader,
        values: ColumnReader,
    ) -> MapColumnReader {
        MapColumnReader {
            field,
            keys,
            values,
        }
    }

    pub(crate) fn keys(&self) -> &ColumnReader {
        &self.keys
    }

    pub(crate) fn keys_mut(&mut self) -> &mut ColumnReader {
        &mut self.keys
    }

    pub(crate) fn values_mut(&mut self) -> &mut ColumnReader {
        &mut self.values
    }

    pub fn read_column_data(
        &mut self,
        column: &mut ColumnData,
        select: &mut ColumnSelectVector,
        batch_size: usize,
        is_dict_filter: bool,
    ) -> Result<ReadOutcome> {
        let (presence, data) = column.split_presence_mut();
        if presence.is_none() && self.field.is_nullable {
            return Err(Error::corruption(
                self.field.name.as_str(),
                "null values in a column read as non-nullable",
            ));
        }
        let map = data
            .as_map_mut()
            .ok_or_else(|| Error::invalid_arg("column", "map reader over a non-map column"))?;

        let key_outcome =
            self.keys
                .read_column_data(&mut map.keys, select, batch_size, is_dict_filter)?;
        select.reset();
        let value_outcome =
            self.values
                .read_column_data(&mut map.values, select, batch_size, is_dict_filter)?;
        verify_data!(
            map_entries,
            key_outcome.rows_read == value_outcome.rows_read
        );
        verify_data!(
            map_entries,
            key_outcome.end_of_chunk == value_outcome.end_of_chunk
        );
        if key_outcome.rows_read == 0 {
            return Ok(key_outcome);
        }

        levels::fill_array_offsets(
            &self.field,
            &mut map.offsets,
            presence,
            self.keys.rep_levels(),
            self.keys.def_levels(),
        );
        Ok(key_outcome)
    }
}
