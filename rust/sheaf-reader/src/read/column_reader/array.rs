//! Array reader: element chunk plus reconstructed offsets.

use sheaf_column::column::ColumnData;
use sheaf_common::{Error, Result};
use sheaf_format::schema::FieldSchema;
use sheaf_pagestream::ColumnSelectVector;

use crate::read::column_reader::{ColumnReader, ReadOutcome};
use crate::read::levels;

/// Reads an array column by decoding its element subtree and rebuilding the
/// per-row offsets from the element's level streams.
pub struct ArrayColumnReader {
    field: FieldSchema,
    elements: ColumnReader,
}

impl ArrayColumnReader {
    pub(crate) fn new(field: FieldSchema, elements: ColumnReader) -> ArrayColumnReader {
        ArrayColumnReader { field, elements }
    }

    pub(crate) fn elements(&self) -> &ColumnReader {
        &self.elements
    }

    pub(crate) fn elements_mut(&mut self) -> &mut ColumnReader {
        &mut self.elements
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
        let array = data.as_array_mut().ok_or_else(|| {
            Error::invalid_arg("column", "array reader over a non-array column")
        })?;

        let outcome = self.elements.read_column_data(
            &mut array.elements,
            select,
            batch_size,
            is_dict_filter,
        )?;
        if outcome.rows_read == 0 {
            return Ok(outcome);
        }

        levels::fill_array_offsets(
            &self.field,
            &mut array.offsets,
            presence,
            self.elements.rep_levels(),
            self.elements.def_levels(),
        );
        Ok(outcome)
    }
}
