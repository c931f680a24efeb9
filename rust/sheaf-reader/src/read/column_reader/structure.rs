//! Struct reader: one child reader per field, presence from the first.

use sheaf_column::column::ColumnData;
use sheaf_common::{Error, Result, verify_data};
use sheaf_format::schema::FieldSchema;
use sheaf_pagestream::ColumnSelectVector;

use crate::read::column_reader::{ColumnReader, ReadOutcome};
use crate::read::levels;

/// Reads a struct column by decoding every field subtree in lockstep.
///
/// All children of one struct advance through the same top-level rows, so
/// the first child serves as the reference for the row count and end state,
/// and its level streams rebuild the struct's own presence.
pub struct StructColumnReader {
    field: FieldSchema,
    children: Vec<ColumnReader>,
}

impl StructColumnReader {
    pub(crate) fn new(field: FieldSchema, children: Vec<ColumnReader>) -> StructColumnReader {
        StructColumnReader { field, children }
    }

    pub(crate) fn children(&self) -> &[ColumnReader] {
        &self.children
    }

    pub(crate) fn children_mut(&mut self) -> &mut [ColumnReader] {
        &mut self.children
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
        let record = data.as_struct_mut().ok_or_else(|| {
            Error::invalid_arg("column", "struct reader over a non-struct column")
        })?;
        if record.fields.len() != self.children.len() {
            return Err(Error::invalid_operation("wrong number of struct fields"));
        }

        let mut outcome = ReadOutcome::default();
        for (index, (reader, target)) in
            self.children.iter_mut().zip(&mut record.fields).enumerate()
        {
            select.reset();
            let child = reader.read_column_data(target, select, batch_size, is_dict_filter)?;
            if index == 0 {
                outcome = child;
            } else {
                verify_data!(struct_fields, child.rows_read == outcome.rows_read);
                verify_data!(struct_fields, child.end_of_chunk == outcome.end_of_chunk);
            }
        }

        if let Some(presence) = presence {
            levels::fill_struct_presence(
                &self.field,
                presence,
                self.children[0].rep_levels(),
                self.children[0].def_levels(),
            );
        }
        Ok(outcome)
    }
}
