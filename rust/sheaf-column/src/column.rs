//! The nested column model.

use sheaf_format::schema::{FieldKind, FieldSchema, PhysicalType};

use crate::offsets::Offsets;
use crate::presence::Presence;
use crate::values::Values;

/// A leaf column: raw values of a single physical type, with offsets for
/// variable-length data.
#[derive(Debug, Clone)]
pub struct ScalarColumn {
    pub type_desc: PhysicalType,
    pub values: Values,
    /// Present iff `type_desc` is variable-length.
    pub offsets: Option<Offsets>,
}

impl ScalarColumn {
    pub fn new(type_desc: PhysicalType) -> ScalarColumn {
        ScalarColumn {
            type_desc,
            values: Values::new(),
            offsets: type_desc.is_binary().then(Offsets::new),
        }
    }

    pub fn len(&self) -> usize {
        match &self.offsets {
            Some(offsets) => offsets.item_count(),
            None => {
                self.values.bytes_len()
                    / self
                        .type_desc
                        .fixed_size()
                        .expect("fixed-size physical type")
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends `count` default slots (zeros, or empty byte strings).
    pub fn append_nulls(&mut self, count: usize) {
        if let Some(offsets) = &mut self.offsets {
            offsets.push_empty(count);
        } else {
            let size = self
                .type_desc
                .fixed_size()
                .expect("fixed-size physical type");
            self.values.append_zero_bytes(count * size);
        }
    }

    /// Appends a variable-length value.
    ///
    /// # Panics
    ///
    /// Panics if the column is fixed-width.
    pub fn push_binary(&mut self, value: &[u8]) {
        let offsets = self.offsets.as_mut().expect("variable-length column");
        offsets.push_length(value.len());
        self.values.push_bytes(value);
    }

    pub fn binary_at(&self, index: usize) -> &[u8] {
        let range = self
            .offsets
            .as_ref()
            .expect("variable-length column")
            .range_at(index);
        &self.values.as_bytes()[range.start as usize..range.end as usize]
    }

    pub fn as_slice<T: bytemuck::Pod>(&self) -> &[T] {
        self.values.as_slice()
    }

    pub fn clear(&mut self) {
        self.values.clear();
        if let Some(offsets) = &mut self.offsets {
            offsets.clear();
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArrayColumn {
    pub offsets: Offsets,
    pub elements: Box<ColumnData>,
}

#[derive(Debug, Clone)]
pub struct MapColumn {
    pub offsets: Offsets,
    pub keys: Box<ColumnData>,
    pub values: Box<ColumnData>,
}

#[derive(Debug, Clone)]
pub struct StructColumn {
    pub fields: Vec<ColumnData>,
}

#[derive(Debug, Clone)]
pub struct NullableColumn {
    pub presence: Presence,
    pub inner: Box<ColumnData>,
}

impl NullableColumn {
    /// Borrows the presence map and the wrapped column at once.
    pub fn parts_mut(&mut self) -> (&mut Presence, &mut ColumnData) {
        (&mut self.presence, &mut self.inner)
    }
}

/// A decoded column of any shape.
///
/// The shape mirrors the schema: `Nullable` wraps the column of every
/// nullable field, arrays and maps hold offsets plus child columns, structs
/// hold one column per field. `Nullable` never wraps another `Nullable`.
#[derive(Debug, Clone)]
pub enum ColumnData {
    Scalar(ScalarColumn),
    Array(ArrayColumn),
    Map(MapColumn),
    Struct(StructColumn),
    Nullable(NullableColumn),
}

impl ColumnData {
    /// Builds an empty column tree shaped like the field's subtree.
    pub fn for_field(field: &FieldSchema) -> ColumnData {
        let data = match field.kind {
            FieldKind::Scalar => ColumnData::Scalar(ScalarColumn::new(
                field.physical_type.expect("leaf field physical type"),
            )),
            FieldKind::Array => ColumnData::Array(ArrayColumn {
                offsets: Offsets::new(),
                elements: Box::new(ColumnData::for_field(&field.children[0])),
            }),
            FieldKind::Map => ColumnData::Map(MapColumn {
                offsets: Offsets::new(),
                keys: Box::new(ColumnData::for_field(&field.children[0])),
                values: Box::new(ColumnData::for_field(&field.children[1])),
            }),
            FieldKind::Struct => ColumnData::Struct(StructColumn {
                fields: field.children.iter().map(ColumnData::for_field).collect(),
            }),
        };
        if field.is_nullable {
            ColumnData::Nullable(NullableColumn {
                presence: Presence::new(),
                inner: Box::new(data),
            })
        } else {
            data
        }
    }

    /// Number of slots at this level.
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Scalar(scalar) => scalar.len(),
            ColumnData::Array(array) => array.offsets.item_count(),
            ColumnData::Map(map) => map.offsets.item_count(),
            ColumnData::Struct(record) => {
                record.fields.first().map_or(0, ColumnData::len)
            }
            ColumnData::Nullable(nullable) => nullable.presence.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Splits a nullable column into its presence map and payload; a
    /// non-nullable column passes through with no presence.
    pub fn split_presence_mut(&mut self) -> (Option<&mut Presence>, &mut ColumnData) {
        match self {
            ColumnData::Nullable(nullable) => {
                let (presence, inner) = nullable.parts_mut();
                (Some(presence), inner)
            }
            other => (None, other),
        }
    }

    pub fn as_scalar(&self) -> Option<&ScalarColumn> {
        match self {
            ColumnData::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn as_scalar_mut(&mut self) -> Option<&mut ScalarColumn> {
        match self {
            ColumnData::Scalar(scalar) => Some(scalar),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayColumn> {
        match self {
            ColumnData::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut ArrayColumn> {
        match self {
            ColumnData::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapColumn> {
        match self {
            ColumnData::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_map_mut(&mut self) -> Option<&mut MapColumn> {
        match self {
            ColumnData::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructColumn> {
        match self {
            ColumnData::Struct(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_struct_mut(&mut self) -> Option<&mut StructColumn> {
        match self {
            ColumnData::Struct(record) => Some(record),
            _ => None,
        }
    }

    pub fn as_nullable(&self) -> Option<&NullableColumn> {
        match self {
            ColumnData::Nullable(nullable) => Some(nullable),
            _ => None,
        }
    }

    /// The payload column, unwrapping a `Nullable` if present.
    pub fn payload(&self) -> &ColumnData {
        match self {
            ColumnData::Nullable(nullable) => &nullable.inner,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheaf_format::schema::{FieldBuilder, SchemaBuilder};

    #[test]
    fn test_scalar_append() {
        let mut column = ScalarColumn::new(PhysicalType::Int64);
        column.values.push(5i64);
        column.append_nulls(2);
        column.values.push(9i64);
        assert_eq!(column.as_slice::<i64>(), &[5, 0, 0, 9]);
        assert_eq!(column.len(), 4);
    }

    #[test]
    fn test_binary_column() {
        let mut column = ScalarColumn::new(PhysicalType::Binary);
        column.push_binary(b"ab");
        column.append_nulls(1);
        column.push_binary(b"xyz");
        assert_eq!(column.len(), 3);
        assert_eq!(column.binary_at(0), b"ab");
        assert_eq!(column.binary_at(1), b"");
        assert_eq!(column.binary_at(2), b"xyz");
    }

    #[test]
    fn test_for_field_shapes() {
        let root = SchemaBuilder::new(vec![
            FieldBuilder::scalar("id", PhysicalType::Int64).required(),
            FieldBuilder::list("tags", FieldBuilder::scalar("item", PhysicalType::Binary)),
            FieldBuilder::map(
                "attrs",
                FieldBuilder::scalar("key", PhysicalType::Binary).required(),
                FieldBuilder::scalar("value", PhysicalType::Int32),
            ),
        ])
        .finish();

        let id = ColumnData::for_field(root.field_by_name("id").unwrap());
        assert!(id.as_scalar().is_some());

        let tags = ColumnData::for_field(root.field_by_name("tags").unwrap());
        let tags_payload = tags.payload();
        let array = tags_payload.as_array().unwrap();
        assert!(array.elements.as_nullable().is_some());

        let attrs = ColumnData::for_field(root.field_by_name("attrs").unwrap());
        let map = attrs.payload().as_map().unwrap();
        assert!(map.keys.as_scalar().is_some());
        assert!(map.values.as_nullable().is_some());
    }

    #[test]
    fn test_split_presence() {
        let root = SchemaBuilder::new(vec![FieldBuilder::scalar(
            "v",
            PhysicalType::Int32,
        )])
        .finish();
        let mut column = ColumnData::for_field(root.field_by_name("v").unwrap());
        {
            let (presence, data) = column.split_presence_mut();
            let presence = presence.unwrap();
            presence.push_non_null();
            presence.push_null();
            let scalar = data.as_scalar_mut().unwrap();
            scalar.values.push(3i32);
            scalar.append_nulls(1);
        }
        assert_eq!(column.len(), 2);
        let nullable = column.as_nullable().unwrap();
        assert!(nullable.presence.is_null(1));
        assert_eq!(nullable.inner.as_scalar().unwrap().as_slice::<i32>(), &[3, 0]);
    }
}
