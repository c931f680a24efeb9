//! Resolved schema model.
//!
//! A schema is a tree of [`FieldSchema`] nodes rooted at an anonymous struct.
//! Each node carries the level bookkeeping needed to interpret the flattened
//! leaf streams of a column chunk:
//!
//! * `definition_level`: the definition level at or above which a value slot
//!   at this node is present. For arrays and maps, `definition_level - 1`
//!   marks a present-but-empty collection.
//! * `repetition_level`: the depth of the deepest repeated node on the path
//!   from the root up to and including this node. A stream value whose
//!   repetition level equals this starts a new element of this collection;
//!   a lower value starts a new slot in some enclosing scope.
//! * `repeated_parent_def_level`: the definition level of the nearest
//!   repeated ancestor, or 0 when there is none. Stream levels strictly below
//!   it belong to an ancestor and contribute no slot at this node.
//!
//! Schemas are constructed through [`SchemaBuilder`], which assigns all
//! levels and the per-leaf physical column indexes.

/// Storage type of a leaf column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhysicalType {
    Boolean,
    Int32,
    Int64,
    Float32,
    Float64,
    /// Microseconds since the Unix epoch, stored as `i64`.
    Timestamp,
    /// Variable-length byte sequence (also used for strings).
    Binary,
}

impl PhysicalType {
    /// Returns the encoded size of a single value, or `None` for
    /// variable-length types.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            PhysicalType::Boolean => Some(1),
            PhysicalType::Int32 | PhysicalType::Float32 => Some(4),
            PhysicalType::Int64 | PhysicalType::Float64 | PhysicalType::Timestamp => Some(8),
            PhysicalType::Binary => None,
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, PhysicalType::Binary)
    }
}

/// Structural kind of a schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Scalar,
    Array,
    Map,
    Struct,
}

/// A resolved schema node.
///
/// Leaves (`FieldKind::Scalar`) map one-to-one onto column chunks within a
/// row group, addressed by `physical_column_index`. Composite nodes describe
/// how leaf streams reassemble into nested columns.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub name: String,
    pub kind: FieldKind,
    /// Present on leaves only.
    pub physical_type: Option<PhysicalType>,
    /// Whether this node itself admits nulls.
    pub is_nullable: bool,
    pub definition_level: u16,
    pub repetition_level: u16,
    pub repeated_parent_def_level: u16,
    /// Index of the backing column chunk within a row group. Meaningful on
    /// leaves; 0 elsewhere.
    pub physical_column_index: usize,
    /// Array: one element node. Map: exactly `[key, value]`. Struct: one node
    /// per field.
    pub children: Vec<FieldSchema>,
}

impl FieldSchema {
    pub fn is_leaf(&self) -> bool {
        self.kind == FieldKind::Scalar
    }

    /// Looks up a direct child by name.
    pub fn field_by_name(&self, name: &str) -> Option<&FieldSchema> {
        self.children.iter().find(|f| f.name == name)
    }

    /// Number of leaves in this subtree.
    pub fn leaf_count(&self) -> usize {
        if self.is_leaf() {
            1
        } else {
            self.children.iter().map(FieldSchema::leaf_count).sum()
        }
    }

    /// Visits every leaf of this subtree in depth-first order.
    pub fn for_each_leaf<'a>(&'a self, visit: &mut impl FnMut(&'a FieldSchema)) {
        if self.is_leaf() {
            visit(self);
        } else {
            for child in &self.children {
                child.for_each_leaf(visit);
            }
        }
    }
}

/// A builder for creating a schema with fields.
#[derive(Default)]
pub struct SchemaBuilder {
    fields: Vec<FieldBuilder>,
}

impl SchemaBuilder {
    /// Creates a new `SchemaBuilder` from the given top-level fields.
    pub fn new(fields: Vec<FieldBuilder>) -> SchemaBuilder {
        let mut builder = SchemaBuilder::default();
        for field in fields {
            builder.add_field(field);
        }
        builder
    }

    /// Adds a top-level field to the schema.
    ///
    /// # Panics
    ///
    /// Panics if the field name is empty or duplicates an existing field.
    pub fn add_field(&mut self, field: FieldBuilder) {
        assert!(!field.name.is_empty());
        assert!(self.fields.iter().all(|f| f.name != field.name));
        self.fields.push(field);
    }

    /// Finishes building the schema: assigns definition/repetition levels and
    /// physical column indexes, and returns the root node.
    ///
    /// The root is an anonymous, non-nullable struct whose children are the
    /// top-level fields.
    pub fn finish(self) -> FieldSchema {
        let mut next_column = 0usize;
        let ctx = LevelContext {
            def: 0,
            rep: 0,
            repeated_parent_def: 0,
        };
        let children = self
            .fields
            .into_iter()
            .map(|f| f.resolve(ctx, &mut next_column))
            .collect();
        FieldSchema {
            name: String::new(),
            kind: FieldKind::Struct,
            physical_type: None,
            is_nullable: false,
            definition_level: 0,
            repetition_level: 0,
            repeated_parent_def_level: 0,
            physical_column_index: 0,
            children,
        }
    }
}

#[derive(Clone, Copy)]
struct LevelContext {
    def: u16,
    rep: u16,
    repeated_parent_def: u16,
}

/// An unresolved schema node. Fields are nullable unless [`required`] is
/// called.
///
/// [`required`]: FieldBuilder::required
pub struct FieldBuilder {
    name: String,
    kind: FieldKind,
    physical_type: Option<PhysicalType>,
    nullable: bool,
    children: Vec<FieldBuilder>,
}

impl FieldBuilder {
    pub fn scalar(name: impl Into<String>, physical_type: PhysicalType) -> FieldBuilder {
        FieldBuilder {
            name: name.into(),
            kind: FieldKind::Scalar,
            physical_type: Some(physical_type),
            nullable: true,
            children: Vec::new(),
        }
    }

    pub fn list(name: impl Into<String>, element: FieldBuilder) -> FieldBuilder {
        FieldBuilder {
            name: name.into(),
            kind: FieldKind::Array,
            physical_type: None,
            nullable: true,
            children: vec![element],
        }
    }

    pub fn map(name: impl Into<String>, key: FieldBuilder, value: FieldBuilder) -> FieldBuilder {
        FieldBuilder {
            name: name.into(),
            kind: FieldKind::Map,
            physical_type: None,
            nullable: true,
            children: vec![key, value],
        }
    }

    pub fn record(name: impl Into<String>, fields: Vec<FieldBuilder>) -> FieldBuilder {
        assert!(!fields.is_empty());
        FieldBuilder {
            name: name.into(),
            kind: FieldKind::Struct,
            physical_type: None,
            nullable: true,
            children: fields,
        }
    }

    /// Marks the field as non-nullable.
    pub fn required(mut self) -> FieldBuilder {
        self.nullable = false;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn resolve(self, ctx: LevelContext, next_column: &mut usize) -> FieldSchema {
        let own_optional = self.nullable as u16;
        match self.kind {
            FieldKind::Scalar => {
                let index = *next_column;
                *next_column += 1;
                FieldSchema {
                    name: self.name,
                    kind: FieldKind::Scalar,
                    physical_type: self.physical_type,
                    is_nullable: self.nullable,
                    definition_level: ctx.def + own_optional,
                    repetition_level: ctx.rep,
                    repeated_parent_def_level: ctx.repeated_parent_def,
                    physical_column_index: index,
                    children: Vec::new(),
                }
            }
            FieldKind::Struct => {
                let def = ctx.def + own_optional;
                let child_ctx = LevelContext { def, ..ctx };
                let children = self
                    .children
                    .into_iter()
                    .map(|f| f.resolve(child_ctx, next_column))
                    .collect();
                FieldSchema {
                    name: self.name,
                    kind: FieldKind::Struct,
                    physical_type: None,
                    is_nullable: self.nullable,
                    definition_level: def,
                    repetition_level: ctx.rep,
                    repeated_parent_def_level: ctx.repeated_parent_def,
                    physical_column_index: 0,
                    children,
                }
            }
            FieldKind::Array | FieldKind::Map => {
                // The repeated group contributes one definition level on top
                // of the node's own optionality.
                let def = ctx.def + own_optional + 1;
                let rep = ctx.rep + 1;
                let child_ctx = LevelContext {
                    def,
                    rep,
                    repeated_parent_def: def,
                };
                let children: Vec<_> = self
                    .children
                    .into_iter()
                    .map(|f| f.resolve(child_ctx, next_column))
                    .collect();
                FieldSchema {
                    name: self.name,
                    kind: self.kind,
                    physical_type: None,
                    is_nullable: self.nullable,
                    definition_level: def,
                    repetition_level: rep,
                    repeated_parent_def_level: ctx.repeated_parent_def,
                    physical_column_index: 0,
                    children,
                }
            }
        }
    }
}
