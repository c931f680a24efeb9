//! Nested row model and the level shredder.
//!
//! This module provides a small dynamically-typed row representation and a
//! shredder that flattens rows into per-leaf repetition/definition level
//! streams plus densely packed values, the inverse of what the reader
//! crates reassemble.

use sheaf_column::column::ScalarColumn;
use sheaf_format::schema::{FieldKind, FieldSchema, PhysicalType};

/// One logical value within a nested row.
///
/// `Int` covers every integer-typed leaf (32-bit leaves truncate),
/// `Bytes` covers strings, and `Ts` holds microseconds since the epoch.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Bytes(Vec<u8>),
    Ts(i64),
    List(Vec<Cell>),
    Map(Vec<(Cell, Cell)>),
    Record(Vec<Cell>),
}

impl Cell {
    /// Builds a `Bytes` cell from a string literal.
    pub fn str(value: &str) -> Cell {
        Cell::Bytes(value.as_bytes().to_vec())
    }
}

/// The flattened streams of one leaf produced by [`shred`].
///
/// `rep_levels` and `def_levels` always carry one entry per level slot,
/// even for leaves whose maximum level is zero; the chunk encoder drops
/// the streams a leaf does not need. `values` holds only the present
/// values, in stream order.
#[derive(Debug, Clone)]
pub struct ShreddedColumn {
    pub leaf: FieldSchema,
    pub rep_levels: Vec<u16>,
    pub def_levels: Vec<u16>,
    pub values: ScalarColumn,
}

/// Flattens `rows` of `field` into one level/value stream per leaf, in
/// depth-first leaf order.
///
/// Each row contributes at least one level entry to every leaf below
/// `field`. A repetition level of zero marks the start of a new row;
/// deeper repetition levels continue the innermost collection still open
/// at that depth. Definition levels record how far down the path the
/// value is actually present.
pub fn shred(field: &FieldSchema, rows: &[Cell]) -> anyhow::Result<Vec<ShreddedColumn>> {
    let mut columns = Vec::with_capacity(field.leaf_count());
    field.for_each_leaf(&mut |leaf| {
        columns.push(ShreddedColumn {
            leaf: leaf.clone(),
            rep_levels: Vec::new(),
            def_levels: Vec::new(),
            values: ScalarColumn::new(leaf.physical_type.expect("leaf physical type")),
        });
    });
    for row in rows {
        shred_cell(field, row, 0, 0, &mut columns, 0)?;
    }
    Ok(columns)
}

/// Recursively shreds `cell` into the leaf columns of `field`'s subtree.
///
/// `at` is the position of the subtree's first leaf within `columns`;
/// `rep` and `def` are the levels accumulated on the path so far.
fn shred_cell(
    field: &FieldSchema,
    cell: &Cell,
    rep: u16,
    def: u16,
    columns: &mut [ShreddedColumn],
    at: usize,
) -> anyhow::Result<()> {
    if matches!(cell, Cell::Null) {
        anyhow::ensure!(
            field.is_nullable,
            "null cell for required field '{}'",
            field.name
        );
        emit_levels(field, columns, at, rep, def);
        return Ok(());
    }
    let def = def + field.is_nullable as u16;
    match field.kind {
        FieldKind::Scalar => {
            let column = &mut columns[at];
            column.rep_levels.push(rep);
            column.def_levels.push(def);
            push_value(&mut column.values, cell)
        }
        FieldKind::Struct => {
            let Cell::Record(cells) = cell else {
                anyhow::bail!("field '{}' expects a record cell, got {cell:?}", field.name);
            };
            anyhow::ensure!(
                cells.len() == field.children.len(),
                "record width mismatch for field '{}': {} cells, {} children",
                field.name,
                cells.len(),
                field.children.len()
            );
            let mut child_at = at;
            for (child, value) in field.children.iter().zip(cells) {
                shred_cell(child, value, rep, def, columns, child_at)?;
                child_at += child.leaf_count();
            }
            Ok(())
        }
        FieldKind::Array => {
            let Cell::List(cells) = cell else {
                anyhow::bail!("field '{}' expects a list cell, got {cell:?}", field.name);
            };
            if cells.is_empty() {
                emit_levels(field, columns, at, rep, def);
                return Ok(());
            }
            for (index, value) in cells.iter().enumerate() {
                let rep = if index == 0 { rep } else { field.repetition_level };
                shred_cell(&field.children[0], value, rep, def + 1, columns, at)?;
            }
            Ok(())
        }
        FieldKind::Map => {
            let Cell::Map(entries) = cell else {
                anyhow::bail!("field '{}' expects a map cell, got {cell:?}", field.name);
            };
            if entries.is_empty() {
                emit_levels(field, columns, at, rep, def);
                return Ok(());
            }
            let key_leaves = field.children[0].leaf_count();
            for (index, (key, value)) in entries.iter().enumerate() {
                let rep = if index == 0 { rep } else { field.repetition_level };
                shred_cell(&field.children[0], key, rep, def + 1, columns, at)?;
                shred_cell(&field.children[1], value, rep, def + 1, columns, at + key_leaves)?;
            }
            Ok(())
        }
    }
}

/// Pushes one `(rep, def)` pair into every leaf of `field`'s subtree,
/// recording a null or an empty collection with no value slot below it.
fn emit_levels(field: &FieldSchema, columns: &mut [ShreddedColumn], at: usize, rep: u16, def: u16) {
    for column in &mut columns[at..at + field.leaf_count()] {
        column.rep_levels.push(rep);
        column.def_levels.push(def);
    }
}

fn push_value(values: &mut ScalarColumn, cell: &Cell) -> anyhow::Result<()> {
    match (values.type_desc, cell) {
        (PhysicalType::Boolean, Cell::Bool(value)) => values.values.push(*value as u8),
        (PhysicalType::Int32, Cell::Int(value)) => values.values.push(*value as i32),
        (PhysicalType::Int64, Cell::Int(value)) => values.values.push(*value),
        (PhysicalType::Float32, Cell::Float(value)) => values.values.push(*value as f32),
        (PhysicalType::Float64, Cell::Float(value)) => values.values.push(*value),
        (PhysicalType::Timestamp, Cell::Ts(value)) => values.values.push(*value),
        (PhysicalType::Binary, Cell::Bytes(value)) => values.push_binary(value),
        (type_desc, cell) => anyhow::bail!("cell {cell:?} does not fit a {type_desc:?} leaf"),
    }
    Ok(())
}
