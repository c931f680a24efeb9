//! Reassembly of nested columns from sheaf column chunks.
//!
//! A sheaf file stores one flattened chunk per leaf of the schema. This crate
//! rebuilds the nested shape: a [`read::column_reader::ColumnReader`] tree
//! mirrors the schema node for node, decodes the leaf chunks through
//! `sheaf-pagestream`, and reconstructs collection offsets and presence maps
//! from the repetition and definition level streams.

pub mod read;

pub use read::column_reader::{ColumnReader, ReadOutcome};

#[cfg(test)]
mod tests;
