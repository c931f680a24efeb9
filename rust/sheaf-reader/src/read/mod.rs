//! Read-side reconstruction of nested columns.

pub mod column_reader;
pub mod levels;
