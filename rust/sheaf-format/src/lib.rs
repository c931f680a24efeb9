//! Schema and metadata definitions for the Sheaf columnar format.
//!
//! This crate defines the resolved schema model ([`schema::FieldSchema`]) with
//! the definition/repetition level bookkeeping that the decoding layer relies
//! on, the file and row-group descriptors ([`metadata`]), and the row-range
//! selection primitives ([`row_range`]).

pub mod metadata;
pub mod row_range;
pub mod schema;
