//! In-memory nested columns for the Sheaf decoding layer.
//!
//! Columns are built from three storage primitives and one closed container
//! enum:
//!
//! - [`values::Values`]: a type-erased, 8-byte-aligned value buffer with
//!   typed views.
//! - [`offsets::Offsets`]: `u64` offset arrays for variable-length and
//!   repeated data (`item_count + 1` entries).
//! - [`presence::Presence`]: null tracking with trivial, all-null and
//!   byte-map representations.
//! - [`column::ColumnData`]: the nested column model. Nullability is a
//!   container variant (`Nullable`) wrapping any other variant, arrays and
//!   maps carry offsets plus child columns, structs carry one child column
//!   per field.
//!
//! The decoding layer appends to these columns in batch-sized steps; all
//! append paths are amortized O(1) per slot.

pub mod column;
pub mod offsets;
pub mod presence;
pub mod values;
