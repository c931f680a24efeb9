//! Page-stream codec for sheaf column chunks.
//!
//! A column chunk is a self-contained byte stream holding the encoded pages
//! of one leaf column: an optional dictionary page followed by data pages.
//! Each page carries its own header, run-length-encoded repetition and
//! definition levels, and a values section (plain or dictionary codes).
//!
//! The central type is [`chunk::ChunkPageReader`], which walks the pages of
//! a chunk and decodes values into [`sheaf_column::column::ScalarColumn`]
//! targets under the control of a [`select::ColumnSelectVector`]. The `write`
//! module provides the matching encoder used by tools and tests.

pub mod chunk;
pub mod decode;
pub mod dictionary;
pub mod levels;
pub mod page;
pub mod select;
pub mod write;

pub use chunk::ChunkPageReader;
pub use decode::DecodeOptions;
pub use select::{ColumnSelectVector, ReadRunKind};
