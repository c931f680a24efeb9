//! Chunk encoding, the write-side counterpart of [`crate::chunk`].

pub mod chunk_builder;

pub use chunk_builder::ChunkBuilder;
