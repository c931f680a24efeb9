//! Test utilities and helpers for the Sheaf project.
//!
//! This crate provides various testing utilities including:
//! - A nested row model and a level shredder turning rows into leaf streams
//! - Chunk, row group and file assembly from shredded rows
//! - A representative sample schema with seeded random row generation
//!
//! # Usage
//!
//! This crate is primarily intended for use within the Sheaf project's test
//! suite and development tools.

pub mod file_gen;
pub mod rows;
pub mod sample;
