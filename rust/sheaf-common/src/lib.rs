//! Core definitions (error model and verification macros), relied upon by all
//! sheaf-* crates.

pub mod error;
pub mod result;

pub use error::Error;
pub use result::Result;
