//! pd-core: shared types, identifiers, errors and configuration.
//!
//! This crate is the foundational dependency for the other pd-* crates,
//! providing the random [`ImageId`], storage-key naming helpers, a unified
//! error type and the application configuration.

pub mod config;
pub mod error;
pub mod ids;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, Result};
pub use ids::*;
