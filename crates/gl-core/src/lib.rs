//! gl-core: shared types, IDs, errors and configuration.
//!
//! This crate is the foundational dependency for all other gl-* crates,
//! providing the image record model, a type-safe image identifier, the
//! unified error type, listing queries and application configuration.

pub mod config;
pub mod error;
pub mod ids;
pub mod image;
pub mod listing;

// Re-export the most commonly used items at the crate root.
pub use error::{Error, ErrorKind, FieldIssue, Result};
pub use ids::ImageId;
pub use image::{ImagePatch, ImageRecord};
pub use listing::{ImageList, ListQuery, SortKey, SortOrder};
