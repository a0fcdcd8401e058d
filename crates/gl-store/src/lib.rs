//! gl-store: on-disk persistence for galleria.
//!
//! Two independent stores share nothing but the record model:
//!
//! - [`BlobStore`] keeps raw image bytes as flat files named `<id><ext>`.
//! - [`MetadataStore`] keeps every [`gl_core::ImageRecord`] in one JSON
//!   document that is rewritten in full on each mutation.

pub mod blob;
pub mod metadata;

pub use blob::{content_type_for, BlobStat, BlobStore, SavedBlob};
pub use metadata::MetadataStore;
