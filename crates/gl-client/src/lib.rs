//! gl-client: typed HTTP client and client-side cache for galleria.
//!
//! - [`HttpImageApi`] talks to the server's `/api/v1` routes.
//! - [`CachedGallery`] serves reads from a [`QueryCache`] while fresh and
//!   keeps it coherent after uploads, renames and deletes.
//! - [`DebouncedSearch`] gives instant local search feedback and sends at
//!   most one server search per pause in typing.

pub mod api;
pub mod cache;
pub mod error;
pub mod gallery;
pub mod search;

pub use api::{HttpImageApi, ImageApi, NewUpload};
pub use cache::{CachePolicy, ListKey, QueryCache};
pub use error::{ClientError, Result};
pub use gallery::CachedGallery;
pub use search::{DebouncedSearch, SearchView, ViewSource};
