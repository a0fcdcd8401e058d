//! Application context shared by all route handlers via Axum state.

use std::sync::Arc;

use gl_core::config::Config;
use gl_store::{BlobStore, MetadataStore};

use crate::query::QueryService;
use crate::upload::UploadPipeline;

/// Application context shared by all request handlers (via Axum state).
///
/// This is cheaply cloneable because it only holds `Arc`s.
#[derive(Clone)]
pub struct AppContext {
    /// Immutable application configuration snapshot.
    pub config: Arc<Config>,
    pub blobs: Arc<BlobStore>,
    pub metadata: Arc<MetadataStore>,
    pub uploads: Arc<UploadPipeline>,
    pub queries: Arc<QueryService>,
}

impl AppContext {
    /// Wire stores and services from configuration. Nothing touches disk
    /// until the first request.
    pub fn new(config: Config) -> Self {
        let blobs = Arc::new(BlobStore::new(config.storage.blob_path()));
        let metadata = Arc::new(MetadataStore::new(config.storage.metadata_path()));
        let uploads = Arc::new(UploadPipeline::new(
            blobs.clone(),
            metadata.clone(),
            config.upload.clone(),
        ));
        let queries = Arc::new(QueryService::new(blobs.clone(), metadata.clone()));

        Self {
            config: Arc::new(config),
            blobs,
            metadata,
            uploads,
            queries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gl_core::config::StorageConfig;

    #[test]
    fn stores_follow_storage_config() {
        let config = Config {
            storage: StorageConfig::in_dir("/srv/gallery"),
            ..Config::default()
        };
        let ctx = AppContext::new(config);
        assert_eq!(ctx.blobs.dir(), std::path::Path::new("/srv/gallery/downloads"));
        assert_eq!(
            ctx.metadata.path(),
            std::path::Path::new("/srv/gallery/metadata.json")
        );
    }
}
