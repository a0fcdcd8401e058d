//! Cached view of the gallery for UI code.
//!
//! [`CachedGallery`] answers reads from the [`QueryCache`] while entries are
//! fresh and goes to the [`ImageApi`] otherwise. Mutations go straight to the
//! API and, once they succeed, patch and invalidate the cache.

use std::sync::Arc;

use gl_core::{ImageId, ImageList, ImageRecord};
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::api::{ImageApi, NewUpload};
use crate::cache::{CachePolicy, ListKey, QueryCache};
use crate::error::Result;

pub struct CachedGallery<A> {
    api: Arc<A>,
    cache: Arc<Mutex<QueryCache>>,
}

impl<A> Clone for CachedGallery<A> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            cache: self.cache.clone(),
        }
    }
}

impl<A: ImageApi> CachedGallery<A> {
    pub fn new(api: A) -> Self {
        Self::with_policy(api, CachePolicy::default())
    }

    pub fn with_policy(api: A, policy: CachePolicy) -> Self {
        Self {
            api: Arc::new(api),
            cache: Arc::new(Mutex::new(QueryCache::new(policy))),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn page_limit(&self) -> usize {
        self.cache.lock().policy().page_limit
    }

    /// Listing for `search`, served from cache while fresh.
    ///
    /// A failed refetch returns the error and leaves any stale entry in
    /// place; see [`CachedGallery::cached_list`].
    pub async fn images(&self, search: Option<&str>, limit: usize) -> Result<ImageList> {
        let key = ListKey::new(search, limit);
        let cached = self.cache.lock().fresh_list(&key, Instant::now()).cloned();
        if let Some(list) = cached {
            return Ok(list);
        }

        match self.api.list_images(key.search(), key.limit()).await {
            Ok(list) => {
                self.cache
                    .lock()
                    .store_list(key, list.clone(), Instant::now());
                Ok(list)
            }
            Err(e) => {
                tracing::warn!(search = ?key.search(), "Image list refetch failed: {e}");
                Err(e)
            }
        }
    }

    /// The newest page of images.
    pub async fn latest(&self) -> Result<ImageList> {
        let limit = self.page_limit();
        self.images(None, limit).await
    }

    /// Warm the latest page so the first render does not wait on the server.
    pub async fn prefetch_latest(&self) -> Result<()> {
        self.latest().await.map(|_| ())
    }

    pub async fn image(&self, id: ImageId) -> Result<ImageRecord> {
        let cached = self.cache.lock().fresh_record(id, Instant::now()).cloned();
        if let Some(record) = cached {
            return Ok(record);
        }

        let record = self.api.get_image(id).await?;
        self.cache.lock().store_record(record.clone(), Instant::now());
        Ok(record)
    }

    pub async fn upload(&self, upload: NewUpload) -> Result<ImageRecord> {
        let record = self.api.upload_image(upload).await?;
        self.cache.lock().apply_upload(record.clone(), Instant::now());
        Ok(record)
    }

    pub async fn rename(&self, id: ImageId, name: &str) -> Result<ImageRecord> {
        let record = self.api.rename_image(id, name).await?;
        self.cache.lock().apply_update(record.clone(), Instant::now());
        Ok(record)
    }

    pub async fn delete(&self, id: ImageId) -> Result<()> {
        self.api.delete_image(id).await?;
        self.cache.lock().apply_delete(id);
        Ok(())
    }

    /// Cached list, fresh or stale, without touching the network.
    pub fn cached_list(&self, key: &ListKey) -> Option<ImageList> {
        self.cache.lock().list(key).cloned()
    }

    pub fn cached_latest(&self) -> Option<ImageList> {
        let cache = self.cache.lock();
        let key = cache.latest_key();
        cache.list(&key).cloned()
    }

    pub fn cached_record(&self, id: ImageId) -> Option<ImageRecord> {
        self.cache.lock().record(id).cloned()
    }

    pub fn is_fresh(&self, key: &ListKey) -> bool {
        self.cache.lock().fresh_list(key, Instant::now()).is_some()
    }
}
