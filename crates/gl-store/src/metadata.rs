//! JSON-file metadata store.
//!
//! All image records live in a single document of the form
//! `{"images": [...]}`. Every operation first re-reads the document from disk;
//! mutations then change the in-memory list and rewrite the whole file before
//! returning. There is no partial update.
//!
//! A process-local mutex is held across each read-modify-write span, so two
//! requests in the same server cannot lose each other's update. Separate
//! processes sharing one file are not coordinated: the last writer wins.

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use gl_core::{Error, ImageId, ImagePatch, ImageRecord, Result};
use serde::Serialize;
use tokio::sync::Mutex;

/// Ordered list of image records backed by one JSON file.
///
/// The file is created lazily, on the first operation that touches it.
#[derive(Debug)]
pub struct MetadataStore {
    path: PathBuf,
    images: Mutex<Vec<ImageRecord>>,
}

impl MetadataStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            images: Mutex::new(Vec::new()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every record, in stored order.
    pub async fn all(&self) -> Result<Vec<ImageRecord>> {
        self.read(|images| images.to_vec()).await
    }

    pub async fn find_by_id(&self, id: ImageId) -> Result<Option<ImageRecord>> {
        self.read(|images| images.iter().find(|img| img.id == id).cloned())
            .await
    }

    /// Position of a record in stored order.
    pub async fn find_index_by_id(&self, id: ImageId) -> Result<Option<usize>> {
        self.read(|images| position(images, id)).await
    }

    /// Add a record at the end of the list.
    pub async fn append(&self, record: ImageRecord) -> Result<()> {
        self.mutate(|images| {
            if position(images, record.id).is_some() {
                return Err(Error::Internal(format!(
                    "duplicate image id {}",
                    record.id
                )));
            }
            images.push(record);
            Ok(((), true))
        })
        .await
    }

    /// Apply `patch` to the record with `id`. `None` if there is no such record.
    pub async fn update(&self, id: ImageId, patch: &ImagePatch) -> Result<Option<ImageRecord>> {
        self.mutate(|images| {
            let Some(index) = position(images, id) else {
                return Ok((None, false));
            };
            let changed = patch.apply(&mut images[index]);
            Ok((Some(images[index].clone()), changed))
        })
        .await
    }

    /// Remove and return the record with `id`. `None` if there is no such record.
    pub async fn remove(&self, id: ImageId) -> Result<Option<ImageRecord>> {
        self.mutate(|images| match position(images, id) {
            Some(index) => Ok((Some(images.remove(index)), true)),
            None => Ok((None, false)),
        })
        .await
    }

    /// Synchronize from disk, then run a read-only view over the list.
    async fn read<T>(&self, view: impl FnOnce(&[ImageRecord]) -> T) -> Result<T> {
        let mut images = self.images.lock().await;
        *images = self.load().await?;
        Ok(view(images.as_slice()))
    }

    /// Scoped read-modify-write.
    ///
    /// `change` returns its result plus whether the list was modified; the
    /// document is only rewritten when it was.
    async fn mutate<T>(
        &self,
        change: impl FnOnce(&mut Vec<ImageRecord>) -> Result<(T, bool)>,
    ) -> Result<T> {
        let mut images = self.images.lock().await;
        *images = self.load().await?;

        let (out, dirty) = change(&mut *images)?;
        if dirty {
            self.write(images.as_slice()).await?;
        }
        Ok(out)
    }

    /// Read the document, creating or repairing it when it is absent or empty.
    async fn load(&self) -> Result<Vec<ImageRecord>> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!("Creating metadata file at {}", self.path.display());
                self.write(&[]).await?;
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(Error::Internal(format!(
                    "failed to read metadata {}: {e}",
                    self.path.display()
                )))
            }
        };

        if contents.trim().is_empty() {
            tracing::warn!(
                "Metadata file {} is empty; initializing",
                self.path.display()
            );
            self.write(&[]).await?;
            return Ok(Vec::new());
        }

        let value: serde_json::Value = serde_json::from_str(&contents)?;
        match value.get("images") {
            Some(images) if images.is_array() => {
                let images: Vec<ImageRecord> = serde_json::from_value(images.clone())?;
                tracing::debug!(count = images.len(), "Loaded metadata");
                Ok(images)
            }
            _ => {
                tracing::warn!(
                    "Metadata file {} has no images list; resetting",
                    self.path.display()
                );
                self.write(&[]).await?;
                Ok(Vec::new())
            }
        }
    }

    /// Replace the document on disk with `images`.
    ///
    /// The JSON goes to a sibling temp file first and is renamed into place,
    /// so readers never observe a half-written document.
    async fn write(&self, images: &[ImageRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        /// On-disk shape of the metadata document.
        #[derive(Serialize)]
        struct DocumentRef<'a> {
            images: &'a [ImageRecord],
        }

        let json = serde_json::to_string_pretty(&DocumentRef { images })?;
        let tmp = temp_path(&self.path);
        tokio::fs::write(&tmp, json).await.map_err(|e| {
            Error::Internal(format!("failed to write {}: {e}", tmp.display()))
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| {
            Error::Internal(format!(
                "failed to replace metadata {}: {e}",
                self.path.display()
            ))
        })?;
        Ok(())
    }
}

fn position(images: &[ImageRecord], id: ImageId) -> Option<usize> {
    images.iter().position(|img| img.id == id)
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}
