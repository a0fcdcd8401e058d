//! Read, rename and delete operations over stored images.

use std::sync::Arc;

use gl_core::{Error, ImageId, ImageList, ImagePatch, ImageRecord, ListQuery, Result};
use gl_store::{content_type_for, BlobStore, MetadataStore};

/// An opened blob ready to stream.
#[derive(Debug)]
pub struct ImageFile {
    pub filename: String,
    pub content_type: &'static str,
    pub file: tokio::fs::File,
}

pub struct QueryService {
    blobs: Arc<BlobStore>,
    metadata: Arc<MetadataStore>,
}

impl QueryService {
    pub fn new(blobs: Arc<BlobStore>, metadata: Arc<MetadataStore>) -> Self {
        Self { blobs, metadata }
    }

    /// Filtered, ordered and truncated listing.
    pub async fn list(&self, query: &ListQuery) -> Result<ImageList> {
        let records = self.metadata.all().await?;
        Ok(query.apply(records))
    }

    pub async fn get(&self, id: ImageId) -> Result<ImageRecord> {
        self.metadata
            .find_by_id(id)
            .await?
            .ok_or_else(|| Error::not_found("image", id))
    }

    /// Rename an image. Only `name` is applied; a present name must be
    /// non-empty. Without a name the record is returned unchanged.
    pub async fn update(&self, id: ImageId, patch: &ImagePatch) -> Result<ImageRecord> {
        match patch.name.as_deref() {
            None => return self.get(id).await,
            Some("") => return Err(Error::invalid_field("name", "Name is required")),
            Some(_) => {}
        }

        let updated = self
            .metadata
            .update(id, patch)
            .await?
            .ok_or_else(|| Error::not_found("image", id))?;
        tracing::info!(%id, name = %updated.name, "Image renamed");
        Ok(updated)
    }

    /// Delete an image's blob and record.
    ///
    /// Blob removal is best effort: a failure is logged and the record is
    /// removed anyway.
    pub async fn delete(&self, id: ImageId) -> Result<ImageRecord> {
        let record = self.get(id).await?;

        if let Err(e) = self.blobs.delete(&record.filename).await {
            tracing::warn!(%id, filename = %record.filename, "Failed to delete blob: {e}");
        }

        let removed = self
            .metadata
            .remove(id)
            .await?
            .ok_or_else(|| Error::not_found("image", id))?;
        tracing::info!(%id, "Image deleted");
        Ok(removed)
    }

    /// Open the blob behind a record for streaming.
    pub async fn file(&self, id: ImageId) -> Result<ImageFile> {
        let record = self.get(id).await?;
        let file = self.blobs.open(&record.filename).await.map_err(|e| {
            if e.is_not_found() {
                tracing::warn!(%id, filename = %record.filename, "File not found on disk");
            }
            e
        })?;
        Ok(ImageFile {
            content_type: content_type_for(&record.filename),
            filename: record.filename,
            file,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use gl_core::config::QueryConfig;
    use gl_core::{SortKey, SortOrder};

    struct Fixture {
        _dir: tempfile::TempDir,
        blobs: Arc<BlobStore>,
        metadata: Arc<MetadataStore>,
        service: QueryService,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let blobs = Arc::new(BlobStore::new(dir.path().join("downloads")));
        let metadata = Arc::new(MetadataStore::new(dir.path().join("metadata.json")));
        let service = QueryService::new(blobs.clone(), metadata.clone());
        Fixture {
            _dir: dir,
            blobs,
            metadata,
            service,
        }
    }

    async fn seed(fx: &Fixture, name: &str, minute: u32) -> ImageRecord {
        let saved = fx.blobs.save(b"img", &format!("{name}.png")).await.unwrap();
        let record = ImageRecord {
            id: saved.id,
            filename: saved.filename,
            name: name.into(),
            uploaded_at: Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap()),
            width: None,
            height: None,
            original_name: None,
            size: Some(3),
            mime_type: Some("image/png".into()),
        };
        fx.metadata.append(record.clone()).await.unwrap();
        record
    }

    #[tokio::test]
    async fn list_applies_query() {
        let fx = fixture();
        seed(&fx, "beach", 1).await;
        seed(&fx, "Beach party", 2).await;
        seed(&fx, "mountain", 3).await;

        let query = ListQuery::new(
            Some("beach".into()),
            SortKey::UploadedAt,
            SortOrder::Desc,
            None,
            &QueryConfig::default(),
        );
        let list = fx.service.list(&query).await.unwrap();
        let names: Vec<_> = list.images.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Beach party", "beach"]);
        assert_eq!(list.total, 2);
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let fx = fixture();
        let err = fx.service.get(ImageId::new()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn update_rejects_empty_name_and_keeps_absent_one() {
        let fx = fixture();
        let rec = seed(&fx, "old", 1).await;

        let err = fx.service.update(rec.id, &ImagePatch::rename("")).await.unwrap_err();
        assert_eq!(err.to_string(), "Name is required");
        assert_eq!(err.http_status(), 400);
        let unchanged = fx.service.update(rec.id, &ImagePatch::default()).await.unwrap();
        assert_eq!(unchanged, rec);

        let updated = fx.service.update(rec.id, &ImagePatch::rename("new")).await.unwrap();
        assert_eq!(updated.name, "new");
        assert_eq!(updated.filename, rec.filename);
        assert_eq!(updated.uploaded_at, rec.uploaded_at);
    }

    #[tokio::test]
    async fn update_unknown_is_not_found() {
        let fx = fixture();
        let err = fx
            .service
            .update(ImageId::new(), &ImagePatch::rename("x"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        let err = fx
            .service
            .update(ImageId::new(), &ImagePatch::default())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn delete_removes_blob_and_record() {
        let fx = fixture();
        let rec = seed(&fx, "gone", 1).await;

        let removed = fx.service.delete(rec.id).await.unwrap();
        assert_eq!(removed.id, rec.id);
        assert!(!fx.blobs.exists(&rec.filename).await);
        assert!(fx.metadata.find_by_id(rec.id).await.unwrap().is_none());
        assert!(fx.service.delete(rec.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn delete_tolerates_missing_blob() {
        let fx = fixture();
        let rec = seed(&fx, "orphan", 1).await;
        fx.blobs.delete(&rec.filename).await.unwrap();

        fx.service.delete(rec.id).await.unwrap();
        assert!(fx.metadata.all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn file_reports_content_type() {
        let fx = fixture();
        let rec = seed(&fx, "pic", 1).await;
        let file = fx.service.file(rec.id).await.unwrap();
        assert_eq!(file.content_type, "image/png");
        assert_eq!(file.filename, rec.filename);
    }

    #[tokio::test]
    async fn file_missing_on_disk_is_not_found() {
        let fx = fixture();
        let rec = seed(&fx, "pic", 1).await;
        fx.blobs.delete(&rec.filename).await.unwrap();
        assert!(fx.service.file(rec.id).await.unwrap_err().is_not_found());
    }
}
