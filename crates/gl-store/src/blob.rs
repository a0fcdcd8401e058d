//! Filesystem-level blob storage.
//!
//! Every upload becomes one file directly under the blob directory, named by
//! a fresh [`ImageId`] plus the extension of the name it was uploaded with.
//! Blobs are never overwritten, so concurrent saves cannot collide.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use gl_core::{Error, ImageId, Result};

/// Longest extension (without the dot) carried over from an upload name.
const MAX_EXTENSION_LEN: usize = 10;

/// Result of a successful [`BlobStore::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedBlob {
    pub id: ImageId,
    pub filename: String,
}

/// Size and modification time of a stored blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobStat {
    pub size: u64,
    pub modified: DateTime<Utc>,
}

/// Flat directory of image blobs.
#[derive(Debug, Clone)]
pub struct BlobStore {
    dir: PathBuf,
}

impl BlobStore {
    /// Create a store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write `data` under a fresh id and return the id and filename.
    ///
    /// There is no partial-write recovery: a crash mid-write leaves a
    /// truncated file that no record points to.
    pub async fn save(&self, data: &[u8], original_name: &str) -> Result<SavedBlob> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            Error::Internal(format!(
                "failed to create blob directory {}: {e}",
                self.dir.display()
            ))
        })?;

        let id = ImageId::new();
        let filename = format_filename(id, original_name);
        let path = self.dir.join(&filename);

        tokio::fs::write(&path, data).await.map_err(|e| {
            Error::Internal(format!("failed to write blob {}: {e}", path.display()))
        })?;

        tracing::debug!(%id, %filename, size = data.len(), "Stored blob");
        Ok(SavedBlob { id, filename })
    }

    /// Remove a blob. A blob that does not exist counts as removed.
    pub async fn delete(&self, filename: &str) -> Result<()> {
        let path = self.path_for(filename)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(%filename, "Deleted blob");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Internal(format!(
                "failed to delete blob {}: {e}",
                path.display()
            ))),
        }
    }

    /// Whether a blob is present. Unreadable or invalid names report false.
    pub async fn exists(&self, filename: &str) -> bool {
        let Ok(path) = self.path_for(filename) else {
            return false;
        };
        tokio::fs::try_exists(&path).await.unwrap_or(false)
    }

    /// Size and modification time of a blob.
    pub async fn stat(&self, filename: &str) -> Result<BlobStat> {
        let path = self.path_for(filename)?;
        let meta = tokio::fs::metadata(&path)
            .await
            .map_err(|e| map_io(e, filename))?;
        let modified = meta.modified().map_err(|e| map_io(e, filename))?;
        Ok(BlobStat {
            size: meta.len(),
            modified: DateTime::<Utc>::from(modified),
        })
    }

    /// Read a whole blob into memory.
    pub async fn read(&self, filename: &str) -> Result<Vec<u8>> {
        let path = self.path_for(filename)?;
        tokio::fs::read(&path).await.map_err(|e| map_io(e, filename))
    }

    /// Open a blob for streaming.
    pub async fn open(&self, filename: &str) -> Result<tokio::fs::File> {
        let path = self.path_for(filename)?;
        tokio::fs::File::open(&path)
            .await
            .map_err(|e| map_io(e, filename))
    }

    /// Resolve a stored filename to its path.
    ///
    /// Only bare names are accepted; anything that could escape the blob
    /// directory is reported as not found.
    pub fn path_for(&self, filename: &str) -> Result<PathBuf> {
        let is_bare = !filename.is_empty()
            && filename != "."
            && filename != ".."
            && !filename.contains(['/', '\\'])
            && !filename.contains('\0');
        if !is_bare {
            return Err(Error::not_found("blob", filename));
        }
        Ok(self.dir.join(filename))
    }
}

/// Content type served for a stored blob, chosen by extension.
///
/// This is a lookup on the name only; the bytes are never sniffed.
pub fn content_type_for(filename: &str) -> &'static str {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "image/jpeg",
    }
}

/// Format the on-disk name for a new blob: `<id>` plus the upload extension.
fn format_filename(id: ImageId, original_name: &str) -> String {
    match upload_extension(original_name) {
        Some(ext) => format!("{id}.{ext}"),
        None => id.to_string(),
    }
}

/// Extension of the uploaded name, if it is short plain ASCII.
fn upload_extension(original_name: &str) -> Option<&str> {
    let base = original_name.rsplit(['/', '\\']).next()?;
    let (stem, ext) = base.rsplit_once('.')?;
    let usable = !stem.is_empty()
        && !ext.is_empty()
        && ext.len() <= MAX_EXTENSION_LEN
        && ext.chars().all(|c| c.is_ascii_alphanumeric());
    usable.then_some(ext)
}

fn map_io(e: std::io::Error, filename: &str) -> Error {
    if e.kind() == ErrorKind::NotFound {
        Error::not_found("blob", filename)
    } else {
        Error::Io { source: e }
    }
}
