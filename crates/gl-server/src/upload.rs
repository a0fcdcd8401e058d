//! Upload pipeline: validate an incoming file, store its bytes, record it.
//!
//! Checks run in a fixed order and the first failure wins:
//!
//! 1. a file is present,
//! 2. its declared type is an image,
//! 3. it fits under the size ceiling,
//! 4. its type is on the allow-list,
//! 5. any width/height hints are positive integers.
//!
//! Only then is the blob written and the record appended. A record is never
//! appended without its blob having been written first. If the append fails
//! the blob stays on disk unreferenced.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use gl_core::config::UploadConfig;
use gl_core::{Error, FieldIssue, ImageRecord, Result};
use gl_store::{BlobStore, MetadataStore};

/// Why an uploaded file was refused.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum UploadRejection {
    #[error("No file provided")]
    MissingFile,

    #[error("File must be an image")]
    NotAnImage { mime_type: String },

    #[error("File size must be less than {limit_mb}MB. Current size: {size_mb:.2}MB")]
    TooLarge {
        size: u64,
        size_mb: f64,
        limit_mb: f64,
    },

    #[error("Unsupported file format '{mime_type}'. Allowed types: {allowed}")]
    UnsupportedFormat { mime_type: String, allowed: String },
}

impl UploadRejection {
    fn too_large(size: u64, limit: u64) -> Self {
        const MB: f64 = 1024.0 * 1024.0;
        UploadRejection::TooLarge {
            size,
            size_mb: size as f64 / MB,
            limit_mb: limit as f64 / MB,
        }
    }
}

impl From<UploadRejection> for Error {
    fn from(rejection: UploadRejection) -> Self {
        let message = rejection.to_string();
        Error::Validation {
            fields: vec![FieldIssue::new("file", message.clone())],
            message,
        }
    }
}

/// One file part of an upload.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    /// Name the client sent with the part; may be empty.
    pub file_name: String,
    /// Declared MIME type; empty when the client sent none.
    pub content_type: String,
    pub data: Bytes,
}

impl UploadedFile {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// Browsers send an empty, nameless part when no file was chosen.
    fn is_blank(&self) -> bool {
        self.file_name.is_empty() && self.data.is_empty()
    }

    /// Declared type without parameters, lowercased.
    fn essence(&self) -> String {
        self.content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
    }
}

/// Everything a client may submit with an upload.
///
/// Dimension hints stay as raw text so they are checked after the file.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub file: Option<UploadedFile>,
    pub name: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
}

impl UploadRequest {
    pub fn new(file: UploadedFile) -> Self {
        Self {
            file: Some(file),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width.to_string());
        self.height = Some(height.to_string());
        self
    }
}

/// Check a file against the upload policy.
pub fn validate_file<'a>(
    file: Option<&'a UploadedFile>,
    policy: &UploadConfig,
) -> std::result::Result<&'a UploadedFile, UploadRejection> {
    let file = match file {
        Some(f) if !f.is_blank() => f,
        _ => return Err(UploadRejection::MissingFile),
    };

    let mime_type = file.essence();
    if !mime_type.starts_with("image/") {
        return Err(UploadRejection::NotAnImage { mime_type });
    }

    let size = file.data.len() as u64;
    if size > policy.max_file_bytes {
        return Err(UploadRejection::too_large(size, policy.max_file_bytes));
    }

    if !policy
        .allowed_types
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(&mime_type))
    {
        return Err(UploadRejection::UnsupportedFormat {
            mime_type,
            allowed: policy.allowed_types.join(", "),
        });
    }

    Ok(file)
}

/// Parse an optional dimension hint. Blank means absent.
fn parse_dimension(field: &str, raw: Option<&str>) -> Result<Option<u32>> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    match raw.parse::<u32>() {
        Ok(value) if value > 0 => Ok(Some(value)),
        _ => Err(Error::invalid_field(
            field,
            format!("{field} must be a positive integer"),
        )),
    }
}

/// Validates uploads and writes them to the blob and metadata stores.
pub struct UploadPipeline {
    blobs: Arc<BlobStore>,
    metadata: Arc<MetadataStore>,
    policy: UploadConfig,
}

impl UploadPipeline {
    pub fn new(blobs: Arc<BlobStore>, metadata: Arc<MetadataStore>, policy: UploadConfig) -> Self {
        Self {
            blobs,
            metadata,
            policy,
        }
    }

    pub fn policy(&self) -> &UploadConfig {
        &self.policy
    }

    /// Validate, store and record one upload.
    pub async fn upload(&self, request: UploadRequest) -> Result<ImageRecord> {
        let file = validate_file(request.file.as_ref(), &self.policy)?;
        let width = parse_dimension("width", request.width.as_deref())?;
        let height = parse_dimension("height", request.height.as_deref())?;

        let saved = self.blobs.save(&file.data, &file.file_name).await?;

        let name = request
            .name
            .filter(|n| !n.is_empty())
            .or_else(|| Some(file.file_name.clone()).filter(|n| !n.is_empty()))
            .unwrap_or_else(|| saved.filename.clone());

        let record = ImageRecord {
            id: saved.id,
            filename: saved.filename,
            name,
            uploaded_at: Some(Utc::now()),
            width,
            height,
            original_name: Some(file.file_name.clone()).filter(|n| !n.is_empty()),
            size: Some(file.data.len() as u64),
            mime_type: Some(file.essence()),
        };

        if let Err(e) = self.metadata.append(record.clone()).await {
            tracing::warn!(
                id = %record.id,
                filename = %record.filename,
                "Metadata append failed; blob left unreferenced"
            );
            return Err(e);
        }

        tracing::info!(
            id = %record.id,
            name = %record.name,
            size = file.data.len(),
            "Image uploaded"
        );
        Ok(record)
    }
}
