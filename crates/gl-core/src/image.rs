//! Image metadata model.
//!
//! One [`ImageRecord`] exists per stored blob. Records are persisted as part
//! of the metadata document and returned verbatim by the HTTP API, so the
//! serialized form uses camelCase keys and omits absent optional fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::ImageId;

/// Metadata describing one uploaded image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    /// Primary key; also the base name of the blob file.
    #[schema(value_type = String, format = Uuid)]
    pub id: ImageId,
    /// On-disk blob name: `id` followed by the original extension.
    pub filename: String,
    /// Display name. Editable, not unique.
    pub name: String,
    /// Creation time. Older documents may not carry it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>, format = DateTime)]
    pub uploaded_at: Option<DateTime<Utc>>,
    /// Client-measured width in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Client-measured height in pixels.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Filename the client uploaded with.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_name: Option<String>,
    /// Stored size in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// MIME type declared at upload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl ImageRecord {
    /// Timestamp used for ordering; a missing `uploaded_at` sorts as the epoch.
    pub fn sort_timestamp(&self) -> DateTime<Utc> {
        self.uploaded_at.unwrap_or(DateTime::UNIX_EPOCH)
    }
}

/// Partial update accepted by the rename operation.
///
/// Only `name` is mutable. Any other key in an incoming JSON body is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ImagePatch {
    /// New display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ImagePatch {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }

    /// Apply this patch to a record. Returns true if anything changed.
    pub fn apply(&self, record: &mut ImageRecord) -> bool {
        match &self.name {
            Some(name) if *name != record.name => {
                record.name = name.clone();
                true
            }
            _ => false,
        }
    }
}
