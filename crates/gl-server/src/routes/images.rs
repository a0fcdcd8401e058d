//! Image API route handlers.
//!
//! Ids that do not parse as UUIDs cannot name an image and are answered
//! with 404, the same as a well-formed id with no record.

use axum::body::Body;
use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use gl_core::config::QueryConfig;
use gl_core::{
    Error, ImageId, ImageList, ImagePatch, ImageRecord, ListQuery, Result, SortKey, SortOrder,
};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;

use crate::context::AppContext;
use crate::error::{AppError, ErrorBody};
use crate::upload::{UploadRequest, UploadedFile};

/// Blobs never change once written, so clients may cache them forever.
pub const IMMUTABLE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

// ============================================================================
// Request / response types
// ============================================================================

/// Query parameters for the listing endpoint.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct ListImagesParams {
    /// Case-insensitive substring of the image name.
    pub search: Option<String>,
    /// `uploadedAt` (default) or `name`.
    pub sort: Option<String>,
    /// `desc` (default) or `asc`.
    pub order: Option<String>,
    /// Maximum number of results, clamped to the configured range.
    pub limit: Option<String>,
}

impl ListImagesParams {
    /// Validate raw parameters into a [`ListQuery`].
    pub fn resolve(self, limits: &QueryConfig) -> Result<ListQuery> {
        let sort = non_blank(self.sort.as_deref())
            .map(str::parse::<SortKey>)
            .transpose()?
            .unwrap_or_default();
        let order = non_blank(self.order.as_deref())
            .map(str::parse::<SortOrder>)
            .transpose()?
            .unwrap_or_default();
        let limit = match non_blank(self.limit.as_deref()) {
            None => None,
            Some(raw) => Some(raw.parse::<i64>().map_err(|_| {
                Error::invalid_field("limit", format!("Invalid limit '{raw}'. Expected an integer"))
            })?),
        };

        Ok(ListQuery::new(self.search, sort, order, limit, limits))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Multipart form accepted by the upload endpoint.
#[derive(utoipa::ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    /// The image file.
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
    /// Display name; defaults to the file's name.
    name: Option<String>,
    /// Width in pixels as measured by the client.
    width: Option<u32>,
    /// Height in pixels as measured by the client.
    height: Option<u32>,
}

/// Confirmation returned by a delete.
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct DeleteResponse {
    pub message: String,
    pub id: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /api/v1/images
#[utoipa::path(
    get,
    path = "/api/v1/images",
    params(ListImagesParams),
    responses(
        (status = 200, description = "Matching images", body = ImageList),
        (status = 400, description = "Invalid query parameter", body = ErrorBody)
    )
)]
pub async fn list_images(
    State(ctx): State<AppContext>,
    Query(params): Query<ListImagesParams>,
) -> std::result::Result<Json<ImageList>, AppError> {
    let query = params.resolve(&ctx.config.query)?;
    let list = ctx.queries.list(&query).await?;
    Ok(Json(list))
}

/// POST /api/v1/images
#[utoipa::path(
    post,
    path = "/api/v1/images",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Image stored", body = ImageRecord),
        (status = 400, description = "Upload rejected", body = ErrorBody)
    )
)]
pub async fn upload_image(
    State(ctx): State<AppContext>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> std::result::Result<(StatusCode, Json<ImageRecord>), AppError> {
    let mut multipart = multipart
        .map_err(|e| Error::validation(format!("Invalid upload body: {}", e.body_text())))?;
    let request = read_upload_form(&mut multipart).await?;
    let record = ctx.uploads.upload(request).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/v1/images/:id
#[utoipa::path(
    get,
    path = "/api/v1/images/{id}",
    params(("id" = String, Path, description = "Image ID")),
    responses(
        (status = 200, description = "Image record", body = ImageRecord),
        (status = 404, description = "No such image", body = ErrorBody)
    )
)]
pub async fn get_image(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> std::result::Result<Json<ImageRecord>, AppError> {
    let id = parse_image_id(&id)?;
    Ok(Json(ctx.queries.get(id).await?))
}

/// PUT /api/v1/images/:id
#[utoipa::path(
    put,
    path = "/api/v1/images/{id}",
    params(("id" = String, Path, description = "Image ID")),
    request_body = ImagePatch,
    responses(
        (status = 200, description = "Updated record, or the unchanged record when no name is given", body = ImageRecord),
        (status = 400, description = "Empty name", body = ErrorBody),
        (status = 404, description = "No such image", body = ErrorBody)
    )
)]
pub async fn update_image(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<ImagePatch>, JsonRejection>,
) -> std::result::Result<Json<ImageRecord>, AppError> {
    let id = parse_image_id(&id)?;
    let Json(patch) =
        payload.map_err(|e| Error::validation(format!("Invalid JSON body: {}", e.body_text())))?;
    Ok(Json(ctx.queries.update(id, &patch).await?))
}

/// DELETE /api/v1/images/:id
#[utoipa::path(
    delete,
    path = "/api/v1/images/{id}",
    params(("id" = String, Path, description = "Image ID")),
    responses(
        (status = 200, description = "Image deleted", body = DeleteResponse),
        (status = 404, description = "No such image", body = ErrorBody)
    )
)]
pub async fn delete_image(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> std::result::Result<Json<DeleteResponse>, AppError> {
    let id = parse_image_id(&id)?;
    let removed = ctx.queries.delete(id).await?;
    Ok(Json(DeleteResponse {
        message: "Image deleted successfully".into(),
        id: removed.id.to_string(),
    }))
}

/// GET /api/v1/images/:id/file
///
/// Streams the stored bytes with a content type derived from the blob's
/// extension.
#[utoipa::path(
    get,
    path = "/api/v1/images/{id}/file",
    params(("id" = String, Path, description = "Image ID")),
    responses(
        (status = 200, description = "Raw image bytes"),
        (status = 404, description = "No such image, or blob missing on disk", body = ErrorBody)
    )
)]
pub async fn image_file(
    State(ctx): State<AppContext>,
    Path(id): Path<String>,
) -> std::result::Result<Response, AppError> {
    let id = parse_image_id(&id)?;
    let image = ctx.queries.file(id).await?;

    let body = Body::from_stream(ReaderStream::new(image.file));

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, image.content_type),
            (header::CACHE_CONTROL, IMMUTABLE_CACHE_CONTROL),
        ],
        body,
    )
        .into_response())
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_image_id(raw: &str) -> Result<ImageId> {
    raw.parse::<ImageId>()
        .map_err(|_| Error::not_found("image", raw))
}

/// Collect the upload form. Unknown fields are skipped.
async fn read_upload_form(multipart: &mut Multipart) -> Result<UploadRequest> {
    let mut request = UploadRequest::default();

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(multipart_error)?;
                request.file = Some(UploadedFile::new(file_name, content_type, data));
            }
            "name" => request.name = Some(field.text().await.map_err(multipart_error)?),
            "width" => request.width = Some(field.text().await.map_err(multipart_error)?),
            "height" => request.height = Some(field.text().await.map_err(multipart_error)?),
            other => tracing::debug!(field = other, "Ignoring unknown upload field"),
        }
    }

    Ok(request)
}

fn multipart_error(e: MultipartError) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::invalid_field("file", "Upload exceeds the request body limit")
    } else {
        Error::validation(format!("Invalid upload body: {}", e.body_text()))
    }
}
