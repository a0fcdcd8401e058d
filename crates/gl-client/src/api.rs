//! Typed access to the galleria HTTP API.
//!
//! [`ImageApi`] is the seam the cache layer is written against;
//! [`HttpImageApi`] implements it over `reqwest`.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use gl_core::{ImageId, ImageList, ImagePatch, ImageRecord};
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{ClientError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A file to upload plus the optional form fields sent with it.
#[derive(Debug, Clone, Default)]
pub struct NewUpload {
    pub file_name: String,
    pub mime_type: String,
    pub data: Vec<u8>,
    pub name: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl NewUpload {
    pub fn new(
        file_name: impl Into<String>,
        mime_type: impl Into<String>,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
            ..Self::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Operations the client cache layer needs from the server.
#[async_trait]
pub trait ImageApi: Send + Sync {
    /// Newest-first listing, optionally filtered by name.
    async fn list_images(&self, search: Option<&str>, limit: usize) -> Result<ImageList>;

    async fn get_image(&self, id: ImageId) -> Result<ImageRecord>;

    async fn upload_image(&self, upload: NewUpload) -> Result<ImageRecord>;

    async fn rename_image(&self, id: ImageId, name: &str) -> Result<ImageRecord>;

    async fn delete_image(&self, id: ImageId) -> Result<()>;
}

/// Error body shape returned by the server.
#[derive(Debug, Deserialize)]
struct ErrorPayload {
    error: String,
    code: Option<String>,
}

/// [`ImageApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpImageApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpImageApi {
    /// Client for the server rooted at `base_url` (e.g. `http://127.0.0.1:3000`).
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{path}", self.base_url)
    }

    /// Where the raw bytes of an image are served.
    pub fn file_url(&self, id: ImageId) -> String {
        self.url(&format!("/images/{id}/file"))
    }

    /// Download the raw bytes of an image.
    pub async fn fetch_file(&self, id: ImageId) -> Result<Bytes> {
        let resp = self.client.get(self.file_url(id)).send().await?;
        let resp = check(resp).await?;
        Ok(resp.bytes().await?)
    }
}

#[async_trait]
impl ImageApi for HttpImageApi {
    async fn list_images(&self, search: Option<&str>, limit: usize) -> Result<ImageList> {
        let mut params = vec![
            ("sort", "uploadedAt".to_string()),
            ("order", "desc".to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(term) = search.filter(|s| !s.is_empty()) {
            params.push(("search", term.to_string()));
        }

        tracing::debug!(search = ?search, limit, "Fetching image list");
        let resp = self
            .client
            .get(self.url("/images"))
            .query(&params)
            .send()
            .await?;
        decode(resp).await
    }

    async fn get_image(&self, id: ImageId) -> Result<ImageRecord> {
        let resp = self
            .client
            .get(self.url(&format!("/images/{id}")))
            .send()
            .await?;
        decode(resp).await
    }

    async fn upload_image(&self, upload: NewUpload) -> Result<ImageRecord> {
        let part = Part::bytes(upload.data)
            .file_name(upload.file_name)
            .mime_str(&upload.mime_type)?;
        let mut form = Form::new().part("file", part);
        if let Some(name) = upload.name {
            form = form.text("name", name);
        }
        if let Some(width) = upload.width {
            form = form.text("width", width.to_string());
        }
        if let Some(height) = upload.height {
            form = form.text("height", height.to_string());
        }

        let resp = self
            .client
            .post(self.url("/images"))
            .multipart(form)
            .send()
            .await?;
        decode(resp).await
    }

    async fn rename_image(&self, id: ImageId, name: &str) -> Result<ImageRecord> {
        let resp = self
            .client
            .put(self.url(&format!("/images/{id}")))
            .json(&ImagePatch::rename(name))
            .send()
            .await?;
        decode(resp).await
    }

    async fn delete_image(&self, id: ImageId) -> Result<()> {
        let resp = self
            .client
            .delete(self.url(&format!("/images/{id}")))
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }
}

/// Turn a non-success response into [`ClientError::Api`].
async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let payload = resp.json::<ErrorPayload>().await.ok();
    let (message, code) = match payload {
        Some(p) => (p.error, p.code),
        None => (
            status.canonical_reason().unwrap_or("request failed").to_string(),
            None,
        ),
    };
    Err(ClientError::Api {
        status: status.as_u16(),
        code,
        message,
    })
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let resp = check(resp).await?;
    Ok(resp.json::<T>().await?)
}
