//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which points the stores at a fresh temporary
//! directory and builds a full [`AppContext`]. The [`TestHarness::with_server`]
//! constructor starts Axum on a random port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;

use chrono::{DateTime, Duration, TimeZone, Utc};
use gl_core::config::{Config, StorageConfig};
use gl_core::ImageRecord;
use gl_server::context::AppContext;
use gl_server::router::build_router;
use tempfile::TempDir;

/// A tiny PNG header; the server never decodes image data.
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n fake image data";

/// Test harness wrapping a fully-constructed [`AppContext`] backed by a
/// temporary data directory. The directory is removed when the harness drops.
pub struct TestHarness {
    pub ctx: AppContext,
    pub dir: TempDir,
}

impl TestHarness {
    /// Create a new harness with default configuration.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a new harness with a custom configuration. Storage settings are
    /// always replaced by the temporary directory.
    pub fn with_config(mut config: Config) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        config.storage = StorageConfig::in_dir(dir.path());
        let ctx = AppContext::new(config);
        Self { ctx, dir }
    }

    /// Start an Axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::with_server_config(Config::default()).await
    }

    /// Start an Axum server with custom config on a random port.
    pub async fn with_server_config(config: Config) -> (Self, SocketAddr) {
        let harness = Self::with_config(config);
        let app = build_router(harness.ctx.clone(), None);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            gl_server::serve(listener, app, std::future::pending())
                .await
                .ok();
        });

        (harness, addr)
    }

    /// Store a blob and its record directly, bypassing HTTP, so tests can
    /// control timestamps.
    pub async fn seed(&self, name: &str, uploaded_at: Option<DateTime<Utc>>) -> ImageRecord {
        let saved = self
            .ctx
            .blobs
            .save(PNG_BYTES, &format!("{name}.png"))
            .await
            .expect("failed to save blob");
        let record = ImageRecord {
            id: saved.id,
            filename: saved.filename,
            name: name.to_string(),
            uploaded_at,
            width: None,
            height: None,
            original_name: Some(format!("{name}.png")),
            size: Some(PNG_BYTES.len() as u64),
            mime_type: Some("image/png".into()),
        };
        self.ctx
            .metadata
            .append(record.clone())
            .await
            .expect("failed to append record");
        record
    }

    /// Seed one record per name, each a minute newer than the last.
    pub async fn seed_names(&self, names: &[&str]) -> Vec<ImageRecord> {
        let mut records = Vec::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            records.push(self.seed(name, Some(minute(i as i64))).await);
        }
        records
    }
}

/// `2024-01-01T00:00:00Z` plus `n` minutes.
pub fn minute(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::minutes(n)
}

/// Base URL of the image API on a harness server.
pub fn api_url(addr: SocketAddr, path: &str) -> String {
    format!("http://{addr}/api/v1{path}")
}

/// Multipart form with an image file part.
pub fn image_form(file_name: &str, mime: &str, data: &[u8]) -> reqwest::multipart::Form {
    let part = reqwest::multipart::Part::bytes(data.to_vec())
        .file_name(file_name.to_string())
        .mime_str(mime)
        .expect("valid mime");
    reqwest::multipart::Form::new().part("file", part)
}
