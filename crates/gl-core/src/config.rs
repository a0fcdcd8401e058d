//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from TOML. Every section
//! defaults sensibly so a completely empty file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::Error;

/// Upload ceiling used when none is configured: 5 MiB.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 5 * 1024 * 1024;

/// MIME types accepted for upload when none are configured.
pub const DEFAULT_ALLOWED_TYPES: [&str; 4] =
    ["image/jpeg", "image/jpg", "image/png", "image/svg+xml"];

/// Locations searched when no config path is given on the command line.
const DEFAULT_CONFIG_PATHS: [&str; 4] = [
    "./galleria.toml",
    "./config.toml",
    "~/.config/galleria/config.toml",
    "/etc/galleria/config.toml",
];

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub upload: UploadConfig,
    pub query: QueryConfig,
}

impl Config {
    /// Deserialize a `Config` from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| Error::validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file. A missing or malformed file is an error.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Internal(format!("failed to read config {}: {e}", path.display()))
        })?;
        Self::from_toml(&contents)
    }

    /// Load from an explicit path, or the first default location that exists,
    /// or fall back to defaults.
    pub fn load_or_default(custom_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = custom_path {
            return Self::load(path);
        }

        for path_str in DEFAULT_CONFIG_PATHS {
            let expanded = shellexpand::tilde(path_str);
            let path = Path::new(expanded.as_ref());
            if path.exists() {
                tracing::info!("Loading config from {}", path.display());
                return Self::load(path);
            }
        }

        tracing::info!("No config file found; using defaults");
        Ok(Self::default())
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if self.upload.max_file_bytes == 0 {
            warnings.push("upload.max_file_bytes is 0; every upload will be rejected".into());
        }

        if self.server.max_body_bytes as u64 <= self.upload.max_file_bytes {
            warnings.push(format!(
                "server.max_body_bytes ({}) does not exceed upload.max_file_bytes ({}); \
                 oversize uploads will be cut off before validation",
                self.server.max_body_bytes, self.upload.max_file_bytes
            ));
        }

        if self.upload.allowed_types.is_empty() {
            warnings.push("upload.allowed_types is empty; every upload will be rejected".into());
        }

        for ty in &self.upload.allowed_types {
            if !ty.starts_with("image/") {
                warnings.push(format!(
                    "upload.allowed_types entry '{ty}' is not an image type and can never match"
                ));
            }
        }

        if self.query.max_limit == 0 {
            warnings.push("query.max_limit is 0; it will be treated as 1".into());
        }

        if self.query.default_limit > self.query.max_limit {
            warnings.push(format!(
                "query.default_limit ({}) exceeds query.max_limit ({})",
                self.query.default_limit, self.query.max_limit
            ));
        }

        if let Some(ref dir) = self.server.static_dir {
            if !dir.exists() {
                warnings.push(format!("server.static_dir {} does not exist", dir.display()));
            }
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Built UI to serve as an SPA fallback.
    pub static_dir: Option<PathBuf>,
    /// Request body ceiling; must exceed the upload ceiling.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            static_dir: None,
            max_body_bytes: 25 * 1024 * 1024,
        }
    }
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base directory for relative `blob_dir` and `metadata_file`.
    pub data_dir: PathBuf,
    pub blob_dir: PathBuf,
    pub metadata_file: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            blob_dir: PathBuf::from("downloads"),
            metadata_file: PathBuf::from("metadata.json"),
        }
    }
}

impl StorageConfig {
    /// Storage rooted at `data_dir` with the default layout.
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Directory holding blob files.
    pub fn blob_path(&self) -> PathBuf {
        self.data_dir.join(&self.blob_dir)
    }

    /// Path of the JSON metadata document.
    pub fn metadata_path(&self) -> PathBuf {
        self.data_dir.join(&self.metadata_file)
    }
}

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_file_bytes: u64,
    pub allowed_types: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            allowed_types: DEFAULT_ALLOWED_TYPES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_limit: 50,
            max_limit: 100,
        }
    }
}
