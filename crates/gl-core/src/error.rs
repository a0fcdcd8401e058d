//! Unified error type for galleria.
//!
//! All crates funnel their failures into [`Error`]. Every variant belongs to
//! one of three [`ErrorKind`]s, which is what API handlers use to choose an
//! HTTP status and to decide how much of the message the caller may see.

use std::fmt;

use serde::Serialize;

/// Message returned to callers for every internal failure.
pub const INTERNAL_MESSAGE: &str = "Internal server error";

/// Coarse error category shared by every [`Error`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad input shape, bad file type or size.
    Validation,
    /// Missing record, or missing blob for an existing record.
    NotFound,
    /// Disk or I/O failure, corrupt metadata, anything unexpected.
    Internal,
}

impl ErrorKind {
    /// Stable machine-readable code used in error response bodies.
    pub fn code(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Internal => "internal_error",
        }
    }
}

/// A validation problem attached to one input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct FieldIssue {
    /// Name of the offending field (e.g. `file`, `name`, `limit`).
    pub field: String,
    /// Human-readable description of the problem.
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Unified error type covering all failure modes in galleria.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Request data failed validation.
    #[error("{message}")]
    Validation {
        /// Summary shown to the caller.
        message: String,
        /// Per-field details, possibly empty.
        fields: Vec<FieldIssue>,
    },

    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "image", "blob").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The metadata document could not be encoded or decoded.
    #[error("JSON error: {source}")]
    Json {
        /// The underlying serde error.
        #[from]
        source: serde_json::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation { .. } => ErrorKind::Validation,
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Io { .. } | Error::Json { .. } | Error::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Internal => 500,
        }
    }

    /// Message safe to hand back to a caller. Internal details stay in logs.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => INTERNAL_MESSAGE.to_string(),
            _ => self.to_string(),
        }
    }

    /// Field-level details for validation errors; empty otherwise.
    pub fn fields(&self) -> &[FieldIssue] {
        match self {
            Error::Validation { fields, .. } => fields,
            _ => &[],
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Validation error without field detail.
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Validation error blaming a single field.
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Error::Validation {
            fields: vec![FieldIssue::new(field, message.clone())],
            message,
        }
    }

    /// True when this is a [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
