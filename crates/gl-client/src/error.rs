//! Client-side error type.

/// Failures seen by API consumers.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never produced a response, or the body was unreadable.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        /// Machine-readable code from the error body, if any.
        code: Option<String>,
        message: String,
    },
}

impl ClientError {
    /// HTTP status for server-side failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
