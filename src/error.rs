use std::path::PathBuf;

use hyper::StatusCode;
use thiserror::Error;

/// Type alias for Result with ImportError
pub type Result<T> = std::result::Result<T, ImportError>;

/// Error types for the mbox-to-group import pipeline
#[derive(Error, Debug)]
pub enum ImportError {
    /// Groups API returned an error
    #[error("Groups API error: {0}")]
    ApiError(String),

    /// Authentication or delegation failed
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// The group lookup did not find the target group
    #[error("Group not found: {0}")]
    GroupNotFound(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Network-related error (connection issues, timeouts, etc.)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Server returned 5xx error
    #[error("Server error (HTTP {status}): {message}")]
    ServerError { status: u16, message: String },

    /// Bad request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden (401/403)
    #[error("Access forbidden: {0}")]
    Forbidden(String),

    /// Message exceeds the upload size accepted by the service
    #[error("Message too large: {size} bytes (limit {limit})")]
    PayloadTooLarge { size: u64, limit: u64 },

    /// An mbox file could not be opened or read
    #[error("Cannot read mbox archive {path:?}: {message}")]
    ArchiveError { path: PathBuf, message: String },

    /// A group directory could not be traversed
    #[error("Cannot read directory {path:?}: {message}")]
    DirectoryError { path: PathBuf, message: String },

    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Checkpoint file errors
    #[error("Checkpoint error: {0}")]
    CheckpointError(String),

    /// Generic catch-all error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl ImportError {
    /// Check if the error is transient (a later run may succeed)
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ImportError::RateLimitExceeded(_)
                | ImportError::ServerError { .. }
                | ImportError::NetworkError(_)
        )
    }

    /// Check if the error must abort the whole run rather than a single message
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ImportError::AuthError(_)
                | ImportError::GroupNotFound(_)
                | ImportError::ArchiveError { .. }
                | ImportError::DirectoryError { .. }
                | ImportError::ConfigError(_)
        )
    }
}

/// Map a non-success HTTP status from the Groups APIs onto an error variant
pub(crate) fn classify_status(status: StatusCode) -> ImportError {
    let status_code = status.as_u16();
    let message = format!(
        "HTTP {}: {}",
        status_code,
        status.canonical_reason().unwrap_or("Unknown")
    );

    match status_code {
        429 => ImportError::RateLimitExceeded(message),
        400 => ImportError::BadRequest(message),
        401 | 403 => ImportError::Forbidden(message),
        500..=599 => ImportError::ServerError {
            status: status_code,
            message,
        },
        _ => ImportError::ApiError(message),
    }
}

impl From<google_groupsmigration1::Error> for ImportError {
    fn from(error: google_groupsmigration1::Error) -> Self {
        match error {
            google_groupsmigration1::Error::Failure(ref response) => {
                classify_status(response.status())
            }
            google_groupsmigration1::Error::UploadSizeLimitExceeded(size, limit) => {
                ImportError::PayloadTooLarge { size, limit }
            }
            google_groupsmigration1::Error::BadRequest(ref err) => {
                ImportError::BadRequest(format!("{}", err))
            }
            google_groupsmigration1::Error::HttpError(ref err) => {
                ImportError::NetworkError(format!("Connection error: {}", err))
            }
            google_groupsmigration1::Error::Io(err) => ImportError::NetworkError(err.to_string()),
            _ => ImportError::ApiError(error.to_string()),
        }
    }
}

/// Convert a Groups Settings lookup failure into an error naming the group
///
/// A 404 means the group does not exist; anything else keeps its
/// transport/service classification.
pub fn group_lookup_error(group: &str, error: google_groupssettings1::Error) -> ImportError {
    match error {
        google_groupssettings1::Error::Failure(ref response) => {
            if response.status() == StatusCode::NOT_FOUND {
                ImportError::GroupNotFound(group.to_string())
            } else {
                classify_status(response.status())
            }
        }
        google_groupssettings1::Error::MissingToken(ref err) => {
            ImportError::AuthError(format!("No token for group {}: {}", group, err))
        }
        google_groupssettings1::Error::HttpError(ref err) => {
            ImportError::NetworkError(format!("Connection error: {}", err))
        }
        google_groupssettings1::Error::Io(err) => ImportError::NetworkError(err.to_string()),
        _ => ImportError::ApiError(format!("Lookup of group {} failed: {}", group, error)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        let rate_limit = ImportError::RateLimitExceeded("slow down".to_string());
        assert!(rate_limit.is_transient());
        assert!(!rate_limit.is_fatal());

        let server_error = ImportError::ServerError {
            status: 503,
            message: "Service unavailable".to_string(),
        };
        assert!(server_error.is_transient());

        let network_error = ImportError::NetworkError("Connection timeout".to_string());
        assert!(network_error.is_transient());
    }

    #[test]
    fn test_fatal_errors() {
        assert!(ImportError::GroupNotFound("g@example.com".to_string()).is_fatal());
        assert!(ImportError::AuthError("bad key".to_string()).is_fatal());
        assert!(ImportError::ArchiveError {
            path: PathBuf::from("g/Inbox.mbox"),
            message: "missing".to_string(),
        }
        .is_fatal());

        let bad_request = ImportError::BadRequest("malformed".to_string());
        assert!(!bad_request.is_fatal());
        assert!(!bad_request.is_transient());
    }

    #[test]
    fn test_classify_status() {
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            ImportError::RateLimitExceeded(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_REQUEST),
            ImportError::BadRequest(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN),
            ImportError::Forbidden(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE),
            ImportError::ServerError { status: 503, .. }
        ));
        assert!(matches!(
            classify_status(StatusCode::CONFLICT),
            ImportError::ApiError(_)
        ));
    }

    #[test]
    fn test_error_display() {
        let error = ImportError::PayloadTooLarge {
            size: 30_000_000,
            limit: 26_214_400,
        };
        let display = format!("{}", error);
        assert!(display.contains("30000000"));
        assert!(display.contains("26214400"));

        let not_found = ImportError::GroupNotFound("support@example.com".to_string());
        assert!(format!("{}", not_found).contains("support@example.com"));
    }
}
