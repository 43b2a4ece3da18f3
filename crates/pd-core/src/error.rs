//! Unified error type for pixdrop.
//!
//! The store and the HTTP layer funnel their failures into [`Error`], which
//! carries enough context for handlers to derive an HTTP status code via
//! [`Error::http_status`].

use std::fmt;

/// Unified error type covering all failure modes in pixdrop.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The declared content type of an upload is not `image/*`.
    #[error("Invalid content type: {mime}")]
    InvalidContentType {
        /// The declared MIME type that was rejected.
        mime: String,
    },

    /// The requested entity could not be found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// The kind of entity (e.g. "image").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// No free identifier could be drawn.
    #[error("Storage exhausted: no free identifier after {attempts} attempts")]
    StorageExhausted {
        /// How many identifiers were drawn before giving up.
        attempts: u32,
    },

    /// Request data failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The request body exceeded the configured upload limit.
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// An I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Map this error to an appropriate HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            Error::InvalidContentType { .. } => 415,
            Error::NotFound { .. } => 404,
            Error::StorageExhausted { .. } => 503,
            Error::Validation(_) => 400,
            Error::PayloadTooLarge(_) => 413,
            Error::Io { .. } => 500,
            Error::Internal(_) => 500,
        }
    }

    /// Short machine-readable code for API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidContentType { .. } => "invalid_content_type",
            Error::NotFound { .. } => "not_found",
            Error::StorageExhausted { .. } => "storage_exhausted",
            Error::Validation(_) => "validation_error",
            Error::PayloadTooLarge(_) => "payload_too_large",
            Error::Io { .. } => "io_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// Convenience constructor for [`Error::NotFound`].
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Error::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Convenience constructor for [`Error::InvalidContentType`].
    pub fn invalid_content_type(mime: impl Into<String>) -> Self {
        Error::InvalidContentType { mime: mime.into() }
    }
}

/// Result alias using the crate-level [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_content_type_display() {
        let err = Error::invalid_content_type("application/pdf");
        assert_eq!(err.to_string(), "Invalid content type: application/pdf");
        assert_eq!(err.http_status(), 415);
        assert_eq!(err.code(), "invalid_content_type");
    }

    #[test]
    fn not_found_display() {
        let err = Error::not_found("image", "ffffffff");
        assert_eq!(err.to_string(), "image not found: ffffffff");
        assert_eq!(err.http_status(), 404);
    }

    #[test]
    fn storage_exhausted_display() {
        let err = Error::StorageExhausted { attempts: 8 };
        assert_eq!(
            err.to_string(),
            "Storage exhausted: no free identifier after 8 attempts"
        );
        assert_eq!(err.http_status(), 503);
    }

    #[test]
    fn validation_display() {
        let err = Error::Validation("missing image field".into());
        assert_eq!(err.to_string(), "Validation error: missing image field");
        assert_eq!(err.http_status(), 400);
    }

    #[test]
    fn payload_too_large_display() {
        let err = Error::PayloadTooLarge("length limit exceeded".into());
        assert_eq!(err.to_string(), "Payload too large: length limit exceeded");
        assert_eq!(err.http_status(), 413);
        assert_eq!(err.code(), "payload_too_large");
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io { .. }));
        assert_eq!(err.http_status(), 500);
        assert_eq!(err.code(), "io_error");
    }

    #[test]
    fn internal_display() {
        let err = Error::Internal("join failed".into());
        assert_eq!(err.to_string(), "Internal error: join failed");
        assert_eq!(err.http_status(), 500);
    }
}
