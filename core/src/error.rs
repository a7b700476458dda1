//! Error types for the gateway client.
//!
//! # Design
//! The per-call surface (`dispatch`, `upload`, the typed helpers) is total and
//! reports every expected failure as a `NormalizedResult`. The enums here are
//! used inside the layers and at construction time, where a misconfigured
//! client should fail fast rather than at call time.

use thiserror::Error;

/// Construction-time failures: bad base URL or an inconsistent registry.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid base url `{url}`: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),

    #[error("duplicate action name `{0}` in registry")]
    DuplicateAction(String),

    #[error("action `{name}` is misconfigured: {reason}")]
    InvalidDescriptor { name: String, reason: String },
}

/// A request body could not be built from the caller's parameters.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("request parameters are not serializable: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("request parameters must be a JSON object")]
    NotAnObject,

    #[error("{0} encoding cannot carry a request body for GET")]
    BodyOnGet(&'static str),

    #[error("multipart requests are assembled from files, not parameters")]
    MultipartNeedsFiles,
}

/// A logical file reference could not be turned into readable bytes.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("file not found: {field} ({reference})")]
    NotFound { field: String, reference: String },

    #[error("file not readable: {field} ({reference}): {reason}")]
    Unreadable {
        field: String,
        reference: String,
        reason: String,
    },

    #[error("file reference escapes storage root: {field} ({reference})")]
    OutsideRoot { field: String, reference: String },
}
