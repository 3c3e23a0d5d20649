//! Service errors

use std::net::SocketAddr;
use std::path::PathBuf;

use bw_build::BuildError;
use bw_catalog::{CatalogError, TargetVersion};

/// Why a request could not be decoded
#[derive(Debug, thiserror::Error)]
pub enum MalformedRequestError {
    /// Message contains non-ASCII bytes
    #[error("request is not ASCII")]
    NonAscii,

    /// Nothing but whitespace
    #[error("empty request")]
    Empty,

    /// Not exactly three fields
    #[error("expected 3 comma-separated fields, found {found}")]
    FieldCount {
        /// Fields present
        found: usize,
    },

    /// A field is not valid base64
    #[error("{field} is not valid base64: {source}")]
    Base64 {
        /// Field name
        field: &'static str,
        /// Decoder error
        #[source]
        source: base64::DecodeError,
    },

    /// A field does not decode to UTF-8 text
    #[error("{field} is not UTF-8: {source}")]
    Utf8 {
        /// Field name
        field: &'static str,
        /// Conversion error
        #[source]
        source: std::string::FromUtf8Error,
    },

    /// Confuse flag other than `true`/`false`
    #[error("confuse flag must be true or false, got {0:?}")]
    ConfuseFlag(String),
}

/// Errors raised by the remote build service
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Listener could not bind
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address
        addr: SocketAddr,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Socket I/O failed
    #[error("socket I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Request could not be decoded
    #[error("malformed request: {0}")]
    Malformed(#[from] MalformedRequestError),

    /// Requested task is not in the catalog after ingestion
    #[error("task not found: {name}")]
    TaskNotFound {
        /// Requested name
        name: String,
    },

    /// Catalog rejected the payload or lookup
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Build could not start
    #[error(transparent)]
    Build(#[from] BuildError),

    /// Some requested versions failed
    #[error("build of {task} failed for {}", format_versions(.failed))]
    IncompleteBuild {
        /// Task name
        task: String,
        /// Versions that failed
        failed: Vec<TargetVersion>,
    },

    /// Configuration file unreadable
    #[error("cannot read config {path}: {source}")]
    ConfigRead {
        /// Config path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Configuration is not valid TOML for [`crate::ServiceConfig`]
    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

fn format_versions(versions: &[TargetVersion]) -> String {
    versions.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

impl ServiceError {
    /// Whether the client sent something unusable
    #[inline]
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Malformed(_) | Self::TaskNotFound { .. } => true,
            Self::Catalog(e) => e.is_client_error(),
            Self::Build(e) => e.is_client_error(),
            _ => false,
        }
    }

    /// Whether the same request might succeed later
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Io(_) => true,
            Self::Build(e) => e.is_retryable(),
            _ => false,
        }
    }
}
