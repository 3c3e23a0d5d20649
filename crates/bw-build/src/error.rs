//! Build errors

use std::path::PathBuf;

use bw_catalog::{CatalogError, TargetVersion};
use bw_frontend::FrontendError;

/// Errors raised by the build pipeline
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// Catalog lookup failed
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// The task does not list this version
    #[error("task {task} does not support {version}")]
    UnsupportedVersion {
        /// Task name
        task: String,
        /// Requested version
        version: TargetVersion,
    },

    /// The compiler rejected the compilation
    #[error("compilation of {task} for {version} failed:\n{diagnostics}")]
    CompilationDiagnostics {
        /// Task name
        task: String,
        /// Target version
        version: TargetVersion,
        /// Full compiler output
        diagnostics: String,
    },

    /// Parsing or emission failed for reasons other than diagnostics
    #[error("front-end error: {0}")]
    Frontend(#[from] FrontendError),

    /// The obfuscation stage failed outright
    #[error("obfuscation failed: {0}")]
    Obfuscation(#[from] ObfuscationError),

    /// A library source directory is missing
    #[error("source directory not found: {0}")]
    MissingSourceDirectory(PathBuf),

    /// Filesystem failure
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Offending path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// A per-version worker panicked or was cancelled
    #[error("build worker failed: {0}")]
    Worker(String),
}

impl BuildError {
    /// Create an I/O error for a path
    #[inline]
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// Check if error is retryable
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Worker(_) | Self::Obfuscation(_))
    }

    /// Whether the request itself was at fault
    #[inline]
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::UnsupportedVersion { .. } | Self::CompilationDiagnostics { .. } => true,
            Self::Catalog(e) => e.is_client_error(),
            _ => false,
        }
    }

    /// Compiler output when the compiler rejected the input
    #[inline]
    #[must_use]
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            Self::CompilationDiagnostics { diagnostics, .. } => Some(diagnostics),
            _ => None,
        }
    }
}

/// Errors raised by the obfuscation stage before the engine runs
#[derive(Debug, thiserror::Error)]
pub enum ObfuscationError {
    /// Scratch space could not be prepared
    #[error("obfuscation scratch I/O at {path}: {source}")]
    Scratch {
        /// Offending path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl ObfuscationError {
    /// Create a scratch I/O error
    #[inline]
    pub fn scratch(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Scratch { path: path.into(), source }
    }
}
