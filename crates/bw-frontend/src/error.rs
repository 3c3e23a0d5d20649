//! Front-end errors

use std::path::PathBuf;

use bw_catalog::SourceLanguage;

/// Errors raised while parsing, binding or emitting
#[derive(Debug, thiserror::Error)]
pub enum FrontendError {
    /// No front-end registered for a language
    #[error("no front-end registered for {0}")]
    UnsupportedLanguage(SourceLanguage),

    /// Grammar could not be loaded
    #[error("parser initialization failed: {0}")]
    ParserInit(String),

    /// Parser produced no tree
    #[error("failed to parse {origin}")]
    ParseFailed {
        /// Where the text came from
        origin: String,
    },

    /// Filesystem failure
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Offending path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The compiler could not be started
    #[error("failed to launch compiler `{program}`: {source}")]
    CompilerLaunch {
        /// Compiler program
        program: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The compiler ran and rejected the compilation
    #[error("compilation failed:\n{0}")]
    Diagnostics(String),
}

impl FrontendError {
    /// Create an I/O error for a path
    #[inline]
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    /// Diagnostic text when the compiler rejected the input
    #[inline]
    #[must_use]
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            Self::Diagnostics(text) => Some(text),
            _ => None,
        }
    }
}
