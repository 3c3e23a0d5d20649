//! Buildwright build pipeline
//!
//! Turns a catalog task into one artifact per target version:
//!
//! 1. [`assemble`] expands the task for a version into a [`CompilationUnit`]
//! 2. [`prune`] drops auxiliary sources and imports the entry never reaches
//! 3. the language front-end emits an image
//! 4. an [`Obfuscator`] optionally transforms it, degrading to the raw image
//!    when the engine produces nothing
//!
//! [`BuildContext`] owns the catalog and collaborators and drives the above
//! per version via [`BuildContext::build`].

pub mod assembler;
pub mod config;
pub mod context;
pub mod error;
pub mod obfuscation;
pub mod orchestrator;
pub mod pruner;

pub use assembler::{assemble, discover_sources, CompilationUnit};
pub use config::{is_reserved_namespace, BuildConfig, DataLayout, ToolCommand};
pub use context::BuildContext;
pub use error::{BuildError, ObfuscationError};
pub use obfuscation::{project_xml, ConfuserObfuscator, ObfuscationOutcome, Obfuscator};
pub use orchestrator::{build_unit, Artifact, BuildReport, ObfuscationStatus};
pub use pruner::{prune, prune_compilation, used_type_closure, PruneReport, PrunedUnit};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving builds
    pub use crate::{
        Artifact, BuildConfig, BuildContext, BuildError, BuildReport, ObfuscationStatus, Obfuscator,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
