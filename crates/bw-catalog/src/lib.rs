//! Buildwright task catalog
//!
//! In-memory registry of build tasks and the binaries, resources and source
//! libraries they reference, plus the YAML interchange format used to ingest
//! and export them.
//!
//! # Example
//!
//! ```rust
//! use bw_catalog::{TaskCatalog, TargetVersion};
//!
//! let mut catalog = TaskCatalog::new();
//! catalog
//!     .ingest_yaml("- Name: Shell\n  CompatibleDotNetVersions: [Net40]\n  Code: 'class Program {}'\n")
//!     .unwrap();
//!
//! let shell = catalog.find_task("shell", TargetVersion::Net40).unwrap();
//! assert_eq!(shell.name, "Shell");
//! ```

pub mod catalog;
pub mod error;
pub mod interchange;
pub mod model;

pub use catalog::TaskCatalog;
pub use error::CatalogError;
pub use interchange::{LibraryRecord, Locations, ReferenceRecord, ResourceRecord, TaskRecord};
pub use model::{
    normalize_location, Author, EmbeddedResource, LibraryId, OutputKind, Platform,
    ReferenceAssembly, ReferenceId, ResourceId, SourceLanguage, SourceLibrary, TargetVersion,
    TaskId, TaskOption, TaskTemplate,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the catalog
    pub use crate::{CatalogError, Platform, TargetVersion, TaskCatalog, TaskId, TaskTemplate};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
