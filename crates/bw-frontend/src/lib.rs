//! Buildwright language front-ends
//!
//! The build pipeline needs three things from a compiler front-end: parse
//! text into trees, resolve the types a tree uses against a whole
//! compilation, and emit an image. [`LanguageFrontend`] captures those (plus
//! the declaration and import scans pruning relies on) so that languages can
//! be added without touching pruning or orchestration.
//!
//! Only C# is implemented, on top of tree-sitter.

use std::collections::HashSet;
use std::fmt;

use bw_catalog::SourceLanguage;

pub mod csharp;
pub mod emit;
pub mod error;
pub mod registry;
pub mod syntax;

pub use csharp::CSharpFrontend;
pub use emit::{EmitInput, EmitOptions, EmitSource, Emitter, ExternalCompiler, ResourceFile};
pub use error::FrontendError;
pub use registry::FrontendRegistry;
pub use syntax::{
    Compilation, DeclarationKind, DeclaredType, ImportDirective, SourceOrigin, Symbol, SymbolKind,
    SyntaxTree, TreeId, TypeEntry,
};

/// Compiler front-end capabilities
pub trait LanguageFrontend: Send + Sync + fmt::Debug {
    /// Language handled
    fn language(&self) -> SourceLanguage;

    /// Parse text into a syntax tree
    ///
    /// # Errors
    /// Fails if the grammar cannot be loaded or the parser gives up.
    fn parse(&self, origin: SourceOrigin, text: &str) -> Result<SyntaxTree, FrontendError>;

    /// Type declarations in a tree
    fn declared_types(&self, tree: &SyntaxTree) -> Vec<DeclaredType>;

    /// Import directives in a tree
    fn imports(&self, tree: &SyntaxTree) -> Vec<ImportDirective>;

    /// Type symbols used by one tree of a compilation
    fn resolve_used_types(&self, tree: TreeId, compilation: &Compilation) -> HashSet<Symbol>;

    /// Copy of `tree` without the given imports
    ///
    /// # Errors
    /// Fails if the edited text cannot be re-parsed.
    fn remove_imports(&self, tree: &SyntaxTree, imports: &[ImportDirective]) -> Result<SyntaxTree, FrontendError>;

    /// Emit a binary image
    ///
    /// # Errors
    /// [`FrontendError::Diagnostics`] carries compiler output on rejection.
    fn emit(&self, compilation: &Compilation, options: &EmitOptions) -> Result<Vec<u8>, FrontendError>;
}

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for front-end users
    pub use crate::{
        Compilation, EmitOptions, Emitter, FrontendError, FrontendRegistry, LanguageFrontend,
        SourceOrigin, Symbol, SyntaxTree, TreeId,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
