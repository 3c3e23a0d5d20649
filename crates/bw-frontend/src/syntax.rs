//! Language-neutral compilation model
//!
//! Syntax trees, declared types, import directives and type symbols, plus the
//! [`Compilation`] that indexes declarations across every tree.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::LanguageFrontend;

/// Position of a tree inside a [`Compilation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TreeId(pub usize);

impl TreeId {
    /// The entry tree is always first
    pub const ENTRY: TreeId = TreeId(0);

    /// Whether this is the entry tree
    #[inline]
    #[must_use]
    pub fn is_entry(self) -> bool {
        self == Self::ENTRY
    }
}

/// Where a syntax tree's text came from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SourceOrigin {
    /// The task's own source
    Entry,
    /// A file discovered under a library directory
    File(PathBuf),
}

impl SourceOrigin {
    /// File path, if any
    #[inline]
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Entry => None,
            Self::File(path) => Some(path),
        }
    }
}

impl fmt::Display for SourceOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entry => f.write_str("<entry>"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Parsed source text
#[derive(Clone)]
pub struct SyntaxTree {
    origin: SourceOrigin,
    source: String,
    tree: tree_sitter::Tree,
}

impl SyntaxTree {
    /// Wrap a parsed tree
    #[inline]
    #[must_use]
    pub fn new(origin: SourceOrigin, source: String, tree: tree_sitter::Tree) -> Self {
        Self { origin, source, tree }
    }

    /// Origin
    #[inline]
    #[must_use]
    pub fn origin(&self) -> &SourceOrigin {
        &self.origin
    }

    /// Source text
    #[inline]
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Concrete syntax tree
    #[inline]
    #[must_use]
    pub fn tree(&self) -> &tree_sitter::Tree {
        &self.tree
    }

    /// Root node
    #[inline]
    #[must_use]
    pub fn root(&self) -> tree_sitter::Node<'_> {
        self.tree.root_node()
    }

    /// Whether the parser had to recover from errors
    #[inline]
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }
}

impl fmt::Debug for SyntaxTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntaxTree")
            .field("origin", &self.origin)
            .field("len", &self.source.len())
            .finish_non_exhaustive()
    }
}

/// Kind of a type declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclarationKind {
    /// Class (records included)
    Class,
    /// Interface
    Interface,
    /// Struct (record structs included)
    Struct,
    /// Enum
    Enum,
    /// Delegate
    Delegate,
}

impl DeclarationKind {
    /// Kinds whose declaring tree is retained when the type is used
    #[inline]
    #[must_use]
    pub fn is_retainable(self) -> bool {
        !matches!(self, Self::Delegate)
    }
}

/// A type declared in source
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeclaredType {
    /// Simple name
    pub name: String,
    /// Containing namespace, empty for the global namespace
    pub namespace: String,
    /// Declaration kind
    pub kind: DeclarationKind,
}

impl DeclaredType {
    /// Namespace-qualified name
    #[inline]
    #[must_use]
    pub fn fully_qualified_name(&self) -> String {
        qualify(&self.namespace, &self.name)
    }
}

/// An import (`using`) directive
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportDirective {
    /// Imported namespace or aliased target
    pub namespace: String,
    /// Alias name for `using X = Y;`
    pub alias: Option<String>,
    /// `using static`
    pub is_static: bool,
    /// Byte range in the tree's source
    pub span: Range<usize>,
}

impl ImportDirective {
    /// Plain namespace import, neither aliased nor static
    #[inline]
    #[must_use]
    pub fn is_plain(&self) -> bool {
        self.alias.is_none() && !self.is_static
    }
}

/// Kind of a resolved symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    /// Array type
    Array,
    /// `dynamic`
    Dynamic,
    /// Name that could not be bound
    Error,
    /// Named type (class, struct, ...)
    Named,
    /// Pointer type
    Pointer,
    /// Generic type parameter
    TypeParameter,
    /// Method
    Method,
    /// Local or parameter
    Local,
    /// Namespace
    Namespace,
}

impl SymbolKind {
    /// Whether symbols of this kind denote types
    #[inline]
    #[must_use]
    pub fn is_type(self) -> bool {
        matches!(
            self,
            Self::Array | Self::Dynamic | Self::Error | Self::Named | Self::Pointer | Self::TypeParameter
        )
    }
}

/// A symbol produced by binding
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Symbol {
    /// Simple name
    pub name: String,
    /// Containing namespace
    pub namespace: String,
    /// Kind
    pub kind: SymbolKind,
    /// Trees holding a declaration, empty for binary-defined types
    pub declarations: Vec<TreeId>,
}

impl Symbol {
    /// Namespace-qualified name
    #[inline]
    #[must_use]
    pub fn fully_qualified_name(&self) -> String {
        qualify(&self.namespace, &self.name)
    }

    /// Whether the symbol is declared in source
    #[inline]
    #[must_use]
    pub fn is_source_defined(&self) -> bool {
        !self.declarations.is_empty()
    }
}

/// Join a namespace and a name
#[must_use]
pub fn qualify(namespace: &str, name: &str) -> String {
    if namespace.is_empty() {
        name.to_string()
    } else {
        format!("{namespace}.{name}")
    }
}

/// Declaration sites for one fully-qualified type name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeEntry {
    /// Simple name
    pub name: String,
    /// Containing namespace
    pub namespace: String,
    /// Every declaring tree with its declaration kind
    pub sites: Vec<(TreeId, DeclarationKind)>,
}

/// Trees plus references, with a declaration index over all trees
#[derive(Debug, Clone)]
pub struct Compilation {
    trees: Vec<SyntaxTree>,
    references: Vec<PathBuf>,
    type_index: HashMap<String, TypeEntry>,
    source_namespaces: HashSet<String>,
}

impl Compilation {
    /// Index `trees` (entry first) using the front-end's declaration scan
    #[must_use]
    pub fn new(frontend: &dyn LanguageFrontend, trees: Vec<SyntaxTree>, references: Vec<PathBuf>) -> Self {
        let mut type_index: HashMap<String, TypeEntry> = HashMap::new();
        let mut source_namespaces = HashSet::new();

        for (index, tree) in trees.iter().enumerate() {
            for declared in frontend.declared_types(tree) {
                let mut prefix = declared.namespace.as_str();
                while !prefix.is_empty() {
                    source_namespaces.insert(prefix.to_string());
                    prefix = prefix.rsplit_once('.').map_or("", |(head, _)| head);
                }
                type_index
                    .entry(declared.fully_qualified_name())
                    .or_insert_with(|| TypeEntry {
                        name: declared.name.clone(),
                        namespace: declared.namespace.clone(),
                        sites: Vec::new(),
                    })
                    .sites
                    .push((TreeId(index), declared.kind));
            }
        }

        Self { trees, references, type_index, source_namespaces }
    }

    /// All trees, entry first
    #[inline]
    #[must_use]
    pub fn trees(&self) -> &[SyntaxTree] {
        &self.trees
    }

    /// One tree
    #[inline]
    #[must_use]
    pub fn tree(&self, id: TreeId) -> Option<&SyntaxTree> {
        self.trees.get(id.0)
    }

    /// Ids of every tree
    pub fn tree_ids(&self) -> impl Iterator<Item = TreeId> {
        (0..self.trees.len()).map(TreeId)
    }

    /// Reference assembly paths
    #[inline]
    #[must_use]
    pub fn references(&self) -> &[PathBuf] {
        &self.references
    }

    /// Declaration sites for a fully-qualified type name
    #[inline]
    #[must_use]
    pub fn lookup_type(&self, fully_qualified_name: &str) -> Option<&TypeEntry> {
        self.type_index.get(fully_qualified_name)
    }

    /// Whether any tree declares a type inside `namespace` or below it
    #[inline]
    #[must_use]
    pub fn declares_namespace(&self, namespace: &str) -> bool {
        self.source_namespaces.contains(namespace)
    }

    /// Number of indexed type names
    #[inline]
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.type_index.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualification() {
        assert_eq!(qualify("", "Program"), "Program");
        assert_eq!(qualify("A.B", "C"), "A.B.C");
    }

    #[test]
    fn type_kinds() {
        for kind in [SymbolKind::Array, SymbolKind::Error, SymbolKind::TypeParameter, SymbolKind::Named] {
            assert!(kind.is_type());
        }
        for kind in [SymbolKind::Method, SymbolKind::Local, SymbolKind::Namespace] {
            assert!(!kind.is_type());
        }
    }
}
