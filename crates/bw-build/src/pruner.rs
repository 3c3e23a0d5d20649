//! Reachability pruning
//!
//! Starting from the entry tree, repeatedly collect the types each scanned
//! tree uses and enqueue the auxiliary trees declaring them, until no new tree
//! turns up. Auxiliary trees declaring a type in that closure survive; so do
//! the entry imports of reserved namespaces or of namespaces some closure
//! symbol lives in. Everything else is cut and the result recompiled.

use std::collections::{BTreeSet, HashSet, VecDeque};
use std::path::PathBuf;

use bw_frontend::{Compilation, ImportDirective, LanguageFrontend, SourceOrigin, Symbol, SyntaxTree, TreeId};
use tracing::{debug, info};

use crate::assembler::CompilationUnit;
use crate::config::is_reserved_namespace;
use crate::error::BuildError;

/// What pruning kept and cut
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Pruning was skipped because optimization is off
    pub bypassed: bool,
    /// Auxiliary files kept
    pub retained_files: Vec<PathBuf>,
    /// Auxiliary files dropped
    pub dropped_files: Vec<PathBuf>,
    /// Namespaces whose imports were removed from the entry tree
    pub removed_imports: Vec<String>,
    /// Number of type symbols in the closure
    pub closure_size: usize,
}

impl PruneReport {
    /// Trees in the final compilation, entry included
    #[inline]
    #[must_use]
    pub fn retained_tree_count(&self) -> usize {
        self.retained_files.len() + 1
    }
}

/// Final compilation plus its report
#[derive(Debug, Clone)]
pub struct PrunedUnit {
    /// Compilation to emit
    pub compilation: Compilation,
    /// Report
    pub report: PruneReport,
}

/// Parse every source of `unit` and prune it unless optimization is off.
///
/// # Errors
/// Fails when a source directory or file cannot be read, or parsing fails.
pub fn prune(frontend: &dyn LanguageFrontend, unit: &CompilationUnit) -> Result<PrunedUnit, BuildError> {
    let mut trees = vec![frontend.parse(SourceOrigin::Entry, &unit.entry_source)?];
    for path in unit.source_files()? {
        let text = std::fs::read_to_string(&path).map_err(|e| BuildError::io_error(&path, e))?;
        trees.push(frontend.parse(SourceOrigin::File(path), &text)?);
    }
    let compilation = Compilation::new(frontend, trees, unit.references.clone());
    prune_compilation(frontend, compilation, unit.optimize, &unit.reserved_namespaces)
}

/// Prune an already-parsed compilation whose first tree is the entry.
///
/// # Errors
/// Fails only if the edited entry tree cannot be re-parsed.
pub fn prune_compilation(
    frontend: &dyn LanguageFrontend,
    compilation: Compilation,
    optimize: bool,
    reserved_namespaces: &[String],
) -> Result<PrunedUnit, BuildError> {
    let auxiliary_files = |ids: &mut dyn Iterator<Item = TreeId>| -> Vec<PathBuf> {
        ids.filter_map(|id| compilation.tree(id))
            .filter_map(|tree| tree.origin().path().map(PathBuf::from))
            .collect()
    };

    if !optimize {
        let report = PruneReport {
            bypassed: true,
            retained_files: auxiliary_files(&mut compilation.tree_ids().skip(1)),
            ..PruneReport::default()
        };
        debug!(trees = compilation.trees().len(), "Optimization off, pruning bypassed");
        return Ok(PrunedUnit { compilation, report });
    }

    let closure = used_type_closure(frontend, &compilation);

    let closure_names: HashSet<String> = closure.iter().map(Symbol::fully_qualified_name).collect();
    let (retained, dropped): (Vec<TreeId>, Vec<TreeId>) = compilation.tree_ids().skip(1).partition(|id| {
        compilation.tree(*id).is_some_and(|tree| {
            frontend
                .declared_types(tree)
                .iter()
                .any(|declared| declared.kind.is_retainable() && closure_names.contains(&declared.fully_qualified_name()))
        })
    });

    let used_namespaces: HashSet<&str> = closure.iter().map(|symbol| symbol.namespace.as_str()).collect();
    let Some(entry) = compilation.tree(TreeId::ENTRY) else {
        return Ok(PrunedUnit { compilation, report: PruneReport::default() });
    };
    let unused_imports: Vec<ImportDirective> = frontend
        .imports(entry)
        .into_iter()
        .filter(|import| {
            import.is_plain()
                && !is_reserved_namespace(&import.namespace, reserved_namespaces)
                && !used_namespaces.contains(import.namespace.as_str())
        })
        .collect();
    let pruned_entry = frontend.remove_imports(entry, &unused_imports)?;

    let report = PruneReport {
        bypassed: false,
        retained_files: auxiliary_files(&mut retained.iter().copied()),
        dropped_files: auxiliary_files(&mut dropped.iter().copied()),
        removed_imports: unused_imports.iter().map(|i| i.namespace.clone()).collect(),
        closure_size: closure.len(),
    };
    for file in &report.dropped_files {
        debug!(file = %file.display(), "Dropping unreachable source");
    }
    info!(
        retained = report.retained_files.len(),
        dropped = report.dropped_files.len(),
        removed_imports = report.removed_imports.len(),
        closure = report.closure_size,
        "Pruned compilation"
    );

    let mut trees: Vec<SyntaxTree> = Vec::with_capacity(retained.len() + 1);
    trees.push(pruned_entry);
    trees.extend(retained.iter().filter_map(|id| compilation.tree(*id)).cloned());
    let references = compilation.references().to_vec();

    Ok(PrunedUnit { compilation: Compilation::new(frontend, trees, references), report })
}

/// Breadth-first fixed point over trees and the type symbols they use
#[must_use]
pub fn used_type_closure(frontend: &dyn LanguageFrontend, compilation: &Compilation) -> HashSet<Symbol> {
    let mut closure = HashSet::new();
    let mut visited = BTreeSet::from([TreeId::ENTRY]);
    let mut queue = VecDeque::from([TreeId::ENTRY]);

    while let Some(tree) = queue.pop_front() {
        for symbol in frontend.resolve_used_types(tree, compilation) {
            if !symbol.kind.is_type() {
                continue;
            }
            for declaration in &symbol.declarations {
                if !declaration.is_entry() && visited.insert(*declaration) {
                    queue.push_back(*declaration);
                }
            }
            closure.insert(symbol);
        }
    }
    debug!(trees = visited.len(), types = closure.len(), "Computed used-type closure");
    closure
}
