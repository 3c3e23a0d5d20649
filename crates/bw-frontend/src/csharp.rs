//! C# front-end
//!
//! Syntax comes from tree-sitter. Binding is source-level: a name resolves when
//! some tree in the compilation declares a type it can refer to, searching the
//! enclosing namespaces innermost-first, then the global namespace, then every
//! imported namespace. Names that bind to nothing become error-kind symbols
//! attributed to the imported namespaces no source tree declares, which keeps
//! those imports alive through pruning.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use bw_catalog::SourceLanguage;
use tree_sitter::{Node, Parser};

use crate::emit::{EmitInput, EmitOptions, EmitSource, Emitter};
use crate::error::FrontendError;
use crate::syntax::{
    qualify, Compilation, DeclarationKind, DeclaredType, ImportDirective, SourceOrigin, Symbol,
    SymbolKind, SyntaxTree, TreeId, TypeEntry,
};
use crate::LanguageFrontend;

/// File name the entry source is emitted under
pub const ENTRY_FILE_NAME: &str = "Task.cs";

/// Tree-sitter backed C# front-end
#[derive(Debug, Clone)]
pub struct CSharpFrontend {
    emitter: Arc<dyn Emitter>,
}

impl CSharpFrontend {
    /// Front-end emitting through `emitter`
    #[inline]
    #[must_use]
    pub fn new(emitter: Arc<dyn Emitter>) -> Self {
        Self { emitter }
    }

    fn parser() -> Result<Parser, FrontendError> {
        let language: tree_sitter::Language = tree_sitter_c_sharp::LANGUAGE.into();
        let mut parser = Parser::new();
        parser
            .set_language(&language)
            .map_err(|e| FrontendError::ParserInit(e.to_string()))?;
        Ok(parser)
    }
}

impl LanguageFrontend for CSharpFrontend {
    fn language(&self) -> SourceLanguage {
        SourceLanguage::CSharp
    }

    fn parse(&self, origin: SourceOrigin, text: &str) -> Result<SyntaxTree, FrontendError> {
        let mut parser = Self::parser()?;
        let tree = parser
            .parse(text, None)
            .ok_or_else(|| FrontendError::ParseFailed { origin: origin.to_string() })?;
        Ok(SyntaxTree::new(origin, text.to_string(), tree))
    }

    fn declared_types(&self, tree: &SyntaxTree) -> Vec<DeclaredType> {
        let mut declared = Vec::new();
        let root = tree.root();
        let base = file_scoped_namespace(root, tree.source()).unwrap_or_default();
        collect_declarations(root, tree.source(), &base, &mut declared);
        declared
    }

    fn imports(&self, tree: &SyntaxTree) -> Vec<ImportDirective> {
        let mut imports = Vec::new();
        collect_imports(tree.root(), tree.source(), &mut imports);
        imports
    }

    fn resolve_used_types(&self, tree: TreeId, compilation: &Compilation) -> HashSet<Symbol> {
        let Some(syntax) = compilation.tree(tree) else {
            return HashSet::new();
        };
        let imports = self.imports(syntax);
        let mut binder = Binder::new(compilation, syntax, &imports);
        binder.visit(syntax.root());
        binder.symbols
    }

    fn remove_imports(&self, tree: &SyntaxTree, imports: &[ImportDirective]) -> Result<SyntaxTree, FrontendError> {
        if imports.is_empty() {
            return Ok(tree.clone());
        }
        let mut spans: Vec<_> = imports.iter().map(|i| i.span.clone()).collect();
        spans.sort_by(|a, b| b.start.cmp(&a.start));
        spans.dedup();

        let mut text = tree.source().to_string();
        for span in spans {
            let mut end = span.end.min(text.len());
            let rest = &text[end..];
            if rest.starts_with("\r\n") {
                end += 2;
            } else if rest.starts_with('\n') {
                end += 1;
            }
            text.replace_range(span.start..end, "");
        }
        self.parse(tree.origin().clone(), &text)
    }

    fn emit(&self, compilation: &Compilation, options: &EmitOptions) -> Result<Vec<u8>, FrontendError> {
        let sources = compilation
            .trees()
            .iter()
            .map(|tree| EmitSource {
                file_name: match tree.origin() {
                    SourceOrigin::Entry => ENTRY_FILE_NAME.to_string(),
                    SourceOrigin::File(path) => path
                        .file_name()
                        .map_or_else(|| "source.cs".to_string(), |n| n.to_string_lossy().into_owned()),
                },
                text: tree.source(),
            })
            .collect();
        self.emitter.emit(&EmitInput { sources, references: compilation.references(), options })
    }
}

// ----------------------------------------------------------------------
// Syntax helpers
// ----------------------------------------------------------------------

fn children(node: Node<'_>) -> impl Iterator<Item = Node<'_>> {
    (0..node.child_count()).filter_map(move |i| node.child(i))
}

fn text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

fn compact(text: &str) -> String {
    text.chars().filter(|c| !c.is_whitespace()).collect()
}

fn field_text(node: Node<'_>, field: &str, source: &str) -> Option<String> {
    node.child_by_field_name(field).map(|n| compact(text(n, source)))
}

fn file_scoped_namespace(root: Node<'_>, source: &str) -> Option<String> {
    children(root)
        .find(|c| c.kind() == "file_scoped_namespace_declaration")
        .and_then(|c| field_text(c, "name", source))
}

fn declaration_kind(node: Node<'_>) -> Option<DeclarationKind> {
    match node.kind() {
        "class_declaration" => Some(DeclarationKind::Class),
        "record_declaration" => {
            if children(node).any(|c| c.kind() == "struct") {
                Some(DeclarationKind::Struct)
            } else {
                Some(DeclarationKind::Class)
            }
        }
        "struct_declaration" | "record_struct_declaration" => Some(DeclarationKind::Struct),
        "interface_declaration" => Some(DeclarationKind::Interface),
        "enum_declaration" => Some(DeclarationKind::Enum),
        "delegate_declaration" => Some(DeclarationKind::Delegate),
        _ => None,
    }
}

fn collect_declarations(node: Node<'_>, source: &str, namespace: &str, out: &mut Vec<DeclaredType>) {
    if node.kind() == "namespace_declaration" {
        let name_node = node.child_by_field_name("name");
        let inner = qualify(namespace, &name_node.map(|n| compact(text(n, source))).unwrap_or_default());
        for child in children(node).filter(|c| Some(*c) != name_node) {
            collect_declarations(child, source, &inner, out);
        }
        return;
    }

    if let Some(kind) = declaration_kind(node) {
        if let Some(name) = field_text(node, "name", source).filter(|n| !n.is_empty()) {
            out.push(DeclaredType { name, namespace: namespace.to_string(), kind });
        }
    }

    // Nested types keep the namespace of their container.
    for child in children(node) {
        collect_declarations(child, source, namespace, out);
    }
}

fn collect_imports(node: Node<'_>, source: &str, out: &mut Vec<ImportDirective>) {
    for child in children(node) {
        match child.kind() {
            "using_directive" => {
                if let Some(directive) = parse_using(text(child, source), child.byte_range()) {
                    out.push(directive);
                }
            }
            "compilation_unit" | "namespace_declaration" | "file_scoped_namespace_declaration" | "declaration_list" => {
                collect_imports(child, source, out);
            }
            _ => {}
        }
    }
}

fn strip_keyword<'t>(text: &'t str, keyword: &str) -> Option<&'t str> {
    let rest = text.strip_prefix(keyword)?;
    rest.starts_with(char::is_whitespace).then(|| rest.trim_start())
}

fn parse_using(directive: &str, span: std::ops::Range<usize>) -> Option<ImportDirective> {
    let body = directive.trim().strip_suffix(';')?.trim();
    let body = strip_keyword(body, "global").unwrap_or(body);
    let body = strip_keyword(body, "using")?;
    let (body, is_static) = match strip_keyword(body, "static") {
        Some(rest) => (rest, true),
        None => (body, false),
    };
    let body = strip_keyword(body, "unsafe").unwrap_or(body);

    let (alias, target) = match body.split_once('=') {
        Some((alias, target)) => (Some(compact(alias)), compact(target)),
        None => (None, compact(body)),
    };
    let namespace = target.strip_prefix("global::").map_or(target.clone(), str::to_string);
    Some(ImportDirective { namespace, alias, is_static, span })
}

/// Dotted segments of a name-like node, generic arguments dropped
fn name_segments(node: Node<'_>, source: &str) -> Option<Vec<String>> {
    match node.kind() {
        "identifier" => Some(vec![text(node, source).to_string()]),
        "generic_name" => children(node)
            .find(|c| c.kind() == "identifier")
            .map(|id| vec![text(id, source).to_string()]),
        "qualified_name" => {
            let mut segments = name_segments(node.child_by_field_name("qualifier")?, source)?;
            segments.extend(name_segments(node.child_by_field_name("name")?, source)?);
            Some(segments)
        }
        "alias_qualified_name" => {
            let alias = node.child_by_field_name("alias").map(|a| text(a, source));
            let mut segments = name_segments(node.child_by_field_name("name")?, source)?;
            if let Some(alias) = alias.filter(|a| *a != "global") {
                segments.insert(0, alias.to_string());
            }
            Some(segments)
        }
        "member_access_expression" => {
            let mut segments = name_segments(node.child_by_field_name("expression")?, source)?;
            segments.extend(name_segments(node.child_by_field_name("name")?, source)?);
            Some(segments)
        }
        _ => None,
    }
}

fn type_parameter_names(node: Node<'_>, source: &str) -> Vec<String> {
    children(node)
        .filter(|c| c.kind() == "type_parameter_list")
        .flat_map(|list| children(list))
        .filter(|c| c.kind() == "type_parameter")
        .filter_map(|p| {
            p.child_by_field_name("name")
                .or_else(|| children(p).find(|c| c.kind() == "identifier"))
                .map(|n| text(n, source).to_string())
        })
        .collect()
}

/// Identifier that names a declaration rather than referring to a type
fn is_declaration_name(node: Node<'_>) -> bool {
    let Some(parent) = node.parent() else {
        return false;
    };
    match parent.kind() {
        "attribute" | "generic_name" => false,
        "type_parameter" | "name_colon" | "name_equals" | "labeled_statement" | "goto_statement"
        | "extern_alias_directive" => true,
        _ => parent.child_by_field_name("name") == Some(node),
    }
}

const TYPE_PARAMETER_OWNERS: &[&str] = &[
    "class_declaration",
    "struct_declaration",
    "interface_declaration",
    "record_declaration",
    "record_struct_declaration",
    "method_declaration",
    "delegate_declaration",
    "local_function_statement",
];

// ----------------------------------------------------------------------
// Binder
// ----------------------------------------------------------------------

struct Binder<'c> {
    compilation: &'c Compilation,
    source: &'c str,
    usings: Vec<String>,
    external_usings: Vec<String>,
    aliases: HashMap<String, String>,
    namespaces: Vec<String>,
    type_parameters: Vec<Vec<String>>,
    symbols: HashSet<Symbol>,
}

impl<'c> Binder<'c> {
    fn new(compilation: &'c Compilation, tree: &'c SyntaxTree, imports: &[ImportDirective]) -> Self {
        let mut usings = Vec::new();
        let mut aliases = HashMap::new();
        for import in imports.iter().filter(|i| !i.is_static) {
            match &import.alias {
                Some(alias) => {
                    aliases.insert(alias.clone(), import.namespace.clone());
                }
                None => usings.push(import.namespace.clone()),
            }
        }
        let external_usings = usings
            .iter()
            .filter(|u| !compilation.declares_namespace(u))
            .cloned()
            .collect();
        let namespaces = file_scoped_namespace(tree.root(), tree.source()).into_iter().collect();

        let mut binder = Self {
            compilation,
            source: tree.source(),
            usings,
            external_usings,
            aliases,
            namespaces,
            type_parameters: Vec::new(),
            symbols: HashSet::new(),
        };
        for import in imports.iter().filter(|i| !i.is_plain()) {
            binder.bind_directive_target(import);
        }
        binder
    }

    /// `using static T;` and `using A = T;` name a type the file depends on
    fn bind_directive_target(&mut self, import: &ImportDirective) {
        let target = import.namespace.split('<').next().unwrap_or_default();
        let segments: Vec<String> = target.split('.').filter(|s| !s.is_empty()).map(str::to_string).collect();
        if segments.is_empty() {
            return;
        }
        let bound = self.bind_type_path(&segments);
        // An alias that binds nothing names a namespace.
        if !bound && import.is_static {
            self.record_unbound(&segments);
        }
    }

    fn visit(&mut self, node: Node<'_>) {
        match node.kind() {
            "using_directive" | "extern_alias_directive" | "comment" | "predefined_type" | "implicit_type" => {}
            "namespace_declaration" => {
                let name_node = node.child_by_field_name("name");
                let name = name_node.map(|n| compact(text(n, self.source))).unwrap_or_default();
                let current = self.namespaces.last().cloned().unwrap_or_default();
                self.namespaces.push(qualify(&current, &name));
                for child in children(node).filter(|c| Some(*c) != name_node) {
                    self.visit(child);
                }
                self.namespaces.pop();
            }
            "file_scoped_namespace_declaration" => {
                let name_node = node.child_by_field_name("name");
                for child in children(node).filter(|c| Some(*c) != name_node) {
                    self.visit(child);
                }
            }
            kind if TYPE_PARAMETER_OWNERS.contains(&kind) => {
                self.type_parameters.push(type_parameter_names(node, self.source));
                self.visit_children(node);
                self.type_parameters.pop();
            }
            "qualified_name" | "alias_qualified_name" => {
                if let Some(segments) = name_segments(node, self.source) {
                    self.bind_qualified(&segments);
                }
                self.visit_type_arguments(node);
            }
            "generic_name" => {
                if let Some(segments) = name_segments(node, self.source) {
                    self.bind_simple(&segments[0]);
                }
                self.visit_type_arguments(node);
            }
            "member_access_expression" => self.visit_member_access(node),
            "attribute" => self.visit_attribute(node),
            "identifier" => {
                if !is_declaration_name(node) {
                    let name = text(node, self.source).to_string();
                    self.bind_simple(&name);
                }
            }
            "array_type" => {
                self.record_structural(node, SymbolKind::Array);
                self.visit_children(node);
            }
            "pointer_type" => {
                self.record_structural(node, SymbolKind::Pointer);
                self.visit_children(node);
            }
            _ => self.visit_children(node),
        }
    }

    fn visit_children(&mut self, node: Node<'_>) {
        for child in children(node) {
            self.visit(child);
        }
    }

    fn visit_type_arguments(&mut self, node: Node<'_>) {
        for child in children(node) {
            if child.kind() == "type_argument_list" {
                self.visit_children(child);
            } else {
                self.visit_type_arguments(child);
            }
        }
    }

    /// `A.B.C.M()` binds the longest dotted prefix naming a type.
    fn visit_member_access(&mut self, node: Node<'_>) {
        if let Some(segments) = name_segments(node, self.source) {
            for len in (2..=segments.len()).rev() {
                let dotted = segments[..len].join(".");
                if let Some(entry) = self.lookup(&dotted) {
                    self.record_named(entry);
                    self.visit_type_arguments(node);
                    return;
                }
            }
        }
        if let Some(expression) = node.child_by_field_name("expression") {
            self.visit(expression);
        }
        if let Some(name) = node.child_by_field_name("name") {
            self.visit_type_arguments(name);
        }
    }

    fn visit_attribute(&mut self, node: Node<'_>) {
        let name_node = node.child_by_field_name("name");
        if let Some(mut segments) = name_node.and_then(|n| name_segments(n, self.source)) {
            let dotted = segments.join(".");
            let suffixed = format!("{dotted}Attribute");
            if let Some(entry) = self.lookup(&dotted).or_else(|| self.lookup(&suffixed)) {
                self.record_named(entry);
            } else if let Some(last) = segments.last_mut() {
                if !last.ends_with("Attribute") {
                    last.push_str("Attribute");
                }
                self.record_unbound(&segments);
            }
        }
        for child in children(node).filter(|c| Some(*c) != name_node) {
            self.visit(child);
        }
    }

    fn bind_simple(&mut self, name: &str) {
        if name.is_empty() || name == "var" || name == "nameof" {
            return;
        }
        if self.type_parameters.iter().any(|frame| frame.iter().any(|p| p == name)) {
            self.symbols.insert(Symbol {
                name: name.to_string(),
                namespace: String::new(),
                kind: SymbolKind::TypeParameter,
                declarations: Vec::new(),
            });
            return;
        }
        if name == "dynamic" {
            self.symbols.insert(Symbol {
                name: name.to_string(),
                namespace: String::new(),
                kind: SymbolKind::Dynamic,
                declarations: Vec::new(),
            });
            return;
        }
        match self.lookup(name) {
            Some(entry) => self.record_named(entry),
            None => self.record_unbound(&[name.to_string()]),
        }
    }

    fn bind_qualified(&mut self, segments: &[String]) {
        if !self.bind_type_path(segments) {
            self.record_unbound(segments);
        }
    }

    /// Bind `A.B.C` as a type, or as a container type followed by nested types.
    fn bind_type_path(&mut self, segments: &[String]) -> bool {
        if let Some(entry) = self.lookup(&segments.join(".")) {
            self.record_named(entry);
            return true;
        }
        let compilation = self.compilation;
        // Nested types are indexed under the namespace of their container.
        for len in (1..segments.len()).rev() {
            let Some(container) = self.lookup(&segments[..len].join(".")) else {
                continue;
            };
            self.record_named(container);
            for segment in &segments[len..] {
                if let Some(nested) = compilation.lookup_type(&qualify(&container.namespace, segment)) {
                    self.record_named(nested);
                }
            }
            return true;
        }
        false
    }

    fn lookup(&self, dotted: &str) -> Option<&'c TypeEntry> {
        let dotted = self.expand_alias(dotted);
        let mut namespace = self.namespaces.last().map_or("", String::as_str);
        loop {
            if let Some(entry) = self.compilation.lookup_type(&qualify(namespace, &dotted)) {
                return Some(entry);
            }
            if namespace.is_empty() {
                break;
            }
            namespace = namespace.rsplit_once('.').map_or("", |(head, _)| head);
        }
        self.usings
            .iter()
            .find_map(|using| self.compilation.lookup_type(&qualify(using, &dotted)))
    }

    fn expand_alias(&self, dotted: &str) -> String {
        let (head, tail) = dotted.split_once('.').map_or((dotted, None), |(h, t)| (h, Some(t)));
        match (self.aliases.get(head), tail) {
            (Some(target), Some(tail)) => format!("{target}.{tail}"),
            (Some(target), None) => target.clone(),
            (None, _) => dotted.to_string(),
        }
    }

    fn record_named(&mut self, entry: &TypeEntry) {
        let mut declarations: Vec<TreeId> = entry.sites.iter().map(|(tree, _)| *tree).collect();
        declarations.sort_unstable();
        declarations.dedup();
        self.symbols.insert(Symbol {
            name: entry.name.clone(),
            namespace: entry.namespace.clone(),
            kind: SymbolKind::Named,
            declarations,
        });
    }

    fn record_unbound(&mut self, segments: &[String]) {
        let Some((name, qualifier)) = segments.split_last() else {
            return;
        };
        let namespaces = if qualifier.is_empty() {
            if self.external_usings.is_empty() {
                vec![String::new()]
            } else {
                self.external_usings.clone()
            }
        } else {
            vec![self.expand_alias(&qualifier.join("."))]
        };
        for namespace in namespaces {
            self.symbols.insert(Symbol {
                name: name.clone(),
                namespace,
                kind: SymbolKind::Error,
                declarations: Vec::new(),
            });
        }
    }

    fn record_structural(&mut self, node: Node<'_>, kind: SymbolKind) {
        self.symbols.insert(Symbol {
            name: compact(text(node, self.source)),
            namespace: String::new(),
            kind,
            declarations: Vec::new(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::EmitOptions;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[derive(Debug)]
    struct Concatenate;

    impl Emitter for Concatenate {
        fn emit(&self, input: &EmitInput<'_>) -> Result<Vec<u8>, FrontendError> {
            Ok(input.sources.iter().map(|s| s.text).collect::<Vec<_>>().join("\n").into_bytes())
        }
    }

    fn frontend() -> CSharpFrontend {
        CSharpFrontend::new(Arc::new(Concatenate))
    }

    fn compile(entry: &str, files: &[(&str, &str)]) -> Compilation {
        let fe = frontend();
        let mut trees = vec![fe.parse(SourceOrigin::Entry, entry).unwrap()];
        for (name, text) in files {
            trees.push(fe.parse(SourceOrigin::File(PathBuf::from(name)), text).unwrap());
        }
        Compilation::new(&fe, trees, Vec::new())
    }

    fn named(symbols: &HashSet<Symbol>) -> Vec<String> {
        let mut names: Vec<_> = symbols
            .iter()
            .filter(|s| s.kind == SymbolKind::Named)
            .map(Symbol::fully_qualified_name)
            .collect();
        names.sort();
        names
    }

    #[test]
    fn declarations_with_namespaces() {
        let fe = frontend();
        let tree = fe
            .parse(
                SourceOrigin::Entry,
                "namespace A.B { class Outer { struct Inner {} } namespace C { interface I {} } }\nenum Top { X }",
            )
            .unwrap();
        let mut declared: Vec<_> = fe.declared_types(&tree).iter().map(DeclaredType::fully_qualified_name).collect();
        declared.sort();
        assert_eq!(declared, vec!["A.B.C.I", "A.B.Inner", "A.B.Outer", "Top"]);
    }

    #[test]
    fn file_scoped_namespace_declarations() {
        let fe = frontend();
        let tree = fe.parse(SourceOrigin::Entry, "namespace Lib.Util;\npublic class Helper {}\n").unwrap();
        let declared = fe.declared_types(&tree);
        assert_eq!(declared.len(), 1);
        assert_eq!(declared[0].fully_qualified_name(), "Lib.Util.Helper");
    }

    #[test]
    fn using_directive_forms() {
        let fe = frontend();
        let tree = fe
            .parse(
                SourceOrigin::Entry,
                "global using Lib.Util;\nusing System;\nusing static System.Math;\nusing IO = System.IO;\nclass P {}\n",
            )
            .unwrap();
        let imports = fe.imports(&tree);
        let summary: Vec<_> = imports
            .iter()
            .map(|i| (i.namespace.as_str(), i.alias.as_deref(), i.is_static))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Lib.Util", None, false),
                ("System", None, false),
                ("System.Math", None, true),
                ("System.IO", Some("IO"), false),
            ]
        );
    }

    #[test]
    fn binds_through_usings_and_qualified_names() {
        let compilation = compile(
            "using Lib.Util;\nclass Program { static void Main() { var h = new Helper(); Lib.Data.Store.Save(h); Other.Thing t = null; } }",
            &[
                ("Helper.cs", "namespace Lib.Util { public class Helper {} }"),
                ("Store.cs", "namespace Lib.Data { public static class Store { public static void Save(object o) {} } }"),
                ("Thing.cs", "namespace Other { public class Thing {} }"),
                ("Unused.cs", "namespace Lib.Util { public class Unused {} }"),
            ],
        );
        let symbols = frontend().resolve_used_types(TreeId::ENTRY, &compilation);
        assert_eq!(named(&symbols), vec!["Lib.Data.Store", "Lib.Util.Helper", "Other.Thing"]);

        let helper = symbols.iter().find(|s| s.name == "Helper").unwrap();
        assert_eq!(helper.declarations, vec![TreeId(1)]);
    }

    #[test]
    fn enclosing_namespace_resolution_and_generics() {
        let compilation = compile(
            "namespace App.Core { class Program { System.Collections.Generic.List<Widget> items; T Get<T>() { return default(T); } } }",
            &[("Widget.cs", "namespace App { public class Widget {} }")],
        );
        let symbols = frontend().resolve_used_types(TreeId::ENTRY, &compilation);
        assert!(named(&symbols).contains(&"App.Widget".to_string()));
        assert!(symbols.iter().any(|s| s.kind == SymbolKind::TypeParameter && s.name == "T"));
        assert!(symbols
            .iter()
            .any(|s| s.kind == SymbolKind::Error && s.namespace == "System.Collections.Generic" && s.name == "List"));
    }

    #[test]
    fn unbound_names_attributed_to_external_imports() {
        let compilation = compile(
            "using System;\nusing Microsoft.Win32;\nusing Lib.Util;\nclass Program { void M() { Registry.GetValue(); } }",
            &[("Helper.cs", "namespace Lib.Util { public class Helper {} }")],
        );
        let symbols = frontend().resolve_used_types(TreeId::ENTRY, &compilation);
        let namespaces: HashSet<_> = symbols
            .iter()
            .filter(|s| s.kind == SymbolKind::Error && s.name == "Registry")
            .map(|s| s.namespace.as_str())
            .collect();
        assert_eq!(namespaces, HashSet::from(["System", "Microsoft.Win32"]));
    }

    #[test]
    fn attributes_bind_with_suffix() {
        let compilation = compile(
            "[Marker] class Program {}",
            &[("Marker.cs", "public class MarkerAttribute : System.Attribute {}")],
        );
        let symbols = frontend().resolve_used_types(TreeId::ENTRY, &compilation);
        assert!(named(&symbols).contains(&"MarkerAttribute".to_string()));
    }

    #[test]
    fn remove_imports_reparses() {
        let fe = frontend();
        let tree = fe
            .parse(SourceOrigin::Entry, "using System;\nusing Dead.Space;\nclass Program {}\n")
            .unwrap();
        let dead: Vec<_> = fe.imports(&tree).into_iter().filter(|i| i.namespace == "Dead.Space").collect();
        let pruned = fe.remove_imports(&tree, &dead).unwrap();
        assert_eq!(pruned.source(), "using System;\nclass Program {}\n");
        assert_eq!(fe.imports(&pruned).len(), 1);
        assert!(!pruned.has_errors());
    }

    #[test]
    fn emit_passes_sources_in_order() {
        let compilation = compile("class Program {}", &[("dir/Helper.cs", "class Helper {}")]);
        let bytes = frontend().emit(&compilation, &EmitOptions::default()).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "class Program {}\nclass Helper {}");
    }
}
