//! Algebraic properties of reachability pruning

use std::path::PathBuf;

use bw_build::prune_compilation;
use bw_frontend::{CSharpFrontend, Compilation, LanguageFrontend, SourceOrigin, TreeId};
use bw_test_utils::RecordingEmitter;
use proptest::prelude::*;

const ENTRY: &str = "using System;\nusing Lib;\n\
    class Program { static void Main() { var head = new Live0(); Console.WriteLine(head); } }\n";

fn frontend() -> CSharpFrontend {
    CSharpFrontend::new(RecordingEmitter::new())
}

/// Entry plus a chain `Live0 -> Live1 -> ...` and `dead` files nothing reaches
fn fixture(fe: &CSharpFrontend, live: usize, dead: usize) -> Compilation {
    let mut trees = vec![fe.parse(SourceOrigin::Entry, ENTRY).unwrap()];
    for i in 0..live {
        let field = if i + 1 < live { format!("Live{} next;", i + 1) } else { String::new() };
        let text = format!("namespace Lib {{ public class Live{i} {{ {field} }} }}");
        trees.push(fe.parse(SourceOrigin::File(PathBuf::from(format!("Live{i}.cs"))), &text).unwrap());
    }
    for j in 0..dead {
        let text = format!("namespace Lib.Extra {{ public class Dead{j} {{ Lib.Live0 back; }} }}");
        trees.push(fe.parse(SourceOrigin::File(PathBuf::from(format!("Dead{j}.cs"))), &text).unwrap());
    }
    Compilation::new(fe, trees, Vec::new())
}

fn reserved() -> Vec<String> {
    vec!["System".to_string()]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn dead_files_never_change_retained_set(live in 1usize..5, dead in 0usize..6) {
        let fe = frontend();
        let baseline = prune_compilation(&fe, fixture(&fe, live, 0), true, &reserved()).unwrap();
        let padded = prune_compilation(&fe, fixture(&fe, live, dead), true, &reserved()).unwrap();

        prop_assert_eq!(baseline.report.retained_files.len(), live);
        prop_assert_eq!(&padded.report.retained_files, &baseline.report.retained_files);
        prop_assert_eq!(padded.report.dropped_files.len(), dead);
    }

    #[test]
    fn bypass_retains_every_tree(live in 0usize..4, dead in 0usize..4) {
        let fe = frontend();
        let pruned = prune_compilation(&fe, fixture(&fe, live, dead), false, &reserved()).unwrap();

        prop_assert!(pruned.report.bypassed);
        prop_assert_eq!(pruned.compilation.trees().len(), 1 + live + dead);
        prop_assert!(pruned.report.removed_imports.is_empty());
        prop_assert_eq!(pruned.compilation.tree(TreeId::ENTRY).unwrap().source(), ENTRY);
    }

    #[test]
    fn second_pass_removes_nothing(live in 1usize..5, dead in 0usize..5) {
        let fe = frontend();
        let first = prune_compilation(&fe, fixture(&fe, live, dead), true, &reserved()).unwrap();
        let entry_after_first = first.compilation.tree(TreeId::ENTRY).unwrap().source().to_string();
        let second = prune_compilation(&fe, first.compilation, true, &reserved()).unwrap();

        prop_assert_eq!(&second.report.retained_files, &first.report.retained_files);
        prop_assert!(second.report.dropped_files.is_empty());
        prop_assert!(second.report.removed_imports.is_empty());
        prop_assert_eq!(second.compilation.tree(TreeId::ENTRY).unwrap().source(), entry_after_first.as_str());
    }
}

#[test]
fn unused_source_namespace_import_is_cut() {
    let fe = frontend();
    let entry = "using System;\nusing Lib;\nusing Lib.Extra;\n\
        class Program { static void Main() { var head = new Live0(); } }\n";
    let mut trees = vec![fe.parse(SourceOrigin::Entry, entry).unwrap()];
    trees.push(fe.parse(SourceOrigin::File("Live0.cs".into()), "namespace Lib { public class Live0 {} }").unwrap());
    trees.push(
        fe.parse(SourceOrigin::File("Dead0.cs".into()), "namespace Lib.Extra { public class Dead0 {} }")
            .unwrap(),
    );

    let pruned = prune_compilation(&fe, Compilation::new(&fe, trees, Vec::new()), true, &reserved()).unwrap();
    assert_eq!(pruned.report.removed_imports, vec!["Lib.Extra".to_string()]);

    let entry = pruned.compilation.tree(TreeId::ENTRY).unwrap();
    let remaining: Vec<String> = fe.imports(entry).into_iter().map(|i| i.namespace).collect();
    assert_eq!(remaining, vec!["System".to_string(), "Lib".to_string()]);
}
