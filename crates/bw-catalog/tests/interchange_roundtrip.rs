//! Export then re-ingest must reproduce an equivalent task

use bw_catalog::{TaskCatalog, TaskId, TaskTemplate};
use pretty_assertions::assert_eq;

const PAYLOAD: &str = r"
- Name: PortScan
  Aliases: [scan, portscan]
  Description: Scan ports
  CompatibleDotNetVersions: [Net35, Net40, Net45]
  Code: |
    using System;
    class Program { static void Main() {} }
  TaskingType: Assembly
  UnsafeCompile: true
  ReferenceSourceLibraries:
    - Name: SharpSploit
      Description: Post-exploitation library
      Location: [SharpSploit\SharpSploit\, Shared\Common\]
      CompatibleDotNetVersions: [Net35, Net40]
      ReferenceAssemblies:
        - Name: System.Management.dll
          Location: net35\System.Management.dll
          DotNetVersion: Net35
      EmbeddedResources:
        - Name: helper.dll
          Location: Shared\helper.dll
          Platform: x86
  ReferenceAssemblies:
    - Name: System.dll
      Location: net40\System.dll
      DotNetVersion: Net40
  EmbeddedResources:
    - Name: config.txt
      Location: Data\config.txt
";

#[derive(Debug, PartialEq)]
struct Shape {
    name: String,
    aliases: Vec<String>,
    code: String,
    versions: Vec<bw_catalog::TargetVersion>,
    unsafe_compile: bool,
    libraries: Vec<(String, Vec<String>)>,
    references: Vec<(String, String)>,
    resources: Vec<(String, String)>,
    library_references: Vec<String>,
    library_resources: Vec<(String, bw_catalog::Platform)>,
}

fn shape(catalog: &TaskCatalog, task: &TaskTemplate) -> Shape {
    let libraries = catalog.task_libraries(task.id);
    Shape {
        name: task.name.clone(),
        aliases: task.aliases.clone(),
        code: task.code.clone(),
        versions: task.compatible_versions.clone(),
        unsafe_compile: task.unsafe_compile,
        libraries: libraries.iter().map(|l| (l.name.clone(), l.locations.clone())).collect(),
        references: catalog
            .task_references(task.id)
            .iter()
            .map(|r| (r.name.clone(), r.location.clone()))
            .collect(),
        resources: catalog
            .task_resources(task.id)
            .iter()
            .map(|r| (r.name.clone(), r.location.clone()))
            .collect(),
        library_references: libraries
            .iter()
            .flat_map(|l| catalog.library_references(l.id))
            .map(|r| r.location.clone())
            .collect(),
        library_resources: libraries
            .iter()
            .flat_map(|l| catalog.library_resources(l.id))
            .map(|r| (r.location.clone(), r.platform))
            .collect(),
    }
}

fn ingest(yaml: &str) -> (TaskCatalog, TaskId) {
    let mut catalog = TaskCatalog::new();
    let ids = catalog.ingest_yaml(yaml).unwrap();
    (catalog, ids[0])
}

#[test]
fn export_reingest_is_equivalent() {
    let (first, id) = ingest(PAYLOAD);
    let exported = first.export_yaml(&[id]).unwrap();
    assert!(!exported.contains('\\'), "export must use forward slashes:\n{exported}");

    let (second, reingested) = ingest(&exported);
    assert_eq!(
        shape(&first, first.task(id).unwrap()),
        shape(&second, second.task(reingested).unwrap())
    );
}

#[test]
fn separator_style_does_not_matter() {
    let (backslashed, a) = ingest(PAYLOAD);
    let (slashed, b) = ingest(&PAYLOAD.replace('\\', "/"));
    assert_eq!(
        shape(&backslashed, backslashed.task(a).unwrap()),
        shape(&slashed, slashed.task(b).unwrap())
    );
}

#[test]
fn export_all_covers_every_task() {
    let mut catalog = TaskCatalog::new();
    catalog.ingest_yaml(PAYLOAD).unwrap();
    catalog
        .ingest_yaml("- Name: Other\n  CompatibleDotNetVersions: [Net45]\n  Code: x\n")
        .unwrap();

    let yaml = catalog.export_all_yaml().unwrap();
    let mut reloaded = TaskCatalog::new();
    reloaded.ingest_yaml(&yaml).unwrap();

    let names: Vec<_> = reloaded.tasks().map(|t| t.name.clone()).collect();
    assert_eq!(names, vec!["PortScan".to_string(), "Other".to_string()]);
}
