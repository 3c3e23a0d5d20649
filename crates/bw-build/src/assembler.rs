//! Build request assembly
//!
//! Expands a catalog task for one target version into a [`CompilationUnit`]:
//! entry source, one source directory per attached library, and the
//! version/platform-filtered references and resources.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use bw_catalog::{OutputKind, Platform, SourceLanguage, TargetVersion, TaskCatalog, TaskId};
use bw_frontend::ResourceFile;
use tracing::debug;

use crate::config::BuildConfig;
use crate::error::BuildError;

/// Everything one version's build needs, detached from the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilationUnit {
    /// Task id
    pub task_id: TaskId,
    /// Task name, used as the assembly name
    pub task_name: String,
    /// Target version
    pub version: TargetVersion,
    /// Source language
    pub language: SourceLanguage,
    /// Entry source text
    pub entry_source: String,
    /// Auxiliary source directories
    pub source_directories: Vec<PathBuf>,
    /// Reference assemblies matching `version`
    pub references: Vec<PathBuf>,
    /// Resources admitted for `platform`
    pub resources: Vec<ResourceFile>,
    /// Prune and optimize
    pub optimize: bool,
    /// Allow unsafe code
    pub allow_unsafe: bool,
    /// Apply the obfuscation stage
    pub obfuscate: bool,
    /// Requested platform
    pub platform: Platform,
    /// Output kind
    pub output_kind: OutputKind,
    /// Import prefixes never pruned
    pub reserved_namespaces: Vec<String>,
}

impl CompilationUnit {
    /// Every source file under the auxiliary directories, sorted
    ///
    /// # Errors
    /// Fails when a directory is missing or cannot be enumerated.
    pub fn source_files(&self) -> Result<Vec<PathBuf>, BuildError> {
        discover_sources(&self.source_directories, self.language.extensions())
    }
}

/// Assemble `task_id` for `version`.
///
/// # Errors
/// [`BuildError::UnsupportedVersion`] if the task does not list `version`;
/// a catalog error for a stale id.
pub fn assemble(
    catalog: &TaskCatalog,
    config: &BuildConfig,
    task_id: TaskId,
    version: TargetVersion,
) -> Result<CompilationUnit, BuildError> {
    let task = catalog.require_task(task_id)?;
    if !task.supports(version) {
        return Err(BuildError::UnsupportedVersion { task: task.name.clone(), version });
    }

    let layout = &config.layout;
    let libraries = catalog.task_libraries(task_id);

    let source_directories = libraries
        .iter()
        .flat_map(|library| library.locations.iter())
        .map(|location| layout.reference_source_libraries().join(location))
        .collect::<Vec<_>>();

    let mut seen = BTreeSet::new();
    let references = catalog
        .task_references(task_id)
        .into_iter()
        .chain(libraries.iter().flat_map(|library| catalog.library_references(library.id)))
        .filter(|reference| reference.version == version)
        .map(|reference| layout.assembly_references().join(&reference.location))
        .filter(|path| seen.insert(path.clone()))
        .collect::<Vec<_>>();

    let mut seen = BTreeSet::new();
    let resources = catalog
        .task_resources(task_id)
        .into_iter()
        .chain(libraries.iter().flat_map(|library| catalog.library_resources(library.id)))
        .filter(|resource| resource.platform.admits(config.platform))
        .filter(|resource| seen.insert(resource.id))
        .map(|resource| ResourceFile {
            name: resource.name.clone(),
            path: layout.embedded_resources().join(&resource.location),
        })
        .collect::<Vec<_>>();

    let optimize = !libraries
        .iter()
        .any(|library| config.unoptimized_libraries.iter().any(|name| *name == library.name));

    debug!(
        task = %task.name,
        %version,
        directories = source_directories.len(),
        references = references.len(),
        resources = resources.len(),
        optimize,
        "Assembled compilation unit"
    );

    Ok(CompilationUnit {
        task_id,
        task_name: task.name.clone(),
        version,
        language: task.language,
        entry_source: task.code.clone(),
        source_directories,
        references,
        resources,
        optimize,
        allow_unsafe: task.unsafe_compile,
        obfuscate: task.obfuscate,
        platform: config.platform,
        output_kind: config.output_kind,
        reserved_namespaces: config.reserved_namespaces.clone(),
    })
}

/// Files with one of `extensions` anywhere under `directories`, sorted and
/// de-duplicated.
///
/// # Errors
/// [`BuildError::MissingSourceDirectory`] for a directory that does not exist.
pub fn discover_sources(directories: &[PathBuf], extensions: &[&str]) -> Result<Vec<PathBuf>, BuildError> {
    let mut files = BTreeSet::new();
    for directory in directories {
        if !directory.is_dir() {
            return Err(BuildError::MissingSourceDirectory(directory.clone()));
        }
        for extension in extensions {
            files.extend(glob_files(directory, extension)?);
        }
    }
    Ok(files.into_iter().collect())
}

fn glob_files(directory: &Path, extension: &str) -> Result<Vec<PathBuf>, BuildError> {
    // Library locations usually end in a separator
    let directory: PathBuf = directory.components().collect();
    let directory = directory.as_path();
    let pattern = format!(
        "{}/**/*.{extension}",
        glob::Pattern::escape(&directory.to_string_lossy())
    );
    let paths = glob::glob(&pattern).map_err(|e| {
        BuildError::io_error(directory, std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))
    })?;
    paths
        .map(|entry| entry.map_err(|e| BuildError::io_error(e.path().to_path_buf(), e.into_error())))
        .filter(|entry| entry.as_ref().map_or(true, |path| path.is_file()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r"
- Name: Mimikatz
  CompatibleDotNetVersions: [Net35, Net40]
  Code: 'class Program {}'
  UnsafeCompile: true
  ReferenceSourceLibraries:
    - Name: SharpSploit
      Location: SharpSploit/SharpSploit/
      ReferenceAssemblies:
        - Name: System.dll
          Location: net35/System.dll
          DotNetVersion: Net35
        - Name: System.dll
          Location: net40/System.dll
          DotNetVersion: Net40
      EmbeddedResources:
        - Name: powerkatz_x86.dll
          Location: powerkatz_x86.dll
          Platform: x86
        - Name: powerkatz_x64.dll
          Location: powerkatz_x64.dll
          Platform: x64
  ReferenceAssemblies:
    - Name: mscorlib.dll
      Location: net40/mscorlib.dll
      DotNetVersion: Net40
  EmbeddedResources:
    - Name: readme.txt
      Location: readme.txt
";

    fn catalog() -> (TaskCatalog, TaskId) {
        let mut catalog = TaskCatalog::new();
        let ids = catalog.ingest_yaml(PAYLOAD).unwrap();
        (catalog, ids[0])
    }

    #[test]
    fn filters_by_version_and_platform() {
        let (catalog, id) = catalog();
        let config = BuildConfig::new().with_data_dir("/data");
        let unit = assemble(&catalog, &config, id, TargetVersion::Net40).unwrap();

        assert_eq!(
            unit.references,
            vec![
                PathBuf::from("/data/AssemblyReferences/net40/mscorlib.dll"),
                PathBuf::from("/data/AssemblyReferences/net40/System.dll"),
            ]
        );
        let resources: Vec<_> = unit.resources.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(resources, vec!["readme.txt", "powerkatz_x64.dll"]);
        assert_eq!(
            unit.source_directories,
            vec![PathBuf::from("/data/ReferenceSourceLibraries/SharpSploit/SharpSploit/")]
        );
        assert!(unit.optimize);
        assert!(unit.allow_unsafe);
    }

    #[test]
    fn any_cpu_build_admits_every_resource() {
        let (catalog, id) = catalog();
        let config = BuildConfig::new().with_platform(Platform::AnyCpu);
        let unit = assemble(&catalog, &config, id, TargetVersion::Net35).unwrap();
        assert_eq!(unit.resources.len(), 3);
        assert_eq!(unit.references.len(), 1);
    }

    #[test]
    fn unsupported_version() {
        let (catalog, id) = catalog();
        let result = assemble(&catalog, &BuildConfig::new(), id, TargetVersion::Net45);
        assert!(matches!(result, Err(BuildError::UnsupportedVersion { version: TargetVersion::Net45, .. })));
    }

    #[test]
    fn listed_library_disables_optimization() {
        let (catalog, id) = catalog();
        let config = BuildConfig::new().with_unoptimized_libraries(vec!["SharpSploit".into()]);
        assert!(!assemble(&catalog, &config, id, TargetVersion::Net35).unwrap().optimize);
    }

    #[test]
    fn missing_directory_is_reported() {
        let result = discover_sources(&[PathBuf::from("/definitely/not/here")], &["cs"]);
        assert!(matches!(result, Err(BuildError::MissingSourceDirectory(_))));
    }
}
