//! Build configuration
//!
//! [`DataLayout`] derives every on-disk location from one data root;
//! [`BuildConfig`] carries the knobs the assembler, emitter and obfuscation
//! stage read.

use std::path::{Path, PathBuf};

use bw_catalog::{OutputKind, Platform, TargetVersion};
use serde::{Deserialize, Serialize};

/// Directory layout under the data root
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataLayout {
    /// Data root
    pub root: PathBuf,
}

impl Default for DataLayout {
    fn default() -> Self {
        Self { root: PathBuf::from("Data") }
    }
}

impl DataLayout {
    /// Layout rooted at `root`
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Data root
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `AssemblyReferences/`
    #[inline]
    #[must_use]
    pub fn assembly_references(&self) -> PathBuf {
        self.root.join("AssemblyReferences")
    }

    /// Reference directory for one framework version
    #[inline]
    #[must_use]
    pub fn reference_directory(&self, version: TargetVersion) -> PathBuf {
        self.assembly_references().join(version.dir_name())
    }

    /// `EmbeddedResources/`
    #[inline]
    #[must_use]
    pub fn embedded_resources(&self) -> PathBuf {
        self.root.join("EmbeddedResources")
    }

    /// `ReferenceSourceLibraries/`
    #[inline]
    #[must_use]
    pub fn reference_source_libraries(&self) -> PathBuf {
        self.root.join("ReferenceSourceLibraries")
    }

    /// `Temp/`
    #[inline]
    #[must_use]
    pub fn temp(&self) -> PathBuf {
        self.root.join("Temp")
    }

    /// `Tasks/CSharp/Compiled/<version>/`
    #[inline]
    #[must_use]
    pub fn compiled_directory(&self, version: TargetVersion) -> PathBuf {
        self.root.join("Tasks").join("CSharp").join("Compiled").join(version.dir_name())
    }
}

/// External tool invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCommand {
    /// Program
    pub program: String,
    /// Extra arguments
    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolCommand {
    /// Command without extra arguments
    #[inline]
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), args: Vec::new() }
    }
}

/// Build pipeline configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Data directory layout
    pub layout: DataLayout,
    /// Platform artifacts target
    pub platform: Platform,
    /// Executable or library
    pub output_kind: OutputKind,
    /// C# compiler
    pub compiler: ToolCommand,
    /// Obfuscation engine
    pub obfuscator: ToolCommand,
    /// Namespace prefixes whose imports are never pruned
    pub reserved_namespaces: Vec<String>,
    /// Attaching any of these libraries disables pruning and optimization
    pub unoptimized_libraries: Vec<String>,
    /// Type holding the entry point
    pub entry_type: Option<String>,
    /// Write artifacts under the compiled directory
    pub write_artifacts: bool,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            layout: DataLayout::default(),
            platform: Platform::X64,
            output_kind: OutputKind::Console,
            compiler: ToolCommand::new("mcs"),
            obfuscator: ToolCommand::new("Confuser.CLI"),
            reserved_namespaces: vec!["System".to_string()],
            unoptimized_libraries: vec!["Seatbelt".to_string()],
            entry_type: Some("Program".to_string()),
            write_artifacts: true,
        }
    }
}

impl BuildConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With data root
    #[inline]
    #[must_use]
    pub fn with_data_dir(mut self, root: impl Into<PathBuf>) -> Self {
        self.layout = DataLayout::new(root);
        self
    }

    /// With target platform
    #[inline]
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// With output kind
    #[inline]
    #[must_use]
    pub fn with_output_kind(mut self, output_kind: OutputKind) -> Self {
        self.output_kind = output_kind;
        self
    }

    /// With compiler command
    #[inline]
    #[must_use]
    pub fn with_compiler(mut self, compiler: ToolCommand) -> Self {
        self.compiler = compiler;
        self
    }

    /// With obfuscation engine command
    #[inline]
    #[must_use]
    pub fn with_obfuscator(mut self, obfuscator: ToolCommand) -> Self {
        self.obfuscator = obfuscator;
        self
    }

    /// With reserved namespace prefixes
    #[inline]
    #[must_use]
    pub fn with_reserved_namespaces(mut self, namespaces: Vec<String>) -> Self {
        self.reserved_namespaces = namespaces;
        self
    }

    /// With libraries that disable pruning
    #[inline]
    #[must_use]
    pub fn with_unoptimized_libraries(mut self, libraries: Vec<String>) -> Self {
        self.unoptimized_libraries = libraries;
        self
    }

    /// With entry type
    #[inline]
    #[must_use]
    pub fn with_entry_type(mut self, entry_type: Option<String>) -> Self {
        self.entry_type = entry_type;
        self
    }

    /// With artifact writing on or off
    #[inline]
    #[must_use]
    pub fn with_write_artifacts(mut self, write: bool) -> Self {
        self.write_artifacts = write;
        self
    }

    /// Reference directories registered as obfuscation probe paths
    #[must_use]
    pub fn probe_paths(&self) -> Vec<PathBuf> {
        TargetVersion::FRAMEWORK
            .into_iter()
            .map(|version| self.layout.reference_directory(version))
            .collect()
    }
}

/// Whether `namespace` falls under one of the reserved prefixes
#[must_use]
pub fn is_reserved_namespace(namespace: &str, reserved: &[String]) -> bool {
    reserved.iter().any(|prefix| {
        namespace == prefix
            || namespace
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.starts_with('.'))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let layout = DataLayout::new("/srv/data");
        assert_eq!(layout.reference_directory(TargetVersion::Net40), PathBuf::from("/srv/data/AssemblyReferences/net40"));
        assert_eq!(
            layout.compiled_directory(TargetVersion::NetCore31),
            PathBuf::from("/srv/data/Tasks/CSharp/Compiled/netcoreapp3.0")
        );
    }

    #[test]
    fn reserved_prefixes() {
        let reserved = vec!["System".to_string()];
        assert!(is_reserved_namespace("System", &reserved));
        assert!(is_reserved_namespace("System.IO", &reserved));
        assert!(!is_reserved_namespace("SystemX", &reserved));
        assert!(!is_reserved_namespace("SharpSploit.Execution", &reserved));
    }

    #[test]
    fn probe_paths_cover_frameworks() {
        let config = BuildConfig::new().with_data_dir("/d");
        assert_eq!(config.probe_paths().len(), 3);
    }
}
