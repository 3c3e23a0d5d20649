//! Catalog data model
//!
//! Records owned by the [`TaskCatalog`](crate::TaskCatalog):
//! - Task templates (entry source plus metadata)
//! - Reference assemblies scoped to one target version
//! - Embedded resources with an optional platform restriction
//! - Source libraries with their own attached references/resources

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CatalogError;

macro_rules! catalog_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

catalog_id!(
    /// Task template identifier, sequential per catalog
    TaskId,
    "task"
);
catalog_id!(
    /// Reference assembly identifier
    ReferenceId,
    "ref"
);
catalog_id!(
    /// Embedded resource identifier
    ResourceId,
    "res"
);
catalog_id!(
    /// Source library identifier
    LibraryId,
    "lib"
);

/// Target runtime profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TargetVersion {
    /// .NET Framework 3.5
    Net35,
    /// .NET Framework 4.0
    Net40,
    /// .NET Framework 4.5
    Net45,
    /// .NET Core 3.1
    NetCore31,
}

impl TargetVersion {
    /// Every known version, oldest first
    pub const ALL: [TargetVersion; 4] = [Self::Net35, Self::Net40, Self::Net45, Self::NetCore31];

    /// Framework versions that have a reference-assembly directory
    pub const FRAMEWORK: [TargetVersion; 3] = [Self::Net35, Self::Net40, Self::Net45];

    /// Directory name used for compiled output and reference lookup
    #[inline]
    #[must_use]
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Net35 => "net35",
            Self::Net40 => "net40",
            Self::Net45 => "net45",
            Self::NetCore31 => "netcoreapp3.0",
        }
    }

    /// Interchange name (`Net35`, ...)
    #[inline]
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Net35 => "Net35",
            Self::Net40 => "Net40",
            Self::Net45 => "Net45",
            Self::NetCore31 => "NetCore31",
        }
    }
}

impl fmt::Display for TargetVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TargetVersion {
    type Err = CatalogError;

    /// Accepts interchange names and directory names, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|v| v.name().eq_ignore_ascii_case(wanted) || v.dir_name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CatalogError::UnknownVersion(wanted.to_string()))
    }
}

/// Processor architecture an artifact or resource targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Platform {
    /// No restriction
    #[default]
    AnyCpu,
    /// 32-bit
    #[serde(alias = "x86")]
    X86,
    /// 64-bit
    #[serde(alias = "x64")]
    X64,
}

impl Platform {
    /// Whether something restricted to `self` can go into a `requested` build
    #[inline]
    #[must_use]
    pub fn admits(self, requested: Platform) -> bool {
        self == Platform::AnyCpu || requested == Platform::AnyCpu || self == requested
    }

    /// Compiler flag spelling
    #[inline]
    #[must_use]
    pub fn flag(self) -> &'static str {
        match self {
            Self::AnyCpu => "anycpu",
            Self::X86 => "x86",
            Self::X64 => "x64",
        }
    }
}

/// Kind of binary the compiler emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OutputKind {
    /// Executable with an entry point
    #[default]
    Console,
    /// Class library
    Library,
}

/// Source language of a task or library
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SourceLanguage {
    /// C#
    #[default]
    CSharp,
}

impl SourceLanguage {
    /// File extensions for source discovery
    #[inline]
    #[must_use]
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            Self::CSharp => &["cs"],
        }
    }
}

impl fmt::Display for SourceLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CSharp => f.write_str("CSharp"),
        }
    }
}

/// Task author
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Author {
    /// Display name
    pub name: String,
    /// Handle
    pub handle: String,
    /// Link
    pub link: String,
}

/// Task parameter exposed to operators
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TaskOption {
    /// Option name
    pub name: String,
    /// Current value
    pub value: String,
    /// Default value
    pub default_value: String,
    /// Description
    pub description: String,
    /// Suggested values
    pub suggested_values: Vec<String>,
    /// May be left empty
    pub optional: bool,
    /// Shown in the rendered command
    pub display_in_command: bool,
    /// Value is a file
    pub file_option: bool,
}

/// A named build unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTemplate {
    /// Catalog id
    pub id: TaskId,
    /// Unique name within one catalog snapshot
    pub name: String,
    /// Alternate names, in order
    pub aliases: Vec<String>,
    /// Author
    pub author: Author,
    /// Description
    pub description: String,
    /// Help text
    pub help: String,
    /// Source language
    pub language: SourceLanguage,
    /// Compatible versions, never empty
    pub compatible_versions: Vec<TargetVersion>,
    /// Entry source text
    pub code: String,
    /// Tasking type tag
    pub tasking_type: String,
    /// Allow unsafe constructs
    pub unsafe_compile: bool,
    /// Token task flag
    pub token_task: bool,
    /// Options
    pub options: Vec<TaskOption>,
    /// Apply the obfuscation stage
    pub obfuscate: bool,
    /// Set after a successful build
    pub compiled: bool,
}

impl TaskTemplate {
    /// First compatible version
    #[inline]
    #[must_use]
    pub fn primary_version(&self) -> Option<TargetVersion> {
        self.compatible_versions.first().copied()
    }

    /// Whether `version` is listed as compatible
    #[inline]
    #[must_use]
    pub fn supports(&self, version: TargetVersion) -> bool {
        self.compatible_versions.contains(&version)
    }

    /// Whether `name` equals the task name or an alias, ignoring case
    #[must_use]
    pub fn answers_to(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name) || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

/// Compiled binary dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceAssembly {
    /// Catalog id
    pub id: ReferenceId,
    /// File name
    pub name: String,
    /// Location relative to the assembly reference directory
    pub location: String,
    /// The single version it is compatible with
    pub version: TargetVersion,
}

/// Non-code file bundled into the binary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedResource {
    /// Catalog id
    pub id: ResourceId,
    /// Manifest name
    pub name: String,
    /// Location relative to the embedded resource directory
    pub location: String,
    /// Platform restriction
    pub platform: Platform,
}

/// Bundle of auxiliary source files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLibrary {
    /// Catalog id
    pub id: LibraryId,
    /// Name
    pub name: String,
    /// Description
    pub description: String,
    /// Source directories relative to the library root, at least one
    pub locations: Vec<String>,
    /// Source language
    pub language: SourceLanguage,
    /// Compatible versions
    pub compatible_versions: Vec<TargetVersion>,
}

/// Replace backslashes with forward slashes
#[inline]
#[must_use]
pub fn normalize_location(location: &str) -> String {
    location.replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_parses_both_spellings() {
        assert_eq!("Net40".parse::<TargetVersion>().unwrap(), TargetVersion::Net40);
        assert_eq!("net45".parse::<TargetVersion>().unwrap(), TargetVersion::Net45);
        assert_eq!("netcoreapp3.0".parse::<TargetVersion>().unwrap(), TargetVersion::NetCore31);
        assert!("net48".parse::<TargetVersion>().is_err());
    }

    #[test]
    fn platform_admission() {
        assert!(Platform::AnyCpu.admits(Platform::X64));
        assert!(Platform::X86.admits(Platform::AnyCpu));
        assert!(Platform::X64.admits(Platform::X64));
        assert!(!Platform::X86.admits(Platform::X64));
    }

    #[test]
    fn location_normalization() {
        assert_eq!(normalize_location(r"net40\System.dll"), "net40/System.dll");
        assert_eq!(normalize_location("a/b"), "a/b");
    }
}
