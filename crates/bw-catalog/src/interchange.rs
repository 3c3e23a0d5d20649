//! YAML interchange records
//!
//! The wire payload of a build request and the export format share these
//! records. Keys are PascalCase; a library `Location` may be a string or a list.

#![allow(missing_docs)]

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;
use crate::model::{Author, Platform, SourceLanguage, TargetVersion, TaskOption};

/// One task definition
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct TaskRecord {
    pub name: String,
    pub aliases: Vec<String>,
    pub author: Author,
    pub description: String,
    pub help: String,
    pub language: SourceLanguage,
    pub compatible_dot_net_versions: Vec<TargetVersion>,
    pub code: String,
    pub tasking_type: String,
    pub unsafe_compile: bool,
    pub token_task: bool,
    pub options: Vec<TaskOption>,
    pub reference_source_libraries: Vec<LibraryRecord>,
    pub reference_assemblies: Vec<ReferenceRecord>,
    pub embedded_resources: Vec<ResourceRecord>,
}

/// Source library attached to a task
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct LibraryRecord {
    pub name: String,
    pub description: String,
    pub location: Locations,
    pub language: SourceLanguage,
    pub compatible_dot_net_versions: Vec<TargetVersion>,
    pub reference_assemblies: Vec<ReferenceRecord>,
    pub embedded_resources: Vec<ResourceRecord>,
}

/// Reference assembly entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReferenceRecord {
    pub name: String,
    pub location: String,
    pub dot_net_version: TargetVersion,
}

/// Embedded resource entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceRecord {
    pub name: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<Platform>,
}

/// One or more source directories
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Locations {
    /// A single directory
    One(String),
    /// Several directories
    Many(Vec<String>),
}

impl Default for Locations {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl Locations {
    /// Flatten into a list
    #[must_use]
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(location) => vec![location],
            Self::Many(locations) => locations,
        }
    }

    /// Single string when there is exactly one directory
    #[must_use]
    pub fn from_vec(mut locations: Vec<String>) -> Self {
        if locations.len() == 1 {
            Self::One(locations.remove(0))
        } else {
            Self::Many(locations)
        }
    }
}

/// Parse a payload holding a list of tasks or a single task mapping.
///
/// # Errors
/// Returns [`CatalogError::Yaml`] when the text is not a valid payload.
pub fn parse_payload(yaml: &str) -> Result<Vec<TaskRecord>, CatalogError> {
    let value: serde_yaml::Value = serde_yaml::from_str(yaml)?;
    let records = match value {
        serde_yaml::Value::Sequence(_) => serde_yaml::from_value(value)?,
        serde_yaml::Value::Null => Vec::new(),
        other => vec![serde_yaml::from_value(other)?],
    };
    Ok(records)
}

/// Render task records as a YAML list.
///
/// # Errors
/// Returns [`CatalogError::Yaml`] if serialization fails.
pub fn render_payload(records: &[TaskRecord]) -> Result<String, CatalogError> {
    Ok(serde_yaml::to_string(records)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SHELL: &str = r"
- Name: Shell
  Aliases: [sh]
  Author:
    Name: Someone
    Handle: '@someone'
    Link: ''
  Description: Run a shell command
  Language: CSharp
  CompatibleDotNetVersions: [Net35, Net40]
  Code: 'public static class Task { }'
  TaskingType: Assembly
  UnsafeCompile: false
  TokenTask: false
  Options:
    - Name: ShellCommand
      Value: whoami
      Optional: false
  ReferenceSourceLibraries:
    - Name: SharpSploit
      Description: lib
      Location: SharpSploit\SharpSploit\
      Language: CSharp
      CompatibleDotNetVersions: [Net35, Net40]
      ReferenceAssemblies:
        - Name: System.dll
          Location: net35\System.dll
          DotNetVersion: Net35
      EmbeddedResources: []
  ReferenceAssemblies:
    - Name: mscorlib.dll
      Location: net40/mscorlib.dll
      DotNetVersion: Net40
  EmbeddedResources:
    - Name: payload.bin
      Location: payload.bin
";

    #[test]
    fn parses_list_payload() {
        let records = parse_payload(SHELL).unwrap();
        assert_eq!(records.len(), 1);
        let shell = &records[0];
        assert_eq!(shell.name, "Shell");
        assert_eq!(shell.aliases, vec!["sh".to_string()]);
        assert_eq!(shell.compatible_dot_net_versions, vec![TargetVersion::Net35, TargetVersion::Net40]);
        assert_eq!(shell.options[0].value, "whoami");
        assert_eq!(shell.reference_source_libraries[0].location, Locations::One(r"SharpSploit\SharpSploit\".into()));
        assert_eq!(shell.embedded_resources[0].platform, None);
    }

    #[test]
    fn parses_single_mapping() {
        let records = parse_payload("Name: Solo\nCompatibleDotNetVersions: [Net45]\nCode: x\n").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "Solo");
    }

    #[test]
    fn library_location_list() {
        let lib: LibraryRecord = serde_yaml::from_str("Name: L\nLocation: [a/, b/]\n").unwrap();
        assert_eq!(lib.location.into_vec(), vec!["a/".to_string(), "b/".to_string()]);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_payload("- Name: [unclosed").is_err());
    }
}
