//! Testing utilities for the Buildwright workspace
//!
//! Deterministic stand-ins for the external compiler and obfuscation engine,
//! sample payloads, and on-disk data directories.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bw_build::{BuildConfig, BuildContext, ObfuscationError, ObfuscationOutcome, Obfuscator};
use bw_catalog::Platform;
use bw_frontend::{EmitInput, Emitter, FrontendError, FrontendRegistry};
use parking_lot::Mutex;
use tempfile::TempDir;

/// Marker every fake image starts with
pub const IMAGE_MAGIC: &[u8] = b"MZ";

/// What one emit call received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitCall {
    pub assembly_name: String,
    pub file_names: Vec<String>,
    pub sources: Vec<String>,
    pub references: Vec<PathBuf>,
    pub resources: Vec<String>,
    pub platform: Platform,
    pub optimize: bool,
}

/// Emits `MZ` followed by the concatenated sources and records every call
#[derive(Debug, Default)]
pub struct RecordingEmitter {
    calls: Mutex<Vec<EmitCall>>,
}

impl RecordingEmitter {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<EmitCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl Emitter for RecordingEmitter {
    fn emit(&self, input: &EmitInput<'_>) -> Result<Vec<u8>, FrontendError> {
        self.calls.lock().push(EmitCall {
            assembly_name: input.options.assembly_name.clone(),
            file_names: input.sources.iter().map(|s| s.file_name.clone()).collect(),
            sources: input.sources.iter().map(|s| s.text.to_string()).collect(),
            references: input.references.to_vec(),
            resources: input.options.resources.iter().map(|r| r.name.clone()).collect(),
            platform: input.options.platform,
            optimize: input.options.optimize,
        });
        Ok(fake_image(input))
    }
}

/// Rejects every compilation with fixed diagnostics
#[derive(Debug, Clone)]
pub struct FailingEmitter {
    pub diagnostics: String,
}

impl Default for FailingEmitter {
    fn default() -> Self {
        Self { diagnostics: "Task.cs(1,1): error CS1002: ; expected".to_string() }
    }
}

impl Emitter for FailingEmitter {
    fn emit(&self, _input: &EmitInput<'_>) -> Result<Vec<u8>, FrontendError> {
        Err(FrontendError::Diagnostics(self.diagnostics.clone()))
    }
}

/// Fails only compilations referencing a path containing `needle`
#[derive(Debug, Clone)]
pub struct ReferenceFailingEmitter {
    pub needle: String,
}

impl ReferenceFailingEmitter {
    pub fn new(needle: impl Into<String>) -> Arc<Self> {
        Arc::new(Self { needle: needle.into() })
    }
}

impl Emitter for ReferenceFailingEmitter {
    fn emit(&self, input: &EmitInput<'_>) -> Result<Vec<u8>, FrontendError> {
        if input.references.iter().any(|r| r.to_string_lossy().contains(&self.needle)) {
            return Err(FrontendError::Diagnostics(format!(
                "error CS0006: metadata file '{}' could not be found",
                self.needle
            )));
        }
        Ok(fake_image(input))
    }
}

fn fake_image(input: &EmitInput<'_>) -> Vec<u8> {
    let mut image = IMAGE_MAGIC.to_vec();
    for source in &input.sources {
        image.extend_from_slice(source.text.as_bytes());
    }
    image
}

/// Prefixes the image with `OBF` and reverses the rest
#[derive(Debug, Default, Clone, Copy)]
pub struct ApplyingObfuscator;

impl Obfuscator for ApplyingObfuscator {
    fn obfuscate(&self, bytes: &[u8]) -> Result<ObfuscationOutcome, ObfuscationError> {
        let mut protected = b"OBF".to_vec();
        protected.extend(bytes.iter().rev());
        Ok(ObfuscationOutcome::Applied(protected))
    }
}

/// Behaves like an engine that ran but wrote no output
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOutputObfuscator;

impl Obfuscator for NoOutputObfuscator {
    fn obfuscate(&self, bytes: &[u8]) -> Result<ObfuscationOutcome, ObfuscationError> {
        Ok(ObfuscationOutcome::Degraded {
            original: bytes.to_vec(),
            reason: "engine output not found".to_string(),
        })
    }
}

pub const SHELL_CODE: &str = r#"using System;

class Program
{
    static void Main(string[] args)
    {
        Console.WriteLine(string.Join(" ", args));
    }
}
"#;

/// Single-task payload named `Shell` compatible with `versions`
pub fn shell_payload(versions: &[&str]) -> String {
    task_payload("Shell", versions, SHELL_CODE)
}

/// Single-task payload with the given name, versions and code
pub fn task_payload(name: &str, versions: &[&str], code: &str) -> String {
    let mut yaml = format!("- Name: {name}\n  CompatibleDotNetVersions: [{}]\n  Code: |\n", versions.join(", "));
    for line in code.lines() {
        yaml.push_str("    ");
        yaml.push_str(line);
        yaml.push('\n');
    }
    yaml
}

/// Task using one source library with a per-version reference assembly each
pub fn library_payload(task: &str, library: &str, versions: &[&str], code: &str) -> String {
    let mut yaml = task_payload(task, versions, code);
    yaml.push_str(&format!("  ReferenceSourceLibraries:\n    - Name: {library}\n      Location: {library}/\n      ReferenceAssemblies:\n"));
    for version in versions {
        let dir = version.to_ascii_lowercase();
        yaml.push_str(&format!(
            "        - Name: {library}Dep.dll\n          Location: {dir}/{library}Dep.dll\n          DotNetVersion: {version}\n"
        ));
    }
    yaml
}

/// Base64 `<task>,<confuse>,<yaml>` request body
pub fn wire_request(task: &str, confuse: bool, yaml: &str) -> String {
    format!(
        "{},{},{}",
        STANDARD.encode(task),
        STANDARD.encode(if confuse { "true" } else { "false" }),
        STANDARD.encode(yaml)
    )
}

/// Temporary data directory with helpers for laying out source libraries
#[derive(Debug)]
pub struct DataDir {
    dir: TempDir,
}

impl DataDir {
    pub fn new() -> Self {
        Self { dir: tempfile::tempdir().unwrap() }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `text` to `ReferenceSourceLibraries/<library>/<relative>`
    pub fn add_source(&self, library: &str, relative: &str, text: &str) -> PathBuf {
        let path = self.root().join("ReferenceSourceLibraries").join(library).join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, text).unwrap();
        path
    }

    pub fn config(&self) -> BuildConfig {
        BuildConfig::new().with_data_dir(self.root())
    }
}

impl Default for DataDir {
    fn default() -> Self {
        Self::new()
    }
}

/// Context over `config` with fake collaborators
pub fn test_context(config: BuildConfig, emitter: Arc<dyn Emitter>, obfuscator: Arc<dyn Obfuscator>) -> BuildContext {
    BuildContext::new(config)
        .with_frontends(FrontendRegistry::with_defaults(emitter))
        .with_obfuscator(obfuscator)
}

/// Context that records emits and never writes artifacts
pub fn recording_context() -> (BuildContext, Arc<RecordingEmitter>) {
    let emitter = RecordingEmitter::new();
    let context = test_context(
        BuildConfig::new().with_write_artifacts(false),
        emitter.clone(),
        Arc::new(ApplyingObfuscator),
    );
    (context, emitter)
}
