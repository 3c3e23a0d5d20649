//! Binary emission
//!
//! [`Emitter`] turns source texts plus references into an image. The
//! production [`ExternalCompiler`] shells out to an `mcs`/`csc` style compiler.

use std::fmt;
use std::path::PathBuf;
use std::process::Command;

use bw_catalog::{OutputKind, Platform};
use tracing::debug;

use crate::error::FrontendError;

/// A file bundled into the image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFile {
    /// Manifest name
    pub name: String,
    /// Path on disk
    pub path: PathBuf,
}

/// How to emit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmitOptions {
    /// Assembly name (output file stem)
    pub assembly_name: String,
    /// Executable or library
    pub output_kind: OutputKind,
    /// Target platform
    pub platform: Platform,
    /// Allow unsafe code
    pub allow_unsafe: bool,
    /// Enable compiler optimizations
    pub optimize: bool,
    /// Type holding the entry point
    pub entry_type: Option<String>,
    /// Embedded resources
    pub resources: Vec<ResourceFile>,
}

impl Default for EmitOptions {
    fn default() -> Self {
        Self {
            assembly_name: "assembly".to_string(),
            output_kind: OutputKind::Console,
            platform: Platform::X64,
            allow_unsafe: false,
            optimize: true,
            entry_type: None,
            resources: Vec::new(),
        }
    }
}

impl EmitOptions {
    /// Output file name
    #[must_use]
    pub fn output_file_name(&self) -> String {
        match self.output_kind {
            OutputKind::Console => format!("{}.exe", self.assembly_name),
            OutputKind::Library => format!("{}.dll", self.assembly_name),
        }
    }
}

/// One source text handed to the emitter
#[derive(Debug, Clone)]
pub struct EmitSource<'a> {
    /// File name to write it under
    pub file_name: String,
    /// Text
    pub text: &'a str,
}

/// Everything the emitter needs
#[derive(Debug, Clone)]
pub struct EmitInput<'a> {
    /// Sources, entry first
    pub sources: Vec<EmitSource<'a>>,
    /// Reference assembly paths
    pub references: &'a [PathBuf],
    /// Options
    pub options: &'a EmitOptions,
}

/// Produces a binary image or diagnostics
pub trait Emitter: Send + Sync + fmt::Debug {
    /// Emit an image
    ///
    /// # Errors
    /// [`FrontendError::Diagnostics`] when the compiler rejects the input;
    /// other variants for environmental failures.
    fn emit(&self, input: &EmitInput<'_>) -> Result<Vec<u8>, FrontendError>;
}

/// Runs an external C# compiler in a scratch directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCompiler {
    program: String,
    extra_args: Vec<String>,
}

impl Default for ExternalCompiler {
    fn default() -> Self {
        Self::new("mcs")
    }
}

impl ExternalCompiler {
    /// Compiler invoked as `program`
    #[inline]
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), extra_args: Vec::new() }
    }

    /// With additional arguments placed before the sources
    #[inline]
    #[must_use]
    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Program name
    #[inline]
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    fn arguments(&self, input: &EmitInput<'_>, output: &str, sources: &[PathBuf]) -> Vec<String> {
        let options = input.options;
        let mut args = vec![
            "-nologo".to_string(),
            "-nostdlib".to_string(),
            match options.output_kind {
                OutputKind::Console => "-target:exe".to_string(),
                OutputKind::Library => "-target:library".to_string(),
            },
            format!("-out:{output}"),
            format!("-platform:{}", options.platform.flag()),
        ];
        if options.allow_unsafe {
            args.push("-unsafe".to_string());
        }
        if options.optimize {
            args.push("-optimize+".to_string());
        }
        if let (OutputKind::Console, Some(entry)) = (options.output_kind, &options.entry_type) {
            args.push(format!("-main:{entry}"));
        }
        for reference in input.references {
            args.push(format!("-r:{}", reference.display()));
        }
        for resource in &options.resources {
            args.push(format!("-resource:{},{}", resource.path.display(), resource.name));
        }
        args.extend(self.extra_args.iter().cloned());
        args.extend(sources.iter().map(|s| s.display().to_string()));
        args
    }
}

impl Emitter for ExternalCompiler {
    fn emit(&self, input: &EmitInput<'_>) -> Result<Vec<u8>, FrontendError> {
        let scratch = tempfile::tempdir().map_err(|e| FrontendError::io_error(std::env::temp_dir(), e))?;

        let mut source_paths = Vec::with_capacity(input.sources.len());
        for (index, source) in input.sources.iter().enumerate() {
            let path = scratch.path().join(format!("{index:04}_{}", source.file_name));
            std::fs::write(&path, source.text).map_err(|e| FrontendError::io_error(&path, e))?;
            source_paths.push(path);
        }

        let output = scratch.path().join(input.options.output_file_name());
        let args = self.arguments(input, &output.display().to_string(), &source_paths);
        debug!(program = %self.program, sources = source_paths.len(), "Invoking compiler");

        let result = Command::new(&self.program)
            .args(&args)
            .current_dir(scratch.path())
            .output()
            .map_err(|source| FrontendError::CompilerLaunch { program: self.program.clone(), source })?;

        if !result.status.success() || !output.exists() {
            let mut diagnostics = String::from_utf8_lossy(&result.stdout).into_owned();
            diagnostics.push_str(&String::from_utf8_lossy(&result.stderr));
            return Err(FrontendError::Diagnostics(diagnostics.trim().to_string()));
        }

        std::fs::read(&output).map_err(|e| FrontendError::io_error(&output, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_layout() {
        let options = EmitOptions {
            assembly_name: "Shell".into(),
            allow_unsafe: true,
            entry_type: Some("Program".into()),
            resources: vec![ResourceFile { name: "r.bin".into(), path: PathBuf::from("/data/r.bin") }],
            ..EmitOptions::default()
        };
        let references = vec![PathBuf::from("/refs/System.dll")];
        let input = EmitInput { sources: Vec::new(), references: &references, options: &options };

        let args = ExternalCompiler::default().arguments(&input, "Shell.exe", &[PathBuf::from("a.cs")]);
        assert!(args.contains(&"-target:exe".to_string()));
        assert!(args.contains(&"-platform:x64".to_string()));
        assert!(args.contains(&"-unsafe".to_string()));
        assert!(args.contains(&"-main:Program".to_string()));
        assert!(args.contains(&"-r:/refs/System.dll".to_string()));
        assert!(args.contains(&"-resource:/data/r.bin,r.bin".to_string()));
        assert_eq!(args.last().map(String::as_str), Some("a.cs"));
    }

    #[test]
    fn missing_compiler_is_launch_error() {
        let options = EmitOptions::default();
        let input = EmitInput {
            sources: vec![EmitSource { file_name: "entry.cs".into(), text: "class Program {}" }],
            references: &[],
            options: &options,
        };
        let result = ExternalCompiler::new("bw-definitely-not-a-compiler").emit(&input);
        assert!(matches!(result, Err(FrontendError::CompilerLaunch { .. })));
    }
}
