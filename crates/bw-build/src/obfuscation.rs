//! Optional post-emit obfuscation
//!
//! The engine is external. When it runs but leaves no output, the stage hands
//! back the original bytes as [`ObfuscationOutcome::Degraded`] instead of
//! failing the build.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, warn};

use crate::config::ToolCommand;
use crate::error::ObfuscationError;

const MODULE_FILE_NAME: &str = "confused.exe";
const OUTPUT_DIR_NAME: &str = "confused_out";
const PROJECT_FILE_NAME: &str = "confused.crproj";

/// Result of one obfuscation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObfuscationOutcome {
    /// Transformed bytes
    Applied(Vec<u8>),
    /// Engine produced nothing usable; original bytes returned
    Degraded {
        /// Input bytes
        original: Vec<u8>,
        /// What went wrong
        reason: String,
    },
}

impl ObfuscationOutcome {
    /// Bytes to ship
    #[inline]
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Applied(bytes) | Self::Degraded { original: bytes, .. } => bytes,
        }
    }

    /// Whether the stage fell back to the input
    #[inline]
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

/// Binary-to-binary transform
pub trait Obfuscator: Send + Sync + fmt::Debug {
    /// Obfuscate an image
    ///
    /// # Errors
    /// Only when scratch space cannot be prepared; engine failures degrade.
    fn obfuscate(&self, bytes: &[u8]) -> Result<ObfuscationOutcome, ObfuscationError>;
}

/// Drives a ConfuserEx-style command-line engine with a minimal project
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfuserObfuscator {
    command: ToolCommand,
    probe_paths: Vec<PathBuf>,
}

impl ConfuserObfuscator {
    /// Engine run as `command`, searching `probe_paths` for references
    #[inline]
    #[must_use]
    pub fn new(command: ToolCommand, probe_paths: Vec<PathBuf>) -> Self {
        Self { command, probe_paths }
    }
}

impl Obfuscator for ConfuserObfuscator {
    fn obfuscate(&self, bytes: &[u8]) -> Result<ObfuscationOutcome, ObfuscationError> {
        let scratch = tempfile::tempdir().map_err(|e| ObfuscationError::scratch(std::env::temp_dir(), e))?;
        let base = scratch.path();
        let input = base.join(MODULE_FILE_NAME);
        let output_dir = base.join(OUTPUT_DIR_NAME);
        let project = base.join(PROJECT_FILE_NAME);

        std::fs::create_dir_all(&output_dir).map_err(|e| ObfuscationError::scratch(&output_dir, e))?;
        std::fs::write(&input, bytes).map_err(|e| ObfuscationError::scratch(&input, e))?;
        std::fs::write(&project, project_xml(base, &output_dir, &self.probe_paths))
            .map_err(|e| ObfuscationError::scratch(&project, e))?;

        debug!(program = %self.command.program, size = bytes.len(), "Running obfuscation engine");
        let status = Command::new(&self.command.program)
            .args(&self.command.args)
            .arg(&project)
            .current_dir(base)
            .output();

        if let Err(e) = status {
            let reason = format!("engine `{}` failed to launch: {e}", self.command.program);
            warn!(%reason, "Obfuscation degraded, returning original bytes");
            return Ok(ObfuscationOutcome::Degraded { original: bytes.to_vec(), reason });
        }

        let output = output_dir.join(MODULE_FILE_NAME);
        let Ok(protected) = std::fs::read(&output) else {
            let reason = format!("engine output not found at {}", output.display());
            warn!(%reason, "Obfuscation degraded, returning original bytes");
            return Ok(ObfuscationOutcome::Degraded { original: bytes.to_vec(), reason });
        };

        if protected == bytes {
            warn!("Protected bytes are identical to input; obfuscation may not have been applied");
        } else {
            debug!(size = protected.len(), "Obfuscation completed");
        }
        Ok(ObfuscationOutcome::Applied(protected))
    }
}

/// Minimal engine project: one module, `minimum` preset, no inheritance
#[must_use]
pub fn project_xml(base_dir: &Path, output_dir: &Path, probe_paths: &[PathBuf]) -> String {
    let mut xml = format!(
        "<project baseDir=\"{}\" outputDir=\"{}\" xmlns=\"http://confuser.codeplex.com\">\n",
        escape(&base_dir.to_string_lossy()),
        escape(&output_dir.to_string_lossy()),
    );
    xml.push_str("  <rule pattern=\"true\" preset=\"minimum\" inherit=\"false\" />\n");
    xml.push_str(&format!("  <module path=\"{MODULE_FILE_NAME}\" />\n"));
    for probe in probe_paths {
        xml.push_str(&format!("  <probePath>{}</probePath>\n", escape(&probe.to_string_lossy())));
    }
    xml.push_str("</project>\n");
    xml
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_lists_probe_paths() {
        let xml = project_xml(
            Path::new("/tmp/x"),
            Path::new("/tmp/x/confused_out"),
            &[PathBuf::from("/data/AssemblyReferences/net35"), PathBuf::from("/a&b")],
        );
        assert!(xml.contains("preset=\"minimum\" inherit=\"false\""));
        assert!(xml.contains("<module path=\"confused.exe\" />"));
        assert!(xml.contains("<probePath>/data/AssemblyReferences/net35</probePath>"));
        assert!(xml.contains("<probePath>/a&amp;b</probePath>"));
    }

    #[test]
    fn missing_engine_degrades() {
        let obfuscator = ConfuserObfuscator::new(ToolCommand::new("bw-no-such-engine"), Vec::new());
        let outcome = obfuscator.obfuscate(b"MZ\x90\x00").unwrap();
        assert!(outcome.is_degraded());
        assert_eq!(outcome.into_bytes(), b"MZ\x90\x00".to_vec());
    }

    #[cfg(unix)]
    #[test]
    fn engine_without_output_degrades() {
        let obfuscator = ConfuserObfuscator::new(ToolCommand::new("true"), Vec::new());
        match obfuscator.obfuscate(b"image").unwrap() {
            ObfuscationOutcome::Degraded { original, reason } => {
                assert_eq!(original, b"image".to_vec());
                assert!(reason.contains("not found"));
            }
            other => panic!("expected degraded outcome, got {other:?}"),
        }
    }
}
