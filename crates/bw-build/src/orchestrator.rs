//! Multi-target builds
//!
//! A task is assembled once per requested version on the calling task, then
//! every unit is pruned, emitted and (optionally) obfuscated on the blocking
//! pool. Versions share nothing, so one failing never stops the others; the
//! [`BuildReport`] keeps a result per version.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;

use bw_catalog::{TargetVersion, TaskId};
use bw_frontend::{EmitOptions, FrontendError, LanguageFrontend};
use futures::future::join_all;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::assembler::{assemble, CompilationUnit};
use crate::config::BuildConfig;
use crate::context::BuildContext;
use crate::error::BuildError;
use crate::obfuscation::{ObfuscationOutcome, Obfuscator};
use crate::pruner::{prune, PruneReport};

/// How the obfuscation stage went for one artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObfuscationStatus {
    /// The task did not ask for obfuscation
    NotRequested,
    /// Engine output shipped
    Applied,
    /// Engine produced nothing; unobfuscated bytes shipped
    Degraded {
        /// What went wrong
        reason: String,
    },
}

/// One version's build output
#[derive(Debug, Clone)]
pub struct Artifact {
    /// Task name at build time
    pub task_name: String,
    /// Target version
    pub version: TargetVersion,
    /// Final image
    pub bytes: Vec<u8>,
    /// Where the image was written, if it was
    pub path: Option<PathBuf>,
    /// Hex SHA-256 of `bytes`
    pub sha256: String,
    /// Obfuscation status
    pub obfuscation: ObfuscationStatus,
    /// Pruning report
    pub prune: PruneReport,
}

impl Artifact {
    /// Image size in bytes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the image is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Whether obfuscation was requested but fell back to the raw image
    #[inline]
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        matches!(self.obfuscation, ObfuscationStatus::Degraded { .. })
    }
}

/// Per-version results of one build call
#[derive(Debug)]
pub struct BuildReport {
    /// Task built
    pub task_id: TaskId,
    /// Task name at build time
    pub task_name: String,
    /// Result per version
    pub results: BTreeMap<TargetVersion, Result<Artifact, BuildError>>,
}

impl BuildReport {
    /// Versions that produced an artifact
    #[must_use]
    pub fn succeeded(&self) -> Vec<TargetVersion> {
        self.results.iter().filter(|(_, r)| r.is_ok()).map(|(v, _)| *v).collect()
    }

    /// Versions that failed, with their errors
    #[must_use]
    pub fn failed(&self) -> Vec<(TargetVersion, &BuildError)> {
        self.results
            .iter()
            .filter_map(|(v, r)| r.as_ref().err().map(|e| (*v, e)))
            .collect()
    }

    /// Artifact for `version`, if it built
    #[must_use]
    pub fn artifact(&self, version: TargetVersion) -> Option<&Artifact> {
        self.results.get(&version).and_then(|r| r.as_ref().ok())
    }

    /// Every requested version built
    #[must_use]
    pub fn is_complete_success(&self) -> bool {
        !self.results.is_empty() && self.results.values().all(Result::is_ok)
    }
}

impl BuildContext {
    /// Build every version the task lists.
    ///
    /// # Errors
    /// Only for a stale task id or a language without a front-end; per-version
    /// failures are reported inside the [`BuildReport`].
    #[tracing::instrument(skip(self))]
    pub async fn build(&mut self, task_id: TaskId) -> Result<BuildReport, BuildError> {
        let versions = self.catalog().require_task(task_id)?.compatible_versions.clone();
        self.build_versions(task_id, &versions).await
    }

    /// Build the given versions concurrently.
    ///
    /// # Errors
    /// As [`BuildContext::build`].
    #[tracing::instrument(skip(self))]
    pub async fn build_versions(
        &mut self,
        task_id: TaskId,
        versions: &[TargetVersion],
    ) -> Result<BuildReport, BuildError> {
        let task = self.catalog().require_task(task_id)?;
        let task_name = task.name.clone();
        let frontend = self.frontends().get(task.language)?;

        let mut results = BTreeMap::new();
        let mut jobs = Vec::new();
        for version in versions.iter().copied().collect::<BTreeSet<_>>() {
            match assemble(self.catalog(), self.config(), task_id, version) {
                Ok(unit) => jobs.push(run_unit(
                    unit,
                    Arc::clone(&frontend),
                    self.obfuscator(),
                    self.shared_config(),
                )),
                Err(e) => {
                    results.insert(version, Err(e));
                }
            }
        }
        results.extend(join_all(jobs).await);

        for (version, error) in results.iter().filter_map(|(v, r)| r.as_ref().err().map(|e| (v, e))) {
            warn!(task = %task_name, %version, %error, "Version build failed");
        }

        let report = BuildReport { task_id, task_name, results };
        if !report.succeeded().is_empty() {
            self.catalog_mut().mark_compiled(task_id)?;
        }
        info!(
            task = %report.task_name,
            succeeded = report.succeeded().len(),
            failed = report.failed().len(),
            "Build finished"
        );
        Ok(report)
    }

    /// Build a single version.
    ///
    /// # Errors
    /// The version's own failure, or a stale task id.
    pub async fn build_version(&mut self, task_id: TaskId, version: TargetVersion) -> Result<Artifact, BuildError> {
        let mut report = self.build_versions(task_id, &[version]).await?;
        report
            .results
            .remove(&version)
            .unwrap_or_else(|| Err(BuildError::Worker(format!("no result recorded for {version}"))))
    }
}

async fn run_unit(
    unit: CompilationUnit,
    frontend: Arc<dyn LanguageFrontend>,
    obfuscator: Arc<dyn Obfuscator>,
    config: Arc<BuildConfig>,
) -> (TargetVersion, Result<Artifact, BuildError>) {
    let version = unit.version;
    let result = tokio::task::spawn_blocking(move || build_unit(frontend.as_ref(), obfuscator.as_ref(), &config, unit))
        .await
        .unwrap_or_else(|e| Err(BuildError::Worker(e.to_string())));
    (version, result)
}

/// Prune, emit, obfuscate and write one assembled unit.
///
/// # Errors
/// [`BuildError::CompilationDiagnostics`] when the compiler rejects the
/// source; I/O and front-end errors otherwise. A degraded obfuscation run is
/// not an error.
pub fn build_unit(
    frontend: &dyn LanguageFrontend,
    obfuscator: &dyn Obfuscator,
    config: &BuildConfig,
    unit: CompilationUnit,
) -> Result<Artifact, BuildError> {
    let pruned = prune(frontend, &unit)?;

    let options = EmitOptions {
        assembly_name: unit.task_name.clone(),
        output_kind: unit.output_kind,
        platform: unit.platform,
        allow_unsafe: unit.allow_unsafe,
        optimize: unit.optimize,
        entry_type: config.entry_type.clone(),
        resources: unit.resources.clone(),
    };
    let image = frontend.emit(&pruned.compilation, &options).map_err(|e| match e {
        FrontendError::Diagnostics(diagnostics) => BuildError::CompilationDiagnostics {
            task: unit.task_name.clone(),
            version: unit.version,
            diagnostics,
        },
        other => BuildError::Frontend(other),
    })?;

    let (bytes, obfuscation) = if unit.obfuscate {
        match obfuscator.obfuscate(&image)? {
            ObfuscationOutcome::Applied(bytes) => (bytes, ObfuscationStatus::Applied),
            ObfuscationOutcome::Degraded { original, reason } => {
                warn!(task = %unit.task_name, version = %unit.version, %reason, "Shipping unobfuscated image");
                (original, ObfuscationStatus::Degraded { reason })
            }
        }
    } else {
        (image, ObfuscationStatus::NotRequested)
    };

    let path = if config.write_artifacts {
        let directory = config.layout.compiled_directory(unit.version);
        std::fs::create_dir_all(&directory).map_err(|e| BuildError::io_error(&directory, e))?;
        let path = directory.join(options.output_file_name());
        std::fs::write(&path, &bytes).map_err(|e| BuildError::io_error(&path, e))?;
        Some(path)
    } else {
        None
    };

    let sha256 = hex::encode(Sha256::digest(&bytes));
    info!(
        task = %unit.task_name,
        version = %unit.version,
        size = bytes.len(),
        %sha256,
        "Artifact built"
    );

    Ok(Artifact {
        task_name: unit.task_name,
        version: unit.version,
        bytes,
        path,
        sha256,
        obfuscation,
        prune: pruned.report,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bw_frontend::{EmitInput, Emitter, FrontendRegistry};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Default)]
    struct CountingEmitter {
        calls: AtomicUsize,
    }

    impl Emitter for CountingEmitter {
        fn emit(&self, input: &EmitInput<'_>) -> Result<Vec<u8>, FrontendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(input.sources.iter().flat_map(|s| s.text.bytes()).collect())
        }
    }

    const PAYLOAD: &str = "- Name: Hello\n  CompatibleDotNetVersions: [Net35, Net40]\n  Code: 'class Program { static void Main() {} }'\n";

    fn context(emitter: Arc<CountingEmitter>) -> (BuildContext, TaskId) {
        let config = BuildConfig::new().with_write_artifacts(false);
        let mut context = BuildContext::new(config).with_frontends(FrontendRegistry::with_defaults(emitter));
        let id = context.catalog_mut().ingest_yaml(PAYLOAD).unwrap()[0];
        (context, id)
    }

    #[tokio::test]
    async fn builds_each_listed_version() {
        let emitter = Arc::new(CountingEmitter::default());
        let (mut context, id) = context(Arc::clone(&emitter));

        let report = context.build(id).await.unwrap();
        assert!(report.is_complete_success());
        assert_eq!(report.succeeded(), vec![TargetVersion::Net35, TargetVersion::Net40]);
        assert_eq!(emitter.calls.load(Ordering::SeqCst), 2);

        let artifact = report.artifact(TargetVersion::Net40).unwrap();
        assert_eq!(artifact.obfuscation, ObfuscationStatus::NotRequested);
        assert_eq!(artifact.sha256.len(), 64);
        assert!(artifact.path.is_none());
        assert!(context.catalog().task(id).unwrap().compiled);
    }

    #[tokio::test]
    async fn unlisted_version_fails_alone() {
        let emitter = Arc::new(CountingEmitter::default());
        let (mut context, id) = context(emitter);

        let report = context
            .build_versions(id, &[TargetVersion::Net40, TargetVersion::Net45])
            .await
            .unwrap();
        assert_eq!(report.succeeded(), vec![TargetVersion::Net40]);
        let failed = report.failed();
        assert_eq!(failed.len(), 1);
        assert!(matches!(failed[0].1, BuildError::UnsupportedVersion { .. }));
        assert!(!report.is_complete_success());
    }

    #[tokio::test]
    async fn stale_task_is_an_error() {
        let (mut context, _) = context(Arc::new(CountingEmitter::default()));
        assert!(context.build(TaskId(999)).await.is_err());
    }
}
