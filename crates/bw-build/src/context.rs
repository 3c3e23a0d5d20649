//! Explicit, disposable build context
//!
//! Holds the catalog together with the collaborators every build needs, so
//! no component reaches for global state.

use std::sync::Arc;

use bw_catalog::TaskCatalog;
use bw_frontend::{ExternalCompiler, FrontendRegistry};
use tracing::info;

use crate::config::BuildConfig;
use crate::obfuscation::{ConfuserObfuscator, Obfuscator};

/// Catalog, configuration, front-ends and obfuscator for one session
#[derive(Debug)]
pub struct BuildContext {
    catalog: TaskCatalog,
    config: Arc<BuildConfig>,
    frontends: FrontendRegistry,
    obfuscator: Arc<dyn Obfuscator>,
}

impl BuildContext {
    /// Context with the external compiler and obfuscation engine from `config`
    #[must_use]
    pub fn new(config: BuildConfig) -> Self {
        let compiler = ExternalCompiler::new(config.compiler.program.clone()).with_args(config.compiler.args.clone());
        let obfuscator = ConfuserObfuscator::new(config.obfuscator.clone(), config.probe_paths());
        Self {
            catalog: TaskCatalog::new(),
            frontends: FrontendRegistry::with_defaults(Arc::new(compiler)),
            obfuscator: Arc::new(obfuscator),
            config: Arc::new(config),
        }
    }

    /// Replace the front-end registry
    #[inline]
    #[must_use]
    pub fn with_frontends(mut self, frontends: FrontendRegistry) -> Self {
        self.frontends = frontends;
        self
    }

    /// Replace the obfuscator
    #[inline]
    #[must_use]
    pub fn with_obfuscator(mut self, obfuscator: Arc<dyn Obfuscator>) -> Self {
        self.obfuscator = obfuscator;
        self
    }

    /// Catalog
    #[inline]
    #[must_use]
    pub fn catalog(&self) -> &TaskCatalog {
        &self.catalog
    }

    /// Mutable catalog
    #[inline]
    pub fn catalog_mut(&mut self) -> &mut TaskCatalog {
        &mut self.catalog
    }

    /// Configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub(crate) fn shared_config(&self) -> Arc<BuildConfig> {
        Arc::clone(&self.config)
    }

    /// Front-end registry
    #[inline]
    #[must_use]
    pub fn frontends(&self) -> &FrontendRegistry {
        &self.frontends
    }

    pub(crate) fn obfuscator(&self) -> Arc<dyn Obfuscator> {
        Arc::clone(&self.obfuscator)
    }

    /// Discard the catalog and start a fresh one
    pub fn dispose(&mut self) {
        info!("Disposing build context");
        self.catalog.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispose_clears_catalog() {
        let mut context = BuildContext::new(BuildConfig::new());
        context
            .catalog_mut()
            .ingest_yaml("- Name: A\n  CompatibleDotNetVersions: [Net40]\n  Code: x\n")
            .unwrap();
        assert_eq!(context.catalog().len(), 1);

        context.dispose();
        assert!(context.catalog().is_empty());
        assert_eq!(context.config().reserved_namespaces, vec!["System".to_string()]);
    }
}
