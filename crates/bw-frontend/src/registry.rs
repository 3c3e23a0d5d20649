//! Front-end registry keyed by source language

use std::collections::HashMap;
use std::sync::Arc;

use bw_catalog::SourceLanguage;

use crate::csharp::CSharpFrontend;
use crate::emit::Emitter;
use crate::error::FrontendError;
use crate::LanguageFrontend;

/// Maps each source language to its front-end
#[derive(Debug, Clone, Default)]
pub struct FrontendRegistry {
    frontends: HashMap<SourceLanguage, Arc<dyn LanguageFrontend>>,
}

impl FrontendRegistry {
    /// Empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in front-end, emitting through `emitter`
    #[must_use]
    pub fn with_defaults(emitter: Arc<dyn Emitter>) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(CSharpFrontend::new(emitter)));
        registry
    }

    /// Register a front-end, replacing any previous one for its language
    pub fn register(&mut self, frontend: Arc<dyn LanguageFrontend>) {
        self.frontends.insert(frontend.language(), frontend);
    }

    /// Front-end for `language`
    ///
    /// # Errors
    /// Returns [`FrontendError::UnsupportedLanguage`] if none is registered.
    pub fn get(&self, language: SourceLanguage) -> Result<Arc<dyn LanguageFrontend>, FrontendError> {
        self.frontends
            .get(&language)
            .cloned()
            .ok_or(FrontendError::UnsupportedLanguage(language))
    }

    /// Registered languages
    pub fn languages(&self) -> impl Iterator<Item = SourceLanguage> + '_ {
        self.frontends.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emit::ExternalCompiler;

    #[test]
    fn defaults_cover_csharp() {
        let registry = FrontendRegistry::with_defaults(Arc::new(ExternalCompiler::default()));
        assert_eq!(registry.get(SourceLanguage::CSharp).unwrap().language(), SourceLanguage::CSharp);
        assert_eq!(registry.languages().count(), 1);
    }

    #[test]
    fn empty_registry_rejects() {
        assert!(matches!(
            FrontendRegistry::new().get(SourceLanguage::CSharp),
            Err(FrontendError::UnsupportedLanguage(SourceLanguage::CSharp))
        ));
    }
}
