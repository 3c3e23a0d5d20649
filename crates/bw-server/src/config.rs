//! Service configuration

use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use bw_build::BuildConfig;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;

/// Default listen port
pub const DEFAULT_PORT: u16 = 2012;

/// Default receive buffer size
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Which versions a remote request builds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildScope {
    /// Every compatible version
    #[default]
    AllCompatible,
    /// The first compatible version only
    Primary,
}

/// Remote build service configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listen address
    pub bind: SocketAddr,
    /// Bytes requested per socket read
    pub buffer_size: usize,
    /// Versions built per request
    pub scope: BuildScope,
    /// Build pipeline configuration
    pub build: BuildConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            buffer_size: DEFAULT_BUFFER_SIZE,
            scope: BuildScope::default(),
            build: BuildConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML
    ///
    /// # Errors
    /// [`ServiceError::ConfigParse`] on invalid TOML or unknown values.
    pub fn from_toml_str(text: &str) -> Result<Self, ServiceError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a TOML file
    ///
    /// # Errors
    /// Fails when the file cannot be read or parsed.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ServiceError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ServiceError::ConfigRead {
            path: PathBuf::from(path),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// With listen address
    #[inline]
    #[must_use]
    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }

    /// With receive buffer size (at least one byte)
    #[inline]
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// With build scope
    #[inline]
    #[must_use]
    pub fn with_scope(mut self, scope: BuildScope) -> Self {
        self.scope = scope;
        self
    }

    /// With build configuration
    #[inline]
    #[must_use]
    pub fn with_build(mut self, build: BuildConfig) -> Self {
        self.build = build;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bw_catalog::Platform;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults() {
        let config = ServiceConfig::new();
        assert_eq!(config.bind.to_string(), "127.0.0.1:2012");
        assert_eq!(config.buffer_size, 4096);
        assert_eq!(config.scope, BuildScope::AllCompatible);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = ServiceConfig::from_toml_str(
            r#"
bind = "0.0.0.0:9000"
scope = "primary"

[build]
platform = "x86"
reserved_namespaces = ["System", "Microsoft"]

[build.layout]
root = "/srv/buildwright"
"#,
        )
        .unwrap();
        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.scope, BuildScope::Primary);
        assert_eq!(config.buffer_size, DEFAULT_BUFFER_SIZE);
        assert_eq!(config.build.platform, Platform::X86);
        assert_eq!(config.build.layout.root, PathBuf::from("/srv/buildwright"));
        assert_eq!(config.build.compiler.program, "mcs");
    }

    #[test]
    fn unreadable_file() {
        let result = ServiceConfig::from_toml_file("/no/such/buildwright.toml");
        assert!(matches!(result, Err(ServiceError::ConfigRead { .. })));
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service.toml");
        let config = ServiceConfig::new().with_scope(BuildScope::Primary).with_buffer_size(0);
        std::fs::write(&path, toml::to_string(&config).unwrap()).unwrap();
        let loaded = ServiceConfig::from_toml_file(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.buffer_size, 1);
    }
}
