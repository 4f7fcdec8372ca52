//! Configuration structures for the mock resolution engine.
//!
//! - [`Flags`] - Feature flags consulted during a walk
//! - [`ClassConfig`] - Per-class markers set by the configuration layer
//! - [`MockConfig`] - Root configuration, loadable from JSON
//!
//! All configuration types implement [`Default`] with the values a fresh
//! test setup starts from.

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Feature flags of the resolution context.
///
/// `skip_mock` is deliberately absent: it is scoped runtime state owned by
/// the context, never configuration.
///
/// # Examples
///
/// ```
/// use nm_core::Flags;
///
/// let flags = Flags::default();
/// assert!(flags.cache_module);
/// assert!(flags.cache_provider);
/// assert!(!flags.correct_module_exports);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct Flags {
    /// Cache rewritten modules per epoch.
    pub cache_module: bool,

    /// Cache mocked providers per epoch.
    pub cache_provider: bool,

    /// Only re-export members explicitly marked for export.
    pub correct_module_exports: bool,
}

impl Default for Flags {
    fn default() -> Self {
        Self {
            cache_module: true,
            cache_provider: true,
            correct_module_exports: false,
        }
    }
}

/// Per-class configuration markers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassConfig {
    /// The class must stay visible to consumers of its module.
    pub export: bool,
}

/// Root configuration.
///
/// # Examples
///
/// ```
/// use nm_core::MockConfig;
///
/// let config = MockConfig::from_json(r#"{"flags": {"correct_module_exports": true}}"#).unwrap();
/// assert!(config.flags.correct_module_exports);
/// assert!(config.flags.cache_module);
/// assert!(config.never_mock_modules.iter().any(|name| name == "CommonModule"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    /// Feature flags.
    pub flags: Flags,

    /// Modules that are never rewritten, by class name.
    ///
    /// Every class with a listed name matches, including unrelated classes
    /// that share it. Register a class with the resolution context to match
    /// one class by identity instead.
    pub never_mock_modules: Vec<String>,

    /// Provider classes that are never mocked, by class name.
    pub never_mock_providers: Vec<String>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            flags: Flags::default(),
            never_mock_modules: vec!["CommonModule".to_owned(), "ApplicationModule".to_owned()],
            never_mock_providers: vec![
                "DomRendererFactory2".to_owned(),
                "RendererFactory2".to_owned(),
            ],
        }
    }
}

impl MockConfig {
    /// Parses a configuration from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a configuration file.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        if !path.is_file() {
            return Err(ConfigError::MissingFile(path.to_owned()));
        }
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}
