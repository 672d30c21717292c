//! Engine configuration and the default-assembly set.

use std::path::Path;
use std::sync::{Arc, OnceLock};

use rustc_hash::FxHashSet;
use serde::Deserialize;
use smol_str::SmolStr;
use thiserror::Error;

use crate::types::{TypeId, TypeUniverse};

/// Assemblies whose types are available to every expression without an import.
pub const BUILTIN_DEFAULT_ASSEMBLIES: &[&str] = &[
    "System.Private.CoreLib",
    "System.Runtime",
    "System.Collections",
    "System.Linq",
    "System.Linq.Expressions",
    "System.ObjectModel",
    "mscorlib",
    "System",
    "System.Core",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct EngineConfig {
    /// Simple names of the default assemblies. `None` selects the built-in set.
    pub default_assemblies: Option<Vec<SmolStr>>,
}

impl EngineConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn default_assemblies(&self) -> DefaultAssemblies {
        match &self.default_assemblies {
            Some(names) => DefaultAssemblies::new(names.iter().cloned()),
            None => DefaultAssemblies::shared(),
        }
    }
}

/// Immutable set of default assembly names. Cloning shares the underlying set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultAssemblies {
    names: Arc<FxHashSet<SmolStr>>,
}

impl DefaultAssemblies {
    pub fn new(names: impl IntoIterator<Item = SmolStr>) -> Self {
        Self {
            names: Arc::new(names.into_iter().collect()),
        }
    }

    /// The process-wide built-in set, populated on first use.
    pub fn shared() -> Self {
        static SHARED: OnceLock<DefaultAssemblies> = OnceLock::new();
        SHARED
            .get_or_init(|| Self::new(BUILTIN_DEFAULT_ASSEMBLIES.iter().map(|n| SmolStr::new(n))))
            .clone()
    }

    pub fn contains(&self, assembly_name: &str) -> bool {
        self.names.contains(assembly_name)
    }

    /// Whether the assembly defining `ty` is a default one.
    pub fn defines(&self, universe: &TypeUniverse, ty: TypeId) -> bool {
        universe
            .assembly_of(ty)
            .is_some_and(|assembly| self.contains(&assembly.name.name))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for DefaultAssemblies {
    fn default() -> Self {
        Self::shared()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_set_is_stable() {
        let a = DefaultAssemblies::shared();
        let b = DefaultAssemblies::shared();
        assert!(Arc::ptr_eq(&a.names, &b.names));
        assert!(a.contains("System.Private.CoreLib"));
        assert!(!a.contains("Contoso.Crm"));
        assert_eq!(a.len(), BUILTIN_DEFAULT_ASSEMBLIES.len());
    }

    #[test]
    fn test_shared_set_concurrent_init() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| DefaultAssemblies::shared().len()))
            .collect();
        for handle in handles {
            assert_eq!(handle.join().ok(), Some(BUILTIN_DEFAULT_ASSEMBLIES.len()));
        }
    }

    #[test]
    fn test_config_from_toml() {
        let config = EngineConfig::from_toml_str(
            r#"
            default-assemblies = ["System.Private.CoreLib", "Contoso.Shared"]
            "#,
        );
        assert!(config.is_ok());
        let defaults = config.map(|c| c.default_assemblies()).unwrap_or_default();
        assert!(defaults.contains("Contoso.Shared"));
        assert!(!defaults.contains("System.Linq"));
        assert_eq!(defaults.len(), 2);
    }

    #[test]
    fn test_config_empty_uses_builtin() {
        let config = EngineConfig::from_toml_str("");
        assert_eq!(config.ok(), Some(EngineConfig::default()));
        assert_eq!(EngineConfig::default().default_assemblies(), DefaultAssemblies::shared());
    }

    #[test]
    fn test_config_rejects_bad_toml() {
        assert!(matches!(
            EngineConfig::from_toml_str("default-assemblies = 3"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_defines() {
        let universe = TypeUniverse::new();
        let defaults = DefaultAssemblies::shared();
        assert!(defaults.defines(&universe, universe.core().int32));
        assert!(DefaultAssemblies::new([]).is_empty());
        assert!(!DefaultAssemblies::new([]).defines(&universe, universe.core().int32));
    }
}
