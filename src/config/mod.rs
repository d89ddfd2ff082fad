//! Configuration loading: `@include` expansion followed by JSON
//! deserialization into the model in [`model`].

pub mod include;
pub mod model;

pub use model::*;

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// A loaded configuration document plus the entry path it was loaded from,
/// so a later reload (`SIGHUP`) can re-read the same file.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub entry: PathBuf,
    pub config: Config,
}

impl LoadedConfig {
    pub fn load(entry: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let entry = entry.as_ref().to_path_buf();
        let raw = include::read_include_files(&entry)?;
        let config: Config = serde_json::from_slice(&raw).map_err(|source| ConfigError::Json {
            path: entry.clone(),
            source,
        })?;
        if config.apps.is_empty() {
            return Err(ConfigError::NoApps);
        }
        Ok(LoadedConfig { entry, config })
    }

    /// Reload from the same entry file this instance was first loaded from.
    pub fn reload(&self) -> Result<Self, ConfigError> {
        Self::load(&self.entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_config_with_no_apps() {
        let err = serde_json::from_str::<Config>(r#"{"apps":[]}"#)
            .map(|config| {
                if config.apps.is_empty() {
                    Err(ConfigError::NoApps)
                } else {
                    Ok(())
                }
            })
            .unwrap();
        assert!(matches!(err, Err(ConfigError::NoApps)));
    }

    #[test]
    fn parses_minimal_app() {
        let json = r#"{
            "apps": [{
                "port": 8080,
                "domains": [{
                    "domain": "a.test",
                    "rules": [{"to": "http://backend:9000/$1"}]
                }]
            }]
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.apps.len(), 1);
        assert_eq!(config.apps[0].domains[0].domain, "a.test");
        assert_eq!(config.apps[0].domains[0].rules[0].to, "http://backend:9000/$1");
    }
}
