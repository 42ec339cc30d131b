//! Runtime configuration
//!
//! Built once at startup (file values, then command line overrides) and used
//! to construct the host context, the resolver registry and the external
//! fact search path.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 10;
const DEFAULT_EXTERNAL_TIMEOUT_SECS: u64 = 60;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML in {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactsConfig {
    /// External fact directories; empty means the platform defaults.
    pub external_dirs: Vec<PathBuf>,
    pub no_external_facts: bool,
    /// Timeout for commands run by the built-in resolvers.
    pub command_timeout_secs: Option<u64>,
    /// Timeout for external fact scripts; `0` disables it.
    pub external_timeout_secs: Option<u64>,
    /// Filesystem root that procfs, sysfs and `/etc` are read under.
    pub root: Option<PathBuf>,
    pub blocked_facts: Vec<String>,
}

impl FactsConfig {
    /// Loads a YAML or JSON config file, chosen by extension (YAML otherwise).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;

        match path.extension().and_then(|extension| extension.to_str()) {
            Some("json") => serde_json::from_str(&content).map_err(|source| ConfigError::Json {
                path: display,
                source,
            }),
            _ => serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
                path: display,
                source,
            }),
        }
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(
            self.command_timeout_secs
                .unwrap_or(DEFAULT_COMMAND_TIMEOUT_SECS),
        )
    }

    /// A script that leaves a background child holding its output open is
    /// only cut off by this timeout.
    pub fn external_timeout(&self) -> Option<Duration> {
        match self
            .external_timeout_secs
            .unwrap_or(DEFAULT_EXTERNAL_TIMEOUT_SECS)
        {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Directories to scan for external facts.
    pub fn external_directories(&self) -> Vec<PathBuf> {
        if self.no_external_facts {
            return Vec::new();
        }
        if self.external_dirs.is_empty() {
            return default_external_dirs();
        }
        self.external_dirs.clone()
    }
}

/// System directories when running as root, the user's own otherwise.
pub fn default_external_dirs() -> Vec<PathBuf> {
    if is_root() {
        return vec![
            PathBuf::from("/etc/rustle/facts.d"),
            PathBuf::from("/etc/facter/facts.d"),
        ];
    }
    dirs::home_dir()
        .map(|home| vec![home.join(".rustle").join("facts.d")])
        .unwrap_or_default()
}

#[cfg(unix)]
fn is_root() -> bool {
    nix::unistd::geteuid().is_root()
}

#[cfg(not(unix))]
fn is_root() -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("facts.yaml");
        fs::write(
            &path,
            "external_dirs:\n  - /srv/facts.d\ncommand_timeout_secs: 3\nblocked_facts: [uuid]\n",
        )
        .unwrap();

        let config = FactsConfig::load(&path).unwrap();
        assert_eq!(config.external_dirs, vec![PathBuf::from("/srv/facts.d")]);
        assert_eq!(config.command_timeout(), Duration::from_secs(3));
        assert_eq!(config.blocked_facts, vec!["uuid".to_string()]);
        assert!(!config.no_external_facts);
        assert_eq!(config.external_timeout(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_zero_external_timeout_disables_it() {
        let config = FactsConfig {
            external_timeout_secs: Some(0),
            ..FactsConfig::default()
        };
        assert_eq!(config.external_timeout(), None);
    }

    #[test]
    fn test_load_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("facts.json");
        fs::write(&path, r#"{"no_external_facts": true, "external_timeout_secs": 30}"#).unwrap();

        let config = FactsConfig::load(&path).unwrap();
        assert!(config.no_external_facts);
        assert!(config.external_directories().is_empty());
        assert_eq!(config.external_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.command_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_load_reports_bad_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("facts.yml");
        fs::write(&path, "external_dirs: {").unwrap();

        assert!(matches!(
            FactsConfig::load(&path),
            Err(ConfigError::Yaml { .. })
        ));
    }

    #[test]
    fn test_explicit_dirs_override_defaults() {
        let config = FactsConfig {
            external_dirs: vec![PathBuf::from("/opt/facts")],
            ..FactsConfig::default()
        };
        assert_eq!(config.external_directories(), vec![PathBuf::from("/opt/facts")]);
    }
}
