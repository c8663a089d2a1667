//! Configuration loading.
//!
//! Order: built-in defaults, then `config.toml`, then `AUTHGATE_*`
//! environment variables. CLI flags are applied by the caller on top.

pub mod schema;

pub use schema::{AuthConfig, Config, ConfigError, GatewayConfig, LogConfig, StorageConfig};

use directories::ProjectDirs;
use std::path::{Path, PathBuf};

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("", "", "authgate")
}

/// `<config dir>/authgate/config.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join("config.toml"))
}

/// `<data dir>/authgate/users.db`, falling back to the working directory.
pub fn default_db_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("users.db"))
        .unwrap_or_else(|| PathBuf::from("users.db"))
}

/// The file `Config::load` reads: `explicit` if given, else the default
/// location when it exists.
pub fn config_source(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path().filter(|p| p.is_file()),
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// read if present and silently skipped otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |_| {})
    }

    /// Like [`Config::load`], with `overrides` (CLI flags) applied after the
    /// environment and before validation.
    pub fn load_with<F>(path: Option<&Path>, overrides: F) -> Result<Self, ConfigError>
    where
        F: FnOnce(&mut Self),
    {
        let mut config = match config_source(path) {
            Some(source) => Self::from_file(&source)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        overrides(&mut config);
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}
