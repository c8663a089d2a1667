use crate::auth::password::{MAX_COST, MIN_COST};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

/// Top-level service configuration (`config.toml`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub gateway: GatewayConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Requests running longer than this get a 408.
    pub request_timeout_secs: u64,
    pub max_body_bytes: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8080,
            request_timeout_secs: 30,
            max_body_bytes: 65_536,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// bcrypt work factor.
    pub bcrypt_cost: u32,
    pub cookie_name: String,
    pub cookie_max_age_secs: u64,
    /// Report "user not found" and "incorrect password" separately instead
    /// of a single "invalid username or password".
    pub distinct_login_errors: bool,
    pub allow_registration: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            bcrypt_cost: bcrypt::DEFAULT_COST,
            cookie_name: "session".into(),
            cookie_max_age_secs: 3600,
            distinct_login_errors: false,
            allow_registration: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file. `~` is expanded.
    pub db_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: super::default_db_path().to_string_lossy().into_owned(),
        }
    }
}

impl StorageConfig {
    pub fn resolved_db_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.db_path).into_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "authgate=info".into(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gateway.host.trim().is_empty() {
            return Err(ConfigError::invalid("gateway.host", "must not be empty"));
        }
        if self.gateway.port == 0 {
            return Err(ConfigError::invalid("gateway.port", "must be non-zero"));
        }
        if self.gateway.request_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "gateway.request_timeout_secs",
                "must be non-zero",
            ));
        }
        if self.gateway.max_body_bytes == 0 {
            return Err(ConfigError::invalid("gateway.max_body_bytes", "must be non-zero"));
        }
        if !(MIN_COST..=MAX_COST).contains(&self.auth.bcrypt_cost) {
            return Err(ConfigError::invalid(
                "auth.bcrypt_cost",
                format!("{} is outside {MIN_COST}..={MAX_COST}", self.auth.bcrypt_cost),
            ));
        }
        if !is_cookie_token(&self.auth.cookie_name) {
            return Err(ConfigError::invalid(
                "auth.cookie_name",
                format!("{:?} is not a valid cookie name", self.auth.cookie_name),
            ));
        }
        if self.auth.cookie_max_age_secs == 0 {
            return Err(ConfigError::invalid(
                "auth.cookie_max_age_secs",
                "must be non-zero",
            ));
        }
        if self.storage.db_path.trim().is_empty() {
            return Err(ConfigError::invalid("storage.db_path", "must not be empty"));
        }
        Ok(())
    }

    /// Apply `AUTHGATE_*` overrides. `lookup` is `std::env::var` in
    /// production.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_owned())
                .filter(|v| !v.is_empty())
        };

        if let Some(host) = get("AUTHGATE_HOST") {
            self.gateway.host = host;
        }
        if let Some(port) = get("AUTHGATE_PORT") {
            self.gateway.port = port
                .parse()
                .map_err(|_| ConfigError::invalid("AUTHGATE_PORT", format!("{port:?} is not a port")))?;
        }
        if let Some(path) = get("AUTHGATE_DB_PATH") {
            self.storage.db_path = path;
        }
        if let Some(cost) = get("AUTHGATE_BCRYPT_COST") {
            self.auth.bcrypt_cost = cost.parse().map_err(|_| {
                ConfigError::invalid("AUTHGATE_BCRYPT_COST", format!("{cost:?} is not a number"))
            })?;
        }
        Ok(())
    }
}

/// RFC 6265 cookie-name token: visible ASCII minus separators.
fn is_cookie_token(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?={}".contains(&b)
        })
}
