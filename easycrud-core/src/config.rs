//! Connection configuration for the pool manager
//!
//! Keys mirror the classic MySQL pool options (`connectionLimit`, `host`,
//! `port`, `user`, `password`, `database`). Sources, lowest to highest
//! priority as used by the CLI: built-in defaults, a TOML file, `EASYCRUD_*`
//! environment variables, explicit flags.

use serde::{Deserialize, Serialize};
use sqlx::mysql::{MySqlConnectOptions, MySqlPoolOptions};
use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

/// Default maximum connections for the pool.
const DEFAULT_CONNECTION_LIMIT: u32 = 10;

const DEFAULT_PORT: u16 = 3306;

/// Pool manager configuration
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct DbConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: Option<String>,
    /// Maximum number of pooled connections
    pub connection_limit: u32,
    /// How long `acquire` waits for a free connection (driver default when unset)
    pub acquire_timeout_secs: Option<u64>,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            user: "root".to_string(),
            password: String::new(),
            database: None,
            connection_limit: DEFAULT_CONNECTION_LIMIT,
            acquire_timeout_secs: None,
        }
    }
}

// Password stays out of logs.
impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("connection_limit", &self.connection_limit)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .finish()
    }
}

impl DbConfig {
    /// Parse a TOML document (`connectionLimit = 20`, `host = "..."`, ...).
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| Error::config(format!("invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => Error::config(format!("config not found at {:?}", path)),
            _ => Error::from(err),
        })?;
        Self::from_toml_str(&content)
    }

    /// Default config file path: ~/.easycrud/config.toml
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".easycrud/config.toml")
    }

    /// Defaults overridden by `EASYCRUD_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Override fields from `EASYCRUD_*` environment variables that are set.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_lookup(|key| env::var(key).ok())
    }

    /// Override fields from whatever `lookup` returns for each `EASYCRUD_*` key.
    pub fn apply_lookup(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(host) = lookup("EASYCRUD_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("EASYCRUD_PORT") {
            self.port = parse_number("EASYCRUD_PORT", &port)?;
        }
        if let Some(user) = lookup("EASYCRUD_USER") {
            self.user = user;
        }
        if let Some(password) = lookup("EASYCRUD_PASSWORD") {
            self.password = password;
        }
        if let Some(database) = lookup("EASYCRUD_DATABASE") {
            self.database = Some(database).filter(|db| !db.is_empty());
        }
        if let Some(limit) = lookup("EASYCRUD_CONNECTION_LIMIT") {
            self.connection_limit = parse_number("EASYCRUD_CONNECTION_LIMIT", &limit)?;
        }
        if let Some(timeout) = lookup("EASYCRUD_ACQUIRE_TIMEOUT_SECS") {
            self.acquire_timeout_secs =
                Some(parse_number("EASYCRUD_ACQUIRE_TIMEOUT_SECS", &timeout)?);
        }

        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Error::config("host must not be empty"));
        }
        if self.connection_limit == 0 {
            return Err(Error::config("connectionLimit must be at least 1"));
        }
        Ok(())
    }

    /// Driver connect options for one physical connection.
    pub fn connect_options(&self) -> MySqlConnectOptions {
        let options = MySqlConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.user)
            .password(&self.password);

        match &self.database {
            Some(database) => options.database(database),
            None => options,
        }
    }

    /// Driver pool options (size limit, acquire timeout).
    pub fn pool_options(&self) -> MySqlPoolOptions {
        let options = MySqlPoolOptions::new().max_connections(self.connection_limit);

        match self.acquire_timeout_secs {
            Some(secs) => options.acquire_timeout(Duration::from_secs(secs)),
            None => options,
        }
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| Error::config(format!("{} must be a number: {}", key, e)))
}
