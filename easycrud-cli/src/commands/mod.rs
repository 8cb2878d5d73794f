//! Command implementations for the easycrud CLI

pub mod crud;
pub mod demo;
pub mod query;

pub use demo::DemoArgs;
pub use query::QueryArgs;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use easycrud_core::{DbConfig, DbConnection, DbPool, Direction, Fields};
use serde_json::Value;
use tracing::debug;

/// Connection flags shared by every subcommand
#[derive(Args, Debug, Default)]
pub struct ConnectionArgs {
    /// TOML config file (default: ~/.easycrud/config.toml when present)
    #[arg(long, global = true, env = "EASYCRUD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database host
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Database port
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Database user
    #[arg(long, short = 'u', global = true)]
    pub user: Option<String>,

    /// Database password
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Database (schema) name
    #[arg(long, short = 'd', global = true)]
    pub database: Option<String>,

    /// Maximum pooled connections
    #[arg(long, global = true)]
    pub connection_limit: Option<u32>,
}

impl ConnectionArgs {
    /// File (if any), then `EASYCRUD_*` env, then flags.
    pub fn resolve(&self) -> Result<DbConfig> {
        let mut config = match &self.config {
            Some(path) => DbConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => {
                let default_path = DbConfig::default_path();
                if default_path.exists() {
                    DbConfig::load(&default_path).with_context(|| {
                        format!("Failed to load config {}", default_path.display())
                    })?
                } else {
                    DbConfig::default()
                }
            }
        };
        config
            .apply_env()
            .context("Invalid EASYCRUD_* environment variable")?;

        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(user) = &self.user {
            config.user = user.clone();
        }
        if let Some(password) = &self.password {
            config.password = password.clone();
        }
        if let Some(database) = &self.database {
            config.database = Some(database.clone());
        }
        if let Some(limit) = self.connection_limit {
            config.connection_limit = limit;
        }

        config.validate()?;
        debug!(?config, "resolved connection config");
        Ok(config)
    }
}

/// Filter flags shared by the table commands
#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Exact-match filter, repeatable: --where col=value (values parse as JSON, else string)
    #[arg(long = "where", short = 'w', value_name = "COL=VALUE", value_parser = parse_assignment)]
    pub filter: Vec<(String, Value)>,
}

impl FilterArgs {
    pub fn fields(&self) -> Fields {
        self.filter.iter().cloned().collect()
    }
}

/// One pool plus the single connection a command runs on.
pub struct Session {
    pool: DbPool,
    conn: DbConnection,
}

impl Session {
    pub async fn open(config: DbConfig) -> Result<Self> {
        let mut pool = DbPool::new(config);
        pool.create();

        let conn = pool
            .acquire()
            .await
            .context("Failed to acquire a database connection")?;

        Ok(Self { pool, conn })
    }

    pub fn conn(&mut self) -> &mut DbConnection {
        &mut self.conn
    }

    /// Release the connection, close the pool, then print or return the outcome.
    pub async fn finish(self, outcome: Result<Value>) -> Result<()> {
        let Session { mut pool, conn } = self;
        conn.release();
        let closed = pool.end().await.context("Failed to close the pool");

        let value = outcome?;
        println!("{}", serde_json::to_string_pretty(&value)?);
        closed
    }
}

/// Parse a command-line value: JSON when it parses, otherwise a plain string.
pub fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub(crate) fn parse_param(raw: &str) -> Result<Value, String> {
    Ok(parse_value(raw))
}

/// `col=value` → (col, value). Splits at the first `=`.
pub fn parse_assignment(raw: &str) -> Result<(String, Value), String> {
    let (column, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected COL=VALUE, got '{}'", raw))?;
    let column = column.trim();
    if column.is_empty() {
        return Err(format!("missing column name in '{}'", raw));
    }
    Ok((column.to_string(), parse_value(value)))
}

/// `col`, `col:asc`, `col:desc`, or the numeric flag form `col:1` / `col:0`.
pub fn parse_order(raw: &str) -> Result<(String, Direction), String> {
    let (column, direction) = match raw.split_once(':') {
        Some((column, direction)) => {
            let direction = match direction.to_ascii_lowercase().as_str() {
                "asc" => Direction::Asc,
                "desc" => Direction::Desc,
                flag => flag
                    .parse::<i64>()
                    .map(Direction::from_flag)
                    .map_err(|_| format!("unknown direction '{}' (use asc or desc)", direction))?,
            };
            (column, direction)
        }
        None => (raw, Direction::Asc),
    };

    if column.trim().is_empty() {
        return Err(format!("missing column name in '{}'", raw));
    }
    Ok((column.trim().to_string(), direction))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn values_parse_as_json_or_string() {
        assert_eq!(parse_value("42"), json!(42));
        assert_eq!(parse_value("true"), json!(true));
        assert_eq!(parse_value("null"), Value::Null);
        assert_eq!(parse_value("\"42\""), json!("42"));
        assert_eq!(parse_value("god"), json!("god"));
        assert_eq!(parse_value(r#"{"k":1}"#), json!({"k": 1}));
    }

    #[test]
    fn assignment_splits_at_first_equals() {
        assert_eq!(
            parse_assignment("userid=entvy").unwrap(),
            ("userid".to_string(), json!("entvy"))
        );
        assert_eq!(
            parse_assignment("expr=a=b").unwrap(),
            ("expr".to_string(), json!("a=b"))
        );
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=5").is_err());
    }

    #[test]
    fn order_forms() {
        assert_eq!(parse_order("id").unwrap(), ("id".to_string(), Direction::Asc));
        assert_eq!(parse_order("id:DESC").unwrap(), ("id".to_string(), Direction::Desc));
        assert_eq!(parse_order("id:1").unwrap(), ("id".to_string(), Direction::Desc));
        assert_eq!(parse_order("id:0").unwrap(), ("id".to_string(), Direction::Asc));
        assert!(parse_order("id:sideways").is_err());
        assert!(parse_order(":desc").is_err());
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let args = ConnectionArgs {
            config: Some(PathBuf::from("/nonexistent/easycrud.toml")),
            ..ConnectionArgs::default()
        };
        assert!(args.resolve().is_err());
    }
}
