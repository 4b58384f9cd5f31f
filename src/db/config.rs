// Database Configuration
// PostgreSQL or SQLite settings for the certificate store

use crate::error::WardenError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default seconds to wait for a pooled connection
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 15;

/// Database type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    Postgres,
    Sqlite,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(rename = "type")]
    pub db_type: DatabaseType,

    // PostgreSQL settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,

    // SQLite settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Upper bound on waiting for a connection; store calls never block past it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquire_timeout_secs: Option<u64>,
}

impl DatabaseConfig {
    /// Create PostgreSQL configuration
    pub fn postgres(
        host: String,
        port: u16,
        database: String,
        username: String,
        password: String,
    ) -> Self {
        Self {
            db_type: DatabaseType::Postgres,
            host: Some(host),
            port: Some(port),
            database: Some(database),
            username: Some(username),
            password: Some(password),
            max_connections: Some(10),
            path: None,
            acquire_timeout_secs: None,
        }
    }

    /// Create SQLite configuration
    pub fn sqlite(path: PathBuf) -> Self {
        Self {
            db_type: DatabaseType::Sqlite,
            host: None,
            port: None,
            database: None,
            username: None,
            password: None,
            max_connections: None,
            path: Some(path),
            acquire_timeout_secs: None,
        }
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(
            self.acquire_timeout_secs
                .unwrap_or(DEFAULT_ACQUIRE_TIMEOUT_SECS),
        )
    }

    /// Generate database URL for sqlx
    pub fn connection_string(&self) -> crate::Result<String> {
        match self.db_type {
            DatabaseType::Postgres => {
                let (host, port, database, username) = self.postgres_parts()?;
                let password = required(&self.password, "password")?;
                Ok(format!(
                    "postgres://{}:{}@{}:{}/{}",
                    username, password, host, port, database
                ))
            }
            DatabaseType::Sqlite => {
                let path = self
                    .path
                    .as_ref()
                    .ok_or_else(|| WardenError::Database("Missing SQLite path".to_string()))?;

                let path_str = path.to_string_lossy();
                if path_str == ":memory:" || !path.is_absolute() {
                    Ok(format!("sqlite:{}", path_str))
                } else if path_str.starts_with('/') {
                    Ok(format!("sqlite://{}", path_str))
                } else {
                    // Windows drive paths
                    Ok(format!("sqlite:///{}", path_str))
                }
            }
        }
    }

    /// Connection target with the password removed, for logs
    pub fn redacted(&self) -> String {
        match self.db_type {
            DatabaseType::Postgres => match self.postgres_parts() {
                Ok((host, port, database, username)) => {
                    format!("postgres://{}:***@{}:{}/{}", username, host, port, database)
                }
                Err(_) => "postgres://<incomplete>".to_string(),
            },
            DatabaseType::Sqlite => self
                .path
                .as_ref()
                .map(|p| format!("sqlite:{}", p.display()))
                .unwrap_or_else(|| "sqlite:<unset>".to_string()),
        }
    }

    fn postgres_parts(&self) -> crate::Result<(&str, u16, &str, &str)> {
        let host = required(&self.host, "PostgreSQL host")?;
        let port = self
            .port
            .ok_or_else(|| WardenError::Database("Missing PostgreSQL port".to_string()))?;
        let database = required(&self.database, "database name")?;
        let username = required(&self.username, "username")?;
        Ok((host, port, database, username))
    }
}

fn required<'a>(value: &'a Option<String>, what: &str) -> crate::Result<&'a str> {
    value
        .as_deref()
        .ok_or_else(|| WardenError::Database(format!("Missing {}", what)).into())
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::sqlite(PathBuf::from("certwarden.db"))
    }
}
