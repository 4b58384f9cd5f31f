// Database Connection Pool
// PostgreSQL and SQLite pools behind one enum, with dialect-aware query helpers

use crate::db::config::{DatabaseConfig, DatabaseType};
use crate::error::WardenError;
use sqlx::{Pool, Postgres, Sqlite};
use std::str::FromStr;

/// Placeholder generator: PostgreSQL uses $1, $2... while SQLite uses ?
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    db_type: DatabaseType,
    param_count: usize,
}

impl QueryBuilder {
    pub fn new(db_type: DatabaseType) -> Self {
        Self {
            db_type,
            param_count: 0,
        }
    }

    /// Next placeholder for the current database type
    pub fn placeholder(&mut self) -> String {
        self.param_count += 1;
        match self.db_type {
            DatabaseType::Postgres => format!("${}", self.param_count),
            DatabaseType::Sqlite => "?".to_string(),
        }
    }

    /// `count` placeholders separated by commas
    pub fn placeholders(&mut self, count: usize) -> String {
        (0..count)
            .map(|_| self.placeholder())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn reset(&mut self) {
        self.param_count = 0;
    }
}

/// Database pool enum supporting both PostgreSQL and SQLite
#[derive(Clone)]
pub enum DatabasePool {
    Postgres(Pool<Postgres>),
    Sqlite(Pool<Sqlite>),
}

impl DatabasePool {
    /// Create a new database pool from configuration
    pub async fn new(config: &DatabaseConfig) -> crate::Result<Self> {
        let connection_string = config.connection_string()?;

        let pool = match config.db_type {
            DatabaseType::Postgres => {
                let pool = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(config.max_connections.unwrap_or(10))
                    .acquire_timeout(config.acquire_timeout())
                    .connect(&connection_string)
                    .await
                    .map_err(|e| {
                        WardenError::Database(format!("PostgreSQL connection failed: {}", e))
                    })?;

                DatabasePool::Postgres(pool)
            }
            DatabaseType::Sqlite => {
                let connect_options =
                    sqlx::sqlite::SqliteConnectOptions::from_str(&connection_string)
                        .map_err(|e| {
                            WardenError::Database(format!(
                                "Failed to parse SQLite connection string: {}",
                                e
                            ))
                        })?
                        .create_if_missing(true);

                let pool = sqlx::sqlite::SqlitePoolOptions::new()
                    .max_connections(1) // SQLite is single-writer
                    .acquire_timeout(config.acquire_timeout())
                    .connect_with(connect_options)
                    .await
                    .map_err(|e| {
                        WardenError::Database(format!("SQLite connection failed: {}", e))
                    })?;

                DatabasePool::Sqlite(pool)
            }
        };

        tracing::debug!("Connected to {}", config.redacted());
        Ok(pool)
    }

    pub fn db_type(&self) -> DatabaseType {
        match self {
            DatabasePool::Postgres(_) => DatabaseType::Postgres,
            DatabasePool::Sqlite(_) => DatabaseType::Sqlite,
        }
    }

    /// Close the connection pool
    pub async fn close(&self) {
        match self {
            DatabasePool::Postgres(pool) => pool.close().await,
            DatabasePool::Sqlite(pool) => pool.close().await,
        }
    }

    /// Create a QueryBuilder for this pool's database type
    pub fn query_builder(&self) -> QueryBuilder {
        QueryBuilder::new(self.db_type())
    }

    /// Execute a statement and return the number of affected rows
    pub async fn execute(&self, query: &str, bindings: Vec<BindValue>) -> crate::Result<u64> {
        let affected = match self {
            DatabasePool::Postgres(pool) => {
                let mut q = sqlx::query(query);
                for binding in bindings {
                    q = binding.bind_postgres(q);
                }
                q.execute(pool).await?.rows_affected()
            }
            DatabasePool::Sqlite(pool) => {
                let mut q = sqlx::query(query);
                for binding in bindings {
                    q = binding.bind_sqlite(q);
                }
                q.execute(pool).await?.rows_affected()
            }
        };
        Ok(affected)
    }
}

/// Bind values for database-agnostic statements
#[derive(Debug, Clone)]
pub enum BindValue {
    Int64(i64),
    String(String),
    Bytes(Vec<u8>),
    DateTime(chrono::DateTime<chrono::Utc>),
    OptDateTime(Option<chrono::DateTime<chrono::Utc>>),
}

impl BindValue {
    fn bind_postgres<'q>(
        self,
        query: sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>,
    ) -> sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments> {
        match self {
            BindValue::Int64(v) => query.bind(v),
            BindValue::String(v) => query.bind(v),
            BindValue::Bytes(v) => query.bind(v),
            BindValue::DateTime(v) => query.bind(v),
            BindValue::OptDateTime(v) => query.bind(v),
        }
    }

    fn bind_sqlite<'q>(
        self,
        query: sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>>,
    ) -> sqlx::query::Query<'q, Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
        match self {
            BindValue::Int64(v) => query.bind(v),
            BindValue::String(v) => query.bind(v),
            BindValue::Bytes(v) => query.bind(v),
            BindValue::DateTime(v) => query.bind(v),
            BindValue::OptDateTime(v) => query.bind(v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_postgres_placeholders() {
        let mut qb = QueryBuilder::new(DatabaseType::Postgres);
        assert_eq!(qb.placeholders(3), "$1, $2, $3");
        assert_eq!(qb.placeholder(), "$4");
        qb.reset();
        assert_eq!(qb.placeholder(), "$1");
    }

    #[test]
    fn test_sqlite_placeholders() {
        let mut qb = QueryBuilder::new(DatabaseType::Sqlite);
        assert_eq!(qb.placeholders(2), "?, ?");
    }

    #[tokio::test]
    async fn test_sqlite_pool_creation() {
        let config = DatabaseConfig::sqlite(PathBuf::from(":memory:"));
        let pool = DatabasePool::new(&config)
            .await
            .expect("test assertion should succeed");

        assert_eq!(pool.db_type(), DatabaseType::Sqlite);
        pool.close().await;
    }
}
