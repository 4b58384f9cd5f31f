// Database Migrations
// Embedded, versioned schema for PostgreSQL and SQLite

use crate::db::connection::{BindValue, DatabasePool};
use crate::db::config::DatabaseType;
use crate::error::WardenError;
use sqlx::Row;

/// A schema step in both dialects
struct Migration {
    version: i64,
    description: &'static str,
    postgres: &'static str,
    sqlite: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 20150901_001,
        description: "create certificates",
        postgres: r#"
            CREATE TABLE IF NOT EXISTS certificates (
                serial TEXT PRIMARY KEY,
                registration_id BIGINT NOT NULL,
                der BYTEA NOT NULL,
                issued TIMESTAMPTZ NOT NULL,
                expires TIMESTAMPTZ NOT NULL,
                last_expiration_nag_sent TIMESTAMPTZ
            );
            CREATE INDEX IF NOT EXISTS idx_certificates_expires ON certificates (expires);
            CREATE INDEX IF NOT EXISTS idx_certificates_issued ON certificates (issued);
        "#,
        sqlite: r#"
            CREATE TABLE IF NOT EXISTS certificates (
                serial TEXT PRIMARY KEY,
                registration_id INTEGER NOT NULL,
                der BLOB NOT NULL,
                issued TEXT NOT NULL,
                expires TEXT NOT NULL,
                last_expiration_nag_sent TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_certificates_expires ON certificates (expires);
            CREATE INDEX IF NOT EXISTS idx_certificates_issued ON certificates (issued);
        "#,
    },
    Migration {
        version: 20150901_002,
        description: "create registration contacts",
        postgres: r#"
            CREATE TABLE IF NOT EXISTS registration_contacts (
                registration_id BIGINT NOT NULL,
                contact TEXT NOT NULL,
                PRIMARY KEY (registration_id, contact)
            );
        "#,
        sqlite: r#"
            CREATE TABLE IF NOT EXISTS registration_contacts (
                registration_id INTEGER NOT NULL,
                contact TEXT NOT NULL,
                PRIMARY KEY (registration_id, contact)
            );
        "#,
    },
    Migration {
        version: 20150915_001,
        description: "create name sets",
        postgres: r#"
            CREATE TABLE IF NOT EXISTS name_sets (
                serial TEXT PRIMARY KEY,
                set_hash BYTEA NOT NULL,
                issued TIMESTAMPTZ NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_name_sets_hash_issued ON name_sets (set_hash, issued);
        "#,
        sqlite: r#"
            CREATE TABLE IF NOT EXISTS name_sets (
                serial TEXT PRIMARY KEY,
                set_hash BLOB NOT NULL,
                issued TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_name_sets_hash_issued ON name_sets (set_hash, issued);
        "#,
    },
];

/// Apply every migration not yet recorded in `_warden_migrations`
pub async fn run_migrations(pool: &DatabasePool) -> crate::Result<()> {
    pool.execute(
        r#"
        CREATE TABLE IF NOT EXISTS _warden_migrations (
            version BIGINT PRIMARY KEY,
            description TEXT NOT NULL
        )
        "#,
        Vec::new(),
    )
    .await
    .map_err(|e| WardenError::Database(format!("Failed to create migrations table: {}", e)))?;

    let applied = applied_versions(pool).await?;

    for migration in MIGRATIONS {
        if applied.contains(&migration.version) {
            continue;
        }

        let sql = match pool.db_type() {
            DatabaseType::Postgres => migration.postgres,
            DatabaseType::Sqlite => migration.sqlite,
        };

        for statement in sql.split(';').filter(|s| !s.trim().is_empty()) {
            pool.execute(statement, Vec::new()).await.map_err(|e| {
                WardenError::Database(format!(
                    "Failed to execute migration {} ({}): {}",
                    migration.version, migration.description, e
                ))
            })?;
        }

        let mut qb = pool.query_builder();
        let record = format!(
            "INSERT INTO _warden_migrations (version, description) VALUES ({})",
            qb.placeholders(2)
        );
        pool.execute(
            &record,
            vec![
                BindValue::Int64(migration.version),
                BindValue::String(migration.description.to_string()),
            ],
        )
        .await
        .map_err(|e| {
            WardenError::Database(format!(
                "Failed to record migration {}: {}",
                migration.version, e
            ))
        })?;

        tracing::info!(
            "Applied migration {} ({})",
            migration.version,
            migration.description
        );
    }

    Ok(())
}

async fn applied_versions(pool: &DatabasePool) -> crate::Result<Vec<i64>> {
    let query = "SELECT version FROM _warden_migrations";
    let versions = match pool {
        DatabasePool::Postgres(pg) => sqlx::query(query)
            .fetch_all(pg)
            .await?
            .iter()
            .map(|row| row.get::<i64, _>(0))
            .collect(),
        DatabasePool::Sqlite(lite) => sqlx::query(query)
            .fetch_all(lite)
            .await?
            .iter()
            .map(|row| row.get::<i64, _>(0))
            .collect(),
    };
    Ok(versions)
}
