// Database Module
// Certificate store abstraction for certwarden

pub mod config;
pub mod connection;
pub mod memory;
pub mod migrations;
pub mod models;
pub mod repositories;
pub mod traits;

// Re-exports
pub use config::{DatabaseConfig, DatabaseType};
pub use connection::DatabasePool;
pub use memory::MemoryStore;
pub use migrations::run_migrations;
pub use models::*;
pub use traits::*;

use repositories::CertificateRepositoryImpl;
use std::sync::Arc;

/// Main database struct
pub struct WardenDatabase {
    pool: DatabasePool,
    repository: Arc<CertificateRepositoryImpl>,
}

impl WardenDatabase {
    /// Connect and bring the schema up to date
    pub async fn new(config: &DatabaseConfig) -> crate::Result<Self> {
        tracing::debug!("Connecting to {}", config.redacted());
        let pool = DatabasePool::new(config).await?;

        // Run migrations
        run_migrations(&pool).await?;

        let repository = Arc::new(CertificateRepositoryImpl::new(pool.clone()));

        Ok(Self { pool, repository })
    }

    /// Get database pool
    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Shared repository, usable as both store and recipient index
    pub fn repository(&self) -> Arc<CertificateRepositoryImpl> {
        Arc::clone(&self.repository)
    }

    /// Close database connection
    pub async fn close(self) {
        self.pool.close().await;
    }
}
