// Certificate Repository Implementation
// sqlx-backed certificate store and recipient index

use crate::certificates::Certificate;
use crate::db::connection::{BindValue, DatabasePool};
use crate::db::models::{
    CertificateRecord, ExpiringRow, NameSetRecord, UncoveredCertificate, certificates_in,
    recipients_in,
};
use crate::db::traits::{CertificateStore, RecipientIndex};
use crate::error::WardenError;
use crate::expiration::ExpiryWindow;
use crate::notify::Recipient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Serials per UPDATE when marking nags
const MARK_CHUNK: usize = 500;

pub struct CertificateRepositoryImpl {
    pool: DatabasePool,
}

impl CertificateRepositoryImpl {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Insert an issued certificate
    pub async fn insert_certificate(&self, cert: &CertificateRecord) -> crate::Result<()> {
        let mut qb = self.pool.query_builder();
        let query = format!(
            "INSERT INTO certificates (serial, registration_id, der, issued, expires, last_expiration_nag_sent) VALUES ({})",
            qb.placeholders(6)
        );

        self.pool
            .execute(
                &query,
                vec![
                    BindValue::String(cert.serial.clone()),
                    BindValue::Int64(cert.registration_id),
                    BindValue::Bytes(cert.der.clone()),
                    BindValue::DateTime(cert.issued),
                    BindValue::DateTime(cert.expires),
                    BindValue::OptDateTime(cert.last_expiration_nag_sent),
                ],
            )
            .await
            .map_err(|e| {
                WardenError::Database(format!("Failed to insert certificate {}: {}", cert.serial, e))
            })?;
        Ok(())
    }

    /// Attach a contact URL to a registration
    pub async fn add_contact(&self, registration_id: i64, contact: &str) -> crate::Result<()> {
        let mut qb = self.pool.query_builder();
        let query = format!(
            "INSERT INTO registration_contacts (registration_id, contact) VALUES ({}) ON CONFLICT DO NOTHING",
            qb.placeholders(2)
        );

        self.pool
            .execute(
                &query,
                vec![
                    BindValue::Int64(registration_id),
                    BindValue::String(contact.to_string()),
                ],
            )
            .await
            .map_err(|e| WardenError::Database(format!("Failed to insert contact: {}", e)))?;
        Ok(())
    }

    /// (contact, certificate) pairs expiring inside the window's range.
    ///
    /// With `recipient`, only contacts mentioning that address are joined;
    /// the exact match is left to `certificates_in`. The DER column is only
    /// read in that case.
    async fn expiring_rows(
        &self,
        window: &ExpiryWindow,
        recipient: Option<&Recipient>,
    ) -> crate::Result<Vec<ExpiringRow>> {
        let mut qb = self.pool.query_builder();
        let der = if recipient.is_some() { ", c.der" } else { "" };
        let mut query = format!(
            r#"
            SELECT rc.contact, c.serial, c.issued, c.expires, c.last_expiration_nag_sent{}
            FROM certificates AS c
            JOIN registration_contacts AS rc ON rc.registration_id = c.registration_id
            WHERE c.expires > {} AND c.expires <= {}"#,
            der,
            qb.placeholder(),
            qb.placeholder()
        );
        if recipient.is_some() {
            query.push_str(&format!(" AND LOWER(rc.contact) LIKE {}", qb.placeholder()));
        }
        query.push_str(" ORDER BY c.expires ASC, c.serial ASC");
        let pattern = recipient.map(|r| format!("%{}%", r.address()));

        let rows = match &self.pool {
            DatabasePool::Postgres(pool) => {
                let mut q = sqlx::query_as::<_, ExpiringRow>(&query)
                    .bind(window.start)
                    .bind(window.end);
                if let Some(pattern) = &pattern {
                    q = q.bind(pattern.as_str());
                }
                q.fetch_all(pool).await
            }
            DatabasePool::Sqlite(pool) => {
                let mut q = sqlx::query_as::<_, ExpiringRow>(&query)
                    .bind(window.start)
                    .bind(window.end);
                if let Some(pattern) = &pattern {
                    q = q.bind(pattern.as_str());
                }
                q.fetch_all(pool).await
            }
        }
        .map_err(|e| WardenError::Query(format!("Failed to fetch expiring certificates: {}", e)))?;

        Ok(rows)
    }
}

#[async_trait]
impl CertificateStore for CertificateRepositoryImpl {
    async fn find_uncovered(
        &self,
        limit: usize,
        as_of: DateTime<Utc>,
        issued_after: Option<DateTime<Utc>>,
    ) -> crate::Result<Vec<UncoveredCertificate>> {
        let mut qb = self.pool.query_builder();
        let mut query = format!(
            r#"
            SELECT c.serial, c.issued, c.der FROM certificates AS c
            WHERE c.serial NOT IN (SELECT ns.serial FROM name_sets AS ns)
            AND c.expires > {}"#,
            qb.placeholder()
        );
        if issued_after.is_some() {
            query.push_str(&format!(" AND c.issued > {}", qb.placeholder()));
        }
        query.push_str(&format!(" ORDER BY c.issued DESC LIMIT {}", qb.placeholder()));

        let limit = limit as i64;
        let results = match &self.pool {
            DatabasePool::Postgres(pool) => {
                let mut q = sqlx::query_as::<_, UncoveredCertificate>(&query).bind(as_of);
                if let Some(after) = issued_after {
                    q = q.bind(after);
                }
                q.bind(limit).fetch_all(pool).await
            }
            DatabasePool::Sqlite(pool) => {
                let mut q = sqlx::query_as::<_, UncoveredCertificate>(&query).bind(as_of);
                if let Some(after) = issued_after {
                    q = q.bind(after);
                }
                q.bind(limit).fetch_all(pool).await
            }
        }
        .map_err(|e| WardenError::Query(format!("Failed to find uncovered certificates: {}", e)))?;

        Ok(results)
    }

    async fn write_name_set(&self, name_set: &NameSetRecord) -> crate::Result<()> {
        let mut qb = self.pool.query_builder();
        let query = format!(
            r#"
            INSERT INTO name_sets (serial, set_hash, issued) VALUES ({})
            ON CONFLICT (serial) DO UPDATE SET set_hash = excluded.set_hash, issued = excluded.issued
            "#,
            qb.placeholders(3)
        );

        self.pool
            .execute(
                &query,
                vec![
                    BindValue::String(name_set.serial.clone()),
                    BindValue::Bytes(name_set.set_hash.clone()),
                    BindValue::DateTime(name_set.issued),
                ],
            )
            .await
            .map_err(|e| WardenError::Write {
                serial: name_set.serial.clone(),
                details: e.to_string(),
            })?;
        Ok(())
    }

    async fn name_set(&self, serial: &str) -> crate::Result<Option<NameSetRecord>> {
        let mut qb = self.pool.query_builder();
        let query = format!(
            "SELECT serial, set_hash, issued FROM name_sets WHERE serial = {}",
            qb.placeholder()
        );

        let result = match &self.pool {
            DatabasePool::Postgres(pool) => {
                sqlx::query_as::<_, NameSetRecord>(&query)
                    .bind(serial)
                    .fetch_optional(pool)
                    .await
            }
            DatabasePool::Sqlite(pool) => {
                sqlx::query_as::<_, NameSetRecord>(&query)
                    .bind(serial)
                    .fetch_optional(pool)
                    .await
            }
        }
        .map_err(|e| WardenError::Query(format!("Failed to fetch name set: {}", e)))?;

        Ok(result)
    }

    async fn mark_nagged(&self, serials: &[String], at: DateTime<Utc>) -> crate::Result<u64> {
        let mut updated = 0;

        for chunk in serials.chunks(MARK_CHUNK) {
            let mut qb = self.pool.query_builder();
            let set = qb.placeholder();
            let query = format!(
                "UPDATE certificates SET last_expiration_nag_sent = {} WHERE serial IN ({})",
                set,
                qb.placeholders(chunk.len())
            );

            let mut bindings = vec![BindValue::DateTime(at)];
            bindings.extend(chunk.iter().cloned().map(BindValue::String));

            updated += self.pool.execute(&query, bindings).await.map_err(|e| {
                WardenError::Database(format!("Failed to mark certificates as nagged: {}", e))
            })?;
        }

        Ok(updated)
    }
}

#[async_trait]
impl RecipientIndex for CertificateRepositoryImpl {
    async fn recipients_expiring(&self, window: &ExpiryWindow) -> crate::Result<Vec<Recipient>> {
        let rows = self.expiring_rows(window, None).await?;
        Ok(recipients_in(&rows, window))
    }

    async fn certificates_for(
        &self,
        recipient: &Recipient,
        window: &ExpiryWindow,
        limit: usize,
    ) -> crate::Result<Vec<Certificate>> {
        let rows = self.expiring_rows(window, Some(recipient)).await?;
        Ok(certificates_in(rows, recipient, window, limit))
    }
}
