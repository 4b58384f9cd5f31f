// In-memory Store
// Process-local CertificateStore/RecipientIndex with failure injection.
// Used for dry runs against fixtures and by the test suites.

use crate::certificates::Certificate;
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
use std::collections::{BTreeMap, HashMap, HashSet};
use tokio::sync::Mutex;

#[derive(Default)]
struct MemoryState {
    certificates: BTreeMap<String, CertificateRecord>,
    name_sets: HashMap<String, NameSetRecord>,
    contacts: BTreeMap<i64, Vec<String>>,
    rejected_writes: HashSet<String>,
    query_failure: Option<String>,
    queries: usize,
    writes: usize,
}

/// Certificate store held entirely in memory
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_certificate(&self, cert: CertificateRecord) {
        let mut state = self.state.lock().await;
        state.certificates.insert(cert.serial.clone(), cert);
    }

    pub async fn add_contact(&self, registration_id: i64, contact: &str) {
        let mut state = self.state.lock().await;
        let contacts = state.contacts.entry(registration_id).or_default();
        if !contacts.iter().any(|c| c == contact) {
            contacts.push(contact.to_string());
        }
    }

    /// Make every write for `serial` fail
    pub async fn reject_writes_for(&self, serial: &str) {
        self.state.lock().await.rejected_writes.insert(serial.to_string());
    }

    /// Make every query fail with `reason` (or succeed again with `None`)
    pub async fn set_query_failure(&self, reason: Option<&str>) {
        self.state.lock().await.query_failure = reason.map(str::to_string);
    }

    /// Number of `find_uncovered` calls so far
    pub async fn query_count(&self) -> usize {
        self.state.lock().await.queries
    }

    /// Number of accepted name-set writes so far
    pub async fn write_count(&self) -> usize {
        self.state.lock().await.writes
    }

    pub async fn name_set_count(&self) -> usize {
        self.state.lock().await.name_sets.len()
    }

    pub async fn last_nag(&self, serial: &str) -> Option<DateTime<Utc>> {
        let state = self.state.lock().await;
        state
            .certificates
            .get(serial)
            .and_then(|c| c.last_expiration_nag_sent)
    }

    async fn expiring_rows(&self, window: &ExpiryWindow) -> crate::Result<Vec<ExpiringRow>> {
        let state = self.state.lock().await;
        if let Some(reason) = &state.query_failure {
            return Err(WardenError::Query(reason.clone()).into());
        }

        let mut rows = Vec::new();
        for cert in state.certificates.values() {
            if !window.contains(cert.expires) {
                continue;
            }
            for contact in state.contacts.get(&cert.registration_id).into_iter().flatten() {
                rows.push(ExpiringRow {
                    contact: contact.clone(),
                    serial: cert.serial.clone(),
                    issued: cert.issued,
                    expires: cert.expires,
                    der: cert.der.clone(),
                    last_expiration_nag_sent: cert.last_expiration_nag_sent,
                });
            }
        }
        Ok(rows)
    }
}

#[async_trait]
impl CertificateStore for MemoryStore {
    async fn find_uncovered(
        &self,
        limit: usize,
        as_of: DateTime<Utc>,
        issued_after: Option<DateTime<Utc>>,
    ) -> crate::Result<Vec<UncoveredCertificate>> {
        let mut state = self.state.lock().await;
        state.queries += 1;
        if let Some(reason) = &state.query_failure {
            return Err(WardenError::Query(reason.clone()).into());
        }

        let mut uncovered: Vec<&CertificateRecord> = state
            .certificates
            .values()
            .filter(|c| c.expires > as_of)
            .filter(|c| issued_after.is_none_or(|after| c.issued > after))
            .filter(|c| !state.name_sets.contains_key(&c.serial))
            .collect();
        uncovered.sort_by(|a, b| b.issued.cmp(&a.issued).then_with(|| a.serial.cmp(&b.serial)));

        Ok(uncovered
            .into_iter()
            .take(limit)
            .map(CertificateRecord::uncovered)
            .collect())
    }

    async fn write_name_set(&self, name_set: &NameSetRecord) -> crate::Result<()> {
        let mut state = self.state.lock().await;
        if state.rejected_writes.contains(&name_set.serial) {
            return Err(WardenError::Write {
                serial: name_set.serial.clone(),
                details: "write rejected by store".to_string(),
            }
            .into());
        }

        state.writes += 1;
        state
            .name_sets
            .insert(name_set.serial.clone(), name_set.clone());
        Ok(())
    }

    async fn name_set(&self, serial: &str) -> crate::Result<Option<NameSetRecord>> {
        Ok(self.state.lock().await.name_sets.get(serial).cloned())
    }

    async fn mark_nagged(&self, serials: &[String], at: DateTime<Utc>) -> crate::Result<u64> {
        let mut state = self.state.lock().await;
        let mut updated = 0;
        for serial in serials {
            if let Some(cert) = state.certificates.get_mut(serial) {
                cert.last_expiration_nag_sent = Some(at);
                updated += 1;
            }
        }
        Ok(updated)
    }
}

#[async_trait]
impl RecipientIndex for MemoryStore {
    async fn recipients_expiring(&self, window: &ExpiryWindow) -> crate::Result<Vec<Recipient>> {
        let rows = self.expiring_rows(window).await?;
        Ok(recipients_in(&rows, window))
    }

    async fn certificates_for(
        &self,
        recipient: &Recipient,
        window: &ExpiryWindow,
        limit: usize,
    ) -> crate::Result<Vec<Certificate>> {
        let rows = self.expiring_rows(window).await?;
        Ok(certificates_in(rows, recipient, window, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificates::hash_names;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[tokio::test]
    async fn test_find_uncovered_orders_newest_first() {
        let store = MemoryStore::new();
        for (serial, age) in [("01", 30), ("02", 10), ("03", 20)] {
            store
                .insert_certificate(CertificateRecord::new(
                    serial,
                    1,
                    vec![],
                    now() - Duration::days(age),
                    now() + Duration::days(60),
                ))
                .await;
        }
        // expired certificates are never candidates
        store
            .insert_certificate(CertificateRecord::new(
                "04",
                1,
                vec![],
                now() - Duration::days(100),
                now() - Duration::days(10),
            ))
            .await;

        let found = store.find_uncovered(2, now(), None).await.unwrap();
        let serials: Vec<&str> = found.iter().map(|c| c.serial.as_str()).collect();
        assert_eq!(serials, vec!["02", "03"]);

        let bounded = store
            .find_uncovered(10, now(), Some(now() - Duration::days(15)))
            .await
            .unwrap();
        assert_eq!(bounded.len(), 1);
    }

    #[tokio::test]
    async fn test_written_serials_are_covered() {
        let store = MemoryStore::new();
        store
            .insert_certificate(CertificateRecord::new(
                "01",
                1,
                vec![],
                now(),
                now() + Duration::days(60),
            ))
            .await;

        let record = NameSetRecord::new("01", hash_names(["example.com"]), now());
        store.write_name_set(&record).await.unwrap();
        store.write_name_set(&record).await.unwrap();

        assert!(store.find_uncovered(10, now(), None).await.unwrap().is_empty());
        assert_eq!(store.name_set_count().await, 1);
        assert_eq!(store.name_set("01").await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn test_rejected_write() {
        let store = MemoryStore::new();
        store.reject_writes_for("01").await;

        let record = NameSetRecord::new("01", hash_names(["example.com"]), now());
        let err = store.write_name_set(&record).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<WardenError>(),
            Some(WardenError::Write { .. })
        ));
    }
}
