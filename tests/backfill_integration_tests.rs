// Copyright (c) 2025 Marc Rivero López
// Licensed under GPLv3. See LICENSE file for details.

//! Name-set backfill against a real SQLite store
//!
//! Certificates are minted with rcgen, stored through the sqlx repository and
//! reconciled end to end.

use certwarden::backfill::{BackfillReconciler, BackfillSettings, BackfillState};
use certwarden::certificates::hash_names;
use certwarden::db::repositories::CertificateRepositoryImpl;
use certwarden::db::*;
use certwarden::{Counters, WardenError};
use chrono::{DateTime, Duration, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counter to ensure unique database identifiers across tests
static DB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique SQLite file per test so runs never share state
fn create_unique_db_path() -> PathBuf {
    let counter = DB_COUNTER.fetch_add(1, Ordering::SeqCst);

    #[cfg(unix)]
    let path = PathBuf::from(format!(
        "/tmp/certwardenbackfill{}_{}.db",
        std::process::id(),
        counter
    ));

    #[cfg(not(unix))]
    let path = std::env::temp_dir().join(format!(
        "certwardenbackfill{}_{}.db",
        std::process::id(),
        counter
    ));

    // Clean up any existing database file to ensure fresh start
    let _ = std::fs::remove_file(&path);

    path
}

fn now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_443_657_600, 0).unwrap()
}

fn mint(names: &[&str]) -> Vec<u8> {
    let params =
        rcgen::CertificateParams::new(names.iter().map(|n| n.to_string()).collect::<Vec<_>>())
            .unwrap();
    let key = rcgen::KeyPair::generate().unwrap();
    params.self_signed(&key).unwrap().der().to_vec()
}

async fn open() -> (WardenDatabase, Arc<CertificateRepositoryImpl>) {
    let config = DatabaseConfig::sqlite(create_unique_db_path());
    let db = WardenDatabase::new(&config).await.unwrap();
    let repo = db.repository();
    (db, repo)
}

fn settings(batch_size: usize) -> BackfillSettings {
    BackfillSettings {
        batch_size,
        lookback: None,
    }
}

#[tokio::test]
async fn test_backfill_covers_every_unexpired_certificate() {
    let (db, repo) = open().await;
    let der = mint(&["www.example.com", "Example.com"]);

    for i in 0..25 {
        let record = CertificateRecord::new(
            format!("{:04x}", i + 1),
            1,
            der.clone(),
            now() - Duration::hours(i),
            now() + Duration::days(60),
        );
        repo.insert_certificate(&record).await.unwrap();
    }
    // already expired, never a candidate
    repo.insert_certificate(&CertificateRecord::new(
        "ffff",
        1,
        der.clone(),
        now() - Duration::days(120),
        now() - Duration::days(30),
    ))
    .await
    .unwrap();

    let mut counters = Counters::new();
    let report = BackfillReconciler::new(repo.clone(), settings(10))
        .with_now(now())
        .run(&mut counters)
        .await
        .unwrap();

    assert_eq!(report.state, BackfillState::Done);
    assert_eq!(report.batches, 3);
    assert_eq!(report.added, 25);
    assert_eq!(counters.get("backfill.nameset.added"), 25);

    let expected = hash_names(["example.com", "www.example.com"]).to_vec();
    let record = repo.name_set("0001").await.unwrap().unwrap();
    assert_eq!(record.set_hash, expected);
    assert_eq!(record.issued, now());
    assert!(repo.name_set("ffff").await.unwrap().is_none());

    db.close().await;
}

#[tokio::test]
async fn test_backfill_is_idempotent() {
    let (db, repo) = open().await;
    let der = mint(&["example.com"]);
    for i in 0..5 {
        repo.insert_certificate(&CertificateRecord::new(
            format!("{:02x}", i + 1),
            1,
            der.clone(),
            now() - Duration::hours(i),
            now() + Duration::days(60),
        ))
        .await
        .unwrap();
    }

    let first = BackfillReconciler::new(repo.clone(), settings(2))
        .with_now(now())
        .run(&mut Counters::new())
        .await
        .unwrap();
    assert_eq!(first.added, 5);

    let second = BackfillReconciler::new(repo.clone(), settings(2))
        .with_now(now())
        .run(&mut Counters::new())
        .await
        .unwrap();
    assert_eq!(second.state, BackfillState::Done);
    assert_eq!(second.batches, 0);
    assert_eq!(second.added, 0);

    // rewriting a covered serial keeps a single row
    let record = repo.name_set("01").await.unwrap().unwrap();
    repo.write_name_set(&record).await.unwrap();
    assert_eq!(repo.name_set("01").await.unwrap(), Some(record));

    db.close().await;
}

#[tokio::test]
async fn test_corrupt_row_is_reported_and_retried_later() {
    let (db, repo) = open().await;
    let der = mint(&["example.com"]);
    for i in 0..4 {
        repo.insert_certificate(&CertificateRecord::new(
            format!("{:02x}", i + 1),
            1,
            der.clone(),
            now() - Duration::hours(i),
            now() + Duration::days(60),
        ))
        .await
        .unwrap();
    }
    repo.insert_certificate(&CertificateRecord::new(
        "bad0",
        1,
        vec![0x30, 0x03, 0x02, 0x01],
        now() - Duration::hours(2),
        now() + Duration::days(60),
    ))
    .await
    .unwrap();

    let report = BackfillReconciler::new(repo.clone(), settings(1000))
        .with_now(now())
        .run(&mut Counters::new())
        .await
        .unwrap();

    assert_eq!(report.state, BackfillState::Done);
    assert_eq!(report.added, 4);
    assert_eq!(report.failed, 1);
    assert!(matches!(
        report.failure_summary(),
        Some(WardenError::PartialFailure { failed: 1, total: 5 })
    ));

    // the corrupt row is still uncovered for the next invocation
    let uncovered = repo.find_uncovered(10, now(), None).await.unwrap();
    assert_eq!(uncovered.len(), 1);
    assert_eq!(uncovered[0].serial, "bad0");

    db.close().await;
}

#[tokio::test]
async fn test_find_uncovered_orders_by_issuance() {
    let (db, repo) = open().await;
    for (serial, age_hours) in [("01", 3), ("02", 1), ("03", 2)] {
        repo.insert_certificate(&CertificateRecord::new(
            serial,
            1,
            vec![1, 2, 3],
            now() - Duration::hours(age_hours),
            now() + Duration::days(60),
        ))
        .await
        .unwrap();
    }

    let found = repo.find_uncovered(2, now(), None).await.unwrap();
    let serials: Vec<&str> = found.iter().map(|c| c.serial.as_str()).collect();
    assert_eq!(serials, vec!["02", "03"]);

    let recent = repo
        .find_uncovered(10, now(), Some(now() - Duration::minutes(90)))
        .await
        .unwrap();
    assert_eq!(recent.len(), 1);

    db.close().await;
}

#[tokio::test]
async fn test_corrupt_rows_filling_a_batch_do_not_hide_valid_ones() {
    let (db, repo) = open().await;
    for (serial, der, age_hours) in [
        ("0001", b"bad".to_vec(), 0),
        ("0002", b"bad".to_vec(), 1),
        ("0003", mint(&["example.com"]), 2),
    ] {
        repo.insert_certificate(&CertificateRecord::new(
            serial,
            1,
            der,
            now() - Duration::hours(age_hours),
            now() + Duration::days(60),
        ))
        .await
        .unwrap();
    }

    let report = BackfillReconciler::new(repo.clone(), settings(2))
        .with_now(now())
        .run(&mut Counters::new())
        .await
        .unwrap();

    assert_eq!(report.state, BackfillState::Done);
    assert_eq!(report.added, 1);
    assert_eq!(report.failed, 2);
    assert!(repo.name_set("0003").await.unwrap().is_some());

    db.close().await;
}
