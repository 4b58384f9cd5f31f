// Copyright (c) 2025 Marc Rivero López
// Licensed under GPLv3. See LICENSE file for details.

//! Expiration mailer against a real SQLite store
//!
//! Uses the dry-run notifier so every rendered notice can be inspected.

use certwarden::db::*;
use certwarden::expiration::{
    ExpirationAggregator, ExpirationMailer, ExpiryWindow, MailerSettings, NoticeTemplate,
};
use certwarden::notify::{LogNotifier, Recipient};
use certwarden::Counters;
use chrono::{DateTime, Duration, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

static DB_COUNTER: AtomicU64 = AtomicU64::new(0);

fn create_unique_db_path() -> PathBuf {
    let counter = DB_COUNTER.fetch_add(1, Ordering::SeqCst);
    let path = std::env::temp_dir().join(format!(
        "certwardenmailer{}_{}.db",
        std::process::id(),
        counter
    ));
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

fn week() -> MailerSettings {
    MailerSettings {
        nag_horizons: vec![Duration::days(7)],
        ..MailerSettings::default()
    }
}

async fn seed_shared_domains(repo: &repositories::CertificateRepositoryImpl) {
    let a = CertificateRecord::new(
        "0539",
        7,
        mint(&["example-a.com", "shared-example.com"]),
        now() - Duration::days(85),
        now() + Duration::days(5),
    );
    let b = CertificateRecord::new(
        "053a",
        7,
        mint(&["shared-example.com", "example-b.com"]),
        now() - Duration::days(88),
        now() + Duration::days(2),
    );
    repo.insert_certificate(&a).await.unwrap();
    repo.insert_certificate(&b).await.unwrap();
    repo.add_contact(7, "mailto:One@Example.com").await.unwrap();
    repo.add_contact(7, "mailto:two@example.com").await.unwrap();
}

#[tokio::test]
async fn test_one_digest_per_contact() {
    let db = WardenDatabase::new(&DatabaseConfig::sqlite(create_unique_db_path()))
        .await
        .unwrap();
    let repo = db.repository();
    seed_shared_domains(&repo).await;

    let notifier = Arc::new(LogNotifier::new());
    let mut counters = Counters::new();
    let report = ExpirationMailer::new(
        repo.clone(),
        repo.clone(),
        notifier.clone(),
        ExpirationAggregator::default(),
        week(),
    )
    .with_now(now())
    .run(&mut counters)
    .await
    .unwrap();

    assert_eq!(report.recipients, 2);
    assert_eq!(report.sent, 2);
    assert_eq!(report.failed, 0);

    let expected = format!(
        "hi, cert for DNS names example-a.com\nexample-b.com\nshared-example.com is going to expire in 2 days ({})",
        (now() + Duration::days(2)).format("%d %b %y %H:%M %z")
    );
    let transcript = notifier.transcript();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript[0].0, Recipient::parse("one@example.com").unwrap());
    assert_eq!(transcript[1].0, Recipient::parse("two@example.com").unwrap());
    assert!(transcript.iter().all(|(_, body)| *body == expected));

    db.close().await;
}

#[tokio::test]
async fn test_rerun_in_same_window_sends_nothing() {
    let db = WardenDatabase::new(&DatabaseConfig::sqlite(create_unique_db_path()))
        .await
        .unwrap();
    let repo = db.repository();
    seed_shared_domains(&repo).await;

    let run = |notifier: Arc<LogNotifier>| {
        ExpirationMailer::new(
            repo.clone(),
            repo.clone(),
            notifier,
            ExpirationAggregator::default(),
            week(),
        )
        .with_now(now())
    };

    let first = Arc::new(LogNotifier::new());
    let report = run(first.clone()).run(&mut Counters::new()).await.unwrap();
    assert_eq!(report.marked, 2);

    let second = Arc::new(LogNotifier::new());
    let report = run(second.clone()).run(&mut Counters::new()).await.unwrap();
    assert_eq!(report.notices, 0);
    assert!(second.transcript().is_empty());

    db.close().await;
}

#[tokio::test]
async fn test_recipient_index_windows() {
    let db = WardenDatabase::new(&DatabaseConfig::sqlite(create_unique_db_path()))
        .await
        .unwrap();
    let repo = db.repository();
    seed_shared_domains(&repo).await;

    let windows = ExpiryWindow::series(now(), &[Duration::days(3), Duration::days(7)]);

    let soon = repo.recipients_expiring(&windows[0]).await.unwrap();
    assert_eq!(soon.len(), 2);
    let recipient = &soon[0];
    let certs = repo.certificates_for(recipient, &windows[0], 10).await.unwrap();
    assert_eq!(certs.len(), 1);
    assert_eq!(certs[0].serial, "053a");

    let later = repo.certificates_for(recipient, &windows[1], 10).await.unwrap();
    assert_eq!(later.len(), 1);
    assert_eq!(later[0].serial, "0539");
    assert_eq!(later[0].dns_names, vec!["example-a.com", "shared-example.com"]);

    db.close().await;
}

#[tokio::test]
async fn test_custom_template() {
    let db = WardenDatabase::new(&DatabaseConfig::sqlite(create_unique_db_path()))
        .await
        .unwrap();
    let repo = db.repository();
    seed_shared_domains(&repo).await;

    let template = NoticeTemplate::new("{{serial}} in {{days}}d", "Expiring soon").unwrap();
    let notifier = Arc::new(LogNotifier::new());
    ExpirationMailer::new(
        repo.clone(),
        repo.clone(),
        notifier.clone(),
        ExpirationAggregator::new(template),
        week(),
    )
    .with_now(now())
    .run(&mut Counters::new())
    .await
    .unwrap();

    assert!(notifier.transcript().iter().all(|(_, body)| body == "053a in 2d"));

    db.close().await;
}

#[tokio::test]
async fn test_certificates_for_filters_by_contact() {
    let db = WardenDatabase::new(&DatabaseConfig::sqlite(create_unique_db_path()))
        .await
        .unwrap();
    let repo = db.repository();
    let window = ExpiryWindow::series(now(), &[Duration::days(7)])[0];

    for (serial, registration_id) in [("01", 1), ("02", 2)] {
        repo.insert_certificate(&CertificateRecord::new(
            serial,
            registration_id,
            mint(&["example.com"]),
            now() - Duration::days(85),
            now() + Duration::days(3),
        ))
        .await
        .unwrap();
    }
    // nagged for this window already
    repo.insert_certificate(
        &CertificateRecord::new(
            "03",
            1,
            mint(&["example.net"]),
            now() - Duration::days(85),
            now() + Duration::days(4),
        )
        .with_last_nag(now() - Duration::hours(6)),
    )
    .await
    .unwrap();
    repo.add_contact(1, "MAILTO:One@Example.com").await.unwrap();
    repo.add_contact(2, "mailto:other@example.org").await.unwrap();

    let recipients = repo.recipients_expiring(&window).await.unwrap();
    assert_eq!(recipients.len(), 2);

    let one = Recipient::parse("one@example.com").unwrap();
    let certs = repo.certificates_for(&one, &window, 10).await.unwrap();
    let serials: Vec<&str> = certs.iter().map(|c| c.serial.as_str()).collect();
    assert_eq!(serials, vec!["01"]);

    let other = Recipient::parse("other@example.org").unwrap();
    let certs = repo.certificates_for(&other, &window, 10).await.unwrap();
    assert_eq!(certs.len(), 1);
    assert_eq!(certs[0].serial, "02");

    db.close().await;
}
