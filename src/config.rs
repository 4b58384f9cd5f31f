// certwarden configuration
// TOML file with [database], [backfill] and [mailer] sections

use crate::Result;
use crate::backfill::{BackfillSettings, DEFAULT_BATCH_SIZE};
use crate::db::DatabaseConfig;
use crate::error::WardenError;
use crate::expiration::mailer::{DEFAULT_CERTIFICATE_LIMIT, MailerSettings};
use crate::expiration::template::{DEFAULT_SUBJECT, NoticeTemplate};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WardenConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub backfill: BackfillConfig,
    #[serde(default)]
    pub mailer: MailerConfig,
}

/// Name-set backfill settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackfillConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Only backfill certificates issued within this many days
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookback_days: Option<u32>,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            lookback_days: None,
        }
    }
}

/// Expiration mailer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailerConfig {
    #[serde(default = "default_nag_days")]
    pub nag_days: Vec<u32>,
    #[serde(default = "default_from_address")]
    pub from_address: String,
    #[serde(default = "default_subject")]
    pub subject: String,
    /// Handlebars body template; the built-in body is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<PathBuf>,
    #[serde(default = "default_certificate_limit")]
    pub certificate_limit: usize,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp: Option<SmtpConfig>,
}

fn default_nag_days() -> Vec<u32> {
    vec![1, 3, 7]
}

fn default_from_address() -> String {
    "certwarden <noreply@localhost>".to_string()
}

fn default_subject() -> String {
    DEFAULT_SUBJECT.to_string()
}

fn default_certificate_limit() -> usize {
    DEFAULT_CERTIFICATE_LIMIT
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            nag_days: default_nag_days(),
            from_address: default_from_address(),
            subject: default_subject(),
            template: None,
            certificate_limit: DEFAULT_CERTIFICATE_LIMIT,
            dry_run: false,
            smtp: None,
        }
    }
}

/// SMTP relay settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub server: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default = "default_use_tls")]
    pub use_tls: bool,
}

fn default_smtp_port() -> u16 {
    587
}

fn default_use_tls() -> bool {
    true
}

impl WardenConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref()).map_err(|e| WardenError::Config {
            message: format!("Failed to read config file {:?}: {}", path.as_ref(), e),
        })?;

        let config: WardenConfig = toml::from_str(&contents).map_err(WardenError::from)?;
        Ok(config)
    }

    /// Write an annotated example configuration
    pub fn create_example_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let example = r#"[database]
# Database type: "postgres" or "sqlite"
type = "postgres"

# PostgreSQL configuration
host = "localhost"
port = 5432
database = "boulder_sa"
username = "certwarden"
password = "secure_password"
max_connections = 10
# acquire_timeout_secs = 15

# SQLite configuration (uncomment to use)
# type = "sqlite"
# path = "./certwarden.db"

[backfill]
# Uncovered certificates fetched per query
batch_size = 1000
# Only consider certificates issued in the last N days (unset: no bound)
# lookback_days = 90

[mailer]
# Warning horizons in days before expiry
nag_days = [1, 3, 7]
from_address = "Expiry Bot <expiry@example.com>"
subject = "Certificate expiration notice"
# template = "./expiration.hbs"
certificate_limit = 100
dry_run = false

[mailer.smtp]
server = "smtp.example.com"
port = 587
username = "expiry@example.com"
password = "secure_password"
use_tls = true
"#;

        fs::write(path.as_ref(), example)?;
        Ok(())
    }

    /// Reject settings no run could work with
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: &str| -> Result<()> {
            Err(WardenError::Config {
                message: message.to_string(),
            }
            .into())
        };

        if self.backfill.batch_size == 0 {
            return invalid("backfill.batch_size must be positive");
        }
        if self.mailer.nag_days.is_empty() {
            return invalid("mailer.nag_days must not be empty");
        }
        if self.mailer.nag_days.contains(&0) {
            return invalid("mailer.nag_days must be positive");
        }
        if self.mailer.certificate_limit == 0 {
            return invalid("mailer.certificate_limit must be positive");
        }
        if !self.mailer.dry_run && self.mailer.smtp.is_none() {
            return invalid("mailer.smtp is required unless dry_run is set");
        }
        Ok(())
    }

    pub fn backfill_settings(&self) -> BackfillSettings {
        BackfillSettings {
            batch_size: self.backfill.batch_size,
            lookback: self
                .backfill
                .lookback_days
                .map(|days| Duration::days(i64::from(days))),
        }
    }

    pub fn mailer_settings(&self) -> MailerSettings {
        MailerSettings {
            nag_horizons: self
                .mailer
                .nag_days
                .iter()
                .map(|days| Duration::days(i64::from(*days)))
                .collect(),
            certificate_limit: self.mailer.certificate_limit,
            dry_run: self.mailer.dry_run,
        }
    }

    /// Configured body template, or the built-in one
    pub fn notice_template(&self) -> Result<NoticeTemplate> {
        match &self.mailer.template {
            Some(path) => NoticeTemplate::from_file(path, self.mailer.subject.clone()),
            None => NoticeTemplate::new(
                crate::expiration::template::DEFAULT_BODY_TEMPLATE,
                self.mailer.subject.clone(),
            ),
        }
    }
}
