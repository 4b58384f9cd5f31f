// Notice Template - handlebars rendering of expiration notices

use crate::Result;
use crate::error::WardenError;
use handlebars::{Handlebars, Template};
use serde::Serialize;
use std::path::Path;

/// Default message body
pub const DEFAULT_BODY_TEMPLATE: &str =
    "hi, cert for DNS names {{domains}} is going to expire in {{days}} days ({{expiration}})";

/// Default email subject
pub const DEFAULT_SUBJECT: &str = "Certificate expiration notice";

/// RFC 822 with numeric zone, e.g. `02 Jan 06 15:04 -0700`
pub const EXPIRATION_FORMAT: &str = "%d %b %y %H:%M %z";

/// Values available to the template
#[derive(Debug, Serialize)]
pub struct NoticeContext<'a> {
    /// Newline-joined, sorted domain list
    pub domains: String,
    pub days: i64,
    pub expiration: String,
    pub serial: &'a str,
}

/// Validated body template plus subject line
pub struct NoticeTemplate {
    registry: Handlebars<'static>,
    source: String,
    subject: String,
}

impl NoticeTemplate {
    /// Validate a body template; unknown variables are render errors
    pub fn new(body: &str, subject: impl Into<String>) -> Result<Self> {
        Template::compile(body).map_err(WardenError::from)?;

        Ok(Self {
            registry: registry(),
            source: body.to_string(),
            subject: subject.into(),
        })
    }

    /// Load the body template from a file
    pub fn from_file(path: &Path, subject: impl Into<String>) -> Result<Self> {
        let body = std::fs::read_to_string(path).map_err(|e| WardenError::Config {
            message: format!("Failed to read template {}: {}", path.display(), e),
        })?;
        Self::new(body.trim_end(), subject)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn render(&self, context: &NoticeContext<'_>) -> Result<String> {
        let body = self
            .registry
            .render_template(&self.source, context)
            .map_err(WardenError::from)?;
        Ok(body)
    }
}

impl Default for NoticeTemplate {
    fn default() -> Self {
        Self {
            registry: registry(),
            source: DEFAULT_BODY_TEMPLATE.to_string(),
            subject: DEFAULT_SUBJECT.to_string(),
        }
    }
}

fn registry() -> Handlebars<'static> {
    let mut registry = Handlebars::new();
    registry.register_escape_fn(handlebars::no_escape);
    registry.set_strict_mode(true);
    registry
}
