use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::error::AppError;

/// Field name → extracted value, in configured field order.
pub type ExtractedFields = Vec<(String, Option<String>)>;

/// Ordered mapping from output field name to a locator (CSS selector).
///
/// Guaranteed non-empty with unique, non-blank names and locators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    entries: Vec<(String, String)>,
}

impl FieldSpec {
    pub fn new<N, L>(entries: impl IntoIterator<Item = (N, L)>) -> Result<Self, AppError>
    where
        N: Into<String>,
        L: Into<String>,
    {
        let entries: Vec<(String, String)> = entries
            .into_iter()
            .map(|(n, l)| (n.into(), l.into()))
            .collect();

        if entries.is_empty() {
            return Err(AppError::ConfigError(
                "`fields` must contain at least one entry".into(),
            ));
        }

        let mut seen = HashSet::new();
        for (name, locator) in &entries {
            if name.trim().is_empty() {
                return Err(AppError::ConfigError("field names must not be blank".into()));
            }
            if name == "url" {
                return Err(AppError::ConfigError(
                    "`url` is reserved for the source URL column".into(),
                ));
            }
            if locator.trim().is_empty() {
                return Err(AppError::ConfigError(format!(
                    "field '{name}' has a blank locator"
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(AppError::ConfigError(format!("duplicate field '{name}'")));
            }
        }

        Ok(Self { entries })
    }

    /// Locator of the first configured field.
    pub fn first_locator(&self) -> &str {
        // Non-empty by construction.
        &self.entries[0].1
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, l)| (n.as_str(), l.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for FieldSpec {
    /// Product-page defaults: page title, whole price, review count.
    fn default() -> Self {
        Self {
            entries: vec![
                ("title".into(), "title".into()),
                ("price".into(), ".a-price-whole".into()),
                ("reviews".into(), "#acrCustomerReviewText".into()),
            ],
        }
    }
}

/// One successfully scraped page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRecord {
    pub url: String,
    pub fields: ExtractedFields,
}

impl ScrapeRecord {
    pub fn new(url: impl Into<String>, fields: ExtractedFields) -> Self {
        Self {
            url: url.into(),
            fields,
        }
    }

    /// Value of a field, `None` if the field is absent or unknown.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .and_then(|(_, value)| value.as_deref())
    }
}

impl Serialize for ScrapeRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.serialize_entry("url", &self.url)?;
        map.end()
    }
}

/// A URL that exhausted its retry budget, with the last failure reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkipEntry {
    pub url: String,
    pub reason: String,
}

impl SkipEntry {
    pub fn new(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reason: reason.into(),
        }
    }
}

/// Aggregate timing and counts for one batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunStats {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
}

impl RunStats {
    /// Average wall-clock time per URL; zero for an empty run.
    pub fn average_per_url(&self) -> Duration {
        if self.total == 0 {
            return Duration::ZERO;
        }
        self.elapsed / self.total as u32
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- SCRAPING REPORT ---")?;
        writeln!(f, "Total URLs: {}", self.total)?;
        writeln!(f, "URLs scraped: {}", self.succeeded)?;
        writeln!(f, "URLs skipped: {}", self.skipped)?;
        write!(
            f,
            "Average scrape time per URL: {:.2} seconds",
            self.average_per_url().as_secs_f64()
        )
    }
}
