//! Run configuration.
//!
//! Loaded once at startup from a JSON document (default `config.json`) and
//! validated into an immutable [`RunConfig`] that is passed by reference to
//! every component. A missing document means "all defaults".

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::AppError;
use crate::models::FieldSpec;
use crate::retry::RetryPolicy;

pub const DEFAULT_CONFIG_FILE: &str = "config.json";
pub const DEFAULT_RETRIES: u32 = 3;
pub const DEFAULT_READY_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_NAVIGATION_TIMEOUT_SECS: u64 = 30;

/// Severity threshold for console logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_filter())
    }
}

impl FromStr for LogLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" | "CRITICAL" => Ok(LogLevel::Error),
            _ => Err(AppError::ConfigError(format!("Unknown log_level: {s}"))),
        }
    }
}

/// Which page renderer drives the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// Headless Chromium over the DevTools protocol.
    #[default]
    Chromium,
    /// Plain HTTP GET; no client-side rendering.
    Http,
}

/// Session identity and transport options for the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct RendererOptions {
    pub kind: RendererKind,
    pub headless: bool,
    pub proxy: Option<String>,
    /// Pool of user agents; one is picked per session. Empty means the
    /// renderer's own default.
    pub user_agents: Vec<String>,
    pub navigation_timeout: Duration,
    pub browser_path: Option<PathBuf>,
}

impl Default for RendererOptions {
    fn default() -> Self {
        Self {
            kind: RendererKind::default(),
            headless: true,
            proxy: None,
            user_agents: Vec::new(),
            navigation_timeout: Duration::from_secs(DEFAULT_NAVIGATION_TIMEOUT_SECS),
            browser_path: None,
        }
    }
}

/// Validated, read-only configuration for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub fields: FieldSpec,
    /// Locator whose presence marks a page as ready for extraction.
    pub ready_locator: String,
    pub ready_timeout: Duration,
    pub retry: RetryPolicy,
    pub renderer: RendererOptions,
    /// Number of concurrent workers, each with its own renderer session.
    pub workers: usize,
    pub log_level: LogLevel,
}

impl Default for RunConfig {
    fn default() -> Self {
        let fields = FieldSpec::default();
        Self {
            ready_locator: fields.first_locator().to_string(),
            fields,
            ready_timeout: Duration::from_secs(DEFAULT_READY_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
            renderer: RendererOptions::default(),
            workers: 1,
            log_level: LogLevel::default(),
        }
    }
}

impl RunConfig {
    /// Load the configuration document at `path`.
    ///
    /// A path that does not point at a file yields the defaults. A file that
    /// exists but cannot be read or parsed is an error.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        if !path.is_file() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::ConfigError(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;

        Self::from_json_str(&raw).map_err(|e| match e {
            AppError::SerializationError(e) => AppError::ConfigError(format!(
                "Invalid JSON in config file {}: {e}",
                path.display()
            )),
            other => other,
        })
    }

    /// Parse and validate a configuration document.
    pub fn from_json_str(raw: &str) -> Result<Self, AppError> {
        let doc: RawConfig = serde_json::from_str(raw)?;
        doc.validate()
    }
}

/// On-disk shape of the configuration document. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    fields: Option<serde_json::Map<String, serde_json::Value>>,
    ready_locator: Option<String>,
    headless: Option<bool>,
    proxy: Option<String>,
    user_agents: Option<Vec<String>>,
    retries: Option<u32>,
    ready_timeout_secs: Option<u64>,
    navigation_timeout_secs: Option<u64>,
    retry_delay_ms: Option<u64>,
    retry_jitter_ms: Option<u64>,
    workers: Option<usize>,
    renderer: Option<RendererKind>,
    browser_path: Option<PathBuf>,
    log_level: Option<String>,
}

impl RawConfig {
    fn validate(self) -> Result<RunConfig, AppError> {
        let fields = match self.fields {
            None => FieldSpec::default(),
            Some(map) => {
                let entries = map
                    .into_iter()
                    .map(|(name, locator)| match locator {
                        serde_json::Value::String(s) => Ok((name, s)),
                        other => Err(AppError::ConfigError(format!(
                            "locator for field '{name}' must be a string, got {other}"
                        ))),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                FieldSpec::new(entries)?
            }
        };

        let ready_locator = match self.ready_locator {
            Some(locator) if locator.trim().is_empty() => {
                return Err(AppError::ConfigError("`ready_locator` must not be blank".into()));
            }
            Some(locator) => locator,
            None => fields.first_locator().to_string(),
        };

        let retries = positive(self.retries.unwrap_or(DEFAULT_RETRIES), "retries")?;
        let ready_timeout = positive(
            self.ready_timeout_secs.unwrap_or(DEFAULT_READY_TIMEOUT_SECS),
            "ready_timeout_secs",
        )?;
        let navigation_timeout = positive(
            self.navigation_timeout_secs
                .unwrap_or(DEFAULT_NAVIGATION_TIMEOUT_SECS),
            "navigation_timeout_secs",
        )?;
        let workers = positive(self.workers.unwrap_or(1), "workers")?;

        let proxy = self.proxy.filter(|p| !p.trim().is_empty());
        let user_agents = self
            .user_agents
            .unwrap_or_default()
            .into_iter()
            .filter(|ua| !ua.trim().is_empty())
            .collect();

        let log_level = match self.log_level {
            Some(level) => level.parse()?,
            None => LogLevel::default(),
        };

        Ok(RunConfig {
            fields,
            ready_locator,
            ready_timeout: Duration::from_secs(ready_timeout),
            retry: RetryPolicy::new(retries)
                .with_delay(Duration::from_millis(self.retry_delay_ms.unwrap_or(0)))
                .with_jitter(Duration::from_millis(self.retry_jitter_ms.unwrap_or(0))),
            renderer: RendererOptions {
                kind: self.renderer.unwrap_or_default(),
                headless: self.headless.unwrap_or(true),
                proxy,
                user_agents,
                navigation_timeout: Duration::from_secs(navigation_timeout),
                browser_path: self.browser_path,
            },
            workers,
            log_level,
        })
    }
}

fn positive<T: PartialEq + Default>(value: T, key: &str) -> Result<T, AppError> {
    if value == T::default() {
        return Err(AppError::ConfigError(format!(
            "`{key}` must be a positive integer"
        )));
    }
    Ok(value)
}
