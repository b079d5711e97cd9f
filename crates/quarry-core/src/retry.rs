//! Per-URL retry controller.
//!
//! ```text
//! Attempting(1) --ok--> Done
//!       |
//!     [err, n < max] --> Attempting(n + 1)
//!     [err, n == max] --> Skipped(last reason)
//! ```

use std::time::Duration;

use rand::Rng;

use crate::config::RunConfig;
use crate::error::AppError;
use crate::models::{ScrapeRecord, SkipEntry};
use crate::report::{BatchEvent, BatchReporter};
use crate::traits::{FieldExtractor, Session};
use crate::wait;

/// Bounded retry with an optional pause between attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per URL, including the first one. Always >= 1.
    pub max_attempts: u32,
    /// Fixed pause before each retry.
    pub delay: Duration,
    /// Maximum random jitter added on top of `delay` (uniform [0, jitter]).
    pub jitter: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    /// Pause to take before the next attempt (delay + random jitter).
    pub fn pause(&self) -> Duration {
        if self.jitter.is_zero() {
            return self.delay;
        }
        let jitter_ms = rand::thread_rng().gen_range(0..=self.jitter.as_millis() as u64);
        self.delay + Duration::from_millis(jitter_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_RETRIES)
    }
}

/// Terminal state of one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlOutcome {
    Scraped(ScrapeRecord),
    Skipped(SkipEntry),
}

/// One attempt: navigate, wait for the ready locator, extract.
///
/// Only navigation and the readiness wait can fail; extraction always
/// yields a (possibly partial) record.
pub async fn scrape_once<S, X>(
    session: &mut S,
    extractor: &X,
    url: &str,
    config: &RunConfig,
) -> Result<ScrapeRecord, AppError>
where
    S: Session,
    X: FieldExtractor,
{
    session.navigate(url).await?;
    wait::await_ready(session, &config.ready_locator, config.ready_timeout).await?;
    let document = session.document().await?;
    let fields = extractor.extract(&document, &config.fields);
    Ok(ScrapeRecord::new(url, fields))
}

/// Run [`scrape_once`] until it succeeds or the retry budget is spent.
///
/// Any attempt failure is retried while budget remains, whatever the error
/// kind. Never fails: the last failure reason ends up in the returned
/// [`SkipEntry`].
pub async fn scrape_with_retry<S, X, B>(
    session: &mut S,
    extractor: &X,
    url: &str,
    config: &RunConfig,
    reporter: &B,
) -> UrlOutcome
where
    S: Session,
    X: FieldExtractor,
    B: BatchReporter,
{
    let policy = &config.retry;
    let mut attempt = 1;

    loop {
        match scrape_once(session, extractor, url, config).await {
            Ok(record) => {
                reporter.report(BatchEvent::UrlScraped {
                    url,
                    attempts: attempt,
                });
                return UrlOutcome::Scraped(record);
            }
            Err(e) => {
                let reason = e.to_string();
                let will_retry = attempt < policy.max_attempts;
                reporter.report(BatchEvent::AttemptFailed {
                    url,
                    attempt,
                    max_attempts: policy.max_attempts,
                    error: &reason,
                    will_retry,
                });

                if !will_retry {
                    reporter.report(BatchEvent::UrlSkipped {
                        url,
                        reason: &reason,
                    });
                    return UrlOutcome::Skipped(SkipEntry::new(url, reason));
                }

                let pause = policy.pause();
                if !pause.is_zero() {
                    tokio::time::sleep(pause).await;
                }
                attempt += 1;
            }
        }
    }
}
