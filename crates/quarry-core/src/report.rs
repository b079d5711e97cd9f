use crate::models::RunStats;

/// Events emitted by the batch orchestrator for monitoring/logging.
#[derive(Debug, Clone)]
pub enum BatchEvent<'a> {
    Started {
        total: usize,
        workers: usize,
    },
    UrlStarted {
        url: &'a str,
        worker: usize,
    },
    AttemptFailed {
        url: &'a str,
        attempt: u32,
        max_attempts: u32,
        error: &'a str,
        will_retry: bool,
    },
    UrlScraped {
        url: &'a str,
        attempts: u32,
    },
    UrlSkipped {
        url: &'a str,
        reason: &'a str,
    },
    Cancelled {
        remaining: usize,
    },
    Finished {
        stats: &'a RunStats,
    },
}

/// Trait for receiving batch events (decoupled logging).
pub trait BatchReporter: Send + Sync {
    fn report(&self, event: BatchEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingBatchReporter;

impl BatchReporter for TracingBatchReporter {
    fn report(&self, event: BatchEvent<'_>) {
        match event {
            BatchEvent::Started { total, workers } => {
                tracing::info!(%total, %workers, "Batch started");
            }
            BatchEvent::UrlStarted { url, worker } => {
                tracing::info!(%worker, "Scraping: {url}");
            }
            BatchEvent::AttemptFailed {
                url,
                attempt,
                max_attempts,
                error,
                will_retry,
            } => {
                tracing::warn!(%will_retry, "Retry {attempt}/{max_attempts} failed for {url}: {error}");
            }
            BatchEvent::UrlScraped { url, attempts } => {
                tracing::debug!(%attempts, "Scraped {url}");
            }
            BatchEvent::UrlSkipped { url, reason } => {
                tracing::debug!(%reason, "Skipped {url}");
            }
            BatchEvent::Cancelled { remaining } => {
                tracing::warn!(%remaining, "Batch cancelled, remaining URLs go to the skip report");
            }
            BatchEvent::Finished { stats } => {
                tracing::debug!(
                    started_at = %stats.started_at,
                    finished_at = %stats.finished_at,
                    "Batch finished"
                );
                tracing::info!("\n{stats}");
            }
        }
    }
}
