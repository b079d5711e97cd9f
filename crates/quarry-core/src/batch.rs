use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::config::RunConfig;
use crate::error::AppError;
use crate::models::{RunStats, ScrapeRecord, SkipEntry};
use crate::report::{BatchEvent, BatchReporter};
use crate::retry::{self, UrlOutcome};
use crate::traits::{FieldExtractor, Renderer, Session};

/// Reason recorded for URLs that were never attempted because the run was cancelled.
pub const CANCELLED_REASON: &str = "cancelled before processing";

/// Final result set of a batch run.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Successfully scraped pages, in input order.
    pub records: Vec<ScrapeRecord>,
    /// URLs that exhausted their retries (or were never reached), in input order.
    pub skipped: Vec<SkipEntry>,
    pub stats: RunStats,
    pub cancelled: bool,
}

/// Drives a list of URLs through the retry controller.
///
/// Generic over the renderer and extractor so the whole loop can be tested
/// without a browser.
pub struct BatchRunner<R, X>
where
    R: Renderer,
    X: FieldExtractor,
{
    renderer: R,
    extractor: X,
}

impl<R, X> BatchRunner<R, X>
where
    R: Renderer,
    X: FieldExtractor,
{
    pub fn new(renderer: R, extractor: X) -> Self {
        Self {
            renderer,
            extractor,
        }
    }

    /// Scrape every URL in `urls`.
    ///
    /// Opens `config.workers` sessions (never more than there are URLs, at
    /// least one) before touching any URL; a session that fails to open
    /// aborts the run with [`AppError::RendererInit`]. Every opened session is
    /// closed exactly once on all paths out of this function.
    ///
    /// Every URL ends up in exactly one of `records` / `skipped`.
    pub async fn run<B: BatchReporter>(
        &self,
        urls: &[String],
        config: &RunConfig,
        cancel: &CancellationToken,
        reporter: &B,
    ) -> Result<BatchOutcome, AppError> {
        let workers = config.workers.clamp(1, urls.len().max(1));
        let mut sessions = self.open_sessions(workers).await?;

        reporter.report(BatchEvent::Started {
            total: urls.len(),
            workers,
        });

        let started_at = Utc::now();
        let clock = Instant::now();

        let cursor = AtomicUsize::new(0);
        let slots: Mutex<Vec<Option<UrlOutcome>>> = Mutex::new(vec![None; urls.len()]);

        let lanes = sessions.iter_mut().enumerate().map(|(worker, session)| {
            self.drain(worker, session, urls, config, &cursor, &slots, cancel, reporter)
        });
        futures::future::join_all(lanes).await;

        let elapsed = clock.elapsed();
        let finished_at = Utc::now();

        close_all(sessions).await;

        let slots = slots.into_inner().unwrap_or_else(|p| p.into_inner());
        let mut records = Vec::new();
        let mut skipped = Vec::new();
        let mut remaining = 0;
        for (url, slot) in urls.iter().zip(slots) {
            match slot {
                Some(UrlOutcome::Scraped(record)) => records.push(record),
                Some(UrlOutcome::Skipped(entry)) => skipped.push(entry),
                None => {
                    remaining += 1;
                    skipped.push(SkipEntry::new(url.as_str(), CANCELLED_REASON));
                }
            }
        }

        if remaining > 0 {
            reporter.report(BatchEvent::Cancelled { remaining });
        }

        let stats = RunStats {
            started_at,
            finished_at,
            elapsed,
            total: urls.len(),
            succeeded: records.len(),
            skipped: skipped.len(),
        };
        reporter.report(BatchEvent::Finished { stats: &stats });

        Ok(BatchOutcome {
            records,
            skipped,
            stats,
            cancelled: remaining > 0,
        })
    }

    async fn open_sessions(&self, count: usize) -> Result<Vec<R::Session>, AppError> {
        let mut sessions = Vec::with_capacity(count);
        for _ in 0..count {
            match self.renderer.open().await {
                Ok(session) => sessions.push(session),
                Err(e) => {
                    tracing::error!(error = %e, "Unable to initialize renderer");
                    close_all(sessions).await;
                    return Err(match e {
                        AppError::RendererInit(_) => e,
                        other => AppError::RendererInit(other.to_string()),
                    });
                }
            }
        }
        Ok(sessions)
    }

    /// One worker: pull the next URL index off the shared cursor until the
    /// list is exhausted or the run is cancelled.
    #[allow(clippy::too_many_arguments)]
    async fn drain<B: BatchReporter>(
        &self,
        worker: usize,
        session: &mut R::Session,
        urls: &[String],
        config: &RunConfig,
        cursor: &AtomicUsize,
        slots: &Mutex<Vec<Option<UrlOutcome>>>,
        cancel: &CancellationToken,
        reporter: &B,
    ) {
        loop {
            if cancel.is_cancelled() {
                break;
            }
            let index = cursor.fetch_add(1, Ordering::SeqCst);
            let Some(url) = urls.get(index) else {
                break;
            };

            reporter.report(BatchEvent::UrlStarted { url, worker });
            let outcome =
                retry::scrape_with_retry(session, &self.extractor, url, config, reporter).await;

            let mut slots = slots.lock().unwrap_or_else(|p| p.into_inner());
            slots[index] = Some(outcome);
        }
    }
}

async fn close_all<S: Session>(sessions: Vec<S>) {
    for session in sessions {
        session.close().await;
    }
}
