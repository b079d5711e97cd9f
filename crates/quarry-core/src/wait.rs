//! Readiness wait: turns "navigation finished" into "content is usable".
//!
//! Client-rendered pages keep mutating after the load event, so extraction
//! must not start until the ready locator is present.

use std::time::Duration;

use crate::error::AppError;
use crate::traits::{Probe, Session};

/// Delay between two readiness probes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Block until `locator` is present in the session's document or `timeout` elapses.
pub async fn await_ready<S: Session>(
    session: &mut S,
    locator: &str,
    timeout: Duration,
) -> Result<(), AppError> {
    await_ready_with_interval(session, locator, timeout, DEFAULT_POLL_INTERVAL).await
}

/// Same as [`await_ready`] with an explicit polling interval.
///
/// The timeout is hard: a probe that hangs is abandoned at the deadline.
pub async fn await_ready_with_interval<S: Session>(
    session: &mut S,
    locator: &str,
    timeout: Duration,
    interval: Duration,
) -> Result<(), AppError> {
    let poll = async {
        let mut probes = 0u32;
        loop {
            probes += 1;
            match session.probe(locator).await? {
                Probe::Present => {
                    tracing::trace!(%locator, probes, "Ready locator present");
                    return Ok::<(), AppError>(());
                }
                Probe::Absent => return Err(AppError::ReadyLocatorMissing(locator.to_string())),
                Probe::Pending => tokio::time::sleep(interval).await,
            }
        }
    };

    match tokio::time::timeout(timeout, poll).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Timeout {
            locator: locator.to_string(),
            secs: timeout.as_secs(),
        }),
    }
}
