//! Test utilities: mock implementations of the core traits.
//!
//! Handwritten mocks for dependency injection in unit tests.
//! All mocks use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::AppError;
use crate::models::{ExtractedFields, FieldSpec};
use crate::report::{BatchEvent, BatchReporter};
use crate::traits::{FieldExtractor, Probe, Renderer, Session};

// ---------------------------------------------------------------------------
// MockPage
// ---------------------------------------------------------------------------

/// Scripted behaviour of one navigation.
#[derive(Debug, Clone)]
pub struct MockPage {
    html: String,
    nav_error: Option<String>,
    /// Number of probes answered with `Pending` before the document is inspected.
    rendering_probes: usize,
    static_doc: bool,
    probe_error: Option<String>,
}

impl MockPage {
    /// Navigation succeeds; the locator is present iff the HTML contains it.
    pub fn ready(html: &str) -> Self {
        Self {
            html: html.to_string(),
            nav_error: None,
            rendering_probes: 0,
            static_doc: false,
            probe_error: None,
        }
    }

    /// Navigation fails with the given message.
    pub fn unreachable(message: &str) -> Self {
        Self {
            html: String::new(),
            nav_error: Some(message.to_string()),
            rendering_probes: 0,
            static_doc: false,
            probe_error: None,
        }
    }

    /// Answer `Pending` to the first `probes` readiness checks.
    pub fn rendering_for(mut self, probes: usize) -> Self {
        self.rendering_probes = probes;
        self
    }

    /// Every readiness probe fails with a non-navigation error.
    pub fn failing_probe(mut self, message: &str) -> Self {
        self.probe_error = Some(message.to_string());
        self
    }

    /// Report definitive absence instead of `Pending`.
    pub fn static_doc(mut self) -> Self {
        self.static_doc = true;
        self
    }
}

// ---------------------------------------------------------------------------
// MockRenderer / MockSession
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Recorder {
    opened: usize,
    closed: usize,
    navigations: Vec<String>,
    probes: usize,
    /// Navigation count per URL, used to pick the scripted page.
    visits: HashMap<String, usize>,
}

/// Mock renderer whose sessions replay a per-URL script.
///
/// The n-th navigation to a URL gets the n-th scripted page; once the script
/// is exhausted the last page repeats.
#[derive(Clone, Default)]
pub struct MockRenderer {
    routes: Arc<Mutex<HashMap<String, Vec<MockPage>>>>,
    open_error: Arc<Mutex<Option<String>>>,
    /// Number of sessions that open before `open_error` applies.
    open_budget: Arc<Mutex<Option<usize>>>,
    recorder: Arc<Mutex<Recorder>>,
}

impl MockRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, url: impl Into<String>, pages: impl IntoIterator<Item = MockPage>) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(url.into(), pages.into_iter().collect());
        self
    }

    /// Every `open` fails.
    pub fn fail_open(self, message: &str) -> Self {
        *self.open_error.lock().unwrap() = Some(message.to_string());
        self
    }

    /// The first `ok` opens succeed, later ones fail.
    pub fn fail_open_after(self, ok: usize, message: &str) -> Self {
        *self.open_budget.lock().unwrap() = Some(ok);
        self.fail_open(message)
    }

    pub fn opened(&self) -> usize {
        self.recorder.lock().unwrap().opened
    }

    pub fn closed(&self) -> usize {
        self.recorder.lock().unwrap().closed
    }

    pub fn navigations(&self) -> Vec<String> {
        self.recorder.lock().unwrap().navigations.clone()
    }

    pub fn probe_count(&self) -> usize {
        self.recorder.lock().unwrap().probes
    }
}

impl Renderer for MockRenderer {
    type Session = MockSession;

    async fn open(&self) -> Result<MockSession, AppError> {
        let mut recorder = self.recorder.lock().unwrap();
        if let Some(message) = self.open_error.lock().unwrap().as_ref() {
            let budget = *self.open_budget.lock().unwrap();
            if budget.is_none_or(|ok| recorder.opened >= ok) {
                return Err(AppError::RendererInit(message.clone()));
            }
        }
        recorder.opened += 1;
        Ok(MockSession {
            routes: Arc::clone(&self.routes),
            recorder: Arc::clone(&self.recorder),
            current: None,
        })
    }
}

pub struct MockSession {
    routes: Arc<Mutex<HashMap<String, Vec<MockPage>>>>,
    recorder: Arc<Mutex<Recorder>>,
    current: Option<MockPage>,
}

impl Session for MockSession {
    async fn navigate(&mut self, url: &str) -> Result<(), AppError> {
        let page = {
            let mut recorder = self.recorder.lock().unwrap();
            recorder.navigations.push(url.to_string());
            let visit = recorder.visits.entry(url.to_string()).or_insert(0);
            let n = *visit;
            *visit += 1;

            let routes = self.routes.lock().unwrap();
            routes
                .get(url)
                .and_then(|script| script.get(n).or_else(|| script.last()))
                .cloned()
        };

        self.current = None;
        match page {
            None => Err(AppError::Navigation(format!("no route for {url}"))),
            Some(page) => match &page.nav_error {
                Some(message) => Err(AppError::Navigation(message.clone())),
                None => {
                    self.current = Some(page);
                    Ok(())
                }
            },
        }
    }

    async fn probe(&mut self, locator: &str) -> Result<Probe, AppError> {
        self.recorder.lock().unwrap().probes += 1;
        let page = self
            .current
            .as_mut()
            .ok_or_else(|| AppError::Navigation("no page loaded".into()))?;

        if let Some(message) = &page.probe_error {
            return Err(AppError::Generic(message.clone()));
        }
        if page.rendering_probes > 0 {
            page.rendering_probes -= 1;
            return Ok(Probe::Pending);
        }
        if page.html.contains(locator) {
            Ok(Probe::Present)
        } else if page.static_doc {
            Ok(Probe::Absent)
        } else {
            Ok(Probe::Pending)
        }
    }

    async fn document(&mut self) -> Result<String, AppError> {
        self.current
            .as_ref()
            .map(|p| p.html.clone())
            .ok_or_else(|| AppError::Navigation("no page loaded".into()))
    }

    async fn close(self) {
        self.recorder.lock().unwrap().closed += 1;
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

/// Extractor that reports a field as its locator text when the document
/// contains that text, absent otherwise.
#[derive(Debug, Clone, Copy)]
pub struct MockExtractor;

impl FieldExtractor for MockExtractor {
    fn extract(&self, document: &str, fields: &FieldSpec) -> ExtractedFields {
        fields
            .iter()
            .map(|(name, locator)| {
                let value = document.contains(locator).then(|| locator.to_string());
                (name.to_string(), value)
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// MockReporter
// ---------------------------------------------------------------------------

/// Mock batch reporter that records event labels.
#[derive(Default)]
pub struct MockReporter {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl MockReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded labels, excluding per-run bookkeeping events.
    pub fn labels(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|l| !matches!(l.as_str(), "Started" | "UrlStarted" | "Finished"))
            .cloned()
            .collect()
    }
}

impl BatchReporter for MockReporter {
    fn report(&self, event: BatchEvent<'_>) {
        let label = match &event {
            BatchEvent::Started { .. } => "Started",
            BatchEvent::UrlStarted { .. } => "UrlStarted",
            BatchEvent::AttemptFailed { .. } => "AttemptFailed",
            BatchEvent::UrlScraped { .. } => "UrlScraped",
            BatchEvent::UrlSkipped { .. } => "UrlSkipped",
            BatchEvent::Cancelled { .. } => "Cancelled",
            BatchEvent::Finished { .. } => "Finished",
        };
        self.events.lock().unwrap().push(label.to_string());
    }
}
