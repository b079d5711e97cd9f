use std::future::Future;
use std::path::PathBuf;

use crate::error::AppError;
use crate::models::{ExtractedFields, FieldSpec, ScrapeRecord};

/// Result of checking the current document for a locator once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// A matching node exists.
    Present,
    /// No match yet; the page may still be rendering.
    Pending,
    /// No match, and the document will not change (static renderers).
    Absent,
}

/// Starts renderer sessions.
///
/// A session owns an external resource (a browser process, a connection
/// pool) and must be handed back through [`Session::close`] exactly once.
pub trait Renderer: Send + Sync {
    type Session: Session;

    fn open(&self) -> impl Future<Output = Result<Self::Session, AppError>> + Send;
}

/// A single-threaded rendering session, reused across many URLs.
pub trait Session: Send {
    /// Navigate to `url` and wait for the navigation itself to complete.
    fn navigate(&mut self, url: &str) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Check once whether `locator` matches a node in the current document.
    fn probe(&mut self, locator: &str) -> impl Future<Output = Result<Probe, AppError>> + Send;

    /// The fully rendered document (HTML) of the current page.
    fn document(&mut self) -> impl Future<Output = Result<String, AppError>> + Send;

    /// Release the session. Consumes it so it cannot be used or closed twice.
    fn close(self) -> impl Future<Output = ()> + Send;
}

/// Resolves a [`FieldSpec`] against a rendered document.
///
/// Never fails: a locator that matches nothing yields an absent value.
pub trait FieldExtractor: Send + Sync {
    fn extract(&self, document: &str, fields: &FieldSpec) -> ExtractedFields;
}

/// Destination for the scraped records (file, spreadsheet, database, ...).
pub trait RecordSink {
    /// Persist `records`; returns a description of where they went.
    fn write(&self, records: &[ScrapeRecord], fields: &FieldSpec) -> Result<PathBuf, AppError>;
}
