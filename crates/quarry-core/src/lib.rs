pub mod batch;
pub mod config;
pub mod error;
pub mod models;
pub mod report;
pub mod retry;
pub mod traits;
pub mod wait;

#[cfg(test)]
pub(crate) mod testutil;

pub use batch::{BatchOutcome, BatchRunner};
pub use config::{LogLevel, RendererKind, RendererOptions, RunConfig};
pub use error::AppError;
pub use models::{ExtractedFields, FieldSpec, RunStats, ScrapeRecord, SkipEntry};
pub use report::{BatchEvent, BatchReporter, TracingBatchReporter};
pub use retry::{RetryPolicy, UrlOutcome};
pub use traits::{FieldExtractor, Probe, RecordSink, Renderer, Session};
