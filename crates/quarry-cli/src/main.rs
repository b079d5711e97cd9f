mod input;
mod output;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use quarry_client::{HttpRenderer, SelectorExtractor};
use quarry_core::config::{DEFAULT_CONFIG_FILE, RendererKind, RunConfig};
use quarry_core::error::AppError;
use quarry_core::traits::{RecordSink, Renderer};
use quarry_core::{BatchOutcome, BatchRunner, TracingBatchReporter};

use crate::output::{FileSink, OutputFormat};

#[derive(Parser, Debug)]
#[command(
    name = "quarry",
    version,
    about = "Batch extractor for JavaScript-rendered pages"
)]
struct Cli {
    /// CSV or TSV file with a `url` column
    input: PathBuf,

    /// Output file format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Csv)]
    output: OutputFormat,

    /// Only process the first N URLs
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    limit: Option<u64>,

    /// Path to the JSON configuration file
    #[arg(short, long, env = "QUARRY_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Directory for the results file and skip report
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let (config, defaulted) = load_config(&cli.config)?;

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if defaulted {
        tracing::info!(
            "No configuration file at {}, using defaults",
            cli.config.display()
        );
    }

    SelectorExtractor::validate(&config.fields, &config.ready_locator)?;

    let mut urls = input::read_urls(&cli.input)
        .with_context(|| format!("Failed to read URLs from {}", cli.input.display()))?;
    if let Some(limit) = cli.limit {
        urls.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
    }
    tracing::info!(
        urls = urls.len(),
        format = ?cli.output,
        "Loaded {} URLs from {}",
        urls.len(),
        cli.input.display()
    );

    let cancel = CancellationToken::new();
    let watcher = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight URLs");
            watcher.cancel();
        }
    });

    let outcome = match config.renderer.kind {
        RendererKind::Chromium => run_chromium(&urls, &config, &cancel).await?,
        RendererKind::Http => {
            run_batch(HttpRenderer::new(&config.renderer), &urls, &config, &cancel).await?
        }
    };

    write_results(&outcome, &config, cli.output, &cli.out_dir)?;

    if outcome.cancelled {
        anyhow::bail!(
            "Run cancelled: {} URL(s) not processed",
            outcome
                .skipped
                .iter()
                .filter(|s| s.reason == quarry_core::batch::CANCELLED_REASON)
                .count()
        );
    }

    Ok(())
}

/// Load the run configuration. The flag is set when no file exists and the
/// defaults apply; logging is not installed yet, so the caller reports it.
fn load_config(path: &Path) -> Result<(RunConfig, bool)> {
    let defaulted = !path.is_file();
    let config = RunConfig::load(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))?;
    Ok((config, defaulted))
}

#[cfg(feature = "browser")]
async fn run_chromium(
    urls: &[String],
    config: &RunConfig,
    cancel: &CancellationToken,
) -> Result<BatchOutcome> {
    let renderer = quarry_client::ChromiumRenderer::new(&config.renderer);
    run_batch(renderer, urls, config, cancel).await
}

#[cfg(not(feature = "browser"))]
async fn run_chromium(
    _urls: &[String],
    _config: &RunConfig,
    _cancel: &CancellationToken,
) -> Result<BatchOutcome> {
    Err(AppError::ConfigError(
        "renderer \"chromium\" requires the `browser` feature; rebuild with it or set \"renderer\": \"http\"".into(),
    )
    .into())
}

async fn run_batch<R: Renderer>(
    renderer: R,
    urls: &[String],
    config: &RunConfig,
    cancel: &CancellationToken,
) -> Result<BatchOutcome> {
    let runner = BatchRunner::new(renderer, SelectorExtractor::new());
    let outcome = runner
        .run(urls, config, cancel, &TracingBatchReporter)
        .await
        .context("Scraping run aborted")?;
    Ok(outcome)
}

fn write_results(
    outcome: &BatchOutcome,
    config: &RunConfig,
    format: OutputFormat,
    out_dir: &Path,
) -> Result<(), AppError> {
    FileSink::new(format, out_dir).write(&outcome.records, &config.fields)?;
    output::write_skip_report(out_dir, &outcome.skipped)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["quarry", "urls.csv"]).unwrap();
        assert_eq!(cli.input, PathBuf::from("urls.csv"));
        assert_eq!(cli.output, OutputFormat::Csv);
        assert_eq!(cli.limit, None);
        assert_eq!(cli.out_dir, PathBuf::from("."));
    }

    #[test]
    fn test_output_formats() {
        for (flag, expected) in [
            ("csv", OutputFormat::Csv),
            ("excel", OutputFormat::Excel),
            ("json", OutputFormat::Json),
        ] {
            let cli = Cli::try_parse_from(["quarry", "urls.csv", "--output", flag]).unwrap();
            assert_eq!(cli.output, expected);
        }
        assert!(Cli::try_parse_from(["quarry", "urls.csv", "--output", "xml"]).is_err());
    }

    #[test]
    fn test_limit_must_be_positive() {
        let cli = Cli::try_parse_from(["quarry", "urls.csv", "--limit", "5"]).unwrap();
        assert_eq!(cli.limit, Some(5));
        assert!(Cli::try_parse_from(["quarry", "urls.csv", "--limit", "0"]).is_err());
        assert!(Cli::try_parse_from(["quarry", "urls.csv", "--limit", "-1"]).is_err());
    }

    #[test]
    fn test_input_is_required() {
        assert!(Cli::try_parse_from(["quarry"]).is_err());
    }

    #[test]
    fn test_missing_config_file_is_reported_as_defaulted() {
        let dir = tempfile::TempDir::new().unwrap();

        let (config, defaulted) = load_config(&dir.path().join("config.json")).unwrap();
        assert!(defaulted);
        assert_eq!(config.retry.max_attempts, RunConfig::default().retry.max_attempts);

        let path = dir.path().join("shop.json");
        std::fs::write(&path, r#"{"fields": {"title": "h1"}, "retries": 5}"#).unwrap();
        let (config, defaulted) = load_config(&path).unwrap();
        assert!(!defaulted);
        assert_eq!(config.retry.max_attempts, 5);
    }

    #[test]
    fn test_write_results_skip_report_only_when_needed() {
        use quarry_core::models::{RunStats, ScrapeRecord, SkipEntry};

        let dir = tempfile::TempDir::new().unwrap();
        let config = RunConfig::default();
        let now = chrono::Utc::now();
        let mut outcome = BatchOutcome {
            records: vec![ScrapeRecord::new(
                "https://a.example",
                vec![("title".into(), Some("A".into()))],
            )],
            skipped: Vec::new(),
            stats: RunStats {
                started_at: now,
                finished_at: now,
                elapsed: std::time::Duration::ZERO,
                total: 1,
                succeeded: 1,
                skipped: 0,
            },
            cancelled: false,
        };

        write_results(&outcome, &config, OutputFormat::Json, dir.path()).unwrap();
        assert!(!dir.path().join(output::SKIP_REPORT_FILE).exists());

        outcome.skipped.push(SkipEntry::new("https://b.example", "HTTP 404"));
        write_results(&outcome, &config, OutputFormat::Csv, dir.path()).unwrap();
        assert!(dir.path().join(output::SKIP_REPORT_FILE).exists());
    }
}
