//! Result and skip-report serialization.

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use clap::ValueEnum;
use quarry_core::error::AppError;
use quarry_core::models::{FieldSpec, ScrapeRecord, SkipEntry};
use quarry_core::traits::RecordSink;
use rust_xlsxwriter::{Format, Workbook, XlsxError};

pub const SKIP_REPORT_FILE: &str = "skipped_report.csv";

/// Output file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Csv,
    Excel,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Excel => "xlsx",
            Self::Json => "json",
        }
    }
}

/// `output_<YYYY-MM-DD_HH-MM-SS>.<ext>`
pub fn output_file_name(format: OutputFormat, at: DateTime<Local>) -> String {
    format!(
        "output_{}.{}",
        at.format("%Y-%m-%d_%H-%M-%S"),
        format.extension()
    )
}

/// Writes scraped records to a timestamped file in `dir`.
#[derive(Debug, Clone)]
pub struct FileSink {
    format: OutputFormat,
    dir: PathBuf,
}

impl FileSink {
    pub fn new(format: OutputFormat, dir: impl Into<PathBuf>) -> Self {
        Self {
            format,
            dir: dir.into(),
        }
    }
}

impl RecordSink for FileSink {
    fn write(&self, records: &[ScrapeRecord], fields: &FieldSpec) -> Result<PathBuf, AppError> {
        let path = self
            .dir
            .join(output_file_name(self.format, Local::now()));

        match self.format {
            OutputFormat::Csv => write_csv(&path, records, fields)?,
            OutputFormat::Excel => write_excel(&path, records, fields)
                .map_err(|e| AppError::OutputError(format!("{}: {e}", path.display())))?,
            OutputFormat::Json => write_json(&path, records)?,
        }

        tracing::info!(
            records = records.len(),
            "Results saved to {}",
            path.display()
        );
        Ok(path)
    }
}

/// Header row: field names in configured order, then `url`.
fn columns(fields: &FieldSpec) -> Vec<&str> {
    fields.names().chain(std::iter::once("url")).collect()
}

/// Cell values in [`columns`] order; absent fields are empty.
fn row<'a>(record: &'a ScrapeRecord, fields: &'a FieldSpec) -> Vec<&'a str> {
    fields
        .names()
        .map(|name| record.get(name).unwrap_or(""))
        .chain(std::iter::once(record.url.as_str()))
        .collect()
}

fn write_csv(path: &Path, records: &[ScrapeRecord], fields: &FieldSpec) -> Result<(), AppError> {
    let err = |e: csv::Error| AppError::OutputError(format!("{}: {e}", path.display()));

    let mut writer = csv::Writer::from_path(path).map_err(err)?;
    writer.write_record(columns(fields)).map_err(err)?;
    for record in records {
        writer.write_record(row(record, fields)).map_err(err)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_json(path: &Path, records: &[ScrapeRecord]) -> Result<(), AppError> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), records)?;
    Ok(())
}

fn write_excel(
    path: &Path,
    records: &[ScrapeRecord],
    fields: &FieldSpec,
) -> Result<(), XlsxError> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();

    for (col, name) in columns(fields).into_iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, name, &header)?;
    }
    for (i, record) in records.iter().enumerate() {
        for (col, value) in row(record, fields).into_iter().enumerate() {
            if !value.is_empty() {
                sheet.write_string(i as u32 + 1, col as u16, value)?;
            }
        }
    }

    workbook.save(path)
}

/// Write `skipped_report.csv` into `dir`.
///
/// Returns `None` and leaves no file behind when nothing was skipped.
pub fn write_skip_report(dir: &Path, skipped: &[SkipEntry]) -> Result<Option<PathBuf>, AppError> {
    if skipped.is_empty() {
        return Ok(None);
    }

    let path = dir.join(SKIP_REPORT_FILE);
    let err = |e: csv::Error| AppError::OutputError(format!("{}: {e}", path.display()));

    let mut writer = csv::Writer::from_path(&path).map_err(err)?;
    for entry in skipped {
        writer.serialize(entry).map_err(err)?;
    }
    writer.flush()?;

    tracing::info!(
        skipped = skipped.len(),
        "Skipped URLs saved to {}",
        path.display()
    );
    Ok(Some(path))
}
