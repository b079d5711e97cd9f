//! URL list ingestion from tabular files.

use std::path::Path;

use csv::ReaderBuilder;
use quarry_core::error::AppError;

const URL_COLUMN: &str = "url";

/// Read the `url` column of a `.csv` or `.tsv` file.
///
/// Values are trimmed and blank cells dropped; file order is kept.
pub fn read_urls(path: &Path) -> Result<Vec<String>, AppError> {
    let delimiter = match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("csv") => b',',
        Some("tsv") => b'\t',
        other => {
            return Err(AppError::UnsupportedFormat(format!(
                "input file '{}' has unsupported extension '{}' (expected .csv or .tsv; export spreadsheets to CSV first)",
                path.display(),
                other.unwrap_or("")
            )));
        }
    };

    if !path.is_file() {
        return Err(AppError::InputError(format!(
            "input file not found: {}",
            path.display()
        )));
    }

    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_path(path)
        .map_err(|e| AppError::InputError(format!("cannot open {}: {e}", path.display())))?;

    let headers = reader
        .headers()
        .map_err(|e| AppError::InputError(format!("cannot read header row: {e}")))?;
    let column = headers
        .iter()
        .position(|h| h.trim() == URL_COLUMN)
        .ok_or_else(|| {
            AppError::InputError(format!(
                "no '{URL_COLUMN}' column in {}",
                path.display()
            ))
        })?;

    let mut urls = Vec::new();
    for (line, row) in reader.records().enumerate() {
        let row = row.map_err(|e| {
            AppError::InputError(format!("malformed row {} in {}: {e}", line + 2, path.display()))
        })?;
        if let Some(url) = row.get(column).map(str::trim)
            && !url.is_empty()
        {
            urls.push(url.to_string());
        }
    }

    tracing::debug!(count = urls.len(), "Loaded URLs from {}", path.display());
    Ok(urls)
}
