//! CSV and JSON export of reading snapshots.
//!
//! CSV rows use each kind's precision so that a value written out and parsed
//! back with `parse_field` gives the stored (already rounded) value again.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::reading::ReadingSnapshot;
use crate::sensor::{SensorKind, SpecTable};

pub const CSV_TIMESTAMP_HEADER: &str = "Timestamp";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown export format '{0}' (expected csv or json)")]
    UnknownFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            _ => Err(ExportError::UnknownFormat(s.to_string())),
        }
    }
}

/// Serialize `rows` in the requested format.
///
/// # Errors
/// Returns `ExportError::Json` if JSON serialization fails.
pub fn export(
    rows: &[ReadingSnapshot],
    specs: &SpecTable,
    format: ExportFormat,
) -> Result<String, ExportError> {
    match format {
        ExportFormat::Csv => Ok(to_csv(rows, specs)),
        ExportFormat::Json => to_json(rows, false),
    }
}

/// `Timestamp,pH,Temperature,Turbidity,TDS` header plus one line per row.
///
/// Missing values and timestamps are left empty. Lines are joined with `\n`
/// and the output has no trailing newline.
///
/// # Examples
/// ```
/// use aqualink_core::{ReadingSnapshot, SpecTable, to_csv};
///
/// let row = ReadingSnapshot {
///     timestamp: Some("1970-01-01T00:00:00Z".to_string()),
///     ph: Some(7.2),
///     temperature: Some(24.0),
///     turbidity: None,
///     tds: Some(180.0),
/// };
/// let csv = to_csv(&[row], &SpecTable::default());
/// assert_eq!(
///     csv,
///     "Timestamp,pH,Temperature,Turbidity,TDS\n1970-01-01T00:00:00Z,7.2,24.0,,180"
/// );
/// ```
pub fn to_csv(rows: &[ReadingSnapshot], specs: &SpecTable) -> String {
    let mut lines = Vec::with_capacity(rows.len() + 1);
    lines.push(csv_header());
    for row in rows {
        let mut cells = Vec::with_capacity(SensorKind::ALL.len() + 1);
        cells.push(row.timestamp.clone().unwrap_or_default());
        for kind in SensorKind::ALL {
            let cell = row
                .get(kind)
                .map(|value| specs.get(kind).format(value))
                .unwrap_or_default();
            cells.push(cell);
        }
        lines.push(cells.join(","));
    }
    lines.join("\n")
}

fn csv_header() -> String {
    std::iter::once(CSV_TIMESTAMP_HEADER)
        .chain(SensorKind::ALL.iter().map(|kind| kind.label()))
        .collect::<Vec<_>>()
        .join(",")
}

/// JSON array of `{timestamp, ph, temperature, turbidity, tds}` objects.
///
/// # Errors
/// Returns `ExportError::Json` if serialization fails.
pub fn to_json(rows: &[ReadingSnapshot], pretty: bool) -> Result<String, ExportError> {
    let json = if pretty {
        serde_json::to_string_pretty(rows)?
    } else {
        serde_json::to_string(rows)?
    };
    Ok(json)
}
