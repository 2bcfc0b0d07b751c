//! CSV output of report rows.

use crate::models::ReportRow;
use crate::month::Month;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

/// Flat CSV record; list fields are joined with the configured delimiter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsvReportRecord {
    pub contract: String,
    pub cpcode: u64,
    pub name: String,
    #[serde(rename = "groupPath")]
    pub group_path: String,
    #[serde(rename = "repGroups")]
    pub rep_groups: String,
    pub hits: Option<u64>,
    pub gb: Option<f64>,
}

impl CsvReportRecord {
    pub fn from_row(row: &ReportRow, delimiter: &str) -> Self {
        Self {
            contract: row.contract.clone().unwrap_or_default(),
            cpcode: row.cpcode,
            name: row.name.clone(),
            group_path: row.group_path.join(delimiter),
            rep_groups: row.rep_groups.join(delimiter),
            hits: row.hits,
            gb: row.bytes,
        }
    }
}

pub fn report_file_name(month: Month) -> String {
    format!("traffic_{month}.csv")
}

pub const CSV_HEADER: [&str; 7] = [
    "contract",
    "cpcode",
    "name",
    "groupPath",
    "repGroups",
    "hits",
    "gb",
];

/// Write rows as CSV. The header is written even when there are no rows.
pub fn write_csv<W: Write>(writer: W, rows: &[ReportRow], delimiter: &str) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(CSV_HEADER)
        .context("Failed to write CSV header")?;
    for row in rows {
        wtr.serialize(CsvReportRecord::from_row(row, delimiter))
            .with_context(|| format!("Failed to write CSV row for CP code {}", row.cpcode))?;
    }
    wtr.flush().context("Failed to flush CSV output")?;
    Ok(())
}

/// Write the report next to its final location and rename it into place, so
/// a failed write never leaves a partial report behind.
pub fn write_report_file(
    directory: &Path,
    month: Month,
    rows: &[ReportRow],
    delimiter: &str,
) -> Result<PathBuf> {
    fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create output directory: {}", directory.display()))?;

    let path = directory.join(report_file_name(month));
    let partial = directory.join(format!("{}.partial", report_file_name(month)));

    let file = fs::File::create(&partial)
        .with_context(|| format!("Failed to create {}", partial.display()))?;
    if let Err(e) = write_csv(file, rows, delimiter) {
        let _ = fs::remove_file(&partial);
        return Err(e);
    }
    fs::rename(&partial, &path)
        .with_context(|| format!("Failed to move report into place: {}", path.display()))?;

    info!(path = %path.display(), rows = rows.len(), "Wrote report");
    Ok(path)
}
