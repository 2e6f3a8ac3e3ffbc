use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::error::ReportError;
use crate::stats::{DomainStats, ErrorKey};

/// Number of entries kept in the page and error rankings.
pub const DEFAULT_TOP_N: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourCount {
    pub hour: u32,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HourlyDay {
    pub date: NaiveDate,
    pub hours: Vec<HourCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ranked<K> {
    pub key: K,
    pub count: u64,
}

/// Everything a renderer gets to see for one domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportData {
    pub domain: String,
    pub daily_access: Vec<DailyCount>,
    pub hourly_access: Vec<HourlyDay>,
    pub popular_pages: Vec<Ranked<String>>,
    pub top_errors: Vec<Ranked<ErrorKey>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexEntry {
    pub domain: String,
    pub file_name: String,
}

/// The templating collaborator. Implementations must be deterministic for
/// reports to be reproducible.
pub trait Renderer: Send + Sync {
    /// File extension of produced documents, without the dot.
    fn extension(&self) -> &str;

    fn render_report(&self, report: &ReportData) -> Result<String, ReportError>;

    fn render_index(&self, entries: &[IndexEntry]) -> Result<String, ReportError>;
}

/// An assembled, not yet written, domain report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub data: ReportData,
    pub output_path: PathBuf,
}

impl Report {
    pub fn file_name(&self) -> String {
        self.output_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn index_entry(&self) -> IndexEntry {
        IndexEntry {
            domain: self.data.domain.clone(),
            file_name: self.file_name(),
        }
    }
}

pub fn report_path(output_dir: &Path, domain: &str, extension: &str) -> PathBuf {
    output_dir.join(format!("{domain}.{extension}"))
}

/// Orders and truncates `stats` into the view handed to the renderer.
pub fn assemble(
    domain: &str,
    stats: &DomainStats,
    top_n: usize,
    output_dir: &Path,
    extension: &str,
) -> Report {
    let daily_access = stats
        .daily_access
        .iter()
        .map(|(&date, &count)| DailyCount { date, count })
        .collect();

    let hourly_access = stats
        .hourly_access
        .iter()
        .map(|(&date, hours)| HourlyDay {
            date,
            hours: hours
                .iter()
                .map(|(&hour, &count)| HourCount { hour, count })
                .collect(),
        })
        .collect();

    let popular_pages = stats
        .popular_pages
        .most_common(top_n)
        .into_iter()
        .map(|(key, count)| Ranked { key, count })
        .collect();

    let top_errors = stats
        .error_counts
        .most_common(top_n)
        .into_iter()
        .map(|(key, count)| Ranked { key, count })
        .collect();

    Report {
        data: ReportData {
            domain: domain.to_string(),
            daily_access,
            hourly_access,
            popular_pages,
            top_errors,
        },
        output_path: report_path(output_dir, domain, extension),
    }
}

/// Renders `report` and replaces whatever was at its output path.
pub fn write_report(report: &Report, renderer: &dyn Renderer) -> Result<PathBuf, ReportError> {
    let document = renderer.render_report(&report.data)?;
    write_document(&report.output_path, &document)?;
    info!(action = "write", component = "report", domain = report.data.domain, path = ?report.output_path, bytes = document.len(), "Report written");
    Ok(report.output_path.clone())
}

/// Renders the index linking `entries`, in the given order.
pub fn write_index(
    output_dir: &Path,
    entries: &[IndexEntry],
    renderer: &dyn Renderer,
) -> Result<PathBuf, ReportError> {
    let path = output_dir.join(format!("index.{}", renderer.extension()));
    let document = renderer.render_index(entries)?;
    write_document(&path, &document)?;
    info!(action = "write", component = "index", path = ?path, reports = entries.len(), "Index written");
    Ok(path)
}

fn write_document(path: &Path, document: &str) -> Result<(), ReportError> {
    fs::write(path, document).map_err(|source| ReportError::Write {
        path: path.to_path_buf(),
        source,
    })
}
