use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;

use crate::args::{Args, ErrorKeysArg, FormatArg};
use crate::formats::{self, DateFormats};
use crate::render::{HtmlRenderer, JsonRenderer};
use crate::report::{Renderer, DEFAULT_TOP_N};
use crate::stats::ErrorKeyMode;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Html,
    Json,
}

impl ReportFormat {
    pub fn renderer(self) -> Box<dyn Renderer> {
        match self {
            ReportFormat::Html => Box::new(HtmlRenderer),
            ReportFormat::Json => Box::new(JsonRenderer),
        }
    }
}

/// Everything a run needs, independent of how it was supplied.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_dir: PathBuf,
    pub output_dir: PathBuf,
    pub formats: DateFormats,
    pub error_keys: ErrorKeyMode,
    pub hourly: bool,
    pub top_n: usize,
    pub workers: Option<usize>,
    pub deadline: Option<Duration>,
    pub report_format: ReportFormat,
}

impl Config {
    /// Defaults with the embedded date formats.
    pub fn new(log_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            log_dir: log_dir.into(),
            output_dir: output_dir.into(),
            formats: DateFormats::embedded()?,
            error_keys: ErrorKeyMode::default(),
            hourly: true,
            top_n: DEFAULT_TOP_N,
            workers: None,
            deadline: None,
            report_format: ReportFormat::default(),
        })
    }

    /// Resolves command-line arguments, loading the date format file.
    pub fn from_args(args: &Args) -> Result<Self> {
        Ok(Self {
            log_dir: args.log_dir.clone(),
            output_dir: args.output_dir.clone(),
            formats: formats::load_date_formats(args.formats.as_deref())?,
            error_keys: match args.error_keys {
                ErrorKeysArg::Message => ErrorKeyMode::Message,
                ErrorKeysArg::TimestampMessage => ErrorKeyMode::TimestampMessage,
            },
            hourly: !args.no_hourly,
            top_n: args.top,
            workers: args.workers,
            deadline: args.deadline.map(Duration::from_secs),
            report_format: match args.format {
                FormatArg::Html => ReportFormat::Html,
                FormatArg::Json => ReportFormat::Json,
            },
        })
    }

    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            let cpu_count = num_cpus::get();
            std::cmp::min(cpu_count, 8)
        })
    }
}
