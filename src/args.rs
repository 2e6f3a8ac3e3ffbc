use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "logstats",
    about = "Aggregate web server access and error logs into per-domain reports",
    version,
    long_about = None
)]
pub struct Args {
    /// Directory containing the access and error logs
    #[arg(short, long, env = "LOGSTATS_LOG_DIR", default_value = "/var/log/apache2")]
    pub log_dir: PathBuf,

    /// Directory the reports are written to
    #[arg(short, long, env = "LOGSTATS_OUTPUT_DIR", default_value = "/tmp/stats")]
    pub output_dir: PathBuf,

    /// Path to custom date format file
    #[arg(short, long, env = "LOGSTATS_FORMATS")]
    pub formats: Option<PathBuf>,

    /// How error lines are grouped
    #[arg(long, value_enum, default_value_t = ErrorKeysArg::TimestampMessage)]
    pub error_keys: ErrorKeysArg,

    /// Skip the hourly breakdown
    #[arg(long)]
    pub no_hourly: bool,

    /// Number of entries in the page and error rankings
    #[arg(short, long, default_value_t = crate::report::DEFAULT_TOP_N)]
    pub top: usize,

    /// Number of worker threads
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Give up after this many seconds
    #[arg(long)]
    pub deadline: Option<u64>,

    /// Output document format
    #[arg(long, value_enum, default_value_t = FormatArg::Html)]
    pub format: FormatArg,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Initialize date_formats.txt with default formats
    #[arg(long)]
    pub init: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKeysArg {
    Message,
    TimestampMessage,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatArg {
    Html,
    Json,
}
