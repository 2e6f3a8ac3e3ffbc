use std::io::BufRead;
use std::path::PathBuf;
use std::time::Instant;

use encoding_rs::Encoding;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::cancel::CancelToken;
use crate::error::{Cancelled, InputError, SourceError};
use crate::formats::DateFormats;
use crate::sources::LogSource;
use crate::stats::{DomainStats, ErrorKey, ErrorKeyMode};

/// Lines read between two cancellation checks.
pub const LINE_BATCH: u64 = 1024;

static GET_REQUEST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""GET (.*?) HTTP"#).expect("GET request pattern is valid"));

/// Target of the first quoted `GET` request in the line.
pub fn requested_page(line: &str) -> Option<&str> {
    GET_REQUEST
        .captures(line)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Text after the last `"] "`, or the whole line when there is none.
pub fn error_message(line: &str) -> &str {
    line.rsplit_once("] ")
        .map_or(line, |(_, message)| message)
        .trim()
}

/// Result of aggregating every source of one domain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateOutcome {
    pub stats: DomainStats,
    pub sources_read: usize,
    pub failed_sources: Vec<PathBuf>,
}

/// Turns log sources into [`DomainStats`].
#[derive(Debug, Clone)]
pub struct Aggregator {
    formats: DateFormats,
    error_keys: ErrorKeyMode,
    hourly: bool,
    cancel: CancelToken,
}

impl Aggregator {
    pub fn new(formats: DateFormats) -> Self {
        Self {
            formats,
            error_keys: ErrorKeyMode::default(),
            hourly: true,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_error_keys(mut self, mode: ErrorKeyMode) -> Self {
        self.error_keys = mode;
        self
    }

    pub fn with_hourly(mut self, hourly: bool) -> Self {
        self.hourly = hourly;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Aggregates `sources` into one total. Unreadable sources are logged and
    /// skipped; only cancellation aborts the pass.
    pub fn aggregate(&self, sources: &[LogSource]) -> Result<AggregateOutcome, Cancelled> {
        let mut outcome = AggregateOutcome::default();

        for source in sources {
            self.cancel.check()?;

            match self.aggregate_source(source) {
                Ok(stats) => {
                    outcome.stats.merge(stats);
                    outcome.sources_read += 1;
                }
                Err(InputError::Cancelled(cancelled)) => return Err(cancelled),
                Err(InputError::Source(e)) => {
                    warn!(action = "read", component = "aggregation", path = ?source.path, error = %e, "Skipping unreadable log source");
                    outcome.failed_sources.push(source.path.clone());
                }
            }
        }

        Ok(outcome)
    }

    /// Drains one source. Nothing is returned unless the whole file was read.
    pub fn aggregate_source(&self, source: &LogSource) -> Result<DomainStats, InputError> {
        let start_time = Instant::now();
        let reader = source.open()?;
        let stats = self
            .aggregate_reader(reader, source.encoding, source.is_error_log())
            .map_err(|e| match e {
                ReadFailure::Io { lines, source: io } => InputError::Source(SourceError::Read {
                    path: source.path.clone(),
                    lines,
                    source: io,
                }),
                ReadFailure::Cancelled(c) => InputError::Cancelled(c),
            })?;

        debug!(
            action = "complete",
            component = "aggregation",
            path = ?source.path,
            encoding = source.encoding.name(),
            lines = stats.lines_read,
            access = stats.total_access(),
            duration_ms = start_time.elapsed().as_millis(),
            "Log source aggregated"
        );
        Ok(stats)
    }

    fn aggregate_reader(
        &self,
        mut reader: impl BufRead,
        encoding: &'static Encoding,
        error_log: bool,
    ) -> Result<DomainStats, ReadFailure> {
        let mut stats = DomainStats::default();
        let mut buf = Vec::new();

        loop {
            if stats.lines_read % LINE_BATCH == 0 {
                self.cancel.check().map_err(ReadFailure::Cancelled)?;
            }

            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .map_err(|source| ReadFailure::Io {
                    lines: stats.lines_read,
                    source,
                })?;
            if read == 0 {
                break;
            }

            let (decoded, _) = encoding.decode_without_bom_handling(trim_line_ending(&buf));
            let line: &str = if stats.lines_read == 0 {
                decoded.trim_start_matches('\u{feff}')
            } else {
                &decoded
            };
            stats.lines_read += 1;
            self.process_line(line, error_log, &mut stats);
        }

        Ok(stats)
    }

    /// Applies every metric to one line. Each metric that cannot be extracted
    /// is skipped on its own.
    pub fn process_line(&self, line: &str, error_log: bool, stats: &mut DomainStats) {
        if let Some(at) = self.formats.access.resolve(line) {
            stats.record_access(&at, self.hourly);
        }

        if error_log {
            if let Some(at) = self.formats.error.resolve(line) {
                let message = error_message(line);
                if !message.is_empty() {
                    stats.record_error(ErrorKey::new(self.error_keys, at, message));
                }
            }
        }

        if let Some(page) = requested_page(line) {
            stats.record_page(page);
        }
    }
}

enum ReadFailure {
    Io { lines: u64, source: std::io::Error },
    Cancelled(Cancelled),
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Logs a one-line summary of a finished domain pass.
pub fn log_outcome(domain: &str, outcome: &AggregateOutcome, started: Instant) {
    info!(
        action = "complete",
        component = "domain_aggregation",
        domain,
        sources_read = outcome.sources_read,
        sources_failed = outcome.failed_sources.len(),
        lines = outcome.stats.lines_read,
        access = outcome.stats.total_access(),
        pages = outcome.stats.popular_pages.len(),
        errors = outcome.stats.total_errors(),
        duration_ms = started.elapsed().as_millis(),
        "Domain aggregated"
    );
}
