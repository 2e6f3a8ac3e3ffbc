use anyhow::{Context, Result};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info, warn};

use crate::aggregate::{self, Aggregator};
use crate::cancel::CancelToken;
use crate::config::Config;
use crate::error::{Cancelled, InputError, ReportError};
use crate::report::{self, IndexEntry, Renderer};
use crate::sources::{self, LogInventory, LogSource};
use crate::utils::format_number;

/// What happened to one domain during a run.
#[derive(Debug)]
pub struct DomainSummary {
    pub domain: String,
    pub report: Result<PathBuf, ReportError>,
    /// Present only when the report was written.
    pub index: Option<IndexEntry>,
    pub sources_read: usize,
    pub sources_failed: usize,
    pub lines: u64,
    pub access: u64,
    pub errors: u64,
}

#[derive(Debug)]
pub struct RunSummary {
    pub output_dir: PathBuf,
    pub index_path: PathBuf,
    pub domains: Vec<DomainSummary>,
}

impl RunSummary {
    pub fn reports_written(&self) -> usize {
        self.domains.iter().filter(|d| d.report.is_ok()).count()
    }

    pub fn reports_failed(&self) -> usize {
        self.domains.len() - self.reports_written()
    }
}

/// Aggregates every domain under `config.log_dir` and writes one report per
/// domain plus an index.
///
/// Per-source and per-report failures are logged and recorded in the summary.
/// Errors are returned only when the output directory or the index cannot be
/// written, or when `cancel` fires.
pub fn generate_reports(
    config: &Config,
    renderer: &dyn Renderer,
    cancel: &CancelToken,
) -> Result<RunSummary> {
    let total_start_time = Instant::now();
    info!(action = "start", component = "run", log_dir = ?config.log_dir, output_dir = ?config.output_dir, "Starting log statistics run");

    fs::create_dir_all(&config.output_dir).with_context(|| {
        format!("Failed to create output directory {:?}", config.output_dir)
    })?;

    let inventory = match sources::enumerate(&config.log_dir, cancel) {
        Ok(inventory) => inventory,
        Err(InputError::Cancelled(cancelled)) => return Err(cancelled.into()),
        Err(InputError::Source(e)) => {
            warn!(action = "scan", component = "run", error = %e, "Log directory unavailable, reporting empty statistics");
            LogInventory::default()
        }
    };

    let aggregator = Aggregator::new(config.formats.clone())
        .with_error_keys(config.error_keys)
        .with_hourly(config.hourly)
        .with_cancel(cancel.clone());

    let worker_count = config.worker_count();
    info!(
        action = "configure",
        component = "run",
        worker_count,
        domain_count = inventory.domains.len() + 1,
        "Using workers for processing"
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(worker_count)
        .build()
        .context("Failed to build worker pool")?;

    let groups = inventory.groups();
    let domains = pool
        .install(|| {
            groups
                .par_iter()
                .map(|(group, sources)| {
                    process_domain(group.name(), sources, &aggregator, config, renderer)
                })
                .collect::<Result<Vec<_>, Cancelled>>()
        })
        .inspect_err(|_| {
            warn!(action = "cancel", component = "run", "Run cancelled, index not written")
        })?;

    let entries: Vec<IndexEntry> = domains.iter().filter_map(|d| d.index.clone()).collect();
    let index_path = report::write_index(&config.output_dir, &entries, renderer)
        .context("Failed to write report index")?;

    let summary = RunSummary {
        output_dir: config.output_dir.clone(),
        index_path,
        domains,
    };
    info!(
        action = "complete",
        component = "run",
        reports_written = summary.reports_written(),
        reports_failed = summary.reports_failed(),
        duration_ms = total_start_time.elapsed().as_millis(),
        "Run completed"
    );
    Ok(summary)
}

fn process_domain(
    domain: &str,
    sources: &[LogSource],
    aggregator: &Aggregator,
    config: &Config,
    renderer: &dyn Renderer,
) -> Result<DomainSummary, Cancelled> {
    let started = Instant::now();
    let outcome = aggregator.aggregate(sources)?;
    aggregate::log_outcome(domain, &outcome, started);

    let assembled = report::assemble(
        domain,
        &outcome.stats,
        config.top_n,
        &config.output_dir,
        renderer.extension(),
    );
    let written = report::write_report(&assembled, renderer);
    if let Err(e) = &written {
        error!(action = "write", component = "report", domain, error = %e, "Failed to write report");
    }
    let index = written.is_ok().then(|| assembled.index_entry());

    Ok(DomainSummary {
        domain: domain.to_string(),
        report: written,
        index,
        sources_read: outcome.sources_read,
        sources_failed: outcome.failed_sources.len(),
        lines: outcome.stats.lines_read,
        access: outcome.stats.total_access(),
        errors: outcome.stats.total_errors(),
    })
}

pub fn print_run_summary(summary: &RunSummary) {
    println!("\n--- Log Statistics ---");
    println!("Output directory: {}", display(&summary.output_dir));
    println!("Index: {}", display(&summary.index_path));
    println!(
        "Reports written: {} ({} failed)",
        format_number(summary.reports_written() as u64),
        format_number(summary.reports_failed() as u64)
    );

    for domain in &summary.domains {
        let status = match &domain.report {
            Ok(_) => String::new(),
            Err(e) => format!(" [report failed: {}]", e),
        };
        let skipped = if domain.sources_failed > 0 {
            format!(", {} unreadable", domain.sources_failed)
        } else {
            String::new()
        };
        println!(
            "- {}: {} requests, {} errors, {} lines from {} sources{}{}",
            domain.domain,
            format_number(domain.access),
            format_number(domain.errors),
            format_number(domain.lines),
            domain.sources_read,
            skipped,
            status
        );
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}
