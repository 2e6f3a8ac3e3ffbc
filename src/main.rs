use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use tracing::{error, warn};

use logstats::formats::DEFAULT_FORMATS_FILE;
use logstats::run::print_run_summary;
use logstats::utils::{setup_logging, validate_args};
use logstats::{generate_reports, init_default_formats, Args, CancelToken, Config};

fn main() -> Result<()> {
    let args = Args::parse();
    setup_logging(args.verbose);
    validate_args(&args)?;

    if args.init {
        init_default_formats(Path::new(DEFAULT_FORMATS_FILE))?;
        println!("Created {} with default date formats", DEFAULT_FORMATS_FILE);
        return Ok(());
    }

    let config = Config::from_args(&args)?;

    let cancel = match config.deadline {
        Some(deadline) => CancelToken::with_deadline(deadline),
        None => CancelToken::new(),
    };
    let interrupt = cancel.clone();
    ctrlc::set_handler(move || {
        warn!(action = "cancel", component = "signal", "Interrupt received, stopping");
        interrupt.cancel();
    })
    .context("Failed to install interrupt handler")?;

    let renderer = config.report_format.renderer();
    match generate_reports(&config, renderer.as_ref(), &cancel) {
        Ok(summary) => {
            print_run_summary(&summary);
            Ok(())
        }
        Err(e) => {
            error!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
