use std::process;
use std::sync::Arc;

use clap::Parser;
use indicatif::MultiProgress;
use rtauto::cli::Args;
use rtauto::logging::init_logging;
use rtauto::progress::BarProgress;
use rtauto::{Processor, Result, RunSettings};
use staging_monitor::ProgressSink;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let multi = MultiProgress::new();
    init_logging(args.verbose, args.quiet, multi.clone());

    if let Err(e) = run(args, multi).await {
        error!("Application error: {}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run(args: Args, multi: MultiProgress) -> Result<()> {
    let settings = RunSettings::from_args(&args)?;
    let quiet = args.quiet;

    let mut processor = Processor::new(&settings, |total| {
        Arc::new(BarProgress::new(&multi, total, quiet)) as Arc<dyn ProgressSink>
    })?;

    let shutdown = processor.shutdown_token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => shutdown.cancel(),
            Err(e) => warn!(error = %e, "Cannot listen for Ctrl-C"),
        }
    });

    processor.run()?;
    let summary = processor.wait().await?;

    for (name, reason) in &summary.failed {
        error!(base_name = %name, error = %reason, "Photo was not moved");
    }
    let summary = summary.into_result()?;
    info!(photos = summary.finalized, "All photos processed");
    Ok(())
}
