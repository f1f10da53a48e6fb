mod cli;
mod error;

use std::process;

use clap::Parser;
use segloop_engine::{
    HttpSegmentFetcher, RotationController, RotationService, SegloopConfig, create_client,
};
use tracing::{Instrument, Level, error, info, info_span};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use crate::{
    cli::Args,
    error::{AppError, Result},
};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    if let Err(e) = run(args).await {
        error!("Application error: {}", e);
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = args.resolve_config()?;
    config.validate()?;

    let output_dir = config.output_dir();
    tokio::fs::create_dir_all(&output_dir)
        .await
        .map_err(|source| AppError::OutputDir {
            path: output_dir.clone(),
            source,
        })?;

    let span = info_span!("channel", name = %config.channel);
    relay(config).instrument(span).await
}

async fn relay(config: SegloopConfig) -> Result<()> {
    info!(
        url = %config.url,
        dir = %config.output_dir().display(),
        capacity = config.capacity,
        segment_duration_s = config.segment_duration.as_secs_f64(),
        "Starting relay"
    );

    let client = create_client(&config)?;
    let fetcher = HttpSegmentFetcher::new(client, &config)?;
    let mut controller = RotationController::from_config(fetcher, &config);

    let report = controller.preload().await;
    if !report.published {
        error!("Initial playlist could not be written, retrying on the next rotation");
    }

    let handle = RotationService::new(controller, config.segment_duration).start();

    tokio::signal::ctrl_c().await.map_err(AppError::Signal)?;
    info!("Shutdown requested, waiting for the current rotation");
    handle.shutdown().await;
    Ok(())
}

fn init_logging(verbose: bool, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(Level::INFO.into())
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(verbose))
        .init();
}
