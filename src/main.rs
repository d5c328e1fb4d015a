use spread_series::aggregation::{aggregate_files, run_stream, Aggregator};
use spread_series::cli::Args;
use spread_series::display::display_reports;
use spread_series::output::OutputWriter;
use spread_series::sources::open_input;

use anyhow::Result;
use clap::Parser;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr, stdout carries the series
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();
    let config = args.into_config()?;

    info!("Starting spread aggregator with config: {:?}", config);

    if config.is_batch() {
        let num_threads = std::thread::available_parallelism()
            .map(|x| x.get())
            .unwrap_or(4)
            .min(config.inputs.len().max(1));
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("rayon-worker-{}", i))
            .build_global()?;
        info!("Initialized Rayon thread pool with {} threads", num_threads);

        let output_dir = config
            .output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("./output"));
        info!("Output directory: {}", output_dir.display());

        let reports =
            tokio::task::spawn_blocking(move || aggregate_files(&config, &output_dir)).await??;
        display_reports(&reports);
        return Ok(());
    }

    // The stream loop is synchronous and may never end
    let summary = tokio::task::spawn_blocking(move || {
        let records = open_input(config.inputs.first().map(PathBuf::as_path), &config)?;
        let stdout = io::stdout();
        let mut writer = OutputWriter::new(
            BufWriter::new(stdout.lock()),
            config.cache.precision,
            config.timestamp_unit,
        );
        run_stream(Aggregator::new(&config), records, &mut writer)
    })
    .await??;

    info!(
        "Stream ended: {} records, {} rejected, {} seconds written",
        summary.records, summary.rejected, summary.seconds_emitted
    );
    Ok(())
}
