//! Endless quote feed for trying the aggregator:
//!
//! generate-quotes | spread-series

use spread_series::sources::synthetic::{format_record, SyntheticParams, SyntheticSource};

use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use std::io;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about = "Print an endless synthetic bid/ask feed", long_about = None)]
struct Args {
    #[arg(long)]
    seed: Option<u64>,

    /// Stop after this many bid/ask pairs
    #[arg(long)]
    count: Option<u64>,

    /// Advance a simulated clock instead of sleeping
    #[arg(long)]
    simulated: bool,

    /// First timestamp of the simulated clock; defaults to now
    #[arg(long)]
    start_micros: Option<i64>,

    #[arg(long, default_value = "0.0001")]
    min_spread: f64,

    #[arg(long, default_value = "0.01")]
    max_spread: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();
    let params = SyntheticParams {
        seed: args.seed,
        min_spread: args.min_spread,
        max_spread: args.max_spread,
        ..SyntheticParams::default()
    };
    let start = args
        .start_micros
        .unwrap_or_else(|| Utc::now().timestamp_micros());
    let mut source = SyntheticSource::new(params, start)?;

    info!(
        "Generating quotes ({})",
        if args.simulated { "simulated clock" } else { "real time" }
    );

    let mut stdout = tokio::io::stdout();
    let mut pairs = 0u64;

    loop {
        if args.count.is_some_and(|count| pairs >= count) {
            break;
        }

        let lines = if args.simulated {
            let ask = source.next().transpose()?;
            let bid = source.next().transpose()?;
            match (ask, bid) {
                (Some(ask), Some(bid)) => format_record(&ask) + &format_record(&bid),
                _ => break,
            }
        } else {
            let pause = Duration::from_secs_f64(source.next_pause());
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                _ = tokio::time::sleep(pause) => {}
            }
            let now = Utc::now().timestamp_micros() as f64;
            source
                .quote_pair(now)
                .iter()
                .map(format_record)
                .collect::<String>()
        };

        if let Err(e) = write_flush(&mut stdout, lines.as_bytes()).await {
            if e.kind() == io::ErrorKind::BrokenPipe {
                break;
            }
            return Err(e.into());
        }
        pairs += 1;
    }

    info!("Generated {} quote pairs", pairs);
    Ok(())
}

async fn write_flush(stdout: &mut tokio::io::Stdout, bytes: &[u8]) -> io::Result<()> {
    stdout.write_all(bytes).await?;
    stdout.flush().await
}
