use crate::cache::TimeCache;
use crate::error::QuoteError;
use crate::output::{create_file_writer, unique_output_paths, OutputWriter};
use crate::pairing::QuotePair;
use crate::sources::open_input;
use crate::types::{CacheSettings, Config, QuoteRecord, SecondSpread, TimestampUnit};
use anyhow::{Context, Result};
use chrono::DateTime;
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Observations left in the open second when the stream ended
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DroppedTail {
    pub records: usize,
    pub first_timestamp: f64, // seconds
    pub last_timestamp: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub records: u64,
    pub rejected: u64,
    pub spreads: u64,
    pub seconds_emitted: u64,
    pub first_second: Option<i64>,
    pub last_second: Option<i64>,
    pub dropped: Option<DroppedTail>,
}

/// One stream's pipeline: quote pairing feeding the time cache
pub struct Aggregator {
    timestamp_unit: TimestampUnit,
    pair: QuotePair,
    cache: TimeCache,
    summary: RunSummary,
}

impl Aggregator {
    pub fn new(config: &Config) -> Self {
        Self::with_settings(config.timestamp_unit, config.cache)
    }

    pub fn with_settings(timestamp_unit: TimestampUnit, settings: CacheSettings) -> Self {
        Self {
            timestamp_unit,
            pair: QuotePair::new(),
            cache: TimeCache::with_settings(settings),
            summary: RunSummary::default(),
        }
    }

    pub fn cache(&self) -> &TimeCache {
        &self.cache
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Push one record. Returns the seconds closed by it, usually none.
    ///
    /// Records breaking the bid/ask protocol are logged and skipped;
    /// invalid input stops the stream.
    pub fn push(&mut self, quote: &QuoteRecord) -> Result<Vec<SecondSpread>, QuoteError> {
        self.summary.records += 1;
        let ts = self.timestamp_unit.to_seconds(quote.timestamp);

        let spread = match self.pair.add(ts, quote.side, quote.price) {
            Ok(Some(spread)) => spread,
            Ok(None) => return Ok(Vec::new()),
            Err(QuoteError::OutOfSequence(reason)) => {
                warn!(
                    "input error: {},{},{}: {}",
                    quote.timestamp,
                    quote.side.token(),
                    quote.price,
                    reason
                );
                self.summary.rejected += 1;
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        self.summary.spreads += 1;
        if !self.cache.add(ts, spread)? {
            return Ok(Vec::new());
        }

        let rows = self.cache.emit();
        if let Some(first) = rows.first() {
            self.summary.first_second.get_or_insert(first.second);
        }
        if let Some(last) = rows.last() {
            self.summary.last_second = Some(last.second);
        }
        self.summary.seconds_emitted += rows.len() as u64;
        Ok(rows)
    }

    pub fn process_quotes(&mut self, quotes: &[QuoteRecord]) -> Result<Vec<SecondSpread>, QuoteError> {
        let mut rows = Vec::new();
        for quote in quotes {
            rows.extend(self.push(quote)?);
        }
        Ok(rows)
    }

    /// End the stream. Observations of the still-open second are reported,
    /// not emitted: no boundary closed them.
    pub fn finalize(mut self) -> RunSummary {
        let pending = self.cache.pending();
        if let (Some(first), Some(last)) = (pending.first(), pending.last()) {
            info!(
                "dropped {} records for incomplete full-second at the end of the stream between {} and {}",
                pending.len(),
                describe_seconds(first.timestamp),
                describe_seconds(last.timestamp)
            );
            self.summary.dropped = Some(DroppedTail {
                records: pending.len(),
                first_timestamp: first.timestamp,
                last_timestamp: last.timestamp,
            });
        }
        self.summary
    }
}

fn describe_seconds(ts: f64) -> String {
    let micros = (ts * 1_000_000.0).round() as i64;
    match DateTime::from_timestamp_micros(micros) {
        Some(dt) => format!("{:.2} ({})", ts, dt.format("%Y-%m-%d %H:%M:%S%.6f")),
        None => format!("{:.2}", ts),
    }
}

/// Drive a record stream through one aggregator, writing every closed
/// second as soon as it is known.
pub fn run_stream<I, W>(
    mut aggregator: Aggregator,
    records: I,
    writer: &mut OutputWriter<W>,
) -> Result<RunSummary>
where
    I: IntoIterator<Item = Result<QuoteRecord, QuoteError>>,
    W: Write,
{
    for (index, record) in records.into_iter().enumerate() {
        let record = record.with_context(|| format!("record {}", index + 1))?;
        let rows = aggregator
            .push(&record)
            .with_context(|| format!("record {}", index + 1))?;
        writer.write_batch(&rows)?;
    }
    Ok(aggregator.finalize())
}

/// Result of one input in batch mode
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub input: PathBuf,
    pub output: PathBuf,
    pub summary: RunSummary,
}

/// Batch mode: every input gets its own aggregator and output file.
/// Inputs are processed in parallel, each stream stays sequential.
pub fn aggregate_files(config: &Config, output_dir: &Path) -> Result<Vec<FileReport>> {
    let pb = ProgressBar::new(config.inputs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("#>-"),
    );

    // inputs sharing a stem must not write the same file
    let outputs = unique_output_paths(&config.inputs, output_dir);

    let reports = config
        .inputs
        .par_iter()
        .zip(outputs.par_iter())
        .map(|(input, output)| {
            let report = aggregate_file(config, input, output)
                .with_context(|| format!("Failed to aggregate {}", input.display()));
            pb.inc(1);
            report
        })
        .collect::<Result<Vec<_>>>();

    pb.finish_with_message("done");
    let reports = reports?;

    info!("Aggregated {} inputs into {}", reports.len(), output_dir.display());
    Ok(reports)
}

fn aggregate_file(config: &Config, input: &Path, output: &Path) -> Result<FileReport> {
    let records = open_input(Some(input), config)?;
    let mut writer = create_file_writer(output, config.cache.precision, config.timestamp_unit)?;

    let summary = run_stream(Aggregator::new(config), records, &mut writer)?;
    info!(
        "{}: {} seconds from {} records ({} rejected)",
        input.display(),
        summary.seconds_emitted,
        summary.records,
        summary.rejected
    );

    Ok(FileReport {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        summary,
    })
}
