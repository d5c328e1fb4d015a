use crate::types::{
    CacheSettings, Config, GapMode, TimestampUnit, DEFAULT_MAX_GAP_SECONDS, DEFAULT_PRECISION,
};
use anyhow::{anyhow, bail, Result};
use clap::Parser;
use std::path::PathBuf;

/// Time-weighted average bid/ask spread, one line per whole second
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// File to read, repeatable; stdin when omitted
    #[arg(short = 'f', long = "path")]
    pub paths: Vec<PathBuf>,

    /// Field delimiter for the input stream
    #[arg(short, long, default_value = ",")]
    pub delimiter: String,

    /// Source has a header line to discard
    #[arg(short = 'H', long)]
    pub header: bool,

    #[arg(long, default_value = "micros")]
    pub timestamp_unit: String,

    #[arg(long, default_value_t = DEFAULT_PRECISION)]
    pub precision: usize,

    /// carry: repeat the last average over seconds without data;
    /// per-second: close every elapsed second with the spread in effect
    #[arg(long, default_value = "carry")]
    pub gap_mode: String,

    #[arg(long, default_value_t = DEFAULT_MAX_GAP_SECONDS)]
    pub max_gap_seconds: i64,

    /// Write one output file per input into this directory
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

impl Args {
    pub fn into_config(self) -> Result<Config> {
        let delimiter = parse_delimiter(&self.delimiter)?;

        let timestamp_unit = match self.timestamp_unit.as_str() {
            "s" | "seconds" => TimestampUnit::Seconds,
            "ms" | "millis" => TimestampUnit::Millis,
            "us" | "micros" => TimestampUnit::Micros,
            other => return Err(anyhow!("Invalid timestamp unit: {}", other)),
        };

        let gap_mode = match self.gap_mode.as_str() {
            "carry" => GapMode::CarryForward,
            "per-second" => GapMode::PerSecond,
            other => return Err(anyhow!("Invalid gap mode: {}", other)),
        };

        if self.precision > 15 {
            bail!("Precision {} exceeds what an f64 can carry", self.precision);
        }
        if self.max_gap_seconds < 0 {
            bail!("max-gap-seconds must not be negative");
        }

        Ok(Config {
            inputs: self.paths,
            delimiter,
            has_header: self.header,
            timestamp_unit,
            cache: CacheSettings {
                precision: self.precision,
                gap_mode,
                max_gap_seconds: self.max_gap_seconds,
            },
            output_dir: self.output_dir,
        })
    }
}

/// Single-byte delimiter; `\t` and `tab` spell a tab
pub fn parse_delimiter(s: &str) -> Result<u8> {
    match s {
        "\\t" | "tab" => Ok(b'\t'),
        _ if s.len() == 1 => Ok(s.as_bytes()[0]),
        _ => bail!("Delimiter must be a single byte, got {:?}", s),
    }
}
