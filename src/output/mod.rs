use crate::types::{SecondSpread, TimestampUnit};
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes emitted seconds as `<timestamp>,<average>` lines
pub struct OutputWriter<W: Write> {
    sink: W,
    precision: usize,
    unit: TimestampUnit,
    written: u64,
}

impl<W: Write> OutputWriter<W> {
    pub fn new(sink: W, precision: usize, unit: TimestampUnit) -> Self {
        Self {
            sink,
            precision,
            unit,
            written: 0,
        }
    }

    /// Write a batch and flush, so a downstream reader sees each second as
    /// soon as it closes
    pub fn write_batch(&mut self, rows: &[SecondSpread]) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }
        for row in rows {
            let line = self.format_line(row);
            self.sink.write_all(line.as_bytes())?;
        }
        self.sink.flush()?;
        self.written += rows.len() as u64;
        Ok(())
    }

    pub fn format_line(&self, row: &SecondSpread) -> String {
        format!(
            "{},{:.*}\n",
            self.unit.whole_second(row.second),
            self.precision,
            row.spread
        )
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}

/// Create the output file of a batch input, and its directory
pub fn create_file_writer(
    output_path: &Path,
    precision: usize,
    unit: TimestampUnit,
) -> Result<OutputWriter<BufWriter<File>>> {
    if let Some(dir) = output_path.parent() {
        fs::create_dir_all(dir)?;
    }
    let file = File::create(output_path)
        .with_context(|| format!("Failed to create {}", output_path.display()))?;
    Ok(OutputWriter::new(BufWriter::new(file), precision, unit))
}

fn input_stem(input: &Path) -> String {
    input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "quotes".to_string())
}

/// Output file name for an input: `<output_dir>/<input stem>.twa.csv`
pub fn output_path_for(input: &Path, output_dir: &Path) -> PathBuf {
    output_dir.join(format!("{}.twa.csv", input_stem(input)))
}

/// Output paths for a batch, one per input and never shared.
///
/// Inputs whose stems collide get a `-2`, `-3`, ... suffix in input order.
pub fn unique_output_paths(inputs: &[PathBuf], output_dir: &Path) -> Vec<PathBuf> {
    let mut taken = HashSet::new();
    inputs
        .iter()
        .map(|input| {
            let mut path = output_path_for(input, output_dir);
            let mut suffix = 2;
            while !taken.insert(path.clone()) {
                path = output_dir.join(format!("{}-{}.twa.csv", input_stem(input), suffix));
                suffix += 1;
            }
            path
        })
        .collect()
}
