pub mod feed;
pub mod synthetic;

use crate::error::QuoteError;
use crate::types::{Config, QuoteRecord};
use anyhow::{Context, Result};
use std::fs::File;
use std::io;
use std::path::Path;

pub use feed::CsvFeed;
pub use synthetic::{SyntheticParams, SyntheticSource};

/// A finite or endless sequence of quote records. Iteration ending is the
/// clean end-of-input signal.
pub type QuoteStream = Box<dyn Iterator<Item = Result<QuoteRecord, QuoteError>> + Send>;

/// Open a file, or stdin when `path` is `None`, as a quote stream
pub fn open_input(path: Option<&Path>, config: &Config) -> Result<QuoteStream> {
    match path {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open {}", path.display()))?;
            Ok(Box::new(CsvFeed::new(file, config.delimiter, config.has_header)))
        }
        None => Ok(Box::new(CsvFeed::new(
            io::stdin(),
            config.delimiter,
            config.has_header,
        ))),
    }
}
