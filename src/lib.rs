pub mod aggregation;
pub mod cache;
pub mod cli;
pub mod display;
pub mod error;
pub mod output;
pub mod pairing;
pub mod sources;
pub mod types;

// Re-exports for library users
pub use aggregation::{aggregate_files, run_stream, Aggregator, DroppedTail, FileReport, RunSummary};
pub use cache::TimeCache;
pub use error::QuoteError;
pub use output::OutputWriter;
pub use pairing::QuotePair;
pub use sources::{open_input, CsvFeed, QuoteStream, SyntheticParams, SyntheticSource};
pub use types::{
    round_to_digits, ArchiveEntry, CacheSettings, Config, GapMode, QuoteRecord, SecondSpread,
    Side, SpreadObservation, TimestampUnit, DEFAULT_MAX_GAP_SECONDS, DEFAULT_PRECISION,
};
