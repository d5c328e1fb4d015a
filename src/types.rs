use crate::error::QuoteError;
use serde::{de, Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Decimal digits kept in weighted averages and printed in the output
pub const DEFAULT_PRECISION: usize = 8;

/// Longest run of empty seconds the cache will materialise or gap-fill (one day)
pub const DEFAULT_MAX_GAP_SECONDS: i64 = 86_400;

/// Round a float to a fixed number of decimal digits
pub fn round_to_digits(value: f64, digits: usize) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10.0_f64.powi(digits as i32);
    (value * factor).round() / factor
}

/// Which side of the book a quote belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Side {
    #[serde(rename = ":b")]
    Bid,
    #[serde(rename = ":a")]
    Ask,
}

impl Side {
    /// Wire token used by the quote feed
    pub fn token(&self) -> &'static str {
        match self {
            Side::Bid => ":b",
            Side::Ask => ":a",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Bid => write!(f, "bid"),
            Side::Ask => write!(f, "ask"),
        }
    }
}

impl FromStr for Side {
    type Err = QuoteError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            ":b" => Ok(Side::Bid),
            ":a" => Ok(Side::Ask),
            other => Err(QuoteError::InvalidInput(format!(
                "side must be :a or :b, not {:?}",
                other
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for Side {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        token.parse().map_err(de::Error::custom)
    }
}

/// One line of the quote feed. The timestamp is still in feed units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub timestamp: f64,
    pub side: Side,
    pub price: f64,
}

/// A completed bid/ask pair, timestamp in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpreadObservation {
    pub timestamp: f64,
    pub spread: f64,
}

/// A closed whole second and its weighted average.
/// `average` is `None` only for the cold-start floor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArchiveEntry {
    pub second: i64,
    pub average: Option<f64>,
}

/// One emitted output row
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SecondSpread {
    pub second: i64,
    pub spread: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampUnit {
    Seconds,
    Millis,
    Micros,
}

impl TimestampUnit {
    pub fn per_second(&self) -> f64 {
        match self {
            TimestampUnit::Seconds => 1.0,
            TimestampUnit::Millis => 1_000.0,
            TimestampUnit::Micros => 1_000_000.0,
        }
    }

    pub fn to_seconds(&self, raw: f64) -> f64 {
        raw / self.per_second()
    }

    /// Whole second expressed as an integer in feed units
    pub fn whole_second(&self, second: i64) -> i64 {
        second * self.per_second() as i64
    }
}

impl fmt::Display for TimestampUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampUnit::Seconds => write!(f, "seconds"),
            TimestampUnit::Millis => write!(f, "millis"),
            TimestampUnit::Micros => write!(f, "micros"),
        }
    }
}

/// How the cache treats a record that lands more than one second past
/// the open window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapMode {
    /// Close one window per crossing and let emission repeat the previous
    /// average over skipped seconds
    CarryForward,
    /// Close every elapsed second with the spread that stayed in effect
    PerSecond,
}

impl fmt::Display for GapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GapMode::CarryForward => write!(f, "carry"),
            GapMode::PerSecond => write!(f, "per-second"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CacheSettings {
    pub precision: usize,
    pub gap_mode: GapMode,
    pub max_gap_seconds: i64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            precision: DEFAULT_PRECISION,
            gap_mode: GapMode::CarryForward,
            max_gap_seconds: DEFAULT_MAX_GAP_SECONDS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub inputs: Vec<PathBuf>, // empty means stdin
    pub delimiter: u8,
    pub has_header: bool,
    pub timestamp_unit: TimestampUnit,
    pub cache: CacheSettings,
    pub output_dir: Option<PathBuf>,
}

impl Config {
    /// Several inputs or an explicit output directory switch to one output
    /// file per input
    pub fn is_batch(&self) -> bool {
        self.output_dir.is_some() || self.inputs.len() > 1
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            inputs: Vec::new(),
            delimiter: b',',
            has_header: false,
            timestamp_unit: TimestampUnit::Micros,
            cache: CacheSettings::default(),
            output_dir: None,
        }
    }
}
