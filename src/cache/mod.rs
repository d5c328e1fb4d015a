use crate::error::{QuoteError, Result};
use crate::types::{
    round_to_digits, ArchiveEntry, CacheSettings, GapMode, SecondSpread, SpreadObservation,
};
use tracing::{debug, warn};

/// Time-weighted averaging of spreads over whole seconds.
///
/// Keeps two ledgers: `tmp_cache` holds the observations of the open
/// second, `archive` holds closed seconds waiting to be emitted. Both are
/// trimmed as data is promoted and emitted, so an infinite stream runs in
/// bounded memory.
#[derive(Debug, Clone)]
pub struct TimeCache {
    settings: CacheSettings,
    archive: Vec<ArchiveEntry>,
    last_spread: Option<f64>,
    tmp_cache: Vec<SpreadObservation>,
}

impl Default for TimeCache {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeCache {
    pub fn new() -> Self {
        Self::with_settings(CacheSettings::default())
    }

    pub fn with_settings(settings: CacheSettings) -> Self {
        Self {
            settings,
            archive: Vec::new(),
            last_spread: None,
            tmp_cache: Vec::new(),
        }
    }

    pub fn settings(&self) -> &CacheSettings {
        &self.settings
    }

    pub fn archive(&self) -> &[ArchiveEntry] {
        &self.archive
    }

    /// Observations of the open second, not yet part of any average
    pub fn pending(&self) -> &[SpreadObservation] {
        &self.tmp_cache
    }

    pub fn last_spread(&self) -> Option<f64> {
        self.last_spread
    }

    /// Add a spread observed at `ts` seconds. Returns `true` when a whole
    /// second was closed and `emit` has rows to hand out.
    pub fn add(&mut self, ts: f64, spread: f64) -> Result<bool> {
        if !ts.is_finite() {
            return Err(QuoteError::InvalidInput(format!(
                "time cache needs a finite timestamp, got {}",
                ts
            )));
        }
        if !spread.is_finite() {
            return Err(QuoteError::InvalidInput(format!(
                "time cache needs a finite spread, got {}",
                spread
            )));
        }

        let Some(anchor) = self.archive.last().copied() else {
            self.cold_start(ts, spread);
            return Ok(false);
        };

        let duration = ts - anchor.second as f64;
        if duration > 1.0 {
            self.close_window(anchor.second, ts);
            self.tmp_cache.clear();
            self.tmp_cache.push(SpreadObservation {
                timestamp: ts,
                spread,
            });
            return Ok(true);
        }

        self.tmp_cache.push(SpreadObservation {
            timestamp: ts,
            spread,
        });
        Ok(false)
    }

    /// Hand out one row per whole second closed since the last call, then
    /// keep only the newest archive entry as the continuation anchor.
    ///
    /// Seconds between two archive entries repeat the earlier entry's
    /// average, except when more than `max_gap_seconds` of them lie in
    /// between: those interior seconds are skipped with a warning and the
    /// output jumps straight to the later entry.
    pub fn emit(&mut self) -> Vec<SecondSpread> {
        if self.archive.len() < 2 {
            return Vec::new();
        }

        let mut rows = Vec::new();
        for pair in self.archive.windows(2) {
            let (prev, entry) = (pair[0], pair[1]);
            let gap = entry.second - prev.second - 1;

            if let Some(average) = prev.average {
                if gap > self.settings.max_gap_seconds {
                    warn!(
                        "Skipping {} empty seconds between {} and {}",
                        gap, prev.second, entry.second
                    );
                } else {
                    rows.extend((prev.second + 1..entry.second).map(|second| SecondSpread {
                        second,
                        spread: average,
                    }));
                }
            }

            if let Some(average) = entry.average {
                rows.push(SecondSpread {
                    second: entry.second,
                    spread: average,
                });
            }
        }

        let anchor = self.archive[self.archive.len() - 1];
        self.archive.clear();
        self.archive.push(anchor);

        rows
    }

    // Seed the archive with the whole second before the first record.
    fn cold_start(&mut self, ts: f64, spread: f64) {
        self.archive.push(ArchiveEntry {
            second: ts.floor() as i64,
            average: None,
        });
        self.tmp_cache.push(SpreadObservation {
            timestamp: ts,
            spread,
        });
    }

    fn close_window(&mut self, boundary: i64, ts: f64) {
        let average = self.weighted_average(boundary);
        let carried = self.tmp_cache.last().map(|obs| obs.spread);
        let target = ts.floor() as i64;

        match self.settings.gap_mode {
            GapMode::CarryForward => {
                self.archive.push(ArchiveEntry {
                    second: target,
                    average,
                });
            }
            GapMode::PerSecond => {
                self.archive.push(ArchiveEntry {
                    second: boundary + 1,
                    average,
                });

                let idle = target - (boundary + 1);
                let filler = carried.map(|spread| round_to_digits(spread, self.settings.precision));
                if idle > self.settings.max_gap_seconds {
                    warn!(
                        "Gap of {} seconds after {} exceeds limit of {}, not filling",
                        idle,
                        boundary + 1,
                        self.settings.max_gap_seconds
                    );
                    self.archive.push(ArchiveEntry {
                        second: target,
                        average: filler,
                    });
                } else {
                    self.archive
                        .extend((boundary + 2..=target).map(|second| ArchiveEntry {
                            second,
                            average: filler,
                        }));
                }
            }
        }

        debug!(
            "Closed second {} with average {:?} from {} observations",
            boundary + 1,
            average,
            self.tmp_cache.len()
        );

        self.last_spread = carried;
    }

    /// Spreads and how long each was in effect inside `[boundary, boundary + 1]`.
    ///
    /// The stretch before the first observation is weighted by the spread
    /// carried from the previous window, and left out entirely when there
    /// is none (the very first window of the stream).
    fn time_weights(&self, boundary: i64) -> Vec<(f64, f64)> {
        let mut weights = Vec::with_capacity(self.tmp_cache.len() + 1);
        let mut cursor = boundary as f64;
        let mut active = self.last_spread;

        for obs in &self.tmp_cache {
            if let Some(spread) = active {
                weights.push((spread, obs.timestamp - cursor));
            }
            cursor = obs.timestamp;
            active = Some(obs.spread);
        }

        if let Some(spread) = active {
            weights.push((spread, boundary as f64 + 1.0 - cursor));
        }

        weights
    }

    fn weighted_average(&self, boundary: i64) -> Option<f64> {
        let weights = self.time_weights(boundary);
        let total: f64 = weights.iter().map(|(_, duration)| duration).sum();
        if total <= 0.0 {
            return None;
        }
        let weighted: f64 = weights
            .iter()
            .map(|(spread, duration)| spread * duration)
            .sum();
        Some(round_to_digits(weighted / total, self.settings.precision))
    }
}
