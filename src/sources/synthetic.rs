use crate::error::QuoteError;
use crate::types::{round_to_digits, QuoteRecord, Side};
use rand::{rngs::StdRng, Rng, SeedableRng};
use rand_distr::{Distribution, Pareto};
use std::collections::VecDeque;

/// Price digits written by the generator
const PRICE_DIGITS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticParams {
    pub seed: Option<u64>,
    pub min_spread: f64,
    pub max_spread: f64,
    /// Shape of the Pareto draw behind the pause between instants
    pub pause_shape: f64,
    /// Chance of an extra multi-second stall before an instant
    pub stall_probability: f64,
    pub stall_seconds: (f64, f64),
}

impl Default for SyntheticParams {
    fn default() -> Self {
        Self {
            seed: None,
            min_spread: 0.0001,
            max_spread: 0.0100,
            pause_shape: 5.0,
            stall_probability: 0.02,
            stall_seconds: (1.0, 3.0),
        }
    }
}

/// Endless quote feed: an ask and a bid per instant, instants separated
/// by short, skewed pauses with the occasional stall of a few seconds.
///
/// As an iterator it runs on a simulated clock in microseconds. Callers
/// pacing in real time use `next_pause` and `quote_pair` directly.
pub struct SyntheticSource {
    params: SyntheticParams,
    rng: StdRng,
    pause: Pareto<f64>,
    clock_us: f64,
    pending: VecDeque<QuoteRecord>,
}

impl SyntheticSource {
    pub fn new(params: SyntheticParams, start_us: i64) -> Result<Self, QuoteError> {
        if !(params.min_spread >= 0.0 && params.min_spread <= params.max_spread) {
            return Err(QuoteError::InvalidInput(format!(
                "spread range {}..{} is empty",
                params.min_spread, params.max_spread
            )));
        }
        let (stall_min, stall_max) = params.stall_seconds;
        if !(stall_min >= 0.0 && stall_min < stall_max) {
            return Err(QuoteError::InvalidInput(format!(
                "stall range {}..{} is empty",
                stall_min, stall_max
            )));
        }
        if !(0.0..=1.0).contains(&params.stall_probability) {
            return Err(QuoteError::InvalidInput(format!(
                "stall probability {} is outside 0..1",
                params.stall_probability
            )));
        }
        let pause = Pareto::new(1.0, params.pause_shape)
            .map_err(|e| QuoteError::InvalidInput(format!("pause shape: {}", e)))?;

        let rng = match params.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            params,
            rng,
            pause,
            clock_us: start_us as f64,
            pending: VecDeque::with_capacity(2),
        })
    }

    /// Seconds to wait before the next instant, skewed toward small fractions
    pub fn next_pause(&mut self) -> f64 {
        let mut pause = self.pause.sample(&mut self.rng) / 10.0;
        if self.rng.gen::<f64>() < self.params.stall_probability {
            let (low, high) = self.params.stall_seconds;
            pause += self.rng.gen_range(low..high);
        }
        pause
    }

    /// Ask and bid for one instant, ask first as the feed publishes them
    pub fn quote_pair(&mut self, timestamp_us: f64) -> [QuoteRecord; 2] {
        let bid = round_to_digits(1.0 + self.rng.gen::<f64>(), PRICE_DIGITS);
        let spread = self
            .rng
            .gen_range(self.params.min_spread..=self.params.max_spread);
        let ask = round_to_digits(bid + spread, PRICE_DIGITS);

        [
            QuoteRecord {
                timestamp: timestamp_us,
                side: Side::Ask,
                price: ask,
            },
            QuoteRecord {
                timestamp: timestamp_us,
                side: Side::Bid,
                price: bid,
            },
        ]
    }
}

impl Iterator for SyntheticSource {
    type Item = Result<QuoteRecord, QuoteError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pending.is_empty() {
            let pause_us = (self.next_pause() * 1_000_000.0).round().max(1.0);
            self.clock_us += pause_us;
            let pair = self.quote_pair(self.clock_us);
            self.pending.extend(pair);
        }
        self.pending.pop_front().map(Ok)
    }
}

/// Render a record in the feed's line format
pub fn format_record(record: &QuoteRecord) -> String {
    format!(
        "{:.0},{},{:.*}\n",
        record.timestamp,
        record.side.token(),
        PRICE_DIGITS,
        record.price
    )
}
