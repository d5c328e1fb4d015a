use crate::error::{QuoteError, Result};
use crate::types::Side;

/// Pairs the bid and ask records of one instant into a spread.
///
/// Feeds publish bid and ask as two records sharing a timestamp. The pair
/// must complete before a new timestamp may start, and each side may be set
/// only once per timestamp.
#[derive(Debug, Clone, Default)]
pub struct QuotePair {
    current_ts: Option<f64>,
    bid: Option<f64>,
    ask: Option<f64>,
}

impl QuotePair {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_ts(&self) -> Option<f64> {
        self.current_ts
    }

    pub fn bid(&self) -> Option<f64> {
        self.bid
    }

    pub fn ask(&self) -> Option<f64> {
        self.ask
    }

    /// Both sides set for the current timestamp
    pub fn is_complete(&self) -> bool {
        self.bid.is_some() && self.ask.is_some()
    }

    /// Exactly one side set for the current timestamp
    pub fn is_partial(&self) -> bool {
        self.bid.is_some() != self.ask.is_some()
    }

    /// Add one quote. Returns the spread when this record completes the pair.
    pub fn add(&mut self, ts: f64, side: Side, price: f64) -> Result<Option<f64>> {
        if !ts.is_finite() {
            return Err(QuoteError::InvalidInput(format!(
                "timestamp must be a finite number, got {}",
                ts
            )));
        }
        if !price.is_finite() {
            return Err(QuoteError::InvalidInput(format!(
                "price must be a finite number, got {}",
                price
            )));
        }

        match self.current_ts {
            Some(current) if current != ts => {
                if self.is_partial() {
                    return Err(QuoteError::OutOfSequence(format!(
                        "received {} for {} before {} was paired",
                        side, ts, current
                    )));
                }
                self.clear_prices();
            }
            Some(_) if self.is_complete() => {
                return Err(QuoteError::OutOfSequence(format!(
                    "received more than one pair of records for {}",
                    ts
                )));
            }
            _ => {}
        }

        self.update_quote(side, price)?;
        self.current_ts = Some(ts);

        match (self.bid, self.ask) {
            (Some(bid), Some(ask)) => Ok(Some(ask - bid)),
            _ => Ok(None),
        }
    }

    fn update_quote(&mut self, side: Side, price: f64) -> Result<()> {
        let slot = match side {
            Side::Bid => &mut self.bid,
            Side::Ask => &mut self.ask,
        };
        if let Some(existing) = slot {
            return Err(QuoteError::OutOfSequence(format!(
                "{} was already set at {:.2}, received {:.2}",
                side, existing, price
            )));
        }
        *slot = Some(price);
        Ok(())
    }

    fn clear_prices(&mut self) {
        self.bid = None;
        self.ask = None;
    }
}
