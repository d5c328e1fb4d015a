use thiserror::Error;

/// Errors raised while pairing quotes and averaging spreads
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QuoteError {
    /// A value of the wrong shape reached the core: non-finite number,
    /// unknown side token, unparsable field. Fatal to the stream.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The feed broke the bid/ask pairing protocol. The offending record
    /// can be skipped.
    #[error("out of sequence: {0}")]
    OutOfSequence(String),
}

pub type Result<T> = std::result::Result<T, QuoteError>;
