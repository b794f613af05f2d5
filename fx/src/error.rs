//! FX arithmetic error types.

use fxflow_common::{CurrencyPair, FxFlowError};
use thiserror::Error;

/// Errors that can occur in rate arithmetic.
#[derive(Debug, Error, PartialEq)]
pub enum FxError {
    /// A USD quote the formula needs is absent from the provider response.
    #[error("Missing USD quote {key} needed for {pair}")]
    MissingQuote { key: String, pair: CurrencyPair },

    /// The divisor of a rate formula is zero.
    #[error("Division by zero computing {0}")]
    DivisionByZero(String),

    /// A rate that must be positive is negative.
    #[error("Rate {rate} is negative for {context}")]
    NegativeRate { rate: f64, context: String },

    /// The rate cannot be represented as an exact decimal.
    #[error("Rate {rate} is not representable for {context}")]
    UnrepresentableRate { rate: f64, context: String },
}

/// Result type for FX arithmetic.
pub type FxResult<T> = Result<T, FxError>;

impl From<FxError> for FxFlowError {
    fn from(err: FxError) -> Self {
        FxFlowError::Arithmetic(err.to_string())
    }
}
