//! FxFlow FX Arithmetic
//!
//! The pure core of the pipeline. No I/O happens here.
//!
//! # Features
//!
//! - Cross-rate derivation from a USD-anchored provider quote set
//! - Minimal currency set for the provider request
//! - Half-up rounding to market precision on exact decimals
//! - Day-over-day deviation
//!
//! # Example
//!
//! ```rust
//! use fxflow_common::CurrencyPair;
//! use fxflow_fx::{cross_rate, format_rate, UsdQuoteSet};
//!
//! let quotes: UsdQuoteSet = [("USDJPY".to_string(), 150.0), ("USDEUR".to_string(), 0.92)]
//!     .into_iter()
//!     .collect();
//! let eurjpy = cross_rate(&quotes, &CurrencyPair::parse("EURJPY").unwrap()).unwrap();
//! assert_eq!(format_rate(eurjpy, 3).unwrap(), 163.043);
//! ```

pub mod cross_rate;
pub mod deviation;
pub mod error;
pub mod normalize;
pub mod quote_set;

pub use cross_rate::{calculate_pairs, cross_rate, derive_raw_record, UsdQuoteSet};
pub use deviation::{deviation_metric, deviation_percent};
pub use error::{FxError, FxResult};
pub use normalize::{decimal_places, format_rate, normalize};
pub use quote_set::{currencies_param, quote_currencies};
