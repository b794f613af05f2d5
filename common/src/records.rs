//! Records persisted between stages.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

use crate::currency::CurrencyPair;
use crate::error::{FxFlowError, Result};

/// Fields a raw snapshot must carry.
pub const REQUIRED_RAW_FIELDS: [&str; 2] = ["timestamp", "quotes"];

/// One raw snapshot per effective date, written by Ingest and read by Transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFxRecord {
    /// Provider timestamp, passed through untouched.
    pub timestamp: Value,
    /// Rate per requested pair.
    pub quotes: BTreeMap<CurrencyPair, f64>,
}

impl RawFxRecord {
    pub fn new(timestamp: Value, quotes: BTreeMap<CurrencyPair, f64>) -> Self {
        Self { timestamp, quotes }
    }

    /// Validate an untyped payload and convert it.
    ///
    /// `timestamp` and `quotes` must both be present, and `quotes` must hold a
    /// numeric entry for every pair in `pairs`. Other entries are kept when
    /// they are numeric quotes for a valid pair and skipped otherwise.
    pub fn validate(payload: &Value, pairs: &[CurrencyPair]) -> Result<Self> {
        for field in REQUIRED_RAW_FIELDS {
            if payload.get(field).is_none() {
                return Err(FxFlowError::Validation(format!(
                    "Missing required field: {field}"
                )));
            }
        }

        let quotes = payload["quotes"].as_object().ok_or_else(|| {
            FxFlowError::Validation("Field quotes is not an object".to_string())
        })?;

        for pair in pairs {
            match quotes.get(&pair.code()) {
                Some(v) if v.is_number() => {}
                Some(_) => {
                    return Err(FxFlowError::Validation(format!(
                        "FX quote for {pair} is not numeric"
                    )))
                }
                None => {
                    return Err(FxFlowError::Validation(format!(
                        "Missing FX quote for: {pair}"
                    )))
                }
            }
        }

        // Requested pairs are checked above; anything else that is not a
        // numeric quote for a valid pair is dropped.
        let mut parsed = BTreeMap::new();
        for (code, value) in quotes {
            match (CurrencyPair::parse(code), value.as_f64()) {
                (Ok(pair), Some(rate)) => {
                    parsed.insert(pair, rate);
                }
                _ => warn!(key = %code, "Skipping unusable quote entry"),
            }
        }

        Ok(Self {
            timestamp: payload["timestamp"].clone(),
            quotes: parsed,
        })
    }
}

/// One normalized record per (pair, effective date).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedFxRecord {
    /// Rate rounded to the instrument's convention.
    pub rate: f64,
    /// `YYYY-MM-DD`.
    pub date: String,
    /// Weekday flag.
    pub market_open: bool,
}

/// Day-over-day deviation for one pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviationMetric {
    pub pair: CurrencyPair,
    pub deviation_percent: f64,
}

impl DeviationMetric {
    /// Metric name published to the sink: `{PAIR}-Deviation`.
    pub fn metric_name(&self) -> String {
        format!("{}-Deviation", self.pair)
    }
}
