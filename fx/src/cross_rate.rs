//! Derives every requested pair from a USD-anchored quote set.
//!
//! The provider only quotes `USD -> CCY`. For a pair `BASE/QUOTE`:
//!
//! - `USD/QUOTE` is the provider quote itself
//! - `BASE/USD` is the inverse, `1 / USD->BASE`
//! - anything else crosses through USD, `USD->QUOTE / USD->BASE`

use std::collections::BTreeMap;

use fxflow_common::{Currency, CurrencyPair, RawFxRecord, ANCHOR};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{FxError, FxResult};

/// Provider quotes keyed `"USD" + CCY`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsdQuoteSet(BTreeMap<String, f64>);

impl UsdQuoteSet {
    pub fn new(quotes: BTreeMap<String, f64>) -> Self {
        Self(quotes)
    }

    /// Quote key for a currency: `USDJPY` for JPY.
    pub fn key_for(currency: &Currency) -> String {
        format!("{ANCHOR}{currency}")
    }

    /// Price of one USD in `currency`.
    pub fn usd_rate(&self, currency: &Currency, pair: &CurrencyPair) -> FxResult<f64> {
        let key = Self::key_for(currency);
        self.0
            .get(&key)
            .copied()
            .ok_or_else(|| FxError::MissingQuote {
                key,
                pair: pair.clone(),
            })
    }

    pub fn insert(&mut self, key: impl Into<String>, rate: f64) {
        self.0.insert(key.into(), rate);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, f64)> for UsdQuoteSet {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Rate for a single pair.
pub fn cross_rate(quotes: &UsdQuoteSet, pair: &CurrencyPair) -> FxResult<f64> {
    if pair.is_usd_base() {
        return quotes.usd_rate(pair.quote(), pair);
    }

    let base = quotes.usd_rate(pair.base(), pair)?;
    if base == 0.0 {
        return Err(FxError::DivisionByZero(pair.code()));
    }

    if pair.is_usd_quote() {
        Ok(1.0 / base)
    } else {
        Ok(quotes.usd_rate(pair.quote(), pair)? / base)
    }
}

/// Rates for every requested pair. Fails on the first pair that cannot be derived.
pub fn calculate_pairs(
    quotes: &UsdQuoteSet,
    pairs: &[CurrencyPair],
) -> FxResult<BTreeMap<CurrencyPair, f64>> {
    let mut results = BTreeMap::new();
    for pair in pairs {
        let rate = cross_rate(quotes, pair)?;
        debug!(pair = %pair, rate, "Derived pair rate");
        results.insert(pair.clone(), rate);
    }
    Ok(results)
}

/// Build the raw snapshot, passing the provider timestamp through unchanged.
pub fn derive_raw_record(
    timestamp: Value,
    quotes: &UsdQuoteSet,
    pairs: &[CurrencyPair],
) -> FxResult<RawFxRecord> {
    Ok(RawFxRecord::new(timestamp, calculate_pairs(quotes, pairs)?))
}
