//! Object storage partition keys.

use crate::currency::CurrencyPair;
use crate::time::EffectiveDate;

/// Prefix for raw provider snapshots.
pub const RAW_PREFIX: &str = "raw/";

/// Prefix for normalized per-pair records.
pub const PROCESSED_PREFIX: &str = "processed/";

/// `raw/year=YYYY/month=MM/day=DD/rates.json`
pub fn raw_key(date: &EffectiveDate) -> String {
    format!(
        "{RAW_PREFIX}year={}/month={}/day={}/rates.json",
        date.year(),
        date.month(),
        date.day()
    )
}

/// `processed/pair=PAIR/year=YYYY/month=MM/day=DD/data.json`
pub fn processed_key(pair: &CurrencyPair, date: &EffectiveDate) -> String {
    processed_key_parts(&pair.code(), &date.year(), &date.month(), &date.day())
}

/// Build a processed key from already-rendered partition values.
pub fn processed_key_parts(pair: &str, year: &str, month: &str, day: &str) -> String {
    format!("{PROCESSED_PREFIX}pair={pair}/year={year}/month={month}/day={day}/data.json")
}
