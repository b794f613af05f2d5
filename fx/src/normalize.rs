//! Rounding to market precision and session tagging.

use std::str::FromStr;

use fxflow_common::{CurrencyPair, EffectiveDate, NormalizedFxRecord};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{FxError, FxResult};

/// Decimal places for JPY-quoted pairs.
pub const JPY_DECIMALS: u32 = 3;

/// Decimal places for every other pair.
pub const DEFAULT_DECIMALS: u32 = 5;

/// Market precision for a pair: JPY pairs quote two places fewer.
pub fn decimal_places(pair: &CurrencyPair) -> u32 {
    if pair.quote().code() == "JPY" {
        JPY_DECIMALS
    } else {
        DEFAULT_DECIMALS
    }
}

/// Round half-up (away from zero) to `decimals` places.
///
/// The float is first rendered as its shortest round-trip decimal string so
/// that `1.2345` rounds to `1.235` even though its binary value sits just
/// below the midpoint.
pub fn format_rate(rate: f64, decimals: u32) -> FxResult<f64> {
    let unrepresentable = || FxError::UnrepresentableRate {
        rate,
        context: format!("{decimals} decimal places"),
    };

    if !rate.is_finite() {
        return Err(unrepresentable());
    }

    let exact = Decimal::from_str(&rate.to_string()).map_err(|_| unrepresentable())?;
    let rounded = exact.round_dp_with_strategy(decimals, RoundingStrategy::MidpointAwayFromZero);

    rounded.to_string().parse::<f64>().map_err(|_| unrepresentable())
}

/// Normalized record for one pair on one effective date.
pub fn normalize(
    pair: &CurrencyPair,
    rate: f64,
    date: &EffectiveDate,
) -> FxResult<NormalizedFxRecord> {
    let rate = format_rate(rate, decimal_places(pair)).map_err(|err| match err {
        FxError::UnrepresentableRate { rate, .. } => FxError::UnrepresentableRate {
            rate,
            context: pair.code(),
        },
        other => other,
    })?;

    Ok(NormalizedFxRecord {
        rate,
        date: date.iso(),
        market_open: date.is_market_open(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(code: &str) -> CurrencyPair {
        CurrencyPair::parse(code).unwrap()
    }

    #[test]
    fn test_decimal_places() {
        assert_eq!(decimal_places(&pair("USDJPY")), 3);
        assert_eq!(decimal_places(&pair("GBPJPY")), 3);
        assert_eq!(decimal_places(&pair("EURUSD")), 5);
        assert_eq!(decimal_places(&pair("JPYUSD")), 5);
    }

    #[test]
    fn test_half_rounds_up() {
        assert_eq!(format_rate(1.23455, 3).unwrap(), 1.235);
        assert_eq!(format_rate(1.234565, 5).unwrap(), 1.23457);
    }

    #[test]
    fn test_binary_midpoint_artifact_avoided() {
        // 1.2345 is stored as 1.23449999... in binary.
        assert_eq!(format_rate(1.2345, 3).unwrap(), 1.235);
        assert_eq!(format_rate(2.675, 2).unwrap(), 2.68);
    }

    #[test]
    fn test_negative_rounds_away_from_zero() {
        assert_eq!(format_rate(-1.2345, 3).unwrap(), -1.235);
    }

    #[test]
    fn test_rounds_down_below_midpoint() {
        assert_eq!(format_rate(150.12345, 3).unwrap(), 150.123);
        assert_eq!(format_rate(0.920001, 5).unwrap(), 0.92);
    }

    #[test]
    fn test_non_finite_rejected() {
        assert!(format_rate(f64::NAN, 5).is_err());
        assert!(format_rate(f64::INFINITY, 5).is_err());
        assert!(format_rate(1e300, 5).is_err());
    }

    #[test]
    fn test_normalize_weekday_and_weekend() {
        let friday = EffectiveDate::from_run_date("2024-03-02T00:00:00Z").unwrap();
        let record = normalize(&pair("USDJPY"), 150.12351, &friday).unwrap();
        assert_eq!(record.rate, 150.124);
        assert_eq!(record.date, "2024-03-01");
        assert!(record.market_open);

        let saturday = EffectiveDate::from_run_date("2024-03-03T00:00:00Z").unwrap();
        let record = normalize(&pair("EURUSD"), 1.0843251, &saturday).unwrap();
        assert_eq!(record.rate, 1.08433);
        assert!(!record.market_open);
    }
}
