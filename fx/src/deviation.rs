//! Day-over-day deviation.

use fxflow_common::{CurrencyPair, DeviationMetric};

use crate::error::{FxError, FxResult};

/// Absolute percentage change `|today - yesterday| / yesterday * 100`.
///
/// `yesterday` must be positive, so the result is never negative.
pub fn deviation_percent(today: f64, yesterday: f64) -> FxResult<f64> {
    for rate in [today, yesterday] {
        if !rate.is_finite() {
            return Err(FxError::UnrepresentableRate {
                rate,
                context: "deviation".to_string(),
            });
        }
    }

    if yesterday == 0.0 {
        return Err(FxError::DivisionByZero(
            "deviation against a zero previous rate".to_string(),
        ));
    }
    if yesterday < 0.0 {
        return Err(FxError::NegativeRate {
            rate: yesterday,
            context: "deviation".to_string(),
        });
    }

    Ok(((today - yesterday).abs() / yesterday) * 100.0)
}

/// Deviation metric for a pair.
pub fn deviation_metric(
    pair: &CurrencyPair,
    today: f64,
    yesterday: f64,
) -> FxResult<DeviationMetric> {
    Ok(DeviationMetric {
        pair: pair.clone(),
        deviation_percent: deviation_percent(today, yesterday)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_increase() {
        assert!(close(deviation_percent(110.5, 100.0).unwrap(), 10.5));
    }

    #[test]
    fn test_decrease_uses_yesterday_denominator() {
        let d = deviation_percent(100.0, 110.5).unwrap();
        assert!(close(d, 10.5 / 110.5 * 100.0));
        assert!(d > 9.50 && d < 9.51);
    }

    #[test]
    fn test_unchanged() {
        assert_eq!(deviation_percent(1.08431, 1.08431).unwrap(), 0.0);
    }

    #[test]
    fn test_zero_yesterday() {
        assert!(matches!(
            deviation_percent(1.0, 0.0),
            Err(FxError::DivisionByZero(_))
        ));
    }

    #[test]
    fn test_negative_yesterday() {
        assert!(matches!(
            deviation_percent(1.0, -2.0),
            Err(FxError::NegativeRate { rate, .. }) if rate == -2.0
        ));
    }

    #[test]
    fn test_non_finite() {
        assert!(deviation_percent(f64::NAN, 1.0).is_err());
        assert!(deviation_percent(1.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_metric() {
        let pair = CurrencyPair::parse("USDJPY").unwrap();
        let metric = deviation_metric(&pair, 151.5, 150.0).unwrap();
        assert_eq!(metric.pair, pair);
        assert!(close(metric.deviation_percent, 1.0));
    }

    proptest! {
        #[test]
        fn prop_sign_discarded(y in 0.01f64..1000.0, delta in 0.0f64..10.0) {
            let up = deviation_percent(y + delta, y).unwrap();
            let down = deviation_percent(y - delta, y).unwrap();
            prop_assert!(up >= 0.0);
            prop_assert!((up - down).abs() <= 1e-9 * up.max(1.0));
        }
    }
}
