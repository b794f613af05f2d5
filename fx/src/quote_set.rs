//! Minimal set of currencies to request from the provider.

use std::collections::BTreeSet;

use fxflow_common::{Currency, CurrencyPair};

/// Every non-USD leg of every pair, deduplicated.
pub fn quote_currencies(pairs: &[CurrencyPair]) -> BTreeSet<Currency> {
    pairs
        .iter()
        .flat_map(|p| [p.base(), p.quote()])
        .filter(|c| !c.is_usd())
        .cloned()
        .collect()
}

/// Provider query value: `EUR,GBP,JPY`.
pub fn currencies_param(currencies: &BTreeSet<Currency>) -> String {
    currencies
        .iter()
        .map(Currency::code)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_currencies() {
        let pairs: Vec<CurrencyPair> = ["USDJPY", "EURUSD", "GBPJPY", "EURGBP"]
            .iter()
            .map(|c| CurrencyPair::parse(c).unwrap())
            .collect();

        let set = quote_currencies(&pairs);
        let codes: Vec<&str> = set.iter().map(Currency::code).collect();

        assert_eq!(codes, vec!["EUR", "GBP", "JPY"]);
        assert_eq!(currencies_param(&set), "EUR,GBP,JPY");
    }

    #[test]
    fn test_usd_only_legs_excluded() {
        let pairs = vec![CurrencyPair::parse("USDJPY").unwrap()];
        let set = quote_currencies(&pairs);
        assert_eq!(set.len(), 1);
        assert!(!set.contains(&Currency::usd()));
    }
}
