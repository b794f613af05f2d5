//! Currency and currency pair types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{FxFlowError, Result};

/// Anchor currency every provider quote is expressed against.
pub const ANCHOR: &str = "USD";

/// ISO 4217 currency code.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Currency(String);

impl Currency {
    /// Create a currency from a three-letter code (case-insensitive).
    pub fn new(code: impl AsRef<str>) -> Result<Self> {
        let code = code.as_ref().trim().to_ascii_uppercase();
        if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_uppercase()) {
            return Err(FxFlowError::Validation(format!(
                "Invalid currency code: {code:?}"
            )));
        }
        Ok(Self(code))
    }

    /// Get the currency code.
    pub fn code(&self) -> &str {
        &self.0
    }

    /// Check if this is the anchor currency.
    pub fn is_usd(&self) -> bool {
        self.0 == ANCHOR
    }

    pub fn usd() -> Self {
        Self(ANCHOR.to_string())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Currency {
    type Error = FxFlowError;

    fn try_from(s: String) -> Result<Self> {
        Self::new(s)
    }
}

impl From<Currency> for String {
    fn from(c: Currency) -> Self {
        c.0
    }
}

/// A currency pair written as a six-letter code, base first.
///
/// `USDJPY` is the price of one USD in JPY.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyPair {
    base: Currency,
    quote: Currency,
}

impl CurrencyPair {
    /// Create a pair from its two legs. A currency paired with itself is rejected.
    pub fn new(base: Currency, quote: Currency) -> Result<Self> {
        if base == quote {
            return Err(FxFlowError::Validation(format!(
                "Currency pair {base}{quote} has identical base and quote"
            )));
        }
        Ok(Self { base, quote })
    }

    /// Parse a six-letter pair code such as `EURUSD`.
    pub fn parse(code: &str) -> Result<Self> {
        let code = code.trim();
        if code.len() != 6 || !code.is_ascii() {
            return Err(FxFlowError::Validation(format!(
                "Invalid currency pair code: {code:?}"
            )));
        }
        Self::new(Currency::new(&code[..3])?, Currency::new(&code[3..])?)
    }

    pub fn base(&self) -> &Currency {
        &self.base
    }

    pub fn quote(&self) -> &Currency {
        &self.quote
    }

    /// Six-letter code.
    pub fn code(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }

    pub fn is_usd_base(&self) -> bool {
        self.base.is_usd()
    }

    pub fn is_usd_quote(&self) -> bool {
        self.quote.is_usd()
    }

    /// Get the inverse pair.
    pub fn inverse(&self) -> Self {
        Self {
            base: self.quote.clone(),
            quote: self.base.clone(),
        }
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.base, self.quote)
    }
}

impl FromStr for CurrencyPair {
    type Err = FxFlowError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CurrencyPair {
    type Error = FxFlowError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<CurrencyPair> for String {
    fn from(p: CurrencyPair) -> Self {
        p.code()
    }
}

/// Parse a comma-separated pair list such as `USDJPY,EURUSD`.
///
/// Blank entries are skipped; duplicates keep their first position.
pub fn parse_pair_list(raw: &str) -> Result<Vec<CurrencyPair>> {
    let mut pairs: Vec<CurrencyPair> = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let pair = CurrencyPair::parse(entry)?;
        if !pairs.contains(&pair) {
            pairs.push(pair);
        }
    }

    if pairs.is_empty() {
        return Err(FxFlowError::Validation(
            "Currency pair list is empty".to_string(),
        ));
    }

    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_parse() {
        let pair = CurrencyPair::parse("usdjpy").unwrap();
        assert_eq!(pair.base().code(), "USD");
        assert_eq!(pair.quote().code(), "JPY");
        assert_eq!(pair.to_string(), "USDJPY");
        assert!(pair.is_usd_base());
        assert!(!pair.is_usd_quote());
        assert_eq!(pair.inverse().code(), "JPYUSD");
    }

    #[test]
    fn test_pair_parse_rejects_bad_codes() {
        assert!(CurrencyPair::parse("USDJP").is_err());
        assert!(CurrencyPair::parse("USD/JPY").is_err());
        assert!(CurrencyPair::parse("US1JPY").is_err());
    }

    #[test]
    fn test_same_currency_pair_rejected() {
        assert!(CurrencyPair::parse("USDUSD").is_err());
        assert!(CurrencyPair::parse("EUREUR").is_err());
    }

    #[test]
    fn test_pair_list() {
        let pairs = parse_pair_list(" USDJPY, EURUSD,,GBPJPY,USDJPY ").unwrap();
        let codes: Vec<String> = pairs.iter().map(|p| p.code()).collect();
        assert_eq!(codes, vec!["USDJPY", "EURUSD", "GBPJPY"]);

        assert!(parse_pair_list(" , ").is_err());
        assert!(parse_pair_list("USDJPY,USDUSD").is_err());
    }

    #[test]
    fn test_pair_serde_as_code() {
        let pair = CurrencyPair::parse("EURGBP").unwrap();
        let json = serde_json::to_string(&pair).unwrap();
        assert_eq!(json, "\"EURGBP\"");

        let back: CurrencyPair = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pair);
        assert!(serde_json::from_str::<CurrencyPair>("\"EUR\"").is_err());
    }
}
