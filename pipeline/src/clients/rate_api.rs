//! Rate provider client.

use std::collections::BTreeSet;

use async_trait::async_trait;
use fxflow_common::{Currency, FxFlowError, Result, ANCHOR};
use fxflow_fx::{currencies_param, UsdQuoteSet};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::config::RateApiConfig;

const SERVICE: &str = "rate-api";

/// USD-anchored quotes as returned by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct UsdQuoteSnapshot {
    /// Provider timestamp, untouched.
    pub timestamp: Value,
    pub quotes: UsdQuoteSet,
}

impl UsdQuoteSnapshot {
    /// Parse a provider body. `timestamp` and `quotes` are required.
    pub fn from_json(body: &Value) -> Result<Self> {
        if body.get("success") == Some(&Value::Bool(false)) {
            let info = body
                .pointer("/error/info")
                .and_then(Value::as_str)
                .unwrap_or("provider reported failure");
            return Err(FxFlowError::external(SERVICE, info));
        }

        let timestamp = body
            .get("timestamp")
            .cloned()
            .ok_or_else(|| FxFlowError::Validation("Missing required field: timestamp".into()))?;

        let raw_quotes = body
            .get("quotes")
            .and_then(Value::as_object)
            .ok_or_else(|| FxFlowError::Validation("Missing required field: quotes".into()))?;

        let mut quotes = UsdQuoteSet::default();
        for (key, value) in raw_quotes {
            let rate = value.as_f64().ok_or_else(|| {
                FxFlowError::Validation(format!("Provider quote {key} is not numeric"))
            })?;
            quotes.insert(key.clone(), rate);
        }

        Ok(Self { timestamp, quotes })
    }
}

/// Trait for rate providers.
#[async_trait]
pub trait RateApi: Send + Sync {
    /// Fetch `USD -> CCY` quotes for the given currencies.
    async fn fetch_usd_quotes(
        &self,
        api_key: &str,
        currencies: &BTreeSet<Currency>,
    ) -> Result<UsdQuoteSnapshot>;
}

/// HTTP client for a currencylayer-style `live` endpoint.
pub struct HttpRateApi {
    client: Client,
    base_url: String,
}

impl HttpRateApi {
    /// Create a client with the configured request deadline.
    pub fn new(config: &RateApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| FxFlowError::Configuration(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }
}

#[async_trait]
impl RateApi for HttpRateApi {
    #[instrument(skip(self, api_key, currencies), fields(url = %self.base_url))]
    async fn fetch_usd_quotes(
        &self,
        api_key: &str,
        currencies: &BTreeSet<Currency>,
    ) -> Result<UsdQuoteSnapshot> {
        let currencies = currencies_param(currencies);
        info!(source = ANCHOR, currencies = %currencies, "Requesting FX data");

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("access_key", api_key),
                ("source", ANCHOR),
                ("currencies", currencies.as_str()),
            ])
            .send()
            .await
            .map_err(|e| FxFlowError::external(SERVICE, format!("request failed: {}", e.without_url())))?;

        if response.status() != StatusCode::OK {
            return Err(FxFlowError::external(
                SERVICE,
                format!("FX API returned status {}", response.status()),
            ));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| FxFlowError::external(SERVICE, format!("malformed body: {}", e.without_url())))?;

        debug!(body = %body, "FX API response");
        UsdQuoteSnapshot::from_json(&body)
    }
}
