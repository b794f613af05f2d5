//! Stage configuration.
//!
//! Every stage reads its configuration once at startup into an explicit
//! struct; business logic never looks at the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use fxflow_common::{parse_pair_list, CurrencyPair, FxFlowError, Result};

use crate::poller::{Backoff, PollPolicy};

pub const DEFAULT_CURRENCY_PAIRS: &str = "USDJPY";
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(5);

/// Lookup function for configuration values.
pub type ConfigSource<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Read a value from the process environment. Blank values count as unset.
pub fn env_source(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn required(source: ConfigSource<'_>, name: &str) -> Result<String> {
    source(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| FxFlowError::Configuration(format!("{name} is not set")))
}

fn optional<T: FromStr>(source: ConfigSource<'_>, name: &str, default: T) -> Result<T> {
    match source(name) {
        Some(raw) if !raw.trim().is_empty() => raw.trim().parse().map_err(|_| {
            FxFlowError::Configuration(format!("{name} has an invalid value: {raw:?}"))
        }),
        _ => Ok(default),
    }
}

fn currency_pairs(source: ConfigSource<'_>) -> Result<Vec<CurrencyPair>> {
    let raw = source("CURRENCY_PAIRS").unwrap_or_else(|| DEFAULT_CURRENCY_PAIRS.to_string());
    parse_pair_list(&raw).map_err(|e| FxFlowError::Configuration(format!("CURRENCY_PAIRS: {e}")))
}

/// Object storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Bucket holding raw and processed objects.
    pub bucket: String,
}

impl StorageConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_source(&env_source)
    }

    pub fn from_source(source: ConfigSource<'_>) -> Result<Self> {
        Ok(Self {
            bucket: required(source, "BUCKET_NAME")?,
        })
    }
}

/// Rate provider configuration.
#[derive(Debug, Clone)]
pub struct RateApiConfig {
    /// Endpoint queried with `access_key`, `source` and `currencies`.
    pub base_url: String,
    /// Request deadline.
    pub timeout: Duration,
}

impl RateApiConfig {
    fn from_source(source: ConfigSource<'_>) -> Result<Self> {
        let secs = optional(source, "FX_API_TIMEOUT_SECS", DEFAULT_API_TIMEOUT.as_secs())?;
        Ok(Self {
            base_url: required(source, "FX_API_URL")?,
            timeout: Duration::from_secs(secs),
        })
    }
}

/// Analytical query engine configuration.
#[derive(Debug, Clone)]
pub struct QueryConfig {
    pub database: String,
    pub output_location: String,
    pub table: String,
    pub workgroup: String,
    /// Completion polling bounds.
    pub poll: PollPolicy,
}

impl QueryConfig {
    fn from_source(source: ConfigSource<'_>) -> Result<Self> {
        let defaults = PollPolicy::default();
        let interval_ms = optional(
            source,
            "QUERY_POLL_INTERVAL_MS",
            defaults.interval.as_millis() as u64,
        )?;
        let max_attempts = optional(source, "QUERY_MAX_ATTEMPTS", defaults.max_attempts)?;
        let factor: f64 = optional(source, "QUERY_BACKOFF_FACTOR", 1.0)?;
        let max_interval_ms: u64 = optional(source, "QUERY_MAX_INTERVAL_MS", 30_000)?;

        let backoff = if factor > 1.0 {
            Backoff::Exponential {
                factor,
                max_interval: Duration::from_millis(max_interval_ms),
            }
        } else {
            Backoff::Fixed
        };

        Ok(Self {
            database: required(source, "ATHENA_DATABASE")?,
            output_location: required(source, "ATHENA_OUTPUT")?,
            table: required(source, "ATHENA_TABLE")?,
            workgroup: required(source, "ATHENA_WORKGROUP")?,
            poll: PollPolicy {
                interval: Duration::from_millis(interval_ms),
                max_attempts,
                backoff,
            },
        })
    }
}

/// Metrics sink configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    pub namespace: String,
    /// Prometheus textfile written after each datum. Log-only when unset.
    pub textfile: Option<PathBuf>,
}

impl MetricsConfig {
    fn from_source(source: ConfigSource<'_>) -> Result<Self> {
        Ok(Self {
            namespace: required(source, "METRIC_NAMESPACE")?,
            textfile: source("METRICS_TEXTFILE")
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        })
    }
}

/// What the anomaly check does when one pair fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abort on the first failing pair. Metrics already published stay published.
    #[default]
    FailFast,
    /// Attempt every pair, then fail the invocation if any pair failed.
    Isolate,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fail_fast" | "fail-fast" => Ok(FailurePolicy::FailFast),
            "isolate" => Ok(FailurePolicy::Isolate),
            other => Err(format!("unknown failure policy {other:?}")),
        }
    }
}

/// Ingest stage configuration.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub pairs: Vec<CurrencyPair>,
    pub storage: StorageConfig,
    pub api: RateApiConfig,
}

impl IngestConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_source(&env_source)
    }

    pub fn from_source(source: ConfigSource<'_>) -> Result<Self> {
        let config = Self {
            pairs: currency_pairs(source)?,
            storage: StorageConfig::from_source(source)?,
            api: RateApiConfig::from_source(source)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.api.timeout.is_zero() {
            return Err(FxFlowError::Configuration(
                "FX_API_TIMEOUT_SECS cannot be 0".to_string(),
            ));
        }
        if !self.api.base_url.starts_with("http://") && !self.api.base_url.starts_with("https://")
        {
            return Err(FxFlowError::Configuration(format!(
                "FX_API_URL must be an http(s) URL: {}",
                self.api.base_url
            )));
        }
        Ok(())
    }
}

/// Transform stage configuration.
#[derive(Debug, Clone)]
pub struct TransformConfig {
    pub pairs: Vec<CurrencyPair>,
    pub storage: StorageConfig,
}

impl TransformConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_source(&env_source)
    }

    pub fn from_source(source: ConfigSource<'_>) -> Result<Self> {
        Ok(Self {
            pairs: currency_pairs(source)?,
            storage: StorageConfig::from_source(source)?,
        })
    }
}

/// Anomaly check stage configuration.
#[derive(Debug, Clone)]
pub struct AnomalyConfig {
    pub pairs: Vec<CurrencyPair>,
    pub query: QueryConfig,
    pub metrics: MetricsConfig,
    /// Skip the check when the effective date falls on a weekend.
    pub skip_weekends: bool,
    pub failure_policy: FailurePolicy,
}

impl AnomalyConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_source(&env_source)
    }

    pub fn from_source(source: ConfigSource<'_>) -> Result<Self> {
        let config = Self {
            pairs: currency_pairs(source)?,
            query: QueryConfig::from_source(source)?,
            metrics: MetricsConfig::from_source(source)?,
            skip_weekends: optional(source, "ANOMALY_SKIP_WEEKENDS", false)?,
            failure_policy: optional(source, "ANOMALY_FAILURE_POLICY", FailurePolicy::default())?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.query.poll.max_attempts == 0 {
            return Err(FxFlowError::Configuration(
                "QUERY_MAX_ATTEMPTS cannot be 0".to_string(),
            ));
        }
        if self.query.poll.interval.is_zero() {
            return Err(FxFlowError::Configuration(
                "QUERY_POLL_INTERVAL_MS cannot be 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn source(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    fn anomaly_vars() -> Vec<(&'static str, &'static str)> {
        vec![
            ("ATHENA_DATABASE", "fx"),
            ("ATHENA_OUTPUT", "s3://fx-results/"),
            ("ATHENA_TABLE", "processed_rates"),
            ("ATHENA_WORKGROUP", "primary"),
            ("METRIC_NAMESPACE", "FxPipeline"),
        ]
    }

    #[test]
    fn test_ingest_config_defaults() {
        let src = source(&[("BUCKET_NAME", "fx-bucket"), ("FX_API_URL", "https://api.example.com/live")]);
        let config = IngestConfig::from_source(&src).unwrap();

        assert_eq!(config.pairs, vec![CurrencyPair::parse("USDJPY").unwrap()]);
        assert_eq!(config.storage.bucket, "fx-bucket");
        assert_eq!(config.api.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_missing_required_value() {
        let src = source(&[("FX_API_URL", "https://api.example.com/live")]);
        let err = IngestConfig::from_source(&src).unwrap_err();
        assert!(matches!(err, FxFlowError::Configuration(ref m) if m.contains("BUCKET_NAME")));

        let src = source(&[("BUCKET_NAME", "   ")]);
        assert!(TransformConfig::from_source(&src).is_err());
    }

    #[test]
    fn test_usd_usd_pair_is_configuration_error() {
        let src = source(&[("BUCKET_NAME", "b"), ("CURRENCY_PAIRS", "USDJPY,USDUSD")]);
        let err = TransformConfig::from_source(&src).unwrap_err();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn test_anomaly_config() {
        let mut vars = anomaly_vars();
        vars.push(("CURRENCY_PAIRS", "USDJPY,EURUSD"));
        vars.push(("ANOMALY_FAILURE_POLICY", "isolate"));
        vars.push(("QUERY_BACKOFF_FACTOR", "2"));
        let config = AnomalyConfig::from_source(&source(&vars)).unwrap();

        assert_eq!(config.pairs.len(), 2);
        assert_eq!(config.failure_policy, FailurePolicy::Isolate);
        assert!(!config.skip_weekends);
        assert_eq!(config.query.poll.interval, Duration::from_secs(2));
        assert_eq!(config.query.poll.max_attempts, 150);
        assert!(matches!(config.query.poll.backoff, Backoff::Exponential { .. }));
        assert!(config.metrics.textfile.is_none());
    }

    #[test]
    fn test_invalid_values() {
        let mut vars = anomaly_vars();
        vars.push(("QUERY_MAX_ATTEMPTS", "0"));
        assert!(AnomalyConfig::from_source(&source(&vars)).is_err());

        let mut vars = anomaly_vars();
        vars.push(("ANOMALY_SKIP_WEEKENDS", "maybe"));
        assert!(AnomalyConfig::from_source(&source(&vars)).is_err());

        let src = source(&[("BUCKET_NAME", "b"), ("FX_API_URL", "ftp://rates")]);
        assert!(IngestConfig::from_source(&src).is_err());
    }
}
