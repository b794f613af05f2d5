//! Anomaly check: day-over-day deviation per pair, published as a metric.

use std::collections::BTreeMap;
use std::sync::Arc;

use fxflow_common::{CurrencyPair, DeviationMetric, EffectiveDate, FxFlowError, Result};
use fxflow_fx::deviation_metric;
use tracing::{error, info, instrument, warn};

use crate::clients::metrics::{MetricDatum, MetricsSink};
use crate::clients::query::{QueryEngine, QueryRequest};
use crate::config::{AnomalyConfig, FailurePolicy};
use crate::event::{RunEvent, StageResponse};
use crate::poller::QueryPoller;

pub struct AnomalyStage {
    config: AnomalyConfig,
    engine: Arc<dyn QueryEngine>,
    metrics: Arc<dyn MetricsSink>,
    poller: QueryPoller,
}

impl AnomalyStage {
    pub fn new(
        config: AnomalyConfig,
        engine: Arc<dyn QueryEngine>,
        metrics: Arc<dyn MetricsSink>,
    ) -> Self {
        let poller = QueryPoller::with_policy(config.query.poll.clone());
        Self {
            config,
            engine,
            metrics,
            poller,
        }
    }

    /// Replace the default poller.
    pub fn with_poller(mut self, poller: QueryPoller) -> Self {
        self.poller = poller;
        self
    }

    #[instrument(skip(self, event), fields(run_date = %event.run_date))]
    pub async fn run(&self, event: &RunEvent) -> Result<StageResponse> {
        match self.check(event).await {
            Ok(response) => Ok(response),
            Err(e) => {
                error!(error = %e, code = e.error_code(), "FX anomaly check failed");
                Err(e)
            }
        }
    }

    async fn check(&self, event: &RunEvent) -> Result<StageResponse> {
        let date = event.effective_date()?;

        if self.config.skip_weekends && date.is_weekend() {
            info!(date = %date, "Market closed (weekend). Skipping anomaly check");
            return Ok(StageResponse::skipped("weekend"));
        }

        let previous = date.previous();
        let mut published: Vec<DeviationMetric> = Vec::new();
        let mut failed = Vec::new();

        for pair in &self.config.pairs {
            match self.check_pair(pair, &date, &previous).await {
                Ok(metric) => published.push(metric),
                Err(e) => match self.config.failure_policy {
                    FailurePolicy::FailFast => return Err(e),
                    FailurePolicy::Isolate => {
                        warn!(pair = %pair, error = %e, "Pair check failed, continuing");
                        failed.push(format!("{pair}: {e}"));
                    }
                },
            }
        }

        if !failed.is_empty() {
            return Err(FxFlowError::PartialFailure {
                failed,
                published: published.iter().map(|m| m.pair.code()).collect(),
            });
        }

        Ok(StageResponse::published(
            published
                .into_iter()
                .map(|m| BTreeMap::from([(m.pair.code(), m.deviation_percent)]))
                .collect(),
        ))
    }

    async fn check_pair(
        &self,
        pair: &CurrencyPair,
        date: &EffectiveDate,
        previous: &EffectiveDate,
    ) -> Result<DeviationMetric> {
        let engine = self.engine.as_ref();
        let today = self
            .poller
            .execute_scalar(engine, &QueryRequest::rate_lookup(&self.config.query, pair, date))
            .await?;
        let yesterday = self
            .poller
            .execute_scalar(engine, &QueryRequest::rate_lookup(&self.config.query, pair, previous))
            .await?;

        let metric = deviation_metric(pair, today, yesterday)?;
        info!(
            pair = %pair,
            today,
            yesterday,
            deviation = metric.deviation_percent,
            "Deviation computed"
        );

        let datum = MetricDatum::percent(metric.metric_name(), metric.deviation_percent);
        self.metrics
            .put_metric(&self.config.metrics.namespace, &datum)
            .await?;
        Ok(metric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;

    use crate::clients::metrics::InMemoryMetricsSink;
    use crate::clients::object_store::{put_json, InMemoryObjectStore};
    use crate::clients::query::LocalQueryEngine;
    use crate::config::{MetricsConfig, QueryConfig};
    use crate::event::StagePayload;
    use crate::poller::{PollPolicy, Sleeper};

    struct NoSleep;

    #[async_trait]
    impl Sleeper for NoSleep {
        async fn sleep(&self, _duration: Duration) {}
    }

    fn config(pairs: &[&str], policy: FailurePolicy, skip_weekends: bool) -> AnomalyConfig {
        AnomalyConfig {
            pairs: pairs.iter().map(|p| CurrencyPair::parse(p).unwrap()).collect(),
            query: QueryConfig {
                database: "fx".into(),
                output_location: "s3://results/".into(),
                table: "processed_rates".into(),
                workgroup: "primary".into(),
                poll: PollPolicy::default(),
            },
            metrics: MetricsConfig {
                namespace: "FxPipeline".into(),
                textfile: None,
            },
            skip_weekends,
            failure_policy: policy,
        }
    }

    async fn seed(store: &InMemoryObjectStore, pair: &str, date: &str, rate: f64) {
        let (y, rest) = date.split_at(4);
        let (m, d) = (&rest[1..3], &rest[4..6]);
        let key = format!("processed/pair={pair}/year={y}/month={m}/day={d}/data.json");
        put_json(store, "fx", &key, &json!({"rate": rate, "date": date, "market_open": true}))
            .await
            .unwrap();
    }

    fn stage(
        store: Arc<InMemoryObjectStore>,
        metrics: Arc<InMemoryMetricsSink>,
        config: AnomalyConfig,
    ) -> AnomalyStage {
        let poller = QueryPoller::new(config.query.poll.clone(), Arc::new(NoSleep));
        AnomalyStage::new(config, Arc::new(LocalQueryEngine::new(store, "fx")), metrics)
            .with_poller(poller)
    }

    #[tokio::test]
    async fn test_publishes_deviation_across_leap_day() {
        let store = Arc::new(InMemoryObjectStore::new());
        seed(&store, "USDJPY", "2024-03-01", 150.0).await;
        seed(&store, "USDJPY", "2024-02-29", 120.0).await;
        let metrics = Arc::new(InMemoryMetricsSink::new());

        let response = stage(store, metrics.clone(), config(&["USDJPY"], FailurePolicy::FailFast, false))
            .run(&RunEvent::new("2024-03-02T00:00:00Z"))
            .await
            .unwrap();

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"statusCode": 200, "published_metrics": [{"USDJPY": 25.0}]})
        );
        let published = metrics.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "FxPipeline");
        assert_eq!(published[0].1.name, "USDJPY-Deviation");
        assert_eq!(published[0].1.unit.as_str(), "Percent");
    }

    #[tokio::test]
    async fn test_fail_fast_keeps_earlier_metrics() {
        let store = Arc::new(InMemoryObjectStore::new());
        seed(&store, "EURUSD", "2024-03-01", 1.1).await;
        seed(&store, "EURUSD", "2024-02-29", 1.0).await;
        seed(&store, "USDJPY", "2024-03-01", 150.0).await;
        let metrics = Arc::new(InMemoryMetricsSink::new());

        let err = stage(
            store,
            metrics.clone(),
            config(&["EURUSD", "USDJPY", "GBPUSD"], FailurePolicy::FailFast, false),
        )
        .run(&RunEvent::new("2024-03-02"))
        .await
        .unwrap_err();

        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        assert_eq!(metrics.published().len(), 1);
        assert!(metrics.latest("EURUSD-Deviation").is_some());
    }

    #[tokio::test]
    async fn test_isolate_attempts_every_pair() {
        let store = Arc::new(InMemoryObjectStore::new());
        seed(&store, "USDJPY", "2024-03-01", 150.0).await;
        seed(&store, "EURUSD", "2024-03-01", 1.1).await;
        seed(&store, "EURUSD", "2024-02-29", 1.0).await;
        let metrics = Arc::new(InMemoryMetricsSink::new());

        let err = stage(
            store,
            metrics.clone(),
            config(&["USDJPY", "EURUSD"], FailurePolicy::Isolate, false),
        )
        .run(&RunEvent::new("2024-03-02"))
        .await
        .unwrap_err();

        match err {
            FxFlowError::PartialFailure { failed, published } => {
                assert_eq!(failed.len(), 1);
                assert!(failed[0].starts_with("USDJPY: "));
                assert_eq!(published, vec!["EURUSD".to_string()]);
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(metrics.published().len(), 1);
    }

    #[tokio::test]
    async fn test_zero_previous_rate_is_arithmetic_error() {
        let store = Arc::new(InMemoryObjectStore::new());
        seed(&store, "USDJPY", "2024-03-01", 150.0).await;
        seed(&store, "USDJPY", "2024-02-29", 0.0).await;
        let metrics = Arc::new(InMemoryMetricsSink::new());

        let err = stage(store, metrics.clone(), config(&["USDJPY"], FailurePolicy::FailFast, false))
            .run(&RunEvent::new("2024-03-02"))
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "ARITHMETIC_ERROR");
        assert!(metrics.published().is_empty());
    }

    #[tokio::test]
    async fn test_weekend_skip() {
        let metrics = Arc::new(InMemoryMetricsSink::new());
        let stage = stage(
            Arc::new(InMemoryObjectStore::new()),
            metrics.clone(),
            config(&["USDJPY"], FailurePolicy::FailFast, true),
        );

        // 2024-03-03 run: effective date is Saturday 2024-03-02.
        let response = stage.run(&RunEvent::new("2024-03-03T00:00:00Z")).await.unwrap();

        assert!(matches!(response.payload, StagePayload::Skipped { ref reason, .. } if reason == "weekend"));
        assert!(metrics.published().is_empty());
    }

    #[tokio::test]
    async fn test_weekend_runs_when_skip_disabled() {
        let store = Arc::new(InMemoryObjectStore::new());
        seed(&store, "USDJPY", "2024-03-02", 150.0).await;
        seed(&store, "USDJPY", "2024-03-01", 150.0).await;
        let metrics = Arc::new(InMemoryMetricsSink::new());

        stage(store, metrics.clone(), config(&["USDJPY"], FailurePolicy::FailFast, false))
            .run(&RunEvent::new("2024-03-03T00:00:00Z"))
            .await
            .unwrap();

        assert_eq!(metrics.latest("USDJPY-Deviation"), Some(0.0));
    }
}
