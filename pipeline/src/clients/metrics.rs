//! Monitoring metric sinks.

use std::path::PathBuf;

use async_trait::async_trait;
use fxflow_common::{FxFlowError, Result};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

/// Unit attached to a published datum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MetricUnit {
    Percent,
}

impl MetricUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricUnit::Percent => "Percent",
        }
    }
}

/// One named data point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricDatum {
    pub name: String,
    pub value: f64,
    pub unit: MetricUnit,
}

impl MetricDatum {
    pub fn percent(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            unit: MetricUnit::Percent,
        }
    }
}

/// Trait for metric sinks.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Publish one datum under `namespace`.
    async fn put_metric(&self, namespace: &str, datum: &MetricDatum) -> Result<()>;
}

/// Emits each datum as a structured log event.
#[derive(Debug, Clone, Default)]
pub struct LogMetricsSink;

#[async_trait]
impl MetricsSink for LogMetricsSink {
    async fn put_metric(&self, namespace: &str, datum: &MetricDatum) -> Result<()> {
        info!(
            namespace,
            metric = %datum.name,
            value = datum.value,
            unit = datum.unit.as_str(),
            "Metric published"
        );
        Ok(())
    }
}

/// Keeps published data in memory.
#[derive(Debug, Default)]
pub struct InMemoryMetricsSink {
    data: Mutex<Vec<(String, MetricDatum)>>,
}

impl InMemoryMetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything published so far, in order.
    pub fn published(&self) -> Vec<(String, MetricDatum)> {
        self.data.lock().clone()
    }

    /// Latest value of a metric.
    pub fn latest(&self, name: &str) -> Option<f64> {
        self.data
            .lock()
            .iter()
            .rev()
            .find(|(_, d)| d.name == name)
            .map(|(_, d)| d.value)
    }

    /// Export the latest value of every metric in Prometheus text format.
    pub fn to_prometheus(&self) -> String {
        let data = self.data.lock();
        let mut latest: Vec<(&String, &MetricDatum)> = Vec::new();
        for (namespace, datum) in data.iter() {
            match latest
                .iter_mut()
                .find(|(ns, d)| *ns == namespace && d.name == datum.name)
            {
                Some(slot) => slot.1 = datum,
                None => latest.push((namespace, datum)),
            }
        }

        let mut out = String::new();
        for (namespace, datum) in latest {
            let name = prometheus_name(namespace, &datum.name, datum.unit);
            out.push_str(&format!(
                "# HELP {name} {} ({})\n# TYPE {name} gauge\n{name} {}\n\n",
                datum.name,
                datum.unit.as_str(),
                datum.value
            ));
        }
        out
    }
}

#[async_trait]
impl MetricsSink for InMemoryMetricsSink {
    async fn put_metric(&self, namespace: &str, datum: &MetricDatum) -> Result<()> {
        self.data.lock().push((namespace.to_string(), datum.clone()));
        Ok(())
    }
}

/// Rewrites a Prometheus textfile-collector file after every datum.
pub struct TextfileMetricsSink {
    path: PathBuf,
    inner: InMemoryMetricsSink,
}

impl TextfileMetricsSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            inner: InMemoryMetricsSink::new(),
        }
    }
}

#[async_trait]
impl MetricsSink for TextfileMetricsSink {
    async fn put_metric(&self, namespace: &str, datum: &MetricDatum) -> Result<()> {
        self.inner.put_metric(namespace, datum).await?;
        LogMetricsSink.put_metric(namespace, datum).await?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FxFlowError::external("metrics-textfile", e))?;
        }
        tokio::fs::write(&self.path, self.inner.to_prometheus())
            .await
            .map_err(|e| FxFlowError::external("metrics-textfile", e))
    }
}

fn prometheus_name(namespace: &str, metric: &str, unit: MetricUnit) -> String {
    let sanitize = |s: &str| -> String {
        s.chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect()
    };
    format!(
        "{}_{}_{}",
        sanitize(namespace),
        sanitize(metric),
        unit.as_str().to_ascii_lowercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_sink() {
        let sink = InMemoryMetricsSink::new();
        sink.put_metric("FxPipeline", &MetricDatum::percent("USDJPY-Deviation", 0.5))
            .await
            .unwrap();
        sink.put_metric("FxPipeline", &MetricDatum::percent("USDJPY-Deviation", 0.7))
            .await
            .unwrap();

        assert_eq!(sink.published().len(), 2);
        assert_eq!(sink.latest("USDJPY-Deviation"), Some(0.7));
        assert_eq!(sink.latest("EURUSD-Deviation"), None);
    }

    #[tokio::test]
    async fn test_prometheus_export() {
        let sink = InMemoryMetricsSink::new();
        sink.put_metric("FxPipeline", &MetricDatum::percent("USDJPY-Deviation", 1.25))
            .await
            .unwrap();

        let output = sink.to_prometheus();
        assert!(output.contains("# TYPE fxpipeline_usdjpy_deviation_percent gauge"));
        assert!(output.contains("fxpipeline_usdjpy_deviation_percent 1.25"));
    }

    #[tokio::test]
    async fn test_textfile_sink() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metrics").join("fx.prom");
        let sink = TextfileMetricsSink::new(&path);

        sink.put_metric("Fx", &MetricDatum::percent("EURUSD-Deviation", 0.1))
            .await
            .unwrap();
        sink.put_metric("Fx", &MetricDatum::percent("USDJPY-Deviation", 0.2))
            .await
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("fx_eurusd_deviation_percent 0.1"));
        assert!(text.contains("fx_usdjpy_deviation_percent 0.2"));
    }
}
