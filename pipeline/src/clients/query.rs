//! Analytical query engine.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use fxflow_common::{
    processed_key_parts, CurrencyPair, EffectiveDate, FxFlowError, Result,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::clients::object_store::ObjectStore;
use crate::config::QueryConfig;

/// Lifecycle of a submitted query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryState {
    /// Submitted, waiting for capacity.
    Queued,
    /// Executing.
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl QueryState {
    /// Check if this is a final state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            QueryState::Succeeded | QueryState::Failed | QueryState::Cancelled
        )
    }

    /// Get valid next states from current state.
    pub fn valid_transitions(&self) -> &[QueryState] {
        match self {
            QueryState::Queued => &[
                QueryState::Running,
                QueryState::Failed,
                QueryState::Cancelled,
            ],
            QueryState::Running => &[
                QueryState::Succeeded,
                QueryState::Failed,
                QueryState::Cancelled,
            ],
            QueryState::Succeeded | QueryState::Failed | QueryState::Cancelled => &[],
        }
    }

    /// Check if transition to given state is valid.
    pub fn can_transition_to(&self, next: QueryState) -> bool {
        self.valid_transitions().contains(&next)
    }
}

/// Current state plus the engine's explanation for terminal failures.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryStatus {
    pub state: QueryState,
    pub reason: Option<String>,
}

/// A parameterized query submission.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryRequest {
    /// SQL with `?` placeholders.
    pub sql: String,
    /// Placeholder values as SQL literals, in order.
    pub parameters: Vec<String>,
    pub database: String,
    pub workgroup: String,
    pub output_location: String,
}

impl QueryRequest {
    /// Rate of `pair` on `date` from the partitioned processed table.
    ///
    /// Parameters are pair, year, month, day in that order.
    pub fn rate_lookup(config: &QueryConfig, pair: &CurrencyPair, date: &EffectiveDate) -> Self {
        let sql = format!(
            "SELECT rate FROM {} WHERE pair = ? AND year = ? AND month = ? AND day = ?",
            config.table
        );
        let parameters = [pair.code(), date.year(), date.month(), date.day()]
            .into_iter()
            .map(|v| format!("'{v}'"))
            .collect();

        Self {
            sql,
            parameters,
            database: config.database.clone(),
            workgroup: config.workgroup.clone(),
            output_location: config.output_location.clone(),
        }
    }
}

/// Tabular query output. Row 0 is the header row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub rows: Vec<Vec<Option<String>>>,
}

impl ResultSet {
    /// A single-column result with a header and one value per data row.
    pub fn single_column(header: &str, values: Vec<Option<String>>) -> Self {
        let mut rows = vec![vec![Some(header.to_string())]];
        rows.extend(values.into_iter().map(|v| vec![v]));
        Self { rows }
    }

    /// First column of the first data row, as a number.
    pub fn scalar_f64(&self) -> Result<f64> {
        let cell = self
            .rows
            .get(1)
            .ok_or_else(|| FxFlowError::Validation("Query returned no data rows".to_string()))?
            .first()
            .cloned()
            .flatten()
            .ok_or_else(|| FxFlowError::Validation("Query returned an empty value".to_string()))?;

        cell.trim()
            .parse::<f64>()
            .map_err(|_| FxFlowError::Validation(format!("Query value is not numeric: {cell:?}")))
    }
}

/// Trait for asynchronous SQL engines.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Engine name, used in error messages.
    fn name(&self) -> &str;

    /// Submit a query and return its execution id.
    async fn start_query(&self, request: &QueryRequest) -> Result<String>;

    async fn query_status(&self, execution_id: &str) -> Result<QueryStatus>;

    /// Results of a succeeded query.
    async fn query_results(&self, execution_id: &str) -> Result<ResultSet>;
}

#[derive(Debug, Clone)]
struct Execution {
    state: QueryState,
    outcome: std::result::Result<ResultSet, String>,
}

/// Answers rate lookups straight from the processed object layout.
///
/// Each execution reports `Queued`, then `Running`, then its terminal state
/// on successive status checks. A missing partition succeeds with no data
/// rows, as a real engine would.
pub struct LocalQueryEngine {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    executions: DashMap<String, Execution>,
}

impl LocalQueryEngine {
    pub fn new(store: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            executions: DashMap::new(),
        }
    }

    async fn execute(&self, request: &QueryRequest) -> std::result::Result<ResultSet, String> {
        let values: Vec<&str> = request
            .parameters
            .iter()
            .map(|p| p.trim_matches('\''))
            .collect();
        let [pair, year, month, day] = values.as_slice() else {
            return Err(format!(
                "expected 4 parameters (pair, year, month, day), got {}",
                values.len()
            ));
        };

        let key = processed_key_parts(pair, year, month, day);
        debug!(key = %key, "Local query lookup");

        let body = match self.store.get_object(&self.bucket, &key).await {
            Ok(Some(body)) => body,
            Ok(None) => return Ok(ResultSet::single_column("rate", vec![])),
            Err(e) => return Err(e.to_string()),
        };

        let record: Value =
            serde_json::from_slice(&body).map_err(|e| format!("corrupt partition {key}: {e}"))?;
        let rate = record.get("rate").and_then(Value::as_f64).map(|r| r.to_string());
        Ok(ResultSet::single_column("rate", vec![rate]))
    }

    fn execution(&self, execution_id: &str) -> Result<Execution> {
        self.executions
            .get(execution_id)
            .map(|e| e.clone())
            .ok_or_else(|| {
                FxFlowError::external(self.name(), format!("unknown execution {execution_id}"))
            })
    }
}

#[async_trait]
impl QueryEngine for LocalQueryEngine {
    fn name(&self) -> &str {
        "local-query-engine"
    }

    async fn start_query(&self, request: &QueryRequest) -> Result<String> {
        let id = Uuid::now_v7().to_string();
        let outcome = self.execute(request).await;
        self.executions.insert(
            id.clone(),
            Execution {
                state: QueryState::Queued,
                outcome,
            },
        );
        Ok(id)
    }

    async fn query_status(&self, execution_id: &str) -> Result<QueryStatus> {
        let mut entry = self.executions.get_mut(execution_id).ok_or_else(|| {
            FxFlowError::external(self.name(), format!("unknown execution {execution_id}"))
        })?;

        let next = match (entry.state, &entry.outcome) {
            (QueryState::Queued, _) => QueryState::Running,
            (QueryState::Running, Ok(_)) => QueryState::Succeeded,
            (QueryState::Running, Err(_)) => QueryState::Failed,
            (terminal, _) => terminal,
        };
        entry.state = next;

        let reason = match (&entry.state, &entry.outcome) {
            (QueryState::Failed, Err(reason)) => Some(reason.clone()),
            _ => None,
        };

        Ok(QueryStatus {
            state: entry.state,
            reason,
        })
    }

    /// Results are handed out once; the execution is forgotten afterwards.
    async fn query_results(&self, execution_id: &str) -> Result<ResultSet> {
        let finished = self
            .executions
            .remove_if(execution_id, |_, e| e.state == QueryState::Succeeded);
        if let Some((_, Execution { outcome: Ok(results), .. })) = finished {
            return Ok(results);
        }

        let state = self.execution(execution_id)?.state;
        warn!(execution_id, ?state, "Results requested before success");
        Err(FxFlowError::external(
            self.name(),
            format!("execution {execution_id} is {state:?}"),
        ))
    }
}
