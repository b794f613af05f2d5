//! External collaborators: secrets, the rate provider, object storage, the
//! analytical query engine and the metrics sink.

pub mod metrics;
pub mod object_store;
pub mod query;
pub mod rate_api;
pub mod secrets;

pub use metrics::{
    InMemoryMetricsSink, LogMetricsSink, MetricDatum, MetricUnit, MetricsSink, TextfileMetricsSink,
};
pub use object_store::{get_json, put_json, FsObjectStore, InMemoryObjectStore, ObjectStore};
pub use query::{LocalQueryEngine, QueryEngine, QueryRequest, QueryState, QueryStatus, ResultSet};
pub use rate_api::{HttpRateApi, RateApi, UsdQuoteSnapshot};
pub use secrets::{EnvSecretStore, SecretStore, StaticSecretStore, API_KEY_SECRET};
