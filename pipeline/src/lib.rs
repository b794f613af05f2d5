//! FxFlow pipeline stages
//!
//! Daily FX batch pipeline in three stages:
//! - Ingest: fetch USD-anchored quotes, derive the configured pairs, store a raw snapshot
//! - Transform: normalize each pair into its own partitioned object
//! - Anomaly: compare each pair against the previous day and publish the deviation

pub mod clients;
pub mod config;
pub mod event;
pub mod logging;
pub mod poller;
pub mod stages;

pub use config::{AnomalyConfig, FailurePolicy, IngestConfig, TransformConfig};
pub use event::{RunEvent, StagePayload, StageResponse};
pub use poller::{Backoff, PollPolicy, QueryPoller};
pub use stages::{AnomalyStage, IngestStage, TransformStage};
