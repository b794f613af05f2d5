//! The three pipeline stages. Each is built once from its config and
//! collaborators, then run per invocation.

pub mod anomaly;
pub mod ingest;
pub mod transform;

pub use anomaly::AnomalyStage;
pub use ingest::IngestStage;
pub use transform::TransformStage;
