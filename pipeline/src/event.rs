//! Invocation event and stage responses.

use std::collections::BTreeMap;

use fxflow_common::{EffectiveDate, Result};
use serde::{Deserialize, Serialize};

/// Scheduler payload. Unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunEvent {
    /// Run timestamp; the effective date is the UTC day before it.
    pub run_date: String,
}

impl RunEvent {
    pub fn new(run_date: impl Into<String>) -> Self {
        Self {
            run_date: run_date.into(),
        }
    }

    pub fn effective_date(&self) -> Result<EffectiveDate> {
        EffectiveDate::from_run_date(&self.run_date)
    }
}

pub const INGEST_MESSAGE: &str = "FX data ingested successfully";

/// Successful stage outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    #[serde(flatten)]
    pub payload: StagePayload,
}

/// Stage-specific response fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StagePayload {
    Ingested { body: IngestBody },
    Transformed { files_written: Vec<String> },
    Published { published_metrics: Vec<BTreeMap<String, f64>> },
    Skipped { status: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestBody {
    pub message: String,
    pub key: String,
}

impl StageResponse {
    fn ok(payload: StagePayload) -> Self {
        Self {
            status_code: 200,
            payload,
        }
    }

    pub fn ingested(key: impl Into<String>) -> Self {
        Self::ok(StagePayload::Ingested {
            body: IngestBody {
                message: INGEST_MESSAGE.to_string(),
                key: key.into(),
            },
        })
    }

    pub fn transformed(files_written: Vec<String>) -> Self {
        Self::ok(StagePayload::Transformed { files_written })
    }

    pub fn published(published_metrics: Vec<BTreeMap<String, f64>>) -> Self {
        Self::ok(StagePayload::Published { published_metrics })
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::ok(StagePayload::Skipped {
            status: "skipped".to_string(),
            reason: reason.into(),
        })
    }
}
