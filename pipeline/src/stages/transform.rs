//! Transform: split the raw snapshot into one normalized object per pair.

use std::sync::Arc;

use fxflow_common::{processed_key, raw_key, RawFxRecord, Result};
use fxflow_fx::normalize;
use tracing::{debug, error, info, instrument};

use crate::clients::object_store::{get_json, put_json, ObjectStore};
use crate::config::TransformConfig;
use crate::event::{RunEvent, StageResponse};

pub struct TransformStage {
    config: TransformConfig,
    store: Arc<dyn ObjectStore>,
}

impl TransformStage {
    pub fn new(config: TransformConfig, store: Arc<dyn ObjectStore>) -> Self {
        Self { config, store }
    }

    #[instrument(skip(self, event), fields(run_date = %event.run_date))]
    pub async fn run(&self, event: &RunEvent) -> Result<StageResponse> {
        match self.transform(event).await {
            Ok(files) => {
                info!(files = files.len(), "FX data normalized");
                Ok(StageResponse::transformed(files))
            }
            Err(e) => {
                error!(error = %e, code = e.error_code(), "FX transform failed");
                Err(e)
            }
        }
    }

    async fn transform(&self, event: &RunEvent) -> Result<Vec<String>> {
        let date = event.effective_date()?;
        let bucket = &self.config.storage.bucket;
        let read_key = raw_key(&date);
        info!(key = %read_key, "Reading raw FX data");

        let payload = get_json(self.store.as_ref(), bucket, &read_key).await?;
        let record = RawFxRecord::validate(&payload, &self.config.pairs)?;

        // Everything is normalized before the first write.
        let outputs = record
            .quotes
            .iter()
            .map(|(pair, rate)| -> Result<_> {
                let normalized = normalize(pair, *rate, &date)?;
                debug!(pair = %pair, raw = rate, rate = normalized.rate, "Normalized rate");
                Ok((processed_key(pair, &date), normalized))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut written = Vec::with_capacity(outputs.len());
        for (key, normalized) in outputs {
            put_json(self.store.as_ref(), bucket, &key, &normalized).await?;
            info!(key = %key, "Wrote normalized rate");
            written.push(key);
        }
        Ok(written)
    }
}
