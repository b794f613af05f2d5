//! Ingest: fetch USD quotes, derive the configured pairs, store the raw snapshot.

use std::sync::Arc;

use fxflow_common::{raw_key, FxFlowError, RawFxRecord, Result};
use fxflow_fx::{derive_raw_record, quote_currencies};
use tracing::{error, info, instrument};

use crate::clients::object_store::{put_json, ObjectStore};
use crate::clients::rate_api::RateApi;
use crate::clients::secrets::{SecretStore, API_KEY_SECRET};
use crate::config::IngestConfig;
use crate::event::{RunEvent, StageResponse};

pub struct IngestStage {
    config: IngestConfig,
    secrets: Arc<dyn SecretStore>,
    api: Arc<dyn RateApi>,
    store: Arc<dyn ObjectStore>,
}

impl IngestStage {
    pub fn new(
        config: IngestConfig,
        secrets: Arc<dyn SecretStore>,
        api: Arc<dyn RateApi>,
        store: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            config,
            secrets,
            api,
            store,
        }
    }

    #[instrument(skip(self, event), fields(run_date = %event.run_date))]
    pub async fn run(&self, event: &RunEvent) -> Result<StageResponse> {
        info!(pairs = self.config.pairs.len(), "FX ingestion started");

        match self.ingest(event).await {
            Ok(key) => {
                info!(bucket = %self.config.storage.bucket, key = %key, "FX data written");
                Ok(StageResponse::ingested(key))
            }
            Err(e) => {
                error!(error = %e, code = e.error_code(), "FX ingestion failed");
                Err(e)
            }
        }
    }

    async fn ingest(&self, event: &RunEvent) -> Result<String> {
        let date = event.effective_date()?;
        let api_key = self.secrets.get_secret(API_KEY_SECRET).await?;

        let currencies = quote_currencies(&self.config.pairs);
        let snapshot = self.api.fetch_usd_quotes(&api_key, &currencies).await?;

        let record = derive_raw_record(snapshot.timestamp, &snapshot.quotes, &self.config.pairs)?;
        let payload = serde_json::to_value(&record)
            .map_err(|e| FxFlowError::Validation(format!("Cannot serialize raw record: {e}")))?;
        RawFxRecord::validate(&payload, &self.config.pairs)?;

        let key = raw_key(&date);
        put_json(self.store.as_ref(), &self.config.storage.bucket, &key, &payload).await?;
        Ok(key)
    }
}
