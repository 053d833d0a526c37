use reqwest::Method;
use tracing::debug;

use super::require_name;
use crate::error::Error;
use crate::gateway::Gateway;
use crate::types::{
    ActionReceipt, Model, ModelCatalog, ModelPath, Prediction, PredictionInput, TrainingPayload,
};

/// `/models` endpoints, addressed by model name.
#[derive(Debug, Clone, Copy)]
pub struct Models<'a> {
    gateway: &'a Gateway,
}

impl<'a> Models<'a> {
    pub(crate) fn new(gateway: &'a Gateway) -> Self {
        Self { gateway }
    }

    /// `GET /models`, normalized to a list ordered by name.
    pub async fn list(&self) -> Result<Vec<Model>, Error> {
        let catalog: ModelCatalog = self.gateway.get_json(&["models"], &[]).await?;
        let models = catalog.into_models();
        debug!(count = models.len(), "fetched model catalog");
        Ok(models)
    }

    /// `GET /models/{name}`
    pub async fn get(&self, name: &str) -> Result<Model, Error> {
        let name = require_name("model name", name)?;
        self.gateway.get_json(&["models", name], &[]).await
    }

    /// `POST /models/{name}/train`
    pub async fn train(
        &self,
        name: &str,
        payload: &TrainingPayload,
    ) -> Result<ActionReceipt, Error> {
        self.post(name, "train", payload).await
    }

    /// `POST /models/{name}/predict`
    pub async fn predict(
        &self,
        name: &str,
        input: &PredictionInput,
    ) -> Result<Prediction, Error> {
        let name = require_name("model name", name)?;
        self.gateway
            .send_json(Method::POST, &["models", name, "predict"], &[], Some(input))
            .await
    }

    /// `POST /models/{name}/save` with body `{"path": ..}`.
    pub async fn save(&self, name: &str, path: &ModelPath) -> Result<ActionReceipt, Error> {
        self.post(name, "save", path).await
    }

    /// `POST /models/{name}/load` with body `{"path": ..}`.
    pub async fn load(&self, name: &str, path: &ModelPath) -> Result<ActionReceipt, Error> {
        self.post(name, "load", path).await
    }

    async fn post<B>(&self, name: &str, action: &str, body: &B) -> Result<ActionReceipt, Error>
    where
        B: serde::Serialize + Sync,
    {
        let name = require_name("model name", name)?;
        self.gateway
            .send_json(Method::POST, &["models", name, action], &[], Some(body))
            .await
    }
}
