use reqwest::Method;
use tracing::debug;

use crate::error::Error;
use crate::gateway::Gateway;
use crate::types::{ActionReceipt, AnalysisRequest, EntityId, PageRequest, ResponseAction, Threat};

/// `/threats` endpoints.
#[derive(Debug, Clone, Copy)]
pub struct Threats<'a> {
    gateway: &'a Gateway,
}

impl<'a> Threats<'a> {
    pub(crate) fn new(gateway: &'a Gateway) -> Self {
        Self { gateway }
    }

    /// `GET /threats?skip=..&limit=..`
    pub async fn list(&self, page: PageRequest) -> Result<Vec<Threat>, Error> {
        let threats: Vec<Threat> = self
            .gateway
            .get_json(&["threats"], &page.to_params())
            .await?;
        debug!(count = threats.len(), skip = page.skip, "fetched threats");
        Ok(threats)
    }

    /// `GET /threats/{id}`
    pub async fn get(&self, id: &EntityId) -> Result<Threat, Error> {
        let id = id.to_string();
        self.gateway.get_json(&["threats", &id], &[]).await
    }

    /// `POST /threats/analyze`
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<ActionReceipt, Error> {
        self.gateway
            .send_json(
                Method::POST,
                &["threats", "analyze"],
                &[],
                Some(request),
            )
            .await
    }

    /// `POST /threats/{id}/respond`
    pub async fn respond(
        &self,
        id: &EntityId,
        action: &ResponseAction,
    ) -> Result<ActionReceipt, Error> {
        let id = id.to_string();
        self.gateway
            .send_json(
                Method::POST,
                &["threats", &id, "respond"],
                &[],
                Some(action),
            )
            .await
    }
}
