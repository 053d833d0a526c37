use reqwest::Method;

use crate::error::Error;
use crate::gateway::Gateway;
use crate::types::{
    Alert, AlertStatistics, AlertStatus, CommentReceipt, EntityId, NewComment, PageRequest,
    StatusUpdate,
};

/// `/alerts` endpoints.
#[derive(Debug, Clone, Copy)]
pub struct Alerts<'a> {
    gateway: &'a Gateway,
}

impl<'a> Alerts<'a> {
    pub(crate) fn new(gateway: &'a Gateway) -> Self {
        Self { gateway }
    }

    /// `GET /alerts?skip=..&limit=..`
    pub async fn list(&self, page: PageRequest) -> Result<Vec<Alert>, Error> {
        self.gateway
            .get_json(&["alerts"], &page.to_params())
            .await
    }

    /// `GET /alerts/{id}`
    pub async fn get(&self, id: &EntityId) -> Result<Alert, Error> {
        let id = id.to_string();
        self.gateway.get_json(&["alerts", &id], &[]).await
    }

    /// `GET /alerts/statistics`
    pub async fn statistics(&self) -> Result<AlertStatistics, Error> {
        self.gateway.get_json(&["alerts", "statistics"], &[]).await
    }

    /// `PUT /alerts/{id}/status?status=..`
    ///
    /// The status travels in the query string; the request has no body.
    pub async fn update_status(
        &self,
        id: &EntityId,
        status: AlertStatus,
    ) -> Result<StatusUpdate, Error> {
        if !status.is_settable() {
            return Err(Error::validation(format!(
                "alert status can only be set to acknowledged or resolved, not '{status}'"
            )));
        }
        let id = id.to_string();
        self.gateway
            .send_json(
                Method::PUT,
                &["alerts", &id, "status"],
                &[("status", status.to_string())],
                None::<&()>,
            )
            .await
    }

    /// `POST /alerts/{id}/comment` with body `{"text": ..}`.
    pub async fn add_comment(
        &self,
        id: &EntityId,
        comment: &NewComment,
    ) -> Result<CommentReceipt, Error> {
        let id = id.to_string();
        self.gateway
            .send_json(Method::POST, &["alerts", &id, "comment"], &[], Some(comment))
            .await
    }
}
