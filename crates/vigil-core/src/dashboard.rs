// ── Dashboard facade ──
//
// The single entry point views talk to. Reads are served through the
// query cache; mutations go straight to the gateway and, once the
// backend confirms them, invalidate every cached query of their
// resource type before control returns to the caller.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{info, warn};

use vigil_api::types::{
    ActionReceipt, Alert, AlertStatistics, AlertStatus, AnalysisRequest, CommentReceipt, EntityId,
    Model, ModelPath, NewComment, PageRequest, Prediction, PredictionInput, ResponseAction,
    StatusUpdate, Threat, TrainingPayload,
};
use vigil_api::{Gateway, LoginRedirect, SessionStore};

use crate::cache::{CacheKey, QueryCache, ResourceType};
use crate::config::DashboardConfig;
use crate::error::CoreError;

/// Cheaply cloneable handle to one backend.
#[derive(Clone)]
pub struct Dashboard {
    inner: Arc<DashboardInner>,
}

struct DashboardInner {
    config: DashboardConfig,
    gateway: Arc<Gateway>,
    cache: QueryCache,
}

impl Dashboard {
    /// Build the gateway and an empty cache. The session starts with
    /// `config.token` if one was supplied, anonymous otherwise.
    pub fn new(
        config: DashboardConfig,
        redirect: Arc<dyn LoginRedirect>,
    ) -> Result<Self, CoreError> {
        let session = Arc::new(match &config.token {
            Some(token) => SessionStore::with_token(token.clone()),
            None => SessionStore::new(),
        });
        let gateway = Gateway::new(
            config.api_url.as_str(),
            &config.transport(),
            session,
            redirect,
        )?;
        let cache = QueryCache::with_max_age(config.cache_max_age);

        Ok(Self {
            inner: Arc::new(DashboardInner {
                config,
                gateway: Arc::new(gateway),
                cache,
            }),
        })
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.inner.config
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        self.inner.gateway.session()
    }

    pub fn gateway(&self) -> &Gateway {
        &self.inner.gateway
    }

    pub fn cache(&self) -> &QueryCache {
        &self.inner.cache
    }

    /// Resource types invalidated by mutations, for views that refetch.
    pub fn invalidations(&self) -> broadcast::Receiver<ResourceType> {
        self.inner.cache.subscribe()
    }

    fn invalidate(&self, resource: ResourceType, operation: &str) {
        let marked = self.inner.cache.invalidate(resource);
        info!(%resource, operation, marked, "mutation confirmed; cached queries invalidated");
    }

    /// Invalidate once the backend has accepted a mutation, including a
    /// 2xx whose receipt could not be decoded.
    fn settle<T>(
        &self,
        resource: ResourceType,
        operation: &str,
        result: Result<T, vigil_api::Error>,
    ) -> Result<T, vigil_api::Error> {
        match &result {
            Ok(_) => self.invalidate(resource, operation),
            Err(e) if e.was_accepted() => {
                warn!(%resource, operation, error = %e, "mutation accepted but receipt undecodable");
                self.invalidate(resource, operation);
            }
            Err(_) => {}
        }
        result
    }

    // ── Threats ──────────────────────────────────────────────────────

    pub async fn threats(&self, page: PageRequest) -> Result<Arc<Vec<Threat>>, CoreError> {
        let key = page_key(ResourceType::Threat, page);
        let gateway = Arc::clone(&self.inner.gateway);
        self.inner
            .cache
            .read(&key, move || async move {
                gateway.threats().list(page).await.map_err(CoreError::from)
            })
            .await
    }

    pub async fn threat(&self, id: &EntityId) -> Result<Arc<Threat>, CoreError> {
        let key = entity_key(ResourceType::Threat, id);
        let gateway = Arc::clone(&self.inner.gateway);
        let id = id.clone();
        self.inner
            .cache
            .read(&key, move || async move {
                gateway
                    .threats()
                    .get(&id)
                    .await
                    .map_err(|e| CoreError::from_lookup(e, "threat", &id.to_string()))
            })
            .await
    }

    pub async fn analyze_threat(
        &self,
        request: &AnalysisRequest,
    ) -> Result<ActionReceipt, CoreError> {
        let result = self.inner.gateway.threats().analyze(request).await;
        self.settle(ResourceType::Threat, "analyze", result)
            .map_err(CoreError::from)
    }

    pub async fn respond_to_threat(
        &self,
        id: &EntityId,
        action: &ResponseAction,
    ) -> Result<ActionReceipt, CoreError> {
        let result = self
            .inner
            .gateway
            .threats()
            .respond(id, action)
            .await;
        self.settle(ResourceType::Threat, "respond", result)
            .map_err(|e| CoreError::from_lookup(e, "threat", &id.to_string()))
    }

    // ── Alerts ───────────────────────────────────────────────────────

    pub async fn alerts(&self, page: PageRequest) -> Result<Arc<Vec<Alert>>, CoreError> {
        let key = page_key(ResourceType::Alert, page);
        let gateway = Arc::clone(&self.inner.gateway);
        self.inner
            .cache
            .read(&key, move || async move {
                gateway.alerts().list(page).await.map_err(CoreError::from)
            })
            .await
    }

    pub async fn alert(&self, id: &EntityId) -> Result<Arc<Alert>, CoreError> {
        let key = entity_key(ResourceType::Alert, id);
        let gateway = Arc::clone(&self.inner.gateway);
        let id = id.clone();
        self.inner
            .cache
            .read(&key, move || async move {
                gateway
                    .alerts()
                    .get(&id)
                    .await
                    .map_err(|e| CoreError::from_lookup(e, "alert", &id.to_string()))
            })
            .await
    }

    pub async fn alert_statistics(&self) -> Result<Arc<AlertStatistics>, CoreError> {
        let key = CacheKey::of(ResourceType::Alert, "statistics");
        let gateway = Arc::clone(&self.inner.gateway);
        self.inner
            .cache
            .read(&key, move || async move {
                gateway.alerts().statistics().await.map_err(CoreError::from)
            })
            .await
    }

    pub async fn update_alert_status(
        &self,
        id: &EntityId,
        status: AlertStatus,
    ) -> Result<StatusUpdate, CoreError> {
        let result = self
            .inner
            .gateway
            .alerts()
            .update_status(id, status)
            .await;
        self.settle(ResourceType::Alert, "update_status", result)
            .map_err(|e| CoreError::from_lookup(e, "alert", &id.to_string()))
    }

    pub async fn acknowledge_alert(&self, id: &EntityId) -> Result<StatusUpdate, CoreError> {
        self.update_alert_status(id, AlertStatus::Acknowledged).await
    }

    pub async fn resolve_alert(&self, id: &EntityId) -> Result<StatusUpdate, CoreError> {
        self.update_alert_status(id, AlertStatus::Resolved).await
    }

    pub async fn add_comment(
        &self,
        id: &EntityId,
        text: &str,
    ) -> Result<CommentReceipt, CoreError> {
        let comment = NewComment::new(text)?;
        let result = self
            .inner
            .gateway
            .alerts()
            .add_comment(id, &comment)
            .await;
        self.settle(ResourceType::Alert, "comment", result)
            .map_err(|e| CoreError::from_lookup(e, "alert", &id.to_string()))
    }

    // ── Models ───────────────────────────────────────────────────────

    pub async fn models(&self) -> Result<Arc<Vec<Model>>, CoreError> {
        let key = CacheKey::of(ResourceType::Model, "list");
        let gateway = Arc::clone(&self.inner.gateway);
        self.inner
            .cache
            .read(&key, move || async move {
                gateway.models().list().await.map_err(CoreError::from)
            })
            .await
    }

    pub async fn model(&self, name: &str) -> Result<Arc<Model>, CoreError> {
        let key = CacheKey::builder(ResourceType::Model, "get")
            .param("name", name)
            .build();
        let gateway = Arc::clone(&self.inner.gateway);
        let name = name.to_owned();
        self.inner
            .cache
            .read(&key, move || async move {
                gateway
                    .models()
                    .get(&name)
                    .await
                    .map_err(|e| CoreError::from_lookup(e, "model", &name))
            })
            .await
    }

    pub async fn train_model(
        &self,
        name: &str,
        payload: &TrainingPayload,
    ) -> Result<ActionReceipt, CoreError> {
        let result = self
            .inner
            .gateway
            .models()
            .train(name, payload)
            .await;
        self.settle(ResourceType::Model, "train", result)
            .map_err(|e| CoreError::from_lookup(e, "model", name))
    }

    /// Train from user-supplied JSON text. Malformed input fails here
    /// and no request is made.
    pub async fn train_model_json(
        &self,
        name: &str,
        raw: &str,
    ) -> Result<ActionReceipt, CoreError> {
        let payload = TrainingPayload::from_json_str(raw)?;
        self.train_model(name, &payload).await
    }

    /// Read-only on the backend, so nothing is invalidated.
    pub async fn predict(
        &self,
        name: &str,
        input: &PredictionInput,
    ) -> Result<Prediction, CoreError> {
        self.inner
            .gateway
            .models()
            .predict(name, input)
            .await
            .map_err(|e| CoreError::from_lookup(e, "model", name))
    }

    pub async fn save_model(&self, name: &str, path: &str) -> Result<ActionReceipt, CoreError> {
        let path = ModelPath::new(path)?;
        let result = self
            .inner
            .gateway
            .models()
            .save(name, &path)
            .await;
        self.settle(ResourceType::Model, "save", result)
            .map_err(|e| CoreError::from_lookup(e, "model", name))
    }

    pub async fn load_model(&self, name: &str, path: &str) -> Result<ActionReceipt, CoreError> {
        let path = ModelPath::new(path)?;
        let result = self
            .inner
            .gateway
            .models()
            .load(name, &path)
            .await;
        self.settle(ResourceType::Model, "load", result)
            .map_err(|e| CoreError::from_lookup(e, "model", name))
    }
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("api_url", &self.inner.config.api_url.as_str())
            .field("cache", &self.inner.cache)
            .finish_non_exhaustive()
    }
}

fn page_key(resource: ResourceType, page: PageRequest) -> CacheKey {
    CacheKey::builder(resource, "list")
        .param("skip", page.skip)
        .param("limit", page.limit)
        .build()
}

fn entity_key(resource: ResourceType, id: &EntityId) -> CacheKey {
    CacheKey::builder(resource, "get").param("id", id).build()
}
