// vigil-core: Caching and pagination layer between views and the
// threat-detection backend.
//
// Architecture:
//
// - **Dashboard** -- cheaply cloneable facade. Reads go through the
//   query cache; mutations go straight to the gateway and invalidate
//   their resource type on success.
// - **QueryCache** -- keyed, generation-tagged read cache with in-flight
//   coalescing and per-resource invalidation broadcasts.
// - **PaginationController** -- page index/size to skip/limit mapping.
// - **CoreError** -- user-facing errors translated from `vigil_api::Error`.

pub mod cache;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod pagination;

// ── Primary re-exports ──────────────────────────────────────────────

pub use cache::{CacheKey, QueryCache, ResourceType};
pub use config::{DashboardConfig, TlsVerification};
pub use dashboard::Dashboard;
pub use error::CoreError;
pub use pagination::{PageHint, PageSize, PaginationController};

// ── Wire types consumers need alongside the facade ─────────────────

pub use vigil_api::types::{
    ActionReceipt, Alert, AlertStatistics, AlertStatus, AnalysisRequest, Comment, CommentReceipt,
    EntityId, Model, ModelPath, NewComment, PageRequest, Prediction, PredictionInput,
    ResponseAction, StatusUpdate, Threat, ThreatStatus, TrainingPayload,
};
pub use vigil_api::{LoginRedirect, SessionState, SessionStore, TracingRedirect};
