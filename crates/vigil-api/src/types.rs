// Wire types for the threat-detection backend.
//
// Entities are read-only views of server state. The only values built
// client-side are request payloads, and those validate on construction
// so an invalid payload can never reach the gateway.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Error;

// ── Identifiers ─────────────────────────────────────────────────────

/// Identifier of a threat or alert.
///
/// The backend serves numeric ids from the database and string ids from
/// its detection pipeline; both are treated as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    Numeric(u64),
    Text(String),
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl FromStr for EntityId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl From<u64> for EntityId {
    fn from(n: u64) -> Self {
        Self::Numeric(n)
    }
}

impl From<String> for EntityId {
    fn from(s: String) -> Self {
        match s.parse::<u64>() {
            Ok(n) => Self::Numeric(n),
            Err(_) => Self::Text(s),
        }
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self::from(s.to_owned())
    }
}

// ── Timestamps ──────────────────────────────────────────────────────

/// Backend timestamps arrive either as RFC 3339 or as naive ISO-8601
/// (Python `isoformat()` without an offset). Naive values are UTC.
pub(crate) mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, de};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            })
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid timestamp: {raw:?}")))
    }

    pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            None => Ok(None),
            Some(raw) => parse(&raw)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {raw:?}"))),
        }
    }
}

/// Severity and accuracy are documented as lying in [0, 1]. The layer
/// does not enforce it; callers can use this to flag upstream defects.
pub fn is_in_unit_range(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

// ── Pagination ──────────────────────────────────────────────────────

/// Offset/limit parameters for list endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageRequest {
    pub skip: u64,
    pub limit: u32,
}

impl PageRequest {
    pub fn new(skip: u64, limit: u32) -> Self {
        Self { skip, limit }
    }

    /// First page of the given size.
    pub fn first(limit: u32) -> Self {
        Self { skip: 0, limit }
    }

    pub(crate) fn to_params(self) -> [(&'static str, String); 2] {
        [
            ("skip", self.skip.to_string()),
            ("limit", self.limit.to_string()),
        ]
    }
}

// ── Threats ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatStatus {
    New,
    Analyzing,
    Resolved,
    #[serde(other)]
    Unknown,
}

impl ThreatStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Analyzing => "analyzing",
            Self::Resolved => "resolved",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ThreatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Threat {
    pub id: EntityId,
    pub threat_type: String,
    pub severity: f64,
    pub source_ip: String,
    pub destination_ip: String,
    pub status: ThreatStatus,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub timestamp: DateTime<Utc>,
    /// Opaque detector payload.
    #[serde(default)]
    pub raw_data: Value,
    #[serde(default)]
    pub confidence_score: Option<f64>,
}

/// Body of `POST /threats/analyze`: an arbitrary JSON object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AnalysisRequest(Map<String, Value>);

impl AnalysisRequest {
    pub fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::validation(format!(
                "analysis request must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Body of `POST /threats/{id}/respond`: an arbitrary JSON object
/// describing the response action.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResponseAction(Map<String, Value>);

impl ResponseAction {
    pub fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::validation(format!(
                "response action must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Shorthand for `{"action": "<name>"}`.
    pub fn named(action: &str) -> Self {
        let mut map = Map::new();
        map.insert("action".into(), Value::String(action.to_owned()));
        Self(map)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

// ── Alerts ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    New,
    Acknowledged,
    Resolved,
    #[serde(other)]
    Unknown,
}

impl AlertStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Acknowledged => "acknowledged",
            Self::Resolved => "resolved",
            Self::Unknown => "unknown",
        }
    }

    /// Statuses a client may request. The backend only moves alerts
    /// forward, so `new` (and anything unrecognised) is never a target.
    pub fn is_settable(self) -> bool {
        matches!(self, Self::Acknowledged | Self::Resolved)
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "new" => Ok(Self::New),
            "acknowledged" | "ack" => Ok(Self::Acknowledged),
            "resolved" => Ok(Self::Resolved),
            other => Err(Error::validation(format!("unknown alert status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: EntityId,
    pub alert_type: String,
    pub message: String,
    pub status: AlertStatus,
    #[serde(deserialize_with = "timestamp::deserialize")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: Value,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threat_id: Option<EntityId>,
}

/// Body of `POST /alerts/{id}/comment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewComment {
    text: String,
}

impl NewComment {
    /// Blank comments are rejected; the text is otherwise sent as typed.
    pub fn new(text: impl Into<String>) -> Result<Self, Error> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(Error::validation("comment text must not be blank"));
        }
        Ok(Self { text })
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Response of `PUT /alerts/{id}/status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub id: EntityId,
    pub status: AlertStatus,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Response of `POST /alerts/{id}/comment`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentReceipt {
    pub id: EntityId,
    pub comment: Comment,
    #[serde(default)]
    pub message: Option<String>,
}

/// Aggregate alert counters. Shape is backend-defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertStatistics(pub Value);

// ── Models ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub name: String,
    #[serde(default)]
    pub model_type: String,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub last_training_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub accuracy: Option<f64>,
}

/// Entry of the name-keyed catalog shape, where the name is the map key.
#[derive(Debug, Deserialize)]
struct KeyedModel {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    model_type: String,
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    last_training_time: Option<DateTime<Utc>>,
    #[serde(default)]
    accuracy: Option<f64>,
}

/// `GET /models` is served either as a list or as an object keyed by
/// model name. Both normalize to a list ordered by name.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ModelCatalog {
    List(Vec<Model>),
    Keyed(BTreeMap<String, KeyedModel>),
}

impl ModelCatalog {
    pub(crate) fn into_models(self) -> Vec<Model> {
        let mut models: Vec<Model> = match self {
            Self::List(models) => models,
            Self::Keyed(map) => map
                .into_iter()
                .map(|(key, info)| Model {
                    name: info.name.unwrap_or(key),
                    model_type: info.model_type,
                    last_training_time: info.last_training_time,
                    accuracy: info.accuracy,
                })
                .collect(),
        };
        models.sort_by(|a, b| a.name.cmp(&b.name));
        models
    }
}

/// Body of `POST /models/{name}/train`: the user's JSON object, sent
/// as-is.
///
/// `features` must be a non-empty array; `labels`, when present, must
/// pair one-to-one with the features. Other keys (hyperparameters and
/// the like) pass through untouched.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TrainingPayload(Map<String, Value>);

impl TrainingPayload {
    pub fn new(features: Vec<Value>, labels: Option<Vec<Value>>) -> Result<Self, Error> {
        let mut map = Map::new();
        map.insert("features".into(), Value::Array(features));
        if let Some(labels) = labels {
            map.insert("labels".into(), Value::Array(labels));
        }
        Self::from_map(map)
    }

    pub fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Object(map) => Self::from_map(map),
            other => Err(Error::validation(format!(
                "training payload must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    fn from_map(map: Map<String, Value>) -> Result<Self, Error> {
        let features = match map.get("features") {
            Some(Value::Array(items)) if !items.is_empty() => items.len(),
            Some(Value::Array(_)) | None => {
                return Err(Error::validation("training payload has no features"));
            }
            Some(other) => {
                return Err(Error::validation(format!(
                    "training features must be an array, got {}",
                    json_kind(other)
                )));
            }
        };
        match map.get("labels") {
            None | Some(Value::Null) => {}
            Some(Value::Array(labels)) if labels.len() == features => {}
            Some(Value::Array(labels)) => {
                return Err(Error::validation(format!(
                    "training payload has {features} features but {} labels",
                    labels.len()
                )));
            }
            Some(other) => {
                return Err(Error::validation(format!(
                    "training labels must be an array, got {}",
                    json_kind(other)
                )));
            }
        }
        Ok(Self(map))
    }

    /// Parse user-supplied JSON text. Syntax errors are validation
    /// failures, never requests.
    pub fn from_json_str(raw: &str) -> Result<Self, Error> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| Error::validation(format!("training data is not valid JSON: {e}")))?;
        Self::from_value(value)
    }

    pub fn features(&self) -> &[Value] {
        self.0
            .get("features")
            .and_then(Value::as_array)
            .map_or(&[], Vec::as_slice)
    }

    pub fn labels(&self) -> Option<&[Value]> {
        self.0
            .get("labels")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// Body of `POST /models/{name}/predict`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionInput {
    features: Vec<Value>,
}

impl PredictionInput {
    pub fn new(features: Vec<Value>) -> Result<Self, Error> {
        if features.is_empty() {
            return Err(Error::validation("prediction input has no features"));
        }
        Ok(Self { features })
    }

    pub fn from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::Object(mut map) => match map.remove("features") {
                Some(Value::Array(items)) => Self::new(items),
                _ => Err(Error::validation(
                    "prediction input must carry a 'features' array",
                )),
            },
            other => Err(Error::validation(format!(
                "prediction input must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    pub fn from_json_str(raw: &str) -> Result<Self, Error> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| Error::validation(format!("prediction input is not valid JSON: {e}")))?;
        Self::from_value(value)
    }

    pub fn features(&self) -> &[Value] {
        &self.features
    }
}

/// Body of `POST /models/{name}/save` and `/load`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelPath {
    path: String,
}

impl ModelPath {
    pub fn new(path: impl Into<String>) -> Result<Self, Error> {
        let path = path.into();
        if path.trim().is_empty() {
            return Err(Error::validation("model path must not be blank"));
        }
        Ok(Self { path })
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }
}

/// Response of `POST /models/{name}/predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub predictions: Vec<Value>,
    #[serde(default)]
    pub probabilities: Vec<Value>,
}

// ── Generic acknowledgement ─────────────────────────────────────────

/// `{"status": ..., "message": ..., ...}` returned by the action
/// endpoints (analyze, respond, train, save, load).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionReceipt {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn entity_id_parses_numeric_and_text() {
        assert_eq!(EntityId::from("42"), EntityId::Numeric(42));
        assert_eq!(
            EntityId::from("THR-0007"),
            EntityId::Text("THR-0007".into())
        );
        assert_eq!(EntityId::from(7).to_string(), "7");
    }

    #[test]
    fn threat_accepts_naive_timestamps_and_unknown_status() {
        let threat: Threat = serde_json::from_value(json!({
            "id": "THR-1",
            "threat_type": "port_scan",
            "severity": 0.8,
            "source_ip": "192.168.1.10",
            "destination_ip": "10.0.0.5",
            "status": "false_positive",
            "timestamp": "2024-06-15T10:30:00.123456",
            "raw_data": {"ports": [22, 80]}
        }))
        .unwrap();

        assert_eq!(threat.status, ThreatStatus::Unknown);
        assert_eq!(threat.timestamp.to_rfc3339(), "2024-06-15T10:30:00.123456+00:00");
        assert_eq!(threat.raw_data["ports"][1], 80);
        assert!(threat.confidence_score.is_none());
    }

    #[test]
    fn alert_defaults_missing_collections() {
        let alert: Alert = serde_json::from_value(json!({
            "id": 5,
            "alert_type": "intrusion",
            "message": "Suspicious login",
            "status": "new",
            "timestamp": "2024-06-15T10:30:00Z"
        }))
        .unwrap();

        assert_eq!(alert.id, EntityId::Numeric(5));
        assert!(alert.comments.is_empty());
        assert_eq!(alert.metadata, Value::Null);
    }

    #[test]
    fn model_catalog_accepts_both_shapes() {
        let list: ModelCatalog = serde_json::from_value(json!([
            {"name": "log_analyzer", "model_type": "nlp"},
            {"name": "anomaly_detector", "model_type": "isolation_forest", "accuracy": 0.91}
        ]))
        .unwrap();
        let names: Vec<String> = list.into_models().into_iter().map(|m| m.name).collect();
        assert_eq!(names, vec!["anomaly_detector", "log_analyzer"]);

        let keyed: ModelCatalog = serde_json::from_value(json!({
            "network_classifier": {"model_type": "random_forest", "last_training_time": null}
        }))
        .unwrap();
        let models = keyed.into_models();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].name, "network_classifier");
        assert_eq!(models[0].model_type, "random_forest");
        assert!(models[0].last_training_time.is_none());
    }

    #[test]
    fn alert_status_settable_targets() {
        assert!(AlertStatus::Acknowledged.is_settable());
        assert!(AlertStatus::Resolved.is_settable());
        assert!(!AlertStatus::New.is_settable());
        assert!(!AlertStatus::Unknown.is_settable());
        assert_eq!("ACK".parse::<AlertStatus>().unwrap(), AlertStatus::Acknowledged);
    }

    #[test]
    fn training_payload_rejects_malformed_input() {
        assert!(TrainingPayload::from_json_str("{features: [1, 2]").is_err());
        assert!(TrainingPayload::from_json_str("[1, 2, 3]").is_err());
        assert!(TrainingPayload::from_json_str(r#"{"labels": [1]}"#).is_err());
        assert!(TrainingPayload::from_json_str(r#"{"features": []}"#).is_err());
        assert!(TrainingPayload::from_json_str(r#"{"features": "x"}"#).is_err());
        assert!(
            TrainingPayload::from_json_str(r#"{"features": [[1], [2]], "labels": [0]}"#).is_err()
        );
    }

    #[test]
    fn training_payload_serializes_features_and_labels() {
        let payload =
            TrainingPayload::from_json_str(r#"{"features": [[0.1, 0.2]], "labels": [1]}"#).unwrap();
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"features": [[0.1, 0.2]], "labels": [1]})
        );

        let unlabeled = TrainingPayload::from_json_str(r#"{"features": [[1]]}"#).unwrap();
        assert_eq!(
            serde_json::to_value(&unlabeled).unwrap(),
            json!({"features": [[1]]})
        );
    }

    #[test]
    fn training_payload_keeps_extra_keys() {
        let payload = TrainingPayload::from_json_str(
            r#"{"features": [[1], [2]], "labels": [0, 1], "epochs": 5, "params": {"depth": 3}}"#,
        )
        .unwrap();
        assert_eq!(payload.features().len(), 2);
        assert_eq!(payload.labels().map(<[Value]>::len), Some(2));
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"features": [[1], [2]], "labels": [0, 1], "epochs": 5, "params": {"depth": 3}})
        );
    }

    #[test]
    fn blank_comment_and_path_are_rejected() {
        assert!(NewComment::new("   \n").is_err());
        assert_eq!(NewComment::new(" looks benign ").unwrap().text(), " looks benign ");
        assert!(ModelPath::new("").is_err());
    }

    #[test]
    fn action_receipt_keeps_extra_fields() {
        let receipt: ActionReceipt = serde_json::from_value(json!({
            "status": "response_initiated",
            "threat_id": "THR-1"
        }))
        .unwrap();
        assert_eq!(receipt.status, "response_initiated");
        assert_eq!(receipt.details["threat_id"], "THR-1");
    }

    #[test]
    fn unit_range_helper() {
        assert!(is_in_unit_range(0.0));
        assert!(is_in_unit_range(1.0));
        assert!(!is_in_unit_range(1.2));
        assert!(!is_in_unit_range(f64::NAN));
    }
}
