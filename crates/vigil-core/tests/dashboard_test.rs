#![allow(clippy::unwrap_used)]
// End-to-end tests for `Dashboard` against a wiremock backend: reads are
// cached, successful mutations invalidate their resource type, and
// validation failures never reach the network.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use vigil_core::{
    AlertStatus, CoreError, Dashboard, DashboardConfig, EntityId, LoginRedirect, PageRequest,
    PageSize, PaginationController, ResourceType,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, Dashboard, Arc<AtomicUsize>) {
    let server = MockServer::start().await;
    let api_url = Url::parse(&format!("{}/api/v1", server.uri())).unwrap();
    let config = DashboardConfig::new(api_url).with_token("tok".to_string().into());

    let redirects = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&redirects);
    let redirect: Arc<dyn LoginRedirect> = Arc::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    });
    let dashboard = Dashboard::new(config, redirect).unwrap();
    (server, dashboard, redirects)
}

fn alert_json(id: u64, status: &str) -> serde_json::Value {
    json!({
        "id": id,
        "alert_type": "intrusion",
        "message": "Suspicious login",
        "status": status,
        "timestamp": "2024-06-15T10:30:00",
        "metadata": {},
        "comments": []
    })
}

fn count_for(requests: &[wiremock::Request], wanted: &str) -> usize {
    requests
        .iter()
        .filter(|r| r.url.path() == wanted)
        .count()
}

// ── Cache behavior ──────────────────────────────────────────────────

#[tokio::test]
async fn test_repeated_reads_hit_the_cache() {
    let (server, dashboard, _) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/threats"))
        .and(query_param("skip", "20"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let page = PaginationController::at(2, PageSize::Ten).request();
    dashboard.threats(page).await.unwrap();
    dashboard.threats(page).await.unwrap();
}

#[tokio::test]
async fn test_concurrent_reads_issue_one_request() {
    let (server, dashboard, _) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/models"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([{"name": "clf", "model_type": "random_forest"}]))
                .set_delay(std::time::Duration::from_millis(50)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (a, b) = tokio::join!(dashboard.models(), dashboard.models());
    assert_eq!(a.unwrap(), b.unwrap());
}

#[tokio::test]
async fn test_accepted_mutation_with_empty_body_still_invalidates() {
    let (server, dashboard, _) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/alerts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([alert_json(5, "new")])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/alerts"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([alert_json(5, "acknowledged")])),
        )
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/alerts/5/status"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let page = PageRequest::first(10);
    assert_eq!(dashboard.alerts(page).await.unwrap()[0].status, AlertStatus::New);

    let mut notices = dashboard.invalidations();
    let result = dashboard.acknowledge_alert(&EntityId::from(5)).await;
    assert!(result.is_err(), "undecodable receipt is still reported");
    assert_eq!(notices.try_recv().unwrap(), ResourceType::Alert);

    let after = dashboard.alerts(page).await.unwrap();
    assert_eq!(after[0].status, AlertStatus::Acknowledged);
}

#[tokio::test]
async fn test_training_receipt_missing_fields_still_invalidates_models() {
    let (server, dashboard, _) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/models/clf/train"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
        .expect(1)
        .mount(&server)
        .await;

    dashboard.models().await.unwrap();
    let result = dashboard
        .train_model_json("clf", r#"{"features": [[1.0, 2.0]], "labels": [0]}"#)
        .await;
    assert!(result.is_err());

    dashboard.models().await.unwrap();
    let requests = server.received_requests().await.unwrap();
    assert_eq!(count_for(&requests, "/api/v1/models"), 2);
}

#[tokio::test]
async fn test_acknowledge_invalidates_every_alert_query() {
    let (server, dashboard, _) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/alerts"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([alert_json(5, "new")])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/alerts"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([alert_json(5, "acknowledged")])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/alerts/statistics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 1})))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/alerts/5/status"))
        .and(query_param("status", "acknowledged"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": 5, "status": "acknowledged"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let page = PageRequest::first(10);
    let before = dashboard.alerts(page).await.unwrap();
    dashboard.alert_statistics().await.unwrap();
    assert_eq!(before[0].status, AlertStatus::New);

    let mut notices = dashboard.invalidations();
    dashboard.acknowledge_alert(&EntityId::from(5)).await.unwrap();
    assert_eq!(notices.try_recv().unwrap(), ResourceType::Alert);

    let after = dashboard.alerts(page).await.unwrap();
    dashboard.alert_statistics().await.unwrap();
    assert_eq!(after[0].status, AlertStatus::Acknowledged);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(count_for(&requests, "/api/v1/alerts"), 2);
    assert_eq!(count_for(&requests, "/api/v1/alerts/statistics"), 2);
}

#[tokio::test]
async fn test_mutation_leaves_other_resources_cached() {
    let (server, dashboard, _) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/threats/analyze"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "analyzed"})))
        .mount(&server)
        .await;

    dashboard.models().await.unwrap();
    let request = vigil_core::AnalysisRequest::from_value(json!({"source_ip": "10.0.0.1"})).unwrap();
    dashboard.analyze_threat(&request).await.unwrap();
    dashboard.models().await.unwrap();
}

#[tokio::test]
async fn test_failed_mutation_does_not_invalidate() {
    let (server, dashboard, _) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/alerts/statistics"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"total": 3})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/alerts/9/comment"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"detail": "Alert not found"})))
        .mount(&server)
        .await;

    dashboard.alert_statistics().await.unwrap();
    let err = dashboard
        .add_comment(&EntityId::from(9), "triaged")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }), "got: {err:?}");
    dashboard.alert_statistics().await.unwrap();
}

// ── Validation ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_invalid_training_json_never_posts() {
    let (server, dashboard, _) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/v1/models/clf/train"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    for raw in ["{features: [1]}", r#"{"features": []}"#, r#"{"labels": [1]}"#] {
        let err = dashboard.train_model_json("clf", raw).await.unwrap_err();
        assert!(matches!(err, CoreError::ValidationFailed { .. }), "got: {err:?}");
    }
}

#[tokio::test]
async fn test_training_invalidates_models() {
    let (server, dashboard, _) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/models"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v1/models/clf/train"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "training_started"})))
        .expect(1)
        .mount(&server)
        .await;

    dashboard.models().await.unwrap();
    dashboard
        .train_model_json("clf", r#"{"features": [[1, 2]], "labels": [0]}"#)
        .await
        .unwrap();
    dashboard.models().await.unwrap();
}

#[tokio::test]
async fn test_blank_comment_is_rejected_locally() {
    let (server, dashboard, _) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = dashboard
        .add_comment(&EntityId::from(5), "   ")
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ValidationFailed { .. }));
}

// ── Session expiry ──────────────────────────────────────────────────

#[tokio::test]
async fn test_expired_session_surfaces_and_is_not_cached() {
    let (server, dashboard, redirects) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/threats/1"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&server)
        .await;

    let id = EntityId::from(1);
    let err = dashboard.threat(&id).await.unwrap_err();
    assert!(err.is_session_expired());
    assert!(!dashboard.session().is_authenticated());

    // Second attempt goes out again, without credentials.
    assert!(dashboard.threat(&id).await.is_err());
    let requests = server.received_requests().await.unwrap();
    assert!(requests[1].headers.get("authorization").is_none());
    assert_eq!(redirects.load(Ordering::SeqCst), 2);
}
