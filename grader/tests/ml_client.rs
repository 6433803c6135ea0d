use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use db::models::{ai_grading, assignment, portfolio, rubric};
use db::test_utils::setup_test_db;
use grader::{
    BatchDispatcher, ClientConfig, DbStore, DispatchConfig, FailureKind, GradeRequest,
    GradingClient, GradingServiceError, MlClient,
};
use serde_json::{Value, json};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

type Seen = Arc<Mutex<Vec<Value>>>;

async fn spawn_scorer(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

fn client(base_url: String, timeout_ms: u64) -> MlClient {
    MlClient::new(ClientConfig {
        base_url,
        timeout: Duration::from_millis(timeout_ms),
    })
    .unwrap()
}

/// Scores every portfolio 77.5 except id 2, which gets a 500.
async fn scoring(State(seen): State<Seen>, Json(body): Json<Value>) -> impl IntoResponse {
    seen.lock().unwrap().push(body.clone());
    if body["portfolio_id"] == 2 {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": "Ollama model not loaded" })),
        );
    }
    (
        StatusCode::OK,
        Json(json!({
            "portfolio_id": body["portfolio_id"],
            "ai_grade": 77.5,
            "ai_review_report": {
                "summary": "Clear reflection",
                "rubric_seen": body["rubric"],
            },
        })),
    )
}

async fn scorer_with_log() -> (String, Seen) {
    let seen: Seen = Arc::default();
    let router = Router::new()
        .route("/grade", post(scoring))
        .route(
            "/health",
            get(|| async { Json(json!({ "ok": true, "model_loaded": true })) }),
        )
        .with_state(seen.clone());
    (spawn_scorer(router).await, seen)
}

#[tokio::test]
async fn grade_posts_payload_and_stringifies_structured_report() {
    let (url, seen) = scorer_with_log().await;
    let client = client(url, 5_000);

    let request = GradeRequest::new(5, PathBuf::from("/srv/uploads/5.pdf"), None);
    let result = client.grade(&request).await.unwrap();

    assert_eq!(result.ai_grade, Some(77.5));
    let report: Value = serde_json::from_str(result.ai_review_report.as_deref().unwrap()).unwrap();
    assert_eq!(report["summary"], "Clear reflection");
    assert_eq!(report["rubric_seen"], Value::Null);

    let bodies = seen.lock().unwrap().clone();
    assert_eq!(
        bodies,
        vec![json!({ "portfolio_id": 5, "file_path": "/srv/uploads/5.pdf", "rubric": null })]
    );
}

#[tokio::test]
async fn error_status_carries_service_detail() {
    let (url, _) = scorer_with_log().await;
    let client = client(url, 5_000);

    let err = client
        .grade(&GradeRequest::new(2, PathBuf::from("/p.pdf"), Some("Depth".into())))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(err.portfolio_id(), 2);
    assert_eq!(err.to_string(), "ML service error (500): Ollama model not loaded");
}

#[tokio::test]
async fn validation_rejection_keeps_structured_detail() {
    let router = Router::new().route(
        "/grade",
        post(|| async {
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "detail": [{ "loc": ["body", "file_path"], "msg": "field required" }] })),
            )
        }),
    );
    let client = client(spawn_scorer(router).await, 5_000);

    let err = client
        .grade(&GradeRequest::new(1, PathBuf::from("/p.pdf"), None))
        .await
        .unwrap_err();

    assert!(matches!(err, GradingServiceError::Status { status: 422, .. }));
    assert!(err.to_string().contains("field required"));
}

#[tokio::test]
async fn slow_scorer_times_out() {
    let router = Router::new().route(
        "/grade",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({ "ai_grade": 1.0 }))
        }),
    );
    let client = client(spawn_scorer(router).await, 100);

    let err = client
        .grade(&GradeRequest::new(9, PathBuf::from("/p.pdf"), None))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "timeout");
    assert!(err.to_string().starts_with("ML request timeout"));
}

#[tokio::test]
async fn unreadable_body_and_refused_connection_are_transport_errors() {
    let router = Router::new().route("/grade", post(|| async { "<html>gateway</html>" }));
    let client = client(spawn_scorer(router).await, 5_000);

    let err = client
        .grade(&GradeRequest::new(4, PathBuf::from("/p.pdf"), None))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "transport");
    assert!(err.to_string().contains("Full response: <html>gateway</html>"));

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let closed = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let err = client_for(closed)
        .grade(&GradeRequest::new(4, PathBuf::from("/p.pdf"), None))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "transport");
    assert!(err.to_string().starts_with("ML request failed"));
}

fn client_for(url: String) -> MlClient {
    client(url, 2_000)
}

#[tokio::test]
async fn health_reports_ok_flag() {
    let (url, _) = scorer_with_log().await;
    assert!(client(url, 1_000).health().await.unwrap());

    let router = Router::new().route(
        "/health",
        get(|| async { Json(json!({ "ok": false, "model_loaded": false })) }),
    );
    assert!(!client(spawn_scorer(router).await, 1_000).health().await.unwrap());
}

#[tokio::test]
async fn batch_against_http_scorer_persists_only_successes() {
    let (url, seen) = scorer_with_log().await;
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("uploads")).unwrap();

    let db = setup_test_db().await;
    let a = assignment::Entity::create_assignment(&db, "Teaching practice", "2025B", "EDU205")
        .await
        .unwrap();
    rubric::Entity::create_rubric(&db, a.id, "main", Some("Reflection 50%"), chrono::Utc::now())
        .await
        .unwrap();
    for id in 1..=3 {
        let link = format!("/uploads/{id}.pdf");
        std::fs::write(dir.path().join(&link[1..]), b"%PDF").unwrap();
        portfolio::Entity::create_portfolio_with_id(&db, id, a.id, &format!("s{id}"), &link)
            .await
            .unwrap();
    }

    let dispatcher = BatchDispatcher::new(
        Arc::new(client(url, 5_000)),
        Arc::new(DbStore::new(db.clone())),
        DispatchConfig::new(dir.path()).with_concurrency(2),
    );
    let report = dispatcher.grade_assignment(a.id).await.unwrap();

    let oks: Vec<bool> = report.outcomes.iter().map(|o| o.ok).collect();
    assert_eq!(oks, vec![true, false, true]);
    assert_eq!(report.outcomes[1].failure, Some(FailureKind::Service));
    assert_eq!(
        report.outcomes[1].error.as_deref(),
        Some("ML service error (500): Ollama model not loaded")
    );

    assert!(ai_grading::Entity::for_portfolio(&db, 2).await.unwrap().is_none());
    let stored = ai_grading::Entity::for_portfolio(&db, 1).await.unwrap().unwrap();
    assert_eq!(stored.ai_grade, Some(77.5));

    let bodies = seen.lock().unwrap().clone();
    assert_eq!(bodies.len(), 3);
    for body in &bodies {
        assert_eq!(body["rubric"], "Reflection 50%");
        let path = PathBuf::from(body["file_path"].as_str().unwrap());
        assert!(path.is_absolute());
        assert!(path.starts_with(dir.path()));
    }
}
