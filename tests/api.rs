//! End-to-end tests driving the HTTP router in-process.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::DateTime;
use churn_prediction_service::{
    api,
    audit::AuditLogger,
    config::AppConfig,
    metrics::ServiceMetrics,
    models::{LogisticClassifier, ModelHandle, ReadyModel},
    pipeline::PredictionService,
    schema::REFERENCE_FEATURE_ORDER,
    state::AppState,
};
use futures::future::join_all;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

fn reference_model() -> ReadyModel {
    let names: Vec<String> = REFERENCE_FEATURE_ORDER.iter().map(|s| s.to_string()).collect();
    let mut weights = vec![0.0; names.len()];
    weights[3] = -0.08; // tenure
    weights[6] = 0.03; // MonthlyCharges
    weights[26] = -1.5; // Contract_Two_year
    ReadyModel::new(Arc::new(LogisticClassifier::new(names, weights, -0.5)), "memory").unwrap()
}

fn app_with(handle: ModelHandle, audit_dir: &Path) -> Router {
    let service = PredictionService::new(
        handle,
        Arc::new(AuditLogger::new(audit_dir, "predictions.csv")),
        Arc::new(ServiceMetrics::new()),
    );
    api::app(AppState::new(service, AppConfig::default()))
}

fn customer() -> Value {
    json!({
        "tenure": 12,
        "MonthlyCharges": 70.0,
        "TotalCharges": 840.0,
        "SeniorCitizen": 0,
        "Partner": 1,
        "Dependents": 0,
        "PhoneService": 1,
        "PaperlessBilling": 1,
        "gender_Male": 1,
        "Contract_Two_year": 1,
        "PaymentMethod_Electronic_check": 0
    })
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    let request = match body {
        Some(body) => request.body(Body::from(body.to_string())).unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

fn audit_lines(dir: &Path) -> Vec<String> {
    std::fs::read_to_string(dir.join("predictions.csv"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_health_reflects_model_state() {
    let dir = tempfile::tempdir().unwrap();
    let handle = ModelHandle::unloaded();
    let app = app_with(handle.clone(), dir.path());

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model"], "not loaded");

    handle.install(reference_model()).unwrap();

    let (_, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model"], "loaded");
    assert!(DateTime::parse_from_rfc3339(body["timestamp"].as_str().unwrap()).is_ok());
}

#[tokio::test]
async fn test_predict_before_load_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_with(ModelHandle::unloaded(), dir.path());

    let (status, body) = send(&app, "POST", "/predict", Some(customer())).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["detail"], "Model not loaded");

    let (status, _) = send(&app, "POST", "/predict/batch", Some(json!([customer()]))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_predict_reference_customer() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_with(ModelHandle::ready(reference_model()), dir.path());

    let (status, body) = send(&app, "POST", "/predict", Some(customer())).await;
    assert_eq!(status, StatusCode::OK);

    let label = body["churn_prediction"].as_str().unwrap();
    assert!(label == "Will Churn" || label == "Will Not Churn");

    let probability = body["churn_probability"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&probability));
    assert_eq!(probability, (probability * 10_000.0).round() / 10_000.0);

    assert!(["High", "Medium", "Low"].contains(&body["confidence"].as_str().unwrap()));
    assert!(!body["recommendation"].as_str().unwrap().is_empty());
    assert!(DateTime::parse_from_rfc3339(body["timestamp"].as_str().unwrap()).is_ok());
}

#[tokio::test]
async fn test_field_order_does_not_matter() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_with(ModelHandle::ready(reference_model()), dir.path());

    let reordered: String = {
        let fields = customer();
        let mut pairs: Vec<(String, Value)> = fields
            .as_object()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        pairs.reverse();
        let body: Vec<String> = pairs.iter().map(|(k, v)| format!("\"{}\":{}", k, v)).collect();
        format!("{{{}}}", body.join(","))
    };

    let (_, forward) = send(&app, "POST", "/predict", Some(customer())).await;
    let (_, reversed) = send(
        &app,
        "POST",
        "/predict",
        Some(serde_json::from_str(&reordered).unwrap()),
    )
    .await;

    assert_eq!(forward["churn_probability"], reversed["churn_probability"]);
    assert_eq!(forward["churn_prediction"], reversed["churn_prediction"]);
}

#[tokio::test]
async fn test_validation_errors_are_client_errors() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_with(ModelHandle::ready(reference_model()), dir.path());

    for tenure in [-1, 500] {
        let mut body = customer();
        body["tenure"] = json!(tenure);
        let (status, response) = send(&app, "POST", "/predict", Some(body)).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response["detail"]["field"], "tenure");
    }

    let mut missing = customer();
    missing.as_object_mut().unwrap().remove("MonthlyCharges");
    let (status, response) = send(&app, "POST", "/predict", Some(missing)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response["detail"]["field"], "MonthlyCharges");

    let (status, _) = send(&app, "POST", "/predict", Some(json!([1, 2]))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Rejected requests never reach the model or the audit log
    assert!(audit_lines(dir.path()).is_empty());
}

#[tokio::test]
async fn test_batch_embeds_item_errors() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_with(ModelHandle::ready(reference_model()), dir.path());

    let mut bad = customer();
    bad["SeniorCitizen"] = json!(3);
    let (status, body) = send(
        &app,
        "POST",
        "/predict/batch",
        Some(json!([customer(), bad, customer()])),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 3);
    let predictions = body["predictions"].as_array().unwrap();
    assert_eq!(predictions.len(), 3);
    assert!(predictions[0]["churn_prediction"].is_string());
    assert!(predictions[1]["error"].as_str().unwrap().contains("SeniorCitizen"));
    assert_eq!(predictions[2], predictions[0]);
}

#[tokio::test]
async fn test_audit_rows_match_successful_predictions() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_with(ModelHandle::ready(reference_model()), dir.path());

    let calls = (0..20).map(|_| {
        let app = app.clone();
        async move { send(&app, "POST", "/predict", Some(customer())).await }
    });
    let responses = join_all(calls).await;
    assert!(responses.iter().all(|(status, _)| *status == StatusCode::OK));

    let lines = audit_lines(dir.path());
    assert_eq!(lines.len(), 21);
    assert!(lines[0].ends_with("prediction,probability,status,exec_time,timestamp"));
    assert_eq!(lines.iter().filter(|l| l.contains("prediction,probability")).count(), 1);
}

#[tokio::test]
async fn test_model_info_and_metrics() {
    let dir = tempfile::tempdir().unwrap();
    let app = app_with(ModelHandle::ready(reference_model()), dir.path());

    let (status, info) = send(&app, "GET", "/model/info", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["features_count"], 30);
    assert_eq!(info["accuracy"], 0.816);
    assert_eq!(info["f1_score"], 0.611);

    send(&app, "POST", "/predict", Some(customer())).await;
    let mut bad = customer();
    bad["tenure"] = json!(-1);
    send(&app, "POST", "/predict", Some(bad)).await;

    let (status, metrics) = send(&app, "GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(metrics["predictions_served"], 1);
    assert_eq!(metrics["errors_by_kind"]["validation"], 1);
}
