use std::sync::Arc;

use anyhow::Context;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use uuid::Uuid;

use crate::classifier::RiskModel;
use crate::ingest;
use crate::models::AnalyzeRequest;
use crate::risk;

#[derive(Clone, Default)]
pub struct AppState {
    pub model: Option<Arc<RiskModel>>,
}

pub fn router(state: AppState) -> Router {
    // The dashboard frontend calls in from another origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/analyze", post(analyze))
        .route("/analyze/batch", post(analyze_batch))
        .route("/health", get(health))
        .with_state(state)
        .layer(cors)
}

pub async fn serve(host: &str, port: u16, state: AppState) -> anyhow::Result<()> {
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "analysis service listening");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

async fn analyze(State(state): State<AppState>, Json(request): Json<AnalyzeRequest>) -> Response {
    let request_id = Uuid::new_v4();

    let Some(subjects) = request.subjects else {
        warn!(%request_id, "analyze request without a subjects field");
        return bad_request("Invalid data format");
    };
    if subjects.is_empty() {
        warn!(%request_id, "analyze request with an empty subject list");
        return bad_request("No subjects data provided");
    }

    let assessment = risk::assess(&subjects, request.fees_paid, state.model.as_deref());
    info!(
        %request_id,
        subjects = subjects.len(),
        risk_level = %assessment.risk_level,
        score = assessment.predicted_risk_score,
        "analysis complete"
    );
    Json(assessment).into_response()
}

async fn analyze_batch(State(state): State<AppState>, body: String) -> Response {
    let request_id = Uuid::new_v4();

    let batch = ingest::assess_csv(body.as_bytes(), state.model.as_deref());
    info!(
        %request_id,
        assessed = batch.count,
        skipped = batch.skipped.len(),
        "batch analysis complete"
    );
    Json(batch).into_response()
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_reports_healthy() {
        let response = health().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "status": "healthy" }));
    }

    #[tokio::test]
    async fn analyze_rejects_a_missing_subjects_field() {
        let request = AnalyzeRequest {
            subjects: None,
            fees_paid: true,
        };
        let response = analyze(State(AppState::default()), Json(request)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "Invalid data format");
    }

    #[tokio::test]
    async fn analyze_rejects_an_empty_subject_list() {
        let request = AnalyzeRequest {
            subjects: Some(Vec::new()),
            fees_paid: true,
        };
        let response = analyze(State(AppState::default()), Json(request)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["error"], "No subjects data provided");
    }

    #[tokio::test]
    async fn analyze_returns_a_wire_shaped_assessment() {
        let request: AnalyzeRequest = serde_json::from_value(json!({
            "subjects": [{ "name": "Math", "attendance": 90, "marks": 85 }]
        }))
        .unwrap();
        // feesPaid was omitted and must default to paid.
        assert!(request.fees_paid);

        let response = analyze(State(AppState::default()), Json(request)).await;
        assert_eq!(response.status(), StatusCode::OK);

        let value = body_json(response).await;
        assert_eq!(value["riskLevel"], "Low");
        assert_eq!(value["predictedRiskScore"], 0.0);
        assert_eq!(value["factors"], json!(["Good overall performance"]));
        assert_eq!(value["subjectCount"], 1);
    }

    #[tokio::test]
    async fn batch_endpoint_assesses_csv_bodies() {
        let body = "name,attendance,marks,fees_paid\nMath,90,85,true\nPhys,60,55,false\n";
        let response = analyze_batch(State(AppState::default()), body.to_string()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let value = body_json(response).await;
        assert_eq!(value["count"], 2);
        assert_eq!(value["results"][0]["name"], "Math");
        assert_eq!(value["results"][1]["riskLevel"], "Medium");
    }
}
