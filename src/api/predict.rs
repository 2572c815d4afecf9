use std::time::Instant;

use axum::{Json, extract::State, extract::rejection::JsonRejection};
use serde::Deserialize;
use tracing::{debug, info};

use super::error::ApiError;
use crate::{app::AppState, classification::ClassificationResult};

pub(crate) const EMPTY_TEXT_MESSAGE: &str = "Provide text in request body";

#[derive(Debug, Deserialize)]
pub(crate) struct PredictRequest {
    #[serde(default)]
    text: Option<String>,
}

/// Scores `text`, recording latency and the resulting label.
pub(crate) fn classify_text(state: &AppState, text: &str) -> Result<ClassificationResult, ApiError> {
    let started = Instant::now();
    match state.classifier().classify(text) {
        Ok(result) => {
            state
                .telemetry()
                .record_classification(result.label, started.elapsed());
            debug!(label = %result.label, score = result.score, "text classified");
            Ok(result)
        }
        Err(error) => {
            state.telemetry().record_validation_failure();
            debug!(%error, "classification rejected");
            Err(ApiError::validation(EMPTY_TEXT_MESSAGE))
        }
    }
}

/// POST /api/predict
/// 保存せずに判定だけを返す
pub(crate) async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<PredictRequest>, JsonRejection>,
) -> Result<Json<ClassificationResult>, ApiError> {
    let Json(request) = payload?;
    let text = request.text.unwrap_or_default();

    let result = classify_text(&state, &text)?;
    info!(label = %result.label, score = result.score, "prediction served");
    Ok(Json(result))
}

#[cfg(test)]
mod tests {
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        routing::post,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::app::test_support::test_state;

    async fn call(body: &str) -> (StatusCode, serde_json::Value) {
        let app = Router::new()
            .route("/api/predict", post(predict))
            .with_state(test_state().await);
        let response = app
            .oneshot(
                Request::post("/api/predict")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request builds"),
            )
            .await
            .expect("router responds");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn suspicious_text_is_fake() {
        let (status, body) = call(r#"{"text":"Buy now! Unbelievable! You won!!!"}"#).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["label"], "fake");
        assert_eq!(body["score"], 7);
        assert_eq!(body["text"], "Buy now! Unbelievable! You won!!!");
    }

    #[tokio::test]
    async fn blank_or_missing_text_is_rejected() {
        for payload in [r#"{"text":""}"#, r#"{"text":"   "}"#, "{}"] {
            let (status, body) = call(payload).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{payload}");
            assert_eq!(body["message"], EMPTY_TEXT_MESSAGE);
        }
    }

    #[tokio::test]
    async fn malformed_body_is_a_validation_error() {
        for payload in ["not json", r#"{"text": 42}"#] {
            let (status, body) = call(payload).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{payload}");
            assert_eq!(body["message"], "Invalid request body");
        }
    }
}
