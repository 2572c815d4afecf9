pub(crate) mod auth;
pub(crate) mod error;
pub(crate) mod health;
pub(crate) mod identity;
pub(crate) mod metrics;
pub(crate) mod news;
pub(crate) mod predict;

use axum::{
    Router,
    routing::{get, post},
};

use self::error::ApiError;
use crate::app::AppState;

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health/ready", get(health::ready))
        .route("/health/live", get(health::live))
        .route("/metrics", get(metrics::exporter))
        .route("/api/predict", post(predict::predict))
        .route("/api/news", get(news::list).post(news::create))
        .route("/api/news/analyze", post(news::analyze))
        .route("/api/news/stats", get(news::stats))
        .route("/api/news/sources", get(news::sources))
        .route(
            "/api/news/{id}",
            get(news::get).put(news::update).delete(news::delete),
        )
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/me", get(auth::me))
        .fallback(not_found)
        .with_state(state)
}

async fn root() -> &'static str {
    "API Running"
}

async fn not_found() -> ApiError {
    ApiError::NotFound("Route not found")
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;
    use crate::app::test_support::test_state;

    async fn get_text(uri: &str) -> (StatusCode, String) {
        let response = router(test_state().await)
            .oneshot(Request::get(uri).body(Body::empty()).expect("request builds"))
            .await
            .expect("router responds");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        (status, String::from_utf8(bytes.to_vec()).expect("utf-8 body"))
    }

    #[tokio::test]
    async fn root_reports_running() {
        assert_eq!(
            get_text("/").await,
            (StatusCode::OK, "API Running".to_string())
        );
    }

    #[tokio::test]
    async fn health_endpoints_respond() {
        let (status, body) = get_text("/health/live").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("\"live\""));

        let (status, body) = get_text("/health/ready").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("\"ready\""));
    }

    #[tokio::test]
    async fn metrics_are_exposed() {
        let (status, body) = get_text("/metrics").await;

        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("news_check_articles_created_total"));
    }

    #[tokio::test]
    async fn unknown_routes_are_json_404() {
        let (status, body) = get_text("/api/unknown").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Route not found"));
    }
}
