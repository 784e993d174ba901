// Crime Forecast Dashboard - Web Server
// Request/response handlers: every request recomputes the dashboard
// from the shared, immutable dataset.

use crate::chart::{render_forecast_chart, render_type_chart};
use crate::dashboard::{Dashboard, ForecastOutcome};
use crate::data::{CrimeRecord, Dataset};
use crate::filter::Selection;
use crate::forecast::{Forecast, ForecastConfig};
use crate::html::render_page;
use axum::{
    extract::{RawQuery, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub dataset: Arc<Dataset>,
    pub forecast: Arc<ForecastConfig>,
}

impl AppState {
    pub fn new(dataset: Dataset, forecast: ForecastConfig) -> Self {
        Self {
            dataset: Arc::new(dataset),
            forecast: Arc::new(forecast),
        }
    }

    fn dashboard(&self, query: Option<&str>) -> Dashboard {
        let selection = Selection::from_query(query, &self.dataset);
        Dashboard::build(&self.dataset, selection, &self.forecast)
    }
}

/// API Response wrapper
#[derive(Serialize)]
pub struct ApiResponse<T> {
    success: bool,
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> impl IntoResponse {
    Json(ApiResponse::ok("OK"))
}

/// GET /api/records - The unfiltered table
async fn get_records(State(state): State<AppState>) -> Json<ApiResponse<Vec<CrimeRecord>>> {
    Json(ApiResponse::ok(state.dataset.records().to_vec()))
}

/// GET /api/dashboard - Rows, totals and forecast for a selection
async fn get_dashboard(State(state): State<AppState>, RawQuery(query): RawQuery) -> Json<ApiResponse<Dashboard>> {
    Json(ApiResponse::ok(state.dashboard(query.as_deref())))
}

/// GET /api/forecast - Forecast points for a selection
async fn get_forecast(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    match state.dashboard(query.as_deref()).forecast {
        ForecastOutcome::Available(forecast) => {
            (StatusCode::OK, Json(ApiResponse::<Forecast>::ok(forecast))).into_response()
        }
        ForecastOutcome::Unavailable { reason } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiResponse::<Forecast>::err(format!("Forecast unavailable: {}", reason))),
        )
            .into_response(),
    }
}

// ============================================================================
// Page & Chart Handlers
// ============================================================================

/// GET / - Dashboard page
async fn serve_index(State(state): State<AppState>, RawQuery(query): RawQuery) -> Html<String> {
    Html(render_page(&state.dashboard(query.as_deref())))
}

/// GET /charts/types.svg - Bar chart for a selection
async fn serve_type_chart(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    let dashboard = state.dashboard(query.as_deref());
    svg_response(render_type_chart(&dashboard.type_totals))
}

/// GET /charts/forecast.svg - Forecast chart for a selection
async fn serve_forecast_chart(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    match state.dashboard(query.as_deref()).forecast {
        ForecastOutcome::Available(forecast) => svg_response(render_forecast_chart(&forecast)),
        ForecastOutcome::Unavailable { reason } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("Forecast unavailable: {}", reason),
        )
            .into_response(),
    }
}

fn svg_response(svg: anyhow::Result<String>) -> Response {
    match svg {
        Ok(svg) => ([(header::CONTENT_TYPE, "image/svg+xml")], svg).into_response(),
        Err(e) => {
            error!(error = %e, "chart rendering failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

// ============================================================================
// Router
// ============================================================================

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/records", get(get_records))
        .route("/dashboard", get(get_dashboard))
        .route("/forecast", get(get_forecast));

    let chart_routes = Router::new()
        .route("/types.svg", get(serve_type_chart))
        .route("/forecast.svg", get(serve_forecast_chart));

    Router::new()
        .route("/", get(serve_index))
        .nest("/api", api_routes)
        .nest("/charts", chart_routes)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn app() -> Router {
        router(AppState::new(Dataset::sample(), ForecastConfig::default()))
    }

    async fn get(uri: &str) -> (StatusCode, Option<String>, String) {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, content_type, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_health() {
        let (status, _, body) = get("/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, r#"{"success":true,"data":"OK"}"#);
    }

    #[tokio::test]
    async fn test_index_renders_html() {
        let (status, content_type, body) = get("/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(content_type.unwrap().starts_with("text/html"));
        assert!(body.contains("Crime Data Forecasting Dashboard"));
    }

    #[tokio::test]
    async fn test_dashboard_json_respects_query() {
        let (status, _, body) = get("/api/dashboard?location=Durban&crime_type=Theft").await;
        assert_eq!(status, StatusCode::OK);

        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["data"]["rows"].as_array().unwrap().len(), 12);
        assert_eq!(json["data"]["type_totals"]["Theft"], 2190);
        assert_eq!(json["data"]["forecast"]["status"], "available");
    }

    #[tokio::test]
    async fn test_records() {
        let (status, _, body) = get("/api/records").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["data"].as_array().unwrap().len(), 36);
        assert_eq!(json["data"][0]["date"], "2020-01-31");
    }

    #[tokio::test]
    async fn test_forecast_endpoint() {
        let (status, _, body) = get("/api/forecast").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["data"]["points"].as_array().unwrap().len(), 48);

        let (status, _, body) = get("/api/forecast?filtered=1").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body.contains("Forecast unavailable"));
    }

    #[tokio::test]
    async fn test_chart_endpoints() {
        let (status, content_type, body) = get("/charts/types.svg?crime_type=Assault").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("image/svg+xml"));
        assert!(body.contains("Assault"));

        let (status, content_type, _) = get("/charts/forecast.svg").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("image/svg+xml"));

        let (status, _, _) = get("/charts/forecast.svg?filtered=1").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }
}
