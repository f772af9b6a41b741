mod clients;
mod metrics;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, Method, Request, StatusCode},
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use shopdash_core::{parse_day, AppConfig, DateRange};
use shopdash_db::{Connection, QueryError};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};

use crate::dashboard;
use crate::middleware::{request_id, RequestId, REQUEST_ID_HEADER};

/// Largest page any ranked endpoint will return.
pub const MAX_LIMIT: i64 = 100;

#[derive(Clone)]
pub struct AppState {
    pub conn: Arc<Connection>,
    pub settings: Settings,
}

/// Request-independent knobs taken from [`AppConfig`].
#[derive(Debug, Clone, Copy)]
pub struct Settings {
    /// Rows per ranked chart when the request does not say.
    pub top_n: i64,
    /// Width of the default date window, in days.
    pub default_range_days: u64,
}

impl Settings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            top_n: config.top_n,
            default_range_days: u64::try_from(config.default_range_days).unwrap_or(30),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    backend: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(data: T, request_id: String) -> Self {
        Self {
            data,
            meta: ResponseMeta::new(request_id),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "query_failed" => StatusCode::BAD_GATEWAY,
            "unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>, default: i64) -> i64 {
    limit.unwrap_or(default).clamp(1, MAX_LIMIT)
}

pub(super) fn map_query_error(request_id: String, query: &str, error: &QueryError) -> ApiError {
    tracing::error!(query, error = %error, "remote query failed");
    ApiError::new(request_id, "query_failed", format!("{query} failed: {error}"))
}

/// Turns optional `from`/`to` strings into a range.
///
/// Neither bound means no date filter; one bound is completed with
/// [`DateRange::resolve`].
pub(super) fn parse_range(
    request_id: &str,
    from: Option<&str>,
    to: Option<&str>,
    today: NaiveDate,
    default_days: u64,
) -> Result<Option<DateRange>, ApiError> {
    let parse = |name: &str, raw: Option<&str>| -> Result<Option<NaiveDate>, ApiError> {
        match raw.filter(|s| !s.trim().is_empty()) {
            None => Ok(None),
            Some(raw) => parse_day(raw).map(Some).ok_or_else(|| {
                ApiError::new(
                    request_id,
                    "validation_error",
                    format!("{name} must be a YYYY-MM-DD date, got '{raw}'"),
                )
            }),
        }
    };

    let start = parse("from", from)?;
    let end = parse("to", to)?;
    if start.is_none() && end.is_none() {
        return Ok(None);
    }
    Ok(Some(DateRange::resolve(start, end, today, default_days)))
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(REQUEST_ID_HEADER)])
}

fn api_router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/clients", get(clients::list_clients))
        .route(
            "/api/v1/clients/{client}/keywords",
            get(clients::list_keywords),
        )
        .route(
            "/api/v1/clients/{client}/top-products",
            get(metrics::top_products),
        )
        .route(
            "/api/v1/clients/{client}/position-trends",
            get(metrics::position_trends),
        )
        .route(
            "/api/v1/clients/{client}/filters",
            get(metrics::top_filters),
        )
        .route(
            "/api/v1/clients/{client}/merchants",
            get(metrics::merchant_distribution),
        )
        .route(
            "/api/v1/clients/{client}/merchants/{merchant}/products",
            get(metrics::merchant_products),
        )
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard::index))
        .merge(api_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %req.method(),
                        uri = %req.uri(),
                        request_id = tracing::field::Empty,
                    )
                }))
                .layer(CompressionLayer::new())
                .layer(SetResponseHeaderLayer::overriding(
                    header::CACHE_CONTROL,
                    HeaderValue::from_static("no-store"),
                ))
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let backend = state.conn.backend_name();

    match state.conn.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::new(
                HealthData {
                    status: "ok",
                    backend,
                    database: "ok",
                },
                req_id.0,
            )),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse::new(
                    HealthData {
                        status: "degraded",
                        backend,
                        database: "unavailable",
                    },
                    req_id.0,
                )),
            )
        }
    }
}
