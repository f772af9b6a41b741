use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::Utc;
use serde::Deserialize;
use shopdash_core::{DateRange, FilterMode};
use shopdash_db::{
    Connection, FilterCount, MerchantCount, MerchantProduct, PositionTrend, TopProduct,
    TopProductsFilter,
};

use crate::middleware::RequestId;

use super::{map_query_error, normalize_limit, parse_range, ApiError, ApiResponse, AppState};

type ApiResult<T> = Result<Json<ApiResponse<Vec<T>>>, ApiError>;

#[derive(Debug, Deserialize)]
pub(super) struct TopProductsQuery {
    pub keyword: Option<String>,
    pub max_position: Option<i32>,
    pub limit: Option<i64>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct TrendsQuery {
    /// Comma-separated keyword list.
    pub keywords: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct FiltersQuery {
    pub keyword: Option<String>,
    pub mode: Option<String>,
    pub limit: Option<i64>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RankedQuery {
    pub limit: Option<i64>,
    pub from: Option<String>,
    pub to: Option<String>,
}

fn range_for(
    state: &AppState,
    req_id: &str,
    from: Option<&str>,
    to: Option<&str>,
) -> Result<Option<DateRange>, ApiError> {
    parse_range(
        req_id,
        from,
        to,
        Utc::now().date_naive(),
        state.settings.default_range_days,
    )
}

/// The client's first keyword, used when the request names none.
async fn first_keyword(
    conn: &Connection,
    req_id: &str,
    client: &str,
) -> Result<Option<String>, ApiError> {
    let keywords = shopdash_db::list_keywords(conn, client)
        .await
        .map_err(|e| map_query_error(req_id.to_string(), "list_keywords", &e))?;
    Ok(keywords.into_iter().next().map(|k| k.keyword))
}

pub(super) async fn top_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(client): Path<String>,
    Query(query): Query<TopProductsQuery>,
) -> ApiResult<TopProduct> {
    let max_position = query.max_position.unwrap_or(1);
    if !(1..=100).contains(&max_position) {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "max_position must be between 1 and 100",
        ));
    }
    let range = range_for(&state, &req_id.0, query.from.as_deref(), query.to.as_deref())?;

    let filter = TopProductsFilter {
        client: &client,
        keyword: query.keyword.as_deref(),
        max_position,
        range,
        limit: normalize_limit(query.limit, state.settings.top_n),
    };
    let data = shopdash_db::top_products(&state.conn, &filter)
        .await
        .map_err(|e| map_query_error(req_id.0.clone(), "top_products", &e))?;

    Ok(Json(ApiResponse::new(data, req_id.0)))
}

pub(super) async fn position_trends(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(client): Path<String>,
    Query(query): Query<TrendsQuery>,
) -> ApiResult<PositionTrend> {
    let range = range_for(&state, &req_id.0, query.from.as_deref(), query.to.as_deref())?;

    let keywords: Vec<String> = match query.keywords.as_deref() {
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(ToOwned::to_owned)
            .collect(),
        None => first_keyword(&state.conn, &req_id.0, &client)
            .await?
            .into_iter()
            .collect(),
    };

    let data = shopdash_db::position_trends(&state.conn, &client, &keywords, range)
        .await
        .map_err(|e| map_query_error(req_id.0.clone(), "position_trends", &e))?;

    Ok(Json(ApiResponse::new(data, req_id.0)))
}

pub(super) async fn top_filters(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(client): Path<String>,
    Query(query): Query<FiltersQuery>,
) -> ApiResult<FilterCount> {
    let mode = match query.mode.as_deref() {
        None | Some("") => FilterMode::default(),
        Some(raw) => raw
            .parse::<FilterMode>()
            .map_err(|e| ApiError::new(req_id.0.clone(), "validation_error", e))?,
    };
    let range = range_for(&state, &req_id.0, query.from.as_deref(), query.to.as_deref())?;

    let keyword = match query.keyword.filter(|k| !k.trim().is_empty()) {
        Some(keyword) => Some(keyword),
        None => first_keyword(&state.conn, &req_id.0, &client).await?,
    };
    let Some(keyword) = keyword else {
        return Ok(Json(ApiResponse::new(Vec::new(), req_id.0)));
    };

    let data = shopdash_db::top_filters(
        &state.conn,
        &client,
        &keyword,
        range,
        normalize_limit(query.limit, state.settings.top_n),
        mode,
    )
    .await
    .map_err(|e| map_query_error(req_id.0.clone(), "top_filters", &e))?;

    Ok(Json(ApiResponse::new(data, req_id.0)))
}

pub(super) async fn merchant_distribution(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(client): Path<String>,
    Query(query): Query<RankedQuery>,
) -> ApiResult<MerchantCount> {
    let range = range_for(&state, &req_id.0, query.from.as_deref(), query.to.as_deref())?;
    let data = shopdash_db::merchant_distribution(
        &state.conn,
        &client,
        range,
        normalize_limit(query.limit, state.settings.top_n),
    )
    .await
    .map_err(|e| map_query_error(req_id.0.clone(), "merchant_distribution", &e))?;

    Ok(Json(ApiResponse::new(data, req_id.0)))
}

pub(super) async fn merchant_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((client, merchant)): Path<(String, String)>,
    Query(query): Query<RankedQuery>,
) -> ApiResult<MerchantProduct> {
    let range = range_for(&state, &req_id.0, query.from.as_deref(), query.to.as_deref())?;
    let data = shopdash_db::merchant_products(
        &state.conn,
        &client,
        &merchant,
        range,
        normalize_limit(query.limit, state.settings.top_n),
    )
    .await
    .map_err(|e| map_query_error(req_id.0.clone(), "merchant_products", &e))?;

    Ok(Json(ApiResponse::new(data, req_id.0)))
}
