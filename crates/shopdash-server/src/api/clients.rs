use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{map_query_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct ClientItem {
    id: i64,
    name: String,
}

#[derive(Debug, Serialize)]
pub(super) struct KeywordItem {
    id: i64,
    keyword: String,
}

pub(super) async fn list_clients(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<ClientItem>>>, ApiError> {
    let rows = shopdash_db::list_clients(&state.conn)
        .await
        .map_err(|e| map_query_error(req_id.0.clone(), "list_clients", &e))?;

    let data = rows
        .into_iter()
        .map(|row| ClientItem {
            id: row.id,
            name: row.name,
        })
        .collect();

    Ok(Json(ApiResponse::new(data, req_id.0)))
}

pub(super) async fn list_keywords(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(client): Path<String>,
) -> Result<Json<ApiResponse<Vec<KeywordItem>>>, ApiError> {
    let rows = shopdash_db::list_keywords(&state.conn, &client)
        .await
        .map_err(|e| map_query_error(req_id.0.clone(), "list_keywords", &e))?;

    let data = rows
        .into_iter()
        .map(|row| KeywordItem {
            id: row.id,
            keyword: row.keyword,
        })
        .collect();

    Ok(Json(ApiResponse::new(data, req_id.0)))
}
