//! Server-rendered dashboard served at `/`.

mod charts;
mod controller;
mod render;

use axum::{
    extract::{Query, State},
    response::Html,
};
use chrono::Utc;

use crate::api::AppState;

use controller::{build_dashboard, DashboardParams};
use render::render_page;

pub async fn index(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Html<String> {
    let params = DashboardParams::from_pairs(&pairs);
    let today = Utc::now().date_naive();
    let page = build_dashboard(&state.conn, state.settings, params, today).await;
    tracing::debug!(
        panels = page.panels.len(),
        notices = page.notices.len(),
        "dashboard rendered"
    );
    Html(render_page(&page))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::api::test_support::{app_for, get};

    #[tokio::test]
    async fn index_renders_html_even_when_clients_fail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/clients"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let (status, body) = get(app_for(&server), "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.starts_with("<!DOCTYPE html>"));
        assert!(body.contains("notice error"));
        assert!(body.contains("boom"));
    }

    #[tokio::test]
    async fn index_without_clients_shows_onboarding_notice() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/v1/clients"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let (status, body) = get(app_for(&server), "/?submitted=1&metric=top-products").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("No clients found."));
        assert!(body.contains("value=\"top-products\" checked"));
    }
}
