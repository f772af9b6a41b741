use serde_json::json;
use shopdash_db::SupabaseClient;
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

fn day(s: &str) -> NaiveDate {
    parse_day(s).expect("valid day")
}

fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
    raw.iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

fn settings() -> Settings {
    Settings {
        top_n: 10,
        default_range_days: 30,
    }
}

fn connection(server: &MockServer) -> Connection {
    Connection::Supabase(
        SupabaseClient::new(&server.uri(), "anon-key", 5, "shopdash-test").expect("client"),
    )
}

async fn mount_acme(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/rest/v1/clients"))
        .and(query_param("select", "id,name"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 3, "name": "Acme" },
            { "id": 4, "name": "Zenith" }
        ])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/clients"))
        .and(query_param("name", "eq.Acme"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 3 }])))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/keywords"))
        .and(query_param("select", "id,keyword,client_id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 8, "keyword": "rain jacket", "client_id": 3 },
            { "id": 9, "keyword": "trail shoes", "client_id": 3 }
        ])))
        .mount(server)
        .await;
    for (keyword, id) in [("rain jacket", 8), ("trail shoes", 9)] {
        Mock::given(method("GET"))
            .and(path("/rest/v1/keywords"))
            .and(query_param("keyword", format!("eq.{keyword}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": id }])))
            .mount(server)
            .await;
    }
}

async fn mount_rpc(server: &MockServer, sql_fragment: &str, response: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/run_query"))
        .and(body_string_contains(sql_fragment))
        .respond_with(response)
        .mount(server)
        .await;
}

fn product(title: &str, count: i64) -> serde_json::Value {
    json!({
        "id": count,
        "product_id": format!("g-{count}"),
        "title": title,
        "link": null,
        "merchant": "Outdoor Co",
        "count": count
    })
}

// ---------------------------------------------------------------------------
// Phase and params
// ---------------------------------------------------------------------------

#[test]
fn phase_cycles_through_interaction() {
    let mut phase = Phase::Idle;
    let mut seen = Vec::new();
    for _ in 0..3 {
        phase = phase.next();
        seen.push(phase);
    }
    assert_eq!(seen, [Phase::Fetching, Phase::Rendered, Phase::Idle]);
}

#[test]
fn params_without_metrics_use_defaults_later() {
    let params = DashboardParams::from_pairs(&pairs(&[("client", "Acme")]));
    assert_eq!(params.client.as_deref(), Some("Acme"));
    assert!(params.metrics.is_none());
}

#[test]
fn submitted_form_without_metrics_selects_nothing() {
    let params = DashboardParams::from_pairs(&pairs(&[("submitted", "1")]));
    assert_eq!(params.metrics, Some(Vec::new()));
}

#[test]
fn params_collect_repeated_keys_once() {
    let params = DashboardParams::from_pairs(&pairs(&[
        ("metric", "position-trends"),
        ("metric", "Top Products"),
        ("metric", "position-trends"),
        ("trend_keyword", "rain jacket"),
        ("trend_keyword", "trail shoes"),
        ("trend_keyword", "rain jacket"),
        ("filter_mode", "individual"),
    ]));
    assert_eq!(
        params.metrics,
        Some(vec![Metric::PositionTrends, Metric::TopProducts])
    );
    assert_eq!(params.trend_keywords, ["rain jacket", "trail shoes"]);
    assert_eq!(params.filter_mode, FilterMode::Individual);
    assert!(params.warnings.is_empty());
}

#[test]
fn params_report_unparseable_inputs() {
    let params = DashboardParams::from_pairs(&pairs(&[
        ("from", "yesterday"),
        ("to", ""),
        ("metric", "pricing"),
        ("filter_mode", "split"),
    ]));
    assert!(params.from.is_none());
    assert!(params.to.is_none());
    assert_eq!(params.warnings.len(), 3);
    assert!(params.warnings[0].contains("yesterday"));
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

#[tokio::test]
async fn client_listing_failure_renders_no_panels() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;

    let page = build_dashboard(
        &connection(&server),
        settings(),
        DashboardParams::default(),
        day("2025-03-31"),
    )
    .await;

    assert!(page.selection.is_none());
    assert!(page.panels.is_empty());
    assert!(matches!(&page.notices[..], [Notice::Error(msg)] if msg.contains("boom")));
}

#[tokio::test]
async fn no_clients_shows_informational_notice() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/clients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let page = build_dashboard(
        &connection(&server),
        settings(),
        DashboardParams::default(),
        day("2025-03-31"),
    )
    .await;

    assert!(page.panels.is_empty());
    assert!(matches!(&page.notices[..], [Notice::Info(_)]));
    assert_eq!(page.selection.and_then(|s| s.client), None);
}

#[tokio::test]
async fn default_selection_renders_top_products_and_filters() {
    let server = MockServer::start().await;
    mount_acme(&server).await;
    mount_rpc(
        &server,
        "ps.position <= 1",
        ResponseTemplate::new(200).set_body_json(json!([product("Trail Shoe", 4)])),
    )
    .await;
    mount_rpc(
        &server,
        "ps.position <= 5",
        ResponseTemplate::new(200).set_body_json(json!([])),
    )
    .await;
    mount_rpc(
        &server,
        "ps.filters",
        ResponseTemplate::new(200).set_body_json(json!([{ "filter": "Waterproof", "count": 2 }])),
    )
    .await;

    let page = build_dashboard(
        &connection(&server),
        settings(),
        DashboardParams::default(),
        day("2025-03-31"),
    )
    .await;

    let selection = page.selection.expect("selection");
    assert_eq!(selection.client.as_deref(), Some("Acme"));
    assert_eq!(
        selection.range,
        DateRange::new(day("2025-03-01"), day("2025-03-31"))
    );
    assert_eq!(selection.keyword, ALL_KEYWORDS);
    assert_eq!(selection.filter_keyword.as_deref(), Some("rain jacket"));
    assert_eq!(selection.trend_keywords, ["rain jacket"]);

    let metrics: Vec<Metric> = page.panels.iter().map(|p| p.metric).collect();
    assert_eq!(metrics, Metric::DEFAULTS);
    assert!(page.panels.iter().all(|p| p.phase == Phase::Rendered));

    let top = &page.panels[0];
    assert_eq!(top.sections.len(), 2);
    assert_eq!(top.sections[0].table.rows[0][0], Cell::Text("Trail Shoe".into()));
    assert!(top.sections[1].is_empty());
    assert_eq!(
        top.sections[1].empty_message,
        "No data available for top 5 positions."
    );

    let filters = &page.panels[1];
    assert!(!filters.failed());
    assert_eq!(filters.sections[0].table.rows[0][1], Cell::Int(2));
}

#[tokio::test]
async fn failing_panel_is_isolated() {
    let server = MockServer::start().await;
    mount_acme(&server).await;
    mount_rpc(
        &server,
        "ps.position",
        ResponseTemplate::new(200).set_body_json(json!([product("Trail Shoe", 4)])),
    )
    .await;
    mount_rpc(
        &server,
        "ps.filters",
        ResponseTemplate::new(500).set_body_json(json!({ "message": "statement timeout" })),
    )
    .await;

    let page = build_dashboard(
        &connection(&server),
        settings(),
        DashboardParams::default(),
        day("2025-03-31"),
    )
    .await;

    let top = &page.panels[0];
    assert!(!top.failed());
    assert_eq!(top.sections.len(), 2);

    let filters = &page.panels[1];
    assert_eq!(filters.phase, Phase::Rendered);
    assert!(filters.failed());
    assert!(filters.sections.is_empty());
    assert!(matches!(
        &filters.notices[..],
        [Notice::Error(msg)] if msg.contains("statement timeout")
    ));
}

#[tokio::test]
async fn unknown_selectors_fall_back_to_defaults() {
    let server = MockServer::start().await;
    mount_acme(&server).await;
    mount_rpc(
        &server,
        "AVG(ps.position)",
        ResponseTemplate::new(200).set_body_json(json!([
            { "scrape_date": "2025-03-01T06:00:00", "keyword": "trail shoes", "avg_position": 2.0 },
            { "scrape_date": "2025-03-02T06:00:00", "keyword": "trail shoes", "avg_position": 1.5 }
        ])),
    )
    .await;

    let params = DashboardParams::from_pairs(&pairs(&[
        ("client", "Nobody"),
        ("metric", "position-trends"),
        ("trend_keyword", "trail shoes"),
        ("trend_keyword", "tents"),
        ("keyword", "tents"),
    ]));
    let page = build_dashboard(&connection(&server), settings(), params, day("2025-03-31")).await;

    let selection = page.selection.expect("selection");
    assert_eq!(selection.client.as_deref(), Some("Acme"));
    assert_eq!(selection.keyword, ALL_KEYWORDS);
    assert_eq!(selection.trend_keywords, ["trail shoes"]);

    let trends = &page.panels[0];
    assert_eq!(trends.metric, Metric::PositionTrends);
    match &trends.sections[0].chart {
        Some(Chart::Line(series)) => {
            assert_eq!(series.len(), 1);
            assert_eq!(series[0].points.len(), 2);
        }
        other => panic!("expected line chart, got {other:?}"),
    }
}

#[tokio::test]
async fn inverted_range_warns_and_skips_queries() {
    let server = MockServer::start().await;
    mount_acme(&server).await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let params = DashboardParams::from_pairs(&pairs(&[
        ("from", "2025-04-02"),
        ("to", "2025-04-01"),
        ("metric", "merchant-distribution"),
    ]));
    let page = build_dashboard(&connection(&server), settings(), params, day("2025-04-30")).await;

    assert!(page
        .notices
        .iter()
        .any(|n| matches!(n, Notice::Warning(msg) if msg.contains("start date"))));
    let panel = &page.panels[0];
    assert!(!panel.failed());
    assert!(panel.sections[0].is_empty());
}

#[tokio::test]
async fn merchant_products_default_to_top_merchant() {
    let server = MockServer::start().await;
    mount_acme(&server).await;
    mount_rpc(
        &server,
        "COUNT(DISTINCT p.id)",
        ResponseTemplate::new(200).set_body_json(json!([
            { "merchant": "Outdoor Co", "count": 5 },
            { "merchant": "Rain's Gear", "count": 2 }
        ])),
    )
    .await;
    mount_rpc(
        &server,
        "appearance_count",
        ResponseTemplate::new(200).set_body_json(json!([
            { "title": "Summit Boot", "link": "https://a.example/2", "appearance_count": 3 }
        ])),
    )
    .await;

    let params = DashboardParams::from_pairs(&pairs(&[("metric", "merchant-products")]));
    let page = build_dashboard(&connection(&server), settings(), params, day("2025-03-31")).await;

    let selection = page.selection.expect("selection");
    assert_eq!(selection.merchants, ["Outdoor Co", "Rain's Gear"]);
    assert_eq!(selection.merchant.as_deref(), Some("Outdoor Co"));

    let panel = &page.panels[0];
    assert_eq!(panel.sections[0].title, "Products from Outdoor Co");
    assert_eq!(
        panel.sections[0].table.rows[0][1],
        Cell::Link("https://a.example/2".into())
    );
}

#[tokio::test]
async fn merchant_listing_failure_is_shown_as_panel_error() {
    let server = MockServer::start().await;
    mount_acme(&server).await;
    mount_rpc(
        &server,
        "COUNT(DISTINCT p.id)",
        ResponseTemplate::new(500).set_body_json(json!({ "message": "statement timeout" })),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/run_query"))
        .and(body_string_contains("appearance_count"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let params = DashboardParams::from_pairs(&pairs(&[("metric", "merchant-products")]));
    let page = build_dashboard(&connection(&server), settings(), params, day("2025-03-31")).await;

    let panel = &page.panels[0];
    assert_eq!(panel.metric, Metric::MerchantProducts);
    assert_eq!(panel.phase, Phase::Rendered);
    assert!(panel.failed());
    assert!(panel.sections.is_empty());
    assert!(matches!(
        &panel.notices[..],
        [Notice::Error(message)] if message.contains("statement timeout")
    ));
}

#[tokio::test]
async fn keyword_listing_failure_does_not_claim_missing_keywords() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/clients"))
        .and(query_param("select", "id,name"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": 3, "name": "Acme" }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/clients"))
        .and(query_param("name", "eq.Acme"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": 3 }])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/keywords"))
        .respond_with(
            ResponseTemplate::new(503).set_body_json(json!({ "message": "keywords offline" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;

    let params = DashboardParams::from_pairs(&pairs(&[
        ("metric", "position-trends"),
        ("metric", "filter-analysis"),
    ]));
    let page = build_dashboard(&connection(&server), settings(), params, day("2025-03-31")).await;

    assert!(page
        .notices
        .iter()
        .any(|n| matches!(n, Notice::Error(m) if m.contains("keywords offline"))));
    assert_eq!(page.panels.len(), 2);
    for panel in &page.panels {
        assert!(
            matches!(&panel.notices[..], [Notice::Warning(m)] if m.contains("Keywords are unavailable")),
            "{:?} notices: {:?}",
            panel.metric,
            panel.notices
        );
    }
}
