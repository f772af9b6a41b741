//! Dashboard controller: resolves selectors, runs each selected panel's
//! queries and collects the results for rendering.
//!
//! Every interaction is one request. Each panel moves
//! `Idle -> Fetching -> Rendered` while the request is served and is
//! discarded afterwards. A failed query only affects its own panel.

use chrono::NaiveDate;
use shopdash_core::{parse_day, DateRange, FilterMode, Metric, ALL_KEYWORDS};
use shopdash_db::{Connection, QueryError, TopProductsFilter};

use super::charts::{Bar, Chart, Series};
use crate::api::{Settings, MAX_LIMIT};

/// Lifecycle of one panel within a single interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Fetching,
    Rendered,
}

impl Phase {
    /// The next phase in the `Idle -> Fetching -> Rendered -> Idle` cycle.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Phase::Idle => Phase::Fetching,
            Phase::Fetching => Phase::Rendered,
            Phase::Rendered => Phase::Idle,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Warning(String),
    Error(String),
}

/// Raw selector values from the dashboard form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardParams {
    pub client: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// `None` until the user has submitted the form once.
    pub metrics: Option<Vec<Metric>>,
    pub keyword: Option<String>,
    pub trend_keywords: Vec<String>,
    pub filter_keyword: Option<String>,
    pub filter_mode: FilterMode,
    pub merchant: Option<String>,
    /// Inputs that could not be understood and were ignored.
    pub warnings: Vec<String>,
}

impl DashboardParams {
    /// Parses a decoded query string. Repeated keys are kept in order.
    #[must_use]
    pub fn from_pairs(pairs: &[(String, String)]) -> Self {
        let mut params = Self::default();
        let mut metrics = Vec::new();
        let mut submitted = false;

        for (key, value) in pairs {
            let value = value.trim();
            match key.as_str() {
                "submitted" => submitted = true,
                "client" => params.client = non_empty(value),
                "from" | "to" if value.is_empty() => {}
                "from" => match parse_day(value) {
                    Some(day) => params.from = Some(day),
                    None => params
                        .warnings
                        .push(format!("Ignoring invalid start date '{value}'.")),
                },
                "to" => match parse_day(value) {
                    Some(day) => params.to = Some(day),
                    None => params
                        .warnings
                        .push(format!("Ignoring invalid end date '{value}'.")),
                },
                "metric" => match value.parse::<Metric>() {
                    Ok(metric) if !metrics.contains(&metric) => metrics.push(metric),
                    Ok(_) => {}
                    Err(e) => params.warnings.push(format!("Ignoring {e}.")),
                },
                "keyword" => params.keyword = non_empty(value),
                "trend_keyword" => {
                    if !value.is_empty() && !params.trend_keywords.iter().any(|k| k == value) {
                        params.trend_keywords.push(value.to_string());
                    }
                }
                "filter_keyword" => params.filter_keyword = non_empty(value),
                "filter_mode" => match value.parse::<FilterMode>() {
                    Ok(mode) => params.filter_mode = mode,
                    Err(e) => params.warnings.push(format!("Ignoring {e}.")),
                },
                "merchant" => params.merchant = non_empty(value),
                _ => {}
            }
        }

        if submitted || !metrics.is_empty() {
            params.metrics = Some(metrics);
        }
        params
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// Selector values after defaults were applied against live data.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub clients: Vec<String>,
    pub client: Option<String>,
    pub range: DateRange,
    pub metrics: Vec<Metric>,
    pub keywords: Vec<String>,
    pub keyword: String,
    pub trend_keywords: Vec<String>,
    pub filter_keyword: Option<String>,
    pub filter_mode: FilterMode,
    pub merchants: Vec<String>,
    pub merchant: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Link(String),
    Int(i64),
    Float(f64),
    Empty,
}

impl From<Option<String>> for Cell {
    fn from(value: Option<String>) -> Self {
        value.map_or(Cell::Empty, Cell::Text)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<Cell>>,
}

/// One chart plus its data table.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: String,
    pub chart: Option<Chart>,
    pub table: Table,
    /// Shown instead of the chart and table when there are no rows.
    pub empty_message: String,
}

impl Section {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub metric: Metric,
    pub phase: Phase,
    pub sections: Vec<Section>,
    pub notices: Vec<Notice>,
}

impl Panel {
    fn new(metric: Metric) -> Self {
        Self {
            metric,
            phase: Phase::Idle,
            sections: Vec::new(),
            notices: Vec::new(),
        }
    }

    fn begin(&mut self) {
        self.advance(Phase::Fetching);
    }

    fn finish(&mut self, outcome: Result<PanelContent, QueryError>) {
        match outcome {
            Ok(PanelContent { sections, notices }) => {
                self.sections = sections;
                self.notices.extend(notices);
            }
            Err(error) => {
                tracing::warn!(metric = %self.metric, error = %error, "panel query failed");
                self.sections.clear();
                self.notices.push(Notice::Error(format!(
                    "Could not load {}: {error}",
                    self.metric.label()
                )));
            }
        }
        self.advance(Phase::Rendered);
    }

    fn advance(&mut self, expected: Phase) {
        let next = self.phase.next();
        debug_assert_eq!(next, expected, "invalid panel transition");
        tracing::trace!(metric = %self.metric, from = ?self.phase, to = ?next, "panel phase");
        self.phase = next;
    }

    /// `true` when a query failed and the panel shows a placeholder.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.notices.iter().any(|n| matches!(n, Notice::Error(_)))
    }
}

#[derive(Debug, Default)]
struct PanelContent {
    sections: Vec<Section>,
    notices: Vec<Notice>,
}

impl PanelContent {
    fn info(message: impl Into<String>) -> Self {
        Self {
            sections: Vec::new(),
            notices: vec![Notice::Info(message.into())],
        }
    }

    /// Placeholder for keyword-driven panels when there is no keyword to
    /// query. A failed keyword listing is already reported page-wide.
    fn missing_keywords(listing_failed: bool) -> Self {
        if listing_failed {
            Self {
                sections: Vec::new(),
                notices: vec![Notice::Warning(
                    "Keywords are unavailable, so this panel cannot be shown.".into(),
                )],
            }
        } else {
            Self::info("No keywords found for this client.")
        }
    }

    fn sections(sections: Vec<Section>) -> Self {
        Self {
            sections,
            notices: Vec::new(),
        }
    }
}

/// Everything the page renderer needs.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardPage {
    pub selection: Option<Selection>,
    pub notices: Vec<Notice>,
    pub panels: Vec<Panel>,
}

/// Serves one dashboard interaction.
///
/// Only a failure to list clients is page-wide; every other query failure
/// is confined to the panel that issued it.
pub async fn build_dashboard(
    conn: &Connection,
    settings: Settings,
    params: DashboardParams,
    today: NaiveDate,
) -> DashboardPage {
    let mut notices: Vec<Notice> = params.warnings.iter().cloned().map(Notice::Warning).collect();

    let clients = match shopdash_db::list_clients(conn).await {
        Ok(clients) => clients,
        Err(error) => {
            tracing::error!(error = %error, "failed to list clients");
            notices.push(Notice::Error(format!("Could not load clients: {error}")));
            return DashboardPage {
                selection: None,
                notices,
                panels: Vec::new(),
            };
        }
    };
    let client_names: Vec<String> = clients.into_iter().map(|c| c.name).collect();

    let range = DateRange::resolve(params.from, params.to, today, settings.default_range_days);
    let metrics: Vec<Metric> = match &params.metrics {
        Some(chosen) => Metric::ALL
            .into_iter()
            .filter(|m| chosen.contains(m))
            .collect(),
        None => Metric::DEFAULTS.to_vec(),
    };

    let client = params
        .client
        .as_ref()
        .filter(|c| client_names.contains(c))
        .or(client_names.first())
        .cloned();

    let mut selection = Selection {
        clients: client_names,
        client: client.clone(),
        range,
        metrics,
        keywords: Vec::new(),
        keyword: ALL_KEYWORDS.to_string(),
        trend_keywords: Vec::new(),
        filter_keyword: None,
        filter_mode: params.filter_mode,
        merchants: Vec::new(),
        merchant: None,
    };

    let Some(client) = client else {
        notices.push(Notice::Info(
            "No clients found. Add a client to the database to get started.".into(),
        ));
        return DashboardPage {
            selection: Some(selection),
            notices,
            panels: Vec::new(),
        };
    };

    if range.is_inverted() {
        notices.push(Notice::Warning(
            "The start date is after the end date, so no scrapes can match.".into(),
        ));
    }
    if selection.metrics.is_empty() {
        notices.push(Notice::Info("Select at least one metric to display.".into()));
    }

    let mut keywords_failed = false;
    match shopdash_db::list_keywords(conn, &client).await {
        Ok(keywords) => selection.keywords = keywords.into_iter().map(|k| k.keyword).collect(),
        Err(error) => {
            tracing::warn!(client = %client, error = %error, "failed to list keywords");
            notices.push(Notice::Error(format!("Could not load keywords: {error}")));
            keywords_failed = true;
        }
    }
    resolve_keywords(&mut selection, &params);

    // A failed merchant listing is reported by the Merchant Products panel.
    let mut merchant_error: Option<QueryError> = None;
    if selection.metrics.contains(&Metric::MerchantProducts) {
        match shopdash_db::merchant_distribution(conn, &client, Some(range), MAX_LIMIT).await {
            Ok(rows) => selection.merchants = rows.into_iter().map(|r| r.merchant).collect(),
            Err(error) => {
                tracing::warn!(client = %client, error = %error, "failed to list merchants");
                merchant_error = Some(error);
            }
        }
        selection.merchant = params
            .merchant
            .as_ref()
            .filter(|m| selection.merchants.contains(m))
            .or(selection.merchants.first())
            .cloned();
    }

    let mut panels = Vec::with_capacity(selection.metrics.len());
    for metric in selection.metrics.clone() {
        let mut panel = Panel::new(metric);
        panel.begin();
        let outcome = match merchant_error.take_if(|_| metric == Metric::MerchantProducts) {
            Some(error) => Err(error),
            None => fetch_panel(conn, settings, &selection, &client, metric, keywords_failed).await,
        };
        panel.finish(outcome);
        panels.push(panel);
    }

    DashboardPage {
        selection: Some(selection),
        notices,
        panels,
    }
}

fn resolve_keywords(selection: &mut Selection, params: &DashboardParams) {
    let keywords = &selection.keywords;
    let known = |k: &&String| keywords.contains(k);
    let first = keywords.first().cloned();

    let keyword = params.keyword.as_ref().filter(known).cloned();
    let trend: Vec<String> = params.trend_keywords.iter().filter(known).cloned().collect();
    let filter_keyword = params
        .filter_keyword
        .as_ref()
        .filter(known)
        .cloned()
        .or_else(|| first.clone());

    if let Some(keyword) = keyword {
        selection.keyword = keyword;
    }
    selection.trend_keywords = if trend.is_empty() {
        first.into_iter().collect()
    } else {
        trend
    };
    selection.filter_keyword = filter_keyword;
}

async fn fetch_panel(
    conn: &Connection,
    settings: Settings,
    selection: &Selection,
    client: &str,
    metric: Metric,
    keywords_failed: bool,
) -> Result<PanelContent, QueryError> {
    let range = Some(selection.range);
    match metric {
        Metric::TopProducts => {
            let mut sections = Vec::with_capacity(2);
            for (max_position, title, empty) in [
                (1, "Products in Position #1", "No data available for position #1."),
                (5, "Products in Top 5 Positions", "No data available for top 5 positions."),
            ] {
                let filter = TopProductsFilter {
                    client,
                    keyword: Some(selection.keyword.as_str()),
                    max_position,
                    range,
                    limit: settings.top_n,
                };
                let rows = shopdash_db::top_products(conn, &filter).await?;
                sections.push(Section {
                    title: title.to_string(),
                    chart: Some(Chart::HorizontalBar(
                        rows.iter().map(|r| Bar::new(&r.title, r.count)).collect(),
                    )),
                    table: Table {
                        headers: vec!["Title", "Merchant", "Link", "Appearances"],
                        rows: rows
                            .into_iter()
                            .map(|r| {
                                vec![
                                    Cell::Text(r.title),
                                    Cell::from(r.merchant),
                                    r.link.map_or(Cell::Empty, Cell::Link),
                                    Cell::Int(r.count),
                                ]
                            })
                            .collect(),
                    },
                    empty_message: empty.to_string(),
                });
            }
            Ok(PanelContent::sections(sections))
        }
        Metric::PositionTrends => {
            if selection.keywords.is_empty() {
                return Ok(PanelContent::missing_keywords(keywords_failed));
            }
            let rows = shopdash_db::position_trends(
                conn,
                client,
                &selection.trend_keywords,
                range,
            )
            .await?;

            let mut series: Vec<Series> = Vec::new();
            for row in &rows {
                match series.iter_mut().find(|s| s.name == row.keyword) {
                    Some(s) => s.points.push((row.scrape_date, row.avg_position)),
                    None => series.push(Series {
                        name: row.keyword.clone(),
                        points: vec![(row.scrape_date, row.avg_position)],
                    }),
                }
            }

            Ok(PanelContent::sections(vec![Section {
                title: "Average Position Over Time".to_string(),
                chart: Some(Chart::Line(series)),
                table: Table {
                    headers: vec!["Scrape date", "Keyword", "Average position"],
                    rows: rows
                        .into_iter()
                        .map(|r| {
                            vec![
                                Cell::Text(r.scrape_date.format("%Y-%m-%d %H:%M").to_string()),
                                Cell::Text(r.keyword),
                                Cell::Float(r.avg_position),
                            ]
                        })
                        .collect(),
                },
                empty_message: "No trend data available for the selected keywords.".to_string(),
            }]))
        }
        Metric::FilterAnalysis => {
            let Some(keyword) = selection.filter_keyword.as_deref() else {
                return Ok(PanelContent::missing_keywords(keywords_failed));
            };
            let rows = shopdash_db::top_filters(
                conn,
                client,
                keyword,
                range,
                settings.top_n,
                selection.filter_mode,
            )
            .await?;
            Ok(PanelContent::sections(vec![Section {
                title: format!("Top Filters for \"{keyword}\""),
                chart: Some(Chart::HorizontalBar(
                    rows.iter().map(|r| Bar::new(&r.filter, r.count)).collect(),
                )),
                table: Table {
                    headers: vec!["Filter", "Count"],
                    rows: rows
                        .into_iter()
                        .map(|r| vec![Cell::Text(r.filter), Cell::Int(r.count)])
                        .collect(),
                },
                empty_message: "No filter data available for this keyword.".to_string(),
            }]))
        }
        Metric::MerchantProducts => {
            let Some(merchant) = selection.merchant.as_deref() else {
                return Ok(PanelContent::info("No merchants found for this client."));
            };
            let rows =
                shopdash_db::merchant_products(conn, client, merchant, range, settings.top_n)
                    .await?;
            Ok(PanelContent::sections(vec![Section {
                title: format!("Products from {merchant}"),
                chart: None,
                table: Table {
                    headers: vec!["Title", "Link", "Appearances"],
                    rows: rows
                        .into_iter()
                        .map(|r| {
                            vec![
                                Cell::Text(r.title),
                                r.link.map_or(Cell::Empty, Cell::Link),
                                Cell::Int(r.appearance_count),
                            ]
                        })
                        .collect(),
                },
                empty_message: "No products found for this merchant.".to_string(),
            }]))
        }
        Metric::MerchantDistribution => {
            let rows =
                shopdash_db::merchant_distribution(conn, client, range, settings.top_n).await?;
            Ok(PanelContent::sections(vec![Section {
                title: "Products per Merchant".to_string(),
                chart: Some(Chart::VerticalBar(
                    rows.iter().map(|r| Bar::new(&r.merchant, r.count)).collect(),
                )),
                table: Table {
                    headers: vec!["Merchant", "Products"],
                    rows: rows
                        .into_iter()
                        .map(|r| vec![Cell::Text(r.merchant), Cell::Int(r.count)])
                        .collect(),
                },
                empty_message: "No merchant data available.".to_string(),
            }]))
        }
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
