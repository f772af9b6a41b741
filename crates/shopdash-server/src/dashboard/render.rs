//! HTML rendering for the dashboard page.

use shopdash_core::{FilterMode, Metric, ALL_KEYWORDS};

use super::controller::{Cell, DashboardPage, Notice, Panel, Section, Selection};

const STYLE: &str = r"
:root {
  --bg: #f6f7f9; --panel: #ffffff; --text: #1f2933; --muted: #6b7280;
  --border: #e2e8f0; --accent: #2563eb;
  --info-bg: #eff6ff; --info: #1e40af;
  --warn-bg: #fffbeb; --warn: #92400e;
  --error-bg: #fef2f2; --error: #991b1b;
}
* { box-sizing: border-box; }
body { margin: 0; font-family: system-ui, sans-serif; background: var(--bg); color: var(--text); }
.layout { display: flex; min-height: 100vh; }
aside { width: 300px; padding: 1.25rem; background: var(--panel); border-right: 1px solid var(--border); }
main { flex: 1; padding: 1.5rem 2rem; max-width: 1100px; }
h1 { font-size: 1.6rem; margin: 0 0 1rem; }
h2 { font-size: 1.25rem; margin: 0 0 .75rem; }
h3 { font-size: 1rem; margin: 1rem 0 .5rem; }
label { display: block; font-size: .85rem; color: var(--muted); margin: .75rem 0 .25rem; }
select, input[type=date] { width: 100%; padding: .35rem; }
fieldset { border: 1px solid var(--border); margin: .75rem 0; padding: .5rem .75rem; }
fieldset label { color: var(--text); margin: .25rem 0; }
button { margin-top: 1rem; padding: .5rem 1rem; background: var(--accent); color: #fff; border: 0; border-radius: 4px; }
.panel { background: var(--panel); border: 1px solid var(--border); border-radius: 6px; padding: 1rem 1.25rem; margin-bottom: 1.5rem; }
.selectors { display: flex; gap: 1rem; flex-wrap: wrap; }
.selectors > div { min-width: 220px; }
.notice { padding: .6rem .9rem; border-radius: 4px; margin: .5rem 0; }
.notice.info { background: var(--info-bg); color: var(--info); }
.notice.warning { background: var(--warn-bg); color: var(--warn); }
.notice.error { background: var(--error-bg); color: var(--error); }
.placeholder { color: var(--muted); font-style: italic; }
table { border-collapse: collapse; width: 100%; font-size: .9rem; margin-top: .5rem; }
th, td { text-align: left; padding: .35rem .5rem; border-bottom: 1px solid var(--border); }
td.num { text-align: right; font-variant-numeric: tabular-nums; }
svg.chart { width: 100%; height: auto; }
svg .label { font-size: 12px; fill: var(--text); }
svg .value { font-size: 11px; fill: var(--muted); }
svg .grid, svg .axis { stroke: var(--border); }
";

/// Escapes text for use in element content and quoted attributes.
#[must_use]
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Renders the full dashboard document.
#[must_use]
pub fn render_page(page: &DashboardPage) -> String {
    let mut html = String::with_capacity(16 * 1024);
    html.push_str(&format!(
        "<!DOCTYPE html><html lang=\"en\"><head><meta charset=\"utf-8\">\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <title>Shopping Scrape Dashboard</title><style>{STYLE}</style></head><body>\
         <form method=\"get\" action=\"/\"><input type=\"hidden\" name=\"submitted\" value=\"1\">\
         <div class=\"layout\">"
    ));

    html.push_str("<aside><h2>Selection</h2>");
    if let Some(selection) = &page.selection {
        sidebar(&mut html, selection);
    }
    html.push_str("</aside><main><h1>Shopping Scrape Dashboard</h1>");

    for notice in &page.notices {
        notice_html(&mut html, notice);
    }
    if let Some(selection) = &page.selection {
        for panel in &page.panels {
            panel_html(&mut html, selection, panel);
        }
    }

    html.push_str("</main></div></form></body></html>");
    html
}

fn sidebar(html: &mut String, selection: &Selection) {
    html.push_str("<label for=\"client\">Client</label><select id=\"client\" name=\"client\">");
    for name in &selection.clients {
        option(html, name, name, selection.client.as_deref() == Some(name.as_str()));
    }
    html.push_str("</select>");

    html.push_str(&format!(
        "<label for=\"from\">Start date</label>\
         <input type=\"date\" id=\"from\" name=\"from\" value=\"{}\">\
         <label for=\"to\">End date</label>\
         <input type=\"date\" id=\"to\" name=\"to\" value=\"{}\">",
        selection.range.start.format("%Y-%m-%d"),
        selection.range.end.format("%Y-%m-%d"),
    ));

    html.push_str("<fieldset><legend>Metrics</legend>");
    for metric in Metric::ALL {
        let checked = if selection.metrics.contains(&metric) {
            " checked"
        } else {
            ""
        };
        html.push_str(&format!(
            "<label><input type=\"checkbox\" name=\"metric\" value=\"{}\"{checked}> {}</label>",
            metric.slug(),
            escape_html(metric.label()),
        ));
    }
    html.push_str("</fieldset><button type=\"submit\">Update</button>");
}

fn option(html: &mut String, value: &str, label: &str, selected: bool) {
    html.push_str(&format!(
        "<option value=\"{}\"{}>{}</option>",
        escape_html(value),
        if selected { " selected" } else { "" },
        escape_html(label),
    ));
}

fn select(html: &mut String, name: &str, label: &str, multiple: bool, body: impl FnOnce(&mut String)) {
    html.push_str(&format!(
        "<div><label for=\"{name}\">{label}</label><select id=\"{name}\" name=\"{name}\"{}>",
        if multiple { " multiple size=\"4\"" } else { "" },
    ));
    body(html);
    html.push_str("</select></div>");
}

fn notice_html(html: &mut String, notice: &Notice) {
    let (class, text) = match notice {
        Notice::Info(text) => ("info", text),
        Notice::Warning(text) => ("warning", text),
        Notice::Error(text) => ("error", text),
    };
    html.push_str(&format!("<div class=\"notice {class}\">{}</div>", escape_html(text)));
}

fn panel_html(html: &mut String, selection: &Selection, panel: &Panel) {
    html.push_str(&format!(
        "<section class=\"panel\" id=\"{}\"><h2>{}</h2>",
        panel.metric.slug(),
        escape_html(panel.metric.label()),
    ));
    panel_selectors(html, selection, panel.metric);

    for notice in &panel.notices {
        notice_html(html, notice);
    }
    if panel.failed() {
        html.push_str("<p class=\"placeholder\">No data to display.</p>");
    } else {
        for section in &panel.sections {
            section_html(html, section);
        }
    }
    html.push_str("</section>");
}

fn panel_selectors(html: &mut String, selection: &Selection, metric: Metric) {
    match metric {
        Metric::TopProducts => {
            html.push_str("<div class=\"selectors\">");
            select(html, "keyword", "Keyword", false, |html| {
                option(html, ALL_KEYWORDS, ALL_KEYWORDS, selection.keyword == ALL_KEYWORDS);
                for kw in &selection.keywords {
                    option(html, kw, kw, &selection.keyword == kw);
                }
            });
            html.push_str("</div>");
        }
        Metric::PositionTrends if !selection.keywords.is_empty() => {
            html.push_str("<div class=\"selectors\">");
            select(html, "trend_keyword", "Keywords", true, |html| {
                for kw in &selection.keywords {
                    option(html, kw, kw, selection.trend_keywords.contains(kw));
                }
            });
            html.push_str("</div>");
        }
        Metric::FilterAnalysis if !selection.keywords.is_empty() => {
            html.push_str("<div class=\"selectors\">");
            select(html, "filter_keyword", "Keyword", false, |html| {
                for kw in &selection.keywords {
                    option(html, kw, kw, selection.filter_keyword.as_ref() == Some(kw));
                }
            });
            select(html, "filter_mode", "Count filters", false, |html| {
                for (mode, label) in [
                    (FilterMode::Whole, "As whole strings"),
                    (FilterMode::Individual, "Individually"),
                ] {
                    option(html, mode.slug(), label, selection.filter_mode == mode);
                }
            });
            html.push_str("</div>");
        }
        Metric::MerchantProducts if !selection.merchants.is_empty() => {
            html.push_str("<div class=\"selectors\">");
            select(html, "merchant", "Merchant", false, |html| {
                for merchant in &selection.merchants {
                    option(
                        html,
                        merchant,
                        merchant,
                        selection.merchant.as_ref() == Some(merchant),
                    );
                }
            });
            html.push_str("</div>");
        }
        _ => {}
    }
}

fn section_html(html: &mut String, section: &Section) {
    html.push_str(&format!("<h3>{}</h3>", escape_html(&section.title)));
    if section.is_empty() {
        html.push_str(&format!(
            "<div class=\"notice info\">{}</div>",
            escape_html(&section.empty_message)
        ));
        return;
    }
    if let Some(chart) = &section.chart {
        html.push_str(&chart.to_svg());
    }

    html.push_str("<table><thead><tr>");
    for header in &section.table.headers {
        html.push_str(&format!("<th>{}</th>", escape_html(header)));
    }
    html.push_str("</tr></thead><tbody>");
    for row in &section.table.rows {
        html.push_str("<tr>");
        for cell in row {
            cell_html(html, cell);
        }
        html.push_str("</tr>");
    }
    html.push_str("</tbody></table>");
}

fn cell_html(html: &mut String, cell: &Cell) {
    let td = match cell {
        Cell::Text(text) => format!("<td>{}</td>", escape_html(text)),
        Cell::Link(url) if is_web_url(url) => format!(
            "<td><a href=\"{0}\" target=\"_blank\" rel=\"noopener noreferrer\">{0}</a></td>",
            escape_html(url)
        ),
        Cell::Link(url) => format!("<td>{}</td>", escape_html(url)),
        Cell::Int(n) => format!("<td class=\"num\">{n}</td>"),
        Cell::Float(n) => format!("<td class=\"num\">{n:.2}</td>"),
        Cell::Empty => "<td></td>".to_string(),
    };
    html.push_str(&td);
}

fn is_web_url(url: &str) -> bool {
    let lower = url.trim_start().to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dashboard::charts::{Bar, Chart};
    use crate::dashboard::controller::{Phase, Table};
    use shopdash_core::{parse_day, DateRange};

    fn selection() -> Selection {
        Selection {
            clients: vec!["Acme".into(), "Zenith & Co".into()],
            client: Some("Zenith & Co".into()),
            range: DateRange::new(
                parse_day("2025-03-01").unwrap(),
                parse_day("2025-03-31").unwrap(),
            ),
            metrics: vec![Metric::TopProducts],
            keywords: vec!["trail shoes".into(), "rain jacket".into()],
            keyword: "rain jacket".into(),
            trend_keywords: vec!["trail shoes".into()],
            filter_keyword: Some("trail shoes".into()),
            filter_mode: FilterMode::Individual,
            merchants: Vec::new(),
            merchant: None,
        }
    }

    fn panel(metric: Metric, sections: Vec<Section>, notices: Vec<Notice>) -> Panel {
        Panel {
            metric,
            phase: Phase::Rendered,
            sections,
            notices,
        }
    }

    fn page(panels: Vec<Panel>) -> DashboardPage {
        DashboardPage {
            selection: Some(selection()),
            notices: Vec::new(),
            panels,
        }
    }

    #[test]
    fn escape_html_covers_markup_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
        );
    }

    #[test]
    fn sidebar_reflects_selection() {
        let html = render_page(&page(Vec::new()));
        assert!(html.contains("<option value=\"Zenith &amp; Co\" selected>"));
        assert!(html.contains("name=\"from\" value=\"2025-03-01\""));
        assert!(html.contains("name=\"to\" value=\"2025-03-31\""));
        assert!(html.contains("value=\"top-products\" checked"));
        assert!(!html.contains("value=\"position-trends\" checked"));
        assert!(html.contains("name=\"submitted\" value=\"1\""));
    }

    #[test]
    fn top_products_panel_offers_all_keywords() {
        let html = render_page(&page(vec![panel(Metric::TopProducts, Vec::new(), Vec::new())]));
        assert!(html.contains("<option value=\"All Keywords\">All Keywords</option>"));
        assert!(html.contains("<option value=\"rain jacket\" selected>"));
    }

    #[test]
    fn filter_panel_marks_current_mode() {
        let html = render_page(&page(vec![panel(Metric::FilterAnalysis, Vec::new(), Vec::new())]));
        assert!(html.contains("<option value=\"individual\" selected>Individually</option>"));
    }

    #[test]
    fn failed_panel_shows_placeholder_and_error() {
        let html = render_page(&page(vec![panel(
            Metric::MerchantDistribution,
            Vec::new(),
            vec![Notice::Error("Could not load <merchants>".into())],
        )]));
        assert!(html.contains("No data to display."));
        assert!(html.contains("<div class=\"notice error\">Could not load &lt;merchants&gt;</div>"));
    }

    #[test]
    fn empty_section_shows_its_message_without_table() {
        let section = Section {
            title: "Products in Position #1".into(),
            chart: Some(Chart::HorizontalBar(Vec::new())),
            table: Table {
                headers: vec!["Title"],
                rows: Vec::new(),
            },
            empty_message: "No data available for position #1.".into(),
        };
        let html = render_page(&page(vec![panel(Metric::TopProducts, vec![section], Vec::new())]));
        assert!(html.contains("No data available for position #1."));
        assert!(!html.contains("<table>"));
        assert!(!html.contains("<svg"));
    }

    #[test]
    fn rows_and_links_are_escaped() {
        let section = Section {
            title: "Products in Position #1".into(),
            chart: Some(Chart::HorizontalBar(vec![Bar::new("Boot <XL>", 2)])),
            table: Table {
                headers: vec!["Title", "Link", "Merchant", "Appearances"],
                rows: vec![vec![
                    Cell::Text("Boot <XL>".into()),
                    Cell::Link("https://shop.example/p?a=1&b=2".into()),
                    Cell::Empty,
                    Cell::Int(2),
                ]],
            },
            empty_message: String::new(),
        };
        let html = render_page(&page(vec![panel(Metric::TopProducts, vec![section], Vec::new())]));
        assert!(html.contains("<td>Boot &lt;XL&gt;</td>"));
        assert!(html.contains("href=\"https://shop.example/p?a=1&amp;b=2\""));
        assert!(html.contains("<td class=\"num\">2</td>"));
        assert!(html.contains("<svg"));
    }

    #[test]
    fn non_web_links_are_not_clickable() {
        let mut html = String::new();
        cell_html(&mut html, &Cell::Link("javascript:alert(1)".into()));
        assert_eq!(html, "<td>javascript:alert(1)</td>");
    }

    #[test]
    fn page_without_selection_still_renders_notices() {
        let html = render_page(&DashboardPage {
            selection: None,
            notices: vec![Notice::Error("Could not load clients".into())],
            panels: Vec::new(),
        });
        assert!(html.contains("<div class=\"notice error\">Could not load clients</div>"));
        assert!(!html.contains("<select id=\"client\""));
    }
}
