//! Inline SVG charts.
//!
//! Charts are rendered server side so the page works without scripts. All
//! text passes through [`escape_html`].

use chrono::NaiveDateTime;

use super::render::escape_html;

const WIDTH: f64 = 720.0;
const BAR_HEIGHT: f64 = 26.0;
const LABEL_WIDTH: f64 = 260.0;
const MAX_LABEL_CHARS: usize = 38;
const PALETTE: [&str; 8] = [
    "#2563eb", "#0ea66c", "#d97706", "#e11d48", "#7c3aed", "#0891b2", "#65a30d", "#db2777",
];

#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub label: String,
    pub value: f64,
}

impl Bar {
    #[allow(clippy::cast_precision_loss)]
    pub fn new(label: &str, count: i64) -> Self {
        Self {
            label: label.to_string(),
            value: count as f64,
        }
    }
}

/// One line of a line chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub points: Vec<(NaiveDateTime, f64)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Chart {
    /// Bars grow to the right; best for long labels.
    HorizontalBar(Vec<Bar>),
    VerticalBar(Vec<Bar>),
    /// Average positions over time. The y axis is inverted so rank 1 is at
    /// the top.
    Line(Vec<Series>),
}

impl Chart {
    #[must_use]
    pub fn to_svg(&self) -> String {
        match self {
            Chart::HorizontalBar(bars) => horizontal_bars(bars),
            Chart::VerticalBar(bars) => vertical_bars(bars),
            Chart::Line(series) => line_chart(series),
        }
    }
}

fn truncate(label: &str) -> String {
    if label.chars().count() <= MAX_LABEL_CHARS {
        label.to_string()
    } else {
        let cut: String = label.chars().take(MAX_LABEL_CHARS - 1).collect();
        format!("{cut}…")
    }
}

fn max_value(bars: &[Bar]) -> f64 {
    bars.iter().map(|b| b.value).fold(0.0_f64, f64::max).max(1.0)
}

#[allow(clippy::cast_precision_loss)]
fn horizontal_bars(bars: &[Bar]) -> String {
    let height = BAR_HEIGHT * bars.len() as f64 + 16.0;
    let plot = WIDTH - LABEL_WIDTH - 60.0;
    let max = max_value(bars);

    let mut svg = format!(
        r#"<svg class="chart" viewBox="0 0 {WIDTH} {height}" role="img" xmlns="http://www.w3.org/2000/svg">"#
    );
    for (i, bar) in bars.iter().enumerate() {
        let y = 8.0 + BAR_HEIGHT * i as f64;
        let w = (bar.value / max * plot).max(1.0);
        svg.push_str(&format!(
            r#"<g><title>{title}: {value}</title><text x="{lx}" y="{ty}" text-anchor="end" class="label">{label}</text><rect x="{LABEL_WIDTH}" y="{ry}" width="{w:.1}" height="{bh}" rx="3" fill="{fill}"/><text x="{vx:.1}" y="{ty}" class="value">{value}</text></g>"#,
            title = escape_html(&bar.label),
            value = bar.value,
            lx = LABEL_WIDTH - 8.0,
            ty = y + BAR_HEIGHT / 2.0 + 4.0,
            label = escape_html(&truncate(&bar.label)),
            ry = y + 3.0,
            bh = BAR_HEIGHT - 6.0,
            fill = PALETTE[0],
            vx = LABEL_WIDTH + w + 6.0,
        ));
    }
    svg.push_str("</svg>");
    svg
}

#[allow(clippy::cast_precision_loss)]
fn vertical_bars(bars: &[Bar]) -> String {
    let height = 320.0;
    let top = 16.0;
    let bottom = 110.0;
    let plot_h = height - top - bottom;
    let slot = if bars.is_empty() {
        WIDTH
    } else {
        (WIDTH - 40.0) / bars.len() as f64
    };
    let max = max_value(bars);

    let mut svg = format!(
        r#"<svg class="chart" viewBox="0 0 {WIDTH} {height}" role="img" xmlns="http://www.w3.org/2000/svg">"#
    );
    svg.push_str(&format!(
        r#"<line x1="20" y1="{base}" x2="{x2}" y2="{base}" class="axis"/>"#,
        base = height - bottom,
        x2 = WIDTH - 20.0,
    ));
    for (i, bar) in bars.iter().enumerate() {
        let h = (bar.value / max * plot_h).max(1.0);
        let x = 20.0 + slot * i as f64 + slot * 0.15;
        let w = slot * 0.7;
        let y = height - bottom - h;
        let cx = x + w / 2.0;
        svg.push_str(&format!(
            r#"<g><title>{title}: {value}</title><rect x="{x:.1}" y="{y:.1}" width="{w:.1}" height="{h:.1}" rx="3" fill="{fill}"/><text x="{cx:.1}" y="{vy:.1}" text-anchor="middle" class="value">{value}</text><text x="{cx:.1}" y="{ly:.1}" text-anchor="end" transform="rotate(-40 {cx:.1} {ly:.1})" class="label">{label}</text></g>"#,
            title = escape_html(&bar.label),
            value = bar.value,
            fill = PALETTE[i % PALETTE.len()],
            vy = y - 4.0,
            ly = height - bottom + 14.0,
            label = escape_html(&truncate(&bar.label)),
        ));
    }
    svg.push_str("</svg>");
    svg
}

#[allow(clippy::cast_precision_loss)]
fn line_chart(series: &[Series]) -> String {
    let height = 340.0;
    let (left, right, top, bottom) = (48.0, 20.0, 16.0, 64.0);
    let plot_w = WIDTH - left - right;
    let plot_h = height - top - bottom;

    let points = series.iter().flat_map(|s| s.points.iter());
    let (mut t_min, mut t_max) = (i64::MAX, i64::MIN);
    let mut y_max = 1.0_f64;
    for (ts, value) in points {
        let t = ts.and_utc().timestamp();
        t_min = t_min.min(t);
        t_max = t_max.max(t);
        y_max = y_max.max(*value);
    }
    let y_min = 1.0_f64;
    let y_max = y_max.ceil().max(y_min + 1.0);
    let t_span = (t_max - t_min).max(1) as f64;

    let x_of = |ts: &NaiveDateTime| {
        if t_min == t_max {
            left + plot_w / 2.0
        } else {
            left + (ts.and_utc().timestamp() - t_min) as f64 / t_span * plot_w
        }
    };
    // Inverted: position 1 sits at the top edge.
    let y_of = |v: f64| top + (v - y_min) / (y_max - y_min) * plot_h;

    let mut svg = format!(
        r#"<svg class="chart" viewBox="0 0 {WIDTH} {height}" role="img" xmlns="http://www.w3.org/2000/svg">"#
    );

    let steps = 5_u32;
    for i in 0..=steps {
        let v = y_min + (y_max - y_min) * f64::from(i) / f64::from(steps);
        let y = y_of(v);
        svg.push_str(&format!(
            r#"<line x1="{left}" y1="{y:.1}" x2="{x2}" y2="{y:.1}" class="grid"/><text x="{tx}" y="{ty:.1}" text-anchor="end" class="label">{v:.1}</text>"#,
            x2 = WIDTH - right,
            tx = left - 6.0,
            ty = y + 4.0,
        ));
    }

    let mut dates: Vec<&NaiveDateTime> = series
        .iter()
        .flat_map(|s| s.points.iter().map(|(ts, _)| ts))
        .collect();
    dates.sort();
    dates.dedup();
    let stride = dates.len().div_ceil(6).max(1);
    for ts in dates.iter().step_by(stride) {
        svg.push_str(&format!(
            r#"<text x="{x:.1}" y="{y}" text-anchor="middle" class="label">{d}</text>"#,
            x = x_of(ts),
            y = height - bottom + 18.0,
            d = ts.format("%Y-%m-%d"),
        ));
    }

    for (i, s) in series.iter().enumerate() {
        let color = PALETTE[i % PALETTE.len()];
        let path: Vec<String> = s
            .points
            .iter()
            .map(|(ts, v)| format!("{:.1},{:.1}", x_of(ts), y_of(*v)))
            .collect();
        svg.push_str(&format!(
            r#"<polyline points="{}" fill="none" stroke="{color}" stroke-width="2"/>"#,
            path.join(" ")
        ));
        for (ts, v) in &s.points {
            svg.push_str(&format!(
                r#"<circle cx="{cx:.1}" cy="{cy:.1}" r="3.5" fill="{color}"><title>{name} {date}: {v:.2}</title></circle>"#,
                cx = x_of(ts),
                cy = y_of(*v),
                name = escape_html(&s.name),
                date = ts.format("%Y-%m-%d"),
            ));
        }
        let lx = left + 140.0 * (i % 4) as f64;
        let ly = height - 22.0 + 14.0 * (i / 4) as f64;
        svg.push_str(&format!(
            r#"<rect x="{lx}" y="{ry}" width="10" height="10" fill="{color}"/><text x="{tx}" y="{ly}" class="label">{name}</text>"#,
            ry = ly - 9.0,
            tx = lx + 14.0,
            name = escape_html(&truncate(&s.name)),
        ));
    }

    svg.push_str("</svg>");
    svg
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopdash_core::model::parse_timestamp;

    fn ts(raw: &str) -> NaiveDateTime {
        parse_timestamp(raw).expect("timestamp")
    }

    fn circle_y(svg: &str, nth: usize) -> f64 {
        let start = svg.match_indices("<circle").nth(nth).expect("circle").0;
        let rest = &svg[start..];
        let cy = rest.find("cy=\"").expect("cy") + 4;
        let end = rest[cy..].find('"').expect("quote");
        rest[cy..cy + end].parse().expect("number")
    }

    #[test]
    fn bar_labels_are_escaped() {
        let svg = Chart::HorizontalBar(vec![Bar::new("<b>Boots & Co</b>", 3)]).to_svg();
        assert!(svg.contains("&lt;b&gt;Boots &amp; Co&lt;/b&gt;"));
        assert!(!svg.contains("<b>"));
    }

    #[test]
    fn long_labels_are_truncated() {
        let long = "x".repeat(80);
        let svg = Chart::VerticalBar(vec![Bar::new(&long, 1)]).to_svg();
        assert!(svg.contains(&format!("{}…", "x".repeat(MAX_LABEL_CHARS - 1))));
    }

    #[test]
    fn one_rect_per_bar() {
        let bars = vec![Bar::new("a", 5), Bar::new("b", 2), Bar::new("c", 1)];
        let svg = Chart::HorizontalBar(bars).to_svg();
        assert_eq!(svg.matches("<rect").count(), 3);
    }

    #[test]
    fn line_chart_puts_better_positions_higher() {
        let series = vec![Series {
            name: "trail shoes".into(),
            points: vec![
                (ts("2025-03-01"), 1.0),
                (ts("2025-03-02"), 4.0),
            ],
        }];
        let svg = Chart::Line(series).to_svg();
        assert!(circle_y(&svg, 0) < circle_y(&svg, 1));
    }

    #[test]
    fn line_chart_handles_single_point() {
        let series = vec![Series {
            name: "rain jacket".into(),
            points: vec![(ts("2025-03-01"), 2.0)],
        }];
        let svg = Chart::Line(series).to_svg();
        assert!(svg.contains("<circle"));
        assert!(!svg.contains("NaN"));
    }

    #[test]
    fn empty_charts_are_still_valid_svg() {
        for chart in [
            Chart::HorizontalBar(Vec::new()),
            Chart::VerticalBar(Vec::new()),
            Chart::Line(Vec::new()),
        ] {
            let svg = chart.to_svg();
            assert!(svg.starts_with("<svg"));
            assert!(svg.ends_with("</svg>"));
            assert!(!svg.contains("NaN"));
        }
    }
}
