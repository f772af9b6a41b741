//! Report command handlers.
//!
//! Each handler renders its output to a `String` so the table layout can be
//! tested without capturing stdout; `main` prints it.

use chrono::NaiveDate;
use clap::Subcommand;
use shopdash_core::FilterMode;
use shopdash_db::{Connection, TopProductsFilter};

use crate::ReportArgs;

/// Sub-commands available under `report`.
#[derive(Debug, Subcommand)]
pub enum ReportCommands {
    /// Products ranked by how often they appeared at or above a position
    TopProducts {
        #[command(flatten)]
        args: ReportArgs,
        /// Count only scrapes at this position or better
        #[arg(long, default_value = "1", value_parser = clap::value_parser!(i32).range(1..=100))]
        max_position: i32,
    },
    /// Average position per scrape date and keyword
    PositionTrends {
        #[command(flatten)]
        args: ReportArgs,
    },
    /// Most common search filters for one keyword
    Filters {
        #[command(flatten)]
        args: ReportArgs,
        /// `whole` counts filter strings as-is, `individual` splits on commas
        #[arg(long, default_value = "whole", value_parser = crate::parse_mode)]
        mode: FilterMode,
    },
    /// Distinct products per merchant
    Merchants {
        #[command(flatten)]
        args: ReportArgs,
    },
    /// Products of one merchant by appearance count
    MerchantProducts {
        #[command(flatten)]
        args: ReportArgs,
        #[arg(long)]
        merchant: String,
    },
}

/// Values a report falls back to when its flags leave them open.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ReportDefaults {
    pub today: NaiveDate,
    pub range_days: u64,
    pub top_n: i64,
}

/// Lays out rows as left-aligned columns separated by two spaces.
pub(crate) fn format_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let line = |cells: &mut dyn Iterator<Item = &str>| -> String {
        let mut out = String::new();
        for (i, cell) in cells.enumerate() {
            let width = widths.get(i).copied().unwrap_or(0);
            let pad = width.saturating_sub(cell.chars().count());
            out.push_str(cell);
            out.push_str(&" ".repeat(pad + 2));
        }
        out.trim_end().to_string()
    };

    let mut out = line(&mut headers.iter().copied());
    out.push('\n');
    for row in rows {
        out.push_str(&line(&mut row.iter().map(String::as_str)));
        out.push('\n');
    }
    out
}

fn or_dash(value: Option<String>) -> String {
    value.unwrap_or_else(|| "\u{2014}".to_string())
}

pub(crate) async fn run_ping(conn: &Connection) -> anyhow::Result<()> {
    conn.ping().await?;
    println!("ok: {} backend reachable", conn.backend_name());
    Ok(())
}

pub(crate) async fn run_clients(conn: &Connection) -> anyhow::Result<()> {
    print!("{}", render_clients(conn).await?);
    Ok(())
}

pub(crate) async fn render_clients(conn: &Connection) -> anyhow::Result<String> {
    let clients = shopdash_db::list_clients(conn).await?;
    if clients.is_empty() {
        return Ok("no clients found\n".to_string());
    }
    let rows: Vec<Vec<String>> = clients
        .into_iter()
        .map(|c| vec![c.id.to_string(), c.name])
        .collect();
    Ok(format_table(&["ID", "NAME"], &rows))
}

pub(crate) async fn run_keywords(conn: &Connection, client: &str) -> anyhow::Result<()> {
    let keywords = shopdash_db::list_keywords(conn, client).await?;
    if keywords.is_empty() {
        println!("no keywords found for client '{client}'");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = keywords
        .into_iter()
        .map(|k| vec![k.id.to_string(), k.keyword])
        .collect();
    print!("{}", format_table(&["ID", "KEYWORD"], &rows));
    Ok(())
}

pub(crate) async fn run_report(
    conn: &Connection,
    command: &ReportCommands,
    defaults: &ReportDefaults,
) -> anyhow::Result<()> {
    print!("{}", render_report(conn, command, defaults).await?);
    Ok(())
}

/// Runs one report query and lays out the result.
///
/// # Errors
///
/// Returns an error when the underlying query fails.
pub(crate) async fn render_report(
    conn: &Connection,
    command: &ReportCommands,
    defaults: &ReportDefaults,
) -> anyhow::Result<String> {
    let (today, default_days) = (defaults.today, defaults.range_days);
    match command {
        ReportCommands::TopProducts { args, max_position } => {
            let filter = TopProductsFilter {
                client: &args.client,
                keyword: args.keywords.first().map(String::as_str),
                max_position: *max_position,
                range: args.range(today, default_days),
                limit: args.limit(defaults.top_n),
            };
            let rows = shopdash_db::top_products(conn, &filter).await?;
            if rows.is_empty() {
                return Ok(format!(
                    "no products found at position {max_position} or better for client '{}'\n",
                    args.client
                ));
            }
            let rows: Vec<Vec<String>> = rows
                .into_iter()
                .map(|r| {
                    vec![
                        r.count.to_string(),
                        r.title,
                        or_dash(r.merchant),
                        or_dash(r.link),
                    ]
                })
                .collect();
            Ok(format_table(&["COUNT", "TITLE", "MERCHANT", "LINK"], &rows))
        }
        ReportCommands::PositionTrends { args } => {
            let keywords = if args.keywords.is_empty() {
                shopdash_db::list_keywords(conn, &args.client)
                    .await?
                    .into_iter()
                    .map(|k| k.keyword)
                    .collect()
            } else {
                args.keywords.clone()
            };
            let rows = shopdash_db::position_trends(
                conn,
                &args.client,
                &keywords,
                args.range(today, default_days),
            )
            .await?;
            if rows.is_empty() {
                return Ok(format!("no trend data for client '{}'\n", args.client));
            }
            let rows: Vec<Vec<String>> = rows
                .into_iter()
                .map(|r| {
                    vec![
                        r.scrape_date.format("%Y-%m-%d %H:%M").to_string(),
                        r.keyword,
                        format!("{:.2}", r.avg_position),
                    ]
                })
                .collect();
            Ok(format_table(&["SCRAPE DATE", "KEYWORD", "AVG POSITION"], &rows))
        }
        ReportCommands::Filters { args, mode } => {
            let keyword = match args.keywords.first() {
                Some(keyword) => Some(keyword.clone()),
                None => shopdash_db::list_keywords(conn, &args.client)
                    .await?
                    .into_iter()
                    .next()
                    .map(|k| k.keyword),
            };
            let Some(keyword) = keyword else {
                return Ok(format!("no keywords found for client '{}'\n", args.client));
            };
            let rows = shopdash_db::top_filters(
                conn,
                &args.client,
                &keyword,
                args.range(today, default_days),
                args.limit(defaults.top_n),
                *mode,
            )
            .await?;
            if rows.is_empty() {
                return Ok(format!("no filter data for keyword '{keyword}'\n"));
            }
            let rows: Vec<Vec<String>> = rows
                .into_iter()
                .map(|r| vec![r.count.to_string(), r.filter])
                .collect();
            Ok(format_table(&["COUNT", "FILTER"], &rows))
        }
        ReportCommands::Merchants { args } => {
            let rows = shopdash_db::merchant_distribution(
                conn,
                &args.client,
                args.range(today, default_days),
                args.limit(defaults.top_n),
            )
            .await?;
            if rows.is_empty() {
                return Ok(format!("no merchant data for client '{}'\n", args.client));
            }
            let rows: Vec<Vec<String>> = rows
                .into_iter()
                .map(|r| vec![r.count.to_string(), r.merchant])
                .collect();
            Ok(format_table(&["PRODUCTS", "MERCHANT"], &rows))
        }
        ReportCommands::MerchantProducts { args, merchant } => {
            let rows = shopdash_db::merchant_products(
                conn,
                &args.client,
                merchant,
                args.range(today, default_days),
                args.limit(defaults.top_n),
            )
            .await?;
            if rows.is_empty() {
                return Ok(format!("no products found for merchant '{merchant}'\n"));
            }
            let rows: Vec<Vec<String>> = rows
                .into_iter()
                .map(|r| vec![r.appearance_count.to_string(), r.title, or_dash(r.link)])
                .collect();
            Ok(format_table(&["APPEARANCES", "TITLE", "LINK"], &rows))
        }
    }
}
