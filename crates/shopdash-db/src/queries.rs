//! Analytical queries over the scrape tables.
//!
//! Each function resolves names to ids with a table select, builds one
//! statement, and decodes the rows the remote engine returns. An unknown
//! client or keyword yields an empty result rather than an error.

use shopdash_core::{Client, DateRange, FilterMode, Keyword, ScrapeDate, ALL_KEYWORDS};

use crate::connection::{decode_rows, Connection};
use crate::error::QueryError;
use crate::statements::{self, Order, TableSelect};
use crate::types::{FilterCount, MerchantCount, MerchantProduct, PositionTrend, TopProduct};

/// Selection for [`top_products`].
#[derive(Debug, Clone, Copy)]
pub struct TopProductsFilter<'a> {
    pub client: &'a str,
    /// `None` or [`ALL_KEYWORDS`] means every keyword of the client.
    pub keyword: Option<&'a str>,
    /// Inclusive rank cutoff: 1 for "position #1", 5 for "top 5".
    pub max_position: i32,
    pub range: Option<DateRange>,
    pub limit: i64,
}

impl TopProductsFilter<'_> {
    fn keyword(&self) -> Option<&str> {
        self.keyword.filter(|k| !k.is_empty() && *k != ALL_KEYWORDS)
    }
}

/// All clients ordered by name.
///
/// # Errors
///
/// Returns [`QueryError`] if the remote read fails.
pub async fn list_clients(conn: &Connection) -> Result<Vec<Client>, QueryError> {
    let select = TableSelect::new("clients", &["id", "name"]).order_by("name", Order::Asc);
    let rows = conn.select(&select).await?;
    decode_rows(rows, "clients")
}

/// Id of the client called `name`, if any.
///
/// # Errors
///
/// Returns [`QueryError`] if the remote read fails.
pub async fn find_client_id(conn: &Connection, name: &str) -> Result<Option<i64>, QueryError> {
    let select = TableSelect::new("clients", &["id"])
        .eq("name", name)
        .order_by("id", Order::Asc)
        .limit(1);
    first_id(conn, &select, "clients").await
}

/// Keywords tracked for a client, ordered alphabetically.
///
/// # Errors
///
/// Returns [`QueryError`] if a remote read fails.
pub async fn list_keywords(conn: &Connection, client: &str) -> Result<Vec<Keyword>, QueryError> {
    let Some(client_id) = find_client_id(conn, client).await? else {
        tracing::debug!(client, "unknown client; no keywords");
        return Ok(Vec::new());
    };
    let select = TableSelect::new("keywords", &["id", "keyword", "client_id"])
        .eq("client_id", client_id.to_string())
        .order_by("keyword", Order::Asc);
    let rows = conn.select(&select).await?;
    decode_rows(rows, "keywords")
}

/// Id of `keyword` within one client's keywords.
///
/// # Errors
///
/// Returns [`QueryError`] if the remote read fails.
pub async fn find_keyword_id(
    conn: &Connection,
    client_id: i64,
    keyword: &str,
) -> Result<Option<i64>, QueryError> {
    let select = TableSelect::new("keywords", &["id"])
        .eq("client_id", client_id.to_string())
        .eq("keyword", keyword)
        .order_by("id", Order::Asc)
        .limit(1);
    first_id(conn, &select, "keywords").await
}

/// The most recent scraping run.
///
/// # Errors
///
/// Returns [`QueryError`] if the remote read fails.
pub async fn latest_scrape_date(conn: &Connection) -> Result<Option<ScrapeDate>, QueryError> {
    let select = TableSelect::new("scrape_dates", &["id", "scrape_date"])
        .order_by("scrape_date", Order::Desc)
        .limit(1);
    let rows = conn.select(&select).await?;
    Ok(decode_rows(rows, "scrape_dates")?.into_iter().next())
}

/// Products that most often ranked at or above `filter.max_position`.
///
/// # Errors
///
/// Returns [`QueryError`] if a remote call fails.
pub async fn top_products(
    conn: &Connection,
    filter: &TopProductsFilter<'_>,
) -> Result<Vec<TopProduct>, QueryError> {
    if filter.range.is_some_and(|r| r.is_inverted()) {
        return Ok(Vec::new());
    }
    let Some(client_id) = find_client_id(conn, filter.client).await? else {
        return Ok(Vec::new());
    };
    let sql = statements::top_products_sql(
        client_id,
        filter.max_position,
        filter.keyword(),
        filter.range.as_ref(),
        filter.limit,
    );
    tracing::debug!(
        client = filter.client,
        max_position = filter.max_position,
        keyword = filter.keyword(),
        "top_products"
    );
    let rows = conn.run_query(&sql).await?;
    decode_rows(rows, "top_products")
}

/// Average position per scrape date for each of `keywords`.
///
/// Keywords the client does not track are skipped.
///
/// # Errors
///
/// Returns [`QueryError`] if a remote call fails.
pub async fn position_trends(
    conn: &Connection,
    client: &str,
    keywords: &[String],
    range: Option<DateRange>,
) -> Result<Vec<PositionTrend>, QueryError> {
    if keywords.is_empty() || range.is_some_and(|r| r.is_inverted()) {
        return Ok(Vec::new());
    }
    let Some(client_id) = find_client_id(conn, client).await? else {
        return Ok(Vec::new());
    };

    let mut keyword_ids = Vec::with_capacity(keywords.len());
    for keyword in keywords {
        if let Some(id) = find_keyword_id(conn, client_id, keyword).await? {
            keyword_ids.push(id);
        }
    }
    if keyword_ids.is_empty() {
        return Ok(Vec::new());
    }

    let sql = statements::position_trends_sql(&keyword_ids, range.as_ref());
    tracing::debug!(client, keywords = keyword_ids.len(), "position_trends");
    let rows = conn.run_query(&sql).await?;
    decode_rows(rows, "position_trends")
}

/// Most frequent filters applied while scraping one keyword.
///
/// # Errors
///
/// Returns [`QueryError`] if a remote call fails.
pub async fn top_filters(
    conn: &Connection,
    client: &str,
    keyword: &str,
    range: Option<DateRange>,
    limit: i64,
    mode: FilterMode,
) -> Result<Vec<FilterCount>, QueryError> {
    if range.is_some_and(|r| r.is_inverted()) {
        return Ok(Vec::new());
    }
    let Some(client_id) = find_client_id(conn, client).await? else {
        return Ok(Vec::new());
    };
    let Some(keyword_id) = find_keyword_id(conn, client_id, keyword).await? else {
        return Ok(Vec::new());
    };
    let sql = statements::top_filters_sql(keyword_id, range.as_ref(), limit, mode);
    tracing::debug!(client, keyword, mode = mode.slug(), "top_filters");
    let rows = conn.run_query(&sql).await?;
    decode_rows(rows, "top_filters")
}

/// Distinct product count per merchant across the client's keywords.
///
/// # Errors
///
/// Returns [`QueryError`] if a remote call fails.
pub async fn merchant_distribution(
    conn: &Connection,
    client: &str,
    range: Option<DateRange>,
    limit: i64,
) -> Result<Vec<MerchantCount>, QueryError> {
    if range.is_some_and(|r| r.is_inverted()) {
        return Ok(Vec::new());
    }
    let Some(client_id) = find_client_id(conn, client).await? else {
        return Ok(Vec::new());
    };
    let sql = statements::merchant_distribution_sql(client_id, range.as_ref(), limit);
    tracing::debug!(client, "merchant_distribution");
    let rows = conn.run_query(&sql).await?;
    decode_rows(rows, "merchant_distribution")
}

/// Products of one merchant ranked by how often they appeared.
///
/// # Errors
///
/// Returns [`QueryError`] if a remote call fails.
pub async fn merchant_products(
    conn: &Connection,
    client: &str,
    merchant: &str,
    range: Option<DateRange>,
    limit: i64,
) -> Result<Vec<MerchantProduct>, QueryError> {
    if range.is_some_and(|r| r.is_inverted()) {
        return Ok(Vec::new());
    }
    let Some(client_id) = find_client_id(conn, client).await? else {
        return Ok(Vec::new());
    };
    let sql = statements::merchant_products_sql(client_id, merchant, range.as_ref(), limit);
    tracing::debug!(client, merchant, "merchant_products");
    let rows = conn.run_query(&sql).await?;
    decode_rows(rows, "merchant_products")
}

async fn first_id(
    conn: &Connection,
    select: &TableSelect,
    context: &str,
) -> Result<Option<i64>, QueryError> {
    #[derive(serde::Deserialize)]
    struct IdRow {
        id: i64,
    }

    let rows = conn.select(select).await?;
    Ok(decode_rows::<IdRow>(rows, context)?
        .into_iter()
        .next()
        .map(|row| row.id))
}
