//! SQL statement builders.
//!
//! Statements are plain strings submitted through the `run_query` procedure,
//! so parameters are embedded as literals: text goes through [`sql_literal`],
//! numbers are formatted from integers. Identifiers are always static.

use shopdash_core::{DateRange, FilterMode};

/// Sort direction for a [`TableSelect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    fn postgrest(self) -> &'static str {
        match self {
            Order::Asc => "asc",
            Order::Desc => "desc",
        }
    }

    fn sql(self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

/// A single-table read with equality filters, expressible both as a
/// `PostgREST` request and as SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSelect {
    pub table: &'static str,
    pub columns: &'static [&'static str],
    pub filters: Vec<(&'static str, String)>,
    pub order: Option<(&'static str, Order)>,
    pub limit: Option<u32>,
}

impl TableSelect {
    #[must_use]
    pub fn new(table: &'static str, columns: &'static [&'static str]) -> Self {
        Self {
            table,
            columns,
            filters: Vec::new(),
            order: None,
            limit: None,
        }
    }

    #[must_use]
    pub fn eq(mut self, column: &'static str, value: impl Into<String>) -> Self {
        self.filters.push((column, value.into()));
        self
    }

    #[must_use]
    pub fn order_by(mut self, column: &'static str, order: Order) -> Self {
        self.order = Some((column, order));
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Query-string pairs for `GET /rest/v1/{table}`.
    #[must_use]
    pub fn postgrest_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), self.columns.join(","))];
        for (column, value) in &self.filters {
            params.push(((*column).to_string(), format!("eq.{value}")));
        }
        if let Some((column, order)) = self.order {
            params.push(("order".to_string(), format!("{column}.{}", order.postgrest())));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }

    /// Equivalent SQL for backends without a REST layer.
    #[must_use]
    pub fn to_sql(&self) -> String {
        let mut sql = format!("SELECT {} FROM {}", self.columns.join(", "), self.table);
        for (i, (column, value)) in self.filters.iter().enumerate() {
            let keyword = if i == 0 { "WHERE" } else { "AND" };
            sql.push_str(&format!(" {keyword} {column} = {}", sql_literal(value)));
        }
        if let Some((column, order)) = self.order {
            sql.push_str(&format!(" ORDER BY {column} {}", order.sql()));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        sql
    }
}

/// Quote `value` as a Postgres string literal.
///
/// Single quotes are doubled and NUL bytes (rejected by Postgres text) are
/// dropped. Assumes `standard_conforming_strings = on`.
#[must_use]
pub fn sql_literal(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for ch in value.chars() {
        match ch {
            '\'' => quoted.push_str("''"),
            '\0' => {}
            other => quoted.push(other),
        }
    }
    quoted.push('\'');
    quoted
}

fn push_date_range(sql: &mut String, range: Option<&DateRange>) {
    if let Some(range) = range {
        sql.push_str(&format!(
            "\n  AND sd.scrape_date >= {}\n  AND sd.scrape_date < {}",
            sql_literal(&range.start.format("%Y-%m-%d").to_string()),
            sql_literal(&range.end_exclusive().format("%Y-%m-%d").to_string()),
        ));
    }
}

/// Products ranked by how often they appeared at or above `max_position`.
#[must_use]
pub fn top_products_sql(
    client_id: i64,
    max_position: i32,
    keyword: Option<&str>,
    range: Option<&DateRange>,
    limit: i64,
) -> String {
    let mut sql = format!(
        "SELECT p.id AS id, p.product_id AS product_id, p.title AS title, \
         p.link AS link, p.merchant AS merchant, COUNT(*) AS count\n\
         FROM product_scrapes ps\n\
         JOIN products p ON ps.product_id = p.id\n\
         JOIN keywords k ON ps.keyword_id = k.id\n\
         JOIN scrape_dates sd ON ps.scrape_date_id = sd.id\n\
         WHERE k.client_id = {client_id}\n  AND ps.position <= {max_position}"
    );
    if let Some(keyword) = keyword {
        sql.push_str(&format!("\n  AND k.keyword = {}", sql_literal(keyword)));
    }
    push_date_range(&mut sql, range);
    sql.push_str(&format!(
        "\nGROUP BY p.id, p.product_id, p.title, p.link, p.merchant\n\
         ORDER BY count DESC, title ASC\n\
         LIMIT {limit}"
    ));
    sql
}

/// Average position per scrape date and keyword.
///
/// An empty `keyword_ids` slice yields `IN (NULL)`, which matches nothing.
#[must_use]
pub fn position_trends_sql(keyword_ids: &[i64], range: Option<&DateRange>) -> String {
    let ids = if keyword_ids.is_empty() {
        "NULL".to_string()
    } else {
        keyword_ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };
    let mut sql = format!(
        "SELECT sd.scrape_date AS scrape_date, k.keyword AS keyword, \
         AVG(ps.position)::float8 AS avg_position\n\
         FROM product_scrapes ps\n\
         JOIN keywords k ON ps.keyword_id = k.id\n\
         JOIN scrape_dates sd ON ps.scrape_date_id = sd.id\n\
         WHERE k.id IN ({ids})"
    );
    push_date_range(&mut sql, range);
    sql.push_str(
        "\nGROUP BY sd.scrape_date, k.keyword\n\
         ORDER BY sd.scrape_date, k.keyword",
    );
    sql
}

/// Most common filter strings (or individual refinements) for one keyword.
#[must_use]
pub fn top_filters_sql(
    keyword_id: i64,
    range: Option<&DateRange>,
    limit: i64,
    mode: FilterMode,
) -> String {
    let mut sql = match mode {
        FilterMode::Whole => format!(
            "SELECT ps.filters AS filter, COUNT(*) AS count\n\
             FROM product_scrapes ps\n\
             JOIN scrape_dates sd ON ps.scrape_date_id = sd.id\n\
             WHERE ps.keyword_id = {keyword_id}\n\
             \x20 AND ps.filters IS NOT NULL\n\
             \x20 AND ps.filters <> ''"
        ),
        FilterMode::Individual => format!(
            "SELECT btrim(f.part) AS filter, COUNT(*) AS count\n\
             FROM product_scrapes ps\n\
             JOIN scrape_dates sd ON ps.scrape_date_id = sd.id\n\
             CROSS JOIN LATERAL regexp_split_to_table(ps.filters, ',') AS f(part)\n\
             WHERE ps.keyword_id = {keyword_id}\n\
             \x20 AND ps.filters IS NOT NULL\n\
             \x20 AND btrim(f.part) <> ''"
        ),
    };
    push_date_range(&mut sql, range);
    let group = match mode {
        FilterMode::Whole => "ps.filters",
        FilterMode::Individual => "btrim(f.part)",
    };
    sql.push_str(&format!(
        "\nGROUP BY {group}\n\
         ORDER BY count DESC, filter ASC\n\
         LIMIT {limit}"
    ));
    sql
}

/// Distinct products per merchant across a client's keywords.
#[must_use]
pub fn merchant_distribution_sql(client_id: i64, range: Option<&DateRange>, limit: i64) -> String {
    let mut sql = format!(
        "SELECT p.merchant AS merchant, COUNT(DISTINCT p.id) AS count\n\
         FROM product_scrapes ps\n\
         JOIN products p ON ps.product_id = p.id\n\
         JOIN keywords k ON ps.keyword_id = k.id\n\
         JOIN scrape_dates sd ON ps.scrape_date_id = sd.id\n\
         WHERE k.client_id = {client_id}\n  AND p.merchant IS NOT NULL"
    );
    push_date_range(&mut sql, range);
    sql.push_str(&format!(
        "\nGROUP BY p.merchant\n\
         ORDER BY count DESC, merchant ASC\n\
         LIMIT {limit}"
    ));
    sql
}

/// One merchant's products ranked by appearances for a client.
#[must_use]
pub fn merchant_products_sql(
    client_id: i64,
    merchant: &str,
    range: Option<&DateRange>,
    limit: i64,
) -> String {
    let mut sql = format!(
        "SELECT p.title AS title, p.link AS link, COUNT(*) AS appearance_count\n\
         FROM products p\n\
         JOIN product_scrapes ps ON p.id = ps.product_id\n\
         JOIN keywords k ON ps.keyword_id = k.id\n\
         JOIN scrape_dates sd ON ps.scrape_date_id = sd.id\n\
         WHERE k.client_id = {client_id}\n  AND p.merchant = {}",
        sql_literal(merchant)
    );
    push_date_range(&mut sql, range);
    sql.push_str(&format!(
        "\nGROUP BY p.title, p.link\n\
         ORDER BY appearance_count DESC, title ASC\n\
         LIMIT {limit}"
    ));
    sql
}
