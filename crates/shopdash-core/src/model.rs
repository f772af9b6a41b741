//! Read-only mirrors of the scrape database tables.
//!
//! Rows are created and removed by the external ingestion tool; the
//! dashboard only ever reads them.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};

/// A customer whose keywords are scraped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub name: String,
}

/// A search term tracked for one client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
    pub id: i64,
    pub keyword: String,
    pub client_id: i64,
}

/// One data-collection run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeDate {
    pub id: i64,
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub scrape_date: NaiveDateTime,
}

/// A product listing seen in shopping results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    /// Identifier assigned by the shopping engine, not by our database.
    #[serde(deserialize_with = "deserialize_text_id")]
    pub product_id: String,
    pub title: String,
    pub link: Option<String>,
    pub merchant: Option<String>,
}

/// Fact row: where a product ranked for a keyword on one scrape date.
///
/// Always references exactly one [`Product`], one [`Keyword`] and one
/// [`ScrapeDate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductScrape {
    pub product_id: i64,
    pub keyword_id: i64,
    pub scrape_date_id: i64,
    /// 1-based rank within the keyword's result set.
    pub position: i32,
    /// Comma-separated search refinements active during the scrape.
    pub filters: Option<String>,
}

/// Parse a timestamp as `PostgREST` or `json_agg` render it.
///
/// Accepts RFC 3339 (`timestamptz`), naive `YYYY-MM-DDTHH:MM:SS[.f]`
/// (`timestamp`, with `T` or space) and bare dates (`date`, midnight).
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.naive_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Serde adapter for [`parse_timestamp`].
///
/// # Errors
///
/// Fails when the value is not a string or matches none of the accepted
/// layouts.
pub fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognized timestamp '{raw}'")))
}

/// Accept an external identifier stored either as text or as a number.
///
/// # Errors
///
/// Fails for any JSON type other than string or number.
pub fn deserialize_text_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TextOrNumber {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match TextOrNumber::deserialize(deserializer)? {
        TextOrNumber::Text(s) => s,
        TextOrNumber::Int(n) => n.to_string(),
        TextOrNumber::Float(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_timestamp_accepts_timestamptz() {
        let ts = parse_timestamp("2025-03-01T10:30:00+00:00").expect("rfc3339");
        assert_eq!(ts.to_string(), "2025-03-01 10:30:00");
    }

    #[test]
    fn parse_timestamp_converts_offsets_to_utc() {
        let ts = parse_timestamp("2025-03-01T10:30:00+02:00").expect("rfc3339");
        assert_eq!(ts.to_string(), "2025-03-01 08:30:00");
    }

    #[test]
    fn parse_timestamp_accepts_naive_forms() {
        assert!(parse_timestamp("2025-03-01T10:30:00").is_some());
        assert!(parse_timestamp("2025-03-01T10:30:00.123456").is_some());
        assert!(parse_timestamp("2025-03-01 10:30:00").is_some());
    }

    #[test]
    fn parse_timestamp_accepts_bare_date_as_midnight() {
        let ts = parse_timestamp("2025-03-01").expect("date");
        assert_eq!(ts.to_string(), "2025-03-01 00:00:00");
    }

    #[test]
    fn parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("last tuesday").is_none());
    }

    #[test]
    fn scrape_date_deserializes_from_postgrest_row() {
        let row: ScrapeDate =
            serde_json::from_value(serde_json::json!({"id": 7, "scrape_date": "2025-02-14T06:00:00"}))
                .expect("deserialize");
        assert_eq!(row.id, 7);
        assert_eq!(row.scrape_date.to_string(), "2025-02-14 06:00:00");
    }

    #[test]
    fn product_allows_missing_merchant() {
        let row: Product = serde_json::from_value(serde_json::json!({
            "id": 1,
            "product_id": "g-123",
            "title": "Trail Shoe",
            "link": null,
            "merchant": null
        }))
        .expect("deserialize");
        assert!(row.merchant.is_none());
    }

    #[test]
    fn product_accepts_numeric_external_id() {
        let row: Product = serde_json::from_value(serde_json::json!({
            "id": 2,
            "product_id": 9_876_543_210_i64,
            "title": "Rain Jacket",
            "link": "https://shop.example/jacket",
            "merchant": "Outdoor Co"
        }))
        .expect("deserialize");
        assert_eq!(row.product_id, "9876543210");
    }
}
