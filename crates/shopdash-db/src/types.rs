//! Typed result rows for the analytical queries.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use shopdash_core::model::{deserialize_text_id, deserialize_timestamp};

/// A product and how many times it ranked within the position cutoff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopProduct {
    pub id: i64,
    #[serde(deserialize_with = "deserialize_text_id")]
    pub product_id: String,
    pub title: String,
    pub link: Option<String>,
    pub merchant: Option<String>,
    pub count: i64,
}

/// Mean position of one keyword on one scrape date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionTrend {
    #[serde(deserialize_with = "deserialize_timestamp")]
    pub scrape_date: NaiveDateTime,
    pub keyword: String,
    pub avg_position: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCount {
    pub filter: String,
    pub count: i64,
}

/// Number of distinct products a merchant had in a client's results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantCount {
    pub merchant: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantProduct {
    pub title: String,
    pub link: Option<String>,
    pub appearance_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn position_trend_reads_json_agg_timestamp() {
        let row: PositionTrend = serde_json::from_value(json!({
            "scrape_date": "2025-03-02T00:00:00",
            "keyword": "running shoes",
            "avg_position": 2.5
        }))
        .unwrap();
        assert_eq!(row.scrape_date.to_string(), "2025-03-02 00:00:00");
        assert!((row.avg_position - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn top_product_accepts_numeric_external_id() {
        let row: TopProduct = serde_json::from_value(json!({
            "id": 4,
            "product_id": 1234,
            "title": "Trail Shoe",
            "link": null,
            "merchant": "Outdoor Co",
            "count": 9
        }))
        .unwrap();
        assert_eq!(row.product_id, "1234");
        assert!(row.link.is_none());
    }
}
