//! Selector values shared by the dashboard and the CLI.

use std::str::FromStr;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Sentinel keyword option meaning "do not filter by keyword".
pub const ALL_KEYWORDS: &str = "All Keywords";

/// Inclusive calendar-day range applied to `scrape_dates.scrape_date`.
///
/// `start > end` is allowed and selects nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    #[must_use]
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The `days`-wide window ending on `today` (inclusive).
    #[must_use]
    pub fn ending_on(today: NaiveDate, days: u64) -> Self {
        let start = today.checked_sub_days(Days::new(days)).unwrap_or(NaiveDate::MIN);
        Self { start, end: today }
    }

    /// Fills in whichever bound is missing.
    ///
    /// A missing `end` means `today`; a missing `start` means `days` before
    /// the end.
    #[must_use]
    pub fn resolve(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        today: NaiveDate,
        days: u64,
    ) -> Self {
        let end = end.unwrap_or(today);
        match start {
            Some(start) => Self { start, end },
            None => Self::ending_on(end, days),
        }
    }

    /// `true` when the range cannot match any scrape.
    #[must_use]
    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }

    /// First day after the range, used as an exclusive upper bound so the
    /// whole `end` day is included for timestamp columns.
    #[must_use]
    pub fn end_exclusive(&self) -> NaiveDate {
        self.end.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX)
    }
}

/// Parse a `YYYY-MM-DD` calendar day, as sent by `<input type="date">`.
#[must_use]
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// A dashboard panel the user can switch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Metric {
    TopProducts,
    PositionTrends,
    FilterAnalysis,
    MerchantProducts,
    MerchantDistribution,
}

impl Metric {
    /// Display order of the panels.
    pub const ALL: [Metric; 5] = [
        Metric::TopProducts,
        Metric::PositionTrends,
        Metric::FilterAnalysis,
        Metric::MerchantProducts,
        Metric::MerchantDistribution,
    ];

    /// Panels shown before the user picks anything.
    pub const DEFAULTS: [Metric; 2] = [Metric::TopProducts, Metric::FilterAnalysis];

    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Metric::TopProducts => "top-products",
            Metric::PositionTrends => "position-trends",
            Metric::FilterAnalysis => "filter-analysis",
            Metric::MerchantProducts => "merchant-products",
            Metric::MerchantDistribution => "merchant-distribution",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Metric::TopProducts => "Top Products",
            Metric::PositionTrends => "Position Trends",
            Metric::FilterAnalysis => "Filter Analysis",
            Metric::MerchantProducts => "Merchant Products",
            Metric::MerchantDistribution => "Merchant Distribution",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::ALL
            .into_iter()
            .find(|m| m.slug() == s || m.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown metric '{s}'"))
    }
}

/// How the filter analysis counts refinements.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Count each distinct `filters` string as scraped.
    #[default]
    Whole,
    /// Split `filters` on commas and count each trimmed refinement.
    Individual,
}

impl FilterMode {
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            FilterMode::Whole => "whole",
            FilterMode::Individual => "individual",
        }
    }
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "whole" => Ok(FilterMode::Whole),
            "individual" => Ok(FilterMode::Individual),
            other => Err(format!("unknown filter mode '{other}'")),
        }
    }
}
