//! Reporting period, form type and canonical metric name definitions.
//!
//! This module defines [`MetricPeriod`] for the span a financial value covers,
//! [`FormType`] for the periodic reports of interest, and [`MetricName`] for the
//! canonical metrics extracted from tagged facts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FilingsError;

/// Reporting period a financial metric covers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricPeriod {
    /// Full fiscal year.
    #[default]
    Annual,
    /// Single fiscal quarter.
    Quarterly,
    /// Trailing twelve months.
    TrailingTwelveMonths,
    /// Year to date.
    YearToDate,
}

impl MetricPeriod {
    /// Returns the string tag used in persisted records.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Annual => "annual",
            Self::Quarterly => "quarterly",
            Self::TrailingTwelveMonths => "trailing_twelve_months",
            Self::YearToDate => "year_to_date",
        }
    }
}

impl fmt::Display for MetricPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricPeriod {
    type Err = FilingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "annual" | "fy" => Ok(Self::Annual),
            "quarterly" | "quarter" => Ok(Self::Quarterly),
            "trailing_twelve_months" | "ttm" => Ok(Self::TrailingTwelveMonths),
            "year_to_date" | "ytd" => Ok(Self::YearToDate),
            other => Err(FilingsError::InvalidParameter(format!(
                "Unknown metric period: {other}"
            ))),
        }
    }
}

/// Periodic report form types retained by the normalizer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormType {
    /// Annual report.
    #[serde(rename = "10-K")]
    TenK,
    /// Quarterly report.
    #[serde(rename = "10-Q")]
    TenQ,
    /// Amended annual report.
    #[serde(rename = "10-K/A")]
    TenKAmended,
    /// Amended quarterly report.
    #[serde(rename = "10-Q/A")]
    TenQAmended,
}

impl FormType {
    /// Parses an upstream form code, returning `None` for forms outside the allow-list.
    #[must_use]
    pub fn parse(form: &str) -> Option<Self> {
        match form.trim() {
            "10-K" => Some(Self::TenK),
            "10-Q" => Some(Self::TenQ),
            "10-K/A" => Some(Self::TenKAmended),
            "10-Q/A" => Some(Self::TenQAmended),
            _ => None,
        }
    }

    /// Returns the upstream form code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TenK => "10-K",
            Self::TenQ => "10-Q",
            Self::TenKAmended => "10-K/A",
            Self::TenQAmended => "10-Q/A",
        }
    }

    /// Returns true for amendments of an earlier filing.
    #[must_use]
    pub const fn is_amended(&self) -> bool {
        matches!(self, Self::TenKAmended | Self::TenQAmended)
    }

    /// Returns true for quarterly reports.
    #[must_use]
    pub const fn is_quarterly(&self) -> bool {
        matches!(self, Self::TenQ | Self::TenQAmended)
    }
}

impl fmt::Display for FormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical financial metrics extracted from tagged facts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MetricName {
    /// Total revenue.
    Revenue,
    /// Net income (loss).
    NetIncome,
    /// Total assets.
    TotalAssets,
    /// Total liabilities.
    TotalLiabilities,
    /// Operating income (loss).
    OperatingIncome,
    /// Earnings per share.
    #[serde(rename = "EPS")]
    Eps,
    /// Cash and cash equivalents.
    CashAndEquivalents,
    /// Goodwill.
    Goodwill,
    /// Retained earnings (accumulated deficit).
    RetainedEarnings,
    /// Stockholders' equity.
    StockholdersEquity,
}

impl MetricName {
    /// All canonical metrics, in extraction order.
    pub const ALL: [Self; 10] = [
        Self::Revenue,
        Self::NetIncome,
        Self::TotalAssets,
        Self::TotalLiabilities,
        Self::OperatingIncome,
        Self::Eps,
        Self::CashAndEquivalents,
        Self::Goodwill,
        Self::RetainedEarnings,
        Self::StockholdersEquity,
    ];

    /// Returns the canonical metric identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Revenue => "Revenue",
            Self::NetIncome => "NetIncome",
            Self::TotalAssets => "TotalAssets",
            Self::TotalLiabilities => "TotalLiabilities",
            Self::OperatingIncome => "OperatingIncome",
            Self::Eps => "EPS",
            Self::CashAndEquivalents => "CashAndEquivalents",
            Self::Goodwill => "Goodwill",
            Self::RetainedEarnings => "RetainedEarnings",
            Self::StockholdersEquity => "StockholdersEquity",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricName {
    type Err = FilingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| FilingsError::InvalidParameter(format!("Unknown metric: {s}")))
    }
}
