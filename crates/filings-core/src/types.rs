//! Core data types for synchronized filing data.
//!
//! This module defines the entities kept in the entity store:
//!
//! - [`Ticker`] - Trading symbol, uppercased
//! - [`Cik`] - Central Index Key, zero-padded to 10 digits
//! - [`CompanyIdentity`] - CIK to ticker mapping
//! - [`Company`] - Company record keyed by ticker
//! - [`Filing`] - Periodic report keyed by accession number
//! - [`FinancialMetric`] - One normalized financial observation

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{FilingsError, Result};
use crate::period::{FormType, MetricName, MetricPeriod};

/// Width of a canonical CIK.
pub const CIK_WIDTH: usize = 10;

/// A trading symbol/ticker.
///
/// Tickers are trimmed and uppercased on creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticker(String);

impl Ticker {
    /// Creates a new ticker from a string, converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_uppercase())
    }

    /// Returns the ticker as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the ticker is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Ticker {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Ticker {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Ticker {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Normalizes a CIK string.
///
/// Surrounding whitespace and an optional `CIK` prefix are stripped. All-digit input
/// is left-padded with zeros to 10 digits; anything else is returned unchanged.
/// The function is idempotent.
#[must_use]
pub fn normalize_cik(raw: &str) -> String {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("CIK")
        .or_else(|| trimmed.strip_prefix("cik"))
        .unwrap_or(trimmed);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        format!("{digits:0>CIK_WIDTH$}")
    } else {
        trimmed.to_string()
    }
}

/// SEC Central Index Key, always stored as a 10-digit zero-padded string.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cik(String);

impl Cik {
    /// Parses and normalizes a CIK.
    ///
    /// # Errors
    /// Returns [`FilingsError::Validation`] if the input is empty, contains non-digits,
    /// or is longer than 10 digits.
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = normalize_cik(raw);
        if normalized.len() != CIK_WIDTH || !normalized.bytes().all(|b| b.is_ascii_digit()) {
            return Err(FilingsError::Validation(format!("Invalid CIK: {raw:?}")));
        }
        Ok(Self(normalized))
    }

    /// Creates a CIK from its numeric form.
    #[must_use]
    pub fn from_number(n: u64) -> Self {
        Self(format!("{n:0>CIK_WIDTH$}"))
    }

    /// Returns the zero-padded CIK.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the CIK without leading zeros, as used in archive paths.
    #[must_use]
    pub fn as_number(&self) -> u64 {
        self.0.parse().unwrap_or_default()
    }
}

impl fmt::Display for Cik {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Cik {
    type Err = FilingsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Mapping between a CIK and the ticker it currently trades under.
///
/// At most one active identity holds a given ticker. Identities are never deleted,
/// only deactivated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompanyIdentity {
    /// Canonical CIK (primary key).
    pub cik: Cik,
    /// Current ticker.
    pub ticker: Ticker,
    /// Company name as registered upstream.
    pub company_name: String,
    /// Primary exchange.
    pub exchange: Option<String>,
    /// Whether this mapping is current.
    pub is_active: bool,
    /// Last time the mapping was refreshed from upstream.
    pub last_updated: DateTime<Utc>,
    /// Previously used tickers.
    #[serde(default)]
    pub alternative_tickers: Vec<Ticker>,
    /// Previously used names.
    #[serde(default)]
    pub alternative_names: Vec<String>,
}

impl CompanyIdentity {
    /// Creates a new active identity.
    #[must_use]
    pub fn new(cik: Cik, ticker: Ticker, company_name: impl Into<String>) -> Self {
        Self {
            cik,
            ticker,
            company_name: company_name.into(),
            exchange: None,
            is_active: true,
            last_updated: Utc::now(),
            alternative_tickers: Vec::new(),
            alternative_names: Vec::new(),
        }
    }

    /// Sets the exchange.
    #[must_use]
    pub fn with_exchange(mut self, exchange: impl Into<String>) -> Self {
        self.exchange = Some(exchange.into());
        self
    }

    /// URL of the company's upstream browse page.
    #[must_use]
    pub fn edgar_url(&self) -> String {
        format!(
            "https://www.sec.gov/cgi-bin/browse-edgar?CIK={}&owner=exclude",
            self.cik
        )
    }
}

/// Company record, keyed by ticker.
///
/// Filings and metrics reference the company through its ticker; they are looked up
/// in the entity store rather than held here.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Company {
    /// Ticker (primary key).
    pub ticker: Ticker,
    /// Company name.
    pub name: String,
    /// CIK.
    pub cik: Cik,
    /// Business sector.
    pub sector: Option<String>,
    /// Industry within the sector.
    pub industry: Option<String>,
    /// Year the company was founded.
    pub founded_year: Option<i32>,
    /// Business description.
    pub description: Option<String>,
    /// Company website.
    pub website: Option<String>,
}

impl Company {
    /// Creates a new company with required fields.
    #[must_use]
    pub fn new(ticker: Ticker, name: impl Into<String>, cik: Cik) -> Self {
        Self {
            ticker,
            name: name.into(),
            cik,
            sector: None,
            industry: None,
            founded_year: None,
            description: None,
            website: None,
        }
    }

    /// Sets the sector.
    #[must_use]
    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }
}

/// A periodic report filed upstream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Filing {
    /// Upstream accession number (primary key).
    pub accession_number: String,
    /// Form type.
    pub form_type: FormType,
    /// Date the filing was submitted.
    pub filing_date: NaiveDate,
    /// End of the period the report covers.
    pub period_end_date: NaiveDate,
    /// Owning company.
    pub company_id: Ticker,
    /// Link to the primary document.
    pub url: Option<String>,
    /// Whether this filing amends an earlier one.
    pub is_amended: bool,
    /// Whether metrics have been extracted for this filing.
    pub is_processed: bool,
    /// When metrics were extracted.
    pub processed_date: Option<DateTime<Utc>>,
    /// Upstream record this filing was built from.
    #[serde(default)]
    pub raw_data: serde_json::Value,
}

impl Filing {
    /// Creates an unprocessed filing.
    #[must_use]
    pub fn new(
        accession_number: impl Into<String>,
        form_type: FormType,
        filing_date: NaiveDate,
        period_end_date: NaiveDate,
        company_id: Ticker,
    ) -> Self {
        Self {
            accession_number: accession_number.into(),
            form_type,
            filing_date,
            period_end_date,
            company_id,
            url: None,
            is_amended: form_type.is_amended(),
            is_processed: false,
            processed_date: None,
            raw_data: serde_json::Value::Null,
        }
    }

    /// Fiscal year of the covered period.
    #[must_use]
    pub fn fiscal_year(&self) -> i32 {
        self.period_end_date.year()
    }

    /// Calendar quarter of the period end, for quarterly reports only.
    #[must_use]
    pub fn fiscal_quarter(&self) -> Option<u32> {
        self.form_type
            .is_quarterly()
            .then(|| quarter_of(self.period_end_date))
    }

    /// Marks the filing as processed at the given time.
    pub fn mark_processed(&mut self, at: DateTime<Utc>) {
        self.is_processed = true;
        self.processed_date = Some(at);
    }
}

/// Composite primary key of a [`FinancialMetric`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MetricKey {
    /// Owning company.
    pub company_id: Ticker,
    /// Canonical metric.
    pub name: MetricName,
    /// Reporting period.
    pub period: MetricPeriod,
    /// Period-end date.
    pub date: NaiveDate,
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}",
            self.company_id, self.name, self.period, self.date
        )
    }
}

/// One normalized financial observation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FinancialMetric {
    /// Canonical metric.
    pub name: MetricName,
    /// Reported value.
    pub value: f64,
    /// Period-end date the value pertains to.
    pub date: NaiveDate,
    /// Reporting period.
    pub period: MetricPeriod,
    /// Unit of the value.
    pub unit: String,
    /// Accession number of the filing that reported the value.
    pub filing_id: Option<String>,
    /// Owning company.
    pub company_id: Ticker,
    /// Upstream tag the value was read from.
    pub source_tag: Option<String>,
    /// Upstream context reference.
    pub source_context_id: Option<String>,
    /// Whether the value was computed rather than extracted.
    pub is_derived: bool,
}

impl FinancialMetric {
    /// Creates an extracted metric denominated in USD.
    #[must_use]
    pub fn new(
        company_id: Ticker,
        name: MetricName,
        period: MetricPeriod,
        date: NaiveDate,
        value: f64,
    ) -> Self {
        Self {
            name,
            value,
            date,
            period,
            unit: "USD".to_string(),
            filing_id: None,
            company_id,
            source_tag: None,
            source_context_id: None,
            is_derived: false,
        }
    }

    /// Returns the composite key identifying this observation.
    #[must_use]
    pub fn key(&self) -> MetricKey {
        MetricKey {
            company_id: self.company_id.clone(),
            name: self.name,
            period: self.period,
            date: self.date,
        }
    }

    /// Fiscal year of the observation.
    #[must_use]
    pub fn fiscal_year(&self) -> i32 {
        self.date.year()
    }

    /// Calendar quarter of the observation, for quarterly metrics only.
    #[must_use]
    pub fn fiscal_quarter(&self) -> Option<u32> {
        (self.period == MetricPeriod::Quarterly).then(|| quarter_of(self.date))
    }
}

fn quarter_of(date: NaiveDate) -> u32 {
    (date.month() - 1) / 3 + 1
}
