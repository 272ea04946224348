//! Normalization of raw EDGAR payloads into typed entities.
//!
//! Every upstream payload shape is handled here and nowhere else:
//!
//! - ticker directory (legacy flat dictionary, `{data: [...]}` records, `{fields, data}` tables)
//! - submission histories (parallel `filings.recent` arrays)
//! - company facts and single concepts (taxonomy → tag → units → observations)
//!
//! Bad records are logged and skipped; they never abort the rest of a payload.

use chrono::{NaiveDate, Utc};
use filings_core::{
    Cik, FilingsError, Filing, FinancialMetric, FormType, MetricKey, MetricName, MetricPeriod,
    Ticker,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::tags;

/// Unit buckets tried, in order, for each tag.
const UNIT_PREFERENCE: [&str; 3] = ["USD", "USD/shares", "pure"];

/// Archive URL prefix for primary documents.
const ARCHIVES_URL: &str = "https://www.sec.gov/Archives/edgar/data";

/// One ticker directory record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectoryEntry {
    /// Normalized CIK.
    pub cik: Cik,
    /// Uppercased ticker.
    pub ticker: Ticker,
    /// Registered company name; empty when the upstream listing has none.
    pub name: String,
    /// Listing exchange, when the directory reports one.
    pub exchange: Option<String>,
}

/// Company-level fields of a submissions payload.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompanyProfile {
    /// Registered name.
    pub name: Option<String>,
    /// Standard Industrial Classification description.
    pub sic_description: Option<String>,
    /// Exchanges the company's securities list on.
    pub exchanges: Vec<String>,
    /// Tickers the company's securities trade under.
    pub tickers: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileFields {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    sic_description: Option<String>,
    #[serde(default)]
    exchanges: Vec<Value>,
    #[serde(default)]
    tickers: Vec<Value>,
}

/// Parallel columns; cells are kept as raw values so one bad cell only skips its row.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecentFilings {
    accession_number: Vec<Value>,
    form: Vec<Value>,
    filing_date: Vec<Value>,
    #[serde(default)]
    report_date: Vec<Value>,
    #[serde(default)]
    primary_document: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Observation {
    #[serde(default)]
    end: Option<String>,
    #[serde(default)]
    val: Option<f64>,
    #[serde(default)]
    accn: Option<String>,
    #[serde(default)]
    fp: Option<String>,
    #[serde(default)]
    frame: Option<String>,
}

/// Maps raw upstream payloads to entities.
///
/// Filings dated after the reference date are dropped. The reference date is
/// today unless pinned with [`Normalizer::as_of`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Normalizer {
    as_of: Option<NaiveDate>,
}

impl Normalizer {
    /// Creates a normalizer that compares against the current date at call time.
    #[must_use]
    pub const fn new() -> Self {
        Self { as_of: None }
    }

    /// Creates a normalizer with a fixed reference date.
    #[must_use]
    pub const fn as_of(date: NaiveDate) -> Self {
        Self { as_of: Some(date) }
    }

    /// Reference date used for the future-filing check.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| Utc::now().date_naive())
    }

    /// Extracts every usable record from a ticker directory payload.
    pub fn extract_directory(&self, raw: &Value) -> Vec<DirectoryEntry> {
        let entries = match raw {
            Value::Object(obj) => match (obj.get("fields"), obj.get("data")) {
                (Some(Value::Array(fields)), Some(Value::Array(rows))) => table_entries(fields, rows),
                (_, Some(Value::Array(records))) => records.iter().filter_map(record_entry).collect(),
                _ => obj.values().filter_map(record_entry).collect(),
            },
            Value::Array(records) => records.iter().filter_map(record_entry).collect(),
            _ => {
                warn!("Ticker directory payload is neither an object nor an array");
                Vec::new()
            }
        };
        debug!(count = entries.len(), "Extracted directory entries");
        entries
    }

    /// Reads company-level fields from a submissions payload.
    pub fn extract_profile(&self, raw: &Value) -> CompanyProfile {
        match ProfileFields::deserialize(raw) {
            Ok(fields) => CompanyProfile {
                name: fields.name.filter(|n| !n.trim().is_empty()),
                sic_description: fields.sic_description.filter(|s| !s.trim().is_empty()),
                exchanges: strings(&fields.exchanges),
                tickers: strings(&fields.tickers),
            },
            Err(e) => {
                warn!(error = %e, "Unexpected submissions profile shape");
                CompanyProfile::default()
            }
        }
    }

    /// Extracts periodic-report filings from a submissions payload.
    ///
    /// Only allow-listed forms are kept. Filings dated after the reference date are
    /// dropped; records with malformed dates are skipped with a warning.
    pub fn extract_filings(&self, company: &Ticker, raw: &Value) -> Vec<Filing> {
        let Some(recent_value) = raw.pointer("/filings/recent") else {
            warn!(ticker = %company, "Submissions payload has no recent filings");
            return Vec::new();
        };
        let Some(recent_raw) = recent_value.as_object() else {
            warn!(ticker = %company, "Recent filings are not an object");
            return Vec::new();
        };
        let recent = match RecentFilings::deserialize(recent_value) {
            Ok(recent) => recent,
            Err(e) => {
                let err = FilingsError::MalformedData(e.to_string());
                warn!(ticker = %company, error = %err, "Skipping submissions payload");
                return Vec::new();
            }
        };
        let cik = raw.get("cik").and_then(cik_from_value);
        let today = self.today();

        let mut filings = Vec::new();
        for i in 0..recent.accession_number.len() {
            let Some(form) = cell(&recent.form, i).and_then(FormType::parse) else {
                continue;
            };
            let Some(accn) = cell(&recent.accession_number, i) else {
                warn!(ticker = %company, index = i, "Filing without accession number");
                continue;
            };
            let Some(filing_date) = cell(&recent.filing_date, i).and_then(parse_date) else {
                warn!(ticker = %company, accession = accn, "Malformed filing date, skipping");
                continue;
            };
            if filing_date > today {
                debug!(ticker = %company, accession = accn, %filing_date, "Dropping future-dated filing");
                continue;
            }
            let Some(period_end) = cell(&recent.report_date, i).and_then(parse_date) else {
                warn!(ticker = %company, accession = accn, "Missing or malformed report date, skipping");
                continue;
            };

            let mut filing = Filing::new(accn, form, filing_date, period_end, company.clone());
            filing.url = match (&cik, cell(&recent.primary_document, i)) {
                (Some(cik), Some(doc)) => Some(format!(
                    "{ARCHIVES_URL}/{}/{}/{doc}",
                    cik.as_number(),
                    accn.replace('-', "")
                )),
                _ => None,
            };
            filing.raw_data = raw_record(recent_raw, i);
            filings.push(filing);
        }

        debug!(ticker = %company, count = filings.len(), "Extracted filings");
        filings
    }

    /// Extracts canonical metrics from a company facts payload.
    ///
    /// For each metric the first alias present under `us-gaap` is used.
    pub fn extract_metrics(&self, company: &Ticker, raw: &Value) -> Vec<FinancialMetric> {
        let Some(gaap) = raw.pointer("/facts/us-gaap").and_then(Value::as_object) else {
            warn!(ticker = %company, "No US GAAP facts found");
            return Vec::new();
        };

        let mut collected = MetricCollector::default();
        for name in MetricName::ALL {
            let found = tags::aliases(name)
                .iter()
                .find_map(|tag| gaap.get(*tag).map(|data| (*tag, data)));
            if let Some((tag, data)) = found {
                extract_tag(company, name, tag, data, &mut collected);
            }
        }

        let metrics = collected.finish();
        debug!(ticker = %company, count = metrics.len(), "Extracted metrics");
        metrics
    }

    /// Extracts metrics from a single-concept payload.
    pub fn extract_concept(
        &self,
        company: &Ticker,
        metric: MetricName,
        raw: &Value,
    ) -> Vec<FinancialMetric> {
        let tag = raw
            .get("tag")
            .and_then(Value::as_str)
            .or_else(|| tags::aliases(metric).first().copied())
            .unwrap_or_default();
        let mut collected = MetricCollector::default();
        extract_tag(company, metric, tag, raw, &mut collected);
        collected.finish()
    }
}

/// Metrics in first-seen order; a repeated key replaces the earlier value in place.
#[derive(Default)]
struct MetricCollector {
    metrics: Vec<FinancialMetric>,
    index: HashMap<MetricKey, usize>,
}

impl MetricCollector {
    fn push(&mut self, metric: FinancialMetric) {
        match self.index.get(&metric.key()) {
            Some(&i) => self.metrics[i] = metric,
            None => {
                self.index.insert(metric.key(), self.metrics.len());
                self.metrics.push(metric);
            }
        }
    }

    fn finish(self) -> Vec<FinancialMetric> {
        self.metrics
    }
}

fn extract_tag(
    company: &Ticker,
    name: MetricName,
    tag: &str,
    data: &Value,
    out: &mut MetricCollector,
) {
    let units = data.get("units").and_then(Value::as_object);
    let bucket = units.and_then(|units| {
        UNIT_PREFERENCE
            .iter()
            .find_map(|unit| units.get(*unit).and_then(Value::as_array).map(|obs| (*unit, obs)))
    });
    let Some((unit, observations)) = bucket else {
        warn!(ticker = %company, metric = %name, tag, "No supported units found");
        return;
    };

    for raw in observations {
        let obs = match Observation::deserialize(raw) {
            Ok(obs) => obs,
            Err(e) => {
                warn!(ticker = %company, tag, error = %e, "Skipping malformed observation");
                continue;
            }
        };
        let (Some(value), Some(end)) = (obs.val, obs.end.as_deref()) else {
            continue;
        };
        let Some(date) = parse_date(end) else {
            warn!(ticker = %company, tag, end, "Skipping observation with malformed end date");
            continue;
        };

        let period = classify_period(obs.frame.as_deref(), obs.fp.as_deref());
        let mut metric = FinancialMetric::new(company.clone(), name, period, date, value);
        metric.unit = unit.to_string();
        metric.source_tag = Some(tag.to_string());
        metric.filing_id = obs.accn.clone();
        metric.source_context_id = obs.accn;
        out.push(metric);
    }
}

/// Classifies an observation as annual or quarterly.
///
/// A frame marker decides first (`Q` before `Y`, since calendar frames such as
/// `CY2023Q1` contain both), then the fiscal period code; annual otherwise.
fn classify_period(frame: Option<&str>, fp: Option<&str>) -> MetricPeriod {
    if let Some(frame) = frame {
        if frame.contains('Q') {
            return MetricPeriod::Quarterly;
        }
        if frame.contains('Y') {
            return MetricPeriod::Annual;
        }
    }
    match fp {
        Some("FY") => MetricPeriod::Annual,
        Some("Q1" | "Q2" | "Q3" | "Q4") => MetricPeriod::Quarterly,
        _ => MetricPeriod::Annual,
    }
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

fn cell(column: &[Value], i: usize) -> Option<&str> {
    column
        .get(i)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn strings(values: &[Value]) -> Vec<String> {
    values
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn raw_record(recent: &Map<String, Value>, i: usize) -> Value {
    let record: Map<String, Value> = recent
        .iter()
        .filter_map(|(field, column)| {
            column
                .as_array()
                .and_then(|values| values.get(i))
                .map(|v| (field.clone(), v.clone()))
        })
        .collect();
    Value::Object(record)
}

fn cik_from_value(value: &Value) -> Option<Cik> {
    match value {
        Value::Number(n) => n.as_u64().map(Cik::from_number),
        Value::String(s) => Cik::parse(s).ok(),
        _ => None,
    }
}

fn text(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

fn record_entry(record: &Value) -> Option<DirectoryEntry> {
    let obj = record.as_object()?;
    let cik = obj
        .get("cik_str")
        .or_else(|| obj.get("cik"))
        .and_then(cik_from_value);
    let ticker = text(obj.get("ticker"));
    let (Some(cik), Some(ticker)) = (cik, ticker) else {
        warn!(record = %record, "Directory record without usable CIK or ticker");
        return None;
    };
    Some(DirectoryEntry {
        cik,
        ticker: Ticker::new(ticker),
        name: text(obj.get("title").or_else(|| obj.get("name"))).unwrap_or_default(),
        exchange: text(obj.get("exchange")),
    })
}

fn table_entries(fields: &[Value], rows: &[Value]) -> Vec<DirectoryEntry> {
    let column = |name: &str| fields.iter().position(|f| f.as_str() == Some(name));
    let (cik_col, ticker_col) = match (column("cik"), column("ticker")) {
        (Some(c), Some(t)) => (c, t),
        _ => {
            warn!("Directory table lacks cik or ticker column");
            return Vec::new();
        }
    };
    let name_col = column("name").or_else(|| column("title"));
    let exchange_col = column("exchange");

    rows.iter()
        .filter_map(|row| {
            let row = row.as_array()?;
            let cik = row.get(cik_col).and_then(cik_from_value);
            let ticker = text(row.get(ticker_col));
            let (Some(cik), Some(ticker)) = (cik, ticker) else {
                warn!("Directory row without usable CIK or ticker");
                return None;
            };
            Some(DirectoryEntry {
                cik,
                ticker: Ticker::new(ticker),
                name: text(name_col.and_then(|c| row.get(c))).unwrap_or_default(),
                exchange: text(exchange_col.and_then(|c| row.get(c))),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn facts(us_gaap: Value) -> Value {
        json!({"cik": 320193, "entityName": "Apple Inc.", "facts": {"us-gaap": us_gaap}})
    }

    fn usd(observations: Value) -> Value {
        json!({"label": "x", "units": {"USD": observations}})
    }

    #[test]
    fn test_directory_flat_dictionary() {
        let raw = json!({
            "0": {"cik_str": 320193, "ticker": "aapl", "title": "Apple Inc."},
            "1": {"cik_str": 789019, "ticker": "MSFT", "title": "MICROSOFT CORP"}
        });
        let entries = Normalizer::new().extract_directory(&raw);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].cik.as_str(), "0000320193");
        assert_eq!(entries[0].ticker.as_str(), "AAPL");
        assert_eq!(entries[0].name, "Apple Inc.");
        assert_eq!(entries[0].exchange, None);
    }

    #[test]
    fn test_directory_structured_shapes() {
        let records = json!({"data": [
            {"cik": "320193", "ticker": "AAPL", "name": "Apple Inc.", "exchange": "Nasdaq"},
            {"cik": null, "ticker": "BAD"}
        ]});
        let entries = Normalizer::new().extract_directory(&records);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].exchange.as_deref(), Some("Nasdaq"));

        let table = json!({
            "fields": ["cik", "name", "ticker", "exchange"],
            "data": [[789019, "MICROSOFT CORP", "MSFT", "Nasdaq"], [1067983, "BERKSHIRE HATHAWAY INC", "BRK-B", "NYSE"]]
        });
        let entries = Normalizer::new().extract_directory(&table);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].cik, Cik::from_number(1_067_983));
        assert_eq!(entries[1].ticker.as_str(), "BRK-B");
        assert_eq!(entries[1].name, "BERKSHIRE HATHAWAY INC");
    }

    #[test]
    fn test_directory_rejects_scalar_payload() {
        assert!(Normalizer::new().extract_directory(&json!("nope")).is_empty());
        assert!(Normalizer::new().extract_directory(&json!({})).is_empty());
    }

    #[test]
    fn test_filings_allow_list_and_future_dates() {
        let raw = json!({
            "cik": "0000320193",
            "name": "Apple Inc.",
            "filings": {"recent": {
                "accessionNumber": ["0000320193-23-000106", "0000320193-23-000077", "0000320193-23-000099", "0000320193-30-000001"],
                "form": ["10-K", "10-Q", "8-K", "10-Q"],
                "filingDate": ["2023-11-03", "2023-08-04", "2023-08-01", "2030-01-31"],
                "reportDate": ["2023-09-30", "2023-07-01", "", "2029-12-28"],
                "primaryDocument": ["aapl-20230930.htm", "aapl-20230701.htm", "x.htm", "future.htm"]
            }}
        });
        let filings = Normalizer::as_of(date(2024, 1, 1)).extract_filings(&"AAPL".into(), &raw);
        assert_eq!(filings.len(), 2);

        let annual = &filings[0];
        assert_eq!(annual.form_type, FormType::TenK);
        assert_eq!(annual.period_end_date, date(2023, 9, 30));
        assert_eq!(
            annual.url.as_deref(),
            Some("https://www.sec.gov/Archives/edgar/data/320193/000032019323000106/aapl-20230930.htm")
        );
        assert_eq!(annual.raw_data["form"], "10-K");
        assert_eq!(annual.raw_data["filingDate"], "2023-11-03");
        assert!(!annual.is_processed);
    }

    #[test]
    fn test_filings_skip_malformed_dates() {
        let raw = json!({"filings": {"recent": {
            "accessionNumber": ["a-1", "a-2", "a-3"],
            "form": ["10-K", "10-K/A", "10-Q"],
            "filingDate": ["2023-13-45", "2023-02-01", "2023-05-05"],
            "reportDate": ["2022-12-31", "2022-12-31", null]
        }}});
        let filings = Normalizer::as_of(date(2024, 1, 1)).extract_filings(&"XYZ".into(), &raw);
        assert_eq!(filings.len(), 1);
        assert_eq!(filings[0].accession_number, "a-2");
        assert!(filings[0].is_amended);
        assert_eq!(filings[0].url, None);
    }

    #[test]
    fn test_filings_bad_cell_skips_only_its_row() {
        let raw = json!({"filings": {"recent": {
            "accessionNumber": ["a-1", "a-2", 42],
            "form": ["10-K", "10-Q", "10-Q"],
            "filingDate": ["2023-02-01", "2023-05-05", "2023-08-04"],
            "reportDate": ["2022-12-31", 20230331, "2023-06-30"],
            "primaryDocument": [null, {"name": "x.htm"}, "y.htm"]
        }}});
        let filings = Normalizer::as_of(date(2024, 1, 1)).extract_filings(&"XYZ".into(), &raw);
        assert_eq!(filings.len(), 1);
        assert_eq!(filings[0].accession_number, "a-1");
        assert_eq!(filings[0].period_end_date, date(2022, 12, 31));
    }

    #[test]
    fn test_filings_missing_recent_is_empty() {
        let filings = Normalizer::new().extract_filings(&"XYZ".into(), &json!({}));
        assert!(filings.is_empty());
    }

    #[test]
    fn test_metric_alias_fallback() {
        let raw = facts(json!({
            "SalesRevenueNet": usd(json!([{"end": "2012-09-29", "val": 156508000000.0, "fp": "FY", "accn": "a-1"}]))
        }));
        let metrics = Normalizer::new().extract_metrics(&"AAPL".into(), &raw);
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].name, MetricName::Revenue);
        assert_eq!(metrics[0].source_tag.as_deref(), Some("SalesRevenueNet"));
        assert_eq!(metrics[0].filing_id.as_deref(), Some("a-1"));
        assert_eq!(metrics[0].source_context_id.as_deref(), Some("a-1"));
    }

    #[test]
    fn test_metric_first_alias_wins() {
        let raw = facts(json!({
            "Revenue": usd(json!([{"end": "2023-09-30", "val": 1.0, "fp": "FY"}])),
            "SalesRevenueNet": usd(json!([{"end": "2023-09-30", "val": 2.0, "fp": "FY"}]))
        }));
        let metrics = Normalizer::new().extract_metrics(&"AAPL".into(), &raw);
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].source_tag.as_deref(), Some("Revenue"));
        assert_eq!(metrics[0].value, 1.0);
    }

    #[test]
    fn test_period_classification() {
        assert_eq!(classify_period(Some("CY2023Q1"), Some("FY")), MetricPeriod::Quarterly);
        assert_eq!(classify_period(Some("CY2023"), Some("Q2")), MetricPeriod::Annual);
        assert_eq!(classify_period(Some("CY2023Q4I"), None), MetricPeriod::Quarterly);
        assert_eq!(classify_period(None, Some("Q3")), MetricPeriod::Quarterly);
        assert_eq!(classify_period(None, Some("FY")), MetricPeriod::Annual);
        assert_eq!(classify_period(None, None), MetricPeriod::Annual);
    }

    #[test]
    fn test_observations_skip_missing_fields_and_collapse_duplicates() {
        let raw = facts(json!({
            "NetIncomeLoss": usd(json!([
                {"end": "2023-09-30", "val": 90.0, "fp": "FY", "accn": "a-1"},
                {"end": "2023-09-30", "fp": "FY"},
                {"val": 5.0, "fp": "FY"},
                {"end": "2023-07-01", "val": 20.0, "fp": "Q3"},
                {"end": "2023-09-30", "val": 97.0, "fp": "FY", "accn": "a-2"}
            ]))
        }));
        let metrics = Normalizer::new().extract_metrics(&"AAPL".into(), &raw);
        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].value, 97.0);
        assert_eq!(metrics[0].filing_id.as_deref(), Some("a-2"));
        assert_eq!(metrics[1].period, MetricPeriod::Quarterly);
    }

    #[test]
    fn test_unit_preference() {
        let raw = facts(json!({
            "EarningsPerShareBasic": {"units": {
                "pure": [{"end": "2023-09-30", "val": 9.9, "fp": "FY"}],
                "USD/shares": [{"end": "2023-09-30", "val": 6.16, "fp": "FY"}]
            }},
            "Goodwill": {"units": {"pure": [{"end": "2023-09-30", "val": 3.0, "fp": "FY"}]}},
            "Assets": {"units": {"shares": [{"end": "2023-09-30", "val": 1.0}]}}
        }));
        let metrics = Normalizer::new().extract_metrics(&"AAPL".into(), &raw);
        assert_eq!(metrics.len(), 2);

        let eps = metrics.iter().find(|m| m.name == MetricName::Eps).unwrap();
        assert_eq!(eps.value, 6.16);
        assert_eq!(eps.unit, "USD/shares");
        let goodwill = metrics.iter().find(|m| m.name == MetricName::Goodwill).unwrap();
        assert_eq!(goodwill.unit, "pure");
    }

    #[test]
    fn test_missing_facts_is_empty() {
        assert!(Normalizer::new().extract_metrics(&"AAPL".into(), &json!({})).is_empty());
    }

    #[test]
    fn test_extract_concept() {
        let raw = json!({
            "cik": 320193,
            "taxonomy": "us-gaap",
            "tag": "Assets",
            "units": {"USD": [
                {"end": "2023-09-30", "val": 352583000000.0, "fp": "FY", "frame": "CY2023Q3I", "accn": "a-9"}
            ]}
        });
        let metrics = Normalizer::new().extract_concept(&"AAPL".into(), MetricName::TotalAssets, &raw);
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].name, MetricName::TotalAssets);
        assert_eq!(metrics[0].period, MetricPeriod::Quarterly);
        assert_eq!(metrics[0].source_tag.as_deref(), Some("Assets"));
    }

    #[test]
    fn test_extract_profile() {
        let raw = json!({
            "name": "Apple Inc.",
            "sicDescription": "Electronic Computers",
            "exchanges": ["Nasdaq"],
            "tickers": ["AAPL"]
        });
        let profile = Normalizer::new().extract_profile(&raw);
        assert_eq!(profile.name.as_deref(), Some("Apple Inc."));
        assert_eq!(profile.sic_description.as_deref(), Some("Electronic Computers"));
        assert_eq!(profile.exchanges, vec!["Nasdaq".to_string()]);
        assert_eq!(Normalizer::new().extract_profile(&json!({})), CompanyProfile::default());

        let mixed = Normalizer::new().extract_profile(&json!({"exchanges": ["NYSE", 7, null, ""]}));
        assert_eq!(mixed.exchanges, vec!["NYSE".to_string()]);
    }
}
