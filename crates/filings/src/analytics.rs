//! Fundamental analytics over stored metrics.
//!
//! The pure calculations ([`growth_rates`], [`cagr`], [`ratios`]) work on plain
//! series and can be used without a store. [`Analytics`] reads series from an
//! [`EntityStore`] and applies them.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use polars::prelude::*;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use filings_core::{
    EntityStore, FilingsError, FinancialMetric, MetricName, MetricPeriod, Result, Ticker,
};

/// Span used for the CAGR in company comparisons.
pub const COMPARISON_CAGR_YEARS: usize = 5;

/// A dated metric series for one company, ordered by date ascending.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TimeSeries {
    /// Company the series belongs to.
    pub ticker: Ticker,
    /// Metric.
    pub metric: MetricName,
    /// Reporting period.
    pub period: MetricPeriod,
    /// `(period end, value)` points.
    pub points: Vec<(NaiveDate, f64)>,
}

impl TimeSeries {
    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns true if the series has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Most recent point.
    #[must_use]
    pub fn latest(&self) -> Option<(NaiveDate, f64)> {
        self.points.last().copied()
    }

    /// Converts the series to a `date`/`value` DataFrame.
    ///
    /// # Errors
    /// Returns [`FilingsError::Parse`] if the frame cannot be built.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let dates: Vec<String> = self.points.iter().map(|(d, _)| d.to_string()).collect();
        let values: Vec<f64> = self.points.iter().map(|(_, v)| *v).collect();

        let df = DataFrame::new(vec![
            Column::new("date".into(), dates),
            Column::new("value".into(), values),
        ])
        .map_err(|e| FilingsError::Parse(e.to_string()))?;

        df.lazy()
            .with_column(col("date").cast(DataType::Date))
            .collect()
            .map_err(|e| FilingsError::Parse(e.to_string()))
    }
}

/// Period-over-period growth for each consecutive pair of points.
///
/// Each rate is dated at the later point. A change from zero is `+inf` when the new
/// value is positive and `-inf` otherwise. Fewer than two points give no rates.
#[must_use]
pub fn growth_rates(series: &[(NaiveDate, f64)]) -> Vec<(NaiveDate, f64)> {
    series
        .windows(2)
        .map(|pair| {
            let (_, previous) = pair[0];
            let (date, current) = pair[1];
            let rate = if previous == 0.0 {
                if current > 0.0 {
                    f64::INFINITY
                } else {
                    f64::NEG_INFINITY
                }
            } else {
                (current - previous) / previous.abs()
            };
            (date, rate)
        })
        .collect()
}

/// Compound annual growth rate over the last `years` steps of an annual series.
///
/// The span is counted in points, not calendar time; a series shorter than
/// `years + 1` points uses its full length. Returns `None` for fewer than two points,
/// a zero span, or a non-positive start or end value.
#[must_use]
pub fn cagr(series: &[(NaiveDate, f64)], years: usize) -> Option<f64> {
    let n = series.len();
    if n < 2 || years == 0 {
        return None;
    }
    let (start, span) = if n <= years {
        (0, n - 1)
    } else {
        (n - years - 1, years)
    };
    let start_value = series[start].1;
    let end_value = series[n - 1].1;
    if start_value <= 0.0 || end_value <= 0.0 {
        return None;
    }
    Some((end_value / start_value).powf(1.0 / span as f64) - 1.0)
}

/// Standard ratios from a company's latest annual values.
///
/// A ratio is `None` when an input is missing or its denominator is zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct FinancialRatios {
    /// Net income over total assets.
    pub roa: Option<f64>,
    /// Net income over stockholders' equity.
    pub roe: Option<f64>,
    /// Total liabilities over stockholders' equity.
    pub debt_to_equity: Option<f64>,
    /// Net income over revenue.
    pub profit_margin: Option<f64>,
}

/// Computes ratios from the latest value of each metric.
#[must_use]
pub fn ratios(latest: &BTreeMap<MetricName, f64>) -> FinancialRatios {
    let divide = |num: MetricName, den: MetricName| {
        let numerator = latest.get(&num)?;
        let denominator = latest.get(&den)?;
        (*denominator != 0.0).then(|| numerator / denominator)
    };
    FinancialRatios {
        roa: divide(MetricName::NetIncome, MetricName::TotalAssets),
        roe: divide(MetricName::NetIncome, MetricName::StockholdersEquity),
        debt_to_equity: divide(MetricName::TotalLiabilities, MetricName::StockholdersEquity),
        profit_margin: divide(MetricName::NetIncome, MetricName::Revenue),
    }
}

/// One company's entry in a comparison.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Comparison {
    /// Company name.
    pub company_name: String,
    /// Most recent value.
    pub latest_value: f64,
    /// Date of the most recent value.
    pub latest_date: NaiveDate,
    /// Growth between the last two points; `None` with fewer than two points or a
    /// zero previous value.
    pub growth_rate: Option<f64>,
    /// CAGR over the last [`COMPARISON_CAGR_YEARS`] years.
    pub cagr: Option<f64>,
    /// Full annual series.
    pub series: Vec<(NaiveDate, f64)>,
}

/// Distribution of the latest annual values across a sector.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SectorSummary {
    /// Arithmetic mean.
    pub mean: f64,
    /// Median.
    pub median: f64,
    /// Smallest value.
    pub min: f64,
    /// Largest value.
    pub max: f64,
    /// Population standard deviation.
    pub std: f64,
    /// Number of companies that reported the metric.
    pub count: usize,
}

impl SectorSummary {
    /// Summarizes a set of values. Returns `None` if empty.
    #[must_use]
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let median = if count % 2 == 0 {
            (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
        } else {
            sorted[count / 2]
        };
        let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;

        Some(Self {
            mean,
            median,
            min: sorted[0],
            max: sorted[count - 1],
            std: variance.sqrt(),
            count,
        })
    }
}

/// Read-only analytics over an [`EntityStore`].
#[derive(Debug, Clone)]
pub struct Analytics {
    store: Arc<dyn EntityStore>,
}

impl Analytics {
    /// Creates analytics over a store.
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Loads a metric series for a company.
    ///
    /// # Errors
    /// Returns [`FilingsError::NotFound`] if the company is not in the store.
    #[instrument(skip(self), fields(ticker = %ticker))]
    pub async fn time_series(
        &self,
        ticker: &Ticker,
        metric: MetricName,
        period: MetricPeriod,
    ) -> Result<TimeSeries> {
        if self.store.company(ticker).await?.is_none() {
            return Err(FilingsError::NotFound(format!("Company {ticker}")));
        }
        let points = self
            .store
            .metrics_for(ticker, Some(metric), Some(period))
            .await?
            .into_iter()
            .map(|m| (m.date, m.value))
            .collect();
        Ok(TimeSeries {
            ticker: ticker.clone(),
            metric,
            period,
            points,
        })
    }

    /// Ratios from the company's latest annual metrics.
    ///
    /// # Errors
    /// Returns [`FilingsError::NotFound`] if the company is not in the store.
    #[instrument(skip(self), fields(ticker = %ticker))]
    pub async fn ratios_for(&self, ticker: &Ticker) -> Result<FinancialRatios> {
        if self.store.company(ticker).await?.is_none() {
            return Err(FilingsError::NotFound(format!("Company {ticker}")));
        }
        let annual = self
            .store
            .metrics_for(ticker, None, Some(MetricPeriod::Annual))
            .await?;
        Ok(ratios(&latest_by_name(&annual)))
    }

    /// Compares companies on one annual metric.
    ///
    /// Unknown companies and companies without data for the metric are left out.
    #[instrument(skip(self, tickers), fields(count = tickers.len()))]
    pub async fn compare(
        &self,
        tickers: &[Ticker],
        metric: MetricName,
    ) -> Result<BTreeMap<Ticker, Comparison>> {
        let mut results = BTreeMap::new();
        for ticker in tickers {
            let Some(company) = self.store.company(ticker).await? else {
                warn!(ticker = %ticker, "Company not found, leaving out of comparison");
                continue;
            };
            let series = self
                .time_series(ticker, metric, MetricPeriod::Annual)
                .await?;
            let Some((latest_date, latest_value)) = series.latest() else {
                debug!(ticker = %ticker, %metric, "No data, leaving out of comparison");
                continue;
            };

            let growth_rate = growth_rates(&series.points)
                .last()
                .map(|(_, rate)| *rate)
                .filter(|rate| rate.is_finite());
            results.insert(
                ticker.clone(),
                Comparison {
                    company_name: company.name,
                    latest_value,
                    latest_date,
                    growth_rate,
                    cagr: cagr(&series.points, COMPARISON_CAGR_YEARS),
                    series: series.points,
                },
            );
        }
        Ok(results)
    }

    /// Summarizes the latest annual value of a metric across a sector.
    ///
    /// Returns `None` if no company in the sector reports the metric.
    #[instrument(skip(self))]
    pub async fn sector_averages(
        &self,
        sector: &str,
        metric: MetricName,
    ) -> Result<Option<SectorSummary>> {
        let companies = self.store.companies_in_sector(sector).await?;
        if companies.is_empty() {
            warn!(sector, "No companies in sector");
            return Ok(None);
        }

        let mut values = Vec::with_capacity(companies.len());
        for company in &companies {
            let series = self
                .store
                .metrics_for(&company.ticker, Some(metric), Some(MetricPeriod::Annual))
                .await?;
            if let Some(latest) = series.iter().max_by_key(|m| m.date) {
                values.push(latest.value);
            }
        }
        Ok(SectorSummary::from_values(&values))
    }
}

fn latest_by_name(metrics: &[FinancialMetric]) -> BTreeMap<MetricName, f64> {
    let mut latest: BTreeMap<MetricName, (NaiveDate, f64)> = BTreeMap::new();
    for m in metrics {
        let newer = latest.get(&m.name).is_none_or(|(date, _)| m.date > *date);
        if newer {
            latest.insert(m.name, (m.date, m.value));
        }
    }
    latest.into_iter().map(|(name, (_, v))| (name, v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use filings_core::{Cik, Company};
    use filings_store::InMemoryStore;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn yearly(values: &[f64]) -> Vec<(NaiveDate, f64)> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| (date(2018 + i as i32, 12, 31), *v))
            .collect()
    }

    async fn seeded_store() -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        for (ticker, name, cik, sector) in [
            ("AAPL", "Apple Inc.", 320_193, "Technology"),
            ("MSFT", "Microsoft Corp", 789_019, "Technology"),
            ("XOM", "Exxon Mobil", 34_088, "Energy"),
        ] {
            let company = Company::new(ticker.into(), name, Cik::from_number(cik)).with_sector(sector);
            store.create_company(&company).await.unwrap();
        }
        for (ticker, name, d, v) in [
            ("AAPL", MetricName::Revenue, date(2021, 9, 25), 100.0),
            ("AAPL", MetricName::Revenue, date(2022, 9, 24), 120.0),
            ("AAPL", MetricName::NetIncome, date(2021, 9, 25), 10.0),
            ("AAPL", MetricName::NetIncome, date(2022, 9, 24), 30.0),
            ("AAPL", MetricName::TotalAssets, date(2022, 9, 24), 300.0),
            ("AAPL", MetricName::TotalLiabilities, date(2022, 9, 24), 200.0),
            ("AAPL", MetricName::StockholdersEquity, date(2022, 9, 24), 100.0),
            ("MSFT", MetricName::Revenue, date(2022, 6, 30), 200.0),
        ] {
            let metric =
                FinancialMetric::new(ticker.into(), name, MetricPeriod::Annual, d, v);
            store.create_metric(&metric).await.unwrap();
        }
        store
    }

    #[test]
    fn test_growth_rates() {
        let rates = growth_rates(&yearly(&[100.0, 150.0, 0.0]));
        let values: Vec<f64> = rates.iter().map(|(_, r)| *r).collect();
        assert_eq!(values, vec![0.5, -1.0]);
        assert_eq!(rates[0].0, date(2019, 12, 31));

        let from_zero = growth_rates(&yearly(&[0.0, 10.0]));
        assert_eq!(from_zero[0].1, f64::INFINITY);
        let zero_to_negative = growth_rates(&yearly(&[0.0, -5.0]));
        assert_eq!(zero_to_negative[0].1, f64::NEG_INFINITY);

        assert!(growth_rates(&yearly(&[1.0])).is_empty());
    }

    #[test]
    fn test_growth_from_negative_base() {
        let rates = growth_rates(&yearly(&[-100.0, -50.0]));
        assert!((rates[0].1 - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_cagr() {
        let series = yearly(&[100.0, 100.0, 100.0, 100.0, 100.0, 200.0]);
        let rate = cagr(&series, 5).unwrap();
        assert!((rate - 0.148_698_354_997_035).abs() < 1e-9);

        let short = yearly(&[100.0, 121.0]);
        assert!((cagr(&short, 5).unwrap() - 0.21).abs() < 1e-9);

        let windowed = yearly(&[1.0, 100.0, 121.0]);
        assert!((cagr(&windowed, 1).unwrap() - 0.21).abs() < 1e-9);
    }

    #[test]
    fn test_cagr_undefined() {
        assert_eq!(cagr(&yearly(&[100.0]), 5), None);
        assert_eq!(cagr(&yearly(&[0.0, 100.0]), 5), None);
        assert_eq!(cagr(&yearly(&[100.0, -1.0]), 5), None);
        assert_eq!(cagr(&yearly(&[100.0, 110.0]), 0), None);
    }

    #[test]
    fn test_ratios_skip_zero_denominators() {
        let latest = BTreeMap::from([
            (MetricName::NetIncome, 20.0),
            (MetricName::TotalAssets, 200.0),
            (MetricName::StockholdersEquity, 0.0),
            (MetricName::TotalLiabilities, 50.0),
        ]);
        let r = ratios(&latest);
        assert_eq!(r.roa, Some(0.1));
        assert_eq!(r.roe, None);
        assert_eq!(r.debt_to_equity, None);
        assert_eq!(r.profit_margin, None);
    }

    #[test]
    fn test_sector_summary() {
        let summary = SectorSummary::from_values(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(summary.mean, 5.0);
        assert_eq!(summary.median, 4.5);
        assert_eq!(summary.min, 2.0);
        assert_eq!(summary.max, 9.0);
        assert_eq!(summary.std, 2.0);
        assert_eq!(summary.count, 8);
        assert!(SectorSummary::from_values(&[]).is_none());
    }

    #[tokio::test]
    async fn test_time_series_and_frame() {
        let analytics = Analytics::new(seeded_store().await);
        let series = analytics
            .time_series(&"AAPL".into(), MetricName::Revenue, MetricPeriod::Annual)
            .await
            .unwrap();
        assert_eq!(series.points, vec![(date(2021, 9, 25), 100.0), (date(2022, 9, 24), 120.0)]);

        let df = series.to_frame().unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.column("date").unwrap().dtype(), &DataType::Date);

        let err = analytics
            .time_series(&"NOPE".into(), MetricName::Revenue, MetricPeriod::Annual)
            .await
            .unwrap_err();
        assert!(matches!(err, FilingsError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_ratios_for_uses_latest_annual() {
        let analytics = Analytics::new(seeded_store().await);
        let r = analytics.ratios_for(&"AAPL".into()).await.unwrap();
        assert_eq!(r.roa, Some(0.1));
        assert_eq!(r.roe, Some(0.3));
        assert_eq!(r.debt_to_equity, Some(2.0));
        assert_eq!(r.profit_margin, Some(0.25));
    }

    #[tokio::test]
    async fn test_compare_leaves_out_missing_companies() {
        let analytics = Analytics::new(seeded_store().await);
        let tickers: Vec<Ticker> = vec!["AAPL".into(), "MSFT".into(), "XOM".into(), "NOPE".into()];
        let results = analytics.compare(&tickers, MetricName::Revenue).await.unwrap();

        assert_eq!(results.len(), 2);
        let apple = &results[&Ticker::from("AAPL")];
        assert_eq!(apple.company_name, "Apple Inc.");
        assert_eq!(apple.latest_value, 120.0);
        assert_eq!(apple.latest_date, date(2022, 9, 24));
        assert!((apple.growth_rate.unwrap() - 0.2).abs() < 1e-12);
        assert!((apple.cagr.unwrap() - 0.2).abs() < 1e-12);

        let microsoft = &results[&Ticker::from("MSFT")];
        assert_eq!(microsoft.growth_rate, None);
        assert_eq!(microsoft.cagr, None);
    }

    #[tokio::test]
    async fn test_sector_averages() {
        let analytics = Analytics::new(seeded_store().await);
        let summary = analytics
            .sector_averages("technology", MetricName::Revenue)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.mean, 160.0);
        assert_eq!(summary.median, 160.0);
        assert_eq!(summary.std, 40.0);

        assert!(
            analytics
                .sector_averages("Energy", MetricName::Revenue)
                .await
                .unwrap()
                .is_none()
        );
        assert!(
            analytics
                .sector_averages("Utilities", MetricName::Revenue)
                .await
                .unwrap()
                .is_none()
        );
    }
}
