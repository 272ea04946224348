//! SQLite-backed entity store.

use async_trait::async_trait;
use filings_core::{
    Cik, Company, CompanyIdentity, EntityStore, Filing, FilingsError, FinancialMetric, FormType,
    MetricKey, MetricName, MetricPeriod, Result, Ticker,
};
use rusqlite::{Connection, OptionalExtension, ToSql, params};
use serde::{Serialize, de::DeserializeOwned};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, instrument};

/// Entity store persisted in a SQLite database.
///
/// Each entity type has its own table holding the key columns plus the whole record
/// as JSON. Every write is an `INSERT OR REPLACE` of one record.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

#[derive(Clone, Copy)]
enum WriteMode {
    Create,
    Update,
}

fn store_err(e: impl std::fmt::Display) -> FilingsError {
    FilingsError::Store(e.to_string())
}

fn to_json<T: Serialize>(record: &T) -> Result<String> {
    serde_json::to_string(record).map_err(store_err)
}

fn from_json<T: DeserializeOwned>(json: &str) -> Result<T> {
    serde_json::from_str(json).map_err(store_err)
}

impl SqliteStore {
    /// Opens (or creates) a store at the given path.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or schema creation fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(store_err)?;
        }
        let conn = Connection::open(path).map_err(store_err)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory store.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(store_err)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(store_err)
    }

    fn initialize_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS identities (
                cik TEXT PRIMARY KEY,
                ticker TEXT NOT NULL,
                is_active INTEGER NOT NULL,
                data_json TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_identities_ticker ON identities(ticker, is_active);

            CREATE TABLE IF NOT EXISTS companies (
                ticker TEXT PRIMARY KEY,
                cik TEXT NOT NULL,
                sector TEXT,
                data_json TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS filings (
                accession_number TEXT PRIMARY KEY,
                company_id TEXT NOT NULL,
                form_type TEXT NOT NULL,
                filing_date TEXT NOT NULL,
                data_json TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_filings_company ON filings(company_id, form_type);

            CREATE TABLE IF NOT EXISTS metrics (
                company_id TEXT NOT NULL,
                name TEXT NOT NULL,
                period TEXT NOT NULL,
                date TEXT NOT NULL,
                data_json TEXT NOT NULL,
                PRIMARY KEY (company_id, name, period, date)
            );",
        )
        .map_err(store_err)?;

        debug!("SQLite store schema initialized");
        Ok(())
    }

    fn fetch_one<T: DeserializeOwned>(&self, sql: &str, params: &[&dyn ToSql]) -> Result<Option<T>> {
        let conn = self.lock()?;
        let json: Option<String> = conn
            .query_row(sql, params, |row| row.get(0))
            .optional()
            .map_err(store_err)?;
        json.as_deref().map(from_json).transpose()
    }

    fn fetch_all<T: DeserializeOwned>(&self, sql: &str, params: &[&dyn ToSql]) -> Result<Vec<T>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql).map_err(store_err)?;
        let rows = stmt
            .query_map(params, |row| row.get::<_, String>(0))
            .map_err(store_err)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(from_json(&row.map_err(store_err)?)?);
        }
        Ok(records)
    }

    #[allow(clippy::too_many_arguments)]
    fn write(
        &self,
        mode: WriteMode,
        kind: &str,
        key: &str,
        exists_sql: &str,
        key_params: &[&dyn ToSql],
        write_sql: &str,
        row_params: &[&dyn ToSql],
    ) -> Result<()> {
        let conn = self.lock()?;
        let exists = conn
            .query_row(exists_sql, key_params, |_| Ok(()))
            .optional()
            .map_err(store_err)?
            .is_some();
        match (mode, exists) {
            (WriteMode::Create, true) => {
                return Err(FilingsError::Validation(format!("{kind} {key} already exists")));
            }
            (WriteMode::Update, false) => {
                return Err(FilingsError::Validation(format!("{kind} {key} does not exist")));
            }
            _ => {}
        }
        conn.execute(write_sql, row_params).map_err(store_err)?;
        Ok(())
    }

    fn write_identity(&self, mode: WriteMode, identity: &CompanyIdentity) -> Result<()> {
        let json = to_json(identity)?;
        self.write(
            mode,
            "Identity",
            identity.cik.as_str(),
            "SELECT 1 FROM identities WHERE cik = ?1",
            params![identity.cik.as_str()],
            "INSERT OR REPLACE INTO identities (cik, ticker, is_active, data_json)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                identity.cik.as_str(),
                identity.ticker.as_str(),
                identity.is_active,
                json
            ],
        )
    }

    fn write_company(&self, mode: WriteMode, company: &Company) -> Result<()> {
        let json = to_json(company)?;
        self.write(
            mode,
            "Company",
            company.ticker.as_str(),
            "SELECT 1 FROM companies WHERE ticker = ?1",
            params![company.ticker.as_str()],
            "INSERT OR REPLACE INTO companies (ticker, cik, sector, data_json)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                company.ticker.as_str(),
                company.cik.as_str(),
                company.sector.as_deref(),
                json
            ],
        )
    }

    fn write_filing(&self, mode: WriteMode, filing: &Filing) -> Result<()> {
        let json = to_json(filing)?;
        self.write(
            mode,
            "Filing",
            &filing.accession_number,
            "SELECT 1 FROM filings WHERE accession_number = ?1",
            params![filing.accession_number],
            "INSERT OR REPLACE INTO filings
             (accession_number, company_id, form_type, filing_date, data_json)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                filing.accession_number,
                filing.company_id.as_str(),
                filing.form_type.as_str(),
                filing.filing_date.to_string(),
                json
            ],
        )
    }

    fn write_metric(&self, mode: WriteMode, metric: &FinancialMetric) -> Result<()> {
        let json = to_json(metric)?;
        let key = metric.key();
        let date = key.date.to_string();
        self.write(
            mode,
            "Metric",
            &key.to_string(),
            "SELECT 1 FROM metrics
             WHERE company_id = ?1 AND name = ?2 AND period = ?3 AND date = ?4",
            params![
                key.company_id.as_str(),
                key.name.as_str(),
                key.period.as_str(),
                date
            ],
            "INSERT OR REPLACE INTO metrics (company_id, name, period, date, data_json)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                key.company_id.as_str(),
                key.name.as_str(),
                key.period.as_str(),
                date,
                json
            ],
        )
    }
}

#[async_trait]
impl EntityStore for SqliteStore {
    #[instrument(skip(self), fields(cik = %cik))]
    async fn identity(&self, cik: &Cik) -> Result<Option<CompanyIdentity>> {
        self.fetch_one(
            "SELECT data_json FROM identities WHERE cik = ?1",
            params![cik.as_str()],
        )
    }

    #[instrument(skip(self), fields(ticker = %ticker))]
    async fn identity_by_ticker(&self, ticker: &Ticker) -> Result<Option<CompanyIdentity>> {
        self.fetch_one(
            "SELECT data_json FROM identities WHERE ticker = ?1 AND is_active = 1 LIMIT 1",
            params![ticker.as_str()],
        )
    }

    async fn identities(&self) -> Result<Vec<CompanyIdentity>> {
        self.fetch_all("SELECT data_json FROM identities ORDER BY cik", params![])
    }

    #[instrument(skip(self, identity), fields(cik = %identity.cik))]
    async fn create_identity(&self, identity: &CompanyIdentity) -> Result<()> {
        self.write_identity(WriteMode::Create, identity)
    }

    #[instrument(skip(self, identity), fields(cik = %identity.cik))]
    async fn update_identity(&self, identity: &CompanyIdentity) -> Result<()> {
        self.write_identity(WriteMode::Update, identity)
    }

    #[instrument(skip(self), fields(ticker = %ticker))]
    async fn company(&self, ticker: &Ticker) -> Result<Option<Company>> {
        self.fetch_one(
            "SELECT data_json FROM companies WHERE ticker = ?1",
            params![ticker.as_str()],
        )
    }

    async fn companies(&self) -> Result<Vec<Company>> {
        self.fetch_all("SELECT data_json FROM companies ORDER BY ticker", params![])
    }

    #[instrument(skip(self, company), fields(ticker = %company.ticker))]
    async fn create_company(&self, company: &Company) -> Result<()> {
        self.write_company(WriteMode::Create, company)
    }

    #[instrument(skip(self, company), fields(ticker = %company.ticker))]
    async fn update_company(&self, company: &Company) -> Result<()> {
        self.write_company(WriteMode::Update, company)
    }

    async fn filing(&self, accession_number: &str) -> Result<Option<Filing>> {
        self.fetch_one(
            "SELECT data_json FROM filings WHERE accession_number = ?1",
            params![accession_number],
        )
    }

    #[instrument(skip(self), fields(company = %company))]
    async fn filings_for(&self, company: &Ticker, form: Option<FormType>) -> Result<Vec<Filing>> {
        self.fetch_all(
            "SELECT data_json FROM filings
             WHERE company_id = ?1 AND (?2 IS NULL OR form_type = ?2)
             ORDER BY filing_date, accession_number",
            params![company.as_str(), form.map(|f| f.as_str())],
        )
    }

    #[instrument(skip(self, filing), fields(accession = %filing.accession_number))]
    async fn create_filing(&self, filing: &Filing) -> Result<()> {
        self.write_filing(WriteMode::Create, filing)
    }

    #[instrument(skip(self, filing), fields(accession = %filing.accession_number))]
    async fn update_filing(&self, filing: &Filing) -> Result<()> {
        self.write_filing(WriteMode::Update, filing)
    }

    async fn metric(&self, key: &MetricKey) -> Result<Option<FinancialMetric>> {
        self.fetch_one(
            "SELECT data_json FROM metrics
             WHERE company_id = ?1 AND name = ?2 AND period = ?3 AND date = ?4",
            params![
                key.company_id.as_str(),
                key.name.as_str(),
                key.period.as_str(),
                key.date.to_string()
            ],
        )
    }

    #[instrument(skip(self), fields(company = %company))]
    async fn metrics_for(
        &self,
        company: &Ticker,
        name: Option<MetricName>,
        period: Option<MetricPeriod>,
    ) -> Result<Vec<FinancialMetric>> {
        self.fetch_all(
            "SELECT data_json FROM metrics
             WHERE company_id = ?1
               AND (?2 IS NULL OR name = ?2)
               AND (?3 IS NULL OR period = ?3)
             ORDER BY date, name, period",
            params![
                company.as_str(),
                name.map(|n| n.as_str()),
                period.map(|p| p.as_str())
            ],
        )
    }

    async fn create_metric(&self, metric: &FinancialMetric) -> Result<()> {
        self.write_metric(WriteMode::Create, metric)
    }

    async fn update_metric(&self, metric: &FinancialMetric) -> Result<()> {
        self.write_metric(WriteMode::Update, metric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use filings_core::Upsert;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_in_memory_creation() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.identities().await.unwrap().is_empty());
        assert!(store.companies().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_identity_round_trip_and_deactivation() {
        let store = SqliteStore::in_memory().unwrap();
        let mut identity =
            CompanyIdentity::new(Cik::from_number(320_193), "AAPL".into(), "Apple Inc.")
                .with_exchange("Nasdaq");
        store.create_identity(&identity).await.unwrap();

        let found = store.identity_by_ticker(&"AAPL".into()).await.unwrap().unwrap();
        assert_eq!(found, identity);

        identity.is_active = false;
        store.update_identity(&identity).await.unwrap();
        assert!(store.identity_by_ticker(&"AAPL".into()).await.unwrap().is_none());
        assert!(!store.identity(&identity.cik).await.unwrap().unwrap().is_active);
    }

    #[tokio::test]
    async fn test_validation_on_duplicate_and_unknown() {
        let store = SqliteStore::in_memory().unwrap();
        let filing = Filing::new(
            "0000320193-23-000106",
            FormType::TenK,
            date(2023, 11, 3),
            date(2023, 9, 30),
            "AAPL".into(),
        );
        assert!(matches!(
            store.update_filing(&filing).await,
            Err(FilingsError::Validation(_))
        ));
        store.create_filing(&filing).await.unwrap();
        assert!(matches!(
            store.create_filing(&filing).await,
            Err(FilingsError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_filings_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("filings.db");
        let ticker: Ticker = "AAPL".into();
        {
            let store = SqliteStore::new(&path).unwrap();
            let mut filing = Filing::new(
                "0000320193-24-000081",
                FormType::TenQ,
                date(2024, 8, 2),
                date(2024, 6, 29),
                ticker.clone(),
            );
            filing.raw_data = serde_json::json!({"form": "10-Q"});
            assert_eq!(store.upsert_filing(&filing).await.unwrap(), Upsert::Created);
            filing.mark_processed(Utc::now());
            assert_eq!(store.upsert_filing(&filing).await.unwrap(), Upsert::Updated);
        }

        let store = SqliteStore::new(&path).unwrap();
        let filings = store.filings_for(&ticker, Some(FormType::TenQ)).await.unwrap();
        assert_eq!(filings.len(), 1);
        assert!(filings[0].is_processed);
        assert_eq!(filings[0].raw_data["form"], "10-Q");
        assert!(store.filings_for(&ticker, Some(FormType::TenK)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_metrics_filtered_and_ordered() {
        let store = SqliteStore::in_memory().unwrap();
        let ticker: Ticker = "MSFT".into();
        for (name, period, d, v) in [
            (MetricName::Revenue, MetricPeriod::Annual, date(2023, 6, 30), 211.9),
            (MetricName::Revenue, MetricPeriod::Annual, date(2022, 6, 30), 198.3),
            (MetricName::Eps, MetricPeriod::Quarterly, date(2023, 3, 31), 2.45),
        ] {
            let metric = FinancialMetric::new(ticker.clone(), name, period, d, v);
            assert_eq!(store.upsert_metric(&metric).await.unwrap(), Upsert::Created);
        }

        let revenue = store
            .metrics_for(&ticker, Some(MetricName::Revenue), Some(MetricPeriod::Annual))
            .await
            .unwrap();
        assert_eq!(revenue.len(), 2);
        assert_eq!(revenue[0].date, date(2022, 6, 30));

        let eps = store
            .metrics_for(&ticker, Some(MetricName::Eps), None)
            .await
            .unwrap();
        assert_eq!(eps.len(), 1);
        assert_eq!(eps[0].period, MetricPeriod::Quarterly);
        assert_eq!(store.metrics_for(&ticker, None, None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_companies_in_sector() {
        let store = SqliteStore::in_memory().unwrap();
        let apple = Company::new("AAPL".into(), "Apple Inc.", Cik::from_number(320_193))
            .with_sector("Technology");
        let xom = Company::new("XOM".into(), "Exxon Mobil", Cik::from_number(34_088))
            .with_sector("Energy");
        store.create_company(&apple).await.unwrap();
        store.create_company(&xom).await.unwrap();

        let tech = store.companies_in_sector("Technology").await.unwrap();
        assert_eq!(tech, vec![apple]);
    }
}
