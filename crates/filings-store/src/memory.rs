//! In-memory entity store.

use async_trait::async_trait;
use filings_core::{
    Cik, Company, CompanyIdentity, EntityStore, Filing, FilingsError, FinancialMetric, FormType,
    MetricKey, MetricName, MetricPeriod, Result, Ticker,
};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Entity store kept entirely in memory.
///
/// Records live in `RwLock`-protected `HashMap`s and are lost when the store is
/// dropped. Records are cloned on every read and write.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    identities: RwLock<HashMap<Cik, CompanyIdentity>>,
    companies: RwLock<HashMap<Ticker, Company>>,
    filings: RwLock<HashMap<String, Filing>>,
    metrics: RwLock<HashMap<MetricKey, FinancialMetric>>,
}

impl InMemoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn duplicate(kind: &str, key: impl std::fmt::Display) -> FilingsError {
    FilingsError::Validation(format!("{kind} {key} already exists"))
}

fn unknown(kind: &str, key: impl std::fmt::Display) -> FilingsError {
    FilingsError::Validation(format!("{kind} {key} does not exist"))
}

#[async_trait]
impl EntityStore for InMemoryStore {
    async fn identity(&self, cik: &Cik) -> Result<Option<CompanyIdentity>> {
        Ok(self.identities.read().await.get(cik).cloned())
    }

    async fn identity_by_ticker(&self, ticker: &Ticker) -> Result<Option<CompanyIdentity>> {
        Ok(self
            .identities
            .read()
            .await
            .values()
            .find(|i| i.is_active && &i.ticker == ticker)
            .cloned())
    }

    async fn identities(&self) -> Result<Vec<CompanyIdentity>> {
        let mut all: Vec<_> = self.identities.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.cik.cmp(&b.cik));
        Ok(all)
    }

    #[instrument(skip(self, identity), fields(cik = %identity.cik))]
    async fn create_identity(&self, identity: &CompanyIdentity) -> Result<()> {
        let mut map = self.identities.write().await;
        if map.contains_key(&identity.cik) {
            return Err(duplicate("Identity", &identity.cik));
        }
        map.insert(identity.cik.clone(), identity.clone());
        debug!("Created identity");
        Ok(())
    }

    #[instrument(skip(self, identity), fields(cik = %identity.cik))]
    async fn update_identity(&self, identity: &CompanyIdentity) -> Result<()> {
        let mut map = self.identities.write().await;
        match map.get_mut(&identity.cik) {
            Some(existing) => {
                *existing = identity.clone();
                Ok(())
            }
            None => Err(unknown("Identity", &identity.cik)),
        }
    }

    async fn company(&self, ticker: &Ticker) -> Result<Option<Company>> {
        Ok(self.companies.read().await.get(ticker).cloned())
    }

    async fn companies(&self) -> Result<Vec<Company>> {
        let mut all: Vec<_> = self.companies.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        Ok(all)
    }

    #[instrument(skip(self, company), fields(ticker = %company.ticker))]
    async fn create_company(&self, company: &Company) -> Result<()> {
        let mut map = self.companies.write().await;
        if map.contains_key(&company.ticker) {
            return Err(duplicate("Company", &company.ticker));
        }
        map.insert(company.ticker.clone(), company.clone());
        Ok(())
    }

    #[instrument(skip(self, company), fields(ticker = %company.ticker))]
    async fn update_company(&self, company: &Company) -> Result<()> {
        let mut map = self.companies.write().await;
        match map.get_mut(&company.ticker) {
            Some(existing) => {
                *existing = company.clone();
                Ok(())
            }
            None => Err(unknown("Company", &company.ticker)),
        }
    }

    async fn filing(&self, accession_number: &str) -> Result<Option<Filing>> {
        Ok(self.filings.read().await.get(accession_number).cloned())
    }

    async fn filings_for(&self, company: &Ticker, form: Option<FormType>) -> Result<Vec<Filing>> {
        let mut found: Vec<_> = self
            .filings
            .read()
            .await
            .values()
            .filter(|f| &f.company_id == company && form.is_none_or(|form| f.form_type == form))
            .cloned()
            .collect();
        found.sort_by(|a, b| {
            a.filing_date
                .cmp(&b.filing_date)
                .then_with(|| a.accession_number.cmp(&b.accession_number))
        });
        Ok(found)
    }

    async fn create_filing(&self, filing: &Filing) -> Result<()> {
        let mut map = self.filings.write().await;
        if map.contains_key(&filing.accession_number) {
            return Err(duplicate("Filing", &filing.accession_number));
        }
        map.insert(filing.accession_number.clone(), filing.clone());
        Ok(())
    }

    async fn update_filing(&self, filing: &Filing) -> Result<()> {
        let mut map = self.filings.write().await;
        match map.get_mut(&filing.accession_number) {
            Some(existing) => {
                *existing = filing.clone();
                Ok(())
            }
            None => Err(unknown("Filing", &filing.accession_number)),
        }
    }

    async fn metric(&self, key: &MetricKey) -> Result<Option<FinancialMetric>> {
        Ok(self.metrics.read().await.get(key).cloned())
    }

    async fn metrics_for(
        &self,
        company: &Ticker,
        name: Option<MetricName>,
        period: Option<MetricPeriod>,
    ) -> Result<Vec<FinancialMetric>> {
        let mut found: Vec<_> = self
            .metrics
            .read()
            .await
            .values()
            .filter(|m| {
                &m.company_id == company
                    && name.is_none_or(|n| m.name == n)
                    && period.is_none_or(|p| m.period == p)
            })
            .cloned()
            .collect();
        found.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.key().cmp(&b.key())));
        Ok(found)
    }

    async fn create_metric(&self, metric: &FinancialMetric) -> Result<()> {
        let key = metric.key();
        let mut map = self.metrics.write().await;
        if map.contains_key(&key) {
            return Err(duplicate("Metric", &key));
        }
        map.insert(key, metric.clone());
        Ok(())
    }

    async fn update_metric(&self, metric: &FinancialMetric) -> Result<()> {
        let key = metric.key();
        let mut map = self.metrics.write().await;
        match map.get_mut(&key) {
            Some(existing) => {
                *existing = metric.clone();
                Ok(())
            }
            None => Err(unknown("Metric", &key)),
        }
    }
}
