//! Entity store trait.
//!
//! This module defines the [`EntityStore`] trait, the single source of truth for
//! identities, companies, filings and metrics. Entities refer to each other only
//! through keys (`company_id` on filings and metrics); there is no in-memory graph.

use async_trait::async_trait;

use crate::{
    error::Result,
    period::{FormType, MetricName, MetricPeriod},
    types::{Cik, Company, CompanyIdentity, Filing, FinancialMetric, MetricKey, Ticker},
};

/// Outcome of an upsert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Upsert {
    /// No record existed under the key; one was created.
    Created,
    /// A record existed under the key and was replaced.
    Updated,
}

/// Keyed persistent collections for every entity type.
///
/// `create_*` fails with [`FilingsError::Validation`](crate::FilingsError::Validation)
/// if the key already exists, `update_*` fails the same way if it does not. Each write
/// replaces the whole record atomically; there are no multi-entity transactions.
#[async_trait]
pub trait EntityStore: Send + Sync + std::fmt::Debug {
    /// Looks up an identity by CIK.
    async fn identity(&self, cik: &Cik) -> Result<Option<CompanyIdentity>>;

    /// Looks up the active identity holding a ticker.
    async fn identity_by_ticker(&self, ticker: &Ticker) -> Result<Option<CompanyIdentity>>;

    /// Lists all identities, active or not.
    async fn identities(&self) -> Result<Vec<CompanyIdentity>>;

    /// Stores a new identity.
    async fn create_identity(&self, identity: &CompanyIdentity) -> Result<()>;

    /// Replaces an existing identity.
    async fn update_identity(&self, identity: &CompanyIdentity) -> Result<()>;

    /// Looks up a company by ticker.
    async fn company(&self, ticker: &Ticker) -> Result<Option<Company>>;

    /// Lists all companies.
    async fn companies(&self) -> Result<Vec<Company>>;

    /// Stores a new company.
    async fn create_company(&self, company: &Company) -> Result<()>;

    /// Replaces an existing company.
    async fn update_company(&self, company: &Company) -> Result<()>;

    /// Looks up a filing by accession number.
    async fn filing(&self, accession_number: &str) -> Result<Option<Filing>>;

    /// Lists a company's filings, optionally restricted to one form type,
    /// ordered by filing date.
    async fn filings_for(&self, company: &Ticker, form: Option<FormType>) -> Result<Vec<Filing>>;

    /// Stores a new filing.
    async fn create_filing(&self, filing: &Filing) -> Result<()>;

    /// Replaces an existing filing.
    async fn update_filing(&self, filing: &Filing) -> Result<()>;

    /// Looks up a metric by its composite key.
    async fn metric(&self, key: &MetricKey) -> Result<Option<FinancialMetric>>;

    /// Lists a company's metrics, optionally filtered by name and period,
    /// ordered by date ascending.
    async fn metrics_for(
        &self,
        company: &Ticker,
        name: Option<MetricName>,
        period: Option<MetricPeriod>,
    ) -> Result<Vec<FinancialMetric>>;

    /// Stores a new metric.
    async fn create_metric(&self, metric: &FinancialMetric) -> Result<()>;

    /// Replaces an existing metric.
    async fn update_metric(&self, metric: &FinancialMetric) -> Result<()>;

    /// Lists companies whose sector matches, ignoring ASCII case.
    async fn companies_in_sector(&self, sector: &str) -> Result<Vec<Company>> {
        Ok(self
            .companies()
            .await?
            .into_iter()
            .filter(|c| c.sector.as_deref().is_some_and(|s| s.eq_ignore_ascii_case(sector)))
            .collect())
    }

    /// Returns the most recently filed filing of a form type.
    async fn latest_filing(&self, company: &Ticker, form: FormType) -> Result<Option<Filing>> {
        Ok(self
            .filings_for(company, Some(form))
            .await?
            .into_iter()
            .max_by_key(|f| f.filing_date))
    }

    /// Creates or replaces an identity.
    async fn upsert_identity(&self, identity: &CompanyIdentity) -> Result<Upsert> {
        if self.identity(&identity.cik).await?.is_some() {
            self.update_identity(identity).await?;
            Ok(Upsert::Updated)
        } else {
            self.create_identity(identity).await?;
            Ok(Upsert::Created)
        }
    }

    /// Creates or replaces a company.
    async fn upsert_company(&self, company: &Company) -> Result<Upsert> {
        if self.company(&company.ticker).await?.is_some() {
            self.update_company(company).await?;
            Ok(Upsert::Updated)
        } else {
            self.create_company(company).await?;
            Ok(Upsert::Created)
        }
    }

    /// Creates or replaces a filing.
    async fn upsert_filing(&self, filing: &Filing) -> Result<Upsert> {
        if self.filing(&filing.accession_number).await?.is_some() {
            self.update_filing(filing).await?;
            Ok(Upsert::Updated)
        } else {
            self.create_filing(filing).await?;
            Ok(Upsert::Created)
        }
    }

    /// Creates or replaces a metric.
    async fn upsert_metric(&self, metric: &FinancialMetric) -> Result<Upsert> {
        if self.metric(&metric.key()).await?.is_some() {
            self.update_metric(metric).await?;
            Ok(Upsert::Updated)
        } else {
            self.create_metric(metric).await?;
            Ok(Upsert::Created)
        }
    }
}
