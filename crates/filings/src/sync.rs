//! Orchestrates upstream fetches, normalization and entity store writes.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, instrument, warn};

use filings_core::{
    Cik, Company, CompanyIdentity, EntityStore, FilingSource, FilingsError, FinancialMetric,
    MetricName, Result, Ticker, Upsert,
};
use filings_edgar::{DirectoryEntry, Normalizer, tags};

/// Counts from a ticker directory sync.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DirectorySyncReport {
    /// Identities seen for the first time.
    pub created: usize,
    /// Existing identities whose ticker, name, exchange or status changed.
    pub updated: usize,
    /// Identities that lost their ticker to another CIK.
    pub deactivated: usize,
    /// Directory records that matched the stored identity exactly.
    pub skipped: usize,
}

/// Outcome of a single company sync.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompanySyncReport {
    /// Company record as stored after the sync.
    pub company: Company,
    /// Filings stored for the first time.
    pub filings_created: usize,
    /// Filings replaced.
    pub filings_updated: usize,
    /// Metrics stored for the first time.
    pub metrics_created: usize,
    /// Metrics replaced.
    pub metrics_updated: usize,
}

/// Pulls data from a [`FilingSource`] into an [`EntityStore`].
///
/// The orchestrator holds no state of its own besides the normalizer; every
/// operation reads what it needs back from the store.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use filings::{EdgarClient, FilingsConfig, SqliteStore, SyncOrchestrator};
///
/// let config = FilingsConfig::from_env()?;
/// let sync = SyncOrchestrator::new(
///     Arc::new(EdgarClient::new(&config)?),
///     Arc::new(SqliteStore::new(&config.store_path)?),
/// );
///
/// sync.sync_directory(false).await?;
/// let report = sync.sync_company(&"AAPL".into(), false).await?;
/// println!("{} metrics", report.metrics_created + report.metrics_updated);
/// ```
pub struct SyncOrchestrator {
    source: Arc<dyn FilingSource>,
    store: Arc<dyn EntityStore>,
    normalizer: Normalizer,
}

impl std::fmt::Debug for SyncOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncOrchestrator")
            .field("source", &self.source.name())
            .field("store", &self.store)
            .field("normalizer", &self.normalizer)
            .finish()
    }
}

impl SyncOrchestrator {
    /// Creates an orchestrator over a source and a store.
    pub fn new(source: Arc<dyn FilingSource>, store: Arc<dyn EntityStore>) -> Self {
        Self {
            source,
            store,
            normalizer: Normalizer::new(),
        }
    }

    /// Replaces the normalizer, e.g. to pin the reference date.
    #[must_use]
    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &Arc<dyn EntityStore> {
        &self.store
    }

    /// Refreshes CIK to ticker identities from the ticker directory.
    ///
    /// When a ticker moves to a new CIK, the identity that held it is deactivated.
    /// Renamed or re-tickered identities keep their old values in the alternative lists.
    ///
    /// # Errors
    /// Returns [`FilingsError::UpstreamUnavailable`] if the directory could not be
    /// fetched and nothing was cached, or any store error.
    #[instrument(skip(self))]
    pub async fn sync_directory(&self, force_refresh: bool) -> Result<DirectorySyncReport> {
        let fetched = self.source.fetch_ticker_directory(force_refresh).await?;
        if fetched.is_unavailable() {
            return Err(FilingsError::UpstreamUnavailable(format!(
                "{} ticker directory",
                self.source.name()
            )));
        }

        let entries = self.normalizer.extract_directory(&fetched.payload);
        debug!(count = entries.len(), origin = ?fetched.origin, "Syncing ticker directory");

        let mut report = DirectorySyncReport::default();
        let mut seen = HashSet::new();
        for entry in entries {
            self.apply_directory_entry(entry, &mut seen, &mut report).await?;
        }

        info!(
            created = report.created,
            updated = report.updated,
            deactivated = report.deactivated,
            skipped = report.skipped,
            "Ticker directory synced"
        );
        Ok(report)
    }

    async fn apply_directory_entry(
        &self,
        entry: DirectoryEntry,
        seen: &mut HashSet<Cik>,
        report: &mut DirectorySyncReport,
    ) -> Result<()> {
        let now = Utc::now();

        if let Some(mut holder) = self.store.identity_by_ticker(&entry.ticker).await? {
            if holder.cik != entry.cik {
                info!(
                    ticker = %entry.ticker,
                    old_cik = %holder.cik,
                    new_cik = %entry.cik,
                    "Ticker moved to a new CIK, deactivating old identity"
                );
                holder.is_active = false;
                holder.last_updated = now;
                self.store.update_identity(&holder).await?;
                report.deactivated += 1;
            }
        }

        // Later listings of a CIK in the same directory are further share classes.
        if !seen.insert(entry.cik.clone()) {
            return self.apply_share_class(entry, report).await;
        }

        let Some(mut identity) = self.store.identity(&entry.cik).await? else {
            let mut identity = CompanyIdentity::new(entry.cik, entry.ticker, entry.name);
            identity.exchange = entry.exchange;
            identity.last_updated = now;
            self.store.create_identity(&identity).await?;
            report.created += 1;
            return Ok(());
        };

        let mut changed = false;
        if identity.ticker != entry.ticker {
            if !identity.alternative_tickers.contains(&identity.ticker) {
                let old = identity.ticker.clone();
                identity.alternative_tickers.push(old);
            }
            identity.ticker = entry.ticker;
            changed = true;
        }
        if !entry.name.is_empty() && identity.company_name != entry.name {
            if !identity.company_name.is_empty()
                && !identity.alternative_names.contains(&identity.company_name)
            {
                let old = identity.company_name.clone();
                identity.alternative_names.push(old);
            }
            identity.company_name = entry.name;
            changed = true;
        }
        if entry.exchange.is_some() && identity.exchange != entry.exchange {
            identity.exchange = entry.exchange;
            changed = true;
        }
        if !identity.is_active {
            identity.is_active = true;
            changed = true;
        }

        if changed {
            identity.last_updated = now;
            self.store.update_identity(&identity).await?;
            report.updated += 1;
        } else {
            report.skipped += 1;
        }
        Ok(())
    }

    async fn apply_share_class(
        &self,
        entry: DirectoryEntry,
        report: &mut DirectorySyncReport,
    ) -> Result<()> {
        let Some(mut identity) = self.store.identity(&entry.cik).await? else {
            report.skipped += 1;
            return Ok(());
        };
        if identity.ticker == entry.ticker || identity.alternative_tickers.contains(&entry.ticker) {
            report.skipped += 1;
            return Ok(());
        }
        debug!(
            cik = %identity.cik,
            primary = %identity.ticker,
            ticker = %entry.ticker,
            "Recording additional share class ticker"
        );
        identity.alternative_tickers.push(entry.ticker);
        identity.last_updated = Utc::now();
        self.store.update_identity(&identity).await?;
        report.updated += 1;
        Ok(())
    }

    /// Resolves a ticker to its active identity, falling back to identities that
    /// list it as an alternative ticker (other share classes, former tickers).
    async fn resolve_identity(&self, ticker: &Ticker) -> Result<Option<CompanyIdentity>> {
        if let Some(identity) = self.store.identity_by_ticker(ticker).await? {
            return Ok(Some(identity));
        }
        Ok(self
            .store
            .identities()
            .await?
            .into_iter()
            .find(|i| i.is_active && i.alternative_tickers.contains(ticker)))
    }

    /// Syncs one company's profile, filings and metrics.
    ///
    /// The company and its filings are written before the facts are fetched, so an
    /// unavailable facts payload leaves them in place. Filings that contributed at
    /// least one metric are marked processed.
    ///
    /// # Errors
    /// - [`FilingsError::NotFound`] if no active identity holds the ticker, either as
    ///   its current ticker or as an alternative
    /// - [`FilingsError::UpstreamUnavailable`] if submissions or facts could not be fetched
    #[instrument(skip(self), fields(ticker = %ticker))]
    pub async fn sync_company(
        &self,
        ticker: &Ticker,
        force_refresh: bool,
    ) -> Result<CompanySyncReport> {
        let mut identity = self.resolve_identity(ticker).await?.ok_or_else(|| {
            FilingsError::NotFound(format!("No CIK mapping for ticker {ticker}"))
        })?;

        let submissions = self
            .source
            .fetch_submissions(&identity.cik, force_refresh)
            .await?;
        if submissions.is_unavailable() {
            return Err(FilingsError::UpstreamUnavailable(format!(
                "submissions for {ticker} (CIK {})",
                identity.cik
            )));
        }
        let profile = self.normalizer.extract_profile(&submissions.payload);

        let name = if identity.company_name.is_empty() {
            profile
                .name
                .clone()
                .unwrap_or_else(|| ticker.to_string())
        } else {
            identity.company_name.clone()
        };
        let mut company = match self.store.company(ticker).await? {
            Some(mut existing) => {
                existing.name = name;
                existing.cik = identity.cik.clone();
                existing
            }
            None => Company::new(ticker.clone(), name, identity.cik.clone()),
        };
        if company.industry.is_none() {
            company.industry = profile.sic_description.clone();
        }
        self.store.upsert_company(&company).await?;

        if identity.exchange.is_none() {
            if let Some(exchange) = profile.exchanges.first() {
                identity.exchange = Some(exchange.clone());
                self.store.update_identity(&identity).await?;
            }
        }

        let mut report = CompanySyncReport {
            company,
            filings_created: 0,
            filings_updated: 0,
            metrics_created: 0,
            metrics_updated: 0,
        };

        let mut filings = self.normalizer.extract_filings(ticker, &submissions.payload);
        for filing in &mut filings {
            if let Some(previous) = self.store.filing(&filing.accession_number).await? {
                filing.is_processed = previous.is_processed;
                filing.processed_date = previous.processed_date;
            }
            match self.store.upsert_filing(filing).await? {
                Upsert::Created => report.filings_created += 1,
                Upsert::Updated => report.filings_updated += 1,
            }
        }

        let facts = self
            .source
            .fetch_company_facts(&identity.cik, force_refresh)
            .await?;
        if facts.is_unavailable() {
            return Err(FilingsError::UpstreamUnavailable(format!(
                "company facts for {ticker} (CIK {})",
                identity.cik
            )));
        }

        let metrics = self.normalizer.extract_metrics(ticker, &facts.payload);
        for metric in &metrics {
            match self.store.upsert_metric(metric).await? {
                Upsert::Created => report.metrics_created += 1,
                Upsert::Updated => report.metrics_updated += 1,
            }
        }

        let reported: HashSet<&str> = metrics
            .iter()
            .filter_map(|m| m.filing_id.as_deref())
            .collect();
        let now = Utc::now();
        for filing in &mut filings {
            if !filing.is_processed && reported.contains(filing.accession_number.as_str()) {
                filing.mark_processed(now);
                self.store.update_filing(filing).await?;
            }
        }

        info!(
            filings = filings.len(),
            metrics = metrics.len(),
            "Company synced"
        );
        Ok(report)
    }

    /// Syncs several companies one after another.
    ///
    /// A failure for one ticker is logged and reported without stopping the rest.
    pub async fn sync_companies(
        &self,
        tickers: &[Ticker],
        force_refresh: bool,
    ) -> Vec<(Ticker, Result<CompanySyncReport>)> {
        let mut results = Vec::with_capacity(tickers.len());
        for ticker in tickers {
            let result = self.sync_company(ticker, force_refresh).await;
            match &result {
                Err(e) if e.is_per_company() => {
                    warn!(ticker = %ticker, error = %e, "Company sync failed");
                }
                Err(e) => error!(ticker = %ticker, error = %e, "Company sync failed"),
                Ok(_) => {}
            }
            results.push((ticker.clone(), result));
        }
        results
    }

    /// Refreshes one metric for a synced company from the single-concept endpoint.
    ///
    /// Tag aliases are tried in precedence order; the first that yields data is
    /// stored. Returns the stored metrics, empty if no alias had any.
    ///
    /// # Errors
    /// Returns [`FilingsError::NotFound`] if the company has not been synced.
    #[instrument(skip(self), fields(ticker = %ticker, metric = %metric))]
    pub async fn refresh_concept(
        &self,
        ticker: &Ticker,
        metric: MetricName,
        force_refresh: bool,
    ) -> Result<Vec<FinancialMetric>> {
        let company = self
            .store
            .company(ticker)
            .await?
            .ok_or_else(|| FilingsError::NotFound(format!("Company {ticker} has not been synced")))?;

        for tag in tags::aliases(metric) {
            let fetched = self
                .source
                .fetch_concept(&company.cik, tag, force_refresh)
                .await?;
            if fetched.is_unavailable() {
                debug!(tag, "Concept unavailable, trying next alias");
                continue;
            }
            let metrics = self
                .normalizer
                .extract_concept(ticker, metric, &fetched.payload);
            if metrics.is_empty() {
                debug!(tag, "Concept has no usable observations");
                continue;
            }
            for m in &metrics {
                self.store.upsert_metric(m).await?;
            }
            info!(tag, count = metrics.len(), "Concept refreshed");
            return Ok(metrics);
        }

        warn!("No alias yielded data");
        Ok(Vec::new())
    }
}

#[cfg(feature = "sqlite")]
impl SyncOrchestrator {
    /// Builds an orchestrator over the SEC EDGAR client and a SQLite store at
    /// `config.store_path`.
    ///
    /// # Errors
    /// Returns [`FilingsError::Config`] for an unusable user agent or
    /// [`FilingsError::Store`] if the database cannot be opened.
    pub fn from_config(config: &filings_core::FilingsConfig) -> Result<Self> {
        let source = filings_edgar::EdgarClient::new(config)?;
        let store = filings_store::SqliteStore::new(&config.store_path)?;
        Ok(Self::new(Arc::new(source), Arc::new(store)))
    }
}
