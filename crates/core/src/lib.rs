pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDate;
use models::{
    account::Account,
    dataset::SalesDataset,
    settings::Settings,
    summary::{AppPerformanceSummary, PerformanceSummary},
};
use providers::app_store_connect::AppStoreConnectProvider;
use providers::frankfurter::FrankfurterProvider;
use providers::itunes::ITunesLookupProvider;
use providers::traits::{AppMetadataProvider, IconSink, NoopIconSink, RateProvider, ReportProvider};
use services::analytics_service::{AnalyticsService, ReportKind};
use services::coordinator::{RequestCoordinator, DEFAULT_FETCH_DAYS};
use services::currency_service::CurrencyConverter;
use services::report_service::ReportService;
use storage::cache::DataCache;

use errors::CoreError;

/// Main entry point for the App Sales core library.
///
/// Owns the currency converter, the on-disk dataset cache and the
/// request coordinator; callers fetch per-account datasets through it
/// and run aggregation queries over the results.
#[must_use]
pub struct AppSales {
    converter: Arc<CurrencyConverter>,
    cache: Arc<DataCache>,
    coordinator: RequestCoordinator,
    settings: Settings,
}

impl std::fmt::Debug for AppSales {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppSales")
            .field("settings", &self.settings)
            .field("cached_events", &self.cache.entry_count(None))
            .finish()
    }
}

impl AppSales {
    /// Build against the production providers (App Store Connect
    /// reports, iTunes metadata, Frankfurter rates, no icon sink).
    pub fn new(cache_path: impl Into<PathBuf>) -> Self {
        Self::with_providers(
            cache_path,
            Arc::new(AppStoreConnectProvider::new()),
            Arc::new(ITunesLookupProvider::new()),
            Arc::new(FrankfurterProvider::new()),
            Arc::new(NoopIconSink),
            Settings::default(),
        )
    }

    /// Build with explicit providers — the seam tests and embedders
    /// use to substitute fixtures.
    pub fn with_providers(
        cache_path: impl Into<PathBuf>,
        reports: Arc<dyn ReportProvider>,
        metadata: Arc<dyn AppMetadataProvider>,
        rates: Arc<dyn RateProvider>,
        icons: Arc<dyn IconSink>,
        settings: Settings,
    ) -> Self {
        let converter = Arc::new(CurrencyConverter::new(rates));
        let cache = Arc::new(DataCache::new(cache_path));
        let report_service = Arc::new(ReportService::new(reports, metadata, icons));
        let coordinator = RequestCoordinator::new(
            report_service,
            Arc::clone(&cache),
            Arc::clone(&converter),
        );

        Self {
            converter,
            cache,
            coordinator,
            settings,
        }
    }

    // ── Fetching ────────────────────────────────────────────────────

    /// Fetch the trailing window of sales data for an account in the
    /// configured display currency, using the cache and memoization.
    pub async fn get_data(&self, account: &Account) -> Result<SalesDataset, CoreError> {
        self.coordinator
            .get_data(
                account,
                &self.settings.display_currency,
                DEFAULT_FETCH_DAYS,
                true,
                true,
            )
            .await
    }

    /// Fetch with explicit knobs: trailing-day count, cache seeding
    /// and memoization lookup.
    pub async fn get_data_with(
        &self,
        account: &Account,
        num_days: u32,
        use_cache: bool,
        use_memoization: bool,
    ) -> Result<SalesDataset, CoreError> {
        self.coordinator
            .get_data(
                account,
                &self.settings.display_currency,
                num_days,
                use_cache,
                use_memoization,
            )
            .await
    }

    /// Probe whether an account's credentials are valid.
    pub async fn check_account(&self, account: &Account) -> Result<(), CoreError> {
        self.coordinator.check_credentials(account).await
    }

    // ── Queries ─────────────────────────────────────────────────────

    /// Query engine configured from the current settings.
    #[must_use]
    pub fn analytics(&self) -> AnalyticsService {
        AnalyticsService::new(self.settings.include_redownloads)
    }

    /// Performance summary of a dataset anchored to today.
    #[must_use]
    pub fn performance_summary(&self, data: &SalesDataset) -> PerformanceSummary {
        self.analytics().performance_summary(data, today())
    }

    /// Per-app ranking of a dataset anchored to today.
    #[must_use]
    pub fn app_summaries(&self, data: &SalesDataset) -> Vec<AppPerformanceSummary> {
        self.analytics().app_summaries(data, today())
    }

    /// Trailing-15-vs-previous-15-day change anchored to today.
    #[must_use]
    pub fn change_over_window(&self, data: &SalesDataset, kind: ReportKind) -> f64 {
        self.analytics().change_over_window(data, kind, today())
    }

    /// Re-express a dataset in another currency.
    #[must_use]
    pub fn change_currency(&self, data: &SalesDataset, to: &str) -> SalesDataset {
        data.change_currency(&self.converter, to)
    }

    // ── Cache Management ────────────────────────────────────────────

    /// Number of cached events, for one account or across all.
    #[must_use]
    pub fn cached_entry_count(&self, account: Option<&Account>) -> usize {
        self.cache.entry_count(account)
    }

    /// Remove one account's cached dataset.
    pub fn clear_account_cache(&self, account: &Account) {
        self.cache.clear(account);
    }

    /// Remove the whole cache.
    pub fn clear_cache(&self) {
        self.cache.clear_all();
    }

    /// Drop the coordinator's memoization tables.
    pub fn reset_memoization(&self) {
        self.coordinator.reset_memoization();
    }

    // ── Settings ────────────────────────────────────────────────────

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Set the display currency (e.g., "USD", "EUR", "PLN").
    /// Currency code must be a 3-letter alphabetic string.
    pub fn set_display_currency(&mut self, currency: String) -> Result<(), CoreError> {
        let trimmed = currency.trim().to_uppercase();
        if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CoreError::Validation(format!(
                "Invalid currency code '{currency}': must be exactly 3 ASCII letters (e.g., USD, EUR, PLN)"
            )));
        }
        self.settings.display_currency = trimmed;
        Ok(())
    }

    /// Toggle whether the `downloads` query counts redownloads.
    pub fn set_include_redownloads(&mut self, include: bool) {
        self.settings.include_redownloads = include;
    }
}

fn today() -> NaiveDate {
    chrono::Utc::now().date_naive()
}
