use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;

use crate::errors::CoreError;
use crate::models::account::Account;
use crate::models::app::AppSummary;

/// Trait abstraction over the sales-report transport.
///
/// The production implementation talks to App Store Connect; tests
/// substitute fixtures. The channel is assumed to be authenticated —
/// report signing lives below this seam.
#[async_trait]
pub trait ReportProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// Download the compressed daily report for one date.
    /// Errors are already mapped into the domain taxonomy
    /// (`InvalidCredentials`, `WrongPermissions`, `ExceededLimit`,
    /// `NoDataAvailable`, `Unknown`).
    async fn fetch_report(&self, account: &Account, date: NaiveDate) -> Result<Vec<u8>, CoreError>;
}

/// Exchange-rate source for the currency normalizer.
#[async_trait]
pub trait RateProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Latest rate table relative to `base`. The returned map includes
    /// the base itself at 1.0.
    async fn latest_rates(&self, base: &str) -> Result<HashMap<String, f64>, CoreError>;
}

/// App display metadata returned by a store lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct AppMetadata {
    pub version: String,
    pub price: f64,
    pub release_date: String,
    pub icon_url_small: String,
    pub icon_url_large: String,
}

/// Best-effort app metadata lookup. Failures are non-fatal and simply
/// omit that app's metadata from the dataset.
#[async_trait]
pub trait AppMetadataProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn lookup(&self, app_id: &str) -> Result<AppMetadata, CoreError>;
}

/// Hook for the external icon-fetch pipeline. Called fire-and-forget
/// for each newly resolved app; outcomes are invisible to the fetch
/// result.
#[async_trait]
pub trait IconSink: Send + Sync {
    async fn cache_icon(&self, app: &AppSummary);
}

/// Default sink that ignores icons entirely.
pub struct NoopIconSink;

#[async_trait]
impl IconSink for NoopIconSink {
    async fn cache_icon(&self, _app: &AppSummary) {}
}
