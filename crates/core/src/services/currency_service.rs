use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use crate::errors::CoreError;
use crate::providers::traits::RateProvider;

/// All cached rates are expressed relative to this base.
const BASE_CURRENCY: &str = "USD";

/// How long a fetched rate table stays fresh. Daily sales reports lag
/// well behind real time, so half a day of rate staleness is tolerable.
const REFRESH_INTERVAL: Duration = Duration::from_secs(12 * 60 * 60);

/// Converts monetary amounts between currency codes using a
/// periodically refreshed exchange-rate table.
///
/// `convert` is synchronous and infallible in shape: a missing rate
/// yields `None`, and callers record the amount as 0 rather than
/// failing ingestion. Only `refresh` touches the network.
pub struct CurrencyConverter {
    provider: Option<Arc<dyn RateProvider>>,
    rates: RwLock<HashMap<String, f64>>,
    refreshed_at: RwLock<Option<Instant>>,
    /// Serializes concurrent refreshes so a redundant call never costs
    /// a second network round trip.
    refresh_guard: tokio::sync::Mutex<()>,
}

impl CurrencyConverter {
    pub fn new(provider: Arc<dyn RateProvider>) -> Self {
        Self {
            provider: Some(provider),
            rates: RwLock::new(HashMap::new()),
            refreshed_at: RwLock::new(None),
            refresh_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Build a converter from a preloaded rate table (offline use and
    /// tests). The table is treated as fresh; `refresh` is a no-op.
    pub fn with_table(rates: HashMap<String, f64>) -> Self {
        let mut rates = rates;
        rates.entry(BASE_CURRENCY.to_string()).or_insert(1.0);
        Self {
            provider: None,
            rates: RwLock::new(rates),
            refreshed_at: RwLock::new(Some(Instant::now())),
            refresh_guard: tokio::sync::Mutex::new(()),
        }
    }

    /// Convert `amount` from one currency code to another.
    /// Returns `None` when either code has no known rate.
    pub fn convert(&self, amount: f64, from: &str, to: &str) -> Option<f64> {
        let from = from.to_uppercase();
        let to = to.to_uppercase();

        if from == to {
            return Some(amount);
        }

        let rates = self.rates.read().ok()?;
        let from_rate = rates.get(&from)?;
        let to_rate = rates.get(&to)?;
        Some(amount / from_rate * to_rate)
    }

    /// Whether the rate table was refreshed within the staleness window.
    pub fn is_fresh(&self) -> bool {
        self.refreshed_at
            .read()
            .ok()
            .and_then(|at| *at)
            .is_some_and(|at| at.elapsed() < REFRESH_INTERVAL)
    }

    /// Refresh the rate table if stale. Idempotent: a fresh table makes
    /// this a no-op, and concurrent callers serialize behind one fetch.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        let provider = match &self.provider {
            Some(p) => Arc::clone(p),
            None => return Ok(()),
        };

        let _guard = self.refresh_guard.lock().await;
        // Re-check after acquiring the guard: another caller may have
        // refreshed while we waited.
        if self.is_fresh() {
            return Ok(());
        }

        let table = provider.latest_rates(BASE_CURRENCY).await?;
        log::debug!("refreshed {} exchange rates", table.len());

        if let Ok(mut rates) = self.rates.write() {
            *rates = table;
        }
        if let Ok(mut at) = self.refreshed_at.write() {
            *at = Some(Instant::now());
        }

        Ok(())
    }
}
