use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::errors::CoreError;
use super::traits::RateProvider;

const BASE_URL: &str = "https://api.frankfurter.dev/v1";

/// Frankfurter API provider for fiat currency exchange rates.
///
/// - **Free**: No API key, no rate limits, open-source.
/// - **Source**: European Central Bank (ECB) data.
/// - **Coverage**: ~30+ currencies (EUR, USD, PLN, GBP, JPY, etc.)
///
/// One `/latest` call returns the whole table relative to the base,
/// which is exactly what the currency normalizer caches.
pub struct FrankfurterProvider {
    client: Client,
}

impl FrankfurterProvider {
    pub fn new() -> Self {
        let builder = Client::builder().timeout(Duration::from_secs(30));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
        }
    }
}

impl Default for FrankfurterProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct RatesResponse {
    rates: HashMap<String, f64>,
}

#[async_trait]
impl RateProvider for FrankfurterProvider {
    fn name(&self) -> &str {
        "Frankfurter"
    }

    async fn latest_rates(&self, base: &str) -> Result<HashMap<String, f64>, CoreError> {
        let base = base.to_uppercase();
        let url = format!("{BASE_URL}/latest?base={base}");

        let resp: RatesResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .json()
            .await
            .map_err(|e| {
                CoreError::Unknown(format!("Frankfurter: failed to parse rates for {base}: {e}"))
            })?;

        let mut rates = resp.rates;
        // The base is not included in the response payload.
        rates.insert(base, 1.0);
        Ok(rates)
    }
}
