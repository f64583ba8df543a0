use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::errors::CoreError;
use super::traits::{AppMetadata, AppMetadataProvider};

const BASE_URL: &str = "https://itunes.apple.com";

/// App metadata lookup via the public iTunes search API.
/// No credentials required; failures simply omit the app's metadata.
pub struct ITunesLookupProvider {
    client: Client,
    base_url: String,
}

impl ITunesLookupProvider {
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let builder = Client::builder().timeout(Duration::from_secs(30));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            base_url: base_url.into(),
        }
    }
}

impl Default for ITunesLookupProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct LookupResponse {
    results: Vec<LookupResult>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupResult {
    artwork_url512: String,
    artwork_url100: String,
    current_version_release_date: String,
    version: String,
    price: f64,
}

#[async_trait]
impl AppMetadataProvider for ITunesLookupProvider {
    fn name(&self) -> &str {
        "iTunes Lookup"
    }

    async fn lookup(&self, app_id: &str) -> Result<AppMetadata, CoreError> {
        let url = format!("{}/lookup?id={app_id}", self.base_url);

        let resp: LookupResponse = self
            .client
            .get(&url)
            .send()
            .await?
            .json()
            .await
            .map_err(|e| {
                CoreError::Unknown(format!("iTunes lookup: bad response for {app_id}: {e}"))
            })?;

        let first = resp
            .results
            .into_iter()
            .next()
            .ok_or_else(|| CoreError::Unknown(format!("iTunes lookup: no results for {app_id}")))?;

        Ok(AppMetadata {
            version: first.version,
            price: first.price,
            release_date: first.current_version_release_date,
            icon_url_small: first.artwork_url100,
            icon_url_large: first.artwork_url512,
        })
    }
}
