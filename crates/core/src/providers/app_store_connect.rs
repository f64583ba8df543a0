use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::account::Account;
use super::traits::ReportProvider;

const BASE_URL: &str = "https://api.appstoreconnect.apple.com/v1";

/// Body marker the provider sends with a 404 when a report exists for
/// the vendor but not (yet) for the requested date.
const NO_RESULTS_MARKER: &str = "The request expected results but none were found";

/// Sales-report client for the App Store Connect reporting API.
///
/// Request signing (JWT from the account's private key) is handled by
/// the transport layer below this client; this type only shapes the
/// request and classifies provider status codes into the domain error
/// taxonomy.
pub struct AppStoreConnectProvider {
    client: Client,
    base_url: String,
}

impl AppStoreConnectProvider {
    pub fn new() -> Self {
        Self::with_base_url(BASE_URL)
    }

    /// Point the client at a different endpoint (tests, proxies).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let builder = Client::builder().timeout(Duration::from_secs(30));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            base_url: base_url.into(),
        }
    }

    fn classify_status(status: StatusCode, body: &str) -> CoreError {
        match status {
            StatusCode::UNAUTHORIZED => CoreError::InvalidCredentials,
            StatusCode::FORBIDDEN => CoreError::WrongPermissions,
            StatusCode::TOO_MANY_REQUESTS => CoreError::ExceededLimit,
            StatusCode::NOT_FOUND => {
                if body.contains(NO_RESULTS_MARKER) {
                    CoreError::NoDataAvailable
                } else {
                    CoreError::Unknown(format!("unexpected 404: {body}"))
                }
            }
            other => CoreError::Unknown(format!("unexpected status {other}")),
        }
    }
}

impl Default for AppStoreConnectProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReportProvider for AppStoreConnectProvider {
    fn name(&self) -> &str {
        "App Store Connect"
    }

    async fn fetch_report(&self, account: &Account, date: NaiveDate) -> Result<Vec<u8>, CoreError> {
        let url = format!("{}/salesReports", self.base_url);
        let report_date = date.format("%Y-%m-%d").to_string();

        log::debug!("requesting sales report for {report_date}");

        let response = self
            .client
            .get(&url)
            .query(&[
                ("filter[frequency]", "DAILY"),
                ("filter[reportSubType]", "SUMMARY"),
                ("filter[reportType]", "SALES"),
                ("filter[vendorNumber]", account.vendor_number.as_str()),
                ("filter[reportDate]", report_date.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let bytes = response.bytes().await?;
            return Ok(bytes.to_vec());
        }

        let body = response.text().await.unwrap_or_default();
        Err(Self::classify_status(status, &body))
    }
}
