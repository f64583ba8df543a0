use std::collections::HashSet;
use std::io::Read;
use std::sync::Arc;

use chrono::NaiveDate;
use flate2::read::GzDecoder;
use futures::future;

use crate::errors::CoreError;
use crate::models::account::Account;
use crate::models::app::AppSummary;
use crate::models::event::{Device, Event, EventType};
use crate::providers::traits::{AppMetadataProvider, IconSink, ReportProvider};
use super::currency_service::CurrencyConverter;

/// Columns a daily sales report must carry. A payload whose header row
/// lacks any of these is structurally malformed.
const REQUIRED_COLUMNS: &[&str] = &[
    "Title",
    "SKU",
    "Units",
    "Developer Proceeds",
    "Currency of Proceeds",
    "Begin Date",
    "Country Code",
    "Product Type Identifier",
];

/// Fetches compressed daily reports concurrently, decompresses and
/// parses them into typed events, and resolves app metadata.
///
/// Failure isolation: a date with no report yields an empty result;
/// any other per-date error aborts the whole batch.
pub struct ReportService {
    reports: Arc<dyn ReportProvider>,
    metadata: Arc<dyn AppMetadataProvider>,
    icons: Arc<dyn IconSink>,
}

impl ReportService {
    pub fn new(
        reports: Arc<dyn ReportProvider>,
        metadata: Arc<dyn AppMetadataProvider>,
        icons: Arc<dyn IconSink>,
    ) -> Self {
        Self {
            reports,
            metadata,
            icons,
        }
    }

    /// Fetch and parse the reports for every requested date, with one
    /// concurrent task per date and no ordering dependency between
    /// them. Proceeds are converted into `display_currency` as rows
    /// are parsed; unconvertible currencies record 0.
    pub async fn fetch_missing(
        &self,
        account: &Account,
        dates: &[NaiveDate],
        converter: &CurrencyConverter,
        display_currency: &str,
    ) -> Result<Vec<Event>, CoreError> {
        let fetches = dates.iter().map(|&date| async move {
            match self.reports.fetch_report(account, date).await {
                Ok(bytes) => parse_report(&bytes, converter, display_currency).map(Some),
                Err(e) if e.is_no_data() => {
                    log::debug!("no report available for {date}");
                    Ok(None)
                }
                Err(e) => Err(e),
            }
        });

        let per_date = future::try_join_all(fetches).await?;

        Ok(per_date.into_iter().flatten().flatten().collect())
    }

    /// Resolve display metadata for every distinct app referenced by
    /// `events`. Lookups run concurrently and are best-effort: a
    /// failed lookup omits that app. Each resolved app is handed to
    /// the icon sink fire-and-forget.
    pub async fn resolve_apps(&self, events: &[Event]) -> Vec<AppSummary> {
        let mut seen = HashSet::new();
        let requests: Vec<(&str, &str, &str)> = events
            .iter()
            .filter(|e| !e.app_id.is_empty())
            .filter(|e| seen.insert(e.app_id.as_str()))
            .map(|e| (e.app_id.as_str(), e.app_title.as_str(), e.app_sku.as_str()))
            .collect();

        let lookups = requests.iter().map(|&(app_id, name, sku)| async move {
            match self.metadata.lookup(app_id).await {
                Ok(meta) => Some(AppSummary {
                    app_id: app_id.to_string(),
                    name: name.to_string(),
                    sku: sku.to_string(),
                    version: meta.version,
                    price: meta.price,
                    release_date: meta.release_date,
                    icon_url_small: meta.icon_url_small,
                    icon_url_large: meta.icon_url_large,
                }),
                Err(e) => {
                    log::debug!("metadata lookup failed for app {app_id}: {e}");
                    None
                }
            }
        });

        let apps: Vec<AppSummary> = future::join_all(lookups)
            .await
            .into_iter()
            .flatten()
            .collect();

        for app in &apps {
            let sink = Arc::clone(&self.icons);
            let app = app.clone();
            tokio::spawn(async move {
                sink.cache_icon(&app).await;
            });
        }

        apps
    }
}

/// Decompress and parse one gzipped tab-delimited report into events.
///
/// Structural defects (bad gzip, unparsable table, missing header
/// columns) are a fatal `Unknown` error: they indicate a contract
/// break, not absent data. Individual field defects degrade to
/// per-field defaults, matching the provider's loose row format.
pub fn parse_report(
    bytes: &[u8],
    converter: &CurrencyConverter,
    display_currency: &str,
) -> Result<Vec<Event>, CoreError> {
    let mut decoder = GzDecoder::new(bytes);
    let mut text = String::new();
    decoder
        .read_to_string(&mut text)
        .map_err(|e| CoreError::Unknown(format!("report payload is not valid gzip: {e}")))?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| CoreError::Unknown(format!("report has no parsable header row: {e}")))?
        .clone();

    let column = |name: &str| headers.iter().position(|h| h == name);

    for required in REQUIRED_COLUMNS {
        if column(required).is_none() {
            return Err(CoreError::Unknown(format!(
                "report is missing required column '{required}'"
            )));
        }
    }

    let idx_title = column("Title");
    let idx_sku = column("SKU");
    let idx_parent = column("Parent Identifier");
    let idx_app_id = column("Apple Identifier");
    let idx_units = column("Units");
    let idx_proceeds = column("Developer Proceeds");
    let idx_currency = column("Currency of Proceeds");
    let idx_date = column("Begin Date");
    let idx_country = column("Country Code");
    let idx_device = column("Device");
    let idx_type = column("Product Type Identifier");

    let mut events = Vec::new();

    for record in reader.records() {
        let record =
            record.map_err(|e| CoreError::Unknown(format!("malformed report row: {e}")))?;

        let field = |idx: Option<usize>| idx.and_then(|i| record.get(i)).unwrap_or("");

        let parent_id = field(idx_parent).trim();
        let sku = field(idx_sku).trim();
        let app_sku = if parent_id.is_empty() { sku } else { parent_id };

        let raw_proceeds: f64 = field(idx_proceeds).trim().parse().unwrap_or(0.0);
        let proceeds = converter
            .convert(raw_proceeds, field(idx_currency).trim(), display_currency)
            .unwrap_or(0.0);

        let date = NaiveDate::parse_from_str(field(idx_date).trim(), "%m/%d/%Y")
            .unwrap_or(NaiveDate::MIN);

        events.push(Event {
            app_title: non_empty_or(field(idx_title).trim(), "UNKNOWN"),
            app_sku: app_sku.to_string(),
            app_id: field(idx_app_id).trim().to_string(),
            units: field(idx_units).trim().parse().unwrap_or(0),
            proceeds,
            date,
            country_code: non_empty_or(field(idx_country).trim(), "UNKNOWN"),
            device: Device::from_raw(field(idx_device).trim()),
            event_type: EventType::from_raw(field(idx_type).trim()),
        });
    }

    Ok(events)
}

fn non_empty_or(value: &str, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}
