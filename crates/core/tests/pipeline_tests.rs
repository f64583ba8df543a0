// ═══════════════════════════════════════════════════════════════════
// Pipeline Tests — report decompression and parsing, per-date fetch
// batching, app metadata resolution
// ═══════════════════════════════════════════════════════════════════

use std::collections::{HashMap, HashSet};
use std::io::Write;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use flate2::write::GzEncoder;
use flate2::Compression;

use app_sales_core::errors::CoreError;
use app_sales_core::models::account::Account;
use app_sales_core::models::event::{Device, Event, EventType};
use app_sales_core::providers::traits::{
    AppMetadata, AppMetadataProvider, NoopIconSink, ReportProvider,
};
use app_sales_core::services::currency_service::CurrencyConverter;
use app_sales_core::services::report_service::{parse_report, ReportService};

const HEADER: &str = "Provider\tProvider Country\tSKU\tDeveloper\tTitle\tVersion\tProduct Type Identifier\tUnits\tDeveloper Proceeds\tBegin Date\tEnd Date\tCustomer Currency\tCountry Code\tCurrency of Proceeds\tApple Identifier\tParent Identifier\tDevice";

#[allow(clippy::too_many_arguments)]
fn row(
    sku: &str,
    title: &str,
    ptype: &str,
    units: &str,
    proceeds: &str,
    date: &str,
    country: &str,
    currency: &str,
    app_id: &str,
    parent: &str,
    device: &str,
) -> String {
    format!(
        "APPLE\tUS\t{sku}\tAcme\t{title}\t1.0\t{ptype}\t{units}\t{proceeds}\t{date}\t{date}\t{currency}\t{country}\t{currency}\t{app_id}\t{parent}\t{device}"
    )
}

fn gzip(text: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

fn report(rows: &[String]) -> Vec<u8> {
    let mut lines = vec![HEADER.to_string()];
    lines.extend_from_slice(rows);
    gzip(&lines.join("\n"))
}

fn converter() -> CurrencyConverter {
    let mut rates = HashMap::new();
    rates.insert("USD".to_string(), 1.0);
    rates.insert("EUR".to_string(), 0.9);
    CurrencyConverter::with_table(rates)
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

// ═══════════════════════════════════════════════════════════════════
// Parsing
// ═══════════════════════════════════════════════════════════════════

#[test]
fn parses_a_row_into_a_typed_event() {
    let payload = report(&[row(
        "ocean", "Ocean Journal", "1", "3", "0.90", "08/01/2026", "DE", "EUR", "42", "", "iPhone",
    )]);

    let events = parse_report(&payload, &converter(), "USD").unwrap();

    assert_eq!(events.len(), 1);
    let e = &events[0];
    assert_eq!(e.app_title, "Ocean Journal");
    assert_eq!(e.app_sku, "ocean");
    assert_eq!(e.app_id, "42");
    assert_eq!(e.units, 3);
    assert!((e.proceeds - 1.0).abs() < 1e-9, "0.90 EUR is 1.00 USD");
    assert_eq!(e.date, d(2026, 8, 1));
    assert_eq!(e.country_code, "DE");
    assert_eq!(e.device, Device::Iphone);
    assert_eq!(e.event_type, EventType::Download);
}

#[test]
fn parent_identifier_wins_over_sku_when_present() {
    let payload = report(&[
        row("child-sku", "A", "IA1", "1", "0", "08/01/2026", "US", "USD", "1", "bundle", "iPad"),
        row("plain-sku", "B", "1", "1", "0", "08/01/2026", "US", "USD", "2", "", "iPad"),
    ]);

    let events = parse_report(&payload, &converter(), "USD").unwrap();
    assert_eq!(events[0].app_sku, "bundle");
    assert_eq!(events[1].app_sku, "plain-sku");
}

#[test]
fn defective_fields_fall_back_to_defaults() {
    let payload = report(&[row(
        "sku", "", "ZZ", "abc", "1.00", "not-a-date", "", "XXX", "", "", "Hologram",
    )]);

    let events = parse_report(&payload, &converter(), "USD").unwrap();

    assert_eq!(events.len(), 1, "a defective row is kept, not dropped");
    let e = &events[0];
    assert_eq!(e.app_title, "UNKNOWN");
    assert_eq!(e.units, 0);
    assert_eq!(e.proceeds, 0.0, "unconvertible currency records zero");
    assert_eq!(e.date, NaiveDate::MIN);
    assert_eq!(e.country_code, "UNKNOWN");
    assert_eq!(e.device, Device::Unknown);
    assert_eq!(e.event_type, EventType::Unknown);
}

#[test]
fn non_gzip_payload_is_a_fatal_error() {
    let result = parse_report(b"plain text, not gzip", &converter(), "USD");
    assert!(matches!(result, Err(CoreError::Unknown(_))));
}

#[test]
fn missing_required_column_is_a_fatal_error() {
    let payload = gzip("Title\tSKU\tDeveloper Proceeds\nA\tsku\t1.00");
    let result = parse_report(&payload, &converter(), "USD");
    match result {
        Err(CoreError::Unknown(msg)) => assert!(msg.contains("Units"), "got: {msg}"),
        other => panic!("expected a fatal error, got {other:?}"),
    }
}

#[test]
fn empty_report_parses_to_no_events() {
    let payload = report(&[]);
    let events = parse_report(&payload, &converter(), "USD").unwrap();
    assert!(events.is_empty());
}

// ═══════════════════════════════════════════════════════════════════
// Fetch batching
// ═══════════════════════════════════════════════════════════════════

struct FixtureReports {
    by_date: HashMap<NaiveDate, Result<Vec<u8>, CoreError>>,
}

#[async_trait]
impl ReportProvider for FixtureReports {
    fn name(&self) -> &str {
        "fixture"
    }

    async fn fetch_report(&self, _account: &Account, date: NaiveDate) -> Result<Vec<u8>, CoreError> {
        self.by_date
            .get(&date)
            .cloned()
            .unwrap_or(Err(CoreError::NoDataAvailable))
    }
}

struct FixtureMetadata {
    failing: HashSet<String>,
}

#[async_trait]
impl AppMetadataProvider for FixtureMetadata {
    fn name(&self) -> &str {
        "fixture"
    }

    async fn lookup(&self, app_id: &str) -> Result<AppMetadata, CoreError> {
        if self.failing.contains(app_id) {
            return Err(CoreError::Unknown("lookup failed".into()));
        }
        Ok(AppMetadata {
            version: "2.0".into(),
            price: 0.99,
            release_date: "2026-01-01".into(),
            icon_url_small: format!("https://example.com/{app_id}/small.png"),
            icon_url_large: format!("https://example.com/{app_id}/large.png"),
        })
    }
}

fn service(reports: FixtureReports, metadata: FixtureMetadata) -> ReportService {
    ReportService::new(Arc::new(reports), Arc::new(metadata), Arc::new(NoopIconSink))
}

fn test_account() -> Account {
    Account::new("Test", "issuer", "KEY1", &"K".repeat(200), "8000001")
}

#[tokio::test]
async fn days_without_reports_are_absorbed_not_fatal() {
    let with_data = d(2026, 8, 1);
    let without = d(2026, 8, 2);
    let mut by_date = HashMap::new();
    by_date.insert(
        with_data,
        Ok(report(&[row(
            "sku", "A", "1", "2", "0", "08/01/2026", "US", "USD", "1", "", "iPhone",
        )])),
    );
    by_date.insert(without, Err(CoreError::NoDataAvailable));
    let service = service(
        FixtureReports { by_date },
        FixtureMetadata { failing: HashSet::new() },
    );

    let events: Vec<Event> = service
        .fetch_missing(&test_account(), &[with_data, without], &converter(), "USD")
        .await
        .unwrap();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].date, with_data);
}

#[tokio::test]
async fn a_real_provider_error_aborts_the_whole_batch() {
    let ok_day = d(2026, 8, 1);
    let bad_day = d(2026, 8, 2);
    let mut by_date = HashMap::new();
    by_date.insert(
        ok_day,
        Ok(report(&[row(
            "sku", "A", "1", "2", "0", "08/01/2026", "US", "USD", "1", "", "iPhone",
        )])),
    );
    by_date.insert(bad_day, Err(CoreError::InvalidCredentials));
    let service = service(
        FixtureReports { by_date },
        FixtureMetadata { failing: HashSet::new() },
    );

    let result = service
        .fetch_missing(&test_account(), &[ok_day, bad_day], &converter(), "USD")
        .await;

    assert_eq!(result, Err(CoreError::InvalidCredentials));
}

// ═══════════════════════════════════════════════════════════════════
// Metadata resolution
// ═══════════════════════════════════════════════════════════════════

#[tokio::test]
async fn resolves_each_app_once_and_omits_failed_lookups() {
    let payload = report(&[
        row("sku-1", "First", "1", "1", "0", "08/01/2026", "US", "USD", "1", "", "iPhone"),
        row("sku-2", "Second", "1", "1", "0", "08/01/2026", "US", "USD", "2", "", "iPhone"),
        row("sku-1", "First", "1", "1", "0", "08/01/2026", "DE", "USD", "1", "", "iPad"),
        row("sku-3", "Rowless", "1", "1", "0", "08/01/2026", "US", "USD", "", "", "iPad"),
    ]);
    let events = parse_report(&payload, &converter(), "USD").unwrap();

    let service = service(
        FixtureReports { by_date: HashMap::new() },
        FixtureMetadata { failing: HashSet::from(["2".to_string()]) },
    );

    let apps = service.resolve_apps(&events).await;

    assert_eq!(apps.len(), 1, "failed and id-less lookups are omitted");
    let app = &apps[0];
    assert_eq!(app.app_id, "1");
    assert_eq!(app.name, "First");
    assert_eq!(app.sku, "sku-1");
    assert_eq!(app.version, "2.0");
}
