use std::collections::HashMap;

use chrono::{Days, NaiveDate};

use crate::models::app::AppSummary;
use crate::models::dataset::SalesDataset;
use crate::models::event::{Event, EventType};
use crate::models::summary::{change_pct_raw, AppPerformanceSummary, PerformanceSummary};

/// Which measure a query aggregates over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// Monetary proceeds (weighted by units)
    Proceeds,
    /// First-time downloads (plus redownloads when configured)
    Downloads,
    /// App updates
    Updates,
    /// In-app purchases
    Iap,
}

/// Pure aggregation queries over a `SalesDataset`.
///
/// Every query takes an explicit `as_of` anchor date instead of
/// reading the wall clock, so trailing windows are deterministic.
/// No query performs I/O or suspends.
pub struct AnalyticsService {
    include_redownloads: bool,
}

impl AnalyticsService {
    pub fn new(include_redownloads: bool) -> Self {
        Self {
            include_redownloads,
        }
    }

    /// Events within `[start, end]` (inclusive), optionally restricted
    /// to a subset of apps, filtered by the kind's predicate.
    pub fn entries<'a>(
        &self,
        data: &'a SalesDataset,
        kind: ReportKind,
        start: NaiveDate,
        end: NaiveDate,
        filter_apps: &[AppSummary],
    ) -> Vec<&'a Event> {
        data.events
            .iter()
            .filter(|e| e.date >= start && e.date <= end)
            .filter(|e| {
                filter_apps.is_empty() || filter_apps.iter().any(|app| app.app_id == e.app_id)
            })
            .filter(|e| match kind {
                ReportKind::Proceeds => e.proceeds > 0.0,
                ReportKind::Downloads => {
                    e.event_type == EventType::Download
                        || (self.include_redownloads && e.event_type == EventType::Redownload)
                }
                ReportKind::Updates => e.event_type == EventType::Update,
                ReportKind::Iap => e.event_type == EventType::Iap,
            })
            .collect()
    }

    /// One `(value, date)` pair per distinct day in `[start, end]`,
    /// sorted by date ascending. Proceeds sum `proceeds × units`;
    /// every other kind sums raw units.
    pub fn raw_series(
        &self,
        data: &SalesDataset,
        kind: ReportKind,
        start: NaiveDate,
        end: NaiveDate,
        filter_apps: &[AppSummary],
    ) -> Vec<(f64, NaiveDate)> {
        let mut by_date: HashMap<NaiveDate, f64> = HashMap::new();

        for entry in self.entries(data, kind, start, end, filter_apps) {
            let value = match kind {
                ReportKind::Proceeds => entry.proceeds * entry.units as f64,
                _ => entry.units as f64,
            };
            *by_date.entry(entry.date).or_insert(0.0) += value;
        }

        let mut series: Vec<(f64, NaiveDate)> =
            by_date.into_iter().map(|(date, v)| (v, date)).collect();
        series.sort_by_key(|&(_, date)| date);
        series
    }

    /// `raw_series` over the trailing `n` days ending at `as_of`.
    /// The lower bound is exclusive: the window covers `as_of − n + 1`
    /// through `as_of`, exactly `n` calendar days.
    pub fn raw_series_last_n(
        &self,
        data: &SalesDataset,
        kind: ReportKind,
        n: u64,
        as_of: NaiveDate,
        filter_apps: &[AppSummary],
    ) -> Vec<(f64, NaiveDate)> {
        let start = as_of
            .checked_sub_days(Days::new(n))
            .and_then(|d| d.checked_add_days(Days::new(1)))
            .unwrap_or(NaiveDate::MIN);
        self.raw_series(data, kind, start, as_of, filter_apps)
    }

    /// Percentage change of the trailing 15-day sum against the
    /// preceding 15 days (days 16–30 back), `(latest/previous − 1) ×
    /// 100`, uncapped. A zero previous sum yields 0 when the latest
    /// sum is also zero, otherwise the documented `MAX_CHANGE_PCT`
    /// sentinel — never NaN or infinity.
    pub fn change_over_window(
        &self,
        data: &SalesDataset,
        kind: ReportKind,
        as_of: NaiveDate,
    ) -> f64 {
        let latest = self.window_sum(data, kind, 15, as_of, &[]);
        let previous = self.window_sum(data, kind, 30, as_of, &[]) - latest;
        change_pct_raw(latest, previous)
    }

    /// Fixed 30-vs-previous-30-day comparison of downloads and
    /// proceeds, plus the top six apps of the trailing window.
    pub fn performance_summary(&self, data: &SalesDataset, as_of: NaiveDate) -> PerformanceSummary {
        let downloads = self.window_sum(data, ReportKind::Downloads, 30, as_of, &[]);
        let downloads_60 = self.window_sum(data, ReportKind::Downloads, 60, as_of, &[]);
        let proceeds = self.window_sum(data, ReportKind::Proceeds, 30, as_of, &[]);
        let proceeds_60 = self.window_sum(data, ReportKind::Proceeds, 60, as_of, &[]);

        let mut apps = self.app_summaries(data, as_of);
        apps.truncate(6);

        PerformanceSummary {
            downloads: downloads as i64,
            prev_downloads: (downloads_60 - downloads) as i64,
            proceeds,
            prev_proceeds: proceeds_60 - proceeds,
            apps,
        }
    }

    /// All apps ranked by trailing-30-day downloads, descending.
    /// Ties keep the dataset's app order (stable sort). Each app's
    /// proceeds total is computed independently over the same window.
    pub fn app_summaries(
        &self,
        data: &SalesDataset,
        as_of: NaiveDate,
    ) -> Vec<AppPerformanceSummary> {
        let mut ranked: Vec<(&AppSummary, i64)> = data
            .apps
            .iter()
            .map(|app| {
                let filter = std::slice::from_ref(app);
                let downloads =
                    self.window_sum(data, ReportKind::Downloads, 30, as_of, filter) as i64;
                (app, downloads)
            })
            .collect();

        ranked.sort_by_key(|&(_, downloads)| std::cmp::Reverse(downloads));

        ranked
            .into_iter()
            .map(|(app, downloads)| {
                let filter = std::slice::from_ref(app);
                let proceeds = self.window_sum(data, ReportKind::Proceeds, 30, as_of, filter);
                AppPerformanceSummary {
                    app_id: app.app_id.clone(),
                    name: app.name.clone(),
                    icon_url: app.icon_url_small.clone(),
                    downloads,
                    proceeds,
                }
            })
            .collect()
    }

    /// Activity per device category over the trailing 30 days, largest
    /// first; ties order by device label.
    pub fn device_breakdown(
        &self,
        data: &SalesDataset,
        kind: ReportKind,
        as_of: NaiveDate,
    ) -> Vec<(String, f64)> {
        let start = as_of
            .checked_sub_days(Days::new(30))
            .and_then(|d| d.checked_add_days(Days::new(1)))
            .unwrap_or(NaiveDate::MIN);

        let mut by_device: HashMap<String, f64> = HashMap::new();
        for entry in self.entries(data, kind, start, as_of, &[]) {
            let value = match kind {
                ReportKind::Proceeds => entry.proceeds * entry.units as f64,
                _ => entry.units as f64,
            };
            *by_device.entry(entry.device.to_string()).or_insert(0.0) += value;
        }

        let mut breakdown: Vec<(String, f64)> = by_device.into_iter().collect();
        breakdown.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        breakdown
    }

    /// Latest report date across all events, or `NaiveDate::MIN` for
    /// an empty dataset.
    pub fn latest_date(&self, data: &SalesDataset) -> NaiveDate {
        data.events
            .iter()
            .map(|e| e.date)
            .max()
            .unwrap_or(NaiveDate::MIN)
    }

    fn window_sum(
        &self,
        data: &SalesDataset,
        kind: ReportKind,
        days: u64,
        as_of: NaiveDate,
        filter_apps: &[AppSummary],
    ) -> f64 {
        self.raw_series_last_n(data, kind, days, as_of, filter_apps)
            .iter()
            .map(|&(v, _)| v)
            .sum()
    }
}

impl Default for AnalyticsService {
    fn default() -> Self {
        Self::new(false)
    }
}
