use serde::{Deserialize, Serialize};

/// Upper bound for percentage-change figures, used as the defined
/// sentinel when the previous window is zero but the latest is not.
/// Keeps comparisons against empty history finite and displayable.
pub const MAX_CHANGE_PCT: f64 = 999.0;

/// Fixed 30-day vs previous-30-day comparison of downloads and
/// proceeds, plus the top apps of the latest window.
///
/// Derived on demand from a `SalesDataset`; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    /// Total downloads over the trailing 30 days
    pub downloads: i64,

    /// Total downloads over the preceding 30 days (days 31–60 back)
    pub prev_downloads: i64,

    /// Total proceeds over the trailing 30 days
    pub proceeds: f64,

    /// Total proceeds over the preceding 30 days
    pub prev_proceeds: f64,

    /// Top apps of the trailing window, ranked by downloads
    pub apps: Vec<AppPerformanceSummary>,
}

impl PerformanceSummary {
    /// Percentage change of downloads against the previous window.
    /// Zero previous downloads yields 0 when the latest window is also
    /// empty, otherwise the `MAX_CHANGE_PCT` sentinel.
    pub fn downloads_change_pct(&self) -> f64 {
        change_pct(self.downloads as f64, self.prev_downloads as f64)
    }

    /// Percentage change of proceeds against the previous window, with
    /// the same zero-previous handling as downloads.
    pub fn proceeds_change_pct(&self) -> f64 {
        change_pct(self.proceeds, self.prev_proceeds)
    }
}

/// One app's standing over the trailing 30-day window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppPerformanceSummary {
    pub app_id: String,
    pub name: String,
    pub icon_url: String,
    pub downloads: i64,
    pub proceeds: f64,
}

/// Percentage change with defined zero-previous semantics: 0 when both
/// windows are empty, the sentinel when only the previous one is.
/// Ordinary changes are uncapped; never NaN or infinite.
pub(crate) fn change_pct_raw(latest: f64, previous: f64) -> f64 {
    if previous <= 0.0 {
        if latest <= 0.0 {
            return 0.0;
        }
        return MAX_CHANGE_PCT;
    }
    (latest / previous - 1.0) * 100.0
}

/// `change_pct_raw` capped at the sentinel, for display accessors.
pub(crate) fn change_pct(latest: f64, previous: f64) -> f64 {
    change_pct_raw(latest, previous).min(MAX_CHANGE_PCT)
}
