use serde::{Deserialize, Serialize};

/// Display metadata for an app referenced by sales events.
///
/// **Equality and hashing** are based solely on `sku`, matching how
/// the reporting provider identifies apps across reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSummary {
    /// Platform identifier (numeric id as a string)
    pub app_id: String,

    /// Display name
    pub name: String,

    /// SKU — the app's identity
    pub sku: String,

    /// Current version string
    pub version: String,

    /// Store price
    pub price: f64,

    /// Release date of the current version, as reported
    pub release_date: String,

    /// Small icon (thumbnail) URL
    pub icon_url_small: String,

    /// Full-size icon URL
    pub icon_url_large: String,
}

impl PartialEq for AppSummary {
    fn eq(&self, other: &Self) -> bool {
        self.sku == other.sku
    }
}

impl Eq for AppSummary {}

impl std::hash::Hash for AppSummary {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.sku.hash(state);
    }
}

impl AppSummary {
    /// Store page URL for this app.
    pub fn store_url(&self) -> String {
        format!("https://apps.apple.com/app/id{}", self.app_id)
    }
}
