use serde::{Deserialize, Serialize};

/// User-configurable settings affecting fetches and queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// The currency in which all datasets are requested and displayed
    /// (e.g., "USD", "EUR", "PLN").
    pub display_currency: String,

    /// When enabled, the `downloads` query counts redownloads too.
    pub include_redownloads: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            display_currency: "USD".to_string(),
            include_redownloads: false,
        }
    }
}
