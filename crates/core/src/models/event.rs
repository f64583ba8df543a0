use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One parsed row of daily sales activity for a single app, country
/// and device.
///
/// **Important**: `proceeds` is always expressed in the display
/// currency of the dataset that owns the event. Converting a dataset
/// to another currency produces new events; an event is never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// App display title as reported
    pub app_title: String,

    /// App SKU (parent identifier preferred when present)
    pub app_sku: String,

    /// Platform identifier of the app
    pub app_id: String,

    /// Unit count for this row
    pub units: i64,

    /// Developer proceeds per unit, in the owning dataset's currency
    pub proceeds: f64,

    /// Report date — day granularity, no time component
    pub date: NaiveDate,

    /// ISO country code as reported
    pub country_code: String,

    /// Device category the activity happened on
    pub device: Device,

    /// Classified event type
    pub event_type: EventType,
}

/// Closed classification of provider product-type codes.
///
/// Unmapped codes become `Unknown` — never an error, never dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    Download,
    Redownload,
    Iap,
    RestoredIap,
    Update,
    Unknown,
}

impl EventType {
    /// Map a raw product-type identifier to its category.
    /// Pure function of the code string; exhaustively unit-tested.
    pub fn from_raw(product_type_identifier: &str) -> Self {
        match product_type_identifier {
            "1" | "1-B" | "F1-B" | "1E" | "1EP" | "1EU" | "1F" | "1T" | "F1" => {
                EventType::Download
            }
            "3" | "3F" | "F3" => EventType::Redownload,
            "FI1" | "IA1" | "IA1-M" | "IA9" | "IA9-M" | "IAY" | "IAY-M" => EventType::Iap,
            "IA3" => EventType::RestoredIap,
            "7" | "7F" | "7T" | "F7" => EventType::Update,
            _ => EventType::Unknown,
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::Download => write!(f, "Download"),
            EventType::Redownload => write!(f, "Redownload"),
            EventType::Iap => write!(f, "In-App Purchase"),
            EventType::RestoredIap => write!(f, "Restored In-App Purchase"),
            EventType::Update => write!(f, "Update"),
            EventType::Unknown => write!(f, "Unknown"),
        }
    }
}

/// Device category a sales row was reported for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Device {
    Desktop,
    Iphone,
    Ipad,
    AppleWatch,
    AppleTv,
    Unknown,
}

impl Device {
    /// Map the raw device column to its category; unmapped labels
    /// become `Unknown`.
    pub fn from_raw(device: &str) -> Self {
        match device {
            "iPhone" => Device::Iphone,
            "iPad" => Device::Ipad,
            "Desktop" => Device::Desktop,
            "Apple Watch" => Device::AppleWatch,
            "Apple TV" => Device::AppleTv,
            _ => Device::Unknown,
        }
    }
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Device::Desktop => write!(f, "Desktop"),
            Device::Iphone => write!(f, "iPhone"),
            Device::Ipad => write!(f, "iPad"),
            Device::AppleWatch => write!(f, "Apple Watch"),
            Device::AppleTv => write!(f, "Apple TV"),
            Device::Unknown => write!(f, "Unknown"),
        }
    }
}
