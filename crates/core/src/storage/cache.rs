use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::account::Account;
use crate::models::dataset::SalesDataset;
use crate::services::currency_service::CurrencyConverter;

/// Rolling window of calendar days kept per account, anchored to the
/// latest date observed in the merge result — never to wall-clock
/// time, so the cache stays consistent when the source data itself
/// lags several days behind.
const CACHE_WINDOW_DAYS: i64 = 35;

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheCollection {
    objects: Vec<CacheObject>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheObject {
    account_id: String,
    data: SalesDataset,
}

/// Per-account persisted store of merged sales datasets.
///
/// All accounts live in one JSON file that is fully read and rewritten
/// on each mutation, serialized behind a store-level lock. Read or
/// decode failures degrade to "no cache"; write failures are logged
/// and never surfaced.
pub struct DataCache {
    path: PathBuf,
    lock: Mutex<()>,
}

impl DataCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// The cached dataset for an account, if one exists.
    pub fn get(&self, account: &Account) -> Option<SalesDataset> {
        let _guard = self.lock.lock().ok()?;
        self.read_collection()
            .objects
            .into_iter()
            .find(|obj| obj.account_id == account.id())
            .map(|obj| obj.data)
    }

    /// Merge `data` into the account's cached entry and persist.
    ///
    /// Merge rules: previously cached events are re-expressed in the
    /// incoming currency; cached days also present in the incoming set
    /// are discarded wholesale (the fresh fetch wins, at day
    /// granularity); the union is trimmed to the most recent
    /// `CACHE_WINDOW_DAYS` days ending at the latest merged date. An
    /// empty result removes the entry rather than storing one.
    pub fn put(&self, data: &SalesDataset, account: &Account, converter: &CurrencyConverter) {
        let Ok(_guard) = self.lock.lock() else {
            return;
        };

        let mut objects = self.read_collection().objects;

        let mut old_data = None;
        objects.retain(|obj| {
            let matching = obj.account_id == account.id();
            if matching {
                old_data = Some(obj.data.clone());
            }
            !matching
        });

        let old_entries = old_data
            .map(|old| old.change_currency(converter, &data.currency).events)
            .unwrap_or_default();

        let incoming_dates: HashSet<NaiveDate> = data.events.iter().map(|e| e.date).collect();

        let mut entries = data.events.clone();
        entries.extend(
            old_entries
                .into_iter()
                .filter(|e| !incoming_dates.contains(&e.date)),
        );

        let latest = entries
            .iter()
            .map(|e| e.date)
            .max()
            .unwrap_or_else(|| Utc::now().date_naive());

        entries.retain(|e| (latest - e.date).num_days() < CACHE_WINDOW_DAYS);

        if !entries.is_empty() {
            objects.push(CacheObject {
                account_id: account.id().to_string(),
                data: SalesDataset::new(entries, data.apps.clone(), data.currency.clone()),
            });
        }

        self.write_collection(&CacheCollection { objects });
    }

    /// Remove the cached entry for one account.
    pub fn clear(&self, account: &Account) {
        let Ok(_guard) = self.lock.lock() else {
            return;
        };
        let mut collection = self.read_collection();
        collection
            .objects
            .retain(|obj| obj.account_id != account.id());
        self.write_collection(&collection);
    }

    /// Remove the whole cache file.
    pub fn clear_all(&self) {
        let Ok(_guard) = self.lock.lock() else {
            return;
        };
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!("failed to remove cache file: {e}");
            }
        }
    }

    /// Number of cached events, for one account or across all.
    pub fn entry_count(&self, account: Option<&Account>) -> usize {
        let Ok(_guard) = self.lock.lock() else {
            return 0;
        };
        self.read_collection()
            .objects
            .iter()
            .filter(|obj| account.map_or(true, |a| obj.account_id == a.id()))
            .map(|obj| obj.data.events.len())
            .sum()
    }

    fn read_collection(&self) -> CacheCollection {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(_) => return CacheCollection::default(),
        };
        match serde_json::from_slice(&bytes) {
            Ok(collection) => collection,
            Err(e) => {
                log::warn!("cache file unreadable, treating as empty: {e}");
                CacheCollection::default()
            }
        }
    }

    fn write_collection(&self, collection: &CacheCollection) {
        let encoded = match serde_json::to_vec(collection) {
            Ok(encoded) => encoded,
            Err(e) => {
                log::warn!("failed to encode cache: {e}");
                return;
            }
        };
        if let Err(e) = std::fs::write(&self.path, encoded) {
            log::warn!("failed to write cache file: {e}");
        }
    }
}
